//! CLI argument definitions and parsing structures
//!
//! This module defines the command-line interface structure using clap,
//! including the main `Cli` struct and all subcommand enums.

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// clausewatch - contract risk screening from the terminal
#[derive(Parser, Debug)]
#[command(name = "clausewatch")]
#[command(about = "Screen a contract for risky clauses with a Gemini model")]
#[command(long_about = r#"
clausewatch sends a contract's text to a Gemini model with a fixed review prompt
and renders the answer as a report: risk score, risk tier, trap count, a detailed
analysis and a negotiation script.

EXAMPLES:
  # Analyze a PDF, DOCX or plain-text contract
  clausewatch analyze lease.pdf

  # Analyze text given inline or piped in
  clausewatch analyze --text "第一條 承租人不得提前終止本約..."
  cat contract.txt | clausewatch analyze --stdin --json

  # List models the credential can use, and the one that would be chosen
  clausewatch models

  # Show effective configuration with sources
  clausewatch config

CONFIGURATION:
  Precedence: CLI flags > environment > config file > defaults
  The config file is discovered by searching upward from CWD for .clausewatch/config.toml
  The API key is read from GEMINI_API_KEY (or GOOGLE_API_KEY) unless --api-key is given;
  on a terminal you are prompted for it when none is configured.
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Gemini API key (prefer the GEMINI_API_KEY environment variable)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Model to use, skipping automatic selection
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Base URL of the Generative Language API
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Prompt template: zh-TW (default) or en
    #[arg(long, global = true)]
    pub template: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Stream the answer as it is generated (default)
    #[arg(long, global = true, overrides_with = "no_stream")]
    pub stream: bool,

    /// Wait for the complete answer instead of streaming
    #[arg(long, global = true, overrides_with = "stream")]
    pub no_stream: bool,

    /// Attempts per request when rate limited (default: 3)
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Seconds to wait after a rate-limit error before retrying (default: 60)
    #[arg(long, global = true)]
    pub cooldown_secs: Option<u64>,

    /// Request timeout in seconds (default: 120, min: 5)
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// `Some(true)` / `Some(false)` when a streaming flag was given.
    #[must_use]
    pub fn stream_override(&self) -> Option<bool> {
        if self.stream {
            Some(true)
        } else if self.no_stream {
            Some(false)
        } else {
            None
        }
    }
}

/// Result section to print for `analyze`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StepArg {
    Overview,
    Detail,
    Negotiation,
    All,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a contract and print the risk report
    ///
    /// EXAMPLES:
    ///   clausewatch analyze lease.docx
    ///   clausewatch analyze scan.bin --mime application/pdf
    ///   clausewatch analyze --stdin --step negotiation < contract.txt
    #[command(group(ArgGroup::new("input").required(true).args(["file", "text", "stdin"])))]
    Analyze {
        /// Contract document (.pdf, .docx or .txt)
        file: Option<PathBuf>,

        /// Contract text given directly
        #[arg(long)]
        text: Option<String>,

        /// Read contract text from standard input
        #[arg(long)]
        stdin: bool,

        /// MIME type of the document, when the extension is not enough
        #[arg(long, requires = "file")]
        mime: Option<String>,

        /// Which part of the report to print
        #[arg(long, value_enum, default_value_t = StepArg::All)]
        step: StepArg,

        /// Output the analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// List models that support content generation
    ///
    /// Also reports which model `analyze` would pick. Listing failures are
    /// reported here rather than falling back, so this doubles as a
    /// credential check.
    Models {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show effective configuration and where each value came from
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
