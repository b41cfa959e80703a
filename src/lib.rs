//! clausewatch - contract risk screening with a generative-language model
//!
//! clausewatch takes a contract (PDF, Word or plain text), sends its text to a
//! Gemini model with a fixed review prompt and turns the free-text answer into
//! a report: a risk score in `0..=100`, a risk tier, a trap count, a detailed
//! analysis and a negotiation script.
//!
//! clausewatch can be used in two ways:
//! - **CLI**: run `clausewatch analyze contract.pdf`
//! - **Library**: drive a [`SessionController`] or the individual pieces below
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! export GEMINI_API_KEY=...
//! clausewatch analyze lease.docx
//! clausewatch analyze --stdin --json < contract.txt
//! clausewatch models
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use clausewatch::{AnalysisPipeline, ApiKey, Config, ConfiguredConnector, SessionController};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::builder().stream(false).build()?;
//! let mut controller = SessionController::new(
//!     Arc::new(ConfiguredConnector::new(config.clone())),
//!     AnalysisPipeline::from_config(&config),
//!     ApiKey::parse(std::env::var("GEMINI_API_KEY")?),
//! );
//! controller.set_contract_text("第一條 承租人不得提前終止本約")?;
//! controller.submit(&mut |_| {}).await?;
//! println!("{}", clausewatch::view::render(controller.session()));
//! # Ok(())
//! # }
//! ```
//!
//! # Pieces
//!
//! - [`extract_text`] / [`Document`]: PDF, OOXML Word and plain text to a string
//! - [`ModelSelector`] / [`choose_model`]: deterministic model choice from the listing
//! - [`build_prompt`]: the review prompt with its three marker blocks
//! - [`CompletionClient`] + [`RetryPolicy`]: the request, with bounded rate-limit retry
//! - [`parse`], [`normalize_score`], [`normalize_count`]: total parsing of the answer
//! - [`SessionController`]: input -> result state machine

// ============================================================================
// Public API
// ============================================================================

/// Configuration with discovery and precedence: CLI > environment > file > defaults.
pub use clausewatch_config::{ApiKey, CliArgs, Config, ConfigBuilder};

pub use clausewatch_extraction::{Document, DocumentKind, extract_text};

pub use clausewatch_llm::{
    BackendConnector, CompletionClient, CompletionOptions, CompletionResult, ConfiguredConnector,
    FixedConnector, GeminiBackend, LlmBackend, ModelInfo, ModelSelection, ModelSelector,
    RetryObserver, RetryPolicy, RetryingBackend, choose_model,
};

pub use clausewatch_prompt_template::{MarkerBlock, PromptTemplate, build_prompt};

pub use clausewatch_report::{
    ParsedResponse, RiskSummary, Score, normalize_count, normalize_score, parse,
};

pub use clausewatch_session::{
    Analysis, AnalysisPipeline, ResultStep, Session, SessionController, View, view,
};

/// Library-level error type and the user-facing reporting trait.
pub use clausewatch_utils::error::{
    ClauseWatchError, ErrorCategory, ExtractionError, LlmError, UserFriendlyError,
    ValidationError,
};

/// Exit codes used by the CLI.
pub use clausewatch_utils::exit_codes::ExitCode;

#[doc(hidden)]
pub use clausewatch_utils::{logging, redaction};

#[doc(hidden)]
pub use clausewatch_llm as llm;

#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub use clausewatch_llm::test_support;

// CLI module - used by main.rs; exported for white-box tests of flag parsing
#[doc(hidden)]
pub mod cli;
