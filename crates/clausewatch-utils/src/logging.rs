//! Logging infrastructure for clausewatch
//!
//! Structured logging through `tracing`, with a compact human format by default
//! and a more detailed format under `--verbose`.

use tracing::{Level, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise `verbose` selects `clausewatch=debug`
/// and the default is warnings only, so a normal run prints just the report.
/// Log output goes to stderr.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("clausewatch=debug,info")
            } else {
                EnvFilter::try_new("warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_line_number(false)
                    .with_file(false)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Stages of an analysis run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    SelectModel,
    Complete,
    Parse,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::SelectModel => "select_model",
            Self::Complete => "complete",
            Self::Parse => "parse",
        }
    }
}

/// Create a span for one stage of an analysis run. `model` is `-` when no
/// model is involved yet.
pub fn stage_span(stage: Stage, model: &str) -> tracing::Span {
    span!(Level::INFO, "analysis_stage", stage = stage.as_str(), model = %model)
}
