//! Command implementations for the terminal front end.

use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use clausewatch_config::{ApiKey, Config};
use clausewatch_extraction::Document;
use clausewatch_llm::{
    ConfiguredConnector, LlmError, ModelSelector, RetryObserver, choose_model, strip_model_prefix,
};
use clausewatch_report::RiskSummary;
use clausewatch_session::{AnalysisPipeline, SessionController, view};
use clausewatch_utils::error::{ClauseWatchError, ExtractionError, ValidationError};
use clausewatch_utils::redaction::redact_error_message;

use super::args::StepArg;

/// Where the contract text comes from.
#[derive(Debug)]
pub(crate) enum ContractInput {
    File {
        path: PathBuf,
        mime: Option<String>,
    },
    Text(String),
    Stdin,
}

impl ContractInput {
    pub(crate) fn from_args(
        file: Option<PathBuf>,
        text: Option<String>,
        stdin: bool,
        mime: Option<String>,
    ) -> Self {
        match (file, text) {
            (Some(path), _) => Self::File { path, mime },
            (None, Some(text)) => Self::Text(text),
            (None, None) if stdin => Self::Stdin,
            (None, None) => Self::Text(String::new()),
        }
    }
}

/// Prints rate-limit cooldowns to stderr, with a live countdown on a terminal.
struct CountdownObserver {
    cancel: CancellationToken,
    live: bool,
}

impl RetryObserver for CountdownObserver {
    fn on_cooldown(&self, attempt: u32, max_attempts: u32, cooldown: Duration, error: &LlmError) {
        eprintln!(
            "Rate limited (attempt {attempt}/{max_attempts}): {}",
            redact_error_message(&error.to_string())
        );

        let secs = cooldown.as_secs();
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) if self.live => handle,
            _ => {
                eprintln!("Retrying in {secs}s (Ctrl-C to cancel)");
                return;
            }
        };

        let cancel = self.cancel.clone();
        handle.spawn(async move {
            for remaining in (1..=secs).rev() {
                eprint!("\r  retrying in {remaining:>4}s (Ctrl-C to cancel) ");
                let _ = io::stderr().flush();
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(Duration::from_secs(1)) => {}
                }
            }
            eprint!("\r{:44}\r", "");
        });
    }
}

/// The configured key, or one typed in on a terminal.
fn resolve_credential(config: &Config, allow_prompt: bool) -> Result<Option<ApiKey>> {
    if let Some(key) = &config.api_key {
        return Ok(Some(key.clone()));
    }
    if !allow_prompt || !io::stdin().is_terminal() {
        return Ok(None);
    }

    eprint!("Gemini API key: ");
    io::stderr().flush().context("Failed to write prompt")?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read API key")?;
    Ok(ApiKey::parse(line))
}

#[derive(Serialize)]
struct AnalyzeOutput<'a> {
    model: &'a str,
    fallback_reason: Option<&'a str>,
    streamed: bool,
    has_data_block: bool,
    risk_summary: &'a RiskSummary,
    analysis_report: &'a str,
    negotiation_script: &'a str,
}

/// Execute the analyze command
pub(crate) async fn execute_analyze(
    config: &Config,
    input: ContractInput,
    step: StepArg,
    json: bool,
    cancel: CancellationToken,
) -> Result<()> {
    let allow_prompt = !matches!(input, ContractInput::Stdin);
    let api_key = resolve_credential(config, allow_prompt)?;

    let observer = CountdownObserver {
        cancel: cancel.clone(),
        live: io::stderr().is_terminal(),
    };
    let pipeline = AnalysisPipeline::from_config(config)
        .with_cancellation(cancel)
        .with_observer(Arc::new(observer));
    let mut controller = SessionController::new(
        Arc::new(ConfiguredConnector::new(config.clone())),
        pipeline,
        api_key,
    );

    match input {
        ContractInput::File { path, mime } => {
            let mut document = Document::from_path(&path).map_err(ClauseWatchError::from)?;
            if mime.is_some() {
                document.mime_type = mime;
            }
            let chars = controller.load_document(&document)?;
            info!(path = %path.display(), chars, "extracted contract text");
        }
        ContractInput::Text(text) => {
            controller
                .set_contract_text(text)
                .map_err(ClauseWatchError::from)?;
        }
        ContractInput::Stdin => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| ClauseWatchError::from(ExtractionError::from(e)))?;
            controller
                .set_contract_text(text)
                .map_err(ClauseWatchError::from)?;
        }
    }

    let live = config.stream() && !json && io::stderr().is_terminal();
    let mut received = false;
    let mut sink = |fragment: &str| {
        if live {
            eprint!("{fragment}");
            let _ = io::stderr().flush();
            received = true;
        }
    };

    let analysis = controller.submit(&mut sink).await?;
    if received {
        eprintln!("\n");
    }

    if let Some(reason) = &analysis.model.fallback_reason {
        eprintln!(
            "Warning: model listing failed ({reason}); used fallback model {}",
            analysis.model.model_id
        );
    }

    let session = controller.session();
    if json {
        let output = AnalyzeOutput {
            model: &session.selected_model_id,
            fallback_reason: analysis.model.fallback_reason.as_deref(),
            streamed: analysis.streamed,
            has_data_block: analysis.parsed.data.is_some(),
            risk_summary: &session.risk_summary,
            analysis_report: &session.analysis_report,
            negotiation_script: &session.negotiation_script,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let rendered = match step {
        StepArg::All => view::render_all_steps(session),
        StepArg::Overview => view::render(session),
        StepArg::Detail => {
            controller.next_step();
            view::render(controller.session())
        }
        StepArg::Negotiation => {
            controller.next_step();
            controller.next_step();
            view::render(controller.session())
        }
    };
    print!("{rendered}");
    Ok(())
}

#[derive(Serialize)]
struct ModelsOutput<'a> {
    models: &'a [clausewatch_llm::ModelInfo],
    selected: Option<String>,
    pinned: bool,
}

/// Execute the models command
pub(crate) async fn execute_models(
    config: &Config,
    json: bool,
    cancel: CancellationToken,
) -> Result<()> {
    let api_key = resolve_credential(config, true)?
        .ok_or(ClauseWatchError::Validation(ValidationError::MissingCredential))?;
    let backend = clausewatch_llm::from_config(config, api_key).map_err(ClauseWatchError::from)?;
    let selector = ModelSelector::from_config(config);

    let models = tokio::select! {
        () = cancel.cancelled() => return Err(ClauseWatchError::from(LlmError::Cancelled).into()),
        listed = selector.capable_models(backend.as_ref()) => listed.map_err(ClauseWatchError::from)?,
    };
    debug!(count = models.len(), "capable models");

    let pinned = config.pinned_model();
    let selected = match pinned {
        Some(model) => Some(strip_model_prefix(model).to_string()),
        None => {
            let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
            choose_model(&ids, selector.preferences()).ok()
        }
    };

    if json {
        let output = ModelsOutput {
            models: &models,
            selected,
            pinned: pinned.is_some(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if models.is_empty() {
        println!("The credential works, but no generation-capable models are visible.");
    } else {
        println!("Models supporting content generation:");
        for model in &models {
            match &model.display_name {
                Some(name) => println!("  {:<32} {}", model.id, name),
                None => println!("  {}", model.id),
            }
        }
    }
    match (selected, pinned.is_some()) {
        (Some(id), true) => println!("\nPinned model: {id}"),
        (Some(id), false) => println!("\nWould select: {id}"),
        (None, _) => println!("\nWould fall back to: {}", selector.fallback()),
    }
    Ok(())
}

/// Execute the config command
pub(crate) fn execute_config(config: &Config, json: bool) -> Result<()> {
    let effective = config.effective_config();

    if json {
        let map: serde_json::Map<String, serde_json::Value> = effective
            .into_iter()
            .map(|(key, (value, source))| {
                (
                    key,
                    serde_json::json!({ "value": value, "source": source }),
                )
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    println!("Effective configuration:");
    for (key, (value, source)) in &effective {
        println!("  {key:<18} = {value:<40} [{source}]");
    }
    Ok(())
}
