//! Entry point: parse arguments, load configuration, dispatch, map errors.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use clausewatch_config::{CliArgs, Config};
use clausewatch_utils::error::{ClauseWatchError, ConfigError};
use clausewatch_utils::exit_codes::ExitCode;
use clausewatch_utils::logging::init_tracing;
use clausewatch_utils::redaction::redact_error_message;

use super::args::{Cli, Commands};
use super::commands;

/// Run the CLI. All output, including errors, is written here; the caller
/// only maps the returned code to the process exit status.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        api_key: cli.api_key.clone(),
        model: cli.model.clone(),
        base_url: cli.base_url.clone(),
        verbose: cli.verbose.then_some(true),
        stream: cli.stream_override(),
        max_attempts: cli.max_attempts,
        cooldown_secs: cli.cooldown_secs,
        timeout_secs: cli.timeout_secs,
        prompt_template: cli.template.clone(),
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            let err = ClauseWatchError::Config(ConfigError::InvalidFile(format!("{err:#}")));
            eprint!("{}", err.display_for_user());
            return Err(err.to_exit_code());
        }
    };

    if let Err(e) = init_tracing(config.verbose()) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }
    debug!(command = ?cli.command, "parsed command line");

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let result = rt.block_on(async {
        let cancel = CancellationToken::new();
        let watcher = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nInterrupted; stopping.");
                watcher.cancel();
            }
        });

        match cli.command {
            Commands::Analyze {
                file,
                text,
                stdin,
                mime,
                step,
                json,
            } => {
                let input = commands::ContractInput::from_args(file, text, stdin, mime);
                commands::execute_analyze(&config, input, step, json, cancel).await
            }
            Commands::Models { json } => commands::execute_models(&config, json, cancel).await,
            Commands::Config { json } => commands::execute_config(&config, json),
        }
    });

    match result {
        Ok(()) => Ok(()),
        Err(err) => match err.downcast_ref::<ClauseWatchError>() {
            Some(cw) => {
                eprint!("{}", cw.display_for_user());
                Err(cw.to_exit_code())
            }
            None => {
                eprintln!("Error: {}", redact_error_message(&format!("{err:#}")));
                Err(ExitCode::INTERNAL)
            }
        },
    }
}
