//! Terminal front end

pub mod args;
mod commands;
mod run;

pub use args::{Cli, Commands, StepArg};
pub use run::run;

/// The clap command definition, for help rendering and flag introspection.
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
