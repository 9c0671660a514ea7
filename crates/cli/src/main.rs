//! `jextract-gen` command line entry point.

mod cli;
mod commands;
mod tracing;

use crate::cli::Cli;
use crate::tracing::{TracingConfig, init_tracing};
use clap::Parser;
use jextract_core::Error;
use std::process::ExitCode;

/// Invalid configuration or arguments.
const EXIT_CONFIGURATION: u8 = 2;
/// Tool acquisition, generation or injection failed.
const EXIT_EXECUTION: u8 = 3;

/// Exit code for a failed command.
const fn exit_code(error: &Error) -> u8 {
    match error {
        Error::Configuration { .. }
        | Error::InvalidVersionFormat { .. }
        | Error::InvalidUrlTemplate { .. }
        | Error::MutuallyExclusiveConfiguration { .. }
        | Error::UnsupportedPlatform { .. }
        | Error::UnsupportedArchitecture { .. } => EXIT_CONFIGURATION,
        _ => EXIT_EXECUTION,
    }
}

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = TracingConfig {
        format: cli.log_format,
        level: cli.level.into(),
        ..TracingConfig::default()
    };
    if let Err(error) = init_tracing(tracing_config) {
        eprintln!("{error:?}");
        return ExitCode::FAILURE;
    }

    match commands::execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let code = exit_code(&error);
            eprintln!("{:?}", miette::Report::new(error));
            ExitCode::from(code)
        }
    }
}
