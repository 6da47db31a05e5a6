//! vigil - compliance validation command-line interface
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Allow for tests"
    )
)]

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser as _;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

use cli::{Cli, Commands};
use handlers::CheckArgs;

mod cli;
mod handlers;

const DEFAULT_LOG_FILTER: &str = "vigil_cli=info,vigil_engine=info,vigil_validators=info";

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            files,
            config,
            validators,
            mode,
            timeout_ms,
            format,
            output,
        } => {
            let all_compliant = handlers::handle_check(CheckArgs {
                files,
                config,
                validators,
                mode,
                timeout_ms,
                format,
                output,
            })
            .await?;
            if !all_compliant {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Validators => handlers::handle_validators(),
        Commands::Init { path, force } => handlers::handle_init(&path, force)?,
        Commands::Watch { files, config } => {
            handlers::handle_watch(files, config.as_deref()).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
