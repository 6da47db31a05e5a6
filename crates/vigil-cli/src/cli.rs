use std::path::PathBuf;

use clap::{Parser, Subcommand};
use vigil_core::{ExecutionMode, ReportFormat};
use vigil_engine::exporter::parse_format;

/// Command-line arguments for the vigil compliance checker
#[derive(Debug, Parser)]
#[command(name = "vigil")]
#[command(about = "Compliance validation for source files", long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Validate files once and print or write the report")]
    Check {
        #[arg(required = true, help = "Files to validate")]
        files: Vec<PathBuf>,

        #[arg(short, long, help = "Configuration file (TOML)")]
        config: Option<PathBuf>,

        #[arg(long = "validator", help = "Validator id to run (repeatable)")]
        validators: Vec<String>,

        #[arg(long, help = "Execution mode: sequential or parallel")]
        mode: Option<ExecutionMode>,

        #[arg(long, help = "Per-validator timeout in milliseconds")]
        timeout_ms: Option<u64>,

        #[arg(
            short,
            long,
            default_value = "json",
            value_parser = parse_format,
            help = "Output format: json, csv, html or pdf"
        )]
        format: ReportFormat,

        #[arg(short, long, help = "Write the report here instead of stdout")]
        output: Option<PathBuf>,
    },

    #[command(about = "List the available validators")]
    Validators,

    #[command(about = "Write the default configuration")]
    Init {
        #[arg(short, long, default_value = "vigil.toml", help = "Where to write the file")]
        path: PathBuf,

        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },

    #[command(about = "Re-validate files on the configured schedule until Ctrl-C")]
    Watch {
        #[arg(required = true, help = "Files to validate")]
        files: Vec<PathBuf>,

        #[arg(short, long, help = "Configuration file (TOML)")]
        config: Option<PathBuf>,
    },
}
