//! Command handlers for CLI operations
#![allow(clippy::print_stdout, reason = "CLI prints reports and listings to stdout")]

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use tokio::fs;
use tokio::signal;
use tracing::{info, warn};
use vigil_core::{ConfigOverride, ExecutionMode, ReportFormat, ValidationConfig};
use vigil_engine::{ComplianceEngine, Scheduler, ValidatorRegistry};

/// Arguments of `vigil check`.
#[derive(Debug)]
pub struct CheckArgs {
    pub files: Vec<PathBuf>,
    pub config: Option<PathBuf>,
    pub validators: Vec<String>,
    pub mode: Option<ExecutionMode>,
    pub timeout_ms: Option<u64>,
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
}

impl CheckArgs {
    fn overrides(&self) -> ConfigOverride {
        ConfigOverride {
            validators: (!self.validators.is_empty()).then(|| self.validators.clone()),
            mode: self.mode,
            timeout_ms: self.timeout_ms,
            ..ConfigOverride::default()
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ValidationConfig> {
    match path {
        Some(path) => ValidationConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(ValidationConfig::default()),
    }
}

/// Validates each file once and emits one report per file.
///
/// Returns whether every file was compliant.
///
/// # Errors
/// Returns an error if the config is invalid, a file cannot be read, or a
/// validation or export fails.
pub async fn handle_check(args: CheckArgs) -> Result<bool> {
    let engine = ComplianceEngine::new(load_config(args.config.as_deref())?)?;
    let overrides = args.overrides();

    let mut reports = Vec::with_capacity(args.files.len());
    let mut all_compliant = true;
    for file in &args.files {
        let code = fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let path = file.to_string_lossy();
        let result = engine.validate(&code, &path, Some(&overrides)).await?;
        if !result.overall_compliant {
            warn!(
                file = %path,
                score = result.overall_score,
                errors = result.total_errors,
                "File is not compliant"
            );
            all_compliant = false;
        }
        reports.push(engine.export(&result, args.format)?);
    }

    let body = reports.join("\n");
    match &args.output {
        Some(output) => {
            fs::write(output, body)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(path = %output.display(), "Report written");
        }
        None => println!("{body}"),
    }
    engine.dispose();
    Ok(all_compliant)
}

/// Prints every available validator.
pub fn handle_validators() {
    for validator in ValidatorRegistry::new().list_validators() {
        println!("{:<8} {}", validator.id, validator.description);
    }
}

/// Writes the default configuration to `path`.
///
/// # Errors
/// Returns an error if the file exists and `force` is not set, or writing fails.
pub fn handle_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists, pass --force to overwrite", path.display());
    }
    ValidationConfig::default().save_to_file(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

/// Runs the scheduler over `files` until Ctrl-C.
///
/// # Errors
/// Returns an error if the config is invalid or the signal handler fails.
pub async fn handle_watch(files: Vec<PathBuf>, config: Option<&Path>) -> Result<()> {
    let engine = ComplianceEngine::new(load_config(config)?)?;
    let handle = Scheduler::start(engine.clone(), files)?;
    signal::ctrl_c().await?;
    handle.stop().await;

    let metrics = engine.metrics();
    println!(
        "{} validations, average score {:.1}, compliance rate {:.1}%",
        metrics.total_validations, metrics.average_score, metrics.compliance_rate
    );
    engine.dispose();
    Ok(())
}
