//! Validator execution with per-validator timeouts.
//!
//! Each validator runs in its own task. The caller waits on the task handle,
//! not on the validator future, so a validator that blocks its worker thread
//! still loses the race against the deadline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};
use vigil_core::{ExecutionMode, Validator, ValidatorReport};

use crate::{EngineError, Result};

/// Outcome of running one validator once.
#[derive(Debug)]
pub struct ValidatorRun {
    /// Id of the validator
    pub validator: String,
    /// Report, or the per-validator fault that replaced it
    pub outcome: Result<ValidatorReport>,
    /// Measured elapsed time
    pub elapsed: Duration,
}

impl ValidatorRun {
    /// The report, if the validator contributed one.
    pub fn report(&self) -> Option<&ValidatorReport> {
        self.outcome.as_ref().ok()
    }

    fn panicked(validator: &str, elapsed: Duration) -> Self {
        Self {
            validator: validator.to_owned(),
            outcome: Err(EngineError::ValidatorFailed {
                validator: validator.to_owned(),
                message: "validator task panicked".to_owned(),
            }),
            elapsed,
        }
    }

    fn timed_out(validator: &str, limit: Duration, elapsed: Duration) -> Self {
        Self {
            validator: validator.to_owned(),
            outcome: Err(EngineError::Timeout {
                validator: validator.to_owned(),
                timeout_ms: limit.as_millis() as u64,
            }),
            elapsed,
        }
    }
}

/// Mode and per-validator time limit of one execution phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionSettings {
    /// Parallel or sequential
    pub mode: ExecutionMode,
    /// Time each validator is given
    pub limit: Duration,
}

impl ExecutionSettings {
    /// Creates execution settings.
    pub const fn new(mode: ExecutionMode, limit: Duration) -> Self {
        Self { mode, limit }
    }
}

/// The execution phase of a validation call, retried as a whole by the engine.
#[async_trait]
pub trait ExecutionPhase: Send + Sync {
    /// Runs every validator once, returning one run per validator in input order.
    ///
    /// # Errors
    /// An error fails the attempt. Retryable errors trigger another attempt.
    async fn execute(
        &self,
        settings: ExecutionSettings,
        validators: &[Arc<dyn Validator>],
        code: &Arc<str>,
        file_path: &Arc<str>,
    ) -> Result<Vec<ValidatorRun>>;
}

/// Default execution phase backed by tokio tasks.
///
/// Per-validator timeouts, errors and panics are recorded in the run and
/// never fail the phase. A validator still running at its deadline is
/// abandoned; its eventual result is discarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct Executor;

#[async_trait]
impl ExecutionPhase for Executor {
    async fn execute(
        &self,
        settings: ExecutionSettings,
        validators: &[Arc<dyn Validator>],
        code: &Arc<str>,
        file_path: &Arc<str>,
    ) -> Result<Vec<ValidatorRun>> {
        match settings.mode {
            ExecutionMode::Parallel => {
                execute_parallel(settings.limit, validators, code, file_path).await
            }
            ExecutionMode::Sequential => {
                execute_sequential(settings.limit, validators, code, file_path).await
            }
        }
    }
}

async fn execute_parallel(
    limit: Duration,
    validators: &[Arc<dyn Validator>],
    code: &Arc<str>,
    file_path: &Arc<str>,
) -> Result<Vec<ValidatorRun>> {
    let started = Instant::now();
    let deadline = started + limit;
    let handles: Vec<JoinHandle<ValidatorRun>> = validators
        .iter()
        .map(|validator| spawn_run(validator, code, file_path, limit))
        .collect();

    let mut runs = Vec::with_capacity(validators.len());
    for (handle, validator) in handles.into_iter().zip(validators) {
        runs.push(join_run(handle, validator.id(), started, deadline, limit).await?);
    }
    Ok(runs)
}

async fn execute_sequential(
    limit: Duration,
    validators: &[Arc<dyn Validator>],
    code: &Arc<str>,
    file_path: &Arc<str>,
) -> Result<Vec<ValidatorRun>> {
    let mut runs = Vec::with_capacity(validators.len());
    for validator in validators {
        let started = Instant::now();
        let handle = spawn_run(validator, code, file_path, limit);
        runs.push(join_run(handle, validator.id(), started, started + limit, limit).await?);
    }
    Ok(runs)
}

fn spawn_run(
    validator: &Arc<dyn Validator>,
    code: &Arc<str>,
    file_path: &Arc<str>,
    limit: Duration,
) -> JoinHandle<ValidatorRun> {
    tokio::spawn(run_one(
        Arc::clone(validator),
        Arc::clone(code),
        Arc::clone(file_path),
        limit,
    ))
}

/// Waits for a validator task until `deadline`.
async fn join_run(
    mut handle: JoinHandle<ValidatorRun>,
    validator: &str,
    started: Instant,
    deadline: Instant,
    limit: Duration,
) -> Result<ValidatorRun> {
    match timeout_at(deadline, &mut handle).await {
        Ok(Ok(run)) => Ok(run),
        Ok(Err(error)) if error.is_panic() => {
            warn!(validator, %error, "Validator task panicked");
            Ok(ValidatorRun::panicked(validator, started.elapsed()))
        }
        Ok(Err(error)) => Err(EngineError::ExecutionFailed(error.to_string())),
        Err(_elapsed) => {
            handle.abort();
            let run = ValidatorRun::timed_out(validator, limit, started.elapsed());
            warn!(
                validator,
                timeout_ms = limit.as_millis() as u64,
                "Validator timed out, result abandoned"
            );
            Ok(run)
        }
    }
}

/// Runs one validator to completion inside its task.
///
/// A report finishing past `limit` is replaced by a timeout, which covers
/// runtimes where the waiting side could not be polled in time.
async fn run_one(
    validator: Arc<dyn Validator>,
    code: Arc<str>,
    file_path: Arc<str>,
    limit: Duration,
) -> ValidatorRun {
    let id = validator.id().to_owned();
    debug!(validator = %id, "Validator started");
    let started = Instant::now();

    let outcome = validator.validate(&code, &file_path).await;
    let elapsed = started.elapsed();
    let elapsed_ms = elapsed.as_millis() as u64;
    if elapsed > limit {
        warn!(
            validator = %id,
            elapsed_ms,
            "Validator finished past its deadline, result discarded"
        );
        return ValidatorRun::timed_out(&id, limit, elapsed);
    }

    let outcome = match outcome {
        Ok(mut report) => {
            report.validator.clone_from(&id);
            debug!(
                validator = %id,
                score = report.score,
                issues = report.issues.len(),
                elapsed_ms,
                "Validator finished"
            );
            Ok(report)
        }
        Err(error) => {
            warn!(validator = %id, elapsed_ms, %error, "Validator contributed no result");
            Err(EngineError::ValidatorFailed {
                validator: id.clone(),
                message: error.to_string(),
            })
        }
    };

    ValidatorRun {
        validator: id,
        outcome,
        elapsed,
    }
}
