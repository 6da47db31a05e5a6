//! Periodic re-validation of a fixed set of files.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};
use vigil_core::Error as CoreError;

use crate::{ComplianceEngine, Result};

/// Starts scheduled validation runs.
pub struct Scheduler;

impl Scheduler {
    /// Spawns a task validating every target each `scheduling.interval_seconds`.
    ///
    /// The first run happens immediately when `scheduling.immediate` is set,
    /// otherwise after one interval. Must be called inside a tokio runtime.
    ///
    /// # Errors
    /// Returns a configuration error if the interval is zero.
    pub fn start(engine: ComplianceEngine, targets: Vec<PathBuf>) -> Result<SchedulerHandle> {
        let policy = engine.config().scheduling.clone();
        if policy.interval_seconds == 0 {
            return Err(CoreError::Config(
                "scheduling.interval_seconds must be positive".to_owned(),
            )
            .into());
        }
        Ok(Self::start_with_period(
            engine,
            targets,
            Duration::from_secs(policy.interval_seconds),
            policy.immediate,
        ))
    }

    /// Spawns the scheduling loop with an explicit period.
    pub fn start_with_period(
        engine: ComplianceEngine,
        targets: Vec<PathBuf>,
        period: Duration,
        immediate: bool,
    ) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let completed = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&completed);

        let first = if immediate {
            Instant::now()
        } else {
            Instant::now() + period
        };
        info!(
            targets = targets.len(),
            period_ms = period.as_millis() as u64,
            immediate,
            "Scheduled validation started"
        );

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        run_targets(&engine, &targets).await;
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
            debug!("Scheduled validation loop exited");
        });

        SchedulerHandle {
            stop: Some(stop_tx),
            task: Some(task),
            completed,
        }
    }
}

async fn run_targets(engine: &ComplianceEngine, targets: &[PathBuf]) {
    for target in targets {
        let code = match tokio::fs::read_to_string(target).await {
            Ok(code) => code,
            Err(error) => {
                warn!(path = %target.display(), %error, "Scheduled target unreadable");
                continue;
            }
        };
        let path = target.to_string_lossy();
        match engine.validate(&code, &path, None).await {
            Ok(result) => info!(
                path = %path,
                score = result.overall_score,
                compliant = result.overall_compliant,
                "Scheduled validation finished"
            ),
            Err(error) => warn!(path = %path, %error, "Scheduled validation failed"),
        }
    }
}

/// Controls a running schedule. Dropping the handle stops it.
pub struct SchedulerHandle {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    completed: Arc<AtomicU64>,
}

impl SchedulerHandle {
    /// Number of completed scheduling rounds.
    pub fn completed_runs(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Stops the schedule, letting an in-progress round finish.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            // The loop may already have exited.
            stop.send(()).ok();
        }
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                warn!(%error, "Scheduled validation task ended abnormally");
            }
        }
        info!("Scheduled validation stopped");
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
