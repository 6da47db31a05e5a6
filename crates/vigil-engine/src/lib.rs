//! Compliance validation orchestration.
//!
//! [`ComplianceEngine`] runs a configurable set of validators over one unit of
//! source text and produces a single scored [`vigil_core::AggregatedResult`]:
//! - Result cache keyed by a content and config fingerprint, FIFO eviction
//! - Parallel or sequential execution with per-validator timeouts
//! - Whole-phase retry with linear backoff
//! - Aggregation into scores, ranked recommendations and trends
//! - Bounded history with summary metrics
//! - Threshold notifications, report export and scheduled runs
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

/// Aggregation of validator runs into one result.
pub mod aggregator;
/// Fingerprint-keyed result cache.
pub mod cache;
/// The engine context object.
mod engine;
/// Engine error types.
mod error;
/// Validator execution with timeouts.
pub mod executor;
/// Report rendering and writing.
pub mod exporter;
/// Bounded result history and metrics.
pub mod history;
/// Notification events and sinks.
pub mod notifier;
/// Built-in and plugin validator registry.
pub mod registry;
/// Process resource sampling.
pub mod resources;
/// Retry with linear backoff.
pub mod retry;
/// Periodic validation.
pub mod scheduler;

pub use cache::{Fingerprint, ResultCache};
pub use engine::ComplianceEngine;
pub use error::{EngineError, Result};
pub use executor::{ExecutionPhase, ExecutionSettings, Executor, ValidatorRun};
pub use history::{CommonIssue, ComplianceMetrics, HISTORY_CAPACITY, ValidationHistory};
pub use notifier::{
    ChannelNotifier, CollectingNotifier, NotificationEvent, NotificationSink, TracingNotifier,
};
pub use registry::{ValidatorInfo, ValidatorKind, ValidatorRegistry};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use scheduler::{Scheduler, SchedulerHandle};
