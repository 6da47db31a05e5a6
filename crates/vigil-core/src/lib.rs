//! Core types and traits for the vigil compliance engine.
//!
//! This crate provides the shared data model (validator reports, aggregated
//! results), the configuration surface, error handling, and the capability
//! traits implemented by built-in validators and runtime plugins.
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

/// Configuration surface and per-call overrides.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// Aggregated, scored output of one validation run.
pub mod result;
/// Capability traits for validators and plugins.
pub mod traits;
/// Per-validator report types.
pub mod types;

pub use config::{
    CachePolicy, CacheStrategy, ConfigOverride, ExecutionMode, NotificationPolicy,
    NotificationThresholds, ReportFormat, ReportingPolicy, SchedulingPolicy, ValidationConfig,
};
pub use error::{Error, Result};
pub use result::{
    AggregatedResult, ComplianceLevel, CoverageMetrics, PerformanceMetrics, Recommendation,
    ResultMetadata, ResultSummary, TrendDeltas,
};
pub use traits::{PluginMetadata, Validator, ValidatorPlugin};
pub use types::{
    AccessibilityDetails, DataProtectionDetails, Issue, LocaleDetails, PluginDetails,
    SecurityDetails, Severity, ValidatorDetails, ValidatorReport,
};
