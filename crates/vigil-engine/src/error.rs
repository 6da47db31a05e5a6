//! Error types for the compliance engine.

use core::result::Result as CoreResult;
use std::{fmt, io};

use serde_json::Error as JsonError;
use thiserror::Error;
use vigil_core::Error as CoreError;

/// Result type for engine operations.
pub type Result<T> = CoreResult<T, EngineError>;

/// Errors raised while orchestrating a validation call.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration, validator or plugin error from the core crate.
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// Report or scheduled target I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Report text could not be formatted.
    #[error("Format error: {0}")]
    Fmt(#[from] fmt::Error),

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] JsonError),

    /// `enabled = false` in the effective configuration.
    #[error("Validation is disabled by configuration")]
    Disabled,

    /// A validator did not finish within its time limit.
    #[error("Validator '{validator}' timed out after {timeout_ms}ms")]
    Timeout {
        /// Id of the validator
        validator: String,
        /// Limit that was exceeded
        timeout_ms: u64,
    },

    /// A validator returned an error or panicked.
    #[error("Validator '{validator}' failed: {message}")]
    ValidatorFailed {
        /// Id of the validator
        validator: String,
        /// What went wrong
        message: String,
    },

    /// The execution phase as a whole failed.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Every execution attempt failed.
    #[error("Validation failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Attempts made, including the first
        attempts: u32,
        /// Error of the last attempt
        last_error: String,
    },

    /// The result cache could not be accessed.
    #[error("Cache error: {0}")]
    Cache(String),

    /// A plugin does not satisfy the plugin contract.
    #[error("Invalid plugin: {0}")]
    InvalidPlugin(String),

    /// A report format name is not recognised.
    #[error("Unsupported report format: {0}")]
    UnsupportedFormat(String),
}

impl EngineError {
    /// Whether another attempt of the execution phase could succeed.
    ///
    /// Configuration and contract violations are deterministic and fail fast.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Disabled
                | Self::InvalidPlugin(_)
                | Self::UnsupportedFormat(_)
                | Self::RetriesExhausted { .. }
                | Self::Core(CoreError::Config(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let timeout = EngineError::Timeout {
            validator: "wcag".to_owned(),
            timeout_ms: 50,
        };
        assert_eq!(timeout.to_string(), "Validator 'wcag' timed out after 50ms");

        let exhausted = EngineError::RetriesExhausted {
            attempts: 3,
            last_error: "boom".to_owned(),
        };
        assert_eq!(
            exhausted.to_string(),
            "Validation failed after 3 attempts: boom"
        );
    }

    #[test]
    fn test_classification() {
        assert!(EngineError::ExecutionFailed("x".to_owned()).is_retryable());
        assert!(!EngineError::Disabled.is_retryable());
        assert!(!EngineError::Core(CoreError::Config("bad".to_owned())).is_retryable());
        assert!(!EngineError::InvalidPlugin("bad".to_owned()).is_retryable());
    }

    #[test]
    fn test_from_core() {
        let error: EngineError = CoreError::Config("bad".to_owned()).into();
        assert!(matches!(error, EngineError::Core(_)));
    }
}
