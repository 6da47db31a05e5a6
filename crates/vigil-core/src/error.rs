use core::result::Result as CoreResult;
use std::io::Error as IoError;

use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use toml::de::Error as TomlDeError;
use toml::ser::Error as TomlSerError;

/// Result type for core operations.
pub type Result<T> = CoreResult<T, Error>;

/// Errors that can occur in the core library and in validators.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Json(#[from] SerdeJsonError),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] TomlDeError),

    /// TOML serialization failed.
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] TomlSerError),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A validator could not analyse its input.
    #[error("Validator '{validator}' failed: {message}")]
    Validator {
        /// Id of the failing validator
        validator: String,
        /// What went wrong
        message: String,
    },

    /// A plugin does not satisfy the plugin contract.
    #[error("Invalid plugin: {0}")]
    InvalidPlugin(String),

    /// A general error not covered by other variants.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Builds a [`Error::Validator`] for the given validator id.
    pub fn validator<V: Into<String>, M: Into<String>>(validator: V, message: M) -> Self {
        Self::Validator {
            validator: validator.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value as JsonValue, from_str};
    use std::io;

    #[test]
    fn test_error_display() {
        let config_error = Error::Config("timeout_ms must be positive".to_owned());
        assert_eq!(
            config_error.to_string(),
            "Configuration error: timeout_ms must be positive"
        );

        let validator_error = Error::validator("wcag", "input too large");
        assert_eq!(
            validator_error.to_string(),
            "Validator 'wcag' failed: input too large"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let Err(json_error) = from_str::<JsonValue>("invalid json") else {
            panic!("parsing invalid json should fail");
        };
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }
}
