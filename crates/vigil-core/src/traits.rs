use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::{Result, ValidatorReport};

/// A pluggable analyzer producing a compliance report for one unit of source.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Stable id used in configuration and in aggregated results.
    fn id(&self) -> &str;

    /// One-line description shown in validator listings.
    fn description(&self) -> &str {
        ""
    }

    /// Analyzes `code` read from `file_path`.
    ///
    /// # Errors
    /// Returns an error if the validator cannot analyse the input. The
    /// orchestrator treats this as a per-validator failure.
    async fn validate(&self, code: &str, file_path: &str) -> Result<ValidatorReport>;
}

/// Self-description of a runtime plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginMetadata {
    /// What the plugin checks
    pub description: String,
    /// File extensions the plugin understands; empty means all files
    pub supported_file_types: Vec<String>,
    /// Names of options accepted through `plugin_options`
    pub configurable_options: Vec<String>,
}

/// A validator registered by the caller at runtime.
#[async_trait]
pub trait ValidatorPlugin: Send + Sync {
    /// Unique plugin name, also used as its id in results.
    fn name(&self) -> &str;

    /// Plugin version string.
    fn version(&self) -> &str;

    /// Analyzes `code` read from `file_path` with caller-supplied options.
    ///
    /// # Errors
    /// Returns an error if the plugin cannot analyse the input.
    async fn validate(
        &self,
        code: &str,
        file_path: &str,
        options: &JsonValue,
    ) -> Result<ValidatorReport>;

    /// Describes the plugin.
    fn metadata(&self) -> PluginMetadata;
}
