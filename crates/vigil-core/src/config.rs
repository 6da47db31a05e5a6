//! Configuration types for validation runs, caching, notifications,
//! scheduling, and reporting.

use core::result::Result as CoreResult;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};

/// Ids of the built-in validators, in their default run order.
pub const DEFAULT_VALIDATORS: [&str; 4] = ["nsm", "gdpr", "wcag", "locale"];

/// How validators are scheduled within one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One at a time, in configured order
    Sequential,
    /// All at once, each raced against its timeout
    #[default]
    Parallel,
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(value: &str) -> CoreResult<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "parallel" => Ok(Self::Parallel),
            other => Err(format!("unknown execution mode: {other}")),
        }
    }
}

/// Cache backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStrategy {
    /// Never read or write the cache
    None,
    /// Process-lifetime in-memory cache
    #[default]
    Memory,
}

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePolicy {
    /// Cache backend
    pub strategy: CacheStrategy,
    /// Time-to-live for new entries in seconds
    pub ttl_seconds: u64,
    /// Maximum number of entries before FIFO eviction
    pub max_size: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            strategy: CacheStrategy::Memory,
            ttl_seconds: 3600,
            max_size: 100,
        }
    }
}

/// Issue counts at which a notification is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationThresholds {
    /// Minimum error count that triggers a notification
    pub error: usize,
    /// Minimum warning count that triggers a notification
    pub warning: usize,
}

impl Default for NotificationThresholds {
    fn default() -> Self {
        Self {
            error: 1,
            warning: 10,
        }
    }
}

/// Notification configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationPolicy {
    /// Whether notifications are evaluated at all
    pub enabled: bool,
    /// Channel names forwarded to the delivery collaborator
    pub channels: Vec<String>,
    /// Trigger thresholds
    pub thresholds: NotificationThresholds,
}

/// Periodic validation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingPolicy {
    /// Whether scheduled validation is enabled
    pub enabled: bool,
    /// Seconds between scheduled runs
    pub interval_seconds: u64,
    /// Run once immediately when the schedule starts
    pub immediate: bool,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_seconds: 3600,
            immediate: true,
        }
    }
}

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Full JSON serialization
    Json,
    /// Fixed seven-row metric table
    Csv,
    /// Self-contained HTML document
    Html,
    /// JSON content under a `.pdf` name
    Pdf,
}

impl ReportFormat {
    /// File extension for this format.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Html => "html",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.extension())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(value: &str) -> CoreResult<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "html" => Ok(Self::Html),
            "pdf" => Ok(Self::Pdf),
            other => Err(format!("unknown report format: {other}")),
        }
    }
}

/// Report writing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingPolicy {
    /// Formats written by `write_reports`
    pub formats: Vec<ReportFormat>,
    /// Directory reports are written into
    pub output_path: PathBuf,
    /// Include performance and coverage sections in JSON output
    pub include_metrics: bool,
}

impl Default for ReportingPolicy {
    fn default() -> Self {
        Self {
            formats: vec![ReportFormat::Json],
            output_path: PathBuf::from("reports"),
            include_metrics: true,
        }
    }
}

/// Complete configuration of one validation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Whether validation runs at all
    pub enabled: bool,
    /// Built-in validator ids to run, in order
    pub validators: Vec<String>,
    /// Sequential or parallel execution
    pub mode: ExecutionMode,
    /// Per-validator timeout in milliseconds
    pub timeout_ms: u64,
    /// Retries of the whole execution phase
    pub retries: u32,
    /// Base delay between retries in milliseconds, multiplied by the attempt number
    pub retry_delay_ms: u64,
    /// Cache configuration
    pub cache: CachePolicy,
    /// Notification configuration
    pub notifications: NotificationPolicy,
    /// Scheduling configuration
    pub scheduling: SchedulingPolicy,
    /// Reporting configuration
    pub reporting: ReportingPolicy,
    /// Opaque options handed to plugins, keyed by plugin name
    pub plugin_options: BTreeMap<String, JsonValue>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            validators: DEFAULT_VALIDATORS.iter().map(|&id| id.to_owned()).collect(),
            mode: ExecutionMode::Parallel,
            timeout_ms: 30_000,
            retries: 3,
            retry_delay_ms: 1_000,
            cache: CachePolicy::default(),
            notifications: NotificationPolicy::default(),
            scheduling: SchedulingPolicy::default(),
            reporting: ReportingPolicy::default(),
            plugin_options: BTreeMap::new(),
        }
    }
}

/// Per-call override; every present key replaces the base key wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverride {
    /// Overrides `enabled`
    pub enabled: Option<bool>,
    /// Overrides `validators`
    pub validators: Option<Vec<String>>,
    /// Overrides `mode`
    pub mode: Option<ExecutionMode>,
    /// Overrides `timeout_ms`
    pub timeout_ms: Option<u64>,
    /// Overrides `retries`
    pub retries: Option<u32>,
    /// Overrides `retry_delay_ms`
    pub retry_delay_ms: Option<u64>,
    /// Overrides `cache`
    pub cache: Option<CachePolicy>,
    /// Overrides `notifications`
    pub notifications: Option<NotificationPolicy>,
    /// Overrides `scheduling`
    pub scheduling: Option<SchedulingPolicy>,
    /// Overrides `reporting`
    pub reporting: Option<ReportingPolicy>,
    /// Overrides `plugin_options`
    pub plugin_options: Option<BTreeMap<String, JsonValue>>,
}

impl ValidationConfig {
    /// Returns a new config with every key present in `overrides` replaced.
    ///
    /// `self` is left untouched.
    #[must_use]
    pub fn merged(&self, overrides: &ConfigOverride) -> Self {
        let base = self.clone();
        Self {
            enabled: overrides.enabled.unwrap_or(base.enabled),
            validators: overrides.validators.clone().unwrap_or(base.validators),
            mode: overrides.mode.unwrap_or(base.mode),
            timeout_ms: overrides.timeout_ms.unwrap_or(base.timeout_ms),
            retries: overrides.retries.unwrap_or(base.retries),
            retry_delay_ms: overrides.retry_delay_ms.unwrap_or(base.retry_delay_ms),
            cache: overrides.cache.clone().unwrap_or(base.cache),
            notifications: overrides.notifications.clone().unwrap_or(base.notifications),
            scheduling: overrides.scheduling.clone().unwrap_or(base.scheduling),
            reporting: overrides.reporting.clone().unwrap_or(base.reporting),
            plugin_options: overrides
                .plugin_options
                .clone()
                .unwrap_or(base.plugin_options),
        }
    }

    /// Checks values that would make a run meaningless.
    ///
    /// # Errors
    /// Returns [`Error::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(Error::Config("timeout_ms must be greater than zero".to_owned()));
        }
        if self.cache.strategy == CacheStrategy::Memory && self.cache.max_size == 0 {
            return Err(Error::Config(
                "cache.max_size must be greater than zero for the memory strategy".to_owned(),
            ));
        }
        if self.scheduling.enabled && self.scheduling.interval_seconds == 0 {
            return Err(Error::Config(
                "scheduling.interval_seconds must be greater than zero".to_owned(),
            ));
        }
        if let Some((name, _)) = self
            .plugin_options
            .iter()
            .find(|(_, value)| contains_null(value))
        {
            return Err(Error::Config(format!(
                "plugin_options.{name} contains null, which TOML cannot store"
            )));
        }
        Ok(())
    }

    /// Load config from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or is invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        use toml::from_str;
        let contents = fs::read_to_string(path)?;
        let config: Self = from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a TOML file, creating parent directories.
    ///
    /// # Errors
    /// Returns an error if the config is invalid or cannot be serialized or
    /// written.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        use toml::to_string_pretty;
        self.validate()?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let contents = to_string_pretty(self)?;
        let header = "# Vigil compliance configuration\n\
                      # Generated by `vigil init`; edit to customize validation runs\n\n";

        fs::write(path, format!("{header}{contents}"))?;
        Ok(())
    }
}

/// TOML has no null, so such values cannot round-trip through a config file.
fn contains_null(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Array(items) => items.iter().any(contains_null),
        JsonValue::Object(fields) => fields.values().any(contains_null),
        JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::String(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ValidationConfig::default();
        assert!(config.enabled);
        assert_eq!(config.validators, vec!["nsm", "gdpr", "wcag", "locale"]);
        assert_eq!(config.mode, ExecutionMode::Parallel);
        assert_eq!(config.cache.strategy, CacheStrategy::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_override_wins_without_mutating_base() {
        let base = ValidationConfig::default();
        let overrides = ConfigOverride {
            mode: Some(ExecutionMode::Sequential),
            validators: Some(vec!["wcag".to_owned()]),
            cache: Some(CachePolicy {
                strategy: CacheStrategy::None,
                ..CachePolicy::default()
            }),
            ..ConfigOverride::default()
        };

        let merged = base.merged(&overrides);

        assert_eq!(merged.mode, ExecutionMode::Sequential);
        assert_eq!(merged.validators, vec!["wcag"]);
        assert_eq!(merged.cache.strategy, CacheStrategy::None);
        assert_eq!(merged.timeout_ms, base.timeout_ms);
        assert_eq!(base.mode, ExecutionMode::Parallel);
        assert_eq!(base.cache.strategy, CacheStrategy::Memory);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = ValidationConfig {
            timeout_ms: 0,
            ..ValidationConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_cache_size() {
        let config = ValidationConfig {
            cache: CachePolicy {
                max_size: 0,
                ..CachePolicy::default()
            },
            ..ValidationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_null_plugin_option_rejected_before_save() {
        let temp = TempDir::new().expect("temp dir");
        let mut config = ValidationConfig::default();
        config
            .plugin_options
            .insert("house-style".to_owned(), serde_json::json!({ "level": [1, null] }));

        assert!(matches!(config.validate(), Err(Error::Config(_))));
        let saved = config.save_to_file(&temp.path().join("vigil.toml"));
        assert!(matches!(saved, Err(Error::Config(_))));
        assert!(!temp.path().join("vigil.toml").exists());

        config
            .plugin_options
            .insert("house-style".to_owned(), serde_json::json!({ "level": [1, 2] }));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ValidationConfig = match toml::from_str(
            "validators = [\"gdpr\", \"wcag\"]\nmode = \"sequential\"\n\n[cache]\nttl_seconds = 60\n",
        ) {
            Ok(config) => config,
            Err(error) => panic!("parse failed: {error}"),
        };
        assert_eq!(config.validators, vec!["gdpr", "wcag"]);
        assert_eq!(config.mode, ExecutionMode::Sequential);
        assert_eq!(config.cache.ttl_seconds, 60);
        assert_eq!(config.cache.max_size, 100);
        assert_eq!(config.retries, 3);
    }

    #[test]
    fn test_save_and_load_roundtrip() -> Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("nested").join("vigil.toml");
        let config = ValidationConfig {
            timeout_ms: 5_000,
            reporting: ReportingPolicy {
                formats: vec![ReportFormat::Html, ReportFormat::Csv],
                ..ReportingPolicy::default()
            },
            ..ValidationConfig::default()
        };

        config.save_to_file(&path)?;
        let loaded = ValidationConfig::load_from_file(&path)?;

        assert_eq!(loaded, config);
        Ok(())
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("HTML".parse::<ReportFormat>(), Ok(ReportFormat::Html));
        assert!("docx".parse::<ReportFormat>().is_err());
        assert_eq!(
            "sequential".parse::<ExecutionMode>(),
            Ok(ExecutionMode::Sequential)
        );
    }
}
