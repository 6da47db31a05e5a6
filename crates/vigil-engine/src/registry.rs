//! Registry of built-in validators and runtime plugins.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{info, warn};
use vigil_core::{
    Error as CoreError, PluginMetadata, Result as CoreResult, ValidationConfig, Validator,
    ValidatorPlugin, ValidatorReport,
};
use vigil_validators::builtin_validators;

use crate::{EngineError, Result};

type ValidatorList = Vec<Arc<dyn Validator>>;
type PluginList = Vec<Arc<dyn ValidatorPlugin>>;

/// Where a validator comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorKind {
    /// Shipped with the engine
    Builtin,
    /// Registered at runtime
    Plugin,
}

/// Listing entry for one validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorInfo {
    /// Id used in configuration and results
    pub id: String,
    /// Built-in or plugin
    pub kind: ValidatorKind,
    /// What the validator checks
    pub description: String,
    /// Plugin version, if a plugin
    pub version: Option<String>,
    /// File extensions the validator runs on; empty means all
    pub supported_file_types: Vec<String>,
}

/// Holds built-in validators and runtime plugins behind the [`Validator`] contract.
///
/// Cloning shares the plugin table. Registration is not atomic with respect
/// to validation runs already in flight.
#[derive(Clone)]
pub struct ValidatorRegistry {
    builtins: Arc<ValidatorList>,
    plugins: Arc<RwLock<PluginList>>,
}

impl ValidatorRegistry {
    /// Creates a registry with every built-in validator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            builtins: Arc::new(builtin_validators()),
            plugins: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Creates a registry with no validators.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            builtins: Arc::new(Vec::new()),
            plugins: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Adds a validator selectable by id, replacing any validator or plugin
    /// with the same id.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        if self.unregister_plugin(validator.id()) {
            warn!(validator = validator.id(), "Validator replaced a plugin with the same name");
        }
        let builtins = Arc::make_mut(&mut self.builtins);
        builtins.retain(|existing| existing.id() != validator.id());
        builtins.push(validator);
        self
    }

    /// Registers a plugin, replacing any plugin with the same name.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidPlugin`] if the name or version is empty
    /// or the name collides with a selectable validator id.
    pub fn register_plugin(&self, plugin: Arc<dyn ValidatorPlugin>) -> Result<()> {
        let name = plugin.name().trim();
        if name.is_empty() {
            return Err(EngineError::InvalidPlugin(
                "plugin name must not be empty".to_owned(),
            ));
        }
        if plugin.version().trim().is_empty() {
            return Err(EngineError::InvalidPlugin(format!(
                "plugin '{name}' has no version"
            )));
        }
        if self.builtins.iter().any(|builtin| builtin.id() == name) {
            return Err(EngineError::InvalidPlugin(format!(
                "plugin '{name}' collides with a built-in validator"
            )));
        }

        let mut plugins = self.plugins.write().unwrap_or_else(PoisonError::into_inner);
        let replaced = plugins.iter().any(|existing| existing.name() == name);
        plugins.retain(|existing| existing.name() != name);
        info!(
            plugin = name,
            version = plugin.version(),
            replaced,
            "Registered validator plugin"
        );
        plugins.push(plugin);
        Ok(())
    }

    /// Removes a plugin by name. Returns whether it was registered.
    pub fn unregister_plugin(&self, name: &str) -> bool {
        let mut plugins = self.plugins.write().unwrap_or_else(PoisonError::into_inner);
        let before = plugins.len();
        plugins.retain(|plugin| plugin.name() != name);
        let removed = plugins.len() != before;
        if removed {
            info!(plugin = name, "Unregistered validator plugin");
        }
        removed
    }

    /// Names of the registered plugins in registration order.
    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|plugin| plugin.name().to_owned())
            .collect()
    }

    /// Describes every selectable validator, then every plugin.
    pub fn list_validators(&self) -> Vec<ValidatorInfo> {
        let mut infos: Vec<ValidatorInfo> = self
            .builtins
            .iter()
            .map(|validator| ValidatorInfo {
                id: validator.id().to_owned(),
                kind: ValidatorKind::Builtin,
                description: validator.description().to_owned(),
                version: None,
                supported_file_types: Vec::new(),
            })
            .collect();

        let plugins = self.plugins.read().unwrap_or_else(PoisonError::into_inner);
        infos.extend(plugins.iter().map(|plugin| {
            let metadata = plugin.metadata();
            ValidatorInfo {
                id: plugin.name().to_owned(),
                kind: ValidatorKind::Plugin,
                description: metadata.description,
                version: Some(plugin.version().to_owned()),
                supported_file_types: metadata.supported_file_types,
            }
        }));
        infos
    }

    /// Resolves the validators to run for one file.
    ///
    /// Selected validators come first in configured order, followed by every
    /// plugin that supports the file's extension. Unknown ids are skipped and
    /// every id resolves at most once.
    pub fn resolve(&self, config: &ValidationConfig, file_path: &str) -> Vec<Arc<dyn Validator>> {
        let mut resolved: Vec<Arc<dyn Validator>> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for id in &config.validators {
            if seen.contains(id) {
                warn!(validator = %id, "Duplicate validator id, running it once");
                continue;
            }
            if let Some(validator) = self.builtins.iter().find(|validator| validator.id() == id) {
                seen.insert(id.clone());
                resolved.push(Arc::clone(validator));
            } else if !self.has_plugin(id) {
                warn!(validator = %id, "Unknown validator id, skipping");
            }
        }

        let plugins = self.plugins.read().unwrap_or_else(PoisonError::into_inner);
        for plugin in plugins.iter() {
            if !supports_file(&plugin.metadata(), file_path) {
                continue;
            }
            if !seen.insert(plugin.name().to_owned()) {
                warn!(plugin = plugin.name(), "Plugin shadowed by a validator with the same id");
                continue;
            }
            let options = config
                .plugin_options
                .get(plugin.name())
                .cloned()
                .unwrap_or(JsonValue::Null);
            resolved.push(Arc::new(PluginValidator {
                plugin: Arc::clone(plugin),
                options,
            }));
        }
        resolved
    }

    fn has_plugin(&self, name: &str) -> bool {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|plugin| plugin.name() == name)
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns true if `metadata` accepts `file_path` by extension.
fn supports_file(metadata: &PluginMetadata, file_path: &str) -> bool {
    if metadata.supported_file_types.is_empty() {
        return true;
    }
    let Some(extension) = Path::new(file_path).extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    metadata
        .supported_file_types
        .iter()
        .any(|supported| supported.trim_start_matches('.').eq_ignore_ascii_case(extension))
}

/// Adapts a [`ValidatorPlugin`] to the [`Validator`] contract.
struct PluginValidator {
    plugin: Arc<dyn ValidatorPlugin>,
    options: JsonValue,
}

#[async_trait]
impl Validator for PluginValidator {
    fn id(&self) -> &str {
        self.plugin.name()
    }

    async fn validate(&self, code: &str, file_path: &str) -> CoreResult<ValidatorReport> {
        let mut report = self.plugin.validate(code, file_path, &self.options).await?;
        if report.score > 100 {
            return Err(CoreError::InvalidPlugin(format!(
                "plugin '{}' reported score {} outside 0..=100",
                self.plugin.name(),
                report.score
            )));
        }
        self.plugin.name().clone_into(&mut report.validator);
        Ok(report)
    }
}
