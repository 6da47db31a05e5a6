//! The compliance engine: config resolution, caching, execution with retry,
//! aggregation, history and notification for one validation call.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use vigil_core::{
    AggregatedResult, CacheStrategy, ConfigOverride, ReportFormat, ValidationConfig,
    ValidatorPlugin,
};

use crate::aggregator::{AggregationInput, aggregate};
use crate::cache::{Fingerprint, ResultCache};
use crate::executor::{ExecutionPhase, ExecutionSettings, Executor};
use crate::exporter;
use crate::history::{ComplianceMetrics, ValidationHistory};
use crate::notifier::{NotificationEvent, NotificationSink, TracingNotifier};
use crate::registry::{ValidatorInfo, ValidatorRegistry};
use crate::resources::{ResourceSampler, ResourceUsage};
use crate::retry::{RetryPolicy, retry_with_backoff};
use crate::{EngineError, Result};

/// Runs validators over source text and keeps the results.
///
/// An explicit context object: construct it, share clones of it, and call
/// [`dispose`](Self::dispose) when done. Clones share the cache, history,
/// registry and notifier.
///
/// Cache and history are shared by concurrent calls without coordination.
/// Two concurrent calls with the same fingerprint both run and the later
/// cache write wins.
#[derive(Clone)]
pub struct ComplianceEngine {
    config: Arc<ValidationConfig>,
    registry: ValidatorRegistry,
    cache: Arc<Mutex<ResultCache>>,
    history: Arc<Mutex<ValidationHistory>>,
    notifier: Arc<dyn NotificationSink>,
    executor: Arc<dyn ExecutionPhase>,
    sampler: Arc<Mutex<ResourceSampler>>,
}

impl ComplianceEngine {
    /// Creates an engine with the built-in validators and a logging notifier.
    ///
    /// # Errors
    /// Returns an error if `config` is invalid.
    pub fn new(config: ValidationConfig) -> Result<Self> {
        config.validate()?;
        let cache = ResultCache::new(config.cache.max_size);
        Ok(Self {
            config: Arc::new(config),
            registry: ValidatorRegistry::new(),
            cache: Arc::new(Mutex::new(cache)),
            history: Arc::new(Mutex::new(ValidationHistory::new())),
            notifier: Arc::new(TracingNotifier),
            executor: Arc::new(Executor),
            sampler: Arc::new(Mutex::new(ResourceSampler::new())),
        })
    }

    /// Replaces the validator registry.
    #[must_use]
    pub fn with_registry(mut self, registry: ValidatorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the notification sink.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replaces the execution phase.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn ExecutionPhase>) -> Self {
        self.executor = executor;
        self
    }

    /// Base configuration.
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validator registry.
    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    /// Validates `code` read from `file_path`.
    ///
    /// `overrides` replace base configuration keys for this call only. A cache
    /// hit returns the stored result with `cache_hit` set and no validator run.
    ///
    /// # Errors
    /// Returns [`EngineError::Disabled`] if validation is disabled, a
    /// configuration error if the merged config is invalid, or
    /// [`EngineError::RetriesExhausted`] if every execution attempt failed.
    pub async fn validate(
        &self,
        code: &str,
        file_path: &str,
        overrides: Option<&ConfigOverride>,
    ) -> Result<AggregatedResult> {
        let started = Instant::now();
        let config = overrides.map_or_else(
            || (*self.config).clone(),
            |overrides| self.config.merged(overrides),
        );
        config.validate()?;
        if !config.enabled {
            return Err(EngineError::Disabled);
        }
        debug!(
            file = file_path,
            validators = ?config.validators,
            mode = ?config.mode,
            timeout_ms = config.timeout_ms,
            "Resolved validation config"
        );

        let fingerprint = self.fingerprint(code, file_path, &config);
        if let Some(key) = fingerprint {
            if let Some(mut cached) = self.cache_lookup(&key) {
                cached.metadata.cache_hit = true;
                cached.metadata.retry_count = 0;
                info!(file = file_path, %key, score = cached.overall_score, "Cache hit");
                return Ok(cached);
            }
            debug!(file = file_path, %key, "Cache miss");
        }

        let validators = self.registry.resolve(&config, file_path);
        let settings =
            ExecutionSettings::new(config.mode, Duration::from_millis(config.timeout_ms));
        let policy = RetryPolicy::new(config.retries, Duration::from_millis(config.retry_delay_ms));
        let shared_code: Arc<str> = Arc::from(code);
        let shared_path: Arc<str> = Arc::from(file_path);
        let (executor, validators, shared_code, shared_path) =
            (&*self.executor, validators.as_slice(), &shared_code, &shared_path);

        let (runs, retry_count) = retry_with_backoff(policy, move |attempt| {
            debug!(attempt, validators = validators.len(), "Executing validators");
            executor.execute(settings, validators, shared_code, shared_path)
        })
        .await?;

        let resources = self.sample_resources();
        let previous = self.lock_history().latest().cloned();
        let result = aggregate(&AggregationInput {
            file_path,
            code,
            runs: &runs,
            previous: previous.as_ref(),
            retry_count,
            elapsed: started.elapsed(),
            resources,
        });

        if let Some(key) = fingerprint {
            self.cache_store(key, &result, &config);
        }
        self.lock_history().push(result.clone());

        if let Some(event) = NotificationEvent::evaluate(&config.notifications, &result) {
            self.notifier.notify(&event);
        }

        info!(
            file = file_path,
            score = result.overall_score,
            compliant = result.overall_compliant,
            issues = result.total_issues,
            validators_run = result.metadata.validators_run.len(),
            retries = retry_count,
            elapsed_ms = result.execution_duration_ms,
            "Validation complete"
        );
        Ok(result)
    }

    /// Summary metrics over the history.
    pub fn metrics(&self) -> ComplianceMetrics {
        self.lock_history().metrics()
    }

    /// Stored results, oldest first.
    pub fn history(&self) -> Vec<AggregatedResult> {
        self.lock_history().iter().cloned().collect()
    }

    /// Removes every cached result.
    pub fn clear_cache(&self) {
        match self.lock_cache() {
            Ok(mut cache) => cache.clear(),
            Err(error) => warn!(%error, "Cache unavailable, nothing cleared"),
        }
    }

    /// Number of cached results, 0 if the cache is unavailable.
    pub fn cache_size(&self) -> usize {
        self.lock_cache().map_or(0, |cache| cache.len())
    }

    /// Renders `result` in `format`.
    ///
    /// # Errors
    /// Returns an error if rendering fails.
    pub fn export(&self, result: &AggregatedResult, format: ReportFormat) -> Result<String> {
        exporter::export(result, format)
    }

    /// Writes `result` in every configured format.
    ///
    /// # Errors
    /// Returns an error if rendering or writing fails.
    pub async fn write_reports(&self, result: &AggregatedResult) -> Result<Vec<PathBuf>> {
        exporter::write_reports(result, &self.config.reporting).await
    }

    /// Registers a runtime plugin.
    ///
    /// # Errors
    /// Returns [`EngineError::InvalidPlugin`] if the plugin is malformed.
    pub fn register_plugin(&self, plugin: Arc<dyn ValidatorPlugin>) -> Result<()> {
        self.registry.register_plugin(plugin)
    }

    /// Unregisters a plugin by name. Returns whether it was registered.
    pub fn unregister_plugin(&self, name: &str) -> bool {
        self.registry.unregister_plugin(name)
    }

    /// Describes every available validator.
    pub fn list_validators(&self) -> Vec<ValidatorInfo> {
        self.registry.list_validators()
    }

    /// Clears the cache and the history.
    pub fn dispose(&self) {
        self.clear_cache();
        self.lock_history().clear();
        info!("Compliance engine disposed");
    }

    fn fingerprint(
        &self,
        code: &str,
        file_path: &str,
        config: &ValidationConfig,
    ) -> Option<Fingerprint> {
        if config.cache.strategy == CacheStrategy::None {
            return None;
        }
        let mut ids = config.validators.clone();
        ids.extend(self.registry.plugin_names());
        match Fingerprint::compute(file_path, code, &ids, config) {
            Ok(key) => Some(key),
            Err(error) => {
                warn!(%error, "Fingerprint unavailable, bypassing cache");
                None
            }
        }
    }

    fn cache_lookup(&self, key: &Fingerprint) -> Option<AggregatedResult> {
        match self.lock_cache() {
            Ok(mut cache) => cache.get(key),
            Err(error) => {
                warn!(%error, "Cache read failed, treating as miss");
                None
            }
        }
    }

    fn cache_store(&self, key: Fingerprint, result: &AggregatedResult, config: &ValidationConfig) {
        match self.lock_cache() {
            Ok(mut cache) => {
                let expired = cache.clear_expired();
                if expired > 0 {
                    debug!(expired, "Dropped expired cache entries");
                }
                cache.set_max_size(config.cache.max_size);
                cache.set(
                    key,
                    result.clone(),
                    Duration::from_secs(config.cache.ttl_seconds),
                );
            }
            Err(error) => warn!(%error, "Cache write failed, result not cached"),
        }
    }

    fn lock_cache(&self) -> Result<MutexGuard<'_, ResultCache>> {
        self.cache
            .lock()
            .map_err(|error| EngineError::Cache(error.to_string()))
    }

    fn lock_history(&self) -> MutexGuard<'_, ValidationHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sample_resources(&self) -> ResourceUsage {
        self.sampler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sample()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::CollectingNotifier;
    use crate::test_support::{BlockingValidator, FlakyExecutor, SlowValidator, StaticPlugin};
    use vigil_core::{CachePolicy, ExecutionMode, NotificationPolicy};

    const IMG_WITHOUT_ALT: &str = "<img src=\"logo.png\">";

    fn only(validators: &[&str]) -> ValidationConfig {
        ValidationConfig {
            validators: validators.iter().map(|&id| id.to_owned()).collect(),
            ..ValidationConfig::default()
        }
    }

    #[tokio::test]
    async fn test_cache_hit_flips_metadata() -> Result<()> {
        let engine = ComplianceEngine::new(only(&["wcag"]))?;
        let first = engine.validate(IMG_WITHOUT_ALT, "Logo.tsx", None).await?;
        let second = engine.validate(IMG_WITHOUT_ALT, "Logo.tsx", None).await?;

        assert!(!first.metadata.cache_hit);
        assert!(second.metadata.cache_hit);
        assert_eq!(second.metadata.retry_count, 0);
        assert_eq!(second.overall_score, first.overall_score);
        assert_eq!(second.validation_results, first.validation_results);
        assert_eq!(engine.cache_size(), 1);
        assert_eq!(engine.history().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_cache_disabled_always_runs() -> Result<()> {
        let mut config = only(&["wcag"]);
        config.cache = CachePolicy {
            strategy: CacheStrategy::None,
            ..CachePolicy::default()
        };
        let engine = ComplianceEngine::new(config)?;
        engine.validate(IMG_WITHOUT_ALT, "Logo.tsx", None).await?;
        let second = engine.validate(IMG_WITHOUT_ALT, "Logo.tsx", None).await?;

        assert!(!second.metadata.cache_hit);
        assert_eq!(engine.cache_size(), 0);
        assert_eq!(engine.history().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_override_changes_fingerprint_without_mutating_base() -> Result<()> {
        let engine = ComplianceEngine::new(only(&["wcag"]))?;
        engine.validate(IMG_WITHOUT_ALT, "Logo.tsx", None).await?;

        let overrides = ConfigOverride {
            mode: Some(ExecutionMode::Sequential),
            ..ConfigOverride::default()
        };
        let result = engine
            .validate(IMG_WITHOUT_ALT, "Logo.tsx", Some(&overrides))
            .await?;

        assert!(!result.metadata.cache_hit);
        assert_eq!(engine.config().mode, ExecutionMode::Parallel);
        assert_eq!(engine.cache_size(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_disabled_touches_nothing() -> Result<()> {
        let engine = ComplianceEngine::new(ValidationConfig::default())?;
        let overrides = ConfigOverride {
            enabled: Some(false),
            ..ConfigOverride::default()
        };
        let outcome = engine.validate("code", "a.ts", Some(&overrides)).await;

        assert!(matches!(outcome, Err(EngineError::Disabled)));
        assert_eq!(engine.cache_size(), 0);
        assert!(engine.history().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_override_rejected() -> Result<()> {
        let engine = ComplianceEngine::new(ValidationConfig::default())?;
        let overrides = ConfigOverride {
            timeout_ms: Some(0),
            ..ConfigOverride::default()
        };
        let outcome = engine.validate("code", "a.ts", Some(&overrides)).await;
        assert!(matches!(outcome, Err(EngineError::Core(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_notifications_follow_thresholds() -> Result<()> {
        let notifier = Arc::new(CollectingNotifier::new());
        let mut config = only(&["wcag"]);
        config.notifications = NotificationPolicy {
            enabled: true,
            channels: vec!["teams".to_owned()],
            ..NotificationPolicy::default()
        };
        let engine = ComplianceEngine::new(config)?
            .with_notifier(Arc::clone(&notifier) as Arc<dyn NotificationSink>);

        engine.validate("<p>ok</p>", "Ok.tsx", None).await?;
        assert!(notifier.events().is_empty());

        engine.validate(IMG_WITHOUT_ALT, "Logo.tsx", None).await?;
        let events = notifier.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].error_count, 1);
        assert_eq!(events[0].file_path, "Logo.tsx");
        Ok(())
    }

    #[tokio::test]
    async fn test_timed_out_validator_contributes_nothing() -> Result<()> {
        let registry = ValidatorRegistry::new()
            .with_validator(Arc::new(SlowValidator::new("slow", Duration::from_secs(10))));
        let mut config = only(&["slow", "wcag"]);
        config.timeout_ms = 100;
        let engine = ComplianceEngine::new(config)?.with_registry(registry);

        let started = Instant::now();
        let result = engine.validate(IMG_WITHOUT_ALT, "Logo.tsx", None).await?;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(result.metadata.validators_run, vec!["wcag"]);
        assert_eq!(result.overall_score, 85);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_validator_result_is_not_merged() -> Result<()> {
        let registry = ValidatorRegistry::new()
            .with_validator(Arc::new(BlockingValidator::new(Duration::from_millis(600))));
        let mut config = only(&["blocking", "wcag"]);
        config.timeout_ms = 100;
        let engine = ComplianceEngine::new(config)?.with_registry(registry);

        let started = Instant::now();
        let result = engine.validate(IMG_WITHOUT_ALT, "Logo.tsx", None).await?;

        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(result.metadata.validators_run, vec!["wcag"]);
        assert!(!result.validation_results.contains_key("blocking"));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_phases_are_retried_and_counted() -> Result<()> {
        let executor = Arc::new(FlakyExecutor::new(2));
        let mut config = only(&["wcag"]);
        config.retries = 3;
        config.retry_delay_ms = 1;
        let engine = ComplianceEngine::new(config)?
            .with_executor(Arc::clone(&executor) as Arc<dyn ExecutionPhase>);

        let result = engine.validate(IMG_WITHOUT_ALT, "Logo.tsx", None).await?;

        assert_eq!(executor.calls(), 3);
        assert_eq!(result.metadata.retry_count, 2);
        assert_eq!(result.metadata.validators_run, vec!["wcag"]);
        assert_eq!(engine.history().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_exhausted_retries_store_nothing() -> Result<()> {
        let executor = Arc::new(FlakyExecutor::new(u32::MAX));
        let mut config = only(&["wcag"]);
        config.retries = 2;
        config.retry_delay_ms = 1;
        let engine = ComplianceEngine::new(config)?
            .with_executor(Arc::clone(&executor) as Arc<dyn ExecutionPhase>);

        let outcome = engine.validate(IMG_WITHOUT_ALT, "Logo.tsx", None).await;

        assert!(matches!(
            outcome,
            Err(EngineError::RetriesExhausted { attempts: 3, .. })
        ));
        assert_eq!(executor.calls(), 3);
        assert_eq!(engine.cache_size(), 0);
        assert!(engine.history().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_entries_swept_on_store() -> Result<()> {
        let mut config = only(&["wcag"]);
        config.cache = CachePolicy {
            ttl_seconds: 0,
            ..CachePolicy::default()
        };
        let engine = ComplianceEngine::new(config)?;
        engine.validate(IMG_WITHOUT_ALT, "Logo.tsx", None).await?;
        engine.validate(IMG_WITHOUT_ALT, "Banner.tsx", None).await?;

        assert_eq!(engine.cache_size(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_plugins_run_and_report_under_their_name() -> Result<()> {
        let engine = ComplianceEngine::new(only(&["nsm"]))?;
        engine.register_plugin(Arc::new(StaticPlugin::new("house-style", 60)))?;

        let result = engine.validate("// ÅPEN\nconst a = 1;", "a.ts", None).await?;
        assert_eq!(result.metadata.validators_run, vec!["nsm", "house-style"]);
        assert_eq!(result.overall_score, 80);
        assert_eq!(engine.list_validators().len(), 5);

        assert!(engine.unregister_plugin("house-style"));
        let after = engine.validate("// ÅPEN\nconst a = 1;", "a.ts", None).await?;
        assert!(!after.metadata.cache_hit);
        assert_eq!(after.metadata.validators_run, vec!["nsm"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_trends_and_metrics_accumulate() -> Result<()> {
        let engine = ComplianceEngine::new(only(&["wcag"]))?;
        engine.validate(IMG_WITHOUT_ALT, "Logo.tsx", None).await?;
        let fixed = engine
            .validate("<img src=\"logo.png\" alt=\"Logo\">", "Logo.tsx", None)
            .await?;

        assert_eq!(fixed.trends.score_improvement, 15);
        assert_eq!(fixed.trends.issue_reduction, 1);

        let metrics = engine.metrics();
        assert_eq!(metrics.total_validations, 2);
        assert!((metrics.compliance_rate - 50.0).abs() < f64::EPSILON);
        Ok(())
    }

    #[tokio::test]
    async fn test_dispose_clears_state() -> Result<()> {
        let engine = ComplianceEngine::new(only(&["wcag"]))?;
        let clone = engine.clone();
        engine.validate(IMG_WITHOUT_ALT, "Logo.tsx", None).await?;
        clone.dispose();

        assert_eq!(engine.cache_size(), 0);
        assert!(engine.history().is_empty());
        Ok(())
    }
}
