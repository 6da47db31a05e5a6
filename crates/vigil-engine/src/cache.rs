//! Result cache keyed by content and configuration fingerprints.
//!
//! Entries expire after their TTL and are evicted in insertion order (FIFO)
//! once the cache is full. Reading an entry does not refresh its position.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::{Hash as _, Hasher as _};
use std::time::{Duration, Instant};

use tracing::debug;
use vigil_core::{AggregatedResult, ValidationConfig};

use crate::Result;

/// Composite cache key for one (path, content, validator set, config) tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Computes the fingerprint of a validation request.
    ///
    /// Validator ids are sorted first, so their order does not matter.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be serialized.
    pub fn compute(
        file_path: &str,
        code: &str,
        validator_ids: &[String],
        config: &ValidationConfig,
    ) -> Result<Self> {
        let mut content_hasher = DefaultHasher::new();
        code.hash(&mut content_hasher);
        let content_hash = content_hasher.finish();

        let mut ids: Vec<&str> = validator_ids.iter().map(String::as_str).collect();
        ids.sort_unstable();
        ids.dedup();

        let config_json = serde_json::to_string(config)?;
        let mut config_hasher = DefaultHasher::new();
        config_json.hash(&mut config_hasher);
        let config_hash = config_hasher.finish();

        let mut hasher = DefaultHasher::new();
        file_path.hash(&mut hasher);
        content_hash.hash(&mut hasher);
        ids.hash(&mut hasher);
        config_hash.hash(&mut hasher);
        Ok(Self(hasher.finish()))
    }

    /// Wraps a raw hash value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:016x}", self.0)
    }
}

/// A cached result with its expiry.
#[derive(Debug, Clone)]
pub struct CachedResult {
    /// The cached result
    pub result: AggregatedResult,
    /// When this entry was created
    pub created_at: Instant,
    /// When this entry expires
    pub expires_at: Instant,
}

impl CachedResult {
    /// Creates a new entry that expires after `ttl`.
    pub fn new(result: AggregatedResult, ttl: Duration) -> Self {
        let created_at = Instant::now();
        Self {
            result,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    /// Checks if this entry has expired
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory result cache with TTL expiry and FIFO eviction.
#[derive(Debug)]
pub struct ResultCache {
    storage: HashMap<Fingerprint, CachedResult>,
    order: VecDeque<Fingerprint>,
    max_size: usize,
}

impl ResultCache {
    /// Creates an empty cache holding at most `max_size` entries.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            storage: HashMap::new(),
            order: VecDeque::new(),
            max_size,
        }
    }

    /// Gets a cached result if it exists and hasn't expired.
    ///
    /// Expired entries are removed on access.
    pub fn get(&mut self, key: &Fingerprint) -> Option<AggregatedResult> {
        if let Some(cached) = self.storage.get(key) {
            if !cached.is_expired() {
                return Some(cached.result.clone());
            }
            debug!(%key, "Cache entry expired");
            self.delete(key);
        }
        None
    }

    /// Stores a result under `key`.
    ///
    /// Replacing an existing key keeps its insertion position. Inserting a
    /// new key into a full cache first evicts the oldest-inserted entry.
    pub fn set(&mut self, key: Fingerprint, result: AggregatedResult, ttl: Duration) {
        if self.max_size == 0 {
            return;
        }

        let cached = CachedResult::new(result, ttl);
        if let Some(existing) = self.storage.get_mut(&key) {
            *existing = cached;
            return;
        }

        while self.storage.len() >= self.max_size {
            if !self.evict_oldest() {
                break;
            }
        }
        self.order.push_back(key);
        self.storage.insert(key, cached);
    }

    /// Removes a specific entry. Returns whether it was present.
    pub fn delete(&mut self, key: &Fingerprint) -> bool {
        if self.storage.remove(key).is_some() {
            self.order.retain(|queued| queued != key);
            true
        } else {
            false
        }
    }

    /// Changes the capacity, evicting the oldest entries if it shrinks.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        while self.storage.len() > max_size {
            if !self.evict_oldest() {
                break;
            }
        }
    }

    /// Clears all expired entries. Returns how many were removed.
    pub fn clear_expired(&mut self) -> usize {
        let expired: Vec<Fingerprint> = self
            .storage
            .iter()
            .filter(|(_, cached)| cached.is_expired())
            .map(|(key, _)| *key)
            .collect();

        for key in &expired {
            self.delete(key);
        }
        expired.len()
    }

    /// Clears all entries from the cache
    pub fn clear(&mut self) {
        self.storage.clear();
        self.order.clear();
    }

    /// Returns the number of entries in the cache
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Returns whether `key` is present, expired or not.
    pub fn contains(&self, key: &Fingerprint) -> bool {
        self.storage.contains_key(key)
    }

    /// Evicts the oldest-inserted entry. Returns false if the cache was empty.
    fn evict_oldest(&mut self) -> bool {
        let Some(oldest) = self.order.pop_front() else {
            return false;
        };
        self.storage.remove(&oldest);
        debug!(key = %oldest, "Evicted oldest cache entry");
        true
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(100)
    }
}
