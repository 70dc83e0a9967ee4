//! In-process policy cache backed by Moka.
//!
//! Entries are stored as JSON payloads, the same form a networked key-value
//! store would hold, and each entry carries its own TTL derived from the
//! policy validity window rather than a cache-wide duration.
//!
//! # Example
//!
//! ```rust,ignore
//! use pricewise_domain::cache::{MokaPolicyCache, PolicyCacheConfig, PolicyCacheStore};
//! use std::time::Duration;
//!
//! let cache = MokaPolicyCache::new(PolicyCacheConfig::default());
//! cache.set(&snapshot.cache_key(), &snapshot, Duration::from_secs(60)).await?;
//! let hit = cache.get(&snapshot.cache_key()).await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use tracing::warn;

use super::store::PolicyCacheStore;
use crate::error::{CacheError, CacheResult};
use crate::model::DiscountPolicySnapshot;

/// Configuration for [`MokaPolicyCache`].
#[derive(Debug, Clone)]
pub struct PolicyCacheConfig {
    /// Maximum number of entries held in memory.
    pub max_capacity: u64,
}

impl Default for PolicyCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 100_000,
        }
    }
}

impl PolicyCacheConfig {
    /// Sets the maximum capacity.
    pub fn with_max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }
}

/// A serialized snapshot together with the TTL it was written with.
#[derive(Debug, Clone)]
struct CachedPolicy {
    payload: Arc<str>,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<String, CachedPolicy> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedPolicy,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedPolicy,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Policy cache using Moka's async cache for lock-free concurrent access.
///
/// # Metrics
///
/// - `pricewise_cache_hits_total` - Incremented per key found
/// - `pricewise_cache_misses_total` - Incremented per key not found
/// - `pricewise_cache_writes_total` - Incremented per successful `set`
pub struct MokaPolicyCache {
    cache: Cache<String, CachedPolicy>,
    config: PolicyCacheConfig,
}

impl std::fmt::Debug for MokaPolicyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaPolicyCache")
            .field("config", &self.config)
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

impl MokaPolicyCache {
    /// Creates a new policy cache with the given configuration.
    pub fn new(config: PolicyCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self { cache, config }
    }

    /// Returns the configuration for this cache.
    pub fn config(&self) -> &PolicyCacheConfig {
        &self.config
    }

    /// Removes a single entry.
    pub async fn invalidate(&self, key: &str) {
        self.cache.invalidate(key).await;
    }

    /// Returns the approximate number of entries in the cache.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs pending maintenance tasks such as expirations.
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }

    /// Stores a raw payload, bypassing serialization. Used to simulate entries
    /// written by other producers.
    #[doc(hidden)]
    pub async fn insert_raw(&self, key: &str, payload: &str, ttl: Duration) {
        self.cache
            .insert(
                key.to_string(),
                CachedPolicy {
                    payload: Arc::from(payload),
                    ttl,
                },
            )
            .await;
    }

    /// Looks up and decodes one entry, dropping it if the payload is corrupt.
    async fn lookup(&self, key: &str) -> Option<DiscountPolicySnapshot> {
        let cached = self.cache.get(key).await?;
        match serde_json::from_str::<DiscountPolicySnapshot>(&cached.payload) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(key, error = %e, "dropping undecodable policy cache entry");
                self.cache.invalidate(key).await;
                None
            }
        }
    }
}

#[async_trait]
impl PolicyCacheStore for MokaPolicyCache {
    async fn multi_get(
        &self,
        keys: &[String],
    ) -> CacheResult<HashMap<String, DiscountPolicySnapshot>> {
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(snapshot) = self.lookup(key).await {
                found.insert(key.clone(), snapshot);
            }
        }

        let hits = found.len() as u64;
        metrics::counter!("pricewise_cache_hits_total").increment(hits);
        metrics::counter!("pricewise_cache_misses_total").increment(keys.len() as u64 - hits);

        Ok(found)
    }

    async fn get(&self, key: &str) -> CacheResult<Option<DiscountPolicySnapshot>> {
        Ok(self.lookup(key).await)
    }

    async fn set(
        &self,
        key: &str,
        snapshot: &DiscountPolicySnapshot,
        ttl: Duration,
    ) -> CacheResult<()> {
        let payload =
            serde_json::to_string(snapshot).map_err(|e| CacheError::Serialization {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        self.cache
            .insert(
                key.to_string(),
                CachedPolicy {
                    payload: Arc::from(payload),
                    ttl,
                },
            )
            .await;
        metrics::counter!("pricewise_cache_writes_total").increment(1);

        Ok(())
    }
}

/// Registers policy cache metrics descriptions.
///
/// Call once during application startup; optional, but gives the exporter
/// human-readable descriptions.
pub fn register_policy_cache_metrics() {
    metrics::describe_counter!(
        "pricewise_cache_hits_total",
        "Total number of policy cache keys found"
    );
    metrics::describe_counter!(
        "pricewise_cache_misses_total",
        "Total number of policy cache keys not found"
    );
    metrics::describe_counter!(
        "pricewise_cache_writes_total",
        "Total number of policy snapshots written to the cache"
    );
    metrics::describe_counter!(
        "pricewise_cache_write_skips_total",
        "Total number of cache writes skipped by the staleness guard"
    );
    metrics::describe_counter!(
        "pricewise_repository_fallbacks_total",
        "Total number of batched policy repository lookups"
    );
}
