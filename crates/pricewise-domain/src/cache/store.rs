//! The key-value store interface the resolution engine caches through.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheResult;
use crate::model::DiscountPolicySnapshot;

/// Key-value store holding serialized policy snapshots.
///
/// Implementations must be safe to call concurrently and must report a
/// missing key as "no entry" rather than an error.
#[async_trait]
pub trait PolicyCacheStore: Send + Sync {
    /// Fetches every present key in one round trip.
    ///
    /// Keys without an entry are simply absent from the returned map.
    async fn multi_get(
        &self,
        keys: &[String],
    ) -> CacheResult<HashMap<String, DiscountPolicySnapshot>>;

    /// Fetches a single entry.
    async fn get(&self, key: &str) -> CacheResult<Option<DiscountPolicySnapshot>>;

    /// Stores `snapshot` under `key`, expiring after `ttl`.
    async fn set(
        &self,
        key: &str,
        snapshot: &DiscountPolicySnapshot,
        ttl: Duration,
    ) -> CacheResult<()>;
}
