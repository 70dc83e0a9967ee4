//! Read-compare-write guard that keeps the cache from regressing.
//!
//! Two resolutions missing the same key concurrently may both fall through to
//! the repository and both try to populate the cache. The guard only lets a
//! write through when nothing is cached yet or when the candidate policy
//! started strictly later than the cached one, so the cache converges on the
//! most recently activated policy without a lock. A redundant write may be
//! discarded; a newer policy is never overwritten by an older one.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use super::store::PolicyCacheStore;
use crate::model::DiscountPolicySnapshot;

/// What the guard did with a candidate write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The candidate was stored.
    Written,
    /// An equal-or-newer policy is already cached.
    SkippedNotNewer,
    /// The candidate's validity window has already closed.
    SkippedExpired,
    /// The cache store failed; nothing is known to have been written.
    Failed,
}

impl WriteOutcome {
    /// Label used for the `pricewise_cache_write_skips_total` metric.
    pub fn skip_reason(&self) -> Option<&'static str> {
        match self {
            WriteOutcome::Written => None,
            WriteOutcome::SkippedNotNewer => Some("not_newer"),
            WriteOutcome::SkippedExpired => Some("expired"),
            WriteOutcome::Failed => Some("cache_error"),
        }
    }
}

/// Guards cache writes against stale policies.
pub struct StalenessGuard<C: PolicyCacheStore + ?Sized> {
    cache: Arc<C>,
}

impl<C: PolicyCacheStore + ?Sized> Clone for StalenessGuard<C> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<C: PolicyCacheStore + ?Sized> StalenessGuard<C> {
    pub fn new(cache: Arc<C>) -> Self {
        Self { cache }
    }

    /// Attempts to cache `candidate` under `key` as of now.
    pub async fn try_write(&self, key: &str, candidate: &DiscountPolicySnapshot) -> WriteOutcome {
        self.try_write_at(key, candidate, Utc::now()).await
    }

    /// Attempts to cache `candidate` under `key` as of `now`.
    ///
    /// Never returns an error: cache failures are logged and reported as
    /// [`WriteOutcome::Failed`].
    #[instrument(skip(self, candidate), fields(valid_from = %candidate.valid_from))]
    pub async fn try_write_at(
        &self,
        key: &str,
        candidate: &DiscountPolicySnapshot,
        now: DateTime<Utc>,
    ) -> WriteOutcome {
        let outcome = self.compare_and_write(key, candidate, now).await;
        if let Some(reason) = outcome.skip_reason() {
            metrics::counter!("pricewise_cache_write_skips_total", "reason" => reason)
                .increment(1);
        }
        outcome
    }

    async fn compare_and_write(
        &self,
        key: &str,
        candidate: &DiscountPolicySnapshot,
        now: DateTime<Utc>,
    ) -> WriteOutcome {
        // A non-positive remaining window cannot be expressed as a TTL.
        let ttl = match (candidate.valid_until - now).to_std() {
            Ok(ttl) if !ttl.is_zero() => ttl,
            _ => {
                debug!(valid_until = %candidate.valid_until, "policy already expired, not caching");
                return WriteOutcome::SkippedExpired;
            }
        };

        let current = match self.cache.get(key).await {
            Ok(current) => current,
            Err(e) => {
                warn!(error = %e, "policy cache read failed, skipping write");
                return WriteOutcome::Failed;
            }
        };

        if let Some(cached) = current {
            if candidate.valid_from <= cached.valid_from {
                debug!(cached_valid_from = %cached.valid_from, "equal or newer policy already cached");
                return WriteOutcome::SkippedNotNewer;
            }
        }

        match self.cache.set(key, candidate, ttl).await {
            Ok(()) => WriteOutcome::Written,
            Err(e) => {
                warn!(error = %e, "policy cache write failed");
                WriteOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keys::product_key;
    use crate::cache::moka_store::{MokaPolicyCache, PolicyCacheConfig};
    use crate::error::{CacheError, CacheResult};
    use crate::model::IssueType;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::collections::HashMap;

    fn snapshot_starting_at(start: DateTime<Utc>, rate: u32) -> DiscountPolicySnapshot {
        DiscountPolicySnapshot::rate(IssueType::Product, 1, rate, start, start + Duration::days(7))
    }

    fn guard() -> (Arc<MokaPolicyCache>, StalenessGuard<MokaPolicyCache>) {
        let cache = Arc::new(MokaPolicyCache::new(PolicyCacheConfig::default()));
        (Arc::clone(&cache), StalenessGuard::new(cache))
    }

    /// Cache whose every operation fails.
    struct UnavailableCache;

    #[async_trait]
    impl PolicyCacheStore for UnavailableCache {
        async fn multi_get(
            &self,
            _keys: &[String],
        ) -> CacheResult<HashMap<String, DiscountPolicySnapshot>> {
            Err(CacheError::Unavailable {
                message: "connection refused".to_string(),
            })
        }

        async fn get(&self, _key: &str) -> CacheResult<Option<DiscountPolicySnapshot>> {
            Err(CacheError::Unavailable {
                message: "connection refused".to_string(),
            })
        }

        async fn set(
            &self,
            _key: &str,
            _snapshot: &DiscountPolicySnapshot,
            _ttl: std::time::Duration,
        ) -> CacheResult<()> {
            Err(CacheError::Unavailable {
                message: "connection refused".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_writes_when_key_absent() {
        let (cache, guard) = guard();
        let now = Utc::now();
        let candidate = snapshot_starting_at(now - Duration::hours(1), 10);

        let outcome = guard.try_write_at(&product_key(1), &candidate, now).await;

        assert_eq!(outcome, WriteOutcome::Written);
        assert_eq!(cache.get(&product_key(1)).await.unwrap(), Some(candidate));
    }

    #[tokio::test]
    async fn test_newer_policy_replaces_cached_one() {
        let (cache, guard) = guard();
        let now = Utc::now();
        let older = snapshot_starting_at(now - Duration::days(2), 10);
        let newer = snapshot_starting_at(now - Duration::hours(1), 20);

        guard.try_write_at(&product_key(1), &older, now).await;
        let outcome = guard.try_write_at(&product_key(1), &newer, now).await;

        assert_eq!(outcome, WriteOutcome::Written);
        assert_eq!(cache.get(&product_key(1)).await.unwrap(), Some(newer));
    }

    #[tokio::test]
    async fn test_older_policy_leaves_cache_unchanged() {
        let (cache, guard) = guard();
        let now = Utc::now();
        let newer = snapshot_starting_at(now - Duration::hours(1), 20);
        let older = snapshot_starting_at(now - Duration::days(2), 10);

        guard.try_write_at(&product_key(1), &newer, now).await;
        let outcome = guard.try_write_at(&product_key(1), &older, now).await;

        assert_eq!(outcome, WriteOutcome::SkippedNotNewer);
        assert_eq!(cache.get(&product_key(1)).await.unwrap(), Some(newer));
    }

    #[tokio::test]
    async fn test_same_start_is_not_rewritten() {
        let (cache, guard) = guard();
        let now = Utc::now();
        let start = now - Duration::hours(1);
        let first = snapshot_starting_at(start, 10);
        let second = snapshot_starting_at(start, 30);

        guard.try_write_at(&product_key(1), &first, now).await;
        let outcome = guard.try_write_at(&product_key(1), &second, now).await;

        assert_eq!(outcome, WriteOutcome::SkippedNotNewer);
        assert_eq!(cache.get(&product_key(1)).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_expired_policy_is_never_written() {
        let (cache, guard) = guard();
        let now = Utc::now();
        let expired = DiscountPolicySnapshot::rate(
            IssueType::Product,
            1,
            10,
            now - Duration::days(2),
            now - Duration::seconds(1),
        );

        let outcome = guard.try_write_at(&product_key(1), &expired, now).await;

        assert_eq!(outcome, WriteOutcome::SkippedExpired);
        assert!(cache.get(&product_key(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_policy_ending_exactly_now_is_expired() {
        let (_cache, guard) = guard();
        let now = Utc::now();
        let ending_now =
            DiscountPolicySnapshot::rate(IssueType::Product, 1, 10, now - Duration::days(1), now);

        let outcome = guard.try_write_at(&product_key(1), &ending_now, now).await;

        assert_eq!(outcome, WriteOutcome::SkippedExpired);
    }

    #[tokio::test]
    async fn test_cache_failure_is_reported_not_raised() {
        let guard = StalenessGuard::new(Arc::new(UnavailableCache));
        let now = Utc::now();
        let candidate = snapshot_starting_at(now - Duration::hours(1), 10);

        let outcome = guard.try_write_at(&product_key(1), &candidate, now).await;

        assert_eq!(outcome, WriteOutcome::Failed);
    }

    #[tokio::test]
    async fn test_concurrent_writers_converge_on_newest_policy() {
        let (cache, guard) = guard();
        let now = Utc::now();
        let candidates: Vec<DiscountPolicySnapshot> = (0..8)
            .map(|i| snapshot_starting_at(now - Duration::hours(10 - i), i as u32))
            .collect();

        let handles: Vec<_> = candidates
            .iter()
            .cloned()
            .map(|candidate| {
                let guard = guard.clone();
                tokio::spawn(async move {
                    guard.try_write_at(&product_key(1), &candidate, now).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        // Every interleaving ends with the newest policy cached unless a
        // newer write raced between another writer's read and set.
        let cached = cache.get(&product_key(1)).await.unwrap().unwrap();
        let newest = candidates.last().unwrap();
        assert!(cached.valid_from <= newest.valid_from);

        let outcome = guard.try_write_at(&product_key(1), newest, now).await;
        if cached.valid_from == newest.valid_from {
            assert_eq!(outcome, WriteOutcome::SkippedNotNewer);
        } else {
            assert_eq!(outcome, WriteOutcome::Written);
        }
        assert_eq!(cache.get(&product_key(1)).await.unwrap().as_ref(), Some(newest));
    }

    #[test]
    fn test_skip_reasons() {
        assert_eq!(WriteOutcome::Written.skip_reason(), None);
        assert_eq!(WriteOutcome::SkippedExpired.skip_reason(), Some("expired"));
        assert_eq!(WriteOutcome::SkippedNotNewer.skip_reason(), Some("not_newer"));
        assert_eq!(WriteOutcome::Failed.skip_reason(), Some("cache_error"));
    }
}
