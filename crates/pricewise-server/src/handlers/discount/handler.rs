//! Batch discount resolution handler implementation.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use pricewise_domain::cache::{CandidateKeys, PolicyCacheStore, StalenessGuard, WriteOutcome};
use pricewise_domain::model::{DiscountPolicySnapshot, PriceableItem};
use pricewise_domain::resolver::{PolicyRepository, ResolutionConfig, NO_DISCOUNT_SHARE_RATIO};
use tracing::{debug, instrument, warn};

use super::types::{
    PriceCalculationRequest, RequestKey, ResolutionError, ResolutionResult, ResolutionSummary,
};

/// Handler for batch discount resolution.
///
/// Resolves a whole batch of items with bounded I/O:
/// 1. Intra-batch deduplication by (product, seller)
/// 2. One cache multi-get over the deduplicated candidate keys
/// 3. At most one repository call for everything the cache missed
///
/// Repository results are written back through the [`StalenessGuard`].
pub struct DiscountResolutionHandler<R, C>
where
    R: PolicyRepository,
    C: PolicyCacheStore,
{
    repository: Arc<R>,
    cache: Arc<C>,
    guard: StalenessGuard<C>,
    config: ResolutionConfig,
}

impl<R, C> DiscountResolutionHandler<R, C>
where
    R: PolicyRepository,
    C: PolicyCacheStore,
{
    /// Creates a new handler with the default configuration.
    pub fn new(repository: Arc<R>, cache: Arc<C>) -> Self {
        let guard = StalenessGuard::new(Arc::clone(&cache));
        Self {
            repository,
            cache,
            guard,
            config: ResolutionConfig::default(),
        }
    }

    /// Replaces the resolution configuration.
    pub fn with_config(mut self, config: ResolutionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ResolutionConfig {
        &self.config
    }

    /// Resolves and applies the discount for a single item.
    pub async fn resolve_one<T: PriceableItem>(
        &self,
        item: &mut T,
    ) -> ResolutionResult<ResolutionSummary> {
        self.resolve_many(std::slice::from_mut(item)).await
    }

    /// Resolves and applies discounts for every item in the batch.
    ///
    /// Items are mutated in place only after every lookup has succeeded; a
    /// repository failure leaves the whole batch untouched. Items with no
    /// applicable policy keep their price and share ratio.
    #[instrument(skip_all, fields(items = items.len()))]
    pub async fn resolve_many<T: PriceableItem>(
        &self,
        items: &mut [T],
    ) -> ResolutionResult<ResolutionSummary> {
        let mut summary = ResolutionSummary {
            items: items.len(),
            ..Default::default()
        };
        if items.is_empty() {
            return Ok(summary);
        }

        // Stage 1: Intra-batch deduplication, first-seen order
        let mut requests: Vec<PriceCalculationRequest> = Vec::new();
        let mut key_to_index: HashMap<RequestKey, usize> = HashMap::new();
        let mut position_to_unique: Vec<usize> = Vec::with_capacity(items.len());

        for item in items.iter() {
            let key = RequestKey::of(item);
            let unique_index = *key_to_index.entry(key).or_insert_with(|| {
                let idx = requests.len();
                requests.push(PriceCalculationRequest::new(key, item.price()));
                idx
            });
            position_to_unique.push(unique_index);
        }
        summary.unique_requests = requests.len();

        let candidates: Vec<CandidateKeys> =
            requests.iter().map(|r| r.key.candidate_keys()).collect();

        // Stage 2: One multi-get for every candidate key
        if self.config.cache_reads {
            let keys = distinct_keys(&candidates);
            summary.cache_keys = keys.len();
            let found = self.read_cache(&keys).await;

            for (request, keys) in requests.iter_mut().zip(&candidates) {
                if let Some(snapshot) = keys.select(&found) {
                    request.apply(snapshot.clone());
                    summary.cache_hits += 1;
                }
            }
        }

        // Stage 3: One repository call for all misses
        let misses: Vec<usize> = requests
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.is_resolved())
            .map(|(i, _)| i)
            .collect();

        if !misses.is_empty() {
            let product_ids: Vec<u64> = misses
                .iter()
                .map(|&i| requests[i].key.product_id)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let seller_ids: Vec<u64> = misses
                .iter()
                .map(|&i| requests[i].key.seller_id)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();

            metrics::counter!("pricewise_repository_fallbacks_total").increment(1);
            summary.repository_calls = 1;
            let snapshots = self
                .repository
                .find_applicable(&product_ids, &seller_ids)
                .await
                .map_err(|e| {
                    warn!(error = %e, "policy repository lookup failed");
                    ResolutionError::from(e)
                })?;

            let found = index_snapshots(snapshots);
            for &i in &misses {
                if let Some(snapshot) = candidates[i].select(&found) {
                    requests[i].apply(snapshot.clone());
                    summary.repository_hits += 1;
                }
            }
            summary.unresolved = misses.len() - summary.repository_hits;

            if self.config.write_back {
                summary.cache_writes = self.write_back(&found).await;
            }
        }

        // Stage 4: Map results back onto every item
        for (item, &idx) in items.iter_mut().zip(&position_to_unique) {
            match requests[idx].quote_for(item.price()) {
                Some(quote) => {
                    item.set_price(quote.discounted_price);
                    item.set_applied_share_ratio(quote.share_ratio);
                }
                // Unresolved items keep their price
                None => item.set_applied_share_ratio(NO_DISCOUNT_SHARE_RATIO),
            }
        }

        debug!(
            unique = summary.unique_requests,
            cache_hits = summary.cache_hits,
            repository_hits = summary.repository_hits,
            unresolved = summary.unresolved,
            cache_writes = summary.cache_writes,
            "batch resolved"
        );

        Ok(summary)
    }

    /// Returns statistics about deduplication for a batch.
    /// Returns (total_items, unique_requests).
    pub fn dedup_stats<T: PriceableItem>(&self, items: &[T]) -> (usize, usize) {
        let seen: HashSet<RequestKey> = items.iter().map(|item| RequestKey::of(item)).collect();
        (items.len(), seen.len())
    }

    /// Multi-get that degrades to an all-miss result when the cache fails.
    async fn read_cache(&self, keys: &[String]) -> HashMap<String, DiscountPolicySnapshot> {
        let mut found = match self.cache.multi_get(keys).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "policy cache unavailable, treating batch as miss");
                return HashMap::new();
            }
        };
        found.retain(|key, snapshot| match snapshot.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "dropping invalid cached policy");
                false
            }
        });
        found
    }

    /// Writes every repository snapshot back through the guard, concurrently.
    /// Returns the number of entries actually written.
    async fn write_back(&self, found: &HashMap<String, DiscountPolicySnapshot>) -> usize {
        let writes = found
            .iter()
            .map(|(key, snapshot)| self.guard.try_write(key, snapshot));
        join_all(writes)
            .await
            .into_iter()
            .filter(|outcome| *outcome == WriteOutcome::Written)
            .count()
    }
}

/// Flattens candidate keys into a duplicate-free list, first-seen order.
fn distinct_keys(candidates: &[CandidateKeys]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(candidates.len() * 2);
    let mut keys = Vec::with_capacity(candidates.len() * 2);
    for candidate in candidates {
        for key in [&candidate.product, &candidate.seller] {
            if seen.insert(key.as_str()) {
                keys.push(key.clone());
            }
        }
    }
    keys
}

/// Indexes repository snapshots by cache key.
///
/// Invalid snapshots are dropped. If the repository returns more than one
/// snapshot for a key, the most recently activated one is kept.
fn index_snapshots(
    snapshots: Vec<DiscountPolicySnapshot>,
) -> HashMap<String, DiscountPolicySnapshot> {
    let mut found: HashMap<String, DiscountPolicySnapshot> = HashMap::new();
    for snapshot in snapshots {
        if let Err(e) = snapshot.validate() {
            warn!(error = %e, "dropping invalid repository policy");
            continue;
        }
        let key = snapshot.cache_key();
        match found.get(&key) {
            Some(existing) if existing.valid_from >= snapshot.valid_from => {}
            _ => {
                found.insert(key, snapshot);
            }
        }
    }
    found
}
