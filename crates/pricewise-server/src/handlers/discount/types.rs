//! Data types for batch discount resolution.

use std::hash::{Hash, Hasher};

use pricewise_domain::cache::CandidateKeys;
use pricewise_domain::error::DomainError;
use pricewise_domain::model::{DiscountPolicySnapshot, PriceableItem, ProductId, SellerId};
use pricewise_domain::resolver::{resolve_price, PriceQuote};

/// Deduplication key: one request per distinct (product, seller) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey {
    pub product_id: ProductId,
    pub seller_id: SellerId,
}

impl RequestKey {
    pub fn new(product_id: ProductId, seller_id: SellerId) -> Self {
        Self {
            product_id,
            seller_id,
        }
    }

    /// Extracts the key of a priced item.
    pub fn of<T: PriceableItem + ?Sized>(item: &T) -> Self {
        Self::new(item.product_id(), item.seller_id())
    }

    /// Returns the product and seller cache keys for this pair.
    pub fn candidate_keys(&self) -> CandidateKeys {
        CandidateKeys::new(self.product_id, self.seller_id)
    }
}

/// Batch-local working state for one distinct (product, seller) pair.
///
/// Equality and hashing only consider the key.
#[derive(Debug, Clone)]
pub struct PriceCalculationRequest {
    pub key: RequestKey,
    /// Price of the first item seen with this key.
    pub original_price: u64,
    policy: Option<DiscountPolicySnapshot>,
    quote: Option<PriceQuote>,
}

impl PriceCalculationRequest {
    pub fn new(key: RequestKey, original_price: u64) -> Self {
        Self {
            key,
            original_price,
            policy: None,
            quote: None,
        }
    }

    /// Prices the request against `policy` and remembers both.
    pub fn apply(&mut self, policy: DiscountPolicySnapshot) {
        self.quote = Some(resolve_price(self.original_price, &policy));
        self.policy = Some(policy);
    }

    pub fn is_resolved(&self) -> bool {
        self.policy.is_some()
    }

    pub fn policy(&self) -> Option<&DiscountPolicySnapshot> {
        self.policy.as_ref()
    }

    pub fn quote(&self) -> Option<PriceQuote> {
        self.quote
    }

    /// Returns the quote for an item of this request priced at `price`.
    ///
    /// Items that share the key but not the first-seen price are priced
    /// against the same policy with their own price.
    pub fn quote_for(&self, price: u64) -> Option<PriceQuote> {
        let policy = self.policy.as_ref()?;
        if price == self.original_price {
            self.quote
        } else {
            Some(resolve_price(price, policy))
        }
    }
}

impl PartialEq for PriceCalculationRequest {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for PriceCalculationRequest {}

impl Hash for PriceCalculationRequest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// Counters describing one `resolve_many` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionSummary {
    /// Items in the batch.
    pub items: usize,
    /// Distinct (product, seller) pairs.
    pub unique_requests: usize,
    /// Cache keys requested in the multi-get.
    pub cache_keys: usize,
    /// Requests resolved from the cache.
    pub cache_hits: usize,
    /// Requests resolved from the repository.
    pub repository_hits: usize,
    /// Requests with no applicable policy anywhere.
    pub unresolved: usize,
    /// Batched repository calls issued (0 or 1).
    pub repository_calls: usize,
    /// Snapshots written back to the cache.
    pub cache_writes: usize,
}

/// Errors that can occur during batch discount resolution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolutionError {
    /// The batched repository fallback failed; the whole batch fails.
    #[error("policy repository unavailable: {message}")]
    RepositoryUnavailable { message: String },

    /// Any other domain error.
    #[error("resolution error: {message}")]
    Domain { message: String },
}

impl From<DomainError> for ResolutionError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::RepositoryUnavailable { message } => {
                ResolutionError::RepositoryUnavailable { message }
            }
            other => ResolutionError::Domain {
                message: other.to_string(),
            },
        }
    }
}

/// Result type for resolution operations.
pub type ResolutionResult<T> = Result<T, ResolutionError>;
