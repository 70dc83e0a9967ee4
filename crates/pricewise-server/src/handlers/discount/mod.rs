//! Batch discount resolution with intra-batch deduplication.
//!
//! This handler prices a batch of heterogeneous items in place while
//! bounding I/O:
//!
//! 1. **Intra-batch deduplication**: items sharing a (product, seller) pair
//!    resolve once
//! 2. **Cache multi-get**: product and seller candidate keys for every pair
//!    are fetched in a single round trip
//! 3. **Repository fallback**: everything the cache missed is fetched with
//!    one batched call, then written back through the staleness guard
//!
//! A product-scoped policy always wins over a seller-scoped one.

mod handler;
mod types;

pub use handler::DiscountResolutionHandler;
pub use types::{
    PriceCalculationRequest, RequestKey, ResolutionError, ResolutionResult, ResolutionSummary,
};
