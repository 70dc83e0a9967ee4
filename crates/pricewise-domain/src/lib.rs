//! pricewise-domain: Core discount pricing domain logic
//!
//! This crate contains the pricing logic shared by every caller:
//! - Discount policy snapshots and the priced-item capability
//! - Pure price calculation
//! - Cache key strategy, cache store interface and staleness guard
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              pricewise-domain               │
//! ├─────────────────────────────────────────────┤
//! │  model/    - Snapshots & PriceableItem      │
//! │  resolver/ - Calculator & repository trait  │
//! │  cache/    - Keys, store, staleness guard   │
//! └─────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod error;
pub mod model;
pub mod resolver;

// Re-export commonly used types at the crate root
pub use cache::{MokaPolicyCache, PolicyCacheConfig, PolicyCacheStore, StalenessGuard};
pub use error::{CacheError, CacheResult, DomainError, DomainResult};
pub use model::{DiscountPolicySnapshot, IssueType, PriceableItem};
pub use resolver::{resolve_price, PolicyRepository, PriceQuote, ResolutionConfig};
