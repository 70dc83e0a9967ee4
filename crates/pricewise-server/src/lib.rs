//! pricewise-server: Batch discount resolution and engine wiring
//!
//! This crate contains the application layer including:
//! - Batch resolution handler with intra-batch deduplication
//! - Storage-to-domain repository adapter
//! - Configuration management
//! - Logging setup
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              pricewise-server               │
//! ├─────────────────────────────────────────────┤
//! │  config.rs        - Configuration           │
//! │  adapters.rs      - PolicyStore → domain    │
//! │  observability.rs - Logging                 │
//! │  handlers/                                  │
//! │    discount/      - Batch resolution        │
//! └─────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod observability;

use std::sync::Arc;

use pricewise_domain::cache::{register_policy_cache_metrics, MokaPolicyCache};
use pricewise_storage::PolicyStore;

// Re-exports for convenience
pub use adapters::StorePolicyRepository;
pub use config::{ConfigLoadError, EngineConfig};
pub use handlers::discount::{
    DiscountResolutionHandler, ResolutionError, ResolutionResult, ResolutionSummary,
};

/// Engine wired to a policy store and the in-process policy cache.
pub type Engine<S> = DiscountResolutionHandler<StorePolicyRepository<S>, MokaPolicyCache>;

/// Builds a resolution engine over `store` using `config`.
pub fn build_engine<S: PolicyStore>(config: &EngineConfig, store: Arc<S>) -> Engine<S> {
    register_policy_cache_metrics();

    let repository = Arc::new(StorePolicyRepository::new(store));
    let cache = Arc::new(MokaPolicyCache::new(config.cache_config()));

    DiscountResolutionHandler::new(repository, cache).with_config(config.resolution_config())
}
