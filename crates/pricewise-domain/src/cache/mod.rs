//! Discount policy caching.
//!
//! # Key Design
//!
//! Snapshots are cached under `discount:{ISSUE_TYPE}{target_id}`, one key
//! space per issue type. A lookup for a (product, seller) pair considers both
//! `discount:PRODUCT{product_id}` and `discount:SELLER{seller_id}`; the product
//! entry always wins.
//!
//! # Expiry
//!
//! Every entry lives exactly as long as its policy: the TTL is
//! `valid_until - now` at write time, and a policy whose window has already
//! closed is never written.
//!
//! # Concurrency
//!
//! Writes go through the [`StalenessGuard`], a read-compare-write check on
//! `valid_from` that needs no lock and never lets an older policy replace a
//! newer one.
//!
//! ```text
//! ┌──────────────┐   multi_get    ┌──────────────────┐
//! │ orchestrator │ ─────────────► │ PolicyCacheStore │
//! │              │                │  (MokaPolicyCache│
//! │              │ StalenessGuard │   or remote KV)  │
//! │              │ ─────────────► │                  │
//! └──────────────┘  get + set     └──────────────────┘
//! ```

mod guard;
pub mod keys;
mod moka_store;
mod store;

pub use guard::{StalenessGuard, WriteOutcome};
pub use keys::{key_for, product_key, seller_key, CandidateKeys, DISCOUNT_KEY_PREFIX};
pub use moka_store::{register_policy_cache_metrics, MokaPolicyCache, PolicyCacheConfig};
pub use store::PolicyCacheStore;
