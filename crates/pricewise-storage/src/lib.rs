//! pricewise-storage: Discount policy system of record
//!
//! This crate provides the storage abstraction for discount policies:
//! - PolicyStore trait for storage operations
//! - In-memory implementation for testing and single-node deployments
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              pricewise-storage              │
//! ├─────────────────────────────────────────────┤
//! │  traits.rs - PolicyStore trait & row types  │
//! │  memory.rs - In-memory implementation       │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use memory::MemoryPolicyStore;
pub use traits::{
    validate_policy, PolicyStore, StoredDiscountPolicy, DISCOUNT_TYPE_FIXED_AMOUNT,
    DISCOUNT_TYPE_RATE, ISSUE_TYPE_PRODUCT, ISSUE_TYPE_SELLER,
};
