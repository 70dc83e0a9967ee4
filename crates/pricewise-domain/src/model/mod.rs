//! Discount policy snapshots and the priced-item capability.

mod item;
mod types;

pub use item::PriceableItem;
pub use types::{
    DiscountKind, DiscountPolicySnapshot, DiscountTerms, IssueType, ProductId, SellerId,
    MAX_PERCENT,
};
