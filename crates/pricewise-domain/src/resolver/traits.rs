//! Traits for the policy system of record needed by the resolver.

use async_trait::async_trait;

use crate::error::DomainResult;
use crate::model::{DiscountPolicySnapshot, ProductId, SellerId};

/// Batched read access to currently applicable discount policies.
#[async_trait]
pub trait PolicyRepository: Send + Sync {
    /// Finds the applicable snapshots for the given products and sellers.
    ///
    /// Returns at most one PRODUCT-issued snapshot per product id and one
    /// SELLER-issued snapshot per seller id, already filtered to policies that
    /// are currently valid. Called once per batch, never once per item.
    async fn find_applicable(
        &self,
        product_ids: &[ProductId],
        seller_ids: &[SellerId],
    ) -> DomainResult<Vec<DiscountPolicySnapshot>>;
}
