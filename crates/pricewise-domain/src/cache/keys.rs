//! Cache key derivation and product-over-seller precedence.

use std::collections::HashMap;

use crate::model::{DiscountPolicySnapshot, IssueType, ProductId, SellerId};

/// Namespace shared by every discount cache entry.
pub const DISCOUNT_KEY_PREFIX: &str = "discount:";

/// Returns the key for a policy issued at `issue_type` scope on `target_id`.
pub fn key_for(issue_type: IssueType, target_id: u64) -> String {
    format!("{DISCOUNT_KEY_PREFIX}{}{target_id}", issue_type.as_str())
}

/// Returns `discount:PRODUCT{product_id}`.
pub fn product_key(product_id: ProductId) -> String {
    key_for(IssueType::Product, product_id)
}

/// Returns `discount:SELLER{seller_id}`.
pub fn seller_key(seller_id: SellerId) -> String {
    key_for(IssueType::Seller, seller_id)
}

/// The two keys a single (product, seller) lookup may match, in precedence
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateKeys {
    pub product: String,
    pub seller: String,
}

impl CandidateKeys {
    pub fn new(product_id: ProductId, seller_id: SellerId) -> Self {
        Self {
            product: product_key(product_id),
            seller: seller_key(seller_id),
        }
    }

    /// Picks the most specific snapshot present in `found`.
    ///
    /// A product-level entry always wins over a seller-level one. Returns
    /// `None` when neither key is present.
    pub fn select<'a>(
        &self,
        found: &'a HashMap<String, DiscountPolicySnapshot>,
    ) -> Option<&'a DiscountPolicySnapshot> {
        found.get(&self.product).or_else(|| found.get(&self.seller))
    }
}
