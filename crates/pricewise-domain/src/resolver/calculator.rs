//! Pure price calculation against a resolved policy snapshot.

use crate::model::{DiscountPolicySnapshot, DiscountTerms};

/// Share ratio recorded on an item when no discount applies.
pub const NO_DISCOUNT_SHARE_RATIO: f64 = 0.0;

/// Result of pricing one item against one snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceQuote {
    /// Price after the discount, never below zero.
    pub discounted_price: u64,
    /// Seller-borne share of the discount.
    pub share_ratio: f64,
}

impl PriceQuote {
    /// A quote that leaves the price untouched.
    pub fn undiscounted(original_price: u64) -> Self {
        Self {
            discounted_price: original_price,
            share_ratio: NO_DISCOUNT_SHARE_RATIO,
        }
    }
}

/// Computes the discounted price of `original_price` under `snapshot`.
///
/// Callers always pass the original price; feeding a discounted price back in
/// would discount twice. Rate discounts use integer floor division.
pub fn resolve_price(original_price: u64, snapshot: &DiscountPolicySnapshot) -> PriceQuote {
    if let Some(minimum) = snapshot.minimum_order_amount {
        if original_price < minimum {
            return PriceQuote::undiscounted(original_price);
        }
    }

    let discount = match snapshot.terms {
        DiscountTerms::Rate {
            rate,
            max_discount_cap,
        } => {
            let raw = (u128::from(original_price) * u128::from(rate) / 100) as u64;
            max_discount_cap.map_or(raw, |cap| raw.min(cap))
        }
        DiscountTerms::FixedAmount { fixed_amount } => fixed_amount,
    };

    PriceQuote {
        discounted_price: original_price.saturating_sub(discount),
        share_ratio: snapshot.cost_share_ratio,
    }
}
