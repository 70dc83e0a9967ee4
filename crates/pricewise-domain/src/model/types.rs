//! Core types for discount policy snapshots.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::keys;
use crate::error::{DomainError, DomainResult};

/// Identifier of a product (product group in catalogue terms).
pub type ProductId = u64;

/// Identifier of a seller.
pub type SellerId = u64;

/// Upper bound for percentage values (rates and cost-share ratios).
pub const MAX_PERCENT: u32 = 100;

/// The scope a discount policy is issued at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    /// Applies to a single product.
    Product,
    /// Applies to every product of a single seller.
    Seller,
}

impl IssueType {
    /// Returns the canonical upper-case name used in cache keys and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Product => "PRODUCT",
            IssueType::Seller => "SELLER",
        }
    }

    /// Parses the canonical name produced by [`IssueType::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PRODUCT" => Some(IssueType::Product),
            "SELLER" => Some(IssueType::Seller),
            _ => None,
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the discount amount is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiscountKind {
    Rate,
    FixedAmount,
}

/// Discount terms of a snapshot.
///
/// Modelled as an enum so that a rate and a fixed amount can never be set at
/// the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "discount_kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountTerms {
    /// Percentage of the original price, optionally capped.
    Rate {
        /// Percentage in `0..=100`.
        rate: u32,
        /// Maximum discount amount; unlimited when `None`.
        max_discount_cap: Option<u64>,
    },
    /// Flat amount subtracted from the original price.
    FixedAmount { fixed_amount: u64 },
}

impl DiscountTerms {
    /// Returns the discount kind of these terms.
    pub fn kind(&self) -> DiscountKind {
        match self {
            DiscountTerms::Rate { .. } => DiscountKind::Rate,
            DiscountTerms::FixedAmount { .. } => DiscountKind::FixedAmount,
        }
    }
}

/// Immutable, time-bounded copy of a discount policy's terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountPolicySnapshot {
    /// Scope the policy was issued at.
    pub issue_type: IssueType,
    /// Product or seller id the snapshot applies to.
    pub target_id: u64,
    /// Rate or fixed-amount terms.
    pub terms: DiscountTerms,
    /// Orders below this amount are not discounted.
    pub minimum_order_amount: Option<u64>,
    /// Seller-borne percentage of the discount; the platform bears the rest.
    pub cost_share_ratio: f64,
    /// Instant the policy became active.
    pub valid_from: DateTime<Utc>,
    /// Instant the policy stops applying.
    pub valid_until: DateTime<Utc>,
}

impl DiscountPolicySnapshot {
    /// Creates a snapshot with the given terms and no minimum order amount.
    pub fn new(
        issue_type: IssueType,
        target_id: u64,
        terms: DiscountTerms,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> Self {
        Self {
            issue_type,
            target_id,
            terms,
            minimum_order_amount: None,
            cost_share_ratio: 0.0,
            valid_from,
            valid_until,
        }
    }

    /// Creates an uncapped rate snapshot.
    pub fn rate(
        issue_type: IssueType,
        target_id: u64,
        rate: u32,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> Self {
        Self::new(
            issue_type,
            target_id,
            DiscountTerms::Rate {
                rate,
                max_discount_cap: None,
            },
            valid_from,
            valid_until,
        )
    }

    /// Creates a fixed-amount snapshot.
    pub fn fixed_amount(
        issue_type: IssueType,
        target_id: u64,
        fixed_amount: u64,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> Self {
        Self::new(
            issue_type,
            target_id,
            DiscountTerms::FixedAmount { fixed_amount },
            valid_from,
            valid_until,
        )
    }

    /// Caps a rate discount. Has no effect on fixed-amount terms.
    pub fn with_max_discount_cap(mut self, cap: u64) -> Self {
        if let DiscountTerms::Rate {
            max_discount_cap, ..
        } = &mut self.terms
        {
            *max_discount_cap = Some(cap);
        }
        self
    }

    /// Sets the minimum order amount.
    pub fn with_minimum_order_amount(mut self, amount: u64) -> Self {
        self.minimum_order_amount = Some(amount);
        self
    }

    /// Sets the seller-borne cost share percentage.
    pub fn with_cost_share_ratio(mut self, ratio: f64) -> Self {
        self.cost_share_ratio = ratio;
        self
    }

    /// Returns the discount kind.
    pub fn discount_kind(&self) -> DiscountKind {
        self.terms.kind()
    }

    /// Returns the cache key this snapshot is stored under.
    pub fn cache_key(&self) -> String {
        keys::key_for(self.issue_type, self.target_id)
    }

    /// Returns true if `at` falls inside the validity window.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.valid_from <= at && at < self.valid_until
    }

    /// Checks the snapshot invariants.
    pub fn validate(&self) -> DomainResult<()> {
        let invalid = |message: String| DomainError::InvalidSnapshot {
            key: self.cache_key(),
            message,
        };

        if self.valid_until <= self.valid_from {
            return Err(invalid(format!(
                "valid_until {} must be after valid_from {}",
                self.valid_until, self.valid_from
            )));
        }

        if let DiscountTerms::Rate { rate, .. } = self.terms {
            if rate > MAX_PERCENT {
                return Err(invalid(format!(
                    "rate must be between 0 and {MAX_PERCENT}, got {rate}"
                )));
            }
        }

        if !self.cost_share_ratio.is_finite()
            || !(0.0..=f64::from(MAX_PERCENT)).contains(&self.cost_share_ratio)
        {
            return Err(invalid(format!(
                "cost_share_ratio must be between 0 and {MAX_PERCENT}, got {}",
                self.cost_share_ratio
            )));
        }

        Ok(())
    }
}
