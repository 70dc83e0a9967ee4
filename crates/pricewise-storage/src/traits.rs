//! PolicyStore trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Issue type column value for product-scoped policies.
pub const ISSUE_TYPE_PRODUCT: &str = "PRODUCT";
/// Issue type column value for seller-scoped policies.
pub const ISSUE_TYPE_SELLER: &str = "SELLER";
/// Discount type column value for percentage discounts.
pub const DISCOUNT_TYPE_RATE: &str = "RATE";
/// Discount type column value for flat discounts.
pub const DISCOUNT_TYPE_FIXED_AMOUNT: &str = "FIXED_AMOUNT";

/// A stored discount policy row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDiscountPolicy {
    pub id: String,
    /// `PRODUCT` or `SELLER`.
    pub issue_type: String,
    pub target_id: u64,
    /// `RATE` or `FIXED_AMOUNT`.
    pub discount_type: String,
    /// Percentage for `RATE`, amount for `FIXED_AMOUNT`.
    pub discount_value: u64,
    /// Only meaningful for `RATE`.
    pub max_discount_amount: Option<u64>,
    pub minimum_order_amount: Option<u64>,
    /// Seller-borne percentage of the discount.
    pub seller_share_ratio: f64,
    pub active: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl StoredDiscountPolicy {
    /// Creates an active policy row with a fresh ULID.
    pub fn new(
        issue_type: &str,
        target_id: u64,
        discount_type: &str,
        discount_value: u64,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            issue_type: issue_type.to_string(),
            target_id,
            discount_type: discount_type.to_string(),
            discount_value,
            max_discount_amount: None,
            minimum_order_amount: None,
            seller_share_ratio: 0.0,
            active: true,
            valid_from,
            valid_until,
            created_at: Utc::now(),
        }
    }

    pub fn with_max_discount_amount(mut self, amount: u64) -> Self {
        self.max_discount_amount = Some(amount);
        self
    }

    pub fn with_minimum_order_amount(mut self, amount: u64) -> Self {
        self.minimum_order_amount = Some(amount);
        self
    }

    pub fn with_seller_share_ratio(mut self, ratio: f64) -> Self {
        self.seller_share_ratio = ratio;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Returns true if the policy is active and `at` falls inside its window.
    pub fn is_applicable_at(&self, at: DateTime<Utc>) -> bool {
        self.active && self.valid_from <= at && at < self.valid_until
    }
}

/// Validates a policy row before it is written.
pub fn validate_policy(policy: &StoredDiscountPolicy) -> StorageResult<()> {
    if policy.id.is_empty() {
        return Err(StorageError::InvalidInput {
            message: "policy id cannot be empty".to_string(),
        });
    }
    if policy.issue_type != ISSUE_TYPE_PRODUCT && policy.issue_type != ISSUE_TYPE_SELLER {
        return Err(StorageError::InvalidInput {
            message: format!(
                "issue_type must be {ISSUE_TYPE_PRODUCT} or {ISSUE_TYPE_SELLER}, got: {}",
                policy.issue_type
            ),
        });
    }
    match policy.discount_type.as_str() {
        DISCOUNT_TYPE_RATE if policy.discount_value > 100 => {
            return Err(StorageError::InvalidInput {
                message: format!(
                    "rate discount_value must be at most 100, got: {}",
                    policy.discount_value
                ),
            });
        }
        DISCOUNT_TYPE_RATE | DISCOUNT_TYPE_FIXED_AMOUNT => {}
        other => {
            return Err(StorageError::InvalidInput {
                message: format!(
                    "discount_type must be {DISCOUNT_TYPE_RATE} or {DISCOUNT_TYPE_FIXED_AMOUNT}, got: {other}"
                ),
            });
        }
    }
    if policy.valid_until <= policy.valid_from {
        return Err(StorageError::InvalidInput {
            message: "valid_until must be after valid_from".to_string(),
        });
    }
    if !(0.0..=100.0).contains(&policy.seller_share_ratio) {
        return Err(StorageError::InvalidInput {
            message: format!(
                "seller_share_ratio must be between 0 and 100, got: {}",
                policy.seller_share_ratio
            ),
        });
    }
    Ok(())
}

/// Abstract storage interface for discount policies.
///
/// Implementations must be thread-safe (Send + Sync) and support
/// async operations.
#[async_trait]
pub trait PolicyStore: Send + Sync + 'static {
    /// Inserts a validated policy row.
    async fn insert_policy(&self, policy: StoredDiscountPolicy)
        -> StorageResult<StoredDiscountPolicy>;

    /// Marks a policy inactive so it is no longer applicable.
    ///
    /// Returns the updated row. Deactivating an inactive policy is a no-op.
    async fn deactivate_policy(&self, policy_id: &str) -> StorageResult<StoredDiscountPolicy>;

    /// Gets a policy by id.
    async fn get_policy(&self, policy_id: &str) -> StorageResult<StoredDiscountPolicy>;

    /// Finds the policies applicable at `at` for the given targets.
    ///
    /// Returns at most one `PRODUCT` row per product id and one `SELLER` row
    /// per seller id: the active row whose window contains `at` and whose
    /// `valid_from` is the latest.
    async fn find_applicable(
        &self,
        product_ids: &[u64],
        seller_ids: &[u64],
        at: DateTime<Utc>,
    ) -> StorageResult<Vec<StoredDiscountPolicy>>;
}
