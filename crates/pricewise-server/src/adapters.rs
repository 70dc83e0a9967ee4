//! Adapters that bridge the storage layer to the domain layer.
//!
//! The domain layer defines `PolicyRepository`, the read seam the resolution
//! pipeline falls back to on cache misses. The storage layer implements
//! `PolicyStore` over stored policy rows. `StorePolicyRepository` connects the
//! two and converts rows into domain snapshots.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use pricewise_domain::error::{DomainError, DomainResult};
use pricewise_domain::model::{DiscountPolicySnapshot, DiscountTerms, IssueType, ProductId, SellerId};
use pricewise_domain::resolver::PolicyRepository;
use pricewise_storage::{
    PolicyStore, StoredDiscountPolicy, DISCOUNT_TYPE_FIXED_AMOUNT, DISCOUNT_TYPE_RATE,
};

/// Adapter that implements `PolicyRepository` using a `PolicyStore`.
pub struct StorePolicyRepository<S: PolicyStore> {
    storage: Arc<S>,
}

impl<S: PolicyStore> StorePolicyRepository<S> {
    /// Creates a new adapter wrapping the given storage.
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl<S: PolicyStore> PolicyRepository for StorePolicyRepository<S> {
    async fn find_applicable(
        &self,
        product_ids: &[ProductId],
        seller_ids: &[SellerId],
    ) -> DomainResult<Vec<DiscountPolicySnapshot>> {
        let rows = self
            .storage
            .find_applicable(product_ids, seller_ids, Utc::now())
            .await
            .map_err(|e| DomainError::RepositoryUnavailable {
                message: format!("storage error: {}", e),
            })?;

        let snapshots = rows
            .iter()
            .filter_map(|row| match to_snapshot(row) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!(policy_id = %row.id, error = %e, "skipping unconvertible policy row");
                    None
                }
            })
            .collect();

        Ok(snapshots)
    }
}

/// Converts a stored policy row into a domain snapshot.
pub fn to_snapshot(row: &StoredDiscountPolicy) -> DomainResult<DiscountPolicySnapshot> {
    let invalid = |message: String| DomainError::InvalidSnapshot {
        key: row.id.clone(),
        message,
    };

    let issue_type = IssueType::parse(&row.issue_type)
        .ok_or_else(|| invalid(format!("unknown issue type: {}", row.issue_type)))?;

    let terms = match row.discount_type.as_str() {
        DISCOUNT_TYPE_RATE => DiscountTerms::Rate {
            rate: u32::try_from(row.discount_value)
                .map_err(|_| invalid(format!("rate out of range: {}", row.discount_value)))?,
            max_discount_cap: row.max_discount_amount,
        },
        DISCOUNT_TYPE_FIXED_AMOUNT => DiscountTerms::FixedAmount {
            fixed_amount: row.discount_value,
        },
        other => return Err(invalid(format!("unknown discount type: {other}"))),
    };

    let mut snapshot = DiscountPolicySnapshot::new(
        issue_type,
        row.target_id,
        terms,
        row.valid_from,
        row.valid_until,
    )
    .with_cost_share_ratio(row.seller_share_ratio);
    if let Some(minimum) = row.minimum_order_amount {
        snapshot = snapshot.with_minimum_order_amount(minimum);
    }

    snapshot.validate()?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};
    use pricewise_domain::model::DiscountKind;
    use pricewise_storage::{
        MemoryPolicyStore, StorageError, StorageResult, ISSUE_TYPE_PRODUCT, ISSUE_TYPE_SELLER,
    };

    fn row(issue_type: &str, target_id: u64, discount_type: &str, value: u64) -> StoredDiscountPolicy {
        let now = Utc::now();
        StoredDiscountPolicy::new(
            issue_type,
            target_id,
            discount_type,
            value,
            now - Duration::hours(1),
            now + Duration::hours(1),
        )
    }

    #[test]
    fn test_rate_row_converts_with_cap_minimum_and_ratio() {
        let stored = row(ISSUE_TYPE_PRODUCT, 10, DISCOUNT_TYPE_RATE, 15)
            .with_max_discount_amount(3000)
            .with_minimum_order_amount(10_000)
            .with_seller_share_ratio(40.0);

        let snapshot = to_snapshot(&stored).unwrap();

        assert_eq!(snapshot.issue_type, IssueType::Product);
        assert_eq!(snapshot.target_id, 10);
        assert_eq!(
            snapshot.terms,
            DiscountTerms::Rate {
                rate: 15,
                max_discount_cap: Some(3000)
            }
        );
        assert_eq!(snapshot.minimum_order_amount, Some(10_000));
        assert_eq!(snapshot.cost_share_ratio, 40.0);
        assert_eq!(snapshot.valid_from, stored.valid_from);
        assert_eq!(snapshot.valid_until, stored.valid_until);
    }

    #[test]
    fn test_fixed_amount_row_ignores_cap() {
        let stored = row(ISSUE_TYPE_SELLER, 3, DISCOUNT_TYPE_FIXED_AMOUNT, 2500)
            .with_max_discount_amount(100);

        let snapshot = to_snapshot(&stored).unwrap();

        assert_eq!(snapshot.discount_kind(), DiscountKind::FixedAmount);
        assert_eq!(
            snapshot.terms,
            DiscountTerms::FixedAmount { fixed_amount: 2500 }
        );
    }

    #[test]
    fn test_unknown_discount_type_is_rejected() {
        let mut stored = row(ISSUE_TYPE_PRODUCT, 1, DISCOUNT_TYPE_RATE, 10);
        stored.discount_type = "BOGO".to_string();

        let err = to_snapshot(&stored).unwrap_err();
        assert!(matches!(err, DomainError::InvalidSnapshot { .. }));
    }

    #[test]
    fn test_out_of_range_rate_is_rejected() {
        let stored = row(ISSUE_TYPE_PRODUCT, 1, DISCOUNT_TYPE_RATE, 250);

        assert!(to_snapshot(&stored).is_err());
    }

    #[tokio::test]
    async fn test_repository_returns_converted_applicable_policies() {
        let store = MemoryPolicyStore::new_shared();
        store
            .insert_policy(row(ISSUE_TYPE_PRODUCT, 1, DISCOUNT_TYPE_RATE, 10))
            .await
            .unwrap();
        store
            .insert_policy(row(ISSUE_TYPE_SELLER, 2, DISCOUNT_TYPE_FIXED_AMOUNT, 500))
            .await
            .unwrap();
        store
            .insert_policy(row(ISSUE_TYPE_SELLER, 99, DISCOUNT_TYPE_RATE, 5))
            .await
            .unwrap();

        let repository = StorePolicyRepository::new(store);
        let snapshots = repository.find_applicable(&[1], &[2]).await.unwrap();

        assert_eq!(snapshots.len(), 2);
        assert!(snapshots
            .iter()
            .any(|s| s.issue_type == IssueType::Product && s.target_id == 1));
        assert!(snapshots
            .iter()
            .any(|s| s.issue_type == IssueType::Seller && s.target_id == 2));
    }

    struct FailingStore;

    #[async_trait]
    impl PolicyStore for FailingStore {
        async fn insert_policy(
            &self,
            _policy: StoredDiscountPolicy,
        ) -> StorageResult<StoredDiscountPolicy> {
            Err(StorageError::ConnectionError {
                message: "down".to_string(),
            })
        }

        async fn deactivate_policy(&self, policy_id: &str) -> StorageResult<StoredDiscountPolicy> {
            Err(StorageError::PolicyNotFound {
                policy_id: policy_id.to_string(),
            })
        }

        async fn get_policy(&self, policy_id: &str) -> StorageResult<StoredDiscountPolicy> {
            Err(StorageError::PolicyNotFound {
                policy_id: policy_id.to_string(),
            })
        }

        async fn find_applicable(
            &self,
            _product_ids: &[u64],
            _seller_ids: &[u64],
            _at: DateTime<Utc>,
        ) -> StorageResult<Vec<StoredDiscountPolicy>> {
            Err(StorageError::ConnectionError {
                message: "connection refused".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_storage_failure_maps_to_repository_unavailable() {
        let repository = StorePolicyRepository::new(Arc::new(FailingStore));

        let err = repository.find_applicable(&[1], &[2]).await.unwrap_err();

        assert!(matches!(err, DomainError::RepositoryUnavailable { .. }));
        assert!(err.to_string().contains("connection refused"));
    }
}
