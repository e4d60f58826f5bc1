//! # Redemption Resolver
//!
//! Decides whether a requested reward can be applied and what it grants.
//!
//! ## Precondition Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve(reward?, customer?, subtotal, free_product?)                   │
//! │       │                                                                 │
//! │       ├── reward missing / inactive?   → Skip(RewardNotFound/Inactive) │
//! │       ├── customer missing?            → Skip(CustomerMissing)         │
//! │       ├── points < cost?               → Skip(InsufficientPoints)      │
//! │       │                                                                 │
//! │       ├── percentage_discount → Grant::Discount(subtotal × value)      │
//! │       └── free_item           → Grant::FreeItem(qty 1, fully disc.)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! In a live sale a skip is not an error: the sale proceeds without the
//! reward and the engine logs the [`SkipReason`]. The self-serve path uses
//! [`check_redeemable`] instead, which reports the same checks as
//! [`CoreError`]s.
//!
//! Points are deducted by the storage layer with a guarded update; this
//! module only decides.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::PricedLine;
use crate::types::{Customer, Product, Reward, RewardKind};

/// What a redeemed reward adds to the sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    /// Amount taken off the subtotal.
    Discount(Money),
    /// Line appended to the cart.
    FreeItem(PricedLine),
}

/// A reward that passed every precondition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRedemption {
    pub reward_id: String,
    pub points_cost: i64,
    pub grant: Grant,
}

impl ResolvedRedemption {
    /// Discount amount granted (zero for free items).
    pub fn discount(&self) -> Money {
        match &self.grant {
            Grant::Discount(amount) => *amount,
            Grant::FreeItem(_) => Money::zero(),
        }
    }
}

/// Why a requested reward was not applied to a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    RewardNotFound,
    RewardInactive,
    CustomerMissing,
    InsufficientPoints { available: i64, required: i64 },
    /// Free-item reward whose product no longer exists.
    FreeItemProductMissing,
    /// Percentage reward without a value.
    MissingValue,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::RewardNotFound => write!(f, "reward not found"),
            SkipReason::RewardInactive => write!(f, "reward is inactive"),
            SkipReason::CustomerMissing => write!(f, "no customer attached"),
            SkipReason::InsufficientPoints { available, required } => {
                write!(f, "insufficient points ({available} < {required})")
            }
            SkipReason::FreeItemProductMissing => write!(f, "free item product missing"),
            SkipReason::MissingValue => write!(f, "percentage reward has no value"),
        }
    }
}

/// Resolves a live-sale redemption.
///
/// `free_product` is the catalog row for `reward.product_id`, looked up by
/// the caller; it is ignored for percentage rewards.
pub fn resolve(
    reward: Option<&Reward>,
    customer: Option<&Customer>,
    subtotal: Money,
    free_product: Option<&Product>,
) -> Result<ResolvedRedemption, SkipReason> {
    let reward = reward.ok_or(SkipReason::RewardNotFound)?;
    if !reward.is_active {
        return Err(SkipReason::RewardInactive);
    }

    let customer = customer.ok_or(SkipReason::CustomerMissing)?;
    if customer.points < reward.points_needed {
        return Err(SkipReason::InsufficientPoints {
            available: customer.points,
            required: reward.points_needed,
        });
    }

    let grant = match reward.kind {
        RewardKind::PercentageDiscount => {
            let rate = reward.percentage().ok_or(SkipReason::MissingValue)?;
            Grant::Discount(subtotal.percentage_of(rate))
        }
        RewardKind::FreeItem => {
            let product = free_product
                .filter(|p| reward.product_id.as_deref() == Some(p.id.as_str()))
                .ok_or(SkipReason::FreeItemProductMissing)?;
            Grant::FreeItem(PricedLine::free_item(product.id.clone(), product.price()))
        }
    };

    Ok(ResolvedRedemption {
        reward_id: reward.id.clone(),
        points_cost: reward.points_needed,
        grant,
    })
}

/// Self-serve redemption checks, reported as errors.
pub fn check_redeemable(reward: &Reward, customer: &Customer) -> CoreResult<()> {
    if !reward.is_active {
        return Err(CoreError::RewardUnavailable(reward.id.clone()));
    }
    if customer.points < reward.points_needed {
        return Err(CoreError::InsufficientPoints {
            available: customer.points,
            required: reward.points_needed,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::StockStatus;
    use chrono::Utc;

    fn customer(points: i64) -> Customer {
        Customer {
            id: "C1".into(),
            name: "Customer1".into(),
            contact_number: "09123456789".into(),
            points,
            eligible_for_rewards: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn percent_reward(cost: i64, bps: u32) -> Reward {
        Reward {
            id: "R1".into(),
            name: "10% Off Your Order".into(),
            description: None,
            kind: RewardKind::PercentageDiscount,
            points_needed: cost,
            value_bps: Some(bps),
            product_id: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn dessert() -> Product {
        Product {
            id: "P-CAKE".into(),
            sku: "CAKE".into(),
            name: "Chocolate Cake".into(),
            price_cents: 15_000,
            quantity: 40,
            reorder_level: 5,
            stock_status: StockStatus::InStock,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn free_reward(cost: i64) -> Reward {
        Reward {
            id: "R2".into(),
            name: "Free Dessert".into(),
            kind: RewardKind::FreeItem,
            value_bps: None,
            product_id: Some("P-CAKE".into()),
            ..percent_reward(cost, 0)
        }
    }

    #[test]
    fn test_percentage_reward_discounts_subtotal() {
        let r = percent_reward(100, 1000);
        let c = customer(150);
        let resolved = resolve(Some(&r), Some(&c), Money::from_cents(20_000), None).unwrap();
        assert_eq!(resolved.discount().cents(), 2_000);
        assert_eq!(resolved.points_cost, 100);
    }

    #[test]
    fn test_free_item_injects_fully_discounted_line() {
        let r = free_reward(100);
        let c = customer(100);
        let p = dessert();
        let resolved = resolve(Some(&r), Some(&c), Money::from_cents(5_000), Some(&p)).unwrap();
        assert!(resolved.discount().is_zero());
        match resolved.grant {
            Grant::FreeItem(line) => {
                assert_eq!(line.quantity, 1);
                assert_eq!(line.line_discount.cents(), 15_000);
                assert!(line.is_free_item);
                assert!(line.net().is_zero());
            }
            other => panic!("expected free item, got {other:?}"),
        }
    }

    #[test]
    fn test_skip_reasons_in_order() {
        let c = customer(50);
        assert_eq!(
            resolve(None, Some(&c), Money::zero(), None),
            Err(SkipReason::RewardNotFound)
        );

        let mut inactive = percent_reward(10, 1000);
        inactive.is_active = false;
        // inactive is reported before the missing customer
        assert_eq!(
            resolve(Some(&inactive), None, Money::zero(), None),
            Err(SkipReason::RewardInactive)
        );

        let r = percent_reward(100, 1000);
        assert_eq!(
            resolve(Some(&r), None, Money::zero(), None),
            Err(SkipReason::CustomerMissing)
        );
        assert_eq!(
            resolve(Some(&r), Some(&c), Money::zero(), None),
            Err(SkipReason::InsufficientPoints {
                available: 50,
                required: 100
            })
        );
    }

    #[test]
    fn test_free_item_without_product_is_skipped() {
        let r = free_reward(10);
        let c = customer(10);
        assert_eq!(
            resolve(Some(&r), Some(&c), Money::zero(), None),
            Err(SkipReason::FreeItemProductMissing)
        );
    }

    #[test]
    fn test_check_redeemable() {
        let r = percent_reward(100, 1000);
        assert!(check_redeemable(&r, &customer(100)).is_ok());
        assert!(matches!(
            check_redeemable(&r, &customer(99)),
            Err(CoreError::InsufficientPoints { available: 99, required: 100 })
        ));

        let mut inactive = r.clone();
        inactive.is_active = false;
        assert!(matches!(
            check_redeemable(&inactive, &customer(500)),
            Err(CoreError::RewardUnavailable(_))
        ));
    }
}
