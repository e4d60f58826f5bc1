//! # Pricing Calculator
//!
//! Pure computation of a cart's money breakdown.
//!
//! ## Calculation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Lines                                                                  │
//! │   A  qty 2 × ₱100.00  − line disc ₱0.00   = ₱200.00                    │
//! │   B  qty 1 × ₱150.00  (free item)         = ₱0.00     ← not counted    │
//! │                                             ────────                    │
//! │  1. subtotal                                ₱200.00                     │
//! │  2. order discount   (10% of subtotal)    − ₱20.00                      │
//! │  3. reward discount  (resolved earlier)   − ₱0.00                       │
//! │                                             ────────                    │
//! │     final total = max(0, ...)               ₱180.00                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The reward discount is computed by the redemption resolver from the same
//! subtotal (see [`crate::redemption`]) and passed in here, so both
//! discounts are taken off the undiscounted subtotal rather than compounded.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::Percentage;
use crate::validation::ValidationResult;

// =============================================================================
// Inputs
// =============================================================================

/// One priced line as the calculator sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_discount: Money,
    pub is_free_item: bool,
}

impl PricedLine {
    /// A regular sold line.
    pub fn sold(product_id: impl Into<String>, quantity: i64, unit_price: Money, line_discount: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price,
            line_discount,
            is_free_item: false,
        }
    }

    /// A reward-granted line: quantity 1, fully discounted.
    pub fn free_item(product_id: impl Into<String>, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity: 1,
            unit_price,
            line_discount: unit_price,
            is_free_item: true,
        }
    }

    /// quantity × unit price, before any discount.
    #[inline]
    pub fn gross(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    /// What this line adds to the subtotal.
    #[inline]
    pub fn net(&self) -> Money {
        if self.is_free_item {
            Money::zero()
        } else {
            self.gross() - self.line_discount
        }
    }

    /// [`PricedLine::gross`], or `None` when it doesn't fit in an `i64`.
    #[inline]
    pub fn checked_gross(&self) -> Option<Money> {
        self.unit_price.checked_multiply_quantity(self.quantity)
    }

    /// [`PricedLine::net`], or `None` on overflow.
    pub fn checked_net(&self) -> Option<Money> {
        if self.is_free_item {
            return Some(Money::zero());
        }
        self.checked_gross()?.checked_sub(self.line_discount)
    }
}

// =============================================================================
// Output
// =============================================================================

/// Money breakdown of a priced cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceBreakdown {
    pub subtotal: Money,
    pub order_discount: Money,
    pub reward_discount: Money,
    pub total: Money,
}

// =============================================================================
// Calculation
// =============================================================================

/// Σ net over the cart. Free lines contribute nothing.
///
/// ## Example
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::pricing::{cart_subtotal, PricedLine};
///
/// let lines = vec![
///     PricedLine::sold("A", 2, Money::from_cents(10_000), Money::zero()),
///     PricedLine::free_item("B", Money::from_cents(15_000)),
/// ];
/// assert_eq!(cart_subtotal(&lines).unwrap().cents(), 20_000);
/// ```
pub fn cart_subtotal(lines: &[PricedLine]) -> ValidationResult<Money> {
    lines
        .iter()
        .try_fold(Money::zero(), |acc, line| acc.checked_add(line.checked_net()?))
        .ok_or_else(|| overflow("subtotal"))
}

fn overflow(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: i64::MIN,
        max: i64::MAX,
    }
}

/// Prices a cart.
///
/// `order_discount` is a percentage of the subtotal; `reward_discount` is an
/// amount already resolved against that subtotal. A cart whose sums don't
/// fit in an `i64` is rejected with [`ValidationError::OutOfRange`].
///
/// ## Example
/// ```rust
/// use tally_core::money::Money;
/// use tally_core::pricing::{price_cart, PricedLine};
/// use tally_core::types::Percentage;
///
/// let lines = vec![PricedLine::sold("A", 2, Money::from_cents(10_000), Money::zero())];
/// let breakdown = price_cart(&lines, Some(Percentage::from_bps(1000)), Money::zero()).unwrap();
/// assert_eq!(breakdown.total.cents(), 18_000);
/// ```
pub fn price_cart(
    lines: &[PricedLine],
    order_discount: Option<Percentage>,
    reward_discount: Money,
) -> ValidationResult<PriceBreakdown> {
    let subtotal = cart_subtotal(lines)?;
    let order_discount = order_discount
        .map(|rate| subtotal.percentage_of(rate))
        .unwrap_or_default();
    let total = subtotal
        .checked_sub(order_discount)
        .and_then(|rest| rest.checked_sub(reward_discount))
        .ok_or_else(|| overflow("total"))?
        .clamp_non_negative();

    Ok(PriceBreakdown {
        subtotal,
        order_discount,
        reward_discount,
        total,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: i64, price: i64, discount: i64) -> PricedLine {
        PricedLine::sold("P", qty, Money::from_cents(price), Money::from_cents(discount))
    }

    #[test]
    fn test_plain_cart() {
        let b = price_cart(&[line(2, 10_000, 0)], None, Money::zero()).unwrap();
        assert_eq!(b.subtotal.cents(), 20_000);
        assert_eq!(b.order_discount, Money::zero());
        assert_eq!(b.total.cents(), 20_000);
    }

    #[test]
    fn test_order_discount_applies_to_subtotal() {
        let b = price_cart(&[line(2, 10_000, 0)], Some(Percentage::from_bps(1000)), Money::zero()).unwrap();
        assert_eq!(b.order_discount.cents(), 2_000);
        assert_eq!(b.total.cents(), 18_000);
    }

    #[test]
    fn test_line_discounts_reduce_subtotal() {
        let lines = vec![line(3, 5_000, 1_000), line(1, 2_500, 0)];
        assert_eq!(cart_subtotal(&lines).unwrap().cents(), 16_500);
    }

    #[test]
    fn test_both_discounts_come_off_undiscounted_subtotal() {
        let lines = vec![line(1, 10_000, 0)];
        let b = price_cart(&lines, Some(Percentage::from_bps(2000)), Money::from_cents(1_000)).unwrap();
        assert_eq!(b.order_discount.cents(), 2_000);
        assert_eq!(b.total.cents(), 7_000);
        assert_eq!(b.total, b.subtotal - b.order_discount - b.reward_discount);
    }

    #[test]
    fn test_total_clamps_at_zero() {
        let lines = vec![line(1, 1_000, 0)];
        let b = price_cart(&lines, Some(Percentage::from_bps(10_000)), Money::from_cents(500)).unwrap();
        assert_eq!(b.total, Money::zero());

        // line discount larger than the line itself
        let b = price_cart(&[line(1, 1_000, 5_000)], None, Money::zero()).unwrap();
        assert!(b.subtotal.is_negative());
        assert_eq!(b.total, Money::zero());
    }

    #[test]
    fn test_free_item_is_excluded() {
        let lines = vec![
            line(1, 10_000, 0),
            PricedLine::free_item("DESSERT", Money::from_cents(15_000)),
        ];
        let b = price_cart(&lines, None, Money::zero()).unwrap();
        assert_eq!(b.subtotal.cents(), 10_000);
        assert_eq!(lines[1].line_discount, lines[1].unit_price);
    }

    #[test]
    fn test_empty_cart_prices_to_zero() {
        let b = price_cart(&[], Some(Percentage::from_bps(1000)), Money::zero()).unwrap();
        assert_eq!(b.total, Money::zero());
    }

    #[test]
    fn test_overflowing_cart_is_rejected() {
        let lines = vec![line(3, i64::MAX / 2, 0)];
        assert!(matches!(
            price_cart(&lines, None, Money::zero()),
            Err(ValidationError::OutOfRange { ref field, .. }) if field == "subtotal"
        ));

        let lines = vec![line(1, i64::MAX, 0), line(1, 1, 0)];
        assert!(cart_subtotal(&lines).is_err());

        let b = price_cart(&[line(1, i64::MIN + 1, 0)], None, Money::from_cents(2));
        assert!(matches!(b, Err(ValidationError::OutOfRange { ref field, .. }) if field == "total"));
    }
}
