//! # Loyalty Math
//!
//! Points accrual, eligibility and the engine's policy switches.
//!
//! ## Accrual
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Exchange rate: ₱100.00 = 10 points                                     │
//! │                                                                         │
//! │  final total ₱199.99                                                    │
//! │    19_999 × 10 / 10_000 = 19.999  → floor → 19 points                  │
//! │                                                                         │
//! │  Refund / cancel reverse with the rate in force AT REVERSAL TIME, so a │
//! │  rate change between sale and refund changes the reversed amount.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The rate is stored as JSON under [`ExchangeRate::CONFIG_KEY`]:
//! `{"php_amount": 100.0, "points": 10}`. Anything missing or unreadable
//! falls back to the default.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::ValidationResult;

// =============================================================================
// Exchange Rate
// =============================================================================

/// Points earned per `currency_amount` spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExchangeRate {
    pub currency_amount: Money,
    pub points: i64,
}

/// Stored JSON shape.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRate {
    php_amount: f64,
    points: f64,
}

impl ExchangeRate {
    /// `system_configs` key holding the rate.
    pub const CONFIG_KEY: &'static str = "points_exchange_rate";

    /// Accepted range for both sides, in whole currency units / points.
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 10_000;

    pub const fn new(currency_amount: Money, points: i64) -> Self {
        Self {
            currency_amount,
            points,
        }
    }

    /// Checks both sides are within 1..=10000.
    pub fn validate(&self) -> ValidationResult<()> {
        let amount = self.currency_amount.cents();
        if amount < Self::MIN * 100 || amount > Self::MAX * 100 {
            return Err(ValidationError::OutOfRange {
                field: "currency_amount".to_string(),
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        if self.points < Self::MIN || self.points > Self::MAX {
            return Err(ValidationError::OutOfRange {
                field: "points".to_string(),
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(())
    }

    /// Points earned for a final total, floored. Non-positive totals earn 0.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::loyalty::ExchangeRate;
    /// use tally_core::money::Money;
    ///
    /// let rate = ExchangeRate::default(); // ₱100 = 10 points
    /// assert_eq!(rate.points_for(Money::from_cents(20_000)), 20);
    /// assert_eq!(rate.points_for(Money::from_cents(999)), 0);
    /// ```
    pub fn points_for(&self, total: Money) -> i64 {
        let divisor = self.currency_amount.cents();
        if total.cents() <= 0 || divisor <= 0 || self.points <= 0 {
            return 0;
        }
        (total.cents() as i128 * self.points as i128 / divisor as i128) as i64
    }

    /// Decodes the stored JSON value.
    pub fn from_json(raw: &str) -> Option<Self> {
        let stored: StoredRate = serde_json::from_str(raw).ok()?;
        if !stored.php_amount.is_finite() || !stored.points.is_finite() {
            return None;
        }
        let rate = Self {
            currency_amount: Money::from_cents((stored.php_amount * 100.0).round() as i64),
            points: stored.points.trunc() as i64,
        };
        rate.validate().ok().map(|_| rate)
    }

    /// Decodes a stored value, falling back to the default.
    pub fn from_stored(raw: Option<&str>) -> Self {
        raw.and_then(Self::from_json).unwrap_or_default()
    }

    /// Encodes for storage.
    pub fn to_json(&self) -> String {
        let stored = StoredRate {
            php_amount: self.currency_amount.cents() as f64 / 100.0,
            points: self.points as f64,
        };
        // a struct of two finite floats always serializes
        serde_json::to_string(&stored).unwrap_or_default()
    }

    /// Human-readable description stored next to the value.
    pub fn describe(&self) -> String {
        format!(
            "Points earned for PHP spent (e.g., {} = {} points)",
            self.currency_amount, self.points
        )
    }
}

impl Default for ExchangeRate {
    /// ₱100.00 = 10 points.
    fn default() -> Self {
        Self::new(Money::from_cents(10_000), 10)
    }
}

// =============================================================================
// Eligibility
// =============================================================================

/// `points >= cheapest reward cost`, with an empty catalog counting as 0.
///
/// ## Example
/// ```rust
/// use tally_core::loyalty::is_eligible;
///
/// assert!(is_eligible(75, Some(75)));
/// assert!(!is_eligible(74, Some(75)));
/// assert!(is_eligible(0, None));
/// ```
#[inline]
pub fn is_eligible(points: i64, min_points_needed: Option<i64>) -> bool {
    points >= min_points_needed.unwrap_or(0)
}

// =============================================================================
// Policy
// =============================================================================

/// Engine-wide behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct SettlementPolicy {
    /// Whether a reward-granted free item comes out of inventory.
    pub free_item_decrements_stock: bool,
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            free_item_decrements_stock: false,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rate_scenario() {
        let rate = ExchangeRate::default();
        assert_eq!(rate.points_for(Money::from_cents(20_000)), 20);
        assert_eq!(rate.points_for(Money::from_cents(18_000)), 18);
        assert_eq!(rate.points_for(Money::from_cents(19_999)), 19);
    }

    #[test]
    fn test_zero_and_negative_totals_earn_nothing() {
        let rate = ExchangeRate::default();
        assert_eq!(rate.points_for(Money::zero()), 0);
        assert_eq!(rate.points_for(Money::from_cents(-500)), 0);
    }

    #[test]
    fn test_fractional_currency_amount() {
        // ₱150.50 = 3 points
        let rate = ExchangeRate::new(Money::from_cents(15_050), 3);
        assert_eq!(rate.points_for(Money::from_cents(30_100)), 6);
        assert_eq!(rate.points_for(Money::from_cents(30_099)), 5);
    }

    #[test]
    fn test_json_round_trip_and_fallback() {
        let rate = ExchangeRate::new(Money::from_cents(5_000), 7);
        assert_eq!(ExchangeRate::from_json(&rate.to_json()), Some(rate));

        assert_eq!(
            ExchangeRate::from_stored(Some(r#"{"php_amount":100,"points":10}"#)),
            ExchangeRate::default()
        );
        assert_eq!(ExchangeRate::from_stored(None), ExchangeRate::default());
        assert_eq!(ExchangeRate::from_stored(Some("not json")), ExchangeRate::default());
        assert_eq!(
            ExchangeRate::from_stored(Some(r#"{"points":10}"#)),
            ExchangeRate::default()
        );
        // out of range values are treated as unreadable
        assert_eq!(
            ExchangeRate::from_stored(Some(r#"{"php_amount":0,"points":10}"#)),
            ExchangeRate::default()
        );
    }

    #[test]
    fn test_validate_bounds() {
        assert!(ExchangeRate::new(Money::from_cents(100), 1).validate().is_ok());
        assert!(ExchangeRate::new(Money::from_cents(1_000_000), 10_000).validate().is_ok());
        assert!(ExchangeRate::new(Money::from_cents(99), 1).validate().is_err());
        assert!(ExchangeRate::new(Money::from_cents(10_000), 0).validate().is_err());
        assert!(ExchangeRate::new(Money::from_cents(10_000), 10_001).validate().is_err());
    }

    #[test]
    fn test_eligibility() {
        assert!(is_eligible(100, Some(75)));
        assert!(!is_eligible(50, Some(75)));
        assert!(is_eligible(0, None));
    }

    #[test]
    fn test_policy_default_keeps_free_items_out_of_inventory() {
        assert!(!SettlementPolicy::default().free_item_decrements_stock);
    }
}
