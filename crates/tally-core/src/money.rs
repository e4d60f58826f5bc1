//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Points accrual floors the total:                                       │
//! │    floor(199.99999997 × 10 / 100) = 19   (should have been 20)         │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Centavos                                         │
//! │    19_999 centavos × 10 / 10_000 = 19 points, exactly, every time      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//! use tally_core::types::Percentage;
//!
//! let price = Money::from_cents(10_000); // ₱100.00
//! let line = price.multiply_quantity(2); // ₱200.00
//! let discount = line.percentage_of(Percentage::from_bps(1000)); // 10%
//! assert_eq!((line - discount).cents(), 18_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::types::Percentage;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in centavos (1/100 of the currency unit).
///
/// ## Design Decisions
/// - **i64 (signed)**: line discounts can push an intermediate subtotal below
///   zero before the final clamp, so the type must represent negatives
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serialized as a bare integer**: the frontend formats for display
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  CartLine.unit_price ──► line gross ──► subtotal ──► order discount     │
/// │                                            │                            │
/// │                                            ├──► reward discount         │
/// │                                            ▼                            │
/// │                                     final total ──► points accrual      │
/// │                                            │                            │
/// │                                            └──► cash drawer expected    │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from centavos.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // ₱10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole units and centavos.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -₱5.50.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(100, 0).cents(), 10_000);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in centavos.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the centavo portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative amounts to zero.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(-1).clamp_non_negative(), Money::zero());
    /// assert_eq!(Money::from_cents(250).clamp_non_negative().cents(), 250);
    /// ```
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299); // ₱2.99
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    ///
    /// Saturates at the `i64` bounds; use [`Money::checked_multiply_quantity`]
    /// where an overflow must be reported.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// `self × qty`, or `None` on overflow.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `self + other`, or `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1).checked_add(Money::from_cents(2)), Some(Money::from_cents(3)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_add(Money::from_cents(1)), None);
    /// ```
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `self - other`, or `None` on overflow.
    #[inline]
    pub const fn checked_sub(&self, other: Money) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Returns `rate` of this amount, rounded half away from zero to the
    /// nearest centavo.
    ///
    /// ## Implementation
    /// Integer math in i128: `(|amount| × bps + 5000) / 10000`, sign restored
    /// afterwards so that -₱0.825 rounds to -₱0.83 just like ₱0.825 → ₱0.83.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::Money;
    /// use tally_core::types::Percentage;
    ///
    /// let subtotal = Money::from_cents(20_000); // ₱200.00
    /// let ten_percent = Percentage::from_bps(1000);
    /// assert_eq!(subtotal.percentage_of(ten_percent).cents(), 2_000);
    ///
    /// // ₱10.00 × 8.25% = ₱0.825 → ₱0.83
    /// let odd = Money::from_cents(1000).percentage_of(Percentage::from_bps(825));
    /// assert_eq!(odd.cents(), 83);
    /// ```
    pub fn percentage_of(&self, rate: Percentage) -> Money {
        let magnitude = (self.0.unsigned_abs() as i128 * rate.bps() as i128 + 5000) / 10000;
        let signed = if self.0 < 0 { -magnitude } else { magnitude };
        Money::from_cents(signed as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================
//
// Operators saturate at the `i64` bounds instead of panicking. Totals that
// reach storage go through the `checked_*` methods.

/// Debug-friendly rendering (`₱10.99`, `-₱5.50`). Receipts format on the
/// frontend.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₱{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(self.0.saturating_neg())
    }
}

/// Multiplication by a line quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "₱10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "₱5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-₱5.50");
        assert_eq!(format!("{}", Money::zero()), "₱0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_overflow_saturates_or_reports() {
        let huge = Money::from_cents(i64::MAX / 2);

        assert_eq!(huge.multiply_quantity(3).cents(), i64::MAX);
        assert_eq!((huge * 3).cents(), i64::MAX);
        assert_eq!((Money::zero() - Money::from_cents(i64::MAX) - huge).cents(), i64::MIN);
        assert_eq!((-Money::from_cents(i64::MIN)).cents(), i64::MAX);

        assert_eq!(huge.checked_multiply_quantity(3), None);
        assert_eq!(huge.checked_multiply_quantity(2), Some(Money::from_cents(i64::MAX - 1)));
        assert_eq!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)), None);
        assert_eq!(huge.checked_sub(huge), Some(Money::zero()));
    }

    #[test]
    fn test_percentage_of_rounds_half_up() {
        // ₱0.05 × 50% = 2.5 centavos → 3
        let amount = Money::from_cents(5);
        assert_eq!(amount.percentage_of(Percentage::from_bps(5000)).cents(), 3);

        // ₱0.03 × 10% = 0.3 centavos → 0
        let amount = Money::from_cents(3);
        assert_eq!(amount.percentage_of(Percentage::from_bps(1000)).cents(), 0);
    }

    #[test]
    fn test_percentage_of_negative_is_symmetric() {
        let positive = Money::from_cents(1000).percentage_of(Percentage::from_bps(825));
        let negative = Money::from_cents(-1000).percentage_of(Percentage::from_bps(825));
        assert_eq!(positive.cents(), 83);
        assert_eq!(negative.cents(), -83);
    }

    #[test]
    fn test_percentage_of_full_and_zero() {
        let amount = Money::from_cents(12_345);
        assert_eq!(amount.percentage_of(Percentage::from_bps(10_000)), amount);
        assert!(amount.percentage_of(Percentage::zero()).is_zero());
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(Money::from_cents(-250).clamp_non_negative(), Money::zero());
        assert_eq!(Money::from_cents(250).clamp_non_negative().cents(), 250);
    }
}
