//! # Cash Drawer Reconciliation
//!
//! ```text
//! expected_cash = completed sales total (date) + cash_in − cash_out
//! short_over    = counted_cash − expected_cash
//!                 (negative = short, positive = over)
//! ```
//!
//! Both values are derived on every read and save and never stored, so a
//! late refund on the same date is reflected the next time the drawer is
//! viewed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::CashDrawerEntry;
use crate::validation::ValidationResult;

/// Drawer counts submitted at close of day.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReconcileRequest {
    #[ts(as = "String")]
    pub operation_date: NaiveDate,
    pub cash_in_cents: i64,
    pub cash_out_cents: i64,
    pub counted_cash_cents: i64,
    pub notes: Option<String>,
}

/// Drawer state for one date with derived values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashDrawerSnapshot {
    #[ts(as = "String")]
    pub operation_date: NaiveDate,
    /// False when nothing has been saved for the date yet.
    pub recorded: bool,
    pub sales_total: Money,
    pub cash_in: Money,
    pub cash_out: Money,
    pub counted_cash: Money,
    pub expected_cash: Money,
    pub short_over: Money,
    pub notes: Option<String>,
    #[ts(as = "Option<String>")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CashDrawerSnapshot {
    /// Builds the snapshot from a date's sales total and its stored entry.
    ///
    /// Fails with [`ValidationError::OutOfRange`] when a derived value
    /// doesn't fit in an `i64`.
    pub fn compute(
        operation_date: NaiveDate,
        sales_total: Money,
        entry: Option<&CashDrawerEntry>,
    ) -> ValidationResult<Self> {
        let (cash_in, cash_out, counted_cash) = entry
            .map(|e| {
                (
                    Money::from_cents(e.cash_in_cents),
                    Money::from_cents(e.cash_out_cents),
                    Money::from_cents(e.counted_cash_cents),
                )
            })
            .unwrap_or_default();
        let expected = expected_cash(sales_total, cash_in, cash_out)?;

        Ok(Self {
            operation_date,
            recorded: entry.is_some(),
            sales_total,
            cash_in,
            cash_out,
            counted_cash,
            expected_cash: expected,
            short_over: short_over(counted_cash, expected)?,
            notes: entry.and_then(|e| e.notes.clone()),
            updated_at: entry.map(|e| e.updated_at),
        })
    }
}

/// Cash that should be in the drawer.
pub fn expected_cash(sales_total: Money, cash_in: Money, cash_out: Money) -> ValidationResult<Money> {
    sales_total
        .checked_add(cash_in)
        .and_then(|m| m.checked_sub(cash_out))
        .ok_or_else(|| overflow("expected_cash"))
}

/// Counted minus expected.
pub fn short_over(counted_cash: Money, expected_cash: Money) -> ValidationResult<Money> {
    counted_cash
        .checked_sub(expected_cash)
        .ok_or_else(|| overflow("short_over"))
}

fn overflow(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: i64::MIN,
        max: i64::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 10).unwrap()
    }

    #[test]
    fn test_expected_and_short_over() {
        let expected = expected_cash(
            Money::from_cents(150_000),
            Money::from_cents(20_000),
            Money::from_cents(5_000),
        )
        .unwrap();
        assert_eq!(expected.cents(), 165_000);
        assert_eq!(short_over(Money::from_cents(164_000), expected).unwrap().cents(), -1_000);
        assert_eq!(short_over(Money::from_cents(165_500), expected).unwrap().cents(), 500);
    }

    #[test]
    fn test_snapshot_without_entry() {
        let snap = CashDrawerSnapshot::compute(date(), Money::from_cents(20_000), None).unwrap();
        assert!(!snap.recorded);
        assert_eq!(snap.expected_cash.cents(), 20_000);
        assert_eq!(snap.short_over.cents(), -20_000);
        assert!(snap.updated_at.is_none());
    }

    #[test]
    fn test_snapshot_with_entry() {
        let entry = CashDrawerEntry {
            operation_date: date(),
            cash_in_cents: 1_000,
            cash_out_cents: 500,
            counted_cash_cents: 20_500,
            notes: Some("float topped up".into()),
            updated_at: Utc::now(),
        };
        let snap = CashDrawerSnapshot::compute(date(), Money::from_cents(20_000), Some(&entry)).unwrap();
        assert!(snap.recorded);
        assert_eq!(snap.expected_cash.cents(), 20_500);
        assert!(snap.short_over.is_zero());
        assert_eq!(snap.notes.as_deref(), Some("float topped up"));
    }

    #[test]
    fn test_snapshot_reports_overflow() {
        let entry = CashDrawerEntry {
            operation_date: date(),
            cash_in_cents: 0,
            cash_out_cents: i64::MAX,
            counted_cash_cents: i64::MAX,
            notes: None,
            updated_at: Utc::now(),
        };
        let err = CashDrawerSnapshot::compute(date(), Money::from_cents(-2), Some(&entry)).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { ref field, .. } if field == "expected_cash"));

        let entry = CashDrawerEntry {
            cash_out_cents: 0,
            ..entry
        };
        let err = CashDrawerSnapshot::compute(date(), Money::from_cents(-1), Some(&entry)).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { ref field, .. } if field == "short_over"));
    }
}
