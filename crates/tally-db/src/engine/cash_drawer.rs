//! End-of-day cash drawer reconciliation.
//!
//! ```text
//! expected_cash = completed sales total (business date) + cash_in - cash_out
//! short_over    = counted_cash - expected_cash     (< 0 short, > 0 over)
//! ```
//!
//! Both are derived on every read; only the cashier's inputs are stored.

use chrono::{NaiveDate, Utc};
use tally_core::drawer::{CashDrawerSnapshot, ReconcileRequest};
use tally_core::validation::validate_amount_cents;
use tally_core::{CashDrawerEntry, ValidationError};
use tracing::info;

use super::{EngineResult, SettlementEngine};
use crate::repository::{cash_drawer, transaction};

const MAX_NOTES_LENGTH: usize = 1000;

impl SettlementEngine {
    /// Saves the drawer counts for a date and returns the derived snapshot.
    /// Saving again for the same date overwrites.
    pub async fn reconcile_cash_drawer(&self, request: ReconcileRequest) -> EngineResult<CashDrawerSnapshot> {
        validate_amount_cents("cash_in_cents", request.cash_in_cents)?;
        validate_amount_cents("cash_out_cents", request.cash_out_cents)?;
        validate_amount_cents("counted_cash_cents", request.counted_cash_cents)?;

        let notes = request
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        if notes.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTES_LENGTH) {
            return Err(ValidationError::TooLong {
                field: "notes".to_string(),
                max: MAX_NOTES_LENGTH,
            }
            .into());
        }

        let entry = CashDrawerEntry {
            operation_date: request.operation_date,
            cash_in_cents: request.cash_in_cents,
            cash_out_cents: request.cash_out_cents,
            counted_cash_cents: request.counted_cash_cents,
            notes,
            updated_at: Utc::now(),
        };

        let mut tx = self.pool.begin().await?;
        cash_drawer::upsert_entry(&mut tx, &entry).await?;
        let sales_total = transaction::completed_sales_total(&mut tx, entry.operation_date).await?;
        let snapshot = CashDrawerSnapshot::compute(entry.operation_date, sales_total, Some(&entry))?;
        tx.commit().await?;

        info!(
            date = %snapshot.operation_date,
            expected = %snapshot.expected_cash,
            counted = %snapshot.counted_cash,
            short_over = %snapshot.short_over,
            "Cash drawer reconciled"
        );

        Ok(snapshot)
    }

    /// Drawer state for a date. `recorded` is false when nothing was saved
    /// yet; the sales total is still live.
    pub async fn cash_drawer_snapshot(&self, date: NaiveDate) -> EngineResult<CashDrawerSnapshot> {
        let mut conn = self.pool.acquire().await?;
        let sales_total = transaction::completed_sales_total(&mut conn, date).await?;
        let entry = cash_drawer::fetch_entry(&mut conn, date).await?;

        Ok(CashDrawerSnapshot::compute(date, sales_total, entry.as_ref())?)
    }
}
