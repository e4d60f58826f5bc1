//! Refunds and cancellations.
//!
//! ```text
//!                 refund(reason)
//!   Completed ───────────────────► Refunded   points reversed, stock kept
//!       │
//!       │         cancel(reason)
//!       └──────────────────────────► Canceled  points reversed, stock restored
//!
//!   Refunded / Canceled are terminal: any further reversal is rejected.
//! ```
//!
//! Points are reversed at the exchange rate in force now, not the one used
//! at sale time, floored so the balance never goes below zero. Points spent
//! on a reward during the sale are not given back.

use std::collections::BTreeMap;

use chrono::Utc;
use tally_core::settlement::{transition, RestockedLine, ReversalKind, ReversalOutcome};
use tally_core::validation::{validate_id, validate_reason};
use tally_core::CoreError;
use tracing::{debug, info, warn};

use super::{EngineResult, SettlementEngine};
use crate::repository::{config, customer, product, transaction};

impl SettlementEngine {
    /// Marks a completed sale refunded and takes back its points.
    /// Inventory is untouched.
    pub async fn refund(&self, transaction_id: &str, reason: &str) -> EngineResult<ReversalOutcome> {
        self.reverse(transaction_id, reason, ReversalKind::Refund).await
    }

    /// Marks a completed sale canceled, puts its stock back and takes back
    /// its points.
    pub async fn cancel(&self, transaction_id: &str, reason: &str) -> EngineResult<ReversalOutcome> {
        self.reverse(transaction_id, reason, ReversalKind::Cancel).await
    }

    async fn reverse(
        &self,
        transaction_id: &str,
        reason: &str,
        kind: ReversalKind,
    ) -> EngineResult<ReversalOutcome> {
        validate_id("transaction_id", transaction_id)?;
        let reason = validate_reason(reason)?;

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let current = transaction::fetch_transaction(&mut tx, transaction_id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.to_string()))?;
        let next = transition(&current.id, current.status, kind)?;

        // The status check above can race another register; the guarded
        // update is what decides.
        if !transaction::mark_reversed(&mut tx, transaction_id, next, &reason, now).await? {
            let status = transaction::fetch_transaction(&mut tx, transaction_id)
                .await?
                .map(|t| t.status)
                .unwrap_or(current.status);
            return Err(CoreError::InvalidTransactionStatus {
                id: transaction_id.to_string(),
                current: status,
            }
            .into());
        }

        let mut restocked = Vec::new();
        if kind.restocks() {
            let items = transaction::fetch_items(&mut tx, transaction_id).await?;
            let mut restock: BTreeMap<String, i64> = BTreeMap::new();
            for item in items.into_iter().filter(|i| i.stock_decremented) {
                *restock.entry(item.product_id).or_default() += item.quantity;
            }
            for (product_id, quantity) in restock {
                let (on_hand, status) = product::adjust_quantity(&mut tx, &product_id, quantity).await?;
                debug!(product_id = %product_id, quantity, on_hand, status = status.as_str(), "Inventory restored");
                restocked.push(RestockedLine {
                    product_id,
                    quantity,
                });
            }
        }

        let mut points_reversed = 0;
        let mut holder = None;
        if let Some(customer_id) = current.customer_id.as_deref() {
            let rate = config::exchange_rate(&mut tx).await?;
            let points = rate.points_for(current.total());

            match customer::fetch_customer(&mut tx, customer_id).await? {
                Some(before) => {
                    if points > 0 {
                        let after = customer::apply_points_delta(&mut tx, customer_id, -points)
                            .await?
                            .unwrap_or(0);
                        points_reversed = before.points - after;
                    }
                    customer::sync_eligibility(&mut tx, customer_id).await?;
                    holder = customer::fetch_customer(&mut tx, customer_id).await?;
                }
                None => warn!(customer_id = %customer_id, "Customer gone, no points to reverse"),
            }
        }

        let transaction = transaction::fetch_transaction(&mut tx, transaction_id)
            .await?
            .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.to_string()))?;

        tx.commit().await?;

        info!(
            transaction_id = %transaction_id,
            status = transaction.status.as_str(),
            points_reversed,
            restocked_products = restocked.len(),
            "Transaction reversed"
        );

        Ok(ReversalOutcome {
            transaction,
            points_reversed,
            restocked,
            customer: holder,
        })
    }
}
