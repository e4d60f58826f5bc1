//! Sale settlement.
//!
//! ```text
//! SettleRequest
//!   │ validate_settle_request          (no I/O, names the bad field)
//!   ▼
//! BEGIN
//!   │ products / customer / discount   (unknown id → Validation, rollback)
//!   │ exchange rate                    (once)
//!   │ reward → redemption::resolve     (failure → skip + warn, sale goes on)
//!   │        → guarded point deduction
//!   │ price_cart
//!   │ INSERT transaction, items, redemption
//!   │ quantity -= Σ qty per product    (free lines only with the policy on)
//!   │ points += floor(total × rate)    + eligibility
//!   ▼
//! COMMIT → SettlementReceipt
//! ```

use std::collections::BTreeMap;

use chrono::Utc;
use sqlx::SqliteConnection;
use tally_core::pricing::{cart_subtotal, price_cart, PricedLine};
use tally_core::redemption::{self, Grant, SkipReason};
use tally_core::settlement::{SettleRequest, SettlementReceipt};
use tally_core::validation::validate_settle_request;
use tally_core::{
    Customer, Money, Product, RedemptionRecord, Reward, RewardKind, Transaction, TransactionItem,
    TransactionStatus, ValidationError, MAX_AMOUNT_CENTS,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{EngineResult, SettlementEngine};
use crate::repository::{config, customer, discount, product, redemption as redemptions, reward, transaction};

fn unknown_reference(field: impl Into<String>, id: &str) -> ValidationError {
    ValidationError::UnknownReference {
        field: field.into(),
        id: id.to_string(),
    }
}

impl SettlementEngine {
    /// Settles a cart as one completed transaction.
    ///
    /// A requested reward that can't be honored is skipped and reported in
    /// [`SettlementReceipt::reward_skipped`]; every other failure rolls the
    /// whole sale back.
    pub async fn settle(&self, request: SettleRequest) -> EngineResult<SettlementReceipt> {
        validate_settle_request(&request)?;

        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let mut lines = Vec::with_capacity(request.lines.len() + 1);
        for (i, line) in request.lines.iter().enumerate() {
            let product = product::fetch_product(&mut tx, &line.product_id)
                .await?
                .ok_or_else(|| unknown_reference(format!("lines[{i}].product_id"), &line.product_id))?;

            let unit_price = line
                .unit_price_cents
                .map(Money::from_cents)
                .unwrap_or_else(|| product.price());
            let priced = PricedLine::sold(
                product.id,
                line.quantity,
                unit_price,
                Money::from_cents(line.line_discount_cents),
            );

            // catalog prices skip request validation
            let gross = priced.checked_gross().ok_or_else(|| ValidationError::OutOfRange {
                field: format!("lines[{i}].unit_price_cents"),
                min: 0,
                max: MAX_AMOUNT_CENTS,
            })?;
            if priced.line_discount > gross {
                return Err(ValidationError::OutOfRange {
                    field: format!("lines[{i}].line_discount_cents"),
                    min: 0,
                    max: gross.cents(),
                }
                .into());
            }
            lines.push(priced);
        }

        let buyer = match request.customer_id.as_deref() {
            Some(id) => Some(
                customer::fetch_customer(&mut tx, id)
                    .await?
                    .ok_or_else(|| unknown_reference("customer_id", id))?,
            ),
            None => None,
        };

        let order_discount = match request.discount_id.as_deref() {
            Some(id) => {
                let found = discount::fetch_discount(&mut tx, id)
                    .await?
                    .ok_or_else(|| unknown_reference("discount_id", id))?;
                if found.is_active {
                    Some(found)
                } else {
                    warn!(discount_id = %id, "Inactive discount ignored");
                    None
                }
            }
            None => None,
        };

        let rate = config::exchange_rate(&mut tx).await?;
        let subtotal = cart_subtotal(&lines)?;

        // Reward redemption; any failure here only skips the reward.
        let RewardClaim {
            applied: applied_reward,
            skipped: reward_skipped,
            discount: reward_discount,
            free_line,
            free_product: free_item_product,
            points_spent: points_redeemed,
        } = match request.reward_id.as_deref() {
            Some(reward_id) => claim_reward(&mut tx, reward_id, buyer.as_ref(), subtotal).await?,
            None => RewardClaim::default(),
        };
        lines.extend(free_line);

        let breakdown = price_cart(
            &lines,
            order_discount.as_ref().map(|d| d.percentage()),
            reward_discount,
        )?;
        let points_earned = if buyer.is_some() {
            rate.points_for(breakdown.total)
        } else {
            0
        };

        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            customer_id: buyer.as_ref().map(|c| c.id.clone()),
            subtotal_cents: breakdown.subtotal.cents(),
            order_discount_cents: breakdown.order_discount.cents(),
            reward_discount_cents: breakdown.reward_discount.cents(),
            total_cents: breakdown.total.cents(),
            points_earned,
            payment_mode: request.payment_mode,
            reference_number: request
                .reference_number
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
            discount_id: order_discount.as_ref().map(|d| d.id.clone()),
            reward_id: applied_reward.as_ref().map(|r| r.id.clone()),
            status: TransactionStatus::Completed,
            status_reason: None,
            status_changed_at: None,
            business_date: now.date_naive(),
            created_at: now,
        };
        transaction::insert_transaction(&mut tx, &transaction).await?;

        let mut items = Vec::with_capacity(lines.len());
        let mut destock: BTreeMap<&str, i64> = BTreeMap::new();
        for (position, line) in lines.iter().enumerate() {
            let stock_decremented = !line.is_free_item || self.policy.free_item_decrements_stock;
            let item = TransactionItem {
                id: Uuid::new_v4().to_string(),
                transaction_id: transaction.id.clone(),
                position: position as i64,
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
                line_discount_cents: line.line_discount.cents(),
                subtotal_cents: line.gross().cents(),
                is_free_item: line.is_free_item,
                stock_decremented,
            };
            transaction::insert_item(&mut tx, &item).await?;

            if stock_decremented {
                *destock.entry(line.product_id.as_str()).or_default() += line.quantity;
            }
            items.push(item);
        }

        for (product_id, quantity) in &destock {
            let (remaining, status) = product::adjust_quantity(&mut tx, product_id, -quantity).await?;
            debug!(product_id = %product_id, sold = quantity, remaining, status = status.as_str(), "Inventory decremented");
        }

        if let (Some(reward), Some(holder)) = (&applied_reward, &buyer) {
            let record = RedemptionRecord {
                id: Uuid::new_v4().to_string(),
                customer_id: holder.id.clone(),
                reward_id: Some(reward.id.clone()),
                transaction_id: Some(transaction.id.clone()),
                points_spent: points_redeemed,
                redeemed_at: now,
            };
            redemptions::insert_redemption(&mut tx, &record).await?;
        }

        let buyer = match buyer {
            Some(holder) => {
                if points_earned > 0 {
                    customer::apply_points_delta(&mut tx, &holder.id, points_earned).await?;
                }
                customer::sync_eligibility(&mut tx, &holder.id).await?;
                customer::fetch_customer(&mut tx, &holder.id).await?
            }
            None => None,
        };

        tx.commit().await?;

        info!(
            transaction_id = %transaction.id,
            total = %breakdown.total,
            items = items.len(),
            points_earned,
            reward_applied = applied_reward.is_some(),
            "Sale settled"
        );

        Ok(SettlementReceipt {
            transaction,
            items,
            points_earned,
            order_discount: breakdown.order_discount,
            reward_discount: breakdown.reward_discount,
            applied_reward,
            reward_skipped,
            free_item_product,
            customer: buyer,
        })
    }
}

// =============================================================================
// Reward Claim
// =============================================================================

/// What the requested reward contributed to the sale.
#[derive(Debug, Default)]
pub(super) struct RewardClaim {
    pub applied: Option<Reward>,
    pub skipped: Option<SkipReason>,
    pub discount: Money,
    pub free_line: Option<PricedLine>,
    pub free_product: Option<Product>,
    pub points_spent: i64,
}

impl RewardClaim {
    fn skipped(reward_id: &str, reason: SkipReason) -> Self {
        warn!(reward_id = %reward_id, reason = %reason, "Reward skipped, settling at full price");
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }
}

/// Resolves a reward requested at the register and spends its points.
///
/// Every failed precondition comes back as a skip; only storage errors are
/// returned as errors.
pub(super) async fn claim_reward(
    conn: &mut SqliteConnection,
    reward_id: &str,
    buyer: Option<&Customer>,
    subtotal: Money,
) -> EngineResult<RewardClaim> {
    let found = reward::fetch_reward(&mut *conn, reward_id).await?;
    let granted_product = match found
        .as_ref()
        .filter(|r| r.kind == RewardKind::FreeItem)
        .and_then(|r| r.product_id.as_deref())
    {
        Some(product_id) => product::fetch_product(&mut *conn, product_id).await?,
        None => None,
    };

    let resolved = match redemption::resolve(found.as_ref(), buyer, subtotal, granted_product.as_ref()) {
        Ok(resolved) => resolved,
        Err(reason) => return Ok(RewardClaim::skipped(reward_id, reason)),
    };
    let Some(holder) = buyer else {
        return Ok(RewardClaim::skipped(reward_id, SkipReason::CustomerMissing));
    };

    let Some(balance) = customer::try_deduct_points(&mut *conn, &holder.id, resolved.points_cost).await? else {
        // another register spent the points first
        let available = customer::fetch_customer(&mut *conn, &holder.id)
            .await?
            .map(|c| c.points)
            .unwrap_or(0);
        return Ok(RewardClaim::skipped(
            reward_id,
            SkipReason::InsufficientPoints {
                available,
                required: resolved.points_cost,
            },
        ));
    };
    debug!(reward_id = %reward_id, cost = resolved.points_cost, balance, "Reward redeemed");

    let discount = resolved.discount();
    let (free_line, free_product) = match resolved.grant {
        Grant::FreeItem(line) => (Some(line), granted_product),
        Grant::Discount(_) => (None, None),
    };

    Ok(RewardClaim {
        applied: found,
        skipped: None,
        discount,
        free_line,
        free_product,
        points_spent: resolved.points_cost,
    })
}
