//! # Settlement
//!
//! Request and result records for settlement, plus the transaction status
//! machine that governs reversals.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   settle() ──► Completed ──── refund(reason) ───► Refunded             │
//! │                    │          loyalty reversed     (terminal)          │
//! │                    │          inventory kept                           │
//! │                    │                                                    │
//! │                    └───────── cancel(reason) ───► Canceled             │
//! │                               loyalty reversed     (terminal)          │
//! │                               inventory restored                       │
//! │                                                                         │
//! │   Any transition out of a terminal state is rejected.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The storage layer enforces the same rule with a guarded update so two
//! concurrent reversals cannot both win; [`transition`] is the check both
//! sides agree on.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::redemption::SkipReason;
use crate::types::{
    Customer, PaymentMode, Product, RedemptionRecord, Reward, Transaction, TransactionItem,
    TransactionStatus,
};

// =============================================================================
// Requests
// =============================================================================

/// One cart line as submitted by the register.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
    /// Price charged per unit. Defaults to the catalog price when absent.
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
    /// Amount off this line.
    #[serde(default)]
    pub line_discount_cents: i64,
}

impl CartLine {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price_cents: None,
            line_discount_cents: 0,
        }
    }

    pub fn with_unit_price(mut self, cents: i64) -> Self {
        self.unit_price_cents = Some(cents);
        self
    }

    pub fn with_line_discount(mut self, cents: i64) -> Self {
        self.line_discount_cents = cents;
        self
    }
}

/// Everything needed to settle a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettleRequest {
    pub lines: Vec<CartLine>,
    pub customer_id: Option<String>,
    pub payment_mode: PaymentMode,
    pub reference_number: Option<String>,
    /// Order-level discount.
    pub discount_id: Option<String>,
    /// Reward to redeem during this sale.
    pub reward_id: Option<String>,
}

impl SettleRequest {
    /// A walk-in cash sale.
    pub fn cash(lines: Vec<CartLine>) -> Self {
        Self {
            lines,
            customer_id: None,
            payment_mode: PaymentMode::Cash,
            reference_number: None,
            discount_id: None,
            reward_id: None,
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// A settled transaction with its breakdown.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SettlementReceipt {
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
    pub points_earned: i64,
    pub order_discount: Money,
    pub reward_discount: Money,
    /// Reward actually redeemed.
    pub applied_reward: Option<Reward>,
    /// Why a requested reward was not applied.
    pub reward_skipped: Option<SkipReason>,
    /// Product granted by a free-item reward.
    pub free_item_product: Option<Product>,
    /// Customer after accrual and redemption.
    pub customer: Option<Customer>,
}

/// Units put back on a product by a cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RestockedLine {
    pub product_id: String,
    pub quantity: i64,
}

/// Result of a refund or cancellation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReversalOutcome {
    pub transaction: Transaction,
    pub points_reversed: i64,
    /// Empty for refunds.
    pub restocked: Vec<RestockedLine>,
    /// Customer after the reversal, when one is attached and still exists.
    pub customer: Option<Customer>,
}

/// Result of a self-serve redemption.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RedeemOutcome {
    pub customer: Customer,
    pub reward: Reward,
    pub record: RedemptionRecord,
}

/// A stored transaction with its lines in cart order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransactionDetail {
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
}

// =============================================================================
// Status Machine
// =============================================================================

/// Which reversal is being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReversalKind {
    Refund,
    Cancel,
}

impl ReversalKind {
    /// Status the transaction ends in.
    pub const fn target(&self) -> TransactionStatus {
        match self {
            ReversalKind::Refund => TransactionStatus::Refunded,
            ReversalKind::Cancel => TransactionStatus::Canceled,
        }
    }

    /// Whether inventory is put back.
    pub const fn restocks(&self) -> bool {
        matches!(self, ReversalKind::Cancel)
    }
}

/// Validates a reversal from `current` and returns the new status.
///
/// ## Example
/// ```rust
/// use tally_core::settlement::{transition, ReversalKind};
/// use tally_core::types::TransactionStatus;
///
/// let next = transition("T1", TransactionStatus::Completed, ReversalKind::Refund).unwrap();
/// assert_eq!(next, TransactionStatus::Refunded);
/// assert!(transition("T1", next, ReversalKind::Cancel).is_err());
/// ```
pub fn transition(
    id: &str,
    current: TransactionStatus,
    kind: ReversalKind,
) -> CoreResult<TransactionStatus> {
    if current.is_terminal() {
        return Err(CoreError::InvalidTransactionStatus {
            id: id.to_string(),
            current,
        });
    }
    Ok(kind.target())
}

// =============================================================================
// Unit Tests
// =============================================================================
