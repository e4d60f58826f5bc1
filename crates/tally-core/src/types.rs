//! # Domain Types
//!
//! Core domain types used throughout Tally POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  Transaction    │   │ TransactionItem │   │    Customer     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  transaction_id │   │  id (UUID)      │       │
//! │  │  status         │   │  position       │   │  points (≥ 0)   │       │
//! │  │  total_cents    │   │  is_free_item   │   │  eligible       │       │
//! │  │  business_date  │   │  stock_decr.    │   │  contact_number │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Percentage    │   │ TransactionSt.  │   │   RewardKind    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Completed      │   │  Percentage-    │       │
//! │  │  1000 = 10%     │   │  Refunded       │   │   Discount      │       │
//! │  └─────────────────┘   │  Canceled       │   │  FreeItem       │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, contact_number) - human-readable, potentially mutable
//!
//! Monetary fields are stored as `*_cents: i64` with [`Money`] accessors, the
//! same shape the database rows have.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::inventory::StockStatus;
use crate::money::Money;

// =============================================================================
// Percentage
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1000 bps = 10% (employee discount), 2000 bps = 20% (senior citizen)
///
/// Order discounts and percentage rewards accept 0.01% to 100%, which is
/// exactly the integer range 1..=10000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Percentage(u32);

impl Percentage {
    /// Upper bound: 100%.
    pub const MAX_BPS: u32 = 10_000;

    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percentage(bps)
    }

    /// Returns the percentage in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the value as a percentage (for display only).
    #[inline]
    pub fn percent(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percentage(0)
    }

    /// Checks if the percentage is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Percentage {
    fn default() -> Self {
        Percentage::zero()
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

// =============================================================================
// Payment Mode
// =============================================================================

/// How a transaction was paid.
///
/// E-wallet payments must carry a reference number; cash payments must not.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    /// Physical cash payment.
    Cash,
    /// GCash / Maya style wallet transfer.
    EWallet,
}

impl PaymentMode {
    /// Whether a reference number must accompany this payment mode.
    #[inline]
    pub const fn requires_reference(&self) -> bool {
        matches!(self, PaymentMode::EWallet)
    }
}

// =============================================================================
// Transaction Status
// =============================================================================

/// The status of a settled transaction.
///
/// ```text
///            ┌──── refund ────► Refunded  (terminal)
/// Completed ─┤
///            └──── cancel ────► Canceled  (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Settled and counted in the day's sales.
    Completed,
    /// Money returned; inventory kept as sold.
    Refunded,
    /// Voided; inventory restored.
    Canceled,
}

impl TransactionStatus {
    /// Stored / wire representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Refunded => "refunded",
            TransactionStatus::Canceled => "canceled",
        }
    }

    /// Refunded and Canceled accept no further transitions.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Completed)
    }
}

impl Default for TransactionStatus {
    fn default() -> Self {
        TransactionStatus::Completed
    }
}

// =============================================================================
// Reward Kind
// =============================================================================

/// What a reward grants when redeemed.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    /// Percentage off the cart subtotal.
    PercentageDiscount,
    /// One unit of a product, added to the cart at zero net price.
    FreeItem,
}

// =============================================================================
// Product
// =============================================================================

/// The engine's view of an inventory product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Current selling price in centavos.
    pub price_cents: i64,

    /// On-hand quantity. May go negative; sales are never blocked on stock.
    pub quantity: i64,

    /// At or below this level the product shows as low stock.
    pub reorder_level: i64,

    /// Cached display status, refreshed whenever the engine moves quantity.
    pub stock_status: StockStatus,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A loyalty customer and their point ledger state.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// Unique mobile number (e.g. "09123456789").
    pub contact_number: String,
    /// Point balance, never negative.
    pub points: i64,
    /// `points >= cheapest reward cost`, persisted on every point change.
    pub eligible_for_rewards: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Reward
// =============================================================================

/// A reward definition from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Reward {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub kind: RewardKind,
    /// Points cost, at least 1.
    pub points_needed: i64,
    /// Discount in basis points; set for `PercentageDiscount`.
    pub value_bps: Option<u32>,
    /// Granted product; set for `FreeItem` (nulled if the product is deleted).
    pub product_id: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Reward {
    /// Discount rate for percentage rewards.
    #[inline]
    pub fn percentage(&self) -> Option<Percentage> {
        self.value_bps.map(Percentage::from_bps)
    }
}

// =============================================================================
// Discount
// =============================================================================

/// An order-level discount (senior citizen, PWD, employee...).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Discount {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub percentage_bps: u32,
    pub is_active: bool,
}

impl Discount {
    #[inline]
    pub fn percentage(&self) -> Percentage {
        Percentage::from_bps(self.percentage_bps)
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A settled sale with its computed breakdown.
///
/// Immutable after settlement except for `status`, the reversal fields and
/// the nulling of a deleted reward/discount reference.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    pub customer_id: Option<String>,
    pub subtotal_cents: i64,
    pub order_discount_cents: i64,
    pub reward_discount_cents: i64,
    /// Final amount paid, never negative.
    pub total_cents: i64,
    /// Points accrued at settlement (0 for walk-in sales).
    pub points_earned: i64,
    pub payment_mode: PaymentMode,
    pub reference_number: Option<String>,
    pub discount_id: Option<String>,
    pub reward_id: Option<String>,
    pub status: TransactionStatus,
    pub status_reason: Option<String>,
    #[ts(as = "Option<String>")]
    pub status_changed_at: Option<DateTime<Utc>>,
    /// UTC calendar date of `created_at`; drives the cash drawer.
    #[ts(as = "String")]
    pub business_date: NaiveDate,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Transaction Item
// =============================================================================

/// A line of a settled transaction.
/// Uses snapshot pattern to freeze the unit price at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    /// Cart order, 0-based. An injected free line comes last.
    pub position: i64,
    pub product_id: String,
    pub quantity: i64,
    /// Unit price in centavos at time of sale (frozen).
    pub unit_price_cents: i64,
    pub line_discount_cents: i64,
    /// quantity × unit price.
    pub subtotal_cents: i64,
    pub is_free_item: bool,
    /// Whether settlement took this line's quantity out of inventory.
    pub stock_decremented: bool,
}

impl TransactionItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Contribution to the transaction subtotal.
    #[inline]
    pub fn net(&self) -> Money {
        if self.is_free_item {
            Money::zero()
        } else {
            Money::from_cents(self.subtotal_cents - self.line_discount_cents)
        }
    }
}

// =============================================================================
// Redemption Record
// =============================================================================

/// One successful reward redemption. Never updated except for the nulling of
/// a deleted reward reference.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RedemptionRecord {
    pub id: String,
    pub customer_id: String,
    pub reward_id: Option<String>,
    /// Set when redeemed during a sale.
    pub transaction_id: Option<String>,
    pub points_spent: i64,
    #[ts(as = "String")]
    pub redeemed_at: DateTime<Utc>,
}

// =============================================================================
// Cash Drawer Entry
// =============================================================================

/// Stored drawer counts for one operational date. Expected cash and
/// short/over are derived on read, see [`crate::drawer`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashDrawerEntry {
    #[ts(as = "String")]
    pub operation_date: NaiveDate,
    pub cash_in_cents: i64,
    pub cash_out_cents: i64,
    pub counted_cash_cents: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_from_bps() {
        let rate = Percentage::from_bps(1250);
        assert_eq!(rate.bps(), 1250);
        assert!((rate.percent() - 12.5).abs() < 0.001);
        assert_eq!(rate.to_string(), "12.50%");
    }

    #[test]
    fn test_transaction_status_default_and_terminal() {
        assert_eq!(TransactionStatus::default(), TransactionStatus::Completed);
        assert!(!TransactionStatus::Completed.is_terminal());
        assert!(TransactionStatus::Refunded.is_terminal());
        assert!(TransactionStatus::Canceled.is_terminal());
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&PaymentMode::EWallet).unwrap(), "\"ewallet\"");
        assert_eq!(
            serde_json::to_string(&RewardKind::PercentageDiscount).unwrap(),
            "\"percentage_discount\""
        );
        assert_eq!(
            serde_json::to_string(&TransactionStatus::Canceled).unwrap(),
            "\"canceled\""
        );
    }

    #[test]
    fn test_free_item_contributes_nothing() {
        let item = TransactionItem {
            id: "i1".into(),
            transaction_id: "t1".into(),
            position: 1,
            product_id: "p1".into(),
            quantity: 1,
            unit_price_cents: 15_000,
            line_discount_cents: 15_000,
            subtotal_cents: 15_000,
            is_free_item: true,
            stock_decremented: false,
        };
        assert!(item.net().is_zero());
    }
}
