//! # Inventory Status
//!
//! Stock classification for the cached `stock_status` display column.
//!
//! ```text
//!   quantity ≤ 0               → OutOfStock
//!   0 < quantity ≤ reorder     → LowStock
//!   quantity > reorder         → InStock
//! ```
//!
//! Settlement never blocks on stock, so quantity can go negative; the
//! display simply reads "out of stock" until a cancel or a receiving
//! workflow brings it back up.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Display status derived from on-hand quantity and reorder level.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    InStock,
}

impl StockStatus {
    /// Classifies a quantity against its reorder level.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::inventory::StockStatus;
    ///
    /// assert_eq!(StockStatus::classify(-3, 10), StockStatus::OutOfStock);
    /// assert_eq!(StockStatus::classify(10, 10), StockStatus::LowStock);
    /// assert_eq!(StockStatus::classify(11, 10), StockStatus::InStock);
    /// ```
    pub const fn classify(quantity: i64, reorder_level: i64) -> Self {
        if quantity <= 0 {
            StockStatus::OutOfStock
        } else if quantity <= reorder_level {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    /// Stored representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            StockStatus::OutOfStock => "out_of_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::InStock => "in_stock",
        }
    }
}
