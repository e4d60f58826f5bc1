//! # tally-core: Pure Business Logic for Tally POS
//!
//! This crate is the **heart** of the settlement & loyalty engine. It holds
//! every pricing, redemption, status and loyalty rule as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Tally POS Back Office                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │         Register / back-office callers (HTTP, CLI, ...)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ SettleRequest, reason, counts          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │         tally-db: SettlementEngine (one SQLite tx per call)     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  pricing  │  │redemption │  │settlement │  │  loyalty  │  │   │
//! │  │   │ subtotal  │  │ resolve   │  │ Completed │  │ accrual   │  │   │
//! │  │   │ discounts │  │ skip      │  │ →Refunded │  │ eligible  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   money   │  │   types   │  │  drawer   │  │ inventory │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Transaction, Customer, Reward, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Subtotal, order discount, reward discount, final total
//! - [`redemption`] - Reward preconditions and grants
//! - [`settlement`] - Requests, receipts and the status machine
//! - [`loyalty`] - Exchange rate, accrual, eligibility, policy switches
//! - [`drawer`] - Cash drawer expected cash and short/over
//! - [`inventory`] - Stock status classification
//! - [`error`] - Domain error types
//! - [`validation`] - Request validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in centavos (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::loyalty::ExchangeRate;
//! use tally_core::money::Money;
//! use tally_core::pricing::{price_cart, PricedLine};
//! use tally_core::types::Percentage;
//!
//! // [{A, qty 2, ₱100.00}] with a 10% order discount
//! let lines = vec![PricedLine::sold("A", 2, Money::from_cents(10_000), Money::zero())];
//! let breakdown = price_cart(&lines, Some(Percentage::from_bps(1000)), Money::zero()).unwrap();
//! assert_eq!(breakdown.total.cents(), 18_000);
//!
//! // ₱100 = 10 points
//! assert_eq!(ExchangeRate::default().points_for(breakdown.total), 18);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod drawer;
pub mod error;
pub mod inventory;
pub mod loyalty;
pub mod money;
pub mod pricing;
pub mod redemption;
pub mod settlement;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tally_core::Money` instead of
// `use tally_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use inventory::StockStatus;
pub use loyalty::{ExchangeRate, SettlementPolicy};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart
///
/// ## Business Reason
/// Prevents runaway carts and ensures reasonable transaction sizes.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10)
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum length of a refund/cancel reason.
pub const MAX_REASON_LENGTH: usize = 255;

/// Largest amount accepted on any input, in centavos (₱100,000,000.00).
///
/// ## Business Reason
/// A full cart at this price (`MAX_CART_ITEMS × MAX_ITEM_QUANTITY`) stays
/// far inside `i64`, so cart and drawer sums cannot overflow.
pub const MAX_AMOUNT_CENTS: i64 = 10_000_000_000;
