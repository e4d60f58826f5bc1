//! # Repository Module
//!
//! Database repository implementations for Tally POS.
//!
//! ## Two Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Caller                          SettlementEngine                      │
//! │       │                                │                                │
//! │       │ db.products().get_by_id(id)    │ pool.begin()                   │
//! │       ▼                                ▼                                │
//! │  ProductRepository              product::adjust_quantity(&mut *tx, ..) │
//! │  (pool-backed, one call =       customer::try_deduct_points(..)        │
//! │   one statement or one tx)      transaction::insert_transaction(..)    │
//! │       │                                │ tx.commit()                    │
//! │       └──────────────┬─────────────────┘                                │
//! │                      ▼                                                  │
//! │      connection-level functions (fn(&mut SqliteConnection, ..))         │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │                SQLite Database                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each module exposes its SQL as free functions over `&mut SqliteConnection`
//! so the engine can compose them inside one transaction, plus a
//! pool-backed repository struct for standalone reads and catalog setup.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Products and inventory deltas
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers and point balances
//! - [`RewardRepository`](reward::RewardRepository) - Reward catalog
//! - [`DiscountRepository`](discount::DiscountRepository) - Order discounts
//! - [`ConfigRepository`](config::ConfigRepository) - `system_configs` (exchange rate)
//! - [`TransactionRepository`](transaction::TransactionRepository) - Settled transactions
//! - [`RedemptionRepository`](redemption::RedemptionRepository) - Redemption history
//! - [`CashDrawerRepository`](cash_drawer::CashDrawerRepository) - Drawer entries

pub mod cash_drawer;
pub mod config;
pub mod customer;
pub mod discount;
pub mod product;
pub mod redemption;
pub mod reward;
pub mod transaction;
