//! # tally-db: Database Layer and Settlement Engine for Tally POS
//!
//! This crate owns every SQLite operation of the settlement & loyalty engine:
//! the pool, embedded migrations, repositories, and the engine services that
//! run each business operation as one transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally POS Data Flow                              │
//! │                                                                         │
//! │  Register / back office (SettleRequest, reason, drawer counts)         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     tally-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   engine      │    │  repository   │    │  migrations  │  │   │
//! │  │   │               │    │               │    │  (embedded)  │  │   │
//! │  │   │ settle        │───►│ product       │    │ 001_initial  │  │   │
//! │  │   │ refund/cancel │    │ customer      │    │  _schema.sql │  │   │
//! │  │   │ redeem        │    │ reward, ...   │    │              │  │   │
//! │  │   │ cash drawer   │    │               │    │              │  │   │
//! │  │   └───────┬───────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │           │    tally-core      │                               │   │
//! │  │           │   (pure rules)     │                               │   │
//! │  │           ▼                    ▼                               │   │
//! │  │   ┌─────────────────────────────────────┐   ┌──────────────┐  │   │
//! │  │   │  Database (pool.rs, SqlitePool)     │   │ TallyConfig  │  │   │
//! │  │   └─────────────────────────────────────┘   └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - `tally.toml` + environment configuration
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Per-table SQL
//! - [`engine`] - Settle, refund, cancel, redeem, reconcile
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, TallyConfig};
//!
//! let config = TallyConfig::load(None)?;
//! let db = Database::new(config.db_config()).await?;
//! let engine = db.engine(config.policy);
//!
//! let receipt = engine.settle(request).await?;
//! println!("{} earned {} points", receipt.transaction.total(), receipt.points_earned);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod test_utils;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, TallyConfig};
pub use engine::{EngineError, EngineResult, ErrorKind, SettlementEngine};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::cash_drawer::CashDrawerRepository;
pub use repository::config::ConfigRepository;
pub use repository::customer::{CustomerRepository, NewCustomer};
pub use repository::discount::DiscountRepository;
pub use repository::product::{NewProduct, ProductRepository};
pub use repository::redemption::RedemptionRepository;
pub use repository::reward::{NewReward, RewardRepository};
pub use repository::transaction::{TransactionFilter, TransactionRepository};
