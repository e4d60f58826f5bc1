//! # Settlement Engine
//!
//! Every state-changing business operation, each run as ONE SQLite
//! transaction.
//!
//! ## Units of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         SettlementEngine                                │
//! │                                                                         │
//! │  settle(request)          validate → look up → resolve reward →        │
//! │                           price → insert txn + items → destock →       │
//! │                           accrue points → eligibility → COMMIT          │
//! │                                                                         │
//! │  refund(id, reason)       guard status → reverse points → COMMIT       │
//! │  cancel(id, reason)       guard status → restock → reverse points →    │
//! │                           COMMIT                                        │
//! │                                                                         │
//! │  redeem_reward(c, r)      check → guarded deduct → record → COMMIT     │
//! │  add_points(c, n)         delta → eligibility → COMMIT                 │
//! │                                                                         │
//! │  reconcile_cash_drawer    upsert entry → sales total → COMMIT          │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: nothing is applied.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The exchange rate is read once per unit, inside its transaction.
//! Pricing, redemption and status rules are the pure functions in
//! `tally_core`; this module only sequences them against the store.

mod cash_drawer;
mod error;
mod redeem;
mod reversal;
mod settle;


pub use error::{EngineError, EngineResult, ErrorKind};

use sqlx::SqlitePool;
use tally_core::validation::validate_id;
use tally_core::{CoreError, ExchangeRate, Reward, SettlementPolicy};
use tracing::debug;

use crate::repository::reward::RewardRepository;
use crate::repository::{config, customer};

/// Handle for running settlement operations against a pool.
///
/// ## Usage
/// ```rust,ignore
/// let engine = db.engine(config.policy);
///
/// let receipt = engine.settle(SettleRequest::cash(lines)).await?;
/// engine.refund(&receipt.transaction.id, "wrong order").await?;
/// ```
#[derive(Debug, Clone)]
pub struct SettlementEngine {
    pool: SqlitePool,
    policy: SettlementPolicy,
}

impl SettlementEngine {
    pub fn new(pool: SqlitePool, policy: SettlementPolicy) -> Self {
        SettlementEngine { pool, policy }
    }

    /// Policy switches in force.
    pub fn policy(&self) -> SettlementPolicy {
        self.policy
    }

    /// Current loyalty exchange rate.
    pub async fn exchange_rate(&self) -> EngineResult<ExchangeRate> {
        let mut conn = self.pool.acquire().await?;
        Ok(config::exchange_rate(&mut conn).await?)
    }

    /// Validates and stores a new exchange rate. Applies to later sales and
    /// to reversals of earlier ones.
    pub async fn set_exchange_rate(&self, rate: ExchangeRate) -> EngineResult<ExchangeRate> {
        rate.validate()?;
        let mut conn = self.pool.acquire().await?;
        config::store_exchange_rate(&mut conn, &rate).await?;
        Ok(rate)
    }

    /// Active rewards the customer can pay for, most expensive first.
    ///
    /// Empty when the customer's stored eligibility flag is off.
    pub async fn available_rewards(&self, customer_id: &str) -> EngineResult<Vec<Reward>> {
        validate_id("customer_id", customer_id)?;

        let mut conn = self.pool.acquire().await?;
        let customer = customer::fetch_customer(&mut conn, customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(customer_id.to_string()))?;
        drop(conn);

        if !customer.eligible_for_rewards {
            debug!(customer_id = %customer_id, points = customer.points, "Not eligible for rewards");
            return Ok(Vec::new());
        }

        let rewards = RewardRepository::new(self.pool.clone())
            .affordable(customer.points)
            .await?;
        Ok(rewards)
    }
}
