//! Loyalty operations outside a sale: self-serve redemption, manual point
//! awards and eligibility refresh.

use chrono::Utc;
use tally_core::redemption::check_redeemable;
use tally_core::settlement::RedeemOutcome;
use tally_core::validation::{validate_id, validate_points_award};
use tally_core::{CoreError, Customer, RedemptionRecord};
use tracing::info;
use uuid::Uuid;

use super::{EngineResult, SettlementEngine};
use crate::repository::{customer, redemption as redemptions, reward};

impl SettlementEngine {
    /// Spends a customer's points on a reward outside of a sale.
    ///
    /// Unlike a reward requested at the register, every failed precondition
    /// is returned as an error.
    pub async fn redeem_reward(&self, customer_id: &str, reward_id: &str) -> EngineResult<RedeemOutcome> {
        validate_id("customer_id", customer_id)?;
        validate_id("reward_id", reward_id)?;

        let mut tx = self.pool.begin().await?;

        let reward = reward::fetch_reward(&mut tx, reward_id)
            .await?
            .ok_or_else(|| CoreError::RewardNotFound(reward_id.to_string()))?;
        let holder = customer::fetch_customer(&mut tx, customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(customer_id.to_string()))?;

        check_redeemable(&reward, &holder)?;

        if customer::try_deduct_points(&mut tx, customer_id, reward.points_needed)
            .await?
            .is_none()
        {
            let available = customer::fetch_customer(&mut tx, customer_id)
                .await?
                .map(|c| c.points)
                .unwrap_or(0);
            return Err(CoreError::InsufficientPoints {
                available,
                required: reward.points_needed,
            }
            .into());
        }

        let record = RedemptionRecord {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            reward_id: Some(reward.id.clone()),
            transaction_id: None,
            points_spent: reward.points_needed,
            redeemed_at: Utc::now(),
        };
        redemptions::insert_redemption(&mut tx, &record).await?;

        customer::sync_eligibility(&mut tx, customer_id).await?;
        let holder = customer::fetch_customer(&mut tx, customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(customer_id.to_string()))?;

        tx.commit().await?;

        info!(
            customer_id = %customer_id,
            reward_id = %reward.id,
            points_spent = record.points_spent,
            balance = holder.points,
            "Reward redeemed"
        );

        Ok(RedeemOutcome {
            customer: holder,
            reward,
            record,
        })
    }

    /// Adds points to a customer by hand (goodwill, corrections).
    pub async fn add_points(&self, customer_id: &str, points: i64) -> EngineResult<Customer> {
        validate_id("customer_id", customer_id)?;
        validate_points_award(points)?;

        let mut tx = self.pool.begin().await?;

        customer::apply_points_delta(&mut tx, customer_id, points)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(customer_id.to_string()))?;
        customer::sync_eligibility(&mut tx, customer_id).await?;
        let holder = customer::fetch_customer(&mut tx, customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(customer_id.to_string()))?;

        tx.commit().await?;

        info!(customer_id = %customer_id, points, balance = holder.points, "Points awarded");
        Ok(holder)
    }

    /// Recomputes a customer's eligibility against the current catalog.
    ///
    /// Needed after the catalog changes, since balances didn't.
    pub async fn refresh_eligibility(&self, customer_id: &str) -> EngineResult<Customer> {
        validate_id("customer_id", customer_id)?;

        let mut tx = self.pool.begin().await?;

        customer::sync_eligibility(&mut tx, customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(customer_id.to_string()))?;
        let holder = customer::fetch_customer(&mut tx, customer_id)
            .await?
            .ok_or_else(|| CoreError::CustomerNotFound(customer_id.to_string()))?;

        tx.commit().await?;
        Ok(holder)
    }
}
