//! # Reward Repository
//!
//! The reward catalog as the engine sees it: lookups, the cheapest cost that
//! drives eligibility, and per-customer availability.
//!
//! Deleting a reward nulls `reward_id` on transactions and redemptions
//! through `ON DELETE SET NULL`; history rows are kept.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tally_core::validation::{validate_name, validate_percentage, validate_points_cost};
use tally_core::{Percentage, Reward, RewardKind, ValidationError};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;

// =============================================================================
// Connection-level operations
// =============================================================================

/// Fetches a reward by id, active or not.
pub async fn fetch_reward(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Reward>> {
    let reward = sqlx::query_as::<_, Reward>(
        r#"
        SELECT id, name, description, kind, points_needed, value_bps,
               product_id, is_active, created_at
        FROM rewards
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(reward)
}

/// Cheapest `points_needed` across every reward definition.
///
/// `None` when the catalog is empty.
pub async fn min_points_needed(conn: &mut SqliteConnection) -> DbResult<Option<i64>> {
    let min: Option<i64> = sqlx::query_scalar("SELECT MIN(points_needed) FROM rewards")
        .fetch_one(conn)
        .await?;

    Ok(min)
}

/// Inserts a reward row as given.
pub async fn insert_reward(conn: &mut SqliteConnection, reward: &Reward) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO rewards (
            id, name, description, kind, points_needed, value_bps,
            product_id, is_active, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&reward.id)
    .bind(&reward.name)
    .bind(&reward.description)
    .bind(reward.kind)
    .bind(reward.points_needed)
    .bind(reward.value_bps)
    .bind(&reward.product_id)
    .bind(reward.is_active)
    .bind(reward.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Input for [`RewardRepository::create`].
#[derive(Debug, Clone)]
pub struct NewReward {
    pub name: String,
    pub description: Option<String>,
    pub kind: RewardKind,
    pub points_needed: i64,
    /// Percentage off, for `PercentageDiscount`.
    pub value: Option<Percentage>,
    /// Granted product, for `FreeItem`.
    pub product_id: Option<String>,
}

/// Repository for reward catalog operations.
#[derive(Debug, Clone)]
pub struct RewardRepository {
    pool: SqlitePool,
}

impl RewardRepository {
    /// Creates a new RewardRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RewardRepository { pool }
    }

    /// Gets a reward by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Reward>> {
        let mut conn = self.pool.acquire().await?;
        fetch_reward(&mut conn, id).await
    }

    /// Cheapest reward cost, `None` for an empty catalog.
    pub async fn min_points_needed(&self) -> DbResult<Option<i64>> {
        let mut conn = self.pool.acquire().await?;
        min_points_needed(&mut conn).await
    }

    /// Lists active rewards, cheapest first.
    pub async fn list_active(&self) -> DbResult<Vec<Reward>> {
        let rewards = sqlx::query_as::<_, Reward>(
            r#"
            SELECT id, name, description, kind, points_needed, value_bps,
                   product_id, is_active, created_at
            FROM rewards
            WHERE is_active = 1
            ORDER BY points_needed ASC, name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rewards)
    }

    /// Active rewards a balance can pay for, most expensive first.
    pub async fn affordable(&self, points: i64) -> DbResult<Vec<Reward>> {
        let rewards = sqlx::query_as::<_, Reward>(
            r#"
            SELECT id, name, description, kind, points_needed, value_bps,
                   product_id, is_active, created_at
            FROM rewards
            WHERE is_active = 1 AND points_needed <= ?1
            ORDER BY points_needed DESC, name ASC
            "#,
        )
        .bind(points)
        .fetch_all(&self.pool)
        .await?;

        debug!(points, count = rewards.len(), "Affordable rewards");
        Ok(rewards)
    }

    /// Adds a reward to the catalog.
    ///
    /// The kind decides which of `value` / `product_id` is kept; the other is
    /// dropped.
    pub async fn create(&self, input: NewReward) -> DbResult<Reward> {
        validate_name("name", &input.name)?;
        validate_points_cost(input.points_needed)?;

        let (value_bps, product_id) = match input.kind {
            RewardKind::PercentageDiscount => {
                let value = input.value.ok_or_else(|| ValidationError::Required {
                    field: "value".to_string(),
                })?;
                validate_percentage("value", value)?;
                (Some(value.bps()), None)
            }
            RewardKind::FreeItem => {
                let product_id = input
                    .product_id
                    .filter(|id| !id.trim().is_empty())
                    .ok_or_else(|| ValidationError::Required {
                        field: "product_id".to_string(),
                    })?;
                (None, Some(product_id))
            }
        };

        let reward = Reward {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            description: input.description,
            kind: input.kind,
            points_needed: input.points_needed,
            value_bps,
            product_id,
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(name = %reward.name, points_needed = reward.points_needed, "Creating reward");

        let mut conn = self.pool.acquire().await?;
        insert_reward(&mut conn, &reward).await?;
        Ok(reward)
    }

    /// Activates or retires a reward without deleting it.
    ///
    /// Returns `false` when the reward doesn't exist.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<bool> {
        let result = sqlx::query("UPDATE rewards SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a reward. Transactions and redemptions keep their rows with
    /// the reference nulled.
    ///
    /// Returns `false` when the reward doesn't exist.
    pub async fn delete(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM rewards WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(id = %id, "Reward deleted");
        }
        Ok(deleted)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::test_utils::{free_item_reward, new_product, percentage_reward, setup_db};

    #[tokio::test]
    async fn test_min_points_needed() {
        let db = setup_db().await;
        let repo = db.rewards();
        assert_eq!(repo.min_points_needed().await.unwrap(), None);

        repo.create(percentage_reward("Big", 200, 2000)).await.unwrap();
        repo.create(percentage_reward("Small", 75, 500)).await.unwrap();
        assert_eq!(repo.min_points_needed().await.unwrap(), Some(75));
    }

    #[tokio::test]
    async fn test_affordable_most_expensive_first() {
        let db = setup_db().await;
        let repo = db.rewards();
        repo.create(percentage_reward("A", 50, 500)).await.unwrap();
        repo.create(percentage_reward("B", 100, 1000)).await.unwrap();
        repo.create(percentage_reward("C", 300, 3000)).await.unwrap();
        let retired = repo.create(percentage_reward("D", 80, 800)).await.unwrap();
        repo.set_active(&retired.id, false).await.unwrap();

        let names: Vec<_> = repo
            .affordable(150)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_kind_specific_fields() {
        let db = setup_db().await;
        let product = db.products().create(new_product("STEAK", 15_000, 10, 2)).await.unwrap();

        let free = db.rewards().create(free_item_reward("Free steak", 100, &product.id)).await.unwrap();
        assert_eq!(free.kind, RewardKind::FreeItem);
        assert_eq!(free.value_bps, None);
        assert_eq!(free.product_id.as_deref(), Some(product.id.as_str()));

        let mut missing_value = percentage_reward("Broken", 10, 1000);
        missing_value.value = None;
        let err = db.rewards().create(missing_value).await.unwrap_err();
        assert!(matches!(err, DbError::Validation(ValidationError::Required { .. })));
    }

    #[tokio::test]
    async fn test_free_item_for_unknown_product_rejected() {
        let db = setup_db().await;
        let err = db
            .rewards()
            .create(free_item_reward("Ghost", 10, "no-such-product"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_delete_unknown_reward() {
        let db = setup_db().await;
        assert!(!db.rewards().delete("missing").await.unwrap());
    }
}
