//! # Redemption Repository
//!
//! One row per reward redemption, whether made during a sale or self-serve.

use sqlx::{SqliteConnection, SqlitePool};
use tally_core::RedemptionRecord;

use crate::error::DbResult;

/// Inserts a redemption record.
pub async fn insert_redemption(
    conn: &mut SqliteConnection,
    record: &RedemptionRecord,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO redemptions (
            id, customer_id, reward_id, transaction_id, points_spent, redeemed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&record.id)
    .bind(&record.customer_id)
    .bind(&record.reward_id)
    .bind(&record.transaction_id)
    .bind(record.points_spent)
    .bind(record.redeemed_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Read access to redemption history.
#[derive(Debug, Clone)]
pub struct RedemptionRepository {
    pool: SqlitePool,
}

impl RedemptionRepository {
    /// Creates a new RedemptionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        RedemptionRepository { pool }
    }

    /// A customer's redemptions, newest first. `reward_id` is `None` when
    /// the reward has since been deleted.
    pub async fn history(&self, customer_id: &str) -> DbResult<Vec<RedemptionRecord>> {
        let records = sqlx::query_as::<_, RedemptionRecord>(
            r#"
            SELECT id, customer_id, reward_id, transaction_id, points_spent, redeemed_at
            FROM redemptions
            WHERE customer_id = ?1
            ORDER BY redeemed_at DESC, id DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Redemptions made during a given sale.
    pub async fn for_transaction(&self, transaction_id: &str) -> DbResult<Vec<RedemptionRecord>> {
        let records = sqlx::query_as::<_, RedemptionRecord>(
            r#"
            SELECT id, customer_id, reward_id, transaction_id, points_spent, redeemed_at
            FROM redemptions
            WHERE transaction_id = ?1
            ORDER BY redeemed_at ASC
            "#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
