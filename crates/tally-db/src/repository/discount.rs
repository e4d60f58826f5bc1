//! # Discount Repository
//!
//! Order-level percentage discounts.

use sqlx::{SqliteConnection, SqlitePool};
use tally_core::validation::{validate_name, validate_percentage};
use tally_core::{Discount, Percentage};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;

/// Fetches a discount by id, active or not.
pub async fn fetch_discount(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Discount>> {
    let discount = sqlx::query_as::<_, Discount>(
        r#"
        SELECT id, name, description, percentage_bps, is_active
        FROM discounts
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(discount)
}

/// Repository for discount lookups and setup.
#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: SqlitePool,
}

impl DiscountRepository {
    /// Creates a new DiscountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRepository { pool }
    }

    /// Gets a discount by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Discount>> {
        let mut conn = self.pool.acquire().await?;
        fetch_discount(&mut conn, id).await
    }

    /// Lists active discounts by name.
    pub async fn list_active(&self) -> DbResult<Vec<Discount>> {
        let discounts = sqlx::query_as::<_, Discount>(
            r#"
            SELECT id, name, description, percentage_bps, is_active
            FROM discounts
            WHERE is_active = 1
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(discounts)
    }

    /// Adds an active discount.
    pub async fn create(
        &self,
        name: &str,
        description: Option<String>,
        percentage: Percentage,
    ) -> DbResult<Discount> {
        validate_name("name", name)?;
        validate_percentage("percentage", percentage)?;

        let discount = Discount {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            description,
            percentage_bps: percentage.bps(),
            is_active: true,
        };

        debug!(name = %discount.name, %percentage, "Creating discount");

        sqlx::query(
            r#"
            INSERT INTO discounts (id, name, description, percentage_bps, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&discount.id)
        .bind(&discount.name)
        .bind(&discount.description)
        .bind(discount.percentage_bps)
        .bind(discount.is_active)
        .execute(&self.pool)
        .await?;

        Ok(discount)
    }

    /// Activates or retires a discount.
    ///
    /// Returns `false` when the discount doesn't exist.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<bool> {
        let result = sqlx::query("UPDATE discounts SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::test_utils::setup_db;

    #[tokio::test]
    async fn test_create_and_retire() {
        let db = setup_db().await;
        let repo = db.discounts();

        let senior = repo
            .create("Senior", None, Percentage::from_bps(2000))
            .await
            .unwrap();
        assert_eq!(repo.list_active().await.unwrap().len(), 1);

        assert!(repo.set_active(&senior.id, false).await.unwrap());
        assert!(repo.list_active().await.unwrap().is_empty());

        let stored = repo.get_by_id(&senior.id).await.unwrap().unwrap();
        assert!(!stored.is_active);
        assert_eq!(stored.percentage(), Percentage::from_bps(2000));
    }

    #[tokio::test]
    async fn test_zero_percent_rejected() {
        let db = setup_db().await;
        let err = db
            .discounts()
            .create("Nothing", None, Percentage::zero())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }
}
