//! # Customer Repository
//!
//! Loyalty balances and the cached eligibility flag.
//!
//! ## Balance Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  accrual / reversal     points = MAX(points + delta, 0)                 │
//! │                         → never negative, never read-modify-write       │
//! │                                                                         │
//! │  redemption             points = points - cost WHERE points >= cost     │
//! │                         → 0 rows affected = someone else spent them     │
//! │                                                                         │
//! │  after either           eligible = points >= MIN(rewards.points_needed) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tally_core::loyalty::is_eligible;
use tally_core::validation::{validate_contact_number, validate_name};
use tally_core::{Customer, ValidationError};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::reward::min_points_needed;

// =============================================================================
// Connection-level operations
// =============================================================================

/// Fetches a customer by id.
pub async fn fetch_customer(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
    let customer = sqlx::query_as::<_, Customer>(
        r#"
        SELECT id, name, contact_number, points, eligible_for_rewards,
               created_at, updated_at
        FROM customers
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(customer)
}

/// Adds a signed delta to the balance, flooring at zero.
///
/// Returns the new balance, or `None` when the customer doesn't exist.
pub async fn apply_points_delta(
    conn: &mut SqliteConnection,
    id: &str,
    delta: i64,
) -> DbResult<Option<i64>> {
    debug!(id = %id, delta = %delta, "Applying points delta");

    let balance: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE customers
        SET points = MAX(points + ?2, 0),
            updated_at = ?3
        WHERE id = ?1
        RETURNING points
        "#,
    )
    .bind(id)
    .bind(delta)
    .bind(Utc::now())
    .fetch_optional(conn)
    .await?;

    Ok(balance)
}

/// Deducts `cost` only if the balance covers it.
///
/// Returns the new balance, or `None` when the balance was short (or the
/// customer is gone). The guard makes concurrent redemptions of the same
/// points mutually exclusive.
pub async fn try_deduct_points(
    conn: &mut SqliteConnection,
    id: &str,
    cost: i64,
) -> DbResult<Option<i64>> {
    debug!(id = %id, cost = %cost, "Deducting points");

    let balance: Option<i64> = sqlx::query_scalar(
        r#"
        UPDATE customers
        SET points = points - ?2,
            updated_at = ?3
        WHERE id = ?1 AND points >= ?2
        RETURNING points
        "#,
    )
    .bind(id)
    .bind(cost)
    .bind(Utc::now())
    .fetch_optional(conn)
    .await?;

    Ok(balance)
}

/// Recomputes and stores the eligibility flag against the current catalog.
///
/// Returns the new flag, or `None` when the customer doesn't exist.
pub async fn sync_eligibility(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<bool>> {
    let points: Option<i64> = sqlx::query_scalar("SELECT points FROM customers WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    let Some(points) = points else {
        return Ok(None);
    };

    let min = min_points_needed(&mut *conn).await?;
    let eligible = is_eligible(points, min);

    sqlx::query("UPDATE customers SET eligible_for_rewards = ?2 WHERE id = ?1")
        .bind(id)
        .bind(eligible)
        .execute(&mut *conn)
        .await?;

    debug!(id = %id, points, ?min, eligible, "Eligibility recomputed");
    Ok(Some(eligible))
}

/// Inserts a customer row as given.
pub async fn insert_customer(conn: &mut SqliteConnection, customer: &Customer) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO customers (
            id, name, contact_number, points, eligible_for_rewards,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&customer.id)
    .bind(&customer.name)
    .bind(&customer.contact_number)
    .bind(customer.points)
    .bind(customer.eligible_for_rewards)
    .bind(customer.created_at)
    .bind(customer.updated_at)
    .execute(conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
            field,
            value: customer.contact_number.clone(),
        },
        other => other,
    })?;

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Input for [`CustomerRepository::create`].
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub name: String,
    pub contact_number: String,
    /// Opening balance, e.g. when migrating a paper loyalty card.
    pub points: i64,
}

/// Repository for customer reads and registration.
///
/// Balance changes that belong to a business operation go through
/// [`crate::SettlementEngine`] so they commit with their side effects.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        fetch_customer(&mut conn, id).await
    }

    /// Looks a customer up by contact number.
    pub async fn find_by_contact(&self, contact_number: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, contact_number, points, eligible_for_rewards,
                   created_at, updated_at
            FROM customers
            WHERE contact_number = ?1
            "#,
        )
        .bind(contact_number.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Registers a customer with its eligibility computed up front.
    pub async fn create(&self, input: NewCustomer) -> DbResult<Customer> {
        validate_name("name", &input.name)?;
        validate_contact_number(&input.contact_number)?;
        if input.points < 0 {
            return Err(ValidationError::OutOfRange {
                field: "points".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;

        let min = min_points_needed(&mut tx).await?;
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            contact_number: input.contact_number.trim().to_string(),
            points: input.points,
            eligible_for_rewards: is_eligible(input.points, min),
            created_at: now,
            updated_at: now,
        };

        debug!(contact = %customer.contact_number, "Registering customer");
        insert_customer(&mut tx, &customer).await?;
        tx.commit().await?;

        Ok(customer)
    }

    /// Counts customers (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{new_customer, percentage_reward, setup_db};

    #[tokio::test]
    async fn test_create_computes_eligibility() {
        let db = setup_db().await;
        db.rewards().create(percentage_reward("Ten off", 75, 1000)).await.unwrap();

        let rich = db.customers().create(new_customer("Ana", "09170000001", 100)).await.unwrap();
        let poor = db.customers().create(new_customer("Ben", "09170000002", 10)).await.unwrap();

        assert!(rich.eligible_for_rewards);
        assert!(!poor.eligible_for_rewards);
    }

    #[tokio::test]
    async fn test_duplicate_contact_rejected() {
        let db = setup_db().await;
        db.customers().create(new_customer("Ana", "09170000001", 0)).await.unwrap();

        let err = db
            .customers()
            .create(new_customer("Other", "09170000001", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_delta_floors_at_zero() {
        let db = setup_db().await;
        let customer = db.customers().create(new_customer("Ana", "09170000001", 10)).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(apply_points_delta(&mut conn, &customer.id, -25).await.unwrap(), Some(0));
        assert_eq!(apply_points_delta(&mut conn, &customer.id, 7).await.unwrap(), Some(7));
        assert_eq!(apply_points_delta(&mut conn, "missing", 7).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_guarded_deduction() {
        let db = setup_db().await;
        let customer = db.customers().create(new_customer("Ana", "09170000001", 100)).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(try_deduct_points(&mut conn, &customer.id, 60).await.unwrap(), Some(40));
        // second spend of the same points is refused, balance untouched
        assert_eq!(try_deduct_points(&mut conn, &customer.id, 60).await.unwrap(), None);

        let stored = fetch_customer(&mut conn, &customer.id).await.unwrap().unwrap();
        assert_eq!(stored.points, 40);
    }

    #[tokio::test]
    async fn test_sync_eligibility_with_empty_catalog() {
        let db = setup_db().await;
        let customer = db.customers().create(new_customer("Ana", "09170000001", 0)).await.unwrap();
        assert!(customer.eligible_for_rewards);

        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(sync_eligibility(&mut conn, &customer.id).await.unwrap(), Some(true));
        assert_eq!(sync_eligibility(&mut conn, "missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_find_by_contact() {
        let db = setup_db().await;
        let created = db.customers().create(new_customer("Ana", "09170000001", 0)).await.unwrap();

        let found = db.customers().find_by_contact(" 09170000001 ").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(db.customers().find_by_contact("0000000").await.unwrap().is_none());
    }
}
