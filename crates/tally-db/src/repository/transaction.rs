//! # Transaction Repository
//!
//! Settled transactions, their items, the guarded status transition and the
//! per-day sales total used by the cash drawer.
//!
//! ## Status Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Register A: refund T1              Register B: cancel T1              │
//! │       │                                  │                              │
//! │       ▼                                  ▼                              │
//! │  UPDATE ... WHERE id = T1           UPDATE ... WHERE id = T1            │
//! │    AND status = 'completed'           AND status = 'completed'          │
//! │       │                                  │                              │
//! │       ▼                                  ▼                              │
//! │  1 row → proceeds                   0 rows → InvalidTransactionStatus   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tally_core::settlement::TransactionDetail;
use tally_core::{Money, Transaction, TransactionItem, TransactionStatus};
use tracing::debug;

use crate::error::DbResult;

// =============================================================================
// Connection-level operations
// =============================================================================

/// Inserts the transaction header.
pub async fn insert_transaction(conn: &mut SqliteConnection, txn: &Transaction) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, customer_id, subtotal_cents, order_discount_cents,
            reward_discount_cents, total_cents, points_earned, payment_mode,
            reference_number, discount_id, reward_id, status, status_reason,
            status_changed_at, business_date, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        "#,
    )
    .bind(&txn.id)
    .bind(&txn.customer_id)
    .bind(txn.subtotal_cents)
    .bind(txn.order_discount_cents)
    .bind(txn.reward_discount_cents)
    .bind(txn.total_cents)
    .bind(txn.points_earned)
    .bind(txn.payment_mode)
    .bind(&txn.reference_number)
    .bind(&txn.discount_id)
    .bind(&txn.reward_id)
    .bind(txn.status)
    .bind(&txn.status_reason)
    .bind(txn.status_changed_at)
    .bind(txn.business_date)
    .bind(txn.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Inserts one transaction item.
pub async fn insert_item(conn: &mut SqliteConnection, item: &TransactionItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transaction_items (
            id, transaction_id, position, product_id, quantity,
            unit_price_cents, line_discount_cents, subtotal_cents,
            is_free_item, stock_decremented
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&item.id)
    .bind(&item.transaction_id)
    .bind(item.position)
    .bind(&item.product_id)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.line_discount_cents)
    .bind(item.subtotal_cents)
    .bind(item.is_free_item)
    .bind(item.stock_decremented)
    .execute(conn)
    .await?;

    Ok(())
}

/// Fetches a transaction header.
pub async fn fetch_transaction(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Transaction>> {
    let txn = sqlx::query_as::<_, Transaction>(
        r#"
        SELECT id, customer_id, subtotal_cents, order_discount_cents,
               reward_discount_cents, total_cents, points_earned, payment_mode,
               reference_number, discount_id, reward_id, status, status_reason,
               status_changed_at, business_date, created_at
        FROM transactions
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(txn)
}

/// Items of a transaction in cart order.
pub async fn fetch_items(
    conn: &mut SqliteConnection,
    transaction_id: &str,
) -> DbResult<Vec<TransactionItem>> {
    let items = sqlx::query_as::<_, TransactionItem>(
        r#"
        SELECT id, transaction_id, position, product_id, quantity,
               unit_price_cents, line_discount_cents, subtotal_cents,
               is_free_item, stock_decremented
        FROM transaction_items
        WHERE transaction_id = ?1
        ORDER BY position ASC
        "#,
    )
    .bind(transaction_id)
    .fetch_all(conn)
    .await?;

    Ok(items)
}

/// Moves a completed transaction to `status`.
///
/// Returns `false` when the transaction is missing or no longer completed.
pub async fn mark_reversed(
    conn: &mut SqliteConnection,
    id: &str,
    status: TransactionStatus,
    reason: &str,
    at: DateTime<Utc>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE transactions
        SET status = ?2,
            status_reason = ?3,
            status_changed_at = ?4
        WHERE id = ?1 AND status = 'completed'
        "#,
    )
    .bind(id)
    .bind(status)
    .bind(reason)
    .bind(at)
    .execute(conn)
    .await?;

    debug!(id = %id, status = status.as_str(), won = result.rows_affected() == 1, "Status transition");
    Ok(result.rows_affected() == 1)
}

/// Sum of completed totals for a business date.
pub async fn completed_sales_total(conn: &mut SqliteConnection, date: NaiveDate) -> DbResult<Money> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(total_cents), 0)
        FROM transactions
        WHERE business_date = ?1 AND status = 'completed'
        "#,
    )
    .bind(date)
    .fetch_one(conn)
    .await?;

    Ok(Money::from_cents(total))
}

// =============================================================================
// Repository
// =============================================================================

/// Optional filters for [`TransactionRepository::list`].
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// First business date, inclusive.
    pub from: Option<NaiveDate>,
    /// Last business date, inclusive.
    pub to: Option<NaiveDate>,
    pub status: Option<TransactionStatus>,
    pub customer_id: Option<String>,
    pub limit: Option<u32>,
}

/// Read access to settled transactions.
///
/// Writes happen only through [`crate::SettlementEngine`].
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Gets a transaction header by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let mut conn = self.pool.acquire().await?;
        fetch_transaction(&mut conn, id).await
    }

    /// Gets a transaction with its items.
    pub async fn detail(&self, id: &str) -> DbResult<Option<TransactionDetail>> {
        let mut conn = self.pool.acquire().await?;
        let Some(transaction) = fetch_transaction(&mut conn, id).await? else {
            return Ok(None);
        };
        let items = fetch_items(&mut conn, id).await?;
        Ok(Some(TransactionDetail { transaction, items }))
    }

    /// Gets the items of a transaction in cart order.
    pub async fn items(&self, transaction_id: &str) -> DbResult<Vec<TransactionItem>> {
        let mut conn = self.pool.acquire().await?;
        fetch_items(&mut conn, transaction_id).await
    }

    /// Transaction history, newest first.
    pub async fn list(&self, filter: &TransactionFilter) -> DbResult<Vec<Transaction>> {
        let mut query: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            r#"
            SELECT id, customer_id, subtotal_cents, order_discount_cents,
                   reward_discount_cents, total_cents, points_earned, payment_mode,
                   reference_number, discount_id, reward_id, status, status_reason,
                   status_changed_at, business_date, created_at
            FROM transactions
            WHERE 1 = 1
            "#,
        );

        if let Some(from) = filter.from {
            query.push(" AND business_date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            query.push(" AND business_date <= ").push_bind(to);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        if let Some(customer_id) = &filter.customer_id {
            query.push(" AND customer_id = ").push_bind(customer_id.clone());
        }

        query.push(" ORDER BY created_at DESC, id DESC");

        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit);
        }

        let transactions = query
            .build_query_as::<Transaction>()
            .fetch_all(&self.pool)
            .await?;

        debug!(count = transactions.len(), ?filter, "Listed transactions");
        Ok(transactions)
    }

    /// Completed sales total for a business date.
    pub async fn completed_sales_total(&self, date: NaiveDate) -> DbResult<Money> {
        let mut conn = self.pool.acquire().await?;
        completed_sales_total(&mut conn, date).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_db;
    use tally_core::PaymentMode;
    use uuid::Uuid;

    fn header(total_cents: i64, date: NaiveDate) -> Transaction {
        Transaction {
            id: Uuid::new_v4().to_string(),
            customer_id: None,
            subtotal_cents: total_cents,
            order_discount_cents: 0,
            reward_discount_cents: 0,
            total_cents,
            points_earned: 0,
            payment_mode: PaymentMode::Cash,
            reference_number: None,
            discount_id: None,
            reward_id: None,
            status: TransactionStatus::Completed,
            status_reason: None,
            status_changed_at: None,
            business_date: date,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_status_guard_allows_one_transition() {
        let db = setup_db().await;
        let today = Utc::now().date_naive();
        let txn = header(5_000, today);

        let mut conn = db.pool().acquire().await.unwrap();
        insert_transaction(&mut conn, &txn).await.unwrap();

        let first = mark_reversed(&mut conn, &txn.id, TransactionStatus::Refunded, "damaged", Utc::now())
            .await
            .unwrap();
        let second = mark_reversed(&mut conn, &txn.id, TransactionStatus::Canceled, "again", Utc::now())
            .await
            .unwrap();
        assert!(first);
        assert!(!second);

        let stored = fetch_transaction(&mut conn, &txn.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TransactionStatus::Refunded);
        assert_eq!(stored.status_reason.as_deref(), Some("damaged"));

        assert!(!mark_reversed(&mut conn, "missing", TransactionStatus::Refunded, "x", Utc::now())
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_sales_total_counts_completed_for_the_date() {
        let db = setup_db().await;
        let today = Utc::now().date_naive();
        let yesterday = today.pred_opt().unwrap();

        let kept = header(12_000, today);
        let reversed = header(3_000, today);
        let older = header(99_000, yesterday);

        let mut conn = db.pool().acquire().await.unwrap();
        for txn in [&kept, &reversed, &older] {
            insert_transaction(&mut conn, txn).await.unwrap();
        }
        mark_reversed(&mut conn, &reversed.id, TransactionStatus::Canceled, "void", Utc::now())
            .await
            .unwrap();
        drop(conn);

        let repo = db.transactions();
        assert_eq!(repo.completed_sales_total(today).await.unwrap(), Money::from_cents(12_000));
        assert_eq!(repo.completed_sales_total(yesterday).await.unwrap(), Money::from_cents(99_000));

        let limited = repo
            .list(&TransactionFilter {
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 2);

        let only_yesterday = repo
            .list(&TransactionFilter {
                from: Some(yesterday),
                to: Some(yesterday),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(only_yesterday.len(), 1);
        assert_eq!(only_yesterday[0].id, older.id);
    }
}
