//! # Cash Drawer Repository
//!
//! One row per business date holding what the cashier entered. Expected
//! cash and short/over are derived on read, never stored.

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tally_core::CashDrawerEntry;

use crate::error::DbResult;

/// Fetches the entry for a date.
pub async fn fetch_entry(
    conn: &mut SqliteConnection,
    date: NaiveDate,
) -> DbResult<Option<CashDrawerEntry>> {
    let entry = sqlx::query_as::<_, CashDrawerEntry>(
        r#"
        SELECT operation_date, cash_in_cents, cash_out_cents, counted_cash_cents,
               notes, updated_at
        FROM cash_drawer_entries
        WHERE operation_date = ?1
        "#,
    )
    .bind(date)
    .fetch_optional(conn)
    .await?;

    Ok(entry)
}

/// Inserts or overwrites the entry for its date.
pub async fn upsert_entry(conn: &mut SqliteConnection, entry: &CashDrawerEntry) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO cash_drawer_entries (
            operation_date, cash_in_cents, cash_out_cents, counted_cash_cents,
            notes, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT (operation_date) DO UPDATE SET
            cash_in_cents = excluded.cash_in_cents,
            cash_out_cents = excluded.cash_out_cents,
            counted_cash_cents = excluded.counted_cash_cents,
            notes = excluded.notes,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(entry.operation_date)
    .bind(entry.cash_in_cents)
    .bind(entry.cash_out_cents)
    .bind(entry.counted_cash_cents)
    .bind(&entry.notes)
    .bind(entry.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Read access to stored drawer entries.
#[derive(Debug, Clone)]
pub struct CashDrawerRepository {
    pool: SqlitePool,
}

impl CashDrawerRepository {
    /// Creates a new CashDrawerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CashDrawerRepository { pool }
    }

    /// Raw entry for a date.
    pub async fn get(&self, date: NaiveDate) -> DbResult<Option<CashDrawerEntry>> {
        let mut conn = self.pool.acquire().await?;
        fetch_entry(&mut conn, date).await
    }

    /// Entries in a date range, oldest first.
    pub async fn list_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<CashDrawerEntry>> {
        let entries = sqlx::query_as::<_, CashDrawerEntry>(
            r#"
            SELECT operation_date, cash_in_cents, cash_out_cents, counted_cash_cents,
                   notes, updated_at
            FROM cash_drawer_entries
            WHERE operation_date BETWEEN ?1 AND ?2
            ORDER BY operation_date ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_db;
    use chrono::Utc;

    fn entry(date: NaiveDate, counted_cash_cents: i64) -> CashDrawerEntry {
        CashDrawerEntry {
            operation_date: date,
            cash_in_cents: 1_000,
            cash_out_cents: 0,
            counted_cash_cents,
            notes: None,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_overwrites_the_date() {
        let db = setup_db().await;
        let today = Utc::now().date_naive();

        let mut conn = db.pool().acquire().await.unwrap();
        upsert_entry(&mut conn, &entry(today, 5_000)).await.unwrap();
        upsert_entry(&mut conn, &entry(today, 7_500)).await.unwrap();
        drop(conn);

        let stored = db.cash_drawer().get(today).await.unwrap().unwrap();
        assert_eq!(stored.counted_cash_cents, 7_500);
        assert_eq!(db.cash_drawer().list_range(today, today).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_range_oldest_first() {
        let db = setup_db().await;
        let today = Utc::now().date_naive();
        let yesterday = today.pred_opt().unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        upsert_entry(&mut conn, &entry(today, 1)).await.unwrap();
        upsert_entry(&mut conn, &entry(yesterday, 2)).await.unwrap();
        drop(conn);

        let dates: Vec<_> = db
            .cash_drawer()
            .list_range(yesterday, today)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.operation_date)
            .collect();
        assert_eq!(dates, vec![yesterday, today]);
        assert!(db.cash_drawer().get(today.succ_opt().unwrap()).await.unwrap().is_none());
    }
}
