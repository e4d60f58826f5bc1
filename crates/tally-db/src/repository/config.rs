//! # System Config Repository
//!
//! Key/value business settings stored in `system_configs`. The only key the
//! engine reads is the loyalty exchange rate.
//!
//! ```text
//! key                    value                                 description
//! ─────────────────────  ────────────────────────────────────  ──────────────
//! points_exchange_rate   {"php_amount": 100.0, "points": 10}  Points earned…
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tally_core::ExchangeRate;
use tracing::{debug, info, warn};

use crate::error::DbResult;

/// Reads a raw config value.
pub async fn get_value(conn: &mut SqliteConnection, key: &str) -> DbResult<Option<String>> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM system_configs WHERE key = ?1")
        .bind(key)
        .fetch_optional(conn)
        .await?;

    Ok(value)
}

/// Inserts or replaces a config value.
pub async fn set_value(
    conn: &mut SqliteConnection,
    key: &str,
    value: &str,
    description: Option<&str>,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO system_configs (key, value, description, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (key) DO UPDATE SET
            value = excluded.value,
            description = COALESCE(excluded.description, system_configs.description),
            updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(description)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}

/// Current exchange rate, falling back to the default when unset or
/// unreadable.
pub async fn exchange_rate(conn: &mut SqliteConnection) -> DbResult<ExchangeRate> {
    let raw = get_value(conn, ExchangeRate::CONFIG_KEY).await?;

    if let Some(value) = raw.as_deref() {
        if ExchangeRate::from_json(value).is_none() {
            warn!(value = %value, "Unreadable exchange rate, using default");
        }
    }

    let rate = ExchangeRate::from_stored(raw.as_deref());
    debug!(amount = %rate.currency_amount, points = rate.points, "Exchange rate loaded");
    Ok(rate)
}

/// Stores an exchange rate. Callers validate first.
pub async fn store_exchange_rate(conn: &mut SqliteConnection, rate: &ExchangeRate) -> DbResult<()> {
    set_value(
        conn,
        ExchangeRate::CONFIG_KEY,
        &rate.to_json(),
        Some(&rate.describe()),
    )
    .await?;

    info!(amount = %rate.currency_amount, points = rate.points, "Exchange rate updated");
    Ok(())
}

/// Repository for `system_configs`.
#[derive(Debug, Clone)]
pub struct ConfigRepository {
    pool: SqlitePool,
}

impl ConfigRepository {
    /// Creates a new ConfigRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ConfigRepository { pool }
    }

    /// Reads a raw config value.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let mut conn = self.pool.acquire().await?;
        get_value(&mut conn, key).await
    }

    /// Current exchange rate (default when unset or unreadable).
    pub async fn exchange_rate(&self) -> DbResult<ExchangeRate> {
        let mut conn = self.pool.acquire().await?;
        exchange_rate(&mut conn).await
    }

    /// Validates and stores an exchange rate.
    pub async fn set_exchange_rate(&self, rate: ExchangeRate) -> DbResult<ExchangeRate> {
        rate.validate()?;
        let mut conn = self.pool.acquire().await?;
        store_exchange_rate(&mut conn, &rate).await?;
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::test_utils::setup_db;
    use tally_core::Money;

    #[tokio::test]
    async fn test_unset_rate_is_default() {
        let db = setup_db().await;
        assert_eq!(db.configs().exchange_rate().await.unwrap(), ExchangeRate::default());
    }

    #[tokio::test]
    async fn test_set_and_read_back() {
        let db = setup_db().await;
        let rate = ExchangeRate::new(Money::from_cents(5_000), 3);

        db.configs().set_exchange_rate(rate).await.unwrap();
        assert_eq!(db.configs().exchange_rate().await.unwrap(), rate);

        let raw = db.configs().get(ExchangeRate::CONFIG_KEY).await.unwrap().unwrap();
        assert!(raw.contains("php_amount"));
    }

    #[tokio::test]
    async fn test_out_of_range_rate_rejected() {
        let db = setup_db().await;
        let err = db
            .configs()
            .set_exchange_rate(ExchangeRate::new(Money::from_cents(10_000), 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert_eq!(db.configs().exchange_rate().await.unwrap(), ExchangeRate::default());
    }

    #[tokio::test]
    async fn test_malformed_stored_rate_falls_back() {
        let db = setup_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        set_value(&mut conn, ExchangeRate::CONFIG_KEY, "{broken", None)
            .await
            .unwrap();

        assert_eq!(exchange_rate(&mut conn).await.unwrap(), ExchangeRate::default());
    }
}
