//! # Product Repository
//!
//! Catalog reads and inventory deltas.
//!
//! ## Inventory Delta Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                            │
//! │                                                                     │
//! │  ❌ WRONG: read-modify-write (lost update under concurrency)        │
//! │     SELECT quantity ... ; UPDATE products SET quantity = 7          │
//! │                                                                     │
//! │  ✅ CORRECT: single-statement delta                                 │
//! │     UPDATE products SET quantity = quantity - 3 RETURNING ...       │
//! │                                                                     │
//! │  Register A: sells 3 → quantity - 3                                 │
//! │  Register B: sells 2 → quantity - 2                                 │
//! │  Both land: -3 + -2 = -5 total                                      │
//! │                                                                     │
//! │  stock_status is then reclassified from the RETURNING row inside    │
//! │  the same transaction.                                              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Quantities may go negative: a sale is never blocked on stock.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tally_core::validation::{validate_amount_cents, validate_name, validate_sku};
use tally_core::{Product, StockStatus, ValidationError};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

// =============================================================================
// Connection-level operations (usable inside a transaction)
// =============================================================================

/// Fetches a product by id.
pub async fn fetch_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, sku, name, price_cents, quantity, reorder_level,
               stock_status, is_active, created_at, updated_at
        FROM products
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(product)
}

/// Applies a signed quantity delta and reclassifies stock status.
///
/// ## Arguments
/// * `id` - Product ID
/// * `delta` - Change in quantity (negative for sales, positive for restocking)
///
/// ## Returns
/// The new `(quantity, stock_status)`.
pub async fn adjust_quantity(
    conn: &mut SqliteConnection,
    id: &str,
    delta: i64,
) -> DbResult<(i64, StockStatus)> {
    debug!(id = %id, delta = %delta, "Adjusting product quantity");

    let now = Utc::now();

    let (quantity, reorder_level): (i64, i64) = sqlx::query_as(
        r#"
        UPDATE products
        SET quantity = quantity + ?2,
            updated_at = ?3
        WHERE id = ?1
        RETURNING quantity, reorder_level
        "#,
    )
    .bind(id)
    .bind(delta)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Product", id))?;

    let status = StockStatus::classify(quantity, reorder_level);

    sqlx::query("UPDATE products SET stock_status = ?2 WHERE id = ?1")
        .bind(id)
        .bind(status.as_str())
        .execute(&mut *conn)
        .await?;

    Ok((quantity, status))
}

/// Inserts a product row as given.
pub async fn insert_product(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO products (
            id, sku, name, price_cents, quantity, reorder_level,
            stock_status, is_active, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&product.id)
    .bind(&product.sku)
    .bind(&product.name)
    .bind(product.price_cents)
    .bind(product.quantity)
    .bind(product.reorder_level)
    .bind(product.stock_status.as_str())
    .bind(product.is_active)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(conn)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
            field,
            value: product.sku.clone(),
        },
        other => other,
    })?;

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Input for [`ProductRepository::create`].
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub price_cents: i64,
    pub quantity: i64,
    pub reorder_level: i64,
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let product = repo.get_by_id("uuid-here").await?;
/// let low = repo.list_low_stock().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    /// Lists active products by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, price_cents, quantity, reorder_level,
                   stock_status, is_active, created_at, updated_at
            FROM products
            WHERE is_active = 1
            ORDER BY name
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Active products at or below their reorder level, emptiest first.
    pub async fn list_low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, sku, name, price_cents, quantity, reorder_level,
                   stock_status, is_active, created_at, updated_at
            FROM products
            WHERE is_active = 1 AND quantity <= reorder_level
            ORDER BY quantity ASC, name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Low stock products");
        Ok(products)
    }

    /// Creates a product with a fresh id and classified stock status.
    pub async fn create(&self, input: NewProduct) -> DbResult<Product> {
        validate_sku(&input.sku)?;
        validate_name("name", &input.name)?;
        validate_amount_cents("price_cents", input.price_cents)?;
        if input.reorder_level < 0 {
            return Err(ValidationError::OutOfRange {
                field: "reorder_level".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            sku: input.sku.trim().to_string(),
            name: input.name.trim().to_string(),
            price_cents: input.price_cents,
            quantity: input.quantity,
            reorder_level: input.reorder_level,
            stock_status: StockStatus::classify(input.quantity, input.reorder_level),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(sku = %product.sku, "Creating product");

        let mut conn = self.pool.acquire().await?;
        insert_product(&mut conn, &product).await?;
        Ok(product)
    }

    /// Applies a quantity delta outside any settlement (stock receipts, counts).
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<(i64, StockStatus)> {
        let mut tx = self.pool.begin().await?;
        let result = adjust_quantity(&mut tx, id, delta).await?;
        tx.commit().await?;
        Ok(result)
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{new_product, setup_db};

    #[tokio::test]
    async fn test_create_classifies_status() {
        let db = setup_db().await;
        let repo = db.products();

        let product = repo.create(new_product("LOW-1", 10_000, 3, 5)).await.unwrap();
        assert_eq!(product.stock_status, StockStatus::LowStock);

        let stored = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.sku, "LOW-1");
        assert_eq!(stored.stock_status, StockStatus::LowStock);
    }

    #[tokio::test]
    async fn test_adjust_quantity_reclassifies() {
        let db = setup_db().await;
        let repo = db.products();
        let product = repo.create(new_product("P-1", 10_000, 10, 5)).await.unwrap();

        assert_eq!(
            repo.adjust_stock(&product.id, -5).await.unwrap(),
            (5, StockStatus::LowStock)
        );
        assert_eq!(
            repo.adjust_stock(&product.id, -7).await.unwrap(),
            (-2, StockStatus::OutOfStock)
        );
        assert_eq!(
            repo.adjust_stock(&product.id, 12).await.unwrap(),
            (10, StockStatus::InStock)
        );

        let stored = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 10);
        assert_eq!(stored.stock_status, StockStatus::InStock);
    }

    #[tokio::test]
    async fn test_adjust_unknown_product() {
        let db = setup_db().await;
        let err = db.products().adjust_stock("missing", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = setup_db().await;
        let repo = db.products();
        repo.create(new_product("DUP", 100, 1, 0)).await.unwrap();

        let err = repo.create(new_product("DUP", 200, 1, 0)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "DUP"));
    }

    #[tokio::test]
    async fn test_invalid_sku_rejected_before_insert() {
        let db = setup_db().await;
        let err = db
            .products()
            .create(new_product("bad sku!", 100, 1, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_low_stock_listing() {
        let db = setup_db().await;
        let repo = db.products();
        repo.create(new_product("A", 100, 50, 5)).await.unwrap();
        repo.create(new_product("B", 100, 2, 5)).await.unwrap();
        repo.create(new_product("C", 100, 0, 5)).await.unwrap();

        let low = repo.list_low_stock().await.unwrap();
        let skus: Vec<_> = low.iter().map(|p| p.sku.as_str()).collect();
        assert_eq!(skus, vec!["C", "B"]);
    }
}
