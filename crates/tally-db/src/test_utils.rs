//! Shared test utilities for tally-db.
//!
//! In-memory databases and catalog fixtures with sensible defaults.

use tally_core::{Customer, Percentage, Product, RewardKind, SettlementPolicy};
use tracing_subscriber::EnvFilter;

use crate::repository::customer::NewCustomer;
use crate::repository::product::NewProduct;
use crate::repository::reward::NewReward;
use crate::{Database, DbConfig, SettlementEngine};

pub(crate) fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

/// Fresh migrated in-memory database.
pub(crate) async fn setup_db() -> Database {
    init_test_tracing();
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

/// Fresh database plus an engine with the default policy.
pub(crate) async fn setup_engine() -> (Database, SettlementEngine) {
    let db = setup_db().await;
    let engine = db.engine(SettlementPolicy::default());
    (db, engine)
}

pub(crate) fn new_product(sku: &str, price_cents: i64, quantity: i64, reorder_level: i64) -> NewProduct {
    NewProduct {
        sku: sku.to_string(),
        name: format!("Product {sku}"),
        price_cents,
        quantity,
        reorder_level,
    }
}

pub(crate) fn new_customer(name: &str, contact_number: &str, points: i64) -> NewCustomer {
    NewCustomer {
        name: name.to_string(),
        contact_number: contact_number.to_string(),
        points,
    }
}

pub(crate) fn percentage_reward(name: &str, points_needed: i64, bps: u32) -> NewReward {
    NewReward {
        name: name.to_string(),
        description: None,
        kind: RewardKind::PercentageDiscount,
        points_needed,
        value: Some(Percentage::from_bps(bps)),
        product_id: None,
    }
}

pub(crate) fn free_item_reward(name: &str, points_needed: i64, product_id: &str) -> NewReward {
    NewReward {
        name: name.to_string(),
        description: None,
        kind: RewardKind::FreeItem,
        points_needed,
        value: None,
        product_id: Some(product_id.to_string()),
    }
}

/// Inserts a product and returns it.
pub(crate) async fn create_product(db: &Database, sku: &str, price_cents: i64, quantity: i64) -> Product {
    db.products()
        .create(new_product(sku, price_cents, quantity, 5))
        .await
        .expect("product fixture")
}

/// Inserts a customer and returns it.
pub(crate) async fn create_customer(db: &Database, contact_number: &str, points: i64) -> Customer {
    db.customers()
        .create(new_customer("Test Customer", contact_number, points))
        .await
        .expect("customer fixture")
}

/// Current product row.
pub(crate) async fn product(db: &Database, id: &str) -> Product {
    db.products()
        .get_by_id(id)
        .await
        .expect("product query")
        .expect("product exists")
}

/// Current customer row.
pub(crate) async fn customer(db: &Database, id: &str) -> Customer {
    db.customers()
        .get_by_id(id)
        .await
        .expect("customer query")
        .expect("customer exists")
}
