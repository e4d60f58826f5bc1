//! # Seed Data Generator
//!
//! Populates a database with a small steakhouse catalog for development:
//! products, loyalty members, rewards, discounts and the default points
//! exchange rate.
//!
//! ## Usage
//! ```bash
//! # Use tally.toml (or defaults) for the database location
//! cargo run -p tally-db --bin seed
//!
//! # Explicit config file
//! cargo run -p tally-db --bin seed -- --config ./tally.toml
//!
//! # Specify database path (overrides the config)
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```
//!
//! Seeding is skipped when the database already has products.

use std::env;
use std::path::PathBuf;

use tally_core::{ExchangeRate, Percentage, RewardKind};
use tally_db::{Database, NewCustomer, NewProduct, NewReward, TallyConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// (sku, name, price in centavos, quantity, reorder level)
const PRODUCTS: &[(&str, &str, i64, i64, i64)] = &[
    ("RIBEYE-MEAL", "Ribeye Steak Meal", 59_900, 40, 10),
    ("SIRLOIN-MEAL", "Sirloin Steak Meal", 44_900, 40, 10),
    ("TBONE-MEAL", "T-Bone Steak Meal", 69_900, 25, 8),
    ("CHICKEN-MEAL", "Grilled Chicken Meal", 24_900, 60, 15),
    ("MASHED-POTATO", "Mashed Potato", 8_900, 100, 20),
    ("BUTTERED-CORN", "Buttered Corn", 6_900, 100, 20),
    ("ICED-TEA", "House Iced Tea", 5_900, 200, 30),
    ("SODA", "Soda in Can", 4_500, 150, 30),
    ("CHOCO-CAKE", "Chocolate Cake Slice", 12_900, 12, 5),
];

/// (name, contact number, starting points)
const CUSTOMERS: &[(&str, &str, i64)] = &[
    ("Maria Santos", "09171234567", 0),
    ("Jose Reyes", "09181234567", 75),
    ("Ana Cruz", "09191234567", 240),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn")),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  tally.toml to load (default: $TALLY_CONFIG or platform dir)");
                println!("  -d, --db <PATH>      Database file path (overrides the config)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => warn!(arg = other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let mut config = TallyConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    println!("🌱 Tally POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", config.database.path.display());
    println!();

    if let Some(parent) = config.database.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Exchange rate first so the stored row exists even before any sale
    let rate = db.configs().set_exchange_rate(ExchangeRate::default()).await?;
    println!("✓ Exchange rate: {}", rate.describe());

    let mut products = Vec::with_capacity(PRODUCTS.len());
    for &(sku, name, price_cents, quantity, reorder_level) in PRODUCTS {
        let product = db
            .products()
            .create(NewProduct {
                sku: sku.to_string(),
                name: name.to_string(),
                price_cents,
                quantity,
                reorder_level,
            })
            .await?;
        products.push(product);
    }
    println!("✓ {} products", products.len());

    // Rewards go in before customers so eligibility is computed against them
    let rewards = [
        NewReward {
            name: "10% Off".to_string(),
            description: Some("Ten percent off the whole bill".to_string()),
            kind: RewardKind::PercentageDiscount,
            points_needed: 50,
            value: Some(Percentage::from_bps(1000)),
            product_id: None,
        },
        NewReward {
            name: "25% Off".to_string(),
            description: Some("A quarter off the whole bill".to_string()),
            kind: RewardKind::PercentageDiscount,
            points_needed: 150,
            value: Some(Percentage::from_bps(2500)),
            product_id: None,
        },
        NewReward {
            name: "Free Chocolate Cake".to_string(),
            description: Some("One slice on the house".to_string()),
            kind: RewardKind::FreeItem,
            points_needed: 100,
            value: None,
            product_id: products
                .iter()
                .find(|p| p.sku == "CHOCO-CAKE")
                .map(|p| p.id.clone()),
        },
    ];
    for reward in rewards {
        let created = db.rewards().create(reward).await?;
        info!(reward_id = %created.id, name = %created.name, "Seeded reward");
    }
    println!("✓ 3 rewards");

    db.discounts()
        .create("Senior Citizen", Some("Statutory 20% discount".to_string()), Percentage::from_bps(2000))
        .await?;
    db.discounts()
        .create("PWD", Some("Statutory 20% discount".to_string()), Percentage::from_bps(2000))
        .await?;
    db.discounts()
        .create("Employee", None, Percentage::from_bps(1500))
        .await?;
    println!("✓ 3 discounts");

    for &(name, contact_number, points) in CUSTOMERS {
        let customer = db
            .customers()
            .create(NewCustomer {
                name: name.to_string(),
                contact_number: contact_number.to_string(),
                points,
            })
            .await?;
        println!(
            "  {} ({} pts, {})",
            customer.name,
            customer.points,
            if customer.eligible_for_rewards { "eligible" } else { "not yet eligible" }
        );
    }
    println!("✓ {} customers", CUSTOMERS.len());

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
