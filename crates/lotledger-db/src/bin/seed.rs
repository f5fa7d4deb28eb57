//! # Seed Data Generator
//!
//! Populates the database with a demo catalog and batch ledger for
//! development.
//!
//! ## Usage
//! ```bash
//! # Default: 40 products, ~3 batches each
//! cargo run -p lotledger-db --bin seed
//!
//! # Custom batch volume
//! cargo run -p lotledger-db --bin seed -- --batches 200
//!
//! # Specify database path
//! cargo run -p lotledger-db --bin seed -- --db ./data/ledger.db
//! ```
//!
//! Each product gets a handful of batches with staggered purchase dates
//! and a mix of expiring / non-expiring stock, then part of the ledger
//! is issued to the physical and online tiers so allocation has
//! something to chew on immediately.

use chrono::{Duration, Utc};
use std::env;

use lotledger_core::{NewBatch, StockTier};
use lotledger_db::{Database, DbConfig};

/// Demo catalog: (code, name, unit price in cents).
const PRODUCTS: &[(&str, &str, i64)] = &[
    ("RICE-5KG", "Basmati Rice 5kg", 1499),
    ("RICE-1KG", "Basmati Rice 1kg", 349),
    ("FLOUR-10KG", "Wheat Flour 10kg", 1199),
    ("SUGAR-1KG", "White Sugar 1kg", 189),
    ("OIL-1L", "Cooking Oil 1L", 549),
    ("OIL-5L", "Cooking Oil 5L", 2499),
    ("TEA-250G", "Black Tea 250g", 449),
    ("TEA-1KG", "Black Tea 1kg", 1599),
    ("MILK-1L", "UHT Milk 1L", 229),
    ("MILK-PWD", "Milk Powder 900g", 1299),
    ("GHEE-1KG", "Desi Ghee 1kg", 1899),
    ("LENTIL-RED", "Red Lentils 1kg", 329),
    ("LENTIL-BLK", "Black Lentils 1kg", 379),
    ("CHICKPEA", "Chickpeas 1kg", 299),
    ("SALT-800G", "Iodized Salt 800g", 59),
    ("SPICE-MIX", "Curry Spice Mix 100g", 149),
    ("CHILI-PWD", "Red Chili Powder 200g", 199),
    ("TURMERIC", "Turmeric Powder 200g", 179),
    ("BISCUIT-CHOC", "Chocolate Biscuits", 129),
    ("BISCUIT-PLAIN", "Plain Biscuits", 99),
    ("SOAP-BAR", "Bath Soap Bar", 119),
    ("SOAP-LIQ", "Liquid Handwash 500ml", 349),
    ("SHAMPOO", "Shampoo 400ml", 599),
    ("DETERGENT", "Laundry Detergent 1kg", 449),
    ("TOOTHPASTE", "Toothpaste 150g", 229),
    ("HONEY-500G", "Natural Honey 500g", 899),
    ("JAM-MIXED", "Mixed Fruit Jam 400g", 379),
    ("KETCHUP", "Tomato Ketchup 800g", 329),
    ("NOODLES", "Instant Noodles 5-Pack", 279),
    ("CORNFLAKES", "Corn Flakes 500g", 499),
    ("DATES-500G", "Dried Dates 500g", 649),
    ("ALMONDS", "Almonds 250g", 799),
    ("CASHEWS", "Cashews 250g", 899),
    ("RAISINS", "Raisins 250g", 349),
    ("JUICE-1L", "Mango Juice 1L", 269),
    ("WATER-1.5L", "Mineral Water 1.5L", 89),
    ("COLA-1.5L", "Cola 1.5L", 179),
    ("EGGS-DOZ", "Eggs Dozen", 329),
    ("BREAD-LRG", "Large Bread Loaf", 169),
    ("BUTTER-200G", "Butter 200g", 399),
];

const SUPPLIERS: &[&str] = &[
    "Metro Wholesale",
    "Karachi Traders",
    "Alpine Distribution",
    "Unity Foods",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut batch_count: usize = 120;
    let mut db_path = String::from("./lotledger_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--batches" | "-b" => {
                if i + 1 < args.len() {
                    batch_count = args[i + 1].parse().unwrap_or(120);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("LotLedger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -b, --batches <N>  Number of batches to generate (default: 120)");
                println!("  -d, --db <PATH>    Database file path (default: ./lotledger_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 LotLedger Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Batches:  {}", batch_count);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Check existing ledger
    let existing = db.batches().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} batches", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Catalog first; batches reference product codes
    println!();
    println!("Seeding catalog...");
    for (code, name, price) in PRODUCTS {
        db.catalog().upsert(code, name, *price).await?;
    }
    println!("  {} products", PRODUCTS.len());

    println!("Generating batches...");
    let today = Utc::now().date_naive();
    let engine = db.transfer_engine();
    let start = std::time::Instant::now();

    let mut generated = 0;
    let mut issued = 0;
    'outer: loop {
        for (idx, (code, _, price)) in PRODUCTS.iter().enumerate() {
            if generated >= batch_count {
                break 'outer;
            }

            let seed = generated * 31 + idx;
            let quantity = 20 + (seed % 80) as i64;
            // Purchase cost runs 55-75% of retail
            let cost_pct = 55 + (seed % 20) as i64;
            let purchase_date = today - Duration::days((seed % 90) as i64);
            // Roughly a third of the ledger is non-perishable
            let expiry_date = if seed % 3 == 0 {
                None
            } else {
                Some(today + Duration::days(30 + (seed % 300) as i64))
            };

            db.batches()
                .insert(&NewBatch {
                    product_code: code.to_string(),
                    quantity,
                    purchase_price_cents: price * cost_pct / 100,
                    purchase_date,
                    expiry_date,
                    supplier: Some(SUPPLIERS[seed % SUPPLIERS.len()].to_string()),
                })
                .await?;
            generated += 1;

            // Put part of every other batch on a shelf
            if seed % 2 == 0 {
                let tier = if seed % 4 == 0 {
                    StockTier::Online
                } else {
                    StockTier::Physical
                };
                engine.issue_to_tier(code, quantity / 2, tier).await?;
                issued += 1;
            }

            if generated % 50 == 0 {
                println!("  Generated {} batches...", generated);
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} batches ({} partial tier issues) in {:?}",
        generated, issued, elapsed
    );

    // Quick sanity read-back
    println!();
    println!("Verifying ledger...");
    let physical = db
        .tier_stock()
        .total_for_product(StockTier::Physical, "RICE-5KG")
        .await?;
    println!("  RICE-5KG on physical tier: {} units", physical);
    let low = db.batches().low_stock(10).await?;
    println!("  Batches below 10 remaining: {}", low.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
