//! # Seed Data Generator
//!
//! Populates the database with demo salon data for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database file
//! cargo run -p salon-db --bin seed
//!
//! # Specify database path
//! cargo run -p salon-db --bin seed -- --db ./data/salon.db
//! ```
//!
//! ## Generated Data
//! - Customers with varied visit histories (including one on visit 5, so
//!   the next sale triggers the milestone discount, and one in their
//!   birthday month)
//! - The service catalog with tiered prices (child / shampoo-combined)
//! - Retail products with stock
//! - Staff members
//! - One active percentage promotion

use chrono::{Datelike, Duration, Utc};
use std::env;
use uuid::Uuid;

use salon_core::{Customer, DiscountRule, DiscountType, Product, Service, Staff};
use salon_db::repository::{catalog, customer, discount_rule};
use salon_db::{Database, DbConfig};

/// Service catalog: (name, single, child, combined, child_combined).
const SERVICES: &[(&str, i64, Option<i64>, Option<i64>, Option<i64>)] = &[
    ("Cut", 20000, Some(14000), Some(23000), Some(16000)),
    ("Perm", 70000, Some(50000), Some(73000), None),
    ("Color", 60000, None, Some(63000), None),
    ("Shampoo & Blow Dry", 8000, Some(6000), None, None),
    ("Scalp Treatment", 35000, None, Some(38000), None),
    ("Styling", 15000, Some(10000), None, None),
];

/// Retail products: (name, price, stock).
const PRODUCTS: &[(&str, i64, i64)] = &[
    ("Moisture Shampoo 500ml", 18000, 24),
    ("Repair Treatment 200ml", 25000, 12),
    ("Hair Essence 100ml", 15000, 18),
    ("Scalp Tonic 120ml", 22000, 8),
    ("Styling Wax 80g", 12000, 30),
    ("Heat Protect Spray 150ml", 16000, 15),
];

const STAFF: &[&str] = &["Mina", "Sora", "Jihye"];

/// Demo customers: (name, phone, birth_month, visit_count).
/// One sits at 5 visits so the very next sale fires the milestone
/// discount; one has this month as birth month.
fn demo_customers() -> Vec<(&'static str, &'static str, Option<i64>, i64)> {
    let this_month = Utc::now().month() as i64;
    vec![
        ("Kim Haeun", "010-1111-2222", Some(3), 5),
        ("Lee Junho", "010-3333-4444", Some(this_month), 2),
        ("Park Soyeon", "010-5555-6666", None, 11),
        ("Choi Dana", "010-7777-8888", Some(12), 0),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./salon_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Salon POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./salon_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Salon POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    // Connect to database (migrations run automatically)
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");
    println!();

    let mut conn = db.pool().acquire().await?;
    let now = Utc::now();

    println!("Seeding customers...");
    for (name, phone, birth_month, visit_count) in demo_customers() {
        let cust = Customer {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            phone: Some(phone.to_string()),
            birth_month,
            birth_day: None,
            visit_count,
            loyalty_points: 0,
            total_spent: 0,
            last_visit_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        if let Err(e) = customer::insert(&mut conn, &cust).await {
            eprintln!("Failed to insert customer {}: {}", name, e);
        }
    }
    println!("  {} customers", demo_customers().len());

    println!("Seeding services...");
    for (name, single, child, combined, child_combined) in SERVICES {
        let service = Service {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            single_price: *single,
            child_price: *child,
            combined_price: *combined,
            child_combined_price: *child_combined,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        if let Err(e) = catalog::insert_service(&mut conn, &service).await {
            eprintln!("Failed to insert service {}: {}", name, e);
        }
    }
    println!("  {} services", SERVICES.len());

    println!("Seeding products...");
    for (name, price, stock) in PRODUCTS {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            price: *price,
            stock_quantity: *stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        if let Err(e) = catalog::insert_product(&mut conn, &product).await {
            eprintln!("Failed to insert product {}: {}", name, e);
        }
    }
    println!("  {} products", PRODUCTS.len());

    println!("Seeding staff...");
    for name in STAFF {
        let staff = Staff {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            is_active: true,
            created_at: now,
        };
        if let Err(e) = catalog::insert_staff(&mut conn, &staff).await {
            eprintln!("Failed to insert staff {}: {}", name, e);
        }
    }
    println!("  {} staff members", STAFF.len());

    println!("Seeding promotion...");
    let promo = DiscountRule {
        id: Uuid::new_v4().to_string(),
        name: "Grand opening 10% off".to_string(),
        discount_type: DiscountType::Promotion,
        is_percentage: true,
        value: 1000, // 10% in basis points
        min_purchase: Some(30000),
        max_cap: Some(20000),
        valid_from: Some(now - Duration::days(1)),
        valid_until: Some(now + Duration::days(30)),
        apply_to_all_services: true,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    if let Err(e) = discount_rule::insert(&mut conn, &promo).await {
        eprintln!("Failed to insert promotion: {}", e);
    }
    println!("  1 promotion ({})", promo.name);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
