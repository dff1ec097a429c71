//! # Seed Data Generator
//!
//! Populates a development database with one shop, a few customers and a
//! stocked product catalogue.
//!
//! ## Usage
//! ```bash
//! cargo run -p stockbook-db --bin seed
//! cargo run -p stockbook-db --bin seed -- --db ./data/stockbook.db --count 200
//! ```
//!
//! Prints the shop, customer and product ids so that requests for the
//! `invoice` binary can be written against them.

use std::env;

use stockbook_db::{Database, DbConfig, NewCustomer, NewProduct};

/// Category name and products as (name, unit price, selling price, shelf life days).
const CATALOGUE: &[(&str, &[(&str, i64, i64, i64)])] = &[
    (
        "Grocery",
        &[
            ("Basmati Rice 5kg", 2_400, 2_990, 365),
            ("Toor Dal 1kg", 1_100, 1_450, 270),
            ("Sunflower Oil 1L", 1_300, 1_650, 180),
            ("Wheat Flour 10kg", 3_200, 3_900, 120),
            ("Sugar 1kg", 380, 450, 730),
        ],
    ),
    (
        "Beverages",
        &[
            ("Assam Tea 250g", 900, 1_200, 540),
            ("Instant Coffee 100g", 2_100, 2_650, 540),
            ("Mango Juice 1L", 700, 950, 90),
        ],
    ),
    (
        "Dairy",
        &[
            ("Toned Milk 1L", 480, 560, 3),
            ("Paneer 200g", 700, 900, 7),
            ("Curd 400g", 350, 450, 5),
        ],
    ),
    (
        "Household",
        &[
            ("Detergent 1kg", 1_500, 1_990, 1_095),
            ("Dish Soap 500ml", 650, 850, 1_095),
        ],
    ),
];

const CUSTOMERS: &[(&str, &str)] = &[
    ("Walk-in Customer", "000-0000"),
    ("Asha Verma", "555-0101"),
    ("Ravi Kumar", "555-0102"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 100;
    let mut db_path = String::from("./stockbook_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(100);
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
                println!("Stockbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Opening stock per product (default: 100)");
                println!("  -d, --db <PATH>    Database file path (default: ./stockbook_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Stockbook Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Opening stock: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    let shop = db.shops().create("Stockbook Demo Store", "demo-owner").await?;
    println!("✓ Shop {}", shop.id);

    for (name, phone) in CUSTOMERS {
        let customer = db
            .customers()
            .create(
                &shop.id,
                &NewCustomer {
                    name: name.to_string(),
                    phone: Some(phone.to_string()),
                    ..Default::default()
                },
            )
            .await?;
        println!("  customer {}  {}", customer.id, customer.name);
    }

    for (category_name, products) in CATALOGUE {
        let category = db.categories().create(&shop.id, category_name).await?;

        for (product_name, unit_price, selling_price, shelf_life) in products.iter() {
            let input = NewProduct {
                category_id: category.id.clone(),
                product_name: product_name.to_string(),
                description: None,
                unit_price_cents: *unit_price,
                selling_price_cents: *selling_price,
                expire_time_in_days: *shelf_life,
            };

            match db.products().create(&shop.id, &input, count as i64).await {
                Ok(product) => println!(
                    "  product  {}  {} @ {} x{}",
                    product.id,
                    product.product_name,
                    product.selling_price(),
                    product.quantity
                ),
                Err(e) => eprintln!("Failed to insert {}: {}", product_name, e),
            }
        }
    }

    println!();
    println!("✓ {} products", db.products().count(&shop.id).await?);
    println!("✓ Seed complete! export STOCKBOOK_SHOP_ID={}", shop.id);

    db.close().await;
    Ok(())
}
