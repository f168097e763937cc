//! # Seed Data Generator
//!
//! Fills a database with a demo catalog spread over the shops, plus one
//! sale, one transfer and one VAT refund so every screen has data.
//!
//! ## Usage
//! ```bash
//! # Seed ./stockroom_dev.db
//! cargo run -p stockroom-db --bin seed
//!
//! # Specify database path
//! cargo run -p stockroom-db --bin seed -- --db ./data/stockroom.db
//! ```
//!
//! Set `RUST_LOG=debug` to see every movement row as it is booked.

use std::env;
use std::path::PathBuf;

use stockroom_core::{
    CustomerContact, Document, LineItem, LocationId, Money, ProductDraft, StockView, VisitorDetails,
};
use stockroom_db::{DatabaseSettings, InventoryService, StockroomConfig};
use tracing_subscriber::EnvFilter;

/// (sku, name, category, price in cents)
const CATALOG: &[(&str, &str, &str, i64)] = &[
    ("SOFA-3S", "Three Seater Sofa", "Living", 4_500_000),
    ("SOFA-2S", "Two Seater Sofa", "Living", 3_200_000),
    ("TBL-COF", "Coffee Table Oak", "Living", 850_000),
    ("BED-QN", "Queen Bed Frame", "Bedroom", 2_750_000),
    ("BED-KG", "King Bed Frame", "Bedroom", 3_400_000),
    ("MAT-QN", "Queen Mattress", "Bedroom", 1_990_000),
    ("WRD-2D", "Two Door Wardrobe", "Bedroom", 1_650_000),
    ("DIN-6", "Six Seat Dining Set", "Dining", 3_900_000),
    ("CHR-DIN", "Dining Chair", "Dining", 345_000),
    ("LMP-FLR", "Floor Lamp", "Lighting", 275_000),
    ("LMP-DSK", "Desk Lamp", "Lighting", 95_000),
    ("RUG-200", "Rug 200x300", "Decor", 720_000),
];

/// Opening units per shop; index 0 is the master warehouse.
const SHOP_STOCK: &[i64] = &[20, 4, 3, 2, 2, 3, 1, 2];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,stockroom=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./stockroom_dev.db");

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
                println!("Stockroom Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./stockroom_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Stockroom Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let mut config = StockroomConfig::default();
    config.database = DatabaseSettings {
        path: Some(PathBuf::from(&db_path)),
        ..Default::default()
    };
    let service = InventoryService::open(&config).await?;
    println!("✓ Connected to database");

    let existing = service.read(|engine| engine.stock().len()).await;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        service.shutdown().await?;
        return Ok(());
    }

    let shops = config.engine.locations.clone();
    let master = config.engine.master_location.clone();
    let mut created = Vec::new();

    for (sku, name, category, price_cents) in CATALOG {
        let product = service
            .upsert_product(ProductDraft {
                sku: sku.to_string(),
                name: name.to_string(),
                category: category.to_string(),
                min_quantity: 2,
                price_cents: *price_cents,
                opening_stock: Some(SHOP_STOCK[0]),
                ..Default::default()
            })
            .await?;

        for (shop, units) in shops.iter().zip(SHOP_STOCK).skip(1) {
            service
                .adjust_stock(&product.id, shop, *units, "Opening count")
                .await?;
        }
        created.push(product);
    }
    println!("✓ Created {} products across {} shops", created.len(), shops.len());

    let line = |index: usize, quantity: i64| {
        let p = &created[index % created.len()];
        LineItem::new(&p.id, &p.sku, &p.name, quantity, Money::from_cents(p.price_cents))
    };
    let plouis = LocationId::new("Plouis");

    let sale = Document::sale("seed-sale-1", "R-0001", plouis.clone(), vec![line(0, 1), line(2, 1)])
        .with_customer(CustomerContact::named("Mrs Ramdin").with_email("ramdin@example.mu"));
    service.issue(sale).await?;

    let transfer = Document::transfer(
        "seed-transfer-1",
        "T-0001",
        master.clone(),
        plouis.clone(),
        vec![line(0, 2), line(9, 3).with_destination(LocationId::new("Bagatelle"))],
    );
    service.issue(transfer).await?;

    let visitor = VisitorDetails {
        surname: "Dupont".into(),
        other_names: "Claire".into(),
        passport_number: "FR1234567".into(),
        nationality: "French".into(),
        flight_number: "AF473".into(),
        ..Default::default()
    };
    service
        .issue(Document::refund("seed-refund-1", "V-0001", plouis.clone(), visitor, vec![line(11, 1)]))
        .await?;
    println!("✓ Issued 1 sale, 1 transfer, 1 VAT refund");

    service.flush().await?;

    let (stats, movements, pending) = service
        .read(|engine| {
            (
                engine.inventory_stats(&StockView::Global),
                engine.ledger().len(),
                engine.pending_documents().len(),
            )
        })
        .await;
    println!();
    println!("  Units in stock:    {}", stats.total_units);
    println!("  Stock value:       {}", stats.total_value);
    println!("  Movement rows:     {}", movements);
    println!("  Pending documents: {}", pending);

    service.shutdown().await?;
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
