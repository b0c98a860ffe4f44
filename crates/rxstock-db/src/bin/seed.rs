//! # Seed Data Generator
//!
//! Populates the database with demo pharmacies, inventory lines and dated
//! batches for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database (./rxstock.db)
//! cargo run -p rxstock-db --bin seed
//!
//! # Specify database path
//! cargo run -p rxstock-db --bin seed -- --db ./data/rxstock.db
//! ```
//!
//! ## Generated Data
//! - A handful of demo pharmacies
//! - One inventory line per (pharmacy, medication), staggered so coverage
//!   differs between pharmacies (useful for search-ranking demos)
//! - One or two batches per line with spread-out expiration dates, fed
//!   through the StockMutator so every line carries a real ledger trail

use chrono::{Days, Utc};
use std::env;

use rxstock_core::{BatchExpiry, NewBatch};
use rxstock_db::mutator::RestockRequest;
use rxstock_db::repository::inventory::NewInventoryLine;
use rxstock_db::{Database, DbConfig};

/// Demo medications: (category, name, price_cents).
const MEDICATIONS: &[(&str, &str, i64)] = &[
    ("AB", "Amoxicillin 500mg", 1250),
    ("AB", "Azithromycin 250mg", 2190),
    ("AB", "Ciprofloxacin 500mg", 1840),
    ("AN", "Ibuprofen 400mg", 450),
    ("AN", "Paracetamol 500mg", 320),
    ("AN", "Naproxen 250mg", 680),
    ("CV", "Atorvastatin 20mg", 1590),
    ("CV", "Lisinopril 10mg", 980),
    ("CV", "Metoprolol 50mg", 1120),
    ("DM", "Metformin 850mg", 760),
    ("DM", "Insulin Glargine", 6890),
    ("RS", "Salbutamol Inhaler", 2450),
    ("RS", "Fluticasone Spray", 3150),
    ("GI", "Omeprazole 20mg", 890),
    ("GI", "Loperamide 2mg", 540),
];

/// Demo pharmacies.
const PHARMACIES: &[&str] = &[
    "central-pharmacy",
    "riverside-drugstore",
    "hilltop-apothecary",
    "station-pharmacy",
];

fn medication_id(name: &str) -> String {
    format!(
        "med-{}",
        name.to_lowercase().replace([' ', '/'], "-")
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let db_path = args
        .iter()
        .position(|a| a == "--db")
        .and_then(|i| args.get(i + 1))
        .cloned()
        .unwrap_or_else(|| "./rxstock.db".to_string());

    println!("Seeding database at {db_path}");

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let lines = db.lines();
    let mutator = db.mutator();
    let today = Utc::now().date_naive();

    let mut line_count = 0_usize;
    let mut batch_count = 0_usize;

    for (pharmacy_index, pharmacy) in PHARMACIES.iter().enumerate() {
        let pharmacy_id = format!("ph-{pharmacy}");

        for (med_index, (category, name, price_cents)) in MEDICATIONS.iter().enumerate() {
            // Stagger coverage: each pharmacy skips a different slice of the
            // catalog so fulfillment percentages differ in search demos.
            if (med_index + pharmacy_index) % 5 == 0 {
                continue;
            }

            let line = lines
                .create(NewInventoryLine {
                    pharmacy_id: pharmacy_id.clone(),
                    medication_id: medication_id(name),
                    minimum_stock_level: 10,
                    reorder_quantity: 80,
                    price_cents: *price_cents,
                    currency: None,
                })
                .await?;
            line_count += 1;

            // One or two dated batches per line, expiries spread over the
            // next year, quantities varied deterministically.
            let batches = 1 + (med_index + pharmacy_index) % 2;
            for batch_index in 0..batches {
                let expiry_days = 30 * (1 + ((med_index + batch_index * 5) % 12)) as u64;
                let quantity = 20 + ((med_index * 7 + pharmacy_index * 13) % 60) as i64;

                mutator
                    .increase(
                        &line.id,
                        quantity,
                        RestockRequest {
                            batch: Some(NewBatch {
                                batch_number: format!(
                                    "{category}-{:04}-{batch_index}",
                                    med_index + 1
                                ),
                                expiry: BatchExpiry::Expiring(
                                    today.checked_add_days(Days::new(expiry_days)).unwrap(),
                                ),
                                manufacturing_date: today.checked_sub_days(Days::new(90)),
                                cost_per_unit_cents: price_cents * 6 / 10,
                            }),
                            performed_by: Some("seed".to_string()),
                            reference_number: Some(format!("SEED-{line_count:04}")),
                        },
                    )
                    .await?;
                batch_count += 1;
            }
        }
    }

    println!(
        "Seeded {} pharmacies, {} lines, {} batches",
        PHARMACIES.len(),
        line_count,
        batch_count
    );

    // Smoke-check the read path and print a sample verdict.
    let sample_ids: Vec<String> = MEDICATIONS
        .iter()
        .take(3)
        .map(|(_, name, _)| medication_id(name))
        .collect();
    let sample = db
        .fulfillment()
        .check(&format!("ph-{}", PHARMACIES[0]), &sample_ids)
        .await?;
    println!(
        "Sample fulfillment for {}:\n{}",
        sample.pharmacy_id,
        serde_json::to_string_pretty(&sample)?
    );

    db.close().await;
    Ok(())
}
