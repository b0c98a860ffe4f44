//! Shared helpers for rxstock-db integration tests.
#![allow(dead_code)] // each test binary uses its own subset

use chrono::NaiveDate;
use uuid::Uuid;

use rxstock_core::{BatchExpiry, InventoryLine, NewBatch};
use rxstock_db::mutator::RestockRequest;
use rxstock_db::repository::inventory::NewInventoryLine;
use rxstock_db::{Database, DbConfig};

/// Initializes test logging once; respects RUST_LOG.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// An isolated in-memory database (single connection).
pub async fn memory_db() -> Database {
    init_tracing();
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// A temp-file database for tests that need real connection concurrency.
/// Returns the handle and the path for cleanup.
pub async fn file_db() -> (Database, std::path::PathBuf) {
    init_tracing();
    let path = std::env::temp_dir().join(format!("rxstock-test-{}.db", Uuid::new_v4()));
    let db = Database::new(DbConfig::new(&path).max_connections(5))
        .await
        .unwrap();
    (db, path)
}

/// Removes a temp database file and its WAL siblings.
pub fn cleanup_file_db(path: &std::path::Path) {
    let _ = std::fs::remove_file(path);
    let _ = std::fs::remove_file(path.with_extension("db-wal"));
    let _ = std::fs::remove_file(path.with_extension("db-shm"));
}

/// Creates a line with the given thresholds.
pub async fn create_line(
    db: &Database,
    pharmacy_id: &str,
    medication_id: &str,
    minimum_stock_level: i64,
    reorder_quantity: i64,
) -> InventoryLine {
    db.lines()
        .create(NewInventoryLine {
            pharmacy_id: pharmacy_id.to_string(),
            medication_id: medication_id.to_string(),
            minimum_stock_level,
            reorder_quantity,
            price_cents: 1250,
            currency: None,
        })
        .await
        .unwrap()
}

/// Restock request carrying a dated batch.
pub fn dated_restock(batch_number: &str, expiration: NaiveDate) -> RestockRequest {
    RestockRequest {
        batch: Some(NewBatch {
            batch_number: batch_number.to_string(),
            expiry: BatchExpiry::Expiring(expiration),
            manufacturing_date: None,
            cost_per_unit_cents: 500,
        }),
        performed_by: Some("tester".to_string()),
        reference_number: None,
    }
}

/// Asserts the core invariant and ledger consistency for a line.
pub async fn assert_line_consistent(db: &Database, line_id: &str) {
    assert!(
        db.lines().invariant_holds(line_id).await.unwrap(),
        "line quantity must equal sum of active batch quantities"
    );
    assert!(
        db.ledger().chain_is_consistent(line_id).await.unwrap(),
        "ledger before/after chain must be consistent"
    );
}
