//! # Inventory Line Repository
//!
//! Database operations for inventory lines: lifecycle, lookups and the
//! low-stock feed. Stock quantities are never written here; that is the
//! StockMutator's job.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use rxstock_core::{InventoryLine, DEFAULT_CURRENCY};

/// Column list shared by every line SELECT, in `InventoryLine` field order.
pub(crate) const LINE_COLUMNS: &str = "id, pharmacy_id, medication_id, quantity_in_stock, \
     minimum_stock_level, reorder_quantity, price_cents, currency, \
     is_active, created_at, updated_at, row_version";

/// Input for creating an inventory line.
///
/// A line starts empty; stock arrives through `StockMutator::increase`.
#[derive(Debug, Clone)]
pub struct NewInventoryLine {
    pub pharmacy_id: String,
    pub medication_id: String,
    pub minimum_stock_level: i64,
    pub reorder_quantity: i64,
    pub price_cents: i64,
    /// Defaults to [`DEFAULT_CURRENCY`] when absent.
    pub currency: Option<String>,
}

/// Repository for inventory line database operations.
#[derive(Debug, Clone)]
pub struct InventoryLineRepository {
    pool: SqlitePool,
}

impl InventoryLineRepository {
    /// Creates a new InventoryLineRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryLineRepository { pool }
    }

    /// Creates a line for a (pharmacy, medication) pair.
    ///
    /// ## Returns
    /// * `Ok(InventoryLine)` - The created line with zero stock
    /// * `Err(DbError::UniqueViolation)` - The pharmacy already stocks this
    ///   medication
    pub async fn create(&self, new: NewInventoryLine) -> DbResult<InventoryLine> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let currency = new
            .currency
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        debug!(id = %id, pharmacy_id = %new.pharmacy_id, medication_id = %new.medication_id, "Creating inventory line");

        let line = InventoryLine {
            id: id.clone(),
            pharmacy_id: new.pharmacy_id,
            medication_id: new.medication_id,
            quantity_in_stock: 0,
            minimum_stock_level: new.minimum_stock_level,
            reorder_quantity: new.reorder_quantity,
            price_cents: new.price_cents,
            currency,
            is_active: true,
            created_at: now,
            updated_at: now,
            row_version: 0,
        };

        sqlx::query(
            r#"
            INSERT INTO inventory_lines (
                id, pharmacy_id, medication_id, quantity_in_stock,
                minimum_stock_level, reorder_quantity, price_cents, currency,
                is_active, created_at, updated_at, row_version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&line.id)
        .bind(&line.pharmacy_id)
        .bind(&line.medication_id)
        .bind(line.quantity_in_stock)
        .bind(line.minimum_stock_level)
        .bind(line.reorder_quantity)
        .bind(line.price_cents)
        .bind(&line.currency)
        .bind(line.is_active)
        .bind(line.created_at)
        .bind(line.updated_at)
        .bind(line.row_version)
        .execute(&self.pool)
        .await?;

        Ok(line)
    }

    /// Gets a line by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<InventoryLine>> {
        let line = sqlx::query_as::<_, InventoryLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM inventory_lines WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(line)
    }

    /// Gets the line a pharmacy holds for a medication, if any.
    pub async fn get_for_pharmacy_medication(
        &self,
        pharmacy_id: &str,
        medication_id: &str,
    ) -> DbResult<Option<InventoryLine>> {
        let line = sqlx::query_as::<_, InventoryLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM inventory_lines \
             WHERE pharmacy_id = ?1 AND medication_id = ?2"
        ))
        .bind(pharmacy_id)
        .bind(medication_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(line)
    }

    /// Lists a pharmacy's active lines, medication order.
    pub async fn list_for_pharmacy(&self, pharmacy_id: &str) -> DbResult<Vec<InventoryLine>> {
        let lines = sqlx::query_as::<_, InventoryLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM inventory_lines \
             WHERE pharmacy_id = ?1 AND is_active = 1 \
             ORDER BY medication_id"
        ))
        .bind(pharmacy_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Lists a pharmacy's active lines at or below their minimum stock
    /// level. Feed for the external notifier.
    pub async fn low_stock_lines(&self, pharmacy_id: &str) -> DbResult<Vec<InventoryLine>> {
        let lines = sqlx::query_as::<_, InventoryLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM inventory_lines \
             WHERE pharmacy_id = ?1 AND is_active = 1 \
             AND quantity_in_stock <= minimum_stock_level \
             ORDER BY medication_id"
        ))
        .bind(pharmacy_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Soft-removes a line by setting `is_active = false`.
    ///
    /// ## Why Soft Remove?
    /// Batches and ledger entries reference the line; history must survive.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deactivating inventory line");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE inventory_lines
            SET is_active = 0,
                updated_at = ?2,
                row_version = row_version + 1
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("InventoryLine", id));
        }

        Ok(())
    }

    /// Verifies the core invariant for one line: stored quantity equals the
    /// sum of active batch quantities.
    ///
    /// ## Usage
    /// Reconciliation jobs and tests. A `false` here means a bug in the
    /// mutation path, not in the data.
    pub async fn invariant_holds(&self, id: &str) -> DbResult<bool> {
        let row: Option<(i64, i64)> = sqlx::query_as(
            r#"
            SELECT l.quantity_in_stock,
                   COALESCE((SELECT SUM(b.quantity) FROM batches b
                             WHERE b.line_id = l.id AND b.is_active = 1), 0)
            FROM inventory_lines l
            WHERE l.id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((quantity, batch_sum)) => Ok(quantity == batch_sum),
            None => Err(DbError::not_found("InventoryLine", id)),
        }
    }
}
