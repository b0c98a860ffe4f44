//! # Stock Mutator
//!
//! The only component allowed to change an inventory line's quantity.
//!
//! ## One Mutation, One Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 decrease(line_id, qty) Walkthrough                      │
//! │                                                                         │
//! │  validate qty ── fails fast, before any I/O                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN TRANSACTION                                                      │
//! │       │                                                                 │
//! │       ├── SELECT line            (captures row_version v)               │
//! │       ├── SELECT active batches  (FIFO order)                           │
//! │       ├── plan_consumption()     (pure, rxstock-core)                   │
//! │       │      └── InsufficientStock? → ROLLBACK, nothing changed         │
//! │       ├── UPDATE each drawn batch (deactivate when exhausted)           │
//! │       ├── INSERT one Sale ledger entry per batch touched                │
//! │       └── UPDATE line SET quantity = ?, row_version = v + 1             │
//! │              WHERE id = ? AND row_version = v                           │
//! │                  └── 0 rows? another writer won → ROLLBACK,             │
//! │                      ConcurrencyConflict, caller retries                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← batches, ledger and line move together or not at all          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The same `row_version` check guards `increase`, `set_absolute` and the
//! expiry sweep, so a batch can never be consumed and expired in
//! overlapping windows.
//!
//! Post-condition of every operation: the line's `quantity_in_stock`
//! equals the sum of its active batch quantities.

use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult, StockResult};
use crate::repository::inventory::LINE_COLUMNS;
use crate::repository::{batch, ledger};
use rxstock_core::validation::{
    validate_absolute_quantity, validate_new_batch, validate_quantity,
};
use rxstock_core::{
    alerts, fifo, BatchExpiry, InventoryLine, LedgerEntry, LedgerEntryType, NewBatch,
};

// =============================================================================
// Request Types
// =============================================================================

/// Options for a stock increase (restock).
#[derive(Debug, Clone, Default)]
pub struct RestockRequest {
    /// Lot metadata for the received stock. When absent the units land in
    /// a generated non-expiring batch so the batch-sum invariant holds.
    pub batch: Option<NewBatch>,
    pub performed_by: Option<String>,
    /// External reference (delivery note, purchase order).
    pub reference_number: Option<String>,
}

/// Options for a stock decrease (dispense/sale).
#[derive(Debug, Clone, Default)]
pub struct DispenseRequest {
    pub performed_by: Option<String>,
    pub prescription_id: Option<String>,
    pub reference_number: Option<String>,
}

/// Summary of one expiry sweep run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpirySweep {
    pub lines_touched: usize,
    pub batches_expired: usize,
    pub units_removed: i64,
}

// =============================================================================
// Stock Mutator
// =============================================================================

/// Coordinates batch changes, line quantity and ledger appends as one
/// atomic unit per operation.
#[derive(Debug, Clone)]
pub struct StockMutator {
    pool: SqlitePool,
}

impl StockMutator {
    /// Creates a new StockMutator.
    pub fn new(pool: SqlitePool) -> Self {
        StockMutator { pool }
    }

    /// Adds `qty` units to a line, receiving them into a batch.
    ///
    /// ## Batch Resolution
    /// - Metadata supplied, lot number matches an **active** batch:
    ///   the existing batch is augmented (same physical lot, new delivery).
    /// - Metadata supplied, lot number matches an **inactive** batch:
    ///   `UniqueViolation` - an exhausted or purged lot number cannot be
    ///   reused on the same line.
    /// - Metadata supplied, lot number unknown: a new batch is inserted.
    /// - No metadata: a generated non-expiring batch receives the units.
    ///
    /// ## Returns
    /// The updated line. Appends one `Restock` ledger entry.
    pub async fn increase(
        &self,
        line_id: &str,
        qty: i64,
        request: RestockRequest,
    ) -> StockResult<InventoryLine> {
        validate_quantity(qty)?;
        if let Some(batch_meta) = &request.batch {
            validate_new_batch(batch_meta)?;
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let line = fetch_line_tx(&mut tx, line_id)
            .await?
            .ok_or_else(|| DbError::not_found("InventoryLine", line_id))?;

        let batch_id = match &request.batch {
            Some(meta) => {
                match batch::get_by_number_tx(&mut tx, line_id, &meta.batch_number).await? {
                    Some(existing) if existing.is_active => {
                        debug!(batch_id = %existing.id, qty, "Augmenting existing batch");
                        batch::augment_tx(&mut tx, &existing.id, qty).await?;
                        existing.id
                    }
                    Some(_) => {
                        return Err(
                            DbError::duplicate("batch_number", &meta.batch_number).into()
                        );
                    }
                    None => batch::insert_tx(&mut tx, line_id, meta, qty, now).await?.id,
                }
            }
            None => {
                let generated = NewBatch {
                    batch_number: generate_batch_number("RCV"),
                    expiry: BatchExpiry::NonExpiring,
                    manufacturing_date: None,
                    cost_per_unit_cents: 0,
                };
                batch::insert_tx(&mut tx, line_id, &generated, qty, now).await?.id
            }
        };

        let new_qty = line.quantity_in_stock + qty;
        commit_line_quantity(&mut tx, &line, new_qty, now).await?;

        ledger::insert_tx(
            &mut tx,
            &LedgerEntry {
                id: Uuid::new_v4().to_string(),
                line_id: line_id.to_string(),
                batch_id: Some(batch_id),
                entry_type: LedgerEntryType::Restock,
                quantity_changed: qty,
                stock_before: line.quantity_in_stock,
                stock_after: new_qty,
                performed_by: request.performed_by,
                prescription_id: None,
                reference_number: request.reference_number,
                notes: None,
                transaction_date: now,
            },
        )
        .await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(line_id, qty, new_qty, "Stock increased");

        Ok(updated_line(line, new_qty, now))
    }

    /// Consumes `qty` units from a line's active batches in FIFO order.
    ///
    /// ## Failure Semantics
    /// * `InsufficientStock` - active batches hold fewer than `qty` units;
    ///   the transaction rolls back and no partial consumption survives
    /// * `ConcurrencyConflict` - another writer committed between this
    ///   call's read and write; retry with fresh state
    ///
    /// ## Returns
    /// The updated line. Appends one `Sale` ledger entry per batch touched,
    /// chained through exact before/after stock values.
    pub async fn decrease(
        &self,
        line_id: &str,
        qty: i64,
        request: DispenseRequest,
    ) -> StockResult<InventoryLine> {
        validate_quantity(qty)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let line = fetch_line_tx(&mut tx, line_id)
            .await?
            .ok_or_else(|| DbError::not_found("InventoryLine", line_id))?;

        let batches = batch::list_active_tx(&mut tx, line_id).await?;
        let plan = fifo::plan_consumption(line_id, &batches, qty)?;

        let mut running = line.quantity_in_stock;
        for draw in &plan.draws {
            batch::apply_draw_tx(&mut tx, &draw.batch_id, draw.remaining_after).await?;

            ledger::insert_tx(
                &mut tx,
                &LedgerEntry {
                    id: Uuid::new_v4().to_string(),
                    line_id: line_id.to_string(),
                    batch_id: Some(draw.batch_id.clone()),
                    entry_type: LedgerEntryType::Sale,
                    quantity_changed: -draw.drawn,
                    stock_before: running,
                    stock_after: running - draw.drawn,
                    performed_by: request.performed_by.clone(),
                    prescription_id: request.prescription_id.clone(),
                    reference_number: request.reference_number.clone(),
                    notes: None,
                    transaction_date: now,
                },
            )
            .await?;

            running -= draw.drawn;
        }

        commit_line_quantity(&mut tx, &line, running, now).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(line_id, qty, new_qty = running, batches = plan.draws.len(), "Stock decreased");

        let updated = updated_line(line, running, now);
        self.signal_low_stock(&updated);
        Ok(updated)
    }

    /// Sets a line's quantity to an absolute value (administrative
    /// correction, not a sale).
    ///
    /// Batch allocation is reconciled so the batch-sum invariant keeps
    /// holding: a shrink drains batches FIFO, a growth lands in a generated
    /// adjustment batch. The ledger records one `Adjustment` entry with
    /// `quantity_changed = new_qty - old_qty` and no per-batch sale rows.
    pub async fn set_absolute(
        &self,
        line_id: &str,
        new_qty: i64,
        performed_by: Option<String>,
        notes: Option<String>,
    ) -> StockResult<InventoryLine> {
        validate_absolute_quantity(new_qty)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let line = fetch_line_tx(&mut tx, line_id)
            .await?
            .ok_or_else(|| DbError::not_found("InventoryLine", line_id))?;

        let delta = new_qty - line.quantity_in_stock;
        if delta == 0 {
            // Nothing to record; an empty Adjustment row would be noise.
            return Ok(line);
        }

        if delta < 0 {
            let batches = batch::list_active_tx(&mut tx, line_id).await?;
            let plan = fifo::plan_consumption(line_id, &batches, -delta)?;
            for draw in &plan.draws {
                batch::apply_draw_tx(&mut tx, &draw.batch_id, draw.remaining_after).await?;
            }
        } else {
            let generated = NewBatch {
                batch_number: generate_batch_number("ADJ"),
                expiry: BatchExpiry::NonExpiring,
                manufacturing_date: None,
                cost_per_unit_cents: 0,
            };
            batch::insert_tx(&mut tx, line_id, &generated, delta, now).await?;
        }

        commit_line_quantity(&mut tx, &line, new_qty, now).await?;

        ledger::insert_tx(
            &mut tx,
            &LedgerEntry {
                id: Uuid::new_v4().to_string(),
                line_id: line_id.to_string(),
                batch_id: None,
                entry_type: LedgerEntryType::Adjustment,
                quantity_changed: delta,
                stock_before: line.quantity_in_stock,
                stock_after: new_qty,
                performed_by,
                prescription_id: None,
                reference_number: None,
                notes,
                transaction_date: now,
            },
        )
        .await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(line_id, new_qty, delta, "Stock set to absolute value");

        let updated = updated_line(line, new_qty, now);
        self.signal_low_stock(&updated);
        Ok(updated)
    }

    /// Deactivates every active batch dated strictly before `today`,
    /// removing its remaining units from the owning line.
    ///
    /// ## Contract
    /// - One `ExpiryRemoval` ledger entry per purged batch
    /// - Idempotent: a second run with no new expirations is a no-op
    /// - Per-line atomicity with the same `row_version` check as
    ///   `decrease`, so the sweep cannot race a dispense on the same line
    ///
    /// Invoked by an external scheduler; the engine never self-schedules.
    pub async fn expire_batches(&self, today: NaiveDate) -> StockResult<ExpirySweep> {
        let line_ids = {
            let repo = crate::repository::batch::BatchRepository::new(self.pool.clone());
            repo.expired_line_ids(today).await?
        };

        let mut sweep = ExpirySweep::default();

        for line_id in line_ids {
            let now = Utc::now();
            let mut tx = self.pool.begin().await.map_err(DbError::from)?;

            let Some(line) = fetch_line_tx(&mut tx, &line_id).await? else {
                continue;
            };

            let batches = batch::list_active_tx(&mut tx, &line_id).await?;
            let expired: Vec<_> = batches
                .iter()
                .filter(|b| b.expiry.is_expired(today))
                .collect();

            if expired.is_empty() {
                continue;
            }

            let mut running = line.quantity_in_stock;
            for batch_row in &expired {
                batch::apply_draw_tx(&mut tx, &batch_row.id, 0).await?;

                ledger::insert_tx(
                    &mut tx,
                    &LedgerEntry {
                        id: Uuid::new_v4().to_string(),
                        line_id: line_id.clone(),
                        batch_id: Some(batch_row.id.clone()),
                        entry_type: LedgerEntryType::ExpiryRemoval,
                        quantity_changed: -batch_row.quantity,
                        stock_before: running,
                        stock_after: running - batch_row.quantity,
                        performed_by: None,
                        prescription_id: None,
                        reference_number: Some(batch_row.batch_number.clone()),
                        notes: None,
                        transaction_date: now,
                    },
                )
                .await?;

                running -= batch_row.quantity;
                sweep.batches_expired += 1;
                sweep.units_removed += batch_row.quantity;
            }

            commit_line_quantity(&mut tx, &line, running, now).await?;
            tx.commit().await.map_err(DbError::from)?;

            sweep.lines_touched += 1;

            info!(
                line_id = %line_id,
                expired = expired.len(),
                new_qty = running,
                "Expired batches purged"
            );

            self.signal_low_stock(&updated_line(line, running, now));
        }

        Ok(sweep)
    }

    /// Fire-and-forget low-stock signal after a stock-lowering operation.
    ///
    /// The engine only derives the condition; delivery belongs to the
    /// external notifier, which consumes `low_stock_lines` or the value
    /// returned by `alerts::evaluate`.
    fn signal_low_stock(&self, line: &InventoryLine) {
        if alerts::is_low_stock(line) {
            warn!(
                line_id = %line.id,
                pharmacy_id = %line.pharmacy_id,
                medication_id = %line.medication_id,
                quantity = line.quantity_in_stock,
                minimum = line.minimum_stock_level,
                reorder_suggestion = alerts::reorder_suggestion(line),
                "Line at or below minimum stock level"
            );
        }
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Fetches a line inside an open transaction.
async fn fetch_line_tx(
    conn: &mut SqliteConnection,
    line_id: &str,
) -> DbResult<Option<InventoryLine>> {
    let line = sqlx::query_as::<_, InventoryLine>(&format!(
        "SELECT {LINE_COLUMNS} FROM inventory_lines WHERE id = ?1"
    ))
    .bind(line_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(line)
}

/// Writes the line's new quantity with the optimistic version check.
///
/// Zero rows affected means another writer committed since our read:
/// the caller's transaction must roll back and the whole operation is
/// reported as a ConcurrencyConflict.
async fn commit_line_quantity(
    conn: &mut SqliteConnection,
    line: &InventoryLine,
    new_qty: i64,
    now: chrono::DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE inventory_lines
        SET quantity_in_stock = ?2,
            updated_at = ?3,
            row_version = row_version + 1
        WHERE id = ?1 AND row_version = ?4
        "#,
    )
    .bind(&line.id)
    .bind(new_qty)
    .bind(now)
    .bind(line.row_version)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::concurrency("InventoryLine", &line.id));
    }

    Ok(())
}

/// The post-commit view of a mutated line.
fn updated_line(mut line: InventoryLine, new_qty: i64, now: chrono::DateTime<Utc>) -> InventoryLine {
    line.quantity_in_stock = new_qty;
    line.updated_at = now;
    line.row_version += 1;
    line
}

/// Generates a lot number for engine-created batches (unbatched restocks,
/// upward adjustments).
fn generate_batch_number(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, &suffix[..8].to_uppercase())
}

// =============================================================================
// Unit Tests
// =============================================================================
