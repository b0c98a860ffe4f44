//! # Ledger Repository
//!
//! Read side of the append-only stock movement ledger.
//!
//! ## Append-Only Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Ledger Write Path                                    │
//! │                                                                         │
//! │  StockMutator transaction                                               │
//! │       │                                                                 │
//! │       ├── 1. UPDATE batches ...                                         │
//! │       ├── 2. UPDATE inventory_lines ... (row_version checked)           │
//! │       └── 3. INSERT INTO ledger_entries ...   ◄── same transaction      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← a failed append rolls back the whole mutation                 │
//! │                                                                         │
//! │  No UPDATE or DELETE statement against ledger_entries exists            │
//! │  anywhere in this workspace.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;

use crate::error::DbResult;
use rxstock_core::LedgerEntry;

/// Column list shared by every ledger SELECT, in `LedgerEntry` field order.
const LEDGER_COLUMNS: &str = "id, line_id, batch_id, entry_type, quantity_changed, \
     stock_before, stock_after, performed_by, prescription_id, \
     reference_number, notes, transaction_date";

/// Repository for ledger reads and audit helpers.
///
/// Appends happen exclusively inside StockMutator transactions via the
/// crate-internal [`insert_tx`].
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Lists a line's movements in transaction order (oldest first).
    ///
    /// ## Arguments
    /// * `line_id` - The line to audit
    /// * `limit` / `offset` - Pagination window
    ///
    /// Ties on `transaction_date` (entries written by one mutation) keep
    /// insertion order via the rowid tiebreak.
    pub async fn list_for_line(
        &self,
        line_id: &str,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
            "SELECT {LEDGER_COLUMNS} FROM ledger_entries \
             WHERE line_id = ?1 \
             ORDER BY transaction_date, rowid \
             LIMIT ?2 OFFSET ?3"
        ))
        .bind(line_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Counts a line's ledger entries.
    pub async fn count_for_line(&self, line_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM ledger_entries WHERE line_id = ?1")
                .bind(line_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Replays a line's ledger: the sum of all `quantity_changed` values.
    ///
    /// For a consistent ledger this reproduces the line's current
    /// `quantity_in_stock` exactly.
    pub async fn reconstruct_quantity(&self, line_id: &str) -> DbResult<i64> {
        let sum: Option<i64> = sqlx::query_scalar(
            "SELECT SUM(quantity_changed) FROM ledger_entries WHERE line_id = ?1",
        )
        .bind(line_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum.unwrap_or(0))
    }

    /// Verifies the per-entry chain for a line:
    /// `stock_after[i] == stock_before[i] + quantity_changed[i]` and
    /// `stock_after[i] == stock_before[i+1]` in transaction order.
    pub async fn chain_is_consistent(&self, line_id: &str) -> DbResult<bool> {
        let entries = sqlx::query_as::<_, LedgerEntry>(&format!(
            "SELECT {LEDGER_COLUMNS} FROM ledger_entries \
             WHERE line_id = ?1 \
             ORDER BY transaction_date, rowid"
        ))
        .bind(line_id)
        .fetch_all(&self.pool)
        .await?;

        let mut previous_after: Option<i64> = None;
        for entry in &entries {
            if entry.stock_after != entry.stock_before + entry.quantity_changed {
                return Ok(false);
            }
            if let Some(after) = previous_after {
                if entry.stock_before != after {
                    return Ok(false);
                }
            }
            previous_after = Some(entry.stock_after);
        }

        Ok(true)
    }
}

// =============================================================================
// Crate-Internal Helpers (StockMutator transaction path)
// =============================================================================

/// Appends one ledger entry inside an open transaction.
///
/// The entry is written exactly as given; callers are responsible for the
/// before/after chaining. If this insert fails the surrounding transaction
/// rolls back, so a mutation is never committed without its audit record.
pub(crate) async fn insert_tx(conn: &mut SqliteConnection, entry: &LedgerEntry) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO ledger_entries (
            id, line_id, batch_id, entry_type, quantity_changed,
            stock_before, stock_after, performed_by, prescription_id,
            reference_number, notes, transaction_date
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.line_id)
    .bind(&entry.batch_id)
    .bind(entry.entry_type)
    .bind(entry.quantity_changed)
    .bind(entry.stock_before)
    .bind(entry.stock_after)
    .bind(&entry.performed_by)
    .bind(&entry.prescription_id)
    .bind(&entry.reference_number)
    .bind(&entry.notes)
    .bind(entry.transaction_date)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
