//! # Batch Repository
//!
//! Read-side operations for batches (lots): FIFO listing, lookups,
//! valuation, and the expiry-sweep scan.
//!
//! ## FIFO Listing Order
//! ```text
//! ORDER BY expiration_date IS NULL,  -- dated batches first
//!          expiration_date,          -- soonest expiry first
//!          received_at               -- tie-break: oldest receipt first
//! ```
//!
//! Writes (insert, consume, deactivate) happen inside StockMutator
//! transactions; the crate-internal helpers at the bottom serve that path.

use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::DbResult;
use rxstock_core::{Batch, BatchExpiry, Money, NewBatch};

/// Column list shared by every batch SELECT, in `BatchRow` field order.
const BATCH_COLUMNS: &str = "id, line_id, batch_number, quantity, original_quantity, \
     expiration_date, manufacturing_date, cost_per_unit_cents, \
     is_active, received_at, created_at";

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw batch row; `expiration_date` is nullable in storage and becomes the
/// explicit [`BatchExpiry`] variant on the domain type.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BatchRow {
    id: String,
    line_id: String,
    batch_number: String,
    quantity: i64,
    original_quantity: i64,
    expiration_date: Option<NaiveDate>,
    manufacturing_date: Option<NaiveDate>,
    cost_per_unit_cents: i64,
    is_active: bool,
    received_at: chrono::DateTime<Utc>,
    created_at: chrono::DateTime<Utc>,
}

impl From<BatchRow> for Batch {
    fn from(row: BatchRow) -> Self {
        Batch {
            id: row.id,
            line_id: row.line_id,
            batch_number: row.batch_number,
            quantity: row.quantity,
            original_quantity: row.original_quantity,
            expiry: BatchExpiry::from_date(row.expiration_date),
            manufacturing_date: row.manufacturing_date,
            cost_per_unit_cents: row.cost_per_unit_cents,
            is_active: row.is_active,
            received_at: row.received_at,
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for batch database operations.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    /// Creates a new BatchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    /// Gets a batch by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Batch>> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Batch::from))
    }

    /// Gets a batch by its manufacturer lot number within a line.
    pub async fn get_by_number(
        &self,
        line_id: &str,
        batch_number: &str,
    ) -> DbResult<Option<Batch>> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches \
             WHERE line_id = ?1 AND batch_number = ?2"
        ))
        .bind(line_id)
        .bind(batch_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Batch::from))
    }

    /// Lists a line's active batches in FIFO consumption order.
    pub async fn list_active(&self, line_id: &str) -> DbResult<Vec<Batch>> {
        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches \
             WHERE line_id = ?1 AND is_active = 1 \
             ORDER BY expiration_date IS NULL, expiration_date, received_at"
        ))
        .bind(line_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Batch::from).collect())
    }

    /// Lists all of a line's batches, newest receipt first (audit view).
    pub async fn list_all(&self, line_id: &str) -> DbResult<Vec<Batch>> {
        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {BATCH_COLUMNS} FROM batches \
             WHERE line_id = ?1 \
             ORDER BY received_at DESC"
        ))
        .bind(line_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Batch::from).collect())
    }

    /// Lines holding at least one active batch dated strictly before
    /// `today`. Input to the expiry sweep.
    pub async fn expired_line_ids(&self, today: NaiveDate) -> DbResult<Vec<String>> {
        let ids: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT line_id FROM batches
            WHERE is_active = 1
              AND expiration_date IS NOT NULL
              AND expiration_date < ?1
            ORDER BY line_id
            "#,
        )
        .bind(today)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    /// Acquisition value of a line's remaining stock:
    /// `sum(quantity × cost_per_unit)` across active batches.
    pub async fn stock_value(&self, line_id: &str) -> DbResult<Money> {
        let cents: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(quantity * cost_per_unit_cents) FROM batches
            WHERE line_id = ?1 AND is_active = 1
            "#,
        )
        .bind(line_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Money::from_cents(cents.unwrap_or(0)))
    }
}

// =============================================================================
// Crate-Internal Helpers (StockMutator transaction path)
// =============================================================================

/// Lists a line's active batches inside an open transaction.
pub(crate) async fn list_active_tx(
    conn: &mut SqliteConnection,
    line_id: &str,
) -> DbResult<Vec<Batch>> {
    let rows = sqlx::query_as::<_, BatchRow>(&format!(
        "SELECT {BATCH_COLUMNS} FROM batches \
         WHERE line_id = ?1 AND is_active = 1 \
         ORDER BY expiration_date IS NULL, expiration_date, received_at"
    ))
    .bind(line_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(Batch::from).collect())
}

/// Fetches a batch by lot number inside an open transaction.
pub(crate) async fn get_by_number_tx(
    conn: &mut SqliteConnection,
    line_id: &str,
    batch_number: &str,
) -> DbResult<Option<Batch>> {
    let row = sqlx::query_as::<_, BatchRow>(&format!(
        "SELECT {BATCH_COLUMNS} FROM batches \
         WHERE line_id = ?1 AND batch_number = ?2"
    ))
    .bind(line_id)
    .bind(batch_number)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Batch::from))
}

/// Inserts a new batch row inside an open transaction and returns it.
///
/// A UNIQUE violation on (line_id, batch_number) surfaces as
/// `DbError::UniqueViolation` through the standard sqlx mapping.
pub(crate) async fn insert_tx(
    conn: &mut SqliteConnection,
    line_id: &str,
    new: &NewBatch,
    quantity: i64,
    received_at: chrono::DateTime<Utc>,
) -> DbResult<Batch> {
    let batch = Batch {
        id: Uuid::new_v4().to_string(),
        line_id: line_id.to_string(),
        batch_number: new.batch_number.clone(),
        quantity,
        original_quantity: quantity,
        expiry: new.expiry,
        manufacturing_date: new.manufacturing_date,
        cost_per_unit_cents: new.cost_per_unit_cents,
        is_active: true,
        received_at,
        created_at: received_at,
    };

    sqlx::query(
        r#"
        INSERT INTO batches (
            id, line_id, batch_number, quantity, original_quantity,
            expiration_date, manufacturing_date, cost_per_unit_cents,
            is_active, received_at, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&batch.id)
    .bind(&batch.line_id)
    .bind(&batch.batch_number)
    .bind(batch.quantity)
    .bind(batch.original_quantity)
    .bind(batch.expiry.date())
    .bind(batch.manufacturing_date)
    .bind(batch.cost_per_unit_cents)
    .bind(batch.is_active)
    .bind(batch.received_at)
    .bind(batch.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(batch)
}

/// Adds units to an existing active batch inside an open transaction.
pub(crate) async fn augment_tx(
    conn: &mut SqliteConnection,
    batch_id: &str,
    quantity: i64,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE batches
        SET quantity = quantity + ?2,
            original_quantity = original_quantity + ?2
        WHERE id = ?1 AND is_active = 1
        "#,
    )
    .bind(batch_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Writes a batch's post-draw quantity inside an open transaction,
/// deactivating it when exhausted.
pub(crate) async fn apply_draw_tx(
    conn: &mut SqliteConnection,
    batch_id: &str,
    remaining_after: i64,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE batches
        SET quantity = ?2,
            is_active = CASE WHEN ?2 > 0 THEN 1 ELSE 0 END
        WHERE id = ?1
        "#,
    )
    .bind(batch_id)
    .bind(remaining_after)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
