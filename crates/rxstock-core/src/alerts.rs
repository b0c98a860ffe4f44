//! # Alert Evaluation
//!
//! Pure derivation of low-stock and expiring-batch conditions.
//!
//! No side effects and no clock access: callers pass `today`, so the same
//! inputs always produce the same alerts. The external notifier consumes
//! the returned values; this module never sends anything.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{Batch, InventoryLine};

// =============================================================================
// Alert Types
// =============================================================================

/// A batch approaching its expiration date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiringBatch {
    pub batch_id: String,
    pub batch_number: String,
    pub expiration_date: NaiveDate,
    pub quantity: i64,
    /// Days between `today` and the expiration date (0 = expires today,
    /// negative = already past date but not yet swept).
    pub days_until_expiry: i64,
}

/// The full alert picture for one line, as consulted by the mutator after
/// stock-lowering operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAlerts {
    pub line_id: String,
    pub low_stock: bool,
    /// Units to reorder to reach the configured reorder level; 0 when the
    /// line is not low-stock.
    pub reorder_suggestion: i64,
    pub expiring: Vec<ExpiringBatch>,
}

// =============================================================================
// Evaluation
// =============================================================================

/// A line is low-stock at or below its configured minimum.
#[inline]
pub fn is_low_stock(line: &InventoryLine) -> bool {
    line.quantity_in_stock <= line.minimum_stock_level
}

/// Suggested reorder amount: the gap up to `reorder_quantity` when the line
/// is low-stock, else 0.
pub fn reorder_suggestion(line: &InventoryLine) -> i64 {
    if is_low_stock(line) {
        (line.reorder_quantity - line.quantity_in_stock).max(0)
    } else {
        0
    }
}

/// Active batches expiring within `days_threshold` of `today` (inclusive).
///
/// Non-expiring batches never qualify.
pub fn expiring_batches(batches: &[Batch], today: NaiveDate, days_threshold: u64) -> Vec<ExpiringBatch> {
    batches
        .iter()
        .filter(|b| b.is_active && b.quantity > 0)
        .filter(|b| b.expiry.expires_within(today, days_threshold))
        .filter_map(|b| {
            let expiration_date = b.expiry.date()?;
            Some(ExpiringBatch {
                batch_id: b.id.clone(),
                batch_number: b.batch_number.clone(),
                expiration_date,
                quantity: b.quantity,
                days_until_expiry: (expiration_date - today).num_days(),
            })
        })
        .collect()
}

/// Bundles all alert conditions for one line.
pub fn evaluate(
    line: &InventoryLine,
    batches: &[Batch],
    today: NaiveDate,
    days_threshold: u64,
) -> StockAlerts {
    StockAlerts {
        line_id: line.id.clone(),
        low_stock: is_low_stock(line),
        reorder_suggestion: reorder_suggestion(line),
        expiring: expiring_batches(batches, today, days_threshold),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
