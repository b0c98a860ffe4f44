//! # FIFO Consumption Planner
//!
//! Pure planning of batch consumption in first-expired-first-out order.
//!
//! ## Consumption Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      FIFO Across Batches                                │
//! │                                                                         │
//! │  Line: Amoxicillin 500mg, quantity_in_stock = 25                        │
//! │                                                                         │
//! │  Batch A  expires 2026-03-05  qty 10  ◄── drained first                 │
//! │  Batch B  expires 2026-03-10  qty 10  ◄── then this one                 │
//! │  Batch C  never expires       qty  5  ◄── undated batches go last       │
//! │                                                                         │
//! │  decrease(15)                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  plan_consumption(batches, 15)                                          │
//! │       │                                                                 │
//! │       ├── Batch A: draw 10 → exhausted (deactivate)                     │
//! │       └── Batch B: draw  5 → 5 remaining                                │
//! │                                                                         │
//! │  Ties on expiration date break by received_at ascending.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The planner is pure: it never touches the database. The StockMutator in
//! rxstock-db executes the returned plan inside its transaction, so the
//! ordering rule is unit-testable without any I/O.

use crate::error::{CoreError, CoreResult};
use crate::types::Batch;

// =============================================================================
// Plan Types
// =============================================================================

/// One batch's share of a planned consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDraw {
    /// The batch to draw from.
    pub batch_id: String,

    /// Manufacturer lot number (carried for ledger references and logs).
    pub batch_number: String,

    /// Units to remove from this batch.
    pub drawn: i64,

    /// Units left in the batch after the draw. Zero means the batch is
    /// exhausted and must be deactivated.
    pub remaining_after: i64,
}

impl BatchDraw {
    /// Whether this draw empties the batch.
    #[inline]
    pub fn exhausts_batch(&self) -> bool {
        self.remaining_after == 0
    }
}

/// A complete consumption plan for one decrease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumptionPlan {
    /// Per-batch draws in FIFO order.
    pub draws: Vec<BatchDraw>,

    /// Total units drawn; always equals the requested quantity.
    pub total_drawn: i64,
}

// =============================================================================
// Planning
// =============================================================================

/// Sorts batches into FIFO consumption order, in place.
///
/// Order: dated batches by expiration ascending, then undated batches;
/// ties broken by `received_at` ascending. `BatchExpiry`'s derived `Ord`
/// carries the dated-before-undated rule.
pub fn sort_fifo(batches: &mut [Batch]) {
    batches.sort_by(|a, b| {
        a.expiry
            .cmp(&b.expiry)
            .then_with(|| a.received_at.cmp(&b.received_at))
    });
}

/// Plans a FIFO consumption of `requested` units across active batches.
///
/// ## Arguments
/// * `line_id` - The owning line (for error context only)
/// * `batches` - The line's batches; inactive and empty ones are ignored
/// * `requested` - Units to consume; must be positive (validated upstream)
///
/// ## Returns
/// * `Ok(ConsumptionPlan)` - Draws covering exactly `requested` units
/// * `Err(CoreError::InsufficientStock)` - Active batches hold fewer than
///   `requested` units; nothing is consumed
pub fn plan_consumption(
    line_id: &str,
    batches: &[Batch],
    requested: i64,
) -> CoreResult<ConsumptionPlan> {
    let mut active: Vec<&Batch> = batches
        .iter()
        .filter(|b| b.is_active && b.quantity > 0)
        .collect();

    let available: i64 = active.iter().map(|b| b.quantity).sum();
    if available < requested {
        return Err(CoreError::InsufficientStock {
            line_id: line_id.to_string(),
            available,
            requested,
        });
    }

    active.sort_by(|a, b| {
        a.expiry
            .cmp(&b.expiry)
            .then_with(|| a.received_at.cmp(&b.received_at))
    });

    let mut draws = Vec::new();
    let mut outstanding = requested;

    for batch in active {
        if outstanding == 0 {
            break;
        }

        let drawn = outstanding.min(batch.quantity);
        draws.push(BatchDraw {
            batch_id: batch.id.clone(),
            batch_number: batch.batch_number.clone(),
            drawn,
            remaining_after: batch.quantity - drawn,
        });
        outstanding -= drawn;
    }

    Ok(ConsumptionPlan {
        draws,
        total_drawn: requested,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
