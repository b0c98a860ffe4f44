//! # Validation Module
//!
//! Input validation utilities for the RxStock engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (HTTP layer, excluded from this workspace)             │
//! │  ├── Authorization, request shape                                       │
//! │  └── Immediate user feedback                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (runs before any I/O)                             │
//! │  ├── Quantity sign and range checks                                     │
//! │  └── Batch metadata and request-list contracts                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── NOT NULL and CHECK constraints                                     │
//! │  ├── UNIQUE (line_id, batch_number)                                     │
//! │  └── Foreign key constraints                                            │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::NewBatch;
use crate::{MAX_BATCH_NUMBER_LEN, MAX_MUTATION_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a mutation quantity (increase/decrease amount).
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_MUTATION_QUANTITY
///
/// A zero or negative delta is always a caller bug, and the upper bound
/// catches fat-fingered restocks (1000000 instead of 1000).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_MUTATION_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_MUTATION_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an absolute stock level (`set_absolute` target).
///
/// ## Rules
/// - Must be non-negative (zero empties the line)
/// - Must not exceed MAX_MUTATION_QUANTITY
pub fn validate_absolute_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_MUTATION_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_MUTATION_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price or unit cost in cents.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (samples, donations)
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates a search radius in kilometers.
///
/// ## Rules
/// - Must be finite and positive
pub fn validate_radius_km(radius: f64) -> ValidationResult<()> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "max_radius_km".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a manufacturer batch/lot number.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most MAX_BATCH_NUMBER_LEN characters
/// - Should contain only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use rxstock_core::validation::validate_batch_number;
///
/// assert!(validate_batch_number("AMX-2026-0142").is_ok());
/// assert!(validate_batch_number("").is_err());
/// ```
pub fn validate_batch_number(batch_number: &str) -> ValidationResult<()> {
    let batch_number = batch_number.trim();

    if batch_number.is_empty() {
        return Err(ValidationError::Required {
            field: "batch_number".to_string(),
        });
    }

    if batch_number.len() > MAX_BATCH_NUMBER_LEN {
        return Err(ValidationError::TooLong {
            field: "batch_number".to_string(),
            max: MAX_BATCH_NUMBER_LEN,
        });
    }

    if !batch_number
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "batch_number".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates new-batch metadata supplied on a restock.
pub fn validate_new_batch(batch: &NewBatch) -> ValidationResult<()> {
    validate_batch_number(&batch.batch_number)?;
    validate_price_cents(batch.cost_per_unit_cents)?;
    Ok(())
}

/// Validates the medication id list of a fulfillment request.
///
/// ## Rules
/// - Must contain at least one id (empty requests are rejected before any
///   lookup runs - the result would be undefined)
/// - Each id must be non-empty
pub fn validate_medication_ids(medication_ids: &[String]) -> ValidationResult<()> {
    if medication_ids.is_empty() {
        return Err(ValidationError::Empty {
            field: "medication_ids".to_string(),
        });
    }

    if medication_ids.iter().any(|id| id.trim().is_empty()) {
        return Err(ValidationError::Required {
            field: "medication_id".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
