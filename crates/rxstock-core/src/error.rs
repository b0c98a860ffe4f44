//! # Error Types
//!
//! Domain-specific error types for rxstock-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  rxstock-core errors (this file)                                        │
//! │  ├── CoreError        - Domain rule violations                          │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  rxstock-db errors (separate crate)                                     │
//! │  ├── DbError          - Database operation failures                     │
//! │  └── StockError       - CoreError | DbError at the mutation surface     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → StockError → HTTP status (caller)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (line id, quantities, etc.)
//! 3. Errors are enum variants, never String
//! 4. Read paths never error on "no results" - empty is a valid outcome

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core inventory errors.
///
/// These errors represent violations of the engine's domain rules.
/// The HTTP layer translates them to transport status codes.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A decrease requested more units than the line's active batches hold.
    ///
    /// ## When This Occurs
    /// - Dispensing a prescription against a nearly-empty line
    /// - Two dispensers racing for the last units (the loser lands here
    ///   after its retry re-reads the committed stock)
    ///
    /// ## Guarantee
    /// When this is returned, no partial batch consumption was committed.
    #[error("Insufficient stock on line {line_id}: available {available}, requested {requested}")]
    InsufficientStock {
        line_id: String,
        available: i64,
        requested: i64,
    },

    /// Validation error (wraps ValidationError).
    ///
    /// Covers every `InvalidArgument` case: non-positive quantities, empty
    /// medication lists, malformed batch data.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet the contracts in
/// [`crate::validation`]. Used for early validation before any I/O runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., bad batch number characters).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A collection that must not be empty was empty.
    #[error("{field} must contain at least one element")]
    Empty { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            line_id: "line-1".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock on line line-1: available 3, requested 5"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");

        let err = ValidationError::Empty {
            field: "medication_ids".to_string(),
        };
        assert_eq!(err.to_string(), "medication_ids must contain at least one element");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "batch_number".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
