//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError (this module) ← Adds context and categorization                │
//! │       │                                                                 │
//! │       ├── merged with CoreError into StockError at the mutator API      │
//! │       ▼                                                                 │
//! │  Caller (HTTP layer) translates kinds to transport status codes         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Kind Mapping (for transport layers)
//! - `InvalidArgument`     → `StockError::Domain(CoreError::Validation(_))`
//! - `InsufficientStock`   → `StockError::Domain(CoreError::InsufficientStock)`
//! - `Conflict`            → `StockError::Db(DbError::UniqueViolation)`
//! - `NotFound`            → `StockError::Db(DbError::NotFound)`
//! - `ConcurrencyConflict` → `StockError::Db(DbError::ConcurrencyConflict)`

use thiserror::Error;

use rxstock_core::{CoreError, ValidationError};

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and caller feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Receiving a duplicate batch number on the same line
    /// - Creating a second line for the same (pharmacy, medication)
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Optimistic-concurrency check failed: the row changed between read
    /// and write. The whole operation rolled back; callers should retry
    /// with fresh state.
    #[error("Concurrent modification of {entity} {id}, retry with fresh state")]
    ConcurrencyConflict { entity: String, id: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a ConcurrencyConflict error.
    pub fn concurrency(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::ConcurrencyConflict {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// "database is locked"        → DbError::ConcurrencyConflict (writer raced
///                               another writer's snapshot; safe to retry)
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite error messages for constraints:
                // UNIQUE constraint: "UNIQUE constraint failed: <table>.<column>"
                // FK constraint: "FOREIGN KEY constraint failed"
                // Busy writer: "database is locked"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked") {
                    DbError::ConcurrencyConflict {
                        entity: "transaction".to_string(),
                        id: "write-lock".to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Stock Error (mutation API surface)
// =============================================================================

/// The error type of the StockMutator and read-path services.
///
/// Merges domain-rule violations (rxstock-core) with persistence failures
/// so callers match on a single enum.
#[derive(Debug, Error)]
pub enum StockError {
    /// Domain rule violation (insufficient stock, invalid input).
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Persistence failure (not found, conflict, concurrency, infra).
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<ValidationError> for StockError {
    fn from(err: ValidationError) -> Self {
        StockError::Domain(CoreError::Validation(err))
    }
}

impl StockError {
    /// Whether the operation is worth retrying with fresh state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StockError::Db(DbError::ConcurrencyConflict { .. }))
    }
}

/// Result type for mutation and search operations.
pub type StockResult<T> = Result<T, StockError>;

// =============================================================================
// Unit Tests
// =============================================================================
