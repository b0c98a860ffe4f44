//! # rxstock-db: Database Layer for RxStock
//!
//! This crate provides persistence for the RxStock pharmacy inventory
//! engine. It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        RxStock Data Flow                                │
//! │                                                                         │
//! │  Caller (HTTP layer / scheduler, outside this workspace)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     rxstock-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌───────────────┐   │   │
//! │  │   │   Database    │   │  StockMutator  │   │  Migrations   │   │   │
//! │  │   │   (pool.rs)   │   │  (mutator.rs)  │   │  (embedded)   │   │   │
//! │  │   └───────────────┘   └────────────────┘   └───────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────────────────┐   ┌───────────────────────┐    │   │
//! │  │   │       Repositories        │   │  Fulfillment/Search   │    │   │
//! │  │   │ lines · batches · ledger  │   │     (search.rs)       │    │   │
//! │  │   └───────────────────────────┘   └───────────────────────┘    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (WAL mode, foreign keys on)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and mutation error types
//! - [`repository`] - Read-side repositories (lines, batches, ledger)
//! - [`mutator`] - The StockMutator: the only write path for quantities
//! - [`search`] - Fulfillment checks and composite pharmacy ranking
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rxstock_db::{Database, DbConfig};
//! use rxstock_db::mutator::{DispenseRequest, RestockRequest};
//!
//! let db = Database::new(DbConfig::new("path/to/rxstock.db")).await?;
//!
//! // Receive stock
//! let line = db.mutator().increase(&line_id, 100, RestockRequest {
//!     batch: Some(new_batch),
//!     ..Default::default()
//! }).await?;
//!
//! // Dispense against a prescription
//! let line = db.mutator().decrease(&line_id, 2, DispenseRequest {
//!     prescription_id: Some(rx_id),
//!     ..Default::default()
//! }).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod mutator;
pub mod pool;
pub mod repository;
pub mod search;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, StockError, StockResult};
pub use pool::{Database, DbConfig};

// Repository and service re-exports for convenience
pub use mutator::StockMutator;
pub use repository::batch::BatchRepository;
pub use repository::inventory::InventoryLineRepository;
pub use repository::ledger::LedgerRepository;
pub use search::{FulfillmentChecker, SearchService};
