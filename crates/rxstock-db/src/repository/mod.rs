//! # Repository Module
//!
//! Database repository implementations for the RxStock engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  Repositories abstract database access behind a clean API. Every        │
//! │  cross-entity read is an explicit query; there is no lazy-loaded        │
//! │  entity graph, so transaction boundaries stay visible.                  │
//! │                                                                         │
//! │  Caller                                                                 │
//! │       │  db.batches().list_active(line_id)                              │
//! │       ▼                                                                 │
//! │  BatchRepository                                                        │
//! │  ├── list_active(&self, line_id)      FIFO-ordered                      │
//! │  ├── get_by_id(&self, id)                                               │
//! │  └── stock_value(&self, line_id)                                        │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! │  Writes that touch stock quantities do NOT live here: they belong to    │
//! │  the StockMutator, which owns the transaction and the ledger append.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`inventory::InventoryLineRepository`] - Line lifecycle and low-stock reads
//! - [`batch::BatchRepository`] - Batch reads (FIFO listing, valuation)
//! - [`ledger::LedgerRepository`] - Append-only ledger reads and audit helpers

pub mod batch;
pub mod inventory;
pub mod ledger;
