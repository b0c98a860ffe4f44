//! # rxstock-core: Pure Inventory Logic for RxStock
//!
//! This crate is the **heart** of the RxStock pharmacy inventory engine.
//! It contains all domain logic as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        RxStock Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Callers (HTTP API, scheduler, notifier)            │   │
//! │  │                      (outside this workspace)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    rxstock-db (Database Layer)                  │   │
//! │  │     StockMutator · Repositories · FulfillmentChecker · Search   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ rxstock-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌────────────┐  │   │
//! │  │   │   types   │  │   fifo    │  │  alerts   │  │  ranking   │  │   │
//! │  │   │ Line/Batch│  │ plan_     │  │ low stock │  │ haversine  │  │   │
//! │  │   │  Ledger   │  │consumption│  │ expiry    │  │ composite  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (InventoryLine, Batch, LedgerEntry, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Input contract validation
//! - [`fifo`] - First-expired-first-out consumption planning
//! - [`alerts`] - Low-stock and expiring-batch evaluation
//! - [`fulfillment`] - Per-pharmacy stock-match scoring
//! - [`ranking`] - Composite search ranking (stock match + proximity)
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - callers pass
//!    `today`/`now` instead of the crate reading a clock
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use rxstock_core::fulfillment::{evaluate, MedicationRequest};
//! use std::collections::BTreeMap;
//!
//! let requests = vec![
//!     MedicationRequest::new("med-amoxicillin"),
//!     MedicationRequest::new("med-ibuprofen"),
//! ];
//! let mut availability = BTreeMap::new();
//! availability.insert("med-amoxicillin".to_string(), 12_i64);
//!
//! let result = evaluate("pharmacy-1", &requests, &availability).unwrap();
//! assert_eq!(result.stock_match_percentage, 50);
//! assert!(!result.can_fulfill_completely);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod alerts;
pub mod error;
pub mod fifo;
pub mod fulfillment;
pub mod money;
pub mod ranking;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use rxstock_core::Money` instead of
// `use rxstock_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default currency code for inventory line prices.
///
/// Single-currency deployments are the v0.1 norm; the per-line `currency`
/// column already exists for mixed-currency tenants later.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Maximum quantity accepted by a single mutation
///
/// ## Business Reason
/// Catches fat-fingered restocks and dispenses (1000000 instead of 1000).
/// Can be made configurable per-tenant in future versions.
pub const MAX_MUTATION_QUANTITY: i64 = 1_000_000;

/// Maximum length of a manufacturer batch/lot number.
pub const MAX_BATCH_NUMBER_LEN: usize = 50;
