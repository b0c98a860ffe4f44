//! # Domain Types
//!
//! Core domain types used throughout the RxStock engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  InventoryLine  │   │      Batch      │   │   LedgerEntry   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  pharmacy_id    │   │  line_id (FK)   │   │  line_id (FK)   │       │
//! │  │  medication_id  │   │  batch_number   │   │  entry_type     │       │
//! │  │  quantity       │   │  expiry variant │   │  before/after   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │   BatchExpiry   │   │ LedgerEntryType │                             │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  Expiring(date) │   │  Restock        │                             │
//! │  │  NonExpiring    │   │  Sale           │                             │
//! │  └─────────────────┘   │  Adjustment     │                             │
//! │                        │  ExpiryRemoval  │                             │
//! │                        └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants Carried by These Types
//! - `InventoryLine.quantity_in_stock` equals the sum of its active batch
//!   quantities at all times (enforced by the mutator in rxstock-db).
//! - `Batch.quantity <= Batch.original_quantity`; exhausted batches are
//!   deactivated, never deleted.
//! - `LedgerEntry` rows are append-only and chain:
//!   `stock_after == stock_before + quantity_changed`.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Batch Expiry
// =============================================================================

/// Whether and when a batch expires.
///
/// ## Why a Variant Instead of `Option<NaiveDate>`?
/// FIFO ordering treats "no expiration" as "consumed last". Encoding that
/// rule in the type (dated variants sort before `NonExpiring`, dates
/// ascending) keeps null-comparison bugs out of the consumption planner:
/// the derived `Ord` *is* the FIFO expiry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchExpiry {
    /// The batch expires at end of the given date.
    Expiring(NaiveDate),
    /// The batch never expires (sorted after all dated batches in FIFO).
    NonExpiring,
}

impl BatchExpiry {
    /// Builds the variant from a nullable stored date.
    #[inline]
    pub fn from_date(date: Option<NaiveDate>) -> Self {
        match date {
            Some(d) => BatchExpiry::Expiring(d),
            None => BatchExpiry::NonExpiring,
        }
    }

    /// Returns the expiration date, if any (for persistence).
    #[inline]
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            BatchExpiry::Expiring(d) => Some(*d),
            BatchExpiry::NonExpiring => None,
        }
    }

    /// Whether the batch is expired strictly before `today`.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        match self {
            BatchExpiry::Expiring(d) => *d < today,
            BatchExpiry::NonExpiring => false,
        }
    }

    /// Whether the batch expires within `days` of `today` (inclusive).
    ///
    /// `NonExpiring` never qualifies.
    pub fn expires_within(&self, today: NaiveDate, days: u64) -> bool {
        match self {
            BatchExpiry::Expiring(d) => {
                let threshold = today
                    .checked_add_days(Days::new(days))
                    .unwrap_or(NaiveDate::MAX);
                *d <= threshold
            }
            BatchExpiry::NonExpiring => false,
        }
    }
}

// =============================================================================
// Ledger Entry Type
// =============================================================================

/// The kind of stock movement a ledger entry records.
///
/// Closed set, consumed by pattern-matching only. Stored as snake_case TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryType {
    /// Stock received into a batch.
    Restock,
    /// Stock consumed by a dispense/sale (FIFO across batches).
    Sale,
    /// Administrative override via `set_absolute`.
    Adjustment,
    /// Stock purged by the expiry sweep.
    ExpiryRemoval,
}

// =============================================================================
// Inventory Line
// =============================================================================

/// The per-(pharmacy, medication) stock position.
///
/// Mutated only through the StockMutator in rxstock-db; never hard-deleted
/// while batches reference it (soft-remove via `is_active = false`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryLine {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Owning pharmacy (external entity, id only).
    pub pharmacy_id: String,

    /// Stocked medication (external entity, id only).
    pub medication_id: String,

    /// Current stock. Invariant: equals the sum of active batch quantities.
    pub quantity_in_stock: i64,

    /// At or below this level the line is considered low-stock.
    pub minimum_stock_level: i64,

    /// Target quantity the pharmacy reorders up to.
    pub reorder_quantity: i64,

    /// Sale price per unit in cents.
    pub price_cents: i64,

    /// ISO 4217 currency code for `price_cents`.
    pub currency: String,

    /// Soft-remove flag. Inactive lines are hidden from fulfillment.
    pub is_active: bool,

    /// When the line was created.
    pub created_at: DateTime<Utc>,

    /// When the line was last mutated.
    pub updated_at: DateTime<Utc>,

    /// Optimistic-concurrency counter; every quantity write checks and
    /// increments it.
    pub row_version: i64,
}

impl InventoryLine {
    /// Returns the sale price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Whether the line can currently serve a fulfillment request.
    ///
    /// Derived, not stored: an active line with stock on hand.
    #[inline]
    pub fn is_available(&self) -> bool {
        self.is_active && self.quantity_in_stock > 0
    }

    /// Sale value of the current stock (price × quantity).
    #[inline]
    pub fn stock_sale_value(&self) -> Money {
        self.price().multiply_quantity(self.quantity_in_stock)
    }
}

// =============================================================================
// Batch
// =============================================================================

/// A discrete lot of one medication received together.
///
/// Created on restock; `quantity` only decreases afterwards. Deactivated
/// (not deleted) when exhausted or purged as expired, preserving the audit
/// trail behind old ledger entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Owning inventory line.
    pub line_id: String,

    /// Manufacturer lot number; unique within the line.
    pub batch_number: String,

    /// Units remaining in this batch.
    pub quantity: i64,

    /// Units originally received. `quantity <= original_quantity`.
    pub original_quantity: i64,

    /// Expiry behavior; drives FIFO ordering.
    pub expiry: BatchExpiry,

    /// Manufacturing date, when the supplier provided one.
    pub manufacturing_date: Option<NaiveDate>,

    /// Acquisition cost per unit in cents.
    pub cost_per_unit_cents: i64,

    /// False once exhausted or purged as expired.
    pub is_active: bool,

    /// When the stock physically arrived; FIFO tie-breaker.
    pub received_at: DateTime<Utc>,

    /// When the row was created.
    pub created_at: DateTime<Utc>,
}

impl Batch {
    /// Returns the acquisition cost per unit as Money.
    #[inline]
    pub fn cost_per_unit(&self) -> Money {
        Money::from_cents(self.cost_per_unit_cents)
    }

    /// Acquisition value of the units remaining in this batch.
    #[inline]
    pub fn stock_value(&self) -> Money {
        self.cost_per_unit().multiply_quantity(self.quantity)
    }

    /// Whether every unit of this batch has been consumed.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.quantity == 0
    }
}

/// Input for receiving a new batch (restock path).
///
/// Validated by [`crate::validation::validate_new_batch`] before any I/O.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBatch {
    /// Manufacturer lot number; must be unique within the line.
    pub batch_number: String,

    /// Expiry behavior of the lot.
    pub expiry: BatchExpiry,

    /// Manufacturing date, if known.
    pub manufacturing_date: Option<NaiveDate>,

    /// Acquisition cost per unit in cents.
    pub cost_per_unit_cents: i64,
}

// =============================================================================
// Ledger Entry
// =============================================================================

/// One append-only stock movement record.
///
/// `stock_before` and `stock_after` are both recorded so each entry can be
/// reconciled on its own, and so replaying a line's entries in order
/// reconstructs the current quantity exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LedgerEntry {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// The inventory line this movement belongs to.
    pub line_id: String,

    /// The batch touched, when the movement is batch-scoped.
    pub batch_id: Option<String>,

    /// What kind of movement this is.
    pub entry_type: LedgerEntryType,

    /// Signed quantity delta (negative for consumption).
    pub quantity_changed: i64,

    /// Line stock immediately before this movement.
    pub stock_before: i64,

    /// Line stock immediately after this movement.
    pub stock_after: i64,

    /// User who performed the operation, when known.
    pub performed_by: Option<String>,

    /// Prescription that triggered a sale, when applicable.
    pub prescription_id: Option<String>,

    /// External reference (delivery note, order number, etc.).
    pub reference_number: Option<String>,

    /// Free-form operator notes (adjustments).
    pub notes: Option<String>,

    /// When the movement happened.
    pub transaction_date: DateTime<Utc>,
}

// =============================================================================
// Geography
// =============================================================================

/// A WGS-84 coordinate pair, already resolved by the external geocoder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a coordinate pair.
    #[inline]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint {
            latitude,
            longitude,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_expiry_ordering_is_fifo_key() {
        let early = BatchExpiry::Expiring(date(2026, 1, 5));
        let late = BatchExpiry::Expiring(date(2026, 1, 10));
        let never = BatchExpiry::NonExpiring;

        // Soonest-to-expire first, undated last.
        assert!(early < late);
        assert!(late < never);

        let mut keys = vec![never, late, early];
        keys.sort();
        assert_eq!(keys, vec![early, late, never]);
    }

    #[test]
    fn test_expiry_is_expired() {
        let expiry = BatchExpiry::Expiring(date(2026, 3, 1));
        assert!(!expiry.is_expired(date(2026, 3, 1))); // expires end of day
        assert!(expiry.is_expired(date(2026, 3, 2)));
        assert!(!BatchExpiry::NonExpiring.is_expired(date(2099, 1, 1)));
    }

    #[test]
    fn test_expiry_expires_within() {
        let expiry = BatchExpiry::Expiring(date(2026, 3, 10));
        assert!(expiry.expires_within(date(2026, 3, 1), 30));
        assert!(expiry.expires_within(date(2026, 3, 1), 9));
        assert!(!expiry.expires_within(date(2026, 3, 1), 8));
        assert!(!BatchExpiry::NonExpiring.expires_within(date(2026, 3, 1), 36500));
    }

    #[test]
    fn test_expiry_round_trip_with_stored_date() {
        assert_eq!(
            BatchExpiry::from_date(Some(date(2026, 6, 1))).date(),
            Some(date(2026, 6, 1))
        );
        assert_eq!(BatchExpiry::from_date(None).date(), None);
    }

    #[test]
    fn test_line_availability() {
        let mut line = InventoryLine {
            id: "l1".to_string(),
            pharmacy_id: "p1".to_string(),
            medication_id: "m1".to_string(),
            quantity_in_stock: 5,
            minimum_stock_level: 10,
            reorder_quantity: 50,
            price_cents: 1250,
            currency: "USD".to_string(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            row_version: 0,
        };

        assert!(line.is_available());
        assert_eq!(line.stock_sale_value().cents(), 6250);

        line.quantity_in_stock = 0;
        assert!(!line.is_available());

        line.quantity_in_stock = 5;
        line.is_active = false;
        assert!(!line.is_available());
    }

    #[test]
    fn test_expiry_serde_round_trip() {
        // The variant serializes explicitly; the nullable-date encoding is
        // a storage concern only.
        let expiring = BatchExpiry::Expiring(date(2026, 6, 1));
        let json = serde_json::to_string(&expiring).unwrap();
        assert_eq!(json, r#"{"expiring":"2026-06-01"}"#);
        assert_eq!(
            serde_json::from_str::<BatchExpiry>(&json).unwrap(),
            expiring
        );

        let json = serde_json::to_string(&BatchExpiry::NonExpiring).unwrap();
        assert_eq!(json, r#""non_expiring""#);
    }

    #[test]
    fn test_ledger_entry_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&LedgerEntryType::ExpiryRemoval).unwrap(),
            r#""expiry_removal""#
        );
        assert_eq!(
            serde_json::from_str::<LedgerEntryType>(r#""restock""#).unwrap(),
            LedgerEntryType::Restock
        );
    }

    #[test]
    fn test_batch_value_and_exhaustion() {
        let batch = Batch {
            id: "b1".to_string(),
            line_id: "l1".to_string(),
            batch_number: "LOT-001".to_string(),
            quantity: 40,
            original_quantity: 100,
            expiry: BatchExpiry::NonExpiring,
            manufacturing_date: None,
            cost_per_unit_cents: 75,
            is_active: true,
            received_at: Utc::now(),
            created_at: Utc::now(),
        };

        assert_eq!(batch.stock_value().cents(), 3000);
        assert!(!batch.is_exhausted());
    }
}
