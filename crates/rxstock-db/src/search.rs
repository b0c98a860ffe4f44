//! # Fulfillment Check & Pharmacy Search
//!
//! Read-path services: no locking, no mutation.
//!
//! Both services read whatever WAL snapshot the pool hands them. Stock
//! numbers are advisory for search ranking; a dispense that races a search
//! is caught later by the mutator's own transaction, never here.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Patient Search Data Flow                             │
//! │                                                                         │
//! │  Caller (HTTP layer)                                                    │
//! │    medication ids + candidate pharmacies (ids + resolved coordinates)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SearchService::search                                                  │
//! │       │                                                                 │
//! │       ├── per pharmacy: FulfillmentChecker::check                       │
//! │       │      └── SELECT available quantities → core::fulfillment        │
//! │       │                                                                 │
//! │       └── core::ranking::rank (haversine + composite score)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Vec<RankedCandidate>, best first                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, StockResult};
use rxstock_core::fulfillment::{self, FulfillmentResult, MedicationRequest};
use rxstock_core::ranking::{self, RankedCandidate, SearchCandidate};
use rxstock_core::validation::validate_medication_ids;
use rxstock_core::GeoPoint;

// =============================================================================
// Fulfillment Checker
// =============================================================================

/// Availability row for the fulfillment query.
#[derive(Debug, sqlx::FromRow)]
struct AvailabilityRow {
    medication_id: String,
    quantity_in_stock: i64,
}

/// Determines which requested medications a pharmacy has in stock.
#[derive(Debug, Clone)]
pub struct FulfillmentChecker {
    pool: SqlitePool,
}

impl FulfillmentChecker {
    /// Creates a new FulfillmentChecker.
    pub fn new(pool: SqlitePool) -> Self {
        FulfillmentChecker { pool }
    }

    /// Checks fulfillment with the default one-unit minimum per item.
    ///
    /// ## Arguments
    /// * `pharmacy_id` - The pharmacy to check
    /// * `medication_ids` - Requested medications; must be non-empty
    ///
    /// An unknown pharmacy simply has nothing in stock - "no results" is a
    /// valid outcome, not an error.
    pub async fn check(
        &self,
        pharmacy_id: &str,
        medication_ids: &[String],
    ) -> StockResult<FulfillmentResult> {
        validate_medication_ids(medication_ids)?;

        let requests: Vec<MedicationRequest> = medication_ids
            .iter()
            .map(|id| MedicationRequest::new(id.as_str()))
            .collect();

        self.check_requests(pharmacy_id, &requests).await
    }

    /// Checks fulfillment with caller-specified per-item minimums.
    pub async fn check_requests(
        &self,
        pharmacy_id: &str,
        requests: &[MedicationRequest],
    ) -> StockResult<FulfillmentResult> {
        let medication_ids: Vec<String> = requests
            .iter()
            .map(|r| r.medication_id.clone())
            .collect();
        validate_medication_ids(&medication_ids)?;

        let availability = self
            .load_availability(pharmacy_id, &medication_ids)
            .await?;

        debug!(
            pharmacy_id,
            requested = medication_ids.len(),
            stocked = availability.len(),
            "Fulfillment check"
        );

        Ok(fulfillment::evaluate(pharmacy_id, requests, &availability)?)
    }

    /// Loads available quantity per requested medication from the
    /// pharmacy's active lines. Missing medications mean zero.
    async fn load_availability(
        &self,
        pharmacy_id: &str,
        medication_ids: &[String],
    ) -> StockResult<BTreeMap<String, i64>> {
        let mut builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
            "SELECT medication_id, quantity_in_stock FROM inventory_lines \
             WHERE is_active = 1 AND pharmacy_id = ",
        );
        builder.push_bind(pharmacy_id);
        builder.push(" AND medication_id IN (");

        let mut separated = builder.separated(", ");
        for medication_id in medication_ids {
            separated.push_bind(medication_id);
        }
        separated.push_unseparated(")");

        let rows: Vec<AvailabilityRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| (row.medication_id, row.quantity_in_stock))
            .collect())
    }
}

// =============================================================================
// Search Service
// =============================================================================

/// A candidate pharmacy entering a search: identity plus coordinates
/// already resolved by the external geocoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PharmacyCandidate {
    pub pharmacy_id: String,
    pub location: Option<GeoPoint>,
}

/// Ranks candidate pharmacies for a patient's medication list.
#[derive(Debug, Clone)]
pub struct SearchService {
    pool: SqlitePool,
}

impl SearchService {
    /// Creates a new SearchService.
    pub fn new(pool: SqlitePool) -> Self {
        SearchService { pool }
    }

    /// Checks fulfillment for every candidate and ranks them by composite
    /// score (stock match + proximity), best first.
    ///
    /// ## Arguments
    /// * `medication_ids` - The searched medication list; must be non-empty
    /// * `candidates` - Candidate pharmacies from the external directory
    /// * `user_location` - The searcher's coordinates, when known
    /// * `max_radius_km` - Hard radius filter; candidates beyond it are
    ///   excluded entirely, not down-ranked
    ///
    /// ## Returns
    /// Ranked candidates; an empty vector is a valid result.
    pub async fn search(
        &self,
        medication_ids: &[String],
        candidates: &[PharmacyCandidate],
        user_location: Option<GeoPoint>,
        max_radius_km: Option<f64>,
    ) -> StockResult<Vec<RankedCandidate>> {
        validate_medication_ids(medication_ids)?;

        let checker = FulfillmentChecker::new(self.pool.clone());

        let mut scored = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let fulfillment = checker
                .check(&candidate.pharmacy_id, medication_ids)
                .await?;
            scored.push(SearchCandidate {
                pharmacy_id: candidate.pharmacy_id.clone(),
                location: candidate.location,
                fulfillment,
            });
        }

        debug!(
            candidates = scored.len(),
            has_location = user_location.is_some(),
            "Ranking pharmacy candidates"
        );

        Ok(ranking::rank(scored, user_location, max_radius_km)?)
    }
}
