//! # Search Ranking
//!
//! Composite ranking of candidate pharmacies for a patient search.
//!
//! ## Scoring
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Composite Score                                    │
//! │                                                                         │
//! │  score = 0.6 × (stock_match % / 100) + 0.4 × (1 − normalized_distance)  │
//! │                                                                         │
//! │  normalized_distance = min(distance_km / radius_cap, 1.0)               │
//! │  radius_cap = max_radius_km, or the fixed 50 km ceiling when absent     │
//! │                                                                         │
//! │  Example (radius cap 50 km):                                            │
//! │    Pharmacy A: 10 km away, 100% match → 0.6·1.0 + 0.4·0.80 = 0.92       │
//! │    Pharmacy B:  2 km away,  50% match → 0.6·0.5 + 0.4·0.96 = 0.684      │
//! │    Rank order: A, B (stock dominates proximity)                         │
//! │                                                                         │
//! │  No user location → the distance term contributes 0 and ranking         │
//! │  degrades to stock match alone.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Exclusion vs. Down-Ranking
//! Candidates beyond `max_radius_km` are removed before scoring, never
//! merely scored lower. A candidate with unknown coordinates cannot be
//! proven inside the radius, so a radius filter excludes it too.
//!
//! ## Determinism
//! Ties on equal score break by: complete fulfillment first, then shorter
//! distance, then pharmacy id. Required for reproducible tests and stable
//! pagination.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::fulfillment::FulfillmentResult;
use crate::types::GeoPoint;
use crate::validation::validate_radius_km;

// =============================================================================
// Constants
// =============================================================================

/// Weight of the stock-match component in the composite score.
pub const STOCK_WEIGHT: f64 = 0.6;

/// Weight of the proximity component in the composite score.
pub const DISTANCE_WEIGHT: f64 = 0.4;

/// Normalization ceiling used when the caller provides no radius.
pub const DEFAULT_RADIUS_CAP_KM: f64 = 50.0;

/// Mean Earth radius for the haversine formula.
const EARTH_RADIUS_KM: f64 = 6371.0;

// =============================================================================
// Candidate Types
// =============================================================================

/// A candidate pharmacy entering the ranking: identity, already-resolved
/// coordinates (the engine never calls a geocoder), and its fulfillment
/// verdict for the searched medication list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub pharmacy_id: String,
    pub location: Option<GeoPoint>,
    pub fulfillment: FulfillmentResult,
}

/// A scored candidate, ready for presentation.
///
/// Derived, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub pharmacy_id: String,
    pub location: Option<GeoPoint>,
    pub fulfillment: FulfillmentResult,
    /// Great-circle distance from the user, when both coordinates exist.
    pub distance_km: Option<f64>,
    /// Composite score in [0, 1].
    pub composite_score: f64,
}

// =============================================================================
// Distance
// =============================================================================

/// Haversine great-circle distance between two coordinates, in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

// =============================================================================
// Ranking
// =============================================================================

/// Ranks candidates by composite score, descending.
///
/// ## Arguments
/// * `candidates` - Candidate pharmacies with fulfillment verdicts
/// * `user_location` - The searcher's coordinates, when known
/// * `max_radius_km` - Hard radius filter; must be positive when given
///
/// ## Returns
/// Scored candidates in rank order. An empty result is a valid outcome,
/// not an error.
pub fn rank(
    candidates: Vec<SearchCandidate>,
    user_location: Option<GeoPoint>,
    max_radius_km: Option<f64>,
) -> CoreResult<Vec<RankedCandidate>> {
    if let Some(radius) = max_radius_km {
        validate_radius_km(radius)?;
    }

    let radius_cap = max_radius_km.unwrap_or(DEFAULT_RADIUS_CAP_KM);

    let mut ranked: Vec<RankedCandidate> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let distance_km = match (user_location, candidate.location) {
                (Some(user), Some(pharmacy)) => Some(haversine_km(user, pharmacy)),
                _ => None,
            };

            // Radius filtering only applies when the searcher's position is
            // known; without it every distance is unknown and no candidate
            // could be excluded.
            if user_location.is_some() {
                if let Some(radius) = max_radius_km {
                    match distance_km {
                        Some(d) if d <= radius => {}
                        _ => return None,
                    }
                }
            }

            let match_fraction = candidate.fulfillment.stock_match_percentage as f64 / 100.0;
            let distance_term = match distance_km {
                Some(d) => DISTANCE_WEIGHT * (1.0 - (d / radius_cap).min(1.0)),
                None => 0.0,
            };

            Some(RankedCandidate {
                pharmacy_id: candidate.pharmacy_id,
                location: candidate.location,
                fulfillment: candidate.fulfillment,
                distance_km,
                composite_score: STOCK_WEIGHT * match_fraction + distance_term,
            })
        })
        .collect();

    ranked.sort_by(compare_ranked);

    Ok(ranked)
}

/// Rank order: score descending, then complete fulfillment, then shorter
/// distance (unknown distances last), then pharmacy id.
fn compare_ranked(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.composite_score
        .total_cmp(&a.composite_score)
        .then_with(|| {
            b.fulfillment
                .can_fulfill_completely
                .cmp(&a.fulfillment.can_fulfill_completely)
        })
        .then_with(|| match (a.distance_km, b.distance_km) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.pharmacy_id.cmp(&b.pharmacy_id))
}

// =============================================================================
// Unit Tests
// =============================================================================
