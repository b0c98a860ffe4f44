//! # Fulfillment Evaluation
//!
//! Pure scoring of how completely one pharmacy can serve a medication list.
//!
//! The database side (rxstock-db's FulfillmentChecker) loads the pharmacy's
//! available quantities and delegates here, so the percentage math and the
//! duplicate-handling rule stay deterministic and unit-tested.
//!
//! ## Rules
//! - Duplicate medication ids collapse to one distinct id (the stricter
//!   per-item minimum wins). One distinct medication = one unit of match.
//! - "In stock" means available quantity >= the item's minimum (default 1).
//! - `stock_match_percentage = round(in_stock / requested * 100)` as an
//!   integer.
//! - An empty request list is rejected with a validation error before any
//!   lookup; the percentage would be undefined.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, ValidationError};

// =============================================================================
// Request / Result Types
// =============================================================================

/// One requested medication with its per-item minimum quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationRequest {
    pub medication_id: String,
    /// Units required for the item to count as "in stock". Defaults to 1.
    pub minimum_quantity: i64,
}

impl MedicationRequest {
    /// A request for one unit of the given medication.
    pub fn new(medication_id: impl Into<String>) -> Self {
        MedicationRequest {
            medication_id: medication_id.into(),
            minimum_quantity: 1,
        }
    }

    /// Overrides the per-item minimum quantity.
    pub fn with_minimum(mut self, minimum_quantity: i64) -> Self {
        self.minimum_quantity = minimum_quantity;
        self
    }
}

/// Availability verdict for one requested medication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentItem {
    pub medication_id: String,
    pub minimum_quantity: i64,
    /// Units the pharmacy currently has on an available line (0 if none).
    pub quantity_available: i64,
    pub in_stock: bool,
}

/// Per-pharmacy fulfillment verdict for a medication list.
///
/// Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentResult {
    pub pharmacy_id: String,
    /// Items in medication-id order (deterministic for tests and paging).
    pub items: Vec<FulfillmentItem>,
    /// Rounded integer percentage of distinct medications in stock.
    pub stock_match_percentage: i64,
    pub can_fulfill_completely: bool,
}

// =============================================================================
// Evaluation
// =============================================================================

/// Looks up available quantities per medication id.
///
/// Implemented by whatever snapshot the caller holds; rxstock-db passes a
/// map loaded from the pharmacy's active lines. Missing ids mean zero.
pub trait AvailabilityLookup {
    fn quantity_available(&self, medication_id: &str) -> i64;
}

impl AvailabilityLookup for BTreeMap<String, i64> {
    fn quantity_available(&self, medication_id: &str) -> i64 {
        self.get(medication_id).copied().unwrap_or(0)
    }
}

impl AvailabilityLookup for std::collections::HashMap<String, i64> {
    fn quantity_available(&self, medication_id: &str) -> i64 {
        self.get(medication_id).copied().unwrap_or(0)
    }
}

/// Evaluates fulfillment of `requests` against `availability`.
///
/// ## Arguments
/// * `pharmacy_id` - The candidate pharmacy
/// * `requests` - Requested medications; duplicates collapse to distinct ids
/// * `availability` - Snapshot of available quantity per medication id
///
/// ## Returns
/// * `Ok(FulfillmentResult)` - Always, for a non-empty request list
/// * `Err` - Validation error for an empty request list
pub fn evaluate(
    pharmacy_id: &str,
    requests: &[MedicationRequest],
    availability: &impl AvailabilityLookup,
) -> CoreResult<FulfillmentResult> {
    if requests.is_empty() {
        return Err(ValidationError::Empty {
            field: "requests".to_string(),
        }
        .into());
    }

    // Collapse duplicates: one distinct medication id counts once, and the
    // strictest requested minimum applies.
    let mut distinct: BTreeMap<&str, i64> = BTreeMap::new();
    for request in requests {
        let entry = distinct
            .entry(request.medication_id.as_str())
            .or_insert(request.minimum_quantity);
        *entry = (*entry).max(request.minimum_quantity).max(1);
    }

    let items: Vec<FulfillmentItem> = distinct
        .into_iter()
        .map(|(medication_id, minimum_quantity)| {
            let quantity_available = availability.quantity_available(medication_id);
            FulfillmentItem {
                medication_id: medication_id.to_string(),
                minimum_quantity,
                quantity_available,
                in_stock: quantity_available >= minimum_quantity,
            }
        })
        .collect();

    let requested = items.len() as i64;
    let in_stock = items.iter().filter(|i| i.in_stock).count() as i64;
    let stock_match_percentage = ((in_stock as f64 / requested as f64) * 100.0).round() as i64;

    Ok(FulfillmentResult {
        pharmacy_id: pharmacy_id.to_string(),
        can_fulfill_completely: in_stock == requested,
        stock_match_percentage,
        items,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn availability(pairs: &[(&str, i64)]) -> BTreeMap<String, i64> {
        pairs
            .iter()
            .map(|(id, qty)| (id.to_string(), *qty))
            .collect()
    }

    #[test]
    fn test_full_match() {
        let requests = vec![
            MedicationRequest::new("med-a"),
            MedicationRequest::new("med-b"),
        ];
        let stock = availability(&[("med-a", 3), ("med-b", 1)]);

        let result = evaluate("ph-1", &requests, &stock).unwrap();

        assert_eq!(result.stock_match_percentage, 100);
        assert!(result.can_fulfill_completely);
        assert!(result.items.iter().all(|i| i.in_stock));
    }

    #[test]
    fn test_partial_match_rounds_percentage() {
        let requests = vec![
            MedicationRequest::new("med-a"),
            MedicationRequest::new("med-b"),
            MedicationRequest::new("med-c"),
        ];
        let stock = availability(&[("med-a", 5)]);

        let result = evaluate("ph-1", &requests, &stock).unwrap();

        // 1 of 3 = 33.33...% rounds to 33.
        assert_eq!(result.stock_match_percentage, 33);
        assert!(!result.can_fulfill_completely);
    }

    #[test]
    fn test_two_thirds_rounds_up() {
        let requests = vec![
            MedicationRequest::new("med-a"),
            MedicationRequest::new("med-b"),
            MedicationRequest::new("med-c"),
        ];
        let stock = availability(&[("med-a", 1), ("med-b", 1)]);

        let result = evaluate("ph-1", &requests, &stock).unwrap();

        // 2 of 3 = 66.66...% rounds to 67.
        assert_eq!(result.stock_match_percentage, 67);
    }

    #[test]
    fn test_duplicates_collapse_to_distinct_ids() {
        let requests = vec![
            MedicationRequest::new("med-a"),
            MedicationRequest::new("med-a"),
            MedicationRequest::new("med-b"),
        ];
        let stock = availability(&[("med-a", 1)]);

        let result = evaluate("ph-1", &requests, &stock).unwrap();

        // Two distinct ids, one in stock: 50%.
        assert_eq!(result.items.len(), 2);
        assert_eq!(result.stock_match_percentage, 50);
    }

    #[test]
    fn test_duplicate_minimums_take_strictest() {
        let requests = vec![
            MedicationRequest::new("med-a").with_minimum(2),
            MedicationRequest::new("med-a").with_minimum(5),
        ];
        let stock = availability(&[("med-a", 3)]);

        let result = evaluate("ph-1", &requests, &stock).unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].minimum_quantity, 5);
        assert!(!result.items[0].in_stock);
        assert_eq!(result.stock_match_percentage, 0);
    }

    #[test]
    fn test_per_item_minimum_gates_in_stock() {
        let requests = vec![MedicationRequest::new("med-a").with_minimum(10)];
        let stock = availability(&[("med-a", 9)]);

        let result = evaluate("ph-1", &requests, &stock).unwrap();

        assert!(!result.can_fulfill_completely);
        assert_eq!(result.items[0].quantity_available, 9);
    }

    #[test]
    fn test_empty_request_list_rejected() {
        let stock = availability(&[]);
        assert!(evaluate("ph-1", &[], &stock).is_err());
    }

    #[test]
    fn test_items_are_sorted_by_medication_id() {
        let requests = vec![
            MedicationRequest::new("med-z"),
            MedicationRequest::new("med-a"),
            MedicationRequest::new("med-m"),
        ];
        let stock = availability(&[]);

        let result = evaluate("ph-1", &requests, &stock).unwrap();
        let ids: Vec<&str> = result.items.iter().map(|i| i.medication_id.as_str()).collect();
        assert_eq!(ids, vec!["med-a", "med-m", "med-z"]);
    }
}
