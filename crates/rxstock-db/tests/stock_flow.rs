//! End-to-end tests for the stock mutation path: restock, FIFO dispense,
//! absolute adjustments, the expiry sweep, the append-only ledger, and the
//! optimistic-concurrency guarantees.

mod common;

use chrono::{Days, Utc};

use common::{
    assert_line_consistent, cleanup_file_db, create_line, dated_restock, file_db, memory_db,
};
use rxstock_core::{CoreError, LedgerEntryType};
use rxstock_db::error::{DbError, StockError};
use rxstock_db::mutator::{DispenseRequest, ExpirySweep, RestockRequest};
use rxstock_db::Database;

fn today() -> chrono::NaiveDate {
    Utc::now().date_naive()
}

fn in_days(days: u64) -> chrono::NaiveDate {
    today().checked_add_days(Days::new(days)).unwrap()
}

async fn decrease_with_retry(
    db: &Database,
    line_id: &str,
    qty: i64,
) -> Result<rxstock_core::InventoryLine, StockError> {
    loop {
        match db
            .mutator()
            .decrease(line_id, qty, DispenseRequest::default())
            .await
        {
            Err(err) if err.is_retryable() => continue,
            other => return other,
        }
    }
}

// =============================================================================
// Restock
// =============================================================================

#[tokio::test]
async fn restock_creates_batch_and_ledger_entry() {
    let db = memory_db().await;
    let line = create_line(&db, "ph-1", "med-amoxicillin", 10, 80).await;

    let updated = db
        .mutator()
        .increase(&line.id, 50, dated_restock("LOT-A", in_days(180)))
        .await
        .unwrap();

    assert_eq!(updated.quantity_in_stock, 50);
    assert_eq!(updated.row_version, line.row_version + 1);

    let batches = db.batches().list_active(&line.id).await.unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].batch_number, "LOT-A");
    assert_eq!(batches[0].quantity, 50);

    let entries = db.ledger().list_for_line(&line.id, 10, 0).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entry_type, LedgerEntryType::Restock);
    assert_eq!(entries[0].quantity_changed, 50);
    assert_eq!(entries[0].stock_before, 0);
    assert_eq!(entries[0].stock_after, 50);

    assert_line_consistent(&db, &line.id).await;
}

#[tokio::test]
async fn restock_without_metadata_lands_in_generated_batch() {
    let db = memory_db().await;
    let line = create_line(&db, "ph-1", "med-ibuprofen", 5, 40).await;

    db.mutator()
        .increase(&line.id, 12, RestockRequest::default())
        .await
        .unwrap();

    let batches = db.batches().list_active(&line.id).await.unwrap();
    assert_eq!(batches.len(), 1);
    assert!(batches[0].batch_number.starts_with("RCV-"));
    assert_eq!(batches[0].quantity, 12);

    assert_line_consistent(&db, &line.id).await;
}

#[tokio::test]
async fn restock_same_lot_number_augments_active_batch() {
    let db = memory_db().await;
    let line = create_line(&db, "ph-1", "med-metformin", 10, 80).await;

    let request = dated_restock("LOT-A", in_days(90));
    db.mutator().increase(&line.id, 30, request.clone()).await.unwrap();
    let updated = db.mutator().increase(&line.id, 20, request).await.unwrap();

    assert_eq!(updated.quantity_in_stock, 50);

    let batches = db.batches().list_active(&line.id).await.unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].quantity, 50);
    assert_eq!(batches[0].original_quantity, 50);

    assert_eq!(db.ledger().count_for_line(&line.id).await.unwrap(), 2);
    assert_line_consistent(&db, &line.id).await;
}

#[tokio::test]
async fn restock_reusing_exhausted_lot_number_conflicts() {
    let db = memory_db().await;
    let line = create_line(&db, "ph-1", "med-omeprazole", 2, 20).await;

    db.mutator()
        .increase(&line.id, 5, dated_restock("LOT-A", in_days(90)))
        .await
        .unwrap();
    // Exhaust the lot; it becomes inactive.
    db.mutator()
        .decrease(&line.id, 5, DispenseRequest::default())
        .await
        .unwrap();

    let err = db
        .mutator()
        .increase(&line.id, 5, dated_restock("LOT-A", in_days(120)))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StockError::Db(DbError::UniqueViolation { .. })
    ));
    assert_line_consistent(&db, &line.id).await;
}

#[tokio::test]
async fn mutations_reject_nonpositive_quantities_and_unknown_lines() {
    let db = memory_db().await;
    let line = create_line(&db, "ph-1", "med-naproxen", 2, 20).await;

    let err = db
        .mutator()
        .increase(&line.id, 0, RestockRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StockError::Domain(CoreError::Validation(_))
    ));

    let err = db
        .mutator()
        .decrease(&line.id, -3, DispenseRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StockError::Domain(CoreError::Validation(_))
    ));

    let err = db
        .mutator()
        .decrease("no-such-line", 1, DispenseRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StockError::Db(DbError::NotFound { .. })));
}

// =============================================================================
// FIFO Dispense
// =============================================================================

#[tokio::test]
async fn dispense_consumes_batches_first_expired_first_out() {
    let db = memory_db().await;
    let line = create_line(&db, "ph-1", "med-amoxicillin", 2, 40).await;

    // B1 expires sooner than B2; both hold 10 units.
    db.mutator()
        .increase(&line.id, 10, dated_restock("B1", in_days(5)))
        .await
        .unwrap();
    db.mutator()
        .increase(&line.id, 10, dated_restock("B2", in_days(10)))
        .await
        .unwrap();

    let updated = db
        .mutator()
        .decrease(
            &line.id,
            15,
            DispenseRequest {
                prescription_id: Some("rx-100".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.quantity_in_stock, 5);

    let b1 = db.batches().get_by_number(&line.id, "B1").await.unwrap().unwrap();
    let b2 = db.batches().get_by_number(&line.id, "B2").await.unwrap().unwrap();
    assert!(!b1.is_active);
    assert_eq!(b1.quantity, 0);
    assert!(b2.is_active);
    assert_eq!(b2.quantity, 5);

    // One sale entry per batch touched, chained through exact quantities.
    let entries = db.ledger().list_for_line(&line.id, 10, 0).await.unwrap();
    let sales: Vec<_> = entries
        .iter()
        .filter(|e| e.entry_type == LedgerEntryType::Sale)
        .collect();
    assert_eq!(sales.len(), 2);
    assert_eq!(sales[0].quantity_changed, -10);
    assert_eq!(sales[0].stock_before, 20);
    assert_eq!(sales[0].stock_after, 10);
    assert_eq!(sales[1].quantity_changed, -5);
    assert_eq!(sales[1].stock_before, 10);
    assert_eq!(sales[1].stock_after, 5);
    assert!(sales.iter().all(|e| e.prescription_id.as_deref() == Some("rx-100")));

    assert_line_consistent(&db, &line.id).await;
}

#[tokio::test]
async fn undated_batches_are_consumed_after_dated_ones() {
    let db = memory_db().await;
    let line = create_line(&db, "ph-1", "med-insulin", 2, 40).await;

    db.mutator()
        .increase(&line.id, 10, RestockRequest::default()) // generated, non-expiring
        .await
        .unwrap();
    db.mutator()
        .increase(&line.id, 10, dated_restock("DATED", in_days(30)))
        .await
        .unwrap();

    db.mutator()
        .decrease(&line.id, 12, DispenseRequest::default())
        .await
        .unwrap();

    let dated = db
        .batches()
        .get_by_number(&line.id, "DATED")
        .await
        .unwrap()
        .unwrap();
    assert!(!dated.is_active, "dated batch drains first");

    let remaining = db.batches().list_active(&line.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].quantity, 8);

    assert_line_consistent(&db, &line.id).await;
}

#[tokio::test]
async fn oversell_is_refused_and_leaves_state_unchanged() {
    let db = memory_db().await;
    let line = create_line(&db, "ph-1", "med-atorvastatin", 2, 40).await;

    db.mutator()
        .increase(&line.id, 10, dated_restock("LOT-A", in_days(60)))
        .await
        .unwrap();
    let entries_before = db.ledger().count_for_line(&line.id).await.unwrap();

    let err = db
        .mutator()
        .decrease(&line.id, 12, DispenseRequest::default())
        .await
        .unwrap_err();

    match err {
        StockError::Domain(CoreError::InsufficientStock {
            available,
            requested,
            ..
        }) => {
            assert_eq!(available, 10);
            assert_eq!(requested, 12);
        }
        other => panic!("expected InsufficientStock, got {other}"),
    }

    // All-or-nothing: no partial consumption, no stray ledger rows.
    let line_after = db.lines().get_by_id(&line.id).await.unwrap().unwrap();
    assert_eq!(line_after.quantity_in_stock, 10);
    assert_eq!(
        db.ledger().count_for_line(&line.id).await.unwrap(),
        entries_before
    );
    assert_line_consistent(&db, &line.id).await;
}

// =============================================================================
// Absolute Adjustments
// =============================================================================

#[tokio::test]
async fn set_absolute_down_drains_batches_and_keeps_invariant() {
    let db = memory_db().await;
    let line = create_line(&db, "ph-1", "med-lisinopril", 2, 40).await;

    db.mutator()
        .increase(&line.id, 20, dated_restock("OLD", in_days(10)))
        .await
        .unwrap();
    db.mutator()
        .increase(&line.id, 10, dated_restock("NEW", in_days(90)))
        .await
        .unwrap();

    let updated = db
        .mutator()
        .set_absolute(
            &line.id,
            8,
            Some("auditor".to_string()),
            Some("cycle count correction".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(updated.quantity_in_stock, 8);

    // Drained FIFO: OLD gone entirely, NEW reduced to 8.
    let old = db.batches().get_by_number(&line.id, "OLD").await.unwrap().unwrap();
    let new = db.batches().get_by_number(&line.id, "NEW").await.unwrap().unwrap();
    assert!(!old.is_active);
    assert_eq!(new.quantity, 8);

    let entries = db.ledger().list_for_line(&line.id, 10, 0).await.unwrap();
    let adjustment = entries
        .iter()
        .find(|e| e.entry_type == LedgerEntryType::Adjustment)
        .unwrap();
    assert_eq!(adjustment.quantity_changed, -22);
    assert_eq!(adjustment.batch_id, None);
    assert_eq!(adjustment.notes.as_deref(), Some("cycle count correction"));

    assert_line_consistent(&db, &line.id).await;
}

#[tokio::test]
async fn set_absolute_up_adds_adjustment_batch() {
    let db = memory_db().await;
    let line = create_line(&db, "ph-1", "med-salbutamol", 2, 40).await;

    db.mutator()
        .increase(&line.id, 10, dated_restock("LOT-A", in_days(60)))
        .await
        .unwrap();

    let updated = db
        .mutator()
        .set_absolute(&line.id, 25, None, None)
        .await
        .unwrap();

    assert_eq!(updated.quantity_in_stock, 25);

    let batches = db.batches().list_active(&line.id).await.unwrap();
    let adjustment_batch = batches
        .iter()
        .find(|b| b.batch_number.starts_with("ADJ-"))
        .unwrap();
    assert_eq!(adjustment_batch.quantity, 15);

    assert_line_consistent(&db, &line.id).await;
}

#[tokio::test]
async fn set_absolute_to_current_value_is_a_noop() {
    let db = memory_db().await;
    let line = create_line(&db, "ph-1", "med-loperamide", 2, 40).await;

    db.mutator()
        .increase(&line.id, 10, dated_restock("LOT-A", in_days(60)))
        .await
        .unwrap();
    let entries_before = db.ledger().count_for_line(&line.id).await.unwrap();

    let updated = db
        .mutator()
        .set_absolute(&line.id, 10, None, None)
        .await
        .unwrap();

    assert_eq!(updated.quantity_in_stock, 10);
    assert_eq!(
        db.ledger().count_for_line(&line.id).await.unwrap(),
        entries_before
    );
}

// =============================================================================
// Ledger Replay
// =============================================================================

#[tokio::test]
async fn ledger_replay_reproduces_current_stock() {
    let db = memory_db().await;
    let line = create_line(&db, "ph-1", "med-azithromycin", 5, 60).await;

    db.mutator()
        .increase(&line.id, 30, dated_restock("L1", in_days(40)))
        .await
        .unwrap();
    db.mutator()
        .decrease(&line.id, 12, DispenseRequest::default())
        .await
        .unwrap();
    db.mutator()
        .set_absolute(&line.id, 25, None, None)
        .await
        .unwrap();
    db.mutator()
        .decrease(&line.id, 5, DispenseRequest::default())
        .await
        .unwrap();

    let line_after = db.lines().get_by_id(&line.id).await.unwrap().unwrap();
    let replayed = db.ledger().reconstruct_quantity(&line.id).await.unwrap();

    assert_eq!(line_after.quantity_in_stock, 20);
    assert_eq!(replayed, line_after.quantity_in_stock);
    assert_line_consistent(&db, &line.id).await;
}

// =============================================================================
// Expiry Sweep
// =============================================================================

#[tokio::test]
async fn expiry_sweep_purges_dated_batches_and_is_idempotent() {
    let db = memory_db().await;
    let line = create_line(&db, "ph-1", "med-fluticasone", 2, 40).await;

    // One batch already past its date, one still good.
    db.mutator()
        .increase(
            &line.id,
            10,
            dated_restock("EXPIRED", today().checked_sub_days(Days::new(3)).unwrap()),
        )
        .await
        .unwrap();
    db.mutator()
        .increase(&line.id, 20, dated_restock("GOOD", in_days(120)))
        .await
        .unwrap();

    let sweep = db.mutator().expire_batches(today()).await.unwrap();
    assert_eq!(
        sweep,
        ExpirySweep {
            lines_touched: 1,
            batches_expired: 1,
            units_removed: 10,
        }
    );

    let line_after = db.lines().get_by_id(&line.id).await.unwrap().unwrap();
    assert_eq!(line_after.quantity_in_stock, 20);

    let expired = db
        .batches()
        .get_by_number(&line.id, "EXPIRED")
        .await
        .unwrap()
        .unwrap();
    assert!(!expired.is_active);

    let entries = db.ledger().list_for_line(&line.id, 10, 0).await.unwrap();
    let removals: Vec<_> = entries
        .iter()
        .filter(|e| e.entry_type == LedgerEntryType::ExpiryRemoval)
        .collect();
    assert_eq!(removals.len(), 1);
    assert_eq!(removals[0].quantity_changed, -10);

    // Second run with no new expirations: no further change.
    let entries_before = db.ledger().count_for_line(&line.id).await.unwrap();
    let second = db.mutator().expire_batches(today()).await.unwrap();
    assert_eq!(second, ExpirySweep::default());
    assert_eq!(
        db.ledger().count_for_line(&line.id).await.unwrap(),
        entries_before
    );
    let line_final = db.lines().get_by_id(&line.id).await.unwrap().unwrap();
    assert_eq!(line_final.quantity_in_stock, 20);

    assert_line_consistent(&db, &line.id).await;
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_dispenses_cannot_oversell() {
    let (db, path) = file_db().await;
    let line = create_line(&db, "ph-1", "med-amoxicillin", 0, 40).await;

    db.mutator()
        .increase(&line.id, 10, dated_restock("LOT-A", in_days(60)))
        .await
        .unwrap();

    let db_a = db.clone();
    let db_b = db.clone();
    let line_a = line.id.clone();
    let line_b = line.id.clone();

    let task_a = tokio::spawn(async move { decrease_with_retry(&db_a, &line_a, 6).await });
    let task_b = tokio::spawn(async move { decrease_with_retry(&db_b, &line_b, 6).await });

    let results = vec![task_a.await.unwrap(), task_b.await.unwrap()];

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one dispense must win");

    let loser = results.into_iter().find(|r| r.is_err()).unwrap().unwrap_err();
    match loser {
        StockError::Domain(CoreError::InsufficientStock {
            available,
            requested,
            ..
        }) => {
            assert_eq!(available, 4);
            assert_eq!(requested, 6);
        }
        other => panic!("expected InsufficientStock after retry, got {other}"),
    }

    let line_after = db.lines().get_by_id(&line.id).await.unwrap().unwrap();
    assert_eq!(line_after.quantity_in_stock, 4);
    assert_line_consistent(&db, &line.id).await;

    db.close().await;
    cleanup_file_db(&path);
}

// =============================================================================
// Low-Stock Feed & Valuation
// =============================================================================

#[tokio::test]
async fn low_stock_feed_lists_lines_at_or_below_minimum() {
    let db = memory_db().await;
    let low = create_line(&db, "ph-1", "med-low", 10, 50).await;
    let fine = create_line(&db, "ph-1", "med-fine", 10, 50).await;

    db.mutator()
        .increase(&low.id, 10, RestockRequest::default())
        .await
        .unwrap();
    db.mutator()
        .increase(&fine.id, 30, RestockRequest::default())
        .await
        .unwrap();

    let alerts = db.lines().low_stock_lines("ph-1").await.unwrap();
    let ids: Vec<&str> = alerts.iter().map(|l| l.medication_id.as_str()).collect();

    assert_eq!(ids, vec!["med-low"]);
}

#[tokio::test]
async fn batch_valuation_sums_active_batches() {
    let db = memory_db().await;
    let line = create_line(&db, "ph-1", "med-valued", 2, 40).await;

    // dated_restock uses a 500-cent unit cost.
    db.mutator()
        .increase(&line.id, 10, dated_restock("A", in_days(30)))
        .await
        .unwrap();
    db.mutator()
        .increase(&line.id, 5, dated_restock("B", in_days(60)))
        .await
        .unwrap();

    let value = db.batches().stock_value(&line.id).await.unwrap();
    assert_eq!(value.cents(), 7500);

    // Consumption reduces the valuation with the FIFO draw.
    db.mutator()
        .decrease(&line.id, 10, DispenseRequest::default())
        .await
        .unwrap();
    let value = db.batches().stock_value(&line.id).await.unwrap();
    assert_eq!(value.cents(), 2500);
}
