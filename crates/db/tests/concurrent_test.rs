//! Concurrency tests for the PostgreSQL register store.
//!
//! These tests run against a live database (`DATABASE_URL`) and skip
//! themselves when none is reachable.

#![allow(clippy::uninlined_format_args)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use custodia_core::register::{LedgerStore, RegisterError};
use futures::future::join_all;
use rust_decimal_macros::dec;
use sea_orm::{ConnectionTrait, TransactionTrait};
use tokio::sync::Barrier;

use common::{dispense, fixture, fixture_with_lock_timeout, receipt};

#[tokio::test]
async fn test_competing_dispenses_never_overdraw() {
    let Some(f) = fixture().await else { return };

    f.service.receive(&f.admin, receipt(f.item, dec!(100))).await.unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let tasks = (0..2).map(|_| {
        let service = f.service.clone();
        let admin = f.admin.clone();
        let barrier = Arc::clone(&barrier);
        let item = f.item;
        tokio::spawn(async move {
            barrier.wait().await;
            service.dispense(&admin, dispense(item, dec!(60))).await
        })
    });

    let results: Vec<_> = join_all(tasks).await.into_iter().map(Result::unwrap).collect();
    let accepted = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(RegisterError::InsufficientBalance { .. })))
        .count();

    assert_eq!(accepted, 1, "{results:?}");
    assert_eq!(rejected, 1, "{results:?}");
    assert_eq!(f.service.balance(f.item).await.unwrap().balance, dec!(40));
}

#[tokio::test]
async fn test_concurrent_receipts_get_contiguous_sequences() {
    let Some(f) = fixture().await else { return };

    let tasks = (0..40).map(|_| {
        let service = f.service.clone();
        let admin = f.admin.clone();
        let item = f.item;
        tokio::spawn(async move { service.receive(&admin, receipt(item, dec!(1))).await })
    });

    let mut sequences: Vec<i64> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap().sequence_number)
        .collect();
    sequences.sort_unstable();

    assert_eq!(sequences, (1..=40).collect::<Vec<i64>>());
    let state = f.ledger.current_state(f.item).await.unwrap();
    assert_eq!(state.balance, dec!(40));

    let report = f.service.verify_item(&f.admin, f.item).await.unwrap();
    assert!(report.is_consistent(), "{:?}", report.violation);
}

#[tokio::test]
async fn test_lock_timeout_is_retryable_conflict() {
    let Some(f) = fixture_with_lock_timeout(Duration::from_millis(200)).await else {
        return;
    };

    f.service.receive(&f.admin, receipt(f.item, dec!(10))).await.unwrap();

    // Hold the item's state row from another transaction.
    let holder = f.db.begin().await.unwrap();
    holder
        .execute_unprepared(&format!(
            "SELECT * FROM register_item_state WHERE item_id = '{}' FOR UPDATE",
            f.item
        ))
        .await
        .unwrap();

    let result = f.service.dispense(&f.admin, dispense(f.item, dec!(1))).await;
    let err = result.unwrap_err();
    assert!(matches!(err, RegisterError::Conflict(_)), "{err:?}");
    assert!(err.is_retryable());

    holder.rollback().await.unwrap();

    let state = f.ledger.current_state(f.item).await.unwrap();
    assert_eq!(state.last_sequence_number, 1);
    assert_eq!(state.balance, dec!(10));
}
