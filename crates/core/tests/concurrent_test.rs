//! Concurrent access tests for the in-process register.
//!
//! These tests verify that:
//! - Two dispenses that together exceed the balance yield one success and one
//!   rejection
//! - Many concurrent appends produce contiguous sequence numbers
//! - Distinct items never wait on each other

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Barrier;

use custodia_core::register::{AuthorizationTier, RegisterError};
use custodia_shared::types::PageRequest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

mod common;

use common::{Harness, dispense, receipt};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispenses_cannot_overdraw() {
    for _ in 0..20 {
        let h = Harness::new().await;
        let nurse = h.user("Nurse B", AuthorizationTier::DispenseOnly).await;
        h.service.receive(&h.admin, receipt(h.item, dec!(100))).await.unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let tasks = (0..2).map(|_| {
            let service = h.service.clone();
            let barrier = Arc::clone(&barrier);
            let nurse = nurse.clone();
            let item = h.item;
            tokio::spawn(async move {
                barrier.wait().await;
                service.dispense(&nurse, dispense(item, dec!(60))).await
            })
        });

        let results: Vec<_> = join_all(tasks)
            .await
            .into_iter()
            .map(|r| r.expect("task panicked"))
            .collect();

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(RegisterError::InsufficientBalance { .. })))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(rejected, 1);

        let state = h.service.balance(h.item).await.unwrap();
        assert_eq!(state.balance, dec!(40));
        assert_eq!(state.last_sequence_number, 2);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_appends_keep_sequence_contiguous() {
    const WRITERS: usize = 200;

    let h = Harness::new().await;
    let barrier = Arc::new(Barrier::new(WRITERS));

    let tasks = (0..WRITERS).map(|i| {
        let service = h.service.clone();
        let barrier = Arc::clone(&barrier);
        let admin = h.admin.clone();
        let item = h.item;
        tokio::spawn(async move {
            barrier.wait().await;
            if i % 2 == 0 {
                service.receive(&admin, receipt(item, dec!(3))).await
            } else {
                service.dispense(&admin, dispense(item, dec!(2))).await
            }
        })
    });

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.expect("task panicked"))
        .collect();

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    for result in &results {
        assert!(matches!(
            result,
            Ok(_) | Err(RegisterError::InsufficientBalance { .. })
        ));
    }

    let page = h
        .service
        .register(&h.admin, h.item, PageRequest::new(1, 100))
        .await
        .unwrap();
    assert_eq!(page.meta.total, u64::try_from(accepted).unwrap());

    let mut all = Vec::new();
    let mut request = PageRequest::new(1, 100);
    loop {
        let page = h.service.register(&h.admin, h.item, request).await.unwrap();
        if page.data.is_empty() {
            break;
        }
        all.extend(page.data);
        request = request.next();
    }

    let sequences: Vec<i64> = all.iter().map(|e| e.sequence_number).collect();
    let expected: Vec<i64> = (1..=i64::try_from(accepted).unwrap()).collect();
    assert_eq!(sequences, expected);
    assert!(all.iter().all(|e| e.running_balance >= Decimal::ZERO));

    let report = h.service.verify_item(&h.admin, h.item).await.unwrap();
    assert!(report.is_consistent(), "{:?}", report.violation);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_items_progress_independently() {
    let h = Harness::new().await;
    let other = h.items.create();

    let a = {
        let service = h.service.clone();
        let admin = h.admin.clone();
        let item = h.item;
        tokio::spawn(async move {
            for _ in 0..50 {
                service.receive(&admin, receipt(item, dec!(1))).await.unwrap();
            }
        })
    };
    let b = {
        let service = h.service.clone();
        let admin = h.admin.clone();
        tokio::spawn(async move {
            for _ in 0..50 {
                service.receive(&admin, receipt(other, dec!(2))).await.unwrap();
            }
        })
    };
    a.await.unwrap();
    b.await.unwrap();

    assert_eq!(h.service.balance(h.item).await.unwrap().balance, dec!(50));
    assert_eq!(h.service.balance(other).await.unwrap().balance, dec!(100));
    assert_eq!(h.service.balance(other).await.unwrap().last_sequence_number, 50);
}
