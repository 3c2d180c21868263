//! Property-based tests for RegisterService.
//!
//! Operation streams run through the full pipeline over in-process stores:
//! the stored register must always replay to the stored state, and
//! unauthorized or rejected calls must leave no entry behind.

use std::sync::Arc;

use custodia_shared::RegisterSettings;
use custodia_shared::types::{ItemId, PageRequest, UserId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::authorization::AuthorizationTier;
use super::error::RegisterError;
use super::request::{DispenseRequest, DisposalRequest, InventoryCheckRequest, ReceiptRequest};
use super::types::Actor;
use crate::memory::{
    InMemoryAuthorizationStore, InMemoryItemDirectory, InMemoryLedgerStore, InMemoryRegisterService,
    RecordingAuditRecorder,
};

#[derive(Debug, Clone)]
enum Op {
    Receive(Decimal),
    Dispense(Decimal),
    Dispose(Decimal),
    Count(Decimal),
}

/// Strategy to generate quantities (0.1 to 200.0).
fn quantity() -> impl Strategy<Value = Decimal> {
    (1i64..2_000i64).prop_map(|tenths| Decimal::new(tenths, 1))
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        quantity().prop_map(Op::Receive),
        quantity().prop_map(Op::Dispense),
        quantity().prop_map(Op::Dispose),
        quantity().prop_map(Op::Count),
    ]
}

fn tier_strategy() -> impl Strategy<Value = AuthorizationTier> {
    prop_oneof![
        Just(AuthorizationTier::ViewOnly),
        Just(AuthorizationTier::DispenseOnly),
        Just(AuthorizationTier::Full),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

struct Fixture {
    service: InMemoryRegisterService,
    item: ItemId,
    admin: Actor,
}

async fn fixture() -> Fixture {
    let items = Arc::new(InMemoryItemDirectory::new());
    let item = items.create();
    let service = InMemoryRegisterService::new(
        Arc::new(InMemoryLedgerStore::default()),
        Arc::new(InMemoryAuthorizationStore::new()),
        items,
        Arc::new(RecordingAuditRecorder::new()),
        RegisterSettings::default(),
    );
    let admin = Actor::new(UserId::new(), "Head Pharmacist");
    service
        .grant_authorization(&admin, admin.user_id, "Head Pharmacist", AuthorizationTier::Full)
        .await
        .unwrap();
    Fixture {
        service,
        item,
        admin,
    }
}

async fn apply(f: &Fixture, actor: &Actor, op: &Op) -> Result<(), RegisterError> {
    let item_id = f.item;
    let unit = "ampoule".to_string();
    match op {
        Op::Receive(q) => f
            .service
            .receive(
                actor,
                ReceiptRequest {
                    item_id,
                    quantity: *q,
                    unit,
                    supplier_name: None,
                    delivery_note_number: None,
                    notes: None,
                },
            )
            .await
            .map(|_| ()),
        Op::Dispense(q) => f
            .service
            .dispense(
                actor,
                DispenseRequest {
                    item_id,
                    quantity: *q,
                    unit,
                    patient_identifier: Some("P-1".to_string()),
                    prescribing_clinician: Some("Dr. C".to_string()),
                    purpose: None,
                    notes: None,
                },
            )
            .await
            .map(|_| ()),
        Op::Dispose(q) => f
            .service
            .dispose(
                actor,
                DisposalRequest {
                    item_id,
                    quantity: *q,
                    unit,
                    disposal_method: None,
                    witness: Some("Independent Witness".to_string()),
                    notes: None,
                },
            )
            .await
            .map(|_| ()),
        Op::Count(q) => f
            .service
            .inventory_check(
                actor,
                InventoryCheckRequest {
                    item_id,
                    quantity: *q,
                    unit,
                    notes: None,
                },
            )
            .await
            .map(|_| ()),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Whatever the operation stream, the stored register replays to the
    /// stored state and accepted calls match the entry count.
    #[test]
    fn prop_register_replays_to_balance(
        ops in prop::collection::vec(op_strategy(), 1..25),
    ) {
        runtime().block_on(async {
            let f = fixture().await;
            let mut accepted = 0i64;
            for op in &ops {
                match apply(&f, &f.admin, op).await {
                    Ok(()) => accepted += 1,
                    Err(RegisterError::InsufficientBalance { .. }) => {}
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }

            let balance = f.service.balance(f.item).await.unwrap();
            assert_eq!(balance.last_sequence_number, accepted);
            assert!(!balance.balance.is_sign_negative() || balance.balance.is_zero());

            let report = f.service.verify_item(&f.admin, f.item).await.unwrap();
            assert!(report.is_consistent(), "{:?}", report.violation);
            assert_eq!(report.entries_checked, u64::try_from(accepted).unwrap());
        });
    }

    /// A user below the required tier never gets an entry written.
    #[test]
    fn prop_tier_enforced(
        tier in tier_strategy(),
        op in op_strategy(),
    ) {
        runtime().block_on(async {
            let f = fixture().await;
            let user = Actor::new(UserId::new(), "Nurse A");
            f.service
                .grant_authorization(&f.admin, user.user_id, "Nurse A", tier)
                .await
                .unwrap();

            // Give dispenses and disposals something to draw from.
            apply(&f, &f.admin, &Op::Receive(Decimal::new(10_000, 0))).await.unwrap();

            let required = match op {
                Op::Dispense(_) => AuthorizationTier::DispenseOnly,
                _ => AuthorizationTier::Full,
            };
            let result = apply(&f, &user, &op).await;

            if tier >= required {
                assert!(result.is_ok(), "{result:?}");
            } else {
                assert!(
                    matches!(result, Err(RegisterError::InsufficientTier { .. })),
                    "{result:?}"
                );
                let page = f
                    .service
                    .register(&f.admin, f.item, PageRequest::default())
                    .await
                    .unwrap();
                assert_eq!(page.meta.total, 1);
            }
        });
    }
}
