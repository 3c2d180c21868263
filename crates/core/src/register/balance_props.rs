//! Property-based tests for the balance engine.
//!
//! Random operation streams are fed through `BalanceEngine::apply`; accepted
//! entries must replay to the same state, and rejected ones must leave no
//! trace.

use chrono::Utc;
use custodia_shared::types::{ItemId, RegisterEntryId, UserId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::balance::{BalanceEngine, ItemState};
use super::error::RegisterError;
use super::types::{CorrectionDirection, EntryDetails, EntryDraft, LedgerEntry};

/// Strategy to generate quantities (0.01 to 500.00).
fn quantity() -> impl Strategy<Value = Decimal> {
    (1i64..50_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate entry details of every type.
fn details_strategy() -> impl Strategy<Value = EntryDetails> {
    prop_oneof![
        Just(EntryDetails::Receipt {
            supplier_name: None,
            delivery_note_number: None,
        }),
        Just(EntryDetails::Dispense {
            patient_identifier: "P-1".to_string(),
            prescribing_clinician: "Dr. C".to_string(),
            purpose: None,
        }),
        Just(EntryDetails::Disposal {
            disposal_method: None,
            witness: "Nurse A".to_string(),
        }),
        prop_oneof![
            Just(CorrectionDirection::Increase),
            Just(CorrectionDirection::Decrease)
        ]
        .prop_map(|direction| EntryDetails::Correction {
            reason: "miscount".to_string(),
            corrects_entry_id: RegisterEntryId::new(),
            direction,
        }),
        Just(EntryDetails::InventoryCheck),
    ]
}

fn make_draft(item_id: ItemId, details: EntryDetails, quantity: Decimal) -> EntryDraft {
    EntryDraft {
        id: RegisterEntryId::new(),
        item_id,
        quantity,
        unit: "ampoule".to_string(),
        details,
        performed_by: UserId::new(),
        performed_by_name: "Dr. B".to_string(),
        notes: None,
        created_at: Utc::now(),
    }
}

/// Appends every operation the engine accepts, returning the register and
/// the final state.
fn run(item_id: ItemId, ops: Vec<(EntryDetails, Decimal)>) -> (Vec<LedgerEntry>, ItemState, usize) {
    let mut state = ItemState::empty(item_id);
    let mut entries = Vec::new();
    let mut rejected = 0;

    for (details, quantity) in ops {
        let draft = make_draft(item_id, details, quantity);
        match BalanceEngine::apply(&state, &draft) {
            Ok(posting) => {
                let entry = draft.into_entry(posting.sequence_number, posting.running_balance);
                state = state.advanced_by(&entry);
                entries.push(entry);
            }
            Err(RegisterError::InsufficientBalance { available, requested }) => {
                assert_eq!(available, state.balance);
                assert!(requested > available);
                rejected += 1;
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    (entries, state, rejected)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The balance never goes below zero, whatever the operation stream.
    #[test]
    fn prop_balance_never_negative(
        ops in prop::collection::vec((details_strategy(), quantity()), 0..40),
    ) {
        let (entries, state, _) = run(ItemId::new(), ops);

        prop_assert!(!state.balance.is_sign_negative() || state.balance.is_zero());
        for entry in &entries {
            prop_assert!(
                !entry.running_balance.is_sign_negative() || entry.running_balance.is_zero()
            );
        }
    }

    /// Sequence numbers of accepted entries are exactly 1..=N.
    #[test]
    fn prop_sequence_contiguous(
        ops in prop::collection::vec((details_strategy(), quantity()), 0..40),
    ) {
        let total = ops.len();
        let (entries, state, rejected) = run(ItemId::new(), ops);

        prop_assert_eq!(entries.len() + rejected, total);
        for (i, entry) in entries.iter().enumerate() {
            prop_assert_eq!(entry.sequence_number, i64::try_from(i).unwrap() + 1);
        }
        prop_assert_eq!(state.last_sequence_number, i64::try_from(entries.len()).unwrap());
    }

    /// Replaying the accepted entries reproduces the tracked state, and the
    /// balance equals the sum of all deltas.
    #[test]
    fn prop_replay_reproduces_state(
        ops in prop::collection::vec((details_strategy(), quantity()), 0..40),
    ) {
        let item = ItemId::new();
        let (entries, state, _) = run(item, ops);

        let replayed = BalanceEngine::replay(item, &entries);
        prop_assert_eq!(replayed, Ok(state));

        let sum: Decimal = entries
            .iter()
            .map(|e| BalanceEngine::delta(&e.details, e.quantity))
            .sum();
        prop_assert_eq!(sum, state.balance);
    }

    /// Inventory checks never move the balance.
    #[test]
    fn prop_inventory_check_is_neutral(
        balance in quantity(),
        counted in quantity(),
        last in 0i64..1_000,
    ) {
        let item = ItemId::new();
        let state = ItemState { item_id: item, balance, last_sequence_number: last };
        let posting = BalanceEngine::apply(
            &state,
            &make_draft(item, EntryDetails::InventoryCheck, counted),
        ).unwrap();

        prop_assert_eq!(posting.running_balance, balance);
        prop_assert_eq!(posting.sequence_number, last + 1);
    }
}
