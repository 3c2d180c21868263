//! Balance engine for the controlled-substance register.
//!
//! Each entry type has a fixed signed effect on the item balance:
//! - receipt: `+quantity`
//! - dispense, disposal: `-quantity`
//! - correction: `+quantity` or `-quantity` depending on its direction
//! - inventory check: no effect
//!
//! The balance of an item never drops below zero, and the running balance of
//! the latest entry always equals the replay of every entry before it.

use custodia_shared::types::ItemId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::error::RegisterError;
use super::types::{CorrectionDirection, EntryDetails, EntryDraft, LedgerEntry};

/// Current balance and position of an item's register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemState {
    /// The item.
    pub item_id: ItemId,
    /// Balance after the latest entry.
    pub balance: Decimal,
    /// Sequence number of the latest entry, 0 when the register is empty.
    pub last_sequence_number: i64,
}

/// Balance of an item as reported to callers.
pub type ItemBalance = ItemState;

impl ItemState {
    /// State of an item without entries.
    #[must_use]
    pub const fn empty(item_id: ItemId) -> Self {
        Self {
            item_id,
            balance: Decimal::ZERO,
            last_sequence_number: 0,
        }
    }

    /// Returns the state after `entry` has been appended.
    #[must_use]
    pub const fn advanced_by(&self, entry: &LedgerEntry) -> Self {
        Self {
            item_id: self.item_id,
            balance: entry.running_balance,
            last_sequence_number: entry.sequence_number,
        }
    }
}

/// Where a draft lands in the register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    /// Sequence number assigned to the entry.
    pub sequence_number: i64,
    /// Balance before the entry.
    pub previous_balance: Decimal,
    /// Signed balance change of the entry.
    pub delta: Decimal,
    /// Balance right after the entry.
    pub running_balance: Decimal,
}

/// A register whose stored entries do not replay to a consistent state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityViolation {
    /// Sequence numbers are not contiguous from 1.
    #[error("Sequence gap: expected entry {expected}, found {found}")]
    SequenceGap {
        /// Next sequence number the replay expected.
        expected: i64,
        /// Sequence number actually stored.
        found: i64,
    },

    /// A stored running balance differs from the replayed one.
    #[error("Balance mismatch at entry {sequence_number}: replayed {replayed}, stored {recorded}")]
    RunningBalanceMismatch {
        /// Entry where the mismatch occurs.
        sequence_number: i64,
        /// Balance computed by replay.
        replayed: Decimal,
        /// Balance stored on the entry.
        recorded: Decimal,
    },

    /// The balance went below zero.
    #[error("Negative balance {balance} at entry {sequence_number}")]
    NegativeBalance {
        /// Entry where the balance went negative.
        sequence_number: i64,
        /// The negative balance.
        balance: Decimal,
    },

    /// The replayed balance left the representable range.
    #[error("Balance overflow at entry {sequence_number}")]
    BalanceOverflow {
        /// Entry whose delta could not be added.
        sequence_number: i64,
    },

    /// An entry belongs to a different item.
    #[error("Entry {sequence_number} belongs to another item")]
    ForeignEntry {
        /// Offending entry.
        sequence_number: i64,
    },

    /// The stored item state differs from the replayed register.
    #[error(
        "Stored state (entry {stored_sequence}, balance {stored_balance}) differs from replay \
         (entry {replayed_sequence}, balance {replayed_balance})"
    )]
    StateMismatch {
        /// Last sequence number in the stored state.
        stored_sequence: i64,
        /// Balance in the stored state.
        stored_balance: Decimal,
        /// Last sequence number reached by replay.
        replayed_sequence: i64,
        /// Balance reached by replay.
        replayed_balance: Decimal,
    },
}

impl IntegrityViolation {
    /// Compares a stored state against a replayed one.
    ///
    /// # Errors
    ///
    /// Returns `StateMismatch` when the two disagree.
    pub fn check_state(stored: &ItemState, replayed: &ItemState) -> Result<(), Self> {
        if stored.balance == replayed.balance
            && stored.last_sequence_number == replayed.last_sequence_number
        {
            return Ok(());
        }
        Err(Self::StateMismatch {
            stored_sequence: stored.last_sequence_number,
            stored_balance: stored.balance,
            replayed_sequence: replayed.last_sequence_number,
            replayed_balance: replayed.balance,
        })
    }
}

/// Pure balance computations.
pub struct BalanceEngine;

impl BalanceEngine {
    /// Signed balance change of an entry.
    #[must_use]
    pub fn delta(details: &EntryDetails, quantity: Decimal) -> Decimal {
        match details {
            EntryDetails::Receipt { .. } => quantity,
            EntryDetails::Dispense { .. } | EntryDetails::Disposal { .. } => -quantity,
            EntryDetails::Correction { direction, .. } => match direction {
                CorrectionDirection::Increase => quantity,
                CorrectionDirection::Decrease => -quantity,
            },
            EntryDetails::InventoryCheck => Decimal::ZERO,
        }
    }

    /// Place `draft` after `state`.
    ///
    /// `state` must be the item state read under the item lock, so that the
    /// balance check and the sequence number come from the same snapshot.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientBalance` if the entry would drive the balance
    /// below zero, and `Validation` on `quantity` if the new balance is not
    /// representable.
    pub fn apply(state: &ItemState, draft: &EntryDraft) -> Result<Posting, RegisterError> {
        let delta = Self::delta(&draft.details, draft.quantity);
        let running_balance = state.balance.checked_add(delta).ok_or_else(|| {
            RegisterError::validation("quantity", "exceeds the maximum register balance")
        })?;

        if running_balance.is_sign_negative() && !running_balance.is_zero() {
            return Err(RegisterError::InsufficientBalance {
                available: state.balance,
                requested: draft.quantity,
            });
        }

        let sequence_number = state
            .last_sequence_number
            .checked_add(1)
            .ok_or_else(|| RegisterError::Internal("sequence number overflow".to_string()))?;

        Ok(Posting {
            sequence_number,
            previous_balance: state.balance,
            delta,
            running_balance,
        })
    }

    /// Difference between a physical count and the book balance.
    ///
    /// Positive when more stock was counted than the register shows.
    #[must_use]
    pub fn discrepancy(counted: Decimal, book_balance: Decimal) -> Decimal {
        counted - book_balance
    }

    /// Replay `entries` (in sequence order) from an empty register.
    ///
    /// # Errors
    ///
    /// Returns the first integrity violation found.
    pub fn replay(
        item_id: ItemId,
        entries: &[LedgerEntry],
    ) -> Result<ItemState, IntegrityViolation> {
        let mut replayer = Replayer::new(item_id);
        for entry in entries {
            replayer.push(entry)?;
        }
        Ok(replayer.finish())
    }
}

/// Incremental replay, for registers read page by page.
#[derive(Debug, Clone)]
pub struct Replayer {
    state: ItemState,
}

impl Replayer {
    /// Starts a replay of an empty register.
    #[must_use]
    pub const fn new(item_id: ItemId) -> Self {
        Self {
            state: ItemState::empty(item_id),
        }
    }

    /// Folds the next entry into the replayed state.
    ///
    /// # Errors
    ///
    /// Returns the integrity violation `entry` introduces.
    pub fn push(&mut self, entry: &LedgerEntry) -> Result<(), IntegrityViolation> {
        if entry.item_id != self.state.item_id {
            return Err(IntegrityViolation::ForeignEntry {
                sequence_number: entry.sequence_number,
            });
        }

        let expected = self.state.last_sequence_number.saturating_add(1);
        if entry.sequence_number != expected {
            return Err(IntegrityViolation::SequenceGap {
                expected,
                found: entry.sequence_number,
            });
        }

        let replayed = self
            .state
            .balance
            .checked_add(BalanceEngine::delta(&entry.details, entry.quantity))
            .ok_or(IntegrityViolation::BalanceOverflow {
                sequence_number: entry.sequence_number,
            })?;
        if replayed != entry.running_balance {
            return Err(IntegrityViolation::RunningBalanceMismatch {
                sequence_number: entry.sequence_number,
                replayed,
                recorded: entry.running_balance,
            });
        }
        if replayed.is_sign_negative() && !replayed.is_zero() {
            return Err(IntegrityViolation::NegativeBalance {
                sequence_number: entry.sequence_number,
                balance: replayed,
            });
        }

        self.state = self.state.advanced_by(entry);
        Ok(())
    }

    /// Returns the replayed state so far.
    #[must_use]
    pub const fn state(&self) -> &ItemState {
        &self.state
    }

    /// Ends the replay.
    #[must_use]
    pub const fn finish(self) -> ItemState {
        self.state
    }
}
