//! Persistence ports of the register.
//!
//! These traits are implemented by the in-process stores in
//! [`crate::memory`] and by the PostgreSQL repositories of the db crate.
//! There is no update or delete operation on register entries.

use std::future::Future;

use chrono::{DateTime, Utc};
use custodia_shared::types::{AuthorizationId, ItemId, PageRequest, RegisterEntryId, UserId};

use super::audit::AuditEvent;
use super::authorization::AuthorizedPerson;
use super::balance::ItemState;
use super::error::RegisterError;
use super::types::{Actor, EntryDraft, LedgerEntry};

/// Append-only storage of register entries.
pub trait LedgerStore: Send + Sync {
    /// Read the current state of an item. Items without entries are at
    /// `(0, 0)`.
    fn current_state(
        &self,
        item_id: ItemId,
    ) -> impl Future<Output = Result<ItemState, RegisterError>> + Send;

    /// Append `draft` to its item's register.
    ///
    /// Implementations take an exclusive per-item lock, read the item state,
    /// run [`BalanceEngine::apply`](super::balance::BalanceEngine::apply),
    /// persist the entry and advance the state before releasing the lock.
    /// Failing to get the lock in time yields `Conflict`; a rejected balance
    /// check yields `InsufficientBalance`. Either way nothing is written.
    fn append(
        &self,
        draft: EntryDraft,
    ) -> impl Future<Output = Result<LedgerEntry, RegisterError>> + Send;

    /// Find an entry by id.
    fn find_entry(
        &self,
        id: RegisterEntryId,
    ) -> impl Future<Output = Result<Option<LedgerEntry>, RegisterError>> + Send;

    /// List an item's entries in ascending sequence order, with the total
    /// number of entries.
    fn list_by_item(
        &self,
        item_id: ItemId,
        page: PageRequest,
    ) -> impl Future<Output = Result<(Vec<LedgerEntry>, u64), RegisterError>> + Send;
}

/// Storage of authorization records.
pub trait AuthorizationStore: Send + Sync {
    /// Insert a new active record.
    ///
    /// Fails with `AlreadyAuthorized` if the user already has an active
    /// record; the check and the insert are atomic.
    fn insert(
        &self,
        record: AuthorizedPerson,
    ) -> impl Future<Output = Result<AuthorizedPerson, RegisterError>> + Send;

    /// Find the active record of a user.
    fn find_active(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<AuthorizedPerson>, RegisterError>> + Send;

    /// Mark a record revoked.
    ///
    /// A record that is already revoked is returned unchanged.
    fn mark_revoked(
        &self,
        id: AuthorizationId,
        revoked_by: &Actor,
        revoked_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<AuthorizedPerson, RegisterError>> + Send;

    /// List active records ordered by user name.
    fn list_active(
        &self,
    ) -> impl Future<Output = Result<Vec<AuthorizedPerson>, RegisterError>> + Send;
}

/// Lookup of the items the register may hold entries for.
pub trait ItemDirectory: Send + Sync {
    /// Returns true if the item exists.
    fn item_exists(
        &self,
        item_id: ItemId,
    ) -> impl Future<Output = Result<bool, RegisterError>> + Send;
}

/// Sink for audit events.
pub trait AuditRecorder: Send + Sync {
    /// Record one event.
    fn record(
        &self,
        event: AuditEvent,
    ) -> impl Future<Output = Result<(), RegisterError>> + Send;
}
