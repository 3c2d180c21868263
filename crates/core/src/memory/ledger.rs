//! In-memory ledger store.

use std::sync::Arc;
use std::time::Duration;

use custodia_shared::types::{ItemId, PageRequest, RegisterEntryId};
use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};

use crate::register::{
    BalanceEngine, EntryDraft, ItemState, LedgerEntry, LedgerStore, RegisterError,
};

/// Register of one item.
#[derive(Debug)]
struct ItemLedger {
    state: ItemState,
    entries: Vec<LedgerEntry>,
}

impl ItemLedger {
    fn new(item_id: ItemId) -> Self {
        Self {
            state: ItemState::empty(item_id),
            entries: Vec::new(),
        }
    }
}

/// In-memory append-only register.
#[derive(Debug)]
pub struct InMemoryLedgerStore {
    items: DashMap<ItemId, Arc<Mutex<ItemLedger>>>,
    entries: DashMap<RegisterEntryId, LedgerEntry>,
    lock_timeout: Duration,
}

impl InMemoryLedgerStore {
    /// Creates an empty store whose appends wait at most `lock_timeout` for
    /// the item lock.
    #[must_use]
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            items: DashMap::new(),
            entries: DashMap::new(),
            lock_timeout,
        }
    }

    fn ledger_for(&self, item_id: ItemId) -> Arc<Mutex<ItemLedger>> {
        let ledger = self
            .items
            .entry(item_id)
            .or_insert_with(|| Arc::new(Mutex::new(ItemLedger::new(item_id))));
        Arc::clone(ledger.value())
    }

    async fn lock<'a>(
        &self,
        item_id: ItemId,
        ledger: &'a Mutex<ItemLedger>,
    ) -> Result<MutexGuard<'a, ItemLedger>, RegisterError> {
        tokio::time::timeout(self.lock_timeout, ledger.lock())
            .await
            .map_err(|_| {
                tracing::warn!(
                    item_id = %item_id,
                    timeout = ?self.lock_timeout,
                    "Register lock wait timed out"
                );
                RegisterError::Conflict(format!(
                    "timed out waiting for the register of item {item_id}"
                ))
            })
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl LedgerStore for InMemoryLedgerStore {
    async fn current_state(&self, item_id: ItemId) -> Result<ItemState, RegisterError> {
        let Some(ledger) = self.items.get(&item_id).map(|l| Arc::clone(l.value())) else {
            return Ok(ItemState::empty(item_id));
        };
        let guard = self.lock(item_id, &ledger).await?;
        Ok(guard.state)
    }

    async fn append(&self, draft: EntryDraft) -> Result<LedgerEntry, RegisterError> {
        let item_id = draft.item_id;
        let ledger = self.ledger_for(item_id);
        let mut guard = self.lock(item_id, &ledger).await?;
        tracing::debug!(item_id = %item_id, "Register lock acquired");

        let posting = BalanceEngine::apply(&guard.state, &draft)?;
        let entry = draft.into_entry(posting.sequence_number, posting.running_balance);

        guard.state = guard.state.advanced_by(&entry);
        guard.entries.push(entry.clone());
        self.entries.insert(entry.id, entry.clone());

        Ok(entry)
    }

    async fn find_entry(&self, id: RegisterEntryId) -> Result<Option<LedgerEntry>, RegisterError> {
        Ok(self.entries.get(&id).map(|e| e.clone()))
    }

    async fn list_by_item(
        &self,
        item_id: ItemId,
        page: PageRequest,
    ) -> Result<(Vec<LedgerEntry>, u64), RegisterError> {
        let Some(ledger) = self.items.get(&item_id).map(|l| Arc::clone(l.value())) else {
            return Ok((Vec::new(), 0));
        };
        let guard = self.lock(item_id, &ledger).await?;

        let total = u64::try_from(guard.entries.len()).unwrap_or(u64::MAX);
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        let entries = guard.entries.iter().skip(offset).take(limit).cloned().collect();

        Ok((entries, total))
    }
}
