//! In-memory item directory.

use custodia_shared::types::ItemId;
use dashmap::DashSet;

use crate::register::{ItemDirectory, RegisterError};

/// Set of known items.
#[derive(Debug, Default)]
pub struct InMemoryItemDirectory {
    items: DashSet<ItemId>,
}

impl InMemoryItemDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an item.
    pub fn add(&self, item_id: ItemId) {
        self.items.insert(item_id);
    }

    /// Creates and registers a new item.
    pub fn create(&self) -> ItemId {
        let item_id = ItemId::new();
        self.add(item_id);
        item_id
    }
}

impl ItemDirectory for InMemoryItemDirectory {
    async fn item_exists(&self, item_id: ItemId) -> Result<bool, RegisterError> {
        Ok(self.items.contains(&item_id))
    }
}
