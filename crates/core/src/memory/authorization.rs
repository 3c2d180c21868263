//! In-memory authorization store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use custodia_shared::types::{AuthorizationId, UserId};
use tokio::sync::Mutex;

use crate::register::{Actor, AuthorizationStore, AuthorizedPerson, RegisterError};

/// In-memory authorization records.
///
/// A single mutex covers all records so that the one-active-record-per-user
/// check and the insert happen atomically.
#[derive(Debug, Default)]
pub struct InMemoryAuthorizationStore {
    records: Mutex<HashMap<AuthorizationId, AuthorizedPerson>>,
}

impl InMemoryAuthorizationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuthorizationStore for InMemoryAuthorizationStore {
    async fn insert(&self, record: AuthorizedPerson) -> Result<AuthorizedPerson, RegisterError> {
        let mut records = self.records.lock().await;

        if records
            .values()
            .any(|r| r.user_id == record.user_id && r.is_active())
        {
            return Err(RegisterError::AlreadyAuthorized(record.user_id));
        }

        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_active(
        &self,
        user_id: UserId,
    ) -> Result<Option<AuthorizedPerson>, RegisterError> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .find(|r| r.user_id == user_id && r.is_active())
            .cloned())
    }

    async fn mark_revoked(
        &self,
        id: AuthorizationId,
        revoked_by: &Actor,
        revoked_at: DateTime<Utc>,
    ) -> Result<AuthorizedPerson, RegisterError> {
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(&id)
            .ok_or(RegisterError::AuthorizationNotFound(id))?;

        if record.is_active() {
            record.revoked_at = Some(revoked_at);
            record.revoked_by = Some(revoked_by.user_id);
            record.revoked_by_name = Some(revoked_by.display_name.clone());
        }

        Ok(record.clone())
    }

    async fn list_active(&self) -> Result<Vec<AuthorizedPerson>, RegisterError> {
        let mut active: Vec<AuthorizedPerson> = self
            .records
            .lock()
            .await
            .values()
            .filter(|r| r.is_active())
            .cloned()
            .collect();
        active.sort_by(|a, b| a.user_name.cmp(&b.user_name));
        Ok(active)
    }
}
