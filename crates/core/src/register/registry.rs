//! Authorization registry.
//!
//! Grants, revokes and looks up authorization records. Administrative rights
//! to call these operations are checked by the caller. Lookups always hit the
//! store, so a revocation takes effect on the very next request.

use std::sync::Arc;

use chrono::Utc;
use custodia_shared::types::{AuthorizationId, UserId};

use super::authorization::{AuthorizationGate, AuthorizationTier, AuthorizedPerson};
use super::error::RegisterError;
use super::store::AuthorizationStore;
use super::types::Actor;
use super::validation::{NAME_MAX_LEN, check_length};

/// Lifecycle and lookup of authorized-person records.
pub struct AuthorizationRegistry<A: AuthorizationStore> {
    store: Arc<A>,
}

impl<A: AuthorizationStore> Clone for AuthorizationRegistry<A> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<A: AuthorizationStore> AuthorizationRegistry<A> {
    /// Create a registry over `store`.
    #[must_use]
    pub fn new(store: Arc<A>) -> Self {
        Self { store }
    }

    /// Grant `tier` to a user.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if a name is blank or too long to store, and
    /// `AlreadyAuthorized` if the user already holds an active record.
    /// Changing a tier means revoking and granting again.
    pub async fn grant(
        &self,
        user_id: UserId,
        user_name: &str,
        tier: AuthorizationTier,
        granted_by: &Actor,
    ) -> Result<AuthorizedPerson, RegisterError> {
        let user_name = user_name.trim();
        if user_name.is_empty() {
            return Err(RegisterError::validation("user_name", "is required"));
        }
        check_length("user_name", user_name, NAME_MAX_LEN)?;
        check_length("authorized_by_name", &granted_by.display_name, NAME_MAX_LEN)?;

        let record = AuthorizedPerson {
            id: AuthorizationId::new(),
            user_id,
            user_name: user_name.to_string(),
            tier,
            authorized_by: granted_by.user_id,
            authorized_by_name: granted_by.display_name.clone(),
            authorized_at: Utc::now(),
            revoked_at: None,
            revoked_by: None,
            revoked_by_name: None,
        };

        let record = self.store.insert(record).await?;

        tracing::info!(
            authorization_id = %record.id,
            user_id = %record.user_id,
            tier = %record.tier,
            granted_by = %granted_by.user_id,
            "Controlled-substance authorization granted"
        );

        Ok(record)
    }

    /// Revoke an authorization record.
    ///
    /// Revoking an already revoked record succeeds and leaves it unchanged.
    ///
    /// # Errors
    ///
    /// Returns `AuthorizationNotFound` if no record has this id, or
    /// `Validation` if the revoker's name is too long to store.
    pub async fn revoke(
        &self,
        id: AuthorizationId,
        revoked_by: &Actor,
    ) -> Result<AuthorizedPerson, RegisterError> {
        check_length("revoked_by_name", &revoked_by.display_name, NAME_MAX_LEN)?;
        let record = self.store.mark_revoked(id, revoked_by, Utc::now()).await?;

        tracing::info!(
            authorization_id = %record.id,
            user_id = %record.user_id,
            revoked_by = %revoked_by.user_id,
            "Controlled-substance authorization revoked"
        );

        Ok(record)
    }

    /// Returns the active record of a user, if any.
    pub async fn active_for(
        &self,
        user_id: UserId,
    ) -> Result<Option<AuthorizedPerson>, RegisterError> {
        self.store.find_active(user_id).await
    }

    /// Check that a user may perform an operation requiring `required`.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthorized` or `InsufficientTier`.
    pub async fn authorize(
        &self,
        user_id: UserId,
        required: AuthorizationTier,
    ) -> Result<AuthorizationTier, RegisterError> {
        let record = self.store.find_active(user_id).await?;
        AuthorizationGate::authorize(user_id, record.as_ref(), required)
    }

    /// Returns true if the user currently holds at least `required`.
    pub async fn is_authorized(
        &self,
        user_id: UserId,
        required: AuthorizationTier,
    ) -> Result<bool, RegisterError> {
        match self.authorize(user_id, required).await {
            Ok(_) => Ok(true),
            Err(RegisterError::NotAuthorized { .. } | RegisterError::InsufficientTier { .. }) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// List active records ordered by user name.
    pub async fn list_active(&self) -> Result<Vec<AuthorizedPerson>, RegisterError> {
        self.store.list_active().await
    }
}
