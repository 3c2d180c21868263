//! PostgreSQL authorization store.
//!
//! The partial unique index on active records makes the "one active record
//! per user" check atomic with the insert.

use chrono::{DateTime, Utc};
use custodia_core::register::{
    Actor, AuthorizationStore, AuthorizationTier, AuthorizedPerson, RegisterError,
};
use custodia_shared::types::{AuthorizationId, UserId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::entities::authorized_personnel;
use crate::error::{is_unique_violation, map_db_error};

/// Authorization store over PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgAuthorizationStore {
    db: DatabaseConnection,
}

impl PgAuthorizationStore {
    /// Creates a new authorization store.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn person_to_model(person: &AuthorizedPerson) -> authorized_personnel::Model {
    authorized_personnel::Model {
        id: person.id.into_inner(),
        user_id: person.user_id.into_inner(),
        user_name: person.user_name.clone(),
        tier: person.tier.as_str().to_string(),
        authorized_by: person.authorized_by.into_inner(),
        authorized_by_name: person.authorized_by_name.clone(),
        authorized_at: person.authorized_at.into(),
        revoked_at: person.revoked_at.map(Into::into),
        revoked_by: person.revoked_by.map(UserId::into_inner),
        revoked_by_name: person.revoked_by_name.clone(),
    }
}

fn person_from_model(row: authorized_personnel::Model) -> Result<AuthorizedPerson, RegisterError> {
    let tier = AuthorizationTier::parse(&row.tier).ok_or_else(|| {
        RegisterError::Storage(format!(
            "authorization {} has an invalid tier '{}'",
            row.id, row.tier
        ))
    })?;

    Ok(AuthorizedPerson {
        id: AuthorizationId::from_uuid(row.id),
        user_id: UserId::from_uuid(row.user_id),
        user_name: row.user_name,
        tier,
        authorized_by: UserId::from_uuid(row.authorized_by),
        authorized_by_name: row.authorized_by_name,
        authorized_at: row.authorized_at.with_timezone(&Utc),
        revoked_at: row.revoked_at.map(|at| at.with_timezone(&Utc)),
        revoked_by: row.revoked_by.map(UserId::from_uuid),
        revoked_by_name: row.revoked_by_name,
    })
}

impl AuthorizationStore for PgAuthorizationStore {
    async fn insert(&self, record: AuthorizedPerson) -> Result<AuthorizedPerson, RegisterError> {
        let user_id = record.user_id;

        let row = person_to_model(&record)
            .into_active_model()
            .insert(&self.db)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    RegisterError::AlreadyAuthorized(user_id)
                } else {
                    map_db_error(err)
                }
            })?;

        person_from_model(row)
    }

    async fn find_active(
        &self,
        user_id: UserId,
    ) -> Result<Option<AuthorizedPerson>, RegisterError> {
        authorized_personnel::Entity::find()
            .filter(authorized_personnel::Column::UserId.eq(user_id.into_inner()))
            .filter(authorized_personnel::Column::RevokedAt.is_null())
            .one(&self.db)
            .await
            .map_err(map_db_error)?
            .map(person_from_model)
            .transpose()
    }

    async fn mark_revoked(
        &self,
        id: AuthorizationId,
        revoked_by: &Actor,
        revoked_at: DateTime<Utc>,
    ) -> Result<AuthorizedPerson, RegisterError> {
        let txn = self.db.begin().await.map_err(map_db_error)?;

        let row = authorized_personnel::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(map_db_error)?
            .ok_or(RegisterError::AuthorizationNotFound(id))?;

        if row.revoked_at.is_some() {
            return person_from_model(row);
        }

        let mut active = row.into_active_model();
        active.revoked_at = Set(Some(revoked_at.into()));
        active.revoked_by = Set(Some(revoked_by.user_id.into_inner()));
        active.revoked_by_name = Set(Some(revoked_by.display_name.clone()));
        let row = active.update(&txn).await.map_err(map_db_error)?;

        txn.commit().await.map_err(map_db_error)?;

        person_from_model(row)
    }

    async fn list_active(&self) -> Result<Vec<AuthorizedPerson>, RegisterError> {
        authorized_personnel::Entity::find()
            .filter(authorized_personnel::Column::RevokedAt.is_null())
            .order_by_asc(authorized_personnel::Column::UserName)
            .all(&self.db)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(person_from_model)
            .collect()
    }
}
