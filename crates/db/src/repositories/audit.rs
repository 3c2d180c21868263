//! Audit log writer.

use chrono::Utc;
use custodia_core::register::{AuditEvent, AuditRecorder, RegisterError};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

use crate::entities::audit_log;
use crate::error::map_db_error;

/// Writes audit events to the `audit_log` table.
#[derive(Debug, Clone)]
pub struct PgAuditRecorder {
    db: DatabaseConnection,
}

impl PgAuditRecorder {
    /// Creates a new audit recorder.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl AuditRecorder for PgAuditRecorder {
    async fn record(&self, event: AuditEvent) -> Result<(), RegisterError> {
        audit_log::ActiveModel {
            id: Set(Uuid::now_v7()),
            entity_type: Set(event.entity_type),
            entity_id: Set(event.entity_id.into_inner()),
            action: Set(event.action),
            performed_by: Set(event.performed_by.into_inner()),
            metadata: Set(event.metadata),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }
}
