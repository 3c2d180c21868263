//! Audit events emitted after successful register writes.

use custodia_shared::types::{ItemId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::types::LedgerEntry;

/// Entity type reported for every register event.
pub const ENTITY_TYPE: &str = "controlled_substance";

/// One audit trail record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Always [`ENTITY_TYPE`].
    pub entity_type: String,
    /// The item the entry was written for.
    pub entity_id: ItemId,
    /// Action name, e.g. `btm_dispense`.
    pub action: String,
    /// The performing user.
    pub performed_by: UserId,
    /// Entry details.
    pub metadata: Value,
}

impl AuditEvent {
    /// Builds the event describing a freshly appended entry.
    ///
    /// Metadata carries quantity, unit, sequence number, running balance,
    /// entry id and the type-specific fields of the entry.
    #[must_use]
    pub fn for_entry(entry: &LedgerEntry) -> Self {
        let mut metadata = Map::new();
        metadata.insert("entry_id".into(), json!(entry.id));
        metadata.insert("quantity".into(), json!(entry.quantity.to_string()));
        metadata.insert("unit".into(), json!(entry.unit));
        metadata.insert("sequence_number".into(), json!(entry.sequence_number));
        metadata.insert(
            "running_balance".into(),
            json!(entry.running_balance.to_string()),
        );
        if let Ok(Value::Object(details)) = serde_json::to_value(&entry.details) {
            metadata.extend(details);
        }

        Self {
            entity_type: ENTITY_TYPE.to_string(),
            entity_id: entry.item_id,
            action: entry.entry_type().audit_action().to_string(),
            performed_by: entry.performed_by,
            metadata: Value::Object(metadata),
        }
    }

    /// Adds a metadata field.
    #[must_use]
    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        if let Value::Object(map) = &mut self.metadata {
            map.insert(key.to_string(), value);
        }
        self
    }
}
