//! PostgreSQL register store.
//!
//! Appends run in one database transaction: the item's state row is created
//! if missing, locked with `SELECT ... FOR UPDATE`, checked by the balance
//! engine, and advanced together with the entry insert. `lock_timeout` bounds
//! the wait for the row lock.

use std::time::Duration;

use chrono::Utc;
use custodia_core::register::{
    BalanceEngine, CorrectionDirection, EntryDetails, EntryDraft, EntryType, ItemState,
    LedgerEntry, LedgerStore, RegisterError,
};
use custodia_shared::types::{ItemId, PageRequest, RegisterEntryId, UserId};
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};

use crate::entities::{register_entries, register_item_state};
use crate::error::map_db_error;

/// Register store over PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    db: DatabaseConnection,
    lock_timeout: Duration,
}

impl PgLedgerStore {
    /// Creates a store whose appends wait at most `lock_timeout` for the
    /// item's row lock.
    #[must_use]
    pub const fn new(db: DatabaseConnection, lock_timeout: Duration) -> Self {
        Self { db, lock_timeout }
    }

    /// Returns the configured lock timeout.
    #[must_use]
    pub const fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    fn lock_timeout_sql(&self) -> String {
        // PostgreSQL reads 0 as "wait forever".
        format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout.as_millis().max(1)
        )
    }
}

/// Ensures the item's state row exists and locks it for the rest of `txn`.
async fn lock_item_state(
    txn: &DatabaseTransaction,
    item_id: ItemId,
) -> Result<ItemState, RegisterError> {
    register_item_state::Entity::insert(register_item_state::ActiveModel {
        item_id: Set(item_id.into_inner()),
        balance: Set(Decimal::ZERO),
        last_sequence_number: Set(0),
        updated_at: Set(Utc::now().into()),
    })
    .on_conflict(
        OnConflict::column(register_item_state::Column::ItemId)
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(txn)
    .await
    .map_err(map_db_error)?;

    let row = register_item_state::Entity::find_by_id(item_id.into_inner())
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| RegisterError::Internal(format!("state row missing for item {item_id}")))?;

    Ok(state_from_model(&row))
}

fn state_from_model(row: &register_item_state::Model) -> ItemState {
    ItemState {
        item_id: ItemId::from_uuid(row.item_id),
        balance: row.balance,
        last_sequence_number: row.last_sequence_number,
    }
}

fn corrupt_row(id: uuid::Uuid, column: &str) -> RegisterError {
    RegisterError::Storage(format!("register entry {id} has an invalid {column}"))
}

/// Flattens an entry into its table row.
pub(crate) fn entry_to_model(entry: &LedgerEntry) -> register_entries::Model {
    let mut row = register_entries::Model {
        id: entry.id.into_inner(),
        item_id: entry.item_id.into_inner(),
        sequence_number: entry.sequence_number,
        entry_type: entry.entry_type().as_str().to_string(),
        quantity: entry.quantity,
        unit: entry.unit.clone(),
        running_balance: entry.running_balance,
        supplier_name: None,
        delivery_note_number: None,
        patient_identifier: None,
        prescribing_clinician: None,
        purpose: None,
        disposal_method: None,
        witness: None,
        reason: None,
        corrects_entry_id: None,
        correction_direction: None,
        performed_by: entry.performed_by.into_inner(),
        performed_by_name: entry.performed_by_name.clone(),
        notes: entry.notes.clone(),
        created_at: entry.created_at.into(),
    };

    match &entry.details {
        EntryDetails::Receipt {
            supplier_name,
            delivery_note_number,
        } => {
            row.supplier_name.clone_from(supplier_name);
            row.delivery_note_number.clone_from(delivery_note_number);
        }
        EntryDetails::Dispense {
            patient_identifier,
            prescribing_clinician,
            purpose,
        } => {
            row.patient_identifier = Some(patient_identifier.clone());
            row.prescribing_clinician = Some(prescribing_clinician.clone());
            row.purpose.clone_from(purpose);
        }
        EntryDetails::Disposal {
            disposal_method,
            witness,
        } => {
            row.disposal_method.clone_from(disposal_method);
            row.witness = Some(witness.clone());
        }
        EntryDetails::Correction {
            reason,
            corrects_entry_id,
            direction,
        } => {
            row.reason = Some(reason.clone());
            row.corrects_entry_id = Some(corrects_entry_id.into_inner());
            row.correction_direction = Some(direction.as_str().to_string());
        }
        EntryDetails::InventoryCheck => {}
    }

    row
}

/// Rebuilds an entry from its table row.
///
/// # Errors
///
/// Returns `Storage` if the row does not describe a valid entry.
pub(crate) fn entry_from_model(row: register_entries::Model) -> Result<LedgerEntry, RegisterError> {
    let id = row.id;
    let entry_type =
        EntryType::parse(&row.entry_type).ok_or_else(|| corrupt_row(id, "entry_type"))?;

    let details = match entry_type {
        EntryType::Receipt => EntryDetails::Receipt {
            supplier_name: row.supplier_name,
            delivery_note_number: row.delivery_note_number,
        },
        EntryType::Dispense => EntryDetails::Dispense {
            patient_identifier: row
                .patient_identifier
                .ok_or_else(|| corrupt_row(id, "patient_identifier"))?,
            prescribing_clinician: row
                .prescribing_clinician
                .ok_or_else(|| corrupt_row(id, "prescribing_clinician"))?,
            purpose: row.purpose,
        },
        EntryType::Disposal => EntryDetails::Disposal {
            disposal_method: row.disposal_method,
            witness: row.witness.ok_or_else(|| corrupt_row(id, "witness"))?,
        },
        EntryType::Correction => EntryDetails::Correction {
            reason: row.reason.ok_or_else(|| corrupt_row(id, "reason"))?,
            corrects_entry_id: row
                .corrects_entry_id
                .map(RegisterEntryId::from_uuid)
                .ok_or_else(|| corrupt_row(id, "corrects_entry_id"))?,
            direction: row
                .correction_direction
                .as_deref()
                .and_then(CorrectionDirection::parse)
                .ok_or_else(|| corrupt_row(id, "correction_direction"))?,
        },
        EntryType::InventoryCheck => EntryDetails::InventoryCheck,
    };

    Ok(LedgerEntry {
        id: RegisterEntryId::from_uuid(id),
        item_id: ItemId::from_uuid(row.item_id),
        sequence_number: row.sequence_number,
        quantity: row.quantity,
        unit: row.unit,
        running_balance: row.running_balance,
        details,
        performed_by: UserId::from_uuid(row.performed_by),
        performed_by_name: row.performed_by_name,
        notes: row.notes,
        created_at: row.created_at.with_timezone(&Utc),
    })
}

impl LedgerStore for PgLedgerStore {
    async fn current_state(&self, item_id: ItemId) -> Result<ItemState, RegisterError> {
        let row = register_item_state::Entity::find_by_id(item_id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_error)?;

        Ok(row.map_or_else(|| ItemState::empty(item_id), |r| state_from_model(&r)))
    }

    async fn append(&self, draft: EntryDraft) -> Result<LedgerEntry, RegisterError> {
        let item_id = draft.item_id;
        let txn = self.db.begin().await.map_err(map_db_error)?;

        txn.execute_unprepared(&self.lock_timeout_sql())
            .await
            .map_err(map_db_error)?;

        let state = lock_item_state(&txn, item_id).await?;
        tracing::debug!(
            item_id = %item_id,
            last_sequence_number = state.last_sequence_number,
            "Register row lock acquired"
        );

        // Dropping `txn` on the error path rolls back the state upsert.
        let posting = BalanceEngine::apply(&state, &draft)?;
        let entry = draft.into_entry(posting.sequence_number, posting.running_balance);

        entry_to_model(&entry)
            .into_active_model()
            .insert(&txn)
            .await
            .map_err(map_db_error)?;

        register_item_state::ActiveModel {
            item_id: Set(item_id.into_inner()),
            balance: Set(entry.running_balance),
            last_sequence_number: Set(entry.sequence_number),
            updated_at: Set(Utc::now().into()),
        }
        .update(&txn)
        .await
        .map_err(map_db_error)?;

        txn.commit().await.map_err(map_db_error)?;

        Ok(entry)
    }

    async fn find_entry(&self, id: RegisterEntryId) -> Result<Option<LedgerEntry>, RegisterError> {
        register_entries::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_error)?
            .map(entry_from_model)
            .transpose()
    }

    async fn list_by_item(
        &self,
        item_id: ItemId,
        page: PageRequest,
    ) -> Result<(Vec<LedgerEntry>, u64), RegisterError> {
        let query = register_entries::Entity::find()
            .filter(register_entries::Column::ItemId.eq(item_id.into_inner()));

        let total = query.clone().count(&self.db).await.map_err(map_db_error)?;

        let entries = query
            .order_by_asc(register_entries::Column::SequenceNumber)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(entry_from_model)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((entries, total))
    }
}
