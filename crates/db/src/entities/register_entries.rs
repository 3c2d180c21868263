//! `SeaORM` Entity for register_entries table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "register_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub item_id: Uuid,
    pub sequence_number: i64,
    pub entry_type: String,
    pub quantity: Decimal,
    pub unit: String,
    pub running_balance: Decimal,
    pub supplier_name: Option<String>,
    pub delivery_note_number: Option<String>,
    pub patient_identifier: Option<String>,
    pub prescribing_clinician: Option<String>,
    pub purpose: Option<String>,
    pub disposal_method: Option<String>,
    pub witness: Option<String>,
    pub reason: Option<String>,
    pub corrects_entry_id: Option<Uuid>,
    pub correction_direction: Option<String>,
    pub performed_by: Uuid,
    pub performed_by_name: String,
    pub notes: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::CorrectsEntryId",
        to = "Column::Id"
    )]
    CorrectedEntry,
}

impl ActiveModelBehavior for ActiveModel {}
