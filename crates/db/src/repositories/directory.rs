//! Controlled-substance item lookup.

use chrono::Utc;
use custodia_core::register::validation::{NAME_MAX_LEN, UNIT_MAX_LEN, check_length};
use custodia_core::register::{ItemDirectory, RegisterError};
use custodia_shared::types::ItemId;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};

use crate::entities::controlled_substances;
use crate::error::map_db_error;

/// Item directory over the `controlled_substances` table.
#[derive(Debug, Clone)]
pub struct PgItemDirectory {
    db: DatabaseConnection,
}

impl PgItemDirectory {
    /// Creates a new item directory.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Adds an item to the directory.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the name or unit is too long to store, or an
    /// error if the database insert fails.
    pub async fn create(&self, name: &str, unit: &str) -> Result<ItemId, RegisterError> {
        check_length("name", name, NAME_MAX_LEN)?;
        check_length("unit", unit, UNIT_MAX_LEN)?;
        let item_id = ItemId::new();

        controlled_substances::ActiveModel {
            id: Set(item_id.into_inner()),
            name: Set(name.to_string()),
            unit: Set(unit.to_string()),
            created_at: Set(Utc::now().into()),
        }
        .insert(&self.db)
        .await
        .map_err(map_db_error)?;

        Ok(item_id)
    }
}

impl ItemDirectory for PgItemDirectory {
    async fn item_exists(&self, item_id: ItemId) -> Result<bool, RegisterError> {
        let count = controlled_substances::Entity::find()
            .filter(controlled_substances::Column::Id.eq(item_id.into_inner()))
            .count(&self.db)
            .await
            .map_err(map_db_error)?;
        Ok(count > 0)
    }
}
