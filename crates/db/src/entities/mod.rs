//! `SeaORM` entities for the register tables.

pub mod audit_log;
pub mod authorized_personnel;
pub mod controlled_substances;
pub mod register_entries;
pub mod register_item_state;
