//! Register schema.
//!
//! Creates the item, register, item state, authorization and audit tables,
//! plus the triggers that keep register entries append-only.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(CONTROLLED_SUBSTANCES_SQL).await?;
        db.execute_unprepared(REGISTER_ITEM_STATE_SQL).await?;
        db.execute_unprepared(REGISTER_ENTRIES_SQL).await?;
        db.execute_unprepared(AUTHORIZED_PERSONNEL_SQL).await?;
        db.execute_unprepared(AUDIT_LOG_SQL).await?;
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const CONTROLLED_SUBSTANCES_SQL: &str = r"
CREATE TABLE controlled_substances (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    unit VARCHAR(50) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const REGISTER_ITEM_STATE_SQL: &str = r"
CREATE TABLE register_item_state (
    item_id UUID PRIMARY KEY,
    balance NUMERIC NOT NULL DEFAULT 0,
    last_sequence_number BIGINT NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_state_balance_non_negative CHECK (balance >= 0),
    CONSTRAINT chk_state_sequence_non_negative CHECK (last_sequence_number >= 0)
);
";

const REGISTER_ENTRIES_SQL: &str = r"
CREATE TABLE register_entries (
    id UUID PRIMARY KEY,
    item_id UUID NOT NULL,
    sequence_number BIGINT NOT NULL,
    entry_type VARCHAR(32) NOT NULL,
    quantity NUMERIC NOT NULL,
    unit VARCHAR(50) NOT NULL,
    running_balance NUMERIC NOT NULL,
    supplier_name VARCHAR(255),
    delivery_note_number VARCHAR(100),
    patient_identifier VARCHAR(255),
    prescribing_clinician VARCHAR(255),
    purpose TEXT,
    disposal_method VARCHAR(255),
    witness VARCHAR(255),
    reason TEXT,
    corrects_entry_id UUID REFERENCES register_entries(id),
    correction_direction VARCHAR(16),
    performed_by UUID NOT NULL,
    performed_by_name VARCHAR(255) NOT NULL,
    notes TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_register_item_sequence UNIQUE (item_id, sequence_number),
    CONSTRAINT chk_register_sequence_positive CHECK (sequence_number > 0),
    CONSTRAINT chk_register_quantity_non_negative CHECK (quantity >= 0),
    CONSTRAINT chk_register_balance_non_negative CHECK (running_balance >= 0),
    CONSTRAINT chk_register_entry_type CHECK (
        entry_type IN ('receipt', 'dispense', 'disposal', 'correction', 'inventory_check')
    ),
    CONSTRAINT chk_register_dispense_fields CHECK (
        entry_type <> 'dispense'
        OR (patient_identifier IS NOT NULL AND prescribing_clinician IS NOT NULL)
    ),
    CONSTRAINT chk_register_disposal_witness CHECK (
        entry_type <> 'disposal' OR witness IS NOT NULL
    ),
    CONSTRAINT chk_register_correction_fields CHECK (
        entry_type <> 'correction'
        OR (
            reason IS NOT NULL
            AND corrects_entry_id IS NOT NULL
            AND correction_direction IN ('increase', 'decrease')
        )
    )
);

CREATE INDEX idx_register_entries_corrects ON register_entries(corrects_entry_id)
    WHERE corrects_entry_id IS NOT NULL;
CREATE INDEX idx_register_entries_created_at ON register_entries(item_id, created_at);
";

const AUTHORIZED_PERSONNEL_SQL: &str = r"
CREATE TABLE authorized_personnel (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    user_name VARCHAR(255) NOT NULL,
    tier VARCHAR(32) NOT NULL,
    authorized_by UUID NOT NULL,
    authorized_by_name VARCHAR(255) NOT NULL,
    authorized_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    revoked_at TIMESTAMPTZ,
    revoked_by UUID,
    revoked_by_name VARCHAR(255),
    CONSTRAINT chk_authorized_tier CHECK (tier IN ('view_only', 'dispense_only', 'full')),
    CONSTRAINT chk_authorized_revocation CHECK (
        (revoked_at IS NULL AND revoked_by IS NULL)
        OR (revoked_at IS NOT NULL AND revoked_by IS NOT NULL)
    )
);

-- At most one active record per user
CREATE UNIQUE INDEX uq_authorized_personnel_active ON authorized_personnel(user_id)
    WHERE revoked_at IS NULL;
CREATE INDEX idx_authorized_personnel_user ON authorized_personnel(user_id);
";

const AUDIT_LOG_SQL: &str = r"
CREATE TABLE audit_log (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    entity_type VARCHAR(64) NOT NULL,
    entity_id UUID NOT NULL,
    action VARCHAR(64) NOT NULL,
    performed_by UUID NOT NULL,
    metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_audit_log_entity ON audit_log(entity_type, entity_id, created_at);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_append_only_modification
-- Register entries and audit records are never changed or removed.
-- Mistakes are fixed with correction entries.
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_append_only_modification()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Table % is append-only: % is not allowed', TG_TABLE_NAME, TG_OP
        USING ERRCODE = 'restrict_violation';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_register_entries_append_only
BEFORE UPDATE OR DELETE ON register_entries
FOR EACH ROW
EXECUTE FUNCTION prevent_append_only_modification();

CREATE TRIGGER trg_register_entries_no_truncate
BEFORE TRUNCATE ON register_entries
FOR EACH STATEMENT
EXECUTE FUNCTION prevent_append_only_modification();

CREATE TRIGGER trg_audit_log_append_only
BEFORE UPDATE OR DELETE ON audit_log
FOR EACH ROW
EXECUTE FUNCTION prevent_append_only_modification();
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_audit_log_append_only ON audit_log;
DROP TRIGGER IF EXISTS trg_register_entries_no_truncate ON register_entries;
DROP TRIGGER IF EXISTS trg_register_entries_append_only ON register_entries;
DROP FUNCTION IF EXISTS prevent_append_only_modification();

DROP TABLE IF EXISTS audit_log CASCADE;
DROP TABLE IF EXISTS authorized_personnel CASCADE;
DROP TABLE IF EXISTS register_entries CASCADE;
DROP TABLE IF EXISTS register_item_state CASCADE;
DROP TABLE IF EXISTS controlled_substances CASCADE;
";
