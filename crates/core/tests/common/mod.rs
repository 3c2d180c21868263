//! Shared fixtures for register integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use custodia_core::memory::{
    InMemoryAuthorizationStore, InMemoryItemDirectory, InMemoryLedgerStore, InMemoryRegisterService,
    RecordingAuditRecorder,
};
use custodia_core::register::{
    Actor, AuthorizationTier, CorrectionDirection, CorrectionRequest, DispenseRequest,
    DisposalRequest, InventoryCheckRequest, LedgerEntry, LedgerStore, ReceiptRequest,
};
use custodia_shared::RegisterSettings;
use custodia_shared::types::{ItemId, RegisterEntryId, UserId};
use rust_decimal::Decimal;

/// A register over in-process stores with one known item and an
/// administrator holding `full` authorization.
pub struct Harness {
    pub service: InMemoryRegisterService,
    pub items: Arc<InMemoryItemDirectory>,
    pub ledger: Arc<InMemoryLedgerStore>,
    pub audit: Arc<RecordingAuditRecorder>,
    pub admin: Actor,
    pub item: ItemId,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_settings(RegisterSettings::default()).await
    }

    pub async fn with_settings(settings: RegisterSettings) -> Self {
        let items = Arc::new(InMemoryItemDirectory::new());
        let ledger = Arc::new(InMemoryLedgerStore::new(settings.lock_timeout()));
        let audit = Arc::new(RecordingAuditRecorder::new());
        let item = items.create();

        let service = InMemoryRegisterService::new(
            Arc::clone(&ledger),
            Arc::new(InMemoryAuthorizationStore::new()),
            Arc::clone(&items),
            Arc::clone(&audit),
            settings,
        );

        let admin = Actor::new(UserId::new(), "Head Pharmacist");
        service
            .grant_authorization(&admin, admin.user_id, "Head Pharmacist", AuthorizationTier::Full)
            .await
            .unwrap();

        Self {
            service,
            items,
            ledger,
            audit,
            admin,
            item,
        }
    }

    /// Reads an entry straight from the store.
    pub async fn ledger_entry(&self, id: RegisterEntryId) -> LedgerEntry {
        self.ledger.find_entry(id).await.unwrap().unwrap()
    }

    /// Creates a user holding `tier`.
    pub async fn user(&self, name: &str, tier: AuthorizationTier) -> Actor {
        let actor = Actor::new(UserId::new(), name);
        self.service
            .grant_authorization(&self.admin, actor.user_id, name, tier)
            .await
            .unwrap();
        actor
    }
}

pub fn receipt(item_id: ItemId, quantity: Decimal) -> ReceiptRequest {
    ReceiptRequest {
        item_id,
        quantity,
        unit: "ampoule".to_string(),
        supplier_name: Some("Pharma GmbH".to_string()),
        delivery_note_number: Some("DN-2026-001".to_string()),
        notes: None,
    }
}

pub fn dispense(item_id: ItemId, quantity: Decimal) -> DispenseRequest {
    DispenseRequest {
        item_id,
        quantity,
        unit: "ampoule".to_string(),
        patient_identifier: Some("PAT-0042".to_string()),
        prescribing_clinician: Some("Dr. Weber".to_string()),
        purpose: Some("post-operative analgesia".to_string()),
        notes: None,
    }
}

pub fn disposal(item_id: ItemId, quantity: Decimal, witness: Option<&str>) -> DisposalRequest {
    DisposalRequest {
        item_id,
        quantity,
        unit: "ampoule".to_string(),
        disposal_method: Some("incineration".to_string()),
        witness: witness.map(str::to_string),
        notes: None,
    }
}

pub fn correction(
    item_id: ItemId,
    quantity: Decimal,
    target: RegisterEntryId,
    direction: CorrectionDirection,
) -> CorrectionRequest {
    CorrectionRequest {
        item_id,
        quantity,
        unit: "ampoule".to_string(),
        reason: Some("transcription error".to_string()),
        corrects_entry_id: Some(target),
        direction: Some(direction),
        notes: None,
    }
}

pub fn inventory_check(item_id: ItemId, counted: Decimal) -> InventoryCheckRequest {
    InventoryCheckRequest {
        item_id,
        quantity: counted,
        unit: "ampoule".to_string(),
        notes: None,
    }
}
