//! Inbound request types for register operations.
//!
//! Request fields arrive unvalidated: required text is optional here so that a
//! missing value surfaces as a validation error naming the field, not as a
//! deserialization failure.

use custodia_shared::types::{ItemId, RegisterEntryId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{CorrectionDirection, EntryType};

/// Request to record stock received from a supplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptRequest {
    /// Target item.
    pub item_id: ItemId,
    /// Quantity received.
    pub quantity: Decimal,
    /// Unit of measure.
    #[serde(default)]
    pub unit: String,
    /// Supplier name.
    #[serde(default)]
    pub supplier_name: Option<String>,
    /// Delivery note reference.
    #[serde(default)]
    pub delivery_note_number: Option<String>,
    /// Free text.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request to record a dispensing for a patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispenseRequest {
    /// Target item.
    pub item_id: ItemId,
    /// Quantity dispensed.
    pub quantity: Decimal,
    /// Unit of measure.
    #[serde(default)]
    pub unit: String,
    /// Patient reference.
    #[serde(default)]
    pub patient_identifier: Option<String>,
    /// Prescribing clinician.
    #[serde(default)]
    pub prescribing_clinician: Option<String>,
    /// Purpose of use.
    #[serde(default)]
    pub purpose: Option<String>,
    /// Free text.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request to record a witnessed disposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisposalRequest {
    /// Target item.
    pub item_id: ItemId,
    /// Quantity destroyed.
    pub quantity: Decimal,
    /// Unit of measure.
    #[serde(default)]
    pub unit: String,
    /// How the substance was destroyed.
    #[serde(default)]
    pub disposal_method: Option<String>,
    /// Witness of the disposal.
    #[serde(default)]
    pub witness: Option<String>,
    /// Free text.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request to correct an earlier entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionRequest {
    /// Target item.
    pub item_id: ItemId,
    /// Quantity of the adjustment.
    pub quantity: Decimal,
    /// Unit of measure.
    #[serde(default)]
    pub unit: String,
    /// Why the correction is needed.
    #[serde(default)]
    pub reason: Option<String>,
    /// Entry being corrected.
    #[serde(default)]
    pub corrects_entry_id: Option<RegisterEntryId>,
    /// Whether the balance goes up or down.
    #[serde(default)]
    pub direction: Option<CorrectionDirection>,
    /// Free text.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request to record a physical count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryCheckRequest {
    /// Target item.
    pub item_id: ItemId,
    /// Counted quantity.
    pub quantity: Decimal,
    /// Unit of measure.
    #[serde(default)]
    pub unit: String,
    /// Free text.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Type-specific part of an [`EntryRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestDetails {
    /// See [`ReceiptRequest`].
    Receipt {
        /// Supplier name.
        supplier_name: Option<String>,
        /// Delivery note reference.
        delivery_note_number: Option<String>,
    },
    /// See [`DispenseRequest`].
    Dispense {
        /// Patient reference.
        patient_identifier: Option<String>,
        /// Prescribing clinician.
        prescribing_clinician: Option<String>,
        /// Purpose of use.
        purpose: Option<String>,
    },
    /// See [`DisposalRequest`].
    Disposal {
        /// Disposal method.
        disposal_method: Option<String>,
        /// Witness of the disposal.
        witness: Option<String>,
    },
    /// See [`CorrectionRequest`].
    Correction {
        /// Correction reason.
        reason: Option<String>,
        /// Entry being corrected.
        corrects_entry_id: Option<RegisterEntryId>,
        /// Balance direction.
        direction: Option<CorrectionDirection>,
    },
    /// See [`InventoryCheckRequest`].
    InventoryCheck,
}

/// Any register write request, in the shape the entry factory consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRequest {
    /// Target item.
    pub item_id: ItemId,
    /// Requested quantity.
    pub quantity: Decimal,
    /// Unit of measure.
    pub unit: String,
    /// Free text.
    pub notes: Option<String>,
    /// Type-specific fields.
    pub details: RequestDetails,
}

impl EntryRequest {
    /// Returns the entry type this request will produce.
    #[must_use]
    pub const fn entry_type(&self) -> EntryType {
        match self.details {
            RequestDetails::Receipt { .. } => EntryType::Receipt,
            RequestDetails::Dispense { .. } => EntryType::Dispense,
            RequestDetails::Disposal { .. } => EntryType::Disposal,
            RequestDetails::Correction { .. } => EntryType::Correction,
            RequestDetails::InventoryCheck => EntryType::InventoryCheck,
        }
    }

    /// Returns the entry a correction request points at.
    #[must_use]
    pub const fn corrects_entry_id(&self) -> Option<RegisterEntryId> {
        match self.details {
            RequestDetails::Correction {
                corrects_entry_id, ..
            } => corrects_entry_id,
            _ => None,
        }
    }
}

impl From<ReceiptRequest> for EntryRequest {
    fn from(req: ReceiptRequest) -> Self {
        Self {
            item_id: req.item_id,
            quantity: req.quantity,
            unit: req.unit,
            notes: req.notes,
            details: RequestDetails::Receipt {
                supplier_name: req.supplier_name,
                delivery_note_number: req.delivery_note_number,
            },
        }
    }
}

impl From<DispenseRequest> for EntryRequest {
    fn from(req: DispenseRequest) -> Self {
        Self {
            item_id: req.item_id,
            quantity: req.quantity,
            unit: req.unit,
            notes: req.notes,
            details: RequestDetails::Dispense {
                patient_identifier: req.patient_identifier,
                prescribing_clinician: req.prescribing_clinician,
                purpose: req.purpose,
            },
        }
    }
}

impl From<DisposalRequest> for EntryRequest {
    fn from(req: DisposalRequest) -> Self {
        Self {
            item_id: req.item_id,
            quantity: req.quantity,
            unit: req.unit,
            notes: req.notes,
            details: RequestDetails::Disposal {
                disposal_method: req.disposal_method,
                witness: req.witness,
            },
        }
    }
}

impl From<CorrectionRequest> for EntryRequest {
    fn from(req: CorrectionRequest) -> Self {
        Self {
            item_id: req.item_id,
            quantity: req.quantity,
            unit: req.unit,
            notes: req.notes,
            details: RequestDetails::Correction {
                reason: req.reason,
                corrects_entry_id: req.corrects_entry_id,
                direction: req.direction,
            },
        }
    }
}

impl From<InventoryCheckRequest> for EntryRequest {
    fn from(req: InventoryCheckRequest) -> Self {
        Self {
            item_id: req.item_id,
            quantity: req.quantity,
            unit: req.unit,
            notes: req.notes,
            details: RequestDetails::InventoryCheck,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_dispense_request_tolerates_missing_fields() {
        let item = ItemId::new();
        let json = serde_json::json!({
            "item_id": item,
            "quantity": "30",
            "unit": "ampoule",
        });

        let req: DispenseRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.quantity, dec!(30));
        assert!(req.patient_identifier.is_none());

        let entry: EntryRequest = req.into();
        assert_eq!(entry.entry_type(), EntryType::Dispense);
    }

    #[test]
    fn test_correction_request_exposes_target() {
        let target = RegisterEntryId::new();
        let req = EntryRequest::from(CorrectionRequest {
            item_id: ItemId::new(),
            quantity: dec!(5),
            unit: "ml".to_string(),
            reason: Some("miscount".to_string()),
            corrects_entry_id: Some(target),
            direction: Some(CorrectionDirection::Increase),
            notes: None,
        });

        assert_eq!(req.corrects_entry_id(), Some(target));
        assert_eq!(req.entry_type(), EntryType::Correction);
    }
}
