//! Register domain types.
//!
//! A register entry is a single, immutable line in the controlled-substance
//! register of one item. The entry type is carried by [`EntryDetails`], a
//! closed enum whose variants hold the type-specific attributes.

use chrono::{DateTime, Utc};
use custodia_shared::types::{ItemId, RegisterEntryId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of register movement or checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Stock received from a supplier.
    Receipt,
    /// Stock handed out for a patient.
    Dispense,
    /// Stock destroyed in front of a witness.
    Disposal,
    /// Explicit adjustment referencing an earlier entry.
    Correction,
    /// Physical count checkpoint.
    InventoryCheck,
}

impl EntryType {
    /// All entry types, in register order of appearance.
    pub const ALL: [Self; 5] = [
        Self::Receipt,
        Self::Dispense,
        Self::Disposal,
        Self::Correction,
        Self::InventoryCheck,
    ];

    /// Parse an entry type from its storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "receipt" => Some(Self::Receipt),
            "dispense" => Some(Self::Dispense),
            "disposal" => Some(Self::Disposal),
            "correction" => Some(Self::Correction),
            "inventory_check" => Some(Self::InventoryCheck),
            _ => None,
        }
    }

    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Receipt => "receipt",
            Self::Dispense => "dispense",
            Self::Disposal => "disposal",
            Self::Correction => "correction",
            Self::InventoryCheck => "inventory_check",
        }
    }

    /// Returns true if an entry of this type may carry a zero quantity.
    #[must_use]
    pub const fn allows_zero_quantity(&self) -> bool {
        matches!(self, Self::InventoryCheck)
    }

    /// Returns true if the item must be known before an entry of this type
    /// is written.
    #[must_use]
    pub const fn requires_known_item(&self) -> bool {
        matches!(self, Self::Receipt | Self::Dispense | Self::Disposal)
    }

    /// Action name reported to the audit trail.
    #[must_use]
    pub const fn audit_action(&self) -> &'static str {
        match self {
            Self::Receipt => "btm_receipt",
            Self::Dispense => "btm_dispense",
            Self::Disposal => "btm_disposal",
            Self::Correction => "btm_correction",
            Self::InventoryCheck => "btm_inventory_check",
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a correction entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionDirection {
    /// Adds the corrected quantity back to the balance.
    Increase,
    /// Removes the corrected quantity from the balance.
    Decrease,
}

impl CorrectionDirection {
    /// Parse a direction from its storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "increase" => Some(Self::Increase),
            "decrease" => Some(Self::Decrease),
            _ => None,
        }
    }

    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Increase => "increase",
            Self::Decrease => "decrease",
        }
    }
}

/// Type-specific attributes of a register entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entry_type", rename_all = "snake_case")]
pub enum EntryDetails {
    /// Receipt from a supplier.
    Receipt {
        /// Supplier the delivery came from.
        supplier_name: Option<String>,
        /// Delivery note reference.
        delivery_note_number: Option<String>,
    },
    /// Dispensing for a patient.
    Dispense {
        /// Patient the substance was dispensed for.
        patient_identifier: String,
        /// Clinician who prescribed it.
        prescribing_clinician: String,
        /// Optional purpose of use.
        purpose: Option<String>,
    },
    /// Witnessed disposal.
    Disposal {
        /// How the substance was destroyed.
        disposal_method: Option<String>,
        /// Person who witnessed the disposal.
        witness: String,
    },
    /// Correction of an earlier entry.
    Correction {
        /// Why the correction was necessary.
        reason: String,
        /// The entry being corrected.
        corrects_entry_id: RegisterEntryId,
        /// Whether the balance goes up or down.
        direction: CorrectionDirection,
    },
    /// Physical count checkpoint.
    InventoryCheck,
}

impl EntryDetails {
    /// Returns the entry type these details belong to.
    #[must_use]
    pub const fn entry_type(&self) -> EntryType {
        match self {
            Self::Receipt { .. } => EntryType::Receipt,
            Self::Dispense { .. } => EntryType::Dispense,
            Self::Disposal { .. } => EntryType::Disposal,
            Self::Correction { .. } => EntryType::Correction,
            Self::InventoryCheck => EntryType::InventoryCheck,
        }
    }
}

/// The authenticated user performing an operation.
///
/// Identity resolution happens upstream; the register only records what it is
/// handed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Opaque user reference.
    pub user_id: UserId,
    /// Name shown in the register.
    pub display_name: String,
}

impl Actor {
    /// Creates an actor.
    #[must_use]
    pub fn new(user_id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
        }
    }

    /// Returns true if `identity` names this actor, by id or display name.
    #[must_use]
    pub fn is_identified_by(&self, identity: &str) -> bool {
        let identity = identity.trim();
        identity.eq_ignore_ascii_case(&self.user_id.to_string())
            || identity.eq_ignore_ascii_case(self.display_name.trim())
    }
}

/// A persisted register entry.
///
/// Entries are append-only: no field is ever changed after the entry is
/// written, and corrections are new entries referencing the original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier for this entry.
    pub id: RegisterEntryId,
    /// The item this entry belongs to.
    pub item_id: ItemId,
    /// Position in the item's register, starting at 1.
    pub sequence_number: i64,
    /// Quantity moved or counted.
    pub quantity: Decimal,
    /// Unit of measure for `quantity`.
    pub unit: String,
    /// Balance of the item right after this entry.
    pub running_balance: Decimal,
    /// Type-specific attributes.
    #[serde(flatten)]
    pub details: EntryDetails,
    /// User who performed the operation.
    pub performed_by: UserId,
    /// Display name of that user at the time.
    pub performed_by_name: String,
    /// Optional free text.
    pub notes: Option<String>,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Returns the entry type.
    #[must_use]
    pub const fn entry_type(&self) -> EntryType {
        self.details.entry_type()
    }
}

/// A validated entry that has not been placed in the register yet.
///
/// Sequence number and running balance are assigned by the store while it
/// holds the item lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    /// Identifier the entry will be persisted under.
    pub id: RegisterEntryId,
    /// Target item.
    pub item_id: ItemId,
    /// Quantity moved or counted.
    pub quantity: Decimal,
    /// Unit of measure.
    pub unit: String,
    /// Type-specific attributes.
    pub details: EntryDetails,
    /// Performing user.
    pub performed_by: UserId,
    /// Performing user's display name.
    pub performed_by_name: String,
    /// Optional free text.
    pub notes: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl EntryDraft {
    /// Returns the entry type.
    #[must_use]
    pub const fn entry_type(&self) -> EntryType {
        self.details.entry_type()
    }

    /// Turns the draft into a register entry at the given position.
    #[must_use]
    pub fn into_entry(self, sequence_number: i64, running_balance: Decimal) -> LedgerEntry {
        LedgerEntry {
            id: self.id,
            item_id: self.item_id,
            sequence_number,
            quantity: self.quantity,
            unit: self.unit,
            running_balance,
            details: self.details,
            performed_by: self.performed_by,
            performed_by_name: self.performed_by_name,
            notes: self.notes,
            created_at: self.created_at,
        }
    }
}
