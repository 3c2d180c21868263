//! Entry validation and draft construction.
//!
//! The factory turns a raw [`EntryRequest`] into an [`EntryDraft`], enforcing
//! the fields each entry type requires. Nothing partial leaves this module:
//! either every field checks out or the first offending one is reported.

use chrono::Utc;
use custodia_shared::RegisterSettings;
use custodia_shared::types::RegisterEntryId;
use rust_decimal::Decimal;

use super::error::RegisterError;
use super::request::{EntryRequest, RequestDetails};
use super::types::{Actor, EntryDetails, EntryDraft, LedgerEntry};

/// Longest unit of measure a register row holds.
pub const UNIT_MAX_LEN: usize = 50;
/// Longest delivery note number a register row holds.
pub const DELIVERY_NOTE_MAX_LEN: usize = 100;
/// Longest name or identifier a register row holds.
pub const NAME_MAX_LEN: usize = 255;

/// Builds validated entry drafts.
pub struct EntryFactory;

impl EntryFactory {
    /// Validate `request` and build a draft performed by `actor`.
    ///
    /// `correction_target` is the entry a correction refers to, as looked up
    /// by the caller. It is ignored for other entry types.
    ///
    /// # Errors
    ///
    /// Returns `Validation` naming the offending field, or `EntryNotFound`
    /// when a correction points at an entry that does not exist.
    pub fn build(
        request: EntryRequest,
        actor: &Actor,
        correction_target: Option<&LedgerEntry>,
        settings: &RegisterSettings,
    ) -> Result<EntryDraft, RegisterError> {
        let entry_type = request.entry_type();
        let unit = required_text("unit", Some(request.unit), UNIT_MAX_LEN)?;
        check_length("performed_by_name", &actor.display_name, NAME_MAX_LEN)?;
        Self::validate_quantity(request.quantity, entry_type.allows_zero_quantity())?;

        let details = match request.details {
            RequestDetails::Receipt {
                supplier_name,
                delivery_note_number,
            } => EntryDetails::Receipt {
                supplier_name: optional_text("supplier_name", supplier_name, NAME_MAX_LEN)?,
                delivery_note_number: optional_text(
                    "delivery_note_number",
                    delivery_note_number,
                    DELIVERY_NOTE_MAX_LEN,
                )?,
            },
            RequestDetails::Dispense {
                patient_identifier,
                prescribing_clinician,
                purpose,
            } => EntryDetails::Dispense {
                patient_identifier: required_text(
                    "patient_identifier",
                    patient_identifier,
                    NAME_MAX_LEN,
                )?,
                prescribing_clinician: required_text(
                    "prescribing_clinician",
                    prescribing_clinician,
                    NAME_MAX_LEN,
                )?,
                purpose: trimmed(purpose),
            },
            RequestDetails::Disposal {
                disposal_method,
                witness,
            } => {
                let witness = required_text("witness", witness, NAME_MAX_LEN)?;
                if settings.require_distinct_witness && actor.is_identified_by(&witness) {
                    return Err(RegisterError::validation(
                        "witness",
                        "must be a different person than the one performing the disposal",
                    ));
                }
                EntryDetails::Disposal {
                    disposal_method: optional_text(
                        "disposal_method",
                        disposal_method,
                        NAME_MAX_LEN,
                    )?,
                    witness,
                }
            }
            RequestDetails::Correction {
                reason,
                corrects_entry_id,
                direction,
            } => {
                let reason = trimmed(reason)
                    .ok_or_else(|| RegisterError::validation("reason", "is required"))?;
                let Some(corrects_entry_id) = corrects_entry_id else {
                    return Err(RegisterError::validation(
                        "corrects_entry_id",
                        "is required",
                    ));
                };
                let target = correction_target
                    .filter(|t| t.id == corrects_entry_id)
                    .ok_or(RegisterError::EntryNotFound(corrects_entry_id))?;
                if target.item_id != request.item_id {
                    return Err(RegisterError::validation(
                        "corrects_entry_id",
                        "refers to an entry of a different item",
                    ));
                }
                let Some(direction) = direction else {
                    return Err(RegisterError::validation("direction", "is required"));
                };
                EntryDetails::Correction {
                    reason,
                    corrects_entry_id,
                    direction,
                }
            }
            RequestDetails::InventoryCheck => EntryDetails::InventoryCheck,
        };

        Ok(EntryDraft {
            id: RegisterEntryId::new(),
            item_id: request.item_id,
            quantity: request.quantity,
            unit,
            details,
            performed_by: actor.user_id,
            performed_by_name: actor.display_name.clone(),
            notes: trimmed(request.notes),
            created_at: Utc::now(),
        })
    }

    fn validate_quantity(quantity: Decimal, allow_zero: bool) -> Result<(), RegisterError> {
        if quantity.is_sign_negative() && !quantity.is_zero() {
            return Err(RegisterError::validation("quantity", "cannot be negative"));
        }
        if quantity.is_zero() && !allow_zero {
            return Err(RegisterError::validation("quantity", "must be greater than zero"));
        }
        Ok(())
    }
}

/// Rejects `value` when it is longer than `max_len` characters.
///
/// # Errors
///
/// Returns `Validation` naming `field`.
pub fn check_length(field: &'static str, value: &str, max_len: usize) -> Result<(), RegisterError> {
    if value.chars().count() > max_len {
        return Err(RegisterError::validation(
            field,
            format!("must be at most {max_len} characters"),
        ));
    }
    Ok(())
}

/// Trims `value`, rejecting it when absent, blank or too long.
fn required_text(
    field: &'static str,
    value: Option<String>,
    max_len: usize,
) -> Result<String, RegisterError> {
    optional_text(field, value, max_len)?
        .ok_or_else(|| RegisterError::validation(field, "is required"))
}

/// Trims `value`, mapping blank text to `None` and rejecting it when too long.
fn optional_text(
    field: &'static str,
    value: Option<String>,
    max_len: usize,
) -> Result<Option<String>, RegisterError> {
    let value = trimmed(value);
    if let Some(v) = &value {
        check_length(field, v, max_len)?;
    }
    Ok(value)
}

/// Trims free text, mapping blank text to `None`.
fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
