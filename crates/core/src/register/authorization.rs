//! Authorization tiers and the gate that checks them.
//!
//! Only staff holding an active authorization record may touch the register.
//! Tiers are ordered: `view_only < dispense_only < full`.

use chrono::{DateTime, Utc};
use custodia_shared::types::{AuthorizationId, UserId};
use serde::{Deserialize, Serialize};

use super::error::RegisterError;
use super::types::EntryType;

/// Level of access granted to an authorized person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationTier {
    /// May read the register.
    ViewOnly,
    /// May read and dispense.
    DispenseOnly,
    /// May perform every register operation.
    Full,
}

impl AuthorizationTier {
    /// Parse a tier from its storage representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "view_only" => Some(Self::ViewOnly),
            "dispense_only" => Some(Self::DispenseOnly),
            "full" => Some(Self::Full),
            _ => None,
        }
    }

    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ViewOnly => "view_only",
            Self::DispenseOnly => "dispense_only",
            Self::Full => "full",
        }
    }

    /// Returns true if this tier satisfies `required`.
    #[must_use]
    pub fn permits(self, required: Self) -> bool {
        self >= required
    }

    /// Tier required to append an entry of the given type.
    #[must_use]
    pub const fn required_for(entry_type: EntryType) -> Self {
        match entry_type {
            EntryType::Dispense => Self::DispenseOnly,
            EntryType::Receipt
            | EntryType::Disposal
            | EntryType::Correction
            | EntryType::InventoryCheck => Self::Full,
        }
    }

    /// Tier required to read the register.
    #[must_use]
    pub const fn required_for_read() -> Self {
        Self::ViewOnly
    }
}

impl std::fmt::Display for AuthorizationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authorization record for one user.
///
/// A record is active until it is revoked. Revocation happens once and is
/// never undone; restoring access means granting a new record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedPerson {
    /// Record identifier.
    pub id: AuthorizationId,
    /// The authorized user.
    pub user_id: UserId,
    /// Name of the authorized user.
    pub user_name: String,
    /// Granted tier.
    pub tier: AuthorizationTier,
    /// Who granted the authorization.
    pub authorized_by: UserId,
    /// Name of the granting user.
    pub authorized_by_name: String,
    /// When the authorization was granted.
    pub authorized_at: DateTime<Utc>,
    /// When the authorization was revoked.
    pub revoked_at: Option<DateTime<Utc>>,
    /// Who revoked it.
    pub revoked_by: Option<UserId>,
    /// Name of the revoking user.
    pub revoked_by_name: Option<String>,
}

impl AuthorizedPerson {
    /// Returns true if the record has not been revoked.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }
}

/// Checks a user's authorization record against an operation's requirement.
pub struct AuthorizationGate;

impl AuthorizationGate {
    /// Check that `record` grants at least `required` to `user_id`.
    ///
    /// `record` is the user's active authorization, if any. Revoked records
    /// are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthorized` when there is no active record and
    /// `InsufficientTier` when the held tier is too low.
    pub fn authorize(
        user_id: UserId,
        record: Option<&AuthorizedPerson>,
        required: AuthorizationTier,
    ) -> Result<AuthorizationTier, RegisterError> {
        let Some(record) = record.filter(|r| r.is_active() && r.user_id == user_id) else {
            return Err(RegisterError::NotAuthorized { user_id, required });
        };

        if !record.tier.permits(required) {
            return Err(RegisterError::InsufficientTier {
                user_id,
                held: record.tier,
                required,
            });
        }

        Ok(record.tier)
    }
}
