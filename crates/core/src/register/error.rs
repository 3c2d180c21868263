//! Register error types.
//!
//! Every failure a register operation can produce, with its API error code,
//! HTTP status and retry classification.

use custodia_shared::AppError;
use custodia_shared::types::{AuthorizationId, ItemId, RegisterEntryId, UserId};
use rust_decimal::Decimal;
use thiserror::Error;

use super::authorization::AuthorizationTier;

/// Errors that can occur during register operations.
#[derive(Debug, Error)]
pub enum RegisterError {
    // ========== Authorization Errors ==========
    /// The user has no active authorization record.
    #[error("User {user_id} is not authorized for controlled substances (requires {required})")]
    NotAuthorized {
        /// The acting user.
        user_id: UserId,
        /// Tier the operation requires.
        required: AuthorizationTier,
    },

    /// The user's active tier is below what the operation requires.
    #[error("User {user_id} holds {held} authorization, operation requires {required}")]
    InsufficientTier {
        /// The acting user.
        user_id: UserId,
        /// Tier the user holds.
        held: AuthorizationTier,
        /// Tier the operation requires.
        required: AuthorizationTier,
    },

    /// A user can hold only one active authorization.
    #[error("User {0} already has an active authorization")]
    AlreadyAuthorized(UserId),

    // ========== Validation Errors ==========
    /// A request field is missing or invalid.
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// The entry would drive the balance below zero.
    #[error("Insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Balance before the entry.
        available: Decimal,
        /// Quantity the entry tried to remove.
        requested: Decimal,
    },

    // ========== Lookup Errors ==========
    /// The item is not known.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// The referenced register entry does not exist.
    #[error("Register entry not found: {0}")]
    EntryNotFound(RegisterEntryId),

    /// The authorization record does not exist.
    #[error("Authorization not found: {0}")]
    AuthorizationNotFound(AuthorizationId),

    // ========== Concurrency Errors ==========
    /// The item lock could not be obtained in time.
    #[error("Register is busy, please retry: {0}")]
    Conflict(String),

    // ========== Infrastructure Errors ==========
    /// Storage failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RegisterError {
    /// Shorthand for a validation failure on `field`.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotAuthorized { .. } => "NOT_AUTHORIZED",
            Self::InsufficientTier { .. } => "INSUFFICIENT_AUTHORIZATION",
            Self::AlreadyAuthorized(_) => "ALREADY_AUTHORIZED",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::ItemNotFound(_) => "ITEM_NOT_FOUND",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::AuthorizationNotFound(_) => "AUTHORIZATION_NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } | Self::InsufficientBalance { .. } => 400,
            Self::NotAuthorized { .. } | Self::InsufficientTier { .. } => 403,
            Self::ItemNotFound(_) | Self::EntryNotFound(_) | Self::AuthorizationNotFound(_) => 404,
            Self::AlreadyAuthorized(_) | Self::Conflict(_) => 409,
            Self::Storage(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns true if the caller may retry the whole operation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<RegisterError> for AppError {
    fn from(err: RegisterError) -> Self {
        let message = err.to_string();
        match err {
            RegisterError::NotAuthorized { .. } | RegisterError::InsufficientTier { .. } => {
                Self::Forbidden(message)
            }
            RegisterError::Validation { .. } => Self::Validation(message),
            RegisterError::InsufficientBalance { .. } => Self::BusinessRule(message),
            RegisterError::ItemNotFound(_)
            | RegisterError::EntryNotFound(_)
            | RegisterError::AuthorizationNotFound(_) => Self::NotFound(message),
            RegisterError::AlreadyAuthorized(_) => Self::Conflict {
                message,
                retryable: false,
            },
            RegisterError::Conflict(_) => Self::Conflict {
                message,
                retryable: true,
            },
            RegisterError::Storage(_) => Self::Database(message),
            RegisterError::Internal(_) => Self::Internal(message),
        }
    }
}
