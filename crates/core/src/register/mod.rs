//! Controlled-substance register.
//!
//! This module implements the register core:
//! - Entry types and the per-type details they carry
//! - Entry validation and draft construction
//! - Balance engine (signed deltas, non-negativity, replay)
//! - Authorization tiers, gate and registry
//! - Persistence ports and the orchestrating service

pub mod audit;
pub mod authorization;
pub mod balance;
pub mod error;
pub mod registry;
pub mod request;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
mod balance_props;
#[cfg(test)]
mod service_props;

pub use audit::AuditEvent;
pub use authorization::{AuthorizationGate, AuthorizationTier, AuthorizedPerson};
pub use balance::{BalanceEngine, IntegrityViolation, ItemBalance, ItemState, Posting, Replayer};
pub use error::RegisterError;
pub use registry::AuthorizationRegistry;
pub use request::{
    CorrectionRequest, DispenseRequest, DisposalRequest, EntryRequest, InventoryCheckRequest,
    ReceiptRequest, RequestDetails,
};
pub use service::{RegisterService, VerificationReport};
pub use store::{AuditRecorder, AuthorizationStore, ItemDirectory, LedgerStore};
pub use types::{Actor, CorrectionDirection, EntryDetails, EntryDraft, EntryType, LedgerEntry};
pub use validation::EntryFactory;
