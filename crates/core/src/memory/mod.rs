//! In-process implementations of the register stores.
//!
//! Suitable for tests and single-process deployments. The register state is
//! an arena keyed by item; each item sits behind its own async mutex, so
//! writes to one item are serialized while distinct items never contend.

mod audit;
mod authorization;
mod directory;
mod ledger;

pub use audit::RecordingAuditRecorder;
pub use authorization::InMemoryAuthorizationStore;
pub use directory::InMemoryItemDirectory;
pub use ledger::InMemoryLedgerStore;

use crate::register::RegisterService;

/// Register service wired to the in-process stores.
pub type InMemoryRegisterService = RegisterService<
    InMemoryLedgerStore,
    InMemoryAuthorizationStore,
    InMemoryItemDirectory,
    RecordingAuditRecorder,
>;
