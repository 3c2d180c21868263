//! Repositories implementing the register's store traits.
//!
//! Repositories hide the `SeaORM` implementation details from the register
//! service, which only sees the traits in `custodia_core::register::store`.

pub mod audit;
pub mod authorization;
pub mod directory;
pub mod register;

pub use audit::PgAuditRecorder;
pub use authorization::PgAuthorizationStore;
pub use directory::PgItemDirectory;
pub use register::PgLedgerStore;
