//! PostgreSQL persistence for the Custodia register.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the register tables
//! - Repositories implementing the register's store traits
//! - Database migrations, including the append-only triggers

pub mod entities;
pub mod error;
pub mod migration;
pub mod repositories;

pub use repositories::{PgAuditRecorder, PgAuthorizationStore, PgItemDirectory, PgLedgerStore};

use std::sync::Arc;
use std::time::Duration;

use custodia_core::register::RegisterService;
use custodia_shared::RegisterSettings;
use custodia_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Register service backed by PostgreSQL.
pub type PgRegisterService =
    RegisterService<PgLedgerStore, PgAuthorizationStore, PgItemDirectory, PgAuditRecorder>;

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection using the configured pool bounds.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Connecting to database"
    );
    Database::connect(options).await
}

/// Wires a register service over the given connection.
#[must_use]
pub fn register_service(db: DatabaseConnection, settings: RegisterSettings) -> PgRegisterService {
    RegisterService::new(
        Arc::new(PgLedgerStore::new(db.clone(), settings.lock_timeout())),
        Arc::new(PgAuthorizationStore::new(db.clone())),
        Arc::new(PgItemDirectory::new(db.clone())),
        Arc::new(PgAuditRecorder::new(db)),
        settings,
    )
}
