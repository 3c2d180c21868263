//! Schema migration runner for the Custodia register.
//!
//! Wraps the sea-orm-migration CLI, so the usual subcommands apply:
//!   custodia-migrator up       - Create the register tables and triggers
//!   custodia-migrator status   - List applied and pending migrations
//!   custodia-migrator down     - Drop the register schema
//!
//! The target database is read from `DATABASE_URL` (a `.env` file is honored).

use custodia_db::migration::Migrator;
use sea_orm_migration::cli;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    cli::run_cli(Migrator).await;
}
