//! Migration engine
//!
//! This module provides:
//! - the [`Migration`] trait and the identifier parsed from its label
//! - a ledger ([`LedgerStore`]) recording every attempt, in memory or in PostgreSQL
//! - pending-set resolution, forward runs and single-step revert
//! - [`Migrator`], which wires those pieces together
//!
//! # Example
//!
//! ```rust,no_run
//! use tideline::migration::{Migration, RunStatus, SchemaManager};
//! use tideline::TideError;
//! use sea_query::{ColumnDef, Table};
//!
//! pub struct Migration1765073576565CreateUsersTable;
//!
//! impl Migration for Migration1765073576565CreateUsersTable {
//!     fn up(&self, manager: &SchemaManager<'_>) -> Result<RunStatus, TideError> {
//!         let table = Table::create()
//!             .table("users")
//!             .col(ColumnDef::new("id").integer().not_null().auto_increment().primary_key())
//!             .col(ColumnDef::new("email").string().not_null())
//!             .to_owned();
//!         manager.create_table(table)?;
//!         Ok(RunStatus::Completed)
//!     }
//!
//!     fn down(&self, manager: &SchemaManager<'_>) -> Result<RunStatus, TideError> {
//!         manager.drop_table(Table::drop().table("users").to_owned())?;
//!         Ok(RunStatus::Completed)
//!     }
//! }
//! ```

pub mod catalog;
pub mod error;
pub mod identifier;
pub mod ledger;
pub mod locator;
#[allow(clippy::module_inception)]
pub mod migration;
pub mod migrator;
pub mod pending;
pub mod record;
pub mod registry;
pub mod result;
pub mod revert;
pub mod runner;
pub mod schema_manager;
pub mod startup;
pub mod state_table;
pub mod status;

#[cfg(test)]
pub(crate) mod test_support;

pub use catalog::MigrationCatalog;
pub use error::MigrationError;
pub use identifier::Identifier;
pub use ledger::{LedgerError, LedgerStatement, LedgerStore, MemoryLedger};
pub use locator::{locate_last, LocateError};
pub use migration::{Migration, MigrationRef};
pub use migrator::{Migrator, RevertOutcome};
pub use pending::{resolve_pending, subtract_completed};
pub use record::LedgerEntry;
pub use registry::{MigrationRegistry, StaticRegistry};
pub use result::{truncate_error, RunResult, MAX_ERROR_CHARS};
pub use revert::Reverter;
pub use runner::{RunOutcome, Runner};
pub use schema_manager::SchemaManager;
pub use startup::startup_migrations;
pub use state_table::{LedgerStatements, PostgresLedger, DEFAULT_LEDGER_TABLE};
pub use status::{LedgerStatus, MigrationStatus, RunStatus};
