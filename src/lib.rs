//! # Tideline
//!
//! Ledger-consistent migration engine for PostgreSQL on the `may` runtime.
//!
//! Tideline decides which compiled migrations are pending, runs them in catalog
//! order, records every attempt in a ledger table and reverts the most recently
//! applied migration on request. See [`migration`] for the engine itself.

pub mod config;
pub mod connection;
pub mod executor;
#[cfg(any(feature = "metrics", feature = "tracing"))]
pub mod metrics;
pub mod migration;

pub use config::{DatabaseConfig, LedgerConfig, MigrationsConfig, TidelineConfig};
pub use connection::{connect, ConnectionError};
pub use executor::{MayPostgresExecutor, TideError, TideExecutor};
