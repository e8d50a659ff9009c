//! Migration-specific error types

use crate::migration::LedgerError;

/// Migration-specific errors
#[derive(Debug)]
pub enum MigrationError {
    /// A ledger statement failed
    Query(LedgerError),
    /// Two migrations were registered under the same identifier
    AlreadyRegistered { name: String, version: i64 },
    /// Configuration rejected before any statement was issued
    InvalidConfig(String),
    /// A run finished without every migration completing and being recorded
    RunFailed { failed: Vec<String> },
}

impl std::fmt::Display for MigrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationError::Query(e) => write!(f, "Ledger error: {}", e),
            MigrationError::AlreadyRegistered { name, version } => {
                write!(
                    f,
                    "Migration '{}' (version {}) is already registered",
                    name, version
                )
            }
            MigrationError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            MigrationError::RunFailed { failed } if failed.is_empty() => {
                write!(f, "Migration run failed: ledger could not record every result")
            }
            MigrationError::RunFailed { failed } => {
                write!(
                    f,
                    "Migration run failed: {} migration(s) did not complete: {}",
                    failed.len(),
                    failed.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MigrationError::Query(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LedgerError> for MigrationError {
    fn from(error: LedgerError) -> Self {
        MigrationError::Query(error)
    }
}
