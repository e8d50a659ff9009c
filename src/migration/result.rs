//! Outcome of a single `up()` attempt

use crate::migration::Identifier;

/// Longest error text persisted in the ledger, in characters.
pub const MAX_ERROR_CHARS: usize = 4096;

/// Error text used when a failure carries no message of its own.
const UNSPECIFIED_FAILURE: &str = "migration failed without an error message";

/// Result of running one migration, produced once per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    Completed {
        name: String,
        version: i64,
        duration_ms: u64,
    },
    Failed {
        name: String,
        version: i64,
        duration_ms: u64,
        error_message: String,
    },
}

impl RunResult {
    #[must_use]
    pub fn completed(id: Identifier, duration_ms: u64) -> Self {
        RunResult::Completed {
            name: id.name,
            version: id.version,
            duration_ms,
        }
    }

    /// A failed attempt. The message is truncated and never left empty.
    #[must_use]
    pub fn failed(id: Identifier, duration_ms: u64, error_message: &str) -> Self {
        RunResult::Failed {
            name: id.name,
            version: id.version,
            duration_ms,
            error_message: truncate_error(error_message),
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, RunResult::Completed { .. })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            RunResult::Completed { name, .. } | RunResult::Failed { name, .. } => name,
        }
    }

    #[must_use]
    pub fn version(&self) -> i64 {
        match self {
            RunResult::Completed { version, .. } | RunResult::Failed { version, .. } => *version,
        }
    }

    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        match self {
            RunResult::Completed { duration_ms, .. } | RunResult::Failed { duration_ms, .. } => {
                *duration_ms
            }
        }
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            RunResult::Completed { .. } => None,
            RunResult::Failed { error_message, .. } => Some(error_message),
        }
    }
}

/// Clamp an error message to [`MAX_ERROR_CHARS`] characters, substituting a
/// placeholder for blank input.
#[must_use]
pub fn truncate_error(message: &str) -> String {
    if message.trim().is_empty() {
        return UNSPECIFIED_FAILURE.to_string();
    }
    match message.char_indices().nth(MAX_ERROR_CHARS) {
        Some((byte_idx, _)) => message[..byte_idx].to_string(),
        None => message.to_string(),
    }
}
