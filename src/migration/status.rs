//! Run statuses and the applied/pending summary

use crate::migration::{LedgerEntry, MigrationRef};
use std::fmt;
use std::str::FromStr;

/// What a migration step reports back from `up()` or `down()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Pending,
    Completed,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pending => "PENDING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status column of a ledger row. Only finished attempts are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerStatus {
    Completed,
    Failed,
}

impl LedgerStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerStatus::Completed => "COMPLETED",
            LedgerStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "COMPLETED" => Ok(LedgerStatus::Completed),
            "FAILED" => Ok(LedgerStatus::Failed),
            other => Err(format!("unknown ledger status '{other}'")),
        }
    }
}

/// Migration status information
#[derive(Clone)]
pub struct MigrationStatus {
    /// Every ledger row, in insertion order
    pub applied: Vec<LedgerEntry>,

    /// Catalog entries still to run, in run order
    pub pending: Vec<MigrationRef>,
}

impl MigrationStatus {
    #[must_use]
    pub fn new(applied: Vec<LedgerEntry>, pending: Vec<MigrationRef>) -> Self {
        Self { applied, pending }
    }

    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.applied
            .iter()
            .filter(|e| e.status == LedgerStatus::Completed)
            .count()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.applied
            .iter()
            .filter(|e| e.status == LedgerStatus::Failed)
            .count()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if all migrations are applied
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }

    /// Highest version among completed rows
    #[must_use]
    pub fn latest_applied_version(&self) -> Option<i64> {
        self.applied
            .iter()
            .filter(|e| e.status == LedgerStatus::Completed)
            .map(|e| e.version)
            .max()
    }

    #[must_use]
    pub fn next_pending(&self) -> Option<&MigrationRef> {
        self.pending.first()
    }
}
