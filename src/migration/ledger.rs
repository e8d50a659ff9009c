//! The migration ledger: where every attempt is recorded.
//!
//! [`LedgerStore`] is the only way the engine reads or writes ledger rows.
//! [`MemoryLedger`] keeps rows in process; the PostgreSQL implementation lives
//! in [`state_table`](crate::migration::state_table).

use crate::migration::{Identifier, LedgerEntry, LedgerStatus};
use chrono::Utc;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Why a ledger statement did not go through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The statement could not be prepared (empty, malformed, or rejected by the server)
    Prepare(String),
    /// The statement was prepared but failed while executing
    Execute(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::Prepare(msg) => write!(f, "ledger statement preparation failed: {msg}"),
            LedgerError::Execute(msg) => write!(f, "ledger statement execution failed: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

/// Ledger statements, used to target failure injection and call accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerStatement {
    Initialize,
    CompletedNames,
    MostRecent,
    InsertCompleted,
    InsertFailed,
    DeleteApplied,
    Entries,
}

/// Persistence capability for migration outcomes.
///
/// Each method maps to one statement; no method is expected to batch or
/// reorder writes.
pub trait LedgerStore {
    /// Create the ledger storage if it does not exist yet.
    fn initialize(&self) -> Result<(), LedgerError> {
        Ok(())
    }

    /// Names of every `COMPLETED` row, one entry per row.
    fn completed_names(&self) -> Result<Vec<String>, LedgerError>;

    /// Name and version of the most recently recorded `COMPLETED` row, if any.
    fn most_recent(&self) -> Result<Option<Identifier>, LedgerError>;

    fn insert_completed(&self, name: &str, version: i64, duration_ms: u64)
        -> Result<(), LedgerError>;

    fn insert_failed(
        &self,
        name: &str,
        version: i64,
        duration_ms: u64,
        error_text: &str,
    ) -> Result<(), LedgerError>;

    /// Remove every row recorded under `name` at `version`; returns the number
    /// of rows removed. Rows for other versions of the same name stay.
    fn delete_applied(&self, name: &str, version: i64) -> Result<u64, LedgerError>;

    /// All rows in insertion order.
    fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError>;
}

/// In-process ledger.
///
/// Single-threaded by construction (`RefCell`), matching the engine's
/// sequential use of one ledger handle. Failures can be injected per statement
/// or per migration name, and every statement call is logged for inspection.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    rows: RefCell<Vec<LedgerEntry>>,
    failures: RefCell<HashMap<LedgerStatement, LedgerError>>,
    failing_names: RefCell<HashSet<String>>,
    calls: RefCell<Vec<LedgerStatement>>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call of `statement` fail with `error`.
    pub fn fail_on(&self, statement: LedgerStatement, error: LedgerError) {
        self.failures.borrow_mut().insert(statement, error);
    }

    /// Make inserts and deletes for `name` fail at execution.
    pub fn fail_writes_for(&self, name: impl Into<String>) {
        self.failing_names.borrow_mut().insert(name.into());
    }

    /// Remove all injected failures.
    pub fn heal(&self) {
        self.failures.borrow_mut().clear();
        self.failing_names.borrow_mut().clear();
    }

    /// How many times `statement` was issued.
    #[must_use]
    pub fn call_count(&self, statement: LedgerStatement) -> usize {
        self.calls.borrow().iter().filter(|s| **s == statement).count()
    }

    /// Snapshot of the stored rows.
    #[must_use]
    pub fn rows(&self) -> Vec<LedgerEntry> {
        self.rows.borrow().clone()
    }

    fn begin(&self, statement: LedgerStatement) -> Result<(), LedgerError> {
        self.calls.borrow_mut().push(statement);
        match self.failures.borrow().get(&statement) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn check_name(&self, name: &str) -> Result<(), LedgerError> {
        if self.failing_names.borrow().contains(name) {
            return Err(LedgerError::Execute(format!("write rejected for '{name}'")));
        }
        Ok(())
    }
}

impl LedgerStore for MemoryLedger {
    fn initialize(&self) -> Result<(), LedgerError> {
        self.begin(LedgerStatement::Initialize)
    }

    fn completed_names(&self) -> Result<Vec<String>, LedgerError> {
        self.begin(LedgerStatement::CompletedNames)?;
        Ok(self
            .rows
            .borrow()
            .iter()
            .filter(|row| row.status == LedgerStatus::Completed)
            .map(|row| row.name.clone())
            .collect())
    }

    fn most_recent(&self) -> Result<Option<Identifier>, LedgerError> {
        self.begin(LedgerStatement::MostRecent)?;
        Ok(self
            .rows
            .borrow()
            .iter()
            .rev()
            .find(|row| row.status == LedgerStatus::Completed)
            .map(|row| Identifier {
                name: row.name.clone(),
                version: row.version,
            }))
    }

    fn insert_completed(
        &self,
        name: &str,
        version: i64,
        duration_ms: u64,
    ) -> Result<(), LedgerError> {
        self.begin(LedgerStatement::InsertCompleted)?;
        self.check_name(name)?;
        self.rows
            .borrow_mut()
            .push(LedgerEntry::completed(name, version, duration_ms, Utc::now()));
        Ok(())
    }

    fn insert_failed(
        &self,
        name: &str,
        version: i64,
        duration_ms: u64,
        error_text: &str,
    ) -> Result<(), LedgerError> {
        self.begin(LedgerStatement::InsertFailed)?;
        self.check_name(name)?;
        self.rows.borrow_mut().push(LedgerEntry::failed(
            name,
            version,
            duration_ms,
            error_text,
            Utc::now(),
        ));
        Ok(())
    }

    fn delete_applied(&self, name: &str, version: i64) -> Result<u64, LedgerError> {
        self.begin(LedgerStatement::DeleteApplied)?;
        self.check_name(name)?;
        let mut rows = self.rows.borrow_mut();
        let before = rows.len();
        rows.retain(|row| row.name != name || row.version != version);
        Ok((before - rows.len()) as u64)
    }

    fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.begin(LedgerStatement::Entries)?;
        Ok(self.rows())
    }
}
