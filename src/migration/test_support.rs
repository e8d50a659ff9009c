//! Scripted migrations and a recording executor for unit tests

use crate::migration::{RunStatus, SchemaManager};
use crate::{TideError, TideExecutor};
use may_postgres::types::ToSql;
use may_postgres::Row;
use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
enum Script {
    Return(RunStatus),
    Error(String),
    Panic(String),
}

impl Script {
    fn play(&self) -> Result<RunStatus, TideError> {
        match self {
            Script::Return(status) => Ok(*status),
            Script::Error(msg) => Err(TideError::QueryError(msg.clone())),
            Script::Panic(msg) => panic!("{msg}"),
        }
    }
}

/// A migration whose `up()`/`down()` outcomes are fixed up front.
#[derive(Debug)]
pub struct ScriptedMigration {
    label: String,
    up: Script,
    down: Script,
    up_calls: AtomicUsize,
    down_calls: AtomicUsize,
}

impl ScriptedMigration {
    fn new(label: &str, up: Script) -> Self {
        Self {
            label: label.to_string(),
            up,
            down: Script::Return(RunStatus::Completed),
            up_calls: AtomicUsize::new(0),
            down_calls: AtomicUsize::new(0),
        }
    }

    pub fn completing(label: &str) -> Self {
        Self::new(label, Script::Return(RunStatus::Completed))
    }

    /// `up()` reports `Failed` without an error.
    pub fn failing(label: &str) -> Self {
        Self::new(label, Script::Return(RunStatus::Failed))
    }

    pub fn pending(label: &str) -> Self {
        Self::new(label, Script::Return(RunStatus::Pending))
    }

    pub fn erroring(label: &str, message: &str) -> Self {
        Self::new(label, Script::Error(message.to_string()))
    }

    pub fn panicking(label: &str, message: &str) -> Self {
        Self::new(label, Script::Panic(message.to_string()))
    }

    pub fn with_down(mut self, status: RunStatus) -> Self {
        self.down = Script::Return(status);
        self
    }

    pub fn with_down_error(mut self, message: &str) -> Self {
        self.down = Script::Error(message.to_string());
        self
    }

    pub fn with_down_panic(mut self, message: &str) -> Self {
        self.down = Script::Panic(message.to_string());
        self
    }

    pub fn up_calls(&self) -> usize {
        self.up_calls.load(Ordering::SeqCst)
    }

    pub fn down_calls(&self) -> usize {
        self.down_calls.load(Ordering::SeqCst)
    }
}

impl crate::migration::Migration for ScriptedMigration {
    fn label(&self) -> &str {
        &self.label
    }

    fn up(&self, _manager: &SchemaManager<'_>) -> Result<RunStatus, TideError> {
        self.up_calls.fetch_add(1, Ordering::SeqCst);
        self.up.play()
    }

    fn down(&self, _manager: &SchemaManager<'_>) -> Result<RunStatus, TideError> {
        self.down_calls.fetch_add(1, Ordering::SeqCst);
        self.down.play()
    }
}

/// Executor that records statements instead of sending them anywhere.
///
/// Row-returning queries always fail; nothing here can build a `Row`.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    statements: RefCell<Vec<String>>,
    params: RefCell<Vec<usize>>,
    failure: Option<String>,
}

impl RecordingExecutor {
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.borrow().clone()
    }

    /// Parameter count of each recorded statement.
    pub fn param_counts(&self) -> Vec<usize> {
        self.params.borrow().clone()
    }

    fn record(&self, query: &str, params: &[&dyn ToSql]) -> Result<(), TideError> {
        self.statements.borrow_mut().push(query.to_string());
        self.params.borrow_mut().push(params.len());
        match &self.failure {
            Some(msg) => Err(TideError::QueryError(msg.clone())),
            None => Ok(()),
        }
    }
}

impl TideExecutor for RecordingExecutor {
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, TideError> {
        self.record(query, params)?;
        Ok(1)
    }

    fn query_one(&self, query: &str, params: &[&dyn ToSql]) -> Result<Row, TideError> {
        self.record(query, params)?;
        Err(TideError::Other("recording executor returns no rows".to_string()))
    }

    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, TideError> {
        self.record(query, params)?;
        Ok(Vec::new())
    }
}
