//! Forward execution of pending migrations

use crate::migration::{LedgerStore, MigrationRef, RunResult, RunStatus, SchemaManager};
use crate::TideError;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// What a forward run produced.
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// `true` only if every migration completed and every result was recorded
    pub success: bool,
    /// One result per attempted migration, in run order
    pub results: Vec<RunResult>,
    /// Names whose result could not be written to the ledger
    pub unrecorded: Vec<String>,
}

impl RunOutcome {
    /// Names of the migrations that did not complete.
    #[must_use]
    pub fn failed_names(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| !r.is_completed())
            .map(|r| r.name().to_string())
            .collect()
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_completed()).count()
    }
}

/// Runs migrations one after another and records each attempt.
///
/// A failing migration does not stop the run; later migrations are still
/// attempted and recorded.
pub struct Runner<'a> {
    ledger: &'a dyn LedgerStore,
    manager: SchemaManager<'a>,
}

impl<'a> Runner<'a> {
    pub fn new(ledger: &'a dyn LedgerStore, manager: SchemaManager<'a>) -> Self {
        Self { ledger, manager }
    }

    pub fn execute(&self, migrations: &[MigrationRef]) -> RunOutcome {
        let mut outcome = RunOutcome {
            success: true,
            results: Vec::with_capacity(migrations.len()),
            unrecorded: Vec::new(),
        };

        for migration in migrations {
            let result = self.apply(migration);
            if !result.is_completed() {
                outcome.success = false;
            }
            if let Err(e) = self.record(&result) {
                log::error!("could not record {} for '{}': {}", status_word(&result), result.name(), e);
                #[cfg(feature = "metrics")]
                METRICS.record_ledger_write_failure();
                outcome.success = false;
                outcome.unrecorded.push(result.name().to_string());
            }
            outcome.results.push(result);
        }

        log::info!(
            "migration run finished: {}/{} completed, {} unrecorded",
            outcome.completed_count(),
            outcome.results.len(),
            outcome.unrecorded.len()
        );
        outcome
    }

    fn apply(&self, migration: &MigrationRef) -> RunResult {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::migration_span("up", migration.label()).entered();

        log::info!("applying {} (version {})", migration.name(), migration.version());
        let start = Instant::now();
        let status = guarded_call(|| migration.up(&self.manager));
        let duration_ms = elapsed_ms(start);
        let identifier = migration.identifier().clone();

        let result = match status {
            Ok(RunStatus::Completed) => RunResult::completed(identifier, duration_ms),
            Ok(other) => RunResult::failed(
                identifier,
                duration_ms,
                &format!("up() returned {other}"),
            ),
            Err(message) => RunResult::failed(identifier, duration_ms, &message),
        };

        match result.error_message() {
            None => log::info!("applied {} in {}ms", result.name(), duration_ms),
            Some(err) => log::error!("{} failed after {}ms: {}", result.name(), duration_ms, err),
        }
        #[cfg(feature = "metrics")]
        METRICS.record_run(&result);
        result
    }

    fn record(&self, result: &RunResult) -> Result<(), crate::migration::LedgerError> {
        match result {
            RunResult::Completed { name, version, duration_ms } => {
                self.ledger.insert_completed(name, *version, *duration_ms)
            }
            RunResult::Failed { name, version, duration_ms, error_message } => {
                self.ledger.insert_failed(name, *version, *duration_ms, error_message)
            }
        }
    }
}

fn status_word(result: &RunResult) -> &'static str {
    if result.is_completed() {
        "completion"
    } else {
        "failure"
    }
}

/// Invoke a migration step, turning errors and panics into a message.
pub(crate) fn guarded_call<F>(step: F) -> Result<RunStatus, String>
where
    F: FnOnce() -> Result<RunStatus, TideError>,
{
    match catch_unwind(AssertUnwindSafe(step)) {
        Ok(Ok(status)) => Ok(status),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    }
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
