//! Reverting a single, already located migration

use crate::migration::runner::{elapsed_ms, guarded_call};
use crate::migration::{LedgerStore, MigrationRef, RunStatus, SchemaManager};
use std::time::Instant;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Calls `down()` on one migration and removes the ledger rows for its
/// `(name, version)` if that worked.
pub struct Reverter<'a> {
    target: MigrationRef,
    ledger: &'a dyn LedgerStore,
    manager: SchemaManager<'a>,
}

impl<'a> Reverter<'a> {
    pub fn new(target: MigrationRef, ledger: &'a dyn LedgerStore, manager: SchemaManager<'a>) -> Self {
        Self { target, ledger, manager }
    }

    #[must_use]
    pub fn target_label(&self) -> &str {
        self.target.label()
    }

    /// `true` when `down()` completed and the ledger delete went through.
    ///
    /// Any other `down()` outcome leaves the ledger untouched.
    pub fn execute(&self) -> bool {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::migration_span("down", self.target.label()).entered();

        let name = self.target.name();
        let version = self.target.version();
        log::info!("reverting {name} (version {version})");
        let start = Instant::now();
        let status = guarded_call(|| self.target.down(&self.manager));
        let duration_ms = elapsed_ms(start);

        match status {
            Ok(RunStatus::Completed) => {}
            Ok(other) => {
                log::error!("revert of {name} returned {other} after {duration_ms}ms; ledger kept");
                return false;
            }
            Err(message) => {
                log::error!("revert of {name} failed after {duration_ms}ms: {message}; ledger kept");
                return false;
            }
        }

        match self.ledger.delete_applied(name, version) {
            Ok(removed) => {
                if removed == 0 {
                    log::warn!("reverted {name} but the ledger had no rows for version {version}");
                }
                log::info!("reverted {name} in {duration_ms}ms, removed {removed} ledger row(s)");
                #[cfg(feature = "metrics")]
                METRICS.record_revert();
                true
            }
            Err(e) => {
                log::error!("reverted {name} but could not delete its ledger rows: {e}");
                #[cfg(feature = "metrics")]
                METRICS.record_ledger_write_failure();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::ledger::LedgerStatement;
    use crate::migration::test_support::{RecordingExecutor, ScriptedMigration};
    use crate::migration::{LedgerError, MemoryLedger};

    fn seeded() -> MemoryLedger {
        let ledger = MemoryLedger::new();
        ledger.insert_completed("A", 1_700_000_000_001, 0).expect("insert");
        ledger.insert_completed("B", 1_700_000_000_002, 0).expect("insert");
        ledger
    }

    fn revert(ledger: &MemoryLedger, migration: ScriptedMigration) -> bool {
        let executor = RecordingExecutor::default();
        let reverter = Reverter::new(MigrationRef::new(migration), ledger, SchemaManager::new(&executor));
        reverter.execute()
    }

    #[test]
    fn test_completed_down_deletes_once() {
        let ledger = seeded();
        assert!(revert(&ledger, ScriptedMigration::completing("Migration1700000000002B")));
        assert_eq!(ledger.call_count(LedgerStatement::DeleteApplied), 1);
        assert_eq!(ledger.completed_names(), Ok(vec!["A".to_string()]));
    }

    #[test]
    fn test_delete_spares_older_versions_of_the_name() {
        let ledger = seeded();
        ledger.insert_completed("A", 1_700_000_000_003, 0).expect("insert");

        assert!(revert(&ledger, ScriptedMigration::completing("two::Migration1700000000003A")));
        let left: Vec<(String, i64)> =
            ledger.rows().into_iter().map(|row| (row.name, row.version)).collect();
        assert_eq!(
            left,
            vec![("A".to_string(), 1_700_000_000_001), ("B".to_string(), 1_700_000_000_002)]
        );
    }

    #[test]
    fn test_failed_or_pending_down_keeps_ledger() {
        for migration in [
            ScriptedMigration::completing("Migration1700000000002B").with_down(RunStatus::Failed),
            ScriptedMigration::completing("Migration1700000000002B").with_down(RunStatus::Pending),
            ScriptedMigration::completing("Migration1700000000002B").with_down_error("locked"),
            ScriptedMigration::completing("Migration1700000000002B").with_down_panic("oops"),
        ] {
            let ledger = seeded();
            assert!(!revert(&ledger, migration));
            assert_eq!(ledger.call_count(LedgerStatement::DeleteApplied), 0);
            assert_eq!(ledger.rows().len(), 2);
        }
    }

    #[test]
    fn test_delete_failure_fails_revert() {
        let ledger = seeded();
        ledger.fail_on(
            LedgerStatement::DeleteApplied,
            LedgerError::Execute("lock timeout".to_string()),
        );
        assert!(!revert(&ledger, ScriptedMigration::completing("Migration1700000000002B")));
        assert_eq!(ledger.rows().len(), 2);
    }

    #[test]
    fn test_target_label_is_full_label() {
        let ledger = MemoryLedger::new();
        let executor = RecordingExecutor::default();
        let reverter = Reverter::new(
            MigrationRef::new(ScriptedMigration::completing("app::Migration1700000000002B")),
            &ledger,
            SchemaManager::new(&executor),
        );
        assert_eq!(reverter.target_label(), "app::Migration1700000000002B");
    }
}
