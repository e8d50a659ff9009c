//! PostgreSQL-backed migration ledger

use crate::config::LedgerConfig;
use crate::migration::{Identifier, LedgerEntry, LedgerError, LedgerStore, MigrationError};
use crate::{TideError, TideExecutor};
use once_cell::sync::Lazy;
use regex::Regex;

/// Default ledger table name
pub const DEFAULT_LEDGER_TABLE: &str = "tideline_migrations";

/// Optional schema qualifier plus table name, both plain SQL identifiers.
static TABLE_NAME: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z_][A-Za-z0-9_]{0,62}\.)?[A-Za-z_][A-Za-z0-9_]{0,62}$").ok()
});

/// SQL text for every ledger statement.
///
/// Built from a table name, then optionally overridden one statement at a time.
/// Overrides must bind the same parameters as the defaults:
///
/// | statement          | parameters                                   |
/// |--------------------|----------------------------------------------|
/// | `completed_names`  | none; first column is the name               |
/// | `most_recent`      | none; name and version of the first row      |
/// | `insert_completed` | `$1` name, `$2` version, `$3` duration_ms    |
/// | `insert_failed`    | `$1` name, `$2` version, `$3` duration_ms, `$4` error |
/// | `delete_applied`   | `$1` name, `$2` version                      |
/// | `entries`          | none; columns as in [`LedgerEntry::from_row`] |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerStatements {
    pub create_table: String,
    pub create_index: String,
    pub completed_names: String,
    pub most_recent: String,
    pub insert_completed: String,
    pub insert_failed: String,
    pub delete_applied: String,
    pub entries: String,
}

impl LedgerStatements {
    /// Default statements for `table`.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::InvalidConfig` if `table` is not a plain
    /// (optionally schema-qualified) identifier.
    pub fn for_table(table: &str) -> Result<Self, MigrationError> {
        let valid = TABLE_NAME
            .as_ref()
            .is_some_and(|re| re.is_match(table));
        if !valid {
            return Err(MigrationError::InvalidConfig(format!(
                "ledger table name '{table}' is not a valid identifier"
            )));
        }

        let index = format!("idx_{}_name", table.replace('.', "_"));
        Ok(Self {
            create_table: format!(
                "CREATE TABLE IF NOT EXISTS {table} (\
                 id BIGSERIAL PRIMARY KEY, \
                 name VARCHAR(255) NOT NULL, \
                 version BIGINT NOT NULL DEFAULT 0, \
                 status VARCHAR(16) NOT NULL, \
                 duration_ms BIGINT NOT NULL DEFAULT 0, \
                 error_text TEXT NULL, \
                 recorded_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP)"
            ),
            create_index: format!("CREATE INDEX IF NOT EXISTS {index} ON {table} (name)"),
            completed_names: format!(
                "SELECT name FROM {table} WHERE status = 'COMPLETED' ORDER BY id"
            ),
            most_recent: format!(
                "SELECT name, version FROM {table} \
                 WHERE status = 'COMPLETED' ORDER BY id DESC LIMIT 1"
            ),
            insert_completed: format!(
                "INSERT INTO {table} (name, version, status, duration_ms) \
                 VALUES ($1, $2, 'COMPLETED', $3)"
            ),
            insert_failed: format!(
                "INSERT INTO {table} (name, version, status, duration_ms, error_text) \
                 VALUES ($1, $2, 'FAILED', $3, $4)"
            ),
            delete_applied: format!("DELETE FROM {table} WHERE name = $1 AND version = $2"),
            entries: format!(
                "SELECT name, version, status, duration_ms, error_text, recorded_at::text \
                 FROM {table} ORDER BY id"
            ),
        })
    }

    /// Default statements for the configured table with any overrides applied.
    ///
    /// # Errors
    ///
    /// Same as [`LedgerStatements::for_table`].
    pub fn from_config(config: &LedgerConfig) -> Result<Self, MigrationError> {
        let mut statements = Self::for_table(&config.table)?;
        let overrides = [
            (&config.completed_names, &mut statements.completed_names),
            (&config.most_recent, &mut statements.most_recent),
            (&config.insert_completed, &mut statements.insert_completed),
            (&config.insert_failed, &mut statements.insert_failed),
            (&config.delete_applied, &mut statements.delete_applied),
            (&config.entries, &mut statements.entries),
        ];
        for (custom, slot) in overrides {
            if let Some(sql) = custom {
                slot.clone_from(sql);
            }
        }
        Ok(statements)
    }
}

/// [`LedgerStore`] over a [`TideExecutor`].
///
/// Shares the executor with the migrations it records, so ledger writes land
/// on the same connection as the schema changes that produced them.
pub struct PostgresLedger<'a> {
    executor: &'a dyn TideExecutor,
    statements: LedgerStatements,
}

impl<'a> PostgresLedger<'a> {
    pub fn new(executor: &'a dyn TideExecutor, statements: LedgerStatements) -> Self {
        Self { executor, statements }
    }

    /// Ledger on the default table.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in table name; kept fallible for symmetry with
    /// [`LedgerStatements::for_table`].
    pub fn with_default_table(executor: &'a dyn TideExecutor) -> Result<Self, MigrationError> {
        Ok(Self::new(executor, LedgerStatements::for_table(DEFAULT_LEDGER_TABLE)?))
    }

    #[must_use]
    pub fn statements(&self) -> &LedgerStatements {
        &self.statements
    }

    fn execute(
        &self,
        sql: &str,
        params: &[&dyn may_postgres::types::ToSql],
    ) -> Result<u64, LedgerError> {
        ensure_statement(sql)?;
        self.executor
            .execute(sql, params)
            .map_err(|e| classify(&e))
    }

    fn query(
        &self,
        sql: &str,
        params: &[&dyn may_postgres::types::ToSql],
    ) -> Result<Vec<may_postgres::Row>, LedgerError> {
        ensure_statement(sql)?;
        self.executor
            .query_all(sql, params)
            .map_err(|e| classify(&e))
    }
}

fn ensure_statement(sql: &str) -> Result<(), LedgerError> {
    if sql.trim().is_empty() {
        return Err(LedgerError::Prepare("empty ledger statement".to_string()));
    }
    Ok(())
}

/// Map an executor error onto the ledger's two failure kinds.
fn classify(error: &TideError) -> LedgerError {
    if error.is_statement_rejection() {
        LedgerError::Prepare(error.to_string())
    } else {
        LedgerError::Execute(error.to_string())
    }
}

fn name_column(row: &may_postgres::Row) -> Result<String, LedgerError> {
    row.try_get::<_, Option<String>>(0)
        .map(Option::unwrap_or_default)
        .map_err(|e| LedgerError::Execute(format!("ledger name column: {e}")))
}

fn identifier_columns(row: &may_postgres::Row) -> Result<Identifier, LedgerError> {
    let name = name_column(row)?;
    let version = row
        .try_get::<_, Option<i64>>(1)
        .map(Option::unwrap_or_default)
        .map_err(|e| LedgerError::Execute(format!("ledger version column: {e}")))?;
    Ok(Identifier { name, version })
}

fn duration_param(duration_ms: u64) -> i64 {
    i64::try_from(duration_ms).unwrap_or(i64::MAX)
}

impl LedgerStore for PostgresLedger<'_> {
    fn initialize(&self) -> Result<(), LedgerError> {
        self.execute(&self.statements.create_table, &[])?;
        self.execute(&self.statements.create_index, &[])?;
        log::debug!("ledger table ready");
        Ok(())
    }

    fn completed_names(&self) -> Result<Vec<String>, LedgerError> {
        self.query(&self.statements.completed_names, &[])?
            .iter()
            .map(name_column)
            .collect()
    }

    fn most_recent(&self) -> Result<Option<Identifier>, LedgerError> {
        let rows = self.query(&self.statements.most_recent, &[])?;
        rows.first().map(identifier_columns).transpose()
    }

    fn insert_completed(
        &self,
        name: &str,
        version: i64,
        duration_ms: u64,
    ) -> Result<(), LedgerError> {
        let duration = duration_param(duration_ms);
        self.execute(
            &self.statements.insert_completed,
            &[&name, &version, &duration],
        )
        .map(|_| ())
    }

    fn insert_failed(
        &self,
        name: &str,
        version: i64,
        duration_ms: u64,
        error_text: &str,
    ) -> Result<(), LedgerError> {
        let duration = duration_param(duration_ms);
        self.execute(
            &self.statements.insert_failed,
            &[&name, &version, &duration, &error_text],
        )
        .map(|_| ())
    }

    fn delete_applied(&self, name: &str, version: i64) -> Result<u64, LedgerError> {
        self.execute(&self.statements.delete_applied, &[&name, &version])
    }

    fn entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        self.query(&self.statements.entries, &[])?
            .iter()
            .map(|row| LedgerEntry::from_row(row).map_err(|e| LedgerError::Execute(e.to_string())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::test_support::RecordingExecutor;

    #[test]
    fn test_table_name_validation() {
        assert!(LedgerStatements::for_table("tideline_migrations").is_ok());
        assert!(LedgerStatements::for_table("ops.tideline_migrations").is_ok());

        for bad in ["", "1table", "users; DROP TABLE x", "a.b.c", "\"quoted\""] {
            assert!(
                matches!(
                    LedgerStatements::for_table(bad),
                    Err(MigrationError::InvalidConfig(_))
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_default_statements_target_table() {
        let statements = LedgerStatements::for_table("ops.ledger").expect("valid");
        assert!(statements.create_table.starts_with("CREATE TABLE IF NOT EXISTS ops.ledger"));
        assert!(statements.create_index.contains("idx_ops_ledger_name"));
        assert!(statements.most_recent.starts_with("SELECT name, version FROM ops.ledger"));
        assert!(statements.most_recent.contains("ORDER BY id DESC LIMIT 1"));
        assert!(statements.delete_applied.ends_with("WHERE name = $1 AND version = $2"));
    }

    #[test]
    fn test_config_overrides_replace_single_statements() {
        let config = LedgerConfig {
            table: "custom_ledger".to_string(),
            delete_applied: Some(
                "DELETE FROM custom_ledger WHERE name = $1 AND version = $2 AND id > 0".to_string(),
            ),
            ..LedgerConfig::default()
        };
        let statements = LedgerStatements::from_config(&config).expect("valid");
        assert_eq!(
            statements.delete_applied,
            "DELETE FROM custom_ledger WHERE name = $1 AND version = $2 AND id > 0"
        );
        assert!(statements.insert_completed.contains("custom_ledger"));
    }

    #[test]
    fn test_writes_bind_expected_parameters() {
        let executor = RecordingExecutor::default();
        let ledger = PostgresLedger::with_default_table(&executor).expect("default table");

        ledger.initialize().expect("initialize");
        ledger.insert_completed("CreateUsers", 1, 10).expect("insert completed");
        ledger.insert_failed("AddIndex", 2, u64::MAX, "boom").expect("insert failed");
        assert_eq!(ledger.delete_applied("CreateUsers", 1), Ok(1));

        assert_eq!(executor.param_counts(), vec![0, 0, 3, 4, 2]);
        let statements = executor.statements();
        assert!(statements[2].contains("'COMPLETED'"));
        assert!(statements[3].contains("'FAILED'"));
    }

    #[test]
    fn test_blank_statement_is_a_prepare_failure() {
        let executor = RecordingExecutor::default();
        let mut statements = LedgerStatements::for_table(DEFAULT_LEDGER_TABLE).expect("valid");
        statements.completed_names = "  ".to_string();
        let ledger = PostgresLedger::new(&executor, statements);

        assert!(matches!(ledger.completed_names(), Err(LedgerError::Prepare(_))));
        assert!(executor.statements().is_empty());
    }

    #[test]
    fn test_executor_failures_are_execute_failures() {
        let executor = RecordingExecutor::failing("connection reset");
        let ledger = PostgresLedger::with_default_table(&executor).expect("default table");

        match ledger.insert_completed("CreateUsers", 1, 0) {
            Err(LedgerError::Execute(msg)) => assert!(msg.contains("connection reset")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_empty_result_means_no_recent_name() {
        let executor = RecordingExecutor::default();
        let ledger = PostgresLedger::with_default_table(&executor).expect("default table");
        assert_eq!(ledger.most_recent(), Ok(None));
        assert_eq!(ledger.completed_names(), Ok(Vec::new()));
    }
}
