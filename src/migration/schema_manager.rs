//! SchemaManager - schema operations available to migrations

use crate::{TideError, TideExecutor};
use sea_query::{
    IndexCreateStatement, IndexDropStatement, PostgresQueryBuilder, TableAlterStatement,
    TableCreateStatement, TableDropStatement,
};

/// Handed to [`Migration::up`](crate::migration::Migration::up) and
/// [`Migration::down`](crate::migration::Migration::down).
///
/// Wraps the same executor the ledger uses, so schema changes and ledger rows
/// go through one connection in order.
pub struct SchemaManager<'a> {
    executor: &'a dyn TideExecutor,
}

impl<'a> SchemaManager<'a> {
    pub fn new(executor: &'a dyn TideExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &'a dyn TideExecutor {
        self.executor
    }

    /// Create a table
    ///
    /// ```rust,no_run
    /// # use tideline::migration::SchemaManager;
    /// # fn f(manager: &SchemaManager<'_>) -> Result<(), tideline::TideError> {
    /// use sea_query::{ColumnDef, Table};
    ///
    /// let table = Table::create()
    ///     .table("users")
    ///     .col(ColumnDef::new("id").integer().not_null().auto_increment().primary_key())
    ///     .col(ColumnDef::new("email").string().not_null())
    ///     .to_owned();
    /// manager.create_table(table)
    /// # }
    /// ```
    pub fn create_table(&self, table: TableCreateStatement) -> Result<(), TideError> {
        self.execute_sql(&table.build(PostgresQueryBuilder))
    }

    pub fn drop_table(&self, table: TableDropStatement) -> Result<(), TideError> {
        self.execute_sql(&table.build(PostgresQueryBuilder))
    }

    pub fn alter_table(&self, alter: TableAlterStatement) -> Result<(), TideError> {
        self.execute_sql(&alter.build(PostgresQueryBuilder))
    }

    pub fn create_index(&self, index: IndexCreateStatement) -> Result<(), TideError> {
        self.execute_sql(&index.build(PostgresQueryBuilder))
    }

    pub fn drop_index(&self, index: IndexDropStatement) -> Result<(), TideError> {
        self.execute_sql(&index.build(PostgresQueryBuilder))
    }

    /// Run a raw statement without parameters.
    pub fn execute_sql(&self, sql: &str) -> Result<(), TideError> {
        if sql.trim().is_empty() {
            return Err(TideError::QueryError("empty statement".to_string()));
        }
        log::debug!("schema: {sql}");
        self.executor.execute(sql, &[]).map(|_| ())
    }
}
