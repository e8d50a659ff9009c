//! `TideExecutor` - statement execution over `may_postgres`
//!
//! Migrations (through [`SchemaManager`](crate::migration::SchemaManager)) and the
//! PostgreSQL ledger both talk to the database through this trait, so a single
//! client can be shared sequentially by the whole run.

use may_postgres::types::ToSql;
use may_postgres::{Client, Error as PostgresError, Row};
use std::fmt;
use std::time::Instant;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Executor-level error type
#[derive(Debug)]
pub enum TideError {
    /// `PostgreSQL` error from `may_postgres`
    PostgresError(PostgresError),
    /// Query execution error
    QueryError(String),
    /// Row parsing/conversion error
    ParseError(String),
    /// Other execution errors
    Other(String),
}

impl TideError {
    /// Whether the server rejected the statement itself rather than its execution.
    ///
    /// SQLSTATE class `42` (syntax error or access rule violation) is raised
    /// while the statement is parsed and planned, before any row is touched.
    #[must_use]
    pub fn is_statement_rejection(&self) -> bool {
        match self {
            TideError::PostgresError(e) => e
                .code()
                .is_some_and(|state| state.code().starts_with("42")),
            _ => false,
        }
    }
}

impl fmt::Display for TideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TideError::PostgresError(e) => write!(f, "PostgreSQL error: {e}"),
            TideError::QueryError(s) => write!(f, "Query error: {s}"),
            TideError::ParseError(s) => write!(f, "Parse error: {s}"),
            TideError::Other(s) => write!(f, "Execution error: {s}"),
        }
    }
}

impl std::error::Error for TideError {}

impl From<PostgresError> for TideError {
    fn from(err: PostgresError) -> Self {
        TideError::PostgresError(err)
    }
}

/// Trait for executing database statements
///
/// Implemented by [`MayPostgresExecutor`]; tests provide their own recording
/// implementations.
pub trait TideExecutor {
    /// Execute a statement and return the number of rows affected.
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the statement fails.
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, TideError>;

    /// Execute a query that must return exactly one row.
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails or does not yield exactly one row.
    fn query_one(&self, query: &str, params: &[&dyn ToSql]) -> Result<Row, TideError>;

    /// Execute a query and return all rows.
    ///
    /// # Errors
    ///
    /// Returns `TideError` if the query fails.
    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, TideError>;
}

/// `TideExecutor` over a `may_postgres::Client`
pub struct MayPostgresExecutor {
    client: Client,
}

impl MayPostgresExecutor {
    /// Create a new executor from a `may_postgres::Client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Consume the executor and return the underlying client
    pub fn into_client(self) -> Client {
        self.client
    }
}

impl TideExecutor for MayPostgresExecutor {
    fn execute(&self, query: &str, params: &[&dyn ToSql]) -> Result<u64, TideError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::statement_span(query).entered();

        let start = Instant::now();
        let result = self.client.execute(query, params).map_err(TideError::from);
        log::trace!("execute took {}ms: {}", start.elapsed().as_millis(), query.trim());
        result
    }

    fn query_one(&self, query: &str, params: &[&dyn ToSql]) -> Result<Row, TideError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::statement_span(query).entered();

        let start = Instant::now();
        let result = self.client.query_one(query, params).map_err(TideError::from);
        log::trace!("query_one took {}ms: {}", start.elapsed().as_millis(), query.trim());
        result
    }

    fn query_all(&self, query: &str, params: &[&dyn ToSql]) -> Result<Vec<Row>, TideError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::statement_span(query).entered();

        let start = Instant::now();
        let result = self.client.query(query, params).map_err(TideError::from);
        log::trace!("query_all took {}ms: {}", start.elapsed().as_millis(), query.trim());
        result
    }
}
