//! `LedgerEntry` - one row of the migration ledger

use crate::migration::result::truncate_error;
use crate::migration::LedgerStatus;
use crate::TideError;
use chrono::{DateTime, NaiveDateTime, Utc};

/// A persisted record of one migration attempt.
///
/// Rows are appended, never updated. A `Failed` row always carries a non-empty
/// error text of at most 4096 characters; a `Completed` row never carries one.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LedgerEntry {
    pub name: String,
    pub version: i64,
    pub status: LedgerStatus,
    pub duration_ms: u64,
    pub error_text: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    #[must_use]
    pub fn completed(
        name: impl Into<String>,
        version: i64,
        duration_ms: u64,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            status: LedgerStatus::Completed,
            duration_ms,
            error_text: None,
            recorded_at,
        }
    }

    #[must_use]
    pub fn failed(
        name: impl Into<String>,
        version: i64,
        duration_ms: u64,
        error: &str,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            status: LedgerStatus::Failed,
            duration_ms,
            error_text: Some(truncate_error(error)),
            recorded_at,
        }
    }

    /// Decode a row of the default `entries` statement.
    ///
    /// Expected column order: `name`, `version`, `status`, `duration_ms`,
    /// `error_text`, `recorded_at` (as text).
    ///
    /// # Errors
    ///
    /// Returns `TideError::ParseError` if a column has an unexpected type or
    /// the status/timestamp text is not recognized.
    pub fn from_row(row: &may_postgres::Row) -> Result<Self, TideError> {
        let column_err = |idx: usize, e: may_postgres::Error| {
            TideError::ParseError(format!("ledger column {idx}: {e}"))
        };

        let name: String = row.try_get(0).map_err(|e| column_err(0, e))?;
        let version: i64 = row.try_get(1).map_err(|e| column_err(1, e))?;
        let status: String = row.try_get(2).map_err(|e| column_err(2, e))?;
        let duration_ms: i64 = row.try_get(3).map_err(|e| column_err(3, e))?;
        let error_text: Option<String> = row.try_get(4).map_err(|e| column_err(4, e))?;
        let recorded_at: String = row.try_get(5).map_err(|e| column_err(5, e))?;

        Ok(Self {
            name,
            version,
            status: status.parse().map_err(TideError::ParseError)?,
            duration_ms: u64::try_from(duration_ms).unwrap_or(0),
            error_text,
            recorded_at: parse_timestamp(&recorded_at)?,
        })
    }
}

/// Parse the text form of a `TIMESTAMP` column.
pub(crate) fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, TideError> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
    ];

    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            TideError::ParseError(format!("unrecognized timestamp '{text}'"))
        })
}
