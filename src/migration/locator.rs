//! Finding the migration a revert should undo

use crate::migration::{Identifier, LedgerError, LedgerStore, MigrationRef, MigrationRegistry};
use std::fmt;

/// Why no revert target was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    /// The most-recent-row query failed
    Query(LedgerError),
    /// The ledger has no completed row
    NoRow,
    /// The most recent completed row has an empty name
    EmptyName,
    /// The registry knows nothing by that identifier
    Unresolved(Identifier),
    /// The registry returned a migration with a different name or version
    NonConforming {
        requested: Identifier,
        resolved: Identifier,
    },
}

impl fmt::Display for LocateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocateError::Query(e) => write!(f, "could not read the ledger: {e}"),
            LocateError::NoRow => write!(f, "no completed migration in the ledger"),
            LocateError::EmptyName => write!(f, "most recent ledger row has an empty name"),
            LocateError::Unresolved(id) => write!(f, "no migration registered as {id}"),
            LocateError::NonConforming { requested, resolved } => write!(
                f,
                "registry resolved {requested} to a migration identified as {resolved}"
            ),
        }
    }
}

impl std::error::Error for LocateError {}

/// The migration behind the most recently completed ledger row.
///
/// The row's name and version must both match the resolved handle.
///
/// # Errors
///
/// Any of [`LocateError`]'s cases; none of them touch the ledger beyond the
/// single read.
pub fn locate_last(
    ledger: &dyn LedgerStore,
    registry: &dyn MigrationRegistry,
) -> Result<MigrationRef, LocateError> {
    let requested = ledger
        .most_recent()
        .map_err(LocateError::Query)?
        .ok_or(LocateError::NoRow)?;
    if requested.name.trim().is_empty() {
        return Err(LocateError::EmptyName);
    }

    let migration = registry
        .resolve(&requested)
        .ok_or_else(|| LocateError::Unresolved(requested.clone()))?;
    if migration.identifier() != &requested {
        return Err(LocateError::NonConforming {
            requested,
            resolved: migration.identifier().clone(),
        });
    }
    Ok(migration)
}
