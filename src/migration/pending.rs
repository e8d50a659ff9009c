//! Pending-set computation

use crate::migration::{LedgerError, LedgerStore, MigrationRef};

/// Catalog entries not yet completed according to the ledger, in catalog order.
///
/// Each `COMPLETED` row cancels one catalog entry with the same identifier
/// name, the earliest remaining one. Names in the ledger that are not in the
/// catalog are ignored.
///
/// # Errors
///
/// Returns the ledger error if the completed names cannot be read.
pub fn resolve_pending(
    catalog: &[MigrationRef],
    ledger: &dyn LedgerStore,
) -> Result<Vec<MigrationRef>, LedgerError> {
    let completed = ledger.completed_names()?;
    let pending = subtract_completed(catalog, &completed);
    log::debug!(
        "{} catalog entries, {} completed rows, {} pending",
        catalog.len(),
        completed.len(),
        pending.len()
    );
    Ok(pending)
}

/// Multiset difference `catalog - completed`, keyed on identifier name.
#[must_use]
pub fn subtract_completed(catalog: &[MigrationRef], completed: &[String]) -> Vec<MigrationRef> {
    let mut pending = catalog.to_vec();
    for name in completed {
        if let Some(pos) = pending.iter().position(|m| m.name() == name) {
            pending.remove(pos);
        }
    }
    pending
}
