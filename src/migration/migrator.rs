//! Migrator - the engine's entry point

use crate::migration::{
    locate_last, resolve_pending, LedgerStore, MigrationCatalog, MigrationError, MigrationRef,
    MigrationRegistry, MigrationStatus, RunOutcome, Runner, Reverter, SchemaManager,
};
use crate::TideExecutor;

/// Result of [`Migrator::revert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertOutcome {
    pub success: bool,
    /// Label of the migration `down()` was called on; `None` when no target was found
    pub target_label: Option<String>,
}

/// Ties a catalog, a registry, a ledger and an executor together.
///
/// The registry defaults to [`MigrationCatalog::registry`]. All collaborators
/// are borrowed; the caller decides how long the connection lives.
pub struct Migrator<'a> {
    catalog: &'a MigrationCatalog,
    registry: Box<dyn MigrationRegistry + 'a>,
    ledger: &'a dyn LedgerStore,
    executor: &'a dyn TideExecutor,
}

impl<'a> Migrator<'a> {
    pub fn new(
        catalog: &'a MigrationCatalog,
        ledger: &'a dyn LedgerStore,
        executor: &'a dyn TideExecutor,
    ) -> Self {
        Self {
            catalog,
            registry: Box::new(catalog.registry()),
            ledger,
            executor,
        }
    }

    /// Resolve revert targets through `registry` instead of the catalog.
    #[must_use]
    pub fn with_registry(mut self, registry: impl MigrationRegistry + 'a) -> Self {
        self.registry = Box::new(registry);
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &MigrationCatalog {
        self.catalog
    }

    /// Create the ledger storage if needed.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Query` if the ledger cannot be initialized.
    pub fn initialize(&self) -> Result<(), MigrationError> {
        self.ledger.initialize()?;
        Ok(())
    }

    /// Catalog entries the ledger has not recorded as completed, in run order.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Query` if the ledger cannot be read.
    pub fn list_pending(&self) -> Result<Vec<MigrationRef>, MigrationError> {
        Ok(resolve_pending(self.catalog.migrations(), self.ledger)?)
    }

    /// Apply every pending migration.
    ///
    /// Individual migration or ledger-write failures are reported through
    /// [`RunOutcome::success`], not as an error.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Query` if the pending set cannot be computed;
    /// no migration runs in that case.
    pub fn run(&self) -> Result<RunOutcome, MigrationError> {
        let pending = self.list_pending()?;
        if pending.is_empty() {
            log::info!("no pending migrations");
        }
        Ok(Runner::new(self.ledger, self.manager()).execute(&pending))
    }

    /// Reverse the most recently completed migration.
    pub fn revert(&self) -> RevertOutcome {
        let target = match locate_last(self.ledger, self.registry.as_ref()) {
            Ok(target) => target,
            Err(e) => {
                log::debug!("nothing to revert: {e}");
                return RevertOutcome {
                    success: false,
                    target_label: None,
                };
            }
        };

        let reverter = Reverter::new(target, self.ledger, self.manager());
        let target_label = Some(reverter.target_label().to_string());
        RevertOutcome {
            success: reverter.execute(),
            target_label,
        }
    }

    /// Every ledger row plus the pending set.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Query` if the ledger cannot be read.
    pub fn status(&self) -> Result<MigrationStatus, MigrationError> {
        let applied = self.ledger.entries()?;
        let pending = self.list_pending()?;
        Ok(MigrationStatus::new(applied, pending))
    }

    fn manager(&self) -> SchemaManager<'a> {
        SchemaManager::new(self.executor)
    }
}
