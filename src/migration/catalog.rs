//! The ordered list of migrations compiled into the application

use crate::migration::{Migration, MigrationRef, StaticRegistry};

/// Migrations in the order they must run.
///
/// The catalog order is the only ordering the engine uses; versions are
/// recorded but never sorted on.
#[derive(Debug, Default, Clone)]
pub struct MigrationCatalog {
    migrations: Vec<MigrationRef>,
}

impl MigrationCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, migration: impl Migration + 'static) -> Self {
        self.register(migration);
        self
    }

    pub fn register(&mut self, migration: impl Migration + 'static) {
        self.push(MigrationRef::new(migration));
    }

    pub fn push(&mut self, migration: MigrationRef) {
        log::trace!("catalog: {} ({})", migration.name(), migration.label());
        self.migrations.push(migration);
    }

    #[must_use]
    pub fn migrations(&self) -> &[MigrationRef] {
        &self.migrations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    /// Registry resolving every catalog entry by its `(name, version)`.
    ///
    /// Entries sharing a name but not a version are all resolvable. When two
    /// entries share both, the first one wins.
    #[must_use]
    pub fn registry(&self) -> StaticRegistry {
        let mut registry = StaticRegistry::new();
        for migration in &self.migrations {
            if registry.register(migration.clone()).is_err() {
                log::warn!(
                    "duplicate migration identifier {} ({}); revert resolves the first entry",
                    migration.identifier(),
                    migration.label()
                );
            }
        }
        registry
    }
}

impl FromIterator<MigrationRef> for MigrationCatalog {
    fn from_iter<I: IntoIterator<Item = MigrationRef>>(iter: I) -> Self {
        Self {
            migrations: iter.into_iter().collect(),
        }
    }
}
