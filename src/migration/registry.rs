//! Identifier-to-migration resolution used by revert

use crate::migration::{Identifier, MigrationError, MigrationRef};
use std::collections::HashMap;

/// Resolves a ledger identifier back to a runnable migration.
///
/// Lookups use the full `(name, version)` pair, so two catalog entries that
/// share a name stay distinct. Implementations may still return a handle whose
/// identifier differs from the requested one; the revert locator treats that
/// as a non-conforming resolution rather than trusting it.
pub trait MigrationRegistry {
    fn resolve(&self, identifier: &Identifier) -> Option<MigrationRef>;
}

/// Registry backed by a fixed map, usually built from a
/// [`MigrationCatalog`](crate::migration::MigrationCatalog).
#[derive(Debug, Default, Clone)]
pub struct StaticRegistry {
    migrations: HashMap<Identifier, MigrationRef>,
}

impl StaticRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a migration under its own identifier.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::AlreadyRegistered` if the identifier is taken.
    pub fn register(&mut self, migration: MigrationRef) -> Result<(), MigrationError> {
        let key = migration.identifier().clone();
        self.register_as(key, migration)
    }

    /// Register a migration under an arbitrary lookup key.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::AlreadyRegistered` if the key is taken.
    pub fn register_as(
        &mut self,
        key: Identifier,
        migration: MigrationRef,
    ) -> Result<(), MigrationError> {
        if self.migrations.contains_key(&key) {
            return Err(MigrationError::AlreadyRegistered {
                name: key.name,
                version: key.version,
            });
        }
        self.migrations.insert(key, migration);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

impl MigrationRegistry for StaticRegistry {
    fn resolve(&self, identifier: &Identifier) -> Option<MigrationRef> {
        self.migrations.get(identifier).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::test_support::ScriptedMigration;

    fn id(name: &str, version: i64) -> Identifier {
        Identifier {
            name: name.to_string(),
            version,
        }
    }

    #[test]
    fn test_resolve_by_identifier() {
        let mut registry = StaticRegistry::new();
        registry
            .register(MigrationRef::new(ScriptedMigration::completing(
                "app::Migration1700000000000CreateUsers",
            )))
            .expect("register");

        let found = registry.resolve(&id("CreateUsers", 1_700_000_000_000)).expect("resolves");
        assert_eq!(found.label(), "app::Migration1700000000000CreateUsers");
        assert!(registry.resolve(&id("CreateUsers", 0)).is_none());
        assert!(registry.resolve(&id("Migration1700000000000CreateUsers", 0)).is_none());
    }

    #[test]
    fn test_same_name_different_versions_coexist() {
        let mut registry = StaticRegistry::new();
        registry
            .register(MigrationRef::new(ScriptedMigration::completing("one::Migration1700000000001A")))
            .expect("first version");
        registry
            .register(MigrationRef::new(ScriptedMigration::completing("two::Migration1700000000003A")))
            .expect("second version");

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.resolve(&id("A", 1_700_000_000_003)).map(|m| m.label().to_string()),
            Some("two::Migration1700000000003A".to_string())
        );
    }

    #[test]
    fn test_duplicate_identifiers_are_rejected() {
        let mut registry = StaticRegistry::new();
        let first = MigrationRef::new(ScriptedMigration::completing("Migration1700000000001A"));
        let second = MigrationRef::new(ScriptedMigration::completing("x::Migration1700000000001A"));

        registry.register(first).expect("first registration");
        match registry.register(second) {
            Err(MigrationError::AlreadyRegistered { name, version }) => {
                assert_eq!(name, "A");
                assert_eq!(version, 1_700_000_000_001);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_as_allows_aliases() {
        let mut registry = StaticRegistry::new();
        let migration = MigrationRef::new(ScriptedMigration::completing("Migration1700000000000A"));
        registry.register_as(id("legacy_a", 0), migration).expect("alias");
        assert_eq!(
            registry.resolve(&id("legacy_a", 0)).map(|m| m.name().to_string()),
            Some("A".to_string())
        );
    }
}
