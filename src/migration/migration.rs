//! Migration trait definition

use super::schema_manager::SchemaManager;
use crate::migration::{Identifier, RunStatus};
use crate::TideError;
use std::fmt;
use std::sync::Arc;

/// Trait that all migrations must implement
///
/// The label defaults to the implementing type's path, so a struct named
/// `Migration1765073576565CreateUsersTable` is identified as
/// `CreateUsersTable`, version `1765073576565`.
///
/// Returning `Err` or any status other than [`RunStatus::Completed`] marks the
/// attempt as failed. Both methods are plain blocking calls.
pub trait Migration: Send + Sync {
    /// Fully qualified label the identifier is parsed from.
    fn label(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Apply the migration (forward migration)
    fn up(&self, manager: &SchemaManager<'_>) -> Result<RunStatus, TideError>;

    /// Reverse the migration
    fn down(&self, manager: &SchemaManager<'_>) -> Result<RunStatus, TideError>;
}

/// Shared handle to a migration plus the identifier parsed from its label.
///
/// The identifier is computed once when the handle is created and stays
/// fixed for as long as the handle lives.
#[derive(Clone)]
pub struct MigrationRef {
    migration: Arc<dyn Migration>,
    identifier: Identifier,
}

impl MigrationRef {
    pub fn new(migration: impl Migration + 'static) -> Self {
        Self::from_arc(Arc::new(migration))
    }

    pub fn from_arc(migration: Arc<dyn Migration>) -> Self {
        let identifier = Identifier::parse(migration.label());
        Self { migration, identifier }
    }

    #[must_use]
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.identifier.name
    }

    #[must_use]
    pub fn version(&self) -> i64 {
        self.identifier.version
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.migration.label()
    }

    pub fn up(&self, manager: &SchemaManager<'_>) -> Result<RunStatus, TideError> {
        self.migration.up(manager)
    }

    pub fn down(&self, manager: &SchemaManager<'_>) -> Result<RunStatus, TideError> {
        self.migration.down(manager)
    }
}

impl fmt::Debug for MigrationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationRef")
            .field("label", &self.label())
            .field("identifier", &self.identifier)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Migration1765073576565CreateUsersTable;

    impl Migration for Migration1765073576565CreateUsersTable {
        fn up(&self, _manager: &SchemaManager<'_>) -> Result<RunStatus, TideError> {
            Ok(RunStatus::Completed)
        }

        fn down(&self, _manager: &SchemaManager<'_>) -> Result<RunStatus, TideError> {
            Ok(RunStatus::Completed)
        }
    }

    struct Untagged;

    impl Migration for Untagged {
        fn up(&self, _manager: &SchemaManager<'_>) -> Result<RunStatus, TideError> {
            Ok(RunStatus::Completed)
        }

        fn down(&self, _manager: &SchemaManager<'_>) -> Result<RunStatus, TideError> {
            Ok(RunStatus::Completed)
        }
    }

    #[test]
    fn test_default_label_is_type_path() {
        let handle = MigrationRef::new(Migration1765073576565CreateUsersTable);
        assert!(handle.label().ends_with("::Migration1765073576565CreateUsersTable"));
        assert_eq!(handle.name(), "CreateUsersTable");
        assert_eq!(handle.version(), 1_765_073_576_565);
    }

    #[test]
    fn test_untagged_type_falls_back_to_full_label() {
        let handle = MigrationRef::new(Untagged);
        assert_eq!(handle.name(), handle.label());
        assert_eq!(handle.version(), 0);
    }
}
