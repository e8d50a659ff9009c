//! Sample migrations bundled with the `tideline` binary

mod m1765073576565_create_some_random_table;
mod m1765074012003_add_some_random_table_index;

use tideline::migration::MigrationCatalog;

/// Catalog in run order. New migrations are appended.
pub fn catalog() -> MigrationCatalog {
    MigrationCatalog::new()
        .with(m1765073576565_create_some_random_table::Migration1765073576565CreateSomeRandomTable)
        .with(m1765074012003_add_some_random_table_index::Migration1765074012003AddSomeRandomTableIndex)
}
