//! Migration: AddSomeRandomTableIndex
//! Version: 1765074012003

use sea_query::{Expr, Index};
use tideline::migration::{Migration, RunStatus, SchemaManager};
use tideline::TideError;

pub struct Migration1765074012003AddSomeRandomTableIndex;

impl Migration for Migration1765074012003AddSomeRandomTableIndex {
    fn up(&self, manager: &SchemaManager<'_>) -> Result<RunStatus, TideError> {
        let index = Index::create()
            .name("idx_some_random_table_label")
            .table("some_random_table")
            .col(Expr::col("label"))
            .to_owned();
        manager.create_index(index)?;
        Ok(RunStatus::Completed)
    }

    fn down(&self, manager: &SchemaManager<'_>) -> Result<RunStatus, TideError> {
        manager.execute_sql("DROP INDEX IF EXISTS idx_some_random_table_label")?;
        Ok(RunStatus::Completed)
    }
}
