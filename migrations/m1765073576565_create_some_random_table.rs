//! Migration: CreateSomeRandomTable
//! Version: 1765073576565

use sea_query::{ColumnDef, Table};
use tideline::migration::{Migration, RunStatus, SchemaManager};
use tideline::TideError;

pub struct Migration1765073576565CreateSomeRandomTable;

impl Migration for Migration1765073576565CreateSomeRandomTable {
    fn up(&self, manager: &SchemaManager<'_>) -> Result<RunStatus, TideError> {
        let table = Table::create()
            .table("some_random_table")
            .if_not_exists()
            .col(ColumnDef::new("id").big_integer().not_null().auto_increment().primary_key())
            .col(ColumnDef::new("label").string().string_len(255).not_null())
            .col(ColumnDef::new("created_at").timestamp().not_null())
            .to_owned();
        manager.create_table(table)?;
        Ok(RunStatus::Completed)
    }

    fn down(&self, manager: &SchemaManager<'_>) -> Result<RunStatus, TideError> {
        manager.drop_table(Table::drop().table("some_random_table").if_exists().to_owned())?;
        Ok(RunStatus::Completed)
    }
}
