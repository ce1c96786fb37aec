//! Catalog schema management
//!
//! The engine keeps its durable state inside the target database, in the
//! `groundskeeper` schema: one row per managed parent in `part_config`,
//! sub-partition templates in `part_config_sub`, and explicit range rows
//! for time-custom sets in `custom_time_partitions`.

use sea_query::{ColumnDef, ColumnType, Index, IndexCreateStatement, Table, TableCreateStatement};

use crate::error::Result;
use crate::executor::Executor;

/// Schema holding the engine's own tables
pub const CATALOG_SCHEMA: &str = "groundskeeper";

/// Create the `part_config` table statement
///
/// One row per managed parent table. `part_interval` is text: a SQL
/// interval for time kinds, an integer for serial kinds.
pub fn create_part_config_table() -> TableCreateStatement {
    Table::create()
        .table((CATALOG_SCHEMA, "part_config"))
        .if_not_exists()
        .col(ColumnDef::new("parent_table").text().not_null().primary_key())
        .col(ColumnDef::new("control").text().not_null())
        .col(ColumnDef::new("kind").text().not_null())
        .col(ColumnDef::new("part_interval").text().not_null())
        .col(ColumnDef::new("constraint_cols").array(ColumnType::Text).null())
        .col(ColumnDef::new("premake").integer().not_null().default(4))
        .col(ColumnDef::new("inherit_fk").boolean().not_null().default(true))
        .col(ColumnDef::new("retention").text().null())
        .col(ColumnDef::new("retention_schema").text().null())
        .col(ColumnDef::new("retention_keep_table").boolean().not_null().default(true))
        .col(ColumnDef::new("retention_keep_index").boolean().not_null().default(true))
        .col(ColumnDef::new("datetime_string").text().null())
        .col(ColumnDef::new("use_run_maintenance").boolean().not_null().default(true))
        .col(ColumnDef::new("undo_in_progress").boolean().not_null().default(false))
        .to_owned()
}

/// Create the `part_config_sub` table statement
///
/// Sub-partition template keyed by the parent set whose children get
/// sub-partitioned. Deleting the parent's config row removes its
/// template through the foreign key.
pub fn create_part_config_sub_table() -> TableCreateStatement {
    Table::create()
        .table((CATALOG_SCHEMA, "part_config_sub"))
        .if_not_exists()
        .col(ColumnDef::new("sub_parent").text().not_null().primary_key())
        .col(ColumnDef::new("sub_control").text().not_null())
        .col(ColumnDef::new("sub_kind").text().not_null())
        .col(ColumnDef::new("sub_part_interval").text().not_null())
        .col(ColumnDef::new("sub_constraint_cols").array(ColumnType::Text).null())
        .col(ColumnDef::new("sub_premake").integer().not_null().default(4))
        .col(ColumnDef::new("sub_inherit_fk").boolean().not_null().default(true))
        .col(ColumnDef::new("sub_retention").text().null())
        .col(ColumnDef::new("sub_retention_schema").text().null())
        .col(ColumnDef::new("sub_retention_keep_table").boolean().not_null().default(true))
        .col(ColumnDef::new("sub_retention_keep_index").boolean().not_null().default(true))
        .col(ColumnDef::new("sub_use_run_maintenance").boolean().not_null().default(true))
        .foreign_key(
            sea_query::ForeignKey::create()
                .name("part_config_sub_sub_parent_fkey")
                .from((CATALOG_SCHEMA, "part_config_sub"), "sub_parent")
                .to((CATALOG_SCHEMA, "part_config"), "parent_table")
                .on_delete(sea_query::ForeignKeyAction::Cascade),
        )
        .to_owned()
}

/// Create the `custom_time_partitions` table statement
pub fn create_custom_time_partitions_table() -> TableCreateStatement {
    Table::create()
        .table((CATALOG_SCHEMA, "custom_time_partitions"))
        .if_not_exists()
        .col(ColumnDef::new("parent_table").text().not_null())
        .col(ColumnDef::new("child_table").text().not_null())
        .col(ColumnDef::new("range_start").timestamp().not_null())
        .col(ColumnDef::new("range_end").timestamp().not_null())
        .primary_key(Index::create().col("parent_table").col("child_table"))
        .to_owned()
}

/// Create index for range lookups on `custom_time_partitions`
pub fn create_custom_range_index() -> IndexCreateStatement {
    Index::create()
        .name("idx_custom_time_partitions_range")
        .table((CATALOG_SCHEMA, "custom_time_partitions"))
        .if_not_exists()
        .col("parent_table")
        .col("range_start")
        .col("range_end")
        .to_owned()
}

/// Install the catalog schema and tables
///
/// Idempotent: every statement carries `IF NOT EXISTS`, so re-running
/// against an installed database is a no-op.
///
/// # Errors
///
/// Returns `Error::Database` if any statement fails.
pub fn install(executor: &dyn Executor) -> Result<()> {
    executor.execute(&format!("CREATE SCHEMA IF NOT EXISTS {CATALOG_SCHEMA}"), &[])?;

    for statement in [
        create_part_config_table(),
        create_part_config_sub_table(),
        create_custom_time_partitions_table(),
    ] {
        let sql = statement.build(sea_query::PostgresQueryBuilder);
        executor.execute(&sql, &[])?;
    }

    let index_sql = create_custom_range_index().build(sea_query::PostgresQueryBuilder);
    executor.execute(&index_sql, &[])?;

    log::info!("catalog schema '{}' installed", CATALOG_SCHEMA);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::PostgresQueryBuilder;

    #[test]
    fn test_part_config_ddl() {
        let sql = create_part_config_table().build(PostgresQueryBuilder);
        assert!(sql.contains("part_config"));
        assert!(sql.contains("parent_table"));
        assert!(sql.contains("undo_in_progress"));
        assert!(sql.contains("IF NOT EXISTS"));
    }

    #[test]
    fn test_custom_range_index_ddl() {
        let sql = create_custom_range_index().build(PostgresQueryBuilder);
        assert!(sql.contains("IF NOT EXISTS"));
        assert!(sql.contains("idx_custom_time_partitions_range"));
        assert!(sql.contains("range_start"));
    }

    #[test]
    fn test_sub_table_cascades() {
        let sql = create_part_config_sub_table().build(PostgresQueryBuilder);
        assert!(sql.contains("sub_parent"));
        assert!(sql.contains("CASCADE"));
    }

    #[test]
    fn test_custom_table_ddl() {
        let sql = create_custom_time_partitions_table().build(PostgresQueryBuilder);
        assert!(sql.contains("custom_time_partitions"));
        assert!(sql.contains("range_start"));
    }
}
