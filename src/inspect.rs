//! Read-only views over `pg_catalog`.
//!
//! Everything the engine needs to know about live tables comes from here:
//! inheritance children, ownership, grants, foreign keys, storage
//! options, and control column extremes. Nothing in this module writes.

use chrono::NaiveDateTime;

use crate::catalog::{Bound, Catalog, PartitionConfig};
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::naming;

/// Cap on ancestor walks; deeper lineages indicate a catalog cycle
const MAX_LINEAGE_DEPTH: usize = 16;

/// An inheritance child of a managed parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildTable {
    pub schema: String,
    pub table: String,
}

impl ChildTable {
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// The partition suffix of this child's table name
    pub fn suffix(&self) -> Option<&str> {
        naming::partition_suffix(&self.table)
    }
}

/// Ordering for child listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOrder {
    OldestFirst,
    NewestFirst,
}

/// Size and row count of a single child, for operators
#[derive(Debug, Clone)]
pub struct ChildInfo {
    pub child_table: String,
    pub row_count: i64,
    pub total_bytes: i64,
}

/// A grantee and the privileges it holds on a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub grantee: String,
    pub privileges: Vec<String>,
}

/// Whether a table exists
pub fn table_exists(executor: &dyn Executor, schema: &str, table: &str) -> Result<bool> {
    let row = executor.query_one(
        "SELECT count(*) FROM pg_catalog.pg_tables WHERE schemaname = $1 AND tablename = $2",
        &[&schema, &table],
    )?;
    let count: i64 = row.get(0);
    Ok(count > 0)
}

/// Direct inheritance children of a table, in catalog order
pub fn raw_children(executor: &dyn Executor, parent: &str) -> Result<Vec<ChildTable>> {
    let rows = executor.query_all(
        "SELECT n.nspname, c.relname \
         FROM pg_catalog.pg_inherits h \
         JOIN pg_catalog.pg_class c ON c.oid = h.inhrelid \
         JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
         WHERE h.inhparent = to_regclass($1) \
         ORDER BY c.relname",
        &[&parent],
    )?;
    Ok(rows
        .iter()
        .map(|r| ChildTable {
            schema: r.get(0),
            table: r.get(1),
        })
        .collect())
}

/// Children of a managed set, ordered by their partition boundary
///
/// Children whose suffix does not parse as this set's boundary type are
/// not part of the managed series and are skipped with a warning.
pub fn list_children(
    executor: &dyn Executor,
    config: &PartitionConfig,
    order: ChildOrder,
) -> Result<Vec<ChildTable>> {
    let mut keyed: Vec<(Bound, ChildTable)> = Vec::new();
    for child in raw_children(executor, &config.parent_table)? {
        let Some(suffix) = child.suffix() else {
            log::warn!("{} carries no partition suffix, skipping", child.qualified());
            continue;
        };
        match config.parse_suffix(suffix) {
            Some(bound) => keyed.push((bound, child)),
            None => {
                log::warn!(
                    "{} suffix does not match the set's interval, skipping",
                    child.qualified()
                );
            }
        }
    }
    keyed.sort_by_key(|(bound, _)| *bound);
    if order == ChildOrder::NewestFirst {
        keyed.reverse();
    }
    Ok(keyed.into_iter().map(|(_, child)| child).collect())
}

/// Lower boundary of the newest existing child, `None` for an empty set
pub fn newest_child_bound(
    executor: &dyn Executor,
    config: &PartitionConfig,
) -> Result<Option<Bound>> {
    let children = list_children(executor, config, ChildOrder::NewestFirst)?;
    Ok(children
        .first()
        .and_then(|c| c.suffix())
        .and_then(|s| config.parse_suffix(s)))
}

/// Whether a table has inheritance children of its own
pub fn has_children(executor: &dyn Executor, table: &str) -> Result<bool> {
    let row = executor.query_one(
        "SELECT count(*) FROM pg_catalog.pg_inherits WHERE inhparent = to_regclass($1)",
        &[&table],
    )?;
    let count: i64 = row.get(0);
    Ok(count > 0)
}

/// The inheritance parent of a table, if it has one
pub fn parent_of(executor: &dyn Executor, table: &str) -> Result<Option<String>> {
    let row = executor.query_opt(
        "SELECT n.nspname || '.' || c.relname \
         FROM pg_catalog.pg_inherits h \
         JOIN pg_catalog.pg_class c ON c.oid = h.inhparent \
         JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
         WHERE h.inhrelid = to_regclass($1)",
        &[&table],
    )?;
    Ok(row.map(|r| r.get(0)))
}

/// The managed set that `table` is a child of, with its own suffix
///
/// Used to clamp sub-partition boundaries to the parent's range.
pub fn managed_parent_of(
    executor: &dyn Executor,
    catalog: &Catalog,
    table: &str,
) -> Result<Option<(PartitionConfig, String)>> {
    let Some(parent) = parent_of(executor, table)? else {
        return Ok(None);
    };
    let Some(config) = catalog.try_get(&parent)? else {
        return Ok(None);
    };
    let Some(suffix) = naming::partition_suffix(table).map(str::to_string) else {
        return Ok(None);
    };
    Ok(Some((config, suffix)))
}

/// Walk up to the highest managed ancestor of a table
///
/// Iterative, capped at [`MAX_LINEAGE_DEPTH`] levels.
pub fn top_managed_ancestor(
    executor: &dyn Executor,
    catalog: &Catalog,
    table: &str,
) -> Result<String> {
    let mut current = table.to_string();
    for _ in 0..MAX_LINEAGE_DEPTH {
        match parent_of(executor, &current)? {
            Some(parent) if catalog.try_get(&parent)?.is_some() => current = parent,
            _ => return Ok(current),
        }
    }
    Err(Error::InvalidParent {
        table: table.to_string(),
        reason: format!("partition lineage deeper than {MAX_LINEAGE_DEPTH} levels"),
    })
}

/// Owner of a table
pub fn table_owner(executor: &dyn Executor, schema: &str, table: &str) -> Result<String> {
    let row = executor.query_one(
        "SELECT tableowner FROM pg_catalog.pg_tables WHERE schemaname = $1 AND tablename = $2",
        &[&schema, &table],
    )?;
    Ok(row.get(0))
}

/// Grants held on a table, grouped by grantee
pub fn table_grants(executor: &dyn Executor, schema: &str, table: &str) -> Result<Vec<Grant>> {
    let rows = executor.query_all(
        "SELECT grantee::text, array_agg(privilege_type::text ORDER BY privilege_type) \
         FROM information_schema.table_privileges \
         WHERE table_schema = $1 AND table_name = $2 \
         GROUP BY grantee ORDER BY grantee",
        &[&schema, &table],
    )?;
    Ok(rows
        .iter()
        .map(|r| Grant {
            grantee: r.get(0),
            privileges: r.get(1),
        })
        .collect())
}

/// Tablespace of a table, `None` for the database default
pub fn table_tablespace(executor: &dyn Executor, table: &str) -> Result<Option<String>> {
    let row = executor.query_one(
        "SELECT t.spcname \
         FROM pg_catalog.pg_class c \
         LEFT JOIN pg_catalog.pg_tablespace t ON t.oid = c.reltablespace \
         WHERE c.oid = to_regclass($1)",
        &[&table],
    )?;
    Ok(row.get(0))
}

/// Whether a table is UNLOGGED
pub fn table_is_unlogged(executor: &dyn Executor, table: &str) -> Result<bool> {
    let row = executor.query_one(
        "SELECT c.relpersistence = 'u' FROM pg_catalog.pg_class c WHERE c.oid = to_regclass($1)",
        &[&table],
    )?;
    Ok(row.get(0))
}

/// Definitions of a table's outgoing foreign keys
pub fn outgoing_foreign_keys(executor: &dyn Executor, table: &str) -> Result<Vec<String>> {
    let rows = executor.query_all(
        "SELECT pg_get_constraintdef(oid) FROM pg_catalog.pg_constraint \
         WHERE conrelid = to_regclass($1) AND contype = 'f' ORDER BY conname",
        &[&table],
    )?;
    Ok(rows.iter().map(|r| r.get(0)).collect())
}

/// Whether a column exists and carries NOT NULL
pub fn column_is_not_null(
    executor: &dyn Executor,
    table: &str,
    column: &str,
) -> Result<bool> {
    let row = executor.query_opt(
        "SELECT a.attnotnull FROM pg_catalog.pg_attribute a \
         WHERE a.attrelid = to_regclass($1) AND a.attname = $2 AND NOT a.attisdropped",
        &[&table, &column],
    )?;
    Ok(row.map(|r| r.get(0)).unwrap_or(false))
}

/// Highest control value across the whole set (parent and children)
pub fn max_control_id(
    executor: &dyn Executor,
    parent: &str,
    control: &str,
) -> Result<Option<i64>> {
    let sql = format!("SELECT max({control}) FROM {parent}");
    let row = executor.query_one(&sql, &[])?;
    Ok(row.get(0))
}

/// Control extremes of rows sitting in the parent itself
pub fn min_id_in_parent_only(
    executor: &dyn Executor,
    parent: &str,
    control: &str,
) -> Result<Option<i64>> {
    let sql = format!("SELECT min({control}) FROM ONLY {parent}");
    let row = executor.query_one(&sql, &[])?;
    Ok(row.get(0))
}

pub fn max_id_in_parent_only(
    executor: &dyn Executor,
    parent: &str,
    control: &str,
) -> Result<Option<i64>> {
    let sql = format!("SELECT max({control}) FROM ONLY {parent}");
    let row = executor.query_one(&sql, &[])?;
    Ok(row.get(0))
}

pub fn min_time_in_parent_only(
    executor: &dyn Executor,
    parent: &str,
    control: &str,
) -> Result<Option<NaiveDateTime>> {
    let sql = format!("SELECT min({control})::timestamp FROM ONLY {parent}");
    let row = executor.query_one(&sql, &[])?;
    Ok(row.get(0))
}

pub fn max_time_in_parent_only(
    executor: &dyn Executor,
    parent: &str,
    control: &str,
) -> Result<Option<NaiveDateTime>> {
    let sql = format!("SELECT max({control})::timestamp FROM ONLY {parent}");
    let row = executor.query_one(&sql, &[])?;
    Ok(row.get(0))
}

/// Count of rows sitting in the parent itself
pub fn rows_in_parent_only(executor: &dyn Executor, parent: &str) -> Result<i64> {
    let sql = format!("SELECT count(*) FROM ONLY {parent}");
    let row = executor.query_one(&sql, &[])?;
    Ok(row.get(0))
}

/// Row count and on-disk size of a single child
pub fn child_info(executor: &dyn Executor, child: &str) -> Result<ChildInfo> {
    let count_sql = format!("SELECT count(*) FROM ONLY {child}");
    let count_row = executor.query_one(&count_sql, &[])?;
    let size_row = executor.query_one(
        "SELECT pg_total_relation_size(to_regclass($1))",
        &[&child],
    )?;
    Ok(ChildInfo {
        child_table: child.to_string(),
        row_count: count_row.get(0),
        total_bytes: size_row.get(0),
    })
}

/// Managed parents currently holding stray rows
///
/// A healthy set routes every insert into a child; rows resting in the
/// parent mean routing fell through and data needs to be moved.
pub fn check_parents(executor: &dyn Executor, catalog: &Catalog) -> Result<Vec<(String, i64)>> {
    let mut stray = Vec::new();
    for config in catalog.list(false)? {
        let count = rows_in_parent_only(executor, &config.parent_table)?;
        if count > 0 {
            stray.push((config.parent_table, count));
        }
    }
    Ok(stray)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_table_qualified() {
        let child = ChildTable {
            schema: "public".to_string(),
            table: "events_p2024_08_17".to_string(),
        };
        assert_eq!(child.qualified(), "public.events_p2024_08_17");
        assert_eq!(child.suffix(), Some("2024_08_17"));
    }

    #[test]
    fn test_child_table_without_suffix() {
        let child = ChildTable {
            schema: "public".to_string(),
            table: "events".to_string(),
        };
        assert_eq!(child.suffix(), None);
    }
}
