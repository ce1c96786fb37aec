//! Child table materialization.
//!
//! Children are structural clones of their parent: `CREATE TABLE (LIKE
//! parent ...)` carries defaults, constraints, indexes, storage options
//! and comments, then a bound check constraint and `INHERIT` attach the
//! child to the set. Ownership and grants are copied exactly; optional
//! foreign key replication mirrors the parent's outgoing references.
//!
//! Creation is idempotent: an existing child is skipped silently, so
//! concurrent maintenance runs and on-demand trigger creation converge
//! on the same result.

use crate::catalog::{Bound, Catalog, CustomRange, PartitionConfig, SubTemplate};
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::inspect;
use crate::naming;

/// Creates and decorates child tables for a partition set
pub struct Materializer<'a> {
    executor: &'a dyn Executor,
}

impl<'a> Materializer<'a> {
    pub fn new(executor: &'a dyn Executor) -> Self {
        Self { executor }
    }

    /// Materialize children for a series of lower boundaries
    ///
    /// When the parent is itself a child of a managed set, candidate
    /// boundaries outside the parent's own range are dropped: a
    /// sub-partition must never accept values its parent's bound check
    /// rejects. Returns the qualified names of children actually
    /// created; existing children are skipped.
    pub fn create_partitions(
        &self,
        catalog: &Catalog,
        config: &PartitionConfig,
        bounds: &[Bound],
    ) -> Result<Vec<String>> {
        let parent_range = self.parent_range(catalog, config)?;
        let mut created = Vec::new();

        for &lower in bounds {
            if let Some((range_lower, range_upper)) = parent_range {
                if lower < range_lower || lower >= range_upper {
                    log::debug!(
                        "boundary {} outside parent range of {}, skipped",
                        lower.sql_literal(),
                        config.parent_table
                    );
                    continue;
                }
            }
            if let Some(child) = self.create_one(catalog, config, lower)? {
                created.push(child);
            }
        }
        Ok(created)
    }

    /// The range of the set's parent when the set is a sub-partition
    pub fn parent_range(
        &self,
        catalog: &Catalog,
        config: &PartitionConfig,
    ) -> Result<Option<(Bound, Bound)>> {
        let Some((top_config, suffix)) =
            inspect::managed_parent_of(self.executor, catalog, &config.parent_table)?
        else {
            return Ok(None);
        };
        let Some(lower) = top_config.parse_suffix(&suffix) else {
            return Ok(None);
        };
        let Some(upper) = top_config.step(lower) else {
            return Ok(None);
        };
        Ok(Some((lower, upper)))
    }

    /// Materialize a single child, `None` when it already exists or the
    /// upper boundary overflows the calendar
    fn create_one(
        &self,
        catalog: &Catalog,
        config: &PartitionConfig,
        lower: Bound,
    ) -> Result<Option<String>> {
        let suffix = config
            .format_suffix(lower)
            .ok_or_else(|| Error::InvalidInterval(config.interval.as_text()))?;
        let schema = config.schema();
        let child = naming::child_table(schema, config.table(), &suffix);
        let (_, child_table) = naming::split_qualified(&child).ok_or_else(|| {
            Error::InvalidParent {
                table: child.clone(),
                reason: "generated child name is not qualified".to_string(),
            }
        })?;

        if inspect::table_exists(self.executor, schema, child_table)? {
            return Ok(None);
        }
        let Some(upper) = config.step(lower) else {
            log::warn!(
                "upper boundary after {} overflows, child not created for {}",
                lower.sql_literal(),
                config.parent_table
            );
            return Ok(None);
        };

        self.clone_structure(config, &child)?;
        self.attach_bound_check(config, &child, child_table, lower, upper)?;
        self.replicate_ownership(config, &child)?;
        self.replicate_grants(config, &child, schema, child_table)?;
        if config.inherit_fk {
            self.replicate_foreign_keys(config, &child)?;
        }

        if config.kind == crate::boundary::PartitionKind::TimeCustom {
            if let (Bound::Time(start), Bound::Time(end)) = (lower, upper) {
                catalog.insert_custom_range(&CustomRange {
                    parent_table: config.parent_table.clone(),
                    child_table: child.clone(),
                    range_start: start,
                    range_end: end,
                })?;
            }
        }

        log::info!("created partition {}", child);

        if let Some(template) = catalog.get_sub_template(&config.parent_table)? {
            self.apply_sub_template(catalog, &template, &child)?;
        }

        Ok(Some(child))
    }

    fn clone_structure(&self, config: &PartitionConfig, child: &str) -> Result<()> {
        let parent = &config.parent_table;
        let unlogged = if inspect::table_is_unlogged(self.executor, parent)? {
            "UNLOGGED "
        } else {
            ""
        };
        let tablespace = inspect::table_tablespace(self.executor, parent)?
            .map(|ts| format!(" TABLESPACE {ts}"))
            .unwrap_or_default();
        let sql = format!(
            "CREATE {unlogged}TABLE {child} \
             (LIKE {parent} INCLUDING DEFAULTS INCLUDING CONSTRAINTS \
             INCLUDING INDEXES INCLUDING STORAGE INCLUDING COMMENTS){tablespace}"
        );
        self.executor.execute(&sql, &[])?;
        Ok(())
    }

    fn attach_bound_check(
        &self,
        config: &PartitionConfig,
        child: &str,
        child_table: &str,
        lower: Bound,
        upper: Bound,
    ) -> Result<()> {
        let constraint = naming::bound_check_name(child_table);
        let control = &config.control;
        let sql = format!(
            "ALTER TABLE {child} ADD CONSTRAINT {constraint} \
             CHECK ({control} >= {} AND {control} < {})",
            lower.sql_literal(),
            upper.sql_literal()
        );
        self.executor.execute(&sql, &[])?;

        let sql = format!("ALTER TABLE {child} INHERIT {}", config.parent_table);
        self.executor.execute(&sql, &[])?;
        Ok(())
    }

    fn replicate_ownership(&self, config: &PartitionConfig, child: &str) -> Result<()> {
        let owner = inspect::table_owner(self.executor, config.schema(), config.table())?;
        let sql = format!("ALTER TABLE {child} OWNER TO {owner}");
        self.executor.execute(&sql, &[])?;
        Ok(())
    }

    /// Copy the parent's grant set exactly
    ///
    /// Grantees on the parent get their parent privileges; grantees the
    /// parent does not know lose everything.
    fn replicate_grants(
        &self,
        config: &PartitionConfig,
        child: &str,
        child_schema: &str,
        child_table: &str,
    ) -> Result<()> {
        let parent_grants =
            inspect::table_grants(self.executor, config.schema(), config.table())?;
        for grant in &parent_grants {
            let privileges = grant.privileges.join(", ");
            let sql = format!("GRANT {privileges} ON {child} TO {}", grant.grantee);
            self.executor.execute(&sql, &[])?;
        }

        let child_grants = inspect::table_grants(self.executor, child_schema, child_table)?;
        for grant in &child_grants {
            let on_parent = parent_grants.iter().find(|g| g.grantee == grant.grantee);
            match on_parent {
                None => {
                    let sql = format!("REVOKE ALL ON {child} FROM {}", grant.grantee);
                    self.executor.execute(&sql, &[])?;
                }
                Some(parent_grant) => {
                    let extras: Vec<&str> = grant
                        .privileges
                        .iter()
                        .filter(|p| !parent_grant.privileges.contains(p))
                        .map(String::as_str)
                        .collect();
                    if !extras.is_empty() {
                        let sql = format!(
                            "REVOKE {} ON {child} FROM {}",
                            extras.join(", "),
                            grant.grantee
                        );
                        self.executor.execute(&sql, &[])?;
                    }
                }
            }
        }
        Ok(())
    }

    fn replicate_foreign_keys(&self, config: &PartitionConfig, child: &str) -> Result<()> {
        for def in inspect::outgoing_foreign_keys(self.executor, &config.parent_table)? {
            let sql = format!("ALTER TABLE {child} ADD {def}");
            self.executor.execute(&sql, &[])?;
        }
        Ok(())
    }

    /// Turn a fresh child into a parent of its own, per the template
    fn apply_sub_template(
        &self,
        catalog: &Catalog,
        template: &SubTemplate,
        child: &str,
    ) -> Result<()> {
        let spec = crate::parent::CreateParentSpec::from_template(template, child);
        crate::parent::create_parent(self.executor, catalog, &spec)?;
        Ok(())
    }

    /// Apply min/max pruning constraints on an aged child
    ///
    /// With no explicit child, the target is the child `2 * premake + 1`
    /// intervals behind the newest one: old enough that its configured
    /// columns no longer change. Missing children, existing constraints
    /// and all-NULL columns are skipped.
    pub fn apply_constraints(
        &self,
        config: &PartitionConfig,
        child: Option<&str>,
    ) -> Result<()> {
        if config.constraint_cols.is_empty() {
            return Ok(());
        }

        let child = match child {
            Some(c) => c.to_string(),
            None => {
                let Some(newest) = inspect::newest_child_bound(self.executor, config)? else {
                    return Ok(());
                };
                let mut target = newest;
                for _ in 0..(2 * config.premake + 1) {
                    match config.step_back(target) {
                        Some(prev) => target = prev,
                        None => return Ok(()),
                    }
                }
                let Some(suffix) = config.format_suffix(target) else {
                    return Ok(());
                };
                naming::child_table(config.schema(), config.table(), &suffix)
            }
        };

        let Some((child_schema, child_table)) = naming::split_qualified(&child) else {
            return Ok(());
        };
        if !inspect::table_exists(self.executor, child_schema, child_table)? {
            return Ok(());
        }

        for column in &config.constraint_cols {
            let constraint = naming::column_constraint_name(child_table, column);
            let row = self.executor.query_one(
                "SELECT count(*) FROM pg_catalog.pg_constraint \
                 WHERE conname = $1 AND conrelid = to_regclass($2)",
                &[&constraint, &child],
            )?;
            let existing: i64 = row.get(0);
            if existing > 0 {
                continue;
            }

            let sql = format!("SELECT min({column})::text, max({column})::text FROM {child}");
            let row = self.executor.query_one(&sql, &[])?;
            let min: Option<String> = row.get(0);
            let max: Option<String> = row.get(1);
            let (Some(min), Some(max)) = (min, max) else {
                log::debug!("{child}.{column} holds no values, constraint skipped");
                continue;
            };

            let sql = format!(
                "ALTER TABLE {child} ADD CONSTRAINT {constraint} \
                 CHECK ({column} >= '{}' AND {column} <= '{}')",
                sql_escape(&min),
                sql_escape(&max)
            );
            self.executor.execute(&sql, &[])?;
            log::info!("applied pruning constraint {constraint} on {child}");
        }
        Ok(())
    }
}

/// Walk a base boundary into a range by whole intervals
///
/// Used when every initial candidate of a sub-partition set fell outside
/// the parent's own range: the base is shifted one interval at a time
/// until it lands inside `[lower, upper)`.
pub fn walk_into_range(
    config: &PartitionConfig,
    base: Bound,
    lower: Bound,
    upper: Bound,
) -> Option<Bound> {
    let mut cursor = base;
    // Distances are bounded by the parent interval over the child
    // interval; 1024 steps outlasts any supported combination
    for _ in 0..1024 {
        if cursor >= lower && cursor < upper {
            return Some(cursor);
        }
        cursor = if cursor < lower {
            config.step(cursor)?
        } else {
            config.step_back(cursor)?
        };
    }
    None
}

fn sql_escape(s: &str) -> String {
    s.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{Granularity, PartitionKind};
    use crate::catalog::PartInterval;
    use chrono::NaiveDate;

    fn ts(y: i32, mo: u32, d: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn daily_config() -> PartitionConfig {
        PartitionConfig {
            parent_table: "public.events_p2024_08".to_string(),
            control: "created_at".to_string(),
            kind: PartitionKind::TimeStatic,
            interval: PartInterval::Time(Granularity::Daily),
            constraint_cols: Vec::new(),
            premake: 4,
            inherit_fk: true,
            retention: None,
            retention_schema: None,
            retention_keep_table: true,
            retention_keep_index: true,
            datetime_string: None,
            use_run_maintenance: true,
            undo_in_progress: false,
        }
    }

    #[test]
    fn test_walk_into_range_from_below() {
        let config = daily_config();
        let walked = walk_into_range(
            &config,
            Bound::Time(ts(2024, 7, 20)),
            Bound::Time(ts(2024, 8, 1)),
            Bound::Time(ts(2024, 9, 1)),
        );
        assert_eq!(walked, Some(Bound::Time(ts(2024, 8, 1))));
    }

    #[test]
    fn test_walk_into_range_from_above() {
        let config = daily_config();
        let walked = walk_into_range(
            &config,
            Bound::Time(ts(2024, 9, 15)),
            Bound::Time(ts(2024, 8, 1)),
            Bound::Time(ts(2024, 9, 1)),
        );
        assert_eq!(walked, Some(Bound::Time(ts(2024, 8, 31))));
    }

    #[test]
    fn test_walk_into_range_already_inside() {
        let config = daily_config();
        let inside = Bound::Time(ts(2024, 8, 10));
        assert_eq!(
            walk_into_range(
                &config,
                inside,
                Bound::Time(ts(2024, 8, 1)),
                Bound::Time(ts(2024, 9, 1)),
            ),
            Some(inside)
        );
    }
}
