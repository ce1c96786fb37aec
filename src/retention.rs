//! Retention reaping of aged children.
//!
//! A child is eligible once its entire range is older than the
//! configured threshold: for time sets `now - (lower + interval) >
//! retention`, for serial sets the distance from the current maximum's
//! partition. Children are detached with `NO INHERIT` first, so a
//! failure mid-way leaves a detached table, never a half-dropped one.
//!
//! The reaper runs under its own advisory lock, separate from
//! maintenance, and walks strictly oldest-first.

use crate::catalog::{Bound, Catalog, PartInterval, PartitionConfig};
use crate::error::Result;
use crate::executor::Executor;
use crate::inspect::{self, ChildOrder};
use crate::lock::{SessionLock, RETENTION_LOCK};

/// Per-call overrides of the configured retention settings
#[derive(Debug, Clone, Default)]
pub struct RetentionOverride {
    pub retention: Option<String>,
    pub keep_table: Option<bool>,
    pub keep_index: Option<bool>,
    pub retention_schema: Option<String>,
}

/// Detach and dispose of all eligible children of a set
///
/// Returns the qualified names of reaped children. A held lock or a set
/// without a retention threshold reaps nothing.
pub fn drop_eligible(
    executor: &dyn Executor,
    lock: &dyn SessionLock,
    catalog: &Catalog,
    config: &PartitionConfig,
    overrides: &RetentionOverride,
) -> Result<Vec<String>> {
    let retention = overrides
        .retention
        .clone()
        .or_else(|| config.retention.clone());
    let Some(retention) = retention else {
        return Ok(Vec::new());
    };

    let Some(_guard) = lock.try_acquire(executor, RETENTION_LOCK)? else {
        log::info!("retention already running elsewhere, skipping {}", config.parent_table);
        return Ok(Vec::new());
    };

    let keep_table = overrides.keep_table.unwrap_or(config.retention_keep_table);
    let keep_index = overrides.keep_index.unwrap_or(config.retention_keep_index);
    let archive_schema = overrides
        .retention_schema
        .clone()
        .or_else(|| config.retention_schema.clone());

    let Some(cutoff) = cutoff_bound(executor, config, &retention)? else {
        return Ok(Vec::new());
    };

    let mut reaped = Vec::new();
    for child in inspect::list_children(executor, config, ChildOrder::OldestFirst)? {
        let qualified = child.qualified();
        let Some(lower) = child.suffix().and_then(|s| config.parse_suffix(s)) else {
            continue;
        };
        let Some(upper) = config.step(lower) else {
            continue;
        };
        if upper >= cutoff {
            // Oldest-first walk: the first retained child ends the pass
            break;
        }

        let sql = format!("ALTER TABLE {qualified} NO INHERIT {}", config.parent_table);
        executor.execute(&sql, &[])?;

        if let Some(schema) = &archive_schema {
            let sql = format!("ALTER TABLE {qualified} SET SCHEMA {schema}");
            executor.execute(&sql, &[])?;
            log::info!("archived {qualified} to schema {schema}");
        } else if !keep_table {
            let sql = format!("DROP TABLE {qualified} CASCADE");
            executor.execute(&sql, &[])?;
            log::info!("dropped {qualified}");
        } else if !keep_index {
            strip_indexes(executor, &qualified)?;
            log::info!("detached {qualified} and dropped its indexes");
        } else {
            log::info!("detached {qualified}");
        }

        catalog.delete_custom_range(&config.parent_table, &qualified)?;
        // A sub-partitioned child carries its own config row; cascade it
        if catalog.try_get(&qualified)?.is_some() {
            catalog.delete(&qualified)?;
        }
        reaped.push(qualified);
    }
    Ok(reaped)
}

/// The exclusive upper limit a child's range must fall under to be reaped
fn cutoff_bound(
    executor: &dyn Executor,
    config: &PartitionConfig,
    retention: &str,
) -> Result<Option<Bound>> {
    match config.interval {
        PartInterval::Time(_) | PartInterval::CustomTime(_) => {
            // The server's interval arithmetic handles the threshold text
            let row = executor.query_one(
                "SELECT (CURRENT_TIMESTAMP - $1::interval)::timestamp",
                &[&retention],
            )?;
            Ok(Some(Bound::Time(row.get(0))))
        }
        PartInterval::Id(interval) => {
            let Ok(retention_distance) = retention.trim().parse::<i64>() else {
                log::warn!(
                    "retention '{retention}' for {} is not a serial distance, skipping",
                    config.parent_table
                );
                return Ok(None);
            };
            let Some(max) =
                inspect::max_control_id(executor, &config.parent_table, &config.control)?
            else {
                return Ok(None);
            };
            let max_lower = crate::boundary::id_lower(max, interval);
            Ok(Some(Bound::Id(max_lower - retention_distance)))
        }
    }
}

/// Drop a detached child's indexes, going through the owning constraint
/// where one exists
fn strip_indexes(executor: &dyn Executor, child: &str) -> Result<()> {
    let rows = executor.query_all(
        "SELECT i.indexrelid::regclass::text, c.conname \
         FROM pg_catalog.pg_index i \
         LEFT JOIN pg_catalog.pg_constraint c ON c.conindid = i.indexrelid \
         WHERE i.indrelid = to_regclass($1)",
        &[&child],
    )?;
    for row in rows {
        let index: String = row.get(0);
        let constraint: Option<String> = row.get(1);
        let sql = match constraint {
            Some(name) => format!("ALTER TABLE {child} DROP CONSTRAINT {name}"),
            None => format!("DROP INDEX {index}"),
        };
        executor.execute(&sql, &[])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{Granularity, PartitionKind};
    use chrono::NaiveDate;

    fn ts(y: i32, mo: u32, d: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn daily_config(retention: Option<&str>) -> PartitionConfig {
        PartitionConfig {
            parent_table: "public.events".to_string(),
            control: "created_at".to_string(),
            kind: PartitionKind::TimeStatic,
            interval: PartInterval::Time(Granularity::Daily),
            constraint_cols: Vec::new(),
            premake: 4,
            inherit_fk: true,
            retention: retention.map(str::to_string),
            retention_schema: None,
            retention_keep_table: true,
            retention_keep_index: true,
            datetime_string: None,
            use_run_maintenance: true,
            undo_in_progress: false,
        }
    }

    #[test]
    fn test_eligibility_boundary() {
        // Child covering [10th, 11th); cutoff at the 11th means its
        // age equals the threshold exactly: never reaped
        let config = daily_config(Some("7 days"));
        let lower = Bound::Time(ts(2024, 8, 10));
        let upper = config.step(lower).unwrap();
        let cutoff = Bound::Time(ts(2024, 8, 11));
        assert!(upper >= cutoff);

        // One day older: reaped
        let cutoff = Bound::Time(ts(2024, 8, 12));
        assert!(upper < cutoff);
    }

    #[test]
    fn test_override_takes_precedence() {
        let config = daily_config(Some("30 days"));
        let overrides = RetentionOverride {
            retention: Some("7 days".to_string()),
            ..Default::default()
        };
        let effective = overrides.retention.clone().or_else(|| config.retention.clone());
        assert_eq!(effective.as_deref(), Some("7 days"));
    }
}
