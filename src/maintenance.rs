//! Scheduled maintenance over all managed sets.
//!
//! One pass keeps every maintenance-served set `premake` partitions
//! ahead of its current boundary, then runs retention for every set
//! with a threshold. The pass is cooperative: a second invocation that
//! finds the advisory lock held returns an empty report immediately.
//!
//! Failures are per set. A broken set lands in the report's warnings
//! and the pass moves on to the next one.

use crate::catalog::{Bound, Catalog, PartInterval, PartitionConfig};
use crate::error::{Error, Result};
use crate::executor::{current_timestamp, Executor};
use crate::inspect;
use crate::lock::{SessionLock, MAINTENANCE_LOCK};
use crate::materializer::Materializer;
use crate::retention::{self, RetentionOverride};
use crate::router;

/// Structured outcome of a maintenance pass
#[derive(Debug, Default)]
pub struct MaintenanceReport {
    /// Qualified names of children created
    pub created: Vec<String>,
    /// Qualified names of children reaped by retention
    pub dropped: Vec<String>,
    /// Parent tables skipped (undo fence, lock contention)
    pub skipped: Vec<String>,
    /// Per-set problems that did not abort the pass
    pub warnings: Vec<String>,
}

impl MaintenanceReport {
    /// Whether the pass changed anything
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.dropped.is_empty()
    }
}

/// Run one maintenance pass
///
/// `target` restricts the pass to that single parent table and serves it
/// whether or not the set is maintenance-enabled; `None` sweeps every
/// maintenance-enabled set.
///
/// # Errors
///
/// Returns `Error::ConfigMissing` when `target` names an unmanaged
/// table.
pub fn run_maintenance(
    executor: &dyn Executor,
    lock: &dyn SessionLock,
    target: Option<&str>,
) -> Result<MaintenanceReport> {
    let mut report = MaintenanceReport::default();

    let catalog = Catalog::new(executor);
    let targeted = match target {
        Some(t) => Some(catalog.get(t)?),
        None => None,
    };

    let Some(_guard) = lock.try_acquire(executor, MAINTENANCE_LOCK)? else {
        log::info!("maintenance already running elsewhere, nothing to do");
        report.warnings.push("maintenance already running elsewhere".to_string());
        return Ok(report);
    };

    let sets = match &targeted {
        Some(config) => vec![config.clone()],
        None => catalog.list(true)?,
    };
    for config in sets {
        if config.undo_in_progress {
            log::info!("{} is being undone, skipped", config.parent_table);
            report.skipped.push(config.parent_table.clone());
            continue;
        }

        match maintain_set(executor, &catalog, &config) {
            Ok(SetOutcome::Created(children)) => {
                if !children.is_empty() {
                    let sql = format!("ANALYZE {}", config.parent_table);
                    executor.execute(&sql, &[])?;
                }
                report.created.extend(children);
            }
            Ok(SetOutcome::Skipped(reason)) => {
                report.warnings.push(format!("{}: {reason}", config.parent_table));
                report.skipped.push(config.parent_table.clone());
            }
            Err(e) => {
                log::error!("maintenance failed for {}: {e}", config.parent_table);
                report.warnings.push(format!("{}: {e}", config.parent_table));
            }
        }
    }

    // Retention pass, for every set with a threshold
    let retention_sets = match &targeted {
        Some(config) => vec![config.clone()],
        None => catalog.list(false)?,
    };
    for config in retention_sets {
        if config.undo_in_progress || config.retention.is_none() {
            continue;
        }
        match retention::drop_eligible(
            executor,
            lock,
            &catalog,
            &config,
            &RetentionOverride::default(),
        ) {
            Ok(reaped) => report.dropped.extend(reaped),
            Err(e) => {
                log::error!("retention failed for {}: {e}", config.parent_table);
                report.warnings.push(format!("{}: {e}", config.parent_table));
            }
        }
    }

    Ok(report)
}

enum SetOutcome {
    Created(Vec<String>),
    Skipped(String),
}

/// Top up one set to `premake` partitions ahead of its current boundary
fn maintain_set(
    executor: &dyn Executor,
    catalog: &Catalog,
    config: &PartitionConfig,
) -> Result<SetOutcome> {
    let current = match current_set_bound(executor, catalog, config)? {
        Some(b) => b,
        None => return Ok(SetOutcome::Skipped("set holds no data yet".to_string())),
    };
    let newest = match inspect::newest_child_bound(executor, config)? {
        Some(b) => b,
        None => {
            // No children left (for example after a partial undo was
            // reverted); restart the series at the current boundary
            current
        }
    };

    // Never create a child that would overlap data already past the
    // newest boundary: a serial set whose values ran ahead of its
    // children needs operator attention, not overlapping partitions
    if let (PartInterval::Id(_), Bound::Id(newest_lower)) = (config.interval, newest) {
        if let Some(max) =
            inspect::max_control_id(executor, &config.parent_table, &config.control)?
        {
            let newest_upper = config
                .step(newest)
                .and_then(Bound::id)
                .unwrap_or(newest_lower);
            if max >= newest_upper {
                return Ok(SetOutcome::Skipped(format!(
                    "max {} value {max} is beyond the newest child's range",
                    config.control
                )));
            }
        }
    }

    let materializer = Materializer::new(executor);
    let mut created = Vec::new();
    let mut cursor = newest;
    while premade_count(config, current, cursor) < i64::from(config.premake) {
        let Some(next) = config.step(cursor) else {
            log::warn!(
                "boundary after {} overflows, {} stops premaking",
                cursor.sql_literal(),
                config.parent_table
            );
            break;
        };
        created.extend(materializer.create_partitions(catalog, config, &[next])?);
        cursor = next;
    }

    if !created.is_empty() {
        if config.kind.is_static() {
            router::synthesize(executor, config)?;
        }
        materializer.apply_constraints(config, None)?;
    }
    Ok(SetOutcome::Created(created))
}

/// The boundary owning the set's current value, `None` when undecidable
fn current_set_bound(
    executor: &dyn Executor,
    catalog: &Catalog,
    config: &PartitionConfig,
) -> Result<Option<Bound>> {
    match config.interval {
        PartInterval::Time(_) | PartInterval::CustomTime(_) => {
            let now = current_timestamp(executor)?;
            if config.kind == crate::boundary::PartitionKind::TimeCustom {
                // Custom sets have no computable boundary; the covering
                // range row defines it
                let range = catalog
                    .custom_range_for(&config.parent_table, now)?
                    .ok_or_else(|| Error::MissingCurrentRange(config.parent_table.clone()))?;
                return Ok(Some(Bound::Time(range.range_start)));
            }
            Ok(config.truncate(Bound::Time(now)))
        }
        PartInterval::Id(_) => {
            let max =
                inspect::max_control_id(executor, &config.parent_table, &config.control)?;
            match max {
                Some(v) => Ok(config.truncate(Bound::Id(v))),
                None => Ok(config.truncate(Bound::Id(0))),
            }
        }
    }
}

/// How many whole intervals `newest` sits ahead of `current`
fn premade_count(config: &PartitionConfig, current: Bound, newest: Bound) -> i64 {
    match (config.interval, current, newest) {
        (PartInterval::Time(g), Bound::Time(c), Bound::Time(n)) => g.steps_between(c, n),
        (PartInterval::CustomTime(s), Bound::Time(c), Bound::Time(n)) => {
            (n - c).num_seconds() / s
        }
        (PartInterval::Id(i), Bound::Id(c), Bound::Id(n)) => (n - c) / i,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{Granularity, PartitionKind};
    use crate::lock::PgAdvisoryLock;
    use chrono::NaiveDate;
    use may_postgres::types::ToSql;
    use may_postgres::Row;

    fn ts(y: i32, mo: u32, d: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn config(interval: PartInterval, kind: PartitionKind) -> PartitionConfig {
        PartitionConfig {
            parent_table: "public.events".to_string(),
            control: "created_at".to_string(),
            kind,
            interval,
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
    fn test_premade_count_time() {
        let c = config(
            PartInterval::Time(Granularity::Daily),
            PartitionKind::TimeStatic,
        );
        assert_eq!(
            premade_count(&c, Bound::Time(ts(2024, 8, 17)), Bound::Time(ts(2024, 8, 21))),
            4
        );
        assert_eq!(
            premade_count(&c, Bound::Time(ts(2024, 8, 17)), Bound::Time(ts(2024, 8, 17))),
            0
        );
    }

    #[test]
    fn test_premade_count_id() {
        let c = config(PartInterval::Id(10_000), PartitionKind::IdStatic);
        assert_eq!(premade_count(&c, Bound::Id(50_000), Bound::Id(90_000)), 4);
        assert_eq!(premade_count(&c, Bound::Id(50_000), Bound::Id(50_000)), 0);
    }

    #[test]
    fn test_premake_increase_needs_more_children() {
        // After raising premake from 4 to 6, a set premade 4 ahead is
        // two short; the loop condition must keep firing
        let mut c = config(
            PartInterval::Time(Granularity::Daily),
            PartitionKind::TimeStatic,
        );
        c.premake = 6;
        let current = Bound::Time(ts(2024, 8, 17));
        let mut cursor = Bound::Time(ts(2024, 8, 21));
        let mut added = 0;
        while premade_count(&c, current, cursor) < i64::from(c.premake) {
            cursor = c.step(cursor).unwrap();
            added += 1;
        }
        assert_eq!(added, 2);
    }

    #[test]
    fn test_report_noop() {
        let report = MaintenanceReport::default();
        assert!(report.is_noop());
    }

    #[test]
    fn test_premade_count_custom_interval() {
        let c = config(PartInterval::CustomTime(5_400), PartitionKind::TimeCustom);
        let current = Bound::Time(ts(2024, 8, 17));
        let newest = c.step(c.step(current).unwrap()).unwrap();
        assert_eq!(premade_count(&c, current, newest), 2);
    }

    /// Executor over a database with no catalog rows
    struct EmptyCatalog;

    impl Executor for EmptyCatalog {
        fn execute(&self, _query: &str, _params: &[&dyn ToSql]) -> crate::error::Result<u64> {
            Ok(0)
        }

        fn query_one(&self, _query: &str, _params: &[&dyn ToSql]) -> crate::error::Result<Row> {
            Err(Error::Connection("no rows".to_string()))
        }

        fn query_opt(
            &self,
            _query: &str,
            _params: &[&dyn ToSql],
        ) -> crate::error::Result<Option<Row>> {
            Ok(None)
        }

        fn query_all(
            &self,
            _query: &str,
            _params: &[&dyn ToSql],
        ) -> crate::error::Result<Vec<Row>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_target_without_config_is_an_error() {
        // Naming an unmanaged table is a caller mistake, not an empty
        // sweep
        let executor = EmptyCatalog;
        let err = run_maintenance(&executor, &PgAdvisoryLock, Some("public.ghost"))
            .unwrap_err();
        assert!(matches!(err, Error::ConfigMissing(_)));
    }
}
