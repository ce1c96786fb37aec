//! Moving resident parent rows into their children.
//!
//! Rows that landed in the parent (pre-existing data, routing
//! fall-through) are moved batch by batch: each batch takes the current
//! extreme value still in the parent, computes the window owning it,
//! materializes the target child if needed, and moves the window in one
//! atomic `DELETE ... RETURNING` / `INSERT` statement. A batch window
//! never straddles a partition boundary.

use std::time::Duration;

use crate::boundary::PartitionKind;
use crate::catalog::{Bound, Catalog, PartInterval, PartitionConfig};
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::inspect;
use crate::materializer::Materializer;
use crate::naming;
use crate::router;

/// Result of a data movement call
///
/// `LockTimeout` is distinct from `Done { rows: 0 }`: the former means
/// contended rows blocked the batch, the latter that nothing was left
/// to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Done { rows: u64 },
    LockTimeout,
}

impl MoveOutcome {
    /// Collapse to the signed convention: rows moved, or -1 for lock
    /// exhaustion
    pub fn as_signed(&self) -> i64 {
        match self {
            Self::Done { rows } => *rows as i64,
            Self::LockTimeout => -1,
        }
    }
}

/// Which end of the resident data each batch takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOrder {
    /// Oldest/lowest values first
    Ascending,
    /// Newest/highest values first
    Descending,
}

/// Row-lock attempts before giving up on a contended window
const LOCK_ATTEMPTS: u32 = 5;

/// Move up to `batches` windows of resident rows into children
///
/// `batch_interval` subdivides a partition into smaller windows; it is
/// clamped to the partition interval. With `lock_wait > 0` each window
/// is first locked with `FOR UPDATE NOWAIT`, retried [`LOCK_ATTEMPTS`]
/// times sleeping `lock_wait / 5` seconds between attempts.
pub fn partition_data(
    executor: &dyn Executor,
    catalog: &Catalog,
    config: &PartitionConfig,
    batches: u32,
    batch_interval: Option<&str>,
    lock_wait: f64,
    order: MoveOrder,
) -> Result<MoveOutcome> {
    let batch = resolve_batch_interval(config, batch_interval)?;
    let materializer = Materializer::new(executor);
    let mut total: u64 = 0;

    for _ in 0..batches {
        let Some(value) = extreme_resident_value(executor, config, order)? else {
            break;
        };

        // Custom sets route by their recorded ranges, which need not be
        // calendar-aligned; everything else derives the owning partition
        // from the value
        let recorded = if config.kind == PartitionKind::TimeCustom {
            match value {
                Bound::Time(v) => catalog.custom_range_for(&config.parent_table, v)?,
                Bound::Id(_) => None,
            }
        } else {
            None
        };
        let window = match &recorded {
            Some(range) => clip_window(
                batch,
                value,
                Bound::Time(range.range_start),
                Bound::Time(range.range_end),
            ),
            None => batch_window(config, batch, value),
        };
        let Some((partition_lower, window_lower, window_upper)) = window else {
            break;
        };

        let child = match &recorded {
            Some(range) => range.child_table.clone(),
            None => {
                materializer.create_partitions(catalog, config, &[partition_lower])?;
                let Some(suffix) = config.format_suffix(partition_lower) else {
                    break;
                };
                naming::child_table(config.schema(), config.table(), &suffix)
            }
        };

        if lock_wait > 0.0 && !lock_window(executor, config, window_lower, window_upper, lock_wait)? {
            return Ok(MoveOutcome::LockTimeout);
        }
        let control = &config.control;
        let sql = format!(
            "WITH batch AS (\
             DELETE FROM ONLY {} WHERE {control} >= {} AND {control} < {} RETURNING *\
             ) INSERT INTO {child} SELECT * FROM batch",
            config.parent_table,
            window_lower.sql_literal(),
            window_upper.sql_literal()
        );
        let rows = executor.execute(&sql, &[])?;
        if rows == 0 {
            break;
        }
        log::info!("moved {rows} rows from {} into {child}", config.parent_table);
        total += rows;
    }

    if total > 0 && config.kind.is_static() {
        // Boundaries may have new children now; refresh the ladder
        router::synthesize(executor, config)?;
    }
    Ok(MoveOutcome::Done { rows: total })
}

/// Parse and clamp the requested batch interval
fn resolve_batch_interval(
    config: &PartitionConfig,
    batch_interval: Option<&str>,
) -> Result<PartInterval> {
    let Some(text) = batch_interval else {
        return Ok(config.interval);
    };
    let requested = PartInterval::parse(config.kind, text)?;
    let clamped = match (config.interval, requested) {
        (PartInterval::Time(part), PartInterval::Time(batch)) if batch > part => {
            log::warn!("batch interval coarser than the partition interval, clamped");
            config.interval
        }
        (PartInterval::Id(part), PartInterval::Id(batch)) if batch > part => {
            log::warn!("batch interval wider than the partition interval, clamped");
            config.interval
        }
        // Arbitrary-interval sets compare in seconds; a month-based
        // batch has no fixed length and is clamped outright
        (PartInterval::CustomTime(part), batch) => match batch_seconds(batch) {
            Some(s) if s <= part => PartInterval::CustomTime(s),
            _ => {
                log::warn!("batch interval coarser than the partition interval, clamped");
                config.interval
            }
        },
        (PartInterval::Time(part), PartInterval::CustomTime(batch)) => {
            match part.fixed_seconds() {
                Some(ps) if batch > ps => {
                    log::warn!("batch interval coarser than the partition interval, clamped");
                    config.interval
                }
                _ => requested,
            }
        }
        _ => requested,
    };
    Ok(clamped)
}

/// Fixed length of a batch interval in seconds, where one exists
fn batch_seconds(batch: PartInterval) -> Option<i64> {
    match batch {
        PartInterval::CustomTime(s) => Some(s),
        PartInterval::Time(g) => g.fixed_seconds(),
        PartInterval::Id(_) => None,
    }
}

/// The extreme control value still resident in the parent itself
fn extreme_resident_value(
    executor: &dyn Executor,
    config: &PartitionConfig,
    order: MoveOrder,
) -> Result<Option<Bound>> {
    let parent = &config.parent_table;
    let control = &config.control;
    match config.interval {
        PartInterval::Time(_) | PartInterval::CustomTime(_) => {
            let value = match order {
                MoveOrder::Ascending => {
                    inspect::min_time_in_parent_only(executor, parent, control)?
                }
                MoveOrder::Descending => {
                    inspect::max_time_in_parent_only(executor, parent, control)?
                }
            };
            Ok(value.map(Bound::Time))
        }
        PartInterval::Id(_) => {
            let value = match order {
                MoveOrder::Ascending => {
                    inspect::min_id_in_parent_only(executor, parent, control)?
                }
                MoveOrder::Descending => {
                    inspect::max_id_in_parent_only(executor, parent, control)?
                }
            };
            Ok(value.map(Bound::Id))
        }
    }
}

/// The window owning `value`: partition lower boundary plus the batch
/// sub-window, clipped so it never crosses the partition's upper bound
fn batch_window(
    config: &PartitionConfig,
    batch: PartInterval,
    value: Bound,
) -> Option<(Bound, Bound, Bound)> {
    let partition_lower = config.truncate(value)?;
    let partition_upper = config.step(partition_lower)?;
    clip_window(batch, value, partition_lower, partition_upper)
}

/// Clip the batch sub-window holding `value` to a known partition range
fn clip_window(
    batch: PartInterval,
    value: Bound,
    partition_lower: Bound,
    partition_upper: Bound,
) -> Option<(Bound, Bound, Bound)> {
    let (window_lower, window_upper) = match (batch, value) {
        (PartInterval::Time(g), Bound::Time(v)) => {
            let lower = Bound::Time(g.truncate(v)).max(partition_lower);
            let upper = match lower {
                Bound::Time(l) => Bound::Time(g.step(l)?),
                Bound::Id(_) => return None,
            };
            (lower, upper.min(partition_upper))
        }
        // Sub-windows of an arbitrary-interval partition anchor on the
        // partition's own lower bound, not on any calendar grid
        (PartInterval::CustomTime(s), Bound::Time(v)) => {
            let base = partition_lower.time()?;
            let k = (v - base).num_seconds().div_euclid(s);
            let lower_ts = base.checked_add_signed(chrono::Duration::seconds(k * s))?;
            let lower = Bound::Time(lower_ts).max(partition_lower);
            let upper = match lower {
                Bound::Time(l) => {
                    Bound::Time(l.checked_add_signed(chrono::Duration::seconds(s))?)
                }
                Bound::Id(_) => return None,
            };
            (lower, upper.min(partition_upper))
        }
        (PartInterval::Id(i), Bound::Id(v)) => {
            let lower = Bound::Id(crate::boundary::id_lower(v, i)).max(partition_lower);
            let upper = match lower {
                Bound::Id(l) => Bound::Id(l.checked_add(i)?),
                Bound::Time(_) => return None,
            };
            (lower, upper.min(partition_upper))
        }
        _ => return None,
    };
    Some((partition_lower, window_lower, window_upper))
}

/// Lock the window's rows, retrying on contention
fn lock_window(
    executor: &dyn Executor,
    config: &PartitionConfig,
    lower: Bound,
    upper: Bound,
    lock_wait: f64,
) -> Result<bool> {
    let control = &config.control;
    let sql = format!(
        "SELECT {control} FROM ONLY {} WHERE {control} >= {} AND {control} < {} \
         FOR UPDATE NOWAIT",
        config.parent_table,
        lower.sql_literal(),
        upper.sql_literal()
    );
    for attempt in 1..=LOCK_ATTEMPTS {
        match executor.query_all(&sql, &[]) {
            Ok(_) => return Ok(true),
            Err(Error::Database(e)) if is_lock_contention(&e) => {
                log::debug!(
                    "window lock attempt {attempt}/{LOCK_ATTEMPTS} on {} contended",
                    config.parent_table
                );
                std::thread::sleep(Duration::from_secs_f64(lock_wait / f64::from(LOCK_ATTEMPTS)));
            }
            Err(e) => return Err(e),
        }
    }
    log::warn!("could not lock rows in {}, giving up", config.parent_table);
    Ok(false)
}

pub(crate) fn is_lock_contention(e: &may_postgres::Error) -> bool {
    let msg = e.to_string();
    msg.contains("could not obtain lock") || msg.contains("lock timeout")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::Granularity;
    use chrono::NaiveDate;

    fn ts(y: i32, mo: u32, d: u32, h: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
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
    fn test_outcome_signed_mapping() {
        assert_eq!(MoveOutcome::Done { rows: 42 }.as_signed(), 42);
        assert_eq!(MoveOutcome::Done { rows: 0 }.as_signed(), 0);
        assert_eq!(MoveOutcome::LockTimeout.as_signed(), -1);
    }

    #[test]
    fn test_batch_window_whole_partition() {
        let c = config(
            PartInterval::Time(Granularity::Daily),
            PartitionKind::TimeStatic,
        );
        let (part, lower, upper) = batch_window(
            &c,
            c.interval,
            Bound::Time(ts(2024, 8, 17, 9)),
        )
        .unwrap();
        assert_eq!(part, Bound::Time(ts(2024, 8, 17, 0)));
        assert_eq!(lower, Bound::Time(ts(2024, 8, 17, 0)));
        assert_eq!(upper, Bound::Time(ts(2024, 8, 18, 0)));
    }

    #[test]
    fn test_batch_window_sub_interval() {
        // Hourly batches within a daily partition
        let c = config(
            PartInterval::Time(Granularity::Daily),
            PartitionKind::TimeStatic,
        );
        let (part, lower, upper) = batch_window(
            &c,
            PartInterval::Time(Granularity::Hourly),
            Bound::Time(ts(2024, 8, 17, 9)),
        )
        .unwrap();
        assert_eq!(part, Bound::Time(ts(2024, 8, 17, 0)));
        assert_eq!(lower, Bound::Time(ts(2024, 8, 17, 9)));
        assert_eq!(upper, Bound::Time(ts(2024, 8, 17, 10)));
    }

    #[test]
    fn test_batch_window_never_straddles() {
        // A weekly batch window inside a daily partition clips to the
        // partition's own range
        let c = config(
            PartInterval::Time(Granularity::Daily),
            PartitionKind::TimeStatic,
        );
        let (part, lower, upper) = batch_window(
            &c,
            PartInterval::Time(Granularity::Weekly),
            Bound::Time(ts(2024, 8, 14, 9)), // Wednesday
        )
        .unwrap();
        assert_eq!(part, Bound::Time(ts(2024, 8, 14, 0)));
        // Week truncation lands before the partition; clamped up
        assert_eq!(lower, Bound::Time(ts(2024, 8, 14, 0)));
        assert_eq!(upper, Bound::Time(ts(2024, 8, 15, 0)));
    }

    #[test]
    fn test_batch_window_id() {
        let c = config(PartInterval::Id(10_000), PartitionKind::IdStatic);
        let (part, lower, upper) =
            batch_window(&c, PartInterval::Id(1_000), Bound::Id(54_321)).unwrap();
        assert_eq!(part, Bound::Id(50_000));
        assert_eq!(lower, Bound::Id(54_000));
        assert_eq!(upper, Bound::Id(55_000));
    }

    #[test]
    fn test_clip_window_unaligned_range() {
        // A recorded custom range need not be calendar-aligned; the
        // window clips to the recorded bounds, not the truncation
        let (_, lower, upper) = clip_window(
            PartInterval::Time(Granularity::Daily),
            Bound::Time(ts(2024, 8, 17, 9)),
            Bound::Time(ts(2024, 8, 16, 12)),
            Bound::Time(ts(2024, 8, 19, 12)),
        )
        .unwrap();
        assert_eq!(lower, Bound::Time(ts(2024, 8, 17, 0)));
        assert_eq!(upper, Bound::Time(ts(2024, 8, 18, 0)));
    }

    #[test]
    fn test_clip_window_custom_sub_batches_anchor_on_partition() {
        // 30-minute batches inside a 90-minute partition that sits off
        // the calendar grid anchor on the partition's own lower bound
        let lower_bound = ts(2024, 8, 17, 9) + chrono::Duration::minutes(15);
        let value = ts(2024, 8, 17, 9) + chrono::Duration::minutes(50);
        let upper_bound = ts(2024, 8, 17, 10) + chrono::Duration::minutes(45);
        let (_, lower, upper) = clip_window(
            PartInterval::CustomTime(1_800),
            Bound::Time(value),
            Bound::Time(lower_bound),
            Bound::Time(upper_bound),
        )
        .unwrap();
        assert_eq!(
            lower,
            Bound::Time(ts(2024, 8, 17, 9) + chrono::Duration::minutes(45))
        );
        assert_eq!(
            upper,
            Bound::Time(ts(2024, 8, 17, 10) + chrono::Duration::minutes(15))
        );
    }

    #[test]
    fn test_resolve_batch_custom_interval() {
        let c = config(PartInterval::CustomTime(5_400), PartitionKind::TimeCustom);
        let batch = resolve_batch_interval(&c, Some("30 mins")).unwrap();
        assert_eq!(batch, PartInterval::CustomTime(1_800));
        // Coarser than the partition clamps to it
        let batch = resolve_batch_interval(&c, Some("1 day")).unwrap();
        assert_eq!(batch, c.interval);
    }

    #[test]
    fn test_resolve_batch_clamps_coarser() {
        let c = config(
            PartInterval::Time(Granularity::Daily),
            PartitionKind::TimeStatic,
        );
        let batch = resolve_batch_interval(&c, Some("1 month")).unwrap();
        assert_eq!(batch, c.interval);

        let batch = resolve_batch_interval(&c, Some("1 hour")).unwrap();
        assert_eq!(batch, PartInterval::Time(Granularity::Hourly));
    }
}
