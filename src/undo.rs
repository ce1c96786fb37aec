//! Dismantling a partition set back into a plain table.
//!
//! Undo reverses partitioning child by child: the routing trigger comes
//! off first so new rows land in the parent, then each child's rows are
//! moved up and the child is uninherited. Multi-level sets must be
//! undone leaf-first; attempting to undo a parent whose children are
//! themselves partitioned is refused outright.

use std::time::Duration;

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::inspect::{self, ChildOrder};
use crate::lock::{SessionLock, UNDO_LOCK};
use crate::mover::{is_lock_contention, MoveOutcome};
use crate::naming;

/// Lock attempts (trigger drop, child rows) before giving up
const LOCK_ATTEMPTS: u32 = 5;

/// Move data out of a set's children and dismantle the set
///
/// Processes up to `batches` non-empty children, oldest first. Empty
/// children are detached without consuming a batch. Once the last child
/// is gone the catalog row is deleted and the parent is an ordinary
/// table again; until then the set stays fenced off from maintenance
/// via `undo_in_progress`.
///
/// Returns `Done { rows: 0 }` without touching anything when another
/// undo holds the lock, and `LockTimeout` when the routing trigger
/// cannot be dropped because of lock contention.
pub fn undo_partition(
    executor: &dyn Executor,
    lock: &dyn SessionLock,
    catalog: &Catalog,
    parent_table: &str,
    batches: u32,
    keep_table: bool,
    lock_wait: f64,
) -> Result<MoveOutcome> {
    let Some(_guard) = lock.try_acquire(executor, UNDO_LOCK)? else {
        log::warn!("another undo is in progress, doing nothing");
        return Ok(MoveOutcome::Done { rows: 0 });
    };

    let config = catalog.get(parent_table)?;
    for child in inspect::raw_children(executor, parent_table)? {
        if inspect::has_children(executor, &child.qualified())? {
            return Err(Error::MultiLevelUndo(parent_table.to_string()));
        }
    }

    catalog.set_undo_in_progress(parent_table, true)?;
    if !drop_routing_trigger(executor, &config.parent_table, lock_wait)? {
        return Ok(MoveOutcome::LockTimeout);
    }

    let mut total: u64 = 0;
    let mut remaining = batches;
    for child in inspect::list_children(executor, &config, ChildOrder::OldestFirst)? {
        let qualified = child.qualified();
        if child_is_empty(executor, &qualified)? {
            // Detaching an empty child costs nothing, so it does not
            // count against the batch budget
            detach_child(executor, catalog, parent_table, &qualified, keep_table)?;
            continue;
        }
        if remaining == 0 {
            break;
        }
        if lock_wait > 0.0 && !lock_child_rows(executor, &qualified, lock_wait)? {
            return Ok(MoveOutcome::LockTimeout);
        }
        let sql = format!(
            "WITH moved AS (DELETE FROM {qualified} RETURNING *) \
             INSERT INTO {parent_table} SELECT * FROM moved"
        );
        let rows = executor.execute(&sql, &[])?;
        log::info!("moved {rows} rows from {qualified} back into {parent_table}");
        total += rows;
        detach_child(executor, catalog, parent_table, &qualified, keep_table)?;
        remaining -= 1;
    }

    if inspect::has_children(executor, parent_table)? {
        log::info!("{parent_table} still has children, run undo again to finish");
    } else {
        catalog.delete(parent_table)?;
        log::info!("{parent_table} fully unpartitioned, configuration removed");
    }
    Ok(MoveOutcome::Done { rows: total })
}

/// Drop the routing trigger and its function under a lock timeout
///
/// `DROP TRIGGER` needs an exclusive lock on the parent, so long-running
/// writers can starve it indefinitely. Each attempt bounds the wait with
/// `lock_timeout`; exhaustion reports contention to the caller.
fn drop_routing_trigger(
    executor: &dyn Executor,
    parent_table: &str,
    lock_wait: f64,
) -> Result<bool> {
    let (schema, table) = naming::split_qualified(parent_table).unwrap_or(("public", parent_table));
    let trigger = naming::trigger_name(table);
    let function = format!("{schema}.{}", naming::trigger_function_name(table));
    let timeout_ms = ((lock_wait.max(0.1) * 1000.0) / f64::from(LOCK_ATTEMPTS)) as u64;
    let drop_sql = format!("DROP TRIGGER IF EXISTS {trigger} ON {parent_table}");

    executor.execute(&format!("SET lock_timeout = '{timeout_ms}ms'"), &[])?;
    let mut dropped = false;
    let mut failure = None;
    for attempt in 1..=LOCK_ATTEMPTS {
        match executor.execute(&drop_sql, &[]) {
            Ok(_) => {
                dropped = true;
                break;
            }
            Err(Error::Database(e)) if is_lock_contention(&e) => {
                log::debug!(
                    "trigger drop attempt {attempt}/{LOCK_ATTEMPTS} on {parent_table} contended"
                );
                std::thread::sleep(Duration::from_secs_f64(
                    lock_wait.max(0.1) / f64::from(LOCK_ATTEMPTS),
                ));
            }
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }
    executor.execute("RESET lock_timeout", &[])?;
    if let Some(e) = failure {
        return Err(e);
    }
    if !dropped {
        log::warn!("could not drop routing trigger on {parent_table}, giving up");
        return Ok(false);
    }
    executor.execute(&format!("DROP FUNCTION IF EXISTS {function}()"), &[])?;
    Ok(true)
}

/// Lock a child's rows before draining it, retrying on contention
fn lock_child_rows(executor: &dyn Executor, child: &str, lock_wait: f64) -> Result<bool> {
    let sql = format!("SELECT 1 FROM {child} FOR UPDATE NOWAIT");
    for attempt in 1..=LOCK_ATTEMPTS {
        match executor.query_all(&sql, &[]) {
            Ok(_) => return Ok(true),
            Err(Error::Database(e)) if is_lock_contention(&e) => {
                log::debug!("row lock attempt {attempt}/{LOCK_ATTEMPTS} on {child} contended");
                std::thread::sleep(Duration::from_secs_f64(
                    lock_wait / f64::from(LOCK_ATTEMPTS),
                ));
            }
            Err(e) => return Err(e),
        }
    }
    log::warn!("could not lock rows in {child}, giving up");
    Ok(false)
}

fn child_is_empty(executor: &dyn Executor, child: &str) -> Result<bool> {
    let row = executor.query_opt(&format!("SELECT 1 FROM {child} LIMIT 1"), &[])?;
    Ok(row.is_none())
}

/// Uninherit a drained child and drop it unless it is being kept
fn detach_child(
    executor: &dyn Executor,
    catalog: &Catalog,
    parent_table: &str,
    child: &str,
    keep_table: bool,
) -> Result<()> {
    executor.execute(
        &format!("ALTER TABLE {child} NO INHERIT {parent_table}"),
        &[],
    )?;
    catalog.delete_custom_range(parent_table, child)?;
    if keep_table {
        log::info!("{child} detached from {parent_table} and kept");
    } else {
        executor.execute(&format!("DROP TABLE IF EXISTS {child}"), &[])?;
        log::info!("{child} detached from {parent_table} and dropped");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_drop_sql_bounds_lock_wait() {
        // 5 second budget split over 5 attempts: 1000ms per try
        let timeout_ms = ((5.0_f64 * 1000.0) / f64::from(LOCK_ATTEMPTS)) as u64;
        assert_eq!(timeout_ms, 1000);
    }

    #[test]
    fn test_trigger_names_derive_from_parent() {
        assert_eq!(naming::trigger_name("events"), "events_part_trig");
        assert_eq!(
            naming::trigger_function_name("events"),
            "events_part_trig_func"
        );
    }
}
