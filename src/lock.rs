//! Cooperative advisory locking for engine operations.
//!
//! Maintenance, retention, and undo each serialize themselves under their
//! own named lock. Acquisition never blocks: a second caller finding the
//! lock held returns immediately and reports a no-op, it does not queue.
//!
//! The lock source is pluggable through [`SessionLock`] so the engine can
//! run against anything that offers try-acquire semantics. The default
//! implementation uses `PostgreSQL` advisory locks keyed by `hashtext()`
//! of the lock name.

use crate::error::Result;
use crate::executor::Executor;

/// Lock name for the maintenance orchestrator
pub const MAINTENANCE_LOCK: &str = "groundskeeper run_maintenance";
/// Lock name for the retention reaper
pub const RETENTION_LOCK: &str = "groundskeeper drop_partitions";
/// Lock name for the undo engine
pub const UNDO_LOCK: &str = "groundskeeper undo_partition";

/// Try-acquire lock source
///
/// Implementations must never block: `try_acquire` returns `Ok(None)`
/// when the lock is already held elsewhere.
pub trait SessionLock {
    /// Attempt to acquire the named lock
    ///
    /// Returns a guard that releases the lock when dropped, or `None` if
    /// the lock is held by another session.
    ///
    /// # Errors
    ///
    /// Returns an error only if the acquisition attempt itself fails,
    /// never for contention.
    fn try_acquire<'a>(
        &self,
        executor: &'a dyn Executor,
        name: &str,
    ) -> Result<Option<SessionLockGuard<'a>>>;
}

/// Guard that automatically releases the lock when dropped
///
/// Ensures locks are always released, even if an error occurs mid-operation.
pub struct SessionLockGuard<'a> {
    executor: &'a dyn Executor,
    release_sql: &'static str,
    name: String,
}

impl<'a> SessionLockGuard<'a> {
    /// Build a guard around an already-acquired lock
    pub fn new(executor: &'a dyn Executor, release_sql: &'static str, name: String) -> Self {
        Self {
            executor,
            release_sql,
            name,
        }
    }

    /// The lock name this guard holds
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for SessionLockGuard<'_> {
    fn drop(&mut self) {
        // Ignore errors during drop - we can't propagate them
        if let Err(e) = self.executor.execute(self.release_sql, &[&self.name]) {
            log::warn!("failed to release lock '{}': {}", self.name, e);
        }
    }
}

/// Advisory locks via `pg_try_advisory_lock(hashtext(name))`
///
/// Session-scoped: the lock is tied to the executor's connection and is
/// released by the guard (or by the server when the connection closes).
#[derive(Debug, Default, Clone, Copy)]
pub struct PgAdvisoryLock;

impl SessionLock for PgAdvisoryLock {
    fn try_acquire<'a>(
        &self,
        executor: &'a dyn Executor,
        name: &str,
    ) -> Result<Option<SessionLockGuard<'a>>> {
        let row = executor.query_one("SELECT pg_try_advisory_lock(hashtext($1))", &[&name])?;
        let acquired: bool = row.get(0);

        if acquired {
            log::debug!("acquired advisory lock '{}'", name);
            Ok(Some(SessionLockGuard::new(
                executor,
                "SELECT pg_advisory_unlock(hashtext($1))",
                name.to_string(),
            )))
        } else {
            log::debug!("advisory lock '{}' held elsewhere", name);
            Ok(None)
        }
    }
}
