//! Error types for the partition lifecycle engine.

use thiserror::Error;

/// Engine error type
///
/// Lock-wait exhaustion during data movement is not an error; it is
/// reported through [`crate::mover::MoveOutcome::LockTimeout`] so callers
/// can distinguish "rows locked" from "nothing left to move".
#[derive(Debug, Error)]
pub enum Error {
    /// No catalog row exists for the named parent table
    #[error("no partition configuration found for {0}")]
    ConfigMissing(String),

    /// A catalog row already exists for the named parent table
    #[error("{0} is already configured for partitioning")]
    AlreadyConfigured(String),

    /// Unrecognized partition kind text
    #[error("invalid partition kind: {0}")]
    InvalidPartitionKind(String),

    /// Interval text that cannot be resolved for the partition kind
    #[error("invalid partition interval: {0}")]
    InvalidInterval(String),

    /// Premake must be a positive count of future partitions
    #[error("premake must be greater than zero (got {0})")]
    InvalidPremake(i32),

    /// Parent table missing, unqualified, or otherwise unusable
    #[error("invalid parent table {table}: {reason}")]
    InvalidParent { table: String, reason: String },

    /// A time-custom set has no range row covering the current value
    #[error("no custom range covers the current value for {0}")]
    MissingCurrentRange(String),

    /// Undo refused because a child is itself a partitioned parent
    #[error("{0} has sub-partitioned children; undo them first")]
    MultiLevelUndo(String),

    /// Invalid connection string format
    #[error("invalid connection string: {0}")]
    Connection(String),

    /// Configuration file / environment loading error
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// `PostgreSQL` error from `may_postgres`
    #[error("database error: {0}")]
    Database(#[from] may_postgres::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ConfigMissing("public.events".to_string());
        assert!(err.to_string().contains("public.events"));

        let err = Error::InvalidPremake(0);
        assert!(err.to_string().contains("greater than zero"));

        let err = Error::InvalidParent {
            table: "events".to_string(),
            reason: "must be schema-qualified".to_string(),
        };
        assert!(err.to_string().contains("schema-qualified"));
    }
}
