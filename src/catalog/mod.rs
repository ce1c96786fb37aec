//! Partition set catalog.
//!
//! The catalog is the durable record of every managed partition set,
//! stored in the target database itself (see [`schema`]). All reads go to
//! the database every time; nothing is cached in process, so concurrent
//! engine invocations always observe each other's changes.
//!
//! Validation happens at write time: a row that made it into
//! `part_config` is trusted by every other module.

pub mod schema;

use chrono::NaiveDateTime;
use may_postgres::Row;
use std::sync::OnceLock;

use crate::boundary::{Granularity, PartitionKind};
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::naming;

pub use schema::{install, CATALOG_SCHEMA};

/// Partition interval, resolved against the set's kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartInterval {
    Time(Granularity),
    /// Arbitrary fixed-length interval in whole seconds, time-custom only
    CustomTime(i64),
    Id(i64),
}

impl PartInterval {
    /// Parse the catalog text form for a given kind
    ///
    /// Time-custom accepts any fixed-length interval of at least one
    /// second on top of the calendar menu; the other time kinds are
    /// restricted to the menu.
    pub fn parse(kind: PartitionKind, text: &str) -> Result<Self> {
        if kind.is_time() {
            if let Some(g) = Granularity::from_part_interval(text) {
                return Ok(Self::Time(g));
            }
            if kind == PartitionKind::TimeCustom {
                if let Some(seconds) = crate::boundary::parse_custom_interval(text) {
                    return Ok(Self::CustomTime(seconds));
                }
            }
            Err(Error::InvalidInterval(text.to_string()))
        } else {
            let interval: i64 = text
                .trim()
                .parse()
                .map_err(|_| Error::InvalidInterval(text.to_string()))?;
            if interval <= 1 {
                return Err(Error::InvalidInterval(text.to_string()));
            }
            Ok(Self::Id(interval))
        }
    }

    /// Text stored in `part_config.part_interval`
    pub fn as_text(&self) -> String {
        match self {
            Self::Time(g) => g.interval_sql().to_string(),
            Self::CustomTime(s) => format!("{s} secs"),
            Self::Id(i) => i.to_string(),
        }
    }

    pub fn granularity(&self) -> Option<Granularity> {
        match self {
            Self::Time(g) => Some(*g),
            Self::CustomTime(_) | Self::Id(_) => None,
        }
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            Self::Time(_) | Self::CustomTime(_) => None,
            Self::Id(i) => Some(*i),
        }
    }

    /// Suffix pattern stamped into this interval's child names
    pub fn suffix_pattern(&self) -> Option<&'static str> {
        match self {
            Self::Time(g) => Some(g.suffix_pattern()),
            Self::CustomTime(_) => Some(crate::boundary::CUSTOM_DATETIME_STRING),
            Self::Id(_) => None,
        }
    }
}

/// A partition boundary value, time or serial depending on the set's kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Bound {
    Id(i64),
    Time(NaiveDateTime),
}

impl Bound {
    pub fn time(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Time(t) => Some(*t),
            Self::Id(_) => None,
        }
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            Self::Id(i) => Some(*i),
            Self::Time(_) => None,
        }
    }

    /// SQL literal for use in generated DDL
    pub fn sql_literal(&self) -> String {
        match self {
            Self::Id(i) => i.to_string(),
            Self::Time(t) => format!("'{}'", t.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// One managed partition set, as stored in `part_config`
#[derive(Debug, Clone)]
pub struct PartitionConfig {
    /// Schema-qualified parent table name
    pub parent_table: String,
    /// Partitioning column
    pub control: String,
    pub kind: PartitionKind,
    pub interval: PartInterval,
    /// Columns to apply min/max pruning constraints to on aged children
    pub constraint_cols: Vec<String>,
    /// Partitions kept premade ahead of the current boundary
    pub premake: i32,
    /// Replicate the parent's outgoing foreign keys onto new children
    pub inherit_fk: bool,
    /// Retention threshold: SQL interval text (time) or integer text (id)
    pub retention: Option<String>,
    /// Archive schema for reaped children instead of dropping them
    pub retention_schema: Option<String>,
    pub retention_keep_table: bool,
    pub retention_keep_index: bool,
    /// Suffix pattern for this set's children (informational)
    pub datetime_string: Option<String>,
    /// Whether the set is served by the maintenance orchestrator
    pub use_run_maintenance: bool,
    /// Set while an undo is running; fences maintenance and retention
    pub undo_in_progress: bool,
}

impl PartitionConfig {
    pub fn schema(&self) -> &str {
        naming::split_qualified(&self.parent_table)
            .map(|(s, _)| s)
            .unwrap_or("public")
    }

    pub fn table(&self) -> &str {
        naming::split_qualified(&self.parent_table)
            .map(|(_, t)| t)
            .unwrap_or(&self.parent_table)
    }

    /// Parse a child suffix into this set's boundary type
    pub fn parse_suffix(&self, suffix: &str) -> Option<Bound> {
        match self.interval {
            PartInterval::Time(g) => g.parse_suffix(suffix).map(Bound::Time),
            PartInterval::CustomTime(_) => {
                crate::boundary::parse_custom_suffix(suffix).map(Bound::Time)
            }
            PartInterval::Id(_) => suffix.parse().ok().map(Bound::Id),
        }
    }

    /// Render a boundary as a child suffix
    pub fn format_suffix(&self, bound: Bound) -> Option<String> {
        match (self.interval, bound) {
            (PartInterval::Time(g), Bound::Time(t)) => Some(g.format_suffix(t)),
            (PartInterval::CustomTime(_), Bound::Time(t)) => {
                Some(crate::boundary::format_custom_suffix(t))
            }
            (PartInterval::Id(_), Bound::Id(i)) => Some(i.to_string()),
            _ => None,
        }
    }

    /// Step a boundary one interval forward, `None` on overflow
    pub fn step(&self, bound: Bound) -> Option<Bound> {
        match (self.interval, bound) {
            (PartInterval::Time(g), Bound::Time(t)) => g.step(t).map(Bound::Time),
            (PartInterval::CustomTime(s), Bound::Time(t)) => {
                t.checked_add_signed(chrono::Duration::seconds(s)).map(Bound::Time)
            }
            (PartInterval::Id(i), Bound::Id(v)) => v.checked_add(i).map(Bound::Id),
            _ => None,
        }
    }

    /// Step a boundary one interval backward, `None` on underflow
    pub fn step_back(&self, bound: Bound) -> Option<Bound> {
        match (self.interval, bound) {
            (PartInterval::Time(g), Bound::Time(t)) => g.step_back(t).map(Bound::Time),
            (PartInterval::CustomTime(s), Bound::Time(t)) => {
                t.checked_sub_signed(chrono::Duration::seconds(s)).map(Bound::Time)
            }
            (PartInterval::Id(i), Bound::Id(v)) => v.checked_sub(i).map(Bound::Id),
            _ => None,
        }
    }

    /// Truncate a raw value to its owning lower boundary
    ///
    /// Arbitrary-interval boundaries have no calendar grid; the value is
    /// its own base and the recorded ranges decide ownership.
    pub fn truncate(&self, value: Bound) -> Option<Bound> {
        match (self.interval, value) {
            (PartInterval::Time(g), Bound::Time(t)) => Some(Bound::Time(g.truncate(t))),
            (PartInterval::CustomTime(_), Bound::Time(t)) => Some(Bound::Time(t)),
            (PartInterval::Id(i), Bound::Id(v)) => Some(Bound::Id(crate::boundary::id_lower(v, i))),
            _ => None,
        }
    }
}

/// Sub-partition template, as stored in `part_config_sub`
///
/// Keyed by the parent set whose children are sub-partitioned; every new
/// child of that set becomes a parent configured from this template.
#[derive(Debug, Clone)]
pub struct SubTemplate {
    pub sub_parent: String,
    pub control: String,
    pub kind: PartitionKind,
    pub interval: PartInterval,
    pub constraint_cols: Vec<String>,
    pub premake: i32,
    pub inherit_fk: bool,
    pub retention: Option<String>,
    pub retention_schema: Option<String>,
    pub retention_keep_table: bool,
    pub retention_keep_index: bool,
    pub use_run_maintenance: bool,
}

/// One `[range_start, range_end)` row of a time-custom set
#[derive(Debug, Clone, PartialEq)]
pub struct CustomRange {
    pub parent_table: String,
    pub child_table: String,
    pub range_start: NaiveDateTime,
    pub range_end: NaiveDateTime,
}

const CONFIG_COLS: &str = "parent_table, control, kind, part_interval, constraint_cols, \
     premake, inherit_fk, retention, retention_schema, retention_keep_table, \
     retention_keep_index, datetime_string, use_run_maintenance, undo_in_progress";

const SUB_COLS: &str = "sub_parent, sub_control, sub_kind, sub_part_interval, \
     sub_constraint_cols, sub_premake, sub_inherit_fk, sub_retention, sub_retention_schema, \
     sub_retention_keep_table, sub_retention_keep_index, sub_use_run_maintenance";

/// Repository over the catalog tables
///
/// Injected wherever configuration is needed; holds no state beyond the
/// executor reference.
pub struct Catalog<'a> {
    executor: &'a dyn Executor,
}

impl<'a> Catalog<'a> {
    pub fn new(executor: &'a dyn Executor) -> Self {
        Self { executor }
    }

    /// Fetch the configuration row for a parent table
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigMissing` when no row exists.
    pub fn get(&self, parent_table: &str) -> Result<PartitionConfig> {
        self.try_get(parent_table)?
            .ok_or_else(|| Error::ConfigMissing(parent_table.to_string()))
    }

    /// Fetch the configuration row for a parent table, `None` when absent
    pub fn try_get(&self, parent_table: &str) -> Result<Option<PartitionConfig>> {
        let sql = format!(
            "SELECT {CONFIG_COLS} FROM {CATALOG_SCHEMA}.part_config WHERE parent_table = $1"
        );
        let row = self.executor.query_opt(&sql, &[&parent_table])?;
        row.map(|r| config_from_row(&r)).transpose()
    }

    /// List all configured sets, optionally only maintenance-served ones
    pub fn list(&self, only_maintained: bool) -> Result<Vec<PartitionConfig>> {
        let sql = if only_maintained {
            format!(
                "SELECT {CONFIG_COLS} FROM {CATALOG_SCHEMA}.part_config \
                 WHERE use_run_maintenance ORDER BY parent_table"
            )
        } else {
            format!(
                "SELECT {CONFIG_COLS} FROM {CATALOG_SCHEMA}.part_config ORDER BY parent_table"
            )
        };
        let rows = self.executor.query_all(&sql, &[])?;
        rows.iter().map(config_from_row).collect()
    }

    /// Insert a new configuration row
    ///
    /// All write-time validation happens here: kind, interval, premake,
    /// and parent name shape are checked so downstream modules can trust
    /// any row they read back.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyConfigured` for a duplicate parent, or the
    /// specific validation error.
    pub fn insert(&self, config: &PartitionConfig) -> Result<()> {
        validate_config(config)?;

        if self.try_get(&config.parent_table)?.is_some() {
            return Err(Error::AlreadyConfigured(config.parent_table.clone()));
        }

        let sql = format!(
            "INSERT INTO {CATALOG_SCHEMA}.part_config ({CONFIG_COLS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        );
        let constraint_cols = if config.constraint_cols.is_empty() {
            None
        } else {
            Some(config.constraint_cols.clone())
        };
        self.executor.execute(
            &sql,
            &[
                &config.parent_table,
                &config.control,
                &config.kind.as_str(),
                &config.interval.as_text(),
                &constraint_cols,
                &config.premake,
                &config.inherit_fk,
                &config.retention,
                &config.retention_schema,
                &config.retention_keep_table,
                &config.retention_keep_index,
                &config.datetime_string,
                &config.use_run_maintenance,
                &config.undo_in_progress,
            ],
        )?;
        log::info!(
            "configured {} as {} every {}",
            config.parent_table,
            config.kind.as_str(),
            config.interval.as_text()
        );
        Ok(())
    }

    /// Set or replace the retention threshold for a set
    pub fn set_retention(&self, parent_table: &str, retention: &str) -> Result<()> {
        let config = self.get(parent_table)?;
        if config.kind.is_id() && retention.trim().parse::<i64>().is_err() {
            return Err(Error::InvalidInterval(retention.to_string()));
        }
        let sql = format!(
            "UPDATE {CATALOG_SCHEMA}.part_config SET retention = $2 WHERE parent_table = $1"
        );
        self.executor.execute(&sql, &[&parent_table, &retention])?;
        Ok(())
    }

    /// Clear the retention threshold for a set
    pub fn remove_retention(&self, parent_table: &str) -> Result<()> {
        self.get(parent_table)?;
        let sql = format!(
            "UPDATE {CATALOG_SCHEMA}.part_config SET retention = NULL WHERE parent_table = $1"
        );
        self.executor.execute(&sql, &[&parent_table])?;
        Ok(())
    }

    /// Raise or clear the undo fence for a set
    pub fn set_undo_in_progress(&self, parent_table: &str, value: bool) -> Result<()> {
        let sql = format!(
            "UPDATE {CATALOG_SCHEMA}.part_config SET undo_in_progress = $2 WHERE parent_table = $1"
        );
        self.executor.execute(&sql, &[&parent_table, &value])?;
        Ok(())
    }

    /// Delete a set's configuration row
    ///
    /// The sub template goes with it through the foreign key; custom
    /// range rows are removed explicitly.
    pub fn delete(&self, parent_table: &str) -> Result<()> {
        let sql = format!(
            "DELETE FROM {CATALOG_SCHEMA}.custom_time_partitions WHERE parent_table = $1"
        );
        self.executor.execute(&sql, &[&parent_table])?;
        let sql = format!("DELETE FROM {CATALOG_SCHEMA}.part_config WHERE parent_table = $1");
        self.executor.execute(&sql, &[&parent_table])?;
        Ok(())
    }

    /// Fetch the sub-partition template applied to a set's children
    pub fn get_sub_template(&self, sub_parent: &str) -> Result<Option<SubTemplate>> {
        let sql = format!(
            "SELECT {SUB_COLS} FROM {CATALOG_SCHEMA}.part_config_sub WHERE sub_parent = $1"
        );
        let row = self.executor.query_opt(&sql, &[&sub_parent])?;
        row.map(|r| sub_template_from_row(&r)).transpose()
    }

    /// Record the sub-partition template for a set
    ///
    /// # Errors
    ///
    /// Returns the specific validation error for a malformed template,
    /// or `Error::ConfigMissing` when the parent set is not configured.
    pub fn insert_sub_template(&self, template: &SubTemplate) -> Result<()> {
        if template.premake <= 0 {
            return Err(Error::InvalidPremake(template.premake));
        }
        self.get(&template.sub_parent)?;

        let sql = format!(
            "INSERT INTO {CATALOG_SCHEMA}.part_config_sub ({SUB_COLS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             ON CONFLICT (sub_parent) DO UPDATE SET \
               sub_control = EXCLUDED.sub_control, \
               sub_kind = EXCLUDED.sub_kind, \
               sub_part_interval = EXCLUDED.sub_part_interval, \
               sub_constraint_cols = EXCLUDED.sub_constraint_cols, \
               sub_premake = EXCLUDED.sub_premake, \
               sub_inherit_fk = EXCLUDED.sub_inherit_fk, \
               sub_retention = EXCLUDED.sub_retention, \
               sub_retention_schema = EXCLUDED.sub_retention_schema, \
               sub_retention_keep_table = EXCLUDED.sub_retention_keep_table, \
               sub_retention_keep_index = EXCLUDED.sub_retention_keep_index, \
               sub_use_run_maintenance = EXCLUDED.sub_use_run_maintenance"
        );
        let constraint_cols = if template.constraint_cols.is_empty() {
            None
        } else {
            Some(template.constraint_cols.clone())
        };
        self.executor.execute(
            &sql,
            &[
                &template.sub_parent,
                &template.control,
                &template.kind.as_str(),
                &template.interval.as_text(),
                &constraint_cols,
                &template.premake,
                &template.inherit_fk,
                &template.retention,
                &template.retention_schema,
                &template.retention_keep_table,
                &template.retention_keep_index,
                &template.use_run_maintenance,
            ],
        )?;
        Ok(())
    }

    /// Record a custom range row for a newly created child
    pub fn insert_custom_range(&self, range: &CustomRange) -> Result<()> {
        let sql = format!(
            "INSERT INTO {CATALOG_SCHEMA}.custom_time_partitions \
             (parent_table, child_table, range_start, range_end) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (parent_table, child_table) DO NOTHING"
        );
        self.executor.execute(
            &sql,
            &[
                &range.parent_table,
                &range.child_table,
                &range.range_start,
                &range.range_end,
            ],
        )?;
        Ok(())
    }

    /// Find the custom range covering a value, `None` when uncovered
    pub fn custom_range_for(
        &self,
        parent_table: &str,
        value: NaiveDateTime,
    ) -> Result<Option<CustomRange>> {
        let sql = format!(
            "SELECT parent_table, child_table, range_start, range_end \
             FROM {CATALOG_SCHEMA}.custom_time_partitions \
             WHERE parent_table = $1 AND range_start <= $2 AND range_end > $2"
        );
        let row = self.executor.query_opt(&sql, &[&parent_table, &value])?;
        Ok(row.map(|r| custom_range_from_row(&r)))
    }

    /// Remove the custom range rows naming a reaped or undone child
    pub fn delete_custom_range(&self, parent_table: &str, child_table: &str) -> Result<()> {
        let sql = format!(
            "DELETE FROM {CATALOG_SCHEMA}.custom_time_partitions \
             WHERE parent_table = $1 AND child_table = $2"
        );
        self.executor.execute(&sql, &[&parent_table, &child_table])?;
        Ok(())
    }
}

fn qualified_name_pattern() -> &'static regex::Regex {
    static PATTERN: OnceLock<regex::Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        regex::Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_$]*\.[a-zA-Z_][a-zA-Z0-9_$]*$")
            .unwrap_or_else(|e| unreachable!("invalid identifier pattern: {e}"))
    })
}

/// Write-time validation shared by [`Catalog::insert`]
pub fn validate_config(config: &PartitionConfig) -> Result<()> {
    if !qualified_name_pattern().is_match(&config.parent_table) {
        return Err(Error::InvalidParent {
            table: config.parent_table.clone(),
            reason: "must be a schema-qualified identifier".to_string(),
        });
    }
    if config.premake <= 0 {
        return Err(Error::InvalidPremake(config.premake));
    }
    match (config.kind, config.interval) {
        (k, PartInterval::Time(_)) if !k.is_time() => {
            return Err(Error::InvalidInterval(config.interval.as_text()));
        }
        (k, PartInterval::CustomTime(s)) => {
            if k != PartitionKind::TimeCustom || s < 1 {
                return Err(Error::InvalidInterval(config.interval.as_text()));
            }
        }
        (k, PartInterval::Id(i)) => {
            if !k.is_id() {
                return Err(Error::InvalidInterval(config.interval.as_text()));
            }
            if i <= 1 {
                return Err(Error::InvalidInterval(i.to_string()));
            }
        }
        _ => {}
    }
    // Time routing relies on premade children; on-demand creation is a
    // serial-only feature
    if config.kind.is_time() && !config.use_run_maintenance {
        return Err(Error::InvalidPartitionKind(format!(
            "{} requires use_run_maintenance",
            config.kind.as_str()
        )));
    }
    Ok(())
}

fn config_from_row(row: &Row) -> Result<PartitionConfig> {
    let kind_text: String = row.get("kind");
    let kind = PartitionKind::from_str(&kind_text)
        .ok_or_else(|| Error::InvalidPartitionKind(kind_text.clone()))?;
    let interval_text: String = row.get("part_interval");
    let interval = PartInterval::parse(kind, &interval_text)?;
    let constraint_cols: Option<Vec<String>> = row.get("constraint_cols");

    Ok(PartitionConfig {
        parent_table: row.get("parent_table"),
        control: row.get("control"),
        kind,
        interval,
        constraint_cols: constraint_cols.unwrap_or_default(),
        premake: row.get("premake"),
        inherit_fk: row.get("inherit_fk"),
        retention: row.get("retention"),
        retention_schema: row.get("retention_schema"),
        retention_keep_table: row.get("retention_keep_table"),
        retention_keep_index: row.get("retention_keep_index"),
        datetime_string: row.get("datetime_string"),
        use_run_maintenance: row.get("use_run_maintenance"),
        undo_in_progress: row.get("undo_in_progress"),
    })
}

fn sub_template_from_row(row: &Row) -> Result<SubTemplate> {
    let kind_text: String = row.get("sub_kind");
    let kind = PartitionKind::from_str(&kind_text)
        .ok_or_else(|| Error::InvalidPartitionKind(kind_text.clone()))?;
    let interval_text: String = row.get("sub_part_interval");
    let interval = PartInterval::parse(kind, &interval_text)?;
    let constraint_cols: Option<Vec<String>> = row.get("sub_constraint_cols");

    Ok(SubTemplate {
        sub_parent: row.get("sub_parent"),
        control: row.get("sub_control"),
        kind,
        interval,
        constraint_cols: constraint_cols.unwrap_or_default(),
        premake: row.get("sub_premake"),
        inherit_fk: row.get("sub_inherit_fk"),
        retention: row.get("sub_retention"),
        retention_schema: row.get("sub_retention_schema"),
        retention_keep_table: row.get("sub_retention_keep_table"),
        retention_keep_index: row.get("sub_retention_keep_index"),
        use_run_maintenance: row.get("sub_use_run_maintenance"),
    })
}

fn custom_range_from_row(row: &Row) -> CustomRange {
    CustomRange {
        parent_table: row.get("parent_table"),
        child_table: row.get("child_table"),
        range_start: row.get("range_start"),
        range_end: row.get("range_end"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::Granularity;
    use chrono::NaiveDate;

    fn sample_config() -> PartitionConfig {
        PartitionConfig {
            parent_table: "public.events".to_string(),
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
            datetime_string: Some("YYYY_MM_DD".to_string()),
            use_run_maintenance: true,
            undo_in_progress: false,
        }
    }

    #[test]
    fn test_validate_accepts_sane_config() {
        assert!(validate_config(&sample_config()).is_ok());
    }

    #[test]
    fn test_validate_rejects_unqualified_parent() {
        let mut config = sample_config();
        config.parent_table = "events".to_string();
        assert!(matches!(
            validate_config(&config),
            Err(Error::InvalidParent { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_premake() {
        let mut config = sample_config();
        config.premake = 0;
        assert!(matches!(validate_config(&config), Err(Error::InvalidPremake(0))));
    }

    #[test]
    fn test_validate_rejects_kind_interval_mismatch() {
        let mut config = sample_config();
        config.interval = PartInterval::Id(10_000);
        assert!(matches!(validate_config(&config), Err(Error::InvalidInterval(_))));
    }

    #[test]
    fn test_validate_rejects_unmaintained_time_set() {
        let mut config = sample_config();
        config.use_run_maintenance = false;
        assert!(matches!(
            validate_config(&config),
            Err(Error::InvalidPartitionKind(_))
        ));
    }

    #[test]
    fn test_part_interval_parse() {
        assert_eq!(
            PartInterval::parse(PartitionKind::TimeStatic, "1 day").ok(),
            Some(PartInterval::Time(Granularity::Daily))
        );
        assert_eq!(
            PartInterval::parse(PartitionKind::IdStatic, "10000").ok(),
            Some(PartInterval::Id(10_000))
        );
        // Serial interval of 1 would make every row its own partition
        assert!(PartInterval::parse(PartitionKind::IdStatic, "1").is_err());
        assert!(PartInterval::parse(PartitionKind::TimeStatic, "fortnightly").is_err());
    }

    #[test]
    fn test_custom_interval_off_the_menu() {
        // The calendar menu binds the static and dynamic time kinds only
        assert_eq!(
            PartInterval::parse(PartitionKind::TimeCustom, "2 weeks").ok(),
            Some(PartInterval::CustomTime(14 * 86_400))
        );
        assert_eq!(
            PartInterval::parse(PartitionKind::TimeCustom, "90 mins").ok(),
            Some(PartInterval::CustomTime(5_400))
        );
        // Menu intervals still resolve to their granularity
        assert_eq!(
            PartInterval::parse(PartitionKind::TimeCustom, "1 day").ok(),
            Some(PartInterval::Time(Granularity::Daily))
        );
        assert!(PartInterval::parse(PartitionKind::TimeStatic, "2 weeks").is_err());
        assert!(PartInterval::parse(PartitionKind::TimeCustom, "0 secs").is_err());

        assert_eq!(PartInterval::CustomTime(5_400).as_text(), "5400 secs");
        assert_eq!(
            PartInterval::parse(PartitionKind::TimeCustom, "5400 secs").ok(),
            Some(PartInterval::CustomTime(5_400))
        );
    }

    #[test]
    fn test_custom_interval_boundaries_keep_their_anchor() {
        let mut c = sample_config();
        c.kind = PartitionKind::TimeCustom;
        c.interval = PartInterval::CustomTime(5_400);
        assert!(validate_config(&c).is_ok());

        let start = NaiveDate::from_ymd_opt(2024, 8, 17)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        let base = c.truncate(Bound::Time(start)).unwrap();
        assert_eq!(base, Bound::Time(start));
        let next = c.step(base).unwrap();
        assert_eq!(
            next,
            Bound::Time(
                NaiveDate::from_ymd_opt(2024, 8, 17)
                    .unwrap()
                    .and_hms_opt(10, 45, 0)
                    .unwrap()
            )
        );

        let suffix = c.format_suffix(base).unwrap();
        assert_eq!(suffix, "2024_08_17_091500");
        assert_eq!(c.parse_suffix(&suffix), Some(base));
    }

    #[test]
    fn test_custom_interval_rejected_for_other_kinds() {
        let mut c = sample_config();
        c.kind = PartitionKind::TimeDynamic;
        c.interval = PartInterval::CustomTime(5_400);
        assert!(matches!(validate_config(&c), Err(Error::InvalidInterval(_))));
    }
}
