//! Turning an existing table into a managed partition set.

use chrono::NaiveDateTime;

use crate::boundary::{self, PartitionKind};
use crate::catalog::{Bound, Catalog, PartInterval, PartitionConfig, SubTemplate};
use crate::error::{Error, Result};
use crate::executor::{current_timestamp, Executor};
use crate::inspect::{self, ChildOrder};
use crate::materializer::{walk_into_range, Materializer};
use crate::naming;
use crate::router;

/// Request to bring a table under management
#[derive(Debug, Clone)]
pub struct CreateParentSpec {
    /// Schema-qualified table to manage
    pub parent_table: String,
    /// Partitioning column
    pub control: String,
    pub kind: PartitionKind,
    /// Interval keyword (`daily`, `quarter-hour`, ...) or serial width
    pub interval: String,
    pub constraint_cols: Vec<String>,
    pub premake: i32,
    /// First boundary for time kinds; defaults to the current timestamp
    pub start: Option<NaiveDateTime>,
    pub inherit_fk: bool,
    /// `None` picks the kind's default: scheduled for time, on-demand
    /// for serial
    pub use_run_maintenance: Option<bool>,
    pub retention: Option<String>,
    pub retention_schema: Option<String>,
    pub retention_keep_table: bool,
    pub retention_keep_index: bool,
}

impl CreateParentSpec {
    pub fn new(parent_table: &str, control: &str, kind: PartitionKind, interval: &str) -> Self {
        Self {
            parent_table: parent_table.to_string(),
            control: control.to_string(),
            kind,
            interval: interval.to_string(),
            constraint_cols: Vec::new(),
            premake: 4,
            start: None,
            inherit_fk: true,
            use_run_maintenance: None,
            retention: None,
            retention_schema: None,
            retention_keep_table: true,
            retention_keep_index: true,
        }
    }

    /// Spec for a fresh child being sub-partitioned from its template
    pub fn from_template(template: &SubTemplate, child: &str) -> Self {
        Self {
            parent_table: child.to_string(),
            control: template.control.clone(),
            kind: template.kind,
            interval: template.interval.as_text(),
            constraint_cols: template.constraint_cols.clone(),
            premake: template.premake,
            start: None,
            inherit_fk: template.inherit_fk,
            use_run_maintenance: Some(template.use_run_maintenance),
            retention: template.retention.clone(),
            retention_schema: template.retention_schema.clone(),
            retention_keep_table: template.retention_keep_table,
            retention_keep_index: template.retention_keep_index,
        }
    }
}

/// Bring a table under management
///
/// Validates the table, records its configuration, materializes the
/// initial children around the starting boundary, and installs the
/// routing trigger. Returns the children created.
///
/// # Errors
///
/// Returns `Error::AlreadyConfigured` for a table that is already
/// managed, `Error::InvalidParent` for a missing table, unqualified
/// name, or nullable control column, and the interval/premake
/// validation errors from the catalog.
pub fn create_parent(
    executor: &dyn Executor,
    catalog: &Catalog,
    spec: &CreateParentSpec,
) -> Result<Vec<String>> {
    let (schema, table) = naming::split_qualified(&spec.parent_table).ok_or_else(|| {
        Error::InvalidParent {
            table: spec.parent_table.clone(),
            reason: "must be schema-qualified".to_string(),
        }
    })?;
    if !inspect::table_exists(executor, schema, table)? {
        return Err(Error::InvalidParent {
            table: spec.parent_table.clone(),
            reason: "table does not exist".to_string(),
        });
    }
    if !inspect::column_is_not_null(executor, &spec.parent_table, &spec.control)? {
        return Err(Error::InvalidParent {
            table: spec.parent_table.clone(),
            reason: format!("control column {} must exist and be NOT NULL", spec.control),
        });
    }

    let interval = PartInterval::parse(spec.kind, &spec.interval)?;
    let config = PartitionConfig {
        parent_table: spec.parent_table.clone(),
        control: spec.control.clone(),
        kind: spec.kind,
        interval,
        constraint_cols: spec.constraint_cols.clone(),
        premake: spec.premake,
        inherit_fk: spec.inherit_fk,
        retention: spec.retention.clone(),
        retention_schema: spec.retention_schema.clone(),
        retention_keep_table: spec.retention_keep_table,
        retention_keep_index: spec.retention_keep_index,
        datetime_string: interval.suffix_pattern().map(str::to_string),
        use_run_maintenance: spec.use_run_maintenance.unwrap_or(spec.kind.is_time()),
        undo_in_progress: false,
    };
    catalog.insert(&config)?;

    let bounds = initial_bounds(executor, &config, spec.start)?;
    let materializer = Materializer::new(executor);
    let mut created = materializer.create_partitions(catalog, &config, &bounds)?;

    // A sub-partition whose candidates all fell outside the parent's
    // range still needs one child: walk the base boundary into range
    if created.is_empty() && !bounds.is_empty() {
        if let Some((range_lower, range_upper)) = materializer.parent_range(catalog, &config)? {
            let base = bounds[bounds.len() / 2];
            if let Some(walked) = walk_into_range(&config, base, range_lower, range_upper) {
                created = materializer.create_partitions(catalog, &config, &[walked])?;
            }
        }
    }

    router::synthesize(executor, &config)?;
    Ok(created)
}

fn initial_bounds(
    executor: &dyn Executor,
    config: &PartitionConfig,
    start: Option<NaiveDateTime>,
) -> Result<Vec<Bound>> {
    match config.interval {
        PartInterval::Time(granularity) => {
            let start = match start {
                Some(s) => s,
                None => current_timestamp(executor)?,
            };
            Ok(boundary::time_series(granularity, start, config.premake)
                .into_iter()
                .map(Bound::Time)
                .collect())
        }
        PartInterval::CustomTime(seconds) => {
            let start = match start {
                Some(s) => s,
                None => current_timestamp(executor)?,
            };
            Ok(boundary::custom_series(start, seconds, config.premake)
                .into_iter()
                .map(Bound::Time)
                .collect())
        }
        PartInterval::Id(interval) => {
            // A fresh sub-parent holds no rows yet; the serial seed
            // comes from the top of its managed lineage
            let catalog = Catalog::new(executor);
            let ancestor =
                inspect::top_managed_ancestor(executor, &catalog, &config.parent_table)?;
            let start =
                inspect::max_control_id(executor, &ancestor, &config.control)?.unwrap_or(0);
            Ok(boundary::id_series(start, interval, config.premake)
                .into_iter()
                .map(Bound::Id)
                .collect())
        }
    }
}

/// Apply a sub-partition template to a whole set
///
/// Records the template for future children and sub-partitions every
/// existing child. Returns the children that became parents.
///
/// # Errors
///
/// Returns `Error::ConfigMissing` when the top parent is not managed,
/// and `Error::InvalidPartitionKind` for an on-demand template: nested
/// sets are only served by scheduled maintenance.
pub fn create_sub_parent(
    executor: &dyn Executor,
    catalog: &Catalog,
    template: &SubTemplate,
) -> Result<Vec<String>> {
    let top_config = catalog.get(&template.sub_parent)?;
    if !template.use_run_maintenance {
        return Err(Error::InvalidPartitionKind(
            "sub-partition sets must use run_maintenance".to_string(),
        ));
    }
    catalog.insert_sub_template(template)?;

    let mut converted = Vec::new();
    for child in inspect::list_children(executor, &top_config, ChildOrder::OldestFirst)? {
        let qualified = child.qualified();
        let spec = CreateParentSpec::from_template(template, &qualified);
        match create_parent(executor, catalog, &spec) {
            Ok(_) => converted.push(qualified),
            Err(Error::AlreadyConfigured(_)) => {
                log::debug!("{qualified} already sub-partitioned, skipped");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::Granularity;

    #[test]
    fn test_spec_defaults() {
        let spec = CreateParentSpec::new("public.events", "created_at", PartitionKind::TimeStatic, "daily");
        assert_eq!(spec.premake, 4);
        assert!(spec.inherit_fk);
        assert!(spec.use_run_maintenance.is_none());
        assert!(spec.retention.is_none());
    }

    #[test]
    fn test_spec_from_template() {
        let template = SubTemplate {
            sub_parent: "public.events".to_string(),
            control: "created_at".to_string(),
            kind: PartitionKind::TimeStatic,
            interval: PartInterval::Time(Granularity::Daily),
            constraint_cols: Vec::new(),
            premake: 2,
            inherit_fk: false,
            retention: Some("30 days".to_string()),
            retention_schema: None,
            retention_keep_table: false,
            retention_keep_index: true,
            use_run_maintenance: true,
        };
        let spec = CreateParentSpec::from_template(&template, "public.events_p2024_08");
        assert_eq!(spec.parent_table, "public.events_p2024_08");
        assert_eq!(spec.interval, "1 day");
        assert_eq!(spec.premake, 2);
        assert_eq!(spec.retention.as_deref(), Some("30 days"));
        assert!(!spec.retention_keep_table);
        assert_eq!(spec.use_run_maintenance, Some(true));
    }
}
