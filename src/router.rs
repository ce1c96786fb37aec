//! Routing trigger synthesis.
//!
//! Inserts against a managed parent are routed to the owning child by a
//! `BEFORE INSERT` trigger. Routing is planned as a typed strategy first
//! and only then rendered to PL/pgSQL, so the decision structure can be
//! inspected and tested without a database:
//!
//! * [`RoutingStrategy::StaticLadder`] precomputes comparison branches
//!   for the children around the current boundary. Fastest dispatch, but
//!   must be re-synthesized whenever children are created.
//! * [`RoutingStrategy::DynamicTime`] / [`RoutingStrategy::DynamicId`]
//!   compute the child name from the incoming value at insert time.
//! * [`RoutingStrategy::CustomLookup`] resolves the child through the
//!   catalog's range table.
//!
//! Every strategy falls through with `RETURN NEW` when no child covers
//! the value: rows land in the parent rather than erroring, and
//! `check_parents` surfaces them.

use crate::boundary::{Granularity, PartitionKind};
use crate::catalog::{schema::CATALOG_SCHEMA, Bound, PartInterval, PartitionConfig};
use crate::error::{Error, Result};
use crate::executor::{current_timestamp, Executor};
use crate::inspect;
use crate::naming;

/// One branch of a static decision ladder
#[derive(Debug, Clone, PartialEq)]
pub struct LadderStep {
    /// Qualified child table receiving this branch
    pub child: String,
    pub lower: Bound,
    pub upper: Bound,
}

/// In-trigger creation of future serial partitions
///
/// Compiled only for serial sets not served by the maintenance
/// orchestrator: when an insert crosses the upper half of the current
/// partition, the trigger itself premakes the next partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnDemandCreate {
    pub interval: i64,
    pub premake: i32,
}

/// Typed routing plan for one parent table
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingStrategy {
    StaticLadder {
        parent: String,
        control: String,
        steps: Vec<LadderStep>,
        on_demand: Option<OnDemandCreate>,
    },
    DynamicTime {
        parent: String,
        control: String,
        granularity: Granularity,
    },
    DynamicId {
        parent: String,
        control: String,
        interval: i64,
        on_demand: Option<OnDemandCreate>,
    },
    CustomLookup {
        parent: String,
        control: String,
    },
}

impl RoutingStrategy {
    pub fn parent(&self) -> &str {
        match self {
            Self::StaticLadder { parent, .. }
            | Self::DynamicTime { parent, .. }
            | Self::DynamicId { parent, .. }
            | Self::CustomLookup { parent, .. } => parent,
        }
    }
}

/// Plan the routing strategy for a configured set
///
/// Static kinds inspect the live children: only branches whose child
/// exists make it into the ladder.
pub fn plan(executor: &dyn Executor, config: &PartitionConfig) -> Result<RoutingStrategy> {
    let parent = config.parent_table.clone();
    let control = config.control.clone();

    match config.kind {
        PartitionKind::TimeDynamic => {
            let granularity = config
                .interval
                .granularity()
                .ok_or_else(|| Error::InvalidInterval(config.interval.as_text()))?;
            Ok(RoutingStrategy::DynamicTime {
                parent,
                control,
                granularity,
            })
        }
        PartitionKind::IdDynamic => {
            let interval = config
                .interval
                .id()
                .ok_or_else(|| Error::InvalidInterval(config.interval.as_text()))?;
            // Same as the static serial case: a set outside the
            // maintenance sweep premakes its own successors in-trigger
            let on_demand = if config.use_run_maintenance {
                None
            } else {
                Some(OnDemandCreate {
                    interval,
                    premake: config.premake,
                })
            };
            Ok(RoutingStrategy::DynamicId {
                parent,
                control,
                interval,
                on_demand,
            })
        }
        PartitionKind::TimeCustom => Ok(RoutingStrategy::CustomLookup { parent, control }),
        PartitionKind::TimeStatic | PartitionKind::IdStatic => {
            let current = current_bound(executor, config)?;
            let steps = ladder_steps(executor, config, current)?;
            let on_demand = match (config.kind, config.interval) {
                (PartitionKind::IdStatic, PartInterval::Id(interval))
                    if !config.use_run_maintenance =>
                {
                    Some(OnDemandCreate {
                        interval,
                        premake: config.premake,
                    })
                }
                _ => None,
            };
            Ok(RoutingStrategy::StaticLadder {
                parent,
                control,
                steps,
                on_demand,
            })
        }
    }
}

/// The boundary owning the set's current value
fn current_bound(executor: &dyn Executor, config: &PartitionConfig) -> Result<Bound> {
    let raw = match config.interval {
        PartInterval::Time(_) | PartInterval::CustomTime(_) => {
            Bound::Time(current_timestamp(executor)?)
        }
        PartInterval::Id(_) => {
            let max =
                inspect::max_control_id(executor, &config.parent_table, &config.control)?;
            Bound::Id(max.unwrap_or(0))
        }
    };
    config
        .truncate(raw)
        .ok_or_else(|| Error::InvalidInterval(config.interval.as_text()))
}

/// Ladder branches around the current boundary: current first, then
/// alternating future and past, skipping children that do not exist
fn ladder_steps(
    executor: &dyn Executor,
    config: &PartitionConfig,
    current: Bound,
) -> Result<Vec<LadderStep>> {
    let mut bounds = vec![current];
    let mut above = current;
    let mut below = current;
    for _ in 0..config.premake {
        if let Some(next) = config.step(above) {
            bounds.push(next);
            above = next;
        }
        if let Some(prev) = config.step_back(below) {
            bounds.push(prev);
            below = prev;
        }
    }

    let mut steps = Vec::new();
    for lower in bounds {
        let Some(upper) = config.step(lower) else {
            continue;
        };
        let Some(suffix) = config.format_suffix(lower) else {
            continue;
        };
        let child = naming::child_table(config.schema(), config.table(), &suffix);
        let Some((child_schema, child_table)) = naming::split_qualified(&child) else {
            continue;
        };
        if inspect::table_exists(executor, child_schema, child_table)? {
            steps.push(LadderStep { child, lower, upper });
        }
    }
    Ok(steps)
}

/// Render a strategy to its `CREATE OR REPLACE FUNCTION` statement
///
/// Pure: the output depends only on the strategy.
pub fn compile(strategy: &RoutingStrategy) -> String {
    let parent = strategy.parent();
    let (schema, table) = naming::split_qualified(parent).unwrap_or(("public", parent));
    let function = format!("{schema}.{}", naming::trigger_function_name(table));

    let body = match strategy {
        RoutingStrategy::StaticLadder {
            parent,
            control,
            steps,
            on_demand,
        } => compile_static(parent, control, steps, on_demand.as_ref()),
        RoutingStrategy::DynamicTime {
            parent,
            control,
            granularity,
        } => compile_dynamic_time(parent, control, *granularity),
        RoutingStrategy::DynamicId {
            parent,
            control,
            interval,
            on_demand,
        } => compile_dynamic_id(parent, control, *interval, on_demand.as_ref()),
        RoutingStrategy::CustomLookup { parent, control } => {
            compile_custom(parent, control)
        }
    };

    format!(
        "CREATE OR REPLACE FUNCTION {function}() RETURNS trigger\n\
         LANGUAGE plpgsql\n\
         AS $gk$\n{body}$gk$"
    )
}

fn compile_static(
    parent: &str,
    control: &str,
    steps: &[LadderStep],
    on_demand: Option<&OnDemandCreate>,
) -> String {
    let mut body = String::new();

    if on_demand.is_some() {
        body.push_str(
            "DECLARE\n\
             v_next_id bigint;\n\
             v_child_table text;\n\
             v_child text;\n",
        );
    }
    body.push_str("BEGIN\n");

    if let Some(od) = on_demand {
        body.push_str(&compile_on_demand(parent, control, od));
    }

    let mut keyword = "IF";
    for step in steps {
        body.push_str(&format!(
            "{keyword} NEW.{control} >= {} AND NEW.{control} < {} THEN\n\
             \x20   INSERT INTO {} VALUES (NEW.*);\n",
            step.lower.sql_literal(),
            step.upper.sql_literal(),
            step.child
        ));
        keyword = "ELSIF";
    }

    if steps.is_empty() {
        body.push_str(&fallthrough(parent, control, on_demand));
    } else {
        body.push_str("ELSE\n");
        body.push_str(&fallthrough(parent, control, on_demand));
        body.push_str("END IF;\n");
    }

    body.push_str("RETURN NULL;\nEND\n");
    body
}

/// What happens when no ladder branch matches
///
/// With on-demand creation in play the owning child may have been
/// created after the ladder was compiled, so route through its computed
/// name; otherwise the row stays in the parent.
fn fallthrough(parent: &str, control: &str, on_demand: Option<&OnDemandCreate>) -> String {
    match on_demand {
        Some(od) => {
            let child_expr = id_child_name_expr(parent, &format!("NEW.{control} - (NEW.{control} % {})", od.interval));
            format!(
                "    v_child := {child_expr};\n\
                 \x20   IF to_regclass(v_child) IS NOT NULL THEN\n\
                 \x20       EXECUTE format('INSERT INTO %s VALUES ($1.*)', v_child) USING NEW;\n\
                 \x20   ELSE\n\
                 \x20       RETURN NEW;\n\
                 \x20   END IF;\n"
            )
        }
        None => "    RETURN NEW;\n".to_string(),
    }
}

/// PL/pgSQL expression building a serial child name with the 61-char
/// truncation applied server-side
fn id_child_name_expr(parent: &str, id_expr: &str) -> String {
    let (schema, table) = naming::split_qualified(parent).unwrap_or(("public", parent));
    format!(
        "'{schema}.' || substring('{table}' from 1 for 61 - char_length(({id_expr})::text)) \
         || '_p' || ({id_expr})::text"
    )
}

fn compile_on_demand(parent: &str, control: &str, od: &OnDemandCreate) -> String {
    let interval = od.interval;
    let half = interval / 2;
    let horizon = interval * i64::from(od.premake);
    let (schema, table) = naming::split_qualified(parent).unwrap_or(("public", parent));

    format!(
        "IF (NEW.{control} % {interval}) > {half} THEN\n\
         \x20   v_next_id := NEW.{control} - (NEW.{control} % {interval}) + {interval};\n\
         \x20   WHILE v_next_id <= NEW.{control} - (NEW.{control} % {interval}) + {horizon} LOOP\n\
         \x20       v_child_table := substring('{table}' from 1 for 61 - char_length(v_next_id::text)) || '_p' || v_next_id::text;\n\
         \x20       v_child := '{schema}.' || v_child_table;\n\
         \x20       IF to_regclass(v_child) IS NULL THEN\n\
         \x20           EXECUTE format('CREATE TABLE %s (LIKE {parent} INCLUDING DEFAULTS INCLUDING CONSTRAINTS INCLUDING INDEXES INCLUDING STORAGE INCLUDING COMMENTS)', v_child);\n\
         \x20           EXECUTE format('ALTER TABLE %s ADD CONSTRAINT %s CHECK ({control} >= %s AND {control} < %s)', v_child, substring(v_child_table || '_partition_check' from 1 for 63), v_next_id, v_next_id + {interval});\n\
         \x20           EXECUTE format('ALTER TABLE %s INHERIT {parent}', v_child);\n\
         \x20       END IF;\n\
         \x20       v_next_id := v_next_id + {interval};\n\
         \x20   END LOOP;\n\
         END IF;\n"
    )
}

fn compile_dynamic_time(parent: &str, control: &str, granularity: Granularity) -> String {
    let trunc_expr = match granularity {
        Granularity::Yearly => format!("date_trunc('year', NEW.{control})"),
        Granularity::Quarterly => format!("date_trunc('quarter', NEW.{control})"),
        Granularity::Monthly => format!("date_trunc('month', NEW.{control})"),
        Granularity::Weekly => format!("date_trunc('week', NEW.{control})"),
        Granularity::Daily => format!("date_trunc('day', NEW.{control})"),
        Granularity::Hourly => format!("date_trunc('hour', NEW.{control})"),
        Granularity::HalfHour => format!(
            "date_trunc('hour', NEW.{control}) + '30 mins'::interval * floor(date_part('minute', NEW.{control}) / 30)"
        ),
        Granularity::QuarterHour => format!(
            "date_trunc('hour', NEW.{control}) + '15 mins'::interval * floor(date_part('minute', NEW.{control}) / 15)"
        ),
    };
    let pattern = granularity.suffix_pattern();
    let (schema, table) = naming::split_qualified(parent).unwrap_or(("public", parent));

    format!(
        "DECLARE\n\
         v_partition_timestamp timestamp;\n\
         v_suffix text;\n\
         v_child text;\n\
         BEGIN\n\
         v_partition_timestamp := {trunc_expr};\n\
         v_suffix := to_char(v_partition_timestamp, '{pattern}');\n\
         v_child := '{schema}.' || substring('{table}' from 1 for 61 - char_length(v_suffix)) || '_p' || v_suffix;\n\
         IF to_regclass(v_child) IS NOT NULL THEN\n\
         \x20   EXECUTE format('INSERT INTO %s VALUES ($1.*)', v_child) USING NEW;\n\
         \x20   RETURN NULL;\n\
         END IF;\n\
         RETURN NEW;\n\
         END\n"
    )
}

fn compile_dynamic_id(
    parent: &str,
    control: &str,
    interval: i64,
    on_demand: Option<&OnDemandCreate>,
) -> String {
    let child_expr = id_child_name_expr(parent, "v_partition_id");
    let mut body = String::from(
        "DECLARE\n\
         v_partition_id bigint;\n\
         v_child text;\n",
    );
    if on_demand.is_some() {
        body.push_str(
            "v_next_id bigint;\n\
             v_child_table text;\n",
        );
    }
    body.push_str("BEGIN\n");
    if let Some(od) = on_demand {
        body.push_str(&compile_on_demand(parent, control, od));
    }
    body.push_str(&format!(
        "v_partition_id := NEW.{control} - (NEW.{control} % {interval});\n\
         v_child := {child_expr};\n\
         IF to_regclass(v_child) IS NOT NULL THEN\n\
         \x20   EXECUTE format('INSERT INTO %s VALUES ($1.*)', v_child) USING NEW;\n\
         \x20   RETURN NULL;\n\
         END IF;\n\
         RETURN NEW;\n\
         END\n"
    ));
    body
}

fn compile_custom(parent: &str, control: &str) -> String {
    format!(
        "DECLARE\n\
         v_child text;\n\
         BEGIN\n\
         SELECT child_table INTO v_child FROM {CATALOG_SCHEMA}.custom_time_partitions\n\
         \x20   WHERE parent_table = '{parent}'\n\
         \x20   AND range_start <= NEW.{control} AND range_end > NEW.{control};\n\
         IF v_child IS NOT NULL THEN\n\
         \x20   EXECUTE format('INSERT INTO %s VALUES ($1.*)', v_child) USING NEW;\n\
         \x20   RETURN NULL;\n\
         END IF;\n\
         RETURN NEW;\n\
         END\n"
    )
}

/// Install (or refresh) the routing function and trigger for a set
///
/// The function is always replaced; the trigger is created only when
/// missing, so re-synthesis after child creation does not take an
/// exclusive lock on the parent.
pub fn synthesize(executor: &dyn Executor, config: &PartitionConfig) -> Result<()> {
    let strategy = plan(executor, config)?;
    let function_sql = compile(&strategy);
    executor.execute(&function_sql, &[])?;

    let trigger = naming::trigger_name(config.table());
    let row = executor.query_one(
        "SELECT count(*) FROM pg_catalog.pg_trigger \
         WHERE tgname = $1 AND tgrelid = to_regclass($2)",
        &[&trigger, &config.parent_table],
    )?;
    let existing: i64 = row.get(0);
    if existing == 0 {
        let function = format!(
            "{}.{}",
            config.schema(),
            naming::trigger_function_name(config.table())
        );
        let sql = format!(
            "CREATE TRIGGER {trigger} BEFORE INSERT ON {} \
             FOR EACH ROW EXECUTE PROCEDURE {function}()",
            config.parent_table
        );
        executor.execute(&sql, &[])?;
        log::info!("installed routing trigger {trigger} on {}", config.parent_table);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, mo: u32, d: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_compile_static_ladder() {
        let strategy = RoutingStrategy::StaticLadder {
            parent: "public.events".to_string(),
            control: "created_at".to_string(),
            steps: vec![
                LadderStep {
                    child: "public.events_p2024_08_17".to_string(),
                    lower: Bound::Time(ts(2024, 8, 17)),
                    upper: Bound::Time(ts(2024, 8, 18)),
                },
                LadderStep {
                    child: "public.events_p2024_08_18".to_string(),
                    lower: Bound::Time(ts(2024, 8, 18)),
                    upper: Bound::Time(ts(2024, 8, 19)),
                },
            ],
            on_demand: None,
        };
        let sql = compile(&strategy);
        assert!(sql.contains("CREATE OR REPLACE FUNCTION public.events_part_trig_func()"));
        assert!(sql.contains("IF NEW.created_at >= '2024-08-17 00:00:00'"));
        assert!(sql.contains("ELSIF NEW.created_at >= '2024-08-18 00:00:00'"));
        assert!(sql.contains("INSERT INTO public.events_p2024_08_17 VALUES (NEW.*)"));
        // No branch matched: the row stays in the parent
        assert!(sql.contains("RETURN NEW"));
        assert!(sql.contains("RETURN NULL"));
    }

    #[test]
    fn test_compile_static_ladder_empty_steps() {
        let strategy = RoutingStrategy::StaticLadder {
            parent: "public.events".to_string(),
            control: "id".to_string(),
            steps: Vec::new(),
            on_demand: None,
        };
        let sql = compile(&strategy);
        assert!(sql.contains("RETURN NEW"));
        assert!(!sql.contains("ELSIF"));
    }

    #[test]
    fn test_compile_static_with_on_demand() {
        let strategy = RoutingStrategy::StaticLadder {
            parent: "public.orders".to_string(),
            control: "id".to_string(),
            steps: vec![LadderStep {
                child: "public.orders_p10000".to_string(),
                lower: Bound::Id(10_000),
                upper: Bound::Id(20_000),
            }],
            on_demand: Some(OnDemandCreate {
                interval: 10_000,
                premake: 4,
            }),
        };
        let sql = compile(&strategy);
        // Creation fires past the midpoint of the current partition
        assert!(sql.contains("IF (NEW.id % 10000) > 5000 THEN"));
        assert!(sql.contains("LIKE public.orders"));
        assert!(sql.contains("INHERIT public.orders"));
        assert!(sql.contains("to_regclass(v_child) IS NULL"));
        // Rows for freshly created children route by computed name
        assert!(sql.contains("EXECUTE format('INSERT INTO %s VALUES ($1.*)', v_child) USING NEW"));
    }

    #[test]
    fn test_compile_dynamic_time() {
        let strategy = RoutingStrategy::DynamicTime {
            parent: "public.events".to_string(),
            control: "created_at".to_string(),
            granularity: Granularity::Daily,
        };
        let sql = compile(&strategy);
        assert!(sql.contains("date_trunc('day', NEW.created_at)"));
        assert!(sql.contains("to_char(v_partition_timestamp, 'YYYY_MM_DD')"));
        assert!(sql.contains("RETURN NEW"));
    }

    #[test]
    fn test_compile_dynamic_quarter_hour() {
        let strategy = RoutingStrategy::DynamicTime {
            parent: "public.metrics".to_string(),
            control: "at".to_string(),
            granularity: Granularity::QuarterHour,
        };
        let sql = compile(&strategy);
        assert!(sql.contains("'15 mins'::interval * floor(date_part('minute', NEW.at) / 15)"));
    }

    #[test]
    fn test_compile_dynamic_id() {
        let strategy = RoutingStrategy::DynamicId {
            parent: "public.orders".to_string(),
            control: "id".to_string(),
            interval: 10_000,
            on_demand: None,
        };
        let sql = compile(&strategy);
        assert!(sql.contains("NEW.id - (NEW.id % 10000)"));
        assert!(sql.contains("to_regclass(v_child) IS NOT NULL"));
        assert!(!sql.contains("CREATE TABLE"));
    }

    #[test]
    fn test_compile_dynamic_id_with_on_demand() {
        // A serial set outside the maintenance sweep creates its own
        // successors in-trigger, same as the static case
        let strategy = RoutingStrategy::DynamicId {
            parent: "public.orders".to_string(),
            control: "id".to_string(),
            interval: 10_000,
            on_demand: Some(OnDemandCreate {
                interval: 10_000,
                premake: 4,
            }),
        };
        let sql = compile(&strategy);
        assert!(sql.contains("v_next_id bigint"));
        assert!(sql.contains("IF (NEW.id % 10000) > 5000 THEN"));
        assert!(sql.contains("LIKE public.orders"));
        assert!(sql.contains("INHERIT public.orders"));
        // Routing itself is unchanged
        assert!(sql.contains("NEW.id - (NEW.id % 10000)"));
    }

    #[test]
    fn test_compile_custom_lookup() {
        let strategy = RoutingStrategy::CustomLookup {
            parent: "public.billing".to_string(),
            control: "period".to_string(),
        };
        let sql = compile(&strategy);
        assert!(sql.contains("custom_time_partitions"));
        assert!(sql.contains("parent_table = 'public.billing'"));
        assert!(sql.contains("range_start <= NEW.period AND range_end > NEW.period"));
    }
}
