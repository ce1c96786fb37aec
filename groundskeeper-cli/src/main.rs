//! Groundskeeper CLI
//!
//! Command-line interface for managing partitioned tables: installing
//! the catalog, bringing tables under management, running maintenance,
//! and moving or undoing partitioned data.

use clap::{Parser, Subcommand};
use colored::Colorize;
use groundskeeper::boundary::PartitionKind;
use groundskeeper::catalog::{schema, Catalog, SubTemplate};
use groundskeeper::config::Settings;
use groundskeeper::lock::PgAdvisoryLock;
use groundskeeper::mover::{MoveOrder, MoveOutcome};
use groundskeeper::parent::CreateParentSpec;
use groundskeeper::retention::RetentionOverride;
use groundskeeper::{connect, inspect, maintenance, mover, parent, retention, undo};
use groundskeeper::{Error, Executor, MayPostgresExecutor};
use std::process;

#[derive(Parser)]
#[command(name = "groundskeeper")]
#[command(about = "Partition lifecycle management for PostgreSQL")]
#[command(version = "0.1.0")]
struct Cli {
    /// Database connection URL
    #[arg(long)]
    database_url: Option<String>,

    /// Settings file path
    #[arg(long, default_value = "config/config.toml")]
    config: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the groundskeeper catalog schema
    Install,

    /// Bring a table under partition management
    CreateParent {
        /// Schema-qualified parent table
        table: String,

        /// Partitioning column
        #[arg(long)]
        control: String,

        /// Partition kind (time-static, time-dynamic, time-custom,
        /// id-static, id-dynamic)
        #[arg(long)]
        kind: String,

        /// Interval keyword (daily, monthly, ...) or serial width
        #[arg(long)]
        interval: String,

        /// Partitions to keep created ahead of the data
        #[arg(long, default_value = "4")]
        premake: i32,

        /// Extra columns to carry pruning constraints on old children
        #[arg(long)]
        constraint_cols: Vec<String>,

        /// Skip replicating foreign keys onto children
        #[arg(long)]
        no_inherit_fk: bool,
    },

    /// Sub-partition every child of a managed set
    CreateSubParent {
        /// Schema-qualified parent of the set to sub-partition
        table: String,

        /// Partitioning column for the sub-partitions
        #[arg(long)]
        control: String,

        /// Partition kind for the sub-partitions
        #[arg(long)]
        kind: String,

        /// Interval keyword or serial width for the sub-partitions
        #[arg(long)]
        interval: String,

        #[arg(long, default_value = "4")]
        premake: i32,
    },

    /// Apply partition sets declared in the settings file
    Ensure,

    /// Run scheduled maintenance (create ahead, reap expired)
    Run {
        /// Maintain a single set instead of all of them
        #[arg(long)]
        table: Option<String>,
    },

    /// Reap expired partitions of one set
    Drop {
        /// Schema-qualified parent table
        table: String,

        /// Override the configured retention threshold
        #[arg(long)]
        retention: Option<String>,

        /// Detach expired children but keep the tables
        #[arg(long)]
        keep_table: bool,

        /// Move expired children to this schema instead of dropping
        #[arg(long)]
        retention_schema: Option<String>,
    },

    /// Move rows resident in the parent into their children
    Move {
        /// Schema-qualified parent table
        table: String,

        /// Batches to move before stopping
        #[arg(long, default_value = "1")]
        batches: u32,

        /// Window per batch; defaults to the partition interval
        #[arg(long)]
        batch_interval: Option<String>,

        /// Seconds to spend acquiring row locks per batch (0 disables)
        #[arg(long, default_value = "0")]
        lock_wait: f64,

        /// Move newest values first instead of oldest
        #[arg(long)]
        newest_first: bool,
    },

    /// Move data back into the parent and dismantle the set
    Undo {
        /// Schema-qualified parent table
        table: String,

        /// Non-empty children to drain before stopping
        #[arg(long, default_value = "1")]
        batches: u32,

        /// Keep drained children as standalone tables
        #[arg(long)]
        keep_table: bool,

        /// Seconds to spend dropping the routing trigger
        #[arg(long, default_value = "5")]
        lock_wait: f64,
    },

    /// List managed sets, or the children of one set
    List {
        /// Schema-qualified parent table
        table: Option<String>,
    },

    /// Report rows stranded in managed parents
    Check,

    /// Set or change a set's retention threshold
    SetRetention {
        /// Schema-qualified parent table
        table: String,

        /// Interval text for time sets, distance for serial sets
        retention: String,
    },

    /// Clear a set's retention threshold
    RemoveRetention {
        /// Schema-qualified parent table
        table: String,
    },
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if cli.quiet {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();
    } else if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let settings = match Settings::load_from(&cli.config) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} loading settings: {}", "Error".red(), e);
            process::exit(1);
        }
    };
    log::debug!(
        "loaded settings from {} ({} partition sets declared)",
        cli.config,
        settings.partition_sets.len()
    );

    let database_url = cli
        .database_url
        .clone()
        .or_else(|| std::env::var("GROUNDSKEEPER_DATABASE_URL").ok())
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| settings.database.url.clone());

    log::debug!("connecting to the configured database");
    let client = match connect(&database_url) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{} connecting to database: {}", "Error".red(), e);
            process::exit(1);
        }
    };

    let executor = MayPostgresExecutor::new(client);
    let result = run_command(cli.command, &executor, &settings);

    match result {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            process::exit(1);
        }
    }
}

fn run_command(
    command: Commands,
    executor: &dyn Executor,
    settings: &Settings,
) -> Result<(), Error> {
    let catalog = Catalog::new(executor);
    let lock = PgAdvisoryLock;

    match command {
        Commands::Install => handle_install(executor),
        Commands::CreateParent {
            table,
            control,
            kind,
            interval,
            premake,
            constraint_cols,
            no_inherit_fk,
        } => {
            let kind = PartitionKind::from_str(&kind)
                .ok_or_else(|| Error::InvalidPartitionKind(kind.clone()))?;
            let mut spec = CreateParentSpec::new(&table, &control, kind, &interval);
            spec.premake = premake;
            spec.constraint_cols = constraint_cols;
            spec.inherit_fk = !no_inherit_fk;
            handle_create_parent(executor, &catalog, &spec)
        }
        Commands::CreateSubParent {
            table,
            control,
            kind,
            interval,
            premake,
        } => {
            let kind = PartitionKind::from_str(&kind)
                .ok_or_else(|| Error::InvalidPartitionKind(kind.clone()))?;
            let template = SubTemplate {
                sub_parent: table,
                control,
                kind,
                interval: groundskeeper::catalog::PartInterval::parse(kind, &interval)?,
                constraint_cols: Vec::new(),
                premake,
                inherit_fk: true,
                retention: None,
                retention_schema: None,
                retention_keep_table: true,
                retention_keep_index: true,
                use_run_maintenance: true,
            };
            let created = parent::create_sub_parent(executor, &catalog, &template)?;
            println!(
                "{} sub-partitioned {} children",
                "✅".green(),
                created.len()
            );
            Ok(())
        }
        Commands::Ensure => handle_ensure(executor, &catalog, settings),
        Commands::Run { table } => {
            let report = maintenance::run_maintenance(executor, &lock, table.as_deref())?;
            print_report(&report);
            Ok(())
        }
        Commands::Drop {
            table,
            retention,
            keep_table,
            retention_schema,
        } => {
            let config = catalog.get(&table)?;
            let overrides = RetentionOverride {
                retention,
                keep_table: keep_table.then_some(true),
                keep_index: None,
                retention_schema,
            };
            let dropped = retention::drop_eligible(executor, &lock, &catalog, &config, &overrides)?;
            if dropped.is_empty() {
                println!("Nothing eligible to reap");
            } else {
                for child in &dropped {
                    println!("  {} {}", "✂".yellow(), child);
                }
                println!("{} reaped {} partitions", "✅".green(), dropped.len());
            }
            Ok(())
        }
        Commands::Move {
            table,
            batches,
            batch_interval,
            lock_wait,
            newest_first,
        } => {
            let config = catalog.get(&table)?;
            let order = if newest_first {
                MoveOrder::Descending
            } else {
                MoveOrder::Ascending
            };
            let outcome = mover::partition_data(
                executor,
                &catalog,
                &config,
                batches,
                batch_interval.as_deref(),
                lock_wait,
                order,
            )?;
            print_outcome(&outcome, "moved");
            Ok(())
        }
        Commands::Undo {
            table,
            batches,
            keep_table,
            lock_wait,
        } => {
            let outcome = undo::undo_partition(
                executor, &lock, &catalog, &table, batches, keep_table, lock_wait,
            )?;
            print_outcome(&outcome, "moved back");
            Ok(())
        }
        Commands::List { table } => handle_list(executor, &catalog, table.as_deref()),
        Commands::Check => handle_check(executor, &catalog),
        Commands::SetRetention { table, retention } => {
            catalog.set_retention(&table, &retention)?;
            println!("{} retention for {} set to {}", "✅".green(), table, retention);
            Ok(())
        }
        Commands::RemoveRetention { table } => {
            catalog.remove_retention(&table)?;
            println!("{} retention for {} removed", "✅".green(), table);
            Ok(())
        }
    }
}

fn handle_install(executor: &dyn Executor) -> Result<(), Error> {
    schema::install(executor)?;
    println!("{} catalog schema installed", "✅".green());
    Ok(())
}

fn handle_create_parent(
    executor: &dyn Executor,
    catalog: &Catalog,
    spec: &CreateParentSpec,
) -> Result<(), Error> {
    let created = parent::create_parent(executor, catalog, spec)?;
    println!(
        "{} {} under management, {} initial partitions:",
        "✅".green(),
        spec.parent_table,
        created.len()
    );
    for child in &created {
        println!("  {} {}", "+".green(), child);
    }
    Ok(())
}

/// Apply every set declared in the settings file, skipping sets that
/// already exist
fn handle_ensure(
    executor: &dyn Executor,
    catalog: &Catalog,
    settings: &Settings,
) -> Result<(), Error> {
    let mut applied = 0;
    for set in &settings.partition_sets {
        let spec = set.to_spec()?;
        match parent::create_parent(executor, catalog, &spec) {
            Ok(created) => {
                println!(
                    "{} {} under management ({} partitions)",
                    "✅".green(),
                    spec.parent_table,
                    created.len()
                );
                applied += 1;
            }
            Err(Error::AlreadyConfigured(_)) => {
                println!("  {} {} already managed", "·".dimmed(), spec.parent_table);
            }
            Err(e) => return Err(e),
        }
    }
    println!("\n{} {} new sets applied", "✅".green(), applied);
    Ok(())
}

fn handle_list(
    executor: &dyn Executor,
    catalog: &Catalog,
    table: Option<&str>,
) -> Result<(), Error> {
    match table {
        Some(table) => {
            let config = catalog.get(table)?;
            println!("\n📊 Children of {table}\n");
            for child in
                inspect::list_children(executor, &config, inspect::ChildOrder::OldestFirst)?
            {
                let info = inspect::child_info(executor, &child.qualified())?;
                println!(
                    "  {} ({} rows, {} bytes)",
                    info.child_table, info.row_count, info.total_bytes
                );
            }
        }
        None => {
            println!("\n📊 Managed partition sets\n");
            for config in catalog.list(false)? {
                let mode = if config.use_run_maintenance {
                    "scheduled"
                } else {
                    "on-demand"
                };
                let retention = config.retention.as_deref().unwrap_or("none");
                println!(
                    "  {} [{} {} {}] retention: {}",
                    config.parent_table.bold(),
                    config.kind.as_str(),
                    config.interval.as_text(),
                    mode,
                    retention
                );
            }
        }
    }
    Ok(())
}

fn handle_check(executor: &dyn Executor, catalog: &Catalog) -> Result<(), Error> {
    let stray = inspect::check_parents(executor, catalog)?;
    if stray.is_empty() {
        println!("{} no rows stranded in managed parents", "✅".green());
    } else {
        println!("{} rows stranded in managed parents:", "⚠".yellow());
        for (parent, count) in &stray {
            println!("  {parent}: {count} rows");
        }
        println!("\nRun `groundskeeper move <table>` to relocate them");
    }
    Ok(())
}

fn print_report(report: &maintenance::MaintenanceReport) {
    for child in &report.created {
        println!("  {} {}", "+".green(), child);
    }
    for child in &report.dropped {
        println!("  {} {}", "✂".yellow(), child);
    }
    for parent in &report.skipped {
        println!("  {} {} skipped", "·".dimmed(), parent);
    }
    for warning in &report.warnings {
        println!("  {} {}", "⚠".yellow(), warning);
    }
    if report.is_noop() {
        println!("{} nothing to do", "✅".green());
    } else {
        println!(
            "{} {} created, {} reaped",
            "✅".green(),
            report.created.len(),
            report.dropped.len()
        );
    }
}

fn print_outcome(outcome: &MoveOutcome, verb: &str) {
    match outcome {
        MoveOutcome::Done { rows } => {
            println!("{} {} rows {}", "✅".green(), rows, verb);
        }
        MoveOutcome::LockTimeout => {
            println!("{} gave up waiting for locks, try again later", "⚠".yellow());
        }
    }
}
