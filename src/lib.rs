pub mod cli;
pub mod dataset;
pub mod filter;
pub mod schema;
pub mod score;
pub mod select;
pub mod stats;
pub mod table;
pub mod workbook;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, info};
use serde::Serialize;

use crate::cli::{Cli, Commands, FilterArgs, InputArgs, ProbeArgs, RankArgs, SheetsArgs, StatsArgs};
use crate::dataset::DataSet;
use crate::filter::RowFilter;
use crate::schema::{Role, Schema};
use crate::select::{ViewKind, select_sheet};
use crate::stats::Aggregates;
use crate::workbook::Workbook;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet_insight", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Sheets(args) => handle_sheets(&args),
        Commands::Probe(args) => handle_probe(&args),
        Commands::Stats(args) => handle_stats(&args),
        Commands::Rank(args) => handle_rank(&args),
    }
}

fn handle_sheets(args: &SheetsArgs) -> Result<()> {
    let workbook = Workbook::open(&args.input)
        .with_context(|| format!("Loading workbook {:?}", args.input))?;
    let names = workbook.sheet_names();
    if names.is_empty() {
        bail!("Workbook {:?} contains no sheets", args.input);
    }
    let default_pick = select_sheet(&names, ViewKind::Default).map(str::to_string);
    let travel_pick = select_sheet(&names, ViewKind::TravelCost).map(str::to_string);

    if args.json {
        #[derive(Serialize)]
        struct SheetReport {
            sheets: Vec<String>,
            default: Option<String>,
            travel_cost: Option<String>,
        }
        let report = SheetReport {
            sheets: names,
            default: default_pick,
            travel_cost: travel_pick,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = names
        .iter()
        .map(|name| {
            let mut views = Vec::new();
            if default_pick.as_deref() == Some(name) {
                views.push("default");
            }
            if travel_pick.as_deref() == Some(name) {
                views.push("travel-cost");
            }
            vec![name.clone(), views.join(", ")]
        })
        .collect();
    table::print_table(&["sheet", "selected for"], &rows);
    info!("Listed {} sheet(s) from {:?}", rows.len(), args.input);
    Ok(())
}

/// Loads the requested sheet and applies any manual column overrides.
fn load_dataset(args: &InputArgs) -> Result<DataSet> {
    let workbook = Workbook::open(&args.input)
        .with_context(|| format!("Loading workbook {:?}", args.input))?;
    let names = workbook.sheet_names();
    let sheet_name = match &args.sheet {
        Some(name) => {
            if workbook.sheet(name).is_none() {
                bail!(
                    "Sheet '{name}' not found in {:?} (available: {})",
                    args.input,
                    names.join(", ")
                );
            }
            name.clone()
        }
        None => select_sheet(&names, args.view)
            .map(str::to_string)
            .with_context(|| format!("Workbook {:?} contains no sheets", args.input))?,
    };
    let sheet = workbook
        .sheet(&sheet_name)
        .with_context(|| format!("Reading sheet '{sheet_name}'"))?;
    let mut dataset = DataSet::from_sheet(sheet);
    dataset.apply_manual_columns(&args.columns);
    Ok(dataset)
}

fn row_filter(args: &FilterArgs) -> RowFilter {
    RowFilter {
        year: args.year.clone(),
        months: args.months.clone(),
        brand: args.brand.clone(),
        cancellation: args.cancellation,
    }
}

fn handle_probe(args: &ProbeArgs) -> Result<()> {
    let dataset = load_dataset(&args.input)?;

    if args.json {
        #[derive(Serialize)]
        struct ProbeReport<'a> {
            sheet: &'a str,
            headers: &'a [String],
            data_rows: usize,
            manually_set: bool,
            schema: &'a Schema,
        }
        let report = ProbeReport {
            sheet: dataset.sheet_name(),
            headers: dataset.headers(),
            data_rows: dataset.rows().len(),
            manually_set: dataset.is_manually_set(),
            schema: dataset.schema(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = Role::ALL
        .into_iter()
        .map(|role| {
            let (column, header) = match dataset.schema().column(role) {
                Some(index) => (
                    index.to_string(),
                    dataset
                        .headers()
                        .get(index)
                        .cloned()
                        .unwrap_or_default(),
                ),
                None => ("-".to_string(), String::new()),
            };
            vec![role.label().to_string(), column, header]
        })
        .collect();
    table::print_table(&["role", "column", "header"], &rows);
    info!(
        "Probed sheet '{}': {} data row(s)",
        dataset.sheet_name(),
        dataset.rows().len()
    );
    Ok(())
}

fn handle_stats(args: &StatsArgs) -> Result<()> {
    let mut dataset = load_dataset(&args.input)?;
    dataset.set_filter(row_filter(&args.filter));
    let total_rows = dataset.rows().len();
    let filtered_rows = dataset.filtered().len();
    let sheet = dataset.sheet_name().to_string();
    let schema = dataset.schema().clone();
    let aggregates = dataset.aggregates();

    if args.json {
        #[derive(Serialize)]
        struct StatsReport<'a> {
            sheet: &'a str,
            total_rows: usize,
            filtered_rows: usize,
            schema: &'a Schema,
            aggregates: &'a Aggregates,
        }
        let report = StatsReport {
            sheet: &sheet,
            total_rows,
            filtered_rows,
            schema: &schema,
            aggregates,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_stats_tables(aggregates);
    info!("Computed statistics over {filtered_rows} of {total_rows} row(s) in sheet '{sheet}'");
    Ok(())
}

fn print_stats_tables(aggregates: &Aggregates) {
    println!("Regions");
    let rows: Vec<Vec<String>> = aggregates
        .region
        .buckets
        .iter()
        .map(|(region, bucket)| {
            vec![
                region.clone(),
                bucket.count.to_string(),
                format!("{}%", bucket.percentage),
            ]
        })
        .collect();
    table::print_table(&["region", "count", "percent"], &rows);

    println!("\nESS offline participation");
    let part = &aggregates.ess_participation;
    let rows = vec![vec![
        part.yes.to_string(),
        part.no.to_string(),
        part.unknown.to_string(),
        part.total.to_string(),
        format!("{}%", part.yes_percentage),
        format!("{}%", part.no_percentage),
    ]];
    table::print_table(&["yes", "no", "unknown", "total", "yes%", "no%"], &rows);

    println!("\nMonthly ESS participation");
    let rows: Vec<Vec<String>> = aggregates
        .monthly_ess
        .iter()
        .map(|month| {
            vec![
                month.month.clone(),
                month.yes.to_string(),
                month.no.to_string(),
                month.unknown.to_string(),
                month.total.to_string(),
                format!("{}%", month.yes_percentage),
                format!("{}%", month.no_percentage),
            ]
        })
        .collect();
    table::print_table(
        &["month", "yes", "no", "unknown", "total", "yes%", "no%"],
        &rows,
    );

    println!("\nCancellations");
    let cancel = &aggregates.cancellation;
    let rows = vec![vec![
        cancel.cancelled.to_string(),
        cancel.not_cancelled.to_string(),
        cancel.total.to_string(),
        format!("{}%", cancel.cancelled_percentage),
        format!("{}%", cancel.not_cancelled_percentage),
    ]];
    table::print_table(
        &["cancelled", "active", "total", "cancelled%", "active%"],
        &rows,
    );

    println!("\nEvent types");
    let rows: Vec<Vec<String>> = aggregates
        .event_types
        .buckets
        .iter()
        .map(|(event_type, bucket)| {
            vec![
                event_type.clone(),
                bucket.count.to_string(),
                format!("{}%", bucket.percentage),
            ]
        })
        .collect();
    table::print_table(&["event type", "count", "percent"], &rows);

    println!("\nYears: {}", aggregates.years.join(", "));
    println!("Months: {}", aggregates.months.join(", "));
    if !aggregates.brands.is_empty() {
        println!("Brands: {}", aggregates.brands.join(", "));
    }
}

fn handle_rank(args: &RankArgs) -> Result<()> {
    let mut dataset = load_dataset(&args.input)?;
    dataset.set_filter(row_filter(&args.filter));
    let sheet = dataset.sheet_name().to_string();
    let scored = score::scored_ranking(&dataset.aggregates().ranking);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&scored)?);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = scored
        .iter()
        .map(|person| {
            vec![
                person.counts.name.clone(),
                person.counts.offline_yes.to_string(),
                person.counts.online_no.to_string(),
                person.counts.total.to_string(),
                format!("{}", person.performance.offline_score),
                format!("{}", person.performance.online_score),
                format!("{}", person.performance.total_score),
                person.performance.formatted_percentage(),
            ]
        })
        .collect();
    table::print_table(
        &[
            "name",
            "offline yes",
            "online no",
            "total",
            "offline score",
            "online score",
            "score",
            "performance",
        ],
        &rows,
    );
    info!("Ranked {} person(s) from sheet '{sheet}'", rows.len());
    Ok(())
}
