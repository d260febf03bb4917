use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::filter::CancellationChoice;
use crate::schema::Role;
use crate::select::ViewKind;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Locate semantic columns in meeting workbooks and compute participation statistics",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the sheets of a workbook and which one each view would select
    Sheets(SheetsArgs),
    /// Infer the column schema of a sheet and report resolved roles
    Probe(ProbeArgs),
    /// Compute distributions and participation statistics over filtered rows
    Stats(StatsArgs),
    /// Rank ESS personnel by participation and performance score
    Rank(RankArgs),
}

#[derive(Debug, Args)]
pub struct SheetsArgs {
    /// Input workbook (.xlsx/.xls/.ods) or delimited file (.csv/.tsv)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Arguments shared by every command that loads and resolves one sheet.
#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input workbook (.xlsx/.xls/.ods) or delimited file (.csv/.tsv)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Sheet name to analyze (defaults to automatic selection for the view)
    #[arg(short = 's', long = "sheet")]
    pub sheet: Option<String>,
    /// Which analysis view drives automatic sheet selection
    #[arg(long, value_enum, default_value_t = ViewKind::Default)]
    pub view: ViewKind,
    /// Manual column override of the form `role=index`, repeatable
    #[arg(long = "column", value_parser = parse_column_override, action = clap::ArgAction::Append)]
    pub columns: Vec<(Role, usize)>,
}

/// Row filter arguments shared by stats and rank.
#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Keep rows matching this year (dedicated column or month text)
    #[arg(long)]
    pub year: Option<String>,
    /// Keep rows matching one of these months, repeatable
    #[arg(long = "month", action = clap::ArgAction::Append)]
    pub months: Vec<String>,
    /// Keep rows matching this brand/team value
    #[arg(long)]
    pub brand: Option<String>,
    /// Keep rows by cancellation status
    #[arg(long, value_enum, default_value_t = CancellationChoice::All)]
    pub cancellation: CancellationChoice,
}

#[derive(Debug, Args)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct StatsArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Emit JSON instead of tables
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct RankArgs {
    #[command(flatten)]
    pub input: InputArgs,
    #[command(flatten)]
    pub filter: FilterArgs,
    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

fn parse_column_override(raw: &str) -> Result<(Role, usize), String> {
    let (role, index) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected role=index, got '{raw}'"))?;
    let role: Role = role.parse()?;
    let index: usize = index
        .trim()
        .parse()
        .map_err(|_| format!("invalid column index '{index}' for role '{role}'"))?;
    Ok((role, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_override_parses_role_and_index() {
        assert_eq!(
            parse_column_override("month=3").unwrap(),
            (Role::Month, 3)
        );
        assert_eq!(
            parse_column_override("ess-name=0").unwrap(),
            (Role::EssName, 0)
        );
        assert!(parse_column_override("month").is_err());
        assert!(parse_column_override("bogus=1").is_err());
        assert!(parse_column_override("month=x").is_err());
    }

    #[test]
    fn cli_parses_stats_invocation() {
        let cli = Cli::try_parse_from([
            "sheet-insight",
            "stats",
            "--input",
            "meetings.xlsx",
            "--month",
            "May",
            "--month",
            "Jun",
            "--cancellation",
            "not-cancelled",
            "--column",
            "brand=9",
            "--json",
        ])
        .expect("parse CLI");
        match cli.command {
            Commands::Stats(args) => {
                assert_eq!(args.filter.months, vec!["May", "Jun"]);
                assert_eq!(args.filter.cancellation, CancellationChoice::NotCancelled);
                assert_eq!(args.input.columns, vec![(Role::Brand, 9)]);
                assert!(args.json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
