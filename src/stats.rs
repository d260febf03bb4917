//! Aggregation over filtered rows and a resolved schema.
//!
//! Every statistic degrades gracefully: a role that never resolved yields the
//! neutral value for its statistic (empty distribution, zero counts, empty
//! ranking) rather than an error. Percentages are integer-rounded and always
//! computed against the total row count, not the yes+no subtotal.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::filter::is_cancelled;
use crate::schema::{Role, Schema};
use crate::workbook::{Row, cell_at};

/// Bucket label for rows whose grouping cell is empty or absent.
pub const UNKNOWN_BUCKET: &str = "unknown";

/// Years reported when neither a year column nor embedded year text exists.
pub const DEFAULT_YEARS: [&str; 2] = ["2024", "2025"];

/// Fiscal-year month ranks, May first. Months outside the table sort after
/// every ranked month, alphabetically among themselves.
const MONTH_ORDER: [(&str, u8); 10] = [
    ("May", 1),
    ("Jun", 2),
    ("Jul", 3),
    ("Aug", 4),
    ("Sep", 5),
    ("Oct", 6),
    ("Nov", 7),
    ("Dec", 8),
    ("Jan", 9),
    ("Feb", 10),
];

/// Normalized reading of a participation-flag cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YesNo {
    Yes,
    No,
    Unknown,
}

/// Shared yes/no vocabulary: English tokens, numeric and boolean literals,
/// and the Chinese 是/否 pair. Anything else is unknown.
pub fn normalize_yes_no(value: &str) -> YesNo {
    let canon = value.trim().to_uppercase();
    match canon.as_str() {
        "Y" | "YES" | "TRUE" | "1" | "T" | "是" => YesNo::Yes,
        "N" | "NO" | "FALSE" | "0" | "F" | "否" => YesNo::No,
        _ => YesNo::Unknown,
    }
}

fn percent(count: usize, total: usize) -> u32 {
    if total == 0 {
        0
    } else {
        (count as f64 / total as f64 * 100.0).round() as u32
    }
}

/// One bucket of a value distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub count: usize,
    pub percentage: u32,
}

/// Distribution of a single column's values, keyed by value text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Distribution {
    pub buckets: BTreeMap<String, Bucket>,
    pub total: usize,
}

impl Distribution {
    fn from_column(rows: &[&Row], column: Option<usize>) -> Self {
        let Some(column) = column else {
            return Self::default();
        };
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut total = 0;
        for row in rows {
            let key = cell_at(row, column)
                .text()
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| UNKNOWN_BUCKET.to_string());
            *counts.entry(key).or_insert(0) += 1;
            total += 1;
        }
        let buckets = counts
            .into_iter()
            .map(|(key, count)| {
                (
                    key,
                    Bucket {
                        count,
                        percentage: percent(count, total),
                    },
                )
            })
            .collect();
        Self { buckets, total }
    }
}

/// Yes/no/unknown split for one participation flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParticipationStats {
    pub yes: usize,
    pub no: usize,
    pub unknown: usize,
    pub total: usize,
    pub yes_percentage: u32,
    pub no_percentage: u32,
    pub unknown_percentage: u32,
}

impl ParticipationStats {
    fn from_column(rows: &[&Row], column: Option<usize>) -> Self {
        let Some(column) = column else {
            return Self::default();
        };
        let mut stats = Self::default();
        for row in rows {
            stats.total += 1;
            match cell_at(row, column).text() {
                None => stats.unknown += 1,
                Some(value) => match normalize_yes_no(&value) {
                    YesNo::Yes => stats.yes += 1,
                    YesNo::No => stats.no += 1,
                    YesNo::Unknown => stats.unknown += 1,
                },
            }
        }
        stats.yes_percentage = percent(stats.yes, stats.total);
        stats.no_percentage = percent(stats.no, stats.total);
        stats.unknown_percentage = percent(stats.unknown, stats.total);
        stats
    }
}

/// Per-month yes/no breakdown of the offline-participation flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyEssStats {
    pub month: String,
    pub yes: usize,
    pub no: usize,
    pub unknown: usize,
    pub total: usize,
    pub yes_percentage: u32,
    pub no_percentage: u32,
}

fn monthly_ess_stats(rows: &[&Row], schema: &Schema) -> Vec<MonthlyEssStats> {
    let (Some(month_column), Some(flag_column)) = (
        schema.column(Role::Month),
        schema.column(Role::EssOffline),
    ) else {
        return Vec::new();
    };
    let mut groups: BTreeMap<String, (usize, usize, usize, usize)> = BTreeMap::new();
    for row in rows {
        let month = cell_at(row, month_column)
            .text()
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| UNKNOWN_BUCKET.to_string());
        let entry = groups.entry(month).or_default();
        entry.3 += 1;
        match cell_at(row, flag_column).text() {
            None => entry.2 += 1,
            Some(value) => match normalize_yes_no(&value) {
                YesNo::Yes => entry.0 += 1,
                YesNo::No => entry.1 += 1,
                YesNo::Unknown => entry.2 += 1,
            },
        }
    }
    let mut stats: Vec<MonthlyEssStats> = groups
        .into_iter()
        .map(|(month, (yes, no, unknown, total))| MonthlyEssStats {
            month,
            yes,
            no,
            unknown,
            total,
            yes_percentage: percent(yes, total),
            no_percentage: percent(no, total),
        })
        .collect();
    stats.sort_by(|a, b| compare_months(&a.month, &b.month));
    stats
}

/// Cancelled vs not-cancelled counts under the marker rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CancellationStats {
    pub cancelled: usize,
    pub not_cancelled: usize,
    pub total: usize,
    pub cancelled_percentage: u32,
    pub not_cancelled_percentage: u32,
}

impl CancellationStats {
    fn from_column(rows: &[&Row], column: Option<usize>) -> Self {
        let Some(column) = column else {
            return Self::default();
        };
        let mut stats = Self::default();
        for row in rows {
            stats.total += 1;
            if is_cancelled(row, column) {
                stats.cancelled += 1;
            } else {
                stats.not_cancelled += 1;
            }
        }
        stats.cancelled_percentage = percent(stats.cancelled, stats.total);
        stats.not_cancelled_percentage = percent(stats.not_cancelled, stats.total);
        stats
    }
}

/// Per-person participation counts. The two flags are asymmetric by design:
/// `offline_yes` counts meetings a person had to attend in person, while
/// `online_no` counts meetings with no online requirement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonCounts {
    pub name: String,
    pub offline_yes: usize,
    pub online_no: usize,
    pub total: usize,
}

fn person_ranking(rows: &[&Row], schema: &Schema) -> Vec<PersonCounts> {
    let Some(name_column) = schema.column(Role::EssName) else {
        return Vec::new();
    };
    let offline_column = schema.column(Role::EssOffline);
    let online_column = schema.column(Role::EssOnline);
    if offline_column.is_none() && online_column.is_none() {
        return Vec::new();
    }

    let mut counts: BTreeMap<String, PersonCounts> = BTreeMap::new();
    for row in rows {
        let Some(name) = cell_at(row, name_column)
            .text()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
        else {
            continue;
        };
        let entry = counts.entry(name.clone()).or_insert_with(|| PersonCounts {
            name,
            offline_yes: 0,
            online_no: 0,
            total: 0,
        });
        entry.total += 1;
        if let Some(column) = offline_column
            && let Some(value) = cell_at(row, column).text()
            && normalize_yes_no(&value) == YesNo::Yes
        {
            entry.offline_yes += 1;
        }
        if let Some(column) = online_column
            && let Some(value) = cell_at(row, column).text()
            && normalize_yes_no(&value) == YesNo::No
        {
            entry.online_no += 1;
        }
    }

    let mut ranking: Vec<PersonCounts> = counts.into_values().collect();
    ranking.sort_by(|a, b| {
        b.offline_yes
            .cmp(&a.offline_yes)
            .then(b.online_no.cmp(&a.online_no))
            .then(b.total.cmp(&a.total))
    });
    ranking
}

/// Deduplicated, trimmed, non-empty values of one column, sorted.
pub fn distinct_values(rows: &[&Row], column: Option<usize>) -> Vec<String> {
    let Some(column) = column else {
        return Vec::new();
    };
    let mut values: Vec<String> = rows
        .iter()
        .filter_map(|row| cell_at(row, column).text())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();
    values.sort();
    values.dedup();
    values
}

fn month_rank(month: &str) -> Option<u8> {
    MONTH_ORDER
        .iter()
        .find(|(name, _)| *name == month)
        .map(|(_, rank)| *rank)
}

/// Total order on month labels: fiscal rank first, then ranked before
/// unranked, then alphabetical among the unranked.
pub fn compare_months(a: &str, b: &str) -> std::cmp::Ordering {
    match (month_rank(a), month_rank(b)) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Distinct month values in fiscal order.
pub fn sorted_months(rows: &[&Row], schema: &Schema) -> Vec<String> {
    let mut months = distinct_values(rows, schema.column(Role::Month));
    months.sort_by(|a, b| compare_months(a, b));
    months
}

/// Distinct years, preferring the dedicated column, then trailing 4-digit
/// tokens embedded in month text (e.g. "Dec 2024"), then a fixed default.
pub fn year_values(rows: &[&Row], schema: &Schema) -> Vec<String> {
    if let Some(column) = schema.column(Role::Year) {
        let years = distinct_values(rows, Some(column));
        if !years.is_empty() || !rows.is_empty() {
            return years;
        }
    }
    if let Some(column) = schema.column(Role::Month) {
        let mut years: Vec<String> = rows
            .iter()
            .filter_map(|row| cell_at(row, column).text())
            .filter_map(|month| embedded_year(&month))
            .collect();
        years.sort();
        years.dedup();
        if !years.is_empty() {
            return years;
        }
    }
    DEFAULT_YEARS.iter().map(|year| year.to_string()).collect()
}

fn embedded_year(month: &str) -> Option<String> {
    if !month.contains(' ') {
        return None;
    }
    let last = month.split(' ').next_back()?.trim();
    if last.len() == 4 && last.chars().all(|c| c.is_ascii_digit()) {
        Some(last.to_string())
    } else {
        None
    }
}

/// Everything the stats and ranking commands report, derived in one pass
/// from the filtered rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregates {
    pub region: Distribution,
    pub ess_participation: ParticipationStats,
    pub monthly_ess: Vec<MonthlyEssStats>,
    pub cancellation: CancellationStats,
    pub event_types: Distribution,
    pub ranking: Vec<PersonCounts>,
    pub brands: Vec<String>,
    pub months: Vec<String>,
    pub years: Vec<String>,
    pub ess_names: Vec<String>,
    pub event_type_names: Vec<String>,
}

pub fn compute_aggregates(rows: &[&Row], schema: &Schema) -> Aggregates {
    Aggregates {
        region: Distribution::from_column(rows, schema.column(Role::Region)),
        ess_participation: ParticipationStats::from_column(
            rows,
            schema.column(Role::EssOffline),
        ),
        monthly_ess: monthly_ess_stats(rows, schema),
        cancellation: CancellationStats::from_column(rows, schema.column(Role::Cancellation)),
        event_types: Distribution::from_column(rows, schema.column(Role::EventType)),
        ranking: person_ranking(rows, schema),
        brands: distinct_values(rows, schema.column(Role::Brand)),
        months: sorted_months(rows, schema),
        years: year_values(rows, schema),
        ess_names: distinct_values(rows, schema.column(Role::EssName)),
        event_type_names: distinct_values(rows, schema.column(Role::EventType)),
    }
}
