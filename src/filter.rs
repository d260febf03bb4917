//! Row filtering over resolved schemas.
//!
//! Every predicate is optional and independently skippable: a filter value of
//! "all"/absent matches everything, and a predicate whose role never resolved
//! is skipped rather than failing the row. Predicates conjoin.

use clap::ValueEnum;

use crate::schema::{Role, Schema};
use crate::workbook::{Row, cell_at};

/// Cell value marking a cancelled meeting.
pub const CANCELLATION_MARKER: &str = "R";

/// Cancellation-status filter choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum CancellationChoice {
    #[default]
    All,
    Cancelled,
    NotCancelled,
}

/// Conjunctive filter state. Empty month list means "any month".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowFilter {
    pub year: Option<String>,
    pub months: Vec<String>,
    pub brand: Option<String>,
    pub cancellation: CancellationChoice,
}

impl RowFilter {
    pub fn is_unrestricted(&self) -> bool {
        self.year.is_none()
            && self.months.is_empty()
            && self.brand.is_none()
            && self.cancellation == CancellationChoice::All
    }
}

/// True when the cell carries the cancellation marker (case-insensitive).
pub fn is_cancelled(row: &Row, column: usize) -> bool {
    cell_at(row, column)
        .text()
        .is_some_and(|value| value.trim().eq_ignore_ascii_case(CANCELLATION_MARKER))
}

/// Applies the filter, returning references to the surviving rows.
pub fn filter_rows<'a>(rows: &'a [Row], schema: &Schema, filter: &RowFilter) -> Vec<&'a Row> {
    rows.iter()
        .filter(|row| row_matches(row, schema, filter))
        .collect()
}

fn row_matches(row: &Row, schema: &Schema, filter: &RowFilter) -> bool {
    year_matches(row, schema, filter)
        && month_matches(row, schema, filter)
        && brand_matches(row, schema, filter)
        && cancellation_matches(row, schema, filter)
}

/// A year can live in a dedicated column or be embedded in month text such
/// as "Dec 2024"; either source satisfies the predicate. With neither role
/// resolved the predicate is skipped.
fn year_matches(row: &Row, schema: &Schema, filter: &RowFilter) -> bool {
    let Some(year) = filter.year.as_deref() else {
        return true;
    };
    let year_column = schema.column(Role::Year);
    let month_column = schema.column(Role::Month);
    if year_column.is_none() && month_column.is_none() {
        return true;
    }
    if let Some(column) = year_column
        && cell_at(row, column).text().as_deref() == Some(year)
    {
        return true;
    }
    if let Some(column) = month_column
        && cell_at(row, column)
            .text()
            .is_some_and(|month| month.contains(year))
    {
        return true;
    }
    false
}

fn month_matches(row: &Row, schema: &Schema, filter: &RowFilter) -> bool {
    if filter.months.is_empty() {
        return true;
    }
    let Some(column) = schema.column(Role::Month) else {
        return true;
    };
    match cell_at(row, column).text() {
        Some(month) => filter.months.iter().any(|wanted| *wanted == month),
        None => false,
    }
}

fn brand_matches(row: &Row, schema: &Schema, filter: &RowFilter) -> bool {
    let Some(brand) = filter.brand.as_deref() else {
        return true;
    };
    let Some(column) = schema.column(Role::Brand) else {
        return true;
    };
    cell_at(row, column).text().as_deref() == Some(brand)
}

fn cancellation_matches(row: &Row, schema: &Schema, filter: &RowFilter) -> bool {
    if filter.cancellation == CancellationChoice::All {
        return true;
    }
    let Some(column) = schema.column(Role::Cancellation) else {
        return true;
    };
    match filter.cancellation {
        CancellationChoice::Cancelled => is_cancelled(row, column),
        CancellationChoice::NotCancelled => !is_cancelled(row, column),
        CancellationChoice::All => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::Cell;

    fn row(values: &[&str]) -> Row {
        values
            .iter()
            .map(|value| {
                if value.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(value.to_string())
                }
            })
            .collect()
    }

    fn schema() -> Schema {
        // year=0, month=1, brand=2, cancellation=3
        let mut schema = Schema::default();
        schema.assign(Role::Year, 0);
        schema.assign(Role::Month, 1);
        schema.assign(Role::Brand, 2);
        schema.assign(Role::Cancellation, 3);
        schema
    }

    #[test]
    fn unrestricted_filter_keeps_everything() {
        let rows = vec![row(&["2024", "May", "A", ""]), row(&["2025", "Jun", "B", "R"])];
        let kept = filter_rows(&rows, &schema(), &RowFilter::default());
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn year_matches_dedicated_column_or_month_text() {
        let rows = vec![
            row(&["2024", "May", "A", ""]),
            row(&["", "Dec 2025", "A", ""]),
            row(&["2023", "Jun", "A", ""]),
        ];
        let filter = RowFilter {
            year: Some("2025".to_string()),
            ..RowFilter::default()
        };
        let kept = filter_rows(&rows, &schema(), &filter);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0][1], Cell::Text("Dec 2025".into()));
    }

    #[test]
    fn year_predicate_skipped_when_neither_role_resolved() {
        let rows = vec![row(&["x", "y"])];
        let filter = RowFilter {
            year: Some("2024".to_string()),
            ..RowFilter::default()
        };
        let kept = filter_rows(&rows, &Schema::default(), &filter);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn month_filter_accepts_membership() {
        let rows = vec![
            row(&["2024", "May", "A", ""]),
            row(&["2024", "Jun", "A", ""]),
            row(&["2024", "Jul", "A", ""]),
        ];
        let filter = RowFilter {
            months: vec!["May".to_string(), "Jul".to_string()],
            ..RowFilter::default()
        };
        let kept = filter_rows(&rows, &schema(), &filter);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn brand_filter_requires_exact_value() {
        let rows = vec![
            row(&["2024", "May", "Alpha", ""]),
            row(&["2024", "May", "Beta", ""]),
        ];
        let filter = RowFilter {
            brand: Some("Alpha".to_string()),
            ..RowFilter::default()
        };
        let kept = filter_rows(&rows, &schema(), &filter);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn cancellation_marker_is_case_insensitive() {
        let rows = vec![
            row(&["2024", "May", "A", "R"]),
            row(&["2024", "May", "A", "r"]),
            row(&["2024", "May", "A", ""]),
            row(&["2024", "May", "A", "X"]),
        ];
        let cancelled = RowFilter {
            cancellation: CancellationChoice::Cancelled,
            ..RowFilter::default()
        };
        assert_eq!(filter_rows(&rows, &schema(), &cancelled).len(), 2);

        let active = RowFilter {
            cancellation: CancellationChoice::NotCancelled,
            ..RowFilter::default()
        };
        assert_eq!(filter_rows(&rows, &schema(), &active).len(), 2);
    }

    #[test]
    fn predicates_conjoin() {
        let rows = vec![
            row(&["2024", "May", "Alpha", ""]),
            row(&["2024", "May", "Alpha", "R"]),
            row(&["2024", "Jun", "Alpha", ""]),
            row(&["2025", "May", "Alpha", ""]),
        ];
        let filter = RowFilter {
            year: Some("2024".to_string()),
            months: vec!["May".to_string()],
            brand: Some("Alpha".to_string()),
            cancellation: CancellationChoice::NotCancelled,
        };
        let kept = filter_rows(&rows, &schema(), &filter);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn short_rows_never_fail() {
        let rows = vec![row(&["2024"])];
        let filter = RowFilter {
            cancellation: CancellationChoice::NotCancelled,
            ..RowFilter::default()
        };
        // Missing cancellation cell reads as absent, which is "not cancelled".
        assert_eq!(filter_rows(&rows, &schema(), &filter).len(), 1);
    }
}
