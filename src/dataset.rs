//! Owned view of one sheet: detected headers, data rows, inferred schema,
//! filter state, and a cache of derived aggregates.
//!
//! The cache discipline is strict: every mutation of schema or filter clears
//! the cached aggregates, so a read after a write never observes stale
//! statistics. Manual column overrides take precedence over inference until
//! explicitly reset.

use log::info;

use crate::filter::{RowFilter, filter_rows};
use crate::schema::{self, Role, Schema};
use crate::stats::{Aggregates, compute_aggregates};
use crate::workbook::{Row, Sheet};

#[derive(Debug, Clone)]
pub struct DataSet {
    sheet_name: String,
    headers: Vec<String>,
    rows: Vec<Row>,
    auto_schema: Schema,
    schema: Schema,
    manually_set: bool,
    filter: RowFilter,
    aggregates: Option<Aggregates>,
}

impl DataSet {
    /// Builds a data set from a raw sheet: detects the header row, infers the
    /// schema, and honors a first-data-row promotion if inference requests
    /// one.
    pub fn from_sheet(sheet: &Sheet) -> Self {
        let (mut headers, mut rows) = split_header(&sheet.rows);
        let resolution = schema::resolve(&headers, &rows);
        if let Some(promoted) = resolution.promoted_headers {
            headers = promoted;
            rows.remove(0);
        }
        let resolved = resolution.schema.resolved().count();
        info!(
            "sheet '{}': {} data row(s), {resolved} of {} role(s) resolved",
            sheet.name,
            rows.len(),
            Role::ALL.len()
        );
        Self {
            sheet_name: sheet.name.clone(),
            headers,
            rows,
            auto_schema: resolution.schema.clone(),
            schema: resolution.schema,
            manually_set: false,
            filter: RowFilter::default(),
            aggregates: None,
        }
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn is_manually_set(&self) -> bool {
        self.manually_set
    }

    pub fn filter(&self) -> &RowFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: RowFilter) {
        if self.filter != filter {
            self.filter = filter;
            self.aggregates = None;
        }
    }

    /// Overrides inferred columns. The overrides persist across filter
    /// changes until [`DataSet::reset_to_auto_schema`] is called.
    pub fn apply_manual_columns(&mut self, overrides: &[(Role, usize)]) {
        if overrides.is_empty() {
            return;
        }
        for (role, index) in overrides {
            self.schema.assign(*role, *index);
        }
        self.manually_set = true;
        self.aggregates = None;
    }

    /// Returns authority to automatic inference.
    pub fn reset_to_auto_schema(&mut self) {
        self.schema = self.auto_schema.clone();
        self.manually_set = false;
        self.aggregates = None;
    }

    /// Rows surviving the current filter.
    pub fn filtered(&self) -> Vec<&Row> {
        filter_rows(&self.rows, &self.schema, &self.filter)
    }

    /// Aggregates for the current rows, schema, and filter. Computed lazily
    /// and cached until the next mutation.
    pub fn aggregates(&mut self) -> &Aggregates {
        if self.aggregates.is_none() {
            let filtered = filter_rows(&self.rows, &self.schema, &self.filter);
            self.aggregates = Some(compute_aggregates(&filtered, &self.schema));
        }
        self.aggregates.get_or_insert_with(Aggregates::default)
    }
}

/// Splits raw sheet rows into headers and data. Without a detected header
/// row, synthetic `field_N` names are generated and every row is data.
fn split_header(raw: &[Row]) -> (Vec<String>, Vec<Row>) {
    let Some(first) = raw.first() else {
        return (Vec::new(), Vec::new());
    };
    if schema::is_header_row(first) {
        let headers = first
            .iter()
            .map(|cell| cell.text().unwrap_or_default())
            .collect();
        let rows = raw[1..]
            .iter()
            .filter(|row| !row.is_empty())
            .cloned()
            .collect();
        (headers, rows)
    } else {
        let headers = (0..first.len()).map(|index| format!("field_{index}")).collect();
        (headers, raw.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::CancellationChoice;
    use crate::workbook::Cell;

    fn text_row(values: &[&str]) -> Row {
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

    fn sheet(rows: Vec<Row>) -> Sheet {
        Sheet {
            name: "meetings".to_string(),
            rows,
        }
    }

    fn sample() -> DataSet {
        DataSet::from_sheet(&sheet(vec![
            text_row(&["Month", "Region", "ESS Name", "是否需要ESS线下参会"]),
            text_row(&["May", "North", "An", "Y"]),
            text_row(&["Jun", "South", "Bo", "N"]),
            text_row(&["May", "North", "An", "Y"]),
        ]))
    }

    #[test]
    fn header_row_is_split_off() {
        let dataset = sample();
        assert_eq!(dataset.headers()[0], "Month");
        assert_eq!(dataset.rows().len(), 3);
        assert_eq!(dataset.schema().column(Role::Month), Some(0));
        assert_eq!(dataset.schema().column(Role::EssOffline), Some(3));
    }

    #[test]
    fn headerless_sheet_gets_synthetic_names() {
        let dataset = DataSet::from_sheet(&sheet(vec![
            vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Number(3.0)],
            vec![Cell::Number(4.0), Cell::Number(5.0), Cell::Number(6.0)],
        ]));
        assert_eq!(dataset.headers(), ["field_0", "field_1", "field_2"]);
        assert_eq!(dataset.rows().len(), 2);
    }

    #[test]
    fn promoted_data_row_becomes_header() {
        // Row 0 passes header detection but matches no role, so inference
        // re-runs against the first data row, promotes it, and the bogus
        // title row is discarded entirely.
        let dataset = DataSet::from_sheet(&sheet(vec![
            text_row(&["报表", "第一页", "备注"]),
            text_row(&["Year", "Month", "Region"]),
            text_row(&["2024", "May", "North"]),
        ]));
        assert_eq!(dataset.headers(), ["Year", "Month", "Region"]);
        assert_eq!(dataset.rows().len(), 1);
        assert_eq!(dataset.schema().column(Role::Year), Some(0));
    }

    #[test]
    fn filter_change_invalidates_aggregates() {
        let mut dataset = sample();
        assert_eq!(dataset.aggregates().region.total, 3);

        dataset.set_filter(RowFilter {
            months: vec!["May".to_string()],
            ..RowFilter::default()
        });
        assert_eq!(dataset.aggregates().region.total, 2);
    }

    #[test]
    fn manual_override_and_reset() {
        let mut dataset = sample();
        assert_eq!(dataset.aggregates().brands.len(), 0);

        // Point the brand role at the region column.
        dataset.apply_manual_columns(&[(Role::Brand, 1)]);
        assert!(dataset.is_manually_set());
        assert_eq!(dataset.aggregates().brands, vec!["North", "South"]);

        dataset.reset_to_auto_schema();
        assert!(!dataset.is_manually_set());
        assert_eq!(dataset.schema().column(Role::Brand), None);
        assert!(dataset.aggregates().brands.is_empty());
    }

    #[test]
    fn identical_filter_keeps_cache_valid() {
        let mut dataset = sample();
        let filter = RowFilter {
            cancellation: CancellationChoice::All,
            ..RowFilter::default()
        };
        dataset.set_filter(filter.clone());
        assert_eq!(dataset.aggregates().region.total, 3);
        dataset.set_filter(filter);
        assert_eq!(dataset.aggregates().region.total, 3);
    }
}
