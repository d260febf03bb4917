mod common;

use proptest::prelude::*;

use sheet_insight::dataset::DataSet;
use sheet_insight::filter::{RowFilter, filter_rows};
use sheet_insight::schema::{Role, Schema};
use sheet_insight::score::score_performance;
use sheet_insight::stats::{compare_months, compute_aggregates};
use sheet_insight::workbook::{Cell, Row, Workbook};

use common::TestWorkspace;

fn load(path: &std::path::Path) -> DataSet {
    let workbook = Workbook::open(path).expect("open workbook");
    let name = workbook.sheet_names().remove(0);
    DataSet::from_sheet(workbook.sheet(&name).expect("sheet"))
}

#[test]
fn aggregates_over_the_meeting_fixture() {
    let workspace = TestWorkspace::new();
    let mut dataset = load(&workspace.write_meetings_csv());
    let aggregates = dataset.aggregates().clone();

    assert_eq!(aggregates.region.total, 8);
    assert_eq!(aggregates.region.buckets["North"].count, 4);
    assert_eq!(aggregates.region.buckets["North"].percentage, 50);

    // Offline flags: five yes (incl. 是), two no (incl. 否), one "maybe".
    let participation = &aggregates.ess_participation;
    assert_eq!(participation.yes, 5);
    assert_eq!(participation.no, 2);
    assert_eq!(participation.unknown, 1);
    assert_eq!(participation.yes_percentage, 63);

    assert_eq!(aggregates.cancellation.cancelled, 2);
    assert_eq!(aggregates.cancellation.not_cancelled, 6);

    assert_eq!(aggregates.months, vec!["May", "Jun", "Jul", "Jan", "Feb"]);
    assert_eq!(aggregates.years, vec!["2024", "2025"]);
    assert_eq!(aggregates.brands, vec!["Alpha", "Beta"]);
    assert_eq!(aggregates.event_types.buckets["Campaign"].count, 4);

    // An and Cy both attended two offline meetings and skipped two online
    // ones; An wins the tie on total meetings.
    let names: Vec<&str> = aggregates
        .ranking
        .iter()
        .map(|person| person.name.as_str())
        .collect();
    assert_eq!(names, vec!["An", "Cy", "Bo"]);
}

#[test]
fn filtered_aggregates_shrink_with_the_filter() {
    let workspace = TestWorkspace::new();
    let mut dataset = load(&workspace.write_meetings_csv());
    dataset.set_filter(RowFilter {
        year: Some("2025".to_string()),
        ..RowFilter::default()
    });
    let aggregates = dataset.aggregates();
    assert_eq!(aggregates.region.total, 3);
    assert_eq!(aggregates.months, vec!["Jan", "Feb"]);
    assert_eq!(aggregates.years, vec!["2025"]);
}

fn token_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Y".to_string()),
        Just("N".to_string()),
        Just("是".to_string()),
        Just("否".to_string()),
        Just("maybe".to_string()),
        Just(String::new()),
        "[a-zA-Z]{1,8}",
    ]
}

fn cell(value: &str) -> Cell {
    if value.is_empty() {
        Cell::Empty
    } else {
        Cell::Text(value.to_string())
    }
}

proptest! {
    #[test]
    fn participation_counts_always_partition_the_rows(
        tokens in proptest::collection::vec(token_strategy(), 0..40)
    ) {
        let rows: Vec<Row> = tokens.iter().map(|token| vec![cell(token)]).collect();
        let refs: Vec<&Row> = rows.iter().collect();
        let mut schema = Schema::default();
        schema.assign(Role::EssOffline, 0);
        let aggregates = compute_aggregates(&refs, &schema);
        let stats = &aggregates.ess_participation;
        prop_assert_eq!(stats.yes + stats.no + stats.unknown, stats.total);
        prop_assert_eq!(stats.total, rows.len());
        prop_assert!(stats.yes_percentage <= 100);
        prop_assert!(stats.no_percentage <= 100);
        prop_assert!(stats.unknown_percentage <= 100);
    }

    #[test]
    fn month_ordering_is_total_and_ranked_first(
        mut months in proptest::collection::vec("[A-Za-z]{3}", 0..20)
    ) {
        months.sort_by(|a, b| compare_months(a, b));
        let resorted = {
            let mut copy = months.clone();
            copy.sort_by(|a, b| compare_months(a, b));
            copy
        };
        prop_assert_eq!(&months, &resorted);

        // Once an unranked month appears, no ranked month may follow it.
        let ranked = ["May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec", "Jan", "Feb"];
        let mut seen_unranked = false;
        for month in &months {
            if ranked.contains(&month.as_str()) {
                prop_assert!(!seen_unranked, "ranked month after unranked: {months:?}");
            } else {
                seen_unranked = true;
            }
        }
    }

    #[test]
    fn performance_scores_stay_in_band(
        offline in 0usize..100,
        online in 0usize..100,
    ) {
        let performance = score_performance(offline, online);
        prop_assert!(performance.total_score >= 0.0);
        prop_assert!(performance.total_score <= 8.0);
        prop_assert!(performance.percentage >= 0.0);
        prop_assert!(performance.percentage <= 0.4);
        prop_assert!(performance.formatted_percentage().ends_with('%'));
    }

    #[test]
    fn month_filter_never_grows_the_row_set(
        values in proptest::collection::vec("[A-Za-z]{3}", 0..30),
        wanted in proptest::collection::vec("[A-Za-z]{3}", 0..4),
    ) {
        let rows: Vec<Row> = values.iter().map(|value| vec![cell(value)]).collect();
        let mut schema = Schema::default();
        schema.assign(Role::Month, 0);
        let filter = RowFilter {
            months: wanted,
            ..RowFilter::default()
        };
        let kept = filter_rows(&rows, &schema, &filter);
        prop_assert!(kept.len() <= rows.len());

        let unrestricted = filter_rows(&rows, &schema, &RowFilter::default());
        prop_assert_eq!(unrestricted.len(), rows.len());
    }
}
