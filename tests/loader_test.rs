//! End-to-end loading tests: raw bytes and files to a normalized series

use chrono::NaiveDate;
use salescope::ingest::{DateDetection, DateStrategy, IssueKind};
use salescope::{FormatHint, LoadFailure, Loader, NA};
use simple_excel_writer::{Row, Workbook};
use std::fs;
use tempfile::tempdir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_russian_header_day_first_dates() {
    let csv = "Дата;Товар 1;Товар 2\n\
               15.01.2020;100;200\n\
               15.02.2020;120;210\n\
               15.03.2020;110;190\n";
    let loaded = Loader::default()
        .load(csv.as_bytes(), FormatHint::Csv)
        .unwrap();

    assert_eq!(loaded.schema.date_column, "Дата");
    assert_eq!(loaded.schema.date_strategy, DateStrategy::DayFirst);
    assert_eq!(loaded.schema.date_detection, DateDetection::Header);
    assert_eq!(loaded.report.date_strategy, Some(DateStrategy::DayFirst));

    let series = &loaded.series;
    assert_eq!(
        series.dates(),
        &[date(2020, 1, 15), date(2020, 2, 15), date(2020, 3, 15)]
    );
    assert_eq!(series.metric_names(), &["Товар 1", "Товар 2"]);
    assert_eq!(series.column("Товар 1").unwrap()[1], NA::Value(120.0));
}

#[test]
fn test_no_date_column() {
    let csv = "Product,Sales\nWidget,10\nGadget,20\n";
    let failure = Loader::default()
        .load(csv.as_bytes(), FormatHint::Csv)
        .unwrap_err();

    assert_eq!(failure.kind(), "no_date_column");
    assert!(failure.to_string().contains("no date column found"));
    assert!(failure.report().is_none());
}

#[test]
fn test_conflicting_duplicate_dates_fail() {
    let csv = "Date,Sales\n2020-01-01,10\n2020-01-01,12\n2020-01-02,11\n";
    let failure = Loader::default()
        .load(csv.as_bytes(), FormatHint::Csv)
        .unwrap_err();

    assert!(matches!(failure, LoadFailure::Validation(_)));
    let report = failure.report().unwrap();
    assert!(!report.is_usable);
    let issue = report.issues_of(IssueKind::DuplicateDate).next().unwrap();
    assert_eq!(issue.rows, vec![0, 1]);
}

#[test]
fn test_identical_duplicate_rows_are_merged_with_warning() {
    let csv = "Date,Sales\n2020-01-01,10\n2020-01-01,10\n2020-01-02,11\n";
    let loaded = Loader::default()
        .load(csv.as_bytes(), FormatHint::Csv)
        .unwrap();
    assert_eq!(loaded.series.len(), 2);
    assert!(loaded.report.has_issue(IssueKind::DuplicateRow));
}

#[test]
fn test_unsorted_input_is_sorted_with_warning() {
    let csv = "Date,Sales\n2020-01-03,3\n2020-01-01,1\n2020-01-02,2\n";
    let loaded = Loader::default()
        .load(csv.as_bytes(), FormatHint::Csv)
        .unwrap();
    assert_eq!(
        loaded.series.dates(),
        &[date(2020, 1, 1), date(2020, 1, 2), date(2020, 1, 3)]
    );
    assert_eq!(
        loaded.series.column("Sales").unwrap(),
        &[NA::Value(1.0), NA::Value(2.0), NA::Value(3.0)]
    );
    assert!(loaded.report.has_issue(IssueKind::NonMonotonicDates));
}

#[test]
fn test_missing_values_are_kept_distinct_from_zero() {
    let csv = "Date,A,B\n2020-01-01,0,\n2020-01-02,5,7\n";
    let loaded = Loader::default()
        .load(csv.as_bytes(), FormatHint::Csv)
        .unwrap();
    let series = &loaded.series;
    assert_eq!(series.column("A").unwrap()[0], NA::Value(0.0));
    assert_eq!(series.column("B").unwrap()[0], NA::NA);
    assert!(loaded.report.has_issue(IssueKind::MissingValues));
}

#[test]
fn test_loading_is_idempotent() {
    let csv = "date,North,South\n\
               2021-03-01,1 200,17\n\
               2021-03-02,,15\n\
               2021-03-04,1 350,n/a\n";
    let loader = Loader::default();
    let first = loader.load(csv.as_bytes(), FormatHint::Csv).unwrap();
    let second = loader.load(csv.as_bytes(), FormatHint::Csv).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.series.column("North").unwrap()[0], NA::Value(1200.0));
}

#[test]
fn test_invalid_utf8_is_structural() {
    let failure = Loader::default()
        .load(b"Date,A\n2020-01-01,\xFF\n", FormatHint::Csv)
        .unwrap_err();
    let report = failure.report().unwrap();
    assert!(report.has_issue(IssueKind::InvalidEncoding));
}

#[test]
fn test_load_spreadsheet_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sales.xlsx");

    let mut workbook = Workbook::create(path.to_str().unwrap());
    let mut sheet = workbook.create_sheet("Sales");
    workbook
        .write_sheet(&mut sheet, |writer| {
            let mut header = Row::new();
            header.add_cell("Date");
            header.add_cell("Product_1");
            writer.append_row(header)?;
            for (day, value) in [("2020-01-01", 100.0), ("2020-02-01", 120.0), ("2020-03-01", 110.0)] {
                let mut row = Row::new();
                row.add_cell(day);
                row.add_cell(value);
                writer.append_row(row)?;
            }
            Ok(())
        })
        .unwrap();
    workbook.close().unwrap();

    let loaded = Loader::default().load_path(&path).unwrap();
    assert_eq!(loaded.series.len(), 3);
    assert_eq!(
        loaded.series.column("Product_1").unwrap(),
        &[NA::Value(100.0), NA::Value(120.0), NA::Value(110.0)]
    );
}

#[test]
fn test_load_csv_file_by_extension() {
    let dir = tempdir().unwrap();
    let csv_path = dir.path().join("traffic.csv");
    fs::write(&csv_path, "Date\tVisits\n2020-01-01\t5\n2020-01-02\t6\n").unwrap();
    let loaded = Loader::default().load_path(&csv_path).unwrap();
    assert_eq!(loaded.series.metric_names(), &["Visits"]);

    let txt_path = dir.path().join("traffic.txt");
    fs::write(&txt_path, "whatever").unwrap();
    assert!(Loader::default().load_path(&txt_path).is_err());
}

#[test]
fn test_ragged_rows_are_reported() {
    let csv = "Date,Sales\n2020-01-01,10\n2020-01-02,11,99\n2020-01-03,12,\n";
    let loaded = Loader::default()
        .load(csv.as_bytes(), FormatHint::Csv)
        .unwrap();
    assert_eq!(loaded.series.metric_names(), &["Sales"]);
    let issue = loaded
        .report
        .issues_of(IssueKind::ExtraCells)
        .next()
        .unwrap();
    assert_eq!(issue.rows, vec![1]);
}
