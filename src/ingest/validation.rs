//! Structural and quality checks on an inferred table.
//!
//! Structural problems are errors and make the table unusable. Quality
//! problems are warnings: the loader still produces a series, and the
//! warnings travel with it in the report.

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::IngestConfig;
use crate::ingest::dates::DateStrategy;
use crate::ingest::inference::Schema;
use crate::ingest::numbers::{coerce_cell, MetricCell};
use crate::io::raw::RawTable;

/// How many row references are spelled out in a message
const MESSAGE_ROW_LIMIT: usize = 5;

/// Issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Structural: the table cannot be used
    Error,
    /// Data quality: reported, does not block loading
    Warning,
}

/// Kind of validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    EmptyTable,
    InvalidEncoding,
    MissingDateColumn,
    MissingMetricColumn,
    NoMetricColumns,
    NoValidRows,
    DuplicateDate,
    DroppedColumn,
    ExtraCells,
    UnparseableDate,
    DuplicateRow,
    NonMonotonicDates,
    MissingValues,
    NonNumericValues,
    NegativeValues,
}

impl IssueKind {
    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::EmptyTable
            | IssueKind::InvalidEncoding
            | IssueKind::MissingDateColumn
            | IssueKind::MissingMetricColumn
            | IssueKind::NoMetricColumns
            | IssueKind::NoValidRows
            | IssueKind::DuplicateDate => Severity::Error,
            IssueKind::DroppedColumn
            | IssueKind::ExtraCells
            | IssueKind::UnparseableDate
            | IssueKind::DuplicateRow
            | IssueKind::NonMonotonicDates
            | IssueKind::MissingValues
            | IssueKind::NonNumericValues
            | IssueKind::NegativeValues => Severity::Warning,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::EmptyTable => "empty_table",
            IssueKind::InvalidEncoding => "invalid_encoding",
            IssueKind::MissingDateColumn => "missing_date_column",
            IssueKind::MissingMetricColumn => "missing_metric_column",
            IssueKind::NoMetricColumns => "no_metric_columns",
            IssueKind::NoValidRows => "no_valid_rows",
            IssueKind::DuplicateDate => "duplicate_date",
            IssueKind::DroppedColumn => "dropped_column",
            IssueKind::ExtraCells => "extra_cells",
            IssueKind::UnparseableDate => "unparseable_date",
            IssueKind::DuplicateRow => "duplicate_row",
            IssueKind::NonMonotonicDates => "non_monotonic_dates",
            IssueKind::MissingValues => "missing_values",
            IssueKind::NonNumericValues => "non_numeric_values",
            IssueKind::NegativeValues => "negative_values",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which metric columns are expected to hold non-negative values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NegativeValueCheck {
    /// Every metric (sales and traffic counts)
    #[default]
    AllMetrics,
    /// No negativity check
    Disabled,
    /// Only the listed columns
    Columns(Vec<String>),
}

impl NegativeValueCheck {
    pub fn applies_to(&self, column: &str) -> bool {
        match self {
            NegativeValueCheck::AllMetrics => true,
            NegativeValueCheck::Disabled => false,
            NegativeValueCheck::Columns(columns) => columns.iter().any(|c| c == column),
        }
    }
}

/// One finding of the validator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    /// Affected column, if the issue is column-specific
    pub column: Option<String>,
    /// 0-based data row indices in the source table, ascending
    pub rows: Vec<usize>,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, column: Option<&str>, rows: Vec<usize>, message: String) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            column: column.map(str::to_string),
            rows,
            message,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Outcome of validating a table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    pub is_usable: bool,
    pub date_column: Option<String>,
    /// Date strategy the table was parsed with
    pub date_strategy: Option<DateStrategy>,
    /// Non-blank data rows examined
    pub rows_checked: usize,
    /// Rows with a parseable date
    pub valid_rows: usize,
}

impl ValidationReport {
    fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let is_usable = !issues.iter().any(|i| i.severity == Severity::Error);
        Self {
            issues,
            is_usable,
            date_column: None,
            date_strategy: None,
            rows_checked: 0,
            valid_rows: 0,
        }
    }

    /// A report holding a single structural error
    pub fn structural(kind: IssueKind, message: impl Into<String>) -> Self {
        Self::from_issues(vec![ValidationIssue::new(
            kind,
            None,
            Vec::new(),
            message.into(),
        )])
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> + '_ {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> + '_ {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    pub fn has_issue(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|i| i.kind == kind)
    }

    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &ValidationIssue> + '_ {
        self.issues.iter().filter(move |i| i.kind == kind)
    }

    /// All error messages joined, for one-line display
    pub fn error_summary(&self) -> String {
        let messages: Vec<String> = self.errors().map(|i| i.to_string()).collect();
        if messages.is_empty() {
            "no errors".to_string()
        } else {
            messages.join("; ")
        }
    }
}

/// A source row whose date parsed, with its metric cells coerced
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    /// 0-based data row index in the source table
    pub index: usize,
    pub date: NaiveDate,
    /// One cell per schema metric, in schema order
    pub values: Vec<MetricCell>,
}

/// Rows of a table split by whether their date parsed
#[derive(Debug, Clone, Default)]
pub struct ParsedRows {
    pub rows: Vec<ParsedRow>,
    /// Non-blank rows whose date cell did not parse
    pub unparseable: Vec<usize>,
    /// Non-blank rows seen
    pub checked: usize,
}

/// Parse dates and coerce metric cells. Fully blank rows are skipped.
///
/// Returns `None` if the date column or a metric column is absent.
pub fn parse_rows(table: &RawTable, schema: &Schema) -> Option<ParsedRows> {
    let date_index = table.column_index(&schema.date_column)?;
    let metric_indices = schema
        .metric_columns
        .iter()
        .map(|m| table.column_index(m))
        .collect::<Option<Vec<usize>>>()?;

    let mut parsed = ParsedRows::default();
    for (index, row) in table.rows().iter().enumerate() {
        if row.iter().all(|cell| cell.is_blank()) {
            continue;
        }
        parsed.checked += 1;
        match schema.date_strategy.parse_cell(&row[date_index]) {
            Some(date) => parsed.rows.push(ParsedRow {
                index,
                date,
                values: metric_indices.iter().map(|&m| coerce_cell(&row[m])).collect(),
            }),
            None => parsed.unparseable.push(index),
        }
    }
    Some(parsed)
}

/// Validate a raw table against its inferred schema
pub fn validate(table: &RawTable, schema: &Schema, config: &IngestConfig) -> ValidationReport {
    let mut report = ValidationReport::from_issues(check(table, schema, config));
    report.date_column = Some(schema.date_column.clone());
    report.date_strategy = Some(schema.date_strategy);
    if let Some(parsed) = parse_rows(table, schema) {
        report.rows_checked = parsed.checked;
        report.valid_rows = parsed.rows.len();
    }
    debug!(
        "validation finished: {} error(s), {} warning(s)",
        report.errors().count(),
        report.warnings().count()
    );
    report
}

fn check(table: &RawTable, schema: &Schema, config: &IngestConfig) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    // Structure
    if table.is_empty() {
        issues.push(ValidationIssue::new(
            IssueKind::EmptyTable,
            None,
            Vec::new(),
            "the table has no data rows".to_string(),
        ));
        return issues;
    }
    if table.column_index(&schema.date_column).is_none() {
        issues.push(ValidationIssue::new(
            IssueKind::MissingDateColumn,
            Some(&schema.date_column),
            Vec::new(),
            format!("date column '{}' is not in the table", schema.date_column),
        ));
    }
    if schema.metric_columns.is_empty() {
        issues.push(ValidationIssue::new(
            IssueKind::NoMetricColumns,
            None,
            Vec::new(),
            "no metric columns".to_string(),
        ));
    }
    for metric in &schema.metric_columns {
        if table.column_index(metric).is_none() {
            issues.push(ValidationIssue::new(
                IssueKind::MissingMetricColumn,
                Some(metric),
                Vec::new(),
                format!("metric column '{}' is not in the table", metric),
            ));
        }
    }
    let parsed = match parse_rows(table, schema) {
        Some(parsed) if !schema.metric_columns.is_empty() => parsed,
        _ => return issues,
    };

    for dropped in &schema.dropped_columns {
        issues.push(ValidationIssue::new(
            IssueKind::DroppedColumn,
            Some(&dropped.column),
            Vec::new(),
            format!(
                "column '{}' was ignored: only {:.1}% of its values are numeric",
                dropped.column,
                dropped.numeric_ratio * 100.0
            ),
        ));
    }

    let overflow = table.overflow_rows();
    if !overflow.is_empty() {
        issues.push(ValidationIssue::new(
            IssueKind::ExtraCells,
            None,
            overflow.to_vec(),
            format!(
                "{} row(s) have more cells than the {} header column(s); the extra cells were ignored (rows {})",
                overflow.len(),
                table.column_count(),
                format_rows(overflow)
            ),
        ));
    }

    if !parsed.unparseable.is_empty() {
        issues.push(ValidationIssue::new(
            IssueKind::UnparseableDate,
            Some(&schema.date_column),
            parsed.unparseable.clone(),
            format!(
                "{} row(s) have a missing or unparseable date under {} and will be skipped (rows {})",
                parsed.unparseable.len(),
                schema.date_strategy,
                format_rows(&parsed.unparseable)
            ),
        ));
    }

    if parsed.rows.is_empty() {
        issues.push(ValidationIssue::new(
            IssueKind::NoValidRows,
            Some(&schema.date_column),
            Vec::new(),
            format!("no row has a valid date in column '{}'", schema.date_column),
        ));
        return issues;
    }

    check_duplicates(&parsed.rows, &schema.date_column, &mut issues);
    check_ordering(&parsed.rows, &schema.date_column, &mut issues);

    for (m, metric) in schema.metric_columns.iter().enumerate() {
        check_metric(&parsed.rows, m, metric, config, &mut issues);
    }

    issues
}

fn check_duplicates(rows: &[ParsedRow], date_column: &str, issues: &mut Vec<ValidationIssue>) {
    let mut by_date: BTreeMap<NaiveDate, Vec<&ParsedRow>> = BTreeMap::new();
    for row in rows {
        by_date.entry(row.date).or_default().push(row);
    }

    let mut conflicting_dates = Vec::new();
    let mut conflicting_rows = Vec::new();
    let mut repeated_rows = Vec::new();

    for (date, group) in by_date.iter().filter(|(_, g)| g.len() > 1) {
        let first = group[0];
        if group.iter().all(|row| row.values == first.values) {
            repeated_rows.extend(group[1..].iter().map(|row| row.index));
        } else {
            conflicting_dates.push(*date);
            conflicting_rows.extend(group.iter().map(|row| row.index));
        }
    }

    if !conflicting_dates.is_empty() {
        conflicting_rows.sort_unstable();
        let shown: Vec<String> = conflicting_dates
            .iter()
            .take(MESSAGE_ROW_LIMIT)
            .map(|d| d.to_string())
            .collect();
        issues.push(ValidationIssue::new(
            IssueKind::DuplicateDate,
            Some(date_column),
            conflicting_rows.clone(),
            format!(
                "{} date(s) appear more than once with different values ({}{}) in rows {}",
                conflicting_dates.len(),
                shown.join(", "),
                if conflicting_dates.len() > MESSAGE_ROW_LIMIT { ", ..." } else { "" },
                format_rows(&conflicting_rows)
            ),
        ));
    }

    if !repeated_rows.is_empty() {
        repeated_rows.sort_unstable();
        issues.push(ValidationIssue::new(
            IssueKind::DuplicateRow,
            None,
            repeated_rows.clone(),
            format!(
                "{} exact duplicate row(s) will be removed (rows {})",
                repeated_rows.len(),
                format_rows(&repeated_rows)
            ),
        ));
    }
}

fn check_ordering(rows: &[ParsedRow], date_column: &str, issues: &mut Vec<ValidationIssue>) {
    let out_of_order: Vec<usize> = rows
        .windows(2)
        .filter(|pair| pair[1].date < pair[0].date)
        .map(|pair| pair[1].index)
        .collect();

    if !out_of_order.is_empty() {
        issues.push(ValidationIssue::new(
            IssueKind::NonMonotonicDates,
            Some(date_column),
            out_of_order.clone(),
            format!(
                "dates are not in ascending order at {} row(s) (rows {}); rows will be sorted",
                out_of_order.len(),
                format_rows(&out_of_order)
            ),
        ));
    }
}

fn check_metric(
    rows: &[ParsedRow],
    m: usize,
    metric: &str,
    config: &IngestConfig,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut missing = Vec::new();
    let mut non_numeric = Vec::new();
    let mut negative = Vec::new();

    for row in rows {
        match row.values[m] {
            MetricCell::Missing => missing.push(row.index),
            MetricCell::NonNumeric => non_numeric.push(row.index),
            MetricCell::Value(v) if v < 0.0 => negative.push(row.index),
            MetricCell::Value(_) => {}
        }
    }

    let total = rows.len();
    if !missing.is_empty() {
        issues.push(ValidationIssue::new(
            IssueKind::MissingValues,
            Some(metric),
            missing.clone(),
            format!(
                "column '{}': {} of {} value(s) missing ({:.1}%)",
                metric,
                missing.len(),
                total,
                missing.len() as f64 / total as f64 * 100.0
            ),
        ));
    }
    if !non_numeric.is_empty() {
        issues.push(ValidationIssue::new(
            IssueKind::NonNumericValues,
            Some(metric),
            non_numeric.clone(),
            format!(
                "column '{}': {} non-numeric value(s) treated as missing (rows {})",
                metric,
                non_numeric.len(),
                format_rows(&non_numeric)
            ),
        ));
    }
    if !negative.is_empty() && config.negative_values.applies_to(metric) {
        issues.push(ValidationIssue::new(
            IssueKind::NegativeValues,
            Some(metric),
            negative.clone(),
            format!(
                "column '{}': {} negative value(s) (rows {})",
                metric,
                negative.len(),
                format_rows(&negative)
            ),
        ));
    }
}

fn format_rows(rows: &[usize]) -> String {
    let shown: Vec<String> = rows
        .iter()
        .take(MESSAGE_ROW_LIMIT)
        .map(|r| r.to_string())
        .collect();
    if rows.len() > MESSAGE_ROW_LIMIT {
        format!("{}, ...", shown.join(", "))
    } else {
        shown.join(", ")
    }
}
