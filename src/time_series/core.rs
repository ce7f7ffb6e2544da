//! Core Time Series Data Structures
//!
//! `NormalizedSeries` is the canonical, validated table every analysis engine
//! reads: strictly ascending unique dates, one column of `NA<f64>` per metric.
//! It is immutable once built; derived structures are always new values.

use crate::core::error::{Error, Result};
use crate::na::NA;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sampling frequency of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    /// Daily data
    Daily,
    /// Weekly data
    Weekly,
    /// Monthly data
    Monthly,
    /// Quarterly data
    Quarterly,
    /// Yearly data
    Yearly,
    /// Any other regular spacing, in days
    Custom(i64),
}

impl Frequency {
    /// Classify a typical gap between consecutive dates
    pub fn from_days(days: i64) -> Self {
        match days {
            1 => Frequency::Daily,
            7 => Frequency::Weekly,
            28..=31 => Frequency::Monthly,
            89..=92 => Frequency::Quarterly,
            365 | 366 => Frequency::Yearly,
            other => Frequency::Custom(other),
        }
    }

    /// Conventional seasonal period for this frequency
    pub fn seasonal_period(&self) -> Option<usize> {
        match self {
            Frequency::Daily => Some(7),      // Weekly seasonality
            Frequency::Weekly => Some(52),    // Yearly seasonality
            Frequency::Monthly => Some(12),   // Yearly seasonality
            Frequency::Quarterly => Some(4),  // Yearly seasonality
            Frequency::Yearly | Frequency::Custom(_) => None,
        }
    }

    /// Get frequency name as string
    pub fn name(&self) -> &'static str {
        match self {
            Frequency::Daily => "D",
            Frequency::Weekly => "W",
            Frequency::Monthly => "M",
            Frequency::Quarterly => "Q",
            Frequency::Yearly => "Y",
            Frequency::Custom(_) => "C",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RangeBounds")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidInput(format!(
                "Start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

#[derive(Deserialize)]
struct RangeBounds {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RangeBounds> for DateRange {
    type Error = Error;

    fn try_from(bounds: RangeBounds) -> Result<Self> {
        DateRange::new(bounds.start, bounds.end)
    }
}

/// A borrowed view of one row of the series
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    series: &'a NormalizedSeries,
    index: usize,
}

impl<'a> Record<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn date(&self) -> NaiveDate {
        self.series.dates[self.index]
    }

    /// Value of a metric on this date; `None` if the metric does not exist
    pub fn get(&self, metric: &str) -> Option<NA<f64>> {
        self.series
            .metric_index(metric)
            .map(|m| self.series.columns[m][self.index])
    }

    /// `(metric, value)` pairs in schema order
    pub fn values(&self) -> impl Iterator<Item = (&'a str, NA<f64>)> + 'a {
        let series = self.series;
        let index = self.index;
        series
            .metrics
            .iter()
            .zip(series.columns.iter())
            .map(move |(name, column)| (name.as_str(), column[index]))
    }
}

/// Overview of a loaded series for diagnostics panels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub metrics: Vec<String>,
    pub missing_values: usize,
    pub frequency: Option<Frequency>,
}

/// Validated, date-sorted, de-duplicated metric table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SeriesParts")]
pub struct NormalizedSeries {
    date_label: String,
    dates: Vec<NaiveDate>,
    metrics: Vec<String>,
    columns: Vec<Vec<NA<f64>>>,
}

impl NormalizedSeries {
    /// Build a series, checking ordering, uniqueness and column lengths
    pub fn new(
        date_label: impl Into<String>,
        dates: Vec<NaiveDate>,
        metrics: Vec<(String, Vec<NA<f64>>)>,
    ) -> Result<Self> {
        if let Some(pair) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(Error::InvalidInput(format!(
                "Dates must be strictly ascending: {} is followed by {}",
                pair[0], pair[1]
            )));
        }

        let mut names = Vec::with_capacity(metrics.len());
        let mut columns = Vec::with_capacity(metrics.len());
        for (name, column) in metrics {
            if column.len() != dates.len() {
                return Err(Error::InconsistentRowCount {
                    expected: dates.len(),
                    found: column.len(),
                });
            }
            if names.contains(&name) {
                return Err(Error::InvalidInput(format!("Duplicate metric name: {}", name)));
            }
            names.push(name);
            columns.push(column);
        }

        Ok(Self {
            date_label: date_label.into(),
            dates,
            metrics: names,
            columns,
        })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Label of the source date column (used as the CSV export header)
    pub fn date_label(&self) -> &str {
        &self.date_label
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn metric_names(&self) -> &[String] {
        &self.metrics
    }

    fn metric_index(&self, metric: &str) -> Option<usize> {
        self.metrics.iter().position(|m| m == metric)
    }

    /// Column for a metric, if present
    pub fn column(&self, metric: &str) -> Option<&[NA<f64>]> {
        self.metric_index(metric).map(|m| self.columns[m].as_slice())
    }

    /// Column for a metric, or `ColumnNotFound`
    pub fn values(&self, metric: &str) -> Result<&[NA<f64>]> {
        self.column(metric)
            .ok_or_else(|| Error::ColumnNotFound(metric.to_string()))
    }

    /// Non-missing `(index, value)` pairs of a metric
    pub fn valid_points(&self, metric: &str) -> Result<Vec<(usize, f64)>> {
        Ok(self
            .values(metric)?
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.get().map(|x| (i, x)))
            .collect())
    }

    pub fn record(&self, index: usize) -> Option<Record<'_>> {
        (index < self.len()).then(|| Record {
            series: self,
            index,
        })
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> + '_ {
        (0..self.len()).map(move |index| Record {
            series: self,
            index,
        })
    }

    /// First and last dates
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.dates.first(), self.dates.last()) {
            (Some(first), Some(last)) => Some((*first, *last)),
            _ => None,
        }
    }

    /// A new series holding only the records inside `range`
    pub fn restrict(&self, range: &DateRange) -> NormalizedSeries {
        let start = self.dates.partition_point(|d| *d < range.start());
        let end = self.dates.partition_point(|d| *d <= range.end());
        self.slice(start, end.max(start))
    }

    fn slice(&self, start: usize, end: usize) -> NormalizedSeries {
        NormalizedSeries {
            date_label: self.date_label.clone(),
            dates: self.dates[start..end].to_vec(),
            metrics: self.metrics.clone(),
            columns: self
                .columns
                .iter()
                .map(|column| column[start..end].to_vec())
                .collect(),
        }
    }

    /// Most common gap between consecutive dates, classified
    pub fn frequency(&self) -> Option<Frequency> {
        detect_interval(&self.dates).map(Frequency::from_days)
    }

    /// Per-date sum across metrics; missing when every metric is missing
    pub fn row_totals(&self) -> Vec<NA<f64>> {
        (0..self.len())
            .map(|i| {
                self.columns
                    .iter()
                    .filter_map(|column| column[i].get())
                    .fold(NA::NA, |acc, v| match acc {
                        NA::Value(total) => NA::Value(total + v),
                        NA::NA => NA::Value(v),
                    })
            })
            .collect()
    }

    pub fn missing_count(&self) -> usize {
        self.columns
            .iter()
            .map(|column| column.iter().filter(|v| v.is_na()).count())
            .sum()
    }

    pub fn summary(&self) -> SeriesSummary {
        let range = self.date_range();
        SeriesSummary {
            rows: self.len(),
            first_date: range.map(|(first, _)| first),
            last_date: range.map(|(_, last)| last),
            metrics: self.metrics.clone(),
            missing_values: self.missing_count(),
            frequency: self.frequency(),
        }
    }

    /// Calendar month (1-12) of each record
    pub fn months(&self) -> impl Iterator<Item = u32> + '_ {
        self.dates.iter().map(|d| d.month())
    }
}

// Deserialized series go through `NormalizedSeries::new` like any other
#[derive(Deserialize)]
struct SeriesParts {
    date_label: String,
    dates: Vec<NaiveDate>,
    metrics: Vec<String>,
    columns: Vec<Vec<NA<f64>>>,
}

impl TryFrom<SeriesParts> for NormalizedSeries {
    type Error = Error;

    fn try_from(parts: SeriesParts) -> Result<Self> {
        if parts.metrics.len() != parts.columns.len() {
            return Err(Error::InvalidInput(format!(
                "{} metric name(s) for {} column(s)",
                parts.metrics.len(),
                parts.columns.len()
            )));
        }
        let metrics = parts.metrics.into_iter().zip(parts.columns).collect();
        NormalizedSeries::new(parts.date_label, parts.dates, metrics)
    }
}

/// Detect the most common interval (in days) between consecutive dates.
/// Returns `None` with fewer than 2 dates.
pub fn detect_interval(dates: &[NaiveDate]) -> Option<i64> {
    if dates.len() < 2 {
        return None;
    }

    let mut diffs: Vec<i64> = dates
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days())
        .collect();
    diffs.sort_unstable();

    // Mode of the differences; ties go to the smaller gap
    let mut best_val = diffs[0];
    let mut best_count = 0usize;
    let mut current_val = diffs[0];
    let mut current_count = 0usize;

    for &d in &diffs {
        if d == current_val {
            current_count += 1;
        } else {
            if current_count > best_count {
                best_count = current_count;
                best_val = current_val;
            }
            current_val = d;
            current_count = 1;
        }
    }
    if current_count > best_count {
        best_val = current_val;
    }

    (best_val > 0).then_some(best_val)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> NormalizedSeries {
        NormalizedSeries::new(
            "Date",
            vec![date(2020, 1, 1), date(2020, 2, 1), date(2020, 3, 1)],
            vec![
                (
                    "A".to_string(),
                    vec![NA::Value(100.0), NA::NA, NA::Value(110.0)],
                ),
                ("B".to_string(), vec![NA::Value(1.0), NA::NA, NA::Value(2.0)]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_unsorted_dates() {
        let result = NormalizedSeries::new(
            "Date",
            vec![date(2020, 1, 2), date(2020, 1, 1)],
            vec![("A".to_string(), vec![NA::Value(1.0), NA::Value(2.0)])],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let result = NormalizedSeries::new(
            "Date",
            vec![date(2020, 1, 1)],
            vec![("A".to_string(), vec![NA::Value(1.0), NA::Value(2.0)])],
        );
        assert!(matches!(
            result,
            Err(Error::InconsistentRowCount {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn test_restrict_is_inclusive() {
        let series = sample();
        let range = DateRange::new(date(2020, 2, 1), date(2020, 3, 1)).unwrap();
        let restricted = series.restrict(&range);
        assert_eq!(restricted.len(), 2);
        assert_eq!(restricted.dates()[0], date(2020, 2, 1));
        // the source is untouched
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_restrict_outside_is_empty() {
        let series = sample();
        let range = DateRange::new(date(2021, 1, 1), date(2021, 2, 1)).unwrap();
        assert!(series.restrict(&range).is_empty());
    }

    #[test]
    fn test_date_range_rejects_inverted() {
        assert!(DateRange::new(date(2020, 2, 1), date(2020, 1, 1)).is_err());
    }

    #[test]
    fn test_row_totals_keep_missing() {
        let totals = sample().row_totals();
        assert_eq!(totals, vec![NA::Value(101.0), NA::NA, NA::Value(112.0)]);
    }

    #[test]
    fn test_record_view() {
        let series = sample();
        let record = series.record(2).unwrap();
        assert_eq!(record.date(), date(2020, 3, 1));
        assert_eq!(record.get("B"), Some(NA::Value(2.0)));
        assert_eq!(record.get("missing"), None);
        assert_eq!(record.values().count(), 2);
        assert!(series.record(3).is_none());
    }

    #[test]
    fn test_frequency_monthly() {
        assert_eq!(sample().frequency(), Some(Frequency::Monthly));
        assert_eq!(Frequency::Monthly.seasonal_period(), Some(12));
    }

    #[test]
    fn test_detect_interval_weekly() {
        let dates: Vec<NaiveDate> = (0..5).map(|i| date(2020, 1, 1 + i * 7)).collect();
        assert_eq!(detect_interval(&dates), Some(7));
        assert_eq!(detect_interval(&dates[..1]), None);
    }

    #[test]
    fn test_summary() {
        let summary = sample().summary();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.missing_values, 2);
        assert_eq!(summary.first_date, Some(date(2020, 1, 1)));
    }

    #[test]
    fn test_deserialize_round_trip() {
        let series = sample();
        let json = serde_json::to_string(&series).unwrap();
        let back: NormalizedSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(back, series);
    }

    #[test]
    fn test_deserialize_rejects_unsorted_dates() {
        let json = r#"{"date_label":"Date","dates":["2020-01-02","2020-01-01"],"metrics":["A"],"columns":[[1.0,2.0]]}"#;
        assert!(serde_json::from_str::<NormalizedSeries>(json).is_err());

        let json = r#"{"date_label":"Date","dates":["2020-01-01"],"metrics":["A","B"],"columns":[[1.0]]}"#;
        assert!(serde_json::from_str::<NormalizedSeries>(json).is_err());

        let range = r#"{"start":"2020-02-01","end":"2020-01-01"}"#;
        assert!(serde_json::from_str::<DateRange>(range).is_err());
    }
}
