//! Key performance indicators over a normalized series.

use chrono::NaiveDate;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::na::NA;
use crate::stats::descriptive::{mean, median, sample_std};
use crate::time_series::core::{DateRange, NormalizedSeries};

/// Minimum number of records before a peak calendar month is reported
pub const PEAK_MONTH_MIN_RECORDS: usize = 12;

/// KPIs of one metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricKpis {
    pub metric: String,
    /// Non-missing values in range
    pub count: usize,
    /// Missing values in range
    pub missing: usize,
    pub total: NA<f64>,
    pub mean: NA<f64>,
    pub median: NA<f64>,
    /// Sample standard deviation
    pub std_dev: NA<f64>,
    pub min: NA<f64>,
    pub max: NA<f64>,
    /// `(last_valid - first_valid) / |first_valid|`
    pub growth_rate: NA<f64>,
    /// Date of the maximum; the earliest on ties
    pub peak_date: Option<NaiveDate>,
    /// `std_dev / |mean|`
    pub coefficient_of_variation: NA<f64>,
}

impl MetricKpis {
    /// KPI name to value, for generic table rendering
    pub fn to_map(&self) -> BTreeMap<&'static str, NA<f64>> {
        BTreeMap::from([
            ("count", NA::Value(self.count as f64)),
            ("missing", NA::Value(self.missing as f64)),
            ("total", self.total),
            ("mean", self.mean),
            ("median", self.median),
            ("std_dev", self.std_dev),
            ("min", self.min),
            ("max", self.max),
            ("growth_rate", self.growth_rate),
            ("coefficient_of_variation", self.coefficient_of_variation),
        ])
    }
}

/// KPIs of the per-date total across all metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateKpis {
    /// Records in range
    pub periods: usize,
    pub total: NA<f64>,
    pub mean_per_period: NA<f64>,
    pub max: NA<f64>,
    pub min: NA<f64>,
    pub growth_rate: NA<f64>,
    pub peak_date: Option<NaiveDate>,
    /// Calendar month (1-12) with the highest average volume; needs at
    /// least `PEAK_MONTH_MIN_RECORDS` records
    pub peak_month: Option<u32>,
}

/// All KPIs for a series, restricted to a date range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSet {
    /// Requested range, if any
    pub range: Option<DateRange>,
    /// First and last date actually covered
    pub covered: Option<(NaiveDate, NaiveDate)>,
    /// Per-metric KPIs in schema order
    pub metrics: Vec<MetricKpis>,
    pub aggregate: AggregateKpis,
}

impl KpiSet {
    pub fn get(&self, metric: &str) -> Option<&MetricKpis> {
        self.metrics.iter().find(|k| k.metric == metric)
    }

    /// True when no metric has a single valid value in range
    pub fn is_empty(&self) -> bool {
        self.metrics.iter().all(|k| k.count == 0)
    }
}

/// Compute KPIs over the series, restricted to `range` when given
pub fn compute_kpis(series: &NormalizedSeries, range: Option<DateRange>) -> KpiSet {
    let restricted;
    let view = match &range {
        Some(r) => {
            restricted = series.restrict(r);
            &restricted
        }
        None => series,
    };
    debug!(
        "computing KPIs over {} record(s), {} metric(s)",
        view.len(),
        view.metric_names().len()
    );

    let metrics = view
        .metric_names()
        .iter()
        .map(|name| {
            let column = view.column(name).unwrap_or(&[]);
            metric_kpis(name, view.dates(), column)
        })
        .collect();

    KpiSet {
        range,
        covered: view.date_range(),
        metrics,
        aggregate: aggregate_kpis(view),
    }
}

fn metric_kpis(metric: &str, dates: &[NaiveDate], column: &[NA<f64>]) -> MetricKpis {
    let points: Vec<(usize, f64)> = column
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.get().map(|x| (i, x)))
        .collect();
    let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
    let (min, max, peak_index) = extremes(&points);

    let mean_value: NA<f64> = NA::from(mean(&values));
    let std_dev: NA<f64> = NA::from(sample_std(&values));

    MetricKpis {
        metric: metric.to_string(),
        count: values.len(),
        missing: column.len() - values.len(),
        total: total(&values),
        mean: mean_value,
        median: NA::from(median(&values)),
        std_dev,
        min,
        max,
        growth_rate: growth_rate(&values),
        peak_date: peak_index.map(|i| dates[i]),
        coefficient_of_variation: coefficient_of_variation(std_dev, mean_value),
    }
}

fn aggregate_kpis(series: &NormalizedSeries) -> AggregateKpis {
    let totals = series.row_totals();
    let points: Vec<(usize, f64)> = totals
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.get().map(|x| (i, x)))
        .collect();
    let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
    let (min, max, peak_index) = extremes(&points);

    AggregateKpis {
        periods: series.len(),
        total: total(&values),
        mean_per_period: NA::from(mean(&values)),
        max,
        min,
        growth_rate: growth_rate(&values),
        peak_date: peak_index.map(|i| series.dates()[i]),
        peak_month: peak_month(series),
    }
}

/// Sum, or NA when nothing is valid
fn total(values: &[f64]) -> NA<f64> {
    if values.is_empty() {
        NA::NA
    } else {
        NA::Value(values.iter().sum())
    }
}

/// Min, max and the index of the first maximum
fn extremes(points: &[(usize, f64)]) -> (NA<f64>, NA<f64>, Option<usize>) {
    let mut min: Option<f64> = None;
    let mut peak: Option<(usize, f64)> = None;
    for &(i, v) in points {
        if min.map_or(true, |m| v < m) {
            min = Some(v);
        }
        // strict comparison keeps the earliest date on ties
        if peak.map_or(true, |(_, best)| v > best) {
            peak = Some((i, v));
        }
    }
    (
        NA::from(min),
        NA::from(peak.map(|(_, v)| v)),
        peak.map(|(i, _)| i),
    )
}

/// Growth from the first to the last valid value
pub fn growth_rate(values: &[f64]) -> NA<f64> {
    match (values.first(), values.last()) {
        (Some(&first), Some(&last)) if values.len() >= 2 && first != 0.0 => {
            NA::finite((last - first) / first.abs())
        }
        _ => NA::NA,
    }
}

fn coefficient_of_variation(std_dev: NA<f64>, mean: NA<f64>) -> NA<f64> {
    match (std_dev, mean) {
        (NA::Value(s), NA::Value(m)) if m != 0.0 => NA::finite(s / m.abs()),
        _ => NA::NA,
    }
}

/// Month whose summed per-metric monthly averages is highest
fn peak_month(series: &NormalizedSeries) -> Option<u32> {
    if series.len() < PEAK_MONTH_MIN_RECORDS {
        return None;
    }

    let mut by_month: BTreeMap<u32, f64> = BTreeMap::new();
    for name in series.metric_names() {
        let column = series.column(name)?;
        let mut sums: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
        for (month, value) in series.months().zip(column) {
            if let Some(v) = value.get() {
                let entry = sums.entry(month).or_insert((0.0, 0));
                entry.0 += v;
                entry.1 += 1;
            }
        }
        for (month, (sum, count)) in sums {
            *by_month.entry(month).or_insert(0.0) += sum / count as f64;
        }
    }

    by_month
        .into_iter()
        .fold(None, |best: Option<(u32, f64)>, (month, avg)| match best {
            Some((_, b)) if b >= avg => best,
            _ => Some((month, avg)),
        })
        .map(|(month, _)| month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn product_series() -> NormalizedSeries {
        NormalizedSeries::new(
            "Date",
            vec![date(2020, 1, 1), date(2020, 2, 1), date(2020, 3, 1)],
            vec![(
                "Product_1".to_string(),
                vec![NA::Value(100.0), NA::Value(120.0), NA::Value(110.0)],
            )],
        )
        .unwrap()
    }

    #[test]
    fn test_basic_kpis() {
        let kpis = compute_kpis(&product_series(), None);
        let p = kpis.get("Product_1").unwrap();
        assert_eq!(p.total, NA::Value(330.0));
        assert_eq!(p.mean, NA::Value(110.0));
        assert!((p.growth_rate.get().unwrap() - 0.10).abs() < 1e-12);
        assert_eq!(p.peak_date, Some(date(2020, 2, 1)));
        assert_eq!(p.min, NA::Value(100.0));
        assert_eq!(p.median, NA::Value(110.0));
        assert_eq!(kpis.aggregate.total, NA::Value(330.0));
        assert_eq!(kpis.aggregate.peak_month, None);
    }

    #[test]
    fn test_range_restriction() {
        let range = DateRange::new(date(2020, 2, 1), date(2020, 3, 1)).unwrap();
        let kpis = compute_kpis(&product_series(), Some(range));
        let p = kpis.get("Product_1").unwrap();
        assert_eq!(p.total, NA::Value(230.0));
        assert_eq!(p.count, 2);
        assert_eq!(kpis.covered, Some((date(2020, 2, 1), date(2020, 3, 1))));
    }

    #[test]
    fn test_empty_range_is_undefined() {
        let range = DateRange::new(date(2021, 1, 1), date(2021, 12, 31)).unwrap();
        let kpis = compute_kpis(&product_series(), Some(range));
        let p = kpis.get("Product_1").unwrap();
        assert_eq!(p.total, NA::NA);
        assert_eq!(p.mean, NA::NA);
        assert_eq!(p.growth_rate, NA::NA);
        assert_eq!(p.peak_date, None);
        assert!(kpis.is_empty());
    }

    #[test]
    fn test_growth_edge_cases() {
        assert_eq!(growth_rate(&[5.0]), NA::NA);
        assert_eq!(growth_rate(&[0.0, 5.0]), NA::NA);
        assert_eq!(growth_rate(&[-10.0, -5.0]), NA::Value(0.5));
    }

    #[test]
    fn test_peak_ties_take_earliest() {
        let series = NormalizedSeries::new(
            "Date",
            vec![date(2020, 1, 1), date(2020, 1, 2), date(2020, 1, 3)],
            vec![(
                "A".to_string(),
                vec![NA::Value(5.0), NA::Value(9.0), NA::Value(9.0)],
            )],
        )
        .unwrap();
        let kpis = compute_kpis(&series, None);
        assert_eq!(kpis.get("A").unwrap().peak_date, Some(date(2020, 1, 2)));
    }

    #[test]
    fn test_peak_month() {
        let dates: Vec<NaiveDate> = (1..=12).map(|m| date(2020, m, 1)).collect();
        let values: Vec<NA<f64>> = (1..=12)
            .map(|m| NA::Value(if m == 7 { 500.0 } else { 100.0 }))
            .collect();
        let series =
            NormalizedSeries::new("Date", dates, vec![("A".to_string(), values)]).unwrap();
        assert_eq!(compute_kpis(&series, None).aggregate.peak_month, Some(7));
    }

    #[test]
    fn test_to_map_keeps_undefined() {
        let kpis = compute_kpis(&product_series(), None);
        let map = kpis.get("Product_1").unwrap().to_map();
        assert_eq!(map["total"], NA::Value(330.0));
        assert!(map.contains_key("growth_rate"));
    }
}
