//! Outlier detection over individual metrics.
//!
//! Both methods look at the distribution of a metric's non-missing values and
//! ignore time order. A degenerate distribution (zero spread, fewer than two
//! values) flags nothing; it is not an error.

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::Result;
use crate::stats::descriptive::{mean, percentile, sample_std, sorted};
use crate::time_series::core::NormalizedSeries;

/// Outlier detection method without its parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyMethodKind {
    #[default]
    ZScore,
    Iqr,
}

/// Outlier detection method
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AnomalyMethod {
    /// Flag `|x - mean| / std > threshold` (sample standard deviation)
    ZScore { threshold: f64 },
    /// Flag values outside `[Q1 - k*IQR, Q3 + k*IQR]`
    Iqr { multiplier: f64 },
}

impl AnomalyMethod {
    pub fn kind(&self) -> AnomalyMethodKind {
        match self {
            AnomalyMethod::ZScore { .. } => AnomalyMethodKind::ZScore,
            AnomalyMethod::Iqr { .. } => AnomalyMethodKind::Iqr,
        }
    }
}

impl Default for AnomalyMethod {
    fn default() -> Self {
        AnomalyMethod::ZScore { threshold: 3.0 }
    }
}

/// Side of the distribution a flagged point falls on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Above,
    Below,
}

/// A flagged observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnomalyPoint {
    /// Row index in the series
    pub index: usize,
    pub date: NaiveDate,
    pub value: f64,
    /// `|z|` for z-score; distance beyond the fence in IQR units for IQR
    pub score: f64,
    pub direction: Direction,
}

/// Flagged points of one metric, in date order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricAnomalies {
    pub metric: String,
    pub method: AnomalyMethod,
    pub points: Vec<AnomalyPoint>,
}

/// Anomalies for one or more metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyReport {
    pub method: AnomalyMethod,
    pub metrics: BTreeMap<String, MetricAnomalies>,
}

impl AnomalyReport {
    /// Flagged points across every metric
    pub fn total(&self) -> usize {
        self.metrics.values().map(|m| m.points.len()).sum()
    }

    pub fn get(&self, metric: &str) -> Option<&MetricAnomalies> {
        self.metrics.get(metric)
    }

    /// Metric with the most flagged points; the first by name on ties
    pub fn most_affected(&self) -> Option<(&str, usize)> {
        self.metrics
            .values()
            .filter(|m| !m.points.is_empty())
            .fold(None, |best: Option<(&str, usize)>, m| match best {
                Some((_, n)) if n >= m.points.len() => best,
                _ => Some((m.metric.as_str(), m.points.len())),
            })
    }
}

/// Detect anomalies in one metric
pub fn detect_anomalies(
    series: &NormalizedSeries,
    metric: &str,
    method: AnomalyMethod,
) -> Result<AnomalyReport> {
    let found = metric_anomalies(series, metric, method)?;
    Ok(AnomalyReport {
        method,
        metrics: BTreeMap::from([(metric.to_string(), found)]),
    })
}

/// Detect anomalies in every metric
pub fn detect_all(series: &NormalizedSeries, method: AnomalyMethod) -> Result<AnomalyReport> {
    let metrics = series
        .metric_names()
        .iter()
        .map(|m| Ok((m.clone(), metric_anomalies(series, m, method)?)))
        .collect::<Result<BTreeMap<_, _>>>()?;
    Ok(AnomalyReport { method, metrics })
}

fn metric_anomalies(
    series: &NormalizedSeries,
    metric: &str,
    method: AnomalyMethod,
) -> Result<MetricAnomalies> {
    let points = series.valid_points(metric)?;
    let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();

    let scorer: Option<Box<dyn Fn(f64) -> Option<(f64, Direction)>>> = match method {
        AnomalyMethod::ZScore { threshold } => zscore_scorer(&values, threshold),
        AnomalyMethod::Iqr { multiplier } => iqr_scorer(&values, multiplier),
    };

    let flagged: Vec<AnomalyPoint> = match scorer {
        Some(score) => points
            .iter()
            .filter_map(|&(index, value)| {
                score(value).map(|(score, direction)| AnomalyPoint {
                    index,
                    date: series.dates()[index],
                    value,
                    score,
                    direction,
                })
            })
            .collect(),
        None => Vec::new(),
    };

    debug!(
        "{:?} flagged {} of {} value(s) in '{}'",
        method.kind(),
        flagged.len(),
        values.len(),
        metric
    );

    Ok(MetricAnomalies {
        metric: metric.to_string(),
        method,
        points: flagged,
    })
}

fn direction(value: f64, center: f64) -> Direction {
    if value >= center {
        Direction::Above
    } else {
        Direction::Below
    }
}

fn zscore_scorer(
    values: &[f64],
    threshold: f64,
) -> Option<Box<dyn Fn(f64) -> Option<(f64, Direction)>>> {
    let m = mean(values)?;
    let std = sample_std(values)?;
    if std == 0.0 || !std.is_finite() {
        return None;
    }
    Some(Box::new(move |value| {
        let z = ((value - m) / std).abs();
        (z > threshold).then(|| (z, direction(value, m)))
    }))
}

fn iqr_scorer(
    values: &[f64],
    multiplier: f64,
) -> Option<Box<dyn Fn(f64) -> Option<(f64, Direction)>>> {
    if values.len() < 2 {
        return None;
    }
    let sorted_values = sorted(values);
    let q1 = percentile(&sorted_values, 25.0)?;
    let q3 = percentile(&sorted_values, 75.0)?;
    let iqr = q3 - q1;
    let lower = q1 - multiplier * iqr;
    let upper = q3 + multiplier * iqr;

    Some(Box::new(move |value| {
        let (distance, dir) = if value < lower {
            (lower - value, Direction::Below)
        } else if value > upper {
            (value - upper, Direction::Above)
        } else {
            return None;
        };
        let score = if iqr > 0.0 { distance / iqr } else { distance };
        Some((score, dir))
    }))
}
