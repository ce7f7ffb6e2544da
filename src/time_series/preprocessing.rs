//! Moving-average smoothing.

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::na::NA;
use crate::time_series::core::NormalizedSeries;

/// What happens where the centred window does not fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindowPolicy {
    /// Every position in the window must exist and be present; otherwise `NA`
    #[default]
    FullWindow,
    /// Average whatever values the clipped window holds
    PartialWindow,
}

/// One smoothed observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SmoothedPoint {
    pub date: NaiveDate,
    pub value: NA<f64>,
}

/// Smoothed version of one metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmoothedSeries {
    pub metric: String,
    pub window: usize,
    pub policy: WindowPolicy,
    pub points: Vec<SmoothedPoint>,
}

impl SmoothedSeries {
    pub fn values(&self) -> Vec<NA<f64>> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// Centred moving average.
///
/// The window covers `window / 2` points before and `window - 1 - window / 2`
/// points after each position, so even windows lean one point to the past.
pub fn moving_average(values: &[NA<f64>], window: usize, policy: WindowPolicy) -> Vec<NA<f64>> {
    let n = values.len();
    if window == 0 {
        return vec![NA::NA; n];
    }
    let before = window / 2;
    let after = window - 1 - before;

    (0..n)
        .map(|i| match policy {
            WindowPolicy::FullWindow => {
                if i < before || i + after >= n {
                    return NA::NA;
                }
                let mut sum = 0.0;
                for value in &values[i - before..=i + after] {
                    match value.get() {
                        Some(v) => sum += v,
                        None => return NA::NA,
                    }
                }
                NA::finite(sum / window as f64)
            }
            WindowPolicy::PartialWindow => {
                let start = i.saturating_sub(before);
                let end = (i + after).min(n - 1);
                let (sum, count) = values[start..=end]
                    .iter()
                    .filter_map(|v| v.get())
                    .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
                if count == 0 {
                    NA::NA
                } else {
                    NA::finite(sum / count as f64)
                }
            }
        })
        .collect()
}

/// Smooth one metric of the series
pub fn smooth(
    series: &NormalizedSeries,
    metric: &str,
    window: usize,
    policy: WindowPolicy,
) -> Result<SmoothedSeries> {
    if window == 0 {
        return Err(Error::InvalidInput(
            "Smoothing window must be at least 1".to_string(),
        ));
    }
    let values = series.values(metric)?;
    debug!("smoothing '{}' with window {} ({:?})", metric, window, policy);

    let points = series
        .dates()
        .iter()
        .zip(moving_average(values, window, policy))
        .map(|(&date, value)| SmoothedPoint { date, value })
        .collect();

    Ok(SmoothedSeries {
        metric: metric.to_string(),
        window,
        policy,
        points,
    })
}

/// Smooth every metric, in schema order
pub fn smooth_all(
    series: &NormalizedSeries,
    window: usize,
    policy: WindowPolicy,
) -> Result<Vec<SmoothedSeries>> {
    series
        .metric_names()
        .iter()
        .map(|metric| smooth(series, metric, window, policy))
        .collect()
}
