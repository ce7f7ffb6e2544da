//! Seasonal Decomposition Module
//!
//! Classical decomposition of one metric into trend, seasonal and residual
//! components. All components are aligned index-for-index with the series;
//! positions the model cannot compute (the edges of the centred moving
//! average, missing observations) are `NA`.

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::error::DecompositionFailure;
use crate::na::NA;
use crate::stats::descriptive::population_variance;
use crate::time_series::core::NormalizedSeries;

/// Decomposition model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DecompositionModel {
    /// Y(t) = Trend(t) + Seasonal(t) + Residual(t)
    #[default]
    Additive,
    /// Y(t) = Trend(t) * Seasonal(t) * Residual(t); needs positive data
    Multiplicative,
}

/// Decomposition quality metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecompositionMetrics {
    /// `max(0, 1 - Var(R) / Var(T + R))`
    pub trend_strength: NA<f64>,
    /// `max(0, 1 - Var(R) / Var(S + R))`
    pub seasonal_strength: NA<f64>,
}

/// Result of seasonal decomposition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecompositionResult {
    pub metric: String,
    pub model: DecompositionModel,
    /// Seasonal period
    pub period: usize,
    pub dates: Vec<NaiveDate>,
    pub observed: Vec<NA<f64>>,
    pub trend: Vec<NA<f64>>,
    pub seasonal: Vec<NA<f64>>,
    pub residual: Vec<NA<f64>>,
    /// Normalized seasonal effect of each position within the period
    pub seasonal_indices: Vec<f64>,
    pub metrics: DecompositionMetrics,
}

/// Seasonal decomposition implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SeasonalDecomposition {
    model: DecompositionModel,
    period: Option<usize>,
}

impl SeasonalDecomposition {
    /// Create a new seasonal decomposition
    pub fn new(model: DecompositionModel) -> Self {
        Self {
            model,
            period: None,
        }
    }

    /// Set seasonal period
    pub fn with_period(mut self, period: usize) -> Self {
        self.period = Some(period);
        self
    }

    /// Use `period` if given, otherwise infer it from the date spacing
    pub fn with_optional_period(mut self, period: Option<usize>) -> Self {
        self.period = period;
        self
    }

    /// Decompose one metric of the series
    pub fn decompose(
        &self,
        series: &NormalizedSeries,
        metric: &str,
    ) -> Result<DecompositionResult, DecompositionFailure> {
        let observed = series
            .column(metric)
            .ok_or_else(|| DecompositionFailure::UnknownMetric {
                metric: metric.to_string(),
            })?;

        let period = self.resolve_period(series, metric)?;

        let available = observed.iter().filter(|v| v.is_value()).count();
        let required = period.saturating_mul(2);
        if available < required {
            return Err(DecompositionFailure::InsufficientPeriods {
                metric: metric.to_string(),
                period,
                required,
                available,
            });
        }

        if self.model == DecompositionModel::Multiplicative {
            let non_positive = observed
                .iter()
                .enumerate()
                .find_map(|(i, v)| v.get().filter(|x| *x <= 0.0).map(|x| (i, x)));
            if let Some((index, value)) = non_positive {
                return Err(DecompositionFailure::NonPositiveValue {
                    metric: metric.to_string(),
                    index,
                    value,
                });
            }
        }

        debug!(
            "decomposing '{}' ({:?}, period {}) over {} point(s)",
            metric,
            self.model,
            period,
            observed.len()
        );

        let trend = centered_moving_average(observed, period);
        let detrended: Vec<NA<f64>> = observed
            .iter()
            .zip(&trend)
            .map(|(&x, &t)| match self.model {
                DecompositionModel::Additive => x - t,
                DecompositionModel::Multiplicative => x / t,
            })
            .collect();

        let seasonal_indices = seasonal_indices(&detrended, period, self.model).map_err(
            |unsupported| DecompositionFailure::InsufficientCoverage {
                metric: metric.to_string(),
                period,
                unsupported,
            },
        )?;
        let seasonal: Vec<NA<f64>> = (0..observed.len())
            .map(|i| NA::Value(seasonal_indices[i % period]))
            .collect();

        let residual: Vec<NA<f64>> = detrended
            .iter()
            .zip(&seasonal)
            .map(|(&d, &s)| match self.model {
                DecompositionModel::Additive => d - s,
                DecompositionModel::Multiplicative => d / s,
            })
            .collect();

        let metrics = strengths(&trend, &seasonal, &residual, self.model);

        Ok(DecompositionResult {
            metric: metric.to_string(),
            model: self.model,
            period,
            dates: series.dates().to_vec(),
            observed: observed.to_vec(),
            trend,
            seasonal,
            residual,
            seasonal_indices,
            metrics,
        })
    }

    fn resolve_period(
        &self,
        series: &NormalizedSeries,
        metric: &str,
    ) -> Result<usize, DecompositionFailure> {
        let period = match self.period {
            Some(period) => period,
            None => series
                .frequency()
                .and_then(|f| f.seasonal_period())
                .ok_or_else(|| DecompositionFailure::PeriodUndetermined {
                    metric: metric.to_string(),
                })?,
        };
        if period < 2 {
            return Err(DecompositionFailure::InvalidPeriod { period });
        }
        Ok(period)
    }
}

/// Decompose `metric` with the given model and optional explicit period
pub fn decompose(
    series: &NormalizedSeries,
    metric: &str,
    model: DecompositionModel,
    period: Option<usize>,
) -> Result<DecompositionResult, DecompositionFailure> {
    SeasonalDecomposition::new(model)
        .with_optional_period(period)
        .decompose(series, metric)
}

/// Centred moving average over one period; a 2 x m average for even periods.
/// A window with any missing value yields `NA`.
fn centered_moving_average(values: &[NA<f64>], period: usize) -> Vec<NA<f64>> {
    let n = values.len();
    let half = period / 2;
    let even = period % 2 == 0;

    (0..n)
        .map(|i| {
            if i < half || i + half >= n {
                return NA::NA;
            }
            let mut sum = 0.0;
            for (offset, value) in values[i - half..=i + half].iter().enumerate() {
                let Some(v) = value.get() else {
                    return NA::NA;
                };
                let weight = if even && (offset == 0 || offset == 2 * half) {
                    0.5
                } else {
                    1.0
                };
                sum += weight * v;
            }
            NA::finite(sum / period as f64)
        })
        .collect()
}

/// Mean detrended value per position, normalized so the indices average to
/// 0 (additive) or 1 (multiplicative).
///
/// Fails with the positions that have no defined detrended value.
fn seasonal_indices(
    detrended: &[NA<f64>],
    period: usize,
    model: DecompositionModel,
) -> Result<Vec<f64>, Vec<usize>> {
    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (i, value) in detrended.iter().enumerate() {
        if let Some(v) = value.get() {
            sums[i % period] += v;
            counts[i % period] += 1;
        }
    }

    let unsupported: Vec<usize> = (0..period).filter(|&p| counts[p] == 0).collect();
    if !unsupported.is_empty() {
        return Err(unsupported);
    }

    let mut indices: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(&sum, &count)| sum / count as f64)
        .collect();

    let mean = indices.iter().sum::<f64>() / period as f64;
    for index in &mut indices {
        match model {
            DecompositionModel::Additive => *index -= mean,
            DecompositionModel::Multiplicative if mean != 0.0 => *index /= mean,
            DecompositionModel::Multiplicative => {}
        }
    }
    Ok(indices)
}

fn strengths(
    trend: &[NA<f64>],
    seasonal: &[NA<f64>],
    residual: &[NA<f64>],
    model: DecompositionModel,
) -> DecompositionMetrics {
    // Multiplicative components are compared on the log scale
    let scale = |v: f64| match model {
        DecompositionModel::Additive => Some(v),
        DecompositionModel::Multiplicative => (v > 0.0).then(|| v.ln()),
    };

    let mut r = Vec::new();
    let mut t_plus_r = Vec::new();
    let mut s_plus_r = Vec::new();
    for ((t, s), res) in trend.iter().zip(seasonal).zip(residual) {
        let parts = (|| Some((scale(t.get()?)?, scale(s.get()?)?, scale(res.get()?)?)))();
        if let Some((t, s, res)) = parts {
            r.push(res);
            t_plus_r.push(t + res);
            s_plus_r.push(s + res);
        }
    }

    let strength = |combined: &[f64]| -> NA<f64> {
        if r.len() < 2 {
            return NA::NA;
        }
        match (population_variance(&r), population_variance(combined)) {
            (Some(var_r), Some(var_c)) if var_c > 0.0 => NA::finite((1.0 - var_r / var_c).max(0.0)),
            _ => NA::NA,
        }
    };

    DecompositionMetrics {
        trend_strength: strength(&t_plus_r),
        seasonal_strength: strength(&s_plus_r),
    }
}

impl DecompositionResult {
    /// Recombine the components; `NA` wherever a component is missing
    pub fn reconstruct(&self) -> Vec<NA<f64>> {
        self.trend
            .iter()
            .zip(&self.seasonal)
            .zip(&self.residual)
            .map(|((&t, &s), &r)| match self.model {
                DecompositionModel::Additive => t + s + r,
                DecompositionModel::Multiplicative => t * s * r,
            })
            .collect()
    }

    /// Sign of the trend from its first to its last defined value
    pub fn trend_direction(&self) -> Option<f64> {
        let first = self.trend.iter().find_map(|v| v.get())?;
        let last = self.trend.iter().rev().find_map(|v| v.get())?;
        Some(last - first)
    }
}
