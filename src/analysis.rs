//! One-call analysis of a normalized series.
//!
//! `Analyzer` runs every engine over the same immutable series and collects
//! the results in an `AnalysisBundle`. The engines do not depend on each
//! other, so they run in parallel on the rayon pool; only the insight
//! generator waits for the rest.

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::core::error::{DecompositionFailure, Result};
use crate::insights::generate_insights;
use crate::stats::correlation::{correlation_matrix, CorrelationMatrix, CorrelationMethod};
use crate::stats::kpi::{compute_kpis, KpiSet};
use crate::time_series::anomaly::{detect_all, AnomalyReport};
use crate::time_series::core::{DateRange, NormalizedSeries, SeriesSummary};
use crate::time_series::decomposition::{DecompositionResult, SeasonalDecomposition};
use crate::time_series::preprocessing::{smooth_all, SmoothedSeries};

/// Decomposition outcome of one metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDecomposition {
    pub metric: String,
    pub outcome: std::result::Result<DecompositionResult, DecompositionFailure>,
}

/// Everything the presentation layer needs for one series and range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisBundle {
    pub summary: SeriesSummary,
    pub kpis: KpiSet,
    pub smoothed: Vec<SmoothedSeries>,
    pub anomalies: AnomalyReport,
    pub correlation: CorrelationMatrix,
    pub decompositions: Vec<MetricDecomposition>,
    pub insights: Vec<String>,
}

impl AnalysisBundle {
    /// Successful decomposition of `metric`, if any
    pub fn decomposition(&self, metric: &str) -> Option<&DecompositionResult> {
        self.decompositions
            .iter()
            .find(|d| d.metric == metric)
            .and_then(|d| d.outcome.as_ref().ok())
    }

    /// Decomposition with the highest seasonal strength; the first metric on ties
    pub fn most_seasonal(&self) -> Option<&DecompositionResult> {
        most_seasonal(&self.decompositions)
    }
}

/// Runs all engines with one configuration
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze `series`, restricted to `range` when given
    pub fn analyze(
        &self,
        series: &NormalizedSeries,
        range: Option<DateRange>,
    ) -> Result<AnalysisBundle> {
        self.config.validate()?;

        let restricted;
        let view = match &range {
            Some(r) => {
                restricted = series.restrict(r);
                &restricted
            }
            None => series,
        };
        info!(
            "analyzing {} record(s) across {} metric(s)",
            view.len(),
            view.metric_names().len()
        );

        let ((kpis, smoothed), ((anomalies, correlation), decompositions)) = rayon::join(
            || {
                rayon::join(
                    // KPIs run on the full series so the requested range is recorded
                    || compute_kpis(series, range),
                    || smooth_all(view, self.config.smoothing.window, self.config.smoothing.policy),
                )
            },
            || {
                rayon::join(
                    || {
                        rayon::join(
                            || detect_all(view, self.config.anomaly.method()),
                            || correlation_matrix(view, &[], CorrelationMethod::Pearson),
                        )
                    },
                    || self.decompose_all(view),
                )
            },
        );
        let smoothed = smoothed?;
        let anomalies = anomalies?;
        let correlation = correlation?;

        let insights = generate_insights(
            &kpis,
            &anomalies,
            most_seasonal(&decompositions),
            &self.config.insights,
        );
        debug!("generated {} insight(s)", insights.len());

        Ok(AnalysisBundle {
            summary: view.summary(),
            kpis,
            smoothed,
            anomalies,
            correlation,
            decompositions,
            insights,
        })
    }

    fn decompose_all(&self, series: &NormalizedSeries) -> Vec<MetricDecomposition> {
        let decomposition = SeasonalDecomposition::new(self.config.decomposition.model)
            .with_optional_period(self.config.decomposition.period);

        series
            .metric_names()
            .par_iter()
            .map(|metric| {
                let outcome = decomposition.decompose(series, metric);
                if let Err(failure) = &outcome {
                    warn!("decomposition of '{}' skipped: {}", metric, failure);
                }
                MetricDecomposition {
                    metric: metric.clone(),
                    outcome,
                }
            })
            .collect()
    }
}

fn most_seasonal(decompositions: &[MetricDecomposition]) -> Option<&DecompositionResult> {
    decompositions
        .iter()
        .filter_map(|d| d.outcome.as_ref().ok())
        .filter_map(|r| r.metrics.seasonal_strength.get().map(|s| (r, s)))
        .fold(None, |best: Option<(&DecompositionResult, f64)>, (r, s)| match best {
            Some((_, b)) if b >= s => best,
            _ => Some((r, s)),
        })
        .map(|(r, _)| r)
}
