//! Pairwise correlation between metrics.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::na::NA;
use crate::stats::descriptive::{pearson, spearman};
use crate::time_series::core::NormalizedSeries;

/// Correlation coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethod {
    #[default]
    Pearson,
    /// Pearson over average ranks
    Spearman,
}

/// Symmetric correlation matrix over a set of metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub method: CorrelationMethod,
    pub metrics: Vec<String>,
    /// `values[i][j]`: coefficient for `metrics[i]` vs `metrics[j]`
    pub values: Vec<Vec<NA<f64>>>,
    /// Number of dates where both metrics are present
    pub overlap: Vec<Vec<usize>>,
}

impl CorrelationMatrix {
    fn index_of(&self, metric: &str) -> Option<usize> {
        self.metrics.iter().position(|m| m == metric)
    }

    /// Coefficient for a pair; `None` if either metric is not in the matrix
    pub fn get(&self, a: &str, b: &str) -> Option<NA<f64>> {
        Some(self.values[self.index_of(a)?][self.index_of(b)?])
    }

    pub fn overlap(&self, a: &str, b: &str) -> Option<usize> {
        Some(self.overlap[self.index_of(a)?][self.index_of(b)?])
    }
}

/// Compute a correlation matrix for `metrics` (all metrics when empty).
///
/// Each pair uses only the dates where both values are present. Pairs with
/// fewer than 2 such dates, or with zero variance on either side, are `NA`.
pub fn correlation_matrix(
    series: &NormalizedSeries,
    metrics: &[String],
    method: CorrelationMethod,
) -> Result<CorrelationMatrix> {
    let metrics: Vec<String> = if metrics.is_empty() {
        series.metric_names().to_vec()
    } else {
        metrics.to_vec()
    };

    let columns = metrics
        .iter()
        .map(|m| series.column(m).ok_or_else(|| Error::ColumnNotFound(m.clone())))
        .collect::<Result<Vec<_>>>()?;
    debug!(
        "correlating {} metric(s) with {:?} over {} record(s)",
        metrics.len(),
        method,
        series.len()
    );

    let n = metrics.len();
    let mut values = vec![vec![NA::NA; n]; n];
    let mut overlap = vec![vec![0usize; n]; n];

    for i in 0..n {
        for j in i..n {
            let (x, y): (Vec<f64>, Vec<f64>) = columns[i]
                .iter()
                .zip(columns[j].iter())
                .filter_map(|(a, b)| Some((a.get()?, b.get()?)))
                .unzip();

            let r = match method {
                CorrelationMethod::Pearson => pearson(&x, &y),
                CorrelationMethod::Spearman => spearman(&x, &y),
            };

            values[i][j] = NA::from(r);
            values[j][i] = NA::from(r);
            overlap[i][j] = x.len();
            overlap[j][i] = x.len();
        }
    }

    Ok(CorrelationMatrix {
        method,
        metrics,
        values,
        overlap,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series() -> NormalizedSeries {
        let dates = (1..=5)
            .map(|d| NaiveDate::from_ymd_opt(2020, 1, d).unwrap())
            .collect();
        let a: Vec<NA<f64>> = [1.0, 2.0, 3.0, 4.0, 5.0].into_iter().map(NA::Value).collect();
        let b = vec![
            NA::Value(10.0),
            NA::NA,
            NA::Value(30.0),
            NA::Value(40.0),
            NA::Value(50.0),
        ];
        let flat = vec![NA::Value(7.0); 5];
        NormalizedSeries::new(
            "Date",
            dates,
            vec![("A".into(), a), ("B".into(), b), ("Flat".into(), flat)],
        )
        .unwrap()
    }

    #[test]
    fn test_pairwise_complete() {
        let m = correlation_matrix(&series(), &[], CorrelationMethod::Pearson).unwrap();
        assert!((m.get("A", "B").unwrap().get().unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(m.overlap("A", "B"), Some(4));
        assert_eq!(m.get("A", "B"), m.get("B", "A"));
    }

    #[test]
    fn test_self_correlation_and_zero_variance() {
        let m = correlation_matrix(&series(), &[], CorrelationMethod::Spearman).unwrap();
        assert!((m.get("A", "A").unwrap().get().unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(m.get("Flat", "A"), Some(NA::NA));
        assert_eq!(m.get("Flat", "Flat"), Some(NA::NA));
    }

    #[test]
    fn test_unknown_metric() {
        let result = correlation_matrix(&series(), &["Nope".to_string()], CorrelationMethod::Pearson);
        assert!(matches!(result, Err(Error::ColumnNotFound(_))));
    }
}
