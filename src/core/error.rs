use serde::Serialize;
use thiserror::Error;

use crate::ingest::validation::ValidationReport;

/// Error type definitions
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error")]
    Io(#[source] std::io::Error),

    #[error("CSV error")]
    Csv(#[source] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Inconsistent row count: expected {expected}, found {found}")]
    InconsistentRowCount { expected: usize, found: usize },

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error(transparent)]
    Inference(#[from] InferenceFailure),

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error(transparent)]
    Load(#[from] LoadFailure),

    #[error(transparent)]
    Decomposition(#[from] DecompositionFailure),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Csv(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

/// No usable schema could be derived from a raw table.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InferenceFailure {
    #[error("empty table: nothing to infer a schema from")]
    EmptyTable,

    #[error("no date column found among {checked} column(s): {columns}")]
    NoDateColumn { checked: usize, columns: String },

    #[error("no metric columns remain besides date column '{date_column}' (dropped: {dropped})")]
    NoMetricColumns {
        date_column: String,
        dropped: String,
    },
}

impl InferenceFailure {
    /// Machine-readable failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceFailure::EmptyTable => "empty_table",
            InferenceFailure::NoDateColumn { .. } => "no_date_column",
            InferenceFailure::NoMetricColumns { .. } => "no_metric_columns",
        }
    }
}

/// A structural defect made the table unusable. Carries the full report.
#[derive(Error, Debug, Clone, Serialize)]
#[error("validation failed: {}", .report.error_summary())]
pub struct ValidationFailure {
    pub report: ValidationReport,
}

impl ValidationFailure {
    pub fn kind(&self) -> &'static str {
        "validation_failure"
    }
}

/// Anything that stops `Loader::load` from producing a normalized series.
#[derive(Error, Debug, Clone, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum LoadFailure {
    #[error("could not read {format} input: {message}")]
    Read { format: String, message: String },

    #[error(transparent)]
    Inference(#[from] InferenceFailure),

    #[error(transparent)]
    Validation(#[from] ValidationFailure),
}

impl LoadFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            LoadFailure::Read { .. } => "read_failure",
            LoadFailure::Inference(failure) => failure.kind(),
            LoadFailure::Validation(failure) => failure.kind(),
        }
    }

    /// The validation report, when the failure came from the validator
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            LoadFailure::Validation(failure) => Some(&failure.report),
            _ => None,
        }
    }
}

/// Seasonal decomposition could not produce a trustworthy result.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecompositionFailure {
    #[error("unknown metric '{metric}'")]
    UnknownMetric { metric: String },

    #[error("invalid period {period}: must be at least 2")]
    InvalidPeriod { period: usize },

    #[error("cannot infer a seasonal period for '{metric}' from irregular or yearly date spacing; supply one explicitly")]
    PeriodUndetermined { metric: String },

    #[error("insufficient data to decompose '{metric}': need at least {required} valid points (2 full periods of {period}), found {available}")]
    InsufficientPeriods {
        metric: String,
        period: usize,
        required: usize,
        available: usize,
    },

    #[error("too many gaps in '{metric}' to estimate a seasonal effect for position(s) {unsupported:?} of period {period}")]
    InsufficientCoverage {
        metric: String,
        period: usize,
        /// Positions within the period with no defined detrended value
        unsupported: Vec<usize>,
    },

    #[error("multiplicative decomposition of '{metric}' requires strictly positive values (index {index} is {value})")]
    NonPositiveValue {
        metric: String,
        index: usize,
        value: f64,
    },
}

impl DecompositionFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            DecompositionFailure::UnknownMetric { .. } => "unknown_metric",
            DecompositionFailure::InvalidPeriod { .. } => "invalid_period",
            DecompositionFailure::PeriodUndetermined { .. } => "period_undetermined",
            DecompositionFailure::InsufficientPeriods { .. } => "insufficient_periods",
            DecompositionFailure::InsufficientCoverage { .. } => "insufficient_coverage",
            DecompositionFailure::NonPositiveValue { .. } => "non_positive_value",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_failure_message() {
        let failure = InferenceFailure::NoDateColumn {
            checked: 2,
            columns: "a, b".to_string(),
        };
        assert!(failure.to_string().contains("no date column found"));
        assert_eq!(failure.kind(), "no_date_column");
    }

    #[test]
    fn test_load_failure_kind_delegates() {
        let failure = LoadFailure::from(InferenceFailure::EmptyTable);
        assert_eq!(failure.kind(), "empty_table");
        assert!(failure.report().is_none());

        let err: Error = failure.into();
        assert!(matches!(err, Error::Load(_)));
    }

    #[test]
    fn test_decomposition_failure_message() {
        let failure = DecompositionFailure::InsufficientPeriods {
            metric: "Product_1".to_string(),
            period: 12,
            required: 24,
            available: 10,
        };
        assert!(failure.to_string().contains("need at least 24"));
        assert_eq!(failure.kind(), "insufficient_periods");
    }
}
