// Disable specific warnings
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_lifetimes)]

//! Ingestion and statistical analysis of tabular sales time series.
//!
//! Raw CSV or spreadsheet bytes go through the `ingest::Loader`, which infers
//! the date and metric columns, validates the table and produces a
//! `NormalizedSeries`. The engines in `stats` and `time_series` read that
//! series; `analysis::Analyzer` runs all of them at once and `insights` turns
//! the results into short narrative sentences.

// Core module with fundamental data structures and error types
pub mod core;

pub mod analysis;
pub mod cache;
pub mod config;
pub mod ingest;
pub mod insights;
pub mod io;
pub mod na;
pub mod stats;
pub mod time_series;

// Re-export core types
pub use core::data_value::CellValue;
pub use core::error::{
    DecompositionFailure, Error, InferenceFailure, LoadFailure, Result, ValidationFailure,
};
pub use na::NA;

pub use analysis::{AnalysisBundle, Analyzer, MetricDecomposition};
pub use cache::{CacheKey, CachedLoader, MemoCache};
pub use config::AnalysisConfig;
pub use ingest::{FormatHint, Loaded, Loader, Schema, ValidationReport};
pub use insights::generate_insights;
pub use io::RawTable;
pub use stats::{
    compute_kpis, correlation_matrix, CorrelationMatrix, CorrelationMethod, KpiSet, MetricKpis,
};
pub use time_series::{
    decompose, detect_all, detect_anomalies, smooth, AnomalyMethod, AnomalyReport, DateRange,
    DecompositionModel, DecompositionResult, NormalizedSeries, WindowPolicy,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
