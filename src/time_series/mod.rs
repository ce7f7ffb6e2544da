//! Time Series Analysis Module
//!
//! The normalized series itself plus the engines that work on one metric at a
//! time: smoothing, outlier detection and seasonal decomposition.

pub mod anomaly;
pub mod core;
pub mod decomposition;
pub mod preprocessing;

pub use anomaly::{
    detect_all, detect_anomalies, AnomalyMethod, AnomalyMethodKind, AnomalyPoint, AnomalyReport,
    Direction, MetricAnomalies,
};
pub use core::{detect_interval, DateRange, Frequency, NormalizedSeries, Record, SeriesSummary};
pub use decomposition::{
    decompose, DecompositionMetrics, DecompositionModel, DecompositionResult,
    SeasonalDecomposition,
};
pub use preprocessing::{
    moving_average, smooth, smooth_all, SmoothedPoint, SmoothedSeries, WindowPolicy,
};
