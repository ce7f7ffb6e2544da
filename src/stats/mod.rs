//! Statistics Module
//!
//! Plain descriptive statistics, KPIs and correlation over a normalized
//! series.

pub mod correlation;
pub mod descriptive;
pub mod kpi;

pub use correlation::{correlation_matrix, CorrelationMatrix, CorrelationMethod};
pub use kpi::{compute_kpis, growth_rate, AggregateKpis, KpiSet, MetricKpis};
