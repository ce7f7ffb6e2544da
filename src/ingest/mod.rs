//! Ingestion: turning messy user tables into a validated `NormalizedSeries`.
//!
//! The stages are independent and can be driven one at a time:
//! `dates` and `numbers` parse single cells, `inference` picks the date and
//! metric columns, `validation` produces the `ValidationReport`, and `loader`
//! chains everything together.

pub mod dates;
pub mod inference;
pub mod loader;
pub mod numbers;
pub mod validation;

pub use dates::DateStrategy;
pub use inference::{infer_schema, DateDetection, DroppedColumn, Schema};
pub use loader::{FormatHint, Loaded, Loader};
pub use numbers::parse_number;
pub use validation::{
    validate, IssueKind, NegativeValueCheck, Severity, ValidationIssue, ValidationReport,
};
