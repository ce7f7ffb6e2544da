// Core data structures and error types for salescope
pub mod data_value;
pub mod error;

// Re-exports for convenience
pub use data_value::CellValue;
pub use error::{
    DecompositionFailure, Error, InferenceFailure, LoadFailure, Result, ValidationFailure,
};
