//! Configuration validation utilities
//!
//! Rejects values that would make an engine meaningless (a zero-width
//! window, a threshold outside (0, 1]) before any data is touched.

use super::*;
use crate::core::error::{Error, Result};

/// Validate the entire configuration
pub fn validate_config(config: &AnalysisConfig) -> Result<()> {
    validate_ingest_config(&config.ingest)?;
    validate_smoothing_config(&config.smoothing)?;
    validate_anomaly_config(&config.anomaly)?;
    validate_decomposition_config(&config.decomposition)?;
    validate_insight_config(&config.insights)?;

    Ok(())
}

/// Validate ingestion configuration
pub fn validate_ingest_config(config: &IngestConfig) -> Result<()> {
    validate_fraction(config.date_threshold, "ingest.date_threshold")?;
    validate_fraction(config.numeric_threshold, "ingest.numeric_threshold")?;

    if config.date_sample_size == 0 {
        return Err(Error::ConfigurationError(
            "ingest.date_sample_size must be greater than 0".to_string(),
        ));
    }

    if config.date_tokens.iter().all(|t| t.trim().is_empty()) {
        return Err(Error::ConfigurationError(
            "ingest.date_tokens must contain at least one token".to_string(),
        ));
    }

    config.delimiter_byte()?;
    if let Some(d) = config.delimiter {
        if d == '"' || d == '\n' || d == '\r' {
            return Err(Error::ConfigurationError(format!(
                "ingest.delimiter cannot be {:?}",
                d
            )));
        }
    }

    Ok(())
}

/// Validate smoothing configuration
pub fn validate_smoothing_config(config: &SmoothingConfig) -> Result<()> {
    if config.window == 0 {
        return Err(Error::ConfigurationError(
            "smoothing.window must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Validate anomaly detection configuration
pub fn validate_anomaly_config(config: &AnomalyConfig) -> Result<()> {
    validate_positive(config.zscore_threshold, "anomaly.zscore_threshold")?;
    validate_positive(config.iqr_multiplier, "anomaly.iqr_multiplier")
}

/// Validate decomposition configuration
pub fn validate_decomposition_config(config: &DecompositionConfig) -> Result<()> {
    match config.period {
        Some(period) if period < 2 => Err(Error::ConfigurationError(format!(
            "decomposition.period must be at least 2, got {}",
            period
        ))),
        _ => Ok(()),
    }
}

/// Validate insight configuration
pub fn validate_insight_config(config: &InsightConfig) -> Result<()> {
    validate_positive(config.growth_threshold, "insights.growth_threshold")?;
    validate_positive(
        config.volatility_cv_threshold,
        "insights.volatility_cv_threshold",
    )?;
    validate_fraction(config.strength_threshold, "insights.strength_threshold")
}

fn validate_fraction(value: f64, context: &str) -> Result<()> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(Error::ConfigurationError(format!(
            "{} must be in (0, 1], got {}",
            context, value
        )));
    }
    Ok(())
}

fn validate_positive(value: f64, context: &str) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(Error::ConfigurationError(format!(
            "{} must be a positive number, got {}",
            context, value
        )));
    }
    Ok(())
}
