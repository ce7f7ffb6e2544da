//! Configuration management for salescope
//!
//! Every tunable threshold of the ingestion and analysis pipeline lives here.
//! Sources, in increasing precedence:
//! - Built-in defaults
//! - YAML/TOML configuration files
//! - `SALESCOPE_*` environment variables

use crate::core::error::{Error, Result};
use crate::ingest::validation::NegativeValueCheck;
use crate::time_series::anomaly::{AnomalyMethod, AnomalyMethodKind};
use crate::time_series::decomposition::DecompositionModel;
use crate::time_series::preprocessing::WindowPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod loader;
pub mod validation;

/// Default header tokens that mark a date column (matched per word, case-insensitive)
pub const DEFAULT_DATE_TOKENS: [&str; 14] = [
    "date",
    "dates",
    "datetime",
    "timestamp",
    "time",
    "period",
    "дата",
    "даты",
    "время",
    "день",
    "период",
    "fecha",
    "datum",
    "unnamed: 0",
];

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Reading, schema inference and validation
    pub ingest: IngestConfig,
    /// Moving-average smoothing
    pub smoothing: SmoothingConfig,
    /// Outlier detection
    pub anomaly: AnomalyConfig,
    /// Seasonal decomposition
    pub decomposition: DecompositionConfig,
    /// Narrative insight thresholds
    pub insights: InsightConfig,
}

/// Ingestion configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Header tokens identifying the date column
    pub date_tokens: Vec<String>,
    /// Fraction of sampled cells that must parse for a date strategy to be adopted
    pub date_threshold: f64,
    /// Number of non-blank cells sampled per column when scoring date strategies
    pub date_sample_size: usize,
    /// Fraction of non-blank cells that must be numeric for a metric column
    pub numeric_threshold: f64,
    /// CSV delimiter; sniffed from the header line when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,
    /// Spreadsheet sheet to read; the first sheet when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,
    /// Which metrics are expected to be non-negative
    pub negative_values: NegativeValueCheck,
}

/// Smoothing configuration section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Centered window size in points
    pub window: usize,
    /// Edge handling
    pub policy: WindowPolicy,
}

/// Anomaly detection configuration section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Method used by the analysis bundle
    pub method: AnomalyMethodKind,
    /// Z-score above which a point is flagged
    pub zscore_threshold: f64,
    /// Fence multiplier k for `[Q1 - k*IQR, Q3 + k*IQR]`
    pub iqr_multiplier: f64,
}

/// Decomposition configuration section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompositionConfig {
    pub model: DecompositionModel,
    /// Seasonal period; inferred from the date spacing when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<usize>,
}

/// Insight generator configuration section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    /// Absolute growth rate that triggers a trend insight
    pub growth_threshold: f64,
    /// Coefficient of variation above which a metric is called volatile
    pub volatility_cv_threshold: f64,
    /// Seasonal/trend strength above which decomposition insights are emitted
    pub strength_threshold: f64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            date_tokens: DEFAULT_DATE_TOKENS.iter().map(|t| t.to_string()).collect(),
            date_threshold: 0.8,
            date_sample_size: 100,
            numeric_threshold: 0.5,
            delimiter: None,
            sheet_name: None,
            negative_values: NegativeValueCheck::AllMetrics,
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window: 7,
            policy: WindowPolicy::FullWindow,
        }
    }
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            method: AnomalyMethodKind::ZScore,
            zscore_threshold: 3.0,
            iqr_multiplier: 1.5,
        }
    }
}

impl AnomalyConfig {
    /// The configured method with its threshold
    pub fn method(&self) -> AnomalyMethod {
        match self.method {
            AnomalyMethodKind::ZScore => AnomalyMethod::ZScore {
                threshold: self.zscore_threshold,
            },
            AnomalyMethodKind::Iqr => AnomalyMethod::Iqr {
                multiplier: self.iqr_multiplier,
            },
        }
    }
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            model: DecompositionModel::Additive,
            period: None,
        }
    }
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            growth_threshold: 0.10,
            volatility_cv_threshold: 0.5,
            strength_threshold: 0.6,
        }
    }
}

impl IngestConfig {
    /// Delimiter as a CSV byte, if configured
    pub fn delimiter_byte(&self) -> Result<Option<u8>> {
        match self.delimiter {
            None => Ok(None),
            Some(c) if c.is_ascii() => Ok(Some(c as u8)),
            Some(c) => Err(Error::ConfigurationError(format!(
                "CSV delimiter must be a single ASCII character, got {:?}",
                c
            ))),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from environment variables over defaults
    pub fn from_env() -> Result<Self> {
        loader::load_from_env()
    }

    /// Load configuration from a file (YAML or TOML)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        loader::load_from_file(path.as_ref())
    }

    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        loader::load_from_yaml(yaml)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml: &str) -> Result<Self> {
        loader::load_from_toml(toml)
    }

    /// Load configuration with precedence: defaults -> file -> environment
    pub fn load_with_precedence<P: AsRef<Path>>(config_file: Option<P>) -> Result<Self> {
        loader::load_with_precedence(config_file)
    }

    /// Validate configuration and return errors if invalid
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        loader::save_to_file(self, path.as_ref())
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            Error::ConfigurationError(format!("Failed to serialize config to YAML: {}", e))
        })
    }

    /// Convert to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| {
            Error::ConfigurationError(format!("Failed to serialize config to TOML: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.ingest.date_threshold, 0.8);
        assert_eq!(config.ingest.numeric_threshold, 0.5);
        assert_eq!(config.smoothing.window, 7);
        assert_eq!(config.smoothing.policy, WindowPolicy::FullWindow);
        assert_eq!(
            config.anomaly.method(),
            AnomalyMethod::ZScore { threshold: 3.0 }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = AnalysisConfig::from_yaml("smoothing:\n  window: 3\n").unwrap();
        assert_eq!(config.smoothing.window, 3);
        assert_eq!(config.anomaly.zscore_threshold, 3.0);
        assert!(config.ingest.date_tokens.iter().any(|t| t == "дата"));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = AnalysisConfig::default();
        config.decomposition.period = Some(12);
        config.ingest.delimiter = Some(';');
        let toml = config.to_toml().unwrap();
        assert_eq!(AnalysisConfig::from_toml(&toml).unwrap(), config);
    }

    #[test]
    fn test_delimiter_byte() {
        let mut ingest = IngestConfig::default();
        assert_eq!(ingest.delimiter_byte().unwrap(), None);
        ingest.delimiter = Some('\t');
        assert_eq!(ingest.delimiter_byte().unwrap(), Some(b'\t'));
        ingest.delimiter = Some('¦');
        assert!(ingest.delimiter_byte().is_err());
    }
}
