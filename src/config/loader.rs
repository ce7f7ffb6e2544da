//! Configuration loading utilities
//!
//! This module handles loading configuration from various sources with proper
//! precedence and validation.

use super::*;
use crate::core::error::{Error, Result};
use log::debug;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SALESCOPE_";

/// Load configuration from environment variables over defaults
pub fn load_from_env() -> Result<AnalysisConfig> {
    let mut config = AnalysisConfig::default();
    apply_env_overrides(&mut config, |key| env::var(key).ok())?;
    Ok(config)
}

/// Apply `SALESCOPE_*` overrides to `config`, reading variables through `lookup`
pub fn apply_env_overrides<F>(config: &mut AnalysisConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

    // Ingestion
    if let Some(value) = var("DATE_THRESHOLD") {
        config.ingest.date_threshold = parse_var("DATE_THRESHOLD", &value)?;
    }
    if let Some(value) = var("DATE_SAMPLE_SIZE") {
        config.ingest.date_sample_size = parse_var("DATE_SAMPLE_SIZE", &value)?;
    }
    if let Some(value) = var("NUMERIC_THRESHOLD") {
        config.ingest.numeric_threshold = parse_var("NUMERIC_THRESHOLD", &value)?;
    }
    if let Some(value) = var("CSV_DELIMITER") {
        config.ingest.delimiter = Some(parse_delimiter(&value)?);
    }
    if let Some(value) = var("SHEET_NAME") {
        config.ingest.sheet_name = Some(value);
    }

    // Smoothing
    if let Some(value) = var("SMOOTHING_WINDOW") {
        config.smoothing.window = parse_var("SMOOTHING_WINDOW", &value)?;
    }
    if let Some(value) = var("PARTIAL_WINDOWS") {
        let partial: bool = parse_var("PARTIAL_WINDOWS", &value)?;
        config.smoothing.policy = if partial {
            WindowPolicy::PartialWindow
        } else {
            WindowPolicy::FullWindow
        };
    }

    // Anomaly detection
    if let Some(value) = var("ANOMALY_METHOD") {
        config.anomaly.method = match value.to_lowercase().as_str() {
            "zscore" | "z_score" | "z-score" => AnomalyMethodKind::ZScore,
            "iqr" => AnomalyMethodKind::Iqr,
            other => {
                return Err(Error::ConfigurationError(format!(
                    "Invalid {}ANOMALY_METHOD: {}",
                    ENV_PREFIX, other
                )))
            }
        };
    }
    if let Some(value) = var("ZSCORE_THRESHOLD") {
        config.anomaly.zscore_threshold = parse_var("ZSCORE_THRESHOLD", &value)?;
    }
    if let Some(value) = var("IQR_MULTIPLIER") {
        config.anomaly.iqr_multiplier = parse_var("IQR_MULTIPLIER", &value)?;
    }

    // Decomposition
    if let Some(value) = var("DECOMPOSITION_MODEL") {
        config.decomposition.model = match value.to_lowercase().as_str() {
            "additive" => DecompositionModel::Additive,
            "multiplicative" => DecompositionModel::Multiplicative,
            other => {
                return Err(Error::ConfigurationError(format!(
                    "Invalid {}DECOMPOSITION_MODEL: {}",
                    ENV_PREFIX, other
                )))
            }
        };
    }
    if let Some(value) = var("DECOMPOSITION_PERIOD") {
        config.decomposition.period = Some(parse_var("DECOMPOSITION_PERIOD", &value)?);
    }

    // Insights
    if let Some(value) = var("GROWTH_THRESHOLD") {
        config.insights.growth_threshold = parse_var("GROWTH_THRESHOLD", &value)?;
    }

    Ok(())
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| {
        Error::ConfigurationError(format!("Invalid {}{}: {}", ENV_PREFIX, name, e))
    })
}

fn parse_delimiter(value: &str) -> Result<char> {
    match value {
        "\\t" | "tab" => Ok('\t'),
        _ => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(Error::ConfigurationError(format!(
                    "Invalid {}CSV_DELIMITER: expected one character, got {:?}",
                    ENV_PREFIX, value
                ))),
            }
        }
    }
}

/// Load configuration from a file (YAML or TOML based on extension)
pub fn load_from_file(path: &Path) -> Result<AnalysisConfig> {
    if !path.exists() {
        return Err(Error::ConfigurationError(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        Error::ConfigurationError(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => load_from_yaml(&contents),
        Some("toml") => load_from_toml(&contents),
        Some(ext) => Err(Error::ConfigurationError(format!(
            "Unsupported config file format: {}",
            ext
        ))),
        None => {
            // Try to parse as YAML first, then TOML
            load_from_yaml(&contents).or_else(|_| load_from_toml(&contents))
        }
    }
}

/// Load configuration from YAML string
pub fn load_from_yaml(yaml: &str) -> Result<AnalysisConfig> {
    serde_yaml::from_str(yaml)
        .map_err(|e| Error::ConfigurationError(format!("Failed to parse YAML config: {}", e)))
}

/// Load configuration from TOML string
pub fn load_from_toml(toml: &str) -> Result<AnalysisConfig> {
    toml::from_str(toml)
        .map_err(|e| Error::ConfigurationError(format!("Failed to parse TOML config: {}", e)))
}

/// Load configuration with precedence: defaults -> file -> environment
pub fn load_with_precedence<P: AsRef<Path>>(config_file: Option<P>) -> Result<AnalysisConfig> {
    // Missing keys in the file fall back to defaults through #[serde(default)]
    let mut config = match config_file {
        Some(file_path) => {
            debug!("loading configuration from {}", file_path.as_ref().display());
            load_from_file(file_path.as_ref())?
        }
        None => AnalysisConfig::default(),
    };

    // Environment has the highest precedence
    apply_env_overrides(&mut config, |key| env::var(key).ok())?;

    // Validate final configuration
    config.validate()?;

    Ok(config)
}

/// Save configuration to a file
pub fn save_to_file(config: &AnalysisConfig, path: &Path) -> Result<()> {
    let contents = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => config.to_yaml()?,
        Some("toml") => config.to_toml()?,
        Some(ext) => {
            return Err(Error::ConfigurationError(format!(
                "Unsupported config file format: {}",
                ext
            )))
        }
        None => config.to_yaml()?, // Default to YAML
    };

    // Create parent directory if it doesn't exist
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigurationError(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    fs::write(path, contents).map_err(|e| {
        Error::ConfigurationError(format!(
            "Failed to write config file {}: {}",
            path.display(),
            e
        ))
    })
}
