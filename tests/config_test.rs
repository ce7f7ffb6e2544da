//! Configuration system tests
//!
//! Configuration files feeding the loader and the analyzer

use salescope::config::loader::apply_env_overrides;
use salescope::config::validation::validate_config;
use salescope::config::AnalysisConfig;
use salescope::time_series::AnomalyMethodKind;
use salescope::{AnomalyMethod, Analyzer, FormatHint, Loader, WindowPolicy};
use tempfile::tempdir;

#[test]
fn test_default_config_is_valid() {
    let config = AnalysisConfig::default();
    assert!(validate_config(&config).is_ok());
    assert_eq!(config.ingest.date_sample_size, 100);
    assert_eq!(config.anomaly.iqr_multiplier, 1.5);
    assert_eq!(config.insights.growth_threshold, 0.10);
}

#[test]
fn test_yaml_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("salescope.yaml");

    let mut config = AnalysisConfig::default();
    config.anomaly.method = AnomalyMethodKind::Iqr;
    config.smoothing.policy = WindowPolicy::PartialWindow;
    config.ingest.sheet_name = Some("Q1".to_string());
    config.save_to_file(&path).unwrap();

    let yaml = std::fs::read_to_string(&path).unwrap();
    assert!(yaml.contains("method: iqr"));
    assert!(yaml.contains("policy: partial_window"));

    let loaded = AnalysisConfig::from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_toml_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("salescope.toml");
    std::fs::write(
        &path,
        "[ingest]\ndelimiter = \";\"\nnumeric_threshold = 0.9\n\n[decomposition]\nmodel = \"multiplicative\"\nperiod = 4\n",
    )
    .unwrap();

    let config = AnalysisConfig::from_file(&path).unwrap();
    assert_eq!(config.ingest.delimiter, Some(';'));
    assert_eq!(config.ingest.numeric_threshold, 0.9);
    assert_eq!(config.decomposition.period, Some(4));
    assert_eq!(config.smoothing.window, 7);
}

#[test]
fn test_invalid_values_rejected() {
    let mut config = AnalysisConfig::default();
    config.ingest.date_threshold = 1.5;
    assert!(validate_config(&config).is_err());

    let mut config = AnalysisConfig::default();
    config.decomposition.period = Some(1);
    assert!(validate_config(&config).is_err());

    let mut config = AnalysisConfig::default();
    let result = apply_env_overrides(&mut config, |key| {
        (key == "SALESCOPE_ANOMALY_METHOD").then(|| "median".to_string())
    });
    assert!(result.is_err());
}

#[test]
fn test_numeric_threshold_controls_dropped_columns() {
    let csv = "Date,Sales,Notes\n\
               2020-01-01,1,ok\n\
               2020-01-02,2,3\n\
               2020-01-03,3,late\n\
               2020-01-04,4,5\n";

    let lenient = AnalysisConfig::from_yaml("ingest:\n  numeric_threshold: 0.5\n").unwrap();
    let loaded = Loader::new(lenient.ingest)
        .load(csv.as_bytes(), FormatHint::Csv)
        .unwrap();
    assert_eq!(loaded.series.metric_names(), &["Sales", "Notes"]);

    let strict = AnalysisConfig::from_yaml("ingest:\n  numeric_threshold: 0.75\n").unwrap();
    let loaded = Loader::new(strict.ingest)
        .load(csv.as_bytes(), FormatHint::Csv)
        .unwrap();
    assert_eq!(loaded.series.metric_names(), &["Sales"]);
    assert_eq!(loaded.schema.dropped_columns[0].column, "Notes");
}

#[test]
fn test_analyzer_uses_configured_method() {
    let csv = "Date,Sales\n2020-01-01,1\n2020-01-02,2\n2020-01-03,3\n";
    let series = Loader::default()
        .load(csv.as_bytes(), FormatHint::Csv)
        .unwrap()
        .series;

    let config = AnalysisConfig::from_yaml("anomaly:\n  method: iqr\n  iqr_multiplier: 2.0\n").unwrap();
    let bundle = Analyzer::new(config).analyze(&series, None).unwrap();
    assert_eq!(bundle.anomalies.method, AnomalyMethod::Iqr { multiplier: 2.0 });
}
