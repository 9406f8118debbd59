//! Estimator configuration loading and validation.

use repairdesk_core::config::{EstimatorConfig, MAX_REFERENCE_WINDOW_YEARS};
use std::fs;

fn write_config(dir: &std::path::Path, config: &serde_json::Value) {
    fs::create_dir_all(dir.join("pricing")).unwrap();
    fs::write(
        dir.join("pricing/estimator_config.json"),
        serde_json::to_string_pretty(config).unwrap(),
    )
    .unwrap();
}

#[test]
fn shipped_config_loads() {
    let config = EstimatorConfig::load(concat!(env!("CARGO_MANIFEST_DIR"), "/../data")).unwrap();
    assert_eq!(config.reference_window_years, 3);
    assert_eq!(config.baseline_price("screen"), 199.0);
    assert_eq!(config.confidence.fallback, 0.2);
}

#[test]
fn loads_overrides_from_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = EstimatorConfig::default_test();
    config.reference_window_years = 2;
    config.drift_rate_per_year = 0.08;
    write_config(dir.path(), &serde_json::json!({ "estimator": config }));

    let loaded = EstimatorConfig::load(dir.path().to_str().unwrap()).unwrap();
    assert_eq!(loaded.reference_window_years, 2);
    assert_eq!(loaded.drift_rate_per_year, 0.08);
    assert_eq!(loaded.algorithm_version, "smart-pricing-test");
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = EstimatorConfig::load(dir.path().to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("Cannot read"), "got: {err}");
}

#[test]
fn invalid_values_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = EstimatorConfig::default_test();
    config.drift_rate_per_year = 1.5;
    write_config(dir.path(), &serde_json::json!({ "estimator": config }));
    assert!(EstimatorConfig::load(dir.path().to_str().unwrap()).is_err());

    let mut config = EstimatorConfig::default_test();
    config.reference_window_years = MAX_REFERENCE_WINDOW_YEARS + 1;
    assert!(config.validate().is_err());
    config.reference_window_years = MAX_REFERENCE_WINDOW_YEARS;
    assert!(config.validate().is_ok());
    config.reference_window_years = -1;
    assert!(config.validate().is_err());

    let mut config = EstimatorConfig::default_test();
    config.confidence.extrapolation_floor = 0.9;
    assert!(config.validate().is_err());

    let mut config = EstimatorConfig::default_test();
    config.baseline_prices.insert("screen".into(), 0.0);
    assert!(config.validate().is_err());

    assert!(EstimatorConfig::default_test().validate().is_ok());
}

#[test]
fn baseline_lookup_is_case_insensitive_with_default() {
    let config = EstimatorConfig::default_test();
    assert_eq!(config.baseline_price("Screen"), 199.0);
    assert_eq!(config.baseline_price("back_panel"), 79.0);
    assert_eq!(config.baseline_price("water_damage"), 99.0);
}
