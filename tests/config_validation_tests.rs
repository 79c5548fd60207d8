//! Config Validation Tests
//!
//! Typo detection and range validation, exercised through the public config
//! API independently from the rest of the run.

use fermentwatch::config::validation::{
    known_config_keys, suggest_correction, validate_ranges, validate_unknown_keys,
};
use fermentwatch::config::{ConfigError, MonitorConfig};
use std::io::Write;

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_acceptable_delta_warns_with_suggestion() {
    let toml_str = r#"
[analysis]
acceptable_detla = 0.3
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("acceptable_detla"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("analysis.acceptable_delta")
    );
}

#[test]
fn typo_in_section_name_warns() {
    let toml_str = r#"
[vesels]
ids = ["f1"]
"#;
    let warnings = validate_unknown_keys(toml_str);
    // Both the section and its child are unknown
    assert_eq!(warnings.len(), 2);
    assert!(warnings
        .iter()
        .any(|w| w.suggestion.as_deref() == Some("vessels")));
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[vessels]
ids = ["f1", "f2"]

[influx]
url = "brewery.local:8086"
database = "telegraf"
username = "reader"
password = "secret"

[analysis]
acceptable_delta = 0.4
max_temperature = 24.0
window_points = 6
group_minutes = 5
max_retries = 2

[alerts]
dry_run = true
credentials_path = "/etc/fermentwatch/credentials.txt"
notify_on_no_data = false

[storage]
data_dir = "/var/lib/fermentwatch"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");

    let config = MonitorConfig::from_toml_str(toml_str).unwrap();
    assert_eq!(config.vessels.ids, vec!["f1", "f2"]);
    assert_eq!(config.analysis.max_temperature, Some(24.0));
    assert!(config.analyzer().ceiling().is_enabled());
}

#[test]
fn default_config_serializes_to_known_keys_only() {
    let text = MonitorConfig::default().to_toml().unwrap();
    assert!(validate_unknown_keys(&text).is_empty());
}

#[test]
fn far_off_key_gets_no_suggestion() {
    let known = known_config_keys();
    assert!(suggest_correction("completely.unrelated.key", &known).is_none());
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn zero_group_minutes_rejected() {
    let err = MonitorConfig::from_toml_str("[analysis]\ngroup_minutes = 0\n").unwrap_err();
    match err {
        ConfigError::Validation(errors) => {
            assert!(errors.iter().any(|e| e.contains("group_minutes")));
        }
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn unsafe_vessel_id_rejected() {
    let err = MonitorConfig::from_toml_str("[vessels]\nids = [\"f1' OR 1=1\"]\n").unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
}

#[test]
fn unusual_ceiling_warns_but_passes() {
    let mut config = MonitorConfig::default();
    config.analysis.max_temperature = Some(80.0);
    let (errors, warnings) = validate_ranges(&config);
    assert!(errors.is_empty());
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].field.contains("max_temperature"));
    assert!(config.validate().is_ok());
}

#[test]
fn load_from_file_reports_path_on_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[analysis\nacceptable_delta = ").unwrap();
    let err = MonitorConfig::load_from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(ref p, _) if p == file.path()));
}
