//! Config Validation Tests
//!
//! Typo detection, range validation, environment overrides and file
//! loading for `MonitorConfig`, independent of the rest of the pipeline.

use std::collections::HashMap;
use std::io::Write;

use confusion_monitor::config::validation::{
    known_config_keys, suggest_correction, suspicious_values, validate_unknown_keys,
};
use confusion_monitor::config::{ClassifierKind, ConfigError, MonitorConfig, SmoothingMethod};

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_detection_threshold_warns_with_suggestion() {
    let toml_str = r#"
[detection]
treshold = 0.8
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("treshold"));
    assert_eq!(warnings[0].suggestion.as_deref(), Some("detection.threshold"));
}

#[test]
fn typo_in_nested_smoothing_section_warns() {
    let toml_str = r#"
[detection.smoothing]
methd = "none"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field, "detection.smoothing.methd");
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("detection.smoothing.method")
    );
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[server]
addr = "127.0.0.1:9000"
cors_origins = ["http://localhost:3000"]

[signal]
sampling_rate_hz = 256
channel_count = 8
notch_hz = 50.0

[window]
size = 128
stride = 64

[detection]
threshold = 0.65
cooldown_secs = 10.0

[detection.smoothing]
method = "moving_average"
window = 4

[classifier]
kind = "simulated"

[fanout]
closed_session_retention_secs = 90
brain_activity_hz = 4.0

[websocket]
max_connections = 10

[help]
subject = "calculus"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.is_empty(), "Unexpected warnings: {warnings:?}");

    let config = MonitorConfig::from_toml_str(toml_str).unwrap();
    config.validate().unwrap();
    assert_eq!(config.signal.sampling_rate_hz, 256);
    assert_eq!(config.window.stride, 64);
    assert_eq!(config.detection.smoothing.method, SmoothingMethod::MovingAverage);
    assert_eq!(config.classifier.kind, ClassifierKind::Simulated);
    assert_eq!(config.help.subject, "calculus");
    assert_eq!(config.fanout.closed_session_retention_secs, 90);
}

#[test]
fn unknown_section_without_close_match_has_no_suggestion() {
    let warnings = validate_unknown_keys("[completely_unrelated]\nvalue = 1\n");
    assert!(!warnings.is_empty());
    assert!(warnings.iter().all(|w| w.suggestion.is_none()));
}

#[test]
fn every_section_is_known() {
    let known = known_config_keys();
    for section in ["server", "signal", "window", "detection", "classifier", "fanout", "websocket", "help"] {
        assert!(known.contains(section), "{section} missing from known keys");
    }
    assert_eq!(
        suggest_correction("signal.notch_hx", &known).as_deref(),
        Some("signal.notch_hz")
    );
}

#[test]
fn malformed_toml_is_left_to_serde() {
    assert!(validate_unknown_keys("[detection\nthreshold = ").is_empty());
    assert!(matches!(
        MonitorConfig::from_toml_str("[detection\nthreshold = "),
        Err(ConfigError::ParseStr(_))
    ));
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn defaults_are_valid() {
    MonitorConfig::default().validate().unwrap();
    assert!(suspicious_values(&MonitorConfig::default()).is_empty());
}

#[test]
fn threshold_outside_unit_range_is_rejected() {
    let mut config = MonitorConfig::default();
    config.detection.threshold = 1.5;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("detection.threshold"));

    config.detection.threshold = f64::NAN;
    assert!(config.validate().is_err());
}

#[test]
fn stride_longer_than_window_is_rejected() {
    let mut config = MonitorConfig::default();
    config.window.stride = config.window.size + 1;
    match config.validate() {
        Err(ConfigError::Validation(errors)) => {
            assert!(errors.iter().any(|e| e.contains("window.stride")))
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn cutoffs_above_nyquist_are_rejected() {
    let mut config = MonitorConfig::default();
    config.signal.lowpass_hz = 70.0;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("Nyquist"));
}

#[test]
fn closed_session_retention_must_outlast_help_timeout() {
    let mut config = MonitorConfig::default();
    config.fanout.closed_session_retention_secs = config.help.timeout_secs;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("fanout.closed_session_retention_secs"));

    config.help.enabled = false;
    config.validate().unwrap();
}

#[test]
fn brain_activity_rate_is_bounded_by_sampling_rate() {
    let mut config = MonitorConfig::default();
    config.fanout.brain_activity_hz = 0.0;
    config.validate().unwrap();

    config.fanout.brain_activity_hz = 500.0;
    assert!(config.validate().unwrap_err().to_string().contains("fanout.brain_activity_hz"));

    config.fanout.brain_activity_hz = -1.0;
    assert!(config.validate().is_err());
}

#[test]
fn single_sample_window_is_rejected() {
    let mut config = MonitorConfig::default();
    config.window.size = 1;
    config.window.stride = 1;
    assert!(config.validate().unwrap_err().to_string().contains("window.size"));
}

#[test]
fn multiple_errors_are_reported_together() {
    let mut config = MonitorConfig::default();
    config.window.size = 0;
    config.detection.smoothing.alpha = 0.0;
    config.fanout.consumer_queue_capacity = 0;
    match config.validate() {
        Err(ConfigError::Validation(errors)) => assert!(errors.len() >= 3, "{errors:?}"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn suspicious_values_flag_odd_notch_and_threshold() {
    let mut config = MonitorConfig::default();
    config.signal.notch_hz = 55.0;
    config.detection.threshold = 0.1;
    let warnings = suspicious_values(&config);
    let fields: Vec<&str> = warnings.iter().map(|w| w.field.as_str()).collect();
    assert!(fields.contains(&"signal.notch_hz"));
    assert!(fields.contains(&"detection.threshold"));
    // Still valid, only suspicious
    config.validate().unwrap();
}

// ============================================================================
// Environment Overrides
// ============================================================================

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn overrides_apply_parsed_values() {
    let mut config = MonitorConfig::default();
    let applied = config.apply_overrides(lookup(&[
        ("CONFUSION_THRESHOLD", "0.55"),
        ("COOLDOWN_SECS", "12"),
        ("CORS_ORIGINS", "http://a.test, http://b.test,"),
        ("MAX_CONNECTIONS", "7"),
    ]));

    assert_eq!(applied.len(), 4);
    assert_eq!(config.detection.threshold, 0.55);
    assert_eq!(config.detection.cooldown_secs, 12.0);
    assert_eq!(config.websocket.max_connections, 7);
    assert_eq!(config.server.cors_origins, vec!["http://a.test", "http://b.test"]);
}

#[test]
fn unparseable_override_is_ignored() {
    let mut config = MonitorConfig::default();
    let applied = config.apply_overrides(lookup(&[("CONFUSION_THRESHOLD", "high")]));
    assert!(applied.is_empty());
    assert_eq!(config.detection.threshold, 0.7);
}

#[test]
fn window_size_override_shrinks_stride() {
    let mut config = MonitorConfig::default();
    config.apply_overrides(lookup(&[("CONFUSION_WINDOW_SIZE", "20")]));
    assert_eq!(config.window.size, 20);
    assert_eq!(config.window.stride, 20);
    config.validate().unwrap();
}

// ============================================================================
// File Loading
// ============================================================================

#[test]
fn load_from_file_reads_and_validates() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[detection]\nthreshold = 0.8\ncooldown_secs = 2.5").unwrap();

    let config = MonitorConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.detection.threshold, 0.8);
    assert_eq!(config.detection.cooldown_secs, 2.5);
    // Untouched sections keep their defaults
    assert_eq!(config.window.size, 50);
}

#[test]
fn load_from_file_rejects_invalid_values() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[window]\nsize = 10\nstride = 20").unwrap();
    assert!(matches!(
        MonitorConfig::load_from_file(file.path()),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn load_from_file_reports_path_on_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[detection]\nthreshold = \"very\"").unwrap();
    match MonitorConfig::load_from_file(file.path()) {
        Err(ConfigError::Parse(path, _)) => assert_eq!(path.as_path(), file.path()),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(matches!(
        MonitorConfig::load(Some(missing.as_path())),
        Err(ConfigError::Io(_, _))
    ));
}

#[test]
fn toml_roundtrip_preserves_values() {
    let mut config = MonitorConfig::default();
    config.detection.threshold = 0.62;
    config.signal.notch_hz = 50.0;
    let text = config.to_toml().unwrap();
    let back = MonitorConfig::from_toml_str(&text).unwrap();
    assert_eq!(back, config);
}
