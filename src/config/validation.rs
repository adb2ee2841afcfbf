//! Config validation: unknown-key detection with Levenshtein suggestions
//! and suspicious-value warnings.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for MonitorConfig.
///
/// Maintained by hand to match the struct hierarchy in monitor_config.rs.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [server]
        "server",
        "server.addr",
        "server.cors_origins",
        // [signal]
        "signal",
        "signal.sampling_rate_hz",
        "signal.channel_count",
        "signal.highpass_hz",
        "signal.lowpass_hz",
        "signal.notch_hz",
        "signal.notch_q",
        "signal.artifact_threshold_uv",
        "signal.gradient_threshold_uv",
        "signal.statistics_window_secs",
        // [window]
        "window",
        "window.size",
        "window.stride",
        "window.max_artifact_fraction",
        // [detection]
        "detection",
        "detection.threshold",
        "detection.cooldown_secs",
        "detection.history_len",
        "detection.smoothing",
        "detection.smoothing.method",
        "detection.smoothing.alpha",
        "detection.smoothing.window",
        // [classifier]
        "classifier",
        "classifier.kind",
        "classifier.reference_theta",
        "classifier.reference_alpha",
        "classifier.reference_beta",
        "classifier.load_saturation",
        "classifier.channels",
        "classifier.simulated_period_secs",
        // [fanout]
        "fanout",
        "fanout.consumer_queue_capacity",
        "fanout.closed_session_retention_secs",
        "fanout.brain_activity_hz",
        // [websocket]
        "websocket",
        "websocket.heartbeat_interval_secs",
        "websocket.idle_timeout_secs",
        "websocket.max_connections",
        // [help]
        "help",
        "help.enabled",
        "help.timeout_secs",
        "help.max_suggestions",
        "help.subject",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a_len = a.len();
    let b_len = b.len();
    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for &k in known {
        let dist = levenshtein(unknown, k);
        if dist <= 3 {
            if let Some((_, best_dist)) = best {
                if dist < best_dist {
                    best = Some((k, dist));
                }
            } else {
                best = Some((k, dist));
            }
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns. Existing configs
/// always continue to work.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let found = walk_toml_keys(&value, "");
    let mut warnings = Vec::new();

    for key in &found {
        if !known.contains(key.as_str()) {
            let suggestion = suggest_correction(key, &known);
            let message = format!("Unknown config key '{key}'");
            warnings.push(ValidationWarning {
                field: key.clone(),
                message,
                suggestion,
            });
        }
    }

    warnings
}

// ============================================================================
// Suspicious Value Detection
// ============================================================================

/// Flag values that validate but are unlikely to be intended.
///
/// These never prevent startup; `MonitorConfig::load` logs them.
pub fn suspicious_values(config: &super::MonitorConfig) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let s = &config.signal;

    if s.notch_hz != 50.0 && s.notch_hz != 60.0 {
        warnings.push(ValidationWarning {
            field: "signal.notch_hz".to_string(),
            message: format!("signal.notch_hz = {:.1} is not a mains frequency", s.notch_hz),
            suggestion: Some(if (s.notch_hz - 50.0).abs() < (s.notch_hz - 60.0).abs() {
                "50.0".to_string()
            } else {
                "60.0".to_string()
            }),
        });
    }

    // A window shorter than one theta cycle cannot resolve the band
    let window_secs = config.window.size as f64 / s.sampling_rate().max(1.0);
    if window_secs < 0.25 {
        warnings.push(ValidationWarning {
            field: "window.size".to_string(),
            message: format!(
                "window.size = {} covers only {:.3} s at {} Hz, too short for theta",
                config.window.size, window_secs, s.sampling_rate_hz
            ),
            suggestion: None,
        });
    }

    let t = config.detection.threshold;
    if t < 0.3 || t > 0.95 {
        warnings.push(ValidationWarning {
            field: "detection.threshold".to_string(),
            message: format!("detection.threshold = {t:.2} is outside the usual range (0.3-0.95)"),
            suggestion: None,
        });
    }

    if s.artifact_threshold_uv < 50.0 {
        warnings.push(ValidationWarning {
            field: "signal.artifact_threshold_uv".to_string(),
            message: format!(
                "signal.artifact_threshold_uv = {:.1} will flag ordinary EEG as artifact",
                s.artifact_threshold_uv
            ),
            suggestion: None,
        });
    }

    warnings
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("treshold", "threshold"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [detection]
            threshold = 0.7
            [detection.smoothing]
            alpha = 0.3
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"detection".to_string()));
        assert!(keys.contains(&"detection.smoothing".to_string()));
        assert!(keys.contains(&"detection.smoothing.alpha".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[detection]
treshold = 0.8
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "detection.treshold");
        assert_eq!(warnings[0].suggestion.as_deref(), Some("detection.threshold"));
        assert!(warnings[0].to_string().contains("did you mean"));
    }

    #[test]
    fn test_all_valid_keys_produce_zero_warnings() {
        let toml_str = r#"
[server]
addr = "127.0.0.1:9000"

[signal]
notch_hz = 50.0

[detection.smoothing]
method = "moving_average"

[classifier]
kind = "simulated"
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.is_empty(), "Expected 0 warnings, got: {:?}", warnings);
    }

    #[test]
    fn test_unknown_section_produces_warning() {
        let warnings = validate_unknown_keys("[telemetry]\nenabled = true\n");
        assert!(warnings.iter().any(|w| w.field == "telemetry"));
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_defaults_not_suspicious() {
        let warnings = suspicious_values(&MonitorConfig::default());
        assert!(warnings.is_empty(), "{:?}", warnings);
    }

    #[test]
    fn test_odd_notch_suggests_mains() {
        let mut config = MonitorConfig::default();
        config.signal.notch_hz = 48.0;
        let warnings = suspicious_values(&config);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].suggestion.as_deref(), Some("50.0"));
    }

    #[test]
    fn test_short_window_flagged() {
        let mut config = MonitorConfig::default();
        config.window.size = 16;
        config.window.stride = 16;
        assert!(suspicious_values(&config)
            .iter()
            .any(|w| w.field == "window.size"));
    }
}
