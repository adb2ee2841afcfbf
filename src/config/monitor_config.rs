//! Monitor Configuration - every pipeline constant as an operator-tunable TOML value
//!
//! Each struct implements `Default` with the values from [`super::defaults`],
//! so a missing file or a partial file behaves exactly like the built-in setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "CONFUSION_MONITOR_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "monitor_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one monitor process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// HTTP / WebSocket server
    #[serde(default)]
    pub server: ServerConfig,

    /// Device stream and conditioning filters
    #[serde(default)]
    pub signal: SignalConfig,

    /// Sliding-window aggregation
    #[serde(default)]
    pub window: WindowConfig,

    /// Smoothing, threshold and cooldown
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Classifier selection and tuning
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Event fan-out
    #[serde(default)]
    pub fanout: FanoutConfig,

    /// Dashboard WebSocket stream
    #[serde(default)]
    pub websocket: WebSocketConfig,

    /// Help-generation trigger
    #[serde(default)]
    pub help: HelpConfig,
}

impl MonitorConfig {
    /// Load configuration using the standard search order, apply
    /// environment overrides and validate.
    ///
    /// An explicit `path` (from `--config`) takes precedence over the search
    /// order and must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => {
                let config = Self::read_file(p)?;
                info!(path = %p.display(), "Loaded monitor config from --config");
                config
            }
            None => Self::search(),
        };
        let applied = config.apply_env_overrides();
        if !applied.is_empty() {
            info!(keys = ?applied, "Applied environment overrides");
        }
        config.validate()?;
        for w in super::validation::suspicious_values(&config) {
            warn!(field = %w.field, "{}", w);
        }
        Ok(config)
    }

    fn search() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::read_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded monitor config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        // 2. Check ./monitor_config.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::read_file(&local) {
                Ok(config) => {
                    info!("Loaded monitor config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        // 3. Defaults
        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load and validate a specific TOML file. No environment overrides.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::ParseStr(inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse a TOML document, warning about unknown keys. Not validated.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }
        toml::from_str(contents).map_err(ConfigError::ParseStr)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Apply the supported environment variable overrides.
    ///
    /// Returns the variables that were applied. Unparseable values are
    /// logged and ignored.
    pub fn apply_env_overrides(&mut self) -> Vec<&'static str> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Same as [`apply_env_overrides`](Self::apply_env_overrides) with an
    /// injectable lookup, so tests need not touch the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Vec<&'static str>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();

        macro_rules! override_parsed {
            ($key:literal, $field:expr) => {
                if let Some(raw) = lookup($key) {
                    match raw.trim().parse() {
                        Ok(v) => {
                            $field = v;
                            applied.push($key);
                        }
                        Err(_) => warn!(key = $key, value = %raw, "Ignoring unparseable override"),
                    }
                }
            };
        }

        override_parsed!("CONFUSION_THRESHOLD", self.detection.threshold);
        override_parsed!("CONFUSION_WINDOW_SIZE", self.window.size);
        override_parsed!("SAMPLING_RATE", self.signal.sampling_rate_hz);
        override_parsed!("SIGNAL_HIGHPASS_FREQ", self.signal.highpass_hz);
        override_parsed!("SIGNAL_LOWPASS_FREQ", self.signal.lowpass_hz);
        override_parsed!("SIGNAL_NOTCH_FREQ", self.signal.notch_hz);
        override_parsed!("ARTIFACT_THRESHOLD", self.signal.artifact_threshold_uv);
        override_parsed!("COOLDOWN_SECS", self.detection.cooldown_secs);
        override_parsed!("WS_HEARTBEAT_INTERVAL", self.websocket.heartbeat_interval_secs);
        override_parsed!("WS_TIMEOUT", self.websocket.idle_timeout_secs);
        override_parsed!("MAX_CONNECTIONS", self.websocket.max_connections);

        if let Some(addr) = lookup("CONFUSION_MONITOR_ADDR") {
            self.server.addr = addr;
            applied.push("CONFUSION_MONITOR_ADDR");
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
            applied.push("CORS_ORIGINS");
        }

        // A window-size override without an explicit stride keeps windows
        // non-overlapping.
        if applied.contains(&"CONFUSION_WINDOW_SIZE") && self.window.stride > self.window.size {
            self.window.stride = self.window.size;
        }

        applied
    }

    /// Validate all values for internal consistency.
    ///
    /// Rules:
    /// - Filter cutoffs must be positive and below Nyquist; high-pass < low-pass
    /// - Window size > 0, 0 < stride <= size
    /// - Threshold and artifact fraction within [0, 1]
    /// - Smoothing alpha within (0, 1]
    /// - Every float must be finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();
        let s = &self.signal;

        if s.sampling_rate_hz == 0 {
            errors.push("signal.sampling_rate_hz must be > 0".to_string());
        }
        if s.channel_count == 0 {
            errors.push("signal.channel_count must be > 0".to_string());
        }

        let nyquist = f64::from(s.sampling_rate_hz) / 2.0;
        for (name, hz) in [
            ("signal.highpass_hz", s.highpass_hz),
            ("signal.lowpass_hz", s.lowpass_hz),
            ("signal.notch_hz", s.notch_hz),
        ] {
            Self::check_cutoff(name, hz, nyquist, &mut errors);
        }
        if s.highpass_hz >= s.lowpass_hz {
            errors.push(format!(
                "signal.highpass_hz ({:.2}) must be < lowpass_hz ({:.2})",
                s.highpass_hz, s.lowpass_hz
            ));
        }
        if !(s.notch_q.is_finite() && s.notch_q > 0.0) {
            errors.push(format!("signal.notch_q must be > 0 (got {})", s.notch_q));
        }
        if !(s.artifact_threshold_uv.is_finite() && s.artifact_threshold_uv > 0.0) {
            errors.push(format!(
                "signal.artifact_threshold_uv must be > 0 (got {})",
                s.artifact_threshold_uv
            ));
        }
        if let Some(g) = s.gradient_threshold_uv {
            if !(g.is_finite() && g > 0.0) {
                errors.push(format!("signal.gradient_threshold_uv must be > 0 (got {g})"));
            }
        }

        let w = &self.window;
        if w.size < 2 {
            errors.push(format!("window.size must be at least 2 samples (got {})", w.size));
        }
        if w.stride == 0 || w.stride > w.size {
            errors.push(format!(
                "window.stride ({}) must be in 1..=window.size ({})",
                w.stride, w.size
            ));
        }
        Self::check_unit("window.max_artifact_fraction", w.max_artifact_fraction, &mut errors);

        let d = &self.detection;
        Self::check_unit("detection.threshold", d.threshold, &mut errors);
        if !(d.cooldown_secs.is_finite() && d.cooldown_secs >= 0.0) {
            errors.push(format!(
                "detection.cooldown_secs must be >= 0 (got {})",
                d.cooldown_secs
            ));
        }
        if d.history_len == 0 {
            errors.push("detection.history_len must be > 0".to_string());
        }
        if !(d.smoothing.alpha.is_finite() && d.smoothing.alpha > 0.0 && d.smoothing.alpha <= 1.0) {
            errors.push(format!(
                "detection.smoothing.alpha must be in (0, 1] (got {})",
                d.smoothing.alpha
            ));
        }
        if d.smoothing.window == 0 {
            errors.push("detection.smoothing.window must be > 0".to_string());
        }

        let c = &self.classifier;
        for (name, v) in [
            ("classifier.reference_theta", c.reference_theta),
            ("classifier.reference_alpha", c.reference_alpha),
            ("classifier.reference_beta", c.reference_beta),
            ("classifier.load_saturation", c.load_saturation),
            ("classifier.simulated_period_secs", c.simulated_period_secs),
        ] {
            if !(v.is_finite() && v > 0.0) {
                errors.push(format!("{name} must be > 0 (got {v})"));
            }
        }

        if self.fanout.consumer_queue_capacity == 0 {
            errors.push("fanout.consumer_queue_capacity must be > 0".to_string());
        }
        let activity = self.fanout.brain_activity_hz;
        if !(activity.is_finite() && activity >= 0.0 && activity <= self.signal.sampling_rate()) {
            errors.push(format!(
                "fanout.brain_activity_hz must be in [0, sampling rate] (got {activity})"
            ));
        }
        if !(self.signal.statistics_window_secs.is_finite() && self.signal.statistics_window_secs > 0.0) {
            errors.push(format!(
                "signal.statistics_window_secs must be > 0 (got {})",
                self.signal.statistics_window_secs
            ));
        }
        if self.help.enabled && self.fanout.closed_session_retention_secs <= self.help.timeout_secs {
            errors.push(format!(
                "fanout.closed_session_retention_secs ({}) must exceed help.timeout_secs ({})",
                self.fanout.closed_session_retention_secs, self.help.timeout_secs
            ));
        }
        if self.websocket.max_connections == 0 {
            errors.push("websocket.max_connections must be > 0".to_string());
        }
        if self.websocket.heartbeat_interval_secs == 0 {
            errors.push("websocket.heartbeat_interval_secs must be > 0".to_string());
        }
        if self.help.max_suggestions == 0 {
            errors.push("help.max_suggestions must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_cutoff(name: &str, hz: f64, nyquist: f64, errors: &mut Vec<String>) {
        // NaN fails every comparison, so check finiteness first
        if !hz.is_finite() || hz <= 0.0 {
            errors.push(format!("{name} must be a positive finite frequency (got {hz})"));
        } else if nyquist > 0.0 && hz >= nyquist {
            errors.push(format!(
                "{name} ({hz:.2} Hz) must be below Nyquist ({nyquist:.2} Hz)"
            ));
        }
    }

    fn check_unit(name: &str, v: f64, errors: &mut Vec<String>) {
        if !v.is_finite() || !(0.0..=1.0).contains(&v) {
            errors.push(format!("{name} must be within [0, 1] (got {v})"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config parse error: {0}")]
    ParseStr(#[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[source] toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for HTTP and WebSocket
    #[serde(default = "default_server_addr")]
    pub addr: String,
    /// Allowed cross-origin dashboard origins. Empty means same-origin only.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_server_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}
fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:8080".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
            cors_origins: default_cors_origins(),
        }
    }
}

// ============================================================================
// Signal
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    #[serde(default = "default_sampling_rate")]
    pub sampling_rate_hz: u32,
    #[serde(default = "default_channel_count")]
    pub channel_count: usize,
    #[serde(default = "default_highpass")]
    pub highpass_hz: f64,
    #[serde(default = "default_lowpass")]
    pub lowpass_hz: f64,
    #[serde(default = "default_notch")]
    pub notch_hz: f64,
    #[serde(default = "default_notch_q")]
    pub notch_q: f64,
    #[serde(default = "default_artifact_threshold")]
    pub artifact_threshold_uv: f64,
    /// Sample-to-sample jump flagged as an artifact (µV). Disabled when absent.
    #[serde(default)]
    pub gradient_threshold_uv: Option<f64>,
    /// Span of the per-channel statistics reported for each session
    #[serde(default = "default_statistics_window")]
    pub statistics_window_secs: f64,
}

fn default_sampling_rate() -> u32 { defaults::SAMPLING_RATE_HZ }
fn default_channel_count() -> usize { defaults::CHANNEL_COUNT }
fn default_highpass() -> f64 { defaults::HIGHPASS_HZ }
fn default_lowpass() -> f64 { defaults::LOWPASS_HZ }
fn default_notch() -> f64 { defaults::NOTCH_HZ }
fn default_notch_q() -> f64 { defaults::NOTCH_Q }
fn default_artifact_threshold() -> f64 { defaults::ARTIFACT_THRESHOLD_UV }
fn default_statistics_window() -> f64 { defaults::STATISTICS_WINDOW_SECS }

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: default_sampling_rate(),
            channel_count: default_channel_count(),
            highpass_hz: default_highpass(),
            lowpass_hz: default_lowpass(),
            notch_hz: default_notch(),
            notch_q: default_notch_q(),
            artifact_threshold_uv: default_artifact_threshold(),
            gradient_threshold_uv: None,
            statistics_window_secs: default_statistics_window(),
        }
    }
}

impl SignalConfig {
    pub fn sampling_rate(&self) -> f64 {
        f64::from(self.sampling_rate_hz)
    }

    /// Samples held by the per-channel statistics buffers.
    pub fn statistics_capacity(&self) -> usize {
        (self.sampling_rate() * self.statistics_window_secs).round().max(1.0) as usize
    }
}

// ============================================================================
// Window
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_size")]
    pub size: usize,
    #[serde(default = "default_window_stride")]
    pub stride: usize,
    #[serde(default = "default_max_artifact_fraction")]
    pub max_artifact_fraction: f64,
}

fn default_window_size() -> usize { defaults::WINDOW_SIZE }
fn default_window_stride() -> usize { defaults::WINDOW_STRIDE }
fn default_max_artifact_fraction() -> f64 { defaults::MAX_ARTIFACT_FRACTION }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            size: default_window_size(),
            stride: default_window_stride(),
            max_artifact_fraction: default_max_artifact_fraction(),
        }
    }
}

// ============================================================================
// Detection
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: f64,
    #[serde(default = "default_history_len")]
    pub history_len: usize,
    #[serde(default)]
    pub smoothing: SmoothingConfig,
}

fn default_threshold() -> f64 { defaults::CONFUSION_THRESHOLD }
fn default_cooldown() -> f64 { defaults::COOLDOWN_SECS }
fn default_history_len() -> usize { defaults::SCORE_HISTORY_LEN }

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            cooldown_secs: default_cooldown(),
            history_len: default_history_len(),
            smoothing: SmoothingConfig::default(),
        }
    }
}

impl DetectionConfig {
    /// Cooldown as a `Duration`. Validation guarantees a finite, non-negative value.
    pub fn cooldown(&self) -> Duration {
        Duration::try_from_secs_f64(self.cooldown_secs).unwrap_or(Duration::ZERO)
    }
}

/// How raw scores become the smoothed confusion level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingMethod {
    /// Exponential moving average with factor `alpha`
    Exponential,
    /// Mean of the last `window` scores
    MovingAverage,
    /// Raw score passes straight through
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingConfig {
    #[serde(default = "default_smoothing_method")]
    pub method: SmoothingMethod,
    #[serde(default = "default_smoothing_alpha")]
    pub alpha: f64,
    #[serde(default = "default_smoothing_window")]
    pub window: usize,
}

fn default_smoothing_method() -> SmoothingMethod { SmoothingMethod::Exponential }
fn default_smoothing_alpha() -> f64 { defaults::SMOOTHING_ALPHA }
fn default_smoothing_window() -> usize { defaults::SMOOTHING_WINDOW }

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            method: default_smoothing_method(),
            alpha: default_smoothing_alpha(),
            window: default_smoothing_window(),
        }
    }
}

// ============================================================================
// Classifier
// ============================================================================

/// Which classifier implementation scores windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// Band-power ratio model on real signal features
    BandRatio,
    /// Deterministic drift for demos without a headset
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_classifier_kind")]
    pub kind: ClassifierKind,
    #[serde(default = "default_reference_theta")]
    pub reference_theta: f64,
    #[serde(default = "default_reference_alpha")]
    pub reference_alpha: f64,
    #[serde(default = "default_reference_beta")]
    pub reference_beta: f64,
    #[serde(default = "default_load_saturation")]
    pub load_saturation: f64,
    /// Channel indices used for scoring. Empty means every channel.
    #[serde(default)]
    pub channels: Vec<usize>,
    #[serde(default = "default_simulated_period")]
    pub simulated_period_secs: f64,
}

fn default_classifier_kind() -> ClassifierKind { ClassifierKind::BandRatio }
fn default_reference_theta() -> f64 { defaults::REFERENCE_THETA }
fn default_reference_alpha() -> f64 { defaults::REFERENCE_ALPHA }
fn default_reference_beta() -> f64 { defaults::REFERENCE_BETA }
fn default_load_saturation() -> f64 { defaults::LOAD_SATURATION }
fn default_simulated_period() -> f64 { defaults::SIMULATED_PERIOD_SECS }

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kind: default_classifier_kind(),
            reference_theta: default_reference_theta(),
            reference_alpha: default_reference_alpha(),
            reference_beta: default_reference_beta(),
            load_saturation: default_load_saturation(),
            channels: Vec::new(),
            simulated_period_secs: default_simulated_period(),
        }
    }
}

// ============================================================================
// Fan-out / WebSocket / Help
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanoutConfig {
    #[serde(default = "default_queue_capacity")]
    pub consumer_queue_capacity: usize,
    #[serde(default = "default_closed_retention")]
    pub closed_session_retention_secs: u64,
    #[serde(default = "default_brain_activity_hz")]
    pub brain_activity_hz: f64,
}

fn default_queue_capacity() -> usize { defaults::CONSUMER_QUEUE_CAPACITY }
fn default_closed_retention() -> u64 { defaults::CLOSED_SESSION_RETENTION_SECS }
fn default_brain_activity_hz() -> f64 { defaults::BRAIN_ACTIVITY_HZ }

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            consumer_queue_capacity: default_queue_capacity(),
            closed_session_retention_secs: default_closed_retention(),
            brain_activity_hz: default_brain_activity_hz(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSocketConfig {
    #[serde(default = "default_heartbeat")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

fn default_heartbeat() -> u64 { defaults::WS_HEARTBEAT_INTERVAL_SECS }
fn default_idle_timeout() -> u64 { defaults::WS_IDLE_TIMEOUT_SECS }
fn default_max_connections() -> usize { defaults::WS_MAX_CONNECTIONS }

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat(),
            idle_timeout_secs: default_idle_timeout(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelpConfig {
    #[serde(default = "default_help_enabled")]
    pub enabled: bool,
    #[serde(default = "default_help_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_help_max_suggestions")]
    pub max_suggestions: usize,
    /// Subject reported by the static context provider
    #[serde(default = "default_help_subject")]
    pub subject: String,
}

fn default_help_enabled() -> bool { true }
fn default_help_timeout() -> u64 { defaults::HELP_TIMEOUT_SECS }
fn default_help_max_suggestions() -> usize { defaults::HELP_MAX_SUGGESTIONS }
fn default_help_subject() -> String { "general".to_string() }

impl Default for HelpConfig {
    fn default() -> Self {
        Self {
            enabled: default_help_enabled(),
            timeout_secs: default_help_timeout(),
            max_suggestions: default_help_max_suggestions(),
            subject: default_help_subject(),
        }
    }
}
