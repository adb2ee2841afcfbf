//! System-wide default constants.
//!
//! Every configurable value's built-in default lives here, grouped by
//! subsystem, so the TOML layer and the tests agree on one source.

// ============================================================================
// Signal Conditioning
// ============================================================================

/// Headset sampling rate (Hz).
pub const SAMPLING_RATE_HZ: u32 = 128;

/// Channel count of the EMOTIV EPOC+ layout.
pub const CHANNEL_COUNT: usize = 14;

/// High-pass cutoff removing DC drift (Hz).
pub const HIGHPASS_HZ: f64 = 1.0;

/// Low-pass cutoff removing high-frequency noise (Hz).
pub const LOWPASS_HZ: f64 = 50.0;

/// Mains frequency for the notch filter (Hz).
pub const NOTCH_HZ: f64 = 60.0;

/// Notch quality factor. Bandwidth = notch / Q.
pub const NOTCH_Q: f64 = 30.0;

/// Absolute amplitude above which a conditioned sample is an artifact (µV).
pub const ARTIFACT_THRESHOLD_UV: f64 = 200.0;

/// Span of the rolling per-channel signal statistics (seconds).
pub const STATISTICS_WINDOW_SECS: f64 = 2.0;

// ============================================================================
// Windowing
// ============================================================================

/// Samples per analysis window. 50 samples at 128 Hz ≈ 0.39 s.
pub const WINDOW_SIZE: usize = 50;

/// Samples the window advances after each emission (non-overlapping).
pub const WINDOW_STRIDE: usize = 50;

/// Windows with a strictly larger artifact fraction are dropped.
pub const MAX_ARTIFACT_FRACTION: f64 = 0.25;

// ============================================================================
// Detection
// ============================================================================

/// Smoothed level at or above which a threshold event fires.
pub const CONFUSION_THRESHOLD: f64 = 0.7;

/// Minimum interval between threshold events for one session (seconds).
///
/// Matches the dashboard's auto-dismiss time for a help overlay.
pub const COOLDOWN_SECS: f64 = 5.0;

/// Raw scores kept per session for trend analysis.
pub const SCORE_HISTORY_LEN: usize = 50;

/// Exponential smoothing factor applied to each new score.
pub const SMOOTHING_ALPHA: f64 = 0.3;

/// Window length for the moving-average smoother (scores).
pub const SMOOTHING_WINDOW: usize = 5;

/// Raw scores used for the trend slope.
pub const TREND_SAMPLES: usize = 5;

/// Slope magnitude below which the trend is reported as stable.
pub const TREND_SLOPE_EPSILON: f64 = 0.02;

// ============================================================================
// Classifier
// ============================================================================

/// Expected relative theta power at rest.
pub const REFERENCE_THETA: f64 = 0.25;

/// Expected relative alpha power at rest.
pub const REFERENCE_ALPHA: f64 = 0.40;

/// Expected relative beta power at rest.
pub const REFERENCE_BETA: f64 = 0.25;

/// Cognitive-load index `(θ+β)/α` that maps to a full load score.
pub const LOAD_SATURATION: f64 = 4.0;

/// Period of the simulated classifier's drift (seconds).
pub const SIMULATED_PERIOD_SECS: f64 = 60.0;

// ============================================================================
// Fan-out
// ============================================================================

/// Per-consumer queue capacity before the oldest events are dropped.
pub const CONSUMER_QUEUE_CAPACITY: usize = 256;

/// How long an ended session stays suppressed on the hub (seconds).
/// Must outlive the help timeout so late suggestions are still dropped.
pub const CLOSED_SESSION_RETENTION_SECS: u64 = 60;

/// Rate of the decimated `brain_activity` stream (Hz). Zero disables it.
pub const BRAIN_ACTIVITY_HZ: f64 = 8.0;

// ============================================================================
// WebSocket
// ============================================================================

/// Server heartbeat ping interval (seconds).
pub const WS_HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Close a connection after this long without a client message (seconds).
pub const WS_IDLE_TIMEOUT_SECS: u64 = 300;

/// Maximum concurrent WebSocket consumers.
pub const WS_MAX_CONNECTIONS: usize = 100;

// ============================================================================
// Help Generation
// ============================================================================

/// Upper bound for one help-generation call (seconds).
pub const HELP_TIMEOUT_SECS: u64 = 10;

/// Suggestions included in a help_suggestion event.
pub const HELP_MAX_SUGGESTIONS: usize = 3;

/// Suggestion history kept by the template generator.
pub const HELP_HISTORY_LEN: usize = 20;

// ============================================================================
// Server
// ============================================================================

/// HTTP / WebSocket bind address.
pub const SERVER_ADDR: &str = "0.0.0.0:8000";

// ============================================================================
// Simulation
// ============================================================================

/// Length of one simulated confusion episode cycle (seconds).
pub const SIMULATION_EPISODE_SECS: f64 = 40.0;

/// Probability that a simulated sample starts a blink artifact burst.
pub const SIMULATION_BLINK_PROBABILITY: f64 = 0.002;
