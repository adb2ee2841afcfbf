//! Confusion score, session and threshold types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from the hyphenated string form used in URLs.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classifier output for one window. Always within [0, 1].
///
/// Deserializing rejects values outside that range rather than clamping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedScore")]
pub struct ConfusionScore {
    value: f64,
    /// Timestamp of the window this score summarizes
    pub timestamp: f64,
}

impl ConfusionScore {
    /// Build a score, clamping into [0, 1]. NaN maps to 0.
    pub fn new(value: f64, timestamp: f64) -> Self {
        Self {
            value: clamp_unit(value),
            timestamp,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

#[derive(Deserialize)]
struct UncheckedScore {
    value: f64,
    timestamp: f64,
}

impl TryFrom<UncheckedScore> for ConfusionScore {
    type Error = String;

    fn try_from(raw: UncheckedScore) -> Result<Self, Self::Error> {
        if (0.0..=1.0).contains(&raw.value) {
            Ok(Self::new(raw.value, raw.timestamp))
        } else {
            Err(format!("confusion score {} outside [0, 1]", raw.value))
        }
    }
}

/// Clamp into [0, 1], mapping NaN to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Emitted when the smoothed level reaches the threshold outside cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdEvent {
    pub session_id: SessionId,
    pub level: f64,
    pub timestamp: f64,
}

/// Per-session tracker state machine.
///
/// `Idle` → `Monitoring` ⇄ `Cooldown` → `Ended`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Created, no score received yet
    Idle,
    /// Receiving scores, threshold events armed
    Monitoring,
    /// Threshold event fired, further events suppressed until expiry
    Cooldown,
    /// Terminal; all state discarded
    Ended,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "Idle"),
            SessionPhase::Monitoring => write!(f, "Monitoring"),
            SessionPhase::Cooldown => write!(f, "Cooldown"),
            SessionPhase::Ended => write!(f, "Ended"),
        }
    }
}

/// Direction of recent raw scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfusionTrend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}
