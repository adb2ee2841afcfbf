//! Fan-out event envelope and payloads
//!
//! Every event serializes as `{ "type": "<kind>", "data": { ... } }`, the
//! message shape the dashboard consumes over the WebSocket stream.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ConfusionTrend, SessionId, ThresholdEvent};

/// Smoothed-level update, published for every processed window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfusionUpdate {
    pub session_id: SessionId,
    /// Smoothed confusion level in [0, 1]
    pub level: f64,
    pub timestamp: f64,
    pub threshold_exceeded: bool,
    /// Unsmoothed classifier output for this window
    pub raw_score: f64,
    pub trend: ConfusionTrend,
}

/// Help produced by the help-generation collaborator after a threshold event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpSuggestion {
    pub session_id: SessionId,
    pub suggestions: Vec<String>,
    pub confusion_level: f64,
    /// Opaque context from the screen-analysis collaborator
    pub context: serde_json::Value,
    pub timestamp: f64,
}

/// Runtime threshold change notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdUpdated {
    pub threshold: f64,
    pub updated_by: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// What is on the other end of a session's sample stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Sample source name ("simulated", "stdin", "replay", ...)
    pub source: String,
    pub channel_count: usize,
    pub sampling_rate_hz: u32,
    pub channels: Vec<String>,
}

/// Device connection change, published when a session starts and ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BciStatus {
    pub session_id: SessionId,
    pub connected: bool,
    pub device_info: DeviceInfo,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Signal quality attached to a [`BrainActivity`] frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuality {
    /// This sample was flagged as an artifact
    pub artifact: bool,
    /// Artifact share over the session's statistics window
    pub artifact_fraction: f64,
}

/// Decimated frontal-channel voltages for live visualization (µV).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrainActivity {
    pub session_id: SessionId,
    pub timestamp: f64,
    pub channels: BTreeMap<String, f64>,
    pub quality: ActivityQuality,
}

/// Everything the fan-out delivers to consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum MonitorEvent {
    ConfusionUpdate(ConfusionUpdate),
    ThresholdExceeded(ThresholdEvent),
    HelpSuggestion(HelpSuggestion),
    ThresholdUpdated(ThresholdUpdated),
    BciStatus(BciStatus),
    BrainActivity(BrainActivity),
}

impl MonitorEvent {
    /// Session the event belongs to, for purging and suppression on
    /// session close. `None` for process-wide notices.
    ///
    /// Device status is process-wide here: the disconnect notice is
    /// published as the session ends and must survive its purge.
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            MonitorEvent::ConfusionUpdate(u) => Some(u.session_id),
            MonitorEvent::ThresholdExceeded(e) => Some(e.session_id),
            MonitorEvent::HelpSuggestion(h) => Some(h.session_id),
            MonitorEvent::BrainActivity(a) => Some(a.session_id),
            MonitorEvent::ThresholdUpdated(_) | MonitorEvent::BciStatus(_) => None,
        }
    }

    /// Session the event is about, for consumer filtering.
    pub fn subject_session(&self) -> Option<SessionId> {
        match self {
            MonitorEvent::BciStatus(s) => Some(s.session_id),
            other => other.session_id(),
        }
    }

    /// Wire name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            MonitorEvent::ConfusionUpdate(_) => "confusion_update",
            MonitorEvent::ThresholdExceeded(_) => "threshold_exceeded",
            MonitorEvent::HelpSuggestion(_) => "help_suggestion",
            MonitorEvent::ThresholdUpdated(_) => "threshold_updated",
            MonitorEvent::BciStatus(_) => "bci_status",
            MonitorEvent::BrainActivity(_) => "brain_activity",
        }
    }
}
