//! API route handlers
//!
//! Request handling for the REST surface:
//! - Health and system status
//! - Session listing, start (simulated) and stop
//! - Runtime confusion threshold
//! - WebSocket connection statistics
//! - Help generation history

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::envelope::{ApiError, ApiResponse};
use super::ws::{connection_report, ConnectionInfo};
use crate::acquisition::SynthProfile;
use crate::fanout::{ConsumerId, HubStats};
use crate::help::{HelpRecord, HelpStatistics, TemplateHelpGenerator};
use crate::pipeline::{RegistryError, SessionRegistry, SimulatedSource};
use crate::types::SessionId;

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<SessionRegistry>,
    /// Template help backend, when help generation is enabled
    pub help: Option<Arc<TemplateHelpGenerator>>,
    /// Open WebSocket connections, bounded by `websocket.max_connections`
    pub connections: Arc<AtomicUsize>,
    /// Per-connection bookkeeping keyed by hub consumer id
    pub connection_table: Arc<DashMap<ConsumerId, ConnectionInfo>>,
    pub started_at: DateTime<Utc>,
}

impl ApiState {
    pub fn new(registry: Arc<SessionRegistry>, help: Option<Arc<TemplateHelpGenerator>>) -> Self {
        Self {
            registry,
            help,
            connections: Arc::new(AtomicUsize::new(0)),
            connection_table: Arc::new(DashMap::new()),
            started_at: Utc::now(),
        }
    }

    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Health & Status
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: i64,
    pub active_sessions: usize,
    pub connections: usize,
}

/// GET /health
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_secs(),
        active_sessions: state.registry.session_count(),
        connections: state.connection_count(),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub uptime_seconds: i64,
    pub threshold: f64,
    pub classifier: &'static str,
    pub sampling_rate_hz: u32,
    pub window_size: usize,
    pub window_stride: usize,
    pub cooldown_secs: f64,
    pub active_sessions: usize,
    pub connections: usize,
    pub hub: HubStats,
    pub help: Option<HelpStatistics>,
}

/// GET /api/v1/status
pub async fn get_status(State(state): State<ApiState>) -> Response {
    let config = state.registry.config();
    ApiResponse::ok(StatusResponse {
        uptime_seconds: state.uptime_secs(),
        threshold: state.registry.threshold(),
        classifier: state.registry.classifier_name(),
        sampling_rate_hz: config.signal.sampling_rate_hz,
        window_size: config.window.size,
        window_stride: config.window.stride,
        cooldown_secs: config.detection.cooldown_secs,
        active_sessions: state.registry.session_count(),
        connections: state.connection_count(),
        hub: state.registry.hub().stats(),
        help: state.help.as_ref().and_then(|h| h.statistics()),
    })
}

// ============================================================================
// Sessions
// ============================================================================

/// Body for POST /api/v1/sessions. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StartSessionRequest {
    /// Fixed seed for a reproducible stream
    pub seed: Option<u64>,
    /// Pacing relative to real time; defaults to 1.0
    pub speed: Option<f64>,
    /// Stop after this much signal time
    pub duration_secs: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    pub session_id: SessionId,
    pub source: String,
}

/// GET /api/v1/sessions
pub async fn list_sessions(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.registry.list())
}

/// POST /api/v1/sessions - start a session fed by the signal synthesizer
pub async fn start_session(
    State(state): State<ApiState>,
    body: Option<Json<StartSessionRequest>>,
) -> Result<Response, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let duration = match request.duration_secs {
        Some(d) if d.is_finite() && d > 0.0 => Some(Duration::from_secs_f64(d)),
        Some(d) => return Err(ApiError::bad_request(format!("durationSecs must be positive, got {d}"))),
        None => None,
    };
    let speed = request.speed.unwrap_or(1.0);
    let profile = SynthProfile::from_signal(&state.registry.config().signal, request.seed);

    let source = SimulatedSource::new(profile, Some(speed), duration)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let session_id = state.registry.start_session(Box::new(source))?;
    Ok(ApiResponse::created(
        session_id,
        StartSessionResponse {
            session_id,
            source: "simulated".to_string(),
        },
    ))
}

fn parse_session_id(raw: &str) -> Result<SessionId, ApiError> {
    SessionId::parse(raw).ok_or_else(|| ApiError::invalid_session_id(raw))
}

/// GET /api/v1/sessions/:id - status, counters and per-channel signal statistics
pub async fn get_session(State(state): State<ApiState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let session_id = parse_session_id(&id)?;
    let info = state
        .registry
        .get(session_id)
        .ok_or_else(|| ApiError::session_not_found(session_id))?;
    Ok(ApiResponse::for_session(session_id, info))
}

/// DELETE /api/v1/sessions/:id
pub async fn end_session(State(state): State<ApiState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let session_id = parse_session_id(&id)?;
    let report = state.registry.end_session(session_id).await.map_err(|e| {
        if !matches!(e, RegistryError::NotFound(_)) {
            warn!(session = %session_id, error = %e, "Failed to end session");
        }
        ApiError::from(e)
    })?;
    Ok(ApiResponse::for_session(session_id, report))
}

// ============================================================================
// Threshold
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ThresholdBody {
    pub threshold: f64,
}

/// GET /api/v1/threshold
pub async fn get_threshold(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(ThresholdBody {
        threshold: state.registry.threshold(),
    })
}

/// POST /api/v1/threshold - clamped to [0, 1], broadcast as `threshold_updated`
pub async fn set_threshold(
    State(state): State<ApiState>,
    Json(body): Json<ThresholdBody>,
) -> Result<Response, ApiError> {
    if !body.threshold.is_finite() {
        return Err(ApiError::bad_request("threshold must be a finite number"));
    }
    let threshold = state.registry.set_threshold(body.threshold, "api");
    Ok(ApiResponse::ok(ThresholdBody { threshold }))
}

// ============================================================================
// Connections
// ============================================================================

/// GET /api/v1/connections
pub async fn get_connections(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(connection_report(&state.connection_table))
}

// ============================================================================
// Help
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_count")]
    pub count: usize,
}

fn default_history_count() -> usize {
    10
}

/// GET /api/v1/help/history?count=N
pub async fn get_help_history(State(state): State<ApiState>, Query(query): Query<HistoryQuery>) -> Response {
    match &state.help {
        Some(help) => ApiResponse::ok(help.history(query.count)),
        None => ApiResponse::ok(Vec::<HelpRecord>::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::SimulatedClassifier;
    use crate::config::MonitorConfig;
    use crate::api::envelope::ErrorCode;
    use crate::fanout::EventHub;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    fn create_test_state() -> ApiState {
        let registry = SessionRegistry::new(
            Arc::new(MonitorConfig::default()),
            EventHub::new(16),
            Arc::new(SimulatedClassifier::new(60.0, 14).unwrap()),
        );
        ApiState::new(Arc::new(registry), Some(Arc::new(TemplateHelpGenerator::new(3, 20))))
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let state = create_test_state();
        let Json(health) = health_check(State(state)).await;
        assert_eq!(health.status, "healthy");
        assert_eq!(health.active_sessions, 0);
    }

    #[tokio::test]
    async fn test_get_status() {
        let state = create_test_state();
        let v = body_json(get_status(State(state)).await).await;
        assert_eq!(v["data"]["threshold"], 0.7);
        assert_eq!(v["data"]["classifier"], "simulated");
        assert!(v["data"]["help"].is_null());
    }

    #[tokio::test]
    async fn test_set_threshold_clamps() {
        let state = create_test_state();
        let resp = set_threshold(State(state.clone()), Json(ThresholdBody { threshold: -3.0 }))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.registry.threshold(), 0.0);
    }

    #[tokio::test]
    async fn test_set_threshold_rejects_nan() {
        let state = create_test_state();
        let resp = set_threshold(State(state), Json(ThresholdBody { threshold: f64::NAN }))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_session_bad_id() {
        let state = create_test_state();
        let err = get_session(State(state), Path("not-a-uuid".to_string())).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidSessionId);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_start_session_rejects_bad_duration() {
        let state = create_test_state();
        let body = StartSessionRequest {
            duration_secs: Some(-1.0),
            ..Default::default()
        };
        let err = start_session(State(state), Some(Json(body))).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadRequest);
    }

    #[tokio::test]
    async fn test_connections_empty() {
        let state = create_test_state();
        let v = body_json(get_connections(State(state)).await).await;
        assert_eq!(v["data"]["totalConnections"], 0);
        assert_eq!(v["data"]["connections"].as_array().unwrap().len(), 0);
    }
}
