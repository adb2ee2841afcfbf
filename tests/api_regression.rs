//! API Regression Tests
//!
//! In-process tests that build the Axum app via `create_app()` and exercise
//! all /api/v1/* endpoints using `tower::ServiceExt::oneshot()`.
//! No binary spawn, no network port.

use confusion_monitor::api::{create_app, ApiState};
use confusion_monitor::classifier::SimulatedClassifier;
use confusion_monitor::config::MonitorConfig;
use confusion_monitor::fanout::{ConsumerFilter, EventHub};
use confusion_monitor::help::TemplateHelpGenerator;
use confusion_monitor::pipeline::SessionRegistry;
use confusion_monitor::types::{MonitorEvent, SessionId};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use std::sync::Arc;
use tower::ServiceExt;

fn create_test_state() -> ApiState {
    let registry = SessionRegistry::new(
        Arc::new(MonitorConfig::default()),
        EventHub::new(64),
        Arc::new(SimulatedClassifier::new(60.0, 14).unwrap()),
    );
    ApiState::new(
        Arc::new(registry),
        Some(Arc::new(TemplateHelpGenerator::new(3, 20))),
    )
}

async fn get(state: &ApiState, uri: &str) -> Response {
    create_app(state.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn send_json(state: &ApiState, method: &str, uri: &str, body: &str) -> Response {
    create_app(state.clone())
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn delete(state: &ApiState, uri: &str) -> Response {
    create_app(state.clone())
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn json_body(resp: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// All v1 GET endpoints should return 200.
#[tokio::test]
async fn test_v1_get_endpoints_return_200() {
    let state = create_test_state();
    let endpoints = [
        "/health",
        "/api/v1/status",
        "/api/v1/sessions",
        "/api/v1/threshold",
        "/api/v1/connections",
        "/api/v1/help/history",
        "/api/v1/help/history?count=5",
    ];

    for endpoint in &endpoints {
        let resp = get(&state, endpoint).await;
        assert!(
            resp.status().is_success(),
            "GET {endpoint} returned status {}",
            resp.status()
        );
    }
}

/// /health reports version and live counts without the envelope.
#[tokio::test]
async fn test_health_returns_json_object() {
    let state = create_test_state();
    let json = json_body(get(&state, "/health").await).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["active_sessions"], 0);
}

/// /api/v1/status wraps its payload in the envelope.
#[tokio::test]
async fn test_status_uses_envelope() {
    let state = create_test_state();
    let resp = get(&state, "/api/v1/status").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let json = json_body(resp).await;
    assert!(json["meta"]["timestamp"].is_string());
    let data = &json["data"];
    assert_eq!(data["threshold"], 0.7);
    assert_eq!(data["classifier"], "simulated");
    assert_eq!(data["samplingRateHz"], 128);
    assert_eq!(data["windowSize"], 50);
    assert_eq!(data["activeSessions"], 0);
    assert!(data["hub"].is_object());
}

#[tokio::test]
async fn test_threshold_update_is_clamped_and_broadcast() {
    let state = create_test_state();
    let mut sub = state.registry.hub().subscribe(ConsumerFilter::all());

    let resp = send_json(&state, "POST", "/api/v1/threshold", r#"{"threshold": 1.7}"#).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["data"]["threshold"], 1.0);

    let json = json_body(get(&state, "/api/v1/threshold").await).await;
    assert_eq!(json["data"]["threshold"], 1.0);

    match sub.try_recv() {
        Some(MonitorEvent::ThresholdUpdated(u)) => {
            assert_eq!(u.threshold, 1.0);
            assert_eq!(u.updated_by, "api");
        }
        other => panic!("expected threshold_updated, got {other:?}"),
    }
}

#[tokio::test]
async fn test_threshold_rejects_malformed_body() {
    let state = create_test_state();
    let resp = send_json(&state, "POST", "/api/v1/threshold", r#"{"threshold": "high"}"#).await;
    assert!(resp.status().is_client_error());
    assert_eq!(state.registry.threshold(), 0.7);
}

#[tokio::test]
async fn test_session_lifecycle() {
    let state = create_test_state();

    let resp = send_json(&state, "POST", "/api/v1/sessions", r#"{"seed": 7}"#).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let location = resp.headers()["location"].to_str().unwrap().to_string();
    let created = json_body(resp).await;
    let id = created["data"]["sessionId"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["source"], "simulated");
    assert_eq!(created["meta"]["sessionId"], id.as_str());
    assert_eq!(location, format!("/api/v1/sessions/{id}"));
    assert!(SessionId::parse(&id).is_some());

    let resp = get(&state, &location).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let info = json_body(resp).await;
    assert_eq!(info["data"]["sessionId"], id.as_str());
    assert_eq!(info["data"]["source"], "simulated");
    assert_eq!(info["meta"]["sessionId"], id.as_str());
    assert!(info["data"]["signal"]["artifactFraction"].is_number());
    assert!(info["data"]["signal"]["channels"].is_array());

    let list = json_body(get(&state, "/api/v1/sessions").await).await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);

    let resp = delete(&state, &format!("/api/v1/sessions/{id}")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let report = json_body(resp).await;
    assert_eq!(report["data"]["reason"], "cancelled");
    assert_eq!(report["data"]["status"]["phase"], "ended");

    let resp = get(&state, &format!("/api/v1/sessions/{id}")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let missing = json_body(resp).await;
    assert_eq!(missing["error"]["code"], "SESSION_NOT_FOUND");
    assert_eq!(missing["meta"]["sessionId"], id.as_str());
    let resp = delete(&state, &format!("/api/v1/sessions/{id}")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

/// Running sessions expose per-channel statistics once samples have flowed.
#[tokio::test]
async fn test_session_info_reports_signal_statistics() {
    let state = create_test_state();
    let resp = send_json(&state, "POST", "/api/v1/sessions", r#"{"seed": 3, "speed": 50.0}"#).await;
    let id = json_body(resp).await["data"]["sessionId"].as_str().unwrap().to_string();

    let mut channels = Vec::new();
    for _ in 0..100 {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let info = json_body(get(&state, &format!("/api/v1/sessions/{id}")).await).await;
        channels = info["data"]["signal"]["channels"].as_array().cloned().unwrap_or_default();
        if !channels.is_empty() {
            break;
        }
    }
    assert_eq!(channels.len(), 14);
    assert_eq!(channels[0]["channel"], "AF3");
    assert!(channels[0]["samples"].as_u64().unwrap() > 0);
    assert!(channels[0]["peakToPeak"].is_number());
    state.registry.shutdown().await;
}

#[tokio::test]
async fn test_connections_report_is_empty_without_clients() {
    let state = create_test_state();
    let json = json_body(get(&state, "/api/v1/connections").await).await;
    assert_eq!(json["data"]["totalConnections"], 0);
    assert!(json["data"]["connections"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_bounded_session_removes_itself() {
    let state = create_test_state();

    let resp = send_json(
        &state,
        "POST",
        "/api/v1/sessions",
        r#"{"speed": 20.0, "durationSecs": 1.0}"#,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let id = json_body(resp).await["data"]["sessionId"]
        .as_str()
        .and_then(SessionId::parse)
        .unwrap();

    // NotFound means it already finished and deregistered
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), state.registry.wait(id))
        .await
        .expect("session finished");
    assert_eq!(state.registry.session_count(), 0);
    assert_eq!(
        get(&state, &format!("/api/v1/sessions/{id}")).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_session_start_without_body_uses_defaults() {
    let state = create_test_state();
    let resp = create_app(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/sessions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(state.registry.session_count(), 1);
    assert_eq!(state.registry.shutdown().await, 1);
}

#[tokio::test]
async fn test_session_start_rejects_bad_parameters() {
    let state = create_test_state();
    for body in [r#"{"durationSecs": -1}"#, r#"{"speed": 0}"#] {
        let resp = send_json(&state, "POST", "/api/v1/sessions", body).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {body}");
    }
    assert_eq!(state.registry.session_count(), 0);
}

#[tokio::test]
async fn test_session_start_after_shutdown_is_unavailable() {
    let state = create_test_state();
    state.registry.shutdown().await;
    let resp = send_json(&state, "POST", "/api/v1/sessions", "{}").await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = json_body(resp).await;
    assert_eq!(json["error"]["code"], "SHUTTING_DOWN");
    assert!(json["error"]["message"].is_string());
}

#[tokio::test]
async fn test_invalid_session_id_is_bad_request() {
    let state = create_test_state();
    let resp = get(&state, "/api/v1/sessions/not-a-uuid").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = json_body(resp).await;
    assert_eq!(json["error"]["code"], "INVALID_SESSION_ID");
}

#[tokio::test]
async fn test_ws_requires_upgrade() {
    let state = create_test_state();
    let resp = get(&state, "/ws").await;
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let state = create_test_state();
    assert_eq!(get(&state, "/api/v1/nope").await.status(), StatusCode::NOT_FOUND);
}
