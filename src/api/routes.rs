//! API route definitions
//!
//! - /api/v1/status - System status, hub and help statistics
//! - /api/v1/sessions - List and start monitoring sessions
//! - /api/v1/sessions/:id - Inspect or end one session
//! - /api/v1/threshold - Read or change the confusion threshold
//! - /api/v1/connections - Open WebSocket connections
//! - /api/v1/help/history - Recent help answers

use axum::{routing::get, Router};

use super::handlers::{self, ApiState};
use super::ws;

/// Create all `/api/v1` routes
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/status", get(handlers::get_status))
        .route("/sessions", get(handlers::list_sessions).post(handlers::start_session))
        .route("/sessions/:id", get(handlers::get_session).delete(handlers::end_session))
        .route("/threshold", get(handlers::get_threshold).post(handlers::set_threshold))
        .route("/connections", get(handlers::get_connections))
        .route("/help/history", get(handlers::get_help_history))
        .with_state(state)
}

/// Root-level health check and the event stream
pub fn root_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}
