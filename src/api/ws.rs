//! WebSocket event stream at `/ws`
//!
//! Each connection is one fan-out consumer. Server → client frames are the
//! hub's [`MonitorEvent`] JSON plus three connection-level messages
//! (`connection_established`, `pong`, `status_response`). Client → server
//! frames are `{ "type": ..., "data": { ... } }` with types `ping`,
//! `set_threshold` and `request_status`.
//!
//! Open connections are tracked in [`ApiState::connection_table`] for the
//! `/api/v1/connections` report.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::envelope::ApiError;
use super::handlers::ApiState;
use crate::fanout::{ConsumerFilter, ConsumerId};
use crate::types::SessionId;

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// Restrict the stream to one session
    pub session: Option<String>,
    /// Only `threshold_exceeded` events
    #[serde(default)]
    pub threshold_only: bool,
}

/// Incoming client frame. `data` is optional for every type.
#[derive(Debug, Deserialize)]
struct ClientMessage {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Per-connection bookkeeping, reported in `status_response` and
/// `/api/v1/connections`.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionInfo {
    pub connected_at: Instant,
    pub last_seen: Instant,
    pub filter: ConsumerFilter,
}

impl ConnectionInfo {
    pub fn new(filter: ConsumerFilter) -> Self {
        let now = Instant::now();
        Self {
            connected_at: now,
            last_seen: now,
            filter,
        }
    }

    pub fn stats(&self, id: ConsumerId) -> ConnectionStats {
        ConnectionStats {
            id,
            connected_secs: self.connected_at.elapsed().as_secs_f64(),
            last_message_ago_secs: self.last_seen.elapsed().as_secs_f64(),
            session: self.filter.session,
            threshold_only: self.filter.threshold_only,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStats {
    pub id: ConsumerId,
    pub connected_secs: f64,
    pub last_message_ago_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionId>,
    pub threshold_only: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionReport {
    pub total_connections: usize,
    pub connections: Vec<ConnectionStats>,
}

/// Snapshot of every tracked connection, oldest first.
pub fn connection_report(table: &DashMap<ConsumerId, ConnectionInfo>) -> ConnectionReport {
    let mut connections: Vec<ConnectionStats> = table.iter().map(|e| e.value().stats(*e.key())).collect();
    connections.sort_by_key(|c| c.id);
    ConnectionReport {
        total_connections: connections.len(),
        connections,
    }
}

/// Removes the connection's table entry when the socket task exits.
struct TableEntry {
    table: Arc<DashMap<ConsumerId, ConnectionInfo>>,
    id: ConsumerId,
}

impl TableEntry {
    fn register(table: &Arc<DashMap<ConsumerId, ConnectionInfo>>, id: ConsumerId, info: ConnectionInfo) -> Self {
        table.insert(id, info);
        Self {
            table: Arc::clone(table),
            id,
        }
    }

    fn touch(&self, info: &ConnectionInfo) {
        if let Some(mut entry) = self.table.get_mut(&self.id) {
            entry.last_seen = info.last_seen;
        }
    }
}

impl Drop for TableEntry {
    fn drop(&mut self) {
        self.table.remove(&self.id);
    }
}

/// Decrements the open-connection count when the socket task exits.
struct ConnectionSlot(Arc<std::sync::atomic::AtomicUsize>);

impl ConnectionSlot {
    fn acquire(counter: &Arc<std::sync::atomic::AtomicUsize>, max: usize) -> Option<Self> {
        counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .ok()
            .map(|_| Self(Arc::clone(counter)))
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// GET /ws
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<ApiState>,
    Query(query): Query<WsQuery>,
) -> Response {
    let mut filter = ConsumerFilter::all();
    if let Some(raw) = &query.session {
        match SessionId::parse(raw) {
            Some(id) => filter = ConsumerFilter::session(id),
            None => return ApiError::invalid_session_id(raw).into_response(),
        }
    }
    filter.threshold_only = query.threshold_only;

    let max = state.registry.config().websocket.max_connections;
    let Some(slot) = ConnectionSlot::acquire(&state.connections, max) else {
        warn!(max, "[WebSocket] Connection limit reached");
        return ApiError::connection_limit(max).into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, filter, slot))
        .into_response()
}

async fn handle_socket(socket: WebSocket, state: ApiState, filter: ConsumerFilter, _slot: ConnectionSlot) {
    let ws_config = state.registry.config().websocket.clone();
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.registry.hub().subscribe(filter);
    let mut conn = ConnectionInfo::new(filter);
    let entry = TableEntry::register(&state.connection_table, events.id(), conn);
    info!(consumer = events.id(), connections = state.connection_count(), "[WebSocket] Client connected");

    let welcome = json!({
        "type": "connection_established",
        "data": {
            "message": "Connected to confusion monitor",
            "timestamp": Utc::now(),
        }
    });
    if sender.send(Message::Text(welcome.to_string())).await.is_err() {
        return;
    }

    let heartbeat_period = Duration::from_secs(ws_config.heartbeat_interval_secs.max(1));
    let idle_timeout = Duration::from_secs(ws_config.idle_timeout_secs.max(1));
    let mut heartbeat = tokio::time::interval_at(Instant::now() + heartbeat_period, heartbeat_period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    debug!("[WebSocket] Event stream closed");
                    break;
                };
                let text = match serde_json::to_string(&event) {
                    Ok(t) => t,
                    Err(e) => {
                        warn!(error = %e, "[WebSocket] Failed to serialize event");
                        continue;
                    }
                };
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        conn.last_seen = Instant::now();
                        entry.touch(&conn);
                        if let Some(reply) = handle_client_message(&state, &text, &conn) {
                            if sender.send(Message::Text(reply.to_string())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        conn.last_seen = Instant::now();
                        entry.touch(&conn);
                    }
                    Some(Err(e)) => {
                        debug!(error = %e, "[WebSocket] Receive error");
                        break;
                    }
                }
            }
            _ = heartbeat.tick() => {
                if conn.last_seen.elapsed() >= idle_timeout {
                    info!(idle_secs = idle_timeout.as_secs(), "[WebSocket] Closing idle connection");
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    let dropped = events.dropped();
    drop(entry);
    events.unsubscribe();
    info!(dropped, "[WebSocket] Client disconnected");
}

/// Handle one client text frame. Returns the reply to send back, if any.
pub fn handle_client_message(state: &ApiState, text: &str, conn: &ConnectionInfo) -> Option<Value> {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "[WebSocket] Invalid JSON from client");
            return None;
        }
    };

    match message.kind.as_str() {
        "ping" => Some(json!({
            "type": "pong",
            "data": {
                "timestamp": Utc::now(),
                "clientTimestamp": message.data.get("timestamp").cloned().unwrap_or(Value::Null),
            }
        })),
        "set_threshold" => {
            let requested = match message.data.get("threshold") {
                None => crate::config::defaults::CONFUSION_THRESHOLD,
                Some(v) => match v.as_f64() {
                    Some(t) => t,
                    None => {
                        warn!(value = %v, "[WebSocket] Non-numeric threshold ignored");
                        return None;
                    }
                },
            };
            // Broadcast to every client as threshold_updated, this one included
            state.registry.set_threshold(requested, "client");
            None
        }
        "request_status" => Some(json!({
            "type": "status_response",
            "data": {
                "connectedClients": state.connection_count(),
                "serverTime": Utc::now(),
                "threshold": state.registry.threshold(),
                "activeSessions": state.registry.session_count(),
                "connection": {
                    "connectedSecs": conn.connected_at.elapsed().as_secs_f64(),
                    "lastMessageAgoSecs": conn.last_seen.elapsed().as_secs_f64(),
                },
            }
        })),
        other => {
            warn!(kind = other, "[WebSocket] Unknown message type");
            None
        }
    }
}
