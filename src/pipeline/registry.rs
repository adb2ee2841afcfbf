//! Session registry - owns every running session and the live threshold.
//!
//! Each session is a spawned [`SessionRunner`] plus the handles needed to
//! observe and stop it. Sessions that end on their own (source EOF) remove
//! themselves; [`end_session`](SessionRegistry::end_session) stops one early.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::runner::{SessionReport, SessionRunner, SessionStatus};
use super::session::SessionPipeline;
use super::source::SampleSource;
use crate::classifier::ConfusionClassifier;
use crate::config::MonitorConfig;
use crate::fanout::EventHub;
use crate::processing::ProcessingError;
use crate::types::{clamp_unit, MonitorEvent, SessionId, ThresholdUpdated};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Session {0} not found")]
    NotFound(SessionId),

    #[error("Registry is shutting down")]
    ShuttingDown,

    #[error("Failed to build session pipeline: {0}")]
    Pipeline(#[from] ProcessingError),

    #[error("Session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

struct SessionHandle {
    started_at: DateTime<Utc>,
    cancel: CancellationToken,
    status: watch::Receiver<SessionStatus>,
    task: JoinHandle<SessionReport>,
}

/// Public view of one running session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub started_at: DateTime<Utc>,
    #[serde(flatten)]
    pub status: SessionStatus,
}

pub struct SessionRegistry {
    config: Arc<MonitorConfig>,
    hub: Arc<EventHub>,
    classifier: Arc<dyn ConfusionClassifier>,
    threshold: Arc<ArcSwap<f64>>,
    sessions: Arc<DashMap<SessionId, SessionHandle>>,
    cancel: CancellationToken,
}

impl SessionRegistry {
    pub fn new(
        config: Arc<MonitorConfig>,
        hub: Arc<EventHub>,
        classifier: Arc<dyn ConfusionClassifier>,
    ) -> Self {
        let threshold = Arc::new(ArcSwap::from_pointee(clamp_unit(config.detection.threshold)));
        Self {
            config,
            hub,
            classifier,
            threshold,
            sessions: Arc::new(DashMap::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn hub(&self) -> &Arc<EventHub> {
        &self.hub
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    /// Current detection threshold.
    pub fn threshold(&self) -> f64 {
        **self.threshold.load()
    }

    /// Replace the threshold for every session, effective from the next
    /// window. Clamped into [0, 1]; returns the stored value.
    pub fn set_threshold(&self, value: f64, updated_by: &str) -> f64 {
        let threshold = clamp_unit(value);
        let previous = *self.threshold.swap(Arc::new(threshold));
        info!(previous, threshold, updated_by, "[Registry] Threshold updated");
        self.hub.publish(MonitorEvent::ThresholdUpdated(ThresholdUpdated {
            threshold,
            updated_by: updated_by.to_string(),
            timestamp: Utc::now(),
        }));
        threshold
    }

    /// Spawn a session reading from `source`.
    pub fn start_session(&self, source: Box<dyn SampleSource>) -> Result<SessionId, RegistryError> {
        if self.cancel.is_cancelled() {
            return Err(RegistryError::ShuttingDown);
        }
        let session_id = SessionId::new();
        let pipeline = SessionPipeline::new(session_id, &self.config, Arc::clone(&self.classifier))?;
        let (runner, status) = SessionRunner::new(
            pipeline,
            source,
            Arc::clone(&self.hub),
            Arc::clone(&self.threshold),
        );

        let cancel = self.cancel.child_token();
        let task_cancel = cancel.clone();
        let sessions = Arc::clone(&self.sessions);
        let registry_cancel = self.cancel.clone();
        // Hold the runner until its handle is in the map, so self-removal
        // on EOF cannot run before insertion
        let (registered_tx, registered_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let _ = registered_rx.await;
            let report = runner.run(task_cancel).await;
            // Once shutdown has begun the handle belongs to `shutdown`, which
            // awaits and counts it. The check runs under the shard lock.
            sessions.remove_if(&session_id, |_, _| !registry_cancel.is_cancelled());
            report
        });

        self.sessions.insert(
            session_id,
            SessionHandle {
                started_at: Utc::now(),
                cancel,
                status,
                task,
            },
        );
        let _ = registered_tx.send(());
        info!(session = %session_id, active = self.sessions.len(), "[Registry] Session registered");
        Ok(session_id)
    }

    /// Stop a session and wait for its final report.
    pub async fn end_session(&self, session_id: SessionId) -> Result<SessionReport, RegistryError> {
        let (_, handle) = self
            .sessions
            .remove(&session_id)
            .ok_or(RegistryError::NotFound(session_id))?;
        handle.cancel.cancel();
        let report = handle.task.await?;
        info!(session = %session_id, reason = ?report.reason, "[Registry] Session ended");
        Ok(report)
    }

    pub fn get(&self, session_id: SessionId) -> Option<SessionInfo> {
        self.sessions.get(&session_id).map(|h| SessionInfo {
            started_at: h.started_at,
            status: h.status.borrow().clone(),
        })
    }

    /// All running sessions, oldest first.
    pub fn list(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> = self
            .sessions
            .iter()
            .map(|h| SessionInfo {
                started_at: h.started_at,
                status: h.status.borrow().clone(),
            })
            .collect();
        sessions.sort_by_key(|s| s.started_at);
        sessions
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Wait until `session_id` finishes on its own. `NotFound` if it already has.
    pub async fn wait(&self, session_id: SessionId) -> Result<(), RegistryError> {
        let mut status = self
            .sessions
            .get(&session_id)
            .map(|h| h.status.clone())
            .ok_or(RegistryError::NotFound(session_id))?;
        // The sender drops when the runner task completes
        while status.changed().await.is_ok() {}
        Ok(())
    }

    /// Cancel every session and wait for them to finish. Returns how many
    /// were still registered when shutdown began.
    pub async fn shutdown(&self) -> usize {
        self.cancel.cancel();
        let ids: Vec<SessionId> = self.sessions.iter().map(|e| *e.key()).collect();
        let mut ended = 0;
        for id in ids {
            if let Some((_, handle)) = self.sessions.remove(&id) {
                match handle.task.await {
                    Ok(_) => ended += 1,
                    Err(e) => warn!(session = %id, error = %e, "[Registry] Session task failed"),
                }
            }
        }
        info!(ended, "[Registry] All sessions stopped");
        ended
    }
}
