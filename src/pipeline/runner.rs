//! Session runner - one tokio task per session.
//!
//! Waits on three things at once: cancellation, the next sample, and the
//! cooldown deadline. Scored windows go to the hub; status snapshots go to a
//! `watch` channel so readers never touch the tracker.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::session::{PipelineStats, SampleOutcome, SessionPipeline};
use super::source::{SampleEvent, SampleSource};
use crate::fanout::EventHub;
use crate::processing::SignalSummary;
use crate::session::SessionSnapshot;
use crate::types::{BciStatus, MonitorEvent, SessionId};

/// Log a progress line every this many scored windows.
const PROGRESS_INTERVAL: u64 = 60;

/// Why the session stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Source reached end of data
    SourceExhausted,
    /// Source returned an unrecoverable error
    SourceFailed(String),
    /// Cancelled by the registry or shutdown
    Cancelled,
}

/// Status published after every change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    #[serde(flatten)]
    pub tracker: SessionSnapshot,
    pub source: String,
    pub classifier: String,
    pub stats: PipelineStats,
    /// Per-channel statistics over the recent signal
    pub signal: SignalSummary,
}

/// Final report returned when the runner exits.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub status: SessionStatus,
    pub reason: EndReason,
}

pub struct SessionRunner {
    pipeline: SessionPipeline,
    source: Box<dyn SampleSource>,
    hub: Arc<EventHub>,
    threshold: Arc<ArcSwap<f64>>,
    status_tx: watch::Sender<SessionStatus>,
}

impl SessionRunner {
    /// Returns the runner and a receiver for its status snapshots.
    pub fn new(
        pipeline: SessionPipeline,
        source: Box<dyn SampleSource>,
        hub: Arc<EventHub>,
        threshold: Arc<ArcSwap<f64>>,
    ) -> (Self, watch::Receiver<SessionStatus>) {
        let initial = SessionStatus {
            tracker: pipeline.snapshot(Instant::now()),
            source: source.source_name().to_string(),
            classifier: pipeline.classifier_name().to_string(),
            stats: pipeline.stats().clone(),
            signal: pipeline.signal_summary(),
        };
        let (status_tx, status_rx) = watch::channel(initial);
        (
            Self {
                pipeline,
                source,
                hub,
                threshold,
                status_tx,
            },
            status_rx,
        )
    }

    pub fn session_id(&self) -> SessionId {
        self.pipeline.session_id()
    }

    /// Drive the session until the source ends or `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) -> SessionReport {
        let session_id = self.pipeline.session_id();
        info!(
            session = %session_id,
            source = self.source.source_name(),
            classifier = self.pipeline.classifier_name(),
            "[Session] Started"
        );
        self.publish_device_status(true);

        let reason = loop {
            let deadline = self.pipeline.tracker().cooldown_deadline();

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!(session = %session_id, "[Session] Cancelled");
                    break EndReason::Cancelled;
                }

                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if self.pipeline.expire_cooldown(Instant::now()) {
                        debug!(session = %session_id, "[Session] Cooldown expired");
                        self.publish_status();
                    }
                }

                event = self.source.next_sample() => {
                    match event {
                        Ok(SampleEvent::Sample(sample)) => {
                            self.handle_sample(&sample);
                            if let Some(activity) = self.pipeline.take_activity() {
                                self.hub.publish(MonitorEvent::BrainActivity(activity));
                            }
                        }
                        Ok(SampleEvent::Eof) => {
                            info!(session = %session_id, "[Session] Source exhausted");
                            break EndReason::SourceExhausted;
                        }
                        Err(e) => {
                            error!(session = %session_id, error = %e, "[Session] Source failed");
                            break EndReason::SourceFailed(e.to_string());
                        }
                    }
                }
            }
        };

        self.finish(reason)
    }

    fn handle_sample(&mut self, sample: &crate::types::Sample) {
        let session_id = self.pipeline.session_id();
        let threshold = **self.threshold.load();

        match self.pipeline.process_sample(sample, threshold, Instant::now()) {
            Ok(SampleOutcome::Buffered) => {}
            Ok(SampleOutcome::WindowDropped {
                timestamp,
                artifact_fraction,
            }) => {
                debug!(
                    session = %session_id,
                    timestamp,
                    artifact_fraction,
                    "[Session] Window dropped for artifacts"
                );
                self.publish_status();
            }
            Ok(SampleOutcome::Scored(update)) => {
                self.hub
                    .publish(MonitorEvent::ConfusionUpdate(update.to_confusion_update(session_id)));
                if let Some(event) = update.event {
                    info!(
                        session = %session_id,
                        confusion = event.level,
                        threshold,
                        timestamp = event.timestamp,
                        "[Session] Confusion threshold exceeded"
                    );
                    self.hub.publish(MonitorEvent::ThresholdExceeded(event));
                }

                let scores = self.pipeline.stats().scores;
                if scores % PROGRESS_INTERVAL == 0 {
                    info!(
                        session = %session_id,
                        "📈 Progress: {} windows scored, level {:.3}, trend {:?}",
                        scores,
                        update.level,
                        update.trend
                    );
                }
                self.publish_status();
            }
            Err(e) if e.is_recoverable() => {
                warn!(session = %session_id, error = %e, "[Session] Skipping input");
            }
            Err(e) => {
                // Only reachable if something ended the tracker out of band
                error!(session = %session_id, error = %e, "[Session] Pipeline refused sample");
            }
        }
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            tracker: self.pipeline.snapshot(Instant::now()),
            source: self.source.source_name().to_string(),
            classifier: self.pipeline.classifier_name().to_string(),
            stats: self.pipeline.stats().clone(),
            signal: self.pipeline.signal_summary(),
        }
    }

    /// Device notices are process-wide, so the disconnect survives the
    /// session's purge on close.
    fn publish_device_status(&self, connected: bool) {
        self.hub.publish(MonitorEvent::BciStatus(BciStatus {
            session_id: self.pipeline.session_id(),
            connected,
            device_info: self.pipeline.device_info(self.source.source_name()),
            timestamp: chrono::Utc::now(),
        }));
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(self.status());
    }

    fn finish(mut self, reason: EndReason) -> SessionReport {
        let session_id = self.pipeline.session_id();
        // Final statistics are taken before `end` discards the buffers
        let signal = self.pipeline.signal_summary();
        self.pipeline.end();
        self.hub.close_session(session_id);
        self.publish_device_status(false);
        let status = SessionStatus {
            signal,
            ..self.status()
        };
        self.status_tx.send_replace(status.clone());

        let stats = &status.stats;
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("📊 SESSION {} FINAL STATISTICS", session_id);
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("   End reason:         {:?}", reason);
        info!("   Samples received:   {}", stats.samples_received);
        info!("   Samples rejected:   {}", stats.samples_rejected);
        info!("   Artifact samples:   {}", stats.artifacts_flagged);
        info!("   Windows emitted:    {}", stats.windows_emitted);
        info!("   Windows dropped:    {}", stats.windows_dropped);
        info!("   Classifier errors:  {}", stats.classifier_failures);
        info!("   Threshold events:   {}", stats.threshold_events);
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        SessionReport { status, reason }
    }
}
