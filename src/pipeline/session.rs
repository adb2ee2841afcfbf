//! Session Pipeline - stages 1 through 4 for one session
//!
//! Synchronous and single-owner. The runner feeds it one sample at a time and
//! decides what to publish from the returned [`SampleOutcome`].

use std::sync::Arc;

use thiserror::Error;
use tokio::time::Instant;

use crate::classifier::{ClassifierError, ConfusionClassifier};
use crate::config::MonitorConfig;
use crate::processing::{
    channel_labels, ActivityDecimator, ProcessingError, SignalConditioner, SignalStatistics, SignalSummary,
    WindowAggregator, WindowOutcome,
};
use crate::session::{SessionSnapshot, SessionTracker, TrackerError, TrackerUpdate};
use crate::types::{ActivityQuality, BrainActivity, DeviceInfo, Sample, SessionId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Sample rejected by the conditioner; the session continues
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// Window could not be scored; the session continues
    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    /// Session already ended
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

impl PipelineError {
    /// Everything except a finished session is skippable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, PipelineError::Tracker(_))
    }
}

/// What one sample produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    /// Buffered, no window completed
    Buffered,
    /// A window completed but had too many artifacts
    WindowDropped { timestamp: f64, artifact_fraction: f64 },
    /// A window was scored and folded into the session state
    Scored(TrackerUpdate),
}

/// Per-session counters.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStats {
    pub samples_received: u64,
    pub samples_rejected: u64,
    pub artifacts_flagged: u64,
    pub windows_emitted: u64,
    pub windows_dropped: u64,
    pub classifier_failures: u64,
    pub scores: u64,
    pub threshold_events: u64,
}

impl std::fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Session: {} samples ({} rejected, {} artifacts), {} windows ({} dropped), {} scores, {} events",
            self.samples_received,
            self.samples_rejected,
            self.artifacts_flagged,
            self.windows_emitted,
            self.windows_dropped,
            self.scores,
            self.threshold_events
        )
    }
}

pub struct SessionPipeline {
    session_id: SessionId,
    sampling_rate_hz: u32,
    conditioner: SignalConditioner,
    aggregator: WindowAggregator,
    classifier: Arc<dyn ConfusionClassifier>,
    tracker: SessionTracker,
    stats: PipelineStats,
    signal: SignalStatistics,
    activity: Option<ActivityDecimator>,
    pending_activity: Option<BrainActivity>,
}

impl SessionPipeline {
    pub fn new(
        session_id: SessionId,
        config: &MonitorConfig,
        classifier: Arc<dyn ConfusionClassifier>,
    ) -> Result<Self, ProcessingError> {
        let labels = channel_labels(config.signal.channel_count);
        let activity =
            ActivityDecimator::new(&labels, config.signal.sampling_rate(), config.fanout.brain_activity_hz);
        Ok(Self {
            session_id,
            sampling_rate_hz: config.signal.sampling_rate_hz,
            conditioner: SignalConditioner::new(&config.signal)?,
            aggregator: WindowAggregator::from_config(&config.window, &config.signal)?,
            classifier,
            tracker: SessionTracker::from_config(session_id, &config.detection),
            stats: PipelineStats::default(),
            signal: SignalStatistics::new(labels, config.signal.statistics_capacity()),
            activity,
            pending_activity: None,
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Per-channel statistics over the recent signal.
    pub fn signal_summary(&self) -> SignalSummary {
        self.signal.summary()
    }

    /// Describe the device feeding this session.
    pub fn device_info(&self, source: &str) -> DeviceInfo {
        DeviceInfo {
            source: source.to_string(),
            channel_count: self.conditioner.channel_count(),
            sampling_rate_hz: self.sampling_rate_hz,
            channels: self.signal.labels().to_vec(),
        }
    }

    /// Activity frame produced by the last sample, if one was due.
    pub fn take_activity(&mut self) -> Option<BrainActivity> {
        self.pending_activity.take()
    }

    /// Run one sample through conditioning, windowing, scoring and tracking.
    pub fn process_sample(
        &mut self,
        sample: &Sample,
        threshold: f64,
        now: Instant,
    ) -> Result<SampleOutcome, PipelineError> {
        if self.tracker.phase() == crate::types::SessionPhase::Ended {
            return Err(TrackerError::Ended(self.session_id).into());
        }
        self.stats.samples_received += 1;

        let conditioned = match self.conditioner.condition(sample) {
            Ok(c) => c,
            Err(e) => {
                self.stats.samples_rejected += 1;
                return Err(e.into());
            }
        };
        self.stats.artifacts_flagged = self.conditioner.artifacts_flagged();

        self.signal.push(&conditioned);
        if let Some(frame) = self.activity.as_mut().and_then(|d| d.push(&conditioned)) {
            self.pending_activity = Some(BrainActivity {
                session_id: self.session_id,
                timestamp: frame.timestamp,
                channels: frame.channels,
                quality: ActivityQuality {
                    artifact: frame.artifact,
                    artifact_fraction: self.signal.artifact_fraction(),
                },
            });
        }

        match self.aggregator.push(conditioned) {
            WindowOutcome::Pending => Ok(SampleOutcome::Buffered),
            WindowOutcome::Dropped {
                timestamp,
                artifact_fraction,
            } => {
                self.stats.windows_dropped += 1;
                Ok(SampleOutcome::WindowDropped {
                    timestamp,
                    artifact_fraction,
                })
            }
            WindowOutcome::Emitted(features) => {
                self.stats.windows_emitted += 1;
                let score = match self.classifier.classify(&features) {
                    Ok(s) => s,
                    Err(e) => {
                        self.stats.classifier_failures += 1;
                        return Err(e.into());
                    }
                };
                let update = self.tracker.update(score, threshold, now)?;
                self.stats.scores += 1;
                if update.event.is_some() {
                    self.stats.threshold_events += 1;
                }
                Ok(SampleOutcome::Scored(update))
            }
        }
    }

    /// Leave cooldown if the deadline has passed.
    pub fn expire_cooldown(&mut self, now: Instant) -> bool {
        self.tracker.expire_cooldown(now)
    }

    /// Terminal. Discards buffered samples and filter state.
    pub fn end(&mut self) {
        self.tracker.end();
        self.aggregator.reset();
        self.conditioner.reset();
        self.signal.reset();
        self.pending_activity = None;
        if let Some(activity) = self.activity.as_mut() {
            activity.reset();
        }
    }

    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        self.tracker.snapshot(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierError;
    use crate::types::FeatureVector;

    struct Constant(f64);

    impl ConfusionClassifier for Constant {
        fn score(&self, _: &FeatureVector) -> Result<f64, ClassifierError> {
            Ok(self.0)
        }
        fn name(&self) -> &'static str {
            "constant"
        }
    }

    struct Broken;

    impl ConfusionClassifier for Broken {
        fn score(&self, _: &FeatureVector) -> Result<f64, ClassifierError> {
            Err(ClassifierError::InvalidParameter("broken".to_string()))
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    fn pipeline(classifier: Arc<dyn ConfusionClassifier>) -> SessionPipeline {
        SessionPipeline::new(SessionId::new(), &MonitorConfig::default(), classifier).unwrap()
    }

    fn zeros(i: usize) -> Sample {
        Sample::zeros(i as f64 / 128.0, 14)
    }

    #[test]
    fn test_zero_samples_produce_two_windows() {
        let mut p = pipeline(Arc::new(Constant(0.1)));
        let now = Instant::now();
        let scored = (0..128)
            .filter(|i| matches!(p.process_sample(&zeros(*i), 0.7, now), Ok(SampleOutcome::Scored(_))))
            .count();
        assert_eq!(scored, 2);
        assert_eq!(p.stats().windows_emitted, 2);
        assert_eq!(p.stats().samples_received, 128);
    }

    #[test]
    fn test_scores_are_clamped() {
        let mut p = pipeline(Arc::new(Constant(3.0)));
        let now = Instant::now();
        let update = (0..50)
            .filter_map(|i| match p.process_sample(&zeros(i), 0.7, now) {
                Ok(SampleOutcome::Scored(u)) => Some(u),
                _ => None,
            })
            .next()
            .unwrap();
        assert_eq!(update.raw.value(), 1.0);
        assert!(update.event.is_some());
    }

    #[test]
    fn test_classifier_failure_skips_window() {
        let mut p = pipeline(Arc::new(Broken));
        let now = Instant::now();
        let mut failures = 0;
        for i in 0..50 {
            if let Err(e) = p.process_sample(&zeros(i), 0.7, now) {
                assert!(e.is_recoverable());
                failures += 1;
            }
        }
        assert_eq!(failures, 1);
        assert_eq!(p.stats().classifier_failures, 1);
        assert_eq!(p.tracker().level(), 0.0);
    }

    #[test]
    fn test_bad_sample_rejected_and_counted() {
        let mut p = pipeline(Arc::new(Constant(0.1)));
        let err = p
            .process_sample(&Sample::zeros(0.0, 3), 0.7, Instant::now())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Processing(ProcessingError::ChannelMismatch { .. })));
        assert_eq!(p.stats().samples_rejected, 1);
    }

    #[test]
    fn test_activity_frames_and_signal_summary() {
        let mut p = pipeline(Arc::new(Constant(0.1)));
        let now = Instant::now();
        // 8 Hz at 128 Hz sampling: every 16th sample
        let frames = (0..64)
            .filter(|i| {
                p.process_sample(&zeros(*i), 0.7, now).unwrap();
                p.take_activity().is_some()
            })
            .count();
        assert_eq!(frames, 4);
        assert!(p.take_activity().is_none());

        let summary = p.signal_summary();
        assert_eq!(summary.channels.len(), 14);
        assert_eq!(summary.channels[0].channel, "AF3");
        assert_eq!(summary.channels[0].samples, 64);
        assert_eq!(summary.artifact_fraction, 0.0);

        let device = p.device_info("replay");
        assert_eq!(device.channel_count, 14);
        assert_eq!(device.sampling_rate_hz, 128);
        assert_eq!(device.source, "replay");
    }

    #[test]
    fn test_ended_session_refuses_samples() {
        let mut p = pipeline(Arc::new(Constant(0.1)));
        p.end();
        let err = p.process_sample(&zeros(0), 0.7, Instant::now()).unwrap_err();
        assert!(!err.is_recoverable());
    }
}
