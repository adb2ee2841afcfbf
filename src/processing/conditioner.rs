//! Signal Conditioner - per-channel filtering and artifact flagging
//!
//! Each channel runs its own cascade `high-pass → low-pass → notch`; the
//! filter memory persists across calls so consecutive samples see a
//! continuous filter. Artifacts are flagged, never rejected: the aggregator
//! decides what to do with them.

use tracing::trace;

use crate::config::SignalConfig;
use crate::types::{ConditionedSample, Sample};

use super::{Biquad, ProcessingError};

#[derive(Debug, Clone)]
struct ChannelFilter {
    highpass: Biquad,
    lowpass: Biquad,
    notch: Biquad,
    /// Last conditioned value, for the gradient check
    previous: Option<f64>,
}

impl ChannelFilter {
    fn process(&mut self, x: f64) -> f64 {
        let y = self.highpass.process(x);
        let y = self.lowpass.process(y);
        self.notch.process(y)
    }

    fn reset(&mut self) {
        self.highpass.reset();
        self.lowpass.reset();
        self.notch.reset();
        self.previous = None;
    }
}

/// Stage 1 of the session pipeline.
#[derive(Debug, Clone)]
pub struct SignalConditioner {
    channels: Vec<ChannelFilter>,
    artifact_threshold_uv: f64,
    gradient_threshold_uv: Option<f64>,
    last_timestamp: Option<f64>,
    artifacts_flagged: u64,
}

impl SignalConditioner {
    /// Build one filter cascade per channel from the signal config.
    pub fn new(config: &SignalConfig) -> Result<Self, ProcessingError> {
        let fs = config.sampling_rate();
        let template = ChannelFilter {
            highpass: Biquad::highpass(config.highpass_hz, fs)?,
            lowpass: Biquad::lowpass(config.lowpass_hz, fs)?,
            notch: Biquad::notch(config.notch_hz, fs, config.notch_q)?,
            previous: None,
        };
        Ok(Self {
            channels: vec![template; config.channel_count],
            artifact_threshold_uv: config.artifact_threshold_uv,
            gradient_threshold_uv: config.gradient_threshold_uv,
            last_timestamp: None,
            artifacts_flagged: 0,
        })
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples flagged as artifacts since creation or the last reset.
    pub fn artifacts_flagged(&self) -> u64 {
        self.artifacts_flagged
    }

    /// Filter one raw sample.
    ///
    /// A sample with the wrong channel count or a timestamp that does not
    /// advance is rejected without touching filter state.
    pub fn condition(&mut self, sample: &Sample) -> Result<ConditionedSample, ProcessingError> {
        if sample.channels.len() != self.channels.len() {
            return Err(ProcessingError::ChannelMismatch {
                expected: self.channels.len(),
                actual: sample.channels.len(),
            });
        }
        if let Some(previous) = self.last_timestamp {
            // NaN timestamps fail this comparison too
            if !(sample.timestamp > previous) {
                return Err(ProcessingError::NonMonotonicTimestamp {
                    previous,
                    timestamp: sample.timestamp,
                });
            }
        }
        self.last_timestamp = Some(sample.timestamp);

        let mut artifact = false;
        let mut out = Vec::with_capacity(sample.channels.len());

        for (filter, &raw) in self.channels.iter_mut().zip(&sample.channels) {
            if !raw.is_finite() {
                // Keep NaN out of the filter memory
                artifact = true;
                out.push(0.0);
                continue;
            }

            let y = filter.process(raw);
            if y.abs() > self.artifact_threshold_uv {
                artifact = true;
            }
            if let (Some(limit), Some(prev)) = (self.gradient_threshold_uv, filter.previous) {
                if (y - prev).abs() > limit {
                    artifact = true;
                }
            }
            filter.previous = Some(y);
            out.push(y);
        }

        if artifact {
            self.artifacts_flagged += 1;
            trace!(timestamp = sample.timestamp, "Artifact sample flagged");
        }

        Ok(ConditionedSample {
            timestamp: sample.timestamp,
            channels: out,
            artifact,
        })
    }

    /// Clear all filter memory and the timestamp guard.
    pub fn reset(&mut self) {
        for c in &mut self.channels {
            c.reset();
        }
        self.last_timestamp = None;
        self.artifacts_flagged = 0;
    }
}
