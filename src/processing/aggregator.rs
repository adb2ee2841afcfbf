//! Windowed Feature Aggregator
//!
//! Fixed-length sliding buffer over conditioned samples. Once `size` samples
//! are buffered the window is evaluated exactly once, then the buffer advances
//! by `stride`. Windows with too many artifacts are dropped and counted.

use std::collections::VecDeque;

use tracing::debug;

use crate::config::{SignalConfig, WindowConfig};
use crate::types::{ConditionedSample, FeatureVector};

use super::{BandPowerAnalyzer, ProcessingError};

/// Result of pushing one sample.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowOutcome {
    /// Window not full yet
    Pending,
    /// Window complete, features extracted
    Emitted(FeatureVector),
    /// Window complete but rejected for artifact content
    Dropped {
        timestamp: f64,
        artifact_fraction: f64,
    },
}

/// Stage 2 of the session pipeline.
#[derive(Debug)]
pub struct WindowAggregator {
    size: usize,
    stride: usize,
    max_artifact_fraction: f64,
    analyzer: BandPowerAnalyzer,
    buffer: VecDeque<ConditionedSample>,
    windows_emitted: u64,
    windows_dropped: u64,
}

impl WindowAggregator {
    pub fn new(
        size: usize,
        stride: usize,
        max_artifact_fraction: f64,
        sampling_rate_hz: f64,
    ) -> Result<Self, ProcessingError> {
        if size == 0 || stride == 0 || stride > size {
            return Err(ProcessingError::InvalidWindow { size, stride });
        }
        Ok(Self {
            size,
            stride,
            max_artifact_fraction,
            analyzer: BandPowerAnalyzer::new(size, sampling_rate_hz)?,
            buffer: VecDeque::with_capacity(size),
            windows_emitted: 0,
            windows_dropped: 0,
        })
    }

    pub fn from_config(window: &WindowConfig, signal: &SignalConfig) -> Result<Self, ProcessingError> {
        Self::new(
            window.size,
            window.stride,
            window.max_artifact_fraction,
            signal.sampling_rate(),
        )
    }

    /// Buffer one sample, evaluating the window when it fills.
    pub fn push(&mut self, sample: ConditionedSample) -> WindowOutcome {
        self.buffer.push_back(sample);
        if self.buffer.len() < self.size {
            return WindowOutcome::Pending;
        }

        let outcome = self.evaluate();
        self.buffer.drain(..self.stride);
        outcome
    }

    fn evaluate(&mut self) -> WindowOutcome {
        let window = self.buffer.range(..self.size);
        let artifacts = window.clone().filter(|s| s.artifact).count();
        let artifact_fraction = artifacts as f64 / self.size as f64;
        let timestamp = self.buffer[self.size - 1].timestamp;

        if artifact_fraction > self.max_artifact_fraction {
            self.windows_dropped += 1;
            debug!(
                timestamp,
                artifact_fraction,
                dropped = self.windows_dropped,
                "Window dropped for artifact content"
            );
            return WindowOutcome::Dropped {
                timestamp,
                artifact_fraction,
            };
        }

        let channel_count = self.buffer[0].channels.len();
        let mut bands = Vec::with_capacity(channel_count);
        let mut trace = Vec::with_capacity(self.size);
        for ch in 0..channel_count {
            trace.clear();
            trace.extend(
                window
                    .clone()
                    .map(|s| (!s.artifact).then(|| s.channels.get(ch).copied().unwrap_or(0.0))),
            );
            let filled = interpolate_gaps(&trace);
            // The window always holds exactly `size` samples
            bands.push(self.analyzer.analyze(&filled).unwrap_or_default());
        }

        self.windows_emitted += 1;
        WindowOutcome::Emitted(FeatureVector {
            timestamp,
            bands,
            interpolated_samples: artifacts,
        })
    }

    /// Samples waiting for the next window.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn windows_emitted(&self) -> u64 {
        self.windows_emitted
    }

    pub fn windows_dropped(&self) -> u64 {
        self.windows_dropped
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.windows_emitted = 0;
        self.windows_dropped = 0;
    }
}

/// Replace gaps by linear interpolation between the nearest clean values.
/// Leading and trailing gaps take the nearest clean value; an all-gap trace
/// becomes zeros.
fn interpolate_gaps(trace: &[Option<f64>]) -> Vec<f64> {
    let clean: Vec<(usize, f64)> = trace
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();
    let (Some(&(first_i, first_v)), Some(&(last_i, last_v))) = (clean.first(), clean.last()) else {
        return vec![0.0; trace.len()];
    };

    let mut out = Vec::with_capacity(trace.len());
    let mut next = 0;
    for (i, v) in trace.iter().enumerate() {
        if let Some(v) = v {
            out.push(*v);
            next += 1;
            continue;
        }
        if i < first_i {
            out.push(first_v);
        } else if i > last_i {
            out.push(last_v);
        } else {
            let (li, lv) = clean[next - 1];
            let (ri, rv) = clean[next];
            let t = (i - li) as f64 / (ri - li) as f64;
            out.push(lv + (rv - lv) * t);
        }
    }
    out
}
