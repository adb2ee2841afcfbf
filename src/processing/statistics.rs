//! Signal statistics and brain-activity decimation
//!
//! Both consume conditioned samples alongside the aggregator. Statistics keep
//! a rolling buffer per channel and are computed on demand for status
//! responses; the decimator picks a few frontal channels at a low rate for
//! the dashboard's live trace.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

use crate::types::{ConditionedSample, EPOC_CHANNELS};

/// Frontal channels streamed to the dashboard.
pub const KEY_CHANNELS: [&str; 6] = ["AF3", "AF4", "F3", "F4", "F7", "F8"];

/// Labels for `count` channels: the EPOC layout when it matches, else `CH1..`.
pub fn channel_labels(count: usize) -> Vec<String> {
    if count == EPOC_CHANNELS.len() {
        EPOC_CHANNELS.iter().map(|s| (*s).to_string()).collect()
    } else {
        (1..=count).map(|i| format!("CH{i}")).collect()
    }
}

/// Summary of one channel over the statistics window (µV).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatistics {
    pub channel: String,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub peak_to_peak: f64,
    pub samples: usize,
}

/// Per-session signal quality snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalSummary {
    /// Share of buffered samples flagged as artifacts
    pub artifact_fraction: f64,
    pub channels: Vec<ChannelStatistics>,
}

/// Rolling per-channel buffers over the last `capacity` conditioned samples.
#[derive(Debug)]
pub struct SignalStatistics {
    labels: Vec<String>,
    capacity: usize,
    buffers: Vec<VecDeque<f64>>,
    artifacts: VecDeque<bool>,
}

impl SignalStatistics {
    pub fn new(labels: Vec<String>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let buffers = labels.iter().map(|_| VecDeque::with_capacity(capacity)).collect();
        Self {
            labels,
            capacity,
            buffers,
            artifacts: VecDeque::with_capacity(capacity),
        }
    }

    /// Buffer one sample. Artifact samples count toward the artifact
    /// fraction but their values are kept out of the channel buffers.
    pub fn push(&mut self, sample: &ConditionedSample) {
        if self.artifacts.len() == self.capacity {
            self.artifacts.pop_front();
        }
        self.artifacts.push_back(sample.artifact);
        if sample.artifact {
            return;
        }
        for (buffer, value) in self.buffers.iter_mut().zip(&sample.channels) {
            if buffer.len() == self.capacity {
                buffer.pop_front();
            }
            buffer.push_back(*value);
        }
    }

    /// Statistics for one channel; `None` if unknown or nothing buffered.
    pub fn channel(&self, index: usize) -> Option<ChannelStatistics> {
        let buffer = self.buffers.get(index)?;
        if buffer.is_empty() {
            return None;
        }
        let n = buffer.len() as f64;
        let mean = buffer.iter().sum::<f64>() / n;
        let variance = buffer.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let min = buffer.iter().copied().fold(f64::INFINITY, f64::min);
        let max = buffer.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(ChannelStatistics {
            channel: self.labels[index].clone(),
            mean,
            std: variance.sqrt(),
            min,
            max,
            peak_to_peak: max - min,
            samples: buffer.len(),
        })
    }

    /// Share of buffered samples flagged as artifacts.
    pub fn artifact_fraction(&self) -> f64 {
        if self.artifacts.is_empty() {
            0.0
        } else {
            self.artifacts.iter().filter(|a| **a).count() as f64 / self.artifacts.len() as f64
        }
    }

    pub fn summary(&self) -> SignalSummary {
        SignalSummary {
            artifact_fraction: self.artifact_fraction(),
            channels: (0..self.buffers.len()).filter_map(|i| self.channel(i)).collect(),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn reset(&mut self) {
        self.buffers.iter_mut().for_each(VecDeque::clear);
        self.artifacts.clear();
    }
}

/// One decimated frame of frontal-channel voltages.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityFrame {
    pub timestamp: f64,
    pub channels: BTreeMap<String, f64>,
    pub artifact: bool,
}

/// Emits every `every`-th conditioned sample restricted to the key channels.
#[derive(Debug)]
pub struct ActivityDecimator {
    /// (channel index, label) pairs to forward
    picks: Vec<(usize, String)>,
    every: usize,
    counter: usize,
}

impl ActivityDecimator {
    /// `None` when `rate_hz` is zero (stream disabled).
    pub fn new(labels: &[String], sampling_rate_hz: f64, rate_hz: f64) -> Option<Self> {
        if !(rate_hz.is_finite() && rate_hz > 0.0) {
            return None;
        }
        let mut picks: Vec<(usize, String)> = KEY_CHANNELS
            .iter()
            .filter_map(|key| labels.iter().position(|l| l == key).map(|i| (i, (*key).to_string())))
            .collect();
        if picks.is_empty() {
            // Unknown layout, forward the leading channels instead
            picks = labels
                .iter()
                .take(KEY_CHANNELS.len())
                .cloned()
                .enumerate()
                .collect();
        }
        let every = (sampling_rate_hz / rate_hz).round().max(1.0) as usize;
        Some(Self { picks, every, counter: 0 })
    }

    pub fn push(&mut self, sample: &ConditionedSample) -> Option<ActivityFrame> {
        let due = self.counter == 0;
        self.counter = (self.counter + 1) % self.every;
        if !due {
            return None;
        }
        Some(ActivityFrame {
            timestamp: sample.timestamp,
            channels: self
                .picks
                .iter()
                .filter_map(|(i, label)| sample.channels.get(*i).map(|v| (label.clone(), *v)))
                .collect(),
            artifact: sample.artifact,
        })
    }

    pub fn every(&self) -> usize {
        self.every
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}
