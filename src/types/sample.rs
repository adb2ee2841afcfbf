//! EEG sample and feature types

use serde::{Deserialize, Serialize};

/// Channel layout of the 14-channel EMOTIV EPOC+ headset.
///
/// Used as the default layout for the simulator and as channel labels in
/// status responses. The pipeline itself only cares about the channel count.
pub const EPOC_CHANNELS: [&str; 14] = [
    "AF3", "F7", "F3", "FC5", "T7", "P7", "O1", "O2", "P8", "T8", "FC6", "F4", "F8", "AF4",
];

/// One multi-channel voltage reading from the headset (µV).
///
/// Produced continuously by a [`SampleSource`](crate::pipeline::source::SampleSource).
/// Timestamps are seconds on the device clock and must increase monotonically
/// within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds on the device clock
    pub timestamp: f64,
    /// Per-channel voltage (µV), fixed channel count per session
    pub channels: Vec<f64>,
}

impl Sample {
    pub fn new(timestamp: f64, channels: Vec<f64>) -> Self {
        Self { timestamp, channels }
    }

    /// All-zero sample with the given channel count.
    pub fn zeros(timestamp: f64, channel_count: usize) -> Self {
        Self {
            timestamp,
            channels: vec![0.0; channel_count],
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// A sample after filtering, carrying the artifact flag.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionedSample {
    pub timestamp: f64,
    pub channels: Vec<f64>,
    /// Set when any channel exceeded the amplitude or gradient limit, or
    /// was not a finite number. Artifact samples keep their slot in the
    /// window but are excluded from feature computation.
    pub artifact: bool,
}

/// Spectral power per EEG band for a single channel (µV²).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandPowers {
    /// 4-8 Hz, mental effort
    pub theta: f64,
    /// 8-13 Hz, relaxed wakefulness
    pub alpha: f64,
    /// 13-30 Hz, active cognitive load
    pub beta: f64,
    /// 30-45 Hz
    pub gamma: f64,
}

impl BandPowers {
    /// Number of scalar features contributed per channel.
    pub const LEN: usize = 4;

    pub fn total(&self) -> f64 {
        self.theta + self.alpha + self.beta + self.gamma
    }

    pub fn is_finite(&self) -> bool {
        self.theta.is_finite()
            && self.alpha.is_finite()
            && self.beta.is_finite()
            && self.gamma.is_finite()
    }

    /// Element-wise mean over a set of channels.
    pub fn mean(channels: &[BandPowers]) -> BandPowers {
        if channels.is_empty() {
            return BandPowers::default();
        }
        let n = channels.len() as f64;
        let mut acc = BandPowers::default();
        for c in channels {
            acc.theta += c.theta;
            acc.alpha += c.alpha;
            acc.beta += c.beta;
            acc.gamma += c.gamma;
        }
        BandPowers {
            theta: acc.theta / n,
            alpha: acc.alpha / n,
            beta: acc.beta / n,
            gamma: acc.gamma / n,
        }
    }
}

/// Fixed-size numeric summary of one window.
///
/// Owned transiently between the aggregator and the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Timestamp of the last sample in the window
    pub timestamp: f64,
    /// One entry per channel, in channel order
    pub bands: Vec<BandPowers>,
    /// Artifact samples that were interpolated before feature extraction
    pub interpolated_samples: usize,
}

impl FeatureVector {
    /// Total number of scalar features (`channels × BandPowers::LEN`).
    pub fn len(&self) -> usize {
        self.bands.len() * BandPowers::LEN
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn channel_count(&self) -> usize {
        self.bands.len()
    }

    /// Flattened view `[θ0, α0, β0, γ0, θ1, ...]`.
    pub fn to_flat(&self) -> Vec<f64> {
        self.bands
            .iter()
            .flat_map(|b| [b.theta, b.alpha, b.beta, b.gamma])
            .collect()
    }
}
