//! Signal processing module - conditioning, windowing and band-power features
//!
//! Stages 1 and 2 of the per-session pipeline:
//!
//! ```text
//! Sample → SignalConditioner → ConditionedSample → WindowAggregator → FeatureVector
//! ```
//!
//! Both stages are synchronous and own their state exclusively; the session
//! runner drives them one sample at a time.

mod aggregator;
mod conditioner;
mod features;
mod filters;
mod statistics;

pub use aggregator::{WindowAggregator, WindowOutcome};
pub use conditioner::SignalConditioner;
pub use features::{band_powers, BandPowerAnalyzer, EegBand};
pub use filters::Biquad;
pub use statistics::{
    channel_labels, ActivityDecimator, ActivityFrame, ChannelStatistics, SignalStatistics, SignalSummary,
    KEY_CHANNELS,
};

use thiserror::Error;

/// Errors in signal processing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessingError {
    #[error("Channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("Non-monotonic timestamp: {timestamp} after {previous}")]
    NonMonotonicTimestamp { previous: f64, timestamp: f64 },

    #[error("Invalid cutoff frequency: {cutoff_hz} Hz at {sampling_rate_hz} Hz sampling")]
    InvalidCutoff { cutoff_hz: f64, sampling_rate_hz: f64 },

    #[error("Invalid sampling rate: {0}")]
    InvalidSamplingRate(f64),

    #[error("Invalid window: size {size}, stride {stride}")]
    InvalidWindow { size: usize, stride: usize },

    #[error("Insufficient data: need {needed} samples, got {available}")]
    InsufficientData { needed: usize, available: usize },
}
