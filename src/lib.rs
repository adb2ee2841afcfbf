//! Confusion Monitor: real-time EEG confusion detection
//!
//! Per-session signal pipeline for a brain-computer-interface learning
//! assistant, with event fan-out to dashboards and a help generator.
//!
//! ## Architecture
//!
//! - **Processing**: signal conditioning, windowing and band-power features
//! - **Classifier**: pluggable feature → confusion score strategy
//! - **Session**: smoothing, thresholding and cooldown per session
//! - **Fan-out**: bounded, non-blocking delivery to any number of consumers
//! - **Pipeline**: sample sources, per-session runner tasks and the registry
//! - **Help**: threshold events in, ranked suggestions out
//! - **API**: REST status/control and the `/ws` event stream

pub mod acquisition;
pub mod api;
pub mod classifier;
pub mod config;
pub mod fanout;
pub mod help;
pub mod pipeline;
pub mod processing;
pub mod session;
pub mod types;

// Re-export configuration
pub use config::MonitorConfig;

// Re-export commonly used types
pub use types::{
    ConfusionScore, ConfusionUpdate, FeatureVector, MonitorEvent, Sample, SessionId,
    SessionPhase, ThresholdEvent,
};

// Re-export pipeline components
pub use classifier::{build_classifier, ConfusionClassifier};
pub use fanout::{ConsumerFilter, EventHub, Subscription};
pub use pipeline::{SampleSource, SessionRegistry};
