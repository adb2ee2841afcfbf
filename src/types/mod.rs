//! Shared data structures for the confusion-detection pipeline
//!
//! This module defines the core types that flow between pipeline stages:
//! - Stage 1: Sample, ConditionedSample (device input / conditioner output)
//! - Stage 2: FeatureVector, BandPowers (aggregator output)
//! - Stage 3: ConfusionScore (classifier output)
//! - Stage 4: ConfusionUpdate, ThresholdEvent (session tracker output)
//! - Stage 5: MonitorEvent (fan-out wire envelope)

mod sample;
mod confusion;
mod events;

pub use sample::*;
pub use confusion::*;
pub use events::*;
