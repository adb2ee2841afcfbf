//! Confusion Classifier - replaceable scoring strategy
//!
//! The pipeline only sees [`ConfusionClassifier`]; which implementation is
//! plugged in (real band-ratio model or the simulated demo drift) is decided
//! once at startup by [`build_classifier`].

mod band_ratio;
mod simulated;

pub use band_ratio::BandRatioClassifier;
pub use simulated::SimulatedClassifier;

use std::sync::Arc;

use thiserror::Error;

use crate::config::{ClassifierConfig, ClassifierKind, SignalConfig};
use crate::types::{ConfusionScore, FeatureVector};

/// Errors from scoring a single window. Always recoverable: the session
/// skips the window and keeps running.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("Feature dimension mismatch: expected {expected} channels, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Non-finite band power in channel {channel}")]
    NonFinite { channel: usize },

    #[error("Channel index {index} out of range for {channel_count} channels")]
    ChannelOutOfRange { index: usize, channel_count: usize },

    #[error("Invalid classifier parameter: {0}")]
    InvalidParameter(String),
}

/// Maps one window's features to a confusion score.
///
/// Implementations must be deterministic: identical input gives identical
/// output.
pub trait ConfusionClassifier: Send + Sync {
    /// Raw score. May fall outside [0, 1]; callers clamp via [`classify`](Self::classify).
    fn score(&self, features: &FeatureVector) -> Result<f64, ClassifierError>;

    /// Short name for logs and status responses.
    fn name(&self) -> &'static str;

    /// Score and clamp into a [`ConfusionScore`].
    fn classify(&self, features: &FeatureVector) -> Result<ConfusionScore, ClassifierError> {
        let raw = self.score(features)?;
        Ok(ConfusionScore::new(raw, features.timestamp))
    }
}

/// Construct the configured classifier.
pub fn build_classifier(
    config: &ClassifierConfig,
    signal: &SignalConfig,
) -> Result<Arc<dyn ConfusionClassifier>, ClassifierError> {
    let classifier: Arc<dyn ConfusionClassifier> = match config.kind {
        ClassifierKind::BandRatio => Arc::new(BandRatioClassifier::new(config, signal.channel_count)?),
        ClassifierKind::Simulated => Arc::new(SimulatedClassifier::new(
            config.simulated_period_secs,
            signal.channel_count,
        )?),
    };
    Ok(classifier)
}

/// Shared shape checks for implementations.
fn check_features(features: &FeatureVector, expected: usize) -> Result<(), ClassifierError> {
    if features.channel_count() != expected {
        return Err(ClassifierError::DimensionMismatch {
            expected,
            actual: features.channel_count(),
        });
    }
    if let Some(channel) = features.bands.iter().position(|b| !b.is_finite()) {
        return Err(ClassifierError::NonFinite { channel });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BandPowers;

    #[test]
    fn test_factory_selects_implementation() {
        let signal = SignalConfig::default();
        let mut config = ClassifierConfig::default();
        assert_eq!(build_classifier(&config, &signal).unwrap().name(), "band_ratio");
        config.kind = ClassifierKind::Simulated;
        assert_eq!(build_classifier(&config, &signal).unwrap().name(), "simulated");
    }

    #[test]
    fn test_classify_clamps() {
        struct Overshoot;
        impl ConfusionClassifier for Overshoot {
            fn score(&self, _: &FeatureVector) -> Result<f64, ClassifierError> {
                Ok(3.0)
            }
            fn name(&self) -> &'static str {
                "overshoot"
            }
        }
        let fv = FeatureVector {
            timestamp: 2.0,
            bands: vec![BandPowers::default()],
            interpolated_samples: 0,
        };
        let score = Overshoot.classify(&fv).unwrap();
        assert_eq!(score.value(), 1.0);
        assert_eq!(score.timestamp, 2.0);
    }
}
