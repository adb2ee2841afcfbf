//! Simulated classifier for demos without a headset
//!
//! Ignores band content and drifts sinusoidally with the window timestamp,
//! so a dashboard shows rising and falling confusion and threshold events
//! on a predictable schedule.

use std::f64::consts::TAU;

use crate::types::FeatureVector;

use super::{check_features, ClassifierError, ConfusionClassifier};

const BASELINE: f64 = 0.5;
const AMPLITUDE: f64 = 0.35;

#[derive(Debug, Clone)]
pub struct SimulatedClassifier {
    period_secs: f64,
    channel_count: usize,
}

impl SimulatedClassifier {
    pub fn new(period_secs: f64, channel_count: usize) -> Result<Self, ClassifierError> {
        if !(period_secs.is_finite() && period_secs > 0.0) {
            return Err(ClassifierError::InvalidParameter(format!(
                "simulated_period_secs = {period_secs}"
            )));
        }
        Ok(Self {
            period_secs,
            channel_count,
        })
    }
}

impl ConfusionClassifier for SimulatedClassifier {
    fn score(&self, features: &FeatureVector) -> Result<f64, ClassifierError> {
        check_features(features, self.channel_count)?;
        let phase = TAU * features.timestamp / self.period_secs;
        Ok(BASELINE + AMPLITUDE * phase.sin())
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BandPowers;

    fn at(ts: f64) -> FeatureVector {
        FeatureVector {
            timestamp: ts,
            bands: vec![BandPowers::default(); 14],
            interpolated_samples: 0,
        }
    }

    #[test]
    fn test_follows_period() {
        let c = SimulatedClassifier::new(60.0, 14).unwrap();
        assert!((c.score(&at(0.0)).unwrap() - 0.5).abs() < 1e-12);
        assert!((c.score(&at(15.0)).unwrap() - 0.85).abs() < 1e-12);
        assert!((c.score(&at(45.0)).unwrap() - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_crosses_default_threshold_each_cycle() {
        let c = SimulatedClassifier::new(60.0, 14).unwrap();
        let above = (0..60)
            .filter(|t| c.score(&at(f64::from(*t))).unwrap() >= 0.7)
            .count();
        assert!(above > 0 && above < 60);
    }

    #[test]
    fn test_rejects_bad_period() {
        assert!(SimulatedClassifier::new(0.0, 14).is_err());
    }
}
