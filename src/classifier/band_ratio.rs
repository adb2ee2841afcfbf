//! Band-ratio confusion model
//!
//! Confusion shows up as more theta (mental effort), less alpha (less
//! relaxed) and more beta (cognitive load). Each indicator compares the
//! relative band power against a resting reference:
//!
//! ```text
//! score = 0.3·max(θ/θref − 1, 0) + 0.3·max(1 − α/αref, 0)
//!       + 0.2·max(β/βref − 1, 0) + 0.2·min(((θ+β)/α) / saturation, 1)
//! ```
//!
//! Ratios are capped at 2 so one band cannot dominate.

use crate::config::ClassifierConfig;
use crate::types::{BandPowers, FeatureVector};

use super::{check_features, ClassifierError, ConfusionClassifier};

const THETA_WEIGHT: f64 = 0.3;
const ALPHA_WEIGHT: f64 = 0.3;
const BETA_WEIGHT: f64 = 0.2;
const LOAD_WEIGHT: f64 = 0.2;
const RATIO_CAP: f64 = 2.0;
const ALPHA_FLOOR: f64 = 1e-3;

#[derive(Debug, Clone)]
pub struct BandRatioClassifier {
    reference: BandPowers,
    load_saturation: f64,
    channels: Vec<usize>,
    channel_count: usize,
}

impl BandRatioClassifier {
    pub fn new(config: &ClassifierConfig, channel_count: usize) -> Result<Self, ClassifierError> {
        for (name, v) in [
            ("reference_theta", config.reference_theta),
            ("reference_alpha", config.reference_alpha),
            ("reference_beta", config.reference_beta),
            ("load_saturation", config.load_saturation),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(ClassifierError::InvalidParameter(format!("{name} = {v}")));
            }
        }
        if let Some(&index) = config.channels.iter().find(|&&i| i >= channel_count) {
            return Err(ClassifierError::ChannelOutOfRange { index, channel_count });
        }
        Ok(Self {
            reference: BandPowers {
                theta: config.reference_theta,
                alpha: config.reference_alpha,
                beta: config.reference_beta,
                gamma: 0.0,
            },
            load_saturation: config.load_saturation,
            channels: config.channels.clone(),
            channel_count,
        })
    }

    fn selected(&self, features: &FeatureVector) -> BandPowers {
        if self.channels.is_empty() {
            BandPowers::mean(&features.bands)
        } else {
            let picked: Vec<BandPowers> = self.channels.iter().map(|&i| features.bands[i]).collect();
            BandPowers::mean(&picked)
        }
    }
}

impl ConfusionClassifier for BandRatioClassifier {
    fn score(&self, features: &FeatureVector) -> Result<f64, ClassifierError> {
        check_features(features, self.channel_count)?;

        let bands = self.selected(features);
        let total = bands.total();
        if total <= 0.0 {
            // Flat window, nothing to judge
            return Ok(0.0);
        }

        let theta = bands.theta / total;
        let alpha = bands.alpha / total;
        let beta = bands.beta / total;

        let theta_score = (theta / self.reference.theta).min(RATIO_CAP) - 1.0;
        let alpha_score = 1.0 - (alpha / self.reference.alpha).min(RATIO_CAP);
        let beta_score = (beta / self.reference.beta).min(RATIO_CAP) - 1.0;
        let load_index = (bands.theta + bands.beta) / bands.alpha.max(ALPHA_FLOOR * total);
        let load = (load_index / self.load_saturation).min(1.0);

        Ok(THETA_WEIGHT * theta_score.max(0.0)
            + ALPHA_WEIGHT * alpha_score.max(0.0)
            + BETA_WEIGHT * beta_score.max(0.0)
            + LOAD_WEIGHT * load)
    }

    fn name(&self) -> &'static str {
        "band_ratio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv(bands: BandPowers, channels: usize) -> FeatureVector {
        FeatureVector {
            timestamp: 1.0,
            bands: vec![bands; channels],
            interpolated_samples: 0,
        }
    }

    fn classifier() -> BandRatioClassifier {
        BandRatioClassifier::new(&ClassifierConfig::default(), 2).unwrap()
    }

    #[test]
    fn test_relaxed_alpha_scores_low() {
        let relaxed = BandPowers { theta: 1.0, alpha: 8.0, beta: 1.0, gamma: 0.5 };
        let s = classifier().classify(&fv(relaxed, 2)).unwrap();
        assert!(s.value() < 0.2, "{}", s.value());
    }

    #[test]
    fn test_theta_beta_heavy_scores_high() {
        let confused = BandPowers { theta: 6.0, alpha: 0.5, beta: 5.0, gamma: 0.5 };
        let s = classifier().classify(&fv(confused, 2)).unwrap();
        assert!(s.value() > 0.7, "{}", s.value());
    }

    #[test]
    fn test_score_always_in_unit_range() {
        let c = classifier();
        for bands in [
            BandPowers { theta: 1e9, alpha: 0.0, beta: 1e9, gamma: 0.0 },
            BandPowers { theta: 0.0, alpha: 1e-12, beta: 0.0, gamma: 1.0 },
            BandPowers { theta: 3.0, alpha: 3.0, beta: 3.0, gamma: 3.0 },
        ] {
            let s = c.classify(&fv(bands, 2)).unwrap().value();
            assert!((0.0..=1.0).contains(&s), "{s}");
        }
    }

    #[test]
    fn test_flat_window_scores_zero() {
        assert_eq!(classifier().score(&fv(BandPowers::default(), 2)).unwrap(), 0.0);
    }

    #[test]
    fn test_deterministic() {
        let c = classifier();
        let input = fv(BandPowers { theta: 2.0, alpha: 3.0, beta: 1.5, gamma: 0.2 }, 2);
        assert_eq!(c.score(&input).unwrap(), c.score(&input).unwrap());
    }

    #[test]
    fn test_malformed_vectors_rejected() {
        let c = classifier();
        assert_eq!(
            c.score(&fv(BandPowers::default(), 3)),
            Err(ClassifierError::DimensionMismatch { expected: 2, actual: 3 })
        );
        let nan = BandPowers { theta: f64::NAN, ..BandPowers::default() };
        assert_eq!(c.score(&fv(nan, 2)), Err(ClassifierError::NonFinite { channel: 0 }));
    }

    #[test]
    fn test_channel_selection_validated() {
        let config = ClassifierConfig {
            channels: vec![0, 5],
            ..ClassifierConfig::default()
        };
        assert!(matches!(
            BandRatioClassifier::new(&config, 2),
            Err(ClassifierError::ChannelOutOfRange { index: 5, .. })
        ));
    }
}
