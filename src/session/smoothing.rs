//! Score smoothing strategies
//!
//! Raw per-window scores are noisy; the smoothed level is what gets compared
//! against the threshold.

use std::collections::VecDeque;

use crate::config::{SmoothingConfig, SmoothingMethod};
use crate::types::clamp_unit;

#[derive(Debug, Clone, PartialEq)]
pub enum Smoother {
    /// `level = α·raw + (1−α)·level`, seeded with the first score
    Exponential { alpha: f64, level: Option<f64> },
    /// Mean of the most recent `window` scores
    MovingAverage { window: usize, recent: VecDeque<f64> },
    /// Raw score is the level
    PassThrough,
}

impl Smoother {
    pub fn from_config(config: &SmoothingConfig) -> Self {
        match config.method {
            SmoothingMethod::Exponential => Self::exponential(config.alpha),
            SmoothingMethod::MovingAverage => Self::moving_average(config.window),
            SmoothingMethod::None => Self::PassThrough,
        }
    }

    pub fn exponential(alpha: f64) -> Self {
        Self::Exponential {
            alpha: alpha.clamp(f64::EPSILON, 1.0),
            level: None,
        }
    }

    pub fn moving_average(window: usize) -> Self {
        let window = window.max(1);
        Self::MovingAverage {
            window,
            recent: VecDeque::with_capacity(window),
        }
    }

    /// Fold one raw score in and return the new level, within [0, 1].
    pub fn smooth(&mut self, raw: f64) -> f64 {
        let raw = clamp_unit(raw);
        let level = match self {
            Smoother::Exponential { alpha, level } => {
                let next = match *level {
                    Some(prev) => *alpha * raw + (1.0 - *alpha) * prev,
                    None => raw,
                };
                *level = Some(next);
                next
            }
            Smoother::MovingAverage { window, recent } => {
                if recent.len() == *window {
                    recent.pop_front();
                }
                recent.push_back(raw);
                recent.iter().sum::<f64>() / recent.len() as f64
            }
            Smoother::PassThrough => raw,
        };
        clamp_unit(level)
    }

    pub fn reset(&mut self) {
        match self {
            Smoother::Exponential { level, .. } => *level = None,
            Smoother::MovingAverage { recent, .. } => recent.clear(),
            Smoother::PassThrough => {}
        }
    }
}
