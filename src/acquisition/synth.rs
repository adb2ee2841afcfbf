//! Synthetic EEG generator
//!
//! Produces a reproducible multi-channel stream whose band content follows a
//! slow "confusion" cycle:
//!
//! - **Calm**: strong 10 Hz alpha, weak theta and beta
//! - **Confused**: alpha suppressed, 6 Hz theta and 20 Hz beta raised
//!
//! On top of that: Gaussian sensor noise, a small mains hum at the notch
//! frequency, and occasional eye-blink bursts on the frontal channels that
//! the conditioner should flag as artifacts.

use std::f64::consts::{PI, TAU};

use rand::prelude::*;
use rand_distr::{Distribution, Normal, NormalError};

use crate::config::{defaults, SignalConfig};
use crate::types::{Sample, EPOC_CHANNELS};

const ALPHA_HZ: f64 = 10.0;
const THETA_HZ: f64 = 6.0;
const BETA_HZ: f64 = 20.0;

/// Channel amplitudes (µV) at zero and full confusion
const ALPHA_UV: (f64, f64) = (20.0, 6.0);
const THETA_UV: (f64, f64) = (8.0, 22.0);
const BETA_UV: (f64, f64) = (6.0, 16.0);

const HUM_UV: f64 = 5.0;
const BLINK_UV: f64 = 350.0;
const BLINK_SECS: f64 = 0.2;

/// Frontal channels carrying blink artifacts (AF3, AF4 in the EPOC layout)
const FRONTAL: [&str; 2] = ["AF3", "AF4"];

/// Tunables for one synthetic stream.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthProfile {
    pub channel_count: usize,
    pub sampling_rate_hz: f64,
    pub mains_hz: f64,
    /// Length of one calm → confused → calm cycle
    pub episode_secs: f64,
    /// Chance per sample that a blink starts
    pub blink_probability: f64,
    /// Standard deviation of the sensor noise (µV)
    pub noise_uv: f64,
    /// Fixed seed for reproducible streams
    pub seed: Option<u64>,
}

impl SynthProfile {
    pub fn from_signal(signal: &SignalConfig, seed: Option<u64>) -> Self {
        Self {
            channel_count: signal.channel_count,
            sampling_rate_hz: signal.sampling_rate(),
            mains_hz: signal.notch_hz,
            episode_secs: defaults::SIMULATION_EPISODE_SECS,
            blink_probability: defaults::SIMULATION_BLINK_PROBABILITY,
            noise_uv: 2.0,
            seed,
        }
    }
}

impl Default for SynthProfile {
    fn default() -> Self {
        Self::from_signal(&SignalConfig::default(), None)
    }
}

pub struct SignalSynthesizer {
    profile: SynthProfile,
    rng: StdRng,
    noise: Normal<f64>,
    /// Per-channel phase offsets so channels are not identical
    phases: Vec<f64>,
    frontal: Vec<usize>,
    sample_index: u64,
    blink_remaining: usize,
    blink_len: usize,
}

impl SignalSynthesizer {
    pub fn new(profile: SynthProfile) -> Result<Self, NormalError> {
        let mut rng = match profile.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let noise = Normal::new(0.0, profile.noise_uv.max(0.0))?;
        let phases = (0..profile.channel_count)
            .map(|_| rng.gen_range(0.0..TAU))
            .collect();
        let frontal = if profile.channel_count == EPOC_CHANNELS.len() {
            EPOC_CHANNELS
                .iter()
                .enumerate()
                .filter(|(_, name)| FRONTAL.contains(*name))
                .map(|(i, _)| i)
                .collect()
        } else {
            vec![0]
        };
        let blink_len = ((BLINK_SECS * profile.sampling_rate_hz).round() as usize).max(1);

        Ok(Self {
            profile,
            rng,
            noise,
            phases,
            frontal,
            sample_index: 0,
            blink_remaining: 0,
            blink_len,
        })
    }

    pub fn profile(&self) -> &SynthProfile {
        &self.profile
    }

    /// Seconds of signal produced so far.
    pub fn elapsed_secs(&self) -> f64 {
        self.sample_index as f64 / self.profile.sampling_rate_hz
    }

    /// Confusion intensity in [0, 1] at time `t`; 0 at cycle start, 1 mid-cycle.
    pub fn intensity_at(&self, t: f64) -> f64 {
        0.5 - 0.5 * (TAU * t / self.profile.episode_secs).cos()
    }

    pub fn next_sample(&mut self) -> Sample {
        let t = self.elapsed_secs();
        self.sample_index += 1;

        let c = self.intensity_at(t);
        let lerp = |(lo, hi): (f64, f64)| lo + (hi - lo) * c;
        let (alpha, theta, beta) = (lerp(ALPHA_UV), lerp(THETA_UV), lerp(BETA_UV));

        if self.blink_remaining == 0 && self.rng.gen_bool(self.profile.blink_probability.clamp(0.0, 1.0)) {
            self.blink_remaining = self.blink_len;
        }
        let blink = if self.blink_remaining > 0 {
            let progress = 1.0 - self.blink_remaining as f64 / self.blink_len as f64;
            self.blink_remaining -= 1;
            BLINK_UV * (PI * progress).sin()
        } else {
            0.0
        };

        let hum = HUM_UV * (TAU * self.profile.mains_hz * t).sin();
        let channels = (0..self.profile.channel_count)
            .map(|ch| {
                let phase = self.phases[ch];
                let mut v = alpha * (TAU * ALPHA_HZ * t + phase).sin()
                    + theta * (TAU * THETA_HZ * t + phase * 0.5).sin()
                    + beta * (TAU * BETA_HZ * t + phase * 1.5).sin()
                    + hum
                    + self.noise.sample(&mut self.rng);
                if self.frontal.contains(&ch) {
                    v += blink;
                }
                v
            })
            .collect();

        Sample::new(t, channels)
    }
}
