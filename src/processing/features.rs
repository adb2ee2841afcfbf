//! Band-power feature extraction using rustfft
//!
//! Power per EEG band from a mean-removed, Hann-windowed spectrum. The
//! transform is planned once per window length and reused for every
//! channel of every window.

use std::fmt;
use std::sync::Arc;

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::types::BandPowers;

use super::ProcessingError;

/// EEG frequency bands, half-open `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EegBand {
    Theta,
    Alpha,
    Beta,
    Gamma,
}

impl EegBand {
    pub const ALL: [EegBand; 4] = [EegBand::Theta, EegBand::Alpha, EegBand::Beta, EegBand::Gamma];

    /// Frequency range in Hz.
    pub fn range(self) -> (f64, f64) {
        match self {
            EegBand::Theta => (4.0, 8.0),
            EegBand::Alpha => (8.0, 13.0),
            EegBand::Beta => (13.0, 30.0),
            EegBand::Gamma => (30.0, 45.0),
        }
    }

    fn of(freq: f64) -> Option<EegBand> {
        Self::ALL.into_iter().find(|b| {
            let (lo, hi) = b.range();
            freq >= lo && freq < hi
        })
    }
}

// ============================================================================
// Band Power Analyzer (pre-planned for one window length)
// ============================================================================

/// Pre-planned FFT plus Hann taper for a fixed window length.
pub struct BandPowerAnalyzer {
    fft: Arc<dyn Fft<f64>>,
    size: usize,
    sampling_rate_hz: f64,
    taper: Vec<f64>,
    /// Positive-frequency bins that fall inside a band
    bins: Vec<(usize, EegBand)>,
    /// One-sided PSD scaling, integrated over the bin width
    scale: f64,
}

impl BandPowerAnalyzer {
    pub fn new(size: usize, sampling_rate_hz: f64) -> Result<Self, ProcessingError> {
        if !(sampling_rate_hz.is_finite() && sampling_rate_hz > 0.0) {
            return Err(ProcessingError::InvalidSamplingRate(sampling_rate_hz));
        }
        if size < 2 {
            return Err(ProcessingError::InvalidWindow { size, stride: size });
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);

        let taper: Vec<f64> = (0..size)
            .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / (size - 1) as f64).cos())
            .collect();
        let taper_energy: f64 = taper.iter().map(|w| w * w).sum();

        let df = sampling_rate_hz / size as f64;
        let bins = (1..=size / 2)
            .filter_map(|k| EegBand::of(k as f64 * df).map(|band| (k, band)))
            .collect();

        Ok(Self {
            fft,
            size,
            sampling_rate_hz,
            taper,
            bins,
            scale: 2.0 / (sampling_rate_hz * taper_energy) * df,
        })
    }

    /// Band powers (µV²) for one channel of one window.
    ///
    /// `signal` must hold exactly `size` samples.
    pub fn analyze(&self, signal: &[f64]) -> Result<BandPowers, ProcessingError> {
        if signal.len() != self.size {
            return Err(ProcessingError::InsufficientData {
                needed: self.size,
                available: signal.len(),
            });
        }

        let mean = signal.iter().sum::<f64>() / self.size as f64;
        let mut buffer: Vec<Complex<f64>> = signal
            .iter()
            .zip(&self.taper)
            .map(|(x, w)| Complex::new((x - mean) * w, 0.0))
            .collect();
        self.fft.process(&mut buffer);

        let mut out = BandPowers::default();
        for &(k, band) in &self.bins {
            let power = buffer[k].norm_sqr() * self.scale;
            match band {
                EegBand::Theta => out.theta += power,
                EegBand::Alpha => out.alpha += power,
                EegBand::Beta => out.beta += power,
                EegBand::Gamma => out.gamma += power,
            }
        }
        Ok(out)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Hz per bin.
    pub fn frequency_resolution(&self) -> f64 {
        self.sampling_rate_hz / self.size as f64
    }
}

impl fmt::Debug for BandPowerAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BandPowerAnalyzer")
            .field("size", &self.size)
            .field("sampling_rate_hz", &self.sampling_rate_hz)
            .field("bins", &self.bins.len())
            .finish()
    }
}

/// One-off band powers for an arbitrary-length signal.
///
/// Empty or single-sample input yields all-zero powers. Plans a transform
/// per call; use [`BandPowerAnalyzer`] for repeated windows.
pub fn band_powers(signal: &[f64], sampling_rate_hz: f64) -> BandPowers {
    BandPowerAnalyzer::new(signal.len(), sampling_rate_hz)
        .and_then(|analyzer| analyzer.analyze(signal))
        .unwrap_or_default()
}
