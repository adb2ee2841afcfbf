//! Second-order IIR sections (RBJ audio-EQ cookbook biquads)
//!
//! Each `Biquad` keeps its own transposed direct-form II state, so one
//! instance per channel per filter stage gives independent running memory.

use std::f64::consts::PI;

use super::ProcessingError;

/// Butterworth quality factor for the pass filters.
pub const BUTTERWORTH_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// One biquad section, coefficients normalised by `a0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl Biquad {
    /// High-pass at `cutoff_hz`, removing DC drift.
    pub fn highpass(cutoff_hz: f64, sampling_rate_hz: f64) -> Result<Self, ProcessingError> {
        let (cos_w0, alpha) = Self::prewarp(cutoff_hz, sampling_rate_hz, BUTTERWORTH_Q)?;
        let b = (1.0 + cos_w0) / 2.0;
        Ok(Self::normalised(b, -(1.0 + cos_w0), b, cos_w0, alpha))
    }

    /// Low-pass at `cutoff_hz`.
    pub fn lowpass(cutoff_hz: f64, sampling_rate_hz: f64) -> Result<Self, ProcessingError> {
        let (cos_w0, alpha) = Self::prewarp(cutoff_hz, sampling_rate_hz, BUTTERWORTH_Q)?;
        let b = (1.0 - cos_w0) / 2.0;
        Ok(Self::normalised(b, 1.0 - cos_w0, b, cos_w0, alpha))
    }

    /// Notch at `center_hz` with bandwidth `center_hz / q`.
    pub fn notch(center_hz: f64, sampling_rate_hz: f64, q: f64) -> Result<Self, ProcessingError> {
        let (cos_w0, alpha) = Self::prewarp(center_hz, sampling_rate_hz, q)?;
        Ok(Self::normalised(1.0, -2.0 * cos_w0, 1.0, cos_w0, alpha))
    }

    fn prewarp(cutoff_hz: f64, fs: f64, q: f64) -> Result<(f64, f64), ProcessingError> {
        if !(fs.is_finite() && fs > 0.0) {
            return Err(ProcessingError::InvalidSamplingRate(fs));
        }
        if !(cutoff_hz.is_finite() && cutoff_hz > 0.0 && cutoff_hz < fs / 2.0) || !(q > 0.0) {
            return Err(ProcessingError::InvalidCutoff {
                cutoff_hz,
                sampling_rate_hz: fs,
            });
        }
        let w0 = 2.0 * PI * cutoff_hz / fs;
        Ok((w0.cos(), w0.sin() / (2.0 * q)))
    }

    fn normalised(b0: f64, b1: f64, b2: f64, cos_w0: f64, alpha: f64) -> Self {
        let a0 = 1.0 + alpha;
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Filter one value, advancing the state.
    #[inline]
    pub fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }

    /// Clear running memory, keeping coefficients.
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f64 = 128.0;

    /// Steady-state peak amplitude of a sine after settling.
    fn response(filter: &mut Biquad, freq: f64) -> f64 {
        let n = 4096;
        let mut peak: f64 = 0.0;
        for i in 0..n {
            let x = (2.0 * PI * freq * i as f64 / FS).sin();
            let y = filter.process(x);
            if i > 3 * n / 4 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn test_highpass_removes_dc() {
        let mut hp = Biquad::highpass(1.0, FS).unwrap();
        let mut y = 0.0;
        for _ in 0..2000 {
            y = hp.process(100.0);
        }
        assert!(y.abs() < 1e-3, "DC leaked through: {y}");
    }

    #[test]
    fn test_lowpass_passes_alpha_attenuates_high() {
        let mut lp = Biquad::lowpass(20.0, FS).unwrap();
        assert!(response(&mut lp, 10.0) > 0.9);
        lp.reset();
        assert!(response(&mut lp, 50.0) < 0.2);
    }

    #[test]
    fn test_notch_suppresses_mains() {
        let mut notch = Biquad::notch(60.0, FS, 30.0).unwrap();
        assert!(response(&mut notch, 60.0) < 0.05);
        notch.reset();
        assert!(response(&mut notch, 10.0) > 0.95);
    }

    #[test]
    fn test_cutoff_above_nyquist_rejected() {
        assert!(matches!(
            Biquad::lowpass(70.0, FS),
            Err(ProcessingError::InvalidCutoff { .. })
        ));
        assert!(Biquad::highpass(f64::NAN, FS).is_err());
        assert!(matches!(
            Biquad::highpass(1.0, 0.0),
            Err(ProcessingError::InvalidSamplingRate(_))
        ));
    }

    #[test]
    fn test_reset_clears_state() {
        let mut hp = Biquad::highpass(1.0, FS).unwrap();
        let first = hp.process(50.0);
        hp.process(50.0);
        hp.reset();
        assert_eq!(hp.process(50.0), first);
    }
}
