//! Three-band parametric EQ
//!
//! Low shelf → peak → high shelf, each a biquad with its own per-channel
//! history. Coefficients are recomputed once per block from the current
//! parameter values, not per sample.

use std::f64::consts::PI;

/// Fixed slope of both shelves
pub const SHELF_Q: f64 = 0.71;

/// Filter shapes used by the EQ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    /// Bell curve boost/cut
    Peak,
    /// Boost/cut below frequency
    LowShelf,
    /// Boost/cut above frequency
    HighShelf,
}

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (a0 + a1*z^-1 + a2*z^-2)
/// Normalized: all coefficients divided by a0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BiquadCoeffs {
    /// Pass-through coefficients
    pub const IDENTITY: BiquadCoeffs = BiquadCoeffs {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Calculate biquad coefficients using Audio EQ Cookbook formulas
    /// Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html
    pub fn calculate(
        filter_type: FilterType,
        sample_rate: f64,
        frequency: f64,
        gain_db: f64,
        q: f64,
    ) -> Self {
        // Clamp frequency to valid range (below Nyquist)
        let freq = frequency.clamp(20.0, (sample_rate / 2.0 - 1.0).max(20.0));
        let q = q.clamp(0.1, 10.0);

        let w0 = 2.0 * PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);

        let a = 10.0_f64.powf(gain_db / 40.0);

        let (b0, b1, b2, a0, a1, a2) = match filter_type {
            FilterType::Peak => (
                1.0 + alpha * a,
                -2.0 * cos_w0,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w0,
                1.0 - alpha / a,
            ),
            FilterType::LowShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
            FilterType::HighShelf => {
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_sqrt_a_alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_sqrt_a_alpha),
                    (a + 1.0) - (a - 1.0) * cos_w0 + two_sqrt_a_alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - two_sqrt_a_alpha,
                )
            }
        };

        BiquadCoeffs {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Magnitude response at `frequency`, linear
    pub fn magnitude_at(&self, frequency: f64, sample_rate: f64) -> f64 {
        let w = 2.0 * PI * frequency / sample_rate;
        let (cos1, sin1) = (w.cos(), w.sin());
        let (cos2, sin2) = ((2.0 * w).cos(), (2.0 * w).sin());

        let num_re = self.b0 + self.b1 * cos1 + self.b2 * cos2;
        let num_im = -(self.b1 * sin1 + self.b2 * sin2);
        let den_re = 1.0 + self.a1 * cos1 + self.a2 * cos2;
        let den_im = -(self.a1 * sin1 + self.a2 * sin2);

        ((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im)).sqrt()
    }
}

/// Biquad filter history for one channel
#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadState {
    x1: f64, // x[n-1]
    x2: f64, // x[n-2]
    y1: f64, // y[n-1]
    y2: f64, // y[n-2]
}

impl BiquadState {
    /// Process a single sample (Direct Form I)
    #[inline]
    pub fn process(&mut self, input: f64, coeffs: &BiquadCoeffs) -> f64 {
        let output = coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// EQ parameter values read at the start of a block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqSettings {
    pub low_gain_db: f32,
    pub low_freq: f32,
    pub mid_gain_db: f32,
    pub mid_freq: f32,
    pub mid_q: f32,
    pub high_gain_db: f32,
    pub high_freq: f32,
}

impl Default for EqSettings {
    fn default() -> Self {
        Self {
            low_gain_db: 0.0,
            low_freq: 200.0,
            mid_gain_db: 0.0,
            mid_freq: 1000.0,
            mid_q: 0.8,
            high_gain_db: 0.0,
            high_freq: 8000.0,
        }
    }
}

/// Coefficients of the three bands, shared by every channel for one block
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EqCoefficients {
    pub low: BiquadCoeffs,
    pub mid: BiquadCoeffs,
    pub high: BiquadCoeffs,
}

impl EqCoefficients {
    pub fn from_settings(settings: &EqSettings, sample_rate: f64) -> Self {
        Self {
            low: BiquadCoeffs::calculate(
                FilterType::LowShelf,
                sample_rate,
                settings.low_freq as f64,
                settings.low_gain_db as f64,
                SHELF_Q,
            ),
            mid: BiquadCoeffs::calculate(
                FilterType::Peak,
                sample_rate,
                settings.mid_freq as f64,
                settings.mid_gain_db as f64,
                settings.mid_q as f64,
            ),
            high: BiquadCoeffs::calculate(
                FilterType::HighShelf,
                sample_rate,
                settings.high_freq as f64,
                settings.high_gain_db as f64,
                SHELF_Q,
            ),
        }
    }
}

/// Per-channel EQ history: one biquad state per band
#[derive(Debug, Clone, Copy, Default)]
pub struct EqState {
    low: BiquadState,
    mid: BiquadState,
    high: BiquadState,
}

impl EqState {
    #[inline]
    pub fn process_sample(&mut self, sample: f32, coeffs: &EqCoefficients) -> f32 {
        let x = sample as f64;
        let x = self.low.process(x, &coeffs.low);
        let x = self.mid.process(x, &coeffs.mid);
        self.high.process(x, &coeffs.high) as f32
    }

    pub fn reset(&mut self) {
        self.low.reset();
        self.mid.reset();
        self.high.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 48000.0;

    fn sine(frequency: f64, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * frequency * i as f64 / SR).sin() as f32)
            .collect()
    }

    fn rms(samples: &[f32]) -> f64 {
        let sum: f64 = samples.iter().map(|&s| (s as f64).powi(2)).sum();
        (sum / samples.len() as f64).sqrt()
    }

    fn run(settings: EqSettings, input: &[f32]) -> Vec<f32> {
        let coeffs = EqCoefficients::from_settings(&settings, SR);
        let mut state = EqState::default();
        input.iter().map(|&s| state.process_sample(s, &coeffs)).collect()
    }

    #[test]
    fn test_zero_gain_is_transparent() {
        let input = sine(1000.0, 4800);
        let output = run(EqSettings::default(), &input);
        for (a, b) in input.iter().zip(&output) {
            assert!((a - b).abs() < 1e-5, "Zero gain should pass through");
        }
    }

    #[test]
    fn test_zero_gain_unity_at_band_frequencies() {
        let coeffs = EqCoefficients::from_settings(&EqSettings::default(), SR);
        for f in [200.0, 1000.0, 8000.0] {
            assert!((coeffs.low.magnitude_at(f, SR) - 1.0).abs() < 1e-9);
            assert!((coeffs.mid.magnitude_at(f, SR) - 1.0).abs() < 1e-9);
            assert!((coeffs.high.magnitude_at(f, SR) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_peak_boost_at_center() {
        let settings = EqSettings {
            mid_gain_db: 12.0,
            mid_q: 1.0,
            ..Default::default()
        };
        let input = sine(1000.0, 9600);
        let output = run(settings, &input);

        // Skip the filter's settling time
        let gain = rms(&output[4800..]) / rms(&input[4800..]);
        assert!(gain > 3.5 && gain < 4.5, "Expected ~4x gain, got {}", gain);
    }

    #[test]
    fn test_low_shelf_boosts_lows_only() {
        let settings = EqSettings {
            low_gain_db: 12.0,
            low_freq: 300.0,
            ..Default::default()
        };
        let low = sine(60.0, 19200);
        let high = sine(6000.0, 19200);

        let low_gain = rms(&run(settings, &low)[9600..]) / rms(&low[9600..]);
        let high_gain = rms(&run(settings, &high)[9600..]) / rms(&high[9600..]);

        assert!(low_gain > 2.5, "Low frequencies should be boosted, got {}", low_gain);
        assert!(high_gain < 1.2, "High frequencies should be untouched, got {}", high_gain);
    }

    #[test]
    fn test_high_shelf_cuts_highs_only() {
        let settings = EqSettings {
            high_gain_db: -12.0,
            high_freq: 4000.0,
            ..Default::default()
        };
        let low = sine(200.0, 9600);
        let high = sine(12000.0, 9600);

        let low_gain = rms(&run(settings, &low)[4800..]) / rms(&low[4800..]);
        let high_gain = rms(&run(settings, &high)[4800..]) / rms(&high[4800..]);

        assert!(high_gain < 0.4, "High frequencies should be cut, got {}", high_gain);
        assert!(low_gain > 0.9, "Low frequencies should pass, got {}", low_gain);
    }

    #[test]
    fn test_frequency_clamped_below_nyquist() {
        let coeffs = BiquadCoeffs::calculate(FilterType::HighShelf, 22050.0, 16000.0, 6.0, SHELF_Q);
        assert!(coeffs.b0.is_finite() && coeffs.a1.is_finite());
    }

    #[test]
    fn test_reset_clears_history() {
        let settings = EqSettings {
            mid_gain_db: 9.0,
            ..Default::default()
        };
        let coeffs = EqCoefficients::from_settings(&settings, SR);
        let mut state = EqState::default();
        for s in sine(1000.0, 256) {
            state.process_sample(s, &coeffs);
        }
        state.reset();
        assert_eq!(state.process_sample(0.0, &coeffs), 0.0);
    }
}
