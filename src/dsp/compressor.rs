//! Feed-forward compressor
//!
//! Per-channel, hard knee, no lookahead. The gain computer works directly on
//! the instantaneous sample level; the gain-reduction value (in dB) is then
//! smoothed with separate one-pole attack and release coefficients.

/// Added to |x| before taking the log so silence maps to a finite level
const LEVEL_EPSILON: f32 = 1e-9;

/// Convert linear amplitude to dB
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    20.0 * linear.log10()
}

/// Convert dB to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// One-pole smoothing coefficient for a time constant in milliseconds
///
/// `exp(-1 / (sample_rate * time_ms * 0.001))`
pub fn time_constant_coeff(sample_rate: f64, time_ms: f32) -> f32 {
    let samples = sample_rate * time_ms as f64 * 0.001;
    if samples > 0.0 {
        (-1.0 / samples).exp() as f32
    } else {
        0.0
    }
}

/// Compressor parameter values read at the start of a block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorSettings {
    /// Threshold level in dB
    pub threshold_db: f32,
    /// Compression ratio (N:1)
    pub ratio: f32,
    /// Attack time in milliseconds
    pub attack_ms: f32,
    /// Release time in milliseconds
    pub release_ms: f32,
    /// Makeup gain in dB
    pub makeup_db: f32,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            threshold_db: -12.0,
            ratio: 4.0,
            attack_ms: 10.0,
            release_ms: 100.0,
            makeup_db: 0.0,
        }
    }
}

impl CompressorSettings {
    /// Static gain computer: target gain reduction (≤ 0 dB) for an input level
    #[inline]
    pub fn target_gain_db(&self, input_db: f32) -> f32 {
        let over = input_db - self.threshold_db;
        if over <= 0.0 {
            0.0
        } else {
            -over * (1.0 - 1.0 / self.ratio.max(1.0))
        }
    }
}

/// Block-rate constants derived from [`CompressorSettings`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorCoeffs {
    settings: CompressorSettings,
    attack: f32,
    release: f32,
    makeup: f32,
}

impl CompressorCoeffs {
    pub fn new(settings: CompressorSettings, sample_rate: f64) -> Self {
        Self {
            settings,
            attack: time_constant_coeff(sample_rate, settings.attack_ms),
            release: time_constant_coeff(sample_rate, settings.release_ms),
            makeup: db_to_linear(settings.makeup_db),
        }
    }
}

/// Per-channel compressor state
#[derive(Debug, Clone, Copy, Default)]
pub struct CompressorState {
    /// Last detected input level in dB (for metering)
    envelope_db: f32,
    /// Smoothed gain reduction in dB (≤ 0)
    gain_db: f32,
}

impl CompressorState {
    /// Compress one sample
    #[inline]
    pub fn process_sample(&mut self, sample: f32, coeffs: &CompressorCoeffs) -> f32 {
        let input_db = linear_to_db(sample.abs() + LEVEL_EPSILON);
        self.envelope_db = input_db;

        let target = coeffs.settings.target_gain_db(input_db);

        // More reduction → attack, less reduction → release
        let coeff = if target < self.gain_db {
            coeffs.attack
        } else {
            coeffs.release
        };
        self.gain_db = coeff * self.gain_db + (1.0 - coeff) * target;

        sample * db_to_linear(self.gain_db) * coeffs.makeup
    }

    /// Current smoothed gain reduction in dB
    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_db
    }

    /// Level of the most recent input sample in dB
    pub fn envelope_db(&self) -> f32 {
        self.envelope_db
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
