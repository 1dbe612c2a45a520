//! Stereo algorithmic reverb
//!
//! Freeverb topology:
//! - 8 parallel lowpass-feedback comb filters per side
//! - 4 series allpass filters per side for diffusion
//! - right side offset by a fixed stereo spread
//!
//! Width is fixed at full stereo and the dry path is unity, so the stage
//! only returns the wet signal and the chain adds it to the dry input.

/// Mix level below which the stage is skipped
pub const MIX_EPSILON: f32 = 0.001;

/// Reference sample rate for Freeverb delays
const REFERENCE_SAMPLE_RATE: f64 = 44100.0;

/// Comb filter delays at 44100 Hz
const COMB_DELAYS: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];

/// Allpass filter delays at 44100 Hz
const ALLPASS_DELAYS: [usize; 4] = [556, 441, 341, 225];

/// Stereo spread offset in samples (for right channel)
const STEREO_SPREAD: usize = 23;

/// Fixed gain for allpass filters (standard Freeverb value)
const ALLPASS_GAIN: f32 = 0.5;

/// Scale factor for room size parameter to feedback
const ROOM_SCALE: f32 = 0.28;

/// Offset for room size parameter to feedback
const ROOM_OFFSET: f32 = 0.7;

/// Scale factor for damping parameter
const DAMP_SCALE: f32 = 0.4;

/// Input attenuation before the comb bank
const FIXED_GAIN: f32 = 0.015;

/// Wet level scale
const WET_SCALE: f32 = 3.0;

/// Room size derived from the decay and size controls
///
/// Decay dominates; size adds a little on top.
pub fn room_size(decay: f32, size: f32) -> f32 {
    (decay * 0.85 + size * 0.14).clamp(0.0, 1.0)
}

/// Reverb parameter values read at the start of a block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbSettings {
    pub decay: f32,
    pub size: f32,
    pub damping: f32,
    pub mix: f32,
}

impl Default for ReverbSettings {
    fn default() -> Self {
        Self {
            decay: 0.5,
            size: 0.5,
            damping: 0.3,
            mix: 0.0,
        }
    }
}

impl ReverbSettings {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.mix > MIX_EPSILON
    }

    pub fn room_size(&self) -> f32 {
        room_size(self.decay, self.size)
    }
}

/// Low-pass comb filter
///
/// y[n] = x[n - delay] with the damped output fed back into the line
#[derive(Debug, Clone, Default)]
struct CombFilter {
    buffer: Vec<f32>,
    write_pos: usize,
    mask: usize,
    delay: usize,
    /// Damping (one-pole low-pass) state
    filter_state: f32,
}

impl CombFilter {
    fn prepare(&mut self, delay: usize) {
        let size = (delay + 1).next_power_of_two();
        self.buffer.clear();
        self.buffer.resize(size, 0.0);
        self.mask = size - 1;
        self.delay = delay;
        self.write_pos = 0;
        self.filter_state = 0.0;
    }

    #[inline]
    fn process(&mut self, input: f32, coeffs: &CombCoeffs) -> f32 {
        let read_pos = (self.write_pos + self.mask + 1 - self.delay) & self.mask;
        let output = self.buffer[read_pos];

        self.filter_state = output * coeffs.damp1 + self.filter_state * coeffs.damp2;
        self.buffer[self.write_pos] = input + self.filter_state * coeffs.feedback;
        self.write_pos = (self.write_pos + 1) & self.mask;

        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.filter_state = 0.0;
        self.write_pos = 0;
    }
}

/// Schroeder allpass used for diffusion
#[derive(Debug, Clone, Default)]
struct AllpassFilter {
    buffer: Vec<f32>,
    write_pos: usize,
    mask: usize,
    delay: usize,
}

impl AllpassFilter {
    fn prepare(&mut self, delay: usize) {
        let size = (delay + 1).next_power_of_two();
        self.buffer.clear();
        self.buffer.resize(size, 0.0);
        self.mask = size - 1;
        self.delay = delay;
        self.write_pos = 0;
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let read_pos = (self.write_pos + self.mask + 1 - self.delay) & self.mask;
        let delayed = self.buffer[read_pos];

        let output = delayed - ALLPASS_GAIN * input;
        self.buffer[self.write_pos] = input + ALLPASS_GAIN * output;
        self.write_pos = (self.write_pos + 1) & self.mask;

        output
    }

    fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// Feedback and damping shared by every comb
#[derive(Debug, Clone, Copy, PartialEq)]
struct CombCoeffs {
    feedback: f32,
    damp1: f32,
    damp2: f32,
}

impl CombCoeffs {
    fn new(room_size: f32, damping: f32) -> Self {
        let damping = damping.clamp(0.0, 1.0) * DAMP_SCALE;
        Self {
            feedback: room_size.clamp(0.0, 1.0) * ROOM_SCALE + ROOM_OFFSET,
            damp1: 1.0 - damping,
            damp2: damping,
        }
    }
}

/// Comb bank and allpass chain for one side
#[derive(Debug, Clone, Default)]
struct ReverbSide {
    combs: [CombFilter; 8],
    allpasses: [AllpassFilter; 4],
}

impl ReverbSide {
    fn prepare(&mut self, sample_rate: f64, spread: usize) {
        let scale = sample_rate / REFERENCE_SAMPLE_RATE;
        let scaled = |base: usize| (((base + spread) as f64 * scale) as usize).max(1);

        for (comb, &base) in self.combs.iter_mut().zip(COMB_DELAYS.iter()) {
            comb.prepare(scaled(base));
        }
        for (allpass, &base) in self.allpasses.iter_mut().zip(ALLPASS_DELAYS.iter()) {
            allpass.prepare(scaled(base));
        }
    }

    #[inline]
    fn process(&mut self, input: f32, coeffs: &CombCoeffs) -> f32 {
        let mut out = 0.0;
        for comb in &mut self.combs {
            out += comb.process(input, coeffs);
        }
        for allpass in &mut self.allpasses {
            out = allpass.process(out);
        }
        out
    }

    fn clear(&mut self) {
        self.combs.iter_mut().for_each(CombFilter::clear);
        self.allpasses.iter_mut().for_each(AllpassFilter::clear);
    }
}

/// Stereo Freeverb
#[derive(Debug, Clone, Default)]
pub struct Reverb {
    left: ReverbSide,
    right: ReverbSide,
    coeffs: Option<CombCoeffs>,
    wet_gain: f32,
}

impl Reverb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate and scale every delay for `sample_rate`
    pub fn prepare(&mut self, sample_rate: f64) {
        self.left.prepare(sample_rate, 0);
        self.right.prepare(sample_rate, STEREO_SPREAD);
    }

    /// Whether [`Reverb::prepare`] has run
    pub fn is_prepared(&self) -> bool {
        !self.left.combs[0].buffer.is_empty()
    }

    /// Update coefficients from block settings. Does not allocate.
    pub fn set_parameters(&mut self, settings: &ReverbSettings) {
        self.coeffs = Some(CombCoeffs::new(settings.room_size(), settings.damping));
        self.wet_gain = settings.mix.clamp(0.0, 1.0) * WET_SCALE;
    }

    /// Wet output for one stereo frame
    #[inline]
    pub fn process_frame(&mut self, left: f32, right: f32) -> (f32, f32) {
        let Some(coeffs) = self.coeffs else {
            return (0.0, 0.0);
        };
        if !self.is_prepared() {
            return (0.0, 0.0);
        }

        let input = (left + right) * FIXED_GAIN;
        let out_l = self.left.process(input, &coeffs);
        let out_r = self.right.process(input, &coeffs);

        (out_l * self.wet_gain, out_r * self.wet_gain)
    }

    pub fn reset(&mut self) {
        self.left.clear();
        self.right.clear();
    }
}
