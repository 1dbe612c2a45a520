//! Feedback delay line
//!
//! One circular buffer per channel, allocated at stream setup for the
//! longest delay time plus headroom. Processing never resizes it.

/// Mix level below which the stage is skipped
pub const MIX_EPSILON: f32 = 0.001;

/// Longest delay time the buffer must hold, in seconds
pub const MAX_DELAY_SECONDS: f64 = 1.0;

/// Extra buffer beyond the longest delay, in seconds
pub const HEADROOM_SECONDS: f64 = 0.1;

/// Delay parameter values read at the start of a block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelaySettings {
    /// Delay time in seconds
    pub time_seconds: f32,
    /// Feedback amount (0 to 0.9)
    pub feedback: f32,
    /// Wet level added to the dry signal
    pub mix: f32,
}

impl Default for DelaySettings {
    fn default() -> Self {
        Self {
            time_seconds: 0.4,
            feedback: 0.3,
            mix: 0.0,
        }
    }
}

impl DelaySettings {
    /// Whether the stage has any audible effect
    #[inline]
    pub fn is_active(&self) -> bool {
        self.mix > MIX_EPSILON
    }
}

/// Buffer length needed for `sample_rate`
pub fn buffer_len_for(sample_rate: f64) -> usize {
    ((sample_rate * (MAX_DELAY_SECONDS + HEADROOM_SECONDS)).ceil() as usize).max(1)
}

/// Per-channel circular delay buffer
#[derive(Debug, Clone, Default)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Allocate for `sample_rate`. Call from the setup path only.
    pub fn prepare(&mut self, sample_rate: f64) {
        let len = buffer_len_for(sample_rate);
        self.buffer.clear();
        self.buffer.resize(len, 0.0);
        self.write_pos = 0;
    }

    /// Buffer capacity in samples
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Delay in whole samples for a time, clamped to the buffer capacity
    pub fn delay_samples(&self, sample_rate: f64, time_seconds: f32) -> usize {
        let samples = (sample_rate * time_seconds.max(0.0) as f64).round() as usize;
        samples.min(self.buffer.len().saturating_sub(1))
    }

    /// Run one sample through the line
    ///
    /// Reads `delay` samples behind the cursor, writes `dry + wet * feedback`
    /// and returns `dry + wet * mix`.
    #[inline]
    pub fn process_sample(&mut self, dry: f32, delay: usize, settings: &DelaySettings) -> f32 {
        let len = self.buffer.len();
        if len == 0 {
            return dry;
        }

        let read_pos = (self.write_pos + len - delay) % len;
        let wet = self.buffer[read_pos];

        self.buffer[self.write_pos] = dry + wet * settings.feedback;
        self.write_pos = (self.write_pos + 1) % len;

        dry + wet * settings.mix
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
