//! Spectrum hand-off between the audio thread and the analysis consumer
//!
//! The audio thread appends mono samples to [`SpectrumBridge`] under a short
//! `parking_lot` critical section. The UI-side [`SpectrumAnalyzer`] copies a
//! full window out under the same lock, releases it, and only then runs the
//! FFT and the band aggregation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::dsp::AudioBuffer;

/// Analysis window length (2^11)
pub const FFT_SIZE: usize = 2048;

/// Floor of every band estimate, in dB
pub const SPECTRUM_FLOOR_DB: f32 = -60.0;

/// Fraction of the distance to the new estimate covered per update
pub const BAND_SMOOTHING: f32 = 0.15;

/// Upper edge of the low band
pub const LOW_MID_SPLIT_HZ: f64 = 300.0;

/// Upper edge of the mid band
pub const MID_HIGH_SPLIT_HZ: f64 = 4000.0;

/// Upper edge of the high band
pub const HIGH_LIMIT_HZ: f64 = 20000.0;

#[derive(Debug)]
struct Fifo {
    samples: Vec<f32>,
    index: usize,
    ready: bool,
}

/// Lock-protected window of post-chain mono samples
#[derive(Debug)]
pub struct SpectrumBridge {
    fifo: Mutex<Fifo>,
    /// Sample rate the window was captured at, as f64 bits
    sample_rate: AtomicU64,
}

impl SpectrumBridge {
    pub fn new() -> Self {
        Self {
            fifo: Mutex::new(Fifo {
                samples: vec![0.0; FFT_SIZE],
                index: 0,
                ready: false,
            }),
            sample_rate: AtomicU64::new(0f64.to_bits()),
        }
    }

    /// Clear the window and record the stream's sample rate
    pub fn prepare(&self, sample_rate: f64) {
        let mut fifo = self.fifo.lock();
        fifo.samples.fill(0.0);
        fifo.index = 0;
        fifo.ready = false;
        self.sample_rate.store(sample_rate.to_bits(), Ordering::Release);
    }

    pub fn sample_rate(&self) -> f64 {
        f64::from_bits(self.sample_rate.load(Ordering::Acquire))
    }

    /// Append the (L+R)/2 mix of a block. Mono buffers feed the single channel.
    pub fn push_block(&self, buffer: &AudioBuffer) {
        let channels = buffer.num_channels();
        let mut fifo = self.fifo.lock();
        for frame in buffer.frames() {
            let left = frame[0];
            let right = if channels > 1 { frame[1] } else { left };
            fifo.push((left + right) * 0.5);
        }
    }

    /// Append raw mono samples
    pub fn push_samples(&self, samples: &[f32]) {
        let mut fifo = self.fifo.lock();
        for &sample in samples {
            fifo.push(sample);
        }
    }

    /// Copy a completed window into `out` and clear the ready flag.
    ///
    /// Returns `false` if no window has completed since the last take.
    pub fn take_window(&self, out: &mut [f32]) -> bool {
        let mut fifo = self.fifo.lock();
        if !fifo.ready {
            return false;
        }
        let n = out.len().min(FFT_SIZE);
        out[..n].copy_from_slice(&fifo.samples[..n]);
        fifo.ready = false;
        true
    }

    /// Whether a full window is waiting
    pub fn is_ready(&self) -> bool {
        self.fifo.lock().ready
    }
}

impl Fifo {
    #[inline]
    fn push(&mut self, sample: f32) {
        self.samples[self.index] = sample;
        self.index += 1;
        if self.index >= FFT_SIZE {
            self.ready = true;
            self.index = 0;
        }
    }
}

impl Default for SpectrumBridge {
    fn default() -> Self {
        Self::new()
    }
}

/// Smoothed low/mid/high levels in dB
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumBands {
    pub low: f32,
    pub mid: f32,
    pub high: f32,
}

impl Default for SpectrumBands {
    fn default() -> Self {
        Self {
            low: SPECTRUM_FLOOR_DB,
            mid: SPECTRUM_FLOOR_DB,
            high: SPECTRUM_FLOOR_DB,
        }
    }
}

impl SpectrumBands {
    /// Text summary sent alongside a suggestion request
    pub fn summary(&self) -> String {
        self.to_string()
    }

    fn smooth_toward(&mut self, target: &SpectrumBands) {
        self.low += BAND_SMOOTHING * (target.low - self.low);
        self.mid += BAND_SMOOTHING * (target.mid - self.mid);
        self.high += BAND_SMOOTHING * (target.high - self.high);
    }
}

impl fmt::Display for SpectrumBands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Low:{:.1}dB Mid:{:.1}dB High:{:.1}dB",
            self.low, self.mid, self.high
        )
    }
}

/// Hann-windowed FFT band analyzer
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    frame: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    bands: SpectrumBands,
}

impl SpectrumAnalyzer {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let window = (0..FFT_SIZE)
            .map(|i| {
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / FFT_SIZE as f32).cos())
            })
            .collect();

        Self {
            fft,
            window,
            frame: vec![0.0; FFT_SIZE],
            scratch: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            bands: SpectrumBands::default(),
        }
    }

    /// Current smoothed bands
    pub fn bands(&self) -> SpectrumBands {
        self.bands
    }

    /// Drain a ready window from `bridge` and fold it into the bands.
    ///
    /// Returns `true` if a window was analyzed. The bridge lock is held only
    /// while copying.
    pub fn update(&mut self, bridge: &SpectrumBridge) -> bool {
        if !bridge.take_window(&mut self.frame) {
            return false;
        }
        let sample_rate = bridge.sample_rate();
        if sample_rate <= 0.0 {
            return false;
        }
        let estimate = self.analyze(sample_rate);
        self.bands.smooth_toward(&estimate);
        true
    }

    /// Instantaneous band levels of the current frame
    fn analyze(&mut self, sample_rate: f64) -> SpectrumBands {
        for ((bin, &sample), &w) in self.scratch.iter_mut().zip(&self.frame).zip(&self.window) {
            *bin = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        let bins = FFT_SIZE / 2;
        let bin_width = sample_rate / FFT_SIZE as f64;
        let low_end = (LOW_MID_SPLIT_HZ / bin_width) as usize;
        let mid_end = (MID_HIGH_SPLIT_HZ / bin_width) as usize;
        let high_end = (HIGH_LIMIT_HZ / bin_width) as usize;

        SpectrumBands {
            // Bin 0 (DC) is excluded
            low: self.band_db(1, low_end, bins),
            mid: self.band_db(low_end, mid_end, bins),
            high: self.band_db(mid_end, high_end, bins),
        }
    }

    /// RMS of the bin magnitudes in `[start, end)`, normalized by the FFT size
    fn band_db(&self, start: usize, end: usize, bins: usize) -> f32 {
        let end = end.min(bins);
        if start >= end {
            return SPECTRUM_FLOOR_DB;
        }
        let sum: f32 = self.scratch[start..end].iter().map(|c| c.norm_sqr()).sum();
        let rms = (sum / (end - start) as f32).sqrt() / FFT_SIZE as f32;
        (20.0 * rms.log10()).max(SPECTRUM_FLOOR_DB)
    }
}

impl Default for SpectrumAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SpectrumAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyzer")
            .field("bands", &self.bands)
            .finish()
    }
}
