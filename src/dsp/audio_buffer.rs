//! Interleaved block of host audio

use std::slice::{ChunksExact, ChunksExactMut};

use crate::error::{KeroError, Result};

/// One block of interleaved samples: `[L0, R0, L1, R1, ...]`
///
/// Same layout as the host callback and WAV files, so blocks pass through
/// without reshuffling.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    /// Always at least 1
    num_channels: usize,
    sample_rate: f64,
}

impl AudioBuffer {
    /// Silent block of `frames` frames
    pub fn new(num_channels: usize, frames: usize, sample_rate: f64) -> Self {
        let num_channels = num_channels.max(1);
        Self {
            samples: vec![0.0; num_channels * frames],
            num_channels,
            sample_rate,
        }
    }

    /// Wrap interleaved samples. The length must be a whole number of frames.
    pub fn from_interleaved(
        samples: Vec<f32>,
        num_channels: usize,
        sample_rate: f64,
    ) -> Result<Self> {
        if num_channels == 0 || samples.len() % num_channels != 0 {
            return Err(KeroError::InvalidState {
                reason: format!(
                    "{} samples do not split into {}-channel frames",
                    samples.len(),
                    num_channels
                ),
            });
        }
        Ok(Self {
            samples,
            num_channels,
            sample_rate,
        })
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Frames (samples per channel)
    pub fn num_samples(&self) -> usize {
        self.samples.len() / self.num_channels
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    /// Frames in order, each `num_channels` long
    pub fn frames(&self) -> ChunksExact<'_, f32> {
        self.samples.chunks_exact(self.num_channels)
    }

    pub fn frames_mut(&mut self) -> ChunksExactMut<'_, f32> {
        self.samples.chunks_exact_mut(self.num_channels)
    }

    /// Write one sample; out-of-range positions are ignored
    #[inline]
    pub fn set(&mut self, frame: usize, channel: usize, value: f32) {
        if channel < self.num_channels {
            if let Some(s) = self.samples.get_mut(frame * self.num_channels + channel) {
                *s = value;
            }
        }
    }

    /// One channel's samples. An out-of-range channel yields nothing.
    pub fn channel(&self, channel: usize) -> impl Iterator<Item = f32> + '_ {
        let valid = channel < self.num_channels;
        self.frames()
            .filter(move |_| valid)
            .map(move |frame| frame[channel])
    }

    /// No NaN or infinite samples
    pub fn is_valid(&self) -> bool {
        self.samples.iter().all(|s| s.is_finite())
    }

    /// RMS level of a channel in dBFS
    pub fn rms_db(&self, channel: usize) -> f64 {
        let frames = self.num_samples();
        if channel >= self.num_channels || frames == 0 {
            return f64::NEG_INFINITY;
        }
        let energy: f64 = self.channel(channel).map(|s| f64::from(s * s)).sum();
        to_db((energy / frames as f64).sqrt())
    }

    /// Peak level of a channel in dBFS
    pub fn peak_db(&self, channel: usize) -> f64 {
        if channel >= self.num_channels {
            return f64::NEG_INFINITY;
        }
        let peak = self.channel(channel).fold(0.0f32, |m, s| m.max(s.abs()));
        to_db(f64::from(peak))
    }
}

fn to_db(level: f64) -> f64 {
    if level > 0.0 {
        20.0 * level.log10()
    } else {
        f64::NEG_INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_channels_become_mono() {
        let buf = AudioBuffer::new(0, 64, 48000.0);
        assert_eq!(buf.num_channels(), 1);
        assert_eq!(buf.num_samples(), 64);
    }

    #[test]
    fn test_ragged_interleaving_rejected() {
        assert!(AudioBuffer::from_interleaved(vec![0.0; 5], 2, 48000.0).is_err());
        assert!(AudioBuffer::from_interleaved(vec![0.0; 4], 0, 48000.0).is_err());
        assert_eq!(
            AudioBuffer::from_interleaved(vec![0.0; 6], 2, 48000.0)
                .unwrap()
                .num_samples(),
            3
        );
    }

    #[test]
    fn test_frames_and_channels() {
        let mut buf =
            AudioBuffer::from_interleaved(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 48000.0).unwrap();
        assert_eq!(buf.frames().count(), 3);
        assert_eq!(buf.channel(1).collect::<Vec<_>>(), vec![2.0, 4.0, 6.0]);
        assert_eq!(buf.channel(2).count(), 0);

        for frame in buf.frames_mut() {
            frame.swap(0, 1);
        }
        assert_eq!(buf.channel(0).collect::<Vec<_>>(), vec![2.0, 4.0, 6.0]);

        buf.set(9, 0, 1.0);
        buf.set(0, 7, 1.0);
        buf.set(2, 1, -1.0);
        assert_eq!(buf.samples(), &[2.0, 1.0, 4.0, 3.0, 6.0, -1.0]);
    }

    #[test]
    fn test_levels() {
        let square: Vec<f32> = (0..480).map(|i| if i % 2 == 0 { 0.5 } else { -0.5 }).collect();
        let buf = AudioBuffer::from_interleaved(square, 1, 48000.0).unwrap();
        assert!((buf.rms_db(0) + 6.02).abs() < 0.01);
        assert!((buf.peak_db(0) + 6.02).abs() < 0.01);

        let silent = AudioBuffer::new(2, 16, 48000.0);
        assert_eq!(silent.peak_db(1), f64::NEG_INFINITY);
        assert_eq!(silent.rms_db(3), f64::NEG_INFINITY);
    }

    #[test]
    fn test_non_finite_detected() {
        let mut buf = AudioBuffer::new(2, 8, 48000.0);
        assert!(buf.is_valid());
        buf.set(3, 1, f32::INFINITY);
        assert!(!buf.is_valid());
    }
}
