//! Fixed-order signal chain
//!
//! EQ → compressor → delay → reverb → output trim. Parameters are read once
//! per block into [`BlockParams`]; per-channel filter and envelope state lives
//! in [`ChannelState`], owned by the chain and indexed by channel number.

use super::compressor::{CompressorCoeffs, CompressorSettings, CompressorState};
use super::delay::{DelayLine, DelaySettings};
use super::eq::{EqCoefficients, EqSettings, EqState};
use super::reverb::{Reverb, ReverbSettings};
use super::AudioBuffer;
use crate::error::{KeroError, Result};
use crate::params::{ParamId, ParamValues, ParameterStore};

/// Most channels the chain processes
pub const MAX_CHANNELS: usize = 2;

/// Every parameter the chain needs for one block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockParams {
    pub eq: EqSettings,
    pub compressor: CompressorSettings,
    pub delay: DelaySettings,
    pub reverb: ReverbSettings,
    /// Master gain, 0 to 1
    pub output: f32,
}

impl Default for BlockParams {
    fn default() -> Self {
        Self::from_values(&ParamValues::defaults())
    }
}

impl BlockParams {
    /// Read the current store values. Lock-free.
    pub fn read(store: &ParameterStore) -> Self {
        Self::build(|id| store.get(id))
    }

    pub fn from_values(values: &ParamValues) -> Self {
        Self::build(|id| values.get(id))
    }

    fn build(get: impl Fn(ParamId) -> f32) -> Self {
        Self {
            eq: EqSettings {
                low_gain_db: get(ParamId::LowGain),
                low_freq: get(ParamId::LowFreq),
                mid_gain_db: get(ParamId::MidGain),
                mid_freq: get(ParamId::MidFreq),
                mid_q: get(ParamId::MidQ),
                high_gain_db: get(ParamId::HighGain),
                high_freq: get(ParamId::HighFreq),
            },
            compressor: CompressorSettings {
                threshold_db: get(ParamId::CompThreshold),
                ratio: get(ParamId::CompRatio),
                attack_ms: get(ParamId::CompAttack),
                release_ms: get(ParamId::CompRelease),
                makeup_db: get(ParamId::CompMakeup),
            },
            delay: DelaySettings {
                time_seconds: get(ParamId::DelayTime),
                feedback: get(ParamId::DelayFeedback),
                mix: get(ParamId::DelayMix),
            },
            reverb: ReverbSettings {
                decay: get(ParamId::ReverbDecay),
                size: get(ParamId::ReverbSize),
                damping: get(ParamId::ReverbDamp),
                mix: get(ParamId::ReverbMix),
            },
            output: get(ParamId::Output),
        }
    }
}

/// Filter, envelope and delay state for one channel
#[derive(Debug, Clone, Default)]
pub struct ChannelState {
    pub eq: EqState,
    pub compressor: CompressorState,
    pub delay: DelayLine,
}

impl ChannelState {
    fn prepare(&mut self, sample_rate: f64) {
        self.eq.reset();
        self.compressor.reset();
        self.delay.prepare(sample_rate);
    }

    fn reset(&mut self) {
        self.eq.reset();
        self.compressor.reset();
        self.delay.reset();
    }
}

/// The per-block DSP chain
#[derive(Debug, Clone, Default)]
pub struct SignalChain {
    sample_rate: f64,
    channels: [ChannelState; MAX_CHANNELS],
    reverb: Reverb,
}

impl SignalChain {
    /// Unprepared chain; blocks are skipped until [`SignalChain::prepare`] succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate every buffer for `sample_rate` and clear all state.
    ///
    /// A non-positive or non-finite rate leaves the chain unprepared.
    pub fn prepare(&mut self, sample_rate: f64) -> Result<()> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            self.sample_rate = 0.0;
            return Err(KeroError::InvalidSampleRate { sample_rate });
        }

        self.sample_rate = sample_rate;
        for channel in &mut self.channels {
            channel.prepare(sample_rate);
        }
        self.reverb.prepare(sample_rate);
        Ok(())
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn is_prepared(&self) -> bool {
        self.sample_rate > 0.0
    }

    /// Clear filter histories, envelopes and delay lines
    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }
        self.reverb.reset();
    }

    /// Smoothed compressor gain reduction of a channel, in dB
    pub fn gain_reduction_db(&self, channel: usize) -> f32 {
        self.channels
            .get(channel)
            .map(|c| c.compressor.gain_reduction_db())
            .unwrap_or(0.0)
    }

    /// Process one block in place.
    ///
    /// Returns `false` (buffer untouched) when the chain has no valid sample
    /// rate. Never allocates.
    pub fn process(&mut self, buffer: &mut AudioBuffer, params: &BlockParams) -> bool {
        if !self.is_prepared() {
            return false;
        }

        let sample_rate = self.sample_rate;
        let num_channels = buffer.num_channels();
        let active = num_channels.min(MAX_CHANNELS);

        let eq = EqCoefficients::from_settings(&params.eq, sample_rate);
        let comp = CompressorCoeffs::new(params.compressor, sample_rate);

        let delay_on = params.delay.is_active();
        let delay_samples: [usize; MAX_CHANNELS] = std::array::from_fn(|ch| {
            self.channels[ch]
                .delay
                .delay_samples(sample_rate, params.delay.time_seconds)
        });

        let reverb_on = params.reverb.is_active() && num_channels >= 2;
        if reverb_on {
            self.reverb.set_parameters(&params.reverb);
        }

        let output = params.output.clamp(0.0, 1.0);

        for frame in buffer.frames_mut() {
            for (ch, sample) in frame.iter_mut().take(active).enumerate() {
                let state = &mut self.channels[ch];
                let mut x = state.eq.process_sample(*sample, &eq);
                x = state.compressor.process_sample(x, &comp);
                if delay_on {
                    x = state.delay.process_sample(x, delay_samples[ch], &params.delay);
                }
                *sample = x;
            }

            if reverb_on {
                let (wet_l, wet_r) = self.reverb.process_frame(frame[0], frame[1]);
                frame[0] += wet_l;
                frame[1] += wet_r;
            }

            for sample in frame.iter_mut() {
                *sample *= output;
            }
        }

        true
    }
}
