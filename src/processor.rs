//! Audio-thread side of the engine
//!
//! [`KeroMixProcessor`] owns the signal chain and shares the parameter store,
//! spectrum bridge and bypass flag with the controller. `process_block` reads
//! parameters lock-free, never allocates and has no error channel: anything
//! invalid turns the block into a no-op.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::analysis::SpectrumBridge;
use crate::dsp::{AudioBuffer, BlockParams, SignalChain};
use crate::error::{KeroError, Result};
use crate::params::{ParamValues, ParameterStore};

/// Current state blob version
pub const STATE_VERSION: u32 = 1;

/// Whole-engine state as persisted by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateBlob {
    pub version: u32,
    pub params: BTreeMap<String, f32>,
}

/// Write side of [`StateBlob`], serialized straight from a snapshot
#[derive(Serialize)]
struct StateBlobRef<'a> {
    version: u32,
    params: &'a ParamValues,
}

/// Real-time processor
#[derive(Debug)]
pub struct KeroMixProcessor {
    params: Arc<ParameterStore>,
    spectrum: Arc<SpectrumBridge>,
    bypass: Arc<AtomicBool>,
    chain: SignalChain,
    max_block: usize,
}

impl KeroMixProcessor {
    /// Processor with its own store and bridge
    pub fn new() -> Self {
        Self::with_shared(
            Arc::new(ParameterStore::new()),
            Arc::new(SpectrumBridge::new()),
        )
    }

    pub fn with_shared(params: Arc<ParameterStore>, spectrum: Arc<SpectrumBridge>) -> Self {
        Self {
            params,
            spectrum,
            bypass: Arc::new(AtomicBool::new(false)),
            chain: SignalChain::new(),
            max_block: 0,
        }
    }

    /// Stream setup: allocate every buffer for `sample_rate`.
    ///
    /// On an invalid rate the processor stays unprepared and skips blocks.
    pub fn prepare(&mut self, sample_rate: f64, max_block: usize) -> Result<()> {
        self.max_block = max_block;
        self.chain.prepare(sample_rate).map_err(|e| {
            tracing::warn!(sample_rate, "Rejected sample rate");
            e
        })?;
        self.spectrum.prepare(sample_rate);
        tracing::debug!(sample_rate, max_block, "Processor prepared");
        Ok(())
    }

    /// Process one block in place.
    ///
    /// Returns `false` when the block was left untouched (bypassed or not
    /// prepared). Processed blocks are fed to the spectrum bridge.
    pub fn process_block(&mut self, buffer: &mut AudioBuffer) -> bool {
        if self.bypass.load(Ordering::Relaxed) {
            return false;
        }
        let params = BlockParams::read(&self.params);
        if !self.chain.process(buffer, &params) {
            return false;
        }
        self.spectrum.push_block(buffer);
        true
    }

    /// Clear filter, envelope and delay state
    pub fn reset(&mut self) {
        self.chain.reset();
    }

    pub fn params(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    pub fn spectrum(&self) -> &Arc<SpectrumBridge> {
        &self.spectrum
    }

    pub fn sample_rate(&self) -> f64 {
        self.chain.sample_rate()
    }

    pub fn max_block(&self) -> usize {
        self.max_block
    }

    pub fn set_bypassed(&self, bypassed: bool) {
        self.bypass.store(bypassed, Ordering::Relaxed);
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypass.load(Ordering::Relaxed)
    }

    /// Shared bypass flag for a UI toggle
    pub fn bypass_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.bypass)
    }

    /// Compressor gain reduction of a channel, for metering
    pub fn gain_reduction_db(&self, channel: usize) -> f32 {
        self.chain.gain_reduction_db(channel)
    }

    /// Serialize every parameter value
    pub fn save_state(&self) -> Result<Vec<u8>> {
        let values = self.params.snapshot();
        let blob = StateBlobRef {
            version: STATE_VERSION,
            params: &values,
        };
        Ok(serde_json::to_vec(&blob)?)
    }

    /// Restore a blob from [`KeroMixProcessor::save_state`].
    ///
    /// Unknown ids are ignored and missing ids keep their current value.
    /// Returns how many parameters were written.
    pub fn load_state(&self, data: &[u8]) -> Result<usize> {
        let blob: StateBlob = serde_json::from_slice(data).map_err(|e| KeroError::InvalidState {
            reason: e.to_string(),
        })?;
        if blob.version > STATE_VERSION {
            return Err(KeroError::InvalidState {
                reason: format!("unsupported state version {}", blob.version),
            });
        }
        let written = self.params.apply_map(&blob.params);
        tracing::debug!(written, "Loaded state");
        Ok(written)
    }
}

impl Default for KeroMixProcessor {
    fn default() -> Self {
        Self::new()
    }
}
