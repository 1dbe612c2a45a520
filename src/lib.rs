//! KeroMix - real-time mix engine with AI parameter suggestions
//!
//! KeroMix runs a fixed effects chain on the audio thread and accepts
//! parameter suggestions computed on a background thread:
//! 1. DSP chain - three-band EQ → compressor → delay → reverb → output trim
//! 2. Suggestions - text request → external service → lock-aware parameter writes
//!
//! # Architecture
//!
//! Two concurrency domains share state only through atomics and short locks:
//! - Audio thread: [`KeroMixProcessor`] reads [`ParameterStore`] lock-free and
//!   feeds post-chain samples into [`SpectrumBridge`]
//! - UI thread: [`MixController`] owns locks, undo, presets and the single
//!   suggestion worker, and writes accepted values into the store

pub mod analysis;
pub mod cli;
pub mod config;
pub mod controller;
pub mod dsp;
pub mod error;
pub mod params;
pub mod preset;
pub mod processor;
pub mod suggest;

pub use analysis::{SpectrumAnalyzer, SpectrumBands, SpectrumBridge};
pub use config::{EngineConfig, ServiceConfig};
pub use controller::MixController;
pub use dsp::{AudioBuffer, SignalChain};
pub use error::{KeroError, Result};
pub use params::{LockState, ParamGroup, ParamId, ParameterStore};
pub use processor::KeroMixProcessor;
pub use suggest::{SuggestionApplier, SuggestionService, UndoSnapshot};
