//! DSP building blocks and the fixed signal chain
//!
//! Every stage keeps its per-channel state in plain structs and takes its
//! coefficients by reference, so the chain can recompute them once per block
//! and never allocate on the audio path.

mod audio_buffer;
pub mod chain;
pub mod compressor;
pub mod delay;
pub mod eq;
pub mod reverb;

pub use audio_buffer::AudioBuffer;
pub use chain::{BlockParams, ChannelState, SignalChain, MAX_CHANNELS};
pub use compressor::{db_to_linear, linear_to_db, CompressorSettings, CompressorState};
pub use delay::{DelayLine, DelaySettings};
pub use eq::{EqSettings, EqState, FilterType};
pub use reverb::{Reverb, ReverbSettings};
