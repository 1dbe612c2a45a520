//! Post-chain spectral analysis

mod spectrum;

pub use spectrum::{
    SpectrumAnalyzer, SpectrumBands, SpectrumBridge, BAND_SMOOTHING, FFT_SIZE, SPECTRUM_FLOOR_DB,
};
