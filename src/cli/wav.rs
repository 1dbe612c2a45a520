//! WAV file I/O for the CLI
//!
//! Integer files are scaled to [-1.0, 1.0]; float files are read as-is.
//! Output keeps the input's bit depth and sample format.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::dsp::AudioBuffer;
use crate::error::{KeroError, Result};

/// A decoded file plus the format it was stored in
#[derive(Debug, Clone)]
pub struct WavFile {
    pub buffer: AudioBuffer,
    pub spec: WavSpec,
}

/// Read a WAV file into an interleaved buffer
pub fn read_wav(path: &Path) -> Result<WavFile> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = int_scale(spec.bits_per_sample)?;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    tracing::debug!(
        path = %path.display(),
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        bits = spec.bits_per_sample,
        "Read WAV"
    );

    let buffer =
        AudioBuffer::from_interleaved(samples, spec.channels as usize, spec.sample_rate as f64)?;
    Ok(WavFile { buffer, spec })
}

/// Write `buffer` using `spec`'s bit depth and sample format
pub fn write_wav(path: &Path, buffer: &AudioBuffer, spec: WavSpec) -> Result<()> {
    let spec = WavSpec {
        channels: buffer.num_channels() as u16,
        sample_rate: buffer.sample_rate() as u32,
        ..spec
    };
    let mut writer = WavWriter::create(path, spec)?;

    match spec.sample_format {
        SampleFormat::Float => {
            for &sample in buffer.samples() {
                writer.write_sample(sample)?;
            }
        }
        SampleFormat::Int => {
            let scale = int_scale(spec.bits_per_sample)?;
            for &sample in buffer.samples() {
                let scaled = (sample * scale).round().clamp(-scale - 1.0, scale);
                match spec.bits_per_sample {
                    8 => writer.write_sample(scaled as i8)?,
                    16 => writer.write_sample(scaled as i16)?,
                    _ => writer.write_sample(scaled as i32)?,
                }
            }
        }
    }

    writer.finalize()?;
    tracing::debug!(path = %path.display(), frames = buffer.num_samples(), "Wrote WAV");
    Ok(())
}

/// Full-scale value for a signed integer bit depth
fn int_scale(bits: u16) -> Result<f32> {
    match bits {
        8 => Ok(127.0),
        16 => Ok(32767.0),
        24 => Ok(8_388_607.0),
        32 => Ok(2_147_483_647.0),
        other => Err(KeroError::InvalidState {
            reason: format!("{}-bit audio (only 8, 16, 24, 32 supported)", other),
        }),
    }
}
