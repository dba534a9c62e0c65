//! WAV file reading and writing
//!
//! Files are decoded to `f32` buffers regardless of on-disk sample format.
//! Output files are always written as 16-bit PCM.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use resonata_core::domain::AudioBuffer;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

pub type Result<T> = std::result::Result<T, WavError>;

/// Errors that can occur during WAV file operations
#[derive(Debug, Error)]
pub enum WavError {
    #[error("failed to read WAV file: {0}")]
    Read(String),

    #[error("failed to write WAV file: {0}")]
    Write(String),

    #[error("unsupported WAV format: {0}")]
    UnsupportedFormat(String),

    #[error("WAV file contains no samples")]
    Empty,
}

/// Read a WAV file into an audio buffer.
///
/// Supports 16/24/32-bit integer and 32-bit float PCM, mono or stereo.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<AudioBuffer> {
    let path = path.as_ref();
    info!(path = %path.display(), "Reading WAV file");

    let mut reader = WavReader::open(path).map_err(|e| WavError::Read(e.to_string()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| WavError::Read(e.to_string()))?,
        SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            if !(8..=32).contains(&bits) {
                return Err(WavError::UnsupportedFormat(format!(
                    "{bits}-bit integer samples"
                )));
            }
            let max_val = (1i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| WavError::Read(e.to_string()))?
        }
    };

    if samples.is_empty() {
        return Err(WavError::Empty);
    }

    let buffer = AudioBuffer::from_interleaved(&samples, spec.channels, spec.sample_rate)
        .map_err(|e| WavError::UnsupportedFormat(e.to_string()))?;

    debug!(
        frames = buffer.len(),
        channels = buffer.num_channels(),
        sample_rate = spec.sample_rate,
        "WAV file loaded"
    );
    Ok(buffer)
}

/// Write an audio buffer to a 16-bit PCM WAV file.
///
/// Samples are clamped to [-1, 1] before quantization.
pub fn write_wav<P: AsRef<Path>>(path: P, buffer: &AudioBuffer) -> Result<()> {
    let path = path.as_ref();
    info!(
        path = %path.display(),
        frames = buffer.len(),
        channels = buffer.num_channels(),
        "Writing WAV file"
    );

    let spec = WavSpec {
        channels: buffer.num_channels(),
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec).map_err(|e| WavError::Write(e.to_string()))?;
    for sample in buffer.to_interleaved() {
        let quantized = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(quantized)
            .map_err(|e| WavError::Write(e.to_string()))?;
    }
    writer.finalize().map_err(|e| WavError::Write(e.to_string()))?;

    debug!("WAV file written");
    Ok(())
}
