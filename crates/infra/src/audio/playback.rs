//! Audio playback through the system output device
//!
//! Plays a processed buffer on the default CPAL output device. The stream
//! callback pulls from the buffer directly; a crossbeam channel signals
//! completion, and a second channel lets the caller interrupt playback.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Stream;
use crossbeam::channel::{bounded, Receiver, Sender};
use resonata_core::domain::dsp::convolve;
use resonata_core::domain::{AudioBuffer, Channels};
use thiserror::Error;
use tracing::{error, info, warn};

pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Errors that can occur during playback
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no output device available")]
    NoOutputDevice,

    #[error("failed to query device configuration: {0}")]
    DeviceConfig(String),

    #[error("failed to build audio stream: {0}")]
    StreamError(String),

    #[error("failed to resample for playback: {0}")]
    Resample(String),
}

/// A playing audio stream
///
/// Playback stops when the handle is dropped. `wait` blocks until the
/// buffer has been played out; `stop` interrupts it.
pub struct PlaybackHandle {
    _stream: Stream,
    done_rx: Receiver<()>,
    stop_tx: Sender<()>,
}

impl PlaybackHandle {
    /// Block until playback finishes (or is stopped)
    pub fn wait(&self) {
        let _ = self.done_rx.recv();
    }

    /// Interrupt playback
    pub fn stop(&self) {
        let _ = self.stop_tx.try_send(());
    }
}

/// Play a buffer on the default output device.
///
/// The buffer is resampled to the device rate when they differ, and its
/// channels are mapped onto the device layout (mono duplicated, stereo
/// averaged down for mono devices).
pub fn play(buffer: &AudioBuffer) -> Result<PlaybackHandle> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(PlaybackError::NoOutputDevice)?;

    let config: cpal::StreamConfig = device
        .default_output_config()
        .map_err(|e| PlaybackError::DeviceConfig(e.to_string()))?
        .into();

    let device_rate = config.sample_rate;
    let device_channels = config.channels as usize;

    info!(
        frames = buffer.len(),
        source_rate = buffer.sample_rate(),
        device_rate,
        device_channels,
        "Starting playback"
    );

    let samples = prepare_samples(buffer, device_rate, device_channels)?;
    let total = samples.len();

    let (done_tx, done_rx) = bounded::<()>(1);
    let (stop_tx, stop_rx) = bounded::<()>(1);

    let mut position = 0usize;
    let mut finished = false;

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if stop_rx.try_recv().is_ok() {
                    position = total;
                }

                let remaining = total - position;
                let to_copy = data.len().min(remaining);
                data[..to_copy].copy_from_slice(&samples[position..position + to_copy]);
                data[to_copy..].fill(0.0);
                position += to_copy;

                if position >= total && !finished {
                    finished = true;
                    let _ = done_tx.try_send(());
                }
            },
            |err| error!("Output stream error: {}", err),
            None,
        )
        .map_err(|e| PlaybackError::StreamError(e.to_string()))?;

    stream
        .play()
        .map_err(|e| PlaybackError::StreamError(e.to_string()))?;

    Ok(PlaybackHandle {
        _stream: stream,
        done_rx,
        stop_tx,
    })
}

/// Resample to the device rate and interleave onto the device channel layout
fn prepare_samples(
    buffer: &AudioBuffer,
    device_rate: u32,
    device_channels: usize,
) -> Result<Vec<f32>> {
    let source_rate = buffer.sample_rate();

    let (left, right): (Vec<f32>, Vec<f32>) = match buffer.channels() {
        Channels::Mono(samples) => {
            let resampled = convolve::resample(samples, source_rate, device_rate)
                .map_err(|e| PlaybackError::Resample(e.to_string()))?;
            (resampled.clone(), resampled)
        }
        Channels::Stereo { left, right } => {
            let l = convolve::resample(left, source_rate, device_rate)
                .map_err(|e| PlaybackError::Resample(e.to_string()))?;
            let r = convolve::resample(right, source_rate, device_rate)
                .map_err(|e| PlaybackError::Resample(e.to_string()))?;
            (l, r)
        }
    };

    let frames = left.len().min(right.len());
    let mut interleaved = Vec::with_capacity(frames * device_channels);

    match device_channels {
        1 => {
            for i in 0..frames {
                interleaved.push((left[i] + right[i]) * 0.5);
            }
        }
        n => {
            if n > 2 {
                warn!(channels = n, "More than two output channels, extra channels stay silent");
            }
            for i in 0..frames {
                interleaved.push(left[i]);
                interleaved.push(right[i]);
                for _ in 2..n {
                    interleaved.push(0.0);
                }
            }
        }
    }

    Ok(interleaved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_mono_duplicates_to_stereo() {
        let buffer = AudioBuffer::mono(vec![0.5, -0.5], 44100);
        let out = prepare_samples(&buffer, 44100, 2).unwrap();
        assert_eq!(out, vec![0.5, 0.5, -0.5, -0.5]);
    }

    #[test]
    fn test_prepare_stereo_downmix_to_mono() {
        let buffer = AudioBuffer::stereo(vec![1.0, 0.0], vec![0.0, 1.0], 44100).unwrap();
        let out = prepare_samples(&buffer, 44100, 1).unwrap();
        assert_eq!(out, vec![0.5, 0.5]);
    }

    #[test]
    fn test_prepare_extra_channels_silent() {
        let buffer = AudioBuffer::stereo(vec![1.0], vec![-1.0], 44100).unwrap();
        let out = prepare_samples(&buffer, 44100, 4).unwrap();
        assert_eq!(out, vec![1.0, -1.0, 0.0, 0.0]);
    }
}
