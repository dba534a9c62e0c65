//! Audio buffer model and engine error types
//!
//! The buffer is the value flowing through the effect pipeline: planar
//! f32 samples, mono or stereo, tagged with a sample rate. Every pipeline
//! stage consumes a buffer and produces a new one; the caller's copy is
//! never mutated in place.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur inside the effect engine
#[derive(Debug, Error)]
pub enum EffectError {
    /// An effect parameter is outside its valid range
    #[error("Invalid parameter range: {0}")]
    InvalidParameterRange(String),

    /// Buffer is neither single- nor dual-channel
    #[error("Unsupported buffer shape: {0}")]
    UnsupportedBufferShape(String),

    /// A stereo-only stage was invoked on a mono buffer
    #[error("Stereo buffer required: {0}")]
    StereoRequired(String),

    /// Unrecognized channel mode selector
    #[error("Invalid channel mode: {0:?} (expected 'both', 'left' or 'right')")]
    InvalidChannelMode(String),

    /// Cabinet invoked without a loaded impulse response
    #[error("No impulse response loaded for cabinet simulation")]
    MissingImpulseResponse,

    /// Impulse response resampling failed
    #[error("Resampling failed: {0}")]
    ResampleFailed(String),
}

pub type Result<T> = std::result::Result<T, EffectError>;

/// Selects which channel(s) of a stereo buffer an effect processes
///
/// Mono buffers ignore the mode and are always processed in full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMode {
    #[default]
    Both,
    Left,
    Right,
}

impl ChannelMode {
    /// Whether the left channel of a stereo buffer is selected
    pub fn processes_left(&self) -> bool {
        matches!(self, ChannelMode::Both | ChannelMode::Left)
    }

    /// Whether the right channel of a stereo buffer is selected
    pub fn processes_right(&self) -> bool {
        matches!(self, ChannelMode::Both | ChannelMode::Right)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelMode::Both => "both",
            ChannelMode::Left => "left",
            ChannelMode::Right => "right",
        }
    }
}

impl FromStr for ChannelMode {
    type Err = EffectError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "both" => Ok(ChannelMode::Both),
            "left" => Ok(ChannelMode::Left),
            "right" => Ok(ChannelMode::Right),
            other => Err(EffectError::InvalidChannelMode(other.to_string())),
        }
    }
}

impl std::fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Planar channel data of an audio buffer
#[derive(Debug, Clone, PartialEq)]
pub enum Channels {
    Mono(Vec<f32>),
    Stereo { left: Vec<f32>, right: Vec<f32> },
}

/// An in-memory audio signal: planar samples plus sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Channels,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Create a mono buffer
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            channels: Channels::Mono(samples),
            sample_rate,
        }
    }

    /// Create a stereo buffer from two equal-length channels
    pub fn stereo(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Result<Self> {
        if left.len() != right.len() {
            return Err(EffectError::UnsupportedBufferShape(format!(
                "stereo channels differ in length ({} vs {})",
                left.len(),
                right.len()
            )));
        }
        Ok(Self {
            channels: Channels::Stereo { left, right },
            sample_rate,
        })
    }

    /// Build a buffer from interleaved frames (the WAV sample layout)
    pub fn from_interleaved(samples: &[f32], num_channels: u16, sample_rate: u32) -> Result<Self> {
        match num_channels {
            1 => Ok(Self::mono(samples.to_vec(), sample_rate)),
            2 => {
                let left: Vec<f32> = samples.iter().step_by(2).copied().collect();
                let right: Vec<f32> = samples.iter().skip(1).step_by(2).copied().collect();
                Self::stereo(left, right, sample_rate)
            }
            n => Err(EffectError::UnsupportedBufferShape(format!(
                "{n} channels (only mono and stereo are supported)"
            ))),
        }
    }

    /// Convert back to interleaved frames
    pub fn to_interleaved(&self) -> Vec<f32> {
        match &self.channels {
            Channels::Mono(samples) => samples.clone(),
            Channels::Stereo { left, right } => {
                let mut out = Vec::with_capacity(left.len() * 2);
                for (l, r) in left.iter().zip(right.iter()) {
                    out.push(*l);
                    out.push(*r);
                }
                out
            }
        }
    }

    pub fn channels(&self) -> &Channels {
        &self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> u16 {
        match self.channels {
            Channels::Mono(_) => 1,
            Channels::Stereo { .. } => 2,
        }
    }

    pub fn is_stereo(&self) -> bool {
        matches!(self.channels, Channels::Stereo { .. })
    }

    /// Number of frames (samples per channel)
    pub fn len(&self) -> usize {
        match &self.channels {
            Channels::Mono(samples) => samples.len(),
            Channels::Stereo { left, .. } => left.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.len() as f32 / self.sample_rate as f32
        }
    }

    /// Largest absolute sample value across all channels
    pub fn peak(&self) -> f32 {
        match &self.channels {
            Channels::Mono(samples) => peak_of(samples),
            Channels::Stereo { left, right } => peak_of(left).max(peak_of(right)),
        }
    }

    /// An entirely silent buffer stays unchanged under normalization
    pub fn is_silent(&self) -> bool {
        self.peak() == 0.0
    }

    /// Peak-normalize in place: divide every sample by the buffer peak.
    ///
    /// The factor is shared across both channels of a stereo buffer so the
    /// stereo image is preserved. Silent buffers are left untouched.
    pub fn normalize(&mut self) {
        let peak = self.peak();
        if peak <= 0.0 {
            return;
        }
        let scale = 1.0 / peak;
        match &mut self.channels {
            Channels::Mono(samples) => scale_in_place(samples, scale),
            Channels::Stereo { left, right } => {
                scale_in_place(left, scale);
                scale_in_place(right, scale);
            }
        }
    }

    /// Promote a mono buffer to dual-identical-channel stereo.
    ///
    /// Stereo buffers pass through unchanged. The audio source collaborator
    /// uses this before running stereo-only stages.
    pub fn to_stereo(self) -> Self {
        match self.channels {
            Channels::Mono(samples) => Self {
                channels: Channels::Stereo {
                    left: samples.clone(),
                    right: samples,
                },
                sample_rate: self.sample_rate,
            },
            Channels::Stereo { .. } => self,
        }
    }
}

fn peak_of(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
}

fn scale_in_place(samples: &mut [f32], scale: f32) {
    for s in samples.iter_mut() {
        *s *= scale;
    }
}
