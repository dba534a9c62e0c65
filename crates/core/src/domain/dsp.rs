//! Digital signal processing effects for offline audio processing
//!
//! This module provides the effect engine:
//! - Delay (recursive comb with feedback)
//! - Ping-pong delay (cross-feedback stereo delay)
//! - Reverb (synthetic impulse response + convolution)
//! - Cabinet simulation (impulse-response convolution with resampling)
//! - Effect chain composition and equal-power panning
//!
//! Every effect consumes a whole in-memory buffer and produces a new,
//! peak-normalized one. Processing is single-threaded and pure: identical
//! inputs (and, for reverb, an identical seed) give identical outputs.

use crate::domain::audio::{AudioBuffer, ChannelMode, Channels, EffectError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};

pub mod convolve;

pub type Result<T> = std::result::Result<T, EffectError>;

/// Parameter constraints for the effects
///
/// Feedback and mix are blend factors in the unit interval; times and rates
/// are non-negative seconds. Violations are rejected at construction, before
/// any sample is processed.
pub mod params {
    pub const FEEDBACK_MIN: f32 = 0.0;
    pub const FEEDBACK_MAX: f32 = 1.0;

    pub const MIX_MIN: f32 = 0.0;
    pub const MIX_MAX: f32 = 1.0;

    pub const PAN_MIN: f32 = -1.0;
    pub const PAN_MAX: f32 = 1.0;
}

fn require_unit(name: &str, value: f32) -> Result<()> {
    if (params::MIX_MIN..=params::MIX_MAX).contains(&value) {
        Ok(())
    } else {
        Err(EffectError::InvalidParameterRange(format!(
            "{name} must be within [0.0, 1.0], got {value}"
        )))
    }
}

fn require_non_negative(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EffectError::InvalidParameterRange(format!(
            "{name} must be a non-negative finite value, got {value}"
        )))
    }
}

// ============================================================================
// EFFECT PARAMETERS
// ============================================================================

/// Delay parameters: a first-order recursive comb
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayParams {
    /// Delay time in seconds
    pub delay_time: f32,
    /// Portion of the delayed signal fed back for later repeats
    pub feedback: f32,
    /// Dry/wet blend
    pub mix: f32,
}

impl DelayParams {
    pub fn validate(&self) -> Result<()> {
        require_non_negative("delay_time", self.delay_time)?;
        require_unit("feedback", self.feedback)?;
        require_unit("mix", self.mix)
    }
}

/// Ping-pong delay parameters: independent per-channel delays with
/// cross-channel feedback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PingPongParams {
    pub delay_time_left: f32,
    pub delay_time_right: f32,
    pub feedback: f32,
    pub mix: f32,
}

impl PingPongParams {
    pub fn validate(&self) -> Result<()> {
        require_non_negative("delay_time_left", self.delay_time_left)?;
        require_non_negative("delay_time_right", self.delay_time_right)?;
        require_unit("feedback", self.feedback)?;
        require_unit("mix", self.mix)
    }
}

/// Reverb parameters driving the synthetic impulse response
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReverbParams {
    /// Time for the impulse response to decay by 60 dB, in seconds
    pub t60: f32,
    /// Density of early reflections
    pub num_reflections: u32,
    /// Exponential decay factor applied to each reflection
    pub decay_rate: f32,
    /// Dry/wet blend
    pub mix: f32,
    /// Fixed random seed for reproducible impulse responses
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ReverbParams {
    pub fn validate(&self) -> Result<()> {
        require_non_negative("t60", self.t60)?;
        require_non_negative("decay_rate", self.decay_rate)?;
        require_unit("mix", self.mix)
    }
}

/// Cabinet parameters: a pre-loaded impulse response plus the blend factor
///
/// Loading (file enumeration, selection, downmix) is the impulse-response
/// loader collaborator's concern; the effect only receives the final mono,
/// normalized samples and their native sample rate.
#[derive(Debug, Clone)]
pub struct CabinetParams {
    pub impulse_response: Option<ImpulseResponse>,
    pub mix: f32,
}

impl CabinetParams {
    pub fn validate(&self) -> Result<()> {
        require_unit("mix", self.mix)
    }
}

// ============================================================================
// IMPULSE RESPONSES
// ============================================================================

/// A mono impulse response with its native sample rate
///
/// Peak-normalized on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl ImpulseResponse {
    pub fn new(mut samples: Vec<f32>, sample_rate: u32) -> Self {
        let peak = samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max);
        if peak > 0.0 {
            for s in samples.iter_mut() {
                *s /= peak;
            }
        }
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Synthesizes a reverb impulse response from statistical parameters
///
/// The response starts as a unit impulse; each reflection adds a uniformly
/// random amplitude at a uniformly random position, attenuated by an
/// exponential decay curve. Reflections landing on the same position
/// accumulate.
#[derive(Debug, Clone, Copy)]
pub struct ImpulseResponseSynthesizer {
    t60: f32,
    num_reflections: u32,
    decay_rate: f32,
}

impl ImpulseResponseSynthesizer {
    pub fn new(t60: f32, num_reflections: u32, decay_rate: f32) -> Result<Self> {
        require_non_negative("t60", t60)?;
        require_non_negative("decay_rate", decay_rate)?;
        Ok(Self {
            t60,
            num_reflections,
            decay_rate,
        })
    }

    /// Generate the impulse response for the given sample rate.
    ///
    /// The random source is threaded in explicitly so callers can request
    /// deterministic output.
    pub fn synthesize(&self, sample_rate: u32, rng: &mut impl Rng) -> ImpulseResponse {
        let ir_length = ((self.t60 * sample_rate as f32) as usize).max(1);
        let mut samples = vec![0.0_f32; ir_length];
        samples[0] = 1.0;

        if ir_length > 1 {
            for _ in 0..self.num_reflections {
                let delay = rng.random_range(1..ir_length);
                let amplitude = rng.random_range(-1.0_f32..1.0);
                let attenuation =
                    (-(delay as f32) / (sample_rate as f32 * self.t60) * self.decay_rate).exp();
                samples[delay] += attenuation * amplitude;
            }
        }

        trace!(
            ir_length,
            num_reflections = self.num_reflections,
            "synthesized reverb impulse response"
        );

        ImpulseResponse::new(samples, sample_rate)
    }
}

// ============================================================================
// EFFECTS
// ============================================================================

/// The closed set of audio effects
///
/// The effect set is fixed, so dispatch is a pattern match rather than an
/// open-ended dynamic lookup. Instances are constructed once from validated
/// parameters and stay immutable across invocations.
#[derive(Debug, Clone)]
pub enum Effect {
    Delay(DelayParams),
    PingPong(PingPongParams),
    Reverb(ReverbParams),
    Cabinet { ir: ImpulseResponse, mix: f32 },
}

impl Effect {
    pub fn delay(params: DelayParams) -> Result<Self> {
        params.validate()?;
        Ok(Effect::Delay(params))
    }

    pub fn ping_pong(params: PingPongParams) -> Result<Self> {
        params.validate()?;
        Ok(Effect::PingPong(params))
    }

    pub fn reverb(params: ReverbParams) -> Result<Self> {
        params.validate()?;
        Ok(Effect::Reverb(params))
    }

    pub fn cabinet(params: CabinetParams) -> Result<Self> {
        params.validate()?;
        let ir = params
            .impulse_response
            .ok_or(EffectError::MissingImpulseResponse)?;
        Ok(Effect::Cabinet {
            ir,
            mix: params.mix,
        })
    }

    /// Effect name for logging and error reporting
    pub fn name(&self) -> &'static str {
        match self {
            Effect::Delay(_) => "delay",
            Effect::PingPong(_) => "ping_pong",
            Effect::Reverb(_) => "reverb",
            Effect::Cabinet { .. } => "cabinet",
        }
    }

    /// Apply the effect, producing a new peak-normalized buffer.
    ///
    /// `mode` selects the processed channel(s) of a stereo buffer; untouched
    /// channels pass through (subject to the final shared normalization).
    /// Mono buffers are always processed in full. The ping-pong delay is
    /// inherently stereo-coupled and ignores the mode.
    pub fn apply(&self, buffer: &AudioBuffer, mode: ChannelMode) -> Result<AudioBuffer> {
        trace!(effect = self.name(), mode = %mode, frames = buffer.len(), "applying effect");
        match self {
            Effect::Delay(p) => apply_delay(buffer, mode, p),
            Effect::PingPong(p) => apply_ping_pong(buffer, p),
            Effect::Reverb(p) => apply_reverb(buffer, mode, p),
            Effect::Cabinet { ir, mix } => apply_cabinet(buffer, mode, ir, *mix),
        }
    }
}

/// Run `wet_fn` on the selected channels, blend with the dry signal and
/// peak-normalize the whole result. Shared by delay, reverb and cabinet.
fn apply_channelwise(
    buffer: &AudioBuffer,
    mode: ChannelMode,
    mix: f32,
    wet_fn: impl Fn(&[f32]) -> Vec<f32>,
) -> Result<AudioBuffer> {
    let mut out = match buffer.channels() {
        Channels::Mono(dry) => {
            let wet = wet_fn(dry);
            AudioBuffer::mono(convolve::blend(dry, &wet, mix), buffer.sample_rate())
        }
        Channels::Stereo { left, right } => {
            let new_left = if mode.processes_left() {
                convolve::blend(left, &wet_fn(left), mix)
            } else {
                left.clone()
            };
            let new_right = if mode.processes_right() {
                convolve::blend(right, &wet_fn(right), mix)
            } else {
                right.clone()
            };
            AudioBuffer::stereo(new_left, new_right, buffer.sample_rate())?
        }
    };
    out.normalize();
    Ok(out)
}

// ----------------------------------------------------------------------------
// Delay
// ----------------------------------------------------------------------------

/// Recursive comb filter for one channel: `w[i] = dry[i-d] + feedback * w[i-d]`.
///
/// With `d = 0` the feedback term reads the value written in the same step,
/// degenerating to a flat `(1 + feedback)` gain; feedback is capped at 1.0 so
/// the recursion always converges. A delay at or past the end of the buffer
/// leaves the wet signal silent.
fn delayed_channel(dry: &[f32], delay_samples: usize, feedback: f32) -> Vec<f32> {
    let mut wet = vec![0.0_f32; dry.len()];
    for i in delay_samples..dry.len() {
        wet[i] = dry[i - delay_samples];
        wet[i] += feedback * wet[i - delay_samples];
    }
    wet
}

fn apply_delay(buffer: &AudioBuffer, mode: ChannelMode, p: &DelayParams) -> Result<AudioBuffer> {
    let delay_samples = (p.delay_time * buffer.sample_rate() as f32) as usize;
    apply_channelwise(buffer, mode, p.mix, |dry| {
        delayed_channel(dry, delay_samples, p.feedback)
    })
}

// ----------------------------------------------------------------------------
// Ping-pong delay
// ----------------------------------------------------------------------------

/// Cross-feedback stereo delay: each channel's feedback is sourced from the
/// opposite channel's wet signal, producing alternating repeats.
///
/// Both cross terms are read before either wet sample of the current index
/// is written, so the recurrence is symmetric in the two channels and a
/// zero-delay configuration degenerates to a plain passthrough wet signal.
fn apply_ping_pong(buffer: &AudioBuffer, p: &PingPongParams) -> Result<AudioBuffer> {
    let (left, right) = match buffer.channels() {
        Channels::Stereo { left, right } => (left, right),
        Channels::Mono(_) => {
            return Err(EffectError::StereoRequired(
                "ping-pong delay is stereo-coupled".to_string(),
            ))
        }
    };

    let sr = buffer.sample_rate() as f32;
    let d_l = (p.delay_time_left * sr) as usize;
    let d_r = (p.delay_time_right * sr) as usize;
    let n = left.len();

    let mut wet_l = vec![0.0_f32; n];
    let mut wet_r = vec![0.0_f32; n];

    for i in 0..n {
        let base_l = if i >= d_l { left[i - d_l] } else { 0.0 };
        let base_r = if i >= d_r { right[i - d_r] } else { 0.0 };
        let cross_l = if i >= d_r { wet_r[i - d_r] } else { 0.0 };
        let cross_r = if i >= d_l { wet_l[i - d_l] } else { 0.0 };
        wet_l[i] = base_l + p.feedback * cross_l;
        wet_r[i] = base_r + p.feedback * cross_r;
    }

    let out_left = convolve::blend(left, &wet_l, p.mix);
    let out_right = convolve::blend(right, &wet_r, p.mix);

    let mut out = AudioBuffer::stereo(out_left, out_right, buffer.sample_rate())?;
    out.normalize();
    Ok(out)
}

// ----------------------------------------------------------------------------
// Reverb
// ----------------------------------------------------------------------------

fn apply_reverb(buffer: &AudioBuffer, mode: ChannelMode, p: &ReverbParams) -> Result<AudioBuffer> {
    let synth = ImpulseResponseSynthesizer::new(p.t60, p.num_reflections, p.decay_rate)?;
    let mut rng = match p.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let ir = synth.synthesize(buffer.sample_rate(), &mut rng);

    apply_channelwise(buffer, mode, p.mix, |dry| {
        // Convolution lengthens the signal; keep only the first N samples so
        // timing stays aligned with untouched channels. The tail past the
        // buffer end is discarded.
        let mut wet = convolve::convolve_full(dry, ir.samples());
        wet.truncate(dry.len());
        wet
    })
}

// ----------------------------------------------------------------------------
// Cabinet
// ----------------------------------------------------------------------------

fn apply_cabinet(
    buffer: &AudioBuffer,
    mode: ChannelMode,
    ir: &ImpulseResponse,
    mix: f32,
) -> Result<AudioBuffer> {
    // The impulse response is brought to the buffer's rate, never the other
    // way around.
    let ir_samples = if ir.sample_rate() != buffer.sample_rate() {
        debug!(
            ir_rate = ir.sample_rate(),
            buffer_rate = buffer.sample_rate(),
            "impulse response sample rate differs from buffer, resampling"
        );
        convolve::resample(ir.samples(), ir.sample_rate(), buffer.sample_rate())?
    } else {
        ir.samples().to_vec()
    };

    apply_channelwise(buffer, mode, mix, |dry| {
        let mut wet = convolve::convolve_full(dry, &ir_samples);
        wet.truncate(dry.len());
        wet
    })
}

// ============================================================================
// EFFECT CHAIN
// ============================================================================

/// Failure of one chain stage, tagged with its 0-based index
#[derive(Debug, Error)]
#[error("Chain stage {stage} ({effect}) failed: {source}")]
pub struct ChainError {
    pub stage: usize,
    pub effect: String,
    #[source]
    pub source: EffectError,
}

/// An ordered list of `(Effect, ChannelMode)` pairs
///
/// Insertion order is processing order. The chain aborts wholesale on the
/// first stage failure; no partial buffer is returned. Rejecting empty
/// chains is the caller's concern (the configuration layer enforces it).
#[derive(Debug, Clone, Default)]
pub struct EffectChain {
    stages: Vec<(Effect, ChannelMode)>,
}

impl EffectChain {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append an effect to the end of the chain
    pub fn push(&mut self, effect: Effect, mode: ChannelMode) {
        self.stages.push((effect, mode));
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[(Effect, ChannelMode)] {
        &self.stages
    }

    /// Apply every stage in insertion order to the evolving buffer
    pub fn process(&self, input: AudioBuffer) -> std::result::Result<AudioBuffer, ChainError> {
        let mut buffer = input;
        for (stage, (effect, mode)) in self.stages.iter().enumerate() {
            debug!(stage, effect = effect.name(), "processing chain stage");
            buffer = effect.apply(&buffer, *mode).map_err(|source| ChainError {
                stage,
                effect: effect.name().to_string(),
                source,
            })?;
        }
        Ok(buffer)
    }
}

// ============================================================================
// PANNER
// ============================================================================

/// Post-chain equal-power stereo balance
///
/// Gains follow the sine/cosine law, so total power is constant across the
/// stereo field. Gains stay within [0, 1]; no normalization follows this
/// stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Panner {
    pan: f32,
}

impl Panner {
    /// `pan` ranges from -1.0 (hard left) through 0.0 (center) to 1.0
    /// (hard right)
    pub fn new(pan: f32) -> Result<Self> {
        if !(params::PAN_MIN..=params::PAN_MAX).contains(&pan) {
            return Err(EffectError::InvalidParameterRange(format!(
                "pan must be within [-1.0, 1.0], got {pan}"
            )));
        }
        Ok(Self { pan })
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }

    /// Left and right channel gains for the configured position
    pub fn gains(&self) -> (f32, f32) {
        let theta = (self.pan + 1.0) / 2.0;
        let angle = theta * std::f32::consts::FRAC_PI_2;
        (angle.cos(), angle.sin())
    }

    /// Scale the two channels by their equal-power gains.
    ///
    /// Fails with `StereoRequired` on mono input; the pipeline treats that
    /// failure as recoverable and skips panning.
    pub fn apply(&self, buffer: &AudioBuffer) -> Result<AudioBuffer> {
        match buffer.channels() {
            Channels::Stereo { left, right } => {
                let (gain_l, gain_r) = self.gains();
                trace!(pan = self.pan, gain_l, gain_r, "applying equal-power pan");
                let left = left.iter().map(|s| s * gain_l).collect();
                let right = right.iter().map(|s| s * gain_r).collect();
                AudioBuffer::stereo(left, right, buffer.sample_rate())
            }
            Channels::Mono(_) => Err(EffectError::StereoRequired(
                "equal-power panning".to_string(),
            )),
        }
    }
}

/// Run the full pipeline: chain, then the optional pan stage.
///
/// A `StereoRequired` from the panner is recoverable: panning is skipped and
/// the un-panned buffer is returned. Any effect failure aborts with the
/// failing stage index.
pub fn process_pipeline(
    chain: &EffectChain,
    panner: Option<&Panner>,
    input: AudioBuffer,
) -> std::result::Result<AudioBuffer, ChainError> {
    let processed = chain.process(input)?;

    let Some(panner) = panner else {
        return Ok(processed);
    };
    match panner.apply(&processed) {
        Ok(panned) => Ok(panned),
        Err(EffectError::StereoRequired(_)) => {
            warn!("panning requires a stereo buffer, skipping");
            Ok(processed)
        }
        Err(source) => Err(ChainError {
            stage: chain.len(),
            effect: "panner".to_string(),
            source,
        }),
    }
}

// ============================================================================
// TESTS
// ============================================================================
