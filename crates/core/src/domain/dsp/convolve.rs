//! Shared convolution and resampling routines
//!
//! Both the reverb and the cabinet effects apply their impulse responses
//! through the same full-length FFT convolution, and the cabinet brings its
//! impulse response to the buffer rate with a rational-factor resampler.

use crate::domain::audio::{EffectError, Result};
use num_complex::Complex;
use rubato::{FftFixedIn, Resampler};
use rustfft::FftPlanner;
use tracing::debug;

/// Input chunk size fed to the resampler
const RESAMPLE_CHUNK: usize = 1024;

/// Full linear convolution of `signal` with `kernel`.
///
/// Output length is `signal.len() + kernel.len() - 1`; callers truncate to
/// the original buffer length to preserve timing alignment. Computed in the
/// frequency domain, so long reverb tails stay affordable.
pub fn convolve_full(signal: &[f32], kernel: &[f32]) -> Vec<f32> {
    if signal.is_empty() || kernel.is_empty() {
        return Vec::new();
    }

    let out_len = signal.len() + kernel.len() - 1;
    let fft_len = out_len.next_power_of_two();

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(fft_len);
    let ifft = planner.plan_fft_inverse(fft_len);

    let mut a: Vec<Complex<f32>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    a.resize(fft_len, Complex::new(0.0, 0.0));
    let mut b: Vec<Complex<f32>> = kernel.iter().map(|&x| Complex::new(x, 0.0)).collect();
    b.resize(fft_len, Complex::new(0.0, 0.0));

    fft.process(&mut a);
    fft.process(&mut b);

    for (x, y) in a.iter_mut().zip(b.iter()) {
        *x *= *y;
    }

    ifft.process(&mut a);

    // rustfft leaves the inverse transform unnormalized
    let scale = 1.0 / fft_len as f32;
    a.truncate(out_len);
    a.iter().map(|c| c.re * scale).collect()
}

/// Blend a dry and a wet channel: `(1 - mix) * dry + mix * wet`.
///
/// `wet` may be shorter than `dry` (a delayed tail cut off by truncation);
/// missing wet samples count as zero.
pub fn blend(dry: &[f32], wet: &[f32], mix: f32) -> Vec<f32> {
    dry.iter()
        .enumerate()
        .map(|(i, &d)| {
            let w = wet.get(i).copied().unwrap_or(0.0);
            (1.0 - mix) * d + mix * w
        })
        .collect()
}

/// Resample a mono signal from `from_rate` to `to_rate`.
///
/// Rational-factor resampling via rubato's FFT resampler; the signal is fed
/// in fixed chunks with the final partial chunk flushed. Identical rates
/// pass through unchanged.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    if from_rate == 0 || to_rate == 0 {
        return Err(EffectError::ResampleFailed(
            "sample rates must be non-zero".to_string(),
        ));
    }

    debug!(
        from_rate,
        to_rate,
        input_len = samples.len(),
        "resampling impulse response"
    );

    let mut resampler =
        FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, RESAMPLE_CHUNK, 2, 1)
            .map_err(|e| EffectError::ResampleFailed(e.to_string()))?;

    let ratio = to_rate as f64 / from_rate as f64;
    let mut out = Vec::with_capacity((samples.len() as f64 * ratio) as usize + RESAMPLE_CHUNK);
    let mut pos = 0;

    while pos < samples.len() {
        let need = resampler.input_frames_next();
        if samples.len() - pos >= need {
            let produced = resampler
                .process(&[&samples[pos..pos + need]], None)
                .map_err(|e| EffectError::ResampleFailed(e.to_string()))?;
            out.extend_from_slice(&produced[0]);
            pos += need;
        } else {
            let produced = resampler
                .process_partial(Some(&[&samples[pos..]]), None)
                .map_err(|e| EffectError::ResampleFailed(e.to_string()))?;
            out.extend_from_slice(&produced[0]);
            pos = samples.len();
        }
    }

    // Flush what is still buffered inside the resampler
    let tail = resampler
        .process_partial(Option::<&[&[f32]]>::None, None)
        .map_err(|e| EffectError::ResampleFailed(e.to_string()))?;
    out.extend_from_slice(&tail[0]);

    Ok(out)
}
