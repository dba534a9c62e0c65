//! Integration tests for the complete processing pipeline
//!
//! These tests verify the path from configuration to processed audio,
//! including chain construction from TOML, stereo handling, panning, and
//! WAV round trips through the infrastructure layer.

use resonata_core::domain::audio::EffectError;
use resonata_core::domain::{
    builtin_preset, process_pipeline, AudioBuffer, ChainConfig, ChannelMode,
};
use resonata_infra::audio::{self, IrLibrary};
use tempfile::TempDir;

const SAMPLE_RATE: u32 = 44100;

fn generate_sine_wave(frequency: f32, duration_ms: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_ms / 1000.0) as usize;
    (0..num_samples)
        .map(|i| 2.0 * std::f32::consts::PI * frequency * i as f32 / SAMPLE_RATE as f32)
        .map(|phase| phase.sin())
        .collect()
}

fn generate_impulse(num_samples: usize) -> Vec<f32> {
    let mut samples = vec![0.0; num_samples];
    samples[0] = 1.0;
    samples
}

// ============================================================================
// CHAIN CONFIGURATION TO PROCESSED AUDIO
// ============================================================================

#[test]
fn test_toml_chain_end_to_end() {
    let config: ChainConfig = toml::from_str(
        r#"
        pan = 0.25

        [[stages]]
        type = "delay"
        channel_mode = "left"
        params = { delay_time = 0.05, feedback = 0.4, mix = 0.5 }

        [[stages]]
        type = "reverb"
        params = { t60 = 0.2, num_reflections = 500, decay_rate = 0.5, mix = 0.8, seed = 11 }
        "#,
    )
    .unwrap();

    let chain = config.build(None).unwrap();
    let panner = config.panner().unwrap();
    assert_eq!(chain.len(), 2);
    assert!(panner.is_some());

    let samples = generate_sine_wave(440.0, 200.0);
    let input = AudioBuffer::stereo(samples.clone(), samples, SAMPLE_RATE).unwrap();
    let input_len = input.len();

    let output = process_pipeline(&chain, panner.as_ref(), input).unwrap();

    assert_eq!(output.len(), input_len);
    assert!(output.is_stereo());
    assert!(output.peak() <= 1.0 + 1e-6);
    assert!(!output.is_silent());
}

#[test]
fn test_slapback_preset_produces_echo() {
    let config = builtin_preset("slapback").unwrap();
    let chain = config.build(None).unwrap();

    // One second of silence after the impulse leaves room for the echoes
    let input = AudioBuffer::mono(generate_impulse(SAMPLE_RATE as usize), SAMPLE_RATE);
    let output = chain.process(input).unwrap();

    // slapback delays by 0.1s
    let delay_samples = (0.1 * SAMPLE_RATE as f32) as usize;
    let out = match output.channels() {
        resonata_core::domain::Channels::Mono(s) => s.clone(),
        _ => panic!("expected mono output"),
    };

    assert!(out[0].abs() > 0.0, "dry impulse survives");
    assert!(out[delay_samples].abs() > 0.0, "first echo present");
    assert!(
        out[delay_samples].abs() < out[0].abs(),
        "echo quieter than dry signal at mix 0.4"
    );
    // between the impulse and the first echo everything is silent
    assert!(out[1..delay_samples].iter().all(|s| s.abs() < 1e-6));
}

#[test]
fn test_chain_failure_reports_runtime_stage() {
    // Stage 0 (delay) accepts mono; stage 1 (ping-pong) requires stereo
    let config: ChainConfig = toml::from_str(
        r#"
        [[stages]]
        type = "delay"
        params = { delay_time = 0.01, feedback = 0.2, mix = 0.5 }

        [[stages]]
        type = "ping_pong"
        params = { delay_time_left = 0.01, delay_time_right = 0.02, feedback = 0.3, mix = 0.5 }
        "#,
    )
    .unwrap();
    let chain = config.build(None).unwrap();

    let mono = AudioBuffer::mono(generate_sine_wave(440.0, 50.0), SAMPLE_RATE);
    let err = chain.process(mono.clone()).unwrap_err();
    assert_eq!(err.stage, 1);
    assert_eq!(err.effect, "ping_pong");
    assert!(matches!(err.source, EffectError::StereoRequired(_)));

    // the promotion the CLI performs makes the same chain succeed
    assert!(config.needs_stereo());
    let output = chain.process(mono.to_stereo()).unwrap();
    assert!(output.is_stereo());
}

// ============================================================================
// PANNING
// ============================================================================

#[test]
fn test_hard_left_pan_silences_right_channel() {
    let mut config = builtin_preset("slapback").unwrap();
    config.pan = Some(-1.0);

    let chain = config.build(None).unwrap();
    let panner = config.panner().unwrap();

    let samples = generate_sine_wave(440.0, 100.0);
    let input = AudioBuffer::stereo(samples.clone(), samples, SAMPLE_RATE).unwrap();
    let output = process_pipeline(&chain, panner.as_ref(), input).unwrap();

    match output.channels() {
        resonata_core::domain::Channels::Stereo { left, right } => {
            assert!(left.iter().any(|s| s.abs() > 0.1));
            assert!(right.iter().all(|s| s.abs() < 1e-6));
        }
        _ => panic!("expected stereo output"),
    }
}

#[test]
fn test_pan_skipped_for_mono_output() {
    let mut config = builtin_preset("slapback").unwrap();
    config.pan = Some(0.5);

    let chain = config.build(None).unwrap();
    let panner = config.panner().unwrap();

    let input = AudioBuffer::mono(generate_sine_wave(440.0, 100.0), SAMPLE_RATE);
    let output = process_pipeline(&chain, panner.as_ref(), input).unwrap();

    // panning is skipped rather than failing the pipeline
    assert!(!output.is_stereo());
    assert!(!output.is_silent());
}

// ============================================================================
// CABINET SIMULATION WITH A FILE-BACKED IMPULSE RESPONSE
// ============================================================================

#[test]
fn test_cabinet_with_ir_loaded_from_wav() {
    let dir = TempDir::new().unwrap();
    let ir_buffer = AudioBuffer::mono(vec![1.0, 0.5, 0.25, 0.0], SAMPLE_RATE);
    audio::write_wav(dir.path().join("cab.wav"), &ir_buffer).unwrap();

    let library = IrLibrary::new(dir.path().to_path_buf());
    let ir = library.load("cab").unwrap();

    let config: ChainConfig = toml::from_str(
        r#"
        [[stages]]
        type = "cabinet"
        params = { ir_file = "cab.wav", mix = 1.0 }
        "#,
    )
    .unwrap();
    assert_eq!(config.ir_file(), Some("cab.wav"));

    let chain = config.build(Some(&ir)).unwrap();
    let input = AudioBuffer::mono(generate_impulse(16), SAMPLE_RATE);
    let output = chain.process(input).unwrap();

    // fully wet convolution of an impulse reproduces the (normalized) IR
    let out = match output.channels() {
        resonata_core::domain::Channels::Mono(s) => s.clone(),
        _ => panic!("expected mono output"),
    };
    assert_eq!(out.len(), 16);
    assert!((out[0] - 1.0).abs() < 1e-2);
    assert!((out[1] - 0.5).abs() < 1e-2);
    assert!((out[2] - 0.25).abs() < 1e-2);
    assert!(out[4].abs() < 1e-2);
}

#[test]
fn test_cabinet_stage_without_ir_fails_at_build() {
    let config: ChainConfig = toml::from_str(
        r#"
        [[stages]]
        type = "cabinet"
        params = { ir_file = "missing.wav", mix = 1.0 }
        "#,
    )
    .unwrap();

    assert!(config.build(None).is_err());
}

// ============================================================================
// FILE ROUND TRIP THROUGH THE FULL PIPELINE
// ============================================================================

#[tokio::test]
async fn test_process_wav_file_with_saved_chain() {
    let dir = TempDir::new().unwrap();
    let input_path = dir.path().join("input.wav");
    let output_path = dir.path().join("output.wav");
    let chain_path = dir.path().join("chain.toml");

    // deterministic reverb so the test output is stable
    let mut config = builtin_preset("small_room").unwrap();
    if let resonata_core::domain::EffectConfig::Reverb(params) = &mut config.stages[0].effect {
        params.seed = Some(99);
    }
    config.save_to_file(&chain_path).await.unwrap();

    let input = AudioBuffer::mono(generate_sine_wave(220.0, 250.0), SAMPLE_RATE);
    audio::write_wav(&input_path, &input).unwrap();

    // reload everything from disk, as the CLI does
    let loaded_config = ChainConfig::load_from_file(&chain_path).await.unwrap();
    assert_eq!(loaded_config, config);

    let chain = loaded_config.build(None).unwrap();
    let loaded_input = audio::read_wav(&input_path).unwrap();
    let processed = process_pipeline(&chain, None, loaded_input).unwrap();
    audio::write_wav(&output_path, &processed).unwrap();

    let reloaded = audio::read_wav(&output_path).unwrap();
    assert_eq!(reloaded.len(), input.len());
    assert_eq!(reloaded.sample_rate(), SAMPLE_RATE);
    assert!(!reloaded.is_silent());
    assert!(reloaded.peak() <= 1.0 + 1e-3);
}
