// Performance benchmarks for the effects engine
//
// Run with: cargo bench --bench dsp_bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use resonata_core::domain::dsp::convolve::convolve_full;
use resonata_core::domain::*;
use std::hint::black_box;

const SAMPLE_RATE: u32 = 44100;

fn sine_buffer(num_samples: usize) -> AudioBuffer {
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / SAMPLE_RATE as f32).sin())
        .collect();
    AudioBuffer::mono(samples, SAMPLE_RATE)
}

fn bench_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("delay");

    for num_samples in [4410, 44100, 441000].iter() {
        let input = sine_buffer(*num_samples);
        let effect = Effect::delay(DelayParams {
            delay_time: 0.25,
            feedback: 0.5,
            mix: 0.5,
        })
        .unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(num_samples),
            num_samples,
            |b, _| {
                b.iter(|| {
                    black_box(effect.apply(black_box(&input), ChannelMode::Both).unwrap());
                });
            },
        );
    }

    group.finish();
}

fn bench_ping_pong(c: &mut Criterion) {
    let mono = sine_buffer(44100);
    let input = mono.to_stereo();
    let effect = Effect::ping_pong(PingPongParams {
        delay_time_left: 0.25,
        delay_time_right: 0.375,
        feedback: 0.5,
        mix: 0.5,
    })
    .unwrap();

    c.bench_function("ping_pong_1s_stereo", |b| {
        b.iter(|| {
            black_box(effect.apply(black_box(&input), ChannelMode::Both).unwrap());
        });
    });
}

fn bench_reverb(c: &mut Criterion) {
    let input = sine_buffer(44100);
    let effect = Effect::reverb(ReverbParams {
        t60: 0.8,
        num_reflections: 3000,
        decay_rate: 0.8,
        mix: 1.0,
        seed: Some(7),
    })
    .unwrap();

    c.bench_function("reverb_1s_mono", |b| {
        b.iter(|| {
            black_box(effect.apply(black_box(&input), ChannelMode::Both).unwrap());
        });
    });
}

fn bench_convolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("convolve_full");

    let signal: Vec<f32> = (0..44100).map(|i| (i as f32 * 0.001).sin()).collect();

    for kernel_len in [512, 4096, 32768].iter() {
        let kernel: Vec<f32> = (0..*kernel_len).map(|i| (-(i as f32) * 0.001).exp()).collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(kernel_len),
            kernel_len,
            |b, _| {
                b.iter(|| {
                    black_box(convolve_full(black_box(&signal), black_box(&kernel)));
                });
            },
        );
    }

    group.finish();
}

fn bench_ir_synthesis(c: &mut Criterion) {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    let synth = ImpulseResponseSynthesizer::new(0.8, 3000, 0.8).unwrap();

    c.bench_function("ir_synthesis_concert_hall", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(42);
            black_box(synth.synthesize(SAMPLE_RATE, &mut rng));
        });
    });
}

criterion_group!(
    benches,
    bench_delay,
    bench_ping_pong,
    bench_reverb,
    bench_convolution,
    bench_ir_synthesis
);

criterion_main!(benches);
