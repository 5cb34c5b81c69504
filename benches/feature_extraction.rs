use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use voxbridge::decode::{GreedyTokenDecoder, Vocabulary};
use voxbridge::features::{FeatureConfig, FeatureExtractor, PowerSpectrum, power_spectrum_direct};
use voxbridge::pipeline::one_hot_logits;
use voxbridge::viseme::generate;

/// Deterministic tone-plus-noise signal at `rate` Hz.
fn signal(secs: f64, rate: u32) -> Vec<f32> {
    let len = (secs * rate as f64) as usize;
    let mut state: u32 = 0x1234_5678;
    (0..len)
        .map(|i| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let noise = (state >> 8) as f32 / (1u32 << 24) as f32 - 0.5;
            let t = i as f32 / rate as f32;
            0.4 * (2.0 * std::f32::consts::PI * 220.0 * t).sin() + 0.05 * noise
        })
        .collect()
}

fn bench_extract(c: &mut Criterion) {
    let extractor = FeatureExtractor::new(FeatureConfig::default()).expect("default config");
    let mut group = c.benchmark_group("extract");

    for secs in [1.0, 5.0, 10.0] {
        let audio = signal(secs, 16000);
        group.bench_with_input(BenchmarkId::new("16k", secs), &audio, |b, audio| {
            b.iter(|| extractor.extract(black_box(audio), 16000))
        });
    }

    // Resampling path
    let audio = signal(5.0, 48000);
    group.bench_with_input(BenchmarkId::new("48k", 5.0), &audio, |b, audio| {
        b.iter(|| extractor.extract(black_box(audio), 48000))
    });
    group.finish();
}

fn bench_spectrum(c: &mut Criterion) {
    let frame: Vec<f64> = signal(0.025, 16000).into_iter().map(f64::from).collect();
    let spectrum = PowerSpectrum::new(512);

    let mut group = c.benchmark_group("power_spectrum");
    group.bench_function("fft", |b| b.iter(|| spectrum.compute(black_box(&frame))));
    group.bench_function("direct", |b| {
        b.iter(|| power_spectrum_direct(black_box(&frame), 512))
    });
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let vocab_size = 5000;
    let vocab = Vocabulary::from_symbols((0..vocab_size).map(|i| format!("tok{}", i)));
    let ids: Vec<u32> = (0..200).map(|i| (i * 37 % vocab_size) as u32 + 4).collect();
    let logits = one_hot_logits(&ids, vocab_size);
    let decoder = GreedyTokenDecoder::new();

    c.bench_function("greedy_decode_200x5000", |b| {
        b.iter(|| decoder.decode_text(black_box(&logits), vocab_size, &vocab, None))
    });
}

fn bench_visemes(c: &mut Criterion) {
    let text = "the quick brown fox jumps over the lazy dog ".repeat(8);
    c.bench_function("viseme_timeline", |b| {
        b.iter(|| generate(black_box(&text), "en", 12.0))
    });
}

criterion_group!(
    benches,
    bench_extract,
    bench_spectrum,
    bench_decode,
    bench_visemes
);
criterion_main!(benches);
