//! Engine throughput benchmarks.
//!
//! Measures token minting, noise/correction rounds and validation cost.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use killswitch_core::{EngineConfig, IntegrityEngine, SeededEntropy};

fn engine() -> IntegrityEngine {
    IntegrityEngine::with_entropy(EngineConfig::default(), SeededEntropy::new(0xC0FFEE))
        .expect("default config is valid")
}

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation");
    let mut engine = engine();

    group.throughput(Throughput::Elements(1));
    group.bench_function("irrational_state", |b| {
        b.iter(|| black_box(engine.generate_irrational_state()))
    });
    group.bench_function("superposition", |b| {
        b.iter(|| black_box(engine.generate_superposition()))
    });
    group.bench_function("entangle_pair", |b| {
        b.iter(|| black_box(engine.entangle_dimensions(black_box(3), black_box(41))))
    });

    group.finish();
}

fn bench_noise_rounds(c: &mut Criterion) {
    let mut group = c.benchmark_group("noise_rounds");

    for rounds in [1usize, 10, 100] {
        group.throughput(Throughput::Elements(rounds as u64));
        group.bench_function(BenchmarkId::new("noise_then_correct", rounds), |b| {
            let mut engine = engine();
            let state = engine.generate_irrational_state();
            b.iter(|| {
                let mut noised = state.clone();
                for _ in 0..rounds {
                    noised = engine.apply_environmental_noise(&noised);
                }
                black_box(engine.apply_error_correction(&noised))
            })
        });
    }

    group.finish();
}

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("validation");

    for filled in [0usize, 1024, 4096] {
        let mut engine = engine();
        let state = engine.generate_irrational_state();
        for _ in 0..filled {
            engine.apply_environmental_noise(&state);
        }
        group.bench_function(BenchmarkId::new("validate_with_history", filled), |b| {
            b.iter(|| black_box(engine.validate_quantum_state(black_box(&state))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_generation, bench_noise_rounds, bench_validation);
criterion_main!(benches);
