//! Benchmarks for the step engine.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use lenia_engine::{
    compute::{Field, StepEngine},
    schema::{EngineConfig, Pattern, RuleConfig, Seed},
};

fn bench_single_channel_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_channel_step");

    for size in [64, 128, 256, 512] {
        let config = EngineConfig {
            width: size,
            height: size,
            ..Default::default()
        };

        let seed = Seed {
            pattern: Pattern::GaussianSpot {
                center: (0.5, 0.5),
                radius: 0.15,
                amplitude: 1.0,
                channel: 0,
            },
        };

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            let mut field = Field::new(config.width, config.height, config.channels);
            seed.apply(&mut field);
            let mut engine = StepEngine::new(config.width, config.height);

            b.iter(|| {
                engine.step(&mut field, &config, 1);
                black_box(field.get(0, 0, 0));
            });
        });
    }

    group.finish();
}

fn bench_multi_channel_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi_channel_step");

    for rules in [1usize, 4, 8] {
        let config = EngineConfig {
            width: 128,
            height: 128,
            channels: 3,
            rules: (0..rules)
                .map(|i| RuleConfig {
                    source_channel: i % 3,
                    dest_channel: (i + 1) % 3,
                    radius_fraction: 0.5,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let seed = Seed {
            pattern: Pattern::Noise {
                amplitude: 0.5,
                channel: None,
                seed: 1,
            },
        };

        group.bench_with_input(BenchmarkId::from_parameter(rules), &rules, |b, _| {
            let mut field = Field::new(config.width, config.height, config.channels);
            seed.apply(&mut field);
            let mut engine = StepEngine::new(config.width, config.height);

            b.iter(|| {
                engine.step_multi_channel(&mut field, &config, 1);
                black_box(field.get(0, 0, 0));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single_channel_step, bench_multi_channel_step);
criterion_main!(benches);
