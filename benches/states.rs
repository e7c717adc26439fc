//! Benchmarks for chain tracing and fitness evaluation.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use epicycles::{
    compute::{
        evolution::{FitnessEvaluator, Objective, Specimen},
        full_trace, trace_dots,
    },
    schema::{Chromosome, Circle, KeyPoint, Vec3},
};

fn chain(arms: usize) -> Chromosome {
    (0..arms)
        .map(|i| Circle::new(i as f32 * 0.7, (i as f32 - 2.0) * 0.9, 1.0 / (i + 1) as f32))
        .collect()
}

fn bench_trace(c: &mut Criterion) {
    let mut group = c.benchmark_group("trace");

    for arms in [2, 8, 32] {
        let chromosome = chain(arms);

        group.bench_with_input(BenchmarkId::new("trace_dots", arms), &arms, |b, _| {
            b.iter(|| trace_dots(black_box(&chromosome), 0.01, 1000));
        });

        group.bench_with_input(BenchmarkId::new("full_trace", arms), &arms, |b, _| {
            b.iter(|| full_trace(black_box(&chromosome), 0.01, 1000));
        });
    }

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    for samples in [100, 1000, 10000] {
        let key_points: Vec<KeyPoint> = (0..samples)
            .step_by(samples / 10)
            .map(|i| KeyPoint::new(i, Vec3::new(1.0, 0.0, 0.0)))
            .collect();
        let evaluator = FitnessEvaluator::new(0.01, samples, key_points, Objective::Minimax);
        let mut specimen = Specimen::new(chain(8));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{} samples", samples)),
            &samples,
            |b, _| {
                b.iter(|| evaluator.evaluate(black_box(&mut specimen)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_trace, bench_evaluate);
criterion_main!(benches);
