//! Quick fitting performance test

use std::f32::consts::PI;
use std::time::Instant;

use epicycles::{
    FitEngine,
    schema::{Circle, FitConfig, FitProblem, GaVariant, KeyPoint, PopulationConfig, Vec3},
};

fn problem(arms: usize, sample_count: usize) -> FitProblem {
    let chromosome = (0..arms)
        .map(|i| Circle::new(if i == 0 { 0.0 } else { PI }, 1.0 + i as f32 * 0.5, 3.0 / arms as f32))
        .collect();
    let key_points = (0..8)
        .map(|k| {
            let angle = k as f32 * PI / 4.0;
            KeyPoint::new(
                k * sample_count / 8,
                Vec3::new(3.0 * angle.cos(), 2.0 * angle.sin(), 0.0),
            )
        })
        .collect();

    FitProblem {
        chromosome,
        time_step: 2.0 * PI / sample_count as f32,
        sample_count,
        key_points,
    }
}

fn main() {
    println!("=== Fit Performance Test ===\n");

    let variants = [
        GaVariant::Base,
        GaVariant::Elitism,
        GaVariant::SevereMutation,
        GaVariant::DeviationStruggle {
            min_appeal_difference: 0.05,
        },
        GaVariant::BestMistakeCorrection {
            appeal_weight: 3.0,
            correction_weight: 2.0,
        },
        GaVariant::Love,
    ];

    for variant in variants {
        println!("Variant: {:?}", variant);

        let config = FitConfig {
            population: PopulationConfig {
                size: 100,
                iterations: 200,
            },
            variant,
            random_seed: Some(42),
            ..Default::default()
        };

        let start = Instant::now();
        let mut engine = match FitEngine::new(problem(4, 400), config) {
            Ok(engine) => engine,
            Err(e) => {
                eprintln!("  Invalid config: {}", e);
                continue;
            }
        };
        let result = match engine.run() {
            Ok(result) => result,
            Err(e) => {
                eprintln!("  Fit failed: {}", e);
                continue;
            }
        };
        let elapsed = start.elapsed();

        let total_evals = result.stats.total_evaluations;
        let evals_per_sec = total_evals as f64 / elapsed.as_secs_f64();

        println!("  Iterations:     {}", result.stats.iterations);
        println!("  Evaluations:    {}", total_evals);
        println!("  Elapsed:        {:.2}s", elapsed.as_secs_f64());
        println!("  Evals/sec:      {:.1}", evals_per_sec);
        println!("  Max error:      {:.4}", result.best.max_error);
        println!("  Improvements:   {}", result.history.improvement_indices.len());
        println!();
    }

    println!("=== Scalability Test (4 arms, elitism) ===\n");

    for sample_count in [100, 400, 1600, 6400] {
        let config = FitConfig {
            population: PopulationConfig {
                size: 100,
                iterations: 20,
            },
            variant: GaVariant::Elitism,
            random_seed: Some(42),
            ..Default::default()
        };

        let start = Instant::now();
        let result = FitEngine::new(problem(4, sample_count), config).and_then(|mut e| e.run());
        let elapsed = start.elapsed();

        match result {
            Ok(result) => {
                let per_iteration = result.history.iteration_times_ms.iter().sum::<f64>()
                    / result.history.iteration_times_ms.len().max(1) as f64;
                println!(
                    "  Samples {:>5}: {:.2}s total, {:.2}ms per iteration",
                    sample_count,
                    elapsed.as_secs_f64(),
                    per_iteration
                );
            }
            Err(e) => eprintln!("  Samples {:>5}: {}", sample_count, e),
        }
    }
}
