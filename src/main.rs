//! Epicycles CLI - Fit an arm chain to key points from a JSON problem file.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::f32::consts::PI;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use epicycles::{
    compute::evolution::FitEngine,
    schema::{Circle, FitConfig, FitProblem, GaVariant, KeyPoint, PopulationConfig, Vec3},
};

/// Contents of a problem file.
#[derive(Debug, Serialize, Deserialize)]
struct FitJob {
    problem: FitProblem,
    #[serde(default)]
    config: FitConfig,
}

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <problem.json>", args[0]);
        eprintln!();
        eprintln!("Fit a chain of rotating arms so its trace passes through key points.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  problem.json  Seed chain, time schedule, key points and search config");
        eprintln!();
        eprintln!("Example problem is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_job();
        return;
    }

    let job_path = PathBuf::from(&args[1]);

    let job_str = fs::read_to_string(&job_path).unwrap_or_else(|e| {
        eprintln!("Error reading problem file: {}", e);
        std::process::exit(1);
    });

    let job: FitJob = serde_json::from_str(&job_str).unwrap_or_else(|e| {
        eprintln!("Error parsing problem: {}", e);
        std::process::exit(1);
    });

    println!("Epicycle Fit");
    println!("============");
    println!("Arms: {}", job.problem.chromosome.len());
    println!(
        "Samples: {} (dt = {})",
        job.problem.sample_count, job.problem.time_step
    );
    println!("Key points: {}", job.problem.key_points.len());
    println!("Variant: {:?}", job.config.variant);
    println!(
        "Population: {} x {} iterations",
        job.config.population.size, job.config.population.iterations
    );
    println!();

    let iterations = job.config.population.iterations;
    let mut engine = FitEngine::new(job.problem, job.config).unwrap_or_else(|e| {
        eprintln!("Invalid problem: {}", e);
        std::process::exit(1);
    });

    println!("Running...");
    let start = Instant::now();

    let result = engine
        .run_with_callback(|progress| {
            // Print progress every 10%
            if (progress.iteration + 1) % (iterations / 10).max(1) == 0 {
                println!(
                    "  Iteration {}/{}: best max error={:.4}, best appeal={:.4}, worst appeal={:.4}",
                    progress.iteration + 1,
                    progress.total_iterations,
                    progress.best_max_error,
                    progress.best_appeal,
                    progress.worst_appeal
                );
            }
        })
        .unwrap_or_else(|e| {
            eprintln!("Fit failed: {}", e);
            std::process::exit(1);
        });

    let elapsed = start.elapsed();

    println!();
    println!("Result:");
    println!("  Stop reason: {:?}", result.stats.stop_reason);
    println!("  Iterations: {}", result.stats.iterations);
    println!("  Evaluations: {}", result.stats.total_evaluations);
    println!("  Severe mutations: {}", result.stats.severe_mutations);
    println!("  Max error: {:.6}", result.best.max_error);
    println!("  Improvements: {}", result.history.improvement_indices.len());
    if result.stats.returned_from_history {
        println!("  (returned best specimen from history)");
    }
    println!("Time: {:.2}s", elapsed.as_secs_f32());
    println!();

    match serde_json::to_string_pretty(&result.best.chromosome) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing chromosome: {}", e),
    }
}

fn print_example_job() {
    let job = FitJob {
        problem: FitProblem {
            chromosome: vec![Circle::new(0.0, 2.9, 1.3), Circle::new(PI, 0.0, 1.3)],
            time_step: 0.1,
            sample_count: 20,
            key_points: vec![
                KeyPoint::new(0, Vec3::new(3.0, 0.0, 0.0)),
                KeyPoint::new(10, Vec3::new(-3.0, 0.0, 0.0)),
            ],
        },
        config: FitConfig {
            population: PopulationConfig {
                size: 50,
                iterations: 200,
            },
            variant: GaVariant::SevereMutation,
            random_seed: Some(42),
            ..Default::default()
        },
    };

    match serde_json::to_string_pretty(&job) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing example: {}", e),
    }
}
