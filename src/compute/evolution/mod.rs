//! Evolutionary search for arm chains that pass through key points.
//!
//! # Overview
//!
//! - **Specimens** (`specimen`): A chromosome with its trace, errors and appeal
//! - **Fitness** (`fitness`): Key-point errors reduced to an appeal, plus mistake/correction helpers
//! - **Genome Operations** (`genome`): Rank-biased selection, crossover, mutation and severe mutation
//! - **Ranking** (`ranking`): Appeal, deviation-struggle and best-mistake-correction orders
//! - **Strategy** (`strategy`): The parameters each algorithm variant changes
//! - **Diversity** (`diversity`): Grefenstette bias of a population
//! - **Search** (`search`): The generation loop
//!
//! # Example
//!
//! ```rust,no_run
//! use std::f32::consts::PI;
//!
//! use epicycles::schema::{Circle, FitConfig, FitProblem, GaVariant, KeyPoint, Vec3};
//! use epicycles::compute::evolution::FitEngine;
//!
//! let problem = FitProblem {
//!     chromosome: vec![Circle::new(0.0, 3.0, 1.5), Circle::new(PI, 0.0, 1.5)],
//!     time_step: 0.1,
//!     sample_count: 20,
//!     key_points: vec![
//!         KeyPoint::new(0, Vec3::new(3.0, 0.0, 0.0)),
//!         KeyPoint::new(10, Vec3::new(-3.0, 0.0, 0.0)),
//!     ],
//! };
//! let config = FitConfig {
//!     variant: GaVariant::Elitism,
//!     ..Default::default()
//! };
//!
//! let mut engine = FitEngine::new(problem, config).expect("valid problem");
//! let result = engine
//!     .run_with_callback(|progress| {
//!         println!("Iteration {}: best appeal = {:.3}",
//!             progress.iteration, progress.best_appeal);
//!     })
//!     .expect("fit");
//!
//! println!("Max error: {:.4}", result.best.max_error);
//! ```

mod diversity;
mod fitness;
mod genome;
mod ranking;
mod search;
mod specimen;
mod strategy;

pub use diversity::grefenstette_bias;
pub use fitness::{
    FitnessEvaluator, MAX_APPEAL, Mistake, Objective, corrections, inverse_appeal,
    min_max_normalize,
};
pub use genome::{GenomeRng, crossover_at};
pub use ranking::{Ranker, Ranking, correction_order, reorder_by_scores, sort_by_appeal};
pub use search::{FitEngine, fit};
pub use specimen::Specimen;
pub use strategy::{MateChoice, Strategy};
