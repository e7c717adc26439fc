//! Epicycles - Evolutionary fitting of rotating arm chains.
//!
//! A chain of rotating arms traces a planar curve over discretized time. This
//! crate finds arm radii, angular velocities and phases so that the curve passes
//! near user-specified key points, using a genetic algorithm with several
//! selectable variants.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Arm, problem, configuration and result types
//! - `compute`: Chain kinematics, error landscapes and the evolutionary search
//!
//! # Example
//!
//! ```rust,no_run
//! use std::f32::consts::PI;
//!
//! use epicycles::{
//!     fit,
//!     schema::{Circle, FitConfig, KeyPoint, Vec3},
//! };
//!
//! let seed = vec![Circle::new(0.0, 3.0, 1.5), Circle::new(PI, 0.0, 1.5)];
//! let key_points = vec![
//!     KeyPoint::new(0, Vec3::new(3.0, 0.0, 0.0)),
//!     KeyPoint::new(10, Vec3::new(-3.0, 0.0, 0.0)),
//! ];
//!
//! let best = fit(seed, 0.1, 20, key_points, FitConfig::default()).expect("valid problem");
//! let dots = epicycles::compute::trace_dots(&best, 0.1, 20);
//! println!("Tip at t=1: {:?}", dots[10]);
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{FitEngine, fit};
pub use compute::{full_trace, trace_dots};
pub use schema::{Chromosome, Circle, FitConfig, FitError, FitProblem, FitResult, KeyPoint};
