//! Progress and result types for fitting runs.

use serde::{Deserialize, Serialize};

use super::{Chromosome, Vec3};

/// Progress update emitted once per generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitProgress {
    /// Current iteration (0-based).
    pub iteration: usize,
    /// Iteration budget.
    pub total_iterations: usize,
    /// Highest appeal in the current population.
    pub best_appeal: f32,
    /// Lowest appeal in the current population.
    pub worst_appeal: f32,
    /// Smallest worst-key-point error in the current population.
    pub best_max_error: f32,
    /// Appeal of the best specimen seen so far.
    pub best_in_history_appeal: f32,
    /// Whether this generation improved on every earlier one.
    pub improved: bool,
}

/// Snapshot of a specimen for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecimenSnapshot {
    pub chromosome: Chromosome,
    pub appeal: f32,
    /// Largest key-point error (unweighted).
    pub max_error: f32,
    /// Error magnitude per key point, in key-point order.
    pub error_magnitudes: Vec<f32>,
    /// Traced dots of the chromosome.
    pub trace_dots: Vec<Vec3>,
}

/// Per-parameter diversity of a population, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneBias {
    pub radius: f32,
    pub angular_velocity: f32,
    pub phase: f32,
}

/// History of a run for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FitHistory {
    /// Best appeal per generation.
    pub best_appeal: Vec<f32>,
    /// Worst appeal per generation.
    pub worst_appeal: Vec<f32>,
    /// Smallest max error per generation.
    pub best_max_error: Vec<f32>,
    /// Max error of the best-in-history specimen, per generation.
    pub best_in_history_max_error: Vec<f32>,
    /// Appeal of the best-in-history specimen, per generation.
    pub best_in_history_appeal: Vec<f32>,
    /// Population diversity per generation.
    pub diversity: Vec<GeneBias>,
    /// Generations at which the best inverse max error improved.
    pub improvement_indices: Vec<usize>,
    /// Generations elapsed between consecutive improvements.
    pub improvement_intervals: Vec<usize>,
    /// Wall time of each generation in milliseconds.
    pub iteration_times_ms: Vec<f64>,
}

/// Statistics from a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitStats {
    /// Generations actually run.
    pub iterations: usize,
    /// Total specimen evaluations.
    pub total_evaluations: u64,
    /// Number of severe mutations that fired.
    pub severe_mutations: u64,
    pub elapsed_seconds: f64,
    pub stop_reason: StopReason,
    /// Whether the best-in-history specimen was returned instead of the final best.
    pub returned_from_history: bool,
}

/// Reason the generation loop stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Ran the full iteration budget.
    IterationBudget,
    /// Cancelled through the cancel handle.
    Cancelled,
    /// Wall-clock deadline reached.
    DeadlineExceeded,
}

/// Final result of a fitting run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    /// Best specimen found.
    pub best: SpecimenSnapshot,
    pub stats: FitStats,
    pub history: FitHistory,
}
