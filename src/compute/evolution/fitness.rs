//! Fitness evaluation against key points.
//!
//! The default objective is minimax: appeal is the inverse of the worst key-point
//! error. Helpers for the correction-based variants live here as well.

use std::collections::HashSet;

use crate::compute::trace_dots;
use crate::schema::{KeyPoint, Vec3};

use super::specimen::Specimen;

/// Appeal of a perfect fit.
pub const MAX_APPEAL: f32 = f32::MAX;

/// How error magnitudes are reduced to an appeal.
#[derive(Debug, Clone, PartialEq)]
pub enum Objective {
    /// `1 / max(error)`.
    Minimax,
    /// Errors at the listed sample indices are multiplied by `weight` before the max.
    CriticalPoints { indices: HashSet<usize>, weight: f32 },
}

/// Traces specimens and scores them against a key point set.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    time_step: f32,
    sample_count: usize,
    key_points: Vec<KeyPoint>,
    objective: Objective,
}

impl FitnessEvaluator {
    /// Key points must already be validated against `sample_count`.
    pub fn new(
        time_step: f32,
        sample_count: usize,
        key_points: Vec<KeyPoint>,
        objective: Objective,
    ) -> Self {
        Self {
            time_step,
            sample_count,
            key_points,
            objective,
        }
    }

    /// Recompute the trace, errors and appeal of a specimen.
    pub fn evaluate(&self, specimen: &mut Specimen) {
        specimen.trace_dots = trace_dots(&specimen.chromosome, self.time_step, self.sample_count);
        self.score(specimen);
    }

    /// Errors and appeal from the specimen's current trace.
    pub(crate) fn score(&self, specimen: &mut Specimen) {
        specimen.errors = self
            .key_points
            .iter()
            .map(|p| p.target - specimen.trace_dots[p.sample_index])
            .collect();
        specimen.error_magnitudes = specimen.errors.iter().map(|e| e.magnitude()).collect();
        specimen.max_error = specimen
            .error_magnitudes
            .iter()
            .copied()
            .fold(0.0f32, f32::max);

        specimen.appeal = match &self.objective {
            Objective::Minimax => inverse_appeal(specimen.max_error),
            Objective::CriticalPoints { indices, weight } => {
                let weighted_max = self
                    .key_points
                    .iter()
                    .zip(&specimen.error_magnitudes)
                    .map(|(p, &e)| {
                        if indices.contains(&p.sample_index) {
                            e * weight
                        } else {
                            e
                        }
                    })
                    .fold(0.0f32, f32::max);
                inverse_appeal(weighted_max)
            }
        };
    }

    /// Key point where the specimen errs most. `None` only without key points.
    pub fn worst_key_point(&self, specimen: &Specimen) -> Option<Mistake> {
        specimen
            .error_magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, &error)| Mistake {
                key_point: i,
                sample_index: self.key_points[i].sample_index,
                target: self.key_points[i].target,
                error,
            })
    }
}

/// The worst key point of a specimen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mistake {
    /// Position in the key point list.
    pub key_point: usize,
    pub sample_index: usize,
    pub target: Vec3,
    /// Distance between target and traced dot.
    pub error: f32,
}

/// Inverse of an error, mapped to [`MAX_APPEAL`] when the error is zero or the
/// inverse is not finite.
#[inline]
pub fn inverse_appeal(error: f32) -> f32 {
    if error <= 0.0 {
        return MAX_APPEAL;
    }
    let appeal = 1.0 / error;
    if appeal.is_finite() { appeal } else { MAX_APPEAL }
}

/// Relative reduction of the mistake's error achieved by each specimen at the
/// same key point. Negative values mean the specimen does worse there.
///
/// A zero mistake error yields zero correction for everyone.
pub fn corrections(population: &[Specimen], mistake: &Mistake) -> Vec<f32> {
    if mistake.error <= 0.0 {
        return vec![0.0; population.len()];
    }
    population
        .iter()
        .map(|s| {
            let distance = mistake.target.distance(s.trace_dots[mistake.sample_index]);
            (mistake.error - distance) / mistake.error
        })
        .collect()
}

/// Min-max normalization to `[0, 1]`. A zero range maps everything to 0.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    if !(range.is_finite() && range > 0.0) {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}
