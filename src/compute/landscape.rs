//! Error landscape over the radii of two arms.
//!
//! Used by external heat-map tools to inspect how rugged the search space is
//! around a known solution.

use rayon::prelude::*;

use crate::schema::{Chromosome, Circle, FitError, LandscapeConfig, Vec3};

use super::states::trace_dots;

/// Average positional error of each radius variant against the reference trace.
///
/// Cell `[i][j]` holds the error with `first_gene` at radius `i * radius_step` and
/// `second_gene` at `j * radius_step`. All other arms keep their reference values.
pub fn error_landscape(
    reference: &[Circle],
    config: &LandscapeConfig,
) -> Result<Vec<Vec<f32>>, FitError> {
    let len = reference.len();
    for index in [config.first_gene, config.second_gene] {
        if index >= len {
            return Err(FitError::GeneIndexOutOfRange { index, len });
        }
    }
    if config.first_gene == config.second_gene {
        return Err(FitError::SameSweepGene(config.first_gene));
    }
    if !config.radius_step.is_finite() {
        return Err(FitError::InvalidStep {
            name: "radius_step",
            value: config.radius_step,
        });
    }
    if !config.time_step.is_finite() {
        return Err(FitError::InvalidTimeStep(config.time_step));
    }
    if config.drawing_samples == 0 {
        return Err(FitError::NoSamples);
    }

    let target = trace_dots(reference, config.time_step, config.drawing_samples);

    let rows = (0..config.first_samples)
        .into_par_iter()
        .map(|i| {
            let mut variant: Chromosome = reference.to_vec();
            variant[config.first_gene].radius = i as f32 * config.radius_step;
            (0..config.second_samples)
                .map(|j| {
                    variant[config.second_gene].radius = j as f32 * config.radius_step;
                    let dots = trace_dots(&variant, config.time_step, config.drawing_samples);
                    average_error(&dots, &target)
                })
                .collect()
        })
        .collect();

    Ok(rows)
}

fn average_error(dots: &[Vec3], target: &[Vec3]) -> f32 {
    let sum: f32 = dots.iter().zip(target).map(|(a, b)| a.distance(*b)).sum();
    sum / dots.len() as f32
}
