//! Chain kinematics: advances arm phases over time and folds a chain into tip positions.
//!
//! Every function here is pure. The engine calls [`trace_dots`] for every specimen of
//! every generation, and external exploration tools call [`full_trace`] directly.

use std::f32::consts::PI;

use crate::schema::{Chromosome, Circle, Polar, Vec3};

/// Phases of every arm at every sample.
///
/// Sample `i` corresponds to `t = i * time_step`. The returned genes carry the
/// advanced phase in `initial_phase`; everything else is copied from the input.
pub fn phase_trace(chromosome: &[Circle], time_step: f32, sample_count: usize) -> Vec<Chromosome> {
    (0..sample_count)
        .map(|i| {
            let time = i as f32 * time_step;
            chromosome
                .iter()
                .map(|circle| Circle {
                    initial_phase: circle.phase_at(time),
                    ..circle.clone()
                })
                .collect()
        })
        .collect()
}

/// Tip of the chain for arms whose `initial_phase` holds the current phase.
///
/// The cumulative angle starts at 0. Each arm adds its phase; every arm after
/// the first also subtracts π, so its angle is measured from the reversed
/// direction of the previous arm.
pub fn tip_position(circles: &[Circle]) -> (Vec3, Polar) {
    let tip = fold_chain(circles.iter().map(|c| (c.initial_phase, c.radius)));
    (tip, cartesian_to_polar(tip))
}

/// Cartesian and polar trace of the chain tip over `sample_count` samples.
pub fn full_trace(
    chromosome: &[Circle],
    time_step: f32,
    sample_count: usize,
) -> (Vec<Vec3>, Vec<Polar>) {
    phase_trace(chromosome, time_step, sample_count)
        .iter()
        .map(|state| tip_position(state))
        .unzip()
}

/// Cartesian trace without materializing intermediate chromosomes.
///
/// Agrees exactly with the cartesian half of [`full_trace`].
pub fn trace_dots(chromosome: &[Circle], time_step: f32, sample_count: usize) -> Vec<Vec3> {
    (0..sample_count)
        .map(|i| {
            let time = i as f32 * time_step;
            fold_chain(chromosome.iter().map(|c| (c.phase_at(time), c.radius)))
        })
        .collect()
}

#[inline]
fn fold_chain(arms: impl Iterator<Item = (f32, f32)>) -> Vec3 {
    let mut tip = Vec3::ZERO;
    let mut theta = 0.0f32;
    for (k, (phase, radius)) in arms.enumerate() {
        theta += phase;
        if k > 0 {
            theta -= PI;
        }
        tip += polar_to_cartesian(radius, theta);
    }
    tip
}

/// `(r cos θ, r sin θ, 0)`.
#[inline]
pub fn polar_to_cartesian(radius: f32, theta: f32) -> Vec3 {
    Vec3::new(radius * theta.cos(), radius * theta.sin(), 0.0)
}

/// `(atan2(y, x), |p|)`.
#[inline]
pub fn cartesian_to_polar(point: Vec3) -> Polar {
    Polar {
        angle: point.y.atan2(point.x),
        radius: point.magnitude(),
    }
}
