//! Chromosome manipulation for evolutionary search.
//!
//! Provides rank-biased selection, one-point crossover, step mutation and
//! severe (whole-gene) mutation.

use rand::prelude::*;
use rand_distr::Uniform;

use crate::schema::{Chromosome, Circle, FitError, MutationConfig, SevereMutationConfig};

/// Random number generator wrapper for chromosome operations.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Rank-biased index into a sorted population.
    ///
    /// Draws `floor(-ln(1 - u) / lambda)` for `u ~ U[0, 1)`, so lower indices are
    /// exponentially more likely. An index equal to `avoid` is shifted by one, then
    /// the result is clamped to `[0, population_size - 1]`.
    pub fn pick_index_poisson(
        &mut self,
        population_size: usize,
        lambda: f32,
        avoid: Option<usize>,
    ) -> usize {
        let u = self.rng.r#gen::<f64>();
        let mut index = (-(1.0 - u).ln() / lambda as f64).floor() as usize;
        if Some(index) == avoid {
            index = index.saturating_add(1);
        }
        index.min(population_size.saturating_sub(1))
    }

    /// Two parent indices, the second drawn to avoid the first.
    ///
    /// Only one retry is made, so both may still coincide at the clamp boundary.
    pub fn pick_parents(&mut self, population_size: usize, lambda: f32) -> (usize, usize) {
        let first = self.pick_index_poisson(population_size, lambda, None);
        let second = self.pick_index_poisson(population_size, lambda, Some(first));
        (first, second)
    }

    /// One-point crossover at a uniformly chosen split.
    pub fn crossover(&mut self, a: &[Circle], b: &[Circle]) -> Result<Chromosome, FitError> {
        if a.len() != b.len() {
            return Err(FitError::ChromosomeLengthMismatch {
                left: a.len(),
                right: b.len(),
            });
        }
        if a.is_empty() {
            return Ok(Vec::new());
        }
        let split = self.rng.gen_range(0..a.len());
        crossover_at(a, b, split)
    }

    /// Perturb every gene in place.
    ///
    /// Each parameter gets an independent trial; a success adds or subtracts its
    /// step with equal chance. Time-varying angular velocities are left as they are.
    pub fn mutate(&mut self, chromosome: &mut [Circle], config: &MutationConfig) {
        for circle in chromosome.iter_mut() {
            if self.rng.r#gen::<f32>() < config.radius_probability {
                circle.radius += self.signed(config.radius_step);
            }
            if self.rng.r#gen::<f32>() < config.angular_velocity_probability {
                let delta = self.signed(config.angular_velocity_step);
                if let Some(omega) = circle.angular_velocity.constant_mut() {
                    *omega += delta;
                }
            }
            if self.rng.r#gen::<f32>() < config.phase_probability {
                circle.initial_phase += self.signed(config.phase_step);
            }
        }
    }

    /// With the configured probability, replace one random gene by a fresh one.
    ///
    /// Returns whether a gene was replaced.
    pub fn severe_mutate(&mut self, chromosome: &mut [Circle], config: &SevereMutationConfig) -> bool {
        if chromosome.is_empty() || self.rng.r#gen::<f32>() >= config.probability {
            return false;
        }
        let index = self.rng.gen_range(0..chromosome.len());
        chromosome[index] = self.random_circle(config);
        true
    }

    /// Gene sampled uniformly within the configured bounds.
    pub fn random_circle(&mut self, config: &SevereMutationConfig) -> Circle {
        let radius = self.uniform(config.radius_bounds);
        let angular_velocity = self.uniform(config.angular_velocity_bounds);
        let phase = self.uniform(config.phase_bounds);
        Circle::new(phase, angular_velocity, radius)
    }

    /// Uniform random in inclusive bounds.
    fn uniform(&mut self, bounds: (f32, f32)) -> f32 {
        self.rng.sample(Uniform::new_inclusive(bounds.0, bounds.1))
    }

    fn signed(&mut self, step: f32) -> f32 {
        if self.rng.gen_bool(0.5) { step } else { -step }
    }
}

/// Deterministic core of [`GenomeRng::crossover`].
///
/// The child takes genes `[0..=split]` from `a` and the rest from `b`.
pub fn crossover_at(a: &[Circle], b: &[Circle], split: usize) -> Result<Chromosome, FitError> {
    if a.len() != b.len() {
        return Err(FitError::ChromosomeLengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    if a.is_empty() {
        return Ok(Vec::new());
    }
    if split >= a.len() {
        return Err(FitError::GeneIndexOutOfRange {
            index: split,
            len: a.len(),
        });
    }
    Ok(a[..=split].iter().chain(&b[split + 1..]).cloned().collect())
}
