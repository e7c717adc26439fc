//! A chromosome together with the data derived from it in one generation.

use crate::schema::{Chromosome, Circle, SpecimenSnapshot, Vec3};

/// A candidate chain and its evaluation.
///
/// Derived fields are empty until [`FitnessEvaluator::evaluate`] runs; a specimen
/// built from a new chromosome never carries data from another chromosome.
///
/// [`FitnessEvaluator::evaluate`]: super::FitnessEvaluator::evaluate
#[derive(Debug, Clone)]
pub struct Specimen {
    pub chromosome: Chromosome,
    /// Traced tip positions, one per sample.
    pub trace_dots: Vec<Vec3>,
    /// `target - traced` per key point, in key-point order.
    pub errors: Vec<Vec3>,
    /// Magnitudes of `errors`.
    pub error_magnitudes: Vec<f32>,
    /// Largest entry of `error_magnitudes`.
    pub max_error: f32,
    /// Scalar fitness; higher is better.
    pub appeal: f32,
}

impl Specimen {
    /// Unevaluated specimen.
    pub fn new(chromosome: Chromosome) -> Self {
        Self {
            chromosome,
            trace_dots: Vec::new(),
            errors: Vec::new(),
            error_magnitudes: Vec::new(),
            max_error: f32::INFINITY,
            appeal: 0.0,
        }
    }

    pub fn is_evaluated(&self) -> bool {
        !self.trace_dots.is_empty()
    }

    pub fn to_snapshot(&self) -> SpecimenSnapshot {
        SpecimenSnapshot {
            chromosome: self.chromosome.clone(),
            appeal: self.appeal,
            max_error: self.max_error,
            error_magnitudes: self.error_magnitudes.clone(),
            trace_dots: self.trace_dots.clone(),
        }
    }
}

impl AsRef<[Circle]> for Specimen {
    fn as_ref(&self) -> &[Circle] {
        &self.chromosome
    }
}
