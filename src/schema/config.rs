//! Configuration types for epicycle fitting runs.

use std::collections::HashSet;
use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use super::{Chromosome, KeyPoint};

/// A fitting problem: the seed chromosome, the time schedule and the targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitProblem {
    /// Seed arm list. Its length is kept for the whole run.
    pub chromosome: Chromosome,
    /// Time between consecutive samples.
    pub time_step: f32,
    /// Number of traced samples.
    pub sample_count: usize,
    /// Points the traced curve should pass through.
    pub key_points: Vec<KeyPoint>,
}

impl FitProblem {
    /// Validate the time schedule and key points.
    pub fn validate(&self) -> Result<(), FitError> {
        if !self.time_step.is_finite() {
            return Err(FitError::InvalidTimeStep(self.time_step));
        }
        if self.sample_count == 0 {
            return Err(FitError::NoSamples);
        }
        if self.key_points.is_empty() {
            return Err(FitError::NoKeyPoints);
        }
        if self.key_points.len() > self.sample_count {
            return Err(FitError::TooManyKeyPoints {
                count: self.key_points.len(),
                sample_count: self.sample_count,
            });
        }

        let mut seen = HashSet::with_capacity(self.key_points.len());
        for point in &self.key_points {
            if point.sample_index >= self.sample_count {
                return Err(FitError::KeyPointOutOfRange {
                    index: point.sample_index,
                    sample_count: self.sample_count,
                });
            }
            if !seen.insert(point.sample_index) {
                return Err(FitError::DuplicateKeyPoint(point.sample_index));
            }
            if !point.target.is_finite() {
                return Err(FitError::NonFiniteTarget(point.sample_index));
            }
        }
        Ok(())
    }
}

/// Top-level configuration of the evolutionary search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitConfig {
    /// Population size and iteration budget.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Small per-parameter perturbations.
    #[serde(default)]
    pub mutation: MutationConfig,
    /// Whole-gene replacement, used by variants that enable it.
    #[serde(default)]
    pub severe_mutation: SevereMutationConfig,
    /// Parent selection pressure.
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Fraction of the ranked population copied unchanged, in `[0, 1)`.
    #[serde(default = "default_elitism_percent")]
    pub elitism_percent: f32,
    /// Algorithm variant.
    #[serde(default)]
    pub variant: GaVariant,
    /// Return the best specimen ever seen if the final population regressed.
    /// Always on for `BestMistakeCorrection`.
    #[serde(default)]
    pub keep_best_in_history: bool,
    /// Wall-clock budget checked between generations.
    #[serde(default)]
    pub time_limit_seconds: Option<f64>,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            population: PopulationConfig::default(),
            mutation: MutationConfig::default(),
            severe_mutation: SevereMutationConfig::default(),
            selection: SelectionConfig::default(),
            elitism_percent: default_elitism_percent(),
            variant: GaVariant::default(),
            keep_best_in_history: false,
            time_limit_seconds: None,
            random_seed: None,
        }
    }
}

fn default_elitism_percent() -> f32 {
    0.1
}

/// Population and iteration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of specimens per generation.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Number of generations to run.
    #[serde(default = "default_iterations")]
    pub iterations: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            iterations: default_iterations(),
        }
    }
}

fn default_population_size() -> usize {
    100
}
fn default_iterations() -> usize {
    1000
}

/// Per-parameter mutation probabilities and step sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationConfig {
    #[serde(default = "default_radius_probability")]
    pub radius_probability: f32,
    #[serde(default = "default_radius_step")]
    pub radius_step: f32,
    #[serde(default = "default_angular_velocity_probability")]
    pub angular_velocity_probability: f32,
    #[serde(default = "default_angular_velocity_step")]
    pub angular_velocity_step: f32,
    #[serde(default = "default_phase_probability")]
    pub phase_probability: f32,
    #[serde(default = "default_phase_step")]
    pub phase_step: f32,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            radius_probability: default_radius_probability(),
            radius_step: default_radius_step(),
            angular_velocity_probability: default_angular_velocity_probability(),
            angular_velocity_step: default_angular_velocity_step(),
            phase_probability: default_phase_probability(),
            phase_step: default_phase_step(),
        }
    }
}

fn default_radius_probability() -> f32 {
    0.2
}
fn default_radius_step() -> f32 {
    0.0125
}
fn default_angular_velocity_probability() -> f32 {
    0.1
}
fn default_angular_velocity_step() -> f32 {
    0.05
}
fn default_phase_probability() -> f32 {
    0.1
}
fn default_phase_step() -> f32 {
    0.05
}

/// Whole-gene replacement probability and sampling ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SevereMutationConfig {
    /// Chance per mutated chromosome that one gene is replaced.
    #[serde(default = "default_severe_probability")]
    pub probability: f32,
    #[serde(default = "default_radius_bounds")]
    pub radius_bounds: (f32, f32),
    #[serde(default = "default_angular_velocity_bounds")]
    pub angular_velocity_bounds: (f32, f32),
    #[serde(default = "default_phase_bounds")]
    pub phase_bounds: (f32, f32),
}

impl Default for SevereMutationConfig {
    fn default() -> Self {
        Self {
            probability: default_severe_probability(),
            radius_bounds: default_radius_bounds(),
            angular_velocity_bounds: default_angular_velocity_bounds(),
            phase_bounds: default_phase_bounds(),
        }
    }
}

fn default_severe_probability() -> f32 {
    0.001
}
fn default_radius_bounds() -> (f32, f32) {
    (0.0, 0.5)
}
fn default_angular_velocity_bounds() -> (f32, f32) {
    (-2.0, 2.0)
}
fn default_phase_bounds() -> (f32, f32) {
    (0.0, 2.0 * PI)
}

/// Rank-biased parent selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Rate of the exponential over ranks. Higher means sharper preference for elites.
    #[serde(default = "default_lambda")]
    pub lambda: f32,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            lambda: default_lambda(),
        }
    }
}

fn default_lambda() -> f32 {
    0.5
}

/// Algorithm variant. Each one overrides one or two steps of the generation loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GaVariant {
    /// Crossover and mutation only; best of the last generation is returned.
    #[default]
    Base,
    /// Top fraction of the ranked population survives unchanged.
    Elitism,
    /// Elitism plus whole-gene replacement.
    SevereMutation,
    /// Elitism with weighted errors at the listed sample indices. The weight must
    /// exceed 1.
    CriticalPoints {
        /// Sample indices of the key points to prioritize.
        indices: Vec<usize>,
        #[serde(default = "default_critical_weight")]
        weight: f32,
    },
    /// Elitism; on stagnation, favors specimens far from the population mean.
    DeviationStruggle {
        #[serde(default = "default_min_appeal_difference")]
        min_appeal_difference: f32,
    },
    /// Severe mutation; ranks by blended appeal and correction of the best specimen's
    /// worst key point.
    BestMistakeCorrection {
        #[serde(default = "default_appeal_weight")]
        appeal_weight: f32,
        #[serde(default = "default_correction_weight")]
        correction_weight: f32,
    },
    /// Severe mutation; the second parent is chosen by how well it corrects the first.
    Love,
}

fn default_critical_weight() -> f32 {
    10.0
}
fn default_min_appeal_difference() -> f32 {
    0.05
}
fn default_appeal_weight() -> f32 {
    3.0
}
fn default_correction_weight() -> f32 {
    2.0
}

impl FitConfig {
    /// Validate the configuration against a problem.
    pub fn validate(&self, problem: &FitProblem) -> Result<(), FitError> {
        if self.population.size < 2 {
            return Err(FitError::PopulationTooSmall(self.population.size));
        }

        if !(0.0..1.0).contains(&self.elitism_percent) {
            return Err(FitError::InvalidElitism(self.elitism_percent));
        }

        if !self.selection.lambda.is_finite() || self.selection.lambda <= 0.0 {
            return Err(FitError::InvalidLambda(self.selection.lambda));
        }

        let m = &self.mutation;
        check_probability(m.radius_probability, "radius_probability")?;
        check_probability(m.angular_velocity_probability, "angular_velocity_probability")?;
        check_probability(m.phase_probability, "phase_probability")?;
        check_step(m.radius_step, "radius_step")?;
        check_step(m.angular_velocity_step, "angular_velocity_step")?;
        check_step(m.phase_step, "phase_step")?;

        let s = &self.severe_mutation;
        check_probability(s.probability, "severe_mutation.probability")?;
        check_bounds(s.radius_bounds, "radius")?;
        check_bounds(s.angular_velocity_bounds, "angular_velocity")?;
        check_bounds(s.phase_bounds, "phase")?;

        if let Some(limit) = self.time_limit_seconds
            && !(limit.is_finite() && limit >= 0.0)
        {
            return Err(FitError::InvalidTimeLimit(limit));
        }

        match &self.variant {
            GaVariant::CriticalPoints { indices, weight } => {
                if !weight.is_finite() || *weight <= 1.0 {
                    return Err(FitError::InvalidWeight {
                        name: "critical weight",
                        value: *weight,
                    });
                }
                for index in indices {
                    if !problem.key_points.iter().any(|p| p.sample_index == *index) {
                        return Err(FitError::UnknownCriticalPoint(*index));
                    }
                }
            }
            GaVariant::DeviationStruggle {
                min_appeal_difference,
            } => {
                if !min_appeal_difference.is_finite() || *min_appeal_difference < 0.0 {
                    return Err(FitError::InvalidWeight {
                        name: "min_appeal_difference",
                        value: *min_appeal_difference,
                    });
                }
            }
            GaVariant::BestMistakeCorrection {
                appeal_weight,
                correction_weight,
            } => {
                for (name, value) in [
                    ("appeal_weight", *appeal_weight),
                    ("correction_weight", *correction_weight),
                ] {
                    if !value.is_finite() || value < 0.0 {
                        return Err(FitError::InvalidWeight { name, value });
                    }
                }
            }
            GaVariant::Base | GaVariant::Elitism | GaVariant::SevereMutation | GaVariant::Love => {}
        }

        Ok(())
    }
}

fn check_probability(value: f32, name: &'static str) -> Result<(), FitError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(FitError::InvalidProbability { name, value })
    }
}

fn check_step(value: f32, name: &'static str) -> Result<(), FitError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FitError::InvalidStep { name, value })
    }
}

fn check_bounds(bounds: (f32, f32), name: &'static str) -> Result<(), FitError> {
    if bounds.0.is_finite() && bounds.1.is_finite() && bounds.0 <= bounds.1 {
        Ok(())
    } else {
        Err(FitError::InvalidBounds {
            name,
            min: bounds.0,
            max: bounds.1,
        })
    }
}

/// Radius sweep over two arms of a reference chromosome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandscapeConfig {
    /// Index of the arm swept along the rows.
    pub first_gene: usize,
    /// Index of the arm swept along the columns.
    pub second_gene: usize,
    /// Radius increment between grid cells.
    #[serde(default = "default_radius_change_step")]
    pub radius_step: f32,
    #[serde(default = "default_landscape_samples")]
    pub first_samples: usize,
    #[serde(default = "default_landscape_samples")]
    pub second_samples: usize,
    /// Number of traced samples compared per cell.
    #[serde(default = "default_drawing_samples")]
    pub drawing_samples: usize,
    #[serde(default = "default_drawing_time_step")]
    pub time_step: f32,
}

impl Default for LandscapeConfig {
    fn default() -> Self {
        Self {
            first_gene: 0,
            second_gene: 1,
            radius_step: default_radius_change_step(),
            first_samples: default_landscape_samples(),
            second_samples: default_landscape_samples(),
            drawing_samples: default_drawing_samples(),
            time_step: default_drawing_time_step(),
        }
    }
}

fn default_radius_change_step() -> f32 {
    0.1
}
fn default_landscape_samples() -> usize {
    100
}
fn default_drawing_samples() -> usize {
    10
}
fn default_drawing_time_step() -> f32 {
    0.1
}

/// Configuration and operator errors. All are fatal to a fitting run.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FitError {
    #[error("Population size must be at least 2, got {0}")]
    PopulationTooSmall(usize),
    #[error("Elitism percent must be in [0, 1), got {0}")]
    InvalidElitism(f32),
    #[error("Selection lambda must be positive and finite, got {0}")]
    InvalidLambda(f32),
    #[error("Probability {name} must be in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f32 },
    #[error("Mutation step {name} must be non-negative and finite, got {value}")]
    InvalidStep { name: &'static str, value: f32 },
    #[error("Invalid {name} bounds: min ({min}) > max ({max}) or not finite")]
    InvalidBounds {
        name: &'static str,
        min: f32,
        max: f32,
    },
    #[error("Invalid {name}: {value}")]
    InvalidWeight { name: &'static str, value: f32 },
    #[error("Time limit must be non-negative and finite, got {0}")]
    InvalidTimeLimit(f64),
    #[error("Time step must be finite, got {0}")]
    InvalidTimeStep(f32),
    #[error("Sample count must be non-zero")]
    NoSamples,
    #[error("At least one key point is required")]
    NoKeyPoints,
    #[error("{count} key points exceed sample count {sample_count}")]
    TooManyKeyPoints { count: usize, sample_count: usize },
    #[error("Key point index {index} is outside [0, {sample_count})")]
    KeyPointOutOfRange { index: usize, sample_count: usize },
    #[error("Duplicate key point index {0}")]
    DuplicateKeyPoint(usize),
    #[error("Key point {0} has a non-finite target")]
    NonFiniteTarget(usize),
    #[error("Critical point {0} is not a key point")]
    UnknownCriticalPoint(usize),
    #[error("Chromosome lengths differ: {left} vs {right}")]
    ChromosomeLengthMismatch { left: usize, right: usize },
    #[error("Gene index {index} is outside a chromosome of length {len}")]
    GeneIndexOutOfRange { index: usize, len: usize },
    #[error("Swept genes must be distinct, got {0} twice")]
    SameSweepGene(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Circle, Vec3};

    fn problem() -> FitProblem {
        FitProblem {
            chromosome: vec![Circle::new(0.0, 1.0, 1.0), Circle::new(0.0, 2.0, 1.0)],
            time_step: 0.1,
            sample_count: 20,
            key_points: vec![
                KeyPoint::new(0, Vec3::new(1.0, 0.0, 0.0)),
                KeyPoint::new(10, Vec3::new(-1.0, 0.0, 0.0)),
            ],
        }
    }

    #[test]
    fn test_default_config_valid() {
        let config = FitConfig::default();
        assert!(problem().validate().is_ok());
        assert!(config.validate(&problem()).is_ok());
    }

    #[test]
    fn test_key_point_errors() {
        let mut p = problem();
        p.key_points.push(KeyPoint::new(20, Vec3::ZERO));
        assert_eq!(
            p.validate(),
            Err(FitError::KeyPointOutOfRange {
                index: 20,
                sample_count: 20
            })
        );

        let mut p = problem();
        p.key_points.push(KeyPoint::new(10, Vec3::ZERO));
        assert_eq!(p.validate(), Err(FitError::DuplicateKeyPoint(10)));

        let mut p = problem();
        p.key_points.clear();
        assert_eq!(p.validate(), Err(FitError::NoKeyPoints));

        let mut p = problem();
        p.sample_count = 1;
        p.key_points.truncate(1);
        p.key_points.push(KeyPoint::new(0, Vec3::ZERO));
        assert!(matches!(
            p.validate(),
            Err(FitError::TooManyKeyPoints { .. })
        ));
    }

    #[test]
    fn test_elitism_must_be_below_one() {
        let config = FitConfig {
            elitism_percent: 1.0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(&problem()),
            Err(FitError::InvalidElitism(1.0))
        );
    }

    #[test]
    fn test_population_too_small() {
        let config = FitConfig {
            population: PopulationConfig {
                size: 0,
                iterations: 10,
            },
            ..Default::default()
        };
        assert_eq!(
            config.validate(&problem()),
            Err(FitError::PopulationTooSmall(0))
        );
    }

    #[test]
    fn test_critical_point_must_be_key_point() {
        let config = FitConfig {
            variant: GaVariant::CriticalPoints {
                indices: vec![5],
                weight: 10.0,
            },
            ..Default::default()
        };
        assert_eq!(
            config.validate(&problem()),
            Err(FitError::UnknownCriticalPoint(5))
        );
    }

    #[test]
    fn test_critical_weight_must_exceed_one() {
        for weight in [1.0, 0.5, f32::NAN] {
            let config = FitConfig {
                variant: GaVariant::CriticalPoints {
                    indices: vec![0],
                    weight,
                },
                ..Default::default()
            };
            assert!(matches!(
                config.validate(&problem()),
                Err(FitError::InvalidWeight {
                    name: "critical weight",
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_invalid_severe_bounds() {
        let mut config = FitConfig::default();
        config.severe_mutation.radius_bounds = (1.0, 0.0);
        assert!(matches!(
            config.validate(&problem()),
            Err(FitError::InvalidBounds { name: "radius", .. })
        ));
    }

    #[test]
    fn test_variant_serialization() {
        let json = r#"{"variant": {"type": "BestMistakeCorrection"}, "population": {"size": 20}}"#;
        let config: FitConfig = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.variant,
            GaVariant::BestMistakeCorrection {
                appeal_weight: 3.0,
                correction_weight: 2.0
            }
        );
        assert_eq!(config.population.size, 20);
        assert_eq!(config.population.iterations, 1000);
        assert_eq!(config.selection.lambda, 0.5);
    }
}
