//! Population ranking policies.
//!
//! All sorts are stable and descending, and compare with `total_cmp` so that no
//! value can make a sort panic.

use super::fitness::{FitnessEvaluator, corrections, min_max_normalize};
use super::specimen::Specimen;

/// How a population is ordered before reproduction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ranking {
    /// Descending appeal.
    Appeal,
    /// Descending appeal, or appeal scaled by gene deviation once the best appeal stalls.
    DeviationStruggle { min_appeal_difference: f32 },
    /// Weighted blend of normalized appeal and normalized correction of the best
    /// specimen's worst key point.
    BestMistakeCorrection {
        appeal_weight: f32,
        correction_weight: f32,
    },
}

/// A ranking policy together with the state it carries between generations.
#[derive(Debug, Clone)]
pub struct Ranker {
    ranking: Ranking,
    previous_max_appeal: f32,
}

impl Ranker {
    pub fn new(ranking: Ranking) -> Self {
        Self {
            ranking,
            previous_max_appeal: 0.0,
        }
    }

    /// Sort an evaluated population in place.
    pub fn rank(&mut self, population: &mut Vec<Specimen>, evaluator: &FitnessEvaluator) {
        match self.ranking {
            Ranking::Appeal => sort_by_appeal(population),
            Ranking::DeviationStruggle {
                min_appeal_difference,
            } => {
                let max_appeal = population
                    .iter()
                    .map(|s| s.appeal)
                    .fold(f32::NEG_INFINITY, f32::max);
                let stalled = (max_appeal as f64 - self.previous_max_appeal as f64).abs()
                    < min_appeal_difference as f64;
                self.previous_max_appeal = max_appeal;

                if stalled {
                    log::debug!("Appeal stalled at {max_appeal}, ranking by deviation");
                    let scores = deviation_scores(population);
                    reorder_by_scores(population, &scores);
                } else {
                    sort_by_appeal(population);
                }
            }
            Ranking::BestMistakeCorrection {
                appeal_weight,
                correction_weight,
            } => {
                sort_by_appeal(population);
                let Some(mistake) = population
                    .first()
                    .and_then(|best| evaluator.worst_key_point(best))
                else {
                    return;
                };

                let raw = corrections(population, &mistake);
                let max_correction = raw.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                log::debug!(
                    "Best mistake at sample {} (error {:.4}), max correction {max_correction:.4}",
                    mistake.sample_index,
                    mistake.error
                );

                let appeals: Vec<f64> = population.iter().map(|s| s.appeal as f64).collect();
                let raw: Vec<f64> = raw.into_iter().map(f64::from).collect();
                let scores: Vec<f64> = min_max_normalize(&appeals)
                    .into_iter()
                    .zip(min_max_normalize(&raw))
                    .map(|(a, c)| appeal_weight as f64 * a + correction_weight as f64 * c)
                    .collect();
                reorder_by_scores(population, &scores);
            }
        }
    }
}

/// Stable descending sort by appeal.
pub fn sort_by_appeal(population: &mut [Specimen]) {
    population.sort_by(|a, b| b.appeal.total_cmp(&a.appeal));
}

/// Stable descending reorder of `population` by per-slot `scores`.
pub fn reorder_by_scores(population: &mut Vec<Specimen>, scores: &[f64]) {
    let mut paired: Vec<(f64, Specimen)> = scores
        .iter()
        .copied()
        .zip(std::mem::take(population))
        .collect();
    paired.sort_by(|a, b| b.0.total_cmp(&a.0));
    *population = paired.into_iter().map(|(_, s)| s).collect();
}

/// Slot indices ordered by descending correction, ties kept in slot order.
pub fn correction_order(corrections: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..corrections.len()).collect();
    order.sort_by(|&a, &b| corrections[b].total_cmp(&corrections[a]));
    order
}

/// `appeal * radius deviation * angular velocity deviation` per slot.
///
/// Deviation is the mean absolute distance of a specimen's genes from the
/// per-slot population mean.
fn deviation_scores(population: &[Specimen]) -> Vec<f64> {
    let genes = population.first().map_or(0, |s| s.chromosome.len());
    if genes == 0 {
        return population.iter().map(|_| 0.0).collect();
    }
    let size = population.len() as f64;

    let mut mean_radius = vec![0.0f64; genes];
    let mut mean_velocity = vec![0.0f64; genes];
    for specimen in population {
        for (slot, gene) in specimen.chromosome.iter().enumerate() {
            mean_radius[slot] += gene.radius as f64 / size;
            mean_velocity[slot] += gene.angular_velocity.nominal() as f64 / size;
        }
    }

    population
        .iter()
        .map(|specimen| {
            let (mut radius_dev, mut velocity_dev) = (0.0f64, 0.0f64);
            for (slot, gene) in specimen.chromosome.iter().enumerate() {
                radius_dev += (gene.radius as f64 - mean_radius[slot]).abs();
                velocity_dev += (gene.angular_velocity.nominal() as f64 - mean_velocity[slot]).abs();
            }
            let genes = genes as f64;
            specimen.appeal as f64 * (radius_dev / genes) * (velocity_dev / genes)
        })
        .collect()
}
