//! Variant parameters for the generation loop.

use std::collections::HashSet;

use crate::schema::{FitConfig, GaVariant, SevereMutationConfig};

use super::fitness::Objective;
use super::ranking::Ranking;

/// How the second parent is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MateChoice {
    /// Rank-biased draw from the ranked population, avoiding the first parent's rank.
    RankBiased,
    /// Rank-biased draw from the population ordered by how well each specimen
    /// corrects the first parent's worst key point.
    Love,
}

/// Everything a variant changes about the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub objective: Objective,
    pub ranking: Ranking,
    pub mate_choice: MateChoice,
    /// Fraction of the ranked population carried over unchanged.
    pub elitism_percent: Option<f32>,
    /// Take elites by raw appeal instead of the ranking order.
    pub elites_by_appeal: bool,
    /// Whole-gene replacement after mutation.
    pub severe_mutation: Option<SevereMutationConfig>,
    /// Return the best specimen ever seen if the final population is worse.
    pub keep_best_in_history: bool,
}

impl Strategy {
    pub fn from_config(config: &FitConfig) -> Self {
        let elitism = Some(config.elitism_percent);
        let severe = Some(config.severe_mutation.clone());

        let base = Strategy {
            objective: Objective::Minimax,
            ranking: Ranking::Appeal,
            mate_choice: MateChoice::RankBiased,
            elitism_percent: None,
            elites_by_appeal: false,
            severe_mutation: None,
            keep_best_in_history: config.keep_best_in_history,
        };

        match &config.variant {
            GaVariant::Base => base,
            GaVariant::Elitism => Strategy {
                elitism_percent: elitism,
                ..base
            },
            GaVariant::SevereMutation => Strategy {
                elitism_percent: elitism,
                severe_mutation: severe,
                ..base
            },
            GaVariant::CriticalPoints { indices, weight } => Strategy {
                objective: Objective::CriticalPoints {
                    indices: indices.iter().copied().collect::<HashSet<_>>(),
                    weight: *weight,
                },
                elitism_percent: elitism,
                ..base
            },
            GaVariant::DeviationStruggle {
                min_appeal_difference,
            } => Strategy {
                ranking: Ranking::DeviationStruggle {
                    min_appeal_difference: *min_appeal_difference,
                },
                elitism_percent: elitism,
                ..base
            },
            GaVariant::BestMistakeCorrection {
                appeal_weight,
                correction_weight,
            } => Strategy {
                ranking: Ranking::BestMistakeCorrection {
                    appeal_weight: *appeal_weight,
                    correction_weight: *correction_weight,
                },
                elitism_percent: elitism,
                elites_by_appeal: true,
                severe_mutation: severe,
                keep_best_in_history: true,
                ..base
            },
            GaVariant::Love => Strategy {
                mate_choice: MateChoice::Love,
                elitism_percent: elitism,
                severe_mutation: severe,
                ..base
            },
        }
    }

    /// Number of specimens copied unchanged into the next generation.
    ///
    /// `floor(size * percent) + 1`, capped so that at least one offspring is bred.
    pub fn elite_count(&self, population_size: usize) -> usize {
        match self.elitism_percent {
            Some(percent) => {
                let count = (population_size as f64 * percent as f64).floor() as usize + 1;
                count.min(population_size.saturating_sub(1))
            }
            None => 0,
        }
    }
}
