//! Generation loop for epicycle fitting.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::schema::{
    Chromosome, Circle, FitConfig, FitError, FitHistory, FitProblem, FitProgress, FitResult, FitStats,
    KeyPoint, StopReason,
};

use super::diversity::grefenstette_bias;
use super::fitness::{FitnessEvaluator, corrections, inverse_appeal};
use super::genome::GenomeRng;
use super::ranking::{Ranker, correction_order};
use super::specimen::Specimen;
use super::strategy::{MateChoice, Strategy};

/// Evolution engine that fits a chain to key points.
pub struct FitEngine {
    problem: FitProblem,
    config: FitConfig,
    strategy: Strategy,
    rng: GenomeRng,
    evaluator: FitnessEvaluator,
    ranker: Ranker,
    population: Vec<Specimen>,
    history: FitHistory,
    best_in_history: Option<Specimen>,
    best_inverse_max_error: f32,
    iteration: usize,
    total_evaluations: u64,
    severe_mutations: u64,
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl FitEngine {
    /// Create a new engine. All configuration errors are reported here.
    pub fn new(problem: FitProblem, config: FitConfig) -> Result<Self, FitError> {
        problem.validate()?;
        config.validate(&problem)?;

        let seed = config.random_seed.unwrap_or_else(rand::random);
        let strategy = Strategy::from_config(&config);
        let evaluator = FitnessEvaluator::new(
            problem.time_step,
            problem.sample_count,
            problem.key_points.clone(),
            strategy.objective.clone(),
        );
        let ranker = Ranker::new(strategy.ranking);

        log::debug!("Fit engine seeded with {seed}, strategy {strategy:?}");

        Ok(Self {
            problem,
            config,
            strategy,
            rng: GenomeRng::new(seed),
            evaluator,
            ranker,
            population: Vec::new(),
            history: FitHistory::default(),
            best_in_history: None,
            best_inverse_max_error: 0.0,
            iteration: 0,
            total_evaluations: 0,
            severe_mutations: 0,
            deadline: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Stop before the first generation that starts after `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Initialize the population with mutated copies of the seed chromosome.
    ///
    /// Seed copies go through the same mutation as offspring, severe mutation
    /// included when the strategy enables it.
    pub fn initialize(&mut self) {
        self.population.clear();
        self.history = FitHistory::default();
        self.best_in_history = None;
        self.best_inverse_max_error = 0.0;
        self.iteration = 0;
        self.total_evaluations = 0;
        self.severe_mutations = 0;
        self.ranker = Ranker::new(self.strategy.ranking);

        for _ in 0..self.config.population.size {
            let mut chromosome = self.problem.chromosome.clone();
            self.mutate(&mut chromosome);
            self.population.push(Specimen::new(chromosome));
        }
    }

    /// Evaluate all specimens in the population.
    fn evaluate_population(&mut self) {
        let evaluator = &self.evaluator;
        self.population
            .par_iter_mut()
            .for_each(|specimen| evaluator.evaluate(specimen));
        self.total_evaluations += self.population.len() as u64;
    }

    fn rank_population(&mut self) {
        self.ranker.rank(&mut self.population, &self.evaluator);
    }

    /// Record per-generation statistics and track improvements.
    fn log_progress(&mut self) -> FitProgress {
        let (best_appeal, worst_appeal) = self
            .population
            .iter()
            .fold((f32::NEG_INFINITY, f32::INFINITY), |(hi, lo), s| {
                (hi.max(s.appeal), lo.min(s.appeal))
            });
        let best_max_error = self
            .population
            .iter()
            .map(|s| s.max_error)
            .fold(f32::INFINITY, f32::min);

        let inverse_max_error = inverse_appeal(best_max_error);
        let improved = inverse_max_error > self.best_inverse_max_error;
        if improved {
            self.best_inverse_max_error = inverse_max_error;
            let last = self.history.improvement_indices.last().copied().unwrap_or(0);
            self.history.improvement_intervals.push(self.iteration - last);
            self.history.improvement_indices.push(self.iteration);
        }

        self.update_best_in_history();
        let (history_appeal, history_max_error) = self
            .best_in_history
            .as_ref()
            .map_or((0.0, f32::INFINITY), |s| (s.appeal, s.max_error));

        self.history.best_appeal.push(best_appeal);
        self.history.worst_appeal.push(worst_appeal);
        self.history.best_max_error.push(best_max_error);
        self.history.best_in_history_appeal.push(history_appeal);
        self.history.best_in_history_max_error.push(history_max_error);
        self.history
            .diversity
            .push(grefenstette_bias(&self.population));

        log::debug!(
            "Iteration #{}: inverse max error {:.4}, best appeal {:.4}, worst appeal {:.4}",
            self.iteration,
            inverse_max_error,
            best_appeal,
            worst_appeal
        );

        FitProgress {
            iteration: self.iteration,
            total_iterations: self.config.population.iterations,
            best_appeal,
            worst_appeal,
            best_max_error,
            best_in_history_appeal: history_appeal,
            improved,
        }
    }

    fn update_best_in_history(&mut self) {
        let Some(best) = self
            .population
            .iter()
            .max_by(|a, b| a.appeal.total_cmp(&b.appeal))
        else {
            return;
        };
        let beats = self
            .best_in_history
            .as_ref()
            .is_none_or(|h| best.appeal > h.appeal);
        if beats {
            self.best_in_history = Some(best.clone());
        }
    }

    /// Step mutation, then severe mutation when the strategy enables it.
    fn mutate(&mut self, chromosome: &mut [Circle]) {
        self.rng.mutate(chromosome, &self.config.mutation);
        if let Some(severe) = &self.strategy.severe_mutation
            && self.rng.severe_mutate(chromosome, severe)
        {
            self.severe_mutations += 1;
            log::debug!("Severe mutation occurred in iteration #{}", self.iteration);
        }
    }

    /// Build the next generation from the ranked population.
    fn reproduce(&mut self) -> Result<(), FitError> {
        let size = self.population.len();
        let lambda = self.config.selection.lambda;
        let elites = self.strategy.elite_count(size);

        let mut next = Vec::with_capacity(size);
        if self.strategy.elites_by_appeal {
            let mut order: Vec<usize> = (0..size).collect();
            order.sort_by(|&a, &b| {
                self.population[b]
                    .appeal
                    .total_cmp(&self.population[a].appeal)
            });
            next.extend(
                order
                    .iter()
                    .take(elites)
                    .map(|&i| Specimen::new(self.population[i].chromosome.clone())),
            );
        } else {
            next.extend(
                self.population[..elites]
                    .iter()
                    .map(|s| Specimen::new(s.chromosome.clone())),
            );
        }

        while next.len() < size {
            let (a, b) = match self.strategy.mate_choice {
                MateChoice::RankBiased => self.rng.pick_parents(size, lambda),
                MateChoice::Love => {
                    let a = self.rng.pick_index_poisson(size, lambda, None);
                    let b = favorite(
                        &mut self.rng,
                        &self.evaluator,
                        &self.population,
                        a,
                        lambda,
                    );
                    (a, b)
                }
            };

            let mut child = self
                .rng
                .crossover(&self.population[a].chromosome, &self.population[b].chromosome)?;
            self.mutate(&mut child);
            next.push(Specimen::new(child));
        }

        self.population = next;
        Ok(())
    }

    /// Check if the loop should stop.
    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Some(StopReason::DeadlineExceeded);
        }

        if self.iteration >= self.config.population.iterations {
            return Some(StopReason::IterationBudget);
        }

        None
    }

    /// Run the fit with progress callback.
    pub fn run_with_callback<F>(&mut self, callback: F) -> Result<FitResult, FitError>
    where
        F: Fn(&FitProgress),
    {
        let start_time = Instant::now();
        if self.deadline.is_none()
            && let Some(limit) = self.config.time_limit_seconds
        {
            self.deadline = Duration::try_from_secs_f64(limit)
                .ok()
                .and_then(|limit| start_time.checked_add(limit));
        }

        log::info!(
            "Fitting {} arms to {} key points: population {}, {} iterations, variant {:?}",
            self.problem.chromosome.len(),
            self.problem.key_points.len(),
            self.config.population.size,
            self.config.population.iterations,
            self.config.variant
        );

        self.initialize();

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }

            let iteration_start = Instant::now();
            self.evaluate_population();
            self.rank_population();
            let progress = self.log_progress();
            callback(&progress);
            self.reproduce()?;

            let elapsed = iteration_start.elapsed();
            self.history
                .iteration_times_ms
                .push(elapsed.as_secs_f64() * 1000.0);
            log::debug!("Iteration #{} time: {:?}", self.iteration, elapsed);
            self.iteration += 1;
        };

        if stop_reason != StopReason::IterationBudget {
            log::warn!(
                "Fit stopped early after {} iterations: {:?}",
                self.iteration,
                stop_reason
            );
        }

        // Final population.
        self.evaluate_population();
        self.rank_population();
        self.update_best_in_history();

        let final_best =
            lowest_max_error(&self.population).ok_or(FitError::PopulationTooSmall(0))?;

        let mut returned_from_history = false;
        let mut best = final_best;
        if self.strategy.keep_best_in_history
            && let Some(historic) = &self.best_in_history
            && historic.appeal > final_best.appeal
        {
            best = historic;
            returned_from_history = true;
        }

        let elapsed = start_time.elapsed().as_secs_f64();
        log::info!(
            "Fit finished after {} iterations in {:.2}s: max error {:.4}, appeal {:.4}{}",
            self.iteration,
            elapsed,
            best.max_error,
            best.appeal,
            if returned_from_history {
                " (best in history)"
            } else {
                ""
            }
        );

        Ok(FitResult {
            best: best.to_snapshot(),
            stats: FitStats {
                iterations: self.iteration,
                total_evaluations: self.total_evaluations,
                severe_mutations: self.severe_mutations,
                elapsed_seconds: elapsed,
                stop_reason,
                returned_from_history,
            },
            history: self.history.clone(),
        })
    }

    /// Run the fit (blocking).
    pub fn run(&mut self) -> Result<FitResult, FitError> {
        self.run_with_callback(|_| {})
    }
}

/// Specimen with the lowest unweighted max error; the first one on ties.
fn lowest_max_error(population: &[Specimen]) -> Option<&Specimen> {
    population
        .iter()
        .min_by(|a, b| a.max_error.total_cmp(&b.max_error))
}

/// Second parent for `picker`: a rank-biased draw over the population ordered by
/// how well each specimen corrects the picker's worst key point.
fn favorite(
    rng: &mut GenomeRng,
    evaluator: &FitnessEvaluator,
    population: &[Specimen],
    picker: usize,
    lambda: f32,
) -> usize {
    let Some(mistake) = evaluator.worst_key_point(&population[picker]) else {
        return rng.pick_index_poisson(population.len(), lambda, Some(picker));
    };
    let order = correction_order(&corrections(population, &mistake));
    order[rng.pick_index_poisson(order.len(), lambda, None)]
}

/// Fit a chain to key points and return the best chromosome found.
pub fn fit(
    chromosome: Chromosome,
    time_step: f32,
    sample_count: usize,
    key_points: Vec<KeyPoint>,
    config: FitConfig,
) -> Result<Chromosome, FitError> {
    let problem = FitProblem {
        chromosome,
        time_step,
        sample_count,
        key_points,
    };
    let mut engine = FitEngine::new(problem, config)?;
    Ok(engine.run()?.best.chromosome)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::f32::consts::PI;

    use super::*;
    use crate::compute::evolution::Objective;
    use crate::schema::{GaVariant, PopulationConfig, Vec3};

    fn problem() -> FitProblem {
        FitProblem {
            chromosome: vec![Circle::new(0.0, 2.9, 1.3), Circle::new(PI, 0.0, 1.3)],
            time_step: 0.1,
            sample_count: 20,
            key_points: vec![
                KeyPoint::new(0, Vec3::new(3.0, 0.0, 0.0)),
                KeyPoint::new(10, Vec3::new(-3.0, 0.0, 0.0)),
            ],
        }
    }

    fn config(variant: GaVariant, size: usize, iterations: usize, seed: u64) -> FitConfig {
        FitConfig {
            population: PopulationConfig { size, iterations },
            variant,
            random_seed: Some(seed),
            ..Default::default()
        }
    }

    fn all_variants() -> Vec<GaVariant> {
        vec![
            GaVariant::Base,
            GaVariant::Elitism,
            GaVariant::SevereMutation,
            GaVariant::CriticalPoints {
                indices: vec![10],
                weight: 10.0,
            },
            GaVariant::DeviationStruggle {
                min_appeal_difference: 0.05,
            },
            GaVariant::BestMistakeCorrection {
                appeal_weight: 3.0,
                correction_weight: 2.0,
            },
            GaVariant::Love,
        ]
    }

    #[test]
    fn test_engine_creation() {
        let mut engine = FitEngine::new(problem(), config(GaVariant::Base, 10, 5, 1)).unwrap();
        engine.initialize();

        assert_eq!(engine.population.len(), 10);
        assert!(engine.population.iter().all(|s| s.chromosome.len() == 2));
        assert!(engine.population.iter().all(|s| !s.is_evaluated()));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = FitEngine::new(problem(), config(GaVariant::Base, 1, 5, 1));
        assert!(matches!(result, Err(FitError::PopulationTooSmall(1))));

        let mut bad = problem();
        bad.key_points.push(KeyPoint::new(25, Vec3::ZERO));
        let result = FitEngine::new(bad, config(GaVariant::Base, 10, 5, 1));
        assert!(matches!(result, Err(FitError::KeyPointOutOfRange { .. })));
    }

    #[test]
    fn test_fit_run() {
        let mut engine = FitEngine::new(problem(), config(GaVariant::Elitism, 12, 5, 7)).unwrap();
        let calls = Cell::new(0);
        let result = engine
            .run_with_callback(|progress| {
                assert_eq!(progress.iteration, calls.get());
                assert_eq!(progress.total_iterations, 5);
                calls.set(calls.get() + 1);
            })
            .unwrap();

        assert_eq!(calls.get(), 5);
        assert_eq!(result.stats.iterations, 5);
        assert_eq!(result.stats.stop_reason, StopReason::IterationBudget);
        assert_eq!(result.stats.total_evaluations, 6 * 12);
        assert_eq!(result.history.best_appeal.len(), 5);
        assert_eq!(result.history.diversity.len(), 5);
        assert_eq!(result.history.iteration_times_ms.len(), 5);
        assert_eq!(result.history.improvement_indices.first(), Some(&0));
        assert_eq!(result.history.improvement_intervals.first(), Some(&0));
        assert_eq!(result.best.chromosome.len(), 2);
        assert_eq!(result.best.trace_dots.len(), 20);
        assert!(result.best.appeal.is_finite());
    }

    #[test]
    fn test_zero_iterations() {
        let mut engine = FitEngine::new(problem(), config(GaVariant::Base, 4, 0, 3)).unwrap();
        let result = engine.run().unwrap();
        assert_eq!(result.stats.iterations, 0);
        assert_eq!(result.stats.total_evaluations, 4);
        assert!(result.history.best_appeal.is_empty());
        assert!(result.best.max_error.is_finite());
    }

    #[test]
    fn test_cancellation() {
        let mut engine = FitEngine::new(problem(), config(GaVariant::Base, 5, 100, 1)).unwrap();
        let cancel = engine.cancel_handle();

        // Cancel immediately
        cancel.store(true, Ordering::Relaxed);

        let result = engine.run().unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(result.stats.iterations, 0);
        assert!(result.best.appeal.is_finite());
    }

    #[test]
    fn test_deadline() {
        let mut engine = FitEngine::new(problem(), config(GaVariant::Base, 5, 100, 1))
            .unwrap()
            .with_deadline(Instant::now());
        let result = engine.run().unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::DeadlineExceeded);

        let mut limited = config(GaVariant::Base, 5, 100, 1);
        limited.time_limit_seconds = Some(0.0);
        let result = FitEngine::new(problem(), limited).unwrap().run().unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::DeadlineExceeded);
    }

    #[test]
    fn test_elitism_keeps_best() {
        for variant in [
            GaVariant::Elitism,
            GaVariant::SevereMutation,
            GaVariant::Love,
            GaVariant::CriticalPoints {
                indices: vec![0],
                weight: 10.0,
            },
        ] {
            let mut engine = FitEngine::new(problem(), config(variant.clone(), 20, 30, 11)).unwrap();
            let result = engine.run().unwrap();
            for pair in result.history.best_appeal.windows(2) {
                assert!(pair[1] >= pair[0], "{variant:?} lost its best: {pair:?}");
            }
        }
    }

    #[test]
    fn test_every_variant_runs() {
        for variant in all_variants() {
            let mut engine = FitEngine::new(problem(), config(variant.clone(), 16, 20, 5)).unwrap();
            let result = engine.run().unwrap();

            assert_eq!(result.stats.iterations, 20, "{variant:?}");
            assert!(result.best.appeal.is_finite(), "{variant:?}");
            for pair in result.history.best_in_history_appeal.windows(2) {
                assert!(pair[1] >= pair[0], "{variant:?}: {pair:?}");
            }
            for bias in &result.history.diversity {
                assert!((0.0..=1.0).contains(&bias.radius), "{variant:?}: {bias:?}");
            }
        }
    }

    #[test]
    fn test_keep_best_in_history() {
        let mut cfg = config(GaVariant::Base, 10, 30, 2);
        cfg.keep_best_in_history = true;
        let result = FitEngine::new(problem(), cfg).unwrap().run().unwrap();
        let best_seen = result
            .history
            .best_in_history_appeal
            .iter()
            .copied()
            .fold(0.0f32, f32::max);
        assert!(result.best.appeal >= best_seen);
    }

    #[test]
    fn test_severe_mutations_counted() {
        let mut cfg = config(GaVariant::SevereMutation, 10, 5, 9);
        cfg.severe_mutation.probability = 1.0;
        let result = FitEngine::new(problem(), cfg).unwrap().run().unwrap();
        // Every seed copy and every offspring of every generation is severely mutated.
        let offspring_per_generation = 10 - 2;
        assert_eq!(
            result.stats.severe_mutations,
            10 + 5 * offspring_per_generation
        );
    }

    #[test]
    fn test_initial_population_gets_severe_mutation() {
        // Seed radii of 1.3 lie outside the severe radius bounds of [0, 0.5].
        let has_severe_gene =
            |s: &Specimen| s.chromosome.iter().any(|c| c.radius <= 0.5);

        let mut cfg = config(GaVariant::SevereMutation, 10, 5, 9);
        cfg.severe_mutation.probability = 1.0;
        let mut engine = FitEngine::new(problem(), cfg).unwrap();
        engine.initialize();
        assert_eq!(engine.severe_mutations, 10);
        assert!(engine.population.iter().all(has_severe_gene));

        let mut cfg = config(GaVariant::Elitism, 10, 5, 9);
        cfg.severe_mutation.probability = 1.0;
        let mut engine = FitEngine::new(problem(), cfg).unwrap();
        engine.initialize();
        assert_eq!(engine.severe_mutations, 0);
        assert!(!engine.population.iter().any(has_severe_gene));
    }

    /// Specimen with a hand-set trace, scored against `evaluator`.
    fn scored(evaluator: &FitnessEvaluator, dots: &[(usize, Vec3)]) -> Specimen {
        let mut specimen = Specimen::new(vec![Circle::new(0.0, 0.0, 1.0)]);
        specimen.trace_dots = vec![Vec3::ZERO; 10];
        for &(index, dot) in dots {
            specimen.trace_dots[index] = dot;
        }
        evaluator.score(&mut specimen);
        specimen
    }

    #[test]
    fn test_love_picks_best_corrector() {
        let near = Vec3::new(1.0, 0.0, 0.0);
        let far = Vec3::new(0.0, 1.0, 0.0);
        let evaluator = FitnessEvaluator::new(
            0.1,
            10,
            vec![KeyPoint::new(3, near), KeyPoint::new(7, far)],
            Objective::Minimax,
        );
        let population = vec![
            // Hits the first key point and misses the second by 1.
            scored(&evaluator, &[(3, near)]),
            scored(&evaluator, &[(3, near), (7, Vec3::new(0.0, 0.5, 0.0))]),
            // Fixes the picker's mistake at sample 7.
            scored(&evaluator, &[(7, far)]),
            // Matches the target at sample 1, the key point's list position.
            scored(&evaluator, &[(1, far)]),
        ];

        let mistake = evaluator.worst_key_point(&population[0]).unwrap();
        assert_eq!((mistake.key_point, mistake.sample_index), (1, 7));
        assert_eq!(corrections(&population, &mistake), vec![0.0, 0.5, 1.0, 0.0]);

        let mut rng = GenomeRng::new(5);
        for _ in 0..50 {
            assert_eq!(favorite(&mut rng, &evaluator, &population, 0, 1e6), 2);
        }
    }

    #[test]
    fn test_final_best_ignores_critical_weighting() {
        let mut weighted_well = Specimen::new(Vec::new());
        weighted_well.max_error = 2.0;
        weighted_well.appeal = 0.5;
        let mut lowest = Specimen::new(Vec::new());
        lowest.max_error = 1.0;
        lowest.appeal = 0.1;
        let population = vec![weighted_well, lowest];

        let best = lowest_max_error(&population).unwrap();
        assert_eq!(best.max_error, 1.0);
        assert!(lowest_max_error(&[]).is_none());
    }

    #[test]
    fn test_two_arm_fit_converges() {
        let mut converged = 0;
        for seed in 1..=5 {
            let mut engine =
                FitEngine::new(problem(), config(GaVariant::Elitism, 50, 200, seed)).unwrap();
            let result = engine.run().unwrap();

            let trace = &result.history.best_in_history_max_error;
            assert_eq!(trace.len(), 200);
            for pair in trace.windows(2) {
                assert!(pair[1] <= pair[0], "seed {seed}: {pair:?}");
            }
            if result.best.max_error < 0.5 {
                converged += 1;
            }
        }
        assert!(converged >= 3, "only {converged} of 5 runs converged");
    }

    #[test]
    fn test_fit_function() {
        let p = problem();
        let chromosome = fit(
            p.chromosome,
            p.time_step,
            p.sample_count,
            p.key_points,
            config(
                GaVariant::BestMistakeCorrection {
                    appeal_weight: 3.0,
                    correction_weight: 2.0,
                },
                10,
                10,
                4,
            ),
        )
        .unwrap();
        assert_eq!(chromosome.len(), 2);

        let p = problem();
        assert_eq!(
            fit(p.chromosome, p.time_step, 0, p.key_points, FitConfig::default()),
            Err(FitError::NoSamples)
        );
    }
}
