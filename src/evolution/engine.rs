//! Generational evolution loop.
//!
//! [`EvolutionEngine`] orchestrates a run:
//! initialization → evaluation → reporting → termination check →
//! elitism + selection + variation → evaluation → ...
//!
//! Evaluation is a fork-join barrier: every candidate of a generation is
//! scored (in parallel when enabled) before observers and termination
//! conditions see it. Scoring does not touch the RNG and the ranking sort is
//! stable, so a fixed seed with a deterministic evaluator reproduces the
//! same run regardless of thread scheduling.

use super::cache::CachingEvaluator;
use super::config::{validate_run, EngineConfig};
use super::error::{EvolutionError, Phase};
use super::observer::EvolutionObserver;
use super::operators::EvolutionaryOperator;
use super::selection::SelectionStrategy;
use super::termination::TerminationCondition;
use super::types::{
    CandidateFactory, EvaluatedCandidate, FitnessEvaluator, Objective, PopulationData,
    PopulationStats,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Result of a completed evolution run.
#[derive(Debug, Clone)]
pub struct EvolutionResult<C> {
    /// The best candidate (rank 0) of the final generation.
    pub best: C,

    /// Fitness of `best`.
    pub best_fitness: f64,

    /// The final evaluated population, sorted best first.
    pub population: Vec<EvaluatedCandidate<C>>,

    /// Number of generations evaluated.
    pub generations: usize,

    /// Wall-clock duration of the run.
    pub elapsed: Duration,

    /// Names of the termination conditions satisfied by the final generation.
    pub satisfied: Vec<&'static str>,

    /// Best fitness of each generation.
    pub fitness_history: Vec<f64>,
}

impl<C> EvolutionResult<C> {
    /// Returns `true` if the condition with this name ended the run.
    pub fn satisfied_by(&self, name: &str) -> bool {
        self.satisfied.contains(&name)
    }
}

/// Generational evolutionary algorithm over candidates of type `C`.
///
/// Collaborators are supplied once; each call to [`evolve`](Self::evolve)
/// is an independent run with a fresh RNG (from [`EngineConfig::seed`]) and
/// a fresh fitness cache.
///
/// # Usage
///
/// ```ignore
/// let mut engine = EvolutionEngine::new(
///     PolygonImageFactory::new(canvas),
///     polygon_pipeline(canvas, &MutationProbabilities::default()),
///     PixelDifference::new(target),
///     TournamentSelection::new(0.8),
/// )
/// .with_config(EngineConfig::default().with_seed(42));
///
/// let best = engine.evolve(15, 3, &mut [
///     Box::new(Stagnation::new(1000)),
///     Box::new(abort.clone()),
/// ])?;
/// ```
pub struct EvolutionEngine<C> {
    factory: Box<dyn CandidateFactory<C>>,
    pipeline: Box<dyn EvolutionaryOperator<C>>,
    evaluator: Box<dyn FitnessEvaluator<C>>,
    selection: Box<dyn SelectionStrategy>,
    config: EngineConfig,
    observers: Vec<Box<dyn EvolutionObserver<C>>>,
}

impl<C> EvolutionEngine<C>
where
    C: Clone + Eq + Hash + Send + Sync + 'static,
{
    /// Creates an engine with the default [`EngineConfig`].
    pub fn new<F, O, E, S>(factory: F, pipeline: O, evaluator: E, selection: S) -> Self
    where
        F: CandidateFactory<C> + 'static,
        O: EvolutionaryOperator<C> + 'static,
        E: FitnessEvaluator<C> + 'static,
        S: SelectionStrategy + 'static,
    {
        Self {
            factory: Box::new(factory),
            pipeline: Box::new(pipeline),
            evaluator: Box::new(evaluator),
            selection: Box::new(selection),
            config: EngineConfig::default(),
            observers: Vec::new(),
        }
    }

    /// Replaces the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registers an observer. Observers are notified in registration order.
    pub fn add_observer<O>(&mut self, observer: O)
    where
        O: EvolutionObserver<C> + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    /// Runs until a termination condition fires and returns the best candidate.
    ///
    /// `conditions` are reset before the first generation and combined by
    /// logical OR.
    pub fn evolve(
        &mut self,
        population_size: usize,
        elite_count: usize,
        conditions: &mut [Box<dyn TerminationCondition>],
    ) -> Result<C, EvolutionError> {
        self.evolve_population(population_size, elite_count, conditions)
            .map(|result| result.best)
    }

    /// Like [`evolve`](Self::evolve), but returns the full [`EvolutionResult`].
    pub fn evolve_population(
        &mut self,
        population_size: usize,
        elite_count: usize,
        conditions: &mut [Box<dyn TerminationCondition>],
    ) -> Result<EvolutionResult<C>, EvolutionError> {
        self.evolve_with_seeds(population_size, elite_count, Vec::new(), conditions)
    }

    /// Runs with `seeds` placed unchanged in the initial population; the
    /// remaining slots are filled by the factory.
    #[instrument(
        level = "info",
        name = "evolve",
        skip(self, seeds, conditions),
        fields(seeds = seeds.len(), conditions = conditions.len())
    )]
    pub fn evolve_with_seeds(
        &mut self,
        population_size: usize,
        elite_count: usize,
        seeds: Vec<C>,
        conditions: &mut [Box<dyn TerminationCondition>],
    ) -> Result<EvolutionResult<C>, EvolutionError> {
        validate_run(population_size, elite_count, seeds.len(), conditions.len())?;
        self.config.validate()?;

        let Self {
            factory,
            pipeline,
            evaluator,
            selection,
            config,
            observers,
        } = self;

        let pool = EvaluationPool::new(config)?;
        let objective = evaluator.objective();
        let cache = config
            .cache_fitness
            .then(|| CachingEvaluator::new(&**evaluator));
        let scorer: &dyn FitnessEvaluator<C> = match &cache {
            Some(cache) => cache,
            None => &**evaluator,
        };

        for condition in conditions.iter_mut() {
            condition.reset();
        }

        let mut rng = create_rng(config.seed);
        let start = Instant::now();

        let mut candidates = factory
            .generate_initial_population(population_size, seeds, &mut rng)
            .map_err(|e| EvolutionError::run(0, Phase::Initialization, e))?;
        if candidates.len() != population_size {
            return Err(EvolutionError::run(
                0,
                Phase::Initialization,
                anyhow::anyhow!(
                    "factory produced {} candidates, expected {population_size}",
                    candidates.len()
                ),
            ));
        }

        let mut fitness_history = Vec::new();
        let mut generation = 0usize;

        loop {
            let population = pool
                .evaluate(scorer, candidates, objective)
                .map_err(|e| EvolutionError::run(generation, Phase::Evaluation, e))?;

            let stats = PopulationStats::compute(
                &population,
                objective,
                elite_count,
                generation,
                start.elapsed(),
            );
            fitness_history.push(stats.best_fitness);
            debug!(
                generation,
                best = stats.best_fitness,
                mean = stats.mean_fitness,
                std_dev = stats.fitness_std_dev,
                "generation evaluated"
            );

            let data = PopulationData {
                stats,
                population: &population,
            };
            notify_observers(observers, &data);

            // Every condition must see every generation, so no short-circuit.
            let satisfied: Vec<&'static str> = conditions
                .iter_mut()
                .filter_map(|c| c.should_terminate(&data.stats).then(|| c.name()))
                .collect();

            if !satisfied.is_empty() {
                let elapsed = start.elapsed();
                if let Some(cache) = &cache {
                    info!(
                        generations = generation + 1,
                        best = data.stats.best_fitness,
                        cached = cache.len(),
                        cache_hits = cache.hits(),
                        cache_misses = cache.misses(),
                        ?satisfied,
                        "evolution terminated"
                    );
                } else {
                    info!(
                        generations = generation + 1,
                        best = data.stats.best_fitness,
                        ?satisfied,
                        "evolution terminated"
                    );
                }

                let best_fitness = data.stats.best_fitness;
                let best = population[0].candidate.clone();
                return Ok(EvolutionResult {
                    best,
                    best_fitness,
                    population,
                    generations: generation + 1,
                    elapsed,
                    satisfied,
                    fitness_history,
                });
            }

            candidates = breed(
                &population,
                elite_count,
                objective,
                &**selection,
                &**pipeline,
                &mut rng,
                generation,
            )?;
            generation += 1;
        }
    }
}

/// Creates the run RNG, drawing a fresh seed when none is configured.
pub(crate) fn create_rng(seed: Option<u64>) -> StdRng {
    StdRng::seed_from_u64(seed.unwrap_or_else(rand::random))
}

/// Notifies each observer in order, isolating errors and panics.
fn notify_observers<C>(
    observers: &mut [Box<dyn EvolutionObserver<C>>],
    data: &PopulationData<'_, C>,
) {
    for (index, observer) in observers.iter_mut().enumerate() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| observer.population_update(data)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(
                observer = index,
                generation = data.stats.generation,
                error = %format!("{err:#}"),
                "observer failed"
            ),
            Err(_) => warn!(
                observer = index,
                generation = data.stats.generation,
                "observer panicked"
            ),
        }
    }
}

/// Builds the next generation: elites first, then offspring.
fn breed<C: Clone>(
    population: &[EvaluatedCandidate<C>],
    elite_count: usize,
    objective: Objective,
    selection: &dyn SelectionStrategy,
    pipeline: &dyn EvolutionaryOperator<C>,
    rng: &mut StdRng,
    generation: usize,
) -> Result<Vec<C>, EvolutionError> {
    let size = population.len();
    let fitness: Vec<f64> = population.iter().map(|c| c.fitness).collect();

    let mut next: Vec<C> = population[..elite_count]
        .iter()
        .map(|c| c.candidate.clone())
        .collect();

    while next.len() < size {
        let wanted = size - next.len();

        let mut parents = Vec::with_capacity(wanted);
        for idx in selection.select(&fitness, objective, wanted, rng) {
            let parent = population.get(idx).ok_or_else(|| {
                EvolutionError::run(
                    generation,
                    Phase::Selection,
                    anyhow::anyhow!("selected index {idx} outside population of {size}"),
                )
            })?;
            parents.push(parent.candidate.clone());
        }

        let offspring = pipeline
            .apply(parents, rng)
            .map_err(|e| EvolutionError::run(generation, Phase::Variation, e))?;
        if offspring.is_empty() {
            return Err(EvolutionError::run(
                generation,
                Phase::Variation,
                anyhow::anyhow!("evolution pipeline produced no offspring"),
            ));
        }
        next.extend(offspring.into_iter().take(wanted));
    }

    Ok(next)
}

/// Scores whole generations, sequentially or on a rayon pool.
struct EvaluationPool {
    parallel: bool,
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl EvaluationPool {
    #[cfg(feature = "parallel")]
    fn new(config: &EngineConfig) -> Result<Self, EvolutionError> {
        let pool = match config.threads {
            Some(n) if config.parallel => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("evolution-eval-{i}"))
                    .build()
                    .map_err(|e| EvolutionError::ThreadPool(e.to_string()))?,
            ),
            _ => None,
        };
        Ok(Self {
            parallel: config.parallel,
            pool,
        })
    }

    #[cfg(not(feature = "parallel"))]
    fn new(_config: &EngineConfig) -> Result<Self, EvolutionError> {
        Ok(Self { parallel: false })
    }

    /// Scores every candidate, then ranks them best first (stable on ties).
    fn evaluate<C: Sync>(
        &self,
        evaluator: &dyn FitnessEvaluator<C>,
        candidates: Vec<C>,
        objective: Objective,
    ) -> anyhow::Result<Vec<EvaluatedCandidate<C>>> {
        let scores = self.score_all(evaluator, &candidates)?;

        let mut population: Vec<EvaluatedCandidate<C>> = candidates
            .into_iter()
            .zip(scores)
            .map(|(candidate, fitness)| EvaluatedCandidate {
                candidate,
                fitness,
                rank: 0,
            })
            .collect();
        population.sort_by(|a, b| objective.compare(a.fitness, b.fitness));
        for (rank, c) in population.iter_mut().enumerate() {
            c.rank = rank;
        }
        Ok(population)
    }

    #[cfg(feature = "parallel")]
    fn score_all<C: Sync>(
        &self,
        evaluator: &dyn FitnessEvaluator<C>,
        candidates: &[C],
    ) -> anyhow::Result<Vec<f64>> {
        if !self.parallel {
            return candidates.iter().map(|c| evaluator.fitness(c)).collect();
        }
        let score = || -> anyhow::Result<Vec<f64>> {
            candidates.par_iter().map(|c| evaluator.fitness(c)).collect()
        };
        match &self.pool {
            Some(pool) => pool.install(score),
            None => score(),
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn score_all<C: Sync>(
        &self,
        evaluator: &dyn FitnessEvaluator<C>,
        candidates: &[C],
    ) -> anyhow::Result<Vec<f64>> {
        debug_assert!(!self.parallel);
        candidates.iter().map(|c| evaluator.fitness(c)).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::observer::from_fn;
    use crate::evolution::{
        AbortSignal, ConfigError, Crossover, ElapsedTime, EvolutionPipeline, GenerationCount,
        Mutation, Stagnation, TargetFitness, TournamentSelection,
    };
    use proptest::prelude::*;
    use rand::{Rng, RngCore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    // ---- OneMax: maximize the number of set bits ----

    struct BitFactory {
        len: usize,
    }

    impl CandidateFactory<Vec<bool>> for BitFactory {
        fn generate_random_candidate(&self, rng: &mut dyn RngCore) -> anyhow::Result<Vec<bool>> {
            Ok((0..self.len).map(|_| rng.random_bool(0.5)).collect())
        }
    }

    struct OneMax {
        calls: Arc<AtomicUsize>,
    }

    impl OneMax {
        fn new() -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl FitnessEvaluator<Vec<bool>> for OneMax {
        fn fitness(&self, candidate: &Vec<bool>) -> anyhow::Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(candidate.iter().filter(|&&b| b).count() as f64)
        }

        fn objective(&self) -> Objective {
            Objective::Maximize
        }
    }

    /// Minimizes the number of set bits.
    struct ZeroMax;

    impl FitnessEvaluator<Vec<bool>> for ZeroMax {
        fn fitness(&self, candidate: &Vec<bool>) -> anyhow::Result<f64> {
            Ok(candidate.iter().filter(|&&b| b).count() as f64)
        }

        fn objective(&self) -> Objective {
            Objective::Minimize
        }
    }

    /// Every candidate scores the same, so nothing ever improves.
    struct Flat;

    impl FitnessEvaluator<Vec<bool>> for Flat {
        fn fitness(&self, _: &Vec<bool>) -> anyhow::Result<f64> {
            Ok(1.0)
        }

        fn objective(&self) -> Objective {
            Objective::Maximize
        }
    }

    fn bit_pipeline() -> EvolutionPipeline<Vec<bool>> {
        EvolutionPipeline::new()
            .then(Crossover::new(
                0.7,
                |a: &Vec<bool>, b: &Vec<bool>, rng: &mut dyn RngCore| {
                    let point = rng.random_range(0..a.len());
                    let mut x = a[..point].to_vec();
                    x.extend_from_slice(&b[point..]);
                    let mut y = b[..point].to_vec();
                    y.extend_from_slice(&a[point..]);
                    Ok((x, y))
                },
            ))
            .then(Mutation::new(0.3, |c: &Vec<bool>, rng: &mut dyn RngCore| {
                let mut flipped = c.clone();
                let i = rng.random_range(0..flipped.len());
                flipped[i] = !flipped[i];
                Ok(flipped)
            }))
    }

    fn onemax_engine(len: usize, seed: u64) -> EvolutionEngine<Vec<bool>> {
        EvolutionEngine::new(
            BitFactory { len },
            bit_pipeline(),
            OneMax::new(),
            TournamentSelection::new(0.8),
        )
        .with_config(EngineConfig::default().with_seed(seed))
    }

    fn generations(limit: usize) -> Vec<Box<dyn TerminationCondition>> {
        vec![Box::new(GenerationCount::new(limit))]
    }

    fn record_stats(
        engine: &mut EvolutionEngine<Vec<bool>>,
    ) -> Arc<Mutex<Vec<(PopulationStats, Vec<bool>)>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        engine.add_observer(from_fn(move |d: &PopulationData<'_, Vec<bool>>| {
            sink.lock().unwrap().push((d.stats.clone(), d.best_candidate().clone()));
            Ok(())
        }));
        log
    }

    #[test]
    fn test_onemax_convergence() {
        let mut engine = onemax_engine(20, 42);
        let result = engine
            .evolve_population(50, 2, &mut generations(200))
            .unwrap();

        assert!(
            result.best_fitness >= 18.0,
            "expected fitness >= 18 for 20-bit OneMax, got {}",
            result.best_fitness
        );
        assert_eq!(result.generations, 200);
        assert!(result.satisfied_by("generation count"));
    }

    #[test]
    fn test_minimization() {
        let mut engine = EvolutionEngine::new(
            BitFactory { len: 20 },
            bit_pipeline(),
            ZeroMax,
            TournamentSelection::new(0.8),
        )
        .with_config(EngineConfig::default().with_seed(3));

        let result = engine
            .evolve_population(40, 2, &mut generations(150))
            .unwrap();
        assert!(result.best_fitness <= 2.0, "got {}", result.best_fitness);
        // Ranked best first under minimization.
        for pair in result.population.windows(2) {
            assert!(pair[0].fitness <= pair[1].fitness);
        }
    }

    #[test]
    fn test_population_ranked() {
        let mut engine = onemax_engine(12, 5);
        let result = engine
            .evolve_population(30, 3, &mut generations(10))
            .unwrap();

        assert_eq!(result.population.len(), 30);
        for (i, c) in result.population.iter().enumerate() {
            assert_eq!(c.rank, i);
        }
        for pair in result.population.windows(2) {
            assert!(pair[0].fitness >= pair[1].fitness);
        }
        assert_eq!(result.best, result.population[0].candidate);
    }

    #[test]
    fn test_single_generation_returns_initial_member() {
        let factory = BitFactory { len: 16 };
        let mut rng = create_rng(Some(11));
        let initial = factory
            .generate_initial_population(10, Vec::new(), &mut rng)
            .unwrap();

        let mut engine = onemax_engine(16, 11);
        let result = engine
            .evolve_population(10, 1, &mut generations(1))
            .unwrap();

        assert_eq!(result.generations, 1);
        assert_eq!(result.fitness_history.len(), 1);
        assert!(initial.contains(&result.best));
    }

    #[test]
    fn test_exact_generation_count() {
        let mut engine = onemax_engine(8, 1);
        let log = record_stats(&mut engine);
        engine.evolve(10, 1, &mut generations(7)).unwrap();

        let log = log.lock().unwrap();
        let seen: Vec<usize> = log.iter().map(|(s, _)| s.generation).collect();
        assert_eq!(seen, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_stagnation_stops_after_limit_plus_one() {
        let mut engine = EvolutionEngine::new(
            BitFactory { len: 8 },
            bit_pipeline(),
            Flat,
            TournamentSelection::new(0.8),
        )
        .with_config(EngineConfig::default().with_seed(1));

        let mut conditions: Vec<Box<dyn TerminationCondition>> = vec![
            Box::new(Stagnation::new(5)),
            Box::new(GenerationCount::new(1000)),
        ];
        let result = engine.evolve_population(10, 1, &mut conditions).unwrap();

        assert_eq!(result.generations, 6);
        assert_eq!(result.satisfied, vec!["stagnation"]);
    }

    #[test]
    fn test_conditions_reset_between_runs() {
        let mut engine = EvolutionEngine::new(
            BitFactory { len: 8 },
            bit_pipeline(),
            Flat,
            TournamentSelection::new(0.8),
        )
        .with_config(EngineConfig::default().with_seed(1));

        let mut conditions: Vec<Box<dyn TerminationCondition>> =
            vec![Box::new(Stagnation::new(3))];
        let first = engine.evolve_population(10, 1, &mut conditions).unwrap();
        let second = engine.evolve_population(10, 1, &mut conditions).unwrap();
        assert_eq!(first.generations, 4);
        assert_eq!(second.generations, 4);
    }

    #[test]
    fn test_abort_before_start_runs_one_generation() {
        let abort = AbortSignal::new();
        abort.abort();

        let mut engine = onemax_engine(16, 9);
        let mut conditions: Vec<Box<dyn TerminationCondition>> = vec![
            Box::new(abort.clone()),
            Box::new(GenerationCount::new(1000)),
        ];
        let result = engine.evolve_population(20, 2, &mut conditions).unwrap();

        assert_eq!(result.generations, 1);
        assert_eq!(result.satisfied, vec!["user abort"]);
        assert_eq!(result.best, result.population[0].candidate);
    }

    #[test]
    fn test_abort_from_observer_stops_at_boundary() {
        let abort = AbortSignal::new();
        let trigger = abort.clone();

        let mut engine = onemax_engine(16, 9);
        engine.add_observer(from_fn(move |d: &PopulationData<'_, Vec<bool>>| {
            if d.stats.generation == 4 {
                trigger.abort();
            }
            Ok(())
        }));

        let mut conditions: Vec<Box<dyn TerminationCondition>> = vec![Box::new(abort)];
        let result = engine.evolve_population(20, 2, &mut conditions).unwrap();
        assert_eq!(result.generations, 5);
    }

    #[test]
    fn test_target_fitness_stops_early() {
        let mut engine = onemax_engine(10, 4);
        let mut conditions: Vec<Box<dyn TerminationCondition>> = vec![
            Box::new(TargetFitness::new(10.0)),
            Box::new(GenerationCount::new(2000)),
        ];
        let result = engine.evolve_population(40, 2, &mut conditions).unwrap();
        assert_eq!(result.best_fitness, 10.0);
        assert!(result.generations < 2000);
        assert!(result.satisfied_by("target fitness"));
    }

    #[test]
    fn test_elapsed_time_condition() {
        let mut engine = onemax_engine(10, 4);
        let mut conditions: Vec<Box<dyn TerminationCondition>> =
            vec![Box::new(ElapsedTime::new(Duration::from_millis(20)))];
        let result = engine.evolve_population(10, 1, &mut conditions).unwrap();
        assert!(result.elapsed >= Duration::from_millis(20));
    }

    #[test]
    fn test_elitism_monotonic() {
        let mut engine = onemax_engine(30, 8);
        let result = engine
            .evolve_population(20, 1, &mut generations(60))
            .unwrap();

        for window in result.fitness_history.windows(2) {
            assert!(
                window[1] >= window[0],
                "best fitness regressed with elitism: {} -> {}",
                window[0],
                window[1]
            );
        }
    }

    #[test]
    fn test_reproducible_for_seed() {
        let run = || {
            let log = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&log);
            let mut engine = onemax_engine(24, 1234);
            engine.add_observer(from_fn(move |d: &PopulationData<'_, Vec<bool>>| {
                let snapshot: Vec<(Vec<bool>, u64, usize)> = d
                    .population
                    .iter()
                    .map(|c| (c.candidate.clone(), c.fitness.to_bits(), c.rank))
                    .collect();
                sink.lock().unwrap().push((
                    d.stats.generation,
                    d.stats.mean_fitness.to_bits(),
                    d.stats.fitness_std_dev.to_bits(),
                    snapshot,
                ));
                Ok(())
            }));
            engine.evolve(16, 2, &mut generations(25)).unwrap();
            let log = log.lock().unwrap().clone();
            log
        };

        let first = run();
        assert_eq!(first.len(), 25);
        assert!(first.iter().all(|(_, _, _, population)| population.len() == 16));
        assert_eq!(first, run());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let run = |parallel: bool| {
            let mut engine = onemax_engine(24, 77);
            engine.config = engine.config.clone().with_parallel(parallel).with_threads(3);
            engine.evolve_population(16, 2, &mut generations(20)).unwrap()
        };
        let a = run(true);
        let b = run(false);
        assert_eq!(a.fitness_history, b.fitness_history);
        assert_eq!(a.best, b.best);
    }

    #[test]
    fn test_cache_skips_repeat_evaluations() {
        // No variation at all: every generation is a copy of earlier values.
        let evaluator = OneMax::new();
        let calls = Arc::clone(&evaluator.calls);
        let mut engine = EvolutionEngine::new(
            BitFactory { len: 32 },
            EvolutionPipeline::new(),
            evaluator,
            TournamentSelection::new(0.8),
        )
        .with_config(EngineConfig::default().with_seed(2));

        engine.evolve(10, 2, &mut generations(10)).unwrap();
        assert!(
            calls.load(Ordering::SeqCst) <= 10,
            "expected at most one evaluation per initial candidate, got {}",
            calls.load(Ordering::SeqCst)
        );
    }

    #[test]
    fn test_without_cache_reevaluates() {
        let evaluator = OneMax::new();
        let calls = Arc::clone(&evaluator.calls);
        let mut engine = EvolutionEngine::new(
            BitFactory { len: 32 },
            EvolutionPipeline::new(),
            evaluator,
            TournamentSelection::new(0.8),
        )
        .with_config(EngineConfig::default().with_seed(2).with_cache_fitness(false));

        engine.evolve(10, 2, &mut generations(10)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn test_seeds_in_initial_population() {
        let mut engine = onemax_engine(8, 3);
        let perfect = vec![true; 8];
        let result = engine
            .evolve_with_seeds(10, 1, vec![perfect.clone()], &mut generations(1))
            .unwrap();
        assert_eq!(result.best, perfect);
        assert_eq!(result.best_fitness, 8.0);
    }

    #[test]
    fn test_observer_failure_is_isolated() {
        let mut engine = onemax_engine(8, 3);
        engine.add_observer(from_fn(|_: &PopulationData<'_, Vec<bool>>| {
            anyhow::bail!("display unavailable")
        }));
        engine.add_observer(from_fn(|d: &PopulationData<'_, Vec<bool>>| {
            if d.stats.generation == 1 {
                panic!("observer bug");
            }
            Ok(())
        }));
        let log = record_stats(&mut engine);

        let result = engine.evolve_population(10, 1, &mut generations(4)).unwrap();
        assert_eq!(result.generations, 4);
        assert_eq!(log.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_observers_notified_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut engine = onemax_engine(8, 3);
        for id in 0..3 {
            let order = Arc::clone(&order);
            engine.add_observer(from_fn(move |d: &PopulationData<'_, Vec<bool>>| {
                order.lock().unwrap().push((d.stats.generation, id));
                Ok(())
            }));
        }
        engine.evolve(6, 1, &mut generations(2)).unwrap();
        assert_eq!(
            *order.lock().unwrap(),
            vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]
        );
    }

    // ---- Error handling ----

    struct FailsAfter {
        remaining: AtomicUsize,
    }

    impl FitnessEvaluator<Vec<bool>> for FailsAfter {
        fn fitness(&self, candidate: &Vec<bool>) -> anyhow::Result<f64> {
            if self.remaining.fetch_sub(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("evaluator exhausted");
            }
            Ok(candidate.len() as f64)
        }

        fn objective(&self) -> Objective {
            Objective::Maximize
        }
    }

    #[test]
    fn test_config_errors_fail_fast() {
        let mut engine = onemax_engine(8, 3);
        assert!(matches!(
            engine.evolve(0, 0, &mut generations(1)),
            Err(EvolutionError::Config(ConfigError::EmptyPopulation))
        ));
        assert!(matches!(
            engine.evolve(5, 5, &mut generations(1)),
            Err(EvolutionError::Config(ConfigError::EliteCountTooHigh { .. }))
        ));
        assert!(matches!(
            engine.evolve(5, 1, &mut []),
            Err(EvolutionError::Config(ConfigError::NoTerminationConditions))
        ));
    }

    #[test]
    fn test_nan_probabilities_do_not_panic() {
        let mut engine = EvolutionEngine::new(
            BitFactory { len: 8 },
            EvolutionPipeline::new()
                .then(Mutation::new(f64::NAN, |c: &Vec<bool>, _| Ok(c.clone())))
                .then(Crossover::new(
                    f64::NAN,
                    |a: &Vec<bool>, b: &Vec<bool>, _| Ok((a.clone(), b.clone())),
                )),
            OneMax::new(),
            TournamentSelection::new(f64::NAN),
        )
        .with_config(EngineConfig::default().with_seed(1));

        let result = engine.evolve_population(10, 1, &mut generations(3)).unwrap();
        assert_eq!(result.generations, 3);
    }

    #[test]
    fn test_evaluator_error_is_fatal_with_context() {
        let mut engine = EvolutionEngine::new(
            BitFactory { len: 8 },
            bit_pipeline(),
            FailsAfter {
                remaining: AtomicUsize::new(15),
            },
            TournamentSelection::new(0.8),
        )
        .with_config(
            EngineConfig::default()
                .with_seed(1)
                .with_parallel(false)
                .with_cache_fitness(false),
        );

        let err = engine.evolve(10, 1, &mut generations(100)).unwrap_err();
        assert_eq!(err.generation(), Some(1));
        assert_eq!(err.phase(), Some(Phase::Evaluation));
        assert!(err.to_string().contains("evaluator exhausted"));
    }

    #[test]
    fn test_operator_error_is_fatal() {
        let mut engine = EvolutionEngine::new(
            BitFactory { len: 8 },
            Mutation::new(1.0, |_: &Vec<bool>, _| anyhow::bail!("bad mutation")),
            OneMax::new(),
            TournamentSelection::new(0.8),
        )
        .with_config(EngineConfig::default().with_seed(1));

        let err = engine.evolve(10, 1, &mut generations(100)).unwrap_err();
        assert_eq!(err.generation(), Some(0));
        assert_eq!(err.phase(), Some(Phase::Variation));
    }

    #[test]
    fn test_empty_offspring_is_fatal() {
        struct Devour;
        impl EvolutionaryOperator<Vec<bool>> for Devour {
            fn apply(
                &self,
                _: Vec<Vec<bool>>,
                _: &mut dyn RngCore,
            ) -> anyhow::Result<Vec<Vec<bool>>> {
                Ok(Vec::new())
            }
        }

        let mut engine = EvolutionEngine::new(
            BitFactory { len: 8 },
            Devour,
            OneMax::new(),
            TournamentSelection::new(0.8),
        );
        let err = engine.evolve(10, 1, &mut generations(5)).unwrap_err();
        assert_eq!(err.phase(), Some(Phase::Variation));
    }

    #[test]
    fn test_oversized_offspring_truncated() {
        struct Duplicate;
        impl EvolutionaryOperator<Vec<bool>> for Duplicate {
            fn apply(
                &self,
                candidates: Vec<Vec<bool>>,
                _: &mut dyn RngCore,
            ) -> anyhow::Result<Vec<Vec<bool>>> {
                Ok(candidates.iter().chain(&candidates).cloned().collect())
            }
        }

        let mut engine = EvolutionEngine::new(
            BitFactory { len: 8 },
            Duplicate,
            OneMax::new(),
            TournamentSelection::new(0.8),
        );
        let log = record_stats(&mut engine);
        engine.evolve(9, 2, &mut generations(5)).unwrap();
        assert!(log
            .lock()
            .unwrap()
            .iter()
            .all(|(s, _)| s.population_size == 9));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_population_size_constant_and_elitism_holds(
            size in 1usize..30,
            elite_frac in 0.0f64..1.0,
            seed in any::<u64>(),
            gens in 1usize..15,
        ) {
            let elite = ((size as f64 * elite_frac) as usize).min(size - 1);
            let mut engine = onemax_engine(12, seed);
            engine.config = engine.config.clone().with_parallel(false);
            let log = record_stats(&mut engine);
            let result = engine.evolve_population(size, elite, &mut generations(gens)).unwrap();

            prop_assert_eq!(result.generations, gens);
            prop_assert_eq!(result.population.len(), size);
            for (stats, _) in log.lock().unwrap().iter() {
                prop_assert_eq!(stats.population_size, size);
            }
            if elite >= 1 {
                for w in result.fitness_history.windows(2) {
                    prop_assert!(w[1] >= w[0]);
                }
            }
        }
    }
}
