//! Core trait definitions for the evolution engine.
//!
//! [`CandidateFactory`] and [`FitnessEvaluator`] define the contract between
//! the generic engine and a domain-specific genome. [`PopulationStats`] and
//! [`PopulationData`] are the per-generation snapshots handed to
//! termination conditions and observers.

use rand::RngCore;
use std::cmp::Ordering;
use std::time::Duration;

/// Which direction of the fitness scale is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Objective {
    /// Higher fitness is better ("natural" fitness).
    Maximize,
    /// Lower fitness is better (error or cost).
    Minimize,
}

impl Objective {
    /// Returns `true` if `a` is strictly better than `b`.
    pub fn is_better(self, a: f64, b: f64) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    /// Orders two fitness values best first.
    ///
    /// `Less` means `a` is better than `b`. NaN always sorts last, whatever
    /// the direction.
    pub fn compare(self, a: f64, b: f64) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
                match self {
                    Objective::Maximize => ord.reverse(),
                    Objective::Minimize => ord,
                }
            }
        }
    }

    /// The worst representable fitness for this direction.
    pub fn worst(self) -> f64 {
        match self {
            Objective::Maximize => f64::NEG_INFINITY,
            Objective::Minimize => f64::INFINITY,
        }
    }
}

/// A candidate paired with its score and its position in the ranked population.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedCandidate<C> {
    pub candidate: C,
    pub fitness: f64,
    /// 0 is the best candidate of the generation.
    pub rank: usize,
}

/// Creates the random candidates that seed a run.
///
/// # Implementing
///
/// ```ignore
/// struct BitFactory { len: usize }
///
/// impl CandidateFactory<Vec<bool>> for BitFactory {
///     fn generate_random_candidate(&self, rng: &mut dyn RngCore) -> anyhow::Result<Vec<bool>> {
///         Ok((0..self.len).map(|_| rng.random_bool(0.5)).collect())
///     }
/// }
/// ```
pub trait CandidateFactory<C>: Send + Sync {
    /// Creates one random candidate.
    fn generate_random_candidate(&self, rng: &mut dyn RngCore) -> anyhow::Result<C>;

    /// Creates a full initial population of `size` candidates.
    ///
    /// `seeds` occupy the first slots unchanged; the rest are random. The
    /// engine guarantees `seeds.len() <= size`.
    fn generate_initial_population(
        &self,
        size: usize,
        seeds: Vec<C>,
        rng: &mut dyn RngCore,
    ) -> anyhow::Result<Vec<C>> {
        let mut population = Vec::with_capacity(size);
        population.extend(seeds);
        while population.len() < size {
            population.push(self.generate_random_candidate(rng)?);
        }
        Ok(population)
    }
}

/// Scores a single candidate.
///
/// Implementations must be `Send + Sync`: the engine may call
/// [`fitness`](FitnessEvaluator::fitness) from several rayon workers at once.
pub trait FitnessEvaluator<C>: Send + Sync {
    /// Computes the fitness of `candidate`.
    ///
    /// An error is fatal to the run; the engine never substitutes a default score.
    fn fitness(&self, candidate: &C) -> anyhow::Result<f64>;

    /// The direction in which this evaluator's scores improve.
    fn objective(&self) -> Objective;
}

/// Summary statistics of one evaluated generation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PopulationStats {
    pub best_fitness: f64,
    pub mean_fitness: f64,
    pub fitness_std_dev: f64,
    pub objective: Objective,
    pub population_size: usize,
    pub elite_count: usize,
    /// Zero-based generation index.
    pub generation: usize,
    /// Wall-clock time since the run started.
    pub elapsed: Duration,
}

impl PopulationStats {
    /// Computes statistics over a ranked (best-first) population.
    pub(crate) fn compute<C>(
        population: &[EvaluatedCandidate<C>],
        objective: Objective,
        elite_count: usize,
        generation: usize,
        elapsed: Duration,
    ) -> Self {
        let n = population.len().max(1) as f64;
        let mean = population.iter().map(|c| c.fitness).sum::<f64>() / n;
        let variance = population
            .iter()
            .map(|c| (c.fitness - mean).powi(2))
            .sum::<f64>()
            / n;

        Self {
            best_fitness: population
                .first()
                .map_or_else(|| objective.worst(), |c| c.fitness),
            mean_fitness: mean,
            fitness_std_dev: variance.sqrt(),
            objective,
            population_size: population.len(),
            elite_count,
            generation,
            elapsed,
        }
    }
}

/// Read-only view of a generation, handed to observers.
#[derive(Debug)]
pub struct PopulationData<'a, C> {
    pub stats: PopulationStats,
    /// The population, sorted best first.
    pub population: &'a [EvaluatedCandidate<C>],
}

impl<C> PopulationData<'_, C> {
    /// The best candidate of this generation.
    pub fn best_candidate(&self) -> &C {
        &self.population[0].candidate
    }
}
