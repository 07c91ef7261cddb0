//! Variation operators and pipelines.
//!
//! An [`EvolutionaryOperator`] maps a batch of selected parents to a batch
//! of offspring. Operators never modify their inputs in place: a candidate
//! that should change is replaced by a new value.
//!
//! # Building blocks
//!
//! - [`Mutation`]: applies a per-candidate transformation with some probability
//! - [`Crossover`]: recombines consecutive pairs with some probability
//! - [`EvolutionPipeline`]: runs operators in sequence; itself an operator,
//!   so pipelines nest
//!
//! Given the same RNG state and input, every operator here is reproducible.

use super::config::clamp_probability;
use rand::{Rng, RngCore};

/// Transforms a batch of candidates into a batch of offspring.
///
/// The output may be shorter or longer than the input; the engine selects
/// again or truncates until the next generation is exactly full.
pub trait EvolutionaryOperator<C>: Send + Sync {
    fn apply(&self, candidates: Vec<C>, rng: &mut dyn RngCore) -> anyhow::Result<Vec<C>>;
}

type MutateFn<C> = dyn Fn(&C, &mut dyn RngCore) -> anyhow::Result<C> + Send + Sync;
type MateFn<C> = dyn Fn(&C, &C, &mut dyn RngCore) -> anyhow::Result<(C, C)> + Send + Sync;

/// Applies `mutate` to each candidate independently with probability `p`.
///
/// # Examples
///
/// ```
/// use u_evolve::evolution::{EvolutionaryOperator, Mutation};
/// use rand::SeedableRng;
///
/// let negate = Mutation::new(1.0, |x: &i32, _| Ok(-x));
/// let mut rng = rand::rngs::StdRng::seed_from_u64(1);
/// assert_eq!(negate.apply(vec![1, 2], &mut rng).unwrap(), vec![-1, -2]);
/// ```
pub struct Mutation<C> {
    probability: f64,
    mutate: Box<MutateFn<C>>,
}

impl<C> Mutation<C> {
    /// Creates a mutation; `probability` is clamped to 0.0–1.0 and NaN disables it.
    pub fn new<F>(probability: f64, mutate: F) -> Self
    where
        F: Fn(&C, &mut dyn RngCore) -> anyhow::Result<C> + Send + Sync + 'static,
    {
        Self {
            probability: clamp_probability(probability),
            mutate: Box::new(mutate),
        }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl<C: Send + Sync> EvolutionaryOperator<C> for Mutation<C> {
    fn apply(&self, candidates: Vec<C>, rng: &mut dyn RngCore) -> anyhow::Result<Vec<C>> {
        let mut offspring = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if rng.random_bool(self.probability) {
                offspring.push((self.mutate)(&candidate, rng)?);
            } else {
                offspring.push(candidate);
            }
        }
        Ok(offspring)
    }
}

/// Recombines consecutive pairs `(0, 1), (2, 3), ...` with probability `p`.
///
/// A pair that is not recombined passes through unchanged, as does the last
/// candidate of an odd-sized batch. The batch size is preserved.
pub struct Crossover<C> {
    probability: f64,
    mate: Box<MateFn<C>>,
}

impl<C> Crossover<C> {
    /// Creates a crossover; `probability` is clamped to 0.0–1.0 and NaN disables it.
    pub fn new<F>(probability: f64, mate: F) -> Self
    where
        F: Fn(&C, &C, &mut dyn RngCore) -> anyhow::Result<(C, C)> + Send + Sync + 'static,
    {
        Self {
            probability: clamp_probability(probability),
            mate: Box::new(mate),
        }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl<C: Send + Sync> EvolutionaryOperator<C> for Crossover<C> {
    fn apply(&self, candidates: Vec<C>, rng: &mut dyn RngCore) -> anyhow::Result<Vec<C>> {
        let mut offspring = Vec::with_capacity(candidates.len());
        let mut iter = candidates.into_iter();
        while let Some(first) = iter.next() {
            let Some(second) = iter.next() else {
                offspring.push(first);
                break;
            };
            if rng.random_bool(self.probability) {
                let (a, b) = (self.mate)(&first, &second, rng)?;
                offspring.push(a);
                offspring.push(b);
            } else {
                offspring.push(first);
                offspring.push(second);
            }
        }
        Ok(offspring)
    }
}

/// An ordered chain of operators.
///
/// The output of each operator is the input of the next. An empty pipeline
/// returns its input unchanged.
///
/// # Examples
///
/// ```
/// use u_evolve::evolution::{EvolutionPipeline, EvolutionaryOperator, Mutation};
/// use rand::SeedableRng;
///
/// let pipeline = EvolutionPipeline::new()
///     .then(Mutation::new(1.0, |x: &i32, _| Ok(x + 1)))
///     .then(Mutation::new(1.0, |x: &i32, _| Ok(x * 10)));
/// let mut rng = rand::rngs::StdRng::seed_from_u64(1);
/// assert_eq!(pipeline.apply(vec![1], &mut rng).unwrap(), vec![20]);
/// ```
pub struct EvolutionPipeline<C> {
    operators: Vec<Box<dyn EvolutionaryOperator<C>>>,
}

impl<C> EvolutionPipeline<C> {
    pub fn new() -> Self {
        Self {
            operators: Vec::new(),
        }
    }

    /// Appends an operator to the end of the chain.
    pub fn then<O>(mut self, operator: O) -> Self
    where
        O: EvolutionaryOperator<C> + 'static,
    {
        self.operators.push(Box::new(operator));
        self
    }

    /// Appends an already boxed operator.
    pub fn push(&mut self, operator: Box<dyn EvolutionaryOperator<C>>) {
        self.operators.push(operator);
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

impl<C> Default for EvolutionPipeline<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Send + Sync> EvolutionaryOperator<C> for EvolutionPipeline<C> {
    fn apply(&self, candidates: Vec<C>, rng: &mut dyn RngCore) -> anyhow::Result<Vec<C>> {
        self.operators
            .iter()
            .try_fold(candidates, |batch, operator| operator.apply(batch, rng))
    }
}
