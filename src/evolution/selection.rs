//! Parent selection strategies.
//!
//! Selection decides which members of the scored population become parents
//! of the next generation. All strategies sample with replacement, so one
//! candidate may be picked many times, and all respect the evaluator's
//! [`Objective`].
//!
//! # References
//!
//! - Blickle & Thiele (1996), "A Comparison of Selection Schemes used in
//!   Evolutionary Algorithms"
//! - Goldberg & Deb (1991), "A Comparative Analysis of Selection Schemes
//!   Used in Genetic Algorithms"

use super::config::clamp_probability;
use super::types::Objective;
use rand::{Rng, RngCore};
use std::cmp::Ordering;

/// Chooses parents from a scored population.
///
/// Strategies receive only the fitness values (indexed like the population)
/// and return indices into that slice.
pub trait SelectionStrategy: Send + Sync {
    /// Selects `count` parent indices.
    ///
    /// # Panics
    /// Implementations may panic if `fitness` is empty.
    fn select(
        &self,
        fitness: &[f64],
        objective: Objective,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<usize>;
}

/// Binary tournament with a configurable win probability.
///
/// Two candidates are drawn uniformly at random; the fitter one is returned
/// with probability `p`, the weaker one otherwise.
///
/// - p = 1.0: the weaker of the pair is never returned
/// - p = 0.5: uniform random selection
/// - p in 0.7–0.9: typical, moderate pressure
///
/// # Examples
///
/// ```
/// use u_evolve::evolution::TournamentSelection;
///
/// let selection = TournamentSelection::new(0.8);
/// assert!((selection.probability() - 0.8).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TournamentSelection {
    probability: f64,
}

impl TournamentSelection {
    /// Creates a tournament; `probability` is clamped to 0.0–1.0 and NaN becomes 0.0.
    pub fn new(probability: f64) -> Self {
        Self {
            probability: clamp_probability(probability),
        }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl Default for TournamentSelection {
    fn default() -> Self {
        Self::new(0.8)
    }
}

impl SelectionStrategy for TournamentSelection {
    fn select(
        &self,
        fitness: &[f64],
        objective: Objective,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<usize> {
        assert!(!fitness.is_empty(), "cannot select from empty population");
        let n = fitness.len();

        (0..count)
            .map(|_| {
                let a = rng.random_range(0..n);
                let b = rng.random_range(0..n);
                let (fitter, weaker) = match objective.compare(fitness[a], fitness[b]) {
                    Ordering::Greater => (b, a),
                    _ => (a, b),
                };
                if rng.random_bool(self.probability) {
                    fitter
                } else {
                    weaker
                }
            })
            .collect()
    }
}

/// Rank-based selection using linear ranking.
///
/// Selection probability depends on rank position, not raw fitness, which
/// avoids the scaling problems of roulette wheel selection. The best of `n`
/// candidates has weight `n`, the worst weight 1.
///
/// Reference: Baker (1985), "Adaptive Selection Methods for Genetic
/// Algorithms"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankSelection;

impl SelectionStrategy for RankSelection {
    fn select(
        &self,
        fitness: &[f64],
        objective: Objective,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<usize> {
        assert!(!fitness.is_empty(), "cannot select from empty population");
        let n = fitness.len();
        if n == 1 {
            return vec![0; count];
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| objective.compare(fitness[a], fitness[b]));

        let total = (n * (n + 1)) as f64 / 2.0;
        (0..count)
            .map(|_| {
                let threshold = rng.random_range(0.0..total);
                let mut cumulative = 0.0;
                for (rank, &idx) in order.iter().enumerate() {
                    cumulative += (n - rank) as f64;
                    if cumulative > threshold {
                        return idx;
                    }
                }
                order[n - 1]
            })
            .collect()
    }
}

/// Fitness-proportionate (roulette wheel) selection.
///
/// Weights are shifted so the worst candidate gets a small positive weight:
/// `f - min + ε` when maximizing, `max - f + ε` when minimizing. Infinitely
/// good candidates (`+inf` when maximizing, `-inf` when minimizing) take all
/// the selections, split uniformly between them; infinitely bad and NaN
/// candidates get weight `ε`.
///
/// **Warning**: susceptible to super-individual dominance when fitness
/// variance is high.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouletteWheelSelection;

impl SelectionStrategy for RouletteWheelSelection {
    fn select(
        &self,
        fitness: &[f64],
        objective: Objective,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<usize> {
        assert!(!fitness.is_empty(), "cannot select from empty population");
        let n = fitness.len();
        if n == 1 {
            return vec![0; count];
        }

        let ideal = match objective {
            Objective::Maximize => f64::INFINITY,
            Objective::Minimize => f64::NEG_INFINITY,
        };
        let best: Vec<usize> = (0..n).filter(|&i| fitness[i] == ideal).collect();
        if !best.is_empty() {
            return (0..count)
                .map(|_| best[rng.random_range(0..best.len())])
                .collect();
        }

        let epsilon = 1e-10;
        let finite = fitness.iter().copied().filter(|f| f.is_finite());
        let weights: Vec<f64> = match objective {
            Objective::Maximize => {
                let min = finite.fold(f64::INFINITY, f64::min);
                fitness.iter().map(|&f| weight(f - min, epsilon)).collect()
            }
            Objective::Minimize => {
                let max = finite.fold(f64::NEG_INFINITY, f64::max);
                fitness.iter().map(|&f| weight(max - f, epsilon)).collect()
            }
        };

        let mut cumulative = Vec::with_capacity(n);
        let mut total = 0.0;
        for w in &weights {
            total += w;
            cumulative.push(total);
        }

        (0..count)
            .map(|_| {
                let threshold = rng.random_range(0.0..total);
                cumulative.partition_point(|&c| c <= threshold).min(n - 1)
            })
            .collect()
    }
}

fn weight(distance: f64, epsilon: f64) -> f64 {
    if distance.is_finite() && distance > 0.0 {
        distance + epsilon
    } else {
        epsilon
    }
}
