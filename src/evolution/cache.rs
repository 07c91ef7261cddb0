//! Memoizing fitness evaluator.
//!
//! [`CachingEvaluator`] wraps another evaluator and remembers the score of
//! every candidate value it has seen. Candidates are immutable, so a value
//! that survives a generation unchanged (an elite, or an offspring no
//! operator touched) is never scored twice.
//!
//! The cache is safe to query from several rayon workers at once. Two
//! workers racing on the same new value may both call the inner evaluator;
//! the first stored score wins and both callers return it.

use super::types::{FitnessEvaluator, Objective};
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fitness evaluator decorator keyed by candidate value.
///
/// # Usage
///
/// ```ignore
/// let inner = PixelDifference::new(target);
/// let cached = CachingEvaluator::new(&inner);
/// let a = cached.fitness(&image)?; // computed
/// let b = cached.fitness(&image)?; // cached
/// ```
pub struct CachingEvaluator<'a, C> {
    inner: &'a dyn FitnessEvaluator<C>,
    scores: DashMap<C, f64>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl<'a, C> CachingEvaluator<'a, C>
where
    C: Eq + Hash,
{
    /// Wraps `inner` with an empty cache.
    pub fn new(inner: &'a dyn FitnessEvaluator<C>) -> Self {
        Self {
            inner,
            scores: DashMap::new(),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Number of distinct candidates with a stored score.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Returns `true` if nothing has been scored yet.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Number of lookups answered from the cache.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of lookups delegated to the inner evaluator.
    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }
}

impl<C> FitnessEvaluator<C> for CachingEvaluator<'_, C>
where
    C: Clone + Eq + Hash + Send + Sync,
{
    fn fitness(&self, candidate: &C) -> anyhow::Result<f64> {
        // Copy out before touching the map again: the read guard holds a shard lock.
        let cached = self.scores.get(candidate).map(|score| *score);
        if let Some(score) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(score);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let score = self.inner.fitness(candidate)?;
        let stored = *self.scores.entry(candidate.clone()).or_insert(score);
        Ok(stored)
    }

    fn objective(&self) -> Objective {
        self.inner.objective()
    }
}
