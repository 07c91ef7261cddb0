//! Stopping conditions for an evolution run.
//!
//! The engine checks every configured [`TerminationCondition`] after each
//! generation has been evaluated and reported; the run ends as soon as any
//! of them is satisfied.
//!
//! | Condition | Fires when |
//! |---|---|
//! | [`GenerationCount`] | `limit` generations have been evaluated |
//! | [`ElapsedTime`] | the run has lasted at least `limit` |
//! | [`TargetFitness`] | the best fitness reaches the target |
//! | [`Stagnation`] | no improvement for `limit` generations |
//! | [`AbortSignal`] | the signal was raised from outside the run |

use super::types::PopulationStats;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Decides, once per generation, whether the run should stop.
pub trait TerminationCondition: Send {
    /// Inspects the latest generation.
    ///
    /// Called exactly once per generation, in order, so stateful conditions
    /// may track history.
    fn should_terminate(&mut self, stats: &PopulationStats) -> bool;

    /// Clears per-run state. Called before the first generation of a run.
    fn reset(&mut self) {}

    /// Short human-readable name, used in logs and results.
    fn name(&self) -> &'static str;
}

/// Stops after a fixed number of generations.
///
/// A limit of `G` performs exactly `G` evaluation passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GenerationCount {
    limit: usize,
}

impl GenerationCount {
    /// Creates the condition; a limit of 0 is raised to 1.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }
}

impl TerminationCondition for GenerationCount {
    fn should_terminate(&mut self, stats: &PopulationStats) -> bool {
        stats.generation + 1 >= self.limit
    }

    fn name(&self) -> &'static str {
        "generation count"
    }
}

/// Stops once the run has taken at least `limit` of wall-clock time.
///
/// Checked between generations, so the run overshoots by up to one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElapsedTime {
    limit: Duration,
}

impl ElapsedTime {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }
}

impl TerminationCondition for ElapsedTime {
    fn should_terminate(&mut self, stats: &PopulationStats) -> bool {
        stats.elapsed >= self.limit
    }

    fn name(&self) -> &'static str {
        "elapsed time"
    }
}

/// Stops when the best fitness reaches `target`.
///
/// "Reaches" follows the run's objective: `>=` when maximizing, `<=` when
/// minimizing.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetFitness {
    target: f64,
}

impl TargetFitness {
    pub fn new(target: f64) -> Self {
        Self { target }
    }
}

impl TerminationCondition for TargetFitness {
    fn should_terminate(&mut self, stats: &PopulationStats) -> bool {
        !stats.objective.is_better(self.target, stats.best_fitness)
    }

    fn name(&self) -> &'static str {
        "target fitness"
    }
}

/// Stops when fitness has not improved for `limit` consecutive generations.
///
/// The first generation sets the baseline. With a limit of `K` and no
/// improvement at all, the run stops after generation `K` (zero-based),
/// having evaluated `K + 1` generations.
///
/// By default the best fitness is tracked; [`tracking_mean`](Self::tracking_mean)
/// tracks the population mean instead.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stagnation {
    limit: usize,
    use_mean: bool,
    best: Option<f64>,
    improved_at: usize,
}

impl Stagnation {
    /// Creates a condition tracking the best fitness; a limit of 0 is raised to 1.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            use_mean: false,
            best: None,
            improved_at: 0,
        }
    }

    /// Tracks the population mean instead of the best fitness.
    pub fn tracking_mean(mut self) -> Self {
        self.use_mean = true;
        self
    }

    /// Generation at which the tracked value last improved.
    pub fn last_improvement(&self) -> usize {
        self.improved_at
    }
}

impl TerminationCondition for Stagnation {
    fn should_terminate(&mut self, stats: &PopulationStats) -> bool {
        let value = if self.use_mean {
            stats.mean_fitness
        } else {
            stats.best_fitness
        };

        let improved = match self.best {
            None => true,
            Some(best) => stats.objective.is_better(value, best),
        };
        if improved {
            self.best = Some(value);
            self.improved_at = stats.generation;
        }

        stats.generation.saturating_sub(self.improved_at) >= self.limit
    }

    fn reset(&mut self) {
        self.best = None;
        self.improved_at = 0;
    }

    fn name(&self) -> &'static str {
        "stagnation"
    }
}

/// A cancellation flag shared between a run and the code that started it.
///
/// Clones share the same flag. Raising it is cooperative: the engine sees it
/// at the next generation boundary, after the in-flight evaluation pass.
///
/// # Examples
///
/// ```
/// use u_evolve::evolution::AbortSignal;
///
/// let signal = AbortSignal::new();
/// let handle = signal.clone();
/// assert!(handle.abort());
/// assert!(!handle.abort()); // already raised
/// assert!(signal.is_aborted());
/// signal.reset();
/// assert!(!signal.is_aborted());
/// ```
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    flag: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal.
    ///
    /// Returns `true` if this call raised it, `false` if it was already raised.
    pub fn abort(&self) -> bool {
        self.flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Returns `true` once the signal has been raised. Never blocks.
    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Lowers the signal so it can serve a later, independent run.
    ///
    /// Must not be called while a run is still observing the signal.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl TerminationCondition for AbortSignal {
    fn should_terminate(&mut self, _stats: &PopulationStats) -> bool {
        self.is_aborted()
    }

    fn name(&self) -> &'static str {
        "user abort"
    }
}
