//! Engine configuration.
//!
//! [`EngineConfig`] holds the parameters that stay fixed across runs of one
//! engine. Per-run parameters (population size, elite count, termination
//! conditions) are passed to [`evolve`](super::EvolutionEngine::evolve) and
//! checked by [`validate_run`].

use super::error::ConfigError;

/// Configuration for the [`EvolutionEngine`](super::EvolutionEngine).
///
/// # Defaults
///
/// ```
/// use u_evolve::evolution::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert!(config.parallel);
/// assert!(config.cache_fitness);
/// assert!(config.seed.is_none());
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_evolve::evolution::EngineConfig;
///
/// let config = EngineConfig::default()
///     .with_seed(42)
///     .with_parallel(false)
///     .with_cache_fitness(false);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Whether to evaluate candidates in parallel using rayon.
    ///
    /// Ignored when the `parallel` feature is disabled.
    pub parallel: bool,

    /// Size of a dedicated evaluation pool.
    ///
    /// `None` uses rayon's global pool, sized to the available hardware
    /// concurrency.
    pub threads: Option<usize>,

    /// Whether to memoize fitness scores by candidate value for the
    /// duration of a run.
    pub cache_fitness: bool,

    /// Random seed for reproducibility.
    ///
    /// `None` draws a fresh seed for every run.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
            cache_fitness: true,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Enables or disables parallel evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Evaluates on a dedicated pool of `n` threads.
    pub fn with_threads(mut self, n: usize) -> Self {
        self.threads = Some(n);
        self
    }

    /// Enables or disables the per-run fitness cache.
    pub fn with_cache_fitness(mut self, cache: bool) -> Self {
        self.cache_fitness = cache;
        self
    }

    /// Sets the random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == Some(0) {
            return Err(ConfigError::ZeroThreads);
        }
        Ok(())
    }
}

/// Validates the parameters of a single run.
pub(crate) fn validate_run(
    population_size: usize,
    elite_count: usize,
    seed_count: usize,
    condition_count: usize,
) -> Result<(), ConfigError> {
    if population_size < 1 {
        return Err(ConfigError::EmptyPopulation);
    }
    if elite_count >= population_size {
        return Err(ConfigError::EliteCountTooHigh {
            elite_count,
            population_size,
        });
    }
    if seed_count > population_size {
        return Err(ConfigError::TooManySeeds {
            seeds: seed_count,
            population_size,
        });
    }
    if condition_count == 0 {
        return Err(ConfigError::NoTerminationConditions);
    }
    Ok(())
}

/// Clamps a probability to 0.0–1.0. NaN becomes 0.0.
pub(crate) fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}
