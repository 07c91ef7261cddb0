//! Error types for the evolution engine.
//!
//! Configuration problems are reported as [`ConfigError`] before a run
//! starts. Faults raised by caller-supplied collaborators (factory,
//! evaluator, operators) abort the run and surface once as
//! [`EvolutionError::Run`], tagged with the generation and [`Phase`].

use std::fmt;

/// Invalid run parameters, detected before any candidate is created.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("population size must be at least 1")]
    EmptyPopulation,
    #[error("elite count {elite_count} must be less than population size {population_size}")]
    EliteCountTooHigh {
        elite_count: usize,
        population_size: usize,
    },
    #[error("at least one termination condition is required")]
    NoTerminationConditions,
    #[error("{seeds} seed candidates do not fit in a population of {population_size}")]
    TooManySeeds {
        seeds: usize,
        population_size: usize,
    },
    #[error("thread count must be positive when set")]
    ZeroThreads,
}

/// The stage of a generation in which a collaborator failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initialization,
    Evaluation,
    Selection,
    Variation,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Initialization => "initialization",
            Phase::Evaluation => "evaluation",
            Phase::Selection => "selection",
            Phase::Variation => "variation",
        };
        f.write_str(name)
    }
}

/// Errors returned by [`EvolutionEngine`](super::EvolutionEngine) and
/// [`EvolutionTask`](super::EvolutionTask).
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("{phase} failed in generation {generation}: {source:#}")]
    Run {
        generation: usize,
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to build evaluation thread pool: {0}")]
    ThreadPool(String),
    #[error("failed to spawn evolution thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("evolution thread panicked")]
    TaskPanicked,
}

impl EvolutionError {
    pub(crate) fn run(generation: usize, phase: Phase, source: anyhow::Error) -> Self {
        EvolutionError::Run {
            generation,
            phase,
            source,
        }
    }

    /// Generation in which the run failed, if the error came from inside the loop.
    pub fn generation(&self) -> Option<usize> {
        match self {
            EvolutionError::Run { generation, .. } => Some(*generation),
            _ => None,
        }
    }

    /// Phase in which the run failed, if the error came from inside the loop.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            EvolutionError::Run { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}
