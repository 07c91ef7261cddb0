//! Generational evolution engine.
//!
//! A generic, domain-agnostic evolutionary algorithm built from pluggable
//! parts. Users supply how candidates are created ([`CandidateFactory`]),
//! scored ([`FitnessEvaluator`]) and varied ([`EvolutionaryOperator`]); the
//! engine drives the loop.
//!
//! # Core Traits
//!
//! - [`CandidateFactory`]: creates random candidates for the initial population
//! - [`FitnessEvaluator`]: scores a candidate and fixes the [`Objective`]
//! - [`EvolutionaryOperator`]: turns selected parents into offspring
//! - [`SelectionStrategy`]: picks parents from the ranked population
//! - [`TerminationCondition`]: decides when the run stops
//! - [`EvolutionObserver`]: receives a read-only snapshot after each generation
//!
//! # Key Types
//!
//! - [`EvolutionEngine`]: executes the generational loop
//! - [`EngineConfig`]: parallelism, caching and seed
//! - [`EvolutionResult`]: final population and statistics
//! - [`EvolutionTask`]: a run on a background thread, abortable from outside
//!
//! # References
//!
//! - Holland (1975), *Adaptation in Natural and Artificial Systems*
//! - Goldberg (1989), *Genetic Algorithms in Search, Optimization, and Machine Learning*
//! - Eiben & Smith (2015), *Introduction to Evolutionary Computing*

mod cache;
mod config;
mod engine;
mod error;
pub mod observer;
mod operators;
mod selection;
mod task;
mod termination;
mod types;

pub use cache::CachingEvaluator;
pub use config::EngineConfig;
pub(crate) use config::clamp_probability;
pub use engine::{EvolutionEngine, EvolutionResult};
pub use error::{ConfigError, EvolutionError, Phase};
pub use observer::{ChannelObserver, EvolutionObserver, GenerationReport};
pub use operators::{Crossover, EvolutionPipeline, EvolutionaryOperator, Mutation};
pub use selection::{RankSelection, RouletteWheelSelection, SelectionStrategy, TournamentSelection};
pub use task::EvolutionTask;
pub use termination::{
    AbortSignal, ElapsedTime, GenerationCount, Stagnation, TargetFitness, TerminationCondition,
};
pub use types::{
    CandidateFactory, EvaluatedCandidate, FitnessEvaluator, Objective, PopulationData,
    PopulationStats,
};
