//! Generational evolutionary computation.
//!
//! Provides a generic evolution engine and a reference genome:
//!
//! - **Evolution engine**: population-based search with concurrent, cached
//!   fitness evaluation, elitism, pluggable selection, composable variation
//!   pipelines and termination conditions (generation count, elapsed time,
//!   target fitness, stagnation, user abort). Runs can execute on a
//!   background thread and be cancelled from outside.
//! - **Polygon images**: a candidate representation for approximating a
//!   picture with translucent polygons, with its factory and mutation
//!   operators.
//!
//! # Architecture
//!
//! The engine knows nothing about the candidates it evolves. Problems plug
//! in through the traits in [`evolution`]; [`polygon`] is one such problem,
//! minus rendering and the pixel-comparison fitness function, which are
//! left to the caller.
//!
//! # Logging
//!
//! Runs emit [`tracing`] events and spans. No subscriber is installed.

pub mod evolution;
pub mod polygon;
