//! Polygon image genome.
//!
//! A ready-made candidate representation for approximating a picture with
//! a bounded set of translucent polygons. Rendering and the pixel-comparison
//! fitness function belong to the caller; this module supplies the genome,
//! its [`CandidateFactory`](crate::evolution::CandidateFactory) and the
//! variation operators.
//!
//! # Key Types
//!
//! - [`PolygonImage`]: ordered list of [`ColouredPolygon`]s, painted back to front
//! - [`PolygonImageFactory`]: random two-triangle starting images
//! - [`MutationProbabilities`]: per-operator rates for [`polygon_pipeline`]
//!
//! # Example
//!
//! ```ignore
//! let canvas = Canvas::new(200, 300);
//! let mut engine = EvolutionEngine::new(
//!     PolygonImageFactory::new(canvas),
//!     polygon_pipeline(canvas, &MutationProbabilities::default()),
//!     PixelDifference::new(target),
//!     TournamentSelection::new(0.8),
//! );
//! let best = engine.evolve(15, 3, &mut [Box::new(Stagnation::new(1000))])?;
//! ```

mod config;
mod factory;
pub mod operators;
mod types;

pub use config::{polygon_pipeline, MutationProbabilities, CROSSOVER_POINTS};
pub use factory::{PolygonImageFactory, INITIAL_POLYGONS};
pub use types::{
    Canvas, ColouredPolygon, Point, PolygonImage, Rgba, MAX_POLYGONS, MAX_VERTICES, MIN_VERTICES,
};
