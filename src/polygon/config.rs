//! Mutation probabilities and the standard polygon pipeline.

use super::factory::PolygonImageFactory;
use super::operators::{
    list_crossover, AddPolygonMutation, AddVertexMutation, AdjustVertexMutation,
    MovePolygonMutation, PolygonColourMutation, RemovePolygonMutation, RemoveVertexMutation,
    COLOUR_STD_DEV, VERTEX_STD_DEV,
};
use super::types::{Canvas, PolygonImage};
use crate::evolution::{clamp_probability, EvolutionPipeline};

/// Number of cut points used by the polygon list crossover.
pub const CROSSOVER_POINTS: usize = 2;

/// Per-operator probabilities for [`polygon_pipeline`].
///
/// Image-level probabilities apply once per image; polygon-level ones
/// (colour, vertices) once per polygon.
///
/// # Builder Pattern
///
/// ```
/// use u_evolve::polygon::MutationProbabilities;
///
/// let probabilities = MutationProbabilities::default()
///     .with_add_polygon(0.05)
///     .with_crossover(0.9);
/// assert_eq!(probabilities.add_polygon, 0.05);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MutationProbabilities {
    /// Insert a new random triangle.
    pub add_polygon: f64,
    /// Delete a polygon.
    pub remove_polygon: f64,
    /// Move a polygon to a different depth.
    pub reorder_polygon: f64,
    /// Shift a polygon's colour.
    pub change_colour: f64,
    /// Insert a vertex into a polygon.
    pub add_vertex: f64,
    /// Delete a vertex from a polygon.
    pub remove_vertex: f64,
    /// Nudge one vertex of a polygon.
    pub move_vertex: f64,
    /// Recombine a pair of images.
    pub crossover: f64,
}

impl Default for MutationProbabilities {
    fn default() -> Self {
        Self {
            add_polygon: 0.02,
            remove_polygon: 0.02,
            reorder_polygon: 0.01,
            change_colour: 0.01,
            add_vertex: 0.01,
            remove_vertex: 0.01,
            move_vertex: 0.01,
            crossover: 0.5,
        }
    }
}

impl MutationProbabilities {
    pub fn with_add_polygon(mut self, p: f64) -> Self {
        self.add_polygon = clamp_probability(p);
        self
    }

    pub fn with_remove_polygon(mut self, p: f64) -> Self {
        self.remove_polygon = clamp_probability(p);
        self
    }

    pub fn with_reorder_polygon(mut self, p: f64) -> Self {
        self.reorder_polygon = clamp_probability(p);
        self
    }

    pub fn with_change_colour(mut self, p: f64) -> Self {
        self.change_colour = clamp_probability(p);
        self
    }

    pub fn with_add_vertex(mut self, p: f64) -> Self {
        self.add_vertex = clamp_probability(p);
        self
    }

    pub fn with_remove_vertex(mut self, p: f64) -> Self {
        self.remove_vertex = clamp_probability(p);
        self
    }

    pub fn with_move_vertex(mut self, p: f64) -> Self {
        self.move_vertex = clamp_probability(p);
        self
    }

    pub fn with_crossover(mut self, p: f64) -> Self {
        self.crossover = clamp_probability(p);
        self
    }
}

/// Builds the standard variation pipeline for polygon images.
///
/// Operators run in this order: list crossover, remove polygon, reorder
/// polygon, remove vertex, move vertex, add vertex, change colour, add
/// polygon.
pub fn polygon_pipeline(
    canvas: Canvas,
    probabilities: &MutationProbabilities,
) -> EvolutionPipeline<PolygonImage> {
    let factory = PolygonImageFactory::new(canvas);
    EvolutionPipeline::new()
        .then(list_crossover(probabilities.crossover, CROSSOVER_POINTS))
        .then(RemovePolygonMutation::new(probabilities.remove_polygon))
        .then(MovePolygonMutation::new(probabilities.reorder_polygon))
        .then(RemoveVertexMutation::new(probabilities.remove_vertex))
        .then(AdjustVertexMutation::new(
            canvas,
            probabilities.move_vertex,
            VERTEX_STD_DEV,
        ))
        .then(AddVertexMutation::new(canvas, probabilities.add_vertex))
        .then(PolygonColourMutation::new(
            probabilities.change_colour,
            COLOUR_STD_DEV,
        ))
        .then(AddPolygonMutation::new(probabilities.add_polygon, factory))
}
