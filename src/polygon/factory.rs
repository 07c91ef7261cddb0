//! Random initial images.

use super::types::{Canvas, ColouredPolygon, PolygonImage};
use crate::evolution::CandidateFactory;
use rand::RngCore;

/// Number of triangles in a freshly generated image.
pub const INITIAL_POLYGONS: usize = 2;

/// Creates images of [`INITIAL_POLYGONS`] random triangles.
///
/// Starting small keeps early generations cheap to evaluate; polygons and
/// vertices are added by mutation as the run progresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolygonImageFactory {
    canvas: Canvas,
}

impl PolygonImageFactory {
    pub fn new(canvas: Canvas) -> Self {
        Self { canvas }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// A single random triangle, as inserted by polygon-adding mutation.
    pub fn random_polygon(&self, rng: &mut dyn RngCore) -> ColouredPolygon {
        ColouredPolygon::random_triangle(self.canvas, rng)
    }
}

impl CandidateFactory<PolygonImage> for PolygonImageFactory {
    fn generate_random_candidate(&self, rng: &mut dyn RngCore) -> anyhow::Result<PolygonImage> {
        Ok((0..INITIAL_POLYGONS)
            .map(|_| self.random_polygon(rng))
            .collect())
    }
}
