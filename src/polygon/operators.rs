//! Variation operators for polygon images.
//!
//! Image-level operators act on the polygon list (add, remove, reorder);
//! polygon-level operators visit every polygon of every image and change it
//! with their own probability (colour, vertices). All of them keep images
//! within the [`MAX_POLYGONS`] and [`MIN_VERTICES`]..=[`MAX_VERTICES`]
//! limits and every vertex inside the canvas.

use super::factory::PolygonImageFactory;
use super::types::{
    Canvas, ColouredPolygon, PolygonImage, Rgba, MAX_POLYGONS, MAX_VERTICES, MIN_VERTICES,
};
use crate::evolution::{clamp_probability, Crossover, EvolutionaryOperator};
use rand::{Rng, RngCore};
use rand_distr::StandardNormal;

/// Standard deviation, per channel, of colour mutation.
pub const COLOUR_STD_DEV: f64 = 20.0;

/// Standard deviation, in pixels per axis, of vertex movement.
pub const VERTEX_STD_DEV: f64 = 3.0;

fn clamp_std_dev(std_dev: f64) -> f64 {
    if std_dev.is_finite() {
        std_dev.abs()
    } else {
        0.0
    }
}

/// A normally distributed offset with mean 0, rounded to whole units.
fn gaussian_offset(rng: &mut dyn RngCore, std_dev: f64) -> i32 {
    let z: f64 = rng.sample(StandardNormal);
    (z * std_dev).round() as i32
}

fn for_each_polygon<F>(
    images: &mut [PolygonImage],
    rng: &mut dyn RngCore,
    probability: f64,
    mut f: F,
) where
    F: FnMut(&mut ColouredPolygon, &mut dyn RngCore),
{
    for polygon in images.iter_mut().flatten() {
        if rng.random_bool(probability) {
            f(polygon, &mut *rng);
        }
    }
}

// ---- Image-level operators ----

/// Inserts a random triangle at a random depth.
///
/// Images already holding `max_polygons` are left unchanged.
#[derive(Debug, Clone)]
pub struct AddPolygonMutation {
    probability: f64,
    max_polygons: usize,
    factory: PolygonImageFactory,
}

impl AddPolygonMutation {
    pub fn new(probability: f64, factory: PolygonImageFactory) -> Self {
        Self {
            probability: clamp_probability(probability),
            max_polygons: MAX_POLYGONS,
            factory,
        }
    }

    /// Overrides the polygon limit (at least 1).
    pub fn with_max_polygons(mut self, max: usize) -> Self {
        self.max_polygons = max.max(1);
        self
    }
}

impl EvolutionaryOperator<PolygonImage> for AddPolygonMutation {
    fn apply(
        &self,
        mut images: Vec<PolygonImage>,
        rng: &mut dyn RngCore,
    ) -> anyhow::Result<Vec<PolygonImage>> {
        for image in &mut images {
            if rng.random_bool(self.probability) && image.len() < self.max_polygons {
                let at = rng.random_range(0..=image.len());
                image.insert(at, self.factory.random_polygon(rng));
            }
        }
        Ok(images)
    }
}

/// Deletes a random polygon. The last polygon of an image is never removed.
#[derive(Debug, Clone, Copy)]
pub struct RemovePolygonMutation {
    probability: f64,
}

impl RemovePolygonMutation {
    pub fn new(probability: f64) -> Self {
        Self {
            probability: clamp_probability(probability),
        }
    }
}

impl EvolutionaryOperator<PolygonImage> for RemovePolygonMutation {
    fn apply(
        &self,
        mut images: Vec<PolygonImage>,
        rng: &mut dyn RngCore,
    ) -> anyhow::Result<Vec<PolygonImage>> {
        for image in &mut images {
            if rng.random_bool(self.probability) && image.len() > 1 {
                let at = rng.random_range(0..image.len());
                image.remove(at);
            }
        }
        Ok(images)
    }
}

/// Moves a random polygon to a random depth, changing the paint order.
#[derive(Debug, Clone, Copy)]
pub struct MovePolygonMutation {
    probability: f64,
}

impl MovePolygonMutation {
    pub fn new(probability: f64) -> Self {
        Self {
            probability: clamp_probability(probability),
        }
    }
}

impl EvolutionaryOperator<PolygonImage> for MovePolygonMutation {
    fn apply(
        &self,
        mut images: Vec<PolygonImage>,
        rng: &mut dyn RngCore,
    ) -> anyhow::Result<Vec<PolygonImage>> {
        for image in &mut images {
            if rng.random_bool(self.probability) && image.len() > 1 {
                let from = rng.random_range(0..image.len());
                let polygon = image.remove(from);
                let to = rng.random_range(0..=image.len());
                image.insert(to, polygon);
            }
        }
        Ok(images)
    }
}

// ---- Polygon-level operators ----

/// Shifts every colour channel, opacity included, by a Gaussian offset.
#[derive(Debug, Clone, Copy)]
pub struct PolygonColourMutation {
    probability: f64,
    std_dev: f64,
}

impl PolygonColourMutation {
    pub fn new(probability: f64, std_dev: f64) -> Self {
        Self {
            probability: clamp_probability(probability),
            std_dev: clamp_std_dev(std_dev),
        }
    }
}

impl EvolutionaryOperator<PolygonImage> for PolygonColourMutation {
    fn apply(
        &self,
        mut images: Vec<PolygonImage>,
        rng: &mut dyn RngCore,
    ) -> anyhow::Result<Vec<PolygonImage>> {
        for_each_polygon(&mut images, rng, self.probability, |polygon, rng| {
            let channels = polygon.colour.channels().map(|c| {
                (i32::from(c) + gaussian_offset(rng, self.std_dev)).clamp(0, 255) as u8
            });
            polygon.colour = Rgba::from_channels(channels);
        });
        Ok(images)
    }
}

/// Inserts a random vertex at a random position of the outline.
#[derive(Debug, Clone, Copy)]
pub struct AddVertexMutation {
    canvas: Canvas,
    probability: f64,
}

impl AddVertexMutation {
    pub fn new(canvas: Canvas, probability: f64) -> Self {
        Self {
            canvas,
            probability: clamp_probability(probability),
        }
    }
}

impl EvolutionaryOperator<PolygonImage> for AddVertexMutation {
    fn apply(
        &self,
        mut images: Vec<PolygonImage>,
        rng: &mut dyn RngCore,
    ) -> anyhow::Result<Vec<PolygonImage>> {
        for_each_polygon(&mut images, rng, self.probability, |polygon, rng| {
            if polygon.vertices.len() < MAX_VERTICES {
                let at = rng.random_range(0..=polygon.vertices.len());
                let point = self.canvas.random_point(rng);
                polygon.vertices.insert(at, point);
            }
        });
        Ok(images)
    }
}

/// Deletes a random vertex from polygons above the minimum.
#[derive(Debug, Clone, Copy)]
pub struct RemoveVertexMutation {
    probability: f64,
}

impl RemoveVertexMutation {
    pub fn new(probability: f64) -> Self {
        Self {
            probability: clamp_probability(probability),
        }
    }
}

impl EvolutionaryOperator<PolygonImage> for RemoveVertexMutation {
    fn apply(
        &self,
        mut images: Vec<PolygonImage>,
        rng: &mut dyn RngCore,
    ) -> anyhow::Result<Vec<PolygonImage>> {
        for_each_polygon(&mut images, rng, self.probability, |polygon, rng| {
            if polygon.vertices.len() > MIN_VERTICES {
                let at = rng.random_range(0..polygon.vertices.len());
                polygon.vertices.remove(at);
            }
        });
        Ok(images)
    }
}

/// Moves one random vertex by a Gaussian offset, clamped to the canvas.
#[derive(Debug, Clone, Copy)]
pub struct AdjustVertexMutation {
    canvas: Canvas,
    probability: f64,
    std_dev: f64,
}

impl AdjustVertexMutation {
    pub fn new(canvas: Canvas, probability: f64, std_dev: f64) -> Self {
        Self {
            canvas,
            probability: clamp_probability(probability),
            std_dev: clamp_std_dev(std_dev),
        }
    }
}

impl EvolutionaryOperator<PolygonImage> for AdjustVertexMutation {
    fn apply(
        &self,
        mut images: Vec<PolygonImage>,
        rng: &mut dyn RngCore,
    ) -> anyhow::Result<Vec<PolygonImage>> {
        for_each_polygon(&mut images, rng, self.probability, |polygon, rng| {
            if polygon.vertices.is_empty() {
                return;
            }
            let at = rng.random_range(0..polygon.vertices.len());
            let mut point = polygon.vertices[at];
            point.x = point.x.saturating_add(gaussian_offset(rng, self.std_dev));
            point.y = point.y.saturating_add(gaussian_offset(rng, self.std_dev));
            polygon.vertices[at] = self.canvas.clamp(point);
        });
        Ok(images)
    }
}

// ---- Recombination ----

/// Multi-point crossover over polygon lists of possibly different lengths.
///
/// For each of `points` cut points drawn in `1..min_len`, the two children
/// exchange the polygons before the cut. Children keep their parents'
/// lengths. Pairs whose shorter image has fewer than two polygons pass
/// through unchanged.
pub fn list_crossover(probability: f64, points: usize) -> Crossover<PolygonImage> {
    Crossover::new(
        probability,
        move |a: &PolygonImage, b: &PolygonImage, rng: &mut dyn RngCore| {
            let mut x = a.clone();
            let mut y = b.clone();
            let shorter = x.len().min(y.len());
            if shorter < 2 {
                return Ok((x, y));
            }
            for _ in 0..points {
                let cut = rng.random_range(1..shorter);
                x[..cut].swap_with_slice(&mut y[..cut]);
            }
            Ok((x, y))
        },
    )
}
