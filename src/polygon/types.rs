//! Polygon image genome.
//!
//! A [`PolygonImage`] is an ordered list of translucent [`ColouredPolygon`]s
//! painted back to front onto a [`Canvas`]. Every type here is a plain
//! value with structural equality and hashing, so images can be used as
//! fitness cache keys.

use rand::{Rng, RngCore};

/// Fewest vertices a polygon may have.
pub const MIN_VERTICES: usize = 3;

/// Most vertices a polygon may have.
pub const MAX_VERTICES: usize = 10;

/// Most polygons an image may hold.
pub const MAX_POLYGONS: usize = 50;

/// A vertex position in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An 8-bit RGBA colour; `a` is opacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// A uniformly random colour, opacity included.
    pub fn random(rng: &mut dyn RngCore) -> Self {
        Self {
            r: rng.random(),
            g: rng.random(),
            b: rng.random(),
            a: rng.random(),
        }
    }

    pub fn channels(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_channels([r, g, b, a]: [u8; 4]) -> Self {
        Self { r, g, b, a }
    }
}

/// A filled polygon with a single colour.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColouredPolygon {
    pub colour: Rgba,
    pub vertices: Vec<Point>,
}

impl ColouredPolygon {
    pub fn new(colour: Rgba, vertices: Vec<Point>) -> Self {
        Self { colour, vertices }
    }

    /// A random triangle inside `canvas` with a random colour.
    pub fn random_triangle(canvas: Canvas, rng: &mut dyn RngCore) -> Self {
        let vertices = (0..MIN_VERTICES).map(|_| canvas.random_point(rng)).collect();
        Self {
            colour: Rgba::random(rng),
            vertices,
        }
    }
}

/// An image made of polygons, painted in list order.
pub type PolygonImage = Vec<ColouredPolygon>;

/// The drawing area every vertex is confined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    /// Creates a canvas; zero dimensions are raised to 1.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// A uniformly random point inside the canvas.
    pub fn random_point(&self, rng: &mut dyn RngCore) -> Point {
        Point {
            x: rng.random_range(0..self.width.max(1)) as i32,
            y: rng.random_range(0..self.height.max(1)) as i32,
        }
    }

    /// Moves `point` to the nearest position inside the canvas.
    pub fn clamp(&self, point: Point) -> Point {
        let max_x = self.width.saturating_sub(1).min(i32::MAX as u32) as i32;
        let max_y = self.height.saturating_sub(1).min(i32::MAX as u32) as i32;
        Point {
            x: point.x.clamp(0, max_x),
            y: point.y.clamp(0, max_y),
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        self.clamp(point) == point
    }
}
