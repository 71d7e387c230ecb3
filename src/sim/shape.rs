//! Polygon generation for stones and boulders
//!
//! Outlines are centred on the origin in body-local coordinates. Jitter moves
//! every vertex independently by up to `amount / 2` per axis; the archetype
//! proportions keep non-adjacent edges far enough apart that outlines stay
//! simple for `amount <= 0.3 * size`.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Stone outline family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeArchetype {
    Rectangle,
    LShape,
    Triangle,
    Hexagon,
    Trapezoid,
}

impl ShapeArchetype {
    pub const ALL: [ShapeArchetype; 5] = [
        ShapeArchetype::Rectangle,
        ShapeArchetype::LShape,
        ShapeArchetype::Triangle,
        ShapeArchetype::Hexagon,
        ShapeArchetype::Trapezoid,
    ];

    /// Vertex count before jitter
    pub fn vertex_count(&self) -> usize {
        match self {
            ShapeArchetype::Rectangle => 4,
            ShapeArchetype::LShape => 6,
            ShapeArchetype::Triangle => 3,
            ShapeArchetype::Hexagon => 6,
            ShapeArchetype::Trapezoid => 4,
        }
    }

    pub fn random(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

/// Radial outline family used by boulders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutlineStyle {
    /// Lumpy, many vertices
    Irregular,
    /// Few vertices with wide radius swings
    Angular,
    /// Mirror-symmetric, nearly round
    Symmetrical,
}

impl OutlineStyle {
    /// Inclusive vertex count range
    fn vertex_range(&self) -> (usize, usize) {
        match self {
            OutlineStyle::Irregular => (8, 12),
            OutlineStyle::Angular => (6, 9),
            OutlineStyle::Symmetrical => (10, 12),
        }
    }

    /// Radius multiplier range
    fn radius_range(&self) -> (f32, f32) {
        match self {
            OutlineStyle::Irregular => (0.8, 1.2),
            OutlineStyle::Angular => (0.7, 1.3),
            OutlineStyle::Symmetrical => (0.9, 1.1),
        }
    }
}

/// Outline for a stone of the given archetype, size and jitter amount
pub fn generate_shape(
    archetype: ShapeArchetype,
    size: f32,
    irregularity: f32,
    rng: &mut impl Rng,
) -> Vec<Vec2> {
    let mut vertices = base_shape(archetype, size, rng);
    jitter(&mut vertices, irregularity, rng);
    vertices
}

/// Radial boulder outline of roughly `size` diameter
pub fn generate_outline(style: OutlineStyle, size: f32, rng: &mut impl Rng) -> Vec<Vec2> {
    let (min_n, max_n) = style.vertex_range();
    let (min_r, max_r) = style.radius_range();
    let n = rng.random_range(min_n..=max_n);
    let radius = size / 2.0;

    let mut radii: Vec<f32> = (0..n).map(|_| radius * rng.random_range(min_r..=max_r)).collect();
    if style == OutlineStyle::Symmetrical {
        // Mirror across the x axis
        for i in 1..n / 2 {
            radii[n - i] = radii[i];
        }
    }

    (0..n)
        .map(|i| {
            let mut angle = TAU * i as f32 / n as f32;
            if style == OutlineStyle::Irregular {
                angle += rng.random_range(-0.1..0.1) * TAU / n as f32;
            }
            Vec2::new(angle.cos(), angle.sin()) * radii[i]
        })
        .collect()
}

/// Move each vertex by up to `amount / 2` on each axis
pub fn jitter(vertices: &mut [Vec2], amount: f32, rng: &mut impl Rng) {
    if amount <= 0.0 {
        return;
    }
    for v in vertices.iter_mut() {
        v.x += (rng.random::<f32>() - 0.5) * amount;
        v.y += (rng.random::<f32>() - 0.5) * amount;
    }
}

fn base_shape(archetype: ShapeArchetype, size: f32, rng: &mut impl Rng) -> Vec<Vec2> {
    let s = size * 0.8;
    let h = s / 2.0;
    match archetype {
        ShapeArchetype::Rectangle => {
            let w = s * rng.random_range(0.8..=1.2) / 2.0;
            let hh = s * rng.random_range(0.8..=1.2) / 2.0;
            vec![
                Vec2::new(-w, -hh),
                Vec2::new(w, -hh),
                Vec2::new(w, hh),
                Vec2::new(-w, hh),
            ]
        }
        ShapeArchetype::LShape => vec![
            Vec2::new(-h, -h),
            Vec2::new(h, -h),
            Vec2::new(h, 0.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, h),
            Vec2::new(-h, h),
        ],
        ShapeArchetype::Triangle => vec![Vec2::new(0.0, -h), Vec2::new(h, h), Vec2::new(-h, h)],
        ShapeArchetype::Hexagon => {
            let r = s * 0.75;
            (0..6)
                .map(|i| {
                    let angle = TAU * i as f32 / 6.0;
                    Vec2::new(angle.cos(), angle.sin()) * r
                })
                .collect()
        }
        ShapeArchetype::Trapezoid => {
            let top = s * rng.random_range(0.25..=0.4);
            vec![
                Vec2::new(-top, -h),
                Vec2::new(top, -h),
                Vec2::new(h, h),
                Vec2::new(-h, h),
            ]
        }
    }
}
