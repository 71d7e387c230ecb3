//! Physics world port
//!
//! The game owns gameplay tags; the physics backend owns kinematics. The two
//! meet only through `BodyId`, which the game allocates and the backend maps
//! to its own handles. Mutators on unknown ids are silent no-ops.

pub mod rapier;

pub use rapier::RapierWorld;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Identifier shared by the game and the physics backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u64);

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Collider geometry in body-local coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeDesc {
    /// Convex hull of the given points
    Polygon(Vec<Vec2>),
    Circle { radius: f32 },
    Rect { half_extents: Vec2 },
}

/// How the backend integrates a body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Dynamic,
    Fixed,
}

/// Surface and mass parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            density: 1.0,
            friction: 0.1,
            restitution: 0.3,
        }
    }
}

/// Everything needed to insert a body
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDesc {
    pub shape: ShapeDesc,
    pub position: Vec2,
    pub angle: f32,
    pub velocity: Vec2,
    pub motion: Motion,
    /// Sensors report contacts but never push anything
    pub sensor: bool,
    pub material: Material,
    /// Multiplier on world gravity (0 = floats)
    pub gravity_scale: f32,
    pub linear_damping: f32,
}

impl BodyDesc {
    pub fn dynamic(shape: ShapeDesc, position: Vec2) -> Self {
        Self {
            shape,
            position,
            angle: 0.0,
            velocity: Vec2::ZERO,
            motion: Motion::Dynamic,
            sensor: false,
            material: Material::default(),
            gravity_scale: 1.0,
            linear_damping: 0.0,
        }
    }

    pub fn fixed(shape: ShapeDesc, position: Vec2) -> Self {
        Self {
            motion: Motion::Fixed,
            ..Self::dynamic(shape, position)
        }
    }
}

/// Two bodies started touching during the last step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionStarted {
    pub a: BodyId,
    pub b: BodyId,
}

impl CollisionStarted {
    /// The other body if `id` takes part in this contact
    pub fn other(&self, id: BodyId) -> Option<BodyId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Rigid-body world consumed by the game session
pub trait PhysicsWorld {
    /// Insert a body; polygons the backend cannot build are rejected
    fn insert(&mut self, id: BodyId, desc: &BodyDesc) -> Result<(), GameError>;
    /// Remove a body, returning whether it existed
    fn remove(&mut self, id: BodyId) -> bool;
    fn contains(&self, id: BodyId) -> bool;

    fn position(&self, id: BodyId) -> Option<Vec2>;
    fn angle(&self, id: BodyId) -> Option<f32>;
    fn velocity(&self, id: BodyId) -> Option<Vec2>;
    fn mass(&self, id: BodyId) -> Option<f32>;
    fn density(&self, id: BodyId) -> Option<f32>;
    /// Largest side of the body's bounding box
    fn extent(&self, id: BodyId) -> Option<f32>;
    fn is_fixed(&self, id: BodyId) -> bool;

    fn set_position(&mut self, id: BodyId, position: Vec2);
    fn set_angle(&mut self, id: BodyId, angle: f32);
    fn set_velocity(&mut self, id: BodyId, velocity: Vec2);
    fn set_angular_velocity(&mut self, id: BodyId, omega: f32);
    fn set_density(&mut self, id: BodyId, density: f32);
    fn set_surface(&mut self, id: BodyId, friction: f32, restitution: f32);
    fn set_gravity_scale(&mut self, id: BodyId, scale: f32);
    /// Turn a body immovable (or back to dynamic)
    fn set_fixed(&mut self, id: BodyId, fixed: bool);
    /// Apply a force for the next step only
    fn apply_force(&mut self, id: BodyId, force: Vec2);

    /// Bodies whose shape contains `point`
    fn bodies_at_point(&self, point: Vec2) -> Vec<BodyId>;

    /// Advance by `dt` seconds and report contacts that started
    fn step(&mut self, dt: f32) -> Vec<CollisionStarted>;
}
