//! `PhysicsWorld` backed by rapier2d
//!
//! Screen coordinates are used directly (y grows downward), so gravity is a
//! positive y acceleration. Each `BodyId` maps to one rigid body carrying a
//! single collider; both store the id in their `user_data`.

use std::collections::{BTreeMap, HashMap};

use crossbeam::channel::{Receiver, Sender, unbounded};
use glam::Vec2;
use rapier2d::na::UnitComplex;
use rapier2d::prelude as rapier;

use super::{BodyDesc, BodyId, CollisionStarted, Motion, PhysicsWorld, ShapeDesc};
use crate::error::GameError;

/// Rough size of a typical body, so rapier's internal tolerances scale to pixels
const LENGTH_UNIT: f32 = 50.0;
/// Smallest polygon area accepted before handing vertices to the hull builder
const MIN_POLYGON_AREA: f32 = 1e-3;

/// Forwards rapier collision events into a channel
struct ChannelEventCollector {
    collision_events: Sender<rapier::CollisionEvent>,
}

impl rapier::EventHandler for ChannelEventCollector {
    fn handle_collision_event(
        &self,
        _bodies: &rapier::RigidBodySet,
        _colliders: &rapier::ColliderSet,
        event: rapier::CollisionEvent,
        _contact_pair: Option<&rapier::ContactPair>,
    ) {
        let _ = self.collision_events.send(event);
    }

    fn handle_contact_force_event(
        &self,
        _dt: f32,
        _bodies: &rapier::RigidBodySet,
        _colliders: &rapier::ColliderSet,
        _contact_pair: &rapier::ContactPair,
        _total_force_magnitude: f32,
    ) {
    }
}

pub struct RapierWorld {
    pipeline: rapier::PhysicsPipeline,
    gravity: rapier::Vector<f32>,
    integration_params: rapier::IntegrationParameters,
    islands: rapier::IslandManager,
    broad_phase: rapier::DefaultBroadPhase,
    narrow_phase: rapier::NarrowPhase,
    impulse_joints: rapier::ImpulseJointSet,
    multibody_joints: rapier::MultibodyJointSet,
    ccd_solver: rapier::CCDSolver,
    bodies: rapier::RigidBodySet,
    colliders: rapier::ColliderSet,
    events: ChannelEventCollector,
    collision_recv: Receiver<rapier::CollisionEvent>,
    handles: HashMap<BodyId, rapier::RigidBodyHandle>,
    /// One-step forces, applied and cleared around the next `step`
    pending_forces: BTreeMap<BodyId, Vec2>,
}

impl RapierWorld {
    /// Create an empty world with downward gravity in px/s²
    pub fn new(gravity: f32) -> Self {
        let (collision_send, collision_recv) = unbounded();
        Self {
            pipeline: rapier::PhysicsPipeline::new(),
            gravity: rapier::Vector::new(0.0, gravity),
            integration_params: rapier::IntegrationParameters {
                length_unit: LENGTH_UNIT,
                ..rapier::IntegrationParameters::default()
            },
            islands: rapier::IslandManager::new(),
            broad_phase: rapier::DefaultBroadPhase::new(),
            narrow_phase: rapier::NarrowPhase::new(),
            impulse_joints: rapier::ImpulseJointSet::new(),
            multibody_joints: rapier::MultibodyJointSet::new(),
            ccd_solver: rapier::CCDSolver::new(),
            bodies: rapier::RigidBodySet::new(),
            colliders: rapier::ColliderSet::new(),
            events: ChannelEventCollector {
                collision_events: collision_send,
            },
            collision_recv,
            handles: HashMap::new(),
            pending_forces: BTreeMap::new(),
        }
    }

    /// Number of bodies currently in the world
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn body(&self, id: BodyId) -> Option<&rapier::RigidBody> {
        self.handles.get(&id).and_then(|h| self.bodies.get(*h))
    }

    fn body_mut(&mut self, id: BodyId) -> Option<&mut rapier::RigidBody> {
        let handle = *self.handles.get(&id)?;
        self.bodies.get_mut(handle)
    }

    fn collider_handles(&self, id: BodyId) -> Vec<rapier::ColliderHandle> {
        self.body(id)
            .map(|b| b.colliders().to_vec())
            .unwrap_or_default()
    }

    fn collider_builder(shape: &ShapeDesc) -> Result<rapier::ColliderBuilder, GameError> {
        match shape {
            ShapeDesc::Polygon(vertices) => {
                let rejected = GameError::ShapeRejected {
                    vertex_count: vertices.len(),
                };
                if vertices.len() < 3
                    || vertices.iter().any(|v| !v.is_finite())
                    || polygon_area(vertices).abs() < MIN_POLYGON_AREA
                {
                    return Err(rejected);
                }
                let points: Vec<rapier::Point<f32>> = vertices
                    .iter()
                    .map(|v| rapier::Point::new(v.x, v.y))
                    .collect();
                rapier::ColliderBuilder::convex_hull(&points).ok_or(rejected)
            }
            ShapeDesc::Circle { radius } => Ok(rapier::ColliderBuilder::ball(*radius)),
            ShapeDesc::Rect { half_extents } => Ok(rapier::ColliderBuilder::cuboid(
                half_extents.x,
                half_extents.y,
            )),
        }
    }
}

/// Signed shoelace area
fn polygon_area(vertices: &[Vec2]) -> f32 {
    let n = vertices.len();
    (0..n)
        .map(|i| vertices[i].perp_dot(vertices[(i + 1) % n]))
        .sum::<f32>()
        * 0.5
}

fn to_vec2(v: &rapier::Vector<f32>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

impl PhysicsWorld for RapierWorld {
    fn insert(&mut self, id: BodyId, desc: &BodyDesc) -> Result<(), GameError> {
        let collider = Self::collider_builder(&desc.shape)?
            .sensor(desc.sensor)
            .density(desc.material.density)
            .friction(desc.material.friction)
            .restitution(desc.material.restitution)
            .active_events(rapier::ActiveEvents::COLLISION_EVENTS)
            .user_data(id.0 as u128)
            .build();

        let builder = match desc.motion {
            Motion::Dynamic => rapier::RigidBodyBuilder::dynamic(),
            Motion::Fixed => rapier::RigidBodyBuilder::fixed(),
        };
        let body = builder
            .translation(rapier::Vector::new(desc.position.x, desc.position.y))
            .rotation(desc.angle)
            .linvel(rapier::Vector::new(desc.velocity.x, desc.velocity.y))
            .gravity_scale(desc.gravity_scale)
            .linear_damping(desc.linear_damping)
            .user_data(id.0 as u128)
            .build();

        if self.handles.contains_key(&id) {
            self.remove(id);
        }
        let handle = self.bodies.insert(body);
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        self.handles.insert(id, handle);
        Ok(())
    }

    fn remove(&mut self, id: BodyId) -> bool {
        self.pending_forces.remove(&id);
        let Some(handle) = self.handles.remove(&id) else {
            return false;
        };
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    fn contains(&self, id: BodyId) -> bool {
        self.handles.contains_key(&id)
    }

    fn position(&self, id: BodyId) -> Option<Vec2> {
        self.body(id).map(|b| to_vec2(b.translation()))
    }

    fn angle(&self, id: BodyId) -> Option<f32> {
        self.body(id).map(|b| b.rotation().angle())
    }

    fn velocity(&self, id: BodyId) -> Option<Vec2> {
        self.body(id).map(|b| to_vec2(b.linvel()))
    }

    fn mass(&self, id: BodyId) -> Option<f32> {
        let body = self.body(id)?;
        // Collider mass is available before the first step recomputes the body's
        Some(
            body.colliders()
                .iter()
                .filter_map(|h| self.colliders.get(*h))
                .map(|c| c.mass())
                .sum(),
        )
    }

    fn density(&self, id: BodyId) -> Option<f32> {
        let handle = *self.body(id)?.colliders().first()?;
        self.colliders.get(handle).map(|c| c.density())
    }

    fn extent(&self, id: BodyId) -> Option<f32> {
        let handle = *self.body(id)?.colliders().first()?;
        let aabb = self.colliders.get(handle)?.compute_aabb();
        let size = aabb.extents();
        Some(size.x.max(size.y))
    }

    fn is_fixed(&self, id: BodyId) -> bool {
        self.body(id).is_some_and(|b| b.is_fixed())
    }

    fn set_position(&mut self, id: BodyId, position: Vec2) {
        if let Some(body) = self.body_mut(id) {
            body.set_translation(rapier::Vector::new(position.x, position.y), true);
        }
    }

    fn set_angle(&mut self, id: BodyId, angle: f32) {
        if let Some(body) = self.body_mut(id) {
            body.set_rotation(UnitComplex::new(angle), true);
        }
    }

    fn set_velocity(&mut self, id: BodyId, velocity: Vec2) {
        if let Some(body) = self.body_mut(id) {
            body.set_linvel(rapier::Vector::new(velocity.x, velocity.y), true);
        }
    }

    fn set_angular_velocity(&mut self, id: BodyId, omega: f32) {
        if let Some(body) = self.body_mut(id) {
            body.set_angvel(omega, true);
        }
    }

    fn set_density(&mut self, id: BodyId, density: f32) {
        for handle in self.collider_handles(id) {
            if let Some(collider) = self.colliders.get_mut(handle) {
                collider.set_density(density);
            }
        }
    }

    fn set_surface(&mut self, id: BodyId, friction: f32, restitution: f32) {
        for handle in self.collider_handles(id) {
            if let Some(collider) = self.colliders.get_mut(handle) {
                collider.set_friction(friction);
                collider.set_restitution(restitution);
            }
        }
    }

    fn set_gravity_scale(&mut self, id: BodyId, scale: f32) {
        if let Some(body) = self.body_mut(id) {
            body.set_gravity_scale(scale, true);
        }
    }

    fn set_fixed(&mut self, id: BodyId, fixed: bool) {
        if let Some(body) = self.body_mut(id) {
            let body_type = if fixed {
                rapier::RigidBodyType::Fixed
            } else {
                rapier::RigidBodyType::Dynamic
            };
            body.set_body_type(body_type, true);
            if fixed {
                body.set_linvel(rapier::Vector::zeros(), false);
                body.set_angvel(0.0, false);
            }
        }
    }

    fn apply_force(&mut self, id: BodyId, force: Vec2) {
        if self.handles.contains_key(&id) {
            *self.pending_forces.entry(id).or_insert(Vec2::ZERO) += force;
        }
    }

    fn bodies_at_point(&self, point: Vec2) -> Vec<BodyId> {
        let point = rapier::Point::new(point.x, point.y);
        let mut hits: Vec<BodyId> = self
            .colliders
            .iter()
            .filter(|(_, c)| c.shape().contains_point(c.position(), &point))
            .map(|(_, c)| BodyId(c.user_data as u64))
            .filter(|id| self.handles.contains_key(id))
            .collect();
        hits.sort();
        hits.dedup();
        hits
    }

    fn step(&mut self, dt: f32) -> Vec<CollisionStarted> {
        self.integration_params.dt = dt;

        let forced: Vec<(BodyId, Vec2)> = std::mem::take(&mut self.pending_forces)
            .into_iter()
            .collect();
        for (id, force) in &forced {
            if let Some(body) = self.body_mut(*id) {
                body.reset_forces(false);
                body.add_force(rapier::Vector::new(force.x, force.y), true);
            }
        }

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &self.events,
        );

        for (id, _) in &forced {
            if let Some(body) = self.body_mut(*id) {
                body.reset_forces(false);
            }
        }

        let mut started = Vec::new();
        while let Ok(event) = self.collision_recv.try_recv() {
            let rapier::CollisionEvent::Started(h1, h2, _) = event else {
                continue;
            };
            let c1 = self.colliders.get(h1).map(|c| BodyId(c.user_data as u64));
            let c2 = self.colliders.get(h2).map(|c| BodyId(c.user_data as u64));
            if let (Some(a), Some(b)) = (c1, c2) {
                started.push(CollisionStarted { a, b });
            }
        }
        started
    }
}
