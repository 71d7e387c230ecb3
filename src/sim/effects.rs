//! Per-body continuous effects
//!
//! A body that lands in the water gets a buoyancy entry here. `sweep` runs once
//! per step before the physics update and drops entries whose body left the
//! `InWater` state or vanished from the world.

use std::collections::BTreeMap;

use glam::Vec2;

use super::body::BodyState;
use super::state::GameSession;
use crate::physics::{BodyId, PhysicsWorld};

/// Rocking amplitude (rad/s)
const ROCK_AMPLITUDE: f32 = 0.06;
/// Rocking angular frequency (rad per second of sim time)
const ROCK_FREQUENCY: f32 = 2.0;

/// Buoyancy parameters of one body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Buoyancy {
    /// Phase offset of the rocking term
    pub phase: f32,
}

/// Registry of active per-body effects
#[derive(Debug, Clone, Default)]
pub struct ActiveEffects {
    buoyancy: BTreeMap<BodyId, Buoyancy>,
}

impl ActiveEffects {
    pub fn install_buoyancy(&mut self, id: BodyId) {
        self.buoyancy.insert(
            id,
            Buoyancy {
                phase: id.0 as f32,
            },
        );
    }

    pub fn remove(&mut self, id: BodyId) -> bool {
        self.buoyancy.remove(&id).is_some()
    }

    pub fn has_buoyancy(&self, id: BodyId) -> bool {
        self.buoyancy.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.buoyancy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buoyancy.is_empty()
    }

    pub fn clear(&mut self) {
        self.buoyancy.clear();
    }
}

/// Apply every active effect for this step
pub(crate) fn sweep<W: PhysicsWorld>(session: &mut GameSession<W>) {
    let entries: Vec<(BodyId, Buoyancy)> = session
        .effects
        .buoyancy
        .iter()
        .map(|(id, b)| (*id, *b))
        .collect();
    let time = session.sim_time();
    let geo = session.geometry;
    let target_y = geo.water_level + session.config.buoyancy_target_depth;

    for (id, buoyancy) in entries {
        let in_water = session.registry.state(id) == Some(BodyState::InWater);
        let Some(pos) = session.world.position(id).filter(|_| in_water) else {
            session.effects.remove(id);
            continue;
        };

        // Sunk below the viewport: put it back on the surface
        if pos.y > geo.height + session.config.off_bounds_tolerance {
            let vx = session.world.velocity(id).map_or(0.0, |v| v.x);
            session.world.set_position(id, Vec2::new(pos.x, target_y));
            session
                .world
                .set_velocity(id, Vec2::new(vx, -session.config.water_entry_kick * 2.0));
        }

        let pos = session.world.position(id).unwrap_or(pos);
        let mass = session.world.mass(id).unwrap_or(0.0);
        let accel = -(pos.y - target_y) * session.config.buoyancy_gain;
        session.world.apply_force(id, Vec2::new(0.0, accel * mass));

        if let Some(v) = session.world.velocity(id) {
            session.world.set_velocity(
                id,
                Vec2::new(
                    v.x * session.config.water_horizontal_damping,
                    v.y * session.config.water_vertical_damping,
                ),
            );
        }

        let rock = (time * ROCK_FREQUENCY + buoyancy.phase).sin() * ROCK_AMPLITUDE;
        session.world.set_angular_velocity(id, rock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_install_remove() {
        let mut effects = ActiveEffects::default();
        effects.install_buoyancy(BodyId(4));
        effects.install_buoyancy(BodyId(4));
        assert_eq!(effects.len(), 1);
        assert!(effects.has_buoyancy(BodyId(4)));
        assert!(effects.remove(BodyId(4)));
        assert!(!effects.remove(BodyId(4)));
        assert!(effects.is_empty());
    }
}
