//! Stone and boulder construction
//!
//! Every body is inserted into the physics world and tagged in the registry
//! in one place. A polygon the backend refuses is replaced by a circle of the
//! same nominal radius.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::body::{
    BodyKind, BodyState, BodyTag, BoulderKind, BoulderRecord, Category, STONE_COLORS, SpecialKind,
};
use super::shape::{ShapeArchetype, generate_outline, generate_shape, jitter};
use super::state::GameSession;
use crate::error::{GameError, GameResult};
use crate::physics::{BodyDesc, BodyId, Material, PhysicsWorld, ShapeDesc};

/// Linear damping standing in for air drag (1/s)
pub const AIR_DAMPING: f32 = 0.06;
/// Surface of broken-off fragments
pub const FRAGMENT_RESTITUTION: f32 = 0.2;
pub const FRAGMENT_FRICTION: f32 = 0.3;
/// Boulder outline jitter relative to size
const BOULDER_IRREGULARITY: f32 = 0.1;
/// Top band reserved for the HUD
const HUD_HEIGHT: f32 = 60.0;
/// Viewport area the base wave is tuned for
const REFERENCE_AREA: f32 = 800.0 * 600.0;

/// Inputs to `create_stone`
#[derive(Debug, Clone, PartialEq)]
pub struct StoneOptions {
    pub category: Category,
    pub special: Option<SpecialKind>,
    pub position: Option<Vec2>,
    pub velocity: Option<Vec2>,
    pub archetype: Option<ShapeArchetype>,
    /// Broken-off piece: falls under gravity
    pub fragment: bool,
}

impl StoneOptions {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            special: None,
            position: None,
            velocity: None,
            archetype: None,
            fragment: false,
        }
    }

    pub fn at(mut self, position: Vec2) -> Self {
        self.position = Some(position);
        self
    }

    pub fn moving(mut self, velocity: Vec2) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn special(mut self, kind: SpecialKind) -> Self {
        self.special = Some(kind);
        self
    }

    pub fn archetype(mut self, archetype: ShapeArchetype) -> Self {
        self.archetype = Some(archetype);
        self
    }

    pub fn fragment(mut self) -> Self {
        self.fragment = true;
        self
    }
}

/// Inputs to `create_boulder`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoulderOptions {
    pub kind: Option<BoulderKind>,
    pub size: Option<f32>,
    pub position: Option<Vec2>,
    pub max_hit_points: Option<u32>,
}

/// Insert `desc`, retrying as a circle of `radius` if the polygon is refused.
/// Returns whether the fallback was used.
pub(crate) fn insert_with_fallback<W: PhysicsWorld>(
    world: &mut W,
    id: BodyId,
    mut desc: BodyDesc,
    radius: f32,
) -> GameResult<bool> {
    match world.insert(id, &desc) {
        Ok(()) => Ok(false),
        Err(GameError::ShapeRejected { vertex_count }) => {
            log::warn!(
                "Body {} polygon rejected ({} vertices), using circle r={:.1}",
                id,
                vertex_count,
                radius
            );
            desc.shape = ShapeDesc::Circle { radius };
            world.insert(id, &desc)?;
            Ok(true)
        }
        Err(e) => Err(e),
    }
}

fn random_air_position<W: PhysicsWorld>(session: &mut GameSession<W>, size: f32) -> Vec2 {
    let geo = session.geometry;
    let x = session
        .rng
        .random_range(geo.width * 0.15..=geo.width * 0.85);
    let top = HUD_HEIGHT + size / 2.0;
    let bottom = (geo.water_level * 0.5).max(top + 1.0);
    let y = session.rng.random_range(top..=bottom);
    Vec2::new(x, y)
}

/// Build, insert and tag a stone
pub fn create_stone<W: PhysicsWorld>(
    session: &mut GameSession<W>,
    options: StoneOptions,
) -> Option<BodyId> {
    let category = options.category;
    let (min, max) = category.size_range();
    let size = session.rng.random_range(min..=max);
    let archetype = options
        .archetype
        .unwrap_or_else(|| ShapeArchetype::random(&mut session.rng));
    let outline = generate_shape(
        archetype,
        size,
        size * category.irregularity_factor(),
        &mut session.rng,
    );
    let mut color = STONE_COLORS[session.rng.random_range(0..STONE_COLORS.len())];

    let mut material = category.material();
    if let Some(special) = options.special {
        let traits = special.traits();
        material.density *= traits.density_factor;
        material.restitution = traits.restitution;
        color = traits.tint;
    }
    if options.fragment {
        material.restitution = FRAGMENT_RESTITUTION;
        material.friction = FRAGMENT_FRICTION;
    }

    let position = match options.position {
        Some(p) => p,
        None => random_air_position(session, size),
    };
    let velocity = match options.velocity {
        Some(v) => v,
        None if options.fragment => Vec2::ZERO,
        None => Vec2::new(
            session.rng.random_range(-10.0..=10.0),
            session.rng.random_range(-10.0..=10.0),
        ),
    };
    let angle = session.rng.random_range(0.0..TAU);

    let desc = BodyDesc {
        angle,
        velocity,
        material,
        gravity_scale: if options.fragment { 1.0 } else { 0.0 },
        linear_damping: AIR_DAMPING,
        ..BodyDesc::dynamic(ShapeDesc::Polygon(outline.clone()), position)
    };

    let id = session.next_entity_id();
    let fell_back = match insert_with_fallback(&mut session.world, id, desc, size / 2.0) {
        Ok(fell_back) => fell_back,
        Err(e) => {
            log::error!("Failed to create stone: {}", e);
            return None;
        }
    };

    session.registry.insert(BodyTag {
        id,
        kind: BodyKind::Stone {
            category,
            archetype,
        },
        special: options.special,
        state: BodyState::Floating,
        fragment: options.fragment,
        size,
        outline: if fell_back { Vec::new() } else { outline },
        color,
        original_color: None,
        highlight: None,
    });
    log::debug!(
        "Created {} stone {} ({:?}, {:.0}px) at ({:.0}, {:.0})",
        category.as_str(),
        id,
        archetype,
        size,
        position.x,
        position.y
    );
    Some(id)
}

/// Build, insert and tag a boulder
pub fn create_boulder<W: PhysicsWorld>(
    session: &mut GameSession<W>,
    options: BoulderOptions,
) -> Option<BodyId> {
    let kind = match options.kind {
        Some(kind) => kind,
        None => {
            let roll = session.rng.random::<f64>();
            BoulderKind::from_roll(roll).unwrap_or(BoulderKind::Mountain)
        }
    };
    let traits = kind.traits();
    let size = match options.size {
        Some(size) => size,
        None => session.rng.random_range(traits.size.0..=traits.size.1),
    };
    let max_hit_points = match options.max_hit_points {
        Some(hp) => hp,
        None => session.rng.random_range(traits.hits.0..=traits.hits.1),
    };

    let mut outline = generate_outline(traits.outline, size, &mut session.rng);
    jitter(&mut outline, size * BOULDER_IRREGULARITY, &mut session.rng);

    let position = match options.position {
        Some(p) => p,
        None => {
            let geo = session.geometry;
            let x = session.rng.random_range(geo.width * 0.1..=geo.width * 0.9);
            let top = HUD_HEIGHT + size / 2.0;
            let bottom = (HUD_HEIGHT + geo.height * 0.3)
                .min(geo.water_level - size)
                .max(top + 1.0);
            Vec2::new(x, session.rng.random_range(top..=bottom))
        }
    };

    let desc = BodyDesc {
        angle: session.rng.random_range(0.0..TAU),
        material: Material {
            density: traits.density,
            friction: 0.1,
            restitution: traits.restitution,
        },
        gravity_scale: 0.0,
        linear_damping: AIR_DAMPING,
        ..BodyDesc::dynamic(ShapeDesc::Polygon(outline.clone()), position)
    };

    let id = session.next_entity_id();
    let fell_back = match insert_with_fallback(&mut session.world, id, desc, size / 2.0) {
        Ok(fell_back) => fell_back,
        Err(e) => {
            log::error!("Failed to create boulder: {}", e);
            return None;
        }
    };

    session.registry.insert(BodyTag {
        id,
        kind: BodyKind::Boulder(BoulderRecord::new(kind, max_hit_points)),
        special: None,
        state: BodyState::Floating,
        fragment: false,
        size,
        outline: if fell_back { Vec::new() } else { outline },
        color: traits.color,
        original_color: None,
        highlight: None,
    });
    log::info!(
        "{} appeared ({} hits, {:.0}px)",
        traits.name,
        max_hit_points,
        size
    );
    Some(id)
}

/// Populate the air with a wave scaled to the viewport area
pub fn spawn_stone_wave<W: PhysicsWorld>(session: &mut GameSession<W>) -> Vec<BodyId> {
    let geo = session.geometry;
    let scale = (geo.width * geo.height / REFERENCE_AREA).clamp(1.0, 3.0);
    let large = (8.0 * scale).floor() as usize;
    let medium = (5.0 * scale).floor() as usize;

    let mut ids = Vec::with_capacity(large + medium);
    for category in std::iter::repeat_n(Category::Large, large)
        .chain(std::iter::repeat_n(Category::Medium, medium))
    {
        if let Some(id) = create_stone(session, StoneOptions::new(category)) {
            ids.push(id);
        }
    }
    log::info!("Spawned wave: {} large, {} medium", large, medium);
    ids
}

/// One spawner tick: usually a stone, sometimes a boulder
pub fn spawn_periodic<W: PhysicsWorld>(session: &mut GameSession<W>) -> Option<BodyId> {
    if session.config.boulders_enabled {
        let roll = session.rng.random::<f64>();
        if let Some(kind) = BoulderKind::from_roll(roll) {
            return create_boulder(
                session,
                BoulderOptions {
                    kind: Some(kind),
                    ..BoulderOptions::default()
                },
            );
        }
    }
    spawn_bonus_stone(session)
}

/// A large or medium stone at a random air position
pub fn spawn_bonus_stone<W: PhysicsWorld>(session: &mut GameSession<W>) -> Option<BodyId> {
    let category = if session.rng.random_bool(0.5) {
        Category::Large
    } else {
        Category::Medium
    };
    create_stone(session, StoneOptions::new(category))
}
