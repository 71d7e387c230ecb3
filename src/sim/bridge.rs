//! Water and bridge state machine
//!
//! Bodies move `Floating -> InWater -> PartOfBridge`. Water entry is driven by
//! contacts with the water-surface sensor; joining is re-checked after every
//! water entry, every in-water contact and once more after a short delay.
//!
//! Bridge completion is never stored as a source of truth: it is recomputed
//! from the x positions of bridged bodies binned into fixed-width cells
//! between the shores.

use std::collections::{BTreeSet, HashSet};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::{BRIDGE_HIGHLIGHT, BodyState};
use super::state::{Deferred, GameSession};
use crate::physics::{BodyId, CollisionStarted, PhysicsWorld};
use crate::presentation::SoundCue;
use crate::settings::Geometry;

/// Share of horizontal speed kept on water entry (applied twice)
const ENTRY_HORIZONTAL_DAMPING: f32 = 0.7;
const ENTRY_HORIZONTAL_SETTLE: f32 = 0.5;
/// Inset from the shores for recovered bodies
const RECOVERY_INSET: f32 = 100.0;
/// Depth below the water line for recovered bodies
const RECOVERY_DEPTH: f32 = 20.0;

/// Visual link between two bridged bodies; no physics effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub a: BodyId,
    pub b: BodyId,
    pub from: Vec2,
    pub to: Vec2,
}

/// Derived bridge coverage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub percent: u32,
    /// Occupied bins span enough of the gap
    pub span_ok: bool,
    pub occupied_bins: usize,
}

/// Shift input direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftDirection {
    Left,
    Right,
}

impl ShiftDirection {
    pub fn sign(&self) -> f32 {
        match self {
            ShiftDirection::Left => -1.0,
            ShiftDirection::Right => 1.0,
        }
    }
}

/// Bridge parts in join order, their connections and the last completion
#[derive(Debug, Clone, Default)]
pub struct BridgeLedger {
    parts: Vec<BodyId>,
    connections: Vec<Connection>,
    linked: HashSet<(BodyId, BodyId)>,
    completion: Completion,
    victory_signaled: bool,
}

impl BridgeLedger {
    pub fn parts(&self) -> &[BodyId] {
        &self.parts
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn completion(&self) -> Completion {
        self.completion
    }

    pub fn victory_signaled(&self) -> bool {
        self.victory_signaled
    }

    pub fn is_linked(&self, a: BodyId, b: BodyId) -> bool {
        self.linked.contains(&pair_key(a, b))
    }

    fn link(&mut self, a: BodyId, b: BodyId, from: Vec2, to: Vec2) -> bool {
        let key = pair_key(a, b);
        if !self.linked.insert(key) {
            return false;
        }
        let (from, to) = if key.0 == a { (from, to) } else { (to, from) };
        self.connections.push(Connection {
            a: key.0,
            b: key.1,
            from,
            to,
        });
        true
    }
}

fn pair_key(a: BodyId, b: BodyId) -> (BodyId, BodyId) {
    (a.min(b), a.max(b))
}

/// Coverage of bridged bodies given as `(x, cells)` pairs.
///
/// Each body marks `cells` adjacent bins centred on the bin containing its x.
/// Bins outside the gap between the shores are ignored.
pub fn compute_completion(
    parts: impl IntoIterator<Item = (f32, u32)>,
    geometry: &Geometry,
    bin_width: f32,
    span_ratio: f32,
) -> Completion {
    let total = geometry.bridge_width();
    if total <= 0.0 || bin_width <= 0.0 {
        return Completion::default();
    }
    let bin_count = (total / bin_width).ceil() as i64;

    let mut occupied = BTreeSet::new();
    for (x, cells) in parts {
        let bin = ((x - geometry.left_shore) / bin_width).floor() as i64;
        let k = cells.max(1) as i64;
        for offset in -((k - 1) / 2)..=k / 2 {
            let b = bin + offset;
            if (0..bin_count).contains(&b) {
                occupied.insert(b);
            }
        }
    }

    let n = occupied.len();
    // Multiply before dividing so whole-pixel bins floor exactly
    let covered = n as f64 * bin_width as f64 * 100.0;
    let percent = ((covered / total as f64).floor() as u32).min(100);
    let span_ok = match (occupied.first(), occupied.last()) {
        (Some(first), Some(last)) => (last - first) as f32 * bin_width > span_ratio * total,
        _ => false,
    };
    Completion {
        percent,
        span_ok,
        occupied_bins: n,
    }
}

/// `Floating -> InWater` on contact with the water sensor
pub(crate) fn enter_water<W: PhysicsWorld>(session: &mut GameSession<W>, id: BodyId) -> bool {
    if session.registry.state(id) != Some(BodyState::Floating) || session.world.is_fixed(id) {
        return false;
    }
    let Some(pos) = session.world.position(id) else {
        log::warn!("enter_water: body {} missing from world", id);
        session.forget(id);
        return false;
    };

    let tint = session.config.water_tint_percent;
    if let Some(tag) = session.registry.get_mut(id) {
        tag.transition(BodyState::InWater);
        tag.wet(tint);
    }

    let vx = session.world.velocity(id).map_or(0.0, |v| v.x);
    session.world.set_velocity(
        id,
        Vec2::new(
            vx * ENTRY_HORIZONTAL_DAMPING * ENTRY_HORIZONTAL_SETTLE,
            -session.config.water_entry_kick,
        ),
    );
    if let Some(density) = session.world.density(id) {
        session
            .world
            .set_density(id, density * session.config.buoyancy_density_factor);
    }
    session.world.set_gravity_scale(id, 0.0);
    session.effects.install_buoyancy(id);
    session
        .presenter
        .play_sound(SoundCue::Splash, Some(0.3), None);
    log::debug!("Body {} entered water at ({:.0}, {:.0})", id, pos.x, pos.y);

    check_join(session, id);
    if session.registry.state(id) == Some(BodyState::InWater)
        && pos.y > session.geometry.water_level
    {
        let delay = session.config.join_check_delay_ms;
        session.scheduler.schedule(delay, Deferred::JoinCheck(id));
    }
    true
}

/// Teleport an in-water body that left the viewport back near the water line.
/// Returns the position the body ends up at.
pub(crate) fn recover_off_bounds<W: PhysicsWorld>(
    session: &mut GameSession<W>,
    id: BodyId,
    pos: Vec2,
) -> Vec2 {
    let geo = session.geometry;
    if geo.contains(pos, 0.0) {
        return pos;
    }
    let lo = geo.left_shore + RECOVERY_INSET;
    let hi = (geo.right_shore - RECOVERY_INSET).max(lo);
    let safe = Vec2::new(pos.x.clamp(lo, hi), geo.water_level + RECOVERY_DEPTH);
    session.world.set_position(id, safe);
    session
        .world
        .set_velocity(id, Vec2::new(0.0, -session.config.water_entry_kick * 0.5));
    log::debug!(
        "Recovered body {} from ({:.0}, {:.0})",
        id,
        pos.x,
        pos.y
    );
    safe
}

/// Try to join an in-water body to the bridge
pub(crate) fn check_join<W: PhysicsWorld>(session: &mut GameSession<W>, id: BodyId) -> bool {
    if session.registry.state(id) != Some(BodyState::InWater) {
        return false;
    }
    let Some(pos) = session.world.position(id) else {
        session.forget(id);
        return false;
    };
    let pos = recover_off_bounds(session, id, pos);

    let geo = session.geometry;
    if (pos.y - geo.water_level).abs() > session.config.join_vertical_tolerance {
        return false;
    }

    let margin = session.config.shallow_margin;
    let near_shore =
        (pos.x - geo.left_shore).abs() < margin || (pos.x - geo.right_shore).abs() < margin;
    if near_shore && pos.y >= geo.water_level {
        if make_part(session, id) {
            session
                .presenter
                .play_sound(SoundCue::Splash, Some(0.2), None);
            recompute_completion(session);
            return true;
        }
        return false;
    }

    let radius = session.config.join_radius;
    let neighbour = session.bridge.parts.iter().copied().find(|&other| {
        other != id
            && session
                .world
                .position(other)
                .is_some_and(|p| p.distance(pos) < radius)
    });
    match neighbour {
        Some(other) => join_pair(session, id, other),
        None => false,
    }
}

/// Join two bodies and link them. Each must be in water or already bridged.
pub(crate) fn join_pair<W: PhysicsWorld>(
    session: &mut GameSession<W>,
    a: BodyId,
    b: BodyId,
) -> bool {
    if a == b {
        return false;
    }
    let joinable = |s: Option<BodyState>| {
        matches!(s, Some(BodyState::InWater | BodyState::PartOfBridge))
    };
    if !joinable(session.registry.state(a)) || !joinable(session.registry.state(b)) {
        return false;
    }

    let mut joined = false;
    for id in [a, b] {
        if session.registry.state(id) == Some(BodyState::InWater) {
            joined |= make_part(session, id);
        }
    }

    let (Some(from), Some(to)) = (session.world.position(a), session.world.position(b)) else {
        return joined;
    };
    let linked = session.bridge.link(a, b, from, to);
    if linked {
        log::debug!("Linked {} and {}", a, b);
    }
    if joined || linked {
        recompute_completion(session);
    }
    joined || linked
}

/// Freeze an in-water body into the bridge
fn make_part<W: PhysicsWorld>(session: &mut GameSession<W>, id: BodyId) -> bool {
    let Some(tag) = session.registry.get_mut(id) else {
        return false;
    };
    if !tag.transition(BodyState::PartOfBridge) {
        return false;
    }
    tag.highlight = Some(BRIDGE_HIGHLIGHT);
    session.effects.remove(id);

    session.world.set_fixed(id, true);
    if let Some(pos) = session.world.position(id) {
        let y = session.geometry.water_level + session.config.bridge_snap_depth;
        session.world.set_position(id, Vec2::new(pos.x, y));
    }
    session.world.set_angle(id, 0.0);
    session.bridge.parts.push(id);
    log::debug!(
        "Body {} joined the bridge ({} parts)",
        id,
        session.bridge.parts.len()
    );
    true
}

/// Route one contact to the state machine
pub(crate) fn handle_contact<W: PhysicsWorld>(
    session: &mut GameSession<W>,
    contact: CollisionStarted,
) {
    if let Some(other) = contact.other(session.water_sensor()) {
        enter_water(session, other);
        return;
    }
    let state_a = session.registry.state(contact.a);
    let state_b = session.registry.state(contact.b);
    match (state_a, state_b) {
        (Some(BodyState::InWater), Some(BodyState::InWater)) => {
            join_pair(session, contact.a, contact.b);
        }
        (Some(BodyState::InWater), Some(BodyState::PartOfBridge)) => {
            check_join(session, contact.a);
        }
        (Some(BodyState::PartOfBridge), Some(BodyState::InWater)) => {
            check_join(session, contact.b);
        }
        _ => {}
    }
}

/// Move every bridged body and connection sideways, then recompute
pub(crate) fn shift_bridge<W: PhysicsWorld>(
    session: &mut GameSession<W>,
    direction: ShiftDirection,
) -> Completion {
    let dx = direction.sign() * session.config.shift_delta;
    let delta = Vec2::new(dx, 0.0);
    for &id in &session.bridge.parts {
        if session.registry.state(id) != Some(BodyState::PartOfBridge) {
            continue;
        }
        if let Some(pos) = session.world.position(id) {
            session.world.set_position(id, pos + delta);
        }
    }
    for connection in &mut session.bridge.connections {
        connection.from += delta;
        connection.to += delta;
    }
    log::debug!("Shifted bridge by {:+.0}px", dx);
    recompute_completion(session)
}

/// Recompute coverage from bridged positions, report it and signal victory once
pub(crate) fn recompute_completion<W: PhysicsWorld>(session: &mut GameSession<W>) -> Completion {
    let parts: Vec<(f32, u32)> = session
        .bridge
        .parts
        .iter()
        .filter_map(|&id| {
            let tag = session.registry.get(id)?;
            if tag.state != BodyState::PartOfBridge {
                return None;
            }
            let pos = session.world.position(id)?;
            Some((pos.x, tag.bridge_cells()))
        })
        .collect();
    let completion = compute_completion(
        parts,
        &session.geometry,
        session.config.bin_width,
        session.config.completion_span_ratio,
    );

    let previous = session.bridge.completion;
    session.bridge.completion = completion;
    session
        .presenter
        .display_bridge_progress(completion.percent);
    if completion.percent > previous.percent {
        session
            .presenter
            .play_sound(SoundCue::BridgeProgress, Some(0.5), None);
        log::debug!("Bridge at {}%", completion.percent);
    }

    if !session.bridge.victory_signaled
        && completion.percent >= session.config.victory_threshold
        && completion.span_ok
    {
        session.bridge.victory_signaled = true;
        session.declare_victory();
    }
    completion
}
