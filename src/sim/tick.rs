//! Fixed timestep simulation tick
//!
//! One step, in order: input commands, per-body effects, the physics step,
//! contact-driven state transitions (which recompute completion), due
//! deferred tasks, drift recovery and culling, then the gameplay timers.
//! Awards from timers therefore never see a stale completion value.

use glam::Vec2;

use super::body::BodyState;
use super::bridge::{self, ShiftDirection};
use super::effects;
use super::factory;
use super::state::{Deferred, GamePhase, GameSession};
use crate::consts::SIM_DT;
use crate::physics::{BodyId, PhysicsWorld};

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Click position in world coordinates
    pub click: Option<Vec2>,
    /// Bridge shift request
    pub shift: Option<ShiftDirection>,
    /// Pause toggle
    pub pause: bool,
}

/// Advance the session by one fixed timestep
pub fn tick<W: PhysicsWorld>(session: &mut GameSession<W>, input: &TickInput) {
    if input.pause {
        match session.phase() {
            GamePhase::Running => {
                session.pause_game();
                return;
            }
            GamePhase::Paused => {
                session.resume_game();
            }
            _ => {}
        }
    }
    if session.phase() != GamePhase::Running {
        return;
    }

    if let Some(point) = input.click {
        session.click_at(point);
    }
    if let Some(direction) = input.shift {
        bridge::shift_bridge(session, direction);
    }

    effects::sweep(session);
    let contacts = session.world.step(SIM_DT);
    session.advance_clock();
    for contact in contacts {
        bridge::handle_contact(session, contact);
    }

    let dt_ms = SIM_DT as f64 * 1000.0;
    for task in session.scheduler.advance(dt_ms) {
        match task {
            Deferred::JoinCheck(id) => {
                bridge::check_join(session, id);
            }
            Deferred::SpawnStone => {
                factory::spawn_bonus_stone(session);
            }
        }
    }

    recover_drifting(session);
    cull_escaped(session);

    // Victory stops everything after the step that produced it
    if session.phase() != GamePhase::Running {
        return;
    }
    run_timers(session, dt_ms);
}

fn recover_drifting<W: PhysicsWorld>(session: &mut GameSession<W>) {
    for id in session.registry.ids_in(BodyState::InWater) {
        if let Some(pos) = session.world.position(id) {
            bridge::recover_off_bounds(session, id, pos);
        }
    }
}

/// Drop floating bodies that left the viewport beyond the tolerance
fn cull_escaped<W: PhysicsWorld>(session: &mut GameSession<W>) {
    let geo = session.geometry;
    let tolerance = session.config.off_bounds_tolerance;
    let escaped: Vec<BodyId> = session
        .registry
        .ids_in(BodyState::Floating)
        .into_iter()
        .filter(|id| {
            session
                .world
                .position(*id)
                .is_none_or(|p| !geo.contains(p, tolerance))
        })
        .collect();
    for id in escaped {
        session.world.remove(id);
        session.forget(id);
        log::debug!("Culled body {} outside the viewport", id);
    }
}

fn run_timers<W: PhysicsWorld>(session: &mut GameSession<W>, dt_ms: f64) {
    for _ in 0..session.timers.auto_break.advance(dt_ms) {
        if session.auto_break_once().is_none() {
            log::trace!("Auto-break found no eligible stone");
        }
    }

    let income_ticks = session.timers.passive_income.advance(dt_ms);
    let rate = session.economy.passive_income_rate();
    if income_ticks > 0 && rate > 0 {
        session.economy.add_score(rate * income_ticks as u64);
        let score = session.economy.score;
        session.presenter.display_score(score);
    }

    for _ in 0..session.timers.spawner.advance(dt_ms) {
        let free_stones = session
            .registry
            .count(|t| t.state == BodyState::Floating && !t.is_boulder());
        let progress = session.bridge.completion().percent;
        if free_stones < session.config.spawner_floating_cap
            && progress < session.config.spawner_progress_cap
        {
            factory::spawn_periodic(session);
        }
    }
}
