//! Breaking stones and boulders
//!
//! A stone breaks in one go: it is removed from the world and from the
//! registry, rewards are paid and the category fan-out spawns falling
//! fragments. Boulders soak up damage over several hits and release a ring
//! of large stones when they finally break.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::body::{BodyState, BoulderKind, Category, SpecialKind};
use super::factory::{StoneOptions, create_stone};
use super::shape::ShapeArchetype;
use super::state::GameSession;
use crate::consts::FRAME_RATE;
use crate::physics::{BodyId, PhysicsWorld};
use crate::presentation::{NotificationKind, SoundCue};

/// Downward speed of fresh fragments (per 60 Hz frame)
const FRAGMENT_FALL_SPEED: f32 = 5.0;

/// What triggered a break
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakCause {
    /// Player click: rolls for a critical
    Manual,
    /// Auto-break ticker: never critical
    Auto,
}

/// Score and shards paid for one break
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rewards {
    pub score: u64,
    pub shards: u64,
}

/// Result of a successful stone break
#[derive(Debug, Clone, PartialEq)]
pub struct BreakOutcome {
    pub score: u64,
    /// Shards actually credited, after the shard boost
    pub shards: u64,
    pub critical: bool,
    pub children: Vec<BodyId>,
}

/// Result of a boulder hit
#[derive(Debug, Clone, PartialEq)]
pub enum HitOutcome {
    Damaged {
        damage: u32,
        max_hit_points: u32,
        new_cracks: u8,
    },
    Destroyed {
        score: u64,
        shards: u64,
        stones: Vec<BodyId>,
    },
}

/// Where and how fast one fragment leaves its parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentPlan {
    pub category: Category,
    pub offset: Vec2,
    pub velocity: Vec2,
}

/// Base rewards with special-kind and critical multipliers applied
pub fn stone_rewards(category: Category, special: Option<SpecialKind>, critical: bool) -> Rewards {
    let crit = if critical { 2 } else { 1 };
    let score_mult = special.map_or(1, |s| s.traits().score_multiplier);
    let shard_mult = if special.is_some() { 2 } else { 1 };
    Rewards {
        score: category.break_score() * score_mult * crit,
        shards: category.break_shards() * shard_mult * crit,
    }
}

/// Children of a broken stone, spread evenly around its centre
pub fn plan_fragments(
    category: Category,
    special: Option<SpecialKind>,
    extent: f32,
) -> Vec<FragmentPlan> {
    let Some((child, base)) = category.fragments() else {
        return Vec::new();
    };
    let count = base + special.map_or(0, |s| s.traits().bonus_children);
    let spread = match category {
        Category::Large => 2.0,
        _ => 1.5,
    };
    (0..count)
        .map(|i| {
            let angle = TAU * i as f32 / count as f32;
            let dir = Vec2::new(angle.cos(), angle.sin());
            FragmentPlan {
                category: child,
                offset: dir * extent / 4.0,
                velocity: Vec2::new(dir.x * spread, FRAGMENT_FALL_SPEED) * FRAME_RATE,
            }
        })
        .collect()
}

/// Number of large stones a boulder of `size` releases
pub fn boulder_stone_count(size: f32) -> u32 {
    (3 + (size / 30.0).floor() as u32).clamp(3, 12)
}

/// Break a free stone. No-op for boulders, bridged, broken or unknown ids.
pub fn break_stone<W: PhysicsWorld>(
    session: &mut GameSession<W>,
    id: BodyId,
    cause: BreakCause,
) -> Option<BreakOutcome> {
    let Some(tag) = session.registry.get(id) else {
        log::debug!("break_stone: unknown body {}", id);
        return None;
    };
    if tag.is_boulder() || !tag.state.is_free() {
        return None;
    }
    let (category, archetype) = (tag.category()?, tag.archetype()?);
    let (special, color, size) = (tag.special, tag.color, tag.size);

    let Some(pos) = session.world.position(id) else {
        log::warn!("break_stone: body {} missing from world", id);
        session.forget(id);
        return None;
    };
    let extent = session.world.extent(id).unwrap_or(size);

    let critical = cause == BreakCause::Manual && session.economy.roll_critical(&mut session.rng);

    session.registry.retire(id, BodyState::Broken);
    session.effects.remove(id);
    session.world.remove(id);

    let rewards = stone_rewards(category, special, critical);
    session.economy.add_score(rewards.score);
    let shards = session.economy.add_currency(rewards.shards);
    session.economy.stones_broken += 1;

    let presenter = &mut session.presenter;
    presenter.particle_burst(pos, ((extent * 0.6) as u32).max(4), color.0);
    match cause {
        BreakCause::Manual => presenter.play_sound(SoundCue::StoneBreak, None, None),
        BreakCause::Auto => presenter.play_sound(SoundCue::StoneBreak, Some(0.4), None),
    }
    if critical {
        presenter.show_notification(
            pos - Vec2::new(0.0, 30.0),
            &format!("CRITICAL! +{}", rewards.score),
            NotificationKind::Critical,
        );
    } else {
        presenter.show_notification(
            pos - Vec2::new(0.0, 30.0),
            &format!("+{}", rewards.score),
            NotificationKind::Score,
        );
    }
    presenter.show_notification(
        pos - Vec2::new(0.0, 60.0),
        &format!("+{} 💎", shards),
        NotificationKind::Currency,
    );
    presenter.display_score(session.economy.score);
    presenter.display_currency(session.economy.currency);

    let children = spawn_fragments(session, pos, category, special, archetype, extent);
    log::debug!(
        "Broke {} stone {} ({:?}): +{} score, +{} shards, {} children{}",
        category.as_str(),
        id,
        cause,
        rewards.score,
        shards,
        children.len(),
        if critical { ", critical" } else { "" }
    );

    Some(BreakOutcome {
        score: rewards.score,
        shards,
        critical,
        children,
    })
}

fn spawn_fragments<W: PhysicsWorld>(
    session: &mut GameSession<W>,
    origin: Vec2,
    category: Category,
    special: Option<SpecialKind>,
    archetype: ShapeArchetype,
    extent: f32,
) -> Vec<BodyId> {
    plan_fragments(category, special, extent)
        .into_iter()
        .filter_map(|plan| {
            create_stone(
                session,
                StoneOptions::new(plan.category)
                    .at(origin + plan.offset)
                    .moving(plan.velocity)
                    .archetype(archetype)
                    .fragment(),
            )
        })
        .collect()
}

/// Damage a boulder; breaks it once damage reaches its hit points
pub fn hit_boulder<W: PhysicsWorld>(
    session: &mut GameSession<W>,
    id: BodyId,
    damage: u32,
) -> Option<HitOutcome> {
    if damage == 0 {
        return None;
    }
    let tag = session.registry.get(id)?;
    if !tag.is_boulder() || !tag.state.is_free() {
        return None;
    }
    let Some(pos) = session.world.position(id) else {
        log::warn!("hit_boulder: body {} missing from world", id);
        session.forget(id);
        return None;
    };

    let record = session.registry.get_mut(id)?.boulder_mut()?;
    let new_cracks = record.apply_damage(damage);
    let (kind, total, max, destroyed, health) = (
        record.kind,
        record.damage,
        record.max_hit_points,
        record.is_destroyed(),
        record.health_fraction(),
    );

    session
        .presenter
        .play_sound(SoundCue::HeavyImpact, Some(0.6), Some(0.8 + 0.4 * health));
    session.presenter.particle_burst(pos, 5, 0xffffff);
    if new_cracks > 0 {
        session.presenter.show_notification(
            pos - Vec2::new(0.0, 40.0),
            "Crack!",
            NotificationKind::Boulder,
        );
    }
    log::debug!("Boulder {} hit: {}/{}", id, total, max);

    if destroyed {
        let (score, shards, stones) = break_boulder(session, id, kind, pos);
        Some(HitOutcome::Destroyed {
            score,
            shards,
            stones,
        })
    } else {
        Some(HitOutcome::Damaged {
            damage: total,
            max_hit_points: max,
            new_cracks,
        })
    }
}

fn break_boulder<W: PhysicsWorld>(
    session: &mut GameSession<W>,
    id: BodyId,
    kind: BoulderKind,
    pos: Vec2,
) -> (u64, u64, Vec<BodyId>) {
    let traits = kind.traits();
    let size = session.registry.get(id).map_or(traits.size.0, |t| t.size);

    session.registry.retire(id, BodyState::Broken);
    session.effects.remove(id);
    session.world.remove(id);

    session.economy.add_score(traits.score);
    let shards = session.economy.add_currency(traits.shards);

    let presenter = &mut session.presenter;
    presenter.play_sound(traits.break_cue, None, None);
    presenter.particle_burst(pos, 20 + (size / 10.0) as u32, traits.color.0);
    presenter.show_notification(
        pos - Vec2::new(0.0, 50.0),
        &format!("{} destroyed! +{}", traits.name, traits.score),
        NotificationKind::Boulder,
    );
    presenter.show_notification(
        pos - Vec2::new(0.0, 80.0),
        &format!("+{} 💎", shards),
        NotificationKind::Currency,
    );
    presenter.display_score(session.economy.score);
    presenter.display_currency(session.economy.currency);

    let stones = spawn_boulder_stones(session, pos, size, kind);
    log::info!(
        "{} destroyed: +{} score, +{} shards, {} stones",
        traits.name,
        traits.score,
        shards,
        stones.len()
    );
    (traits.score, shards, stones)
}

/// Ring of large stones flung out of a broken boulder
fn spawn_boulder_stones<W: PhysicsWorld>(
    session: &mut GameSession<W>,
    origin: Vec2,
    size: f32,
    kind: BoulderKind,
) -> Vec<BodyId> {
    let (special_kind, chance) = kind.traits().special_roll;
    let count = boulder_stone_count(size);
    (0..count)
        .filter_map(|i| {
            let angle = TAU * i as f32 / count as f32;
            let dir = Vec2::new(angle.cos(), angle.sin());
            let velocity = Vec2::new(dir.x * 3.0, dir.y * 3.0 + 2.0) * FRAME_RATE;
            let mut options = StoneOptions::new(Category::Large)
                .at(origin + dir * size / 3.0)
                .moving(velocity);
            if session.rng.random::<f64>() < chance {
                options = options.special(special_kind);
            }
            create_stone(session, options)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stone_rewards_table() {
        assert_eq!(
            stone_rewards(Category::Large, None, false),
            Rewards { score: 10, shards: 3 }
        );
        assert_eq!(
            stone_rewards(Category::Medium, None, false),
            Rewards { score: 20, shards: 2 }
        );
        assert_eq!(
            stone_rewards(Category::Small, None, false),
            Rewards { score: 30, shards: 1 }
        );
    }

    #[test]
    fn test_critical_doubles_both() {
        for category in [Category::Large, Category::Medium, Category::Small] {
            for special in [None, Some(SpecialKind::Hanuman), Some(SpecialKind::Rama)] {
                let normal = stone_rewards(category, special, false);
                let crit = stone_rewards(category, special, true);
                assert_eq!(crit.score, normal.score * 2);
                assert_eq!(crit.shards, normal.shards * 2);
            }
        }
    }

    #[test]
    fn test_special_multipliers() {
        let r = stone_rewards(Category::Large, Some(SpecialKind::Rama), false);
        assert_eq!(r, Rewards { score: 50, shards: 6 });
        let r = stone_rewards(Category::Small, Some(SpecialKind::Hanuman), true);
        assert_eq!(r, Rewards { score: 180, shards: 4 });
    }

    #[test]
    fn test_fan_out() {
        let large = plan_fragments(Category::Large, None, 50.0);
        assert_eq!(large.len(), 3);
        assert!(large.iter().all(|p| p.category == Category::Medium));
        assert!(large.iter().all(|p| p.velocity.y > 0.0));

        let medium = plan_fragments(Category::Medium, None, 30.0);
        assert_eq!(medium.len(), 2);
        assert!(medium.iter().all(|p| p.category == Category::Small));
        // 180 degrees apart
        assert!((medium[0].offset + medium[1].offset).length() < 1e-4);

        assert!(plan_fragments(Category::Small, None, 12.0).is_empty());
    }

    #[test]
    fn test_hanuman_adds_a_child() {
        let plans = plan_fragments(Category::Large, Some(SpecialKind::Hanuman), 50.0);
        assert_eq!(plans.len(), 4);
    }

    #[test]
    fn test_boulder_stone_count() {
        assert_eq!(boulder_stone_count(10.0), 3);
        assert_eq!(boulder_stone_count(75.0), 5);
        assert_eq!(boulder_stone_count(110.0), 6);
        assert_eq!(boulder_stone_count(1000.0), 12);
    }
}
