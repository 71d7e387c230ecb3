//! End-to-end gameplay scenarios against the rapier backend.
//!
//! Bodies are placed and fed contacts directly instead of stepping the world
//! wherever exact positions matter.

use glam::Vec2;

use stone_bridge::physics::{BodyId, CollisionStarted, PhysicsWorld, RapierWorld};
use stone_bridge::presentation::{NotificationKind, PresenterCall, RecordingPresenter, SoundCue};
use stone_bridge::settings::GameConfig;
use stone_bridge::sim::{
    BodyState, BoulderKind, BoulderOptions, Category, GamePhase, GameSession, HitOutcome,
    ShiftDirection, StoneOptions, TickInput, UpgradeKey, boulder_stone_count,
    compute_completion,
};

fn session_with(config: GameConfig) -> (GameSession<RapierWorld>, RecordingPresenter) {
    let presenter = RecordingPresenter::new();
    let session = GameSession::new(
        config,
        RapierWorld::new(400.0),
        Box::new(presenter.clone()),
    )
    .unwrap();
    (session, presenter)
}

fn session() -> (GameSession<RapierWorld>, RecordingPresenter) {
    session_with(GameConfig::default())
}

fn stone_at(session: &mut GameSession<RapierWorld>, category: Category, pos: Vec2) -> BodyId {
    session
        .create_stone(StoneOptions::new(category).at(pos).moving(Vec2::ZERO))
        .unwrap()
}

/// Report a water-sensor contact for `id`
fn splash(session: &mut GameSession<RapierWorld>, id: BodyId) {
    let sensor = session.water_sensor();
    session.handle_collision(CollisionStarted { a: sensor, b: id });
}

/// Two in-water stones well away from the shores, not yet joined
fn two_in_water(session: &mut GameSession<RapierWorld>) -> (BodyId, BodyId) {
    let water = session.geometry().water_level;
    let a = stone_at(session, Category::Medium, Vec2::new(400.0, water + 5.0));
    let b = stone_at(session, Category::Medium, Vec2::new(470.0, water + 5.0));
    splash(session, a);
    splash(session, b);
    assert_eq!(session.registry().state(a), Some(BodyState::InWater));
    assert_eq!(session.registry().state(b), Some(BodyState::InWater));
    (a, b)
}

#[test]
fn large_break_pays_out_and_fans_out() {
    let (mut session, presenter) = session();
    let id = stone_at(&mut session, Category::Large, Vec2::new(600.0, 200.0));

    let outcome = session.break_stone(id).unwrap();
    assert!(!outcome.critical);
    assert_eq!((outcome.score, outcome.shards), (10, 3));
    assert_eq!(session.economy().score, 10);
    assert_eq!(session.economy().currency, 3);

    assert_eq!(outcome.children.len(), 3);
    for child in &outcome.children {
        let tag = session.registry().get(*child).unwrap();
        assert_eq!(tag.category(), Some(Category::Medium));
        assert!(tag.fragment);
        assert!(session.world().velocity(*child).unwrap().y > 0.0);
    }

    assert_eq!(session.registry().state(id), None);
    assert!(!session.world().contains(id));
    assert_eq!(presenter.sounds(), vec![SoundCue::StoneBreak]);
    assert_eq!(
        presenter.count(|c| matches!(
            c,
            PresenterCall::Notification {
                kind: NotificationKind::Score,
                ..
            }
        )),
        1
    );
}

#[test]
fn fan_out_by_category() {
    let (mut session, _) = session();
    let medium = stone_at(&mut session, Category::Medium, Vec2::new(300.0, 200.0));
    let small = stone_at(&mut session, Category::Small, Vec2::new(700.0, 200.0));

    let children = session.break_stone(medium).unwrap().children;
    assert_eq!(children.len(), 2);
    assert!(
        children
            .iter()
            .all(|c| session.registry().get(*c).unwrap().category() == Some(Category::Small))
    );

    let outcome = session.break_stone(small).unwrap();
    assert!(outcome.children.is_empty());
    assert_eq!(session.economy().score, 20 + 30);
}

#[test]
fn shard_boost_applies_to_break_rewards() {
    let (mut session, _) = session();
    session.economy_mut().currency = 40;
    session.purchase_upgrade(UpgradeKey::ShardBoost).unwrap();
    assert_eq!(session.economy().currency, 0);

    let id = stone_at(&mut session, Category::Large, Vec2::new(600.0, 200.0));
    let outcome = session.break_stone(id).unwrap();
    // 3 * 1.1 rounds back down to 3
    assert_eq!(outcome.shards, 3);
    assert_eq!(session.economy().currency, 3);
}

#[test]
fn double_break_is_a_no_op() {
    let (mut session, _) = session();
    let id = stone_at(&mut session, Category::Large, Vec2::new(600.0, 200.0));
    session.break_stone(id).unwrap();
    let tracked = session.registry().len();

    assert!(session.break_stone(id).is_none());
    assert!(session.break_stone(BodyId(9_999)).is_none());
    assert_eq!(session.economy().score, 10);
    assert_eq!(session.registry().len(), tracked);
}

#[test]
fn boulder_breaks_on_the_tenth_hit() {
    let (mut session, presenter) = session();
    let id = session
        .create_boulder(BoulderOptions {
            kind: Some(BoulderKind::Mountain),
            position: Some(Vec2::new(600.0, 200.0)),
            max_hit_points: Some(10),
            ..BoulderOptions::default()
        })
        .unwrap();
    let size = session.registry().get(id).unwrap().size;

    for hit in 1..=9 {
        let outcome = session.hit_boulder(id, 1).unwrap();
        assert!(
            matches!(outcome, HitOutcome::Damaged { damage, .. } if damage == hit),
            "hit {hit}: {outcome:?}"
        );
        assert_eq!(session.registry().state(id), Some(BodyState::Floating));
    }
    assert_eq!(session.registry().get(id).unwrap().boulder().unwrap().cracks, 2);
    assert_eq!(session.economy().score, 0);

    let HitOutcome::Destroyed { score, stones, .. } = session.hit_boulder(id, 1).unwrap() else {
        panic!("tenth hit should destroy the boulder");
    };
    assert_eq!(score, 80);
    assert_eq!(stones.len() as u32, boulder_stone_count(size));
    assert!(
        stones
            .iter()
            .all(|s| session.registry().get(*s).unwrap().category() == Some(Category::Large))
    );
    assert_eq!(session.registry().state(id), None);
    assert!(!session.world().contains(id));

    // Further hits change nothing
    assert!(session.hit_boulder(id, 1).is_none());
    assert_eq!(session.economy().score, 80);
    assert_eq!(
        presenter.count(|c| *c == PresenterCall::Sound(SoundCue::BoulderBreak)),
        1
    );
}

#[test]
fn break_stone_leaves_boulders_alone() {
    let (mut session, _) = session();
    let id = session.create_boulder(BoulderOptions::default()).unwrap();
    assert!(session.break_stone(id).is_none());
    assert_eq!(session.registry().state(id), Some(BodyState::Floating));
}

#[test]
fn water_entry_damps_and_installs_buoyancy() {
    let (mut session, presenter) = session();
    let water = session.geometry().water_level;
    let id = session
        .create_stone(
            StoneOptions::new(Category::Medium)
                .at(Vec2::new(500.0, water + 5.0))
                .moving(Vec2::new(100.0, 200.0)),
        )
        .unwrap();
    let density = session.world().density(id).unwrap();
    let color = session.registry().get(id).unwrap().color;

    splash(&mut session, id);
    let tag = session.registry().get(id).unwrap();
    assert_eq!(tag.state, BodyState::InWater);
    assert_eq!(tag.original_color, Some(color));
    assert_eq!(tag.color, color.darken(20));
    assert!(session.effects().has_buoyancy(id));

    let v = session.world().velocity(id).unwrap();
    assert!((v.x - 35.0).abs() < 1e-3);
    assert!(v.y < 0.0);
    assert!((session.world().density(id).unwrap() - density * 0.3).abs() < 1e-5);
    assert_eq!(presenter.sounds(), vec![SoundCue::Splash]);

    // A second sensor contact does nothing
    splash(&mut session, id);
    assert_eq!(presenter.sounds().len(), 1);
}

#[test]
fn shallow_water_joins_on_its_own() {
    let (mut session, _) = session();
    let geo = session.geometry();
    let id = stone_at(
        &mut session,
        Category::Medium,
        Vec2::new(geo.left_shore + 10.0, geo.water_level + 5.0),
    );
    splash(&mut session, id);

    assert_eq!(session.registry().state(id), Some(BodyState::PartOfBridge));
    assert!(session.world().is_fixed(id));
    assert!(!session.effects().has_buoyancy(id));
    let pos = session.world().position(id).unwrap();
    assert!((pos.y - (geo.water_level + 10.0)).abs() < 1e-3);
    assert_eq!(session.world().angle(id), Some(0.0));
    assert!(session.bridge().connections().is_empty());
    assert_eq!(session.bridge().parts(), &[id]);
}

#[test]
fn in_water_collision_links_once() {
    let (mut session, _) = session();
    let (a, b) = two_in_water(&mut session);

    session.handle_collision(CollisionStarted { a, b });
    assert_eq!(session.registry().state(a), Some(BodyState::PartOfBridge));
    assert_eq!(session.registry().state(b), Some(BodyState::PartOfBridge));
    assert_eq!(session.bridge().connections().len(), 1);
    assert!(session.bridge().is_linked(b, a));

    // Re-colliding, either way round, adds nothing
    session.handle_collision(CollisionStarted { a, b });
    session.handle_collision(CollisionStarted { a: b, b: a });
    assert_eq!(session.bridge().connections().len(), 1);
    assert_eq!(session.bridge().parts().len(), 2);
}

#[test]
fn bridged_bodies_cannot_be_broken() {
    let (mut session, _) = session();
    let (a, b) = two_in_water(&mut session);
    session.handle_collision(CollisionStarted { a, b });

    assert!(session.break_stone(a).is_none());
    assert!(session.auto_break_once().is_none());
    assert_eq!(session.economy().score, 0);
    assert_eq!(session.registry().state(a), Some(BodyState::PartOfBridge));
}

#[test]
fn proximity_join_to_existing_part() {
    let (mut session, _) = session();
    let geo = session.geometry();
    let anchor = stone_at(
        &mut session,
        Category::Medium,
        Vec2::new(geo.left_shore + 5.0, geo.water_level + 5.0),
    );
    splash(&mut session, anchor);

    // 45px from the anchor's snapped position, outside the shallow margin
    let next = stone_at(
        &mut session,
        Category::Medium,
        Vec2::new(geo.left_shore + 50.0, geo.water_level + 10.0),
    );
    splash(&mut session, next);
    assert_eq!(session.registry().state(next), Some(BodyState::PartOfBridge));
    assert!(session.bridge().is_linked(anchor, next));

    // Too far from anything
    let loner = stone_at(
        &mut session,
        Category::Medium,
        Vec2::new(600.0, geo.water_level + 5.0),
    );
    splash(&mut session, loner);
    assert_eq!(session.registry().state(loner), Some(BodyState::InWater));
}

#[test]
fn shift_moves_every_part_by_delta() {
    let (mut session, _) = session();
    let (a, b) = two_in_water(&mut session);
    session.handle_collision(CollisionStarted { a, b });

    let before: Vec<Vec2> = [a, b]
        .iter()
        .map(|id| session.world().position(*id).unwrap())
        .collect();
    let link_before = session.bridge().connections()[0];

    let completion = session.shift_bridge(ShiftDirection::Left);
    let delta = session.config().shift_delta;
    for (id, old) in [a, b].iter().zip(&before) {
        let now = session.world().position(*id).unwrap();
        assert!((now.x - (old.x - delta)).abs() < 1e-3);
        assert!((now.y - old.y).abs() < 1e-3);
    }
    let link = session.bridge().connections()[0];
    assert!((link.from.x - (link_before.from.x - delta)).abs() < 1e-3);
    assert!((link.to.x - (link_before.to.x - delta)).abs() < 1e-3);

    assert_eq!(session.bridge().parts().len(), 2);
    let expected = compute_completion(
        [a, b]
            .iter()
            .map(|id| (session.world().position(*id).unwrap().x, 1)),
        &session.geometry(),
        10.0,
        0.8,
    );
    assert_eq!(completion, expected);
}

#[test]
fn completion_recompute_is_idempotent() {
    let (mut session, presenter) = session();
    let (a, b) = two_in_water(&mut session);
    session.handle_collision(CollisionStarted { a, b });

    let first = session.recompute_completion();
    presenter.clear();
    let second = session.recompute_completion();
    assert_eq!(first, second);
    assert_eq!(first.occupied_bins, 2);
    assert!(!presenter.sounds().contains(&SoundCue::BridgeProgress));
}

#[test]
fn victory_fires_exactly_once() {
    let (mut session, presenter) = session();
    session.start_game();
    let geo = session.geometry();

    // A row of stones 10px apart, each joining the one before it
    let mut x = geo.left_shore + 5.0;
    while x < geo.right_shore {
        let id = stone_at(&mut session, Category::Small, Vec2::new(x, geo.water_level + 5.0));
        splash(&mut session, id);
        assert_eq!(session.registry().state(id), Some(BodyState::PartOfBridge));
        x += 10.0;
    }

    let completion = session.bridge_completion();
    assert!(completion.percent >= 90);
    assert!(completion.span_ok);
    assert_eq!(session.phase(), GamePhase::Victory);
    session.recompute_completion();
    session.shift_bridge(ShiftDirection::Right);
    assert_eq!(
        presenter.count(|c| matches!(c, PresenterCall::Victory(_))),
        1
    );
    assert_eq!(session.advance(1.0), 0);
}

#[test]
fn critical_rolls_are_seeded() {
    let run = |seed: u64| {
        let (mut session, _) = session_with(GameConfig {
            seed,
            ..GameConfig::default()
        });
        session.economy_mut().currency = 1_000_000;
        for _ in 0..10 {
            session.purchase_upgrade(UpgradeKey::CriticalChance).unwrap();
        }
        (0..24)
            .map(|i| {
                let pos = Vec2::new(150.0 + 35.0 * i as f32, 150.0);
                let id = stone_at(&mut session, Category::Large, pos);
                let outcome = session.break_stone(id).unwrap();
                if outcome.critical {
                    assert_eq!((outcome.score, outcome.shards), (20, 6));
                } else {
                    assert_eq!((outcome.score, outcome.shards), (10, 3));
                }
                outcome.critical
            })
            .collect::<Vec<bool>>()
    };

    let first = run(7);
    assert_eq!(first, run(7));
    assert!(first.contains(&true));
    assert!(first.contains(&false));
}

#[test]
fn restart_clears_everything() {
    let (mut session, _) = session();
    session.start_game();
    let (a, b) = two_in_water(&mut session);
    let water = session.geometry().water_level;
    let floater = stone_at(&mut session, Category::Large, Vec2::new(800.0, water + 5.0));
    splash(&mut session, floater);
    session.handle_collision(CollisionStarted { a, b });
    session.economy_mut().currency = 500;
    session.purchase_upgrade(UpgradeKey::AutoBreakSpeed).unwrap();
    assert!(!session.effects().is_empty());

    let old: Vec<BodyId> = session.registry().iter().map(|t| t.id).collect();
    session.restart_game();

    assert_eq!(session.phase(), GamePhase::Running);
    assert!(old.iter().all(|id| !session.world().contains(*id)));
    assert!(old.iter().all(|id| session.registry().get(*id).is_none()));
    assert!(session.effects().is_empty());
    assert!(session.bridge().parts().is_empty());
    assert!(session.bridge().connections().is_empty());
    assert_eq!(session.bridge_completion().percent, 0);
    assert_eq!(session.economy().score, 0);
    assert_eq!(session.economy().currency, 0);
    assert_eq!(session.economy().level(UpgradeKey::AutoBreakSpeed), 0);

    // Fresh wave plus the static world
    let wave = session.registry().len();
    assert!(wave > 0);
    assert!(
        session
            .registry()
            .iter()
            .all(|t| t.state == BodyState::Floating)
    );
    assert_eq!(
        session.world().body_count(),
        wave + session.boundaries().len() + 1
    );

    // The old body's deferred join check must not resurrect anything
    for _ in 0..60 {
        session.advance(1.0 / 60.0);
    }
    assert!(session.registry().get(floater).is_none());
}

#[test]
fn snapshot_serialises() {
    let (mut session, _) = session();
    session.start_game();
    let snapshot = session.snapshot();
    assert_eq!(snapshot.phase, GamePhase::Running);
    assert_eq!(snapshot.floating, session.registry().len());
    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(json.contains("\"phase\":\"Running\""));
}

#[test]
fn broken_bodies_stop_being_tracked() {
    let (mut session, _) = session();
    let boulder = session
        .create_boulder(BoulderOptions {
            kind: Some(BoulderKind::Mountain),
            position: Some(Vec2::new(600.0, 200.0)),
            max_hit_points: Some(10),
            ..BoulderOptions::default()
        })
        .unwrap();
    for _ in 0..10 {
        session.hit_boulder(boulder, 1).unwrap();
    }
    assert!(session.registry().get(boulder).is_none());
    let released = session.registry().len();

    for i in 0..50 {
        let pos = Vec2::new(150.0 + 15.0 * i as f32, 120.0);
        let id = stone_at(&mut session, Category::Small, pos);
        assert_eq!(session.registry().len(), released + 1);
        session.break_stone(id).unwrap();
        assert_eq!(session.registry().len(), released);
    }
}

#[test]
fn drifting_in_water_body_is_recovered() {
    let (mut session, _) = session();
    session.start_game();
    let geo = session.geometry();
    let id = stone_at(
        &mut session,
        Category::Medium,
        Vec2::new(600.0, geo.water_level + 5.0),
    );
    splash(&mut session, id);
    assert_eq!(session.registry().state(id), Some(BodyState::InWater));

    session
        .world_mut()
        .set_position(id, Vec2::new(-200.0, geo.water_level + 5.0));
    session.step(&TickInput::default());

    let pos = session.world().position(id).unwrap();
    assert!(pos.x >= geo.left_shore + 100.0 && pos.x <= geo.right_shore - 100.0);
    assert!((pos.y - (geo.water_level + 20.0)).abs() < 1e-3);
    assert!(session.world().velocity(id).unwrap().y < 0.0);
    assert_eq!(session.registry().state(id), Some(BodyState::InWater));
}
