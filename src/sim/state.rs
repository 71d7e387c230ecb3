//! Game session and controller API
//!
//! `GameSession` owns everything one play session needs: the physics world,
//! the gameplay side-table, the bridge ledger, the economy, timers and the
//! seeded RNG. All mutation happens through `&mut self` on a single thread.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::body::{BodyRegistry, BodyState};
use super::bridge::{self, BridgeLedger, Completion, ShiftDirection};
use super::economy::{Economy, Purchase, UpgradeKey};
use super::effects::ActiveEffects;
use super::factory::{self, BoulderOptions, StoneOptions};
use super::fragment::{self, BreakCause, BreakOutcome, HitOutcome};
use super::tick::{TickInput, tick};
use super::timers::{IntervalTimer, Scheduler};
use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::error::GameResult;
use crate::physics::{BodyDesc, BodyId, CollisionStarted, PhysicsWorld, ShapeDesc};
use crate::presentation::{NotificationKind, Presenter, SoundCue};
use crate::settings::{GameConfig, Geometry};

/// Thickness of the off-screen walls and floor
const WALL_THICKNESS: f32 = 50.0;

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Created, first wave not spawned yet
    Ready,
    /// Stepping and timers active
    Running,
    /// Frozen; timers keep their position in the current interval
    Paused,
    /// Bridge complete; stepping stopped
    Victory,
}

/// One-shot work scheduled in simulation time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    /// Re-run the join check for a body that entered the water
    JoinCheck(BodyId),
    /// Bonus stone after a manual break
    SpawnStone,
}

/// Gameplay interval timers
#[derive(Debug, Clone)]
pub struct SessionTimers {
    pub auto_break: IntervalTimer,
    pub passive_income: IntervalTimer,
    pub spawner: IntervalTimer,
}

impl SessionTimers {
    fn new(config: &GameConfig) -> Self {
        Self {
            auto_break: IntervalTimer::disabled(),
            passive_income: IntervalTimer::every(config.passive_income_period_ms),
            spawner: IntervalTimer::every(config.spawner_period_ms),
        }
    }
}

/// What a click hit
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    Stone(BreakOutcome),
    Boulder(HitOutcome),
}

/// Serializable summary for HUDs and debugging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: GamePhase,
    pub sim_time: f32,
    pub score: u64,
    pub currency: u64,
    pub stones_broken: u64,
    pub upgrades: Vec<(UpgradeKey, u32)>,
    pub completion: Completion,
    pub floating: usize,
    pub in_water: usize,
    pub bridged: usize,
    pub boulders: usize,
    pub connections: usize,
}

/// Render view of one tracked body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyView {
    pub id: BodyId,
    /// Category name, or the boulder's display name
    pub label: String,
    pub state: BodyState,
    pub position: Vec2,
    pub angle: f32,
    /// Body-local outline; empty means draw a circle of `radius`
    pub outline: Vec<Vec2>,
    pub radius: f32,
    pub color: String,
    pub highlight: Option<String>,
    /// Boulders only
    pub health: Option<f32>,
    pub cracks: Option<u8>,
}

/// One play session
pub struct GameSession<W: PhysicsWorld> {
    pub(crate) config: GameConfig,
    pub(crate) geometry: Geometry,
    pub(crate) world: W,
    pub(crate) presenter: Box<dyn Presenter>,
    pub(crate) rng: Pcg32,
    pub(crate) registry: BodyRegistry,
    pub(crate) bridge: BridgeLedger,
    pub(crate) effects: ActiveEffects,
    pub(crate) economy: Economy,
    pub(crate) timers: SessionTimers,
    pub(crate) scheduler: Scheduler<Deferred>,
    phase: GamePhase,
    /// Simulation ticks since the session (re)started
    time_ticks: u64,
    accumulator: f32,
    next_id: u64,
    water_sensor: BodyId,
    boundaries: Vec<BodyId>,
}

impl<W: PhysicsWorld> GameSession<W> {
    /// Validate `config`, then build the shores, walls and water sensor
    pub fn new(config: GameConfig, world: W, presenter: Box<dyn Presenter>) -> GameResult<Self> {
        config.validate()?;
        let geometry = config.geometry();
        let mut session = Self {
            rng: Pcg32::seed_from_u64(config.seed),
            timers: SessionTimers::new(&config),
            config,
            geometry,
            world,
            presenter,
            registry: BodyRegistry::default(),
            bridge: BridgeLedger::default(),
            effects: ActiveEffects::default(),
            economy: Economy::new(),
            scheduler: Scheduler::default(),
            phase: GamePhase::Ready,
            time_ticks: 0,
            accumulator: 0.0,
            next_id: 1,
            water_sensor: BodyId(0),
            boundaries: Vec::new(),
        };
        session.build_static_world()?;
        log::info!(
            "Session ready: {}x{} viewport, water at {:.0}, shores at {:.0}/{:.0}, seed {}",
            geometry.width,
            geometry.height,
            geometry.water_level,
            geometry.left_shore,
            geometry.right_shore,
            session.config.seed
        );
        Ok(session)
    }

    fn build_static_world(&mut self) -> GameResult<()> {
        let geo = self.geometry;
        let below = geo.height - geo.water_level;
        let half = WALL_THICKNESS / 2.0;
        let rect = |hx: f32, hy: f32| ShapeDesc::Rect {
            half_extents: Vec2::new(hx, hy),
        };

        let statics = [
            // Shores
            BodyDesc::fixed(
                rect(geo.left_shore / 2.0, below / 2.0),
                Vec2::new(geo.left_shore / 2.0, geo.water_level + below / 2.0),
            ),
            BodyDesc::fixed(
                rect(geo.left_shore / 2.0, below / 2.0),
                Vec2::new(
                    geo.right_shore + geo.left_shore / 2.0,
                    geo.water_level + below / 2.0,
                ),
            ),
            // Walls and floor just outside the viewport
            BodyDesc::fixed(rect(half, geo.height), Vec2::new(-half, geo.height / 2.0)),
            BodyDesc::fixed(
                rect(half, geo.height),
                Vec2::new(geo.width + half, geo.height / 2.0),
            ),
            BodyDesc::fixed(
                rect(geo.width, half),
                Vec2::new(geo.width / 2.0, geo.height + half),
            ),
        ];
        for desc in statics {
            let id = self.next_entity_id();
            self.world.insert(id, &desc)?;
            self.boundaries.push(id);
        }

        let thickness = self.config.water_sensor_thickness;
        let sensor = BodyDesc {
            sensor: true,
            ..BodyDesc::fixed(
                rect(geo.width / 2.0, thickness / 2.0),
                Vec2::new(geo.width / 2.0, geo.water_level + thickness / 2.0),
            )
        };
        let id = self.next_entity_id();
        self.world.insert(id, &sensor)?;
        self.water_sensor = id;
        Ok(())
    }

    /// Allocate a fresh body id
    pub fn next_entity_id(&mut self) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        id
    }

    // === Accessors ===

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn registry(&self) -> &BodyRegistry {
        &self.registry
    }

    pub fn bridge(&self) -> &BridgeLedger {
        &self.bridge
    }

    pub fn effects(&self) -> &ActiveEffects {
        &self.effects
    }

    pub fn economy(&self) -> &Economy {
        &self.economy
    }

    pub fn economy_mut(&mut self) -> &mut Economy {
        &mut self.economy
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == GamePhase::Running
    }

    pub fn water_sensor(&self) -> BodyId {
        self.water_sensor
    }

    pub fn boundaries(&self) -> &[BodyId] {
        &self.boundaries
    }

    /// Seconds of simulated time since the session (re)started
    pub fn sim_time(&self) -> f32 {
        self.time_ticks as f32 * SIM_DT
    }

    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    pub(crate) fn advance_clock(&mut self) {
        self.time_ticks += 1;
    }

    /// Count of tracked bodies in `state`
    pub fn count_in(&self, state: BodyState) -> usize {
        self.registry.count(|t| t.state == state)
    }

    // === Lifecycle ===

    /// Ready -> Running, spawning the first wave
    pub fn start_game(&mut self) -> bool {
        if self.phase != GamePhase::Ready {
            log::debug!("start_game ignored in {:?}", self.phase);
            return false;
        }
        self.spawn_stone_wave();
        self.phase = GamePhase::Running;
        self.refresh_hud();
        log::info!("Game started");
        true
    }

    pub fn pause_game(&mut self) -> bool {
        if self.phase != GamePhase::Running {
            return false;
        }
        self.phase = GamePhase::Paused;
        log::info!("Game paused");
        true
    }

    pub fn resume_game(&mut self) -> bool {
        if self.phase != GamePhase::Paused {
            return false;
        }
        self.phase = GamePhase::Running;
        // A long pause must not turn into a burst of steps
        self.accumulator = 0.0;
        log::info!("Game resumed");
        true
    }

    /// Clear every tracked body and all per-session state, then start over
    pub fn restart_game(&mut self) {
        let ids: Vec<BodyId> = self.registry.iter().map(|t| t.id).collect();
        for id in ids {
            self.world.remove(id);
        }
        self.registry.clear();
        self.effects.clear();
        self.scheduler = Scheduler::default();
        self.bridge = BridgeLedger::default();
        self.economy.reset();
        self.timers = SessionTimers::new(&self.config);
        self.time_ticks = 0;
        self.accumulator = 0.0;

        self.spawn_stone_wave();
        self.phase = GamePhase::Running;
        self.refresh_hud();
        log::info!("Game restarted");
    }

    fn refresh_hud(&mut self) {
        self.presenter.display_score(self.economy.score);
        self.presenter.display_currency(self.economy.currency);
        self.presenter
            .display_bridge_progress(self.bridge.completion().percent);
    }

    pub(crate) fn declare_victory(&mut self) {
        self.phase = GamePhase::Victory;
        let score = self.economy.score;
        self.presenter.play_sound(SoundCue::Victory, None, None);
        self.presenter.on_victory(score);
        log::info!("Bridge complete! Final score {}", score);
    }

    /// Stop tracking a body that is gone from the world
    pub(crate) fn forget(&mut self, id: BodyId) {
        self.effects.remove(id);
        self.registry.retire(id, BodyState::Removed);
    }

    // === Spawning ===

    pub fn spawn_stone_wave(&mut self) -> Vec<BodyId> {
        factory::spawn_stone_wave(self)
    }

    pub fn create_stone(&mut self, options: StoneOptions) -> Option<BodyId> {
        factory::create_stone(self, options)
    }

    pub fn create_boulder(&mut self, options: BoulderOptions) -> Option<BodyId> {
        factory::create_boulder(self, options)
    }

    // === Player actions ===

    /// Manual break; may schedule a bonus stone
    pub fn break_stone(&mut self, id: BodyId) -> Option<BreakOutcome> {
        let outcome = fragment::break_stone(self, id, BreakCause::Manual)?;
        if self.rng.random_bool(self.config.bonus_spawn_chance) {
            let delay = self.config.bonus_spawn_delay_ms;
            self.scheduler.schedule(delay, Deferred::SpawnStone);
        }
        Some(outcome)
    }

    pub fn hit_boulder(&mut self, id: BodyId, damage: u32) -> Option<HitOutcome> {
        fragment::hit_boulder(self, id, damage)
    }

    /// Break one random eligible floating or in-water stone
    pub fn auto_break_once(&mut self) -> Option<BreakOutcome> {
        let eligible: Vec<BodyId> = self
            .registry
            .iter()
            .filter(|t| t.state.is_free() && !t.fragment && !t.is_boulder())
            .map(|t| t.id)
            .filter(|id| !self.world.is_fixed(*id))
            .collect();
        if eligible.is_empty() {
            return None;
        }
        let target = eligible[self.rng.random_range(0..eligible.len())];
        fragment::break_stone(self, target, BreakCause::Auto)
    }

    /// Hit-test a click and break or damage what it lands on
    pub fn click_at(&mut self, point: Vec2) -> Option<ClickOutcome> {
        if !self.is_running() {
            return None;
        }
        let target = self.pick_body(point)?;
        let is_boulder = self.registry.get(target)?.is_boulder();
        if is_boulder {
            let damage = self.economy.click_power();
            self.hit_boulder(target, damage).map(ClickOutcome::Boulder)
        } else {
            self.break_stone(target).map(ClickOutcome::Stone)
        }
    }

    /// Closest free body under `point`, else within the click radius of it
    fn pick_body(&self, point: Vec2) -> Option<BodyId> {
        let closest = |ids: Vec<BodyId>| {
            ids.into_iter()
                .filter_map(|id| self.world.position(id).map(|p| (id, p.distance(point))))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(id, _)| id)
        };
        let is_free = |id: &BodyId| self.registry.state(*id).is_some_and(|s| s.is_free());

        let exact: Vec<BodyId> = self
            .world
            .bodies_at_point(point)
            .into_iter()
            .filter(is_free)
            .collect();
        if !exact.is_empty() {
            return closest(exact);
        }

        let radius = self.config.click_radius;
        let near: Vec<BodyId> = self
            .registry
            .iter()
            .filter(|t| t.state.is_free())
            .filter_map(|t| {
                let pos = self.world.position(t.id)?;
                let extent = self.world.extent(t.id).unwrap_or(t.size);
                (pos.distance(point) < extent / 2.0 + radius).then_some(t.id)
            })
            .collect();
        closest(near)
    }

    pub fn purchase_upgrade(&mut self, key: UpgradeKey) -> Option<Purchase> {
        let Some(purchase) = self.economy.purchase(key) else {
            log::debug!(
                "Cannot buy {} (have {}, need {:?})",
                key.as_str(),
                self.economy.currency,
                self.economy.next_cost(key)
            );
            return None;
        };
        if key == UpgradeKey::AutoBreakSpeed {
            let period = self.economy.auto_break_period_ms();
            self.timers.auto_break.set_period(period);
        }
        let spec = key.spec();
        self.presenter.play_sound(SoundCue::Upgrade, None, None);
        self.presenter.display_currency(self.economy.currency);
        self.presenter.show_notification(
            Vec2::new(self.geometry.width / 2.0, self.geometry.height / 3.0),
            &format!("{} level {}", spec.name, purchase.new_level),
            NotificationKind::Info,
        );
        log::info!(
            "Bought {} level {} for {}",
            key.as_str(),
            purchase.new_level,
            purchase.cost
        );
        Some(purchase)
    }

    /// String-keyed purchase for foreign callers
    pub fn purchase_upgrade_named(&mut self, key: &str) -> GameResult<Option<Purchase>> {
        let key: UpgradeKey = key.parse()?;
        Ok(self.purchase_upgrade(key))
    }

    pub fn shift_bridge(&mut self, direction: ShiftDirection) -> Completion {
        bridge::shift_bridge(self, direction)
    }

    /// Recompute completion from the bridged positions
    pub fn recompute_completion(&mut self) -> Completion {
        bridge::recompute_completion(self)
    }

    pub fn bridge_completion(&self) -> Completion {
        self.bridge.completion()
    }

    /// Feed one physics contact into the water/bridge rules
    pub fn handle_collision(&mut self, contact: CollisionStarted) {
        bridge::handle_contact(self, contact);
    }

    // === Time ===

    /// Run one fixed step with `input`; no-op unless running
    pub fn step(&mut self, input: &TickInput) {
        tick(self, input);
    }

    /// Advance by a frame's worth of real time, stepping at the fixed rate.
    /// Returns the number of steps taken.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        if !self.is_running() {
            return 0;
        }
        self.accumulator += frame_dt.clamp(0.0, 0.1);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            tick(self, &TickInput::default());
            self.accumulator -= SIM_DT;
            substeps += 1;
            if !self.is_running() {
                self.accumulator = 0.0;
                break;
            }
        }
        substeps
    }

    /// Live bodies for drawing, in id order
    pub fn body_views(&self) -> Vec<BodyView> {
        self.registry
            .iter()
            .filter(|t| t.state.is_free() || t.state == BodyState::PartOfBridge)
            .filter_map(|t| {
                let position = self.world.position(t.id)?;
                let label = match (t.category(), t.boulder()) {
                    (Some(category), _) => category.as_str().to_string(),
                    (None, Some(record)) => record.kind.traits().name.to_string(),
                    (None, None) => String::new(),
                };
                Some(BodyView {
                    id: t.id,
                    label,
                    state: t.state,
                    position,
                    angle: self.world.angle(t.id).unwrap_or(0.0),
                    outline: t.outline.clone(),
                    radius: t.size / 2.0,
                    color: t.color.to_css(),
                    highlight: t.highlight.map(|c| c.to_css()),
                    health: t.boulder().map(|b| b.health_fraction()),
                    cracks: t.boulder().map(|b| b.cracks),
                })
            })
            .collect()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            sim_time: self.sim_time(),
            score: self.economy.score,
            currency: self.economy.currency,
            stones_broken: self.economy.stones_broken,
            upgrades: self.economy.levels(),
            completion: self.bridge.completion(),
            floating: self.count_in(BodyState::Floating),
            in_water: self.count_in(BodyState::InWater),
            bridged: self.count_in(BodyState::PartOfBridge),
            boulders: self
                .registry
                .count(|t| t.is_boulder() && t.state.is_free()),
            connections: self.bridge.connections().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::RapierWorld;
    use crate::presentation::{NullPresenter, PresenterCall, RecordingPresenter};
    use crate::sim::body::Category;

    fn session() -> GameSession<RapierWorld> {
        GameSession::new(
            GameConfig::default(),
            RapierWorld::new(400.0),
            Box::new(NullPresenter),
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let config = GameConfig {
            bin_width: 0.0,
            ..GameConfig::default()
        };
        let result = GameSession::new(config, RapierWorld::new(400.0), Box::new(NullPresenter));
        assert!(result.is_err());
    }

    #[test]
    fn test_static_world_is_untracked() {
        let session = session();
        assert_eq!(session.boundaries().len(), 5);
        assert!(session.world().contains(session.water_sensor()));
        assert!(session.registry().is_empty());
        assert_eq!(session.phase(), GamePhase::Ready);
    }

    #[test]
    fn test_phase_transitions() {
        let mut session = session();
        assert!(!session.pause_game());
        assert!(session.start_game());
        assert!(!session.start_game());
        assert!(!session.registry().is_empty());

        assert!(session.pause_game());
        assert_eq!(session.advance(0.05), 0);
        assert!(!session.pause_game());
        assert!(session.resume_game());
        assert!(session.is_running());
    }

    #[test]
    fn test_advance_uses_fixed_steps() {
        let mut session = session();
        session.start_game();
        // 0.06s at 60 Hz is three steps, remainder carried
        assert_eq!(session.advance(0.06), 3);
        assert_eq!(session.time_ticks(), 3);
        // Huge frames are clamped
        let steps = session.advance(5.0);
        assert!(steps <= MAX_SUBSTEPS);
    }

    #[test]
    fn test_paused_timers_do_not_run() {
        let mut session = session();
        session.start_game();
        session.economy.currency = 1_000;
        session.purchase_upgrade(UpgradeKey::PassiveIncome).unwrap();
        session.pause_game();
        for _ in 0..100 {
            session.advance(0.1);
        }
        assert_eq!(session.economy().score, 0);
        assert_eq!(session.time_ticks(), 0);
    }

    #[test]
    fn test_auto_break_skips_fragments_and_boulders() {
        let mut session = session();
        session
            .create_stone(StoneOptions::new(Category::Small).fragment())
            .unwrap();
        session.create_boulder(BoulderOptions::default()).unwrap();
        assert!(session.auto_break_once().is_none());

        let stone = session.create_stone(StoneOptions::new(Category::Medium)).unwrap();
        let outcome = session.auto_break_once().unwrap();
        assert!(!outcome.critical);
        assert_eq!(session.registry().state(stone), None);
    }

    #[test]
    fn test_click_breaks_stone_under_cursor() {
        let mut session = session();
        session.start_game();
        let id = session
            .create_stone(StoneOptions::new(Category::Large).at(Vec2::new(600.0, 150.0)))
            .unwrap();
        // Wave stones may overlap; clear them out of the way
        let others: Vec<BodyId> = session
            .registry()
            .iter()
            .map(|t| t.id)
            .filter(|other| *other != id)
            .collect();
        for other in others {
            session.world_mut().remove(other);
            session.forget(other);
        }

        let outcome = session.click_at(Vec2::new(600.0, 150.0));
        assert!(matches!(outcome, Some(ClickOutcome::Stone(_))));
        assert_eq!(session.registry().state(id), None);
        // Nothing left to hit far away from everything
        assert!(session.click_at(Vec2::new(5.0, 5.0)).is_none());
    }

    #[test]
    fn test_purchase_reports_to_presenter() {
        let presenter = RecordingPresenter::new();
        let mut session = GameSession::new(
            GameConfig::default(),
            RapierWorld::new(400.0),
            Box::new(presenter.clone()),
        )
        .unwrap();
        assert!(session.purchase_upgrade(UpgradeKey::ClickPower).is_none());
        assert!(presenter.sounds().is_empty());

        session.economy.currency = 25;
        session.purchase_upgrade(UpgradeKey::AutoBreakSpeed).unwrap();
        assert_eq!(presenter.sounds(), vec![SoundCue::Upgrade]);
        assert!(presenter.calls().contains(&PresenterCall::Currency(0)));
        assert_eq!(session.timers.auto_break.period_ms(), Some(5000.0));
    }

    #[test]
    fn test_named_purchase_rejects_unknown_key() {
        let mut session = session();
        assert!(session.purchase_upgrade_named("moonBoots").is_err());
        assert_eq!(session.purchase_upgrade_named("shardBoost").unwrap(), None);
    }
}
