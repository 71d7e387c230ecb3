//! Gameplay simulation
//!
//! All gameplay rules live here, on top of a `PhysicsWorld`:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by body id)
//! - No rendering or platform dependencies

pub mod body;
pub mod bridge;
pub mod economy;
pub mod effects;
pub mod factory;
pub mod fragment;
pub mod shape;
pub mod state;
pub mod tick;
pub mod timers;

pub use body::{
    BodyKind, BodyRegistry, BodyState, BodyTag, BoulderKind, BoulderRecord, Category, Rgb,
    SpecialKind,
};
pub use bridge::{BridgeLedger, Completion, Connection, ShiftDirection, compute_completion};
pub use economy::{Economy, Purchase, UpgradeKey, UpgradeSpec};
pub use factory::{BoulderOptions, StoneOptions};
pub use fragment::{
    BreakCause, BreakOutcome, HitOutcome, Rewards, boulder_stone_count, plan_fragments, stone_rewards,
};
pub use shape::{OutlineStyle, ShapeArchetype, generate_outline, generate_shape};
pub use state::{BodyView, ClickOutcome, GamePhase, GameSession, SessionSnapshot};
pub use tick::{TickInput, tick};
pub use timers::{IntervalTimer, Scheduler};
