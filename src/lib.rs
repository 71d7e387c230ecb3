//! Stone Bridge - break floating stones and build a bridge across the water
//!
//! Core modules:
//! - `sim`: Gameplay rules (stone lifecycle, bridge assembly, economy)
//! - `physics`: Physics world port and its rapier2d backend
//! - `presentation`: Port the core reports score, sounds and notifications to
//! - `settings`: Data-driven game configuration
//! - `platform`: Browser bindings (wasm32 only)

pub mod error;
pub mod physics;
pub mod presentation;
pub mod settings;
pub mod sim;

#[cfg(target_arch = "wasm32")]
pub mod platform;

pub use error::{GameError, GameResult};
pub use settings::GameConfig;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Per-frame velocities in the break tables are scaled by this to get px/s
    pub const FRAME_RATE: f32 = 60.0;

    /// Stock viewport
    pub const DEFAULT_WIDTH: f32 = 1200.0;
    pub const DEFAULT_HEIGHT: f32 = 800.0;
}
