//! Game configuration
//!
//! Every tunable threshold of the water/bridge rules, the spawner and the
//! timers lives here. Missing JSON keys keep their defaults.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::error::{GameError, GameResult};

/// Tunable game configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// RNG seed for the session
    pub seed: u64,

    // === Viewport ===
    pub viewport_width: f32,
    pub viewport_height: f32,
    /// Water surface as a fraction of viewport height (from the top)
    pub water_level_fraction: f32,
    /// Shore width as a fraction of viewport width
    pub shore_fraction: f32,
    /// Downward acceleration for falling fragments (px/s²)
    pub gravity: f32,

    // === Water ===
    /// Height of the water-surface sensor
    pub water_sensor_thickness: f32,
    /// Buoyancy spring target below the water line
    pub buoyancy_target_depth: f32,
    /// Buoyancy spring strength (px/s² per px of depth error)
    pub buoyancy_gain: f32,
    /// Per-step velocity damping while floating in water
    pub water_horizontal_damping: f32,
    pub water_vertical_damping: f32,
    /// Density multiplier applied on water entry
    pub buoyancy_density_factor: f32,
    /// Upward speed given on water entry and on recovery (px/s)
    pub water_entry_kick: f32,
    /// Darkening applied to a stone's colour when it gets wet (percent)
    pub water_tint_percent: u8,

    // === Bridge ===
    /// Distance from a shore within which a body joins on its own
    pub shallow_margin: f32,
    /// Distance to an existing part within which a body joins
    pub join_radius: f32,
    /// Maximum |y - water level| for a join check to proceed
    pub join_vertical_tolerance: f32,
    /// Delay of the follow-up join check after water entry
    pub join_check_delay_ms: f64,
    /// Depth below the water line bridged bodies are pinned to
    pub bridge_snap_depth: f32,
    /// Completion bin width
    pub bin_width: f32,
    /// Required occupied span as a fraction of the bridge width
    pub completion_span_ratio: f32,
    /// Completion percent that wins the game
    pub victory_threshold: u32,
    /// Horizontal translation applied by one shift input
    pub shift_delta: f32,

    // === World bounds ===
    /// How far outside the viewport a body may drift before it is culled
    pub off_bounds_tolerance: f32,

    // === Spawning ===
    pub spawner_period_ms: f64,
    /// Spawner only runs while fewer free stones than this exist
    pub spawner_floating_cap: usize,
    /// Spawner stops once completion reaches this percent
    pub spawner_progress_cap: u32,
    pub boulders_enabled: bool,
    /// Chance of an extra stone after a manual break
    pub bonus_spawn_chance: f64,
    pub bonus_spawn_delay_ms: f64,

    // === Economy ===
    pub passive_income_period_ms: f64,

    // === Input ===
    /// Fallback search radius when a click misses every shape
    pub click_radius: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 42,

            viewport_width: DEFAULT_WIDTH,
            viewport_height: DEFAULT_HEIGHT,
            water_level_fraction: 0.7,
            shore_fraction: 0.08,
            gravity: 400.0,

            water_sensor_thickness: 40.0,
            buoyancy_target_depth: 10.0,
            buoyancy_gain: 3.0,
            water_horizontal_damping: 0.98,
            water_vertical_damping: 0.95,
            buoyancy_density_factor: 0.3,
            water_entry_kick: 60.0,
            water_tint_percent: 20,

            shallow_margin: 40.0,
            join_radius: 50.0,
            join_vertical_tolerance: 50.0,
            join_check_delay_ms: 500.0,
            bridge_snap_depth: 10.0,
            bin_width: 10.0,
            completion_span_ratio: 0.8,
            victory_threshold: 90,
            shift_delta: 5.0,

            off_bounds_tolerance: 50.0,

            spawner_period_ms: 3000.0,
            spawner_floating_cap: 8,
            spawner_progress_cap: 90,
            boulders_enabled: true,
            bonus_spawn_chance: 0.3,
            bonus_spawn_delay_ms: 2000.0,

            passive_income_period_ms: 1000.0,

            click_radius: 15.0,
        }
    }
}

/// World geometry derived from the configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub width: f32,
    pub height: f32,
    pub water_level: f32,
    pub left_shore: f32,
    pub right_shore: f32,
}

impl Geometry {
    /// Horizontal distance the bridge must cover
    pub fn bridge_width(&self) -> f32 {
        self.right_shore - self.left_shore
    }

    /// Whether `p` lies inside the viewport grown by `margin` on every side
    pub fn contains(&self, p: Vec2, margin: f32) -> bool {
        p.x >= -margin && p.x <= self.width + margin && p.y >= -margin && p.y <= self.height + margin
    }
}

impl GameConfig {
    /// Config for a viewport of the given size, defaults elsewhere
    pub fn with_viewport(width: f32, height: f32) -> Self {
        Self {
            viewport_width: width,
            viewport_height: height,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> GameResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file (native only)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> GameResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn geometry(&self) -> Geometry {
        let left_shore = self.viewport_width * self.shore_fraction;
        Geometry {
            width: self.viewport_width,
            height: self.viewport_height,
            water_level: self.viewport_height * self.water_level_fraction,
            left_shore,
            right_shore: self.viewport_width - left_shore,
        }
    }

    /// Reject configurations the session cannot run with
    pub fn validate(&self) -> GameResult<()> {
        fn positive(field: &'static str, value: f32) -> GameResult<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(GameError::config(field, format!("must be positive, got {value}")))
            }
        }

        positive("viewport_width", self.viewport_width)?;
        positive("viewport_height", self.viewport_height)?;
        positive("bin_width", self.bin_width)?;
        positive("water_sensor_thickness", self.water_sensor_thickness)?;
        positive("join_radius", self.join_radius)?;
        positive("join_vertical_tolerance", self.join_vertical_tolerance)?;

        if !(self.water_level_fraction > 0.0 && self.water_level_fraction < 1.0) {
            return Err(GameError::config(
                "water_level_fraction",
                "water level must lie inside the viewport",
            ));
        }
        if !(self.shore_fraction >= 0.0 && self.shore_fraction < 0.5) {
            return Err(GameError::config(
                "shore_fraction",
                "left shore must lie left of the right shore",
            ));
        }
        if !(self.completion_span_ratio > 0.0 && self.completion_span_ratio <= 1.0) {
            return Err(GameError::config(
                "completion_span_ratio",
                "must be in (0, 1]",
            ));
        }
        if self.victory_threshold == 0 || self.victory_threshold > 100 {
            return Err(GameError::config(
                "victory_threshold",
                "must be in 1..=100",
            ));
        }
        if !(0.0..=1.0).contains(&self.bonus_spawn_chance) {
            return Err(GameError::config("bonus_spawn_chance", "must be in [0, 1]"));
        }
        for (field, period) in [
            ("spawner_period_ms", self.spawner_period_ms),
            ("passive_income_period_ms", self.passive_income_period_ms),
        ] {
            if !(period.is_finite() && period > 0.0) {
                return Err(GameError::config(field, "period must be positive"));
            }
        }
        if self.water_tint_percent > 100 {
            return Err(GameError::config("water_tint_percent", "must be at most 100"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn test_geometry_derivation() {
        let geo = GameConfig::with_viewport(1000.0, 500.0).geometry();
        assert_eq!(geo.water_level, 350.0);
        assert_eq!(geo.left_shore, 80.0);
        assert_eq!(geo.right_shore, 920.0);
        assert_eq!(geo.bridge_width(), 840.0);
    }

    #[test]
    fn test_from_json_keeps_defaults() {
        let config = GameConfig::from_json(r#"{ "seed": 7, "join_radius": 60.0 }"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.join_radius, 60.0);
        assert_eq!(config.bin_width, 10.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad = GameConfig {
            bin_width: 0.0,
            ..GameConfig::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(GameError::Config { field: "bin_width", .. })
        ));

        let bad = GameConfig {
            shore_fraction: 0.6,
            ..GameConfig::default()
        };
        assert!(bad.validate().is_err());

        assert!(GameConfig::from_json(r#"{ "water_level_fraction": 1.5 }"#).is_err());
        assert!(GameConfig::from_json("{").is_err());
    }

    #[test]
    fn test_contains_with_margin() {
        let geo = GameConfig::default().geometry();
        assert!(geo.contains(Vec2::new(-10.0, 10.0), 50.0));
        assert!(!geo.contains(Vec2::new(-60.0, 10.0), 50.0));
        assert!(!geo.contains(Vec2::new(10.0, geo.height + 51.0), 50.0));
    }
}
