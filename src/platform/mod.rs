//! Browser bindings
//!
//! The page owns the canvas and the animation loop; it calls `WasmGame::frame`
//! once per animation frame and draws from `bodies_json`. Presentation hooks
//! are plain JS functions looked up by name on a callbacks object, and sound
//! cues are synthesised here with WebAudio.

pub mod audio;

use glam::Vec2;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::physics::RapierWorld;
use crate::presentation::{NotificationKind, Presenter, SoundCue};
use crate::settings::GameConfig;
use crate::sim::{GameSession, ShiftDirection, UpgradeKey};

pub use audio::AudioManager;

/// `Presenter` that forwards to optional JS callbacks
struct JsPresenter {
    hooks: JsValue,
    audio: AudioManager,
}

impl JsPresenter {
    fn call(&self, name: &str, args: &[JsValue]) {
        let Ok(hook) = js_sys::Reflect::get(&self.hooks, &JsValue::from_str(name)) else {
            return;
        };
        let Some(hook) = hook.dyn_ref::<js_sys::Function>() else {
            return;
        };
        let args: js_sys::Array = args.iter().collect();
        if let Err(e) = hook.apply(&JsValue::NULL, &args) {
            log::warn!("{} hook threw: {:?}", name, e);
        }
    }
}

impl Presenter for JsPresenter {
    fn display_score(&mut self, score: u64) {
        self.call("displayScore", &[JsValue::from_f64(score as f64)]);
    }

    fn display_bridge_progress(&mut self, percent: u32) {
        self.call("displayBridgeProgress", &[JsValue::from(percent)]);
    }

    fn show_notification(&mut self, position: Vec2, text: &str, kind: NotificationKind) {
        self.call(
            "showNotification",
            &[
                JsValue::from_f64(position.x as f64),
                JsValue::from_f64(position.y as f64),
                JsValue::from_str(text),
                JsValue::from_str(kind.as_str()),
            ],
        );
    }

    fn play_sound(&mut self, cue: SoundCue, volume: Option<f32>, pitch: Option<f32>) {
        self.audio.play(cue, volume, pitch);
    }

    fn on_victory(&mut self, final_score: u64) {
        self.call("onVictory", &[JsValue::from_f64(final_score as f64)]);
    }

    fn display_currency(&mut self, currency: u64) {
        self.call("displayCurrency", &[JsValue::from_f64(currency as f64)]);
    }

    fn particle_burst(&mut self, position: Vec2, count: u32, color: u32) {
        self.call(
            "particleBurst",
            &[
                JsValue::from_f64(position.x as f64),
                JsValue::from_f64(position.y as f64),
                JsValue::from(count),
                JsValue::from_str(&format!("#{:06x}", color)),
            ],
        );
    }
}

fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Set up logging and panic reporting once the module loads
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"Logger already initialised".into());
    }
    log::info!("Stone Bridge loaded");
}

/// Game instance driven by the page
#[wasm_bindgen]
pub struct WasmGame {
    session: GameSession<RapierWorld>,
    last_time: Option<f64>,
}

#[wasm_bindgen]
impl WasmGame {
    /// Default configuration sized to the canvas
    #[wasm_bindgen(constructor)]
    pub fn new(width: f32, height: f32, seed: f64, hooks: JsValue) -> Result<WasmGame, JsValue> {
        let config = GameConfig {
            seed: seed as u64,
            ..GameConfig::with_viewport(width, height)
        };
        Self::build(config, hooks)
    }

    /// Configuration from JSON; missing keys keep their defaults
    #[wasm_bindgen(js_name = fromConfig)]
    pub fn from_config(json: &str, hooks: JsValue) -> Result<WasmGame, JsValue> {
        let config = GameConfig::from_json(json).map_err(to_js)?;
        Self::build(config, hooks)
    }

    fn build(config: GameConfig, hooks: JsValue) -> Result<WasmGame, JsValue> {
        let world = RapierWorld::new(config.gravity);
        let presenter = JsPresenter {
            hooks,
            audio: AudioManager::new(),
        };
        let session = GameSession::new(config, world, Box::new(presenter)).map_err(to_js)?;
        Ok(WasmGame {
            session,
            last_time: None,
        })
    }

    pub fn start(&mut self) -> bool {
        self.session.start_game()
    }

    pub fn pause(&mut self) -> bool {
        self.session.pause_game()
    }

    pub fn resume(&mut self) -> bool {
        self.last_time = None;
        self.session.resume_game()
    }

    pub fn restart(&mut self) {
        self.last_time = None;
        self.session.restart_game();
    }

    #[wasm_bindgen(js_name = spawnWave)]
    pub fn spawn_wave(&mut self) -> usize {
        self.session.spawn_stone_wave().len()
    }

    /// Click at canvas coordinates; true if something was hit
    pub fn click(&mut self, x: f32, y: f32) -> bool {
        self.session.click_at(Vec2::new(x, y)).is_some()
    }

    /// Shift the bridge; negative is left
    pub fn shift(&mut self, direction: i32) -> u32 {
        let direction = if direction < 0 {
            ShiftDirection::Left
        } else {
            ShiftDirection::Right
        };
        self.session.shift_bridge(direction).percent
    }

    /// Buy one level of an upgrade by catalog key
    pub fn purchase(&mut self, key: &str) -> Result<bool, JsValue> {
        let bought = self.session.purchase_upgrade_named(key).map_err(to_js)?;
        Ok(bought.is_some())
    }

    /// Cost of the next level, or -1 once maxed
    #[wasm_bindgen(js_name = upgradeCost)]
    pub fn upgrade_cost(&self, key: &str) -> Result<f64, JsValue> {
        let key: UpgradeKey = key.parse().map_err(to_js)?;
        Ok(self
            .session
            .economy()
            .next_cost(key)
            .map_or(-1.0, |c| c as f64))
    }

    /// Advance to `time` (ms, from requestAnimationFrame)
    pub fn frame(&mut self, time: f64) -> u32 {
        let dt = match self.last_time {
            Some(last) => ((time - last) / 1000.0) as f32,
            None => 0.0,
        };
        self.last_time = Some(time);
        self.session.advance(dt)
    }

    #[wasm_bindgen(js_name = bodiesJson)]
    pub fn bodies_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.session.body_views()).map_err(to_js)
    }

    #[wasm_bindgen(js_name = connectionsJson)]
    pub fn connections_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.session.bridge().connections()).map_err(to_js)
    }

    #[wasm_bindgen(js_name = snapshotJson)]
    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.session.snapshot()).map_err(to_js)
    }
}
