//! Stone Bridge entry point
//!
//! The browser build is driven from JS through `platform::WasmGame`. Natively
//! this runs a headless autoplay session: it clicks the nearest free stone
//! every half second, buys whatever it can afford and logs the outcome.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Stone Bridge (native, headless) starting...");

    if let Err(e) = headless::run(std::env::args().nth(1)) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is platform::start, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use glam::Vec2;

    use stone_bridge::GameResult;
    use stone_bridge::consts::SIM_DT;
    use stone_bridge::physics::RapierWorld;
    use stone_bridge::presentation::LogPresenter;
    use stone_bridge::settings::GameConfig;
    use stone_bridge::sim::{BodyState, GamePhase, GameSession, TickInput, UpgradeKey};

    /// Simulated seconds before giving up
    const MAX_SECONDS: f32 = 600.0;
    /// Steps between autoplay clicks
    const CLICK_EVERY: u64 = 30;

    pub fn run(config_path: Option<String>) -> GameResult<()> {
        let config = match config_path {
            Some(path) => GameConfig::from_file(path)?,
            None => GameConfig::default(),
        };
        let world = RapierWorld::new(config.gravity);
        let mut session = GameSession::new(config, world, Box::new(LogPresenter))?;
        session.start_game();

        let max_steps = (MAX_SECONDS / SIM_DT) as u64;
        for step in 0..max_steps {
            let mut input = TickInput::default();
            if step % CLICK_EVERY == 0 {
                input.click = pick_target(&session);
                for key in UpgradeKey::ALL {
                    session.purchase_upgrade(key);
                }
            }
            session.step(&input);
            if session.phase() == GamePhase::Victory {
                break;
            }
        }

        let snapshot = session.snapshot();
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => println!("{}", json),
            Err(e) => log::warn!("Could not serialise snapshot: {}", e),
        }
        log::info!(
            "Finished after {:.1}s: {:?}, bridge at {}%",
            snapshot.sim_time,
            snapshot.phase,
            snapshot.completion.percent
        );
        Ok(())
    }

    /// Floating stone closest to the middle of the gap
    fn pick_target(session: &GameSession<RapierWorld>) -> Option<Vec2> {
        let geo = session.geometry();
        let aim = Vec2::new(geo.width / 2.0, geo.water_level);
        session
            .body_views()
            .into_iter()
            .filter(|b| b.state == BodyState::Floating)
            .map(|b| b.position)
            .min_by(|a, b| a.distance(aim).total_cmp(&b.distance(aim)))
    }
}
