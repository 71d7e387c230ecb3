//! Presentation port
//!
//! The session reports score, progress, notifications and sound cues through
//! `Presenter`. The browser front end implements it over JS callbacks; the
//! native binary logs; tests record.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Named sound cues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundCue {
    /// Body entered the water
    Splash,
    /// Stone shattered by a click
    StoneBreak,
    /// Bridge completion went up
    BridgeProgress,
    Victory,
    /// Boulder took a hit
    HeavyImpact,
    BoulderBreak,
    DemonicRoar,
    DivineBreak,
    /// Upgrade bought
    Upgrade,
}

impl SoundCue {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundCue::Splash => "splash",
            SoundCue::StoneBreak => "stoneBreak",
            SoundCue::BridgeProgress => "bridgeProgress",
            SoundCue::Victory => "victory",
            SoundCue::HeavyImpact => "heavyImpact",
            SoundCue::BoulderBreak => "boulderBreak",
            SoundCue::DemonicRoar => "demonicRoar",
            SoundCue::DivineBreak => "divineBreak",
            SoundCue::Upgrade => "upgrade",
        }
    }
}

/// Styling hint for floating notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Score,
    Currency,
    Critical,
    Boulder,
    Info,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Score => "score",
            NotificationKind::Currency => "currency",
            NotificationKind::Critical => "critical",
            NotificationKind::Boulder => "boulder",
            NotificationKind::Info => "info",
        }
    }
}

/// Observer the session reports to
pub trait Presenter {
    fn display_score(&mut self, score: u64);
    fn display_bridge_progress(&mut self, percent: u32);
    fn show_notification(&mut self, position: Vec2, text: &str, kind: NotificationKind);
    fn play_sound(&mut self, cue: SoundCue, volume: Option<f32>, pitch: Option<f32>);
    fn on_victory(&mut self, final_score: u64);

    /// Shard balance changed
    fn display_currency(&mut self, _currency: u64) {}

    /// Cosmetic debris burst
    fn particle_burst(&mut self, _position: Vec2, _count: u32, _color: u32) {}
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn display_score(&mut self, _score: u64) {}
    fn display_bridge_progress(&mut self, _percent: u32) {}
    fn show_notification(&mut self, _position: Vec2, _text: &str, _kind: NotificationKind) {}
    fn play_sound(&mut self, _cue: SoundCue, _volume: Option<f32>, _pitch: Option<f32>) {}
    fn on_victory(&mut self, _final_score: u64) {}
}

/// Writes presentation events to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn display_score(&mut self, score: u64) {
        log::debug!("score: {}", score);
    }

    fn display_bridge_progress(&mut self, percent: u32) {
        log::info!("bridge: {}%", percent);
    }

    fn show_notification(&mut self, position: Vec2, text: &str, kind: NotificationKind) {
        log::debug!(
            "[{}] {} at ({:.0}, {:.0})",
            kind.as_str(),
            text,
            position.x,
            position.y
        );
    }

    fn play_sound(&mut self, cue: SoundCue, _volume: Option<f32>, _pitch: Option<f32>) {
        log::trace!("sound: {}", cue.as_str());
    }

    fn on_victory(&mut self, final_score: u64) {
        log::info!("Victory! Final score: {}", final_score);
    }

    fn display_currency(&mut self, currency: u64) {
        log::debug!("shards: {}", currency);
    }
}

/// One recorded presenter call
#[derive(Debug, Clone, PartialEq)]
pub enum PresenterCall {
    Score(u64),
    BridgeProgress(u32),
    Currency(u64),
    Notification { text: String, kind: NotificationKind },
    Sound(SoundCue),
    Victory(u64),
    Particles(u32),
}

/// Shares every call with a log the caller keeps a handle to
#[derive(Debug, Default, Clone)]
pub struct RecordingPresenter {
    calls: Rc<RefCell<Vec<PresenterCall>>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the calls seen so far
    pub fn calls(&self) -> Vec<PresenterCall> {
        self.calls.borrow().clone()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn count(&self, pred: impl Fn(&PresenterCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    pub fn sounds(&self) -> Vec<SoundCue> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                PresenterCall::Sound(cue) => Some(*cue),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: PresenterCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl Presenter for RecordingPresenter {
    fn display_score(&mut self, score: u64) {
        self.push(PresenterCall::Score(score));
    }

    fn display_bridge_progress(&mut self, percent: u32) {
        self.push(PresenterCall::BridgeProgress(percent));
    }

    fn show_notification(&mut self, _position: Vec2, text: &str, kind: NotificationKind) {
        self.push(PresenterCall::Notification {
            text: text.to_string(),
            kind,
        });
    }

    fn play_sound(&mut self, cue: SoundCue, _volume: Option<f32>, _pitch: Option<f32>) {
        self.push(PresenterCall::Sound(cue));
    }

    fn on_victory(&mut self, final_score: u64) {
        self.push(PresenterCall::Victory(final_score));
    }

    fn display_currency(&mut self, currency: u64) {
        self.push(PresenterCall::Currency(currency));
    }

    fn particle_burst(&mut self, _position: Vec2, count: u32, _color: u32) {
        self.push(PresenterCall::Particles(count));
    }
}
