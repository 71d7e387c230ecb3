//! Audio system using Web Audio API
//!
//! Procedurally generated sound cues - no external files needed!

use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

use crate::presentation::SoundCue;

/// One enveloped oscillator voice
struct Voice {
    freq: f32,
    /// Exponential glide target, if any
    glide_to: Option<f32>,
    wave: OscillatorType,
    gain: f32,
    /// Start offset from now (s)
    delay: f64,
    duration: f64,
}

impl Voice {
    fn new(freq: f32, wave: OscillatorType, gain: f32, duration: f64) -> Self {
        Self {
            freq,
            glide_to: None,
            wave,
            gain,
            delay: 0.0,
            duration,
        }
    }

    fn glide(mut self, to: f32) -> Self {
        self.glide_to = Some(to);
        self
    }

    fn after(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }
}

/// Audio manager for the game
pub struct AudioManager {
    ctx: Option<AudioContext>,
    master_volume: f32,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        // Try to create audio context (may fail if not in secure context)
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            master_volume: 0.8,
        }
    }

    /// Play a cue at an optional volume and pitch factor
    pub fn play(&self, cue: SoundCue, volume: Option<f32>, pitch: Option<f32>) {
        let vol = self.master_volume * volume.unwrap_or(1.0).clamp(0.0, 1.0);
        if vol <= 0.0 {
            return;
        }
        let Some(ctx) = &self.ctx else { return };

        // Resume context if suspended (browsers require user gesture)
        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        let pitch = pitch.unwrap_or(1.0).clamp(0.25, 4.0);
        for voice in Self::voices(cue) {
            self.play_voice(ctx, &voice, vol, pitch);
        }
    }

    fn voices(cue: SoundCue) -> Vec<Voice> {
        use OscillatorType::{Sawtooth, Sine, Square, Triangle};
        match cue {
            // Falling whoosh over a low plop
            SoundCue::Splash => vec![
                Voice::new(900.0, Triangle, 0.25, 0.3).glide(150.0),
                Voice::new(120.0, Sine, 0.3, 0.2).glide(60.0),
            ],
            // Short crack and gritty tail
            SoundCue::StoneBreak => vec![
                Voice::new(220.0, Square, 0.3, 0.12).glide(70.0),
                Voice::new(1800.0, Sawtooth, 0.1, 0.08).glide(400.0),
            ],
            SoundCue::BridgeProgress => vec![
                Voice::new(523.25, Sine, 0.25, 0.2),
                Voice::new(659.25, Sine, 0.25, 0.3).after(0.1),
            ],
            SoundCue::Victory => [523.25, 659.25, 783.99, 1046.5]
                .into_iter()
                .enumerate()
                .map(|(i, f)| Voice::new(f, Triangle, 0.3, 0.4).after(i as f64 * 0.12))
                .collect(),
            SoundCue::HeavyImpact => vec![
                Voice::new(90.0, Sine, 0.5, 0.25).glide(40.0),
                Voice::new(160.0, Square, 0.15, 0.1),
            ],
            SoundCue::BoulderBreak => vec![
                Voice::new(100.0, Sawtooth, 0.5, 0.5).glide(30.0),
                Voice::new(1500.0, Square, 0.2, 0.12),
            ],
            // Two detuned saws sliding down
            SoundCue::DemonicRoar => vec![
                Voice::new(110.0, Sawtooth, 0.4, 0.9).glide(45.0),
                Voice::new(116.0, Sawtooth, 0.3, 0.9).glide(48.0),
                Voice::new(55.0, Sine, 0.4, 0.9),
            ],
            // Bell partials with a long decay
            SoundCue::DivineBreak => vec![
                Voice::new(880.0, Sine, 0.3, 1.2),
                Voice::new(1320.0, Sine, 0.2, 1.0),
                Voice::new(1760.0, Sine, 0.12, 0.8),
                Voice::new(440.0, Triangle, 0.2, 1.2).after(0.05),
            ],
            SoundCue::Upgrade => vec![
                Voice::new(400.0, Triangle, 0.3, 0.15).glide(800.0),
                Voice::new(800.0, Sine, 0.2, 0.2).after(0.1),
            ],
        }
    }

    // === Sound generators ===

    /// Create an oscillator with gain envelope
    fn create_osc(
        &self,
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
    ) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((osc, gain))
    }

    fn play_voice(&self, ctx: &AudioContext, voice: &Voice, vol: f32, pitch: f32) {
        let Some((osc, gain)) = self.create_osc(ctx, voice.freq * pitch, voice.wave) else {
            return;
        };
        let t = ctx.current_time() + voice.delay;
        let end = t + voice.duration;

        gain.gain().set_value_at_time(0.0, ctx.current_time()).ok();
        gain.gain().set_value_at_time(vol * voice.gain, t).ok();
        gain.gain().exponential_ramp_to_value_at_time(0.01, end).ok();

        osc.frequency().set_value_at_time(voice.freq * pitch, t).ok();
        if let Some(to) = voice.glide_to {
            osc.frequency()
                .exponential_ramp_to_value_at_time(to * pitch, end)
                .ok();
        }

        osc.start_with_when(t).ok();
        osc.stop_with_when(end + 0.05).ok();
    }
}
