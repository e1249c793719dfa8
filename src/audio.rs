//! Audio system using Web Audio API
//!
//! Procedurally generated cues, no sample files. Each cue is a short list of
//! enveloped oscillator tones.

use web_sys::OscillatorType::{Sawtooth, Sine, Square, Triangle};
use web_sys::{AudioContext, AudioContextState, GainNode, OscillatorNode, OscillatorType};

use crate::Settings;
use crate::hooks::{AudioCue, AudioSink};

/// One enveloped oscillator
#[derive(Debug, Clone, Copy)]
struct Tone {
    wave: OscillatorType,
    /// Start and end frequency (Hz); equal for a flat pitch
    freq: (f32, f32),
    /// Peak gain relative to the effect volume
    level: f32,
    /// Seconds after the cue starts
    delay: f64,
    /// Decay time (seconds)
    length: f64,
}

const fn tone(wave: OscillatorType, freq: (f32, f32), level: f32, delay: f64, length: f64) -> Tone {
    Tone {
        wave,
        freq,
        level,
        delay,
        length,
    }
}

/// Short, quiet tick; fires several times a second
const SHOT: &[Tone] = &[tone(Square, (900.0, 500.0), 0.05, 0.0, 0.04)];

const ENEMY_DOWN: &[Tone] = &[
    tone(Sawtooth, (220.0, 60.0), 0.35, 0.0, 0.18),
    tone(Square, (1200.0, 400.0), 0.1, 0.0, 0.06),
];

const BARREL_BURST: &[Tone] = &[
    tone(Sawtooth, (100.0, 30.0), 0.5, 0.0, 0.3),
    tone(Sine, (40.0, 40.0), 0.35, 0.0, 0.15),
];

const COIN_PICKUP: &[Tone] = &[
    tone(Sine, (988.0, 988.0), 0.25, 0.0, 0.08),
    tone(Sine, (1319.0, 1319.0), 0.25, 0.07, 0.2),
];

const WEAPON_UP: &[Tone] = &[
    tone(Triangle, (400.0, 400.0), 0.3, 0.0, 0.12),
    tone(Triangle, (600.0, 600.0), 0.3, 0.08, 0.12),
    tone(Triangle, (800.0, 800.0), 0.3, 0.16, 0.25),
];

const WEAPON_DOWN: &[Tone] = &[
    tone(Triangle, (600.0, 600.0), 0.3, 0.0, 0.12),
    tone(Triangle, (400.0, 300.0), 0.3, 0.1, 0.3),
];

const GATE_PASS: &[Tone] = &[tone(Sine, (300.0, 900.0), 0.3, 0.0, 0.25)];

const GATE_DRAIN: &[Tone] = &[tone(Sine, (500.0, 120.0), 0.35, 0.0, 0.35)];

const GAME_OVER: &[Tone] = &[
    tone(Triangle, (400.0, 400.0), 0.35, 0.0, 0.3),
    tone(Triangle, (300.0, 300.0), 0.35, 0.25, 0.3),
    tone(Triangle, (200.0, 80.0), 0.35, 0.5, 0.8),
];

fn tones_for(cue: AudioCue) -> &'static [Tone] {
    match cue {
        AudioCue::Shot => SHOT,
        AudioCue::EnemyDown => ENEMY_DOWN,
        AudioCue::BarrelBurst => BARREL_BURST,
        AudioCue::CoinPickup => COIN_PICKUP,
        AudioCue::WeaponUp => WEAPON_UP,
        AudioCue::WeaponDown => WEAPON_DOWN,
        AudioCue::GatePass => GATE_PASS,
        AudioCue::GateDrain => GATE_DRAIN,
        AudioCue::GameOver => GAME_OVER,
    }
}

/// Audio manager for the game
pub struct AudioManager {
    ctx: Option<AudioContext>,
    gain: f32,
}

impl AudioManager {
    pub fn new(settings: &Settings) -> Self {
        // May fail outside a secure context
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            gain: settings.effect_gain(),
        }
    }

    /// Resume audio context (required after user gesture)
    pub fn resume(&self) {
        if let Some(ctx) = &self.ctx {
            let _ = ctx.resume();
        }
    }

    /// Silence output while the page is in the background
    pub fn suspend(&self) {
        if let Some(ctx) = &self.ctx {
            let _ = ctx.suspend();
        }
    }

    pub fn apply_settings(&mut self, settings: &Settings) {
        self.gain = settings.effect_gain();
    }

    /// Create an oscillator routed through its own gain node
    fn create_osc(
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

    fn play_tone(ctx: &AudioContext, vol: f32, tone: &Tone) {
        let Some((osc, gain)) = Self::create_osc(ctx, tone.freq.0, tone.wave) else {
            return;
        };
        let t = ctx.current_time() + tone.delay;
        let end = t + tone.length;

        gain.gain().set_value_at_time(vol * tone.level, t).ok();
        gain.gain().exponential_ramp_to_value_at_time(0.01, end).ok();
        if tone.freq.1 != tone.freq.0 {
            osc.frequency().set_value_at_time(tone.freq.0, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(tone.freq.1, end)
                .ok();
        }

        osc.start_with_when(t).ok();
        osc.stop_with_when(end + 0.05).ok();
    }
}

impl AudioSink for AudioManager {
    fn play(&mut self, cue: AudioCue) {
        if self.gain <= 0.0 {
            return;
        }
        let Some(ctx) = &self.ctx else { return };

        // Browsers start the context suspended until a user gesture
        if ctx.state() == AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        for tone in tones_for(cue) {
            Self::play_tone(ctx, self.gain, tone);
        }
    }
}
