//! Collaborator seams
//!
//! The simulation never touches the DOM, Web Audio or the network. It polls
//! an `InputProvider`, pushes notifications into sinks, and receives async
//! completions through an `Inbox` drained at the start of each frame.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use glam::Vec3;
use serde::Serialize;

use crate::Lane;
use crate::leaderboard::{ScoreEntry, SubmitOutcome};
use crate::sim::{CratePayload, EntityId, EntityKind, GameEvent};

/// Polled once per frame before the army moves
pub trait InputProvider {
    fn target_lane(&self) -> Lane;
}

/// Scene graph lifecycle. The core never reads anything back.
pub trait SceneSink {
    fn add_entity(&mut self, kind: EntityKind, id: EntityId, pos: Vec3);
    fn remove_entity(&mut self, kind: EntityKind, id: EntityId);
}

/// Fire-and-forget sound cues
pub trait AudioSink {
    fn play(&mut self, cue: AudioCue);
}

/// HUD and screen updates
pub trait StateSink {
    fn hud(&mut self, hud: &HudState);
    fn game_over(&mut self, summary: &RunSummary);
    fn score_submitted(&mut self, outcome: &SubmitOutcome);
}

/// Starts a leaderboard submission. The outcome is posted to `reply` when
/// the request settles, never returned synchronously.
pub trait ScoreSubmitter {
    fn submit(&mut self, entry: ScoreEntry, reply: InboxSender);
}

/// Everything the game talks to, boxed so shells can plug in their own
pub struct Hooks {
    pub input: Box<dyn InputProvider>,
    pub scene: Box<dyn SceneSink>,
    pub audio: Box<dyn AudioSink>,
    pub state: Box<dyn StateSink>,
    pub submitter: Box<dyn ScoreSubmitter>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            input: Box::new(CenterLane),
            scene: Box::new(NullSink),
            audio: Box::new(NullSink),
            state: Box::new(NullSink),
            submitter: Box::new(NullSink),
        }
    }
}

impl Hooks {
    pub fn with_input(mut self, input: impl InputProvider + 'static) -> Self {
        self.input = Box::new(input);
        self
    }

    pub fn with_scene(mut self, scene: impl SceneSink + 'static) -> Self {
        self.scene = Box::new(scene);
        self
    }

    pub fn with_audio(mut self, audio: impl AudioSink + 'static) -> Self {
        self.audio = Box::new(audio);
        self
    }

    pub fn with_state(mut self, state: impl StateSink + 'static) -> Self {
        self.state = Box::new(state);
        self
    }

    pub fn with_submitter(mut self, submitter: impl ScoreSubmitter + 'static) -> Self {
        self.submitter = Box::new(submitter);
        self
    }
}

// Shared handles, so a shell can keep a reference to what it plugged in

impl<T: InputProvider + ?Sized> InputProvider for Rc<T> {
    fn target_lane(&self) -> Lane {
        (**self).target_lane()
    }
}

impl InputProvider for Cell<Lane> {
    fn target_lane(&self) -> Lane {
        self.get()
    }
}

impl<T: SceneSink + ?Sized> SceneSink for Rc<RefCell<T>> {
    fn add_entity(&mut self, kind: EntityKind, id: EntityId, pos: Vec3) {
        self.borrow_mut().add_entity(kind, id, pos);
    }

    fn remove_entity(&mut self, kind: EntityKind, id: EntityId) {
        self.borrow_mut().remove_entity(kind, id);
    }
}

impl<T: AudioSink + ?Sized> AudioSink for Rc<RefCell<T>> {
    fn play(&mut self, cue: AudioCue) {
        self.borrow_mut().play(cue);
    }
}

impl<T: StateSink + ?Sized> StateSink for Rc<RefCell<T>> {
    fn hud(&mut self, hud: &HudState) {
        self.borrow_mut().hud(hud);
    }

    fn game_over(&mut self, summary: &RunSummary) {
        self.borrow_mut().game_over(summary);
    }

    fn score_submitted(&mut self, outcome: &SubmitOutcome) {
        self.borrow_mut().score_submitted(outcome);
    }
}

impl<T: ScoreSubmitter + ?Sized> ScoreSubmitter for Rc<RefCell<T>> {
    fn submit(&mut self, entry: ScoreEntry, reply: InboxSender) {
        self.borrow_mut().submit(entry, reply);
    }
}

/// Sounds the game can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioCue {
    Shot,
    EnemyDown,
    BarrelBurst,
    CoinPickup,
    WeaponUp,
    WeaponDown,
    GatePass,
    GateDrain,
    GameOver,
}

impl AudioCue {
    /// Cue for a simulation event, if it makes a sound
    pub fn for_event(event: &GameEvent) -> Option<AudioCue> {
        match event {
            GameEvent::ShotsFired { .. } => Some(AudioCue::Shot),
            GameEvent::EnemyDestroyed { .. } => Some(AudioCue::EnemyDown),
            GameEvent::BarrelDestroyed { .. } => Some(AudioCue::BarrelBurst),
            GameEvent::CrateOpened { payload } => Some(match payload {
                CratePayload::Coins(_) => AudioCue::CoinPickup,
                CratePayload::Weapon(tier) if tier.fire_rate_factor() >= 1.0 => {
                    AudioCue::WeaponUp
                }
                CratePayload::Weapon(_) => AudioCue::WeaponDown,
            }),
            GameEvent::GatePassed { value } if *value >= 0 => Some(AudioCue::GatePass),
            GameEvent::GatePassed { .. } => Some(AudioCue::GateDrain),
            GameEvent::GameOver { .. } => Some(AudioCue::GameOver),
            GameEvent::Spawned { .. } | GameEvent::Despawned { .. } => None,
        }
    }
}

/// Per-frame HUD snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HudState {
    pub strength: u32,
    pub score: u64,
    pub coins: u64,
    /// Metres travelled
    pub distance: f32,
    /// Position within the current 100 m segment, in [0, 1)
    pub progress: f32,
    pub fire_rate_multiplier: f32,
}

/// Final numbers of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunSummary {
    pub score: u64,
    pub strength: u32,
    pub coins: u64,
    pub distance: f32,
}

/// Completions delivered back to the game
#[derive(Debug, Clone, PartialEq)]
pub enum InboxMessage {
    ScoreSubmitted(SubmitOutcome),
}

/// Receiving end, owned by the game
#[derive(Debug, Default)]
pub struct Inbox {
    queue: Rc<RefCell<VecDeque<InboxMessage>>>,
}

/// Cloneable posting handle for async tasks
#[derive(Debug, Clone)]
pub struct InboxSender {
    queue: Rc<RefCell<VecDeque<InboxMessage>>>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sender(&self) -> InboxSender {
        InboxSender {
            queue: Rc::clone(&self.queue),
        }
    }

    /// Everything posted so far, oldest first
    pub fn drain(&self) -> Vec<InboxMessage> {
        self.queue.borrow_mut().drain(..).collect()
    }
}

impl InboxSender {
    pub fn post(&self, message: InboxMessage) {
        self.queue.borrow_mut().push_back(message);
    }
}

/// Stays in the center lane
#[derive(Debug, Default, Clone, Copy)]
pub struct CenterLane;

impl InputProvider for CenterLane {
    fn target_lane(&self) -> Lane {
        Lane::Center
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SceneSink for NullSink {
    fn add_entity(&mut self, _kind: EntityKind, _id: EntityId, _pos: Vec3) {}
    fn remove_entity(&mut self, _kind: EntityKind, _id: EntityId) {}
}

impl AudioSink for NullSink {
    fn play(&mut self, _cue: AudioCue) {}
}

impl StateSink for NullSink {
    fn hud(&mut self, _hud: &HudState) {}
    fn game_over(&mut self, _summary: &RunSummary) {}
    fn score_submitted(&mut self, _outcome: &SubmitOutcome) {}
}

impl ScoreSubmitter for NullSink {
    fn submit(&mut self, _entry: ScoreEntry, reply: InboxSender) {
        reply.post(InboxMessage::ScoreSubmitted(SubmitOutcome::Failed(
            "Leaderboard unavailable".to_string(),
        )));
    }
}
