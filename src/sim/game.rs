//! Run orchestration
//!
//! `Game` owns the army and the spawner, advances them in a fixed order each
//! frame, applies collision results, and drives the phase machine:
//!
//! ```text
//! Idle --start--> Running --enemy contact / wiped out--> GameOver
//!                    ^                                      |
//!                    +---------------restart----------------+
//! GameOver --go_to_menu--> Idle
//! ```

use serde::{Deserialize, Serialize};

use super::army::Army;
use super::collision::{self, CollisionReport};
use super::entity::CratePayload;
use super::events::GameEvent;
use super::spawner::Spawner;
use crate::consts::*;
use crate::hooks::{AudioCue, Hooks, HudState, Inbox, InboxMessage, RunSummary};
use crate::leaderboard::{NameError, ScoreEntry, validate_name};
use crate::tuning::Tuning;
use crate::upgrades::UpgradeStats;
use crate::{frame_dt, game_speed_for_score};

/// Length of one HUD progress segment (metres)
pub const PROGRESS_SEGMENT: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    /// Menu; nothing simulates
    #[default]
    Idle,
    Running,
    /// Run finished; waiting for restart or menu
    GameOver,
}

/// `floor(value * factor * multiplier)`, in f64 so the floor lands where a
/// double-precision product would
#[inline]
fn scaled(value: f64, factor: f64, multiplier: f64) -> i64 {
    (value * factor * multiplier).floor() as i64
}

pub struct Game {
    pub phase: Phase,
    pub army: Army,
    pub spawner: Spawner,

    pub score: u64,
    /// Coins earned this run, banked by the shell at game over
    pub coins: u64,
    pub game_speed: f32,
    pub distance: f32,

    tuning: Tuning,
    stats: UpgradeStats,
    runs: u64,
    last_time_ms: f64,
    score_submitted: bool,

    events: Vec<GameEvent>,
    inbox: Inbox,
    hooks: Hooks,
}

impl Game {
    pub fn new(tuning: Tuning, stats: UpgradeStats, hooks: Hooks) -> Self {
        let army = Army::new(
            0,
            stats.fire_rate as f32,
            tuning.base_fire_interval,
            tuning.lane_change_speed,
        );
        let spawner = Spawner::new(tuning.seed, tuning.crate_mode, tuning.spawn_distance);
        Self {
            phase: Phase::Idle,
            army,
            spawner,
            score: 0,
            coins: 0,
            game_speed: BASE_GAME_SPEED,
            distance: 0.0,
            tuning,
            stats,
            runs: 0,
            last_time_ms: 0.0,
            score_submitted: false,
            events: Vec::new(),
            inbox: Inbox::new(),
            hooks,
        }
    }

    pub fn strength(&self) -> u32 {
        self.army.strength()
    }

    pub fn stats(&self) -> &UpgradeStats {
        &self.stats
    }

    /// Takes effect at the next `start`/`restart`
    pub fn set_upgrades(&mut self, stats: UpgradeStats) {
        self.stats = stats;
    }

    pub fn set_tuning(&mut self, tuning: Tuning) {
        self.tuning = tuning;
    }

    /// Begin a run from the menu or the game over screen
    pub fn start(&mut self, now_ms: f64) {
        if self.phase == Phase::Running {
            log::warn!("start() ignored: a run is already in progress");
            return;
        }
        self.begin_run(now_ms);
    }

    /// Throw away the current run and begin a fresh one
    pub fn restart(&mut self, now_ms: f64) {
        if self.phase == Phase::Idle {
            log::warn!("restart() from the menu, starting instead");
        }
        self.begin_run(now_ms);
    }

    /// Back to the menu, releasing every entity
    pub fn go_to_menu(&mut self) {
        self.clear_world();
        self.phase = Phase::Idle;
        log::info!("Back to menu");
    }

    fn begin_run(&mut self, now_ms: f64) {
        self.reset();
        self.phase = Phase::Running;
        self.last_time_ms = now_ms;
        log::info!(
            "Run {} started: strength {}, seed {}",
            self.runs,
            self.strength(),
            self.tuning.seed.wrapping_add(self.runs)
        );
    }

    /// Fresh army and spawner from the current upgrade snapshot
    fn reset(&mut self) {
        self.clear_world();
        self.runs += 1;

        let stats = self.stats;
        self.army = Army::new(
            BASE_STRENGTH + stats.starting_strength,
            stats.fire_rate as f32,
            self.tuning.base_fire_interval,
            self.tuning.lane_change_speed,
        );
        self.spawner = Spawner::new(
            self.tuning.seed.wrapping_add(self.runs),
            self.tuning.crate_mode,
            self.tuning.spawn_distance,
        );

        self.score = 0;
        self.coins = 0;
        self.game_speed = BASE_GAME_SPEED;
        self.distance = 0.0;
        self.score_submitted = false;

        self.flush_events();
        self.push_hud();
    }

    fn clear_world(&mut self) {
        self.army.clear();
        self.spawner.clear();
        self.flush_events();
    }

    /// One animation frame. Handles async completions in every phase and
    /// advances the simulation only while running. Returns whether it did.
    pub fn frame(&mut self, now_ms: f64) -> bool {
        self.pump_inbox();
        if self.phase != Phase::Running {
            return false;
        }
        let dt = frame_dt(now_ms, self.last_time_ms);
        self.last_time_ms = now_ms;
        self.update(dt);
        true
    }

    /// Deliver completions posted since the last frame
    pub fn pump_inbox(&mut self) {
        for message in self.inbox.drain() {
            match message {
                InboxMessage::ScoreSubmitted(outcome) => {
                    log::info!("Score submission settled: {outcome:?}");
                    self.hooks.state.score_submitted(&outcome);
                }
            }
        }
    }

    /// Advance one step of `dt` seconds
    pub fn update(&mut self, dt: f32) {
        if self.phase != Phase::Running {
            return;
        }

        let lane = self.hooks.input.target_lane();
        self.army.update(dt, lane);
        self.spawner.update(dt, self.game_speed);
        self.army.update_projectiles(dt);

        let report = collision::check(&self.army, &self.spawner);
        let wiped_out = self.apply_collisions(&report);
        self.flush_events();

        if report.player_hit || wiped_out {
            self.game_over();
            return;
        }

        self.game_speed = game_speed_for_score(self.score);
        self.spawner.game_speed = self.game_speed;
        self.distance += self.game_speed * dt;
        self.push_hud();
    }

    /// Apply every hit category. True if a gate drained the army.
    fn apply_collisions(&mut self, report: &CollisionReport) -> bool {
        let score_mult = self.stats.score_multiplier;
        let damage = self.stats.projectile_damage;
        let mut wiped_out = false;

        for &gate_id in &report.gate_hits {
            let Some(value) = self
                .spawner
                .gates
                .iter()
                .find(|g| g.id == gate_id)
                .map(|g| g.value)
            else {
                continue;
            };
            if value >= 0 {
                self.army.add_strength(value as u32);
            } else {
                wiped_out |= self.army.remove_strength(value.unsigned_abs());
            }
            self.add_score(scaled(value as f64, GATE_SCORE_FACTOR, score_mult));
            self.spawner.remove_gate(gate_id);
            self.events.push(GameEvent::GatePassed { value });
        }

        for hit in &report.enemy_hits {
            if let Some(enemy) = self.spawner.enemy_mut(hit.target) {
                if enemy.take_damage(hit.damage * damage) {
                    let value = enemy.value;
                    self.add_score(scaled(value as f64, ENEMY_SCORE_FACTOR, score_mult));
                    self.spawner.remove_enemy(hit.target);
                    self.events.push(GameEvent::EnemyDestroyed { value });
                }
            }
            self.army.remove_projectile(hit.projectile);
        }

        for hit in &report.barrel_hits {
            if let Some(barrel) = self.spawner.barrel_mut(hit.target) {
                if barrel.take_damage(hit.damage * damage) {
                    let value = barrel.value;
                    self.army.add_strength(value);
                    self.add_score(scaled(value as f64, BARREL_SCORE_FACTOR, score_mult));
                    self.spawner.remove_barrel(hit.target);
                    self.events.push(GameEvent::BarrelDestroyed { value });
                }
            }
            self.army.remove_projectile(hit.projectile);
        }

        for hit in &report.crate_hits {
            if let Some(c) = self.spawner.crate_mut(hit.target) {
                if c.take_hit() {
                    let payload = c.payload;
                    match payload {
                        CratePayload::Coins(value) => {
                            let earned =
                                scaled(value as f64, 1.0, self.stats.coin_multiplier).max(0);
                            self.coins += earned as u64;
                        }
                        CratePayload::Weapon(tier) => self.army.apply_weapon(tier),
                    }
                    log::debug!("crate opened: {payload:?}");
                    self.spawner.remove_crate(hit.target);
                    self.events.push(GameEvent::CrateOpened { payload });
                }
            }
            self.army.remove_projectile(hit.projectile);
        }

        wiped_out
    }

    fn add_score(&mut self, delta: i64) {
        self.score = self.score.saturating_add_signed(delta);
    }

    fn game_over(&mut self) {
        self.phase = Phase::GameOver;
        let summary = self.summary();
        log::info!(
            "Game over: score {}, strength {}, coins {}, {:.0} m",
            summary.score,
            summary.strength,
            summary.coins,
            summary.distance
        );
        self.events.push(GameEvent::GameOver {
            score: summary.score,
            strength: summary.strength,
        });
        self.flush_events();
        self.hooks.state.game_over(&summary);
    }

    /// Send the finished run to the leaderboard under `name`.
    ///
    /// Only one submission per run; returns whether a request went out. The
    /// result arrives later through the inbox.
    pub fn submit_score(&mut self, name: &str) -> Result<bool, NameError> {
        let name = validate_name(name)?;
        if self.phase != Phase::GameOver || self.score_submitted {
            log::warn!("Score submission ignored in {:?}", self.phase);
            return Ok(false);
        }
        self.score_submitted = true;
        let entry = ScoreEntry {
            name,
            score: self.score,
            strength: self.strength(),
        };
        self.hooks.submitter.submit(entry, self.inbox.sender());
        Ok(true)
    }

    /// Forward queued notifications to the scene and audio sinks
    fn flush_events(&mut self) {
        let mut events = self.army.drain_events();
        events.append(&mut self.spawner.drain_events());
        events.append(&mut self.events);

        for event in &events {
            match *event {
                GameEvent::Spawned { kind, id, pos } => self.hooks.scene.add_entity(kind, id, pos),
                GameEvent::Despawned { kind, id } => self.hooks.scene.remove_entity(kind, id),
                _ => {}
            }
            if let Some(cue) = AudioCue::for_event(event) {
                self.hooks.audio.play(cue);
            }
        }
    }

    pub fn hud(&self) -> HudState {
        HudState {
            strength: self.strength(),
            score: self.score,
            coins: self.coins,
            distance: self.distance,
            progress: (self.distance % PROGRESS_SEGMENT) / PROGRESS_SEGMENT,
            fire_rate_multiplier: self.stats.fire_rate as f32 * self.army.weapon_multiplier(),
        }
    }

    fn push_hud(&mut self) {
        let hud = self.hud();
        self.hooks.state.hud(&hud);
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            score: self.score,
            strength: self.strength(),
            coins: self.coins,
            distance: self.distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::{Projectile, WeaponTier};
    use crate::upgrades::Progress;
    use glam::Vec3;

    /// A run with nothing spawned yet and the clock at zero
    fn running(stats: UpgradeStats) -> Game {
        let mut game = Game::new(Tuning::default(), stats, Hooks::default());
        game.start(0.0);
        game
    }

    /// Shots placed by hand just short of `pos`, so one step carries them
    /// into a target standing there
    fn shots_at(game: &mut Game, pos: Vec3, count: u32) {
        for i in 0..count {
            game.army
                .projectiles
                .push(Projectile::new(10_000 + i, pos - Vec3::Z * 0.5));
        }
    }

    const TINY_DT: f32 = 0.016;

    #[test]
    fn test_start_builds_fresh_run() {
        let game = running(UpgradeStats::default());
        assert_eq!(game.phase, Phase::Running);
        assert_eq!(game.strength(), 10);
        assert_eq!(game.army.soldiers.len(), 10);
        assert_eq!(game.score, 0);
        assert_eq!(game.game_speed, BASE_GAME_SPEED);
    }

    #[test]
    fn test_enemy_contact_ends_run_untouched() {
        let mut game = running(UpgradeStats::default());
        game.spawner.place_enemy(Vec3::ZERO, 5);

        game.update(TINY_DT);

        assert_eq!(game.phase, Phase::GameOver);
        assert_eq!(game.score, 0);
        assert_eq!(game.strength(), 10);

        // Nothing moves after game over
        let z = game.spawner.enemies[0].pos.z;
        game.update(TINY_DT);
        assert_eq!(game.spawner.enemies[0].pos.z, z);
    }

    #[test]
    fn test_barrel_pays_strength_and_floored_score() {
        let stats = UpgradeStats {
            projectile_damage: 3,
            score_multiplier: 1.3,
            ..UpgradeStats::default()
        };
        let mut game = running(stats);
        let target = Vec3::new(0.0, 0.0, 20.0);
        game.spawner.place_barrel(target, 7);
        shots_at(&mut game, target + Vec3::new(0.0, 0.7, 0.0), 3);

        game.update(TINY_DT);

        assert!(game.spawner.barrels.is_empty());
        assert!(game.army.projectiles.is_empty());
        assert_eq!(game.strength(), 17);
        // floor(7 * 5 * 1.3) = floor(45.5)
        assert_eq!(game.score, 45);
    }

    #[test]
    fn test_gate_score_at_bought_multiplier() {
        let progress = Progress {
            score_multiplier: 3,
            ..Progress::default()
        };
        let mut game = running(progress.stats());
        game.spawner.place_gate(Vec3::ZERO, 9);

        game.update(TINY_DT);

        // 90 * 1.3 must not floor to 116
        assert_eq!(game.score, 117);
        assert_eq!(game.strength(), 19);
    }

    #[test]
    fn test_barrel_reward_past_full_formation() {
        let mut game = running(UpgradeStats::default());
        game.army.set_strength(98);
        let target = Vec3::new(0.0, 0.0, 20.0);
        game.spawner.place_barrel(target, 10);
        shots_at(&mut game, target + Vec3::new(0.0, 0.7, 0.0), 2);

        game.update(TINY_DT);

        assert!(game.spawner.barrels.is_empty());
        assert_eq!(game.strength(), 108);
        assert_eq!(game.army.soldiers.len(), MAX_SOLDIERS as usize);
        assert_eq!(game.score, 50);
    }

    #[test]
    fn test_barrel_survives_partial_damage() {
        let stats = UpgradeStats {
            projectile_damage: 3,
            ..UpgradeStats::default()
        };
        let mut game = running(stats);
        let target = Vec3::new(0.0, 0.0, 20.0);
        game.spawner.place_barrel(target, 7);
        shots_at(&mut game, target + Vec3::new(0.0, 0.7, 0.0), 2);

        game.update(TINY_DT);

        assert_eq!(game.spawner.barrels[0].health, 1);
        assert!(game.army.projectiles.is_empty());
        assert_eq!(game.strength(), 10);
        assert_eq!(game.score, 0);
    }

    #[test]
    fn test_gate_applies_once() {
        let mut game = running(UpgradeStats::default());
        game.spawner.place_gate(Vec3::ZERO, 3);

        game.update(TINY_DT);
        game.update(TINY_DT);

        assert!(game.spawner.gates.is_empty());
        assert_eq!(game.strength(), 13);
        assert_eq!(game.score, 30);
        assert!((game.game_speed - 10.03).abs() < 1e-4);
    }

    #[test]
    fn test_draining_gate_wipes_out_army() {
        let mut game = running(UpgradeStats::default());
        game.spawner.place_gate(Vec3::ZERO, -15);

        game.update(TINY_DT);

        assert_eq!(game.strength(), 0);
        assert_eq!(game.score, 0);
        assert_eq!(game.phase, Phase::GameOver);
    }

    #[test]
    fn test_enemy_kill_scores() {
        let mut game = running(UpgradeStats::default());
        let target = Vec3::new(0.0, 0.0, 25.0);
        game.spawner.place_enemy(target, 5);
        shots_at(&mut game, target + Vec3::new(0.0, 0.7, 0.0), 1);

        game.update(TINY_DT);

        // Default damage 5 kills a value-5 enemy in one hit
        assert!(game.spawner.enemies.is_empty());
        assert_eq!(game.score, 25);
        assert_eq!(game.phase, Phase::Running);
    }

    #[test]
    fn test_coin_crate_uses_multiplier() {
        let stats = UpgradeStats {
            coin_multiplier: 1.5,
            ..UpgradeStats::default()
        };
        let mut game = running(stats);
        let target = Vec3::new(4.5, 0.0, 20.0);
        game.spawner.place_crate(target, CratePayload::Coins(11));
        shots_at(&mut game, target + Vec3::new(0.0, 0.7, 0.0), 3);

        game.update(TINY_DT);

        assert!(game.spawner.crates.is_empty());
        // floor(16.5)
        assert_eq!(game.coins, 16);
    }

    #[test]
    fn test_weapon_crate_changes_fire_rate() {
        let mut game = running(UpgradeStats::default());
        let target = Vec3::new(0.0, 0.0, 20.0);
        game.spawner
            .place_crate(target, CratePayload::Weapon(WeaponTier::Plus50));
        shots_at(&mut game, target + Vec3::new(0.0, 0.7, 0.0), 3);

        game.update(TINY_DT);

        assert!((game.army.weapon_multiplier() - 1.5).abs() < 1e-6);
        assert!((game.hud().fire_rate_multiplier - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_frame_clamps_dt() {
        let mut game = Game::new(Tuning::default(), UpgradeStats::default(), Hooks::default());
        assert!(!game.frame(500.0));

        game.start(1000.0);
        assert!(game.frame(6000.0));
        // A 5 s stall simulates 0.1 s at base speed
        assert!((game.distance - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_menu_and_restart() {
        let mut game = running(UpgradeStats::default());
        game.spawner.place_enemy(Vec3::ZERO, 5);
        game.update(TINY_DT);
        assert_eq!(game.phase, Phase::GameOver);

        game.restart(0.0);
        assert_eq!(game.phase, Phase::Running);
        assert_eq!(game.spawner.entity_count(), 0);
        assert_eq!(game.strength(), 10);

        game.go_to_menu();
        assert_eq!(game.phase, Phase::Idle);
        assert!(game.army.soldiers.is_empty());
    }

    #[test]
    fn test_upgrades_read_at_start_only() {
        let mut game = running(UpgradeStats::default());
        game.set_upgrades(UpgradeStats {
            starting_strength: 5,
            ..UpgradeStats::default()
        });
        assert_eq!(game.strength(), 10);
        game.restart(0.0);
        assert_eq!(game.strength(), 14);
    }

    #[test]
    fn test_hud_progress_wraps() {
        let mut game = running(UpgradeStats::default());
        game.distance = 250.0;
        assert!((game.hud().progress - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_submit_requires_valid_name_and_game_over() {
        let mut game = running(UpgradeStats::default());
        assert_eq!(game.submit_score("TOOLONG"), Err(NameError::TooLong));
        assert_eq!(game.submit_score("ACE"), Ok(false));

        game.spawner.place_enemy(Vec3::ZERO, 5);
        game.update(TINY_DT);
        assert_eq!(game.submit_score(" ACE "), Ok(true));
        assert_eq!(game.submit_score("ACE"), Ok(false));
    }
}
