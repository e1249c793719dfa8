//! Procedural obstacle spawning
//!
//! Obstacles appear `spawn_distance` ahead of the army on a per-type timer,
//! scroll toward it with the world, and are culled once they fall behind
//! the camera. Values and group sizes scale with a progression level that
//! steps up every 30 seconds of run time.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::entity::{Barrel, Crate, CratePayload, Enemy, Entity, EntityId, Gate, WeaponTier};
use super::events::GameEvent;
use crate::Lane;
use crate::consts::*;

/// Seconds of run time per progression level
pub const PROGRESSION_STEP_SECS: f32 = 30.0;
/// Fixed spawn intervals (seconds)
pub const GATE_SPAWN_INTERVAL: f32 = 5.0;
pub const BARREL_SPAWN_INTERVAL: f32 = 4.0;
pub const COIN_CRATE_SPAWN_INTERVAL: f32 = 6.0;
pub const WEAPON_CRATE_SPAWN_INTERVAL: f32 = 8.0;
/// Depth gap between members of an enemy group
pub const ENEMY_GROUP_SPACING: f32 = 1.5;

/// What crates carry in this run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CrateMode {
    /// Coins scaled by difficulty
    #[default]
    Coins,
    /// Weighted-random fire-rate modifiers
    Weapons,
}

impl CrateMode {
    pub fn spawn_interval(self) -> f32 {
        match self {
            CrateMode::Coins => COIN_CRATE_SPAWN_INTERVAL,
            CrateMode::Weapons => WEAPON_CRATE_SPAWN_INTERVAL,
        }
    }
}

/// Owns every obstacle ahead of the army
#[derive(Debug, Clone)]
pub struct Spawner {
    rng: Pcg32,
    pub enemies: Vec<Enemy>,
    pub gates: Vec<Gate>,
    pub barrels: Vec<Barrel>,
    pub crates: Vec<Crate>,

    enemy_timer: f32,
    gate_timer: f32,
    barrel_timer: f32,
    crate_timer: f32,

    /// Seconds since the run started
    pub game_time: f32,
    /// floor(game_time / 30), recomputed every update
    pub progression_level: u32,
    /// 1 + (game_speed - 10) / 30, recomputed every update
    pub difficulty_multiplier: f32,
    pub game_speed: f32,

    spawn_distance: f32,
    crate_mode: CrateMode,
    next_id: EntityId,
    events: Vec<GameEvent>,
}

impl Spawner {
    pub fn new(seed: u64, crate_mode: CrateMode, spawn_distance: f32) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
            enemies: Vec::new(),
            gates: Vec::new(),
            barrels: Vec::new(),
            crates: Vec::new(),
            enemy_timer: 0.0,
            gate_timer: 0.0,
            barrel_timer: 0.0,
            crate_timer: 0.0,
            game_time: 0.0,
            progression_level: 0,
            difficulty_multiplier: 1.0,
            game_speed: BASE_GAME_SPEED,
            spawn_distance,
            crate_mode,
            next_id: 1,
            events: Vec::new(),
        }
    }

    pub fn crate_mode(&self) -> CrateMode {
        self.crate_mode
    }

    fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Advance timers, spawn due batches, scroll everything, cull stragglers
    pub fn update(&mut self, dt: f32, game_speed: f32) {
        self.game_speed = game_speed;
        self.game_time += dt;
        self.progression_level = (self.game_time / PROGRESSION_STEP_SECS).floor() as u32;
        self.difficulty_multiplier = 1.0 + (game_speed - BASE_GAME_SPEED) / 30.0;

        self.enemy_timer += dt;
        if self.enemy_timer >= self.enemy_spawn_interval() {
            self.enemy_timer = 0.0;
            self.spawn_enemy_group();
        }

        self.gate_timer += dt;
        if self.gate_timer >= GATE_SPAWN_INTERVAL {
            self.gate_timer = 0.0;
            self.spawn_gate();
        }

        self.barrel_timer += dt;
        if self.barrel_timer >= BARREL_SPAWN_INTERVAL {
            self.barrel_timer = 0.0;
            self.spawn_barrel();
        }

        self.crate_timer += dt;
        if self.crate_timer >= self.crate_mode.spawn_interval() {
            self.crate_timer = 0.0;
            self.spawn_crate();
        }

        self.update_entities(dt, game_speed);
        self.cleanup_entities();
    }

    /// Enemy interval shrinks with progression and speed, never below 1s
    pub fn enemy_spawn_interval(&self) -> f32 {
        let base = (4.0 - self.progression_level as f32 * 0.5).max(1.5);
        (base / self.difficulty_multiplier).max(1.0)
    }

    fn random_lane(&mut self) -> Lane {
        Lane::ALL[self.rng.random_range(0..Lane::ALL.len())]
    }

    /// Spawn a column of same-valued enemies in one lane
    pub fn spawn_enemy_group(&mut self) {
        let level = self.progression_level;
        let lane_x = self.random_lane().x();

        let value =
            (5.0 + self.rng.random::<f32>() * 5.0 + level as f32 * 3.0).floor() as u32;

        let min_group = (1 + level / 2).min(3);
        let max_group = (2 + level).min(6);
        let group_size = (min_group as f32
            + self.rng.random::<f32>() * (max_group - min_group + 1) as f32)
            .floor() as u32;

        for i in 0..group_size {
            let offset_x = (self.rng.random::<f32>() - 0.5) * 2.0;
            let pos = Vec3::new(
                lane_x + offset_x,
                0.0,
                self.spawn_distance + i as f32 * ENEMY_GROUP_SPACING,
            );
            self.place_enemy(pos, value);
        }

        log::debug!("enemy group: {group_size} x {value} at x={lane_x}");
    }

    pub fn spawn_gate(&mut self) {
        let level = self.progression_level as f32;
        let lane_x = self.random_lane().x();
        let min_value = 1.0 + level;
        let max_value = 3.0 + level * 3.0;
        let value = (min_value + self.rng.random::<f32>() * (max_value - min_value)).floor() as i32;
        self.place_gate(Vec3::new(lane_x, 0.0, self.spawn_distance), value);
    }

    pub fn spawn_barrel(&mut self) {
        let level = self.progression_level;
        let lane_x = self.random_lane().x();
        let min_value = (1 + level / 2) as f32;
        let max_value = (2 + level * 2) as f32;
        let value = (min_value + self.rng.random::<f32>() * (max_value - min_value)).floor() as u32;
        self.place_barrel(Vec3::new(lane_x, 0.0, self.spawn_distance), value);
    }

    pub fn spawn_crate(&mut self) {
        let lane_x = self.random_lane().x();
        let payload = match self.crate_mode {
            CrateMode::Coins => {
                let coins = (5.0 + self.rng.random::<f32>() * 15.0 * self.difficulty_multiplier)
                    .floor() as u32;
                CratePayload::Coins(coins)
            }
            CrateMode::Weapons => CratePayload::Weapon(WeaponTier::from_roll(self.rng.random())),
        };
        self.place_crate(Vec3::new(lane_x, 0.0, self.spawn_distance), payload);
    }

    /// Place an enemy at an exact spot, bypassing the timers
    pub fn place_enemy(&mut self, pos: Vec3, value: u32) -> EntityId {
        let id = self.next_entity_id();
        let enemy = Enemy::new(id, pos, value);
        self.events.push(GameEvent::Spawned {
            kind: Enemy::KIND,
            id,
            pos,
        });
        self.enemies.push(enemy);
        id
    }

    pub fn place_gate(&mut self, pos: Vec3, value: i32) -> EntityId {
        let id = self.next_entity_id();
        self.events.push(GameEvent::Spawned {
            kind: Gate::KIND,
            id,
            pos,
        });
        self.gates.push(Gate::new(id, pos, value));
        id
    }

    pub fn place_barrel(&mut self, pos: Vec3, value: u32) -> EntityId {
        let id = self.next_entity_id();
        self.events.push(GameEvent::Spawned {
            kind: Barrel::KIND,
            id,
            pos,
        });
        self.barrels.push(Barrel::new(id, pos, value));
        id
    }

    pub fn place_crate(&mut self, pos: Vec3, payload: CratePayload) -> EntityId {
        let id = self.next_entity_id();
        self.events.push(GameEvent::Spawned {
            kind: Crate::KIND,
            id,
            pos,
        });
        self.crates.push(Crate::new(id, pos, payload));
        id
    }

    fn update_entities(&mut self, dt: f32, game_speed: f32) {
        self.enemies.iter_mut().for_each(|e| e.update(dt, game_speed));
        self.gates.iter_mut().for_each(|g| g.update(dt, game_speed));
        self.barrels.iter_mut().for_each(|b| b.update(dt, game_speed));
        self.crates.iter_mut().for_each(|c| c.update(dt, game_speed));
    }

    fn cleanup_entities(&mut self) {
        cull_behind(&mut self.enemies, &mut self.events);
        cull_behind(&mut self.gates, &mut self.events);
        cull_behind(&mut self.barrels, &mut self.events);
        cull_behind(&mut self.crates, &mut self.events);
    }

    pub fn enemy_mut(&mut self, id: EntityId) -> Option<&mut Enemy> {
        self.enemies.iter_mut().find(|e| e.id == id)
    }

    pub fn barrel_mut(&mut self, id: EntityId) -> Option<&mut Barrel> {
        self.barrels.iter_mut().find(|b| b.id == id)
    }

    pub fn crate_mut(&mut self, id: EntityId) -> Option<&mut Crate> {
        self.crates.iter_mut().find(|c| c.id == id)
    }

    // Removal is idempotent: an id that is already gone is a no-op.

    pub fn remove_enemy(&mut self, id: EntityId) -> bool {
        remove_by_id(&mut self.enemies, id, &mut self.events)
    }

    pub fn remove_gate(&mut self, id: EntityId) -> bool {
        remove_by_id(&mut self.gates, id, &mut self.events)
    }

    pub fn remove_barrel(&mut self, id: EntityId) -> bool {
        remove_by_id(&mut self.barrels, id, &mut self.events)
    }

    pub fn remove_crate(&mut self, id: EntityId) -> bool {
        remove_by_id(&mut self.crates, id, &mut self.events)
    }

    /// Dispose every obstacle
    pub fn clear(&mut self) {
        for enemy in self.enemies.drain(..) {
            self.events.push(enemy.dispose());
        }
        for gate in self.gates.drain(..) {
            self.events.push(gate.dispose());
        }
        for barrel in self.barrels.drain(..) {
            self.events.push(barrel.dispose());
        }
        for c in self.crates.drain(..) {
            self.events.push(c.dispose());
        }
    }

    pub fn entity_count(&self) -> usize {
        self.enemies.len() + self.gates.len() + self.barrels.len() + self.crates.len()
    }

    /// Take the notifications queued since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Remove everything strictly behind the cull depth, keeping order
fn cull_behind<T: Entity>(list: &mut Vec<T>, events: &mut Vec<GameEvent>) {
    let mut i = list.len();
    while i > 0 {
        i -= 1;
        if list[i].pos().z < CULL_DEPTH {
            events.push(list.remove(i).dispose());
        }
    }
}

fn remove_by_id<T: Entity>(list: &mut Vec<T>, id: EntityId, events: &mut Vec<GameEvent>) -> bool {
    match list.iter().position(|e| e.id() == id) {
        Some(index) => {
            events.push(list.remove(index).dispose());
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::EntityKind;

    fn spawner() -> Spawner {
        Spawner::new(12345, CrateMode::Coins, SPAWN_DISTANCE)
    }

    #[test]
    fn test_cull_boundary_is_exclusive() {
        let mut s = spawner();
        let kept = s.place_gate(Vec3::new(0.0, 0.0, -10.0), 1);
        let culled = s.place_gate(Vec3::new(0.0, 0.0, -10.01), 1);
        s.drain_events();

        s.update(0.0, BASE_GAME_SPEED);

        assert_eq!(s.gates.len(), 1);
        assert_eq!(s.gates[0].id, kept);
        assert_eq!(
            s.drain_events(),
            vec![GameEvent::Despawned {
                kind: EntityKind::Gate,
                id: culled
            }]
        );
    }

    #[test]
    fn test_removal_is_idempotent() {
        let mut s = spawner();
        let a = s.place_barrel(Vec3::new(0.0, 0.0, 20.0), 4);
        let b = s.place_barrel(Vec3::new(4.5, 0.0, 20.0), 5);

        assert!(s.remove_barrel(a));
        assert!(!s.remove_barrel(a));
        assert!(!s.remove_barrel(9999));
        assert_eq!(s.barrels.len(), 1);
        assert_eq!(s.barrels[0].id, b);
    }

    #[test]
    fn test_progression_and_difficulty() {
        let mut s = spawner();
        s.update(29.9, BASE_GAME_SPEED);
        assert_eq!(s.progression_level, 0);
        assert_eq!(s.difficulty_multiplier, 1.0);
        assert_eq!(s.enemy_spawn_interval(), 4.0);

        s.update(0.2, 16.0);
        assert_eq!(s.progression_level, 1);
        assert!((s.difficulty_multiplier - 1.2).abs() < 1e-6);
        // max(1.5, 3.5) / 1.2
        assert!((s.enemy_spawn_interval() - 3.5 / 1.2).abs() < 1e-5);
    }

    #[test]
    fn test_enemy_interval_floor() {
        let mut s = spawner();
        s.progression_level = 10;
        s.difficulty_multiplier = 3.0;
        assert_eq!(s.enemy_spawn_interval(), 1.0);
    }

    #[test]
    fn test_timers_spawn_at_distance_then_scroll() {
        let mut s = spawner();
        // The step that spawns a gate also scrolls it once
        let mut steps = 0;
        while s.gates.is_empty() && steps < 60 {
            s.update(0.1, BASE_GAME_SPEED);
            steps += 1;
        }
        assert!((49..=51).contains(&steps), "gate after {steps} steps");
        let gate = &s.gates[0];
        assert!((gate.pos.z - (SPAWN_DISTANCE - 1.0)).abs() < 1e-4);
        assert!(Lane::ALL.iter().any(|l| l.x() == gate.pos.x));
        assert!((1..3).contains(&gate.value));
    }

    #[test]
    fn test_enemy_group_shape() {
        let mut s = spawner();
        for _ in 0..20 {
            s.spawn_enemy_group();
        }
        assert!(!s.enemies.is_empty());
        for enemy in &s.enemies {
            assert!((5..10).contains(&enemy.value));
            assert_eq!(enemy.health, enemy.value as i32);
            let in_some_lane = Lane::ALL.iter().any(|l| (enemy.pos.x - l.x()).abs() <= 1.0);
            assert!(in_some_lane);
        }
    }

    #[test]
    fn test_group_size_grows_with_progression() {
        let mut s = spawner();
        s.progression_level = 4;
        for _ in 0..30 {
            let before = s.enemies.len();
            s.spawn_enemy_group();
            let size = s.enemies.len() - before;
            // min(1 + 2, 3) ..= min(2 + 4, 6)
            assert!((3..=6).contains(&size), "group size {size}");
        }
    }

    #[test]
    fn test_barrel_and_crate_values() {
        let mut s = spawner();
        for _ in 0..50 {
            s.spawn_barrel();
            s.spawn_crate();
        }
        assert!(s.barrels.iter().all(|b| b.value == 1));
        for c in &s.crates {
            match c.payload {
                CratePayload::Coins(n) => assert!((5..20).contains(&n)),
                CratePayload::Weapon(_) => panic!("coin mode produced a weapon crate"),
            }
            assert_eq!(c.hits_left, CRATE_HITS);
        }
    }

    #[test]
    fn test_weapon_mode_crates() {
        let mut s = Spawner::new(7, CrateMode::Weapons, SPAWN_DISTANCE);
        for _ in 0..20 {
            s.spawn_crate();
        }
        assert!(
            s.crates
                .iter()
                .all(|c| matches!(c.payload, CratePayload::Weapon(_)))
        );
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = spawner();
        let mut b = spawner();
        for _ in 0..300 {
            a.update(0.05, 12.0);
            b.update(0.05, 12.0);
        }
        assert_eq!(a.entity_count(), b.entity_count());
        for (ea, eb) in a.enemies.iter().zip(&b.enemies) {
            assert_eq!(ea.pos, eb.pos);
            assert_eq!(ea.value, eb.value);
        }
    }

    #[test]
    fn test_clear_disposes_everything() {
        let mut s = spawner();
        s.place_enemy(Vec3::ZERO, 5);
        s.place_crate(Vec3::ZERO, CratePayload::Coins(3));
        s.drain_events();
        s.clear();
        assert_eq!(s.entity_count(), 0);
        assert_eq!(s.drain_events().len(), 2);
    }
}
