//! The player's army
//!
//! A formation of soldiers showing up to 100 of the player's strength. The
//! army eases between lanes, auto-fires staggered volleys and owns every
//! projectile in flight.

use glam::{Vec2, Vec3};
use std::f32::consts::TAU;

use super::bounds::Aabb;
use super::entity::{Entity, EntityId, EntityKind, Projectile, Soldier, WeaponTier};
use super::events::GameEvent;
use crate::Lane;
use crate::consts::*;

/// Ring-packed formation slots for `count` soldiers.
///
/// Slot 0 is the origin. Ring `r` holds up to `r * 6` soldiers evenly spaced
/// by angle at radius `r * 1.2`, with Z squashed so the army stays compact.
pub fn formation_offsets(count: usize) -> Vec<Vec2> {
    let mut slots = Vec::with_capacity(count);
    if count == 0 {
        return slots;
    }
    slots.push(Vec2::ZERO);

    let mut ring = 1;
    while slots.len() < count {
        let capacity = ring * FORMATION_RING_STEP;
        let in_ring = capacity.min(count - slots.len());
        let radius = ring as f32 * FORMATION_SPACING;
        for k in 0..in_ring {
            let angle = TAU * k as f32 / in_ring as f32;
            slots.push(Vec2::new(
                angle.cos() * radius,
                angle.sin() * radius * FORMATION_Z_SQUASH,
            ));
        }
        ring += 1;
    }
    slots
}

#[derive(Debug, Clone)]
pub struct Army {
    /// Formation anchor; only X moves
    pub base: Vec3,
    pub target_lane: Lane,
    strength: u32,
    pub soldiers: Vec<Soldier>,
    pub projectiles: Vec<Projectile>,

    fire_timer: f32,
    current_shooter_index: usize,
    base_fire_interval: f32,
    /// From the fire-rate upgrade, fixed for the run
    upgrade_fire_rate: f32,
    /// Product of weapon pickups, clamped
    weapon_multiplier: f32,
    lane_change_speed: f32,

    next_id: EntityId,
    events: Vec<GameEvent>,
}

impl Army {
    pub fn new(
        starting_strength: u32,
        upgrade_fire_rate: f32,
        base_fire_interval: f32,
        lane_change_speed: f32,
    ) -> Self {
        let mut army = Self {
            base: Vec3::ZERO,
            target_lane: Lane::Center,
            strength: 0,
            soldiers: Vec::new(),
            projectiles: Vec::new(),
            fire_timer: 0.0,
            current_shooter_index: 0,
            base_fire_interval,
            upgrade_fire_rate: upgrade_fire_rate.max(f32::EPSILON),
            weapon_multiplier: 1.0,
            lane_change_speed,
            next_id: 1,
            events: Vec::new(),
        };
        army.set_strength(starting_strength as i64);
        army
    }

    fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn strength(&self) -> u32 {
        self.strength
    }

    /// Strength itself is unbounded; the formation shows at most
    /// `MAX_SOLDIERS` of it and every slot is reassigned
    pub fn set_strength(&mut self, n: i64) {
        self.strength = n.clamp(0, u32::MAX as i64) as u32;
        let headcount = self.strength.min(MAX_SOLDIERS) as usize;

        while self.soldiers.len() > headcount {
            if let Some(soldier) = self.soldiers.pop() {
                self.events.push(GameEvent::Despawned {
                    kind: EntityKind::Soldier,
                    id: soldier.id,
                });
            }
        }

        let slots = formation_offsets(headcount);
        while self.soldiers.len() < headcount {
            let id = self.next_entity_id();
            let offset = slots[self.soldiers.len()];
            let soldier = Soldier::new(id, self.base, offset);
            self.events.push(GameEvent::Spawned {
                kind: EntityKind::Soldier,
                id,
                pos: soldier.pos,
            });
            self.soldiers.push(soldier);
        }

        for (soldier, slot) in self.soldiers.iter_mut().zip(slots) {
            soldier.target_offset = slot;
        }

        if self.current_shooter_index >= self.soldiers.len() {
            self.current_shooter_index = 0;
        }
    }

    pub fn add_strength(&mut self, n: u32) {
        self.set_strength(self.strength as i64 + n as i64);
    }

    /// Lower strength; true when the army is wiped out. The caller decides
    /// what that means for the run.
    pub fn remove_strength(&mut self, n: u32) -> bool {
        self.set_strength(self.strength as i64 - n as i64);
        self.strength == 0
    }

    /// Seconds between volleys at the current multipliers
    pub fn fire_interval(&self) -> f32 {
        self.base_fire_interval / (self.upgrade_fire_rate * self.weapon_multiplier)
    }

    pub fn weapon_multiplier(&self) -> f32 {
        self.weapon_multiplier
    }

    /// Stack a weapon pickup onto the fire rate
    pub fn apply_weapon(&mut self, tier: WeaponTier) {
        self.weapon_multiplier = (self.weapon_multiplier * tier.fire_rate_factor())
            .clamp(MIN_FIRE_RATE_MULTIPLIER, MAX_FIRE_RATE_MULTIPLIER);
        log::debug!(
            "weapon pickup {}: multiplier now {:.2}",
            tier.label(),
            self.weapon_multiplier
        );
    }

    /// Ease toward the lane, walk soldiers to their slots, auto-fire
    pub fn update(&mut self, dt: f32, target_lane: Lane) {
        self.target_lane = target_lane;
        let target_x = target_lane.x();
        let diff = target_x - self.base.x;
        if diff.abs() > LANE_SNAP_EPSILON {
            self.base.x += diff * self.lane_change_speed * dt;
        } else {
            self.base.x = target_x;
        }

        let base = self.base;
        for soldier in &mut self.soldiers {
            soldier.follow(dt, base);
        }

        self.fire_timer += dt;
        if self.fire_timer >= self.fire_interval() {
            self.fire_timer = 0.0;
            self.fire_volley();
        }
    }

    /// Up to five soldiers fire, round-robin from the last shooter
    fn fire_volley(&mut self) {
        let count = self.soldiers.len();
        if count == 0 {
            return;
        }
        let shooters = SHOOTERS_PER_VOLLEY.min(count);
        for k in 0..shooters {
            let index = (self.current_shooter_index + k) % count;
            let muzzle = self.soldiers[index].pos
                + Vec3::new(0.0, PROJECTILE_SPAWN_Y, PROJECTILE_SPAWN_Z);
            let id = self.next_entity_id();
            self.events.push(GameEvent::Spawned {
                kind: EntityKind::Projectile,
                id,
                pos: muzzle,
            });
            self.projectiles.push(Projectile::new(id, muzzle));
        }
        self.current_shooter_index = (self.current_shooter_index + shooters) % count;
        self.events.push(GameEvent::ShotsFired {
            count: shooters as u32,
        });
    }

    /// Move projectiles and drop the ones past the far end
    pub fn update_projectiles(&mut self, dt: f32) {
        let mut i = self.projectiles.len();
        while i > 0 {
            i -= 1;
            self.projectiles[i].update(dt, 0.0);
            if self.projectiles[i].out_of_range() {
                self.events.push(self.projectiles.remove(i).dispose());
            }
        }
    }

    /// Idempotent: false if the projectile is already gone
    pub fn remove_projectile(&mut self, id: EntityId) -> bool {
        match self.projectiles.iter().position(|p| p.id == id) {
            Some(index) => {
                self.events.push(self.projectiles.remove(index).dispose());
                true
            }
            None => false,
        }
    }

    /// Union of soldier boxes; empty with no soldiers
    pub fn bounds(&self) -> Aabb {
        self.soldiers
            .iter()
            .fold(Aabb::EMPTY, |acc, s| acc.union(&s.bounds()))
    }

    /// Release every soldier and projectile
    pub fn clear(&mut self) {
        for soldier in self.soldiers.drain(..) {
            self.events.push(GameEvent::Despawned {
                kind: EntityKind::Soldier,
                id: soldier.id,
            });
        }
        for projectile in self.projectiles.drain(..) {
            self.events.push(projectile.dispose());
        }
        self.strength = 0;
        self.current_shooter_index = 0;
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn army(strength: u32) -> Army {
        Army::new(strength, 1.0, BASE_FIRE_INTERVAL, LANE_CHANGE_SPEED)
    }

    #[test]
    fn test_first_ring_layout() {
        let slots = formation_offsets(7);
        assert_eq!(slots[0], Vec2::ZERO);
        for slot in &slots[1..] {
            let unsquashed = Vec2::new(slot.x, slot.y / FORMATION_Z_SQUASH);
            assert!((unsquashed.length() - FORMATION_SPACING).abs() < 1e-5);
        }
        assert!((slots[1].x - FORMATION_SPACING).abs() < 1e-6);
    }

    #[test]
    fn test_partial_ring_spreads_evenly() {
        // 1 center + 6 in ring one + 2 in ring two
        let slots = formation_offsets(9);
        let r2 = 2.0 * FORMATION_SPACING;
        assert!((slots[7].x - r2).abs() < 1e-5);
        assert!((slots[8].x + r2).abs() < 1e-5);
        assert!(slots[8].y.abs() < 1e-5);
    }

    #[test]
    fn test_strength_outgrows_formation() {
        let mut a = army(5);
        a.set_strength(250);
        assert_eq!(a.strength(), 250);
        assert_eq!(a.soldiers.len(), MAX_SOLDIERS as usize);
        a.add_strength(10);
        assert_eq!(a.strength(), 260);
        assert!(!a.remove_strength(200));
        assert_eq!(a.strength(), 60);
        assert_eq!(a.soldiers.len(), 60);
        a.set_strength(-3);
        assert_eq!(a.strength(), 0);
        assert!(a.soldiers.is_empty());
    }

    #[test]
    fn test_remove_strength_reports_wipeout() {
        let mut a = army(3);
        assert!(!a.remove_strength(2));
        assert_eq!(a.soldiers.len(), 1);
        assert!(a.remove_strength(5));
        assert_eq!(a.strength(), 0);
    }

    #[test]
    fn test_lane_easing_and_snap() {
        let mut a = army(1);
        a.update(0.01, Lane::Right);
        // 4.5 * 15 * 0.01
        assert!((a.base.x - 0.675).abs() < 1e-5);

        a.base.x = 4.495;
        a.update(0.0, Lane::Right);
        assert_eq!(a.base.x, 4.5);
    }

    #[test]
    fn test_volley_staggers_shooters() {
        let mut a = army(7);
        a.drain_events();

        a.update(BASE_FIRE_INTERVAL, Lane::Center);
        assert_eq!(a.projectiles.len(), 5);
        assert!(a.drain_events().contains(&GameEvent::ShotsFired { count: 5 }));

        // Next volley starts at soldier 5 and wraps to 0..3
        a.update(BASE_FIRE_INTERVAL, Lane::Center);
        assert_eq!(a.projectiles.len(), 10);
        assert_eq!(a.current_shooter_index, 3);
    }

    #[test]
    fn test_small_army_fires_everyone() {
        let mut a = army(2);
        a.update(BASE_FIRE_INTERVAL, Lane::Center);
        assert_eq!(a.projectiles.len(), 2);
        let muzzle = a.projectiles[0].pos;
        assert!((muzzle.y - PROJECTILE_SPAWN_Y).abs() < 1e-6);
        assert!((muzzle.z - PROJECTILE_SPAWN_Z).abs() < 1e-6);
    }

    #[test]
    fn test_no_soldiers_no_shots() {
        let mut a = army(0);
        a.update(1.0, Lane::Center);
        assert!(a.projectiles.is_empty());
        assert!(a.bounds().is_empty());
    }

    #[test]
    fn test_projectiles_expire_past_range() {
        let mut a = army(1);
        a.update(BASE_FIRE_INTERVAL, Lane::Center);
        let id = a.projectiles[0].id;
        a.drain_events();

        a.projectiles[0].pos.z = 79.5;
        a.update_projectiles(0.02);
        assert!(a.projectiles.is_empty());
        assert_eq!(
            a.drain_events(),
            vec![GameEvent::Despawned {
                kind: EntityKind::Projectile,
                id
            }]
        );
        assert!(!a.remove_projectile(id));
    }

    #[test]
    fn test_weapon_multiplier_clamps() {
        let mut a = army(1);
        for _ in 0..5 {
            a.apply_weapon(WeaponTier::Plus50);
        }
        assert_eq!(a.weapon_multiplier(), MAX_FIRE_RATE_MULTIPLIER);
        for _ in 0..10 {
            a.apply_weapon(WeaponTier::Minus30);
        }
        assert_eq!(a.weapon_multiplier(), MIN_FIRE_RATE_MULTIPLIER);
        assert!((a.fire_interval() - BASE_FIRE_INTERVAL / 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_bounds_cover_formation() {
        let a = army(7);
        let b = a.bounds();
        assert!(b.min.x <= -FORMATION_SPACING);
        assert!(b.max.x >= FORMATION_SPACING);
        assert_eq!(b.min.y, 0.0);
    }

    proptest! {
        #[test]
        fn prop_formation_matches_strength(n in 0i64..=400, start in 0u32..=100) {
            let mut a = army(start);
            a.set_strength(n);
            prop_assert_eq!(a.soldiers.len(), n.min(MAX_SOLDIERS as i64) as usize);
            prop_assert_eq!(a.strength() as i64, n);
            if let Some(first) = a.soldiers.first() {
                prop_assert_eq!(first.target_offset, Vec2::ZERO);
            }
        }

        #[test]
        fn prop_ring_radius_bounded(n in 1usize..=100) {
            let slots = formation_offsets(n);
            prop_assert_eq!(slots.len(), n);
            // Rings one to five hold 90, so 100 soldiers reach ring six
            for slot in slots {
                prop_assert!(slot.x.abs() <= 6.0 * FORMATION_SPACING + 1e-4);
            }
        }
    }
}
