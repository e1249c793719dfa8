//! Collision detection for the lane corridor
//!
//! A plain linear scan: the army collapses to one box and obstacle counts
//! stay in the tens, so there is no spatial index. `check` only reports
//! pairings. Damage, rewards and removal are the orchestrator's job.

use super::army::Army;
use super::entity::{Entity, EntityId};
use super::spawner::Spawner;
use crate::consts::PROJECTILE_HIT_DAMAGE;

/// A projectile matched against a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub target: EntityId,
    pub projectile: EntityId,
    pub damage: u32,
}

/// Everything that touched this frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionReport {
    /// Gates overlapping the army, whether or not they were reported before
    pub gate_hits: Vec<EntityId>,
    pub enemy_hits: Vec<Hit>,
    pub barrel_hits: Vec<Hit>,
    pub crate_hits: Vec<Hit>,
    /// Some enemy touched the army
    pub player_hit: bool,
}

impl CollisionReport {
    pub fn is_empty(&self) -> bool {
        self.gate_hits.is_empty()
            && self.enemy_hits.is_empty()
            && self.barrel_hits.is_empty()
            && self.crate_hits.is_empty()
            && !self.player_hit
    }
}

/// Test the army and its projectiles against every live obstacle
pub fn check(army: &Army, spawner: &Spawner) -> CollisionReport {
    let mut report = CollisionReport::default();
    let army_box = army.bounds();

    for gate in &spawner.gates {
        if army_box.intersects(&gate.bounds()) {
            report.gate_hits.push(gate.id);
        }
    }

    // First match wins: enemies, then barrels, then crates
    for projectile in &army.projectiles {
        let shot = projectile.bounds();
        let hit = |target: EntityId| Hit {
            target,
            projectile: projectile.id,
            damage: PROJECTILE_HIT_DAMAGE,
        };

        if let Some(enemy) = spawner.enemies.iter().find(|e| shot.intersects(&e.bounds())) {
            report.enemy_hits.push(hit(enemy.id));
        } else if let Some(barrel) = spawner.barrels.iter().find(|b| shot.intersects(&b.bounds())) {
            report.barrel_hits.push(hit(barrel.id));
        } else if let Some(c) = spawner.crates.iter().find(|c| shot.intersects(&c.bounds())) {
            report.crate_hits.push(hit(c.id));
        }
    }

    report.player_hit = spawner
        .enemies
        .iter()
        .any(|e| army_box.intersects(&e.bounds()));

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::sim::entity::{CratePayload, Projectile};
    use crate::sim::spawner::CrateMode;
    use glam::Vec3;

    fn setup(strength: u32) -> (Army, Spawner) {
        (
            Army::new(strength, 1.0, BASE_FIRE_INTERVAL, LANE_CHANGE_SPEED),
            Spawner::new(1, CrateMode::Coins, SPAWN_DISTANCE),
        )
    }

    #[test]
    fn test_enemy_beats_crate_for_one_projectile() {
        let (mut army, mut spawner) = setup(1);
        army.projectiles.push(Projectile::new(900, Vec3::new(0.0, 0.5, 20.0)));
        let enemy = spawner.place_enemy(Vec3::new(0.0, 0.0, 20.0), 5);
        spawner.place_crate(Vec3::new(0.0, 0.0, 20.0), CratePayload::Coins(10));

        let report = check(&army, &spawner);
        assert_eq!(
            report.enemy_hits,
            vec![Hit {
                target: enemy,
                projectile: 900,
                damage: 1,
            }]
        );
        assert!(report.crate_hits.is_empty());
        assert!(!report.player_hit);
    }

    #[test]
    fn test_barrel_beats_crate() {
        let (mut army, mut spawner) = setup(1);
        army.projectiles.push(Projectile::new(7, Vec3::new(4.5, 0.5, 30.0)));
        let barrel = spawner.place_barrel(Vec3::new(4.5, 0.0, 30.0), 3);
        spawner.place_crate(Vec3::new(4.5, 0.0, 30.0), CratePayload::Coins(10));

        let report = check(&army, &spawner);
        assert_eq!(report.barrel_hits.len(), 1);
        assert_eq!(report.barrel_hits[0].target, barrel);
        assert!(report.crate_hits.is_empty());
    }

    #[test]
    fn test_every_projectile_reports_once() {
        let (mut army, mut spawner) = setup(1);
        let c = spawner.place_crate(Vec3::new(0.0, 0.0, 15.0), CratePayload::Coins(10));
        army.projectiles.push(Projectile::new(1, Vec3::new(0.0, 0.5, 15.0)));
        army.projectiles.push(Projectile::new(2, Vec3::new(0.2, 0.5, 15.0)));

        let report = check(&army, &spawner);
        assert_eq!(report.crate_hits.len(), 2);
        assert!(report.crate_hits.iter().all(|h| h.target == c && h.damage == 1));
    }

    #[test]
    fn test_gate_reported_while_overlapping() {
        let (army, mut spawner) = setup(10);
        let gate = spawner.place_gate(Vec3::new(0.0, 0.0, 0.0), 3);
        for _ in 0..3 {
            assert_eq!(check(&army, &spawner).gate_hits, vec![gate]);
        }
    }

    #[test]
    fn test_enemy_contact_sets_player_hit() {
        let (army, mut spawner) = setup(10);
        spawner.place_enemy(Vec3::ZERO, 5);
        assert!(check(&army, &spawner).player_hit);
    }

    #[test]
    fn test_empty_army_never_touches() {
        let (army, mut spawner) = setup(0);
        spawner.place_enemy(Vec3::ZERO, 5);
        spawner.place_gate(Vec3::ZERO, 5);
        assert!(check(&army, &spawner).is_empty());
    }

    #[test]
    fn test_other_lane_is_clear() {
        let (army, mut spawner) = setup(1);
        spawner.place_enemy(Vec3::new(4.5, 0.0, 0.0), 5);
        assert!(!check(&army, &spawner).player_hit);
    }
}
