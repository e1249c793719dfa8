//! Corridor entities
//!
//! Obstacles (enemies, gates, barrels, crates) sit still in world space and
//! reach the army only because the world scrolls toward it. Projectiles fly
//! the other way at a fixed speed. Soldiers belong to the army and are never
//! collided individually.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::bounds::Aabb;
use super::events::GameEvent;
use crate::consts::*;

/// Entity identifier. Each owner counts from 1, so only `(EntityKind, EntityId)`
/// is unique within a run.
pub type EntityId = u32;

/// Type tag for lifecycle hooks and audio cues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Enemy,
    Gate,
    Barrel,
    Crate,
    Projectile,
    Soldier,
}

/// Half extents per entity type
pub const ENEMY_HALF_EXTENTS: Vec3 = Vec3::new(0.3, 1.0, 0.25);
pub const GATE_HALF_EXTENTS: Vec3 = Vec3::new(2.25, 2.125, 0.25);
pub const BARREL_HALF_EXTENTS: Vec3 = Vec3::new(0.67, 0.75, 0.67);
pub const CRATE_HALF_EXTENTS: Vec3 = Vec3::new(0.6, 0.6, 0.6);
pub const PROJECTILE_HALF_EXTENTS: Vec3 = Vec3::new(0.15, 0.15, 0.4);
pub const SOLDIER_HALF_EXTENTS: Vec3 = Vec3::new(0.45, 0.8, 0.3);

/// Shared capability set of everything the spawner or the army owns
pub trait Entity {
    const KIND: EntityKind;

    fn id(&self) -> EntityId;

    fn pos(&self) -> Vec3;

    /// Box at the current position
    fn bounds(&self) -> Aabb;

    /// Advance one frame
    fn update(&mut self, dt: f32, game_speed: f32);

    /// Consume the entity, yielding the notification that releases its
    /// scene resources
    fn dispose(self) -> GameEvent
    where
        Self: Sized,
    {
        GameEvent::Despawned {
            kind: Self::KIND,
            id: self.id(),
        }
    }
}

/// Implements `Entity` for an obstacle that scrolls toward the army
macro_rules! scrolling_obstacle {
    ($ty:ty, $kind:expr, $half:expr) => {
        impl Entity for $ty {
            const KIND: EntityKind = $kind;

            #[inline]
            fn id(&self) -> EntityId {
                self.id
            }

            #[inline]
            fn pos(&self) -> Vec3 {
                self.pos
            }

            #[inline]
            fn bounds(&self) -> Aabb {
                Aabb::standing(self.pos, $half)
            }

            fn update(&mut self, dt: f32, game_speed: f32) {
                self.pos.z -= game_speed * dt;
            }
        }
    };
}

/// A hostile soldier. Touching the army ends the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: EntityId,
    pub pos: Vec3,
    /// Worth on destruction, also the starting health
    pub value: u32,
    pub health: i32,
}

impl Enemy {
    pub fn new(id: EntityId, pos: Vec3, value: u32) -> Self {
        Self {
            id,
            pos,
            value,
            health: value as i32,
        }
    }

    /// Apply damage; true once health is gone
    pub fn take_damage(&mut self, amount: u32) -> bool {
        self.health -= amount as i32;
        self.health <= 0
    }
}

scrolling_obstacle!(Enemy, EntityKind::Enemy, ENEMY_HALF_EXTENTS);

/// A strength gate. Single use, consumed on first contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gate {
    pub id: EntityId,
    pub pos: Vec3,
    /// Signed strength delta
    pub value: i32,
}

impl Gate {
    pub fn new(id: EntityId, pos: Vec3, value: i32) -> Self {
        Self { id, pos, value }
    }
}

scrolling_obstacle!(Gate, EntityKind::Gate, GATE_HALF_EXTENTS);

/// A barrel that pays out strength and score once shot apart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Barrel {
    pub id: EntityId,
    pub pos: Vec3,
    pub value: u32,
    pub health: i32,
}

impl Barrel {
    pub fn new(id: EntityId, pos: Vec3, value: u32) -> Self {
        Self {
            id,
            pos,
            value,
            health: value as i32,
        }
    }

    pub fn take_damage(&mut self, amount: u32) -> bool {
        self.health -= amount as i32;
        self.health <= 0
    }
}

scrolling_obstacle!(Barrel, EntityKind::Barrel, BARREL_HALF_EXTENTS);

/// Weapon modifier found in crates, as a fire-rate change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponTier {
    Plus50,
    Plus30,
    Plus20,
    Plus10,
    Minus10,
    Minus20,
    Minus30,
}

impl WeaponTier {
    /// Roll table: (tier, weight in percent)
    pub const TABLE: [(WeaponTier, u32); 7] = [
        (WeaponTier::Plus50, 15),
        (WeaponTier::Plus30, 20),
        (WeaponTier::Plus20, 20),
        (WeaponTier::Plus10, 15),
        (WeaponTier::Minus10, 12),
        (WeaponTier::Minus20, 10),
        (WeaponTier::Minus30, 8),
    ];

    /// Pick a tier from a uniform roll in [0, 1)
    pub fn from_roll(roll: f32) -> Self {
        let mut cumulative = 0.0;
        for (tier, weight) in Self::TABLE {
            cumulative += weight as f32 / 100.0;
            if roll < cumulative {
                return tier;
            }
        }
        // Float rounding can leave the tail just under 1.0
        WeaponTier::Minus30
    }

    /// Factor applied to the fire-rate multiplier
    pub fn fire_rate_factor(self) -> f32 {
        match self {
            WeaponTier::Plus50 => 1.5,
            WeaponTier::Plus30 => 1.3,
            WeaponTier::Plus20 => 1.2,
            WeaponTier::Plus10 => 1.1,
            WeaponTier::Minus10 => 0.9,
            WeaponTier::Minus20 => 0.8,
            WeaponTier::Minus30 => 0.7,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WeaponTier::Plus50 => "+50% fire rate",
            WeaponTier::Plus30 => "+30% fire rate",
            WeaponTier::Plus20 => "+20% fire rate",
            WeaponTier::Plus10 => "+10% fire rate",
            WeaponTier::Minus10 => "-10% fire rate",
            WeaponTier::Minus20 => "-20% fire rate",
            WeaponTier::Minus30 => "-30% fire rate",
        }
    }
}

/// What a crate pays out
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CratePayload {
    Coins(u32),
    Weapon(WeaponTier),
}

/// A crate. Breaks after a fixed number of hits, whatever the damage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crate {
    pub id: EntityId,
    pub pos: Vec3,
    pub payload: CratePayload,
    pub hits_left: u32,
}

impl Crate {
    pub fn new(id: EntityId, pos: Vec3, payload: CratePayload) -> Self {
        Self {
            id,
            pos,
            payload,
            hits_left: CRATE_HITS,
        }
    }

    /// Register one hit; true once broken
    pub fn take_hit(&mut self) -> bool {
        self.hits_left = self.hits_left.saturating_sub(1);
        self.hits_left == 0
    }
}

scrolling_obstacle!(Crate, EntityKind::Crate, CRATE_HALF_EXTENTS);

/// A shot fired by a soldier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: EntityId,
    pub pos: Vec3,
}

impl Projectile {
    pub fn new(id: EntityId, pos: Vec3) -> Self {
        Self { id, pos }
    }

    /// Past the far end of the corridor
    #[inline]
    pub fn out_of_range(&self) -> bool {
        self.pos.z > PROJECTILE_RANGE
    }
}

impl Entity for Projectile {
    const KIND: EntityKind = EntityKind::Projectile;

    fn id(&self) -> EntityId {
        self.id
    }

    fn pos(&self) -> Vec3 {
        self.pos
    }

    fn bounds(&self) -> Aabb {
        Aabb::from_center(self.pos, PROJECTILE_HALF_EXTENTS)
    }

    /// Flies at its own speed; world scroll does not apply
    fn update(&mut self, dt: f32, _game_speed: f32) {
        self.pos.z += PROJECTILE_SPEED * dt;
    }
}

/// One member of the army formation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Soldier {
    pub id: EntityId,
    /// Current (x, z) offset from the army base
    pub offset: Vec2,
    /// Formation slot this soldier is walking toward
    pub target_offset: Vec2,
    /// World position, refreshed by `follow`
    pub pos: Vec3,
}

impl Soldier {
    pub fn new(id: EntityId, base: Vec3, offset: Vec2) -> Self {
        Self {
            id,
            offset,
            target_offset: offset,
            pos: base + Vec3::new(offset.x, 0.0, offset.y),
        }
    }

    /// Ease toward the formation slot and re-anchor on the army base
    pub fn follow(&mut self, dt: f32, base: Vec3) {
        let t = SOLDIER_LERP_SPEED * dt;
        self.offset += (self.target_offset - self.offset) * t;
        self.pos = base + Vec3::new(self.offset.x, 0.0, self.offset.y);
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::standing(self.pos, SOLDIER_HALF_EXTENTS)
    }
}
