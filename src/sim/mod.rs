//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must stay deterministic and
//! platform-free:
//! - Seeded RNG only
//! - Stable iteration order (insertion order per collection)
//! - No rendering, audio or network dependencies; those sit behind `hooks`

pub mod army;
pub mod bounds;
pub mod collision;
pub mod entity;
pub mod events;
pub mod game;
pub mod spawner;

pub use army::{Army, formation_offsets};
pub use bounds::Aabb;
pub use collision::{CollisionReport, Hit, check};
pub use entity::{
    Barrel, Crate, CratePayload, Enemy, Entity, EntityId, EntityKind, Gate, Projectile, Soldier,
    WeaponTier,
};
pub use events::GameEvent;
pub use game::{Game, Phase};
pub use spawner::{CrateMode, Spawner};
