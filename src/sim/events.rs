//! Notifications emitted by the simulation
//!
//! Subsystems queue these while they run; the orchestrator drains them at the
//! end of the frame and forwards them to the scene and audio collaborators.
//! Nothing in the simulation reads them back.

use glam::Vec3;

use super::entity::{CratePayload, EntityId, EntityKind};

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// A new entity needs a scene object
    Spawned {
        kind: EntityKind,
        id: EntityId,
        pos: Vec3,
    },
    /// An entity left every collection; release its scene object
    Despawned { kind: EntityKind, id: EntityId },
    /// A volley left the muzzles
    ShotsFired { count: u32 },
    GatePassed { value: i32 },
    EnemyDestroyed { value: u32 },
    BarrelDestroyed { value: u32 },
    CrateOpened { payload: CratePayload },
    /// Run ended with these final stats
    GameOver { score: u64, strength: u32 },
}
