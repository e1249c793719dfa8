//! March of Pixels - a lane-runner arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (spawning, army, collisions, game loop)
//! - `hooks`: Seams to the renderer, audio, HUD, input and leaderboard
//! - `upgrades`: Upgrade catalog and the coin wallet
//! - `leaderboard`: Name validation and the score API client
//! - `tuning`: Data-driven run configuration

#[cfg(target_arch = "wasm32")]
pub mod audio;
pub mod hooks;
pub mod leaderboard;
pub mod settings;
pub mod sim;
pub mod tuning;
pub mod upgrades;

pub use settings::Settings;
pub use tuning::Tuning;
pub use upgrades::{Progress, UpgradeStats};

/// Game configuration constants
pub mod consts {
    /// World X of the left, center and right lanes (indexed by lane + 1)
    pub const LANE_X: [f32; 3] = [-4.5, 0.0, 4.5];
    /// Exponential easing rate toward the target lane (1/s)
    pub const LANE_CHANGE_SPEED: f32 = 15.0;
    /// Snap to the lane once closer than this
    pub const LANE_SNAP_EPSILON: f32 = 0.01;

    /// Strength before the starting-power upgrade (+1 at level 0)
    pub const BASE_STRENGTH: u32 = 9;
    /// Formation cap; strength beyond this is kept but not drawn
    pub const MAX_SOLDIERS: u32 = 100;
    /// Distance between formation rings
    pub const FORMATION_SPACING: f32 = 1.2;
    /// Rings are squashed along Z so the army stays compact
    pub const FORMATION_Z_SQUASH: f32 = 0.6;
    /// Soldiers per ring step (ring n holds up to n * this)
    pub const FORMATION_RING_STEP: usize = 6;
    /// Soldier offset lerp rate (1/s)
    pub const SOLDIER_LERP_SPEED: f32 = 8.0;

    /// Seconds between volleys at a 1.0x fire-rate multiplier
    pub const BASE_FIRE_INTERVAL: f32 = 0.15;
    /// Soldiers that shoot in one volley
    pub const SHOOTERS_PER_VOLLEY: usize = 5;
    /// Fire-rate multiplier bounds for weapon pickups
    pub const MIN_FIRE_RATE_MULTIPLIER: f32 = 0.5;
    pub const MAX_FIRE_RATE_MULTIPLIER: f32 = 3.0;

    /// Projectile speed along +Z (units/s)
    pub const PROJECTILE_SPEED: f32 = 50.0;
    /// Projectiles beyond this depth are dropped
    pub const PROJECTILE_RANGE: f32 = 80.0;
    /// Hit weight of one projectile, scaled by the damage upgrade
    pub const PROJECTILE_HIT_DAMAGE: u32 = 1;
    /// Muzzle height and forward offset from the shooter
    pub const PROJECTILE_SPAWN_Y: f32 = 0.7;
    pub const PROJECTILE_SPAWN_Z: f32 = 1.0;

    /// Obstacles spawn this far ahead of the army
    pub const SPAWN_DISTANCE: f32 = 60.0;
    /// Obstacles strictly behind this depth are culled
    pub const CULL_DEPTH: f32 = -10.0;

    /// Starting world scroll speed (units/s)
    pub const BASE_GAME_SPEED: f32 = 10.0;
    /// Score needed for +1 scroll speed
    pub const SCORE_PER_SPEED_STEP: f32 = 1000.0;
    /// Upper bound on a single frame's simulated time
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Hits a crate takes regardless of damage
    pub const CRATE_HITS: u32 = 3;

    /// Score per point of value
    pub const GATE_SCORE_FACTOR: f64 = 10.0;
    pub const ENEMY_SCORE_FACTOR: f64 = 5.0;
    pub const BARREL_SCORE_FACTOR: f64 = 5.0;
}

/// One of the three discrete lanes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum Lane {
    Left,
    #[default]
    Center,
    Right,
}

impl Lane {
    pub const ALL: [Lane; 3] = [Lane::Left, Lane::Center, Lane::Right];

    /// Signed lane index: -1, 0 or 1
    pub fn index(self) -> i8 {
        match self {
            Lane::Left => -1,
            Lane::Center => 0,
            Lane::Right => 1,
        }
    }

    /// Lane from a signed index; anything out of range clamps to the nearest lane
    pub fn from_index(index: i32) -> Self {
        match index {
            i32::MIN..=-1 => Lane::Left,
            0 => Lane::Center,
            _ => Lane::Right,
        }
    }

    /// World X of this lane
    #[inline]
    pub fn x(self) -> f32 {
        consts::LANE_X[(self.index() + 1) as usize]
    }

    /// Lane under a pointer: the screen is split into equal thirds
    pub fn from_screen_x(x: f32, width: f32) -> Self {
        let third = width / 3.0;
        if x < third {
            Lane::Left
        } else if x > third * 2.0 {
            Lane::Right
        } else {
            Lane::Center
        }
    }

    /// Lane for held direction keys; both or neither means center
    pub fn from_keys(left: bool, right: bool) -> Self {
        match (left, right) {
            (true, false) => Lane::Left,
            (false, true) => Lane::Right,
            _ => Lane::Center,
        }
    }

    /// Lane whose center is closest to a world X
    pub fn nearest(x: f32) -> Self {
        Lane::ALL
            .into_iter()
            .min_by(|a, b| (a.x() - x).abs().total_cmp(&(b.x() - x).abs()))
            .unwrap_or_default()
    }
}

/// Effective frame delta in seconds from two `performance.now()` stamps.
///
/// Clamped to `[0, MAX_FRAME_DT]` so a suspended tab can't tunnel entities
/// through each other on resume.
#[inline]
pub fn frame_dt(now_ms: f64, last_ms: f64) -> f32 {
    (((now_ms - last_ms) / 1000.0) as f32).clamp(0.0, consts::MAX_FRAME_DT)
}

/// World scroll speed for a score
#[inline]
pub fn game_speed_for_score(score: u64) -> f32 {
    consts::BASE_GAME_SPEED + score as f32 / consts::SCORE_PER_SPEED_STEP
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_lane_lookup() {
        assert_eq!(Lane::Left.x(), -4.5);
        assert_eq!(Lane::Center.x(), 0.0);
        assert_eq!(Lane::Right.x(), 4.5);
        assert_eq!(Lane::from_index(-7), Lane::Left);
        assert_eq!(Lane::from_index(3), Lane::Right);
    }

    #[test]
    fn test_pointer_and_key_lanes() {
        assert_eq!(Lane::from_screen_x(10.0, 900.0), Lane::Left);
        assert_eq!(Lane::from_screen_x(450.0, 900.0), Lane::Center);
        assert_eq!(Lane::from_screen_x(899.0, 900.0), Lane::Right);
        assert_eq!(Lane::from_keys(true, true), Lane::Center);
        assert_eq!(Lane::from_keys(false, true), Lane::Right);
        assert_eq!(Lane::nearest(3.9), Lane::Right);
        assert_eq!(Lane::nearest(-1.0), Lane::Center);
    }

    #[test]
    fn test_frame_dt_clamps_after_suspend() {
        assert_eq!(frame_dt(6000.0, 1000.0), 0.1);
        assert_eq!(frame_dt(1100.0, 1000.0), 0.1);
        assert!((frame_dt(1016.0, 1000.0) - 0.016).abs() < 1e-6);
        assert_eq!(frame_dt(900.0, 1000.0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_dt_clamped_for_long_gaps(gap in 100.0f64..1.0e7) {
            prop_assert_eq!(frame_dt(5000.0 + gap, 5000.0), consts::MAX_FRAME_DT);
        }

        #[test]
        fn prop_speed_monotonic(s1 in 0u64..1_000_000, delta in 1u64..100_000) {
            prop_assert!(game_speed_for_score(s1) < game_speed_for_score(s1 + delta));
        }
    }
}
