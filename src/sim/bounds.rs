//! Axis-aligned bounding boxes for the lane corridor
//!
//! Every collidable thing in the corridor is approximated by an AABB built
//! from its position and a fixed per-type half extent. Intersection uses
//! closed intervals on all three axes, so boxes that merely touch overlap.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// An axis-aligned box in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// The empty box: intersects nothing, is the identity for `union`
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centered on `center` extending `half` along each axis
    #[inline]
    pub fn from_center(center: Vec3, half: Vec3) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Box standing on the ground at `pos` (Y extends upward from `pos.y`)
    #[inline]
    pub fn standing(pos: Vec3, half: Vec3) -> Self {
        Self::from_center(pos + Vec3::new(0.0, half.y, 0.0), half)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    /// Smallest box containing both
    #[inline]
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Closed-interval overlap test on all three axes
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        !(other.max.x < self.min.x
            || other.min.x > self.max.x
            || other.max.y < self.min.y
            || other.min.y > self.max.y
            || other.max.z < self.min.z
            || other.min.z > self.max.z)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}
