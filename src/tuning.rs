//! Run configuration
//!
//! Defaults come from `consts`; a page can override them with a JSON blob
//! (e.g. a `data-tuning` attribute) for playtesting without a rebuild.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::sim::CrateMode;

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("invalid tuning JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field} must be in {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// RNG seed; the shell picks a fresh one per run when this is zero
    pub seed: u64,
    pub crate_mode: CrateMode,
    /// Seconds between volleys before multipliers
    pub base_fire_interval: f32,
    pub lane_change_speed: f32,
    pub spawn_distance: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            seed: 0,
            crate_mode: CrateMode::default(),
            base_fire_interval: BASE_FIRE_INTERVAL,
            lane_change_speed: LANE_CHANGE_SPEED,
            spawn_distance: SPAWN_DISTANCE,
        }
    }
}

fn check_range(field: &'static str, value: f32, min: f32, max: f32) -> Result<(), TuningError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(TuningError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

impl Tuning {
    /// Parse and validate; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        check_range("base_fire_interval", self.base_fire_interval, 0.01, 5.0)?;
        check_range("lane_change_speed", self.lane_change_speed, 0.1, 100.0)?;
        // Spawning behind the cull depth would discard everything at once
        check_range("spawn_distance", self.spawn_distance, 1.0, PROJECTILE_RANGE)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let tuning = Tuning::from_json(r#"{"seed": 99, "crate_mode": "Weapons"}"#).unwrap();
        assert_eq!(tuning.seed, 99);
        assert_eq!(tuning.crate_mode, CrateMode::Weapons);
        assert_eq!(tuning.spawn_distance, SPAWN_DISTANCE);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = Tuning::from_json(r#"{"spawn_distance": -5.0}"#).unwrap_err();
        assert!(matches!(
            err,
            TuningError::OutOfRange {
                field: "spawn_distance",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_bad_json() {
        assert!(matches!(
            Tuning::from_json("{seed: 1"),
            Err(TuningError::Json(_))
        ));
    }
}
