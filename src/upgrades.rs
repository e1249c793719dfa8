//! Permanent upgrades bought with coins
//!
//! Levels and the coin wallet persist between runs in LocalStorage. A run
//! reads one `UpgradeStats` snapshot when it starts and never looks again.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The purchasable upgrades
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    StartingStrength,
    FireRate,
    ProjectileDamage,
    CoinMultiplier,
    ScoreMultiplier,
}

/// Catalog entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpgradeDef {
    pub kind: UpgradeKind,
    pub name: &'static str,
    pub description: &'static str,
    pub base_value: f64,
    pub increment: f64,
    pub max_level: u32,
    pub base_cost: u32,
    pub cost_multiplier: f64,
}

pub const CATALOG: [UpgradeDef; 5] = [
    UpgradeDef {
        kind: UpgradeKind::StartingStrength,
        name: "Starting Power",
        description: "Increase starting strength",
        base_value: 1.0,
        increment: 2.0,
        max_level: 10,
        base_cost: 50,
        cost_multiplier: 1.5,
    },
    UpgradeDef {
        kind: UpgradeKind::FireRate,
        name: "Fire Rate",
        description: "Shoot faster projectiles",
        base_value: 1.0,
        increment: 0.15,
        max_level: 8,
        base_cost: 75,
        cost_multiplier: 1.6,
    },
    UpgradeDef {
        kind: UpgradeKind::ProjectileDamage,
        name: "Projectile Power",
        description: "Deal more damage per hit",
        base_value: 5.0,
        increment: 2.0,
        max_level: 5,
        base_cost: 100,
        cost_multiplier: 2.0,
    },
    UpgradeDef {
        kind: UpgradeKind::CoinMultiplier,
        name: "Coin Bonus",
        description: "Earn more coins from crates",
        base_value: 1.0,
        increment: 0.25,
        max_level: 8,
        base_cost: 100,
        cost_multiplier: 1.8,
    },
    UpgradeDef {
        kind: UpgradeKind::ScoreMultiplier,
        name: "Score Bonus",
        description: "Earn more score points",
        base_value: 1.0,
        increment: 0.1,
        max_level: 10,
        base_cost: 60,
        cost_multiplier: 1.4,
    },
];

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 5] = [
        UpgradeKind::StartingStrength,
        UpgradeKind::FireRate,
        UpgradeKind::ProjectileDamage,
        UpgradeKind::CoinMultiplier,
        UpgradeKind::ScoreMultiplier,
    ];

    pub fn def(self) -> &'static UpgradeDef {
        &CATALOG[self as usize]
    }

    /// Menu text for a value of this upgrade
    pub fn format_value(self, value: f64) -> String {
        match self {
            UpgradeKind::StartingStrength => format!("+{}", value.floor()),
            UpgradeKind::ProjectileDamage => format!("{} dmg", value.floor()),
            UpgradeKind::FireRate | UpgradeKind::CoinMultiplier | UpgradeKind::ScoreMultiplier => {
                format!("{value:.2}x")
            }
        }
    }
}

impl UpgradeDef {
    /// Computed in f64 so multipliers like 1.3 floor the same way in scoring
    pub fn value_at(&self, level: u32) -> f64 {
        self.base_value + self.increment * level as f64
    }

    /// Price of the next level, none once maxed
    pub fn cost_at(&self, level: u32) -> Option<u64> {
        if level >= self.max_level {
            return None;
        }
        Some((self.base_cost as f64 * self.cost_multiplier.powi(level as i32)).floor() as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurchaseError {
    #[error("already at max level")]
    MaxLevel,
    #[error("need {cost} coins, have {coins}")]
    InsufficientCoins { cost: u64, coins: u64 },
}

/// Upgrade-derived multipliers for one run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpgradeStats {
    /// Strength bonus, floored
    pub starting_strength: u32,
    pub fire_rate: f64,
    /// Damage per projectile hit, floored
    pub projectile_damage: u32,
    pub coin_multiplier: f64,
    pub score_multiplier: f64,
}

impl Default for UpgradeStats {
    fn default() -> Self {
        Progress::default().stats()
    }
}

/// Coin wallet and upgrade levels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub coins: u64,
    #[serde(default)]
    pub starting_strength: u32,
    #[serde(default)]
    pub fire_rate: u32,
    #[serde(default)]
    pub projectile_damage: u32,
    #[serde(default)]
    pub coin_multiplier: u32,
    #[serde(default)]
    pub score_multiplier: u32,
}

impl Progress {
    pub fn level(&self, kind: UpgradeKind) -> u32 {
        match kind {
            UpgradeKind::StartingStrength => self.starting_strength,
            UpgradeKind::FireRate => self.fire_rate,
            UpgradeKind::ProjectileDamage => self.projectile_damage,
            UpgradeKind::CoinMultiplier => self.coin_multiplier,
            UpgradeKind::ScoreMultiplier => self.score_multiplier,
        }
    }

    fn level_mut(&mut self, kind: UpgradeKind) -> &mut u32 {
        match kind {
            UpgradeKind::StartingStrength => &mut self.starting_strength,
            UpgradeKind::FireRate => &mut self.fire_rate,
            UpgradeKind::ProjectileDamage => &mut self.projectile_damage,
            UpgradeKind::CoinMultiplier => &mut self.coin_multiplier,
            UpgradeKind::ScoreMultiplier => &mut self.score_multiplier,
        }
    }

    pub fn value(&self, kind: UpgradeKind) -> f64 {
        kind.def().value_at(self.level(kind))
    }

    pub fn cost(&self, kind: UpgradeKind) -> Option<u64> {
        kind.def().cost_at(self.level(kind))
    }

    pub fn can_afford(&self, kind: UpgradeKind) -> bool {
        self.cost(kind).is_some_and(|cost| self.coins >= cost)
    }

    /// Buy the next level; returns the coins left
    pub fn purchase(&mut self, kind: UpgradeKind) -> Result<u64, PurchaseError> {
        let cost = self.cost(kind).ok_or(PurchaseError::MaxLevel)?;
        if self.coins < cost {
            return Err(PurchaseError::InsufficientCoins {
                cost,
                coins: self.coins,
            });
        }
        self.coins -= cost;
        *self.level_mut(kind) += 1;
        Ok(self.coins)
    }

    /// Bank coins earned in a run
    pub fn deposit(&mut self, coins: u64) {
        self.coins = self.coins.saturating_add(coins);
    }

    /// Snapshot for a new run
    pub fn stats(&self) -> UpgradeStats {
        UpgradeStats {
            starting_strength: self.value(UpgradeKind::StartingStrength).floor() as u32,
            fire_rate: self.value(UpgradeKind::FireRate),
            projectile_damage: self.value(UpgradeKind::ProjectileDamage).floor() as u32,
            coin_multiplier: self.value(UpgradeKind::CoinMultiplier),
            score_multiplier: self.value(UpgradeKind::ScoreMultiplier),
        }
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "mop_progress";

    /// Load progress from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match serde_json::from_str(&json) {
                    Ok(progress) => return progress,
                    Err(e) => log::warn!("Ignoring corrupt progress: {e}"),
                }
            }
        }
        Self::default()
    }

    /// Save progress to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {}
}
