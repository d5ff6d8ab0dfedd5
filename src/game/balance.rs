//! # Balance Configuration
//!
//! Every tuning number used by effect resolution, enemy turns, encounter
//! scaling and progression lives in [`BalanceConfig`], so fixtures and
//! tuning passes never need to touch engine logic.

use crate::{BattleError, BattleResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Game balance constants.
///
/// Deserialization fills any missing field from [`BalanceConfig::default`], so
/// an override file only needs the values it changes.
///
/// # Examples
///
/// ```
/// use tilebattle::BalanceConfig;
///
/// let balance = BalanceConfig::from_json_str(r#"{ "sword_base_damage": 20.0 }"#).unwrap();
/// assert_eq!(balance.sword_base_damage, 20.0);
/// assert_eq!(balance.shield_per_tile, 12.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    // Sword
    pub sword_base_damage: f64,
    pub sword_master_multiplier: f64,
    pub berserker_multiplier: f64,
    /// Berserker applies while `hp / max_hp` is strictly below this ratio
    pub berserker_hp_threshold: f64,
    pub crit_base_chance: f64,
    pub crit_chance_per_combo: f64,
    pub crit_multiplier: f64,

    // Defensive and resource tiles
    pub shield_per_tile: f64,
    pub shield_expert_multiplier: f64,
    pub heal_per_tile: f64,
    pub potion_brewer_multiplier: f64,
    pub mana_per_tile: f64,
    pub mana_well_bonus: f64,

    // Elemental tiles
    pub fire_damage_per_tile: f64,
    pub fire_lord_bonus: f64,
    pub flame_sword_bonus_per_tile: f64,
    pub flame_sword_proc_chance: f64,
    pub ice_damage_per_tile: f64,
    pub lightning_damage_per_tile: f64,
    pub chain_lightning_multiplier: f64,

    // Curse
    pub curse_penalty_per_tile: f64,
    pub curse_ward_heal_per_tile: f64,

    /// Each combo step adds this much to the `1 + step * combo` multiplier
    pub combo_multiplier_step: f64,

    // Weapon modifiers applied when damage lands on the enemy
    pub shadow_blade_multiplier: f64,
    pub dragon_slayer_multiplier: f64,

    // Enemy turn
    pub burn_damage_per_stack: u32,
    pub freeze_damage_factor: f64,
    pub shock_damage_factor: f64,
    pub steal_gold_chance: f64,
    pub steal_gold_fraction: f64,
    pub curse_tiles_chance: f64,
    pub curse_tiles_count: usize,
    pub phoenix_revive_fraction: f64,

    // Encounter scaling
    pub enemy_scaling_per_level: f64,
    /// Levels per reward bucket
    pub reward_bucket_size: u32,
    /// Reward multiplier added per completed bucket
    pub reward_bucket_step: f64,

    // Progression
    pub xp_growth: f64,
    pub level_up_max_hp: u32,
    pub level_up_max_mana: u32,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            sword_base_damage: 15.0,
            sword_master_multiplier: 1.5,
            berserker_multiplier: 2.0,
            berserker_hp_threshold: 0.3,
            crit_base_chance: 0.10,
            crit_chance_per_combo: 0.05,
            crit_multiplier: 2.0,

            shield_per_tile: 12.0,
            shield_expert_multiplier: 1.75,
            heal_per_tile: 15.0,
            potion_brewer_multiplier: 1.6,
            mana_per_tile: 10.0,
            mana_well_bonus: 3.0,

            fire_damage_per_tile: 4.0,
            fire_lord_bonus: 8.0,
            flame_sword_bonus_per_tile: 5.0,
            flame_sword_proc_chance: 0.3,
            ice_damage_per_tile: 3.0,
            lightning_damage_per_tile: 10.0,
            chain_lightning_multiplier: 2.0,

            curse_penalty_per_tile: 10.0,
            curse_ward_heal_per_tile: 8.0,

            combo_multiplier_step: 0.3,

            shadow_blade_multiplier: 1.25,
            dragon_slayer_multiplier: 2.0,

            burn_damage_per_stack: 3,
            freeze_damage_factor: 0.4,
            shock_damage_factor: 0.7,
            steal_gold_chance: 0.3,
            steal_gold_fraction: 0.1,
            curse_tiles_chance: 0.25,
            curse_tiles_count: 3,
            phoenix_revive_fraction: 0.5,

            enemy_scaling_per_level: 1.15,
            reward_bucket_size: 5,
            reward_bucket_step: 0.5,

            xp_growth: 1.2,
            level_up_max_hp: 25,
            level_up_max_mana: 10,
        }
    }
}

impl BalanceConfig {
    /// Parses a (possibly partial) JSON override and validates it.
    pub fn from_json_str(json: &str) -> BattleResult<Self> {
        let config: BalanceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a (possibly partial) JSON override from disk and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> BattleResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Combo multiplier `1 + step * combo` for a 0-based combo count.
    pub fn combo_multiplier(&self, combo: u32) -> f64 {
        1.0 + self.combo_multiplier_step * combo as f64
    }

    /// Critical-hit probability at the given combo count.
    pub fn crit_chance(&self, combo: u32) -> f64 {
        self.crit_base_chance + self.crit_chance_per_combo * combo as f64
    }

    /// Reward multiplier for the bucket containing `level`.
    pub fn reward_multiplier(&self, level: u32) -> f64 {
        let bucket = level.saturating_sub(1) / self.reward_bucket_size.max(1);
        1.0 + self.reward_bucket_step * bucket as f64
    }

    /// Enemy stat scale `per_level ^ (level - 1)`.
    pub fn enemy_scale(&self, level: u32) -> f64 {
        self.enemy_scaling_per_level
            .powi(level.saturating_sub(1) as i32)
    }

    /// Rejects values that would break the engine's arithmetic.
    pub fn validate(&self) -> BattleResult<()> {
        let probabilities = [
            ("berserker_hp_threshold", self.berserker_hp_threshold),
            ("crit_base_chance", self.crit_base_chance),
            ("crit_chance_per_combo", self.crit_chance_per_combo),
            ("flame_sword_proc_chance", self.flame_sword_proc_chance),
            ("freeze_damage_factor", self.freeze_damage_factor),
            ("shock_damage_factor", self.shock_damage_factor),
            ("steal_gold_chance", self.steal_gold_chance),
            ("steal_gold_fraction", self.steal_gold_fraction),
            ("curse_tiles_chance", self.curse_tiles_chance),
            ("phoenix_revive_fraction", self.phoenix_revive_fraction),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(BattleError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        let non_negative = [
            ("sword_base_damage", self.sword_base_damage),
            ("sword_master_multiplier", self.sword_master_multiplier),
            ("berserker_multiplier", self.berserker_multiplier),
            ("crit_multiplier", self.crit_multiplier),
            ("shield_per_tile", self.shield_per_tile),
            ("shield_expert_multiplier", self.shield_expert_multiplier),
            ("heal_per_tile", self.heal_per_tile),
            ("potion_brewer_multiplier", self.potion_brewer_multiplier),
            ("mana_per_tile", self.mana_per_tile),
            ("mana_well_bonus", self.mana_well_bonus),
            ("fire_damage_per_tile", self.fire_damage_per_tile),
            ("fire_lord_bonus", self.fire_lord_bonus),
            ("flame_sword_bonus_per_tile", self.flame_sword_bonus_per_tile),
            ("ice_damage_per_tile", self.ice_damage_per_tile),
            ("lightning_damage_per_tile", self.lightning_damage_per_tile),
            ("chain_lightning_multiplier", self.chain_lightning_multiplier),
            ("curse_penalty_per_tile", self.curse_penalty_per_tile),
            ("curse_ward_heal_per_tile", self.curse_ward_heal_per_tile),
            ("combo_multiplier_step", self.combo_multiplier_step),
            ("shadow_blade_multiplier", self.shadow_blade_multiplier),
            ("dragon_slayer_multiplier", self.dragon_slayer_multiplier),
            ("reward_bucket_step", self.reward_bucket_step),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(BattleError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if self.enemy_scaling_per_level <= 0.0 || self.xp_growth < 1.0 {
            return Err(BattleError::InvalidConfig(
                "enemy_scaling_per_level must be positive and xp_growth at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
