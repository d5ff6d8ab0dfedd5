//! # Encounter Generation
//!
//! Picks an enemy template for the current level and scales it.
//!
//! Health and damage grow by `enemy_scaling_per_level ^ (level - 1)`; rewards
//! grow by the level-bucket multiplier from [`BalanceConfig::reward_multiplier`].

use crate::{
    Ability, BalanceConfig, BattleError, BattleResult, Enemy, GenerationConfig, Generator,
    RandomSource, Weapon,
};
use log::debug;

/// Unscaled stats for one kind of enemy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyTemplate {
    pub name: &'static str,
    pub base_hp: u32,
    pub base_damage: u32,
    pub base_xp: u32,
    pub base_gold: u32,
    pub abilities: &'static [Ability],
    pub loot: Option<(Weapon, f64)>,
    /// First level at which this template can appear
    pub min_level: u32,
}

impl EnemyTemplate {
    /// Builds an enemy from this template at the given scales.
    pub fn instantiate(&self, stat_scale: f64, reward_scale: f64) -> Enemy {
        let scale = |value: u32, factor: f64| ((value as f64 * factor) + 1e-9).floor().max(1.0) as u32;
        let mut enemy = Enemy::new(
            self.name,
            scale(self.base_hp, stat_scale),
            scale(self.base_damage, stat_scale),
        )
        .with_rewards(
            scale(self.base_xp, reward_scale),
            scale(self.base_gold, reward_scale),
        );
        for ability in self.abilities {
            enemy = enemy.with_ability(*ability);
        }
        if let Some((weapon, chance)) = self.loot {
            enemy = enemy.with_loot(weapon, chance);
        }
        enemy
    }
}

/// The built-in enemy roster, ordered by the level they unlock at.
pub const ENEMY_TEMPLATES: [EnemyTemplate; 7] = [
    EnemyTemplate {
        name: "Slime",
        base_hp: 40,
        base_damage: 6,
        base_xp: 20,
        base_gold: 10,
        abilities: &[],
        loot: None,
        min_level: 1,
    },
    EnemyTemplate {
        name: "Goblin",
        base_hp: 60,
        base_damage: 8,
        base_xp: 30,
        base_gold: 20,
        abilities: &[Ability::StealGold],
        loot: Some((Weapon::IronSword, 0.2)),
        min_level: 1,
    },
    EnemyTemplate {
        name: "Skeleton",
        base_hp: 80,
        base_damage: 10,
        base_xp: 40,
        base_gold: 25,
        abilities: &[],
        loot: None,
        min_level: 2,
    },
    EnemyTemplate {
        name: "Dark Mage",
        base_hp: 90,
        base_damage: 12,
        base_xp: 55,
        base_gold: 35,
        abilities: &[Ability::CurseTiles],
        loot: Some((Weapon::FlameSword, 0.15)),
        min_level: 3,
    },
    EnemyTemplate {
        name: "Shadow Thief",
        base_hp: 85,
        base_damage: 11,
        base_xp: 50,
        base_gold: 45,
        abilities: &[Ability::StealGold],
        loot: Some((Weapon::ShadowBlade, 0.15)),
        min_level: 4,
    },
    EnemyTemplate {
        name: "Young Dragon",
        base_hp: 150,
        base_damage: 16,
        base_xp: 90,
        base_gold: 70,
        abilities: &[Ability::CurseTiles],
        loot: Some((Weapon::DragonSlayer, 0.1)),
        min_level: 5,
    },
    EnemyTemplate {
        name: "Lich",
        base_hp: 130,
        base_damage: 14,
        base_xp: 80,
        base_gold: 60,
        abilities: &[Ability::StealGold, Ability::CurseTiles],
        loot: None,
        min_level: 6,
    },
];

/// Generates the enemy for one encounter.
///
/// # Examples
///
/// ```
/// use tilebattle::{BalanceConfig, EncounterGenerator, GenerationConfig, Generator, SeededRng};
///
/// let balance = BalanceConfig::default();
/// let generator = EncounterGenerator::new(1, &balance);
/// let enemy = generator
///     .generate(&GenerationConfig::new(1), &mut SeededRng::new(1))
///     .unwrap();
/// assert_eq!(enemy.hp, enemy.max_hp);
/// ```
#[derive(Debug, Clone)]
pub struct EncounterGenerator<'a> {
    level: u32,
    balance: &'a BalanceConfig,
    templates: &'a [EnemyTemplate],
}

impl<'a> EncounterGenerator<'a> {
    pub fn new(level: u32, balance: &'a BalanceConfig) -> Self {
        Self {
            level: level.max(1),
            balance,
            templates: &ENEMY_TEMPLATES,
        }
    }

    /// Uses a custom roster instead of [`ENEMY_TEMPLATES`].
    pub fn with_templates(mut self, templates: &'a [EnemyTemplate]) -> Self {
        self.templates = templates;
        self
    }

    /// Templates unlocked at this generator's level.
    pub fn eligible(&self) -> Vec<&'a EnemyTemplate> {
        self.templates
            .iter()
            .filter(|template| template.min_level <= self.level)
            .collect()
    }
}

impl Generator<Enemy> for EncounterGenerator<'_> {
    fn generate(&self, _config: &GenerationConfig, rng: &mut dyn RandomSource) -> BattleResult<Enemy> {
        let eligible = self.eligible();
        if eligible.is_empty() {
            return Err(BattleError::GenerationFailed(format!(
                "No enemy template available at level {}",
                self.level
            )));
        }

        let template = eligible[rng.index(eligible.len())];
        let enemy = template.instantiate(
            self.balance.enemy_scale(self.level),
            self.balance.reward_multiplier(self.level),
        );
        debug!(
            "Level {} encounter: {} ({} hp, {} dmg)",
            self.level, enemy.name, enemy.max_hp, enemy.damage
        );
        Ok(enemy)
    }

    fn validate(&self, enemy: &Enemy, _config: &GenerationConfig) -> BattleResult<()> {
        if enemy.max_hp == 0 || enemy.hp != enemy.max_hp {
            return Err(BattleError::GenerationFailed(format!(
                "{} must start at full, non-zero health",
                enemy.name
            )));
        }
        if !enemy.status_effects.is_empty() {
            return Err(BattleError::GenerationFailed(format!(
                "{} starts with status effects",
                enemy.name
            )));
        }
        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "EncounterGenerator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptedRng;

    #[test]
    fn test_level_one_roster() {
        let balance = BalanceConfig::default();
        let names: Vec<&str> = EncounterGenerator::new(1, &balance)
            .eligible()
            .iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["Slime", "Goblin"]);
    }

    #[test]
    fn test_level_one_is_unscaled() {
        let balance = BalanceConfig::default();
        let generator = EncounterGenerator::new(1, &balance);
        let mut rng = ScriptedRng::constant(0.0);

        let enemy = generator.generate(&GenerationConfig::default(), &mut rng).unwrap();
        assert_eq!(enemy.name, "Slime");
        assert_eq!(enemy.max_hp, 40);
        assert_eq!(enemy.damage, 6);
        assert_eq!(enemy.rewards.xp, 20);
        assert!(generator.validate(&enemy, &GenerationConfig::default()).is_ok());
    }

    #[test]
    fn test_stats_scale_with_level() {
        let balance = BalanceConfig::default();
        let slime = &ENEMY_TEMPLATES[0];
        let enemy = slime.instantiate(balance.enemy_scale(3), balance.reward_multiplier(3));
        // 40 * 1.15^2 = 52.9
        assert_eq!(enemy.max_hp, 52);
        assert_eq!(enemy.damage, 7);
        assert_eq!(enemy.rewards.gold, 10);
    }

    #[test]
    fn test_rewards_scale_by_bucket() {
        let balance = BalanceConfig::default();
        let goblin = &ENEMY_TEMPLATES[1];
        let enemy = goblin.instantiate(1.0, balance.reward_multiplier(6));
        assert_eq!(enemy.rewards.xp, 45);
        assert_eq!(enemy.rewards.gold, 30);
        assert_eq!(enemy.loot.map(|l| l.weapon), Some(Weapon::IronSword));
        assert!(enemy.has_ability(Ability::StealGold));
    }

    #[test]
    fn test_empty_roster_fails() {
        let balance = BalanceConfig::default();
        let generator = EncounterGenerator::new(1, &balance).with_templates(&[]);
        let result = generator.generate(&GenerationConfig::default(), &mut ScriptedRng::constant(0.0));
        assert!(matches!(result, Err(BattleError::GenerationFailed(_))));
    }
}
