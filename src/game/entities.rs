//! # Combatants
//!
//! Player and enemy records, plus the closed catalogs of upgrades, weapons
//! and enemy abilities that modify them.

use crate::{BalanceConfig, BattleError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Permanently purchased modifiers to the effect formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Upgrade {
    SwordMaster,
    Berserker,
    ShieldExpert,
    PotionBrewer,
    ManaWell,
    FireLord,
    FreezeImmunity,
    ChainLightning,
    CurseWard,
    PhoenixHeart,
}

impl Upgrade {
    pub const ALL: [Upgrade; 10] = [
        Upgrade::SwordMaster,
        Upgrade::Berserker,
        Upgrade::ShieldExpert,
        Upgrade::PotionBrewer,
        Upgrade::ManaWell,
        Upgrade::FireLord,
        Upgrade::FreezeImmunity,
        Upgrade::ChainLightning,
        Upgrade::CurseWard,
        Upgrade::PhoenixHeart,
    ];

    /// Stable identifier used in saves and commands.
    pub fn id(self) -> &'static str {
        match self {
            Upgrade::SwordMaster => "sword_master",
            Upgrade::Berserker => "berserker",
            Upgrade::ShieldExpert => "shield_expert",
            Upgrade::PotionBrewer => "potion_brewer",
            Upgrade::ManaWell => "mana_well",
            Upgrade::FireLord => "fire_lord",
            Upgrade::FreezeImmunity => "freeze_immunity",
            Upgrade::ChainLightning => "chain_lightning",
            Upgrade::CurseWard => "curse_ward",
            Upgrade::PhoenixHeart => "phoenix_heart",
        }
    }

    /// Gold price in the shop.
    pub fn cost(self) -> u32 {
        match self {
            Upgrade::SwordMaster => 150,
            Upgrade::Berserker => 200,
            Upgrade::ShieldExpert => 120,
            Upgrade::PotionBrewer => 120,
            Upgrade::ManaWell => 100,
            Upgrade::FireLord => 180,
            Upgrade::FreezeImmunity => 150,
            Upgrade::ChainLightning => 200,
            Upgrade::CurseWard => 160,
            Upgrade::PhoenixHeart => 300,
        }
    }

    /// One-line shop description.
    pub fn description(self) -> &'static str {
        match self {
            Upgrade::SwordMaster => "Sword matches deal 50% more damage",
            Upgrade::Berserker => "Double sword damage below 30% health",
            Upgrade::ShieldExpert => "Shield matches grant 75% more shield",
            Upgrade::PotionBrewer => "Potion matches heal 60% more",
            Upgrade::ManaWell => "Mana matches grant 3 extra mana per tile",
            Upgrade::FireLord => "Fire matches deal 8 extra damage per tile",
            Upgrade::FreezeImmunity => "Ice matches no longer build freeze stacks",
            Upgrade::ChainLightning => "Lightning matches deal double damage",
            Upgrade::CurseWard => "Curse matches heal instead of hurting",
            Upgrade::PhoenixHeart => "Revive once per encounter at half health",
        }
    }
}

impl fmt::Display for Upgrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Upgrade {
    type Err = BattleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(|c: char| c == ' ' || c == '-', "_");
        Upgrade::ALL
            .iter()
            .copied()
            .find(|upgrade| upgrade.id() == wanted)
            .ok_or_else(|| BattleError::InvalidAction(format!("Unknown upgrade '{}'", s)))
    }
}

/// Weapons the player can own and equip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weapon {
    RustySword,
    IronSword,
    FlameSword,
    ShadowBlade,
    DragonSlayer,
}

impl Weapon {
    pub const ALL: [Weapon; 5] = [
        Weapon::RustySword,
        Weapon::IronSword,
        Weapon::FlameSword,
        Weapon::ShadowBlade,
        Weapon::DragonSlayer,
    ];

    /// Flat bonus added to the per-tile sword damage.
    pub fn damage_bonus(self) -> u32 {
        match self {
            Weapon::RustySword => 0,
            Weapon::IronSword => 5,
            Weapon::FlameSword => 8,
            Weapon::ShadowBlade => 10,
            Weapon::DragonSlayer => 12,
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Weapon::RustySword => "Rusty Sword",
            Weapon::IronSword => "Iron Sword",
            Weapon::FlameSword => "Flame Sword",
            Weapon::ShadowBlade => "Shadow Blade",
            Weapon::DragonSlayer => "Dragon Slayer",
        }
    }

    fn id(self) -> &'static str {
        match self {
            Weapon::RustySword => "rusty_sword",
            Weapon::IronSword => "iron_sword",
            Weapon::FlameSword => "flame_sword",
            Weapon::ShadowBlade => "shadow_blade",
            Weapon::DragonSlayer => "dragon_slayer",
        }
    }
}

impl fmt::Display for Weapon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Weapon {
    type Err = BattleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(|c: char| c == ' ' || c == '-', "_");
        Weapon::ALL
            .iter()
            .copied()
            .find(|weapon| weapon.id() == wanted)
            .ok_or_else(|| BattleError::InvalidAction(format!("Unknown weapon '{}'", s)))
    }
}

/// Special behaviours an enemy may roll for on its turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    StealGold,
    CurseTiles,
}

/// Stackable status counters, decremented once per enemy turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffects {
    pub burn: u32,
    pub freeze: u32,
    pub shock: u32,
}

impl StatusEffects {
    /// True when no counter is active.
    pub fn is_empty(&self) -> bool {
        self.burn == 0 && self.freeze == 0 && self.shock == 0
    }

    /// Resets every counter.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// How incoming damage was split between shield and health.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageReport {
    pub absorbed: u32,
    pub hp_lost: u32,
}

/// The player's persistent record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub level: u32,
    pub xp: u32,
    pub xp_to_next: u32,
    pub hp: u32,
    pub max_hp: u32,
    pub mana: u32,
    pub max_mana: u32,
    pub shield: u32,
    pub gold: u32,
    pub upgrades: BTreeSet<Upgrade>,
    pub weapon: Weapon,
    pub inventory: BTreeSet<Weapon>,
    #[serde(default)]
    pub status_effects: StatusEffects,
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

impl Player {
    /// Creates a level 1 player with base stats and the starting weapon.
    ///
    /// # Examples
    ///
    /// ```
    /// use tilebattle::{Player, Weapon};
    ///
    /// let player = Player::new();
    /// assert_eq!(player.level, 1);
    /// assert_eq!(player.hp, player.max_hp);
    /// assert!(player.inventory.contains(&Weapon::RustySword));
    /// ```
    pub fn new() -> Self {
        let mut inventory = BTreeSet::new();
        inventory.insert(Weapon::RustySword);
        Self {
            level: 1,
            xp: 0,
            xp_to_next: 100,
            hp: 100,
            max_hp: 100,
            mana: 0,
            max_mana: 50,
            shield: 0,
            gold: 0,
            upgrades: BTreeSet::new(),
            weapon: Weapon::RustySword,
            inventory,
            status_effects: StatusEffects::default(),
        }
    }

    pub fn has_upgrade(&self, upgrade: Upgrade) -> bool {
        self.upgrades.contains(&upgrade)
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Current health as a fraction of maximum.
    pub fn hp_ratio(&self) -> f64 {
        if self.max_hp == 0 {
            return 0.0;
        }
        self.hp as f64 / self.max_hp as f64
    }

    /// Heals without exceeding `max_hp`. Returns the amount actually restored.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let restored = amount.min(self.max_hp.saturating_sub(self.hp));
        self.hp += restored;
        restored
    }

    /// Adds mana without exceeding `max_mana`. Returns the amount gained.
    pub fn restore_mana(&mut self, amount: u32) -> u32 {
        let gained = amount.min(self.max_mana.saturating_sub(self.mana));
        self.mana += gained;
        gained
    }

    pub fn add_shield(&mut self, amount: u32) {
        self.shield = self.shield.saturating_add(amount);
    }

    /// Applies damage to the shield first, then to health.
    pub fn take_damage(&mut self, amount: u32) -> DamageReport {
        let absorbed = amount.min(self.shield);
        self.shield -= absorbed;
        let hp_lost = (amount - absorbed).min(self.hp);
        self.hp -= hp_lost;
        DamageReport { absorbed, hp_lost }
    }

    /// Grants experience and runs the level-up loop. Returns levels gained.
    pub fn gain_xp(&mut self, amount: u32, balance: &BalanceConfig) -> u32 {
        self.xp = self.xp.saturating_add(amount);
        self.apply_level_ups(balance)
    }

    /// Levels up while `xp >= xp_to_next`. Each level raises max HP and mana,
    /// fully heals, and grows the next threshold.
    pub fn apply_level_ups(&mut self, balance: &BalanceConfig) -> u32 {
        let mut gained = 0;
        while self.xp_to_next > 0 && self.xp >= self.xp_to_next {
            self.xp -= self.xp_to_next;
            self.level += 1;
            // Epsilon keeps 100 * 1.2 from flooring to 119.
            self.xp_to_next = (self.xp_to_next as f64 * balance.xp_growth + 1e-9).floor() as u32;
            self.max_hp += balance.level_up_max_hp;
            self.hp = self.max_hp;
            self.max_mana += balance.level_up_max_mana;
            gained += 1;
        }
        gained
    }

    /// Resets per-encounter state: full health, empty shield and mana, no statuses.
    pub fn restore_for_encounter(&mut self) {
        self.hp = self.max_hp;
        self.shield = 0;
        self.mana = 0;
        self.status_effects.clear();
    }

    /// Whether the weapon is in the inventory.
    pub fn owns_weapon(&self, weapon: Weapon) -> bool {
        self.inventory.contains(&weapon)
    }
}

/// Experience and gold paid out on victory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewards {
    pub xp: u32,
    pub gold: u32,
}

/// A weapon an enemy may drop and the probability of the drop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LootEntry {
    pub weapon: Weapon,
    pub chance: f64,
}

/// A single encounter's opponent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub name: String,
    pub hp: u32,
    pub max_hp: u32,
    pub damage: u32,
    pub abilities: BTreeSet<Ability>,
    pub status_effects: StatusEffects,
    pub rewards: Rewards,
    pub loot: Option<LootEntry>,
}

impl Enemy {
    /// Creates an enemy at full health with no abilities, statuses or loot.
    ///
    /// # Examples
    ///
    /// ```
    /// use tilebattle::Enemy;
    ///
    /// let enemy = Enemy::new("Goblin", 60, 8);
    /// assert_eq!(enemy.hp, 60);
    /// assert!(!enemy.is_defeated());
    /// ```
    pub fn new(name: impl Into<String>, max_hp: u32, damage: u32) -> Self {
        Self {
            name: name.into(),
            hp: max_hp,
            max_hp,
            damage,
            abilities: BTreeSet::new(),
            status_effects: StatusEffects::default(),
            rewards: Rewards::default(),
            loot: None,
        }
    }

    pub fn with_rewards(mut self, xp: u32, gold: u32) -> Self {
        self.rewards = Rewards { xp, gold };
        self
    }

    pub fn with_ability(mut self, ability: Ability) -> Self {
        self.abilities.insert(ability);
        self
    }

    pub fn with_loot(mut self, weapon: Weapon, chance: f64) -> Self {
        self.loot = Some(LootEntry { weapon, chance });
        self
    }

    pub fn has_ability(&self, ability: Ability) -> bool {
        self.abilities.contains(&ability)
    }

    pub fn is_defeated(&self) -> bool {
        self.hp == 0
    }

    /// Dragon Slayer doubles damage against anything named a dragon.
    pub fn is_dragon(&self) -> bool {
        self.name.contains("Dragon")
    }

    /// Reduces health, saturating at zero. Returns the damage actually dealt.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let dealt = amount.min(self.hp);
        self.hp -= dealt;
        dealt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heal_is_capped_at_max_hp() {
        let mut player = Player::new();
        player.hp = 50;
        let restored = player.heal(9999);
        assert_eq!(player.hp, 100);
        assert_eq!(restored, 50);
    }

    #[test]
    fn test_mana_is_capped() {
        let mut player = Player::new();
        player.mana = 45;
        assert_eq!(player.restore_mana(30), 5);
        assert_eq!(player.mana, player.max_mana);
    }

    #[test]
    fn test_shield_absorbs_before_hp() {
        let mut player = Player::new();
        player.shield = 5;
        let report = player.take_damage(8);
        assert_eq!(report, DamageReport { absorbed: 5, hp_lost: 3 });
        assert_eq!(player.shield, 0);
        assert_eq!(player.hp, 97);
    }

    #[test]
    fn test_damage_never_underflows() {
        let mut player = Player::new();
        player.hp = 10;
        let report = player.take_damage(500);
        assert_eq!(report.hp_lost, 10);
        assert_eq!(player.hp, 0);
        assert!(!player.is_alive());
    }

    #[test]
    fn test_repeated_level_up() {
        let balance = BalanceConfig::default();
        let mut player = Player::new();
        player.xp = 250;
        player.xp_to_next = 100;

        let gained = player.gain_xp(0, &balance);

        assert_eq!(gained, 2);
        assert_eq!(player.level, 3);
        assert_eq!(player.xp, 30);
        assert_eq!(player.xp_to_next, 144);
        assert_eq!(player.max_hp, 150);
        assert_eq!(player.hp, 150);
        assert_eq!(player.max_mana, 70);
    }

    #[test]
    fn test_no_level_up_below_threshold() {
        let balance = BalanceConfig::default();
        let mut player = Player::new();
        assert_eq!(player.gain_xp(99, &balance), 0);
        assert_eq!(player.level, 1);
    }

    #[test]
    fn test_enemy_damage_saturates() {
        let mut enemy = Enemy::new("Slime", 40, 6);
        assert_eq!(enemy.take_damage(25), 25);
        assert_eq!(enemy.take_damage(25), 15);
        assert!(enemy.is_defeated());
    }

    #[test]
    fn test_dragon_detection() {
        assert!(Enemy::new("Young Dragon", 100, 10).is_dragon());
        assert!(!Enemy::new("Goblin", 60, 8).is_dragon());
    }

    #[test]
    fn test_upgrade_parsing() {
        assert_eq!("sword_master".parse::<Upgrade>().unwrap(), Upgrade::SwordMaster);
        assert_eq!("Phoenix Heart".parse::<Upgrade>().unwrap(), Upgrade::PhoenixHeart);
        assert!("laser_eyes".parse::<Upgrade>().is_err());
    }

    #[test]
    fn test_weapon_parsing() {
        assert_eq!("Flame Sword".parse::<Weapon>().unwrap(), Weapon::FlameSword);
        assert_eq!("dragon-slayer".parse::<Weapon>().unwrap(), Weapon::DragonSlayer);
        assert!("spoon".parse::<Weapon>().is_err());
    }

    #[test]
    fn test_upgrade_serde_uses_ids() {
        let json = serde_json::to_string(&Upgrade::CurseWard).unwrap();
        assert_eq!(json, "\"curse_ward\"");
    }
}
