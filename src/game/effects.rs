//! # Effect Resolution
//!
//! Converts the tally of tiles removed in one resolution tick into a
//! [`CombatEffect`]: damage, healing, mana, shield and status stacks.
//!
//! Tile types are folded in catalog order (sword first, curse last) and the
//! combo multiplier `1 + step * combo` is applied to each numeric category as
//! it is folded. The sword critical roll doubles the running damage total at
//! the moment it is rolled. Status stacks are raw tile counts.

use crate::{BalanceConfig, Board, Player, Position, RandomSource, TileType, Upgrade, Weapon};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Count of matched tiles per type for a single tick.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchTally {
    counts: BTreeMap<TileType, u32>,
}

impl MatchTally {
    /// Creates an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tallies the tile types found at the given cells. Each cell counts once.
    pub fn from_cells(board: &Board, cells: &BTreeSet<Position>) -> Self {
        let mut tally = Self::new();
        for &pos in cells {
            if let Some(tile_type) = board.tile_type_at(pos) {
                tally.add(tile_type, 1);
            }
        }
        tally
    }

    /// Builds a tally from explicit counts.
    ///
    /// # Examples
    ///
    /// ```
    /// use tilebattle::{MatchTally, TileType};
    ///
    /// let tally = MatchTally::from_counts(&[(TileType::Sword, 4), (TileType::Fire, 3)]);
    /// assert_eq!(tally.count(TileType::Sword), 4);
    /// assert_eq!(tally.total(), 7);
    /// ```
    pub fn from_counts(counts: &[(TileType, u32)]) -> Self {
        let mut tally = Self::new();
        for &(tile_type, count) in counts {
            tally.add(tile_type, count);
        }
        tally
    }

    pub fn add(&mut self, tile_type: TileType, count: u32) {
        if count > 0 {
            *self.counts.entry(tile_type).or_insert(0) += count;
        }
    }

    pub fn count(&self, tile_type: TileType) -> u32 {
        self.counts.get(&tile_type).copied().unwrap_or(0)
    }

    /// Total matched tiles across all types.
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterates `(type, count)` pairs in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (TileType, u32)> + '_ {
        self.counts.iter().map(|(tile_type, count)| (*tile_type, *count))
    }
}

/// Outcome of resolving one tick's matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatEffect {
    /// Damage before weapon modifiers; never negative
    pub damage: u32,
    /// Healing already capped to the player's missing health
    pub healing: u32,
    /// Mana already capped to the player's missing mana
    pub mana_gain: u32,
    pub shield_gain: u32,
    pub burn: u32,
    pub freeze: u32,
    pub shock: u32,
    /// Whether the sword critical roll succeeded
    pub critical: bool,
    /// Freeze stacks withheld by `freeze_immunity`
    pub freeze_suppressed: u32,
}

/// Converts integer-valued float totals to points, tolerating representation error.
fn to_points(value: f64) -> u32 {
    if value <= 0.0 {
        0
    } else {
        (value + 1e-9).floor() as u32
    }
}

/// Turns a [`MatchTally`] into a [`CombatEffect`] for the current player.
pub struct EffectResolver<'a> {
    balance: &'a BalanceConfig,
}

impl<'a> EffectResolver<'a> {
    pub fn new(balance: &'a BalanceConfig) -> Self {
        Self { balance }
    }

    /// Resolves one tick. `combo` is 0 for the first matching tick of a turn.
    ///
    /// Randomness is drawn only when it can matter: one critical roll when
    /// swords are present, one proc roll when fire is matched with the Flame
    /// Sword equipped.
    pub fn resolve<R: RandomSource + ?Sized>(
        &self,
        tally: &MatchTally,
        combo: u32,
        player: &Player,
        rng: &mut R,
    ) -> CombatEffect {
        let b = self.balance;
        let multiplier = b.combo_multiplier(combo);

        let mut damage = 0.0_f64;
        let mut healing = 0.0_f64;
        let mut mana = 0.0_f64;
        let mut shield = 0.0_f64;
        let mut effect = CombatEffect::default();

        for (tile_type, count) in tally.iter() {
            let n = count as f64;
            match tile_type {
                TileType::Sword => {
                    let per_tile = b.sword_base_damage + player.weapon.damage_bonus() as f64;
                    let mut sword = n * per_tile;
                    if player.has_upgrade(Upgrade::SwordMaster) {
                        sword *= b.sword_master_multiplier;
                    }
                    if player.has_upgrade(Upgrade::Berserker)
                        && player.hp_ratio() < b.berserker_hp_threshold
                    {
                        sword *= b.berserker_multiplier;
                    }
                    damage += sword * multiplier;
                    if rng.chance(b.crit_chance(combo)) {
                        damage *= b.crit_multiplier;
                        effect.critical = true;
                    }
                }
                TileType::Shield => {
                    let mut gained = n * b.shield_per_tile;
                    if player.has_upgrade(Upgrade::ShieldExpert) {
                        gained *= b.shield_expert_multiplier;
                    }
                    shield += gained * multiplier;
                }
                TileType::Potion => {
                    let mut healed = n * b.heal_per_tile;
                    if player.has_upgrade(Upgrade::PotionBrewer) {
                        healed *= b.potion_brewer_multiplier;
                    }
                    healing += healed * multiplier;
                }
                TileType::Mana => {
                    let mut per_tile = b.mana_per_tile;
                    if player.has_upgrade(Upgrade::ManaWell) {
                        per_tile += b.mana_well_bonus;
                    }
                    mana += n * per_tile * multiplier;
                }
                TileType::Fire => {
                    let mut per_tile = b.fire_damage_per_tile;
                    if player.has_upgrade(Upgrade::FireLord) {
                        per_tile += b.fire_lord_bonus;
                    }
                    let mut fire = n * per_tile;
                    // One proc roll per tick; a proc boosts every fire tile in it.
                    if player.weapon == Weapon::FlameSword && rng.chance(b.flame_sword_proc_chance) {
                        fire += n * b.flame_sword_bonus_per_tile;
                    }
                    damage += fire * multiplier;
                    effect.burn += count;
                }
                TileType::Ice => {
                    damage += n * b.ice_damage_per_tile * multiplier;
                    if player.has_upgrade(Upgrade::FreezeImmunity) {
                        effect.freeze_suppressed += count;
                    } else {
                        effect.freeze += count;
                    }
                }
                TileType::Lightning => {
                    let mut per_tile = b.lightning_damage_per_tile;
                    if player.has_upgrade(Upgrade::ChainLightning) {
                        per_tile *= b.chain_lightning_multiplier;
                    }
                    damage += n * per_tile * multiplier;
                    effect.shock += count;
                }
                TileType::Curse => {
                    if player.has_upgrade(Upgrade::CurseWard) {
                        healing += n * b.curse_ward_heal_per_tile * multiplier;
                    } else {
                        // May push the running total below zero; clamped below.
                        damage -= n * b.curse_penalty_per_tile * multiplier;
                    }
                }
            }
        }

        effect.damage = to_points(damage);
        effect.healing = to_points(healing).min(player.max_hp.saturating_sub(player.hp));
        effect.mana_gain = to_points(mana).min(player.max_mana.saturating_sub(player.mana));
        effect.shield_gain = to_points(shield);
        effect
    }
}

/// Applies weapon modifiers to damage as it lands on the enemy.
pub fn apply_weapon_modifiers(damage: u32, weapon: Weapon, enemy_is_dragon: bool, balance: &BalanceConfig) -> u32 {
    let modified = match weapon {
        Weapon::ShadowBlade => damage as f64 * balance.shadow_blade_multiplier,
        Weapon::DragonSlayer if enemy_is_dragon => damage as f64 * balance.dragon_slayer_multiplier,
        _ => return damage,
    };
    to_points(modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptedRng;

    const NO_LUCK: f64 = 0.99;
    const ALL_LUCK: f64 = 0.0;

    fn resolve(tally: &MatchTally, combo: u32, player: &Player, roll: f64) -> CombatEffect {
        let balance = BalanceConfig::default();
        let mut rng = ScriptedRng::constant(roll);
        EffectResolver::new(&balance).resolve(tally, combo, player, &mut rng)
    }

    #[test]
    fn test_four_swords_base_damage() {
        let tally = MatchTally::from_counts(&[(TileType::Sword, 4)]);
        let effect = resolve(&tally, 0, &Player::new(), NO_LUCK);
        assert_eq!(effect.damage, 60);
        assert!(!effect.critical);
    }

    #[test]
    fn test_sword_crit_doubles() {
        let tally = MatchTally::from_counts(&[(TileType::Sword, 3)]);
        let effect = resolve(&tally, 0, &Player::new(), ALL_LUCK);
        assert_eq!(effect.damage, 90);
        assert!(effect.critical);
    }

    #[test]
    fn test_crit_chance_scales_with_combo() {
        let tally = MatchTally::from_counts(&[(TileType::Sword, 3)]);
        // 0.15 misses at combo 0 (10%) but hits at combo 2 (20%).
        assert!(!resolve(&tally, 0, &Player::new(), 0.15).critical);
        assert!(resolve(&tally, 2, &Player::new(), 0.15).critical);
    }

    #[test]
    fn test_sword_master_and_weapon_bonus() {
        let mut player = Player::new();
        player.upgrades.insert(Upgrade::SwordMaster);
        player.weapon = Weapon::IronSword;
        let tally = MatchTally::from_counts(&[(TileType::Sword, 3)]);
        // 3 * (15 + 5) * 1.5
        assert_eq!(resolve(&tally, 0, &player, NO_LUCK).damage, 90);
    }

    #[test]
    fn test_berserker_only_below_threshold() {
        let mut player = Player::new();
        player.upgrades.insert(Upgrade::Berserker);
        let tally = MatchTally::from_counts(&[(TileType::Sword, 3)]);

        player.hp = 50;
        assert_eq!(resolve(&tally, 0, &player, NO_LUCK).damage, 45);

        player.hp = 29;
        assert_eq!(resolve(&tally, 0, &player, NO_LUCK).damage, 90);
    }

    #[test]
    fn test_combo_multiplier_applies() {
        let tally = MatchTally::from_counts(&[(TileType::Lightning, 3)]);
        // 3 * 10 * (1 + 0.3 * 2)
        let effect = resolve(&tally, 2, &Player::new(), NO_LUCK);
        assert_eq!(effect.damage, 48);
        assert_eq!(effect.shock, 3);
    }

    #[test]
    fn test_shield_and_expert() {
        let mut player = Player::new();
        let tally = MatchTally::from_counts(&[(TileType::Shield, 4)]);
        assert_eq!(resolve(&tally, 0, &player, NO_LUCK).shield_gain, 48);
        player.upgrades.insert(Upgrade::ShieldExpert);
        assert_eq!(resolve(&tally, 0, &player, NO_LUCK).shield_gain, 84);
    }

    #[test]
    fn test_healing_is_capped_to_missing_hp() {
        let mut player = Player::new();
        player.hp = 90;
        let tally = MatchTally::from_counts(&[(TileType::Potion, 3)]);
        assert_eq!(resolve(&tally, 0, &player, NO_LUCK).healing, 10);
    }

    #[test]
    fn test_potion_brewer() {
        let mut player = Player::new();
        player.hp = 1;
        player.upgrades.insert(Upgrade::PotionBrewer);
        let tally = MatchTally::from_counts(&[(TileType::Potion, 3)]);
        assert_eq!(resolve(&tally, 0, &player, NO_LUCK).healing, 72);
    }

    #[test]
    fn test_mana_well_and_cap() {
        let mut player = Player::new();
        let tally = MatchTally::from_counts(&[(TileType::Mana, 3)]);
        assert_eq!(resolve(&tally, 0, &player, NO_LUCK).mana_gain, 30);
        player.upgrades.insert(Upgrade::ManaWell);
        assert_eq!(resolve(&tally, 0, &player, NO_LUCK).mana_gain, 39);
        player.mana = 45;
        assert_eq!(resolve(&tally, 0, &player, NO_LUCK).mana_gain, 5);
    }

    #[test]
    fn test_fire_builds_burn_and_fire_lord() {
        let mut player = Player::new();
        let tally = MatchTally::from_counts(&[(TileType::Fire, 3)]);
        let effect = resolve(&tally, 0, &player, NO_LUCK);
        assert_eq!(effect.damage, 12);
        assert_eq!(effect.burn, 3);

        player.upgrades.insert(Upgrade::FireLord);
        assert_eq!(resolve(&tally, 0, &player, NO_LUCK).damage, 36);
    }

    #[test]
    fn test_flame_sword_proc() {
        let mut player = Player::new();
        player.weapon = Weapon::FlameSword;
        let tally = MatchTally::from_counts(&[(TileType::Fire, 3)]);
        assert_eq!(resolve(&tally, 0, &player, 0.1).damage, 27);
        assert_eq!(resolve(&tally, 0, &player, 0.5).damage, 12);
    }

    #[test]
    fn test_flame_sword_rolls_once_per_tick() {
        let balance = BalanceConfig::default();
        let mut player = Player::new();
        player.weapon = Weapon::FlameSword;
        let tally = MatchTally::from_counts(&[(TileType::Fire, 3)]);
        let mut rng = ScriptedRng::new(vec![0.1, 0.9, 0.9]);

        let effect = EffectResolver::new(&balance).resolve(&tally, 0, &player, &mut rng);
        assert_eq!(effect.damage, 27);
        assert_eq!(rng.draws(), 1);
    }

    #[test]
    fn test_ice_freeze_and_immunity() {
        let mut player = Player::new();
        let tally = MatchTally::from_counts(&[(TileType::Ice, 3)]);
        let effect = resolve(&tally, 0, &player, NO_LUCK);
        assert_eq!(effect.damage, 9);
        assert_eq!(effect.freeze, 3);

        player.upgrades.insert(Upgrade::FreezeImmunity);
        let immune = resolve(&tally, 0, &player, NO_LUCK);
        assert_eq!(immune.damage, 9);
        assert_eq!(immune.freeze, 0);
        assert_eq!(immune.freeze_suppressed, 3);
    }

    #[test]
    fn test_chain_lightning() {
        let mut player = Player::new();
        player.upgrades.insert(Upgrade::ChainLightning);
        let tally = MatchTally::from_counts(&[(TileType::Lightning, 3)]);
        assert_eq!(resolve(&tally, 0, &player, NO_LUCK).damage, 60);
    }

    #[test]
    fn test_curse_damage_floor() {
        let tally = MatchTally::from_counts(&[(TileType::Curse, 6), (TileType::Ice, 3)]);
        let effect = resolve(&tally, 0, &Player::new(), NO_LUCK);
        assert_eq!(effect.damage, 0);
    }

    #[test]
    fn test_curse_offsets_other_damage() {
        let tally = MatchTally::from_counts(&[(TileType::Sword, 3), (TileType::Curse, 3)]);
        assert_eq!(resolve(&tally, 0, &Player::new(), NO_LUCK).damage, 15);
    }

    #[test]
    fn test_curse_ward_heals() {
        let mut player = Player::new();
        player.hp = 10;
        player.upgrades.insert(Upgrade::CurseWard);
        let tally = MatchTally::from_counts(&[(TileType::Curse, 3)]);
        let effect = resolve(&tally, 0, &player, NO_LUCK);
        assert_eq!(effect.healing, 24);
        assert_eq!(effect.damage, 0);
    }

    #[test]
    fn test_no_rolls_without_swords_or_flame() {
        let balance = BalanceConfig::default();
        let mut rng = ScriptedRng::constant(NO_LUCK);
        let tally = MatchTally::from_counts(&[(TileType::Fire, 3), (TileType::Potion, 3)]);
        EffectResolver::new(&balance).resolve(&tally, 0, &Player::new(), &mut rng);
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn test_weapon_modifiers() {
        let balance = BalanceConfig::default();
        assert_eq!(apply_weapon_modifiers(40, Weapon::ShadowBlade, false, &balance), 50);
        assert_eq!(apply_weapon_modifiers(40, Weapon::DragonSlayer, true, &balance), 80);
        assert_eq!(apply_weapon_modifiers(40, Weapon::DragonSlayer, false, &balance), 40);
        assert_eq!(apply_weapon_modifiers(40, Weapon::IronSword, true, &balance), 40);
    }
}
