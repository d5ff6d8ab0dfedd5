//! # Item Generation
//!
//! Victory loot rolls.

use crate::{LootEntry, Player, RandomSource, Weapon};
use log::debug;

/// Rolls an enemy's loot entry for the player.
///
/// A weapon the player already owns is never dropped again, and no roll is
/// consumed in that case.
pub fn roll_loot(
    loot: Option<&LootEntry>,
    player: &Player,
    rng: &mut dyn RandomSource,
) -> Option<Weapon> {
    let entry = loot?;
    if player.owns_weapon(entry.weapon) {
        debug!("Skipping loot roll for owned {}", entry.weapon);
        return None;
    }
    if rng.chance(entry.chance) {
        Some(entry.weapon)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptedRng;

    fn entry(weapon: Weapon, chance: f64) -> LootEntry {
        LootEntry { weapon, chance }
    }

    #[test]
    fn test_roll_below_chance_drops() {
        let player = Player::new();
        let mut rng = ScriptedRng::constant(0.05);
        let loot = entry(Weapon::IronSword, 0.2);
        assert_eq!(roll_loot(Some(&loot), &player, &mut rng), Some(Weapon::IronSword));
    }

    #[test]
    fn test_roll_above_chance_misses() {
        let player = Player::new();
        let mut rng = ScriptedRng::constant(0.5);
        let loot = entry(Weapon::IronSword, 0.2);
        assert_eq!(roll_loot(Some(&loot), &player, &mut rng), None);
    }

    #[test]
    fn test_owned_weapon_not_rolled() {
        let mut player = Player::new();
        player.inventory.insert(Weapon::IronSword);
        let mut rng = ScriptedRng::constant(0.0);
        let loot = entry(Weapon::IronSword, 1.0);
        assert_eq!(roll_loot(Some(&loot), &player, &mut rng), None);
        assert_eq!(rng.draws(), 0);
    }

    #[test]
    fn test_no_loot_entry() {
        let player = Player::new();
        let mut rng = ScriptedRng::constant(0.0);
        assert_eq!(roll_loot(None, &player, &mut rng), None);
    }
}
