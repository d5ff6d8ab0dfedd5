//! # Game Events
//!
//! Discrete notifications the engine pushes to its host for toasts, sounds
//! and statistics. Delivery is one-way; nothing is acknowledged.

use crate::{CombatEffect, Position, Weapon};
use log::info;
use serde::{Deserialize, Serialize};

/// Notification emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// A new encounter began
    EncounterStarted { enemy: String, level: u32 },
    /// One resolution tick cleared tiles and produced an effect
    Matched {
        tiles: u32,
        /// Matching ticks so far this turn, including this one
        combo: u32,
        effect: CombatEffect,
        /// Damage that actually landed after weapon modifiers
        damage_dealt: u32,
    },
    /// Burn damage ticked on the enemy at the start of its turn
    BurnTicked { damage: u32 },
    /// The enemy attacked the player
    EnemyAttacked { damage: u32, absorbed: u32, hp_lost: u32 },
    /// The enemy stole gold
    GoldStolen { amount: u32 },
    /// The enemy converted board cells into curse tiles
    TilesCursed { cells: Vec<Position> },
    /// The board had no legal swap and was regenerated
    BoardShuffled,
    /// The player reached a new level
    LeveledUp { level: u32 },
    /// The enemy dropped a weapon the player did not own
    LootFound { weapon: Weapon },
    /// The enemy was defeated
    Victory { xp: u32, gold: u32 },
    /// The player was defeated
    Defeat,
    /// Phoenix Heart revived the player
    PhoenixRevived { hp: u32 },
}

/// Receives engine notifications.
pub trait NotificationSink {
    fn notify(&mut self, event: &GameEvent);
}

impl NotificationSink for Vec<GameEvent> {
    fn notify(&mut self, event: &GameEvent) {
        self.push(event.clone());
    }
}

/// Forwards notifications to another task; dropped silently once the
/// receiver is gone.
impl NotificationSink for tokio::sync::mpsc::UnboundedSender<GameEvent> {
    fn notify(&mut self, event: &GameEvent) {
        let _ = self.send(event.clone());
    }
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&mut self, _event: &GameEvent) {}
}

/// Writes notifications through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&mut self, event: &GameEvent) {
        match event {
            GameEvent::EncounterStarted { enemy, level } => {
                info!("Level {}: {} appears", level, enemy)
            }
            GameEvent::Matched {
                tiles,
                combo,
                damage_dealt,
                effect,
            } => info!(
                "Matched {} tiles (combo {}): {} damage{}",
                tiles,
                combo,
                damage_dealt,
                if effect.critical { " CRITICAL" } else { "" }
            ),
            GameEvent::BurnTicked { damage } => info!("Burn deals {} damage", damage),
            GameEvent::EnemyAttacked {
                damage, absorbed, ..
            } => info!("Enemy hits for {} ({} absorbed)", damage, absorbed),
            GameEvent::GoldStolen { amount } => info!("Enemy stole {} gold", amount),
            GameEvent::TilesCursed { cells } => info!("{} tiles were cursed", cells.len()),
            GameEvent::BoardShuffled => info!("No moves left, board shuffled"),
            GameEvent::LeveledUp { level } => info!("Level up! Now level {}", level),
            GameEvent::LootFound { weapon } => info!("Found {}", weapon),
            GameEvent::Victory { xp, gold } => info!("Victory! +{} xp, +{} gold", xp, gold),
            GameEvent::Defeat => info!("Defeated"),
            GameEvent::PhoenixRevived { hp } => info!("Phoenix Heart revives you with {} hp", hp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_sink_collects() {
        let mut sink: Vec<GameEvent> = Vec::new();
        sink.notify(&GameEvent::Defeat);
        sink.notify(&GameEvent::LeveledUp { level: 2 });
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[1], GameEvent::LeveledUp { level: 2 });
    }

    #[test]
    fn test_channel_sink_forwards() {
        let (mut tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.notify(&GameEvent::BoardShuffled);
        assert_eq!(rx.try_recv().ok(), Some(GameEvent::BoardShuffled));
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let json = serde_json::to_string(&GameEvent::Victory { xp: 10, gold: 5 }).unwrap();
        assert!(json.contains("\"event\":\"victory\""));
    }
}
