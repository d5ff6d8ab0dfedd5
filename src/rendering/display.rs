//! # Display Management
//!
//! Plain-text rendering of an [`EngineSnapshot`] for terminal hosts.

use crate::{Enemy, EngineSnapshot, GameEvent, Player, TileType, TurnPhase, Upgrade};
use std::collections::VecDeque;
use std::fmt::Write;

/// Text display for the terminal host.
///
/// Keeps a short message history alongside the board and combatant panels.
#[derive(Debug, Clone)]
pub struct TextDisplay {
    /// Message history, oldest first
    pub messages: VecDeque<String>,
    /// Maximum number of messages to keep
    pub max_messages: usize,
}

impl Default for TextDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl TextDisplay {
    /// Creates a display that keeps the last eight messages.
    ///
    /// # Examples
    ///
    /// ```
    /// use tilebattle::TextDisplay;
    ///
    /// let mut display = TextDisplay::new();
    /// display.add_message("Welcome".to_string());
    /// assert_eq!(display.messages.len(), 1);
    /// ```
    pub fn new() -> Self {
        Self {
            messages: VecDeque::new(),
            max_messages: 8,
        }
    }

    pub fn add_message(&mut self, message: String) {
        self.messages.push_back(message);
        while self.messages.len() > self.max_messages {
            self.messages.pop_front();
        }
    }

    /// Records a game event as a message.
    pub fn add_event(&mut self, event: &GameEvent) {
        self.add_message(describe_event(event));
    }

    /// Renders the complete screen.
    pub fn render(&self, snapshot: &EngineSnapshot<'_>) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Level {}  |  phase: {}  |  combo: {}",
            snapshot.current_level, snapshot.phase, snapshot.combo
        );
        out.push('\n');
        out.push_str(&render_board(snapshot));
        out.push('\n');
        out.push_str(&render_player(snapshot.player));
        match snapshot.enemy {
            Some(enemy) => out.push_str(&render_enemy(enemy)),
            None => out.push_str("No enemy\n"),
        }
        if let Some(prompt) = phase_prompt(snapshot.phase) {
            let _ = writeln!(out, "\n{}", prompt);
        }
        if !self.messages.is_empty() {
            out.push('\n');
            for message in &self.messages {
                let _ = writeln!(out, "> {}", message);
            }
        }
        out
    }
}

/// Renders the board with row and column indices.
pub fn render_board(snapshot: &EngineSnapshot<'_>) -> String {
    let board = snapshot.board;
    let mut out = String::from("   ");
    for col in 0..board.size() {
        let _ = write!(out, "{} ", col);
    }
    out.push('\n');
    for (row, line) in board.to_string().lines().enumerate() {
        let _ = write!(out, "{:>2} ", row);
        for symbol in line.chars() {
            let _ = write!(out, "{} ", symbol);
        }
        out.push('\n');
    }
    out
}

fn bar(current: u32, max: u32, width: usize) -> String {
    let filled = if max == 0 {
        0
    } else {
        ((current.min(max) as usize) * width + max as usize / 2) / max as usize
    };
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

fn render_player(player: &Player) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "You    {} {}/{} hp  shield {}  mana {}/{}",
        bar(player.hp, player.max_hp, 20),
        player.hp,
        player.max_hp,
        player.shield,
        player.mana,
        player.max_mana
    );
    let _ = writeln!(
        out,
        "       lvl {} ({}/{} xp)  {} gold  wielding {}",
        player.level, player.xp, player.xp_to_next, player.gold, player.weapon
    );
    out
}

fn render_enemy(enemy: &Enemy) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {} {}/{} hp  hits for {}",
        enemy.name,
        bar(enemy.hp, enemy.max_hp, 20),
        enemy.hp,
        enemy.max_hp,
        enemy.damage
    );
    let status = &enemy.status_effects;
    if !status.is_empty() {
        let _ = writeln!(
            out,
            "       burn {}  freeze {}  shock {}",
            status.burn, status.freeze, status.shock
        );
    }
    out
}

fn phase_prompt(phase: TurnPhase) -> Option<&'static str> {
    match phase {
        TurnPhase::Waiting => Some("Type 'start' to fight, 'shop' to browse upgrades."),
        TurnPhase::Player => Some("Your move: swap <row> <col> <dir>, or 'hint'."),
        TurnPhase::GameOver(crate::EncounterOutcome::Victory) => {
            Some("Victory! 'next' to continue, 'shop' to spend gold.")
        }
        TurnPhase::GameOver(crate::EncounterOutcome::Defeat) => {
            Some("Defeated. 'start' to try again.")
        }
        TurnPhase::Resolving | TurnPhase::Enemy => None,
    }
}

/// Renders the upgrade shop for a player.
pub fn render_shop(player: &Player) -> String {
    let mut out = format!("Gold: {}\n", player.gold);
    for upgrade in Upgrade::ALL {
        let marker = if player.has_upgrade(upgrade) {
            "owned"
        } else if player.gold >= upgrade.cost() {
            "buy  "
        } else {
            "     "
        };
        let _ = writeln!(
            out,
            "  {} {:<16} {:>4}g  {}",
            marker,
            upgrade.id(),
            upgrade.cost(),
            upgrade.description()
        );
    }
    out
}

/// One-line description of a game event.
pub fn describe_event(event: &GameEvent) -> String {
    match event {
        GameEvent::EncounterStarted { enemy, level } => format!("Level {}: a {} appears!", level, enemy),
        GameEvent::Matched {
            tiles,
            combo,
            effect,
            damage_dealt,
        } => {
            let mut parts = vec![format!("{} tiles", tiles)];
            if *damage_dealt > 0 {
                parts.push(format!("{} damage", damage_dealt));
            }
            if effect.healing > 0 {
                parts.push(format!("+{} hp", effect.healing));
            }
            if effect.shield_gain > 0 {
                parts.push(format!("+{} shield", effect.shield_gain));
            }
            if effect.mana_gain > 0 {
                parts.push(format!("+{} mana", effect.mana_gain));
            }
            let mut line = parts.join(", ");
            if *combo > 1 {
                let _ = write!(line, " (combo x{})", combo);
            }
            if effect.critical {
                line.push_str(" CRITICAL!");
            }
            line
        }
        GameEvent::BurnTicked { damage } => format!("The enemy burns for {} damage", damage),
        GameEvent::EnemyAttacked {
            damage,
            absorbed,
            hp_lost,
        } => {
            if *absorbed > 0 {
                format!("Enemy hits for {} ({} blocked, {} taken)", damage, absorbed, hp_lost)
            } else {
                format!("Enemy hits for {}", damage)
            }
        }
        GameEvent::GoldStolen { amount } => format!("The enemy stole {} gold!", amount),
        GameEvent::TilesCursed { cells } => format!(
            "{} tiles turned into {}",
            cells.len(),
            TileType::Curse
        ),
        GameEvent::BoardShuffled => "No moves left, the board was shuffled".to_string(),
        GameEvent::LeveledUp { level } => format!("Level up! You are now level {}", level),
        GameEvent::LootFound { weapon } => format!("You found a {}!", weapon),
        GameEvent::Victory { xp, gold } => format!("Victory! +{} xp, +{} gold", xp, gold),
        GameEvent::Defeat => "You have been defeated".to_string(),
        GameEvent::PhoenixRevived { hp } => format!("Phoenix Heart revives you with {} hp", hp),
    }
}
