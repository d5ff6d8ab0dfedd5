//! # Engine State Module
//!
//! The versioned battle state and the reducer that advances it.
//!
//! [`apply_event`] is a pure function of the previous state, one input and the
//! injected randomness: it never mutates its argument, and every accepted
//! input yields a new state with a bumped version. Keeping old states around
//! is enough for replays and time-travel debugging.

use crate::game::combat;
use crate::{
    BalanceConfig, BattleError, BattleResult, Board, Enemy, GameEvent, GenerationConfig, Player,
    Position, RandomSource, Upgrade, Weapon,
};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a finished encounter ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterOutcome {
    Victory,
    Defeat,
}

/// Whose input the engine currently accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// No encounter is running
    Waiting,
    /// Waiting for the player's swap
    Player,
    /// Cascades are being resolved by the tick driver
    Resolving,
    /// The enemy's turn is pending
    Enemy,
    /// The encounter has ended
    GameOver(EncounterOutcome),
}

impl TurnPhase {
    /// Whether an encounter is underway and not yet decided.
    pub fn in_combat(self) -> bool {
        matches!(self, TurnPhase::Player | TurnPhase::Resolving | TurnPhase::Enemy)
    }

    pub fn is_game_over(self) -> bool {
        matches!(self, TurnPhase::GameOver(_))
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnPhase::Waiting => write!(f, "waiting"),
            TurnPhase::Player => write!(f, "player"),
            TurnPhase::Resolving => write!(f, "resolving"),
            TurnPhase::Enemy => write!(f, "enemy"),
            TurnPhase::GameOver(EncounterOutcome::Victory) => write!(f, "victory"),
            TurnPhase::GameOver(EncounterOutcome::Defeat) => write!(f, "defeat"),
        }
    }
}

/// Running totals for the session, updated from every emitted event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleStatistics {
    pub encounters_started: u32,
    pub matches_made: u32,
    pub tiles_cleared: u64,
    /// Longest cascade in a single turn
    pub best_combo: u32,
    pub critical_hits: u32,
    pub damage_dealt: u64,
    pub damage_taken: u64,
    pub damage_absorbed: u64,
    pub gold_stolen: u64,
    pub board_shuffles: u32,
    pub victories: u32,
    pub defeats: u32,
    pub levels_gained: u32,
    pub loot_found: u32,
    pub revives: u32,
}

impl BattleStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates statistics based on a game event.
    pub fn update_from_event(&mut self, event: &GameEvent) {
        match event {
            GameEvent::EncounterStarted { .. } => self.encounters_started += 1,
            GameEvent::Matched {
                tiles,
                combo,
                effect,
                damage_dealt,
            } => {
                self.matches_made += 1;
                self.tiles_cleared += *tiles as u64;
                self.best_combo = self.best_combo.max(*combo);
                self.damage_dealt += *damage_dealt as u64;
                if effect.critical {
                    self.critical_hits += 1;
                }
            }
            GameEvent::BurnTicked { damage } => self.damage_dealt += *damage as u64,
            GameEvent::EnemyAttacked {
                absorbed, hp_lost, ..
            } => {
                self.damage_taken += *hp_lost as u64;
                self.damage_absorbed += *absorbed as u64;
            }
            GameEvent::GoldStolen { amount } => self.gold_stolen += *amount as u64,
            GameEvent::BoardShuffled => self.board_shuffles += 1,
            GameEvent::LeveledUp { .. } => self.levels_gained += 1,
            GameEvent::LootFound { .. } => self.loot_found += 1,
            GameEvent::Victory { .. } => self.victories += 1,
            GameEvent::Defeat => self.defeats += 1,
            GameEvent::PhoenixRevived { .. } => self.revives += 1,
            GameEvent::TilesCursed { .. } => {}
        }
    }
}

/// Complete battle state.
///
/// Cloned and replaced wholesale by [`apply_event`]; the engine facade only
/// ever holds the latest version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    /// Incremented by every accepted input
    pub version: u64,
    pub phase: TurnPhase,
    pub board: Board,
    pub player: Player,
    /// Present from encounter start until the player returns to the menu
    pub enemy: Option<Enemy>,
    /// Encounter level, starting at 1
    pub current_level: u32,
    /// Matching ticks resolved so far this turn
    pub combo: u32,
    /// Ticks spent in the current resolution, for the cascade guard
    pub cascade_ticks: u32,
    /// Whether Phoenix Heart has fired this encounter
    pub phoenix_used: bool,
    /// Enemy turns completed this encounter
    pub turn_number: u32,
    pub statistics: BattleStatistics,
}

impl EngineState {
    /// Creates an idle state for the given player and level.
    ///
    /// # Examples
    ///
    /// ```
    /// use tilebattle::{EngineState, Player, TurnPhase};
    ///
    /// let state = EngineState::new(Player::new(), 1, 8);
    /// assert_eq!(state.version, 0);
    /// assert_eq!(state.phase, TurnPhase::Waiting);
    /// assert!(state.enemy.is_none());
    /// ```
    pub fn new(player: Player, current_level: u32, board_size: usize) -> Self {
        Self {
            version: 0,
            phase: TurnPhase::Waiting,
            board: Board::empty(board_size),
            player,
            enemy: None,
            current_level: current_level.max(1),
            combo: 0,
            cascade_ticks: 0,
            phoenix_used: false,
            turn_number: 0,
            statistics: BattleStatistics::new(),
        }
    }

    /// Read-only projection for renderers.
    pub fn snapshot(&self) -> EngineSnapshot<'_> {
        EngineSnapshot {
            version: self.version,
            board: &self.board,
            player: &self.player,
            enemy: self.enemy.as_ref(),
            phase: self.phase,
            combo: self.combo,
            current_level: self.current_level,
        }
    }

    /// Serializes the state to JSON.
    pub fn save_to_json(&self) -> BattleResult<String> {
        serde_json::to_string_pretty(self).map_err(BattleError::from)
    }

    /// Loads a state from JSON.
    pub fn load_from_json(json: &str) -> BattleResult<Self> {
        serde_json::from_str(json).map_err(BattleError::from)
    }
}

/// What a renderer may see of the engine.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EngineSnapshot<'a> {
    pub version: u64,
    pub board: &'a Board,
    pub player: &'a Player,
    pub enemy: Option<&'a Enemy>,
    pub phase: TurnPhase,
    pub combo: u32,
    pub current_level: u32,
}

/// Inputs the reducer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum EngineInput {
    /// Begin (or replay) an encounter at the current level
    Start,
    /// Swap two orthogonally adjacent cells
    Swap { from: Position, to: Position },
    /// One resolution step; ignored outside the resolving phase
    Tick,
    /// Run the pending enemy turn
    EnemyTurn,
    /// Advance to the next level after a victory
    NextLevel,
    /// Abandon the encounter
    ReturnToMenu,
    /// Buy an upgrade outside combat
    Purchase { upgrade: Upgrade },
    /// Equip an owned weapon outside combat
    Equip { weapon: Weapon },
}

/// Collaborators the reducer draws on.
pub struct ReducerContext<'a> {
    pub rng: &'a mut dyn RandomSource,
    pub balance: &'a BalanceConfig,
    pub generation: &'a GenerationConfig,
}

impl<'a> ReducerContext<'a> {
    pub fn new(
        rng: &'a mut dyn RandomSource,
        balance: &'a BalanceConfig,
        generation: &'a GenerationConfig,
    ) -> Self {
        Self {
            rng,
            balance,
            generation,
        }
    }
}

/// Result of applying one input.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: EngineState,
    pub accepted: bool,
    /// Why the input was rejected, when it was
    pub rejection: Option<String>,
    pub events: Vec<GameEvent>,
}

impl Transition {
    fn rejected(state: &EngineState, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        debug!("Input rejected: {}", reason);
        Self {
            state: state.clone(),
            accepted: false,
            rejection: Some(reason),
            events: Vec::new(),
        }
    }
}

/// Applies one input to a state.
///
/// Rejected inputs return an unchanged copy with `accepted == false`; they are
/// not errors.
///
/// # Examples
///
/// ```
/// use tilebattle::*;
///
/// let balance = BalanceConfig::default();
/// let generation = GenerationConfig::for_testing(7);
/// let mut rng = SeededRng::new(7);
/// let mut ctx = ReducerContext::new(&mut rng, &balance, &generation);
///
/// let idle = EngineState::new(Player::new(), 1, generation.board_size);
/// let started = apply_event(&idle, &EngineInput::Start, &mut ctx);
/// assert!(started.accepted);
/// assert_eq!(started.state.version, 1);
/// assert_eq!(started.state.phase, TurnPhase::Player);
/// assert_eq!(idle.version, 0);
/// ```
pub fn apply_event(
    state: &EngineState,
    input: &EngineInput,
    ctx: &mut ReducerContext<'_>,
) -> Transition {
    let mut next = state.clone();
    let mut events = Vec::new();

    match *input {
        EngineInput::Start => {
            next.enemy = None;
            next.combo = 0;
            if let Err(e) = combat::begin_encounter(&mut next, ctx, &mut events) {
                error!("Failed to start encounter: {}", e);
                return Transition::rejected(state, e.to_string());
            }
        }
        EngineInput::Swap { from, to } => {
            if state.phase != TurnPhase::Player {
                return Transition::rejected(state, format!("cannot swap during {}", state.phase));
            }
            if !state.board.in_bounds(from) || !state.board.in_bounds(to) {
                return Transition::rejected(state, format!("{} or {} is off the board", from, to));
            }
            if !from.is_adjacent(to) {
                return Transition::rejected(state, format!("{} and {} are not adjacent", from, to));
            }
            if !next.board.try_swap(from, to) {
                return Transition::rejected(state, format!("swapping {} and {} makes no match", from, to));
            }
            next.phase = TurnPhase::Resolving;
            next.combo = 0;
            next.cascade_ticks = 0;
        }
        EngineInput::Tick => {
            if state.phase != TurnPhase::Resolving {
                return Transition::rejected(state, "nothing to resolve");
            }
            if next.cascade_ticks >= crate::config::MAX_CASCADE_TICKS {
                combat::abort_cascade(&mut next, ctx);
            } else {
                combat::resolution_step(&mut next, ctx, &mut events);
            }
        }
        EngineInput::EnemyTurn => {
            if state.phase != TurnPhase::Enemy {
                return Transition::rejected(state, format!("no enemy turn during {}", state.phase));
            }
            combat::enemy_turn(&mut next, ctx, &mut events);
        }
        EngineInput::NextLevel => {
            if state.phase != TurnPhase::GameOver(EncounterOutcome::Victory) {
                return Transition::rejected(state, "the current level is not won yet");
            }
            next.current_level += 1;
            next.enemy = None;
            if let Err(e) = combat::begin_encounter(&mut next, ctx, &mut events) {
                error!("Failed to start level {}: {}", next.current_level, e);
                return Transition::rejected(state, e.to_string());
            }
        }
        EngineInput::ReturnToMenu => {
            next.phase = TurnPhase::Waiting;
            next.enemy = None;
            next.combo = 0;
            next.cascade_ticks = 0;
        }
        EngineInput::Purchase { upgrade } => {
            if state.phase.in_combat() {
                return Transition::rejected(state, "upgrades cannot be bought during combat");
            }
            if next.player.has_upgrade(upgrade) {
                return Transition::rejected(state, format!("{} is already owned", upgrade));
            }
            let cost = upgrade.cost();
            if next.player.gold < cost {
                return Transition::rejected(
                    state,
                    format!("{} costs {} gold, you have {}", upgrade, cost, next.player.gold),
                );
            }
            next.player.gold -= cost;
            next.player.upgrades.insert(upgrade);
        }
        EngineInput::Equip { weapon } => {
            if state.phase.in_combat() {
                return Transition::rejected(state, "weapons cannot be changed during combat");
            }
            if !next.player.owns_weapon(weapon) {
                return Transition::rejected(state, format!("{} is not in the inventory", weapon));
            }
            next.player.weapon = weapon;
        }
    }

    next.version += 1;
    for event in &events {
        next.statistics.update_from_event(event);
    }

    Transition {
        state: next,
        accepted: true,
        rejection: None,
        events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ScriptedRng, SeededRng};

    fn started(seed: u64) -> EngineState {
        let balance = BalanceConfig::default();
        let generation = GenerationConfig::for_testing(seed);
        let mut rng = SeededRng::new(seed);
        let mut ctx = ReducerContext::new(&mut rng, &balance, &generation);
        let idle = EngineState::new(Player::new(), 1, generation.board_size);
        apply_event(&idle, &EngineInput::Start, &mut ctx).state
    }

    #[test]
    fn test_engine_state_creation() {
        let state = EngineState::new(Player::new(), 0, 8);
        assert_eq!(state.version, 0);
        assert_eq!(state.current_level, 1);
        assert_eq!(state.board.size(), 8);
    }

    #[test]
    fn test_start_enters_player_phase() {
        let state = started(3);
        assert_eq!(state.phase, TurnPhase::Player);
        assert!(state.enemy.is_some());
        assert!(state.board.is_full());
        assert!(state.board.find_matches().is_empty());
        assert_eq!(state.statistics.encounters_started, 1);
    }

    #[test]
    fn test_rejected_input_keeps_version() {
        let balance = BalanceConfig::default();
        let generation = GenerationConfig::for_testing(1);
        let mut rng = ScriptedRng::constant(0.5);
        let mut ctx = ReducerContext::new(&mut rng, &balance, &generation);
        let idle = EngineState::new(Player::new(), 1, 6);

        let tick = apply_event(&idle, &EngineInput::Tick, &mut ctx);
        assert!(!tick.accepted);
        assert_eq!(tick.state, idle);
        assert!(tick.rejection.is_some());

        let next = apply_event(&idle, &EngineInput::NextLevel, &mut ctx);
        assert!(!next.accepted);
    }

    #[test]
    fn test_off_board_swaps_are_rejected() {
        let balance = BalanceConfig::default();
        let generation = GenerationConfig::for_testing(1);
        let mut rng = ScriptedRng::constant(0.5);
        let mut ctx = ReducerContext::new(&mut rng, &balance, &generation);
        let mut state = EngineState::new(Player::new(), 1, 4);
        state.enemy = Some(Enemy::new("Slime", 40, 6));
        state.phase = TurnPhase::Player;
        state.board = Board::from_rows(&["SSPM", "MPSD", "DMPS", "PDMI"]).unwrap();

        for (from, to) in [
            (Position::new(i32::MIN, 0), Position::new(i32::MAX, 0)),
            (Position::new(i32::MIN, 0), Position::new(0, 0)),
            (Position::new(0, 3), Position::new(0, 4)),
            (Position::new(-1, 0), Position::new(0, 0)),
        ] {
            let result = apply_event(&state, &EngineInput::Swap { from, to }, &mut ctx);
            assert!(!result.accepted);
            assert!(result.rejection.unwrap().contains("off the board"));
            assert_eq!(result.state, state);
        }
    }

    #[test]
    fn test_swap_rejections() {
        let balance = BalanceConfig::default();
        let generation = GenerationConfig::for_testing(1);
        let mut rng = ScriptedRng::constant(0.5);
        let mut ctx = ReducerContext::new(&mut rng, &balance, &generation);
        let mut state = EngineState::new(Player::new(), 1, 4);
        state.enemy = Some(Enemy::new("Slime", 40, 6));
        state.phase = TurnPhase::Player;
        state.board = Board::from_rows(&["SSPM", "MPSD", "DMPS", "PDMI"]).unwrap();

        let far = EngineInput::Swap {
            from: Position::new(0, 0),
            to: Position::new(2, 2),
        };
        assert!(!apply_event(&state, &far, &mut ctx).accepted);

        let useless = EngineInput::Swap {
            from: Position::new(3, 2),
            to: Position::new(3, 3),
        };
        let result = apply_event(&state, &useless, &mut ctx);
        assert!(!result.accepted);
        assert_eq!(result.state.board, state.board);

        let good = EngineInput::Swap {
            from: Position::new(0, 2),
            to: Position::new(1, 2),
        };
        let result = apply_event(&state, &good, &mut ctx);
        assert!(result.accepted);
        assert_eq!(result.state.phase, TurnPhase::Resolving);
        assert_eq!(result.state.version, state.version + 1);
    }

    #[test]
    fn test_tick_resolves_then_hands_to_enemy() {
        let balance = BalanceConfig::from_json_str(r#"{ "crit_base_chance": 0.0 }"#).unwrap();
        let generation = GenerationConfig::for_testing(1);
        let mut rng = SeededRng::new(1);
        let mut ctx = ReducerContext::new(&mut rng, &balance, &generation);
        let mut state = EngineState::new(Player::new(), 1, 4);
        state.enemy = Some(Enemy::new("Lich", 500, 14));
        state.phase = TurnPhase::Resolving;
        state.board = Board::from_rows(&["SSSM", "MPID", "DMPS", "PDMI"]).unwrap();

        let mut ticks = 0;
        while state.phase == TurnPhase::Resolving && ticks < 50 {
            state = apply_event(&state, &EngineInput::Tick, &mut ctx).state;
            ticks += 1;
        }

        assert_eq!(state.phase, TurnPhase::Enemy);
        assert!(state.board.find_matches().is_empty());
        assert!(state.enemy.as_ref().unwrap().hp <= 455);
        assert!(state.statistics.matches_made >= 1);
    }

    #[test]
    fn test_cascade_guard_forces_enemy_turn() {
        let balance = BalanceConfig::default();
        let generation = GenerationConfig::for_testing(1);
        let mut rng = SeededRng::new(1);
        let mut ctx = ReducerContext::new(&mut rng, &balance, &generation);
        let mut state = EngineState::new(Player::new(), 1, 4);
        state.enemy = Some(Enemy::new("Lich", 500, 14));
        state.phase = TurnPhase::Resolving;
        state.cascade_ticks = crate::config::MAX_CASCADE_TICKS;
        state.board = Board::from_rows(&["SSSM", "MPID", "DMPS", "PDMI"]).unwrap();

        let result = apply_event(&state, &EngineInput::Tick, &mut ctx);
        assert!(result.accepted);
        assert!(result.events.is_empty());
        assert_eq!(result.state.phase, TurnPhase::Enemy);
        assert_eq!(result.state.enemy.as_ref().unwrap().hp, 500);
    }

    #[test]
    fn test_next_level_only_after_victory() {
        let balance = BalanceConfig::default();
        let generation = GenerationConfig::for_testing(5);
        let mut rng = SeededRng::new(5);
        let mut ctx = ReducerContext::new(&mut rng, &balance, &generation);
        let mut state = started(5);

        assert!(!apply_event(&state, &EngineInput::NextLevel, &mut ctx).accepted);

        state.phase = TurnPhase::GameOver(EncounterOutcome::Victory);
        let result = apply_event(&state, &EngineInput::NextLevel, &mut ctx);
        assert!(result.accepted);
        assert_eq!(result.state.current_level, 2);
        assert_eq!(result.state.phase, TurnPhase::Player);
    }

    #[test]
    fn test_purchase_rules() {
        let balance = BalanceConfig::default();
        let generation = GenerationConfig::for_testing(1);
        let mut rng = ScriptedRng::constant(0.5);
        let mut ctx = ReducerContext::new(&mut rng, &balance, &generation);
        let mut state = EngineState::new(Player::new(), 1, 6);
        let buy = EngineInput::Purchase {
            upgrade: Upgrade::SwordMaster,
        };

        assert!(!apply_event(&state, &buy, &mut ctx).accepted);

        state.player.gold = 200;
        let bought = apply_event(&state, &buy, &mut ctx);
        assert!(bought.accepted);
        assert_eq!(bought.state.player.gold, 50);
        assert!(bought.state.player.has_upgrade(Upgrade::SwordMaster));

        let twice = apply_event(&bought.state, &buy, &mut ctx);
        assert!(!twice.accepted);

        state.phase = TurnPhase::Player;
        assert!(!apply_event(&state, &buy, &mut ctx).accepted);
    }

    #[test]
    fn test_equip_requires_ownership() {
        let balance = BalanceConfig::default();
        let generation = GenerationConfig::for_testing(1);
        let mut rng = ScriptedRng::constant(0.5);
        let mut ctx = ReducerContext::new(&mut rng, &balance, &generation);
        let mut state = EngineState::new(Player::new(), 1, 6);
        let equip = EngineInput::Equip {
            weapon: Weapon::IronSword,
        };

        assert!(!apply_event(&state, &equip, &mut ctx).accepted);
        state.player.inventory.insert(Weapon::IronSword);
        let result = apply_event(&state, &equip, &mut ctx);
        assert!(result.accepted);
        assert_eq!(result.state.player.weapon, Weapon::IronSword);
    }

    #[test]
    fn test_return_to_menu_discards_encounter() {
        let balance = BalanceConfig::default();
        let generation = GenerationConfig::for_testing(2);
        let mut rng = SeededRng::new(2);
        let mut ctx = ReducerContext::new(&mut rng, &balance, &generation);
        let state = started(2);

        let result = apply_event(&state, &EngineInput::ReturnToMenu, &mut ctx);
        assert!(result.accepted);
        assert_eq!(result.state.phase, TurnPhase::Waiting);
        assert!(result.state.enemy.is_none());
    }

    #[test]
    fn test_statistics_update() {
        let mut stats = BattleStatistics::new();
        stats.update_from_event(&GameEvent::Matched {
            tiles: 4,
            combo: 2,
            effect: crate::CombatEffect {
                critical: true,
                ..Default::default()
            },
            damage_dealt: 30,
        });
        stats.update_from_event(&GameEvent::EnemyAttacked {
            damage: 8,
            absorbed: 5,
            hp_lost: 3,
        });
        stats.update_from_event(&GameEvent::Victory { xp: 10, gold: 5 });

        assert_eq!(stats.tiles_cleared, 4);
        assert_eq!(stats.best_combo, 2);
        assert_eq!(stats.critical_hits, 1);
        assert_eq!(stats.damage_dealt, 30);
        assert_eq!(stats.damage_taken, 3);
        assert_eq!(stats.damage_absorbed, 5);
        assert_eq!(stats.victories, 1);
    }

    #[test]
    fn test_engine_state_serialization() {
        let state = started(9);
        let json = state.save_to_json().unwrap();
        let _: serde_json::Value = serde_json::from_str(&json).unwrap();
        let loaded = EngineState::load_from_json(&json).unwrap();
        assert_eq!(loaded, state);
    }
}
