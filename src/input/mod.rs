//! # Input Module
//!
//! Input handling and command parsing for player interactions.

pub mod commands;

pub use commands::*;

use crate::{BattleError, BattleResult, Direction, EngineInput, EngineState, Position, Upgrade, Weapon};

/// Input handler for processing player commands.
///
/// Parses terminal lines into [`PlayerInput`] and converts those into engine
/// inputs against the current state.
#[derive(Debug, Clone, Default)]
pub struct InputHandler;

impl InputHandler {
    /// Creates a new input handler.
    ///
    /// # Examples
    ///
    /// ```
    /// use tilebattle::{InputHandler, PlayerInput};
    ///
    /// let handler = InputHandler::new();
    /// assert_eq!(handler.parse("help").unwrap(), Some(PlayerInput::Help));
    /// ```
    pub fn new() -> Self {
        Self
    }

    /// Parses one line. Blank lines yield `None`.
    pub fn parse(&self, line: &str) -> BattleResult<Option<PlayerInput>> {
        let mut words = line.split_whitespace();
        let Some(first) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();
        let command = find_command(first)
            .ok_or_else(|| BattleError::InvalidAction(format!("Unknown command '{}'", first)))?;

        let input = match command.name {
            "swap" => parse_swap(&args)?,
            "hint" => PlayerInput::Hint,
            "start" => PlayerInput::Start,
            "next" => PlayerInput::NextLevel,
            "menu" => PlayerInput::Menu,
            "shop" => PlayerInput::Shop,
            "buy" => PlayerInput::Buy(args.join(" ").parse::<Upgrade>()?),
            "equip" => PlayerInput::Equip(args.join(" ").parse::<Weapon>()?),
            "status" => PlayerInput::Status,
            "save" => PlayerInput::Save,
            "help" => PlayerInput::Help,
            "quit" => PlayerInput::Quit,
            other => {
                return Err(BattleError::InvalidAction(format!(
                    "Command '{}' has no handler",
                    other
                )))
            }
        };
        Ok(Some(input))
    }

    /// Converts player input to an engine input.
    ///
    /// Inputs the host handles itself (help, status, save, quit) yield `None`.
    pub fn input_to_action(
        &self,
        input: &PlayerInput,
        state: &EngineState,
    ) -> BattleResult<Option<EngineInput>> {
        let action = match input {
            PlayerInput::Swap { from, to } => EngineInput::Swap {
                from: *from,
                to: *to,
            },
            PlayerInput::Hint => {
                let (from, to) = state
                    .board
                    .legal_swaps()
                    .into_iter()
                    .next()
                    .ok_or_else(|| BattleError::InvalidState("No legal swap on the board".to_string()))?;
                EngineInput::Swap { from, to }
            }
            PlayerInput::Start => EngineInput::Start,
            PlayerInput::NextLevel => EngineInput::NextLevel,
            PlayerInput::Menu => EngineInput::ReturnToMenu,
            PlayerInput::Buy(upgrade) => EngineInput::Purchase { upgrade: *upgrade },
            PlayerInput::Equip(weapon) => EngineInput::Equip { weapon: *weapon },
            PlayerInput::Shop
            | PlayerInput::Status
            | PlayerInput::Save
            | PlayerInput::Help
            | PlayerInput::Quit => return Ok(None),
        };
        Ok(Some(action))
    }
}

fn parse_coordinate(word: &str) -> BattleResult<i32> {
    word.parse::<i32>()
        .map_err(|_| BattleError::InvalidAction(format!("'{}' is not a coordinate", word)))
}

fn parse_direction(word: &str) -> BattleResult<Direction> {
    match word.to_ascii_lowercase().as_str() {
        "n" | "north" | "up" => Ok(Direction::North),
        "s" | "south" | "down" => Ok(Direction::South),
        "e" | "east" | "right" => Ok(Direction::East),
        "w" | "west" | "left" => Ok(Direction::West),
        _ => Err(BattleError::InvalidAction(format!("'{}' is not a direction", word))),
    }
}

fn parse_swap(args: &[&str]) -> BattleResult<PlayerInput> {
    match args {
        [r1, c1, r2, c2] => Ok(PlayerInput::Swap {
            from: Position::new(parse_coordinate(r1)?, parse_coordinate(c1)?),
            to: Position::new(parse_coordinate(r2)?, parse_coordinate(c2)?),
        }),
        [r, c, dir] => {
            let from = Position::new(parse_coordinate(r)?, parse_coordinate(c)?);
            Ok(PlayerInput::Swap {
                from,
                to: from + parse_direction(dir)?.to_delta(),
            })
        }
        _ => Err(BattleError::InvalidAction(
            "usage: swap <row> <col> <row> <col> | swap <row> <col> <n|s|e|w>".to_string(),
        )),
    }
}

/// Player input types that can be processed by the input handler.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerInput {
    /// Swap two cells
    Swap { from: Position, to: Position },
    /// Play the first legal swap
    Hint,
    /// Start or retry the current level
    Start,
    /// Advance after a victory
    NextLevel,
    /// Abandon the encounter
    Menu,
    /// List upgrades for sale
    Shop,
    Buy(Upgrade),
    Equip(Weapon),
    /// Show the board and combatants
    Status,
    /// Queue a save
    Save,
    /// Show help information
    Help,
    /// Quit the game
    Quit,
}
