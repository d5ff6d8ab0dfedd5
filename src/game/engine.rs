//! # Combat Engine
//!
//! The host-facing facade over the reducer.
//!
//! [`CombatEngine`] owns the latest [`EngineState`], the random source, the
//! balance and generation settings, a notification sink and an optional save
//! handle. Hosts drive it with discrete calls (`start`, `swap`,
//! `run_enemy_turn`, `next_level`, `return_to_menu`) and a fixed-rate
//! [`CombatEngine::tick`] that does nothing outside the resolving phase.

use crate::persistence::{SaveData, SaveHandle};
use crate::{
    apply_event, BalanceConfig, BattleError, BattleResult, EngineInput, EngineSnapshot,
    EngineState, GameEvent, GenerationConfig, NotificationSink, NullSink, Position, RandomSource,
    ReducerContext, SeededRng, TurnPhase, Upgrade, Weapon,
};
use log::{debug, error, info};

/// Result of a swap request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOutcome {
    pub accepted: bool,
    /// Why the swap was refused, when it was
    pub reason: Option<String>,
}

/// Owns one battle session.
///
/// # Examples
///
/// ```
/// use tilebattle::{CombatEngine, TurnPhase};
///
/// let mut engine = CombatEngine::new(42);
/// assert!(engine.start());
/// assert_eq!(engine.snapshot().phase, TurnPhase::Player);
///
/// let (from, to) = engine.hint().unwrap();
/// let outcome = engine.swap(from.row, from.col, to.row, to.col);
/// assert!(outcome.accepted);
/// engine.resolve_until_settled();
/// ```
pub struct CombatEngine<R: RandomSource = SeededRng> {
    state: EngineState,
    rng: R,
    balance: BalanceConfig,
    generation: GenerationConfig,
    sink: Box<dyn NotificationSink>,
    saver: Option<SaveHandle>,
}

impl CombatEngine<SeededRng> {
    /// Creates an engine with default balance, an 8x8 board and a fresh player.
    pub fn new(seed: u64) -> Self {
        Self::with_rng(
            SeededRng::new(seed),
            BalanceConfig::default(),
            GenerationConfig::new(seed),
        )
    }
}

impl<R: RandomSource> CombatEngine<R> {
    /// Creates an engine around an explicit random source.
    pub fn with_rng(rng: R, balance: BalanceConfig, generation: GenerationConfig) -> Self {
        let state = EngineState::new(Default::default(), 1, generation.board_size);
        Self {
            state,
            rng,
            balance,
            generation,
            sink: Box::new(NullSink),
            saver: None,
        }
    }

    /// Routes notifications to `sink`.
    pub fn with_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sends checkpoints to a save worker.
    pub fn with_saver(mut self, saver: SaveHandle) -> Self {
        self.saver = Some(saver);
        self
    }

    /// Restores persisted progression. Any running encounter is discarded.
    pub fn with_progress(mut self, data: SaveData) -> Self {
        self.state = EngineState::new(data.player, data.current_level, self.generation.board_size);
        self
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn snapshot(&self) -> EngineSnapshot<'_> {
        self.state.snapshot()
    }

    pub fn phase(&self) -> TurnPhase {
        self.state.phase
    }

    pub fn balance(&self) -> &BalanceConfig {
        &self.balance
    }

    /// Applies an input through the reducer, forwards its events and takes a
    /// checkpoint after a victory. Returns whether the input was accepted.
    pub fn dispatch(&mut self, input: EngineInput) -> bool {
        self.try_dispatch(input).is_ok()
    }

    /// Like [`CombatEngine::dispatch`], but reports why an input was refused
    /// as [`BattleError::InvalidAction`].
    pub fn try_dispatch(&mut self, input: EngineInput) -> BattleResult<()> {
        let transition = {
            let mut ctx = ReducerContext::new(&mut self.rng, &self.balance, &self.generation);
            apply_event(&self.state, &input, &mut ctx)
        };

        if !transition.accepted {
            let reason = transition
                .rejection
                .unwrap_or_else(|| format!("{:?} was not accepted", input));
            return Err(BattleError::InvalidAction(reason));
        }

        self.state = transition.state;
        let mut won = false;
        for event in &transition.events {
            won |= matches!(event, GameEvent::Victory { .. });
            self.sink.notify(event);
        }
        if won {
            self.checkpoint();
        }
        Ok(())
    }

    /// Starts an encounter at the current level, or replays it after a defeat.
    pub fn start(&mut self) -> bool {
        self.dispatch(EngineInput::Start)
    }

    /// Requests a swap between two cells given as row/column pairs.
    pub fn swap(&mut self, r1: i32, c1: i32, r2: i32, c2: i32) -> SwapOutcome {
        let input = EngineInput::Swap {
            from: Position::new(r1, c1),
            to: Position::new(r2, c2),
        };
        match self.try_dispatch(input) {
            Ok(()) => SwapOutcome {
                accepted: true,
                reason: None,
            },
            Err(e) => SwapOutcome {
                accepted: false,
                reason: Some(e.to_string()),
            },
        }
    }

    /// One fixed-rate tick; a no-op unless cascades are resolving.
    pub fn tick(&mut self) -> bool {
        if self.state.phase != TurnPhase::Resolving {
            return false;
        }
        self.dispatch(EngineInput::Tick)
    }

    /// Ticks until resolution finishes. Returns the number of ticks taken.
    pub fn resolve_until_settled(&mut self) -> u32 {
        let mut ticks = 0;
        // One extra tick lets the reducer's own guard fire.
        while self.state.phase == TurnPhase::Resolving && ticks <= crate::config::MAX_CASCADE_TICKS {
            self.tick();
            ticks += 1;
        }
        if self.state.phase == TurnPhase::Resolving {
            error!("Resolution did not settle after {} ticks", ticks);
        }
        debug!("Resolution settled after {} ticks", ticks);
        ticks
    }

    /// Runs the pending enemy turn.
    pub fn run_enemy_turn(&mut self) -> bool {
        self.dispatch(EngineInput::EnemyTurn)
    }

    /// Moves on to the next level after a victory.
    pub fn next_level(&mut self) -> bool {
        self.dispatch(EngineInput::NextLevel)
    }

    /// Abandons the current encounter.
    pub fn return_to_menu(&mut self) -> bool {
        self.dispatch(EngineInput::ReturnToMenu)
    }

    /// Buys an upgrade. Only allowed outside combat.
    pub fn purchase_upgrade(&mut self, upgrade: Upgrade) -> BattleResult<()> {
        self.try_dispatch(EngineInput::Purchase { upgrade })?;
        info!("Purchased {} for {} gold", upgrade, upgrade.cost());
        Ok(())
    }

    /// Equips an owned weapon. Only allowed outside combat.
    pub fn equip_weapon(&mut self, weapon: Weapon) -> BattleResult<()> {
        self.try_dispatch(EngineInput::Equip { weapon })
    }

    /// First legal swap on the board, if any.
    pub fn hint(&self) -> Option<(Position, Position)> {
        self.state.board.legal_swaps().into_iter().next()
    }

    /// The progression record to persist.
    pub fn save_data(&self) -> SaveData {
        SaveData {
            player: self.state.player.clone(),
            current_level: self.state.current_level,
        }
    }

    /// Queues a save with the worker, if one is attached. Never blocks.
    pub fn checkpoint(&self) -> bool {
        match &self.saver {
            Some(saver) => saver.submit(self.save_data()),
            None => false,
        }
    }
}
