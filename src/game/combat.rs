//! # Combat Rules
//!
//! The battle state machine's individual steps: starting an encounter, one
//! resolution tick, the enemy turn, victory payouts and the dead-board
//! reshuffle.
//!
//! Each step mutates a working copy of [`EngineState`] and appends the
//! notifications it produced. The reducer in [`crate::game::state`] decides
//! which step runs for a given input and phase; nothing here checks phases.

use crate::generation::{roll_loot, BoardGenerator, EncounterGenerator};
use crate::{
    apply_weapon_modifiers, Ability, BalanceConfig, BattleResult, CombatEffect, EffectResolver,
    Enemy, EncounterOutcome, EngineState, GameEvent, Generator, GravityEngine, MatchDetector,
    Player, ReducerContext, TurnPhase, Upgrade,
};
use log::{debug, error, info, warn};

/// Floors a scaled float to whole points.
fn floor_points(value: f64) -> u32 {
    if value <= 0.0 {
        0
    } else {
        (value + 1e-9).floor() as u32
    }
}

/// Resets the player and spawns a fresh enemy and board for the state's
/// current level.
pub fn begin_encounter(
    state: &mut EngineState,
    ctx: &mut ReducerContext<'_>,
    events: &mut Vec<GameEvent>,
) -> BattleResult<()> {
    let encounters = EncounterGenerator::new(state.current_level, ctx.balance);
    let enemy = encounters.generate(ctx.generation, &mut *ctx.rng)?;
    encounters.validate(&enemy, ctx.generation)?;
    let board = BoardGenerator::new().generate_playable(ctx.generation, &mut *ctx.rng)?;

    state.player.restore_for_encounter();
    state.board = board;
    state.phoenix_used = false;
    state.turn_number = 0;

    info!(
        "Level {} encounter begins against {} ({} hp)",
        state.current_level, enemy.name, enemy.max_hp
    );
    events.push(GameEvent::EncounterStarted {
        enemy: enemy.name.clone(),
        level: state.current_level,
    });
    state.enemy = Some(enemy);

    begin_player_turn(state, ctx, events);
    Ok(())
}

/// Hands control back to the player, regenerating the board if it offers no
/// legal swap.
pub fn begin_player_turn(
    state: &mut EngineState,
    ctx: &mut ReducerContext<'_>,
    events: &mut Vec<GameEvent>,
) {
    state.phase = TurnPhase::Player;
    state.combo = 0;
    state.cascade_ticks = 0;

    if state.board.has_legal_move() {
        return;
    }

    match BoardGenerator::new().generate_playable(ctx.generation, &mut *ctx.rng) {
        Ok(board) => {
            debug!("No legal swap left, board regenerated");
            state.board = board;
            events.push(GameEvent::BoardShuffled);
        }
        Err(e) => error!("Failed to regenerate a dead board: {}", e),
    }
}

/// Applies a resolved effect: healing, mana and shield go to the player;
/// damage (after weapon modifiers) and status stacks go to the enemy.
///
/// Returns the damage that actually landed.
pub fn apply_player_effect(
    player: &mut Player,
    enemy: &mut Enemy,
    effect: &CombatEffect,
    balance: &BalanceConfig,
) -> u32 {
    player.heal(effect.healing);
    player.restore_mana(effect.mana_gain);
    player.add_shield(effect.shield_gain);

    let damage = apply_weapon_modifiers(effect.damage, player.weapon, enemy.is_dragon(), balance);
    let dealt = enemy.take_damage(damage);

    enemy.status_effects.burn += effect.burn;
    enemy.status_effects.freeze += effect.freeze;
    enemy.status_effects.shock += effect.shock;
    dealt
}

/// Runs one resolution tick.
///
/// With matches on the board: resolve them into an effect, apply it, clear
/// the cells, bump the combo and refill. Victory ends the encounter
/// immediately. Without matches the turn passes to the enemy.
pub fn resolution_step(
    state: &mut EngineState,
    ctx: &mut ReducerContext<'_>,
    events: &mut Vec<GameEvent>,
) {
    let matches = MatchDetector::scan(&state.board);
    if matches.is_empty() {
        state.phase = TurnPhase::Enemy;
        debug!("Board settled after {} matching ticks", state.combo);
        return;
    }

    let Some(enemy) = state.enemy.as_mut() else {
        error!("Resolution tick without an enemy");
        state.phase = TurnPhase::Waiting;
        return;
    };

    let effect = EffectResolver::new(ctx.balance).resolve(
        &matches.tally,
        state.combo,
        &state.player,
        &mut *ctx.rng,
    );
    let damage_dealt = apply_player_effect(&mut state.player, enemy, &effect, ctx.balance);
    let defeated = enemy.is_defeated();

    state.board.remove_cells(&matches.cells);
    state.combo += 1;
    state.cascade_ticks += 1;
    state.board = GravityEngine::default().apply(&state.board, &mut *ctx.rng);

    debug!(
        "Tick {}: {} tiles, {} damage, enemy at {} hp",
        state.combo,
        matches.len(),
        damage_dealt,
        state.enemy.as_ref().map(|e| e.hp).unwrap_or(0)
    );
    events.push(GameEvent::Matched {
        tiles: matches.len() as u32,
        combo: state.combo,
        effect,
        damage_dealt,
    });

    if defeated {
        award_victory(state, ctx, events);
    }
}

/// Ends a cascade that has run too long: remaining runs are cleared without
/// effects and the turn passes to the enemy.
pub fn abort_cascade(state: &mut EngineState, ctx: &mut ReducerContext<'_>) {
    error!(
        "Cascade exceeded {} ticks, settling the board without effects",
        state.cascade_ticks
    );
    let gravity = GravityEngine::default();
    state
        .board
        .settle(&gravity, &mut *ctx.rng, crate::config::MAX_CASCADE_TICKS);
    if !state.board.find_matches().is_empty() {
        warn!("Board still has runs after a forced settle");
    }
    state.phase = TurnPhase::Enemy;
}

/// Runs the enemy's turn: burn, attack, abilities, then the defeat check.
pub fn enemy_turn(
    state: &mut EngineState,
    ctx: &mut ReducerContext<'_>,
    events: &mut Vec<GameEvent>,
) {
    let balance = ctx.balance;
    let Some(enemy) = state.enemy.as_mut() else {
        error!("Enemy turn without an enemy");
        state.phase = TurnPhase::Waiting;
        return;
    };

    let burn = enemy.status_effects.burn;
    if burn > 0 {
        let damage = enemy.take_damage(burn * balance.burn_damage_per_stack);
        enemy.status_effects.burn -= 1;
        events.push(GameEvent::BurnTicked { damage });
        if enemy.is_defeated() {
            award_victory(state, ctx, events);
            return;
        }
    }

    let mut outgoing = enemy.damage as f64;
    if enemy.status_effects.freeze > 0 {
        outgoing *= balance.freeze_damage_factor;
        enemy.status_effects.freeze -= 1;
    }
    if enemy.status_effects.shock > 0 {
        outgoing *= balance.shock_damage_factor;
        enemy.status_effects.shock -= 1;
    }
    let damage = floor_points(outgoing);
    let report = state.player.take_damage(damage);
    events.push(GameEvent::EnemyAttacked {
        damage,
        absorbed: report.absorbed,
        hp_lost: report.hp_lost,
    });

    if enemy.has_ability(Ability::StealGold) && ctx.rng.chance(balance.steal_gold_chance) {
        let amount = floor_points(state.player.gold as f64 * balance.steal_gold_fraction);
        if amount > 0 {
            state.player.gold -= amount;
            events.push(GameEvent::GoldStolen { amount });
        }
    }

    if enemy.has_ability(Ability::CurseTiles) && ctx.rng.chance(balance.curse_tiles_chance) {
        let cells = state
            .board
            .insert_curses(balance.curse_tiles_count, &mut *ctx.rng);
        if !cells.is_empty() {
            events.push(GameEvent::TilesCursed { cells });
        }
    }

    state.turn_number += 1;

    if !state.player.is_alive() {
        if state.player.has_upgrade(Upgrade::PhoenixHeart) && !state.phoenix_used {
            state.phoenix_used = true;
            let hp = floor_points(state.player.max_hp as f64 * balance.phoenix_revive_fraction).max(1);
            state.player.hp = hp.min(state.player.max_hp);
            info!("Phoenix Heart revives the player with {} hp", state.player.hp);
            events.push(GameEvent::PhoenixRevived { hp: state.player.hp });
        } else {
            state.phase = TurnPhase::GameOver(EncounterOutcome::Defeat);
            info!("Player defeated on level {}", state.current_level);
            events.push(GameEvent::Defeat);
            return;
        }
    }

    begin_player_turn(state, ctx, events);
}

/// Pays out the defeated enemy's rewards, rolls its loot and applies any
/// level-ups. Ends the encounter as a victory.
pub fn award_victory(
    state: &mut EngineState,
    ctx: &mut ReducerContext<'_>,
    events: &mut Vec<GameEvent>,
) {
    let Some(enemy) = state.enemy.as_ref() else {
        error!("Victory without an enemy");
        return;
    };
    let rewards = enemy.rewards;
    let loot = enemy.loot;

    state.player.gold = state.player.gold.saturating_add(rewards.gold);
    let level_before = state.player.level;
    let gained = state.player.gain_xp(rewards.xp, ctx.balance);
    events.push(GameEvent::Victory {
        xp: rewards.xp,
        gold: rewards.gold,
    });
    info!(
        "Victory on level {}: +{} xp, +{} gold",
        state.current_level, rewards.xp, rewards.gold
    );

    if let Some(weapon) = roll_loot(loot.as_ref(), &state.player, &mut *ctx.rng) {
        state.player.inventory.insert(weapon);
        events.push(GameEvent::LootFound { weapon });
    }

    for level in level_before + 1..=level_before + gained {
        info!("Player reached level {}", level);
        events.push(GameEvent::LeveledUp { level });
    }

    state.phase = TurnPhase::GameOver(EncounterOutcome::Victory);
}
