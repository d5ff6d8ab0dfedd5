//! # Tilebattle Main Entry Point
//!
//! Loads progression, wires the engine to a save worker and runs either the
//! interactive terminal game or an unattended autoplay session.

use clap::Parser;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::time::Duration;
use tilebattle::config::{DEFAULT_AUTOSAVE_SECS, TICK_RATE_HZ};
use tilebattle::{
    describe_event, help_text, load_or_default, render_shop, BalanceConfig, BattleError, BattleResult,
    CombatEngine, EncounterOutcome, GameEvent, GenerationConfig, InputHandler, JsonFileStore,
    LogSink, NotificationSink, PlayerInput, SavePolicy, SaveWorker, SeededRng, TextDisplay,
    TurnPhase,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

/// Command line arguments for Tilebattle.
#[derive(Parser, Debug)]
#[command(name = "tilebattle")]
#[command(about = "A tile-matching battle game for the terminal")]
#[command(version)]
struct Args {
    /// Random seed for boards, enemies and rolls
    #[arg(short, long)]
    seed: Option<u64>,

    /// Log filter (error, warn, info, debug, trace or an env_logger spec)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Where progression is saved
    #[arg(long, default_value = "tilebattle_save.json")]
    save_file: PathBuf,

    /// JSON file overriding balance constants
    #[arg(long)]
    balance: Option<PathBuf>,

    /// Let the engine play itself using the first legal swap
    #[arg(long)]
    autoplay: bool,

    /// Levels to clear in autoplay mode
    #[arg(long, default_value_t = 5)]
    levels: u32,

    /// Seconds between background saves in interactive mode
    #[arg(long, default_value_t = DEFAULT_AUTOSAVE_SECS)]
    autosave_secs: u64,
}

type Engine = CombatEngine<SeededRng>;

#[tokio::main]
async fn main() -> BattleResult<()> {
    let args = Args::parse();

    // Initialize logging
    initialize_logging(&args.log_level)?;

    info!("Starting Tilebattle v{}", tilebattle::VERSION);

    let balance = match &args.balance {
        Some(path) => BalanceConfig::from_json_file(path)?,
        None => BalanceConfig::default(),
    };
    let seed = args.seed.unwrap_or_else(rand::random);
    info!("Using seed {}", seed);

    let store = JsonFileStore::new(&args.save_file);
    let progress = load_or_default(&store);
    let (saver, worker) = SaveWorker::spawn(store, SavePolicy::default());
    let (events_tx, events_rx) = unbounded_channel();

    let engine = CombatEngine::with_rng(SeededRng::new(seed), balance, GenerationConfig::new(seed))
        .with_progress(progress)
        .with_sink(Box::new(events_tx))
        .with_saver(saver);

    let result = if args.autoplay {
        run_autoplay(engine, events_rx, args.levels)
    } else {
        run_interactive(engine, events_rx, args.autosave_secs).await
    };

    // The engine held the last save handle; the worker drains and exits.
    match worker.await {
        Ok(report) => debug!(
            "Saves: {} written, {} failed, {} coalesced",
            report.saved, report.failed, report.coalesced
        ),
        Err(e) => error!("Save worker crashed: {}", e),
    }

    result
}

/// Initializes the logging system based on the specified filter.
fn initialize_logging(log_level: &str) -> BattleResult<()> {
    env_logger::Builder::new()
        .parse_filters(log_level)
        .format_target(false)
        .try_init()
        .map_err(|e| BattleError::InvalidConfig(format!("Logger already initialized: {}", e)))
}

/// Moves queued notifications into the display and the log.
fn drain_events(events: &mut UnboundedReceiver<GameEvent>, display: &mut TextDisplay) {
    let mut log_sink = LogSink;
    while let Ok(event) = events.try_recv() {
        log_sink.notify(&event);
        display.add_event(&event);
    }
}

fn redraw(engine: &Engine, events: &mut UnboundedReceiver<GameEvent>, display: &mut TextDisplay) {
    drain_events(events, display);
    println!("\n{}", display.render(&engine.snapshot()));
}

/// Runs the interactive terminal game until `quit` or end of input.
async fn run_interactive(
    mut engine: Engine,
    mut events: UnboundedReceiver<GameEvent>,
    autosave_secs: u64,
) -> BattleResult<()> {
    let handler = InputHandler::new();
    let mut display = TextDisplay::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut ticker = tokio::time::interval(Duration::from_millis(1000 / TICK_RATE_HZ));
    let mut autosave = tokio::time::interval(Duration::from_secs(autosave_secs.max(1)));
    autosave.reset();

    println!("Tilebattle v{}. Type 'help' for commands.", tilebattle::VERSION);
    redraw(&engine, &mut events, &mut display);

    loop {
        let busy = matches!(engine.phase(), TurnPhase::Resolving | TurnPhase::Enemy);

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let input = match handler.parse(&line) {
                    Ok(Some(input)) => input,
                    Ok(None) => continue,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };

                match input {
                    PlayerInput::Quit => break,
                    PlayerInput::Help => println!("{}", help_text()),
                    PlayerInput::Shop => println!("{}", render_shop(&engine.state().player)),
                    PlayerInput::Status => redraw(&engine, &mut events, &mut display),
                    PlayerInput::Save => {
                        if engine.checkpoint() {
                            display.add_message("Progress queued for saving".to_string());
                        }
                        redraw(&engine, &mut events, &mut display);
                    }
                    other => {
                        let outcome = handler
                            .input_to_action(&other, engine.state())
                            .and_then(|action| match action {
                                Some(action) => engine.try_dispatch(action),
                                None => Ok(()),
                            });
                        if let Err(e) = outcome {
                            display.add_message(e.to_string());
                        }
                        redraw(&engine, &mut events, &mut display);
                    }
                }
            }
            _ = ticker.tick(), if busy => {
                match engine.phase() {
                    TurnPhase::Resolving => {
                        engine.tick();
                    }
                    TurnPhase::Enemy => {
                        engine.run_enemy_turn();
                    }
                    _ => {}
                }
                if !matches!(engine.phase(), TurnPhase::Resolving | TurnPhase::Enemy) {
                    redraw(&engine, &mut events, &mut display);
                }
            }
            _ = autosave.tick() => {
                if engine.checkpoint() {
                    debug!("Autosave queued");
                }
            }
        }
    }

    engine.checkpoint();
    println!("Goodbye!");
    Ok(())
}

/// Plays `levels` encounters unattended, always taking the first legal swap.
fn run_autoplay(
    mut engine: Engine,
    mut events: UnboundedReceiver<GameEvent>,
    levels: u32,
) -> BattleResult<()> {
    const MAX_STEPS: u32 = 100_000;

    let mut cleared = 0;
    let mut steps = 0;

    while cleared < levels && steps < MAX_STEPS {
        steps += 1;
        match engine.phase() {
            TurnPhase::Waiting => {
                engine.try_dispatch(tilebattle::EngineInput::Start)?;
            }
            TurnPhase::Player => match engine.hint() {
                Some((from, to)) => {
                    engine.swap(from.row, from.col, to.row, to.col);
                }
                None => {
                    warn!("No legal swap available, abandoning autoplay");
                    break;
                }
            },
            TurnPhase::Resolving => {
                engine.resolve_until_settled();
            }
            TurnPhase::Enemy => {
                engine.run_enemy_turn();
            }
            TurnPhase::GameOver(EncounterOutcome::Victory) => {
                cleared += 1;
                if cleared < levels {
                    engine.next_level();
                }
            }
            TurnPhase::GameOver(EncounterOutcome::Defeat) => {
                println!("Defeated on level {}", engine.state().current_level);
                break;
            }
        }

        while let Ok(event) = events.try_recv() {
            println!("{}", describe_event(&event));
        }
    }

    if steps >= MAX_STEPS {
        warn!("Autoplay stopped after {} steps", MAX_STEPS);
    }

    let stats = &engine.state().statistics;
    println!(
        "Cleared {} level(s): {} matches, {} tiles, best combo {}, {} damage dealt, {} taken",
        cleared,
        stats.matches_made,
        stats.tiles_cleared,
        stats.best_combo,
        stats.damage_dealt,
        stats.damage_taken
    );
    engine.checkpoint();
    Ok(())
}
