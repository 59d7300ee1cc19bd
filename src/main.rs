//! Tether Path headless runner
//!
//! Loads (or generates) a level and lets the demo agent play it at a fixed
//! 60 Hz frame rate, logging every game event. Completions are recorded in
//! the save file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use tether_path::sim::{Autoplay, GameEvent, GameState, LevelDef, TickInput, generate, run_frame};
use tether_path::{SaveData, Settings, TerminalPolicy};

/// Simulated frame time for the headless loop
const FRAME_DT: f32 = 1.0 / 60.0;

#[derive(Parser, Debug)]
#[command(name = "tether-path", about = "Headless tether-path puzzle runner", version)]
struct Args {
    /// Level JSON file; a procedural level is generated when omitted
    #[arg(long)]
    level: Option<PathBuf>,

    /// Seed for procedural levels and the demo agent
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Level number used for procedural generation
    #[arg(long, default_value_t = 1)]
    number: u32,

    /// Settings JSON file
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Override the terminal policy (retain | pop)
    #[arg(long)]
    terminal: Option<String>,

    /// Save file for level progress
    #[arg(long, default_value = "tether-path-save.json")]
    save: PathBuf,

    /// Give up after this many simulated seconds
    #[arg(long, default_value_t = 300.0)]
    max_secs: f32,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut settings = match &args.settings {
        Some(path) => Settings::load_or_default(path),
        None => Settings::default(),
    };
    if let Some(name) = &args.terminal {
        settings.terminal_policy = TerminalPolicy::from_str(name)
            .with_context(|| format!("unknown terminal policy '{name}'"))?;
    }

    let level = match &args.level {
        Some(path) => LevelDef::load(path)
            .with_context(|| format!("loading level {}", path.display()))?,
        None => {
            log::info!("Generating level {} from seed {}", args.number, args.seed);
            generate(args.seed, args.number)
        }
    };

    let mut state = GameState::new(level, settings).context("invalid level")?;
    let mut bot = Autoplay::new(args.seed);
    let mut pending = TickInput::default();
    let max_frames = (args.max_secs / FRAME_DT) as u64;

    for _ in 0..max_frames {
        if pending.is_empty() {
            pending = bot.next_input(&state);
        }
        if run_frame(&mut state, &pending, FRAME_DT) > 0 {
            pending = TickInput::default();
        }

        for event in state.drain_events() {
            match event {
                GameEvent::RoleChanged { .. } => log::trace!("{event:?}"),
                _ => log::debug!("t={:.2}s {event:?}", state.clock.now_secs()),
            }
        }

        if state.is_completed() {
            break;
        }
    }

    let Some(report) = state.completion_report().copied() else {
        log::warn!(
            "Level {} not completed after {:.0}s",
            state.level.number,
            state.clock.now_secs()
        );
        return Ok(());
    };

    println!(
        "Level {} completed in {} moves (par {}){}",
        report.level,
        report.total_moves,
        report.par_moves,
        if report.perfect() { " - perfect" } else { "" }
    );

    let mut save = SaveData::load_or_default(&args.save);
    if save.record(&report) {
        save.save(&args.save)
            .with_context(|| format!("writing {}", args.save.display()))?;
    }

    Ok(())
}
