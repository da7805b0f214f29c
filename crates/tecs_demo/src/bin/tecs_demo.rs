//! # TECS Demo Driver
//!
//! Runs a game session under the autopilot and prints the outcome.
//!
//! ```bash
//! # Default session, one minute of game time
//! tecs_demo
//!
//! # Custom tuning, more logging
//! RUST_LOG=tecs_demo=debug tecs_demo --config demo.toml --frames 7200
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tecs_demo::{Game, GameConfig, GameResult};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Headless zombie survival on the TECS runtime.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// TOML file with game tuning. Defaults are used when omitted.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Frames to simulate. Overrides the config file.
    #[arg(long)]
    frames: Option<u64>,

    /// Spawn seed. Overrides the config file.
    #[arg(long)]
    seed: Option<u64>,
}

fn run(cli: Cli) -> GameResult<()> {
    let mut config = match &cli.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    if let Some(frames) = cli.frames {
        config.frames = frames;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let frames = config.frames;
    let mut game = Game::new(config)?;
    let report = game.run(frames)?;

    if report.game_over {
        info!(
            seconds = game.seconds_alive(),
            zombies_spawned = report.zombies_spawned,
            "game over"
        );
    } else {
        info!(
            seconds = game.seconds_alive(),
            health = report.player_health,
            level = report.zombie_level,
            zombies_alive = report.zombies_alive,
            "survived"
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "demo failed");
            ExitCode::FAILURE
        }
    }
}
