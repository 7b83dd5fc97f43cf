use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::Parser;
use log::info;
use serde::Serialize;

use cointap::{
    config::ConfigLoader,
    engine::{EngineBuilder, EngineSettings},
    session::{SessionBuilder, SessionStats},
    spawner::FixedViewport,
    systems::{AutoTapSystem, TallyReport, TallySystem},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Headless coin tap session runner")]
struct Cli {
    /// Path to the game config YAML file
    #[arg(long, default_value = "configs/default.yaml")]
    config: PathBuf,

    /// Run exactly this many frames instead of stopping when the session ends
    #[arg(long)]
    frames: Option<u64>,

    /// Frame length in milliseconds
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,

    /// Override the config seed
    #[arg(long)]
    seed: Option<u64>,

    /// Chance that the simulated player taps a live coin
    #[arg(long, default_value_t = 0.8)]
    accuracy: f64,

    /// How long the simulated player takes to react to a live coin
    #[arg(long, default_value_t = 450)]
    reaction_ms: u64,

    /// Write a snapshot every N frames (0 disables)
    #[arg(long, default_value_t = 0)]
    snapshot_interval: u64,

    /// Directory for snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    seed: u64,
    frames: u64,
    score: i64,
    taps: u64,
    misses: u64,
    stats: SessionStats,
    tally: TallyReport,
}

/// Upper bound for open-ended runs: an hour of 16 ms frames.
const MAX_FRAMES: u64 = 225_000;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let loader = ConfigLoader::new(".");
    let mut config = loader.load(&cli.config)?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    info!("loaded {} with seed {}", cli.config.display(), config.seed);

    let mut session =
        SessionBuilder::from_config(&config, Box::new(FixedViewport::default()))?.build();

    let settings = EngineSettings {
        label: format!("seed_{}", config.seed),
        seed: config.seed,
        frame: Duration::from_millis(cli.frame_ms.max(1)),
        snapshot_interval_frames: cli.snapshot_interval,
        snapshot_dir: cli
            .snapshot_dir
            .unwrap_or_else(|| PathBuf::from("snapshots")),
    };
    let mut engine = EngineBuilder::new(settings)
        .with_system(AutoTapSystem::new(
            Duration::from_millis(cli.reaction_ms),
            cli.accuracy,
        ))
        .with_system(TallySystem::new())
        .build();

    session.start();
    let frames = match cli.frames {
        Some(frames) => {
            engine.run(&mut session, frames)?;
            frames
        }
        None => engine.run_until_ended(&mut session, MAX_FRAMES)?,
    };

    let (taps, misses) = engine
        .get_system::<AutoTapSystem>()
        .map_or((0, 0), |tapper| (tapper.taps(), tapper.misses()));
    let tally = engine
        .get_system::<TallySystem>()
        .map(|tally| tally.report().clone())
        .unwrap_or_default();
    let summary = RunSummary {
        seed: config.seed,
        frames,
        score: session.score(),
        taps,
        misses,
        stats: session.stats(),
        tally,
    };
    session.shutdown();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Session finished after {} frames ({:?}). Score: {} ({} collected, {} expired, {} evicted)",
            summary.frames,
            session.state(),
            summary.score,
            summary.stats.collected,
            summary.stats.expired,
            summary.stats.evicted
        );
    }
    Ok(())
}
