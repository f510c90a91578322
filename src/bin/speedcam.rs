//! speedcam - roadside vehicle speed estimation
//!
//! Processes a video (or a directory of videos) through the sustained-motion
//! pipeline, prints a per-video report, and records each result in the
//! configured SQLite database.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use speedcam::{process_videos, ResultStore, SpeedcamConfig, SqliteResultStore};

#[derive(Parser, Debug)]
#[command(name = "speedcam", version, about = "Estimate vehicle speed from roadside video")]
struct Cli {
    /// Video file or directory of videos to analyze
    #[arg(long = "in", value_name = "PATH")]
    input: String,

    /// Verbose per-frame logging plus intermediate frame/mask image dumps
    #[arg(long)]
    debug: bool,

    /// TOML configuration file
    #[arg(long, value_name = "PATH", env = "SPEEDCAM_CONFIG")]
    config: Option<PathBuf>,

    /// Analyze without writing results to the database
    #[arg(long)]
    no_store: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    log::info!("---- speedcam starting ----");

    let config = SpeedcamConfig::load(cli.config.as_deref())?;
    let mut store = if cli.no_store {
        None
    } else {
        Some(SqliteResultStore::open(&config.db_path)?)
    };
    if store.is_some() {
        log::info!("recording results to {}", config.db_path);
    }

    let results = process_videos(
        &cli.input,
        &config,
        store.as_mut().map(|s| s as &mut dyn ResultStore),
        cli.debug,
    )?;

    for (path, result) in &results {
        println!("\n{}\n{}", path, result.summary());
    }

    log::info!("---- speedcam complete ({} videos) ----", results.len());
    Ok(())
}
