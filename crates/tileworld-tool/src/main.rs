//! Tileworld script tool.
//!
//! Loads a world, runs the optional edit script through an editing session
//! and prints one JSON report line per step, ending with the staged draft.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tileworld_core::{EditorSession, SessionConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod protocol;
mod runner;

use protocol::{ReportLine, Script};
use runner::ScriptRunner;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run edit scripts against a tile world", long_about = None)]
struct Args {
    /// Path to the world JSON file
    world: PathBuf,

    /// Edit script: a list of actions, or `{config, actions}`
    script: Option<PathBuf>,

    /// Undo entries to keep (overrides the script config)
    #[arg(long, env = "TILEWORLD_MAX_HISTORY")]
    max_history: Option<usize>,

    /// RNG seed for reproducible settlement ids (overrides the script config)
    #[arg(long, env = "TILEWORLD_SEED")]
    seed: Option<u64>,
}

impl Args {
    /// Layer command-line and environment overrides on top of `config`
    fn session_config(&self, mut config: SessionConfig) -> SessionConfig {
        if let Some(max_history) = self.max_history {
            config.max_history = max_history;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        config
    }
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_line(line: &ReportLine) -> Result<()> {
    println!("{}", serde_json::to_string(line)?);
    Ok(())
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let script: Option<Script> = match &args.script {
        Some(path) => Some(
            serde_json::from_value(read_json(path)?)
                .with_context(|| format!("invalid script {}", path.display()))?,
        ),
        None => None,
    };
    let config =
        args.session_config(script.as_ref().and_then(Script::config).unwrap_or_default());

    info!(world = %args.world.display(), "Starting tileworld tool...");
    let session = EditorSession::load(&read_json(&args.world)?, config)?;
    let mut runner = ScriptRunner::new(session);
    print_line(&runner.loaded())?;

    let actions = script.map(Script::into_actions).unwrap_or_default();
    for line in runner.run(actions) {
        print_line(&line)?;
    }
    Ok(())
}
