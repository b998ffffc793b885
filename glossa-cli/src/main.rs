//! Glossa CLI - replay annotation authoring sessions
//!
//! Host notifications are printed to stdout as JSON lines; logs go to stderr.

mod io;
mod session;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use session::Session;

#[derive(Parser)]
#[command(
    name = "glossa",
    version,
    about = "Replay annotation authoring sessions"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a session script and print every host notification
    Replay {
        /// JSON array of steps
        script: PathBuf,
        /// Controller configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Where to write the final annotations (default ~/.glossa/session.json)
        #[arg(long)]
        export: Option<PathBuf>,
        /// Only commit highlight rendering on explicit `commit` steps
        #[arg(long)]
        manual_frames: bool,
    },
    /// Parse a session script without running it
    Check {
        script: PathBuf,
    },
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,glossa_core=info,glossa=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            script,
            config,
            export,
            manual_frames,
        } => replay(script, config, export, manual_frames),
        Commands::Check { script } => {
            let steps = io::load_script(&script)?;
            println!("{}: {} steps", script.display(), steps.len());
            Ok(())
        }
    }
}

fn replay(
    script: PathBuf,
    config: Option<PathBuf>,
    export: Option<PathBuf>,
    manual_frames: bool,
) -> Result<()> {
    let config = io::load_config(config.as_deref())?;
    let steps = io::load_script(&script)?;
    let mut session = Session::new(&config, manual_frames);

    for (i, step) in steps.into_iter().enumerate() {
        let events = session
            .apply(step)
            .with_context(|| format!("Step {} failed", i + 1))?;
        for event in events {
            println!("{}", serde_json::to_string(&event)?);
        }
    }

    if !session.is_settled() {
        info!("session ended with work waiting for a visual commit");
    }

    let summary = io::SessionExport::new(session.mode(), session.annotations());
    let path = io::export_session(&summary, export.as_deref())?;
    info!(path = %path.display(), annotations = summary.annotations.len(), "exported");

    Ok(())
}
