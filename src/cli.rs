use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Simple, file-backed WBS task list and time tracker.
/// Storage defaults to ~/.wbs/tasks.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "wbs", version, about = "Personal WBS task and time tracking CLI")]
pub struct Cli {
    /// Path to the JSON store file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
