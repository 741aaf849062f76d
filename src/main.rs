//! # WBS - Personal task and time tracking CLI
//!
//! A command-line work-breakdown-structure task list with a time-logging
//! timer and derived reports.
//!
//! ## Key Features
//!
//! - **Hierarchical Task Organisation**: dotted WBS indexes ("1.2.3") over
//!   a parent/child tree, up to 5 levels deep
//! - **One-Timer Time Logging**: starting a task automatically pauses
//!   whichever task was running, so at most one timer runs at a time
//! - **Two Category Dimensions**: every task carries an independent main
//!   and sub category; both vocabularies are editable with rename cascade
//! - **Windowed Reports**: per-category and per-task minute totals over an
//!   arbitrary window or the current ISO week, plus output tracking
//! - **Diagram Text Generation**: WBS outline and Gantt schedule source
//!   for an external renderer
//! - **Local File Storage**: one JSON document with export/import and
//!   timestamped backups
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a task and a child under it
//! wbs add "Thesis" --main Study
//! wbs add "Literature review" --parent Thesis --main Study --sub Reading
//!
//! # Track time
//! wbs start "Literature review"
//! wbs stop "Literature review"
//!
//! # See the tree and the week's totals
//! wbs list --tree
//! wbs report --week
//!
//! # Generate diagram source
//! wbs gantt
//! ```
//!
//! Data is stored locally in `~/.wbs/tasks.json`. We recommend you source
//! control this folder via `git init` and back it up periodically.

use std::path::PathBuf;

use clap::Parser;

pub mod aggregate;
pub mod cli;
pub mod cmd;
pub mod db;
pub mod diagram;
pub mod fields;
pub mod hierarchy;
pub mod task;

use cli::Cli;
use cmd::*;
use db::Database;

fn main() {
    let cli = Cli::parse();

    let db_path = cli.db.unwrap_or_else(|| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        let wbs_dir = PathBuf::from(home).join(".wbs");
        if let Err(e) = std::fs::create_dir_all(&wbs_dir) {
            eprintln!("Failed to create wbs directory {}: {}", wbs_dir.display(), e);
            std::process::exit(1);
        }
        wbs_dir.join("tasks.json")
    });

    // Completions don't need the store at all.
    if let Commands::Completions { shell } = &cli.command {
        cmd_completions(*shell);
        return;
    }

    let mut db = Database::load(&db_path);

    match cli.command {
        Commands::Completions { .. } => unreachable!("completions handled above"),
        Commands::Add {
            title, alias, desc, main_category, sub_category, planned_start,
            planned_end, parent, labels, assignee, reporter, status,
        } => cmd_add(&mut db, &db_path, title, alias, desc, main_category,
                     sub_category, planned_start, planned_end, parent, labels,
                     assignee, reporter, status),

        Commands::List { all, status, main_category, sub_category, label,
                         from, to, week, tree, sort, limit } =>
            cmd_list(&db, all, status, main_category, sub_category, label,
                     from, to, week, tree, sort, limit),

        Commands::View { id } => cmd_view(&db, id),

        Commands::Update { id, title, alias, desc, main_category, sub_category,
                           planned_start, planned_end, parent, status, labels,
                           assignee, reporter, clear_parent, clear_planned } =>
            cmd_update(&mut db, &db_path, id, title, alias, desc, main_category,
                       sub_category, planned_start, planned_end, parent, status,
                       labels, assignee, reporter, clear_parent, clear_planned),

        Commands::Delete { id } => cmd_delete(&mut db, &db_path, id),

        Commands::Start { id } => cmd_start(&mut db, &db_path, id),

        Commands::Stop { id } => cmd_stop(&mut db, &db_path, id),

        Commands::Log { action } => cmd_log(&mut db, &db_path, action),

        Commands::Output { action } => cmd_output(&mut db, &db_path, action),

        Commands::Category { action } => cmd_category(&mut db, &db_path, action),

        Commands::Report { from, to, week, by } => cmd_report(&db, from, to, week, by),

        Commands::Outputs { from, to, week } => cmd_outputs(&db, from, to, week),

        Commands::WbsChart { status, main_category, label, output } =>
            cmd_wbs_chart(&db, status, main_category, label, output),

        Commands::Gantt { status, main_category, label, output } =>
            cmd_gantt(&db, status, main_category, label, output),

        Commands::Export { output } => cmd_export(&db, output),

        Commands::Import { input, categories, no_backup } =>
            cmd_import(&mut db, &db_path, input, categories, no_backup),

        Commands::Backup => cmd_backup(&db_path),
    }
}
