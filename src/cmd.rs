//! Command implementations for the CLI interface.
//!
//! This module contains all the command handlers: CRUD over tasks, the
//! timer, manual time-log and output edits, category management, windowed
//! reports and the diagram-text generators. Handlers are thin views over
//! the store; every mutation saves the whole snapshot before returning.

use clap::Subcommand;
use clap_complete::{generate, Shell};

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::aggregate::{category_minutes, task_active_in_window, task_minutes, Dimension};
use crate::db::*;
use crate::diagram::{outline_text, schedule_text};
use crate::fields::*;
use crate::hierarchy::{assign_indexes, collect_ancestors};
use crate::task::{clamp_alias, clamp_completeness, clamp_labels, Task};

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Display alias, at most 10 characters.
        #[arg(long)]
        alias: Option<String>,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Primary category.
        #[arg(long = "main")]
        main_category: Option<String>,
        /// Secondary category.
        #[arg(long = "sub")]
        sub_category: Option<String>,
        /// Estimated start: "YYYY-MM-DD", "YYYY-MM-DD HH:MM", "today".
        #[arg(long)]
        planned_start: Option<String>,
        /// Estimated end.
        #[arg(long)]
        planned_end: Option<String>,
        /// Parent task ID or title.
        #[arg(long)]
        parent: Option<String>,
        /// Free-text label. May be repeated, at most 3 kept.
        #[arg(long = "label")]
        labels: Vec<String>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        reporter: Option<String>,
        /// Status: todo | in-progress | paused | done.
        #[arg(long, value_enum, default_value_t = Status::Todo)]
        status: Status,
    },

    /// List tasks with optional filters.
    List {
        /// Include done tasks.
        #[arg(long)]
        all: bool,
        /// Filter by status.
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Filter by primary category ("Other" matches uncategorised).
        #[arg(long = "main")]
        main_category: Option<String>,
        /// Filter by secondary category.
        #[arg(long = "sub")]
        sub_category: Option<String>,
        /// Filter by label.
        #[arg(long)]
        label: Option<String>,
        /// Only tasks with logged time from this instant.
        #[arg(long)]
        from: Option<String>,
        /// Only tasks with logged time up to this instant.
        #[arg(long)]
        to: Option<String>,
        /// Shorthand for the current ISO week's window.
        #[arg(long)]
        week: bool,
        /// Render as a tree with dotted WBS indexes.
        #[arg(long)]
        tree: bool,
        /// Sort key.
        #[arg(long, value_enum, default_value_t = SortKey::Id)]
        sort: SortKey,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// View a single task by ID or title.
    View {
        /// Task ID or title to view.
        id: String,
    },

    /// Update fields on a task.
    Update {
        /// Task ID or title to update.
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        alias: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long = "main")]
        main_category: Option<String>,
        #[arg(long = "sub")]
        sub_category: Option<String>,
        #[arg(long)]
        planned_start: Option<String>,
        #[arg(long)]
        planned_end: Option<String>,
        /// Parent task ID or title.
        #[arg(long)]
        parent: Option<String>,
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Replace the label set. May be repeated, at most 3 kept.
        #[arg(long = "label")]
        labels: Vec<String>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        reporter: Option<String>,
        /// Clear the parent, making the task a root.
        #[arg(long)]
        clear_parent: bool,
        /// Clear both planned instants.
        #[arg(long)]
        clear_planned: bool,
    },

    /// Delete a task and its whole subtree.
    Delete {
        /// Task ID or title to delete.
        id: String,
    },

    /// Start the timer on a task, pausing whichever task was running.
    Start {
        /// Task ID or title.
        id: String,
    },

    /// Stop the timer on a task. No-op if it isn't running.
    Stop {
        /// Task ID or title.
        id: String,
    },

    /// Edit historical time units.
    Log {
        #[command(subcommand)]
        action: LogAction,
    },

    /// Manage a task's output records.
    Output {
        #[command(subcommand)]
        action: OutputAction,
    },

    /// Manage the category vocabularies.
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },

    /// Minutes per category (or per task) over a time window.
    Report {
        /// Window start instant. Defaults to the current week with --week.
        #[arg(long)]
        from: Option<String>,
        /// Window end instant. Defaults to now.
        #[arg(long)]
        to: Option<String>,
        /// Use the current ISO week's window.
        #[arg(long)]
        week: bool,
        /// Bucket by: main | sub | task.
        #[arg(long, value_enum, default_value_t = ReportDimension::Main)]
        by: ReportDimension,
    },

    /// Outputs of tasks active in a time window.
    Outputs {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        /// Use the current ISO week's window.
        #[arg(long)]
        week: bool,
    },

    /// Print WBS outline text for an external diagram renderer.
    WbsChart {
        /// Filter by status.
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Filter by primary category.
        #[arg(long = "main")]
        main_category: Option<String>,
        /// Filter by label.
        #[arg(long)]
        label: Option<String>,
        /// Write to a file instead of stdout.
        #[arg(long, short)]
        output: Option<String>,
    },

    /// Print Gantt schedule text for an external diagram renderer.
    Gantt {
        #[arg(long, value_enum)]
        status: Option<Status>,
        #[arg(long = "main")]
        main_category: Option<String>,
        #[arg(long)]
        label: Option<String>,
        #[arg(long, short)]
        output: Option<String>,
    },

    /// Export the full store as a backup JSON file.
    Export {
        /// Output file path (default: wbs_backup.json).
        #[arg(long, short)]
        output: Option<String>,
    },

    /// Import a backup JSON file, replacing the store.
    Import {
        /// Input JSON file path.
        input: String,
        /// The file holds categories only; tasks are left untouched.
        #[arg(long)]
        categories: bool,
        /// Skip creating a backup before import.
        #[arg(long)]
        no_backup: bool,
    },

    /// Create a timestamped backup of the store file.
    Backup,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum LogAction {
    /// Record a time unit manually.
    Add {
        /// Task ID or title.
        task: String,
        /// Start instant.
        start: String,
        /// End instant. Omit to leave the unit open.
        end: Option<String>,
    },
    /// Adjust a time unit's bounds.
    Edit {
        /// Task ID or title.
        task: String,
        /// Time unit ID (see `view`).
        unit: u64,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// Reopen the unit by clearing its end.
        #[arg(long)]
        clear_end: bool,
    },
    /// Delete a time unit.
    Rm {
        /// Task ID or title.
        task: String,
        /// Time unit ID.
        unit: u64,
    },
}

#[derive(Subcommand)]
pub enum OutputAction {
    /// Attach an output record to a task.
    Add {
        /// Task ID or title.
        task: String,
        /// Display name of the deliverable.
        name: String,
        #[arg(long)]
        link: Option<String>,
        /// Completion percentage, clamped into 0..=100.
        #[arg(long)]
        completeness: Option<i64>,
    },
    /// Edit an output record.
    Edit {
        /// Task ID or title.
        task: String,
        /// Output record ID (see `view`).
        output: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        link: Option<String>,
        /// Completion percentage, clamped into 0..=100.
        #[arg(long)]
        completeness: Option<i64>,
    },
    /// Delete an output record.
    Rm {
        /// Task ID or title.
        task: String,
        /// Output record ID.
        output: u64,
    },
}

#[derive(Subcommand)]
pub enum CategoryAction {
    /// Add a category name.
    Add {
        #[arg(long, value_enum, default_value_t = CategoryKind::Main)]
        kind: CategoryKind,
        name: String,
    },
    /// Rename a category, updating every task that references it.
    Rename {
        #[arg(long, value_enum, default_value_t = CategoryKind::Main)]
        kind: CategoryKind,
        old: String,
        new: String,
    },
    /// Remove a category from the vocabulary. Tasks keep the old name.
    Rm {
        #[arg(long, value_enum, default_value_t = CategoryKind::Main)]
        kind: CategoryKind,
        name: String,
    },
    /// List both vocabularies.
    List,
}

/// Resolve a task identifier (either ID or title) to a task ID.
/// Returns an error if the title has multiple matches and suggests using ID
/// instead.
pub fn resolve_task_identifier(identifier: &str, db: &Database) -> Result<u64, String> {
    if let Ok(id) = identifier.parse::<u64>() {
        if db.get(id).is_some() {
            return Ok(id);
        } else {
            return Err(format!("Task with ID {} not found", id));
        }
    }

    let matches: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|task| task.title.to_lowercase() == identifier.to_lowercase())
        .collect();

    match matches.len() {
        0 => Err(format!("No task found with title '{}'", identifier)),
        1 => Ok(matches[0].id),
        _ => {
            let mut error_msg = format!("Multiple tasks found with title '{}':\n", identifier);
            for task in matches {
                error_msg.push_str(&format!("  ID {}: {}\n", task.id, task.title));
            }
            error_msg.push_str("Please use the specific ID instead.");
            Err(error_msg)
        }
    }
}

fn resolve_or_exit(identifier: &str, db: &Database) -> u64 {
    match resolve_task_identifier(identifier, db) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error resolving task: {}", e);
            std::process::exit(1);
        }
    }
}

fn parse_instant_or_exit(s: &str) -> i64 {
    match parse_instant(s) {
        Some(ms) => ms,
        None => {
            eprintln!("Unrecognised instant '{s}'. Use YYYY-MM-DD, 'YYYY-MM-DD HH:MM', 'now', 'today' or 'yesterday'.");
            std::process::exit(1);
        }
    }
}

fn save_or_exit(db: &Database, db_path: &Path) {
    if let Err(e) = db.save(db_path) {
        eprintln!("Failed to save DB: {e}");
        std::process::exit(1);
    }
}

/// Resolve a report window from --from/--to/--week.
fn resolve_window(from: Option<String>, to: Option<String>, week: bool, now: i64) -> (i64, i64) {
    if week {
        return this_week_window();
    }
    let start = from.as_deref().map(parse_instant_or_exit).unwrap_or(0);
    let end = to.as_deref().map(parse_instant_or_exit).unwrap_or(now);
    if end < start {
        eprintln!("Window end precedes window start.");
        std::process::exit(1);
    }
    (start, end)
}

/// Add a new task to the database.
#[allow(clippy::too_many_arguments)]
pub fn cmd_add(
    db: &mut Database,
    db_path: &Path,
    title: String,
    alias: Option<String>,
    desc: Option<String>,
    main_category: Option<String>,
    sub_category: Option<String>,
    planned_start: Option<String>,
    planned_end: Option<String>,
    parent: Option<String>,
    labels: Vec<String>,
    assignee: Option<String>,
    reporter: Option<String>,
    status: Status,
) {
    let now = now_ms();
    let parent_id = parent.map(|p| resolve_or_exit(&p, db));
    let planned_start = planned_start.as_deref().map(parse_instant_or_exit);
    let planned_end = planned_end.as_deref().map(parse_instant_or_exit);

    match db.create_task(
        title,
        alias,
        desc,
        main_category,
        sub_category,
        planned_start,
        planned_end,
        parent_id,
        labels,
        assignee,
        reporter,
        status,
        now,
    ) {
        Ok(id) => {
            save_or_exit(db, db_path);
            println!("Added task {}", id);
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

/// Apply the shared list/report filters, preserving store order.
#[allow(clippy::too_many_arguments)]
fn filter_tasks<'a>(
    db: &'a Database,
    all: bool,
    status: Option<Status>,
    main_category: Option<&str>,
    sub_category: Option<&str>,
    label: Option<&str>,
    window: Option<(i64, i64)>,
    now: i64,
) -> Vec<&'a Task> {
    db.tasks
        .iter()
        .filter(|t| {
            if !all && status.is_none() && t.status == Status::Done {
                return false;
            }
            if let Some(s) = status {
                if t.status != s {
                    return false;
                }
            }
            if let Some(m) = main_category {
                if category_label(t.main_category.as_deref()) != m {
                    return false;
                }
            }
            if let Some(s) = sub_category {
                if category_label(t.sub_category.as_deref()) != s {
                    return false;
                }
            }
            if let Some(l) = label {
                if !t.labels.iter().any(|x| x == l) {
                    return false;
                }
            }
            if let Some((start, end)) = window {
                if !task_active_in_window(t, start, end, now) {
                    return false;
                }
            }
            true
        })
        .collect()
}

/// Print tasks in a formatted table with optional WBS indexes.
fn print_table(tasks: &[&Task], indexes: Option<&HashMap<u64, (String, usize)>>) {
    println!(
        "{:<8} {:<5} {:<12} {:<12} {:<12} {:<9} {}",
        "Index", "ID", "Status", "Main", "Sub", "Spent", "Title [labels]"
    );
    for t in tasks {
        let (index, depth) = indexes
            .and_then(|m| m.get(&t.id).cloned())
            .unwrap_or_default();
        let labels = if t.labels.is_empty() {
            String::new()
        } else {
            format!(" [{}]", t.labels.join(","))
        };
        println!(
            "{:<8} {:<5} {:<12} {:<12} {:<12} {:<9} {}{}{}",
            index,
            t.id,
            format_status(t.status),
            truncate(category_label(t.main_category.as_deref()), 12),
            truncate(category_label(t.sub_category.as_deref()), 12),
            format_duration_ms(t.total_time_spent),
            "  ".repeat(depth.saturating_sub(1)),
            t.title,
            labels
        );
    }
}

/// List tasks with optional filtering and sorting.
#[allow(clippy::too_many_arguments)]
pub fn cmd_list(
    db: &Database,
    all: bool,
    status: Option<Status>,
    main_category: Option<String>,
    sub_category: Option<String>,
    label: Option<String>,
    from: Option<String>,
    to: Option<String>,
    week: bool,
    tree: bool,
    sort: SortKey,
    limit: Option<usize>,
) {
    let now = now_ms();
    let window = if week || from.is_some() || to.is_some() {
        Some(resolve_window(from, to, week, now))
    } else {
        None
    };
    let mut filtered = filter_tasks(
        db,
        all,
        status,
        main_category.as_deref(),
        sub_category.as_deref(),
        label.as_deref(),
        window,
        now,
    );

    match sort {
        SortKey::Id => filtered.sort_by_key(|t| t.id),
        SortKey::PlannedStart => {
            filtered.sort_by_key(|t| (t.planned_start.unwrap_or(i64::MAX), t.id))
        }
        SortKey::TimeSpent => {
            filtered.sort_by_key(|t| (std::cmp::Reverse(t.total_time_spent), t.id))
        }
    }

    if let Some(n) = limit {
        filtered.truncate(n);
    }

    if tree {
        let rows = assign_indexes(&filtered);
        let indexes: HashMap<u64, (String, usize)> = rows
            .iter()
            .map(|r| (r.task_id, (r.index.clone(), r.depth)))
            .collect();
        // The indexer drops tasks beyond the depth cap; the table follows.
        let by_id: HashMap<u64, &Task> = filtered.iter().map(|t| (t.id, *t)).collect();
        let ordered: Vec<&Task> = rows.iter().filter_map(|r| by_id.get(&r.task_id).copied()).collect();
        print_table(&ordered, Some(&indexes));
    } else {
        print_table(&filtered, None);
    }
}

/// View detailed information about a specific task.
pub fn cmd_view(db: &Database, id: String) {
    let task_id = resolve_or_exit(&id, db);
    let Some(task) = db.get(task_id) else {
        eprintln!("Task {} not found.", task_id);
        std::process::exit(1);
    };

    println!("ID:            {}", task.id);
    println!("Title:         {}", task.title);
    if let Some(alias) = &task.alias {
        println!("Alias:         {}", alias);
    }
    println!("Status:        {}", format_status(task.status));
    println!("Main category: {}", category_label(task.main_category.as_deref()));
    println!("Sub category:  {}", category_label(task.sub_category.as_deref()));
    println!("Planned:       {} -> {}", opt_instant(task.planned_start), opt_instant(task.planned_end));
    println!("Actual start:  {}", opt_instant(task.actual_start));
    println!("Time spent:    {}", format_duration_ms(task.total_time_spent));
    println!("Parent:        {}", task.parent.map(|p| p.to_string()).unwrap_or_else(|| "-".into()));
    println!("Labels:        {}", if task.labels.is_empty() { "-".into() } else { task.labels.join(",") });
    println!("Assignee:      {}", task.assignee.as_deref().unwrap_or("-"));
    println!("Reporter:      {}", task.reporter.as_deref().unwrap_or("-"));
    println!("Description:\n{}\n", task.description.as_deref().unwrap_or("-"));

    let chain = collect_ancestors(task_id, &db.tasks);
    if !chain.is_empty() {
        println!(
            "Ancestors (closest first): {}",
            chain.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(" -> ")
        );
    }
    let children = db.children(task_id);
    if !children.is_empty() {
        println!("Children:");
        for c in children {
            println!("  - {} [{}] (#{})", c.title, format_status(c.status), c.id);
        }
    }

    if !task.time_units.is_empty() {
        println!("Time units:");
        for u in &task.time_units {
            let end = u.end.map(format_instant).unwrap_or_else(|| "(open)".into());
            println!("  #{:<4} {} -> {}", u.id, format_instant(u.start), end);
        }
    }
    if !task.outputs.is_empty() {
        println!("Outputs:");
        for o in &task.outputs {
            let pct = o.completeness.map(|c| format!("{c}%")).unwrap_or_else(|| "-".into());
            let link = o.link.as_deref().unwrap_or("-");
            println!("  #{:<4} {:<24} {:<5} {}", o.id, truncate(&o.name, 24), pct, link);
        }
    }
}

fn opt_instant(ms: Option<i64>) -> String {
    ms.map(format_instant).unwrap_or_else(|| "-".into())
}

/// Update an existing task's fields.
#[allow(clippy::too_many_arguments)]
pub fn cmd_update(
    db: &mut Database,
    db_path: &Path,
    id: String,
    title: Option<String>,
    alias: Option<String>,
    desc: Option<String>,
    main_category: Option<String>,
    sub_category: Option<String>,
    planned_start: Option<String>,
    planned_end: Option<String>,
    parent: Option<String>,
    status: Option<Status>,
    labels: Vec<String>,
    assignee: Option<String>,
    reporter: Option<String>,
    clear_parent: bool,
    clear_planned: bool,
) {
    let now = now_ms();
    let task_id = resolve_or_exit(&id, db);

    let parent_id = parent.map(|p| resolve_or_exit(&p, db));
    if let Some(pid) = parent_id {
        if let Err(e) = db.check_parent(Some(task_id), pid) {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
    let planned_start = planned_start.as_deref().map(parse_instant_or_exit);
    let planned_end = planned_end.as_deref().map(parse_instant_or_exit);

    let Some(t) = db.get_mut(task_id) else {
        eprintln!("Task {} not found.", task_id);
        std::process::exit(1);
    };
    if let Some(s) = title {
        t.title = s;
    }
    if let Some(a) = alias {
        t.alias = clamp_alias(Some(a));
    }
    if let Some(d) = desc {
        t.description = if d.is_empty() { None } else { Some(d) };
    }
    if let Some(m) = main_category {
        t.main_category = normalize_category(Some(m));
    }
    if let Some(s) = sub_category {
        t.sub_category = normalize_category(Some(s));
    }
    if clear_planned {
        t.planned_start = None;
        t.planned_end = None;
    }
    if planned_start.is_some() {
        t.planned_start = planned_start;
    }
    if planned_end.is_some() {
        t.planned_end = planned_end;
    }
    if clear_parent {
        t.parent = None;
    }
    if let Some(pid) = parent_id {
        t.parent = Some(pid);
    }
    if let Some(s) = status {
        t.status = s;
    }
    if !labels.is_empty() {
        t.labels = clamp_labels(labels);
    }
    if let Some(a) = assignee {
        t.assignee = if a.is_empty() { None } else { Some(a) };
    }
    if let Some(r) = reporter {
        t.reporter = if r.is_empty() { None } else { Some(r) };
    }
    t.updated_at_ms = now;

    save_or_exit(db, db_path);
    println!("Updated task {}", task_id);
}

/// Delete a task together with its subtree.
pub fn cmd_delete(db: &mut Database, db_path: &Path, id: String) {
    let task_id = resolve_or_exit(&id, db);
    match db.delete_task(task_id) {
        Ok(removed) => {
            save_or_exit(db, db_path);
            println!("Deleted {} task(s)", removed.len());
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

/// Start the timer on a task.
pub fn cmd_start(db: &mut Database, db_path: &Path, id: String) {
    let now = now_ms();
    let task_id = resolve_or_exit(&id, db);
    let previous = db.running_task().filter(|&r| r != task_id);
    if let Err(e) = db.start_timer(task_id, now) {
        eprintln!("{e}");
        std::process::exit(1);
    }
    save_or_exit(db, db_path);
    if let Some(prev) = previous {
        let title = db.get(prev).map(|t| t.title.clone()).unwrap_or_default();
        println!("Paused task {} ({})", prev, title);
    }
    println!("Timer running on task {}", task_id);
}

/// Stop the timer on a task.
pub fn cmd_stop(db: &mut Database, db_path: &Path, id: String) {
    let now = now_ms();
    let task_id = resolve_or_exit(&id, db);
    let was_running = db.get(task_id).and_then(|t| t.open_unit()).is_some();
    if let Err(e) = db.stop_timer(task_id, now) {
        eprintln!("{e}");
        std::process::exit(1);
    }
    save_or_exit(db, db_path);
    if was_running {
        let spent = db.get(task_id).map(|t| t.total_time_spent).unwrap_or(0);
        println!("Paused task {} ({} total)", task_id, format_duration_ms(spent));
    } else {
        println!("Task {} has no running timer.", task_id);
    }
}

/// Manual time-unit edits.
pub fn cmd_log(db: &mut Database, db_path: &Path, action: LogAction) {
    let now = now_ms();
    let result = match action {
        LogAction::Add { task, start, end } => {
            let task_id = resolve_or_exit(&task, db);
            let start = parse_instant_or_exit(&start);
            let end = end.as_deref().map(parse_instant_or_exit);
            db.add_time_unit(task_id, start, end, now).map(|unit_id| {
                format!("Added time unit {} to task {}", unit_id, task_id)
            })
        }
        LogAction::Edit {
            task,
            unit,
            start,
            end,
            clear_end,
        } => {
            let task_id = resolve_or_exit(&task, db);
            let start = start.as_deref().map(parse_instant_or_exit);
            let end = if clear_end {
                Some(None)
            } else {
                end.as_deref().map(|e| Some(parse_instant_or_exit(e)))
            };
            db.update_time_unit(task_id, unit, start, end, now)
                .map(|_| format!("Updated time unit {} on task {}", unit, task_id))
        }
        LogAction::Rm { task, unit } => {
            let task_id = resolve_or_exit(&task, db);
            db.delete_time_unit(task_id, unit, now)
                .map(|_| format!("Deleted time unit {} from task {}", unit, task_id))
        }
    };
    match result {
        Ok(msg) => {
            save_or_exit(db, db_path);
            println!("{msg}");
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

/// Output record edits.
pub fn cmd_output(db: &mut Database, db_path: &Path, action: OutputAction) {
    let now = now_ms();
    let result = match action {
        OutputAction::Add {
            task,
            name,
            link,
            completeness,
        } => {
            let task_id = resolve_or_exit(&task, db);
            db.add_output(task_id, name, link, clamp_completeness(completeness), now)
                .map(|id| format!("Added output {} to task {}", id, task_id))
        }
        OutputAction::Edit {
            task,
            output,
            name,
            link,
            completeness,
        } => {
            let task_id = resolve_or_exit(&task, db);
            let link = link.map(|l| if l.is_empty() { None } else { Some(l) });
            let completeness = completeness.map(|c| clamp_completeness(Some(c)));
            db.update_output(task_id, output, name, link, completeness, now)
                .map(|_| format!("Updated output {} on task {}", output, task_id))
        }
        OutputAction::Rm { task, output } => {
            let task_id = resolve_or_exit(&task, db);
            db.delete_output(task_id, output, now)
                .map(|_| format!("Deleted output {} from task {}", output, task_id))
        }
    };
    match result {
        Ok(msg) => {
            save_or_exit(db, db_path);
            println!("{msg}");
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

/// Category vocabulary management.
pub fn cmd_category(db: &mut Database, db_path: &Path, action: CategoryAction) {
    let now = now_ms();
    let result = match action {
        CategoryAction::Add { kind, name } => db
            .add_category(kind, &name)
            .map(|_| format!("Added category '{name}'")),
        CategoryAction::Rename { kind, old, new } => {
            db.rename_category(kind, &old, &new, now).map(|touched| {
                format!("Renamed '{old}' to '{new}' ({touched} task(s) updated)")
            })
        }
        CategoryAction::Rm { kind, name } => db
            .delete_category(kind, &name)
            .map(|_| format!("Removed category '{name}'")),
        CategoryAction::List => {
            println!("Main categories: {}", db.vocabulary(CategoryKind::Main).join(", "));
            println!("Sub categories:  {}", db.vocabulary(CategoryKind::Sub).join(", "));
            return;
        }
    };
    match result {
        Ok(msg) => {
            save_or_exit(db, db_path);
            println!("{msg}");
        }
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

/// Windowed minute totals per category or per task.
pub fn cmd_report(
    db: &Database,
    from: Option<String>,
    to: Option<String>,
    week: bool,
    by: ReportDimension,
) {
    let now = now_ms();
    let (start, end) = resolve_window(from, to, week, now);
    let tasks: Vec<&Task> = db.tasks.iter().collect();
    println!(
        "Window: {} -> {}",
        format_instant(start),
        format_instant(end)
    );
    match by {
        ReportDimension::Main | ReportDimension::Sub => {
            let dimension = match by {
                ReportDimension::Main => Dimension::Main,
                _ => Dimension::Sub,
            };
            let totals = category_minutes(&tasks, dimension, start, end, now);
            if totals.is_empty() {
                println!("No time logged in this window.");
                return;
            }
            println!("{:<20} {:>8}", "Category", "Minutes");
            for (name, minutes) in totals {
                println!("{:<20} {:>8}", truncate(&name, 20), minutes);
            }
        }
        ReportDimension::Task => {
            let totals = task_minutes(&tasks, start, end, now);
            if totals.is_empty() {
                println!("No time logged in this window.");
                return;
            }
            println!("{:<5} {:<30} {:>8}", "ID", "Title", "Minutes");
            for (id, minutes) in totals {
                let title = db.get(id).map(|t| t.title.as_str()).unwrap_or("-");
                println!("{:<5} {:<30} {:>8}", id, truncate(title, 30), minutes);
            }
        }
    }
}

/// Weekly output tracking: outputs of tasks active in the window.
pub fn cmd_outputs(db: &Database, from: Option<String>, to: Option<String>, week: bool) {
    let now = now_ms();
    let (start, end) = resolve_window(from, to, week, now);
    println!(
        "Window: {} -> {}",
        format_instant(start),
        format_instant(end)
    );
    let mut any = false;
    for task in &db.tasks {
        if !task_active_in_window(task, start, end, now) || task.outputs.is_empty() {
            continue;
        }
        any = true;
        println!("{} (#{})", task.title, task.id);
        for o in &task.outputs {
            let pct = o.completeness.map(|c| format!("{c}%")).unwrap_or_else(|| "-".into());
            let link = o.link.as_deref().unwrap_or("-");
            println!("  {:<24} {:<5} {}", truncate(&o.name, 24), pct, link);
        }
    }
    if !any {
        println!("No outputs on tasks active in this window.");
    }
}

fn write_or_print(text: &str, output: Option<String>) {
    match output {
        Some(path) => match fs::write(&path, text) {
            Ok(_) => println!("Wrote {}", path),
            Err(e) => {
                eprintln!("Failed to write {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => print!("{text}"),
    }
}

/// Emit WBS outline text.
pub fn cmd_wbs_chart(
    db: &Database,
    status: Option<Status>,
    main_category: Option<String>,
    label: Option<String>,
    output: Option<String>,
) {
    let now = now_ms();
    let filtered = filter_tasks(
        db,
        true,
        status,
        main_category.as_deref(),
        None,
        label.as_deref(),
        None,
        now,
    );
    write_or_print(&outline_text(&filtered), output);
}

/// Emit Gantt schedule text.
pub fn cmd_gantt(
    db: &Database,
    status: Option<Status>,
    main_category: Option<String>,
    label: Option<String>,
    output: Option<String>,
) {
    let now = now_ms();
    let filtered = filter_tasks(
        db,
        true,
        status,
        main_category.as_deref(),
        None,
        label.as_deref(),
        None,
        now,
    );
    write_or_print(&schedule_text(&filtered, now), output);
}

/// Export the full store as backup JSON.
pub fn cmd_export(db: &Database, output: Option<String>) {
    let output_path = output.unwrap_or_else(|| "wbs_backup.json".to_string());
    let data = serde_json::to_string_pretty(db).expect("store snapshot is serializable");
    match fs::write(&output_path, data) {
        Ok(_) => println!(
            "Exported {} task(s) to {}",
            db.tasks.len(),
            output_path
        ),
        Err(e) => {
            eprintln!("Failed to write backup file: {}", e);
            std::process::exit(1);
        }
    }
}

/// Create a timestamped backup of the store file.
pub fn create_backup(db_path: &Path) -> Result<String, std::io::Error> {
    if !db_path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Store file does not exist",
        ));
    }

    let parent_dir = db_path.parent().unwrap_or_else(|| Path::new("."));
    let backup_dir = parent_dir.join("backup");
    fs::create_dir_all(&backup_dir)?;

    let timestamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    let db_filename = db_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("tasks.json");
    let backup_path = backup_dir.join(format!("{}_{}", timestamp, db_filename));
    fs::copy(db_path, &backup_path)?;
    Ok(backup_path.to_string_lossy().to_string())
}

/// Import a backup file, replacing the store (or just the vocabularies).
pub fn cmd_import(
    db: &mut Database,
    db_path: &Path,
    input: String,
    categories: bool,
    no_backup: bool,
) {
    if !no_backup {
        match create_backup(db_path) {
            Ok(backup_path) => println!("Created backup: {}", backup_path),
            Err(e) => eprintln!("Warning: failed to create backup: {}", e),
        }
    }

    let raw = match fs::read_to_string(&input) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Failed to read '{}': {}", input, e);
            std::process::exit(1);
        }
    };

    // Shape validation happens here, at the boundary: a decode failure
    // leaves the in-memory store untouched.
    if categories {
        match serde_json::from_str::<CategoryBundle>(&raw) {
            Ok(bundle) => {
                db.import_categories(bundle);
                save_or_exit(db, db_path);
                println!(
                    "Imported {} main and {} sub categories",
                    db.main_categories.len(),
                    db.sub_categories.len()
                );
            }
            Err(e) => {
                eprintln!("Invalid category file: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        match serde_json::from_str::<Database>(&raw) {
            Ok(imported) => {
                *db = imported;
                save_or_exit(db, db_path);
                println!("Imported {} task(s)", db.tasks.len());
            }
            Err(e) => {
                eprintln!("Invalid backup file: {}", e);
                std::process::exit(1);
            }
        }
    }
}

/// Create a timestamped backup of the current store.
pub fn cmd_backup(db_path: &Path) {
    match create_backup(db_path) {
        Ok(backup_path) => println!("Created backup: {}", backup_path),
        Err(e) => {
            eprintln!("Failed to create backup: {}", e);
            std::process::exit(1);
        }
    }
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    let mut cmd = crate::cli::Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
}

/// Format a task status for display.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::Todo => "Todo",
        Status::InProgress => "InProgress",
        Status::Paused => "Paused",
        Status::Done => "Done",
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}
