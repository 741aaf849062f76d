//! Database operations and utility functions for task management.
//!
//! This module provides the `Database` struct holding the task list and the
//! two category vocabularies, the timer state machine that writes time
//! units, and utility functions for instant parsing and formatting.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::{CategoryKind, Status};
use crate::hierarchy::{build_children_map, collect_descendants, depth_of, MAX_DEPTH};
use crate::task::{clamp_alias, clamp_labels, OutputRecord, Task, TimeUnit};

/// Seed vocabulary for the primary category dimension.
pub const DEFAULT_MAIN_CATEGORIES: &[&str] = &["Work", "Study", "Life"];

/// Seed vocabulary for the secondary category dimension.
pub const DEFAULT_SUB_CATEGORIES: &[&str] = &["Development", "Meeting", "Reading", "Chore"];

/// In-memory store for tasks and category vocabularies.
///
/// The task list is a flat arena; parent/child relations are resolved by id
/// lookup at traversal time. Every mutating command persists the whole
/// snapshot right after the in-memory update.
#[derive(Debug, Serialize, Deserialize)]
pub struct Database {
    pub tasks: Vec<Task>,
    #[serde(rename = "mainCategories", default)]
    pub main_categories: Vec<String>,
    #[serde(rename = "subCategories", default)]
    pub sub_categories: Vec<String>,
}

impl Default for Database {
    fn default() -> Self {
        Database {
            tasks: Vec::new(),
            main_categories: DEFAULT_MAIN_CATEGORIES.iter().map(|s| s.to_string()).collect(),
            sub_categories: DEFAULT_SUB_CATEGORIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Category-only import/export payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryBundle {
    #[serde(rename = "mainCategories")]
    pub main_categories: Vec<String>,
    #[serde(rename = "subCategories", default)]
    pub sub_categories: Vec<String>,
}

impl Database {
    /// Load database from JSON file, creating a new seeded database if the
    /// file doesn't exist.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Database::default();
        }
        let mut buf = String::new();
        match File::open(path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str(&buf) {
                Ok(db) => db,
                Err(e) => {
                    eprintln!("Error parsing DB, starting fresh: {e}");
                    Database::default()
                }
            },
            Err(e) => {
                eprintln!("Error reading DB, starting fresh: {e}");
                Database::default()
            }
        }
    }

    /// Save database to JSON file using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp)?;
        let data = serde_json::to_string_pretty(self).expect("store snapshot is serializable");
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }

    /// Generate the next available task ID.
    pub fn next_id(&self) -> u64 {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    /// Next available time-unit ID, unique across the whole store.
    pub fn next_unit_id(&self) -> u64 {
        self.tasks
            .iter()
            .flat_map(|t| t.time_units.iter().map(|u| u.id))
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Next available output-record ID, unique across the whole store.
    pub fn next_output_id(&self) -> u64 {
        self.tasks
            .iter()
            .flat_map(|t| t.outputs.iter().map(|o| o.id))
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Get a task by ID.
    pub fn get(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Get a mutable reference to a task by ID.
    pub fn get_mut(&mut self, id: u64) -> Option<&mut Task> {
        let idx = self.tasks.iter().position(|t| t.id == id)?;
        self.tasks.get_mut(idx)
    }

    /// Direct children of `parent_id`, in store order.
    pub fn children(&self, parent_id: u64) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.parent == Some(parent_id))
            .collect()
    }

    /// Validate that `parent` is usable as the parent of `child_id`: it must
    /// exist, not be the child itself, not sit below it (cycle), and not
    /// push the child past the depth cap.
    pub fn check_parent(&self, child_id: Option<u64>, parent: u64) -> Result<(), String> {
        if Some(parent) == child_id {
            return Err("Parent cannot equal child.".into());
        }
        if self.get(parent).is_none() {
            return Err(format!("Parent task {parent} does not exist."));
        }
        if let Some(child) = child_id {
            let mut cur = Some(parent);
            let mut hops = 0;
            while let Some(p) = cur {
                if p == child {
                    return Err("Setting parent would create a cycle.".into());
                }
                cur = self.get(p).and_then(|t| t.parent);
                hops += 1;
                if hops > self.tasks.len() {
                    break;
                }
            }
        }
        if depth_of(parent, &self.tasks) >= MAX_DEPTH {
            return Err(format!("Maximum nesting depth is {MAX_DEPTH} levels."));
        }
        Ok(())
    }

    /// Insert a new task, assigning its id. Logs, outputs and labels start
    /// empty; the elapsed total starts at zero.
    #[allow(clippy::too_many_arguments)]
    pub fn create_task(
        &mut self,
        title: String,
        alias: Option<String>,
        description: Option<String>,
        main_category: Option<String>,
        sub_category: Option<String>,
        planned_start: Option<i64>,
        planned_end: Option<i64>,
        parent: Option<u64>,
        labels: Vec<String>,
        assignee: Option<String>,
        reporter: Option<String>,
        status: Status,
        now_ms: i64,
    ) -> Result<u64, String> {
        if let Some(p) = parent {
            self.check_parent(None, p)?;
        }
        let id = self.next_id();
        self.tasks.push(Task {
            id,
            title,
            alias: clamp_alias(alias),
            description,
            main_category: normalize_category(main_category),
            sub_category: normalize_category(sub_category),
            planned_start,
            planned_end,
            actual_start: None,
            status,
            time_units: Vec::new(),
            total_time_spent: 0,
            parent,
            outputs: Vec::new(),
            labels: clamp_labels(labels),
            assignee,
            reporter,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        });
        Ok(id)
    }

    /// Remove a task together with its whole subtree.
    ///
    /// Returns the removed ids. Unknown ids are an error so callers can
    /// report them; the store is left untouched in that case.
    pub fn delete_task(&mut self, id: u64) -> Result<HashSet<u64>, String> {
        if self.get(id).is_none() {
            return Err(format!("Task {id} not found."));
        }
        let child_map = build_children_map(&self.tasks);
        let mut doomed = HashSet::new();
        doomed.insert(id);
        collect_descendants(id, &child_map, &mut doomed);
        self.tasks.retain(|t| !doomed.contains(&t.id));
        Ok(doomed)
    }

    // ---- timer state machine -------------------------------------------

    /// The task currently being timed, if any.
    pub fn running_task(&self) -> Option<u64> {
        self.tasks
            .iter()
            .find(|t| t.open_unit().is_some())
            .map(|t| t.id)
    }

    /// Start the timer on `id` at `now_ms`.
    ///
    /// Whichever task was running first has its open unit closed at the
    /// same instant and is set to `Paused`. This includes the target itself,
    /// in which case a zero-duration unit is closed and a fresh one opened.
    /// The target records its first-ever start in `actual_start`, gains an
    /// open unit and becomes `InProgress`.
    pub fn start_timer(&mut self, id: u64, now_ms: i64) -> Result<(), String> {
        if self.get(id).is_none() {
            return Err(format!("Task {id} not found."));
        }
        if let Some(running) = self.running_task() {
            self.close_open_unit(running, now_ms);
        }
        let unit_id = self.next_unit_id();
        let task = self.get_mut(id).expect("presence checked above");
        if task.actual_start.is_none() {
            task.actual_start = Some(now_ms);
        }
        task.time_units.push(TimeUnit {
            id: unit_id,
            start: now_ms,
            end: None,
        });
        task.total_time_spent = recompute_total(&task.time_units);
        task.status = Status::InProgress;
        task.updated_at_ms = now_ms;
        Ok(())
    }

    /// Stop the timer on `id` at `now_ms`.
    ///
    /// Silent no-op when the task has no open unit; the status is left
    /// alone in that case.
    pub fn stop_timer(&mut self, id: u64, now_ms: i64) -> Result<(), String> {
        if self.get(id).is_none() {
            return Err(format!("Task {id} not found."));
        }
        if self.get(id).and_then(|t| t.open_unit()).is_some() {
            self.close_open_unit(id, now_ms);
        }
        Ok(())
    }

    /// Close `id`'s open unit at `now_ms`, recompute its total and pause it.
    fn close_open_unit(&mut self, id: u64, now_ms: i64) {
        if let Some(task) = self.get_mut(id) {
            if let Some(unit) = task.time_units.iter_mut().find(|u| u.is_open()) {
                unit.end = Some(now_ms.max(unit.start));
            }
            task.total_time_spent = recompute_total(&task.time_units);
            task.status = Status::Paused;
            task.updated_at_ms = now_ms;
        }
    }

    // ---- manual time-unit edits ----------------------------------------

    /// Record a historical time unit on `task_id`.
    pub fn add_time_unit(
        &mut self,
        task_id: u64,
        start: i64,
        end: Option<i64>,
        now_ms: i64,
    ) -> Result<u64, String> {
        check_unit_bounds(start, end)?;
        let unit_id = self.next_unit_id();
        let task = self
            .get_mut(task_id)
            .ok_or_else(|| format!("Task {task_id} not found."))?;
        task.time_units.push(TimeUnit {
            id: unit_id,
            start,
            end,
        });
        task.total_time_spent = recompute_total(&task.time_units);
        task.updated_at_ms = now_ms;
        Ok(unit_id)
    }

    /// Adjust the bounds of an existing time unit.
    pub fn update_time_unit(
        &mut self,
        task_id: u64,
        unit_id: u64,
        start: Option<i64>,
        end: Option<Option<i64>>,
        now_ms: i64,
    ) -> Result<(), String> {
        let task = self
            .get_mut(task_id)
            .ok_or_else(|| format!("Task {task_id} not found."))?;
        let unit = task
            .time_units
            .iter_mut()
            .find(|u| u.id == unit_id)
            .ok_or_else(|| format!("Time unit {unit_id} not found on task {task_id}."))?;
        let new_start = start.unwrap_or(unit.start);
        let new_end = end.unwrap_or(unit.end);
        check_unit_bounds(new_start, new_end)?;
        unit.start = new_start;
        unit.end = new_end;
        task.total_time_spent = recompute_total(&task.time_units);
        task.updated_at_ms = now_ms;
        Ok(())
    }

    /// Delete a time unit outright.
    pub fn delete_time_unit(&mut self, task_id: u64, unit_id: u64, now_ms: i64) -> Result<(), String> {
        let task = self
            .get_mut(task_id)
            .ok_or_else(|| format!("Task {task_id} not found."))?;
        let before = task.time_units.len();
        task.time_units.retain(|u| u.id != unit_id);
        if task.time_units.len() == before {
            return Err(format!("Time unit {unit_id} not found on task {task_id}."));
        }
        task.total_time_spent = recompute_total(&task.time_units);
        task.updated_at_ms = now_ms;
        Ok(())
    }

    // ---- output records ------------------------------------------------

    pub fn add_output(
        &mut self,
        task_id: u64,
        name: String,
        link: Option<String>,
        completeness: Option<u8>,
        now_ms: i64,
    ) -> Result<u64, String> {
        let output_id = self.next_output_id();
        let task = self
            .get_mut(task_id)
            .ok_or_else(|| format!("Task {task_id} not found."))?;
        task.outputs.push(OutputRecord {
            id: output_id,
            name,
            link,
            completeness,
        });
        task.updated_at_ms = now_ms;
        Ok(output_id)
    }

    /// Merge the given fields into an output record.
    pub fn update_output(
        &mut self,
        task_id: u64,
        output_id: u64,
        name: Option<String>,
        link: Option<Option<String>>,
        completeness: Option<Option<u8>>,
        now_ms: i64,
    ) -> Result<(), String> {
        let task = self
            .get_mut(task_id)
            .ok_or_else(|| format!("Task {task_id} not found."))?;
        let output = task
            .outputs
            .iter_mut()
            .find(|o| o.id == output_id)
            .ok_or_else(|| format!("Output {output_id} not found on task {task_id}."))?;
        if let Some(n) = name {
            output.name = n;
        }
        if let Some(l) = link {
            output.link = l;
        }
        if let Some(c) = completeness {
            output.completeness = c;
        }
        task.updated_at_ms = now_ms;
        Ok(())
    }

    pub fn delete_output(&mut self, task_id: u64, output_id: u64, now_ms: i64) -> Result<(), String> {
        let task = self
            .get_mut(task_id)
            .ok_or_else(|| format!("Task {task_id} not found."))?;
        let before = task.outputs.len();
        task.outputs.retain(|o| o.id != output_id);
        if task.outputs.len() == before {
            return Err(format!("Output {output_id} not found on task {task_id}."));
        }
        task.updated_at_ms = now_ms;
        Ok(())
    }

    // ---- category vocabularies -----------------------------------------

    fn vocabulary_mut(&mut self, kind: CategoryKind) -> &mut Vec<String> {
        match kind {
            CategoryKind::Main => &mut self.main_categories,
            CategoryKind::Sub => &mut self.sub_categories,
        }
    }

    pub fn vocabulary(&self, kind: CategoryKind) -> &[String] {
        match kind {
            CategoryKind::Main => &self.main_categories,
            CategoryKind::Sub => &self.sub_categories,
        }
    }

    /// Append a category name, de-duplicating against the existing set.
    pub fn add_category(&mut self, kind: CategoryKind, name: &str) -> Result<(), String> {
        let name = name.trim();
        if name.is_empty() {
            return Err("Category name cannot be empty.".into());
        }
        let vocab = self.vocabulary_mut(kind);
        if vocab.iter().any(|c| c == name) {
            return Err(format!("Category '{name}' already exists."));
        }
        vocab.push(name.to_string());
        Ok(())
    }

    /// Rename a category, cascading to every task referencing the old name.
    pub fn rename_category(
        &mut self,
        kind: CategoryKind,
        old: &str,
        new: &str,
        now_ms: i64,
    ) -> Result<usize, String> {
        let new = new.trim();
        if new.is_empty() {
            return Err("Category name cannot be empty.".into());
        }
        let vocab = self.vocabulary_mut(kind);
        let Some(slot) = vocab.iter_mut().find(|c| c.as_str() == old) else {
            return Err(format!("Category '{old}' not found."));
        };
        *slot = new.to_string();
        let mut touched = 0;
        for task in self.tasks.iter_mut() {
            let field = match kind {
                CategoryKind::Main => &mut task.main_category,
                CategoryKind::Sub => &mut task.sub_category,
            };
            if field.as_deref() == Some(old) {
                *field = Some(new.to_string());
                task.updated_at_ms = now_ms;
                touched += 1;
            }
        }
        Ok(touched)
    }

    /// Remove a category from the vocabulary only. Tasks keep the orphaned
    /// name; a category missing from the vocabulary is not rewritten.
    pub fn delete_category(&mut self, kind: CategoryKind, name: &str) -> Result<(), String> {
        let vocab = self.vocabulary_mut(kind);
        let before = vocab.len();
        vocab.retain(|c| c != name);
        if vocab.len() == before {
            return Err(format!("Category '{name}' not found."));
        }
        Ok(())
    }

    // ---- wholesale import ----------------------------------------------

    /// Replace both vocabularies from a category-only backup.
    pub fn import_categories(&mut self, bundle: CategoryBundle) {
        self.main_categories = bundle.main_categories;
        self.sub_categories = bundle.sub_categories;
    }
}

/// Recompute a task's elapsed total from its unit list.
///
/// Open units contribute zero until closed; a unit whose end sits before
/// its start is clamped rather than subtracting from the total.
pub fn recompute_total(units: &[TimeUnit]) -> i64 {
    units.iter().map(|u| u.duration_ms()).sum()
}

fn check_unit_bounds(start: i64, end: Option<i64>) -> Result<(), String> {
    if let Some(end) = end {
        if end < start {
            return Err("End instant must not precede start instant.".into());
        }
    }
    Ok(())
}

/// Empty or whitespace-only category strings collapse to `None`.
pub fn normalize_category(category: Option<String>) -> Option<String> {
    category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Display name for a possibly-absent category.
pub fn category_label(category: Option<&str>) -> &str {
    match category {
        Some(c) if !c.is_empty() => c,
        _ => "Other",
    }
}

// ---- instants -----------------------------------------------------------

/// Current instant in epoch milliseconds. Sampled once per operation.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Parse a user-typed instant.
///
/// Accepts "now", "today" (local midnight), "yesterday", "YYYY-MM-DD" and
/// "YYYY-MM-DD HH:MM", all interpreted in local time.
pub fn parse_instant(s: &str) -> Option<i64> {
    let s = s.trim();
    let today = Local::now().date_naive();
    match s.to_lowercase().as_str() {
        "now" => return Some(now_ms()),
        "today" => return local_date_to_ms(today),
        "yesterday" => return local_date_to_ms(today - Duration::days(1)),
        _ => {}
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M") {
        return local_datetime_to_ms(dt);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return local_date_to_ms(d);
    }
    None
}

fn local_date_to_ms(date: NaiveDate) -> Option<i64> {
    local_datetime_to_ms(date.and_hms_opt(0, 0, 0)?)
}

fn local_datetime_to_ms(dt: NaiveDateTime) -> Option<i64> {
    Local
        .from_local_datetime(&dt)
        .earliest()
        .map(|t| t.with_timezone(&Utc).timestamp_millis())
}

/// Format an instant for display, local time.
pub fn format_instant(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(t) => t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        None => "-".into(),
    }
}

/// Format an instant as a bare UTC date, as consumed by the diagram
/// notation.
pub fn format_date(ms: i64) -> Option<String> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|t: DateTime<Utc>| t.format("%Y-%m-%d").to_string())
}

/// Format a millisecond duration as "3h 25m" / "25m".
pub fn format_duration_ms(ms: i64) -> String {
    let minutes = (ms.max(0) + 30_000) / 60_000;
    let hours = minutes / 60;
    let minutes = minutes % 60;
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else {
        format!("{minutes}m")
    }
}

/// Bounds of the current ISO week (Monday 00:00 .. next Monday 00:00),
/// local time, as a closed millisecond window.
pub fn this_week_window() -> (i64, i64) {
    let today = Local::now().date_naive();
    let weekday = today.weekday().num_days_from_monday() as i64;
    let start = today - Duration::days(weekday);
    let end = start + Duration::days(7);
    (
        local_date_to_ms(start).unwrap_or(0),
        local_date_to_ms(end).unwrap_or(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Status;

    fn task(db: &mut Database, title: &str, parent: Option<u64>) -> u64 {
        db.create_task(
            title.into(),
            None,
            None,
            Some("Work".into()),
            Some("Development".into()),
            None,
            None,
            parent,
            Vec::new(),
            None,
            None,
            Status::Todo,
            0,
        )
        .expect("create should succeed")
    }

    #[test]
    fn timer_handoff_pauses_previous_task() {
        let mut db = Database::default();
        let t1 = task(&mut db, "Root", None);
        let t2 = task(&mut db, "Child", Some(t1));

        db.start_timer(t2, 0).unwrap();
        db.start_timer(t1, 600_000).unwrap();

        let child = db.get(t2).unwrap();
        assert_eq!(child.status, Status::Paused);
        assert_eq!(child.time_units.len(), 1);
        assert_eq!(child.time_units[0].end, Some(600_000));
        assert_eq!(child.total_time_spent, 600_000);

        let root = db.get(t1).unwrap();
        assert_eq!(root.status, Status::InProgress);
        assert_eq!(root.actual_start, Some(600_000));
        assert_eq!(db.running_task(), Some(t1));
    }

    #[test]
    fn at_most_one_open_unit_across_store() {
        let mut db = Database::default();
        let ids: Vec<u64> = (0..4).map(|i| task(&mut db, &format!("T{i}"), None)).collect();
        let mut now = 0;
        for &id in ids.iter().chain(ids.iter().rev()) {
            db.start_timer(id, now).unwrap();
            now += 1_000;
        }
        let open: usize = db
            .tasks
            .iter()
            .map(|t| t.time_units.iter().filter(|u| u.is_open()).count())
            .sum();
        assert_eq!(open, 1);
    }

    #[test]
    fn restart_on_running_task_closes_zero_duration_unit() {
        // Restarting the running task is intentionally not a no-op: the
        // open unit closes at the same instant and a fresh one opens.
        let mut db = Database::default();
        let t = task(&mut db, "Solo", None);
        db.start_timer(t, 1_000).unwrap();
        db.start_timer(t, 1_000).unwrap();

        let solo = db.get(t).unwrap();
        assert_eq!(solo.time_units.len(), 2);
        assert_eq!(solo.time_units[0].end, Some(1_000));
        assert_eq!(solo.time_units[0].duration_ms(), 0);
        assert!(solo.time_units[1].is_open());
        assert_eq!(solo.status, Status::InProgress);
    }

    #[test]
    fn stop_without_open_unit_is_noop() {
        let mut db = Database::default();
        let t = task(&mut db, "Idle", None);
        db.stop_timer(t, 5_000).unwrap();
        let idle = db.get(t).unwrap();
        assert_eq!(idle.status, Status::Todo);
        assert!(idle.time_units.is_empty());
    }

    #[test]
    fn actual_start_is_set_only_once() {
        let mut db = Database::default();
        let t = task(&mut db, "T", None);
        db.start_timer(t, 100).unwrap();
        db.stop_timer(t, 200).unwrap();
        db.start_timer(t, 900).unwrap();
        assert_eq!(db.get(t).unwrap().actual_start, Some(100));
    }

    #[test]
    fn totals_recomputed_from_units() {
        let mut db = Database::default();
        let t = task(&mut db, "T", None);
        let u1 = db.add_time_unit(t, 0, Some(60_000), 0).unwrap();
        db.add_time_unit(t, 100_000, Some(160_000), 0).unwrap();
        assert_eq!(db.get(t).unwrap().total_time_spent, 120_000);

        db.update_time_unit(t, u1, None, Some(Some(30_000)), 0).unwrap();
        assert_eq!(db.get(t).unwrap().total_time_spent, 90_000);

        db.delete_time_unit(t, u1, 0).unwrap();
        assert_eq!(db.get(t).unwrap().total_time_spent, 60_000);
    }

    #[test]
    fn open_manual_unit_contributes_zero() {
        let mut db = Database::default();
        let t = task(&mut db, "T", None);
        db.add_time_unit(t, 50_000, None, 0).unwrap();
        assert_eq!(db.get(t).unwrap().total_time_spent, 0);
    }

    #[test]
    fn rejects_end_before_start() {
        let mut db = Database::default();
        let t = task(&mut db, "T", None);
        assert!(db.add_time_unit(t, 10_000, Some(5_000), 0).is_err());
    }

    #[test]
    fn delete_removes_whole_subtree() {
        let mut db = Database::default();
        let t1 = task(&mut db, "Root", None);
        let t2 = task(&mut db, "Child", Some(t1));
        let t3 = task(&mut db, "Grandchild", Some(t2));
        let other = task(&mut db, "Other", None);

        let removed = db.delete_task(t1).unwrap();
        assert_eq!(removed.len(), 3);
        assert!(db.get(t2).is_none());
        assert!(db.get(t3).is_none());
        assert!(db.get(other).is_some());
    }

    #[test]
    fn rejects_parent_cycle_and_depth_overflow() {
        let mut db = Database::default();
        let t1 = task(&mut db, "L1", None);
        let t2 = task(&mut db, "L2", Some(t1));
        assert!(db.check_parent(Some(t1), t2).is_err());
        assert!(db.check_parent(Some(t1), t1).is_err());

        let t3 = task(&mut db, "L3", Some(t2));
        let t4 = task(&mut db, "L4", Some(t3));
        let t5 = task(&mut db, "L5", Some(t4));
        // t5 sits at depth 5; nothing may nest below it.
        assert!(db.check_parent(None, t5).is_err());
    }

    #[test]
    fn category_rename_cascades_delete_does_not() {
        let mut db = Database::default();
        let t = task(&mut db, "T", None);
        let touched = db
            .rename_category(CategoryKind::Main, "Work", "Job", 0)
            .unwrap();
        assert_eq!(touched, 1);
        assert_eq!(db.get(t).unwrap().main_category.as_deref(), Some("Job"));
        assert!(db.main_categories.iter().any(|c| c == "Job"));

        db.delete_category(CategoryKind::Main, "Job").unwrap();
        // The task keeps the orphaned name; only display maps it to Other.
        assert_eq!(db.get(t).unwrap().main_category.as_deref(), Some("Job"));
    }

    #[test]
    fn add_category_dedups() {
        let mut db = Database::default();
        assert!(db.add_category(CategoryKind::Sub, "Design").is_ok());
        assert!(db.add_category(CategoryKind::Sub, "Design").is_err());
        assert!(db.add_category(CategoryKind::Sub, "  ").is_err());
    }

    #[test]
    fn output_crud_round_trip() {
        let mut db = Database::default();
        let t = task(&mut db, "T", None);
        let o = db
            .add_output(t, "Report".into(), None, Some(40), 0)
            .unwrap();
        db.update_output(t, o, None, Some(Some("https://example.com".into())), Some(Some(80)), 0)
            .unwrap();
        let output = &db.get(t).unwrap().outputs[0];
        assert_eq!(output.name, "Report");
        assert_eq!(output.link.as_deref(), Some("https://example.com"));
        assert_eq!(output.completeness, Some(80));
        db.delete_output(t, o, 0).unwrap();
        assert!(db.get(t).unwrap().outputs.is_empty());
    }

    #[test]
    fn save_load_round_trips_field_for_field() {
        let mut db = Database::default();
        let t1 = task(&mut db, "Root", None);
        let t2 = task(&mut db, "Child", Some(t1));
        db.start_timer(t2, 1_000).unwrap();
        db.stop_timer(t2, 61_000).unwrap();
        db.add_output(t2, "Draft".into(), None, Some(25), 0).unwrap();
        db.add_category(CategoryKind::Main, "Side projects").unwrap();

        let path = temp_file("wbs_db_roundtrip.json");
        db.save(&path).expect("save should succeed");
        let loaded = Database::load(&path);
        let _ = fs::remove_file(&path);

        assert_eq!(loaded.main_categories, db.main_categories);
        assert_eq!(loaded.sub_categories, db.sub_categories);
        assert_eq!(loaded.tasks.len(), db.tasks.len());
        for (a, b) in loaded.tasks.iter().zip(db.tasks.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.title, b.title);
            assert_eq!(a.status, b.status);
            assert_eq!(a.parent, b.parent);
            assert_eq!(a.time_units, b.time_units);
            assert_eq!(a.outputs, b.outputs);
            assert_eq!(a.total_time_spent, b.total_time_spent);
            assert_eq!(a.actual_start, b.actual_start);
        }
    }

    fn temp_file(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("{}_{}", name, std::process::id()));
        path
    }
}
