//! Diagram source generation.
//!
//! Pure generators that turn a filtered task set into PlantUML text for an
//! external renderer: a WBS outline and a Gantt schedule. Both reuse the
//! hierarchy indexer's walk, so ordering and the depth cap match the tree
//! views exactly.

use std::collections::HashMap;

use chrono::Duration;

use crate::db::format_date;
use crate::fields::Status;
use crate::hierarchy::assign_indexes;
use crate::task::Task;

/// WBS outline: one line per task with `*` markers proportional to depth,
/// one sub-line per named output at the next level down.
pub fn outline_text(tasks: &[&Task]) -> String {
    let by_id: HashMap<u64, &Task> = tasks.iter().map(|t| (t.id, *t)).collect();
    let mut out = String::from("@startwbs\n");
    for row in assign_indexes(tasks) {
        let Some(task) = by_id.get(&row.task_id) else {
            continue;
        };
        out.push_str(&"*".repeat(row.depth));
        out.push(' ');
        out.push_str(task.display_name());
        out.push('\n');
        for output in &task.outputs {
            if output.name.is_empty() {
                continue;
            }
            out.push_str(&"*".repeat(row.depth + 1));
            out.push_str(&format!(" {}\n", output.name));
        }
    }
    out.push_str("@endwbs\n");
    out
}

/// Resolved schedule bounds for one task, by status:
/// Todo uses the estimates, running/paused tasks anchor on their first
/// recorded unit, done tasks span their recorded units.
fn schedule_bounds(task: &Task, now: i64) -> (Option<i64>, Option<i64>) {
    match task.status {
        Status::Todo => (task.planned_start, task.planned_end),
        Status::InProgress | Status::Paused => {
            let end = task
                .planned_end
                .unwrap_or(now + Duration::days(1).num_milliseconds());
            (task.first_unit_start(), Some(end))
        }
        Status::Done => (
            task.first_unit_start(),
            Some(task.last_unit_end().unwrap_or(now)),
        ),
    }
}

/// Gantt schedule: one directive per task with resolvable bounds. Tasks
/// whose start or end cannot be resolved, or whose end precedes their
/// start, are silently omitted.
pub fn schedule_text(tasks: &[&Task], now: i64) -> String {
    let by_id: HashMap<u64, &Task> = tasks.iter().map(|t| (t.id, *t)).collect();
    let mut out = String::from("@startgantt\n");
    for row in assign_indexes(tasks) {
        let Some(task) = by_id.get(&row.task_id) else {
            continue;
        };
        let (start, end) = schedule_bounds(task, now);
        let (Some(start), Some(end)) = (start, end) else {
            continue;
        };
        if end < start {
            continue;
        }
        let (Some(start), Some(end)) = (format_date(start), format_date(end)) else {
            continue;
        };
        out.push_str(&format!(
            "[{}] starts {} and ends {}\n",
            task.display_name(),
            start,
            end
        ));
    }
    out.push_str("@endgantt\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{OutputRecord, TimeUnit};

    const DAY: i64 = 86_400_000;

    fn task(id: u64, title: &str, parent: Option<u64>, status: Status) -> Task {
        Task {
            id,
            title: title.into(),
            alias: None,
            description: None,
            main_category: None,
            sub_category: None,
            planned_start: None,
            planned_end: None,
            actual_start: None,
            status,
            time_units: Vec::new(),
            total_time_spent: 0,
            parent,
            outputs: Vec::new(),
            labels: Vec::new(),
            assignee: None,
            reporter: None,
            created_at_ms: 0,
            updated_at_ms: 0,
        }
    }

    #[test]
    fn outline_nests_tasks_and_outputs() {
        let mut root = task(1, "Platform", None, Status::Todo);
        root.outputs.push(OutputRecord {
            id: 1,
            name: "Design doc".into(),
            link: None,
            completeness: Some(50),
        });
        let child = task(2, "Auth", Some(1), Status::Todo);
        let refs = vec![&root, &child];
        let text = outline_text(&refs);
        assert_eq!(
            text,
            "@startwbs\n* Platform\n** Design doc\n** Auth\n@endwbs\n"
        );
    }

    #[test]
    fn outline_skips_nameless_outputs() {
        let mut root = task(1, "Platform", None, Status::Todo);
        root.outputs.push(OutputRecord {
            id: 1,
            name: String::new(),
            link: None,
            completeness: None,
        });
        let refs = vec![&root];
        assert_eq!(outline_text(&refs), "@startwbs\n* Platform\n@endwbs\n");
    }

    #[test]
    fn schedule_uses_estimates_for_todo() {
        let mut t = task(1, "Plan", None, Status::Todo);
        t.planned_start = Some(0);
        t.planned_end = Some(2 * DAY);
        let refs = vec![&t];
        let text = schedule_text(&refs, 0);
        assert!(text.contains("[Plan] starts 1970-01-01 and ends 1970-01-03"));
    }

    #[test]
    fn schedule_anchors_running_task_on_first_unit() {
        let mut t = task(1, "Build", None, Status::InProgress);
        t.time_units.push(TimeUnit {
            id: 1,
            start: DAY,
            end: None,
        });
        let refs = vec![&t];
        // No estimate: end falls back to now + 1 day.
        let text = schedule_text(&refs, 3 * DAY);
        assert!(text.contains("[Build] starts 1970-01-02 and ends 1970-01-05"));
    }

    #[test]
    fn schedule_spans_recorded_units_when_done() {
        let mut t = task(1, "Ship", None, Status::Done);
        t.time_units.push(TimeUnit {
            id: 1,
            start: DAY,
            end: Some(2 * DAY),
        });
        t.time_units.push(TimeUnit {
            id: 2,
            start: 3 * DAY,
            end: Some(4 * DAY),
        });
        let refs = vec![&t];
        let text = schedule_text(&refs, 9 * DAY);
        assert!(text.contains("[Ship] starts 1970-01-02 and ends 1970-01-05"));
    }

    #[test]
    fn schedule_omits_unresolvable_entries() {
        // Todo without estimates, and a paused task with no recorded units.
        let todo = task(1, "Someday", None, Status::Todo);
        let paused = task(2, "Stalled", None, Status::Paused);
        let refs = vec![&todo, &paused];
        assert_eq!(schedule_text(&refs, 0), "@startgantt\n@endgantt\n");
    }

    #[test]
    fn schedule_omits_inverted_ranges() {
        let mut t = task(1, "Odd", None, Status::Todo);
        t.planned_start = Some(5 * DAY);
        t.planned_end = Some(DAY);
        let refs = vec![&t];
        assert_eq!(schedule_text(&refs, 0), "@startgantt\n@endgantt\n");
    }
}
