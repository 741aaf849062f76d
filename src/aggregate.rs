//! Time aggregation over a closed window.
//!
//! Every function here is a pure projection: given tasks and a window in
//! epoch milliseconds, clip each time unit to the window and sum. Open
//! units extend to "now". A unit touching the window boundary exactly
//! contributes zero and does not count as activity.

use std::collections::BTreeMap;

use crate::db::category_label;
use crate::task::{Task, TimeUnit};

/// Which category dimension a bucketed total groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Main,
    Sub,
}

/// Milliseconds of `unit` falling strictly inside `[start, end]`.
pub fn clipped_ms(unit: &TimeUnit, start: i64, end: i64, now: i64) -> i64 {
    let effective_start = unit.start.max(start);
    let effective_end = unit.end.unwrap_or(now).min(end);
    (effective_end - effective_start).max(0)
}

/// Total clipped milliseconds of one task inside the window.
pub fn task_ms_in_window(task: &Task, start: i64, end: i64, now: i64) -> i64 {
    task.time_units
        .iter()
        .map(|u| clipped_ms(u, start, end, now))
        .sum()
}

/// Whether any of the task's units overlaps the window with positive
/// duration. Boundary-touching units do not qualify.
pub fn task_active_in_window(task: &Task, start: i64, end: i64, now: i64) -> bool {
    task.time_units
        .iter()
        .any(|u| clipped_ms(u, start, end, now) > 0)
}

/// Per-category minute totals over the window, sorted by descending
/// minutes then name. Missing categories bucket under "Other"; zero-minute
/// buckets are dropped.
pub fn category_minutes(
    tasks: &[&Task],
    dimension: Dimension,
    start: i64,
    end: i64,
    now: i64,
) -> Vec<(String, i64)> {
    let mut buckets: BTreeMap<String, i64> = BTreeMap::new();
    for task in tasks {
        let ms = task_ms_in_window(task, start, end, now);
        if ms == 0 {
            continue;
        }
        let category = match dimension {
            Dimension::Main => task.main_category.as_deref(),
            Dimension::Sub => task.sub_category.as_deref(),
        };
        *buckets.entry(category_label(category).to_string()).or_insert(0) += ms;
    }
    let mut totals: Vec<(String, i64)> = buckets
        .into_iter()
        .map(|(name, ms)| (name, round_to_minutes(ms)))
        .filter(|(_, minutes)| *minutes > 0)
        .collect();
    totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    totals
}

/// Per-task minute totals over the window, descending, zero rows dropped.
pub fn task_minutes(tasks: &[&Task], start: i64, end: i64, now: i64) -> Vec<(u64, i64)> {
    let mut totals: Vec<(u64, i64)> = tasks
        .iter()
        .map(|t| (t.id, round_to_minutes(task_ms_in_window(t, start, end, now))))
        .filter(|(_, minutes)| *minutes > 0)
        .collect();
    totals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    totals
}

/// Round milliseconds to whole minutes, half up.
pub fn round_to_minutes(ms: i64) -> i64 {
    (ms + 30_000) / 60_000
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Status;

    const MIN: i64 = 60_000;

    fn unit(id: u64, start: i64, end: Option<i64>) -> TimeUnit {
        TimeUnit { id, start, end }
    }

    fn task_with_units(id: u64, main: Option<&str>, units: Vec<TimeUnit>) -> Task {
        Task {
            id,
            title: format!("Task {id}"),
            alias: None,
            description: None,
            main_category: main.map(String::from),
            sub_category: None,
            planned_start: None,
            planned_end: None,
            actual_start: None,
            status: Status::Paused,
            total_time_spent: units.iter().map(|u| u.duration_ms()).sum(),
            time_units: units,
            parent: None,
            outputs: Vec::new(),
            labels: Vec::new(),
            assignee: None,
            reporter: None,
            created_at_ms: 0,
            updated_at_ms: 0,
        }
    }

    #[test]
    fn clips_unit_to_window() {
        // Unit 10:00-11:00 against window 10:30-10:45 -> 15 minutes.
        let u = unit(1, 0, Some(60 * MIN));
        assert_eq!(clipped_ms(&u, 30 * MIN, 45 * MIN, 0), 15 * MIN);
    }

    #[test]
    fn boundary_touching_unit_contributes_zero() {
        // Ends exactly at window start.
        let u = unit(1, 0, Some(30 * MIN));
        assert_eq!(clipped_ms(&u, 30 * MIN, 60 * MIN, 0), 0);
        let t = task_with_units(1, None, vec![u]);
        assert!(!task_active_in_window(&t, 30 * MIN, 60 * MIN, 0));
    }

    #[test]
    fn open_unit_extends_to_now() {
        let u = unit(1, 10 * MIN, None);
        let now = 40 * MIN;
        assert_eq!(clipped_ms(&u, 0, 60 * MIN, now), 30 * MIN);
        // Window end still clips an open unit.
        assert_eq!(clipped_ms(&u, 0, 25 * MIN, now), 15 * MIN);
    }

    #[test]
    fn unit_outside_window_is_negative_free() {
        let u = unit(1, 100 * MIN, Some(120 * MIN));
        assert_eq!(clipped_ms(&u, 0, 50 * MIN, 0), 0);
    }

    #[test]
    fn buckets_by_category_with_other_fallback() {
        let a = task_with_units(1, Some("Work"), vec![unit(1, 0, Some(30 * MIN))]);
        let b = task_with_units(2, Some("Work"), vec![unit(2, 0, Some(20 * MIN))]);
        let c = task_with_units(3, None, vec![unit(3, 0, Some(10 * MIN))]);
        let tasks = vec![&a, &b, &c];
        let totals = category_minutes(&tasks, Dimension::Main, 0, 60 * MIN, 0);
        assert_eq!(
            totals,
            vec![("Work".to_string(), 50), ("Other".to_string(), 10)]
        );
    }

    #[test]
    fn drops_zero_minute_buckets() {
        // 20 seconds rounds down to zero minutes and vanishes from output.
        let a = task_with_units(1, Some("Work"), vec![unit(1, 0, Some(20_000))]);
        let tasks = vec![&a];
        assert!(category_minutes(&tasks, Dimension::Main, 0, 60 * MIN, 0).is_empty());
        assert!(task_minutes(&tasks, 0, 60 * MIN, 0).is_empty());
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(round_to_minutes(89_999), 1);
        assert_eq!(round_to_minutes(90_000), 2);
        assert_eq!(round_to_minutes(0), 0);
    }

    #[test]
    fn task_totals_sum_multiple_units() {
        let t = task_with_units(
            1,
            None,
            vec![unit(1, 0, Some(10 * MIN)), unit(2, 50 * MIN, Some(70 * MIN))],
        );
        // Second unit is clipped at the window end.
        assert_eq!(task_ms_in_window(&t, 0, 60 * MIN, 0), 20 * MIN);
        let tasks = vec![&t];
        assert_eq!(task_minutes(&tasks, 0, 60 * MIN, 0), vec![(1, 20)]);
    }
}
