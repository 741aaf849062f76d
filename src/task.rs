//! Task data structures.
//!
//! This module defines the core `Task` struct that represents a single node
//! in the work-breakdown tree, together with the records it owns: `TimeUnit`
//! intervals written by the timer and `OutputRecord` deliverables.

use serde::{Deserialize, Serialize};

use crate::fields::Status;

/// Maximum length of a task's short alias.
pub const ALIAS_MAX: usize = 10;

/// Maximum number of free-text labels per task.
pub const LABELS_MAX: usize = 3;

/// One contiguous interval of recorded work on a task.
///
/// A unit with no `end` is open: the timer is currently running on its
/// owner. At most one unit across the whole store may be open at a time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeUnit {
    pub id: u64,
    /// Start instant, epoch milliseconds.
    pub start: i64,
    /// End instant, epoch milliseconds. `None` while the timer runs.
    pub end: Option<i64>,
}

impl TimeUnit {
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Closed duration in milliseconds. Open units count as zero.
    pub fn duration_ms(&self) -> i64 {
        (self.end.unwrap_or(self.start) - self.start).max(0)
    }
}

/// A deliverable attached to a task, tracked in the weekly output report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputRecord {
    pub id: u64,
    pub name: String,
    pub link: Option<String>,
    /// Completion percentage, clamped to 0..=100 on every write.
    pub completeness: Option<u8>,
}

/// A node in the work-breakdown tree.
///
/// Tasks form a forest via `parent` pointers over the flat store list;
/// relations are always resolved by id lookup at traversal time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    /// Short display alias, at most [`ALIAS_MAX`] chars.
    pub alias: Option<String>,
    pub description: Option<String>,
    /// Primary category. `None` renders as "Other".
    pub main_category: Option<String>,
    /// Secondary category. `None` renders as "Other".
    pub sub_category: Option<String>,
    /// Estimated start, epoch milliseconds.
    pub planned_start: Option<i64>,
    /// Estimated end, epoch milliseconds.
    pub planned_end: Option<i64>,
    /// Set once, by the first timer start.
    pub actual_start: Option<i64>,
    pub status: Status,
    #[serde(default)]
    pub time_units: Vec<TimeUnit>,
    /// Sum of closed time-unit durations in milliseconds. Recomputed from
    /// `time_units` on every mutation of that list, never patched.
    #[serde(default)]
    pub total_time_spent: i64,
    pub parent: Option<u64>,
    #[serde(default)]
    pub outputs: Vec<OutputRecord>,
    #[serde(default)]
    pub labels: Vec<String>,
    pub assignee: Option<String>,
    pub reporter: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl Task {
    /// The currently open time unit, if the timer runs on this task.
    pub fn open_unit(&self) -> Option<&TimeUnit> {
        self.time_units.iter().find(|u| u.is_open())
    }

    /// Earliest recorded unit start, used by the schedule generator.
    pub fn first_unit_start(&self) -> Option<i64> {
        self.time_units.iter().map(|u| u.start).min()
    }

    /// Latest closed unit end, used by the schedule generator.
    pub fn last_unit_end(&self) -> Option<i64> {
        self.time_units.iter().filter_map(|u| u.end).max()
    }

    /// Preferred short display name: alias when present, title otherwise.
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.title)
    }
}

/// Truncate an alias to [`ALIAS_MAX`] characters. Empty input becomes `None`.
pub fn clamp_alias(alias: Option<String>) -> Option<String> {
    let alias = alias?;
    let alias = alias.trim();
    if alias.is_empty() {
        return None;
    }
    Some(alias.chars().take(ALIAS_MAX).collect())
}

/// Keep at most [`LABELS_MAX`] non-empty labels, silently dropping extras.
pub fn clamp_labels(labels: Vec<String>) -> Vec<String> {
    labels
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .take(LABELS_MAX)
        .collect()
}

/// Clamp a completion percentage into 0..=100.
pub fn clamp_completeness(value: Option<i64>) -> Option<u8> {
    value.map(|v| v.clamp(0, 100) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_unit_duration_is_zero() {
        let unit = TimeUnit {
            id: 1,
            start: 5_000,
            end: None,
        };
        assert!(unit.is_open());
        assert_eq!(unit.duration_ms(), 0);
    }

    #[test]
    fn clamps_alias_and_labels() {
        assert_eq!(
            clamp_alias(Some("abcdefghijklmnop".into())),
            Some("abcdefghij".into())
        );
        assert_eq!(clamp_alias(Some("   ".into())), None);
        let labels = clamp_labels(vec![
            "a".into(),
            "".into(),
            "b".into(),
            "c".into(),
            "d".into(),
        ]);
        assert_eq!(labels, vec!["a".to_string(), "b".into(), "c".into()]);
    }

    #[test]
    fn clamps_completeness_into_percent_range() {
        assert_eq!(clamp_completeness(Some(150)), Some(100));
        assert_eq!(clamp_completeness(Some(-3)), Some(0));
        assert_eq!(clamp_completeness(Some(42)), Some(42));
        assert_eq!(clamp_completeness(None), None);
    }
}
