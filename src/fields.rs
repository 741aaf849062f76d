//! Enumerations and field types for task management.
//!
//! This module defines the structured data types used to classify tasks:
//! timer-driven status values, the two category dimensions, and the sort
//! keys accepted by the list command.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Task status, driven by the timer except for `Done`.
///
/// `start` moves a task to `InProgress` (pausing whichever task was running),
/// `stop` moves it to `Paused`. `Done` is only ever set by an explicit
/// update, never by the timer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[serde(alias = "TODO")]
    Todo,
    #[serde(alias = "IN_PROGRESS")]
    InProgress,
    #[serde(alias = "PAUSED")]
    Paused,
    #[serde(alias = "DONE")]
    Done,
}

/// Which of the two independent category vocabularies an operation targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryKind {
    Main,
    Sub,
}

/// Available sorting options for task lists.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortKey {
    Id,
    PlannedStart,
    TimeSpent,
}

/// Which category dimension a report buckets by.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReportDimension {
    Main,
    Sub,
    Task,
}
