//! Error types for graph, schedule and coordinator operations.
//!
//! Every failure the engine can report is a `ScheduleError`. Errors propagate
//! unchanged from the graph through the coordinator, so callers can match on
//! [`ScheduleError::kind`] to pick a user-facing message.

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::TaskId;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, ScheduleError>;

/// Discriminant of a [`ScheduleError`], for callers that only need the kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    DuplicateId,
    SelfDependency,
    CycleDetected,
    InvalidDependencyKind,
    InvalidDates,
    InvariantViolation,
}

/// Errors that can occur while editing or scheduling a task graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScheduleError {
    /// A task, edge or project referenced by the caller does not exist.
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// A task or project was added with an id that is already taken.
    #[error("Duplicate id: {id}")]
    DuplicateId { id: String },

    /// A dependency from a task onto itself.
    #[error("Task '{task_id}' cannot depend on itself")]
    SelfDependency { task_id: TaskId },

    /// The edge set contains (or would contain) a cycle.
    #[error("Cycle detected in dependency graph: {}", describe_edges(.edges))]
    CycleDetected { edges: Vec<(TaskId, TaskId)> },

    /// A dependency kind string outside the supported vocabulary.
    #[error("Invalid dependency kind {value:?} (expected start_to_start, finish_to_start or finish_to_finish)")]
    InvalidDependencyKind { value: String },

    /// A task built from a date range that ends before it starts.
    #[error("Task '{task_id}' ends on {end} before it starts on {start}")]
    InvalidDates {
        task_id: TaskId,
        start: NaiveDate,
        end: NaiveDate,
    },

    /// Internal consistency check failed; the current mutation is abandoned.
    #[error("Invariant violation: {reason}")]
    InvariantViolation { reason: String },
}

fn describe_edges(edges: &[(TaskId, TaskId)]) -> String {
    edges
        .iter()
        .map(|(from, to)| format!("{} -> {}", from, to))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ScheduleError {
    /// Creates a not-found error for a task id.
    pub fn task_not_found(task_id: &str) -> Self {
        Self::NotFound {
            what: format!("task '{}'", task_id),
        }
    }

    /// Creates a not-found error for a dependency edge.
    pub fn edge_not_found(from: &str, to: &str) -> Self {
        Self::NotFound {
            what: format!("dependency '{}' -> '{}'", from, to),
        }
    }

    /// Creates a not-found error for a project id.
    pub fn project_not_found(project_id: &str) -> Self {
        Self::NotFound {
            what: format!("project '{}'", project_id),
        }
    }

    pub fn duplicate_id(id: impl Into<String>) -> Self {
        Self::DuplicateId { id: id.into() }
    }

    pub fn self_dependency(task_id: impl Into<TaskId>) -> Self {
        Self::SelfDependency {
            task_id: task_id.into(),
        }
    }

    pub fn cycle(edges: Vec<(TaskId, TaskId)>) -> Self {
        Self::CycleDetected { edges }
    }

    pub fn invalid_kind(value: impl Into<String>) -> Self {
        Self::InvalidDependencyKind {
            value: value.into(),
        }
    }

    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            reason: reason.into(),
        }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateId { .. } => ErrorKind::DuplicateId,
            Self::SelfDependency { .. } => ErrorKind::SelfDependency,
            Self::CycleDetected { .. } => ErrorKind::CycleDetected,
            Self::InvalidDependencyKind { .. } => ErrorKind::InvalidDependencyKind,
            Self::InvalidDates { .. } => ErrorKind::InvalidDates,
            Self::InvariantViolation { .. } => ErrorKind::InvariantViolation,
        }
    }
}
