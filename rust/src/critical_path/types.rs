//! Types for critical path analysis.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::TaskId;

/// Per-task timing information, in whole days from the project start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTiming {
    /// Earliest possible start time (from forward pass).
    pub earliest_start: i64,
    /// Earliest possible finish time (from forward pass).
    pub earliest_finish: i64,
    /// Latest allowable start time (from backward pass).
    pub latest_start: i64,
    /// Latest allowable finish time (from backward pass).
    pub latest_finish: i64,
    /// Slack = latest_finish - earliest_finish.
    pub slack: i64,
}

impl TaskTiming {
    pub fn is_critical(&self) -> bool {
        self.slack == 0
    }

    pub fn duration(&self) -> i64 {
        self.earliest_finish - self.earliest_start
    }
}

/// Result of critical path calculation over a whole project.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CriticalPathResult {
    /// Task IDs in the topological order the passes used.
    pub order: Vec<TaskId>,
    /// Timing information for each task.
    pub task_timings: BTreeMap<TaskId, TaskTiming>,
    /// Set of task IDs with zero slack.
    pub critical_path_tasks: BTreeSet<TaskId>,
    /// The single highlighted chain, source to sink.
    pub critical_chain: Vec<TaskId>,
    /// Latest earliest-finish across all tasks.
    pub project_finish: i64,
    /// Sum of all task durations.
    pub total_work: i64,
}
