//! Consolidated, immutable view of a project's derived schedule.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::critical_path::{calculate_critical_path, TaskTiming};
use crate::error::{EngineResult, ErrorKind};
use crate::graph::TaskGraph;
use crate::models::{ScheduledTask, TaskId};

/// Derived dates, slack and critical path for every task of a project.
///
/// Offsets are whole days from `project_start`. A snapshot is always
/// recomputed from scratch, never patched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSnapshot {
    /// Coordinator revision that produced this snapshot.
    pub revision: u64,
    pub project_start: NaiveDate,
    pub project_finish: i64,
    /// Topological order used for the derivation.
    pub order: Vec<TaskId>,
    pub timings: BTreeMap<TaskId, TaskTiming>,
    pub critical: BTreeSet<TaskId>,
    pub critical_chain: Vec<TaskId>,
    pub has_cycle: bool,
    /// Edges lying on a cycle; empty unless `has_cycle`.
    pub cycle_edges: Vec<(TaskId, TaskId)>,
}

impl ScheduleSnapshot {
    /// Snapshot of a project with no tasks.
    pub fn empty(project_start: NaiveDate) -> Self {
        Self {
            revision: 0,
            project_start,
            project_finish: 0,
            order: Vec::new(),
            timings: BTreeMap::new(),
            critical: BTreeSet::new(),
            critical_chain: Vec::new(),
            has_cycle: false,
            cycle_edges: Vec::new(),
        }
    }

    /// Derive the schedule of a graph. Fails on cycles.
    pub fn derive(
        graph: &TaskGraph,
        project_start: NaiveDate,
        verbosity: u8,
    ) -> EngineResult<Self> {
        let result = calculate_critical_path(graph, project_start, verbosity)?;
        Ok(Self {
            revision: 0,
            project_start,
            project_finish: result.project_finish,
            order: result.order,
            timings: result.task_timings,
            critical: result.critical_path_tasks,
            critical_chain: result.critical_chain,
            has_cycle: false,
            cycle_edges: Vec::new(),
        })
    }

    /// Like [`derive`](Self::derive), but reports a cyclic graph through
    /// `has_cycle` instead of failing. Timings are empty in that case.
    pub fn inspect(graph: &TaskGraph, project_start: NaiveDate, verbosity: u8) -> Self {
        match Self::derive(graph, project_start, verbosity) {
            Ok(snapshot) => snapshot,
            Err(err) if err.kind() == ErrorKind::CycleDetected => Self {
                has_cycle: true,
                cycle_edges: graph.cycle_edges(),
                ..Self::empty(project_start)
            },
            Err(err) => {
                tracing::error!(error = %err, "schedule inspection failed");
                Self::empty(project_start)
            }
        }
    }

    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    pub fn len(&self) -> usize {
        self.timings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timings.is_empty()
    }

    pub fn timing(&self, task_id: &str) -> Option<&TaskTiming> {
        self.timings.get(task_id)
    }

    pub fn is_critical(&self, task_id: &str) -> bool {
        self.critical.contains(task_id)
    }

    /// Calendar date of a day offset.
    pub fn date_at(&self, offset: i64) -> NaiveDate {
        let days = Days::new(offset.unsigned_abs());
        let date = if offset >= 0 {
            self.project_start.checked_add_days(days)
        } else {
            self.project_start.checked_sub_days(days)
        };
        date.unwrap_or(self.project_start)
    }

    pub fn start_date(&self, task_id: &str) -> Option<NaiveDate> {
        self.timing(task_id).map(|t| self.date_at(t.earliest_start))
    }

    /// Exclusive end date of a task.
    pub fn end_date(&self, task_id: &str) -> Option<NaiveDate> {
        self.timing(task_id).map(|t| self.date_at(t.earliest_finish))
    }

    pub fn finish_date(&self) -> NaiveDate {
        self.date_at(self.project_finish)
    }

    /// Gantt rows in topological order.
    ///
    /// Tasks of `graph` that the snapshot does not cover are skipped.
    pub fn rows(&self, graph: &TaskGraph) -> Vec<ScheduledTask> {
        self.order
            .iter()
            .filter_map(|id| {
                let task = graph.get(id)?;
                let timing = self.timing(id)?;
                Some(ScheduledTask {
                    task_id: id.clone(),
                    name: task.name.clone(),
                    start_date: self.date_at(timing.earliest_start),
                    end_date: self.date_at(timing.earliest_finish),
                    duration_days: task.duration_days,
                    slack_days: timing.slack,
                    critical: timing.is_critical(),
                    percent_complete: task.status.percent_complete(),
                    color: task.color.as_str().to_string(),
                    dependencies: task
                        .dependencies
                        .iter()
                        .map(|d| d.task_id.clone())
                        .collect(),
                })
            })
            .collect()
    }
}
