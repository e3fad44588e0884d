//! Per-project state owned by the coordinator.

use chrono::Utc;
use std::sync::Arc;

use crate::error::{EngineResult, ScheduleError};
use crate::graph::TaskGraph;
use crate::models::{Project, ScheduledTask};
use crate::snapshot::ScheduleSnapshot;
use crate::{log_changes, log_checks};

use super::mutation::Mutation;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Clean,
    Mutating,
}

/// A loaded project: its graph plus the snapshot derived from it.
///
/// The snapshot always matches the graph. Mutations run on copies of the
/// metadata and graph, swapped in only after the copies derive cleanly.
#[derive(Debug)]
pub struct ProjectState {
    /// Project metadata; `tasks` is left empty, the graph owns them.
    project: Project,
    graph: TaskGraph,
    snapshot: Arc<ScheduleSnapshot>,
    revision: u64,
    phase: Phase,
}

impl ProjectState {
    /// Validate a stored project and derive its first snapshot.
    ///
    /// Tasks with an empty project id are adopted; tasks naming another
    /// project are rejected.
    pub fn load(mut project: Project, verbosity: u8) -> EngineResult<Self> {
        for task in &mut project.tasks {
            if task.project_id.is_empty() {
                task.project_id = project.id.clone();
            } else if task.project_id != project.id {
                return Err(ScheduleError::invariant(format!(
                    "task '{}' belongs to project '{}', not '{}'",
                    task.id, task.project_id, project.id
                )));
            }
        }

        let graph = TaskGraph::from_tasks(std::mem::take(&mut project.tasks))?;
        let snapshot = ScheduleSnapshot::derive(&graph, project.start_date, verbosity)?;
        log_changes!(
            verbosity,
            "Loaded project {} with {} tasks, finish day {}",
            project.id,
            graph.len(),
            snapshot.project_finish
        );

        Ok(Self {
            project,
            graph,
            snapshot: Arc::new(snapshot),
            revision: 0,
            phase: Phase::Clean,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn snapshot(&self) -> Arc<ScheduleSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn rows(&self) -> Vec<ScheduledTask> {
        self.snapshot.rows(&self.graph)
    }

    /// Full project, tasks included, ready to persist.
    pub fn to_project(&self) -> Project {
        let mut project = self.project.clone();
        project.tasks = self.graph.to_tasks();
        project
    }

    /// Apply one mutation atomically and return the new snapshot.
    ///
    /// On error the graph, snapshot and revision are unchanged.
    pub fn apply(
        &mut self,
        mutation: &Mutation,
        verbosity: u8,
    ) -> EngineResult<Arc<ScheduleSnapshot>> {
        if self.phase != Phase::Clean {
            return Err(ScheduleError::invariant(format!(
                "project '{}' is already mutating",
                self.project.id
            )));
        }

        self.phase = Phase::Mutating;
        let result = self.apply_to_copy(mutation, verbosity);
        self.phase = Phase::Clean;

        if let Err(err) = &result {
            log_checks!(
                verbosity,
                "Rejected {} on project {}: {}",
                mutation.kind(),
                self.project.id,
                err
            );
        }
        result
    }

    fn apply_to_copy(
        &mut self,
        mutation: &Mutation,
        verbosity: u8,
    ) -> EngineResult<Arc<ScheduleSnapshot>> {
        let mut meta = self.project.clone();
        let mut working = self.graph.clone();
        mutation.apply(&mut meta, &mut working)?;

        let revision = self.revision + 1;
        let snapshot = ScheduleSnapshot::derive(&working, meta.start_date, verbosity)?
            .with_revision(revision);

        self.project = meta;
        self.graph = working;
        self.snapshot = Arc::new(snapshot);
        self.revision = revision;
        self.project.updated_at = Utc::now();

        log_changes!(
            verbosity,
            "Applied {} to project {} (revision {}), finish day {}",
            mutation.kind(),
            self.project.id,
            revision,
            self.snapshot.project_finish
        );
        Ok(Arc::clone(&self.snapshot))
    }
}
