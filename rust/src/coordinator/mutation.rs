//! Mutations accepted by the coordinator.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::EngineResult;
use crate::graph::TaskGraph;
use crate::models::{DependencyKind, Project, ProjectUpdate, Task, TaskId, TaskUpdate};

/// One edit to a project: its own fields or its task graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Mutation {
    AddTask {
        task: Task,
    },
    UpdateTask {
        #[serde(rename = "taskId")]
        task_id: TaskId,
        update: TaskUpdate,
    },
    RemoveTask {
        #[serde(rename = "taskId")]
        task_id: TaskId,
    },
    AddDependency {
        from: TaskId,
        to: TaskId,
        #[serde(rename = "type", default)]
        kind: DependencyKind,
    },
    RemoveDependency {
        from: TaskId,
        to: TaskId,
    },
    UpdateProject {
        update: ProjectUpdate,
    },
}

/// Discriminant of a [`Mutation`], carried on published events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    AddTask,
    UpdateTask,
    RemoveTask,
    AddDependency,
    RemoveDependency,
    UpdateProject,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::AddTask => "add_task",
            MutationKind::UpdateTask => "update_task",
            MutationKind::RemoveTask => "remove_task",
            MutationKind::AddDependency => "add_dependency",
            MutationKind::RemoveDependency => "remove_dependency",
            MutationKind::UpdateProject => "update_project",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Mutation {
    pub fn add_task(task: Task) -> Self {
        Mutation::AddTask { task }
    }

    pub fn update_task(task_id: impl Into<TaskId>, update: TaskUpdate) -> Self {
        Mutation::UpdateTask {
            task_id: task_id.into(),
            update,
        }
    }

    pub fn remove_task(task_id: impl Into<TaskId>) -> Self {
        Mutation::RemoveTask {
            task_id: task_id.into(),
        }
    }

    pub fn add_dependency(
        from: impl Into<TaskId>,
        to: impl Into<TaskId>,
        kind: DependencyKind,
    ) -> Self {
        Mutation::AddDependency {
            from: from.into(),
            to: to.into(),
            kind,
        }
    }

    /// Like [`add_dependency`](Self::add_dependency), parsing the kind from
    /// its wire name. Fails with `InvalidDependencyKind`.
    pub fn parse_dependency(
        from: impl Into<TaskId>,
        to: impl Into<TaskId>,
        kind: &str,
    ) -> EngineResult<Self> {
        Ok(Self::add_dependency(from, to, kind.parse()?))
    }

    pub fn remove_dependency(from: impl Into<TaskId>, to: impl Into<TaskId>) -> Self {
        Mutation::RemoveDependency {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn update_project(update: ProjectUpdate) -> Self {
        Mutation::UpdateProject { update }
    }

    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::AddTask { .. } => MutationKind::AddTask,
            Mutation::UpdateTask { .. } => MutationKind::UpdateTask,
            Mutation::RemoveTask { .. } => MutationKind::RemoveTask,
            Mutation::AddDependency { .. } => MutationKind::AddDependency,
            Mutation::RemoveDependency { .. } => MutationKind::RemoveDependency,
            Mutation::UpdateProject { .. } => MutationKind::UpdateProject,
        }
    }

    /// Apply to a project's metadata and its graph.
    ///
    /// On error either may be partially edited; callers apply to copies.
    pub fn apply(&self, project: &mut Project, graph: &mut TaskGraph) -> EngineResult<()> {
        match self {
            Mutation::AddTask { task } => {
                let mut task = task.clone();
                task.project_id = project.id.clone();
                graph.add_task(task)
            }
            Mutation::UpdateTask { task_id, update } => graph.update_task(task_id, update),
            Mutation::RemoveTask { task_id } => graph.remove_task(task_id).map(|_| ()),
            Mutation::AddDependency { from, to, kind } => graph.add_dependency(from, to, *kind),
            Mutation::RemoveDependency { from, to } => {
                graph.remove_dependency(from, to).map(|_| ())
            }
            Mutation::UpdateProject { update } => {
                update.apply_to(project);
                Ok(())
            }
        }
    }
}
