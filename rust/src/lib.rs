//! Dependency-aware schedule engine for Gantt-style project planning.
//!
//! Tasks linked by typed precedence constraints form an acyclic graph. Every
//! edit re-derives the earliest feasible dates, slack and critical path of the
//! whole project. The [`Coordinator`] serializes edits per project and
//! publishes each new [`ScheduleSnapshot`] to subscribers.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::NaiveDate;
use pyo3::prelude::*;

pub mod backward_pass;
mod config;
pub mod coordinator;
pub mod critical_path;
pub mod error;
pub mod forward_pass;
pub mod graph;
pub mod interner;
pub mod logging;
mod models;
pub mod snapshot;
pub mod store;

pub use backward_pass::{backward_pass, BackwardPassResult};
pub use config::EngineConfig;
pub use coordinator::{Coordinator, Mutation, MutationKind, ScheduleEvent, Subscription};
pub use critical_path::{calculate_critical_path, CriticalPathResult, TaskTiming};
pub use error::{EngineResult, ErrorKind, ScheduleError};
pub use forward_pass::{forward_pass, ForwardPassResult};
pub use graph::{Edge, TaskGraph};
pub use models::{
    parse_calendar_date, Dependency, DependencyKind, ParseFieldError, Project, ProjectId,
    ProjectUpdate, ScheduleResult, ScheduledTask, Task, TaskColor, TaskId, TaskStatus,
    TaskUpdate,
};
pub use snapshot::ScheduleSnapshot;
pub use store::{JsonFileStore, MemoryStore, ProjectStore, StoreError};

fn value_error(err: impl std::fmt::Display) -> PyErr {
    pyo3::exceptions::PyValueError::new_err(err.to_string())
}

/// A dependency as seen from Python (PyO3 wrapper).
#[pyclass(name = "Dependency")]
#[derive(Clone, Debug)]
pub struct PyDependency {
    #[pyo3(get, set)]
    pub task_id: String,
    /// "start_to_start", "finish_to_start" or "finish_to_finish"
    #[pyo3(get, set)]
    pub kind: String,
}

#[pymethods]
impl PyDependency {
    #[new]
    #[pyo3(signature = (task_id, kind="finish_to_start".to_string()))]
    fn new(task_id: String, kind: String) -> Self {
        Self { task_id, kind }
    }

    fn __repr__(&self) -> String {
        format!("Dependency(task_id={:?}, kind={:?})", self.task_id, self.kind)
    }
}

/// A task as seen from Python (PyO3 wrapper).
///
/// Status and color stay strings here and are validated on conversion.
#[pyclass(name = "Task")]
#[derive(Clone, Debug)]
pub struct PyTask {
    #[pyo3(get, set)]
    pub id: String,
    #[pyo3(get, set)]
    pub name: String,
    #[pyo3(get, set)]
    pub duration_days: u32,
    #[pyo3(get, set)]
    pub start_after: Option<NaiveDate>,
    #[pyo3(get, set)]
    pub status: String,
    #[pyo3(get, set)]
    pub color: String,
    #[pyo3(get, set)]
    pub dependencies: Vec<PyDependency>,
}

#[pymethods]
impl PyTask {
    #[new]
    #[pyo3(signature = (
        id,
        name,
        duration_days,
        start_after=None,
        status="not_started".to_string(),
        color="blue".to_string(),
        dependencies=Vec::new()
    ))]
    fn new(
        id: String,
        name: String,
        duration_days: u32,
        start_after: Option<NaiveDate>,
        status: String,
        color: String,
        dependencies: Vec<PyDependency>,
    ) -> Self {
        Self {
            id,
            name,
            duration_days,
            start_after,
            status,
            color,
            dependencies,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Task(id={:?}, duration_days={}, dependencies={})",
            self.id,
            self.duration_days,
            self.dependencies.len()
        )
    }
}

impl PyTask {
    fn to_task(&self) -> Result<Task, PyErr> {
        let mut task = Task::new(self.id.clone(), self.name.clone(), self.duration_days)
            .with_status(self.status.parse().map_err(value_error)?)
            .with_color(self.color.parse().map_err(value_error)?);
        task.start_after = self.start_after;
        for dep in &self.dependencies {
            let kind: DependencyKind = dep.kind.parse().map_err(value_error)?;
            task = task.with_dependency(dep.task_id.clone(), kind);
        }
        Ok(task)
    }
}

/// Derive a full schedule from a list of tasks.
///
/// Dependencies may be listed in any order. Builds the graph, runs the
/// forward and backward passes, and returns Gantt rows in topological order.
///
/// # Arguments
/// * `tasks` - Tasks with their incoming dependencies
/// * `project_start` - Calendar date of day offset zero
/// * `config` - Engine configuration (verbosity)
///
/// # Raises
/// * ValueError on unknown ids, duplicates, cycles or bad vocabulary
#[pyfunction]
#[pyo3(signature = (tasks, project_start, config=None))]
fn derive_schedule(
    tasks: Vec<PyTask>,
    project_start: NaiveDate,
    config: Option<EngineConfig>,
) -> PyResult<ScheduleResult> {
    let config = config.unwrap_or_default();
    let tasks = tasks
        .iter()
        .map(PyTask::to_task)
        .collect::<PyResult<Vec<_>>>()?;

    schedule_tasks(tasks, project_start, &config).map_err(value_error)
}

/// Derive the schedule of a task list without the Python layer.
pub fn schedule_tasks(
    tasks: Vec<Task>,
    project_start: NaiveDate,
    config: &EngineConfig,
) -> EngineResult<ScheduleResult> {
    let graph = TaskGraph::from_tasks(tasks)?;
    let snapshot = ScheduleSnapshot::derive(&graph, project_start, config.verbosity)?;
    Ok(ScheduleResult {
        scheduled_tasks: snapshot.rows(&graph),
        critical_chain: snapshot.critical_chain.clone(),
        finish_date: snapshot.finish_date(),
    })
}

/// The ganttline.rust Python module.
#[pymodule]
fn rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Core data types
    m.add_class::<PyDependency>()?;
    m.add_class::<PyTask>()?;
    m.add_class::<ScheduledTask>()?;
    m.add_class::<ScheduleResult>()?;

    // Config types
    m.add_class::<EngineConfig>()?;

    // Algorithms
    m.add_function(wrap_pyfunction!(derive_schedule, m)?)?;

    Ok(())
}
