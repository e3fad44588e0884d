//! Core data types for the scheduling system.

use chrono::{DateTime, NaiveDate, Utc};
use pyo3::prelude::*;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::{EngineResult, ScheduleError};

/// Task identifier, unique within a project.
pub type TaskId = String;

/// Project identifier.
pub type ProjectId = String;

/// Error for status/color strings outside their vocabulary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown {field} value: {value:?}")]
pub struct ParseFieldError {
    pub field: &'static str,
    pub value: String,
}

/// How a dependency constrains its dependent task.
///
/// Serialized as `start_to_start`, `finish_to_start` or `finish_to_finish`;
/// anything else fails with `InvalidDependencyKind`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DependencyKind {
    /// The dependent cannot start before the predecessor starts.
    StartToStart,
    /// The dependent cannot start before the predecessor finishes.
    #[default]
    FinishToStart,
    /// The dependent cannot finish before the predecessor finishes.
    FinishToFinish,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 3] = [
        DependencyKind::StartToStart,
        DependencyKind::FinishToStart,
        DependencyKind::FinishToFinish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartToStart => "start_to_start",
            Self::FinishToStart => "finish_to_start",
            Self::FinishToFinish => "finish_to_finish",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyKind {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start_to_start" => Ok(Self::StartToStart),
            "finish_to_start" => Ok(Self::FinishToStart),
            "finish_to_finish" => Ok(Self::FinishToFinish),
            other => Err(ScheduleError::invalid_kind(other)),
        }
    }
}

impl TryFrom<String> for DependencyKind {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DependencyKind> for String {
    fn from(kind: DependencyKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Workflow status of a task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Blocked,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Blocked => "blocked",
        }
    }

    /// Progress shown on the Gantt bar.
    ///
    /// Display only: the schedule never reads it.
    pub fn percent_complete(&self) -> u8 {
        match self {
            Self::Completed => 100,
            Self::InProgress => 50,
            Self::NotStarted | Self::Blocked => 0,
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "blocked" => Ok(Self::Blocked),
            other => Err(ParseFieldError {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// Display color of a task bar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskColor {
    #[default]
    Blue,
    Green,
    Orange,
    Purple,
    Red,
    Yellow,
}

impl TaskColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Green => "green",
            Self::Orange => "orange",
            Self::Purple => "purple",
            Self::Red => "red",
            Self::Yellow => "yellow",
        }
    }
}

impl FromStr for TaskColor {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blue" => Ok(Self::Blue),
            "green" => Ok(Self::Green),
            "orange" => Ok(Self::Orange),
            "purple" => Ok(Self::Purple),
            "red" => Ok(Self::Red),
            "yellow" => Ok(Self::Yellow),
            other => Err(ParseFieldError {
                field: "color",
                value: other.to_string(),
            }),
        }
    }
}

/// An incoming dependency, stored on the dependent task.
///
/// `task_id` is the predecessor: the owning task is constrained by
/// `task_id`'s start or finish according to `kind`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub task_id: TaskId,
    #[serde(rename = "type", default)]
    pub kind: DependencyKind,
}

impl Dependency {
    pub fn new(task_id: impl Into<TaskId>, kind: DependencyKind) -> Self {
        Self {
            task_id: task_id.into(),
            kind,
        }
    }
}

/// Parse a calendar date given either as `YYYY-MM-DD` or as an RFC 3339
/// timestamp. Timestamps keep their UTC date.
pub fn parse_calendar_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").or_else(|_| {
        DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

fn de_opt_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| {
            parse_calendar_date(&raw)
                .map_err(|e| de::Error::custom(format!("invalid date {:?}: {}", raw, e)))
        })
        .transpose()
}

/// A task to be scheduled.
///
/// Deserializes from either shape: `durationDays` with an optional
/// `startAfter`, or a `startDate`/`endDate` span as older project files store
/// it (see [`Task::from_dates`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "TaskRecord")]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Intrinsic duration in whole days; zero marks a milestone.
    pub duration_days: u32,
    /// Pinned earliest start; the task never starts before this date.
    #[serde(default)]
    pub start_after: Option<NaiveDate>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub color: TaskColor,
    #[serde(default)]
    pub project_id: ProjectId,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, name: impl Into<String>, duration_days: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            duration_days,
            start_after: None,
            status: TaskStatus::default(),
            color: TaskColor::default(),
            project_id: ProjectId::new(),
            dependencies: Vec::new(),
        }
    }

    /// Build a task from the start/end dates a Gantt form supplies.
    ///
    /// The start date becomes the pinned start and the span in whole days the
    /// duration. `end` is exclusive, so `start == end` gives a milestone.
    pub fn from_dates(
        id: impl Into<TaskId>,
        name: impl Into<String>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> EngineResult<Self> {
        let id = id.into();
        let days = (end - start).num_days();
        if days < 0 {
            return Err(ScheduleError::InvalidDates {
                task_id: id,
                start,
                end,
            });
        }
        let duration_days = u32::try_from(days)
            .map_err(|_| ScheduleError::invariant(format!("task '{}' spans {} days", id, days)))?;
        Ok(Self::new(id, name, duration_days).with_start_after(start))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_start_after(mut self, date: NaiveDate) -> Self {
        self.start_after = Some(date);
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_color(mut self, color: TaskColor) -> Self {
        self.color = color;
        self
    }

    pub fn with_dependency(mut self, task_id: impl Into<TaskId>, kind: DependencyKind) -> Self {
        self.dependencies.push(Dependency::new(task_id, kind));
        self
    }

    /// Returns the incoming dependency from `task_id`, if any.
    pub fn dependency_on(&self, task_id: &str) -> Option<&Dependency> {
        self.dependencies.iter().find(|d| d.task_id == task_id)
    }
}

/// Stored form of a task, before its duration is settled.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    id: TaskId,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    duration_days: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_date")]
    start_after: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de_opt_date")]
    start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de_opt_date")]
    end_date: Option<NaiveDate>,
    #[serde(default)]
    status: TaskStatus,
    #[serde(default)]
    color: TaskColor,
    #[serde(default)]
    project_id: ProjectId,
    #[serde(default)]
    dependencies: Vec<Dependency>,
}

impl TryFrom<TaskRecord> for Task {
    type Error = ScheduleError;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        let TaskRecord {
            id,
            name,
            description,
            duration_days,
            start_after,
            start_date,
            end_date,
            status,
            color,
            project_id,
            dependencies,
        } = record;

        let mut task = match (duration_days, start_date, end_date) {
            (Some(days), _, _) => {
                let mut task = Task::new(id, name, days);
                task.start_after = start_after.or(start_date);
                task
            }
            (None, Some(start), Some(end)) => Task::from_dates(id, name, start, end)?,
            (None, _, _) => {
                return Err(ScheduleError::NotFound {
                    what: format!("duration or start/end dates of task '{}'", id),
                })
            }
        };
        task.description = description;
        task.status = status;
        task.color = color;
        task.project_id = project_id;
        task.dependencies = dependencies;
        Ok(task)
    }
}

/// Partial update of a task's own fields.
///
/// Dependencies are edited through dedicated mutations, and id/project are
/// immutable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration_days: Option<u32>,
    /// `Some(None)` clears the pinned start.
    #[serde(default)]
    pub start_after: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub color: Option<TaskColor>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(name) = &self.name {
            task.name = name.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(duration_days) = self.duration_days {
            task.duration_days = duration_days;
        }
        if let Some(start_after) = self.start_after {
            task.start_after = start_after;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(color) = self.color {
            task.color = color;
        }
    }
}

/// A named container owning a set of tasks and their dependencies.
///
/// A stored project without `startDate` starts on its earliest pinned task
/// start, or else on the day it was created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ProjectRecord")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Calendar date of day offset zero.
    pub start_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Project {
    pub fn new(id: impl Into<ProjectId>, name: impl Into<String>, start_date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            start_date,
            created_at: now,
            updated_at: now,
            tasks: Vec::new(),
        }
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectRecord {
    id: ProjectId,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default, deserialize_with = "de_opt_date")]
    start_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    tasks: Vec<Task>,
}

impl From<ProjectRecord> for Project {
    fn from(record: ProjectRecord) -> Self {
        let start_date = record
            .start_date
            .or_else(|| record.tasks.iter().filter_map(|t| t.start_after).min())
            .unwrap_or_else(|| record.created_at.date_naive());
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            start_date,
            created_at: record.created_at,
            updated_at: record.updated_at,
            tasks: record.tasks,
        }
    }
}

/// Partial update of a project's own fields. Moving `start_date` shifts
/// every unpinned task.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

impl ProjectUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name = name.clone();
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
        if let Some(start_date) = self.start_date {
            project.start_date = start_date;
        }
    }
}

/// A scheduled task, ready for a Gantt row.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTask {
    #[pyo3(get)]
    pub task_id: TaskId,
    #[pyo3(get)]
    pub name: String,
    #[pyo3(get)]
    pub start_date: NaiveDate,
    /// Exclusive: the date the task finishes on.
    #[pyo3(get)]
    pub end_date: NaiveDate,
    #[pyo3(get)]
    pub duration_days: u32,
    #[pyo3(get)]
    pub slack_days: i64,
    #[pyo3(get)]
    pub critical: bool,
    #[pyo3(get)]
    pub percent_complete: u8,
    #[pyo3(get)]
    pub color: String,
    #[pyo3(get)]
    pub dependencies: Vec<TaskId>,
}

#[pymethods]
impl ScheduledTask {
    fn __repr__(&self) -> String {
        format!(
            "ScheduledTask(task_id={:?}, start={}, end={}, slack={}, critical={})",
            self.task_id, self.start_date, self.end_date, self.slack_days, self.critical
        )
    }
}

/// Result of deriving a schedule through the Python API.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleResult {
    #[pyo3(get)]
    pub scheduled_tasks: Vec<ScheduledTask>,
    #[pyo3(get)]
    pub critical_chain: Vec<TaskId>,
    #[pyo3(get)]
    pub finish_date: NaiveDate,
}

#[pymethods]
impl ScheduleResult {
    fn __repr__(&self) -> String {
        format!(
            "ScheduleResult(scheduled_tasks={}, critical_chain={}, finish={})",
            self.scheduled_tasks.len(),
            self.critical_chain.len(),
            self.finish_date
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_dependency_kind_vocabulary() {
        for kind in DependencyKind::ALL {
            assert_eq!(kind.as_str().parse::<DependencyKind>().unwrap(), kind);
        }

        let err = "start_to_finish".parse::<DependencyKind>().unwrap_err();
        assert_eq!(err, ScheduleError::invalid_kind("start_to_finish"));
    }

    #[test]
    fn test_dependency_kind_rejected_in_json() {
        let err = serde_json::from_str::<Dependency>(r#"{"taskId":"a","type":"blocks"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("Invalid dependency kind"));

        let dep: Dependency =
            serde_json::from_str(r#"{"taskId":"a","type":"finish_to_finish"}"#).unwrap();
        assert_eq!(dep, Dependency::new("a", DependencyKind::FinishToFinish));
    }

    #[test]
    fn test_percent_complete_lookup() {
        assert_eq!(TaskStatus::Completed.percent_complete(), 100);
        assert_eq!(TaskStatus::InProgress.percent_complete(), 50);
        assert_eq!(TaskStatus::NotStarted.percent_complete(), 0);
        assert_eq!(TaskStatus::Blocked.percent_complete(), 0);
    }

    #[test]
    fn test_from_dates() {
        let task = Task::from_dates("a", "Design", date(2025, 3, 3), date(2025, 3, 8)).unwrap();
        assert_eq!(task.duration_days, 5);
        assert_eq!(task.start_after, Some(date(2025, 3, 3)));

        let milestone =
            Task::from_dates("m", "Launch", date(2025, 3, 8), date(2025, 3, 8)).unwrap();
        assert_eq!(milestone.duration_days, 0);

        let err = Task::from_dates("b", "Oops", date(2025, 3, 8), date(2025, 3, 3)).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidDates { .. }));
    }

    #[test]
    fn test_task_update_apply() {
        let mut task = Task::new("a", "Draft", 3).with_start_after(date(2025, 1, 6));
        let update = TaskUpdate {
            duration_days: Some(5),
            start_after: Some(None),
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        };
        assert!(!update.is_empty());
        update.apply_to(&mut task);

        assert_eq!(task.name, "Draft");
        assert_eq!(task.duration_days, 5);
        assert_eq!(task.start_after, None);
        assert_eq!(task.status, TaskStatus::InProgress);
    }

    #[test]
    fn test_status_and_color_parse() {
        assert_eq!("blocked".parse::<TaskStatus>().unwrap(), TaskStatus::Blocked);
        assert_eq!("purple".parse::<TaskColor>().unwrap(), TaskColor::Purple);
        assert!("teal".parse::<TaskColor>().is_err());
    }

    #[test]
    fn test_loads_date_span_project_file() {
        let json = r#"[{
            "id": "p1",
            "name": "Website",
            "description": "Relaunch",
            "createdAt": "2025-01-02T09:30:00.000Z",
            "updatedAt": "2025-01-03T10:00:00.000Z",
            "tasks": [
                {
                    "id": "t1",
                    "name": "Design",
                    "description": "",
                    "startDate": "2025-01-06T00:00:00.000Z",
                    "endDate": "2025-01-09T00:00:00.000Z",
                    "status": "in_progress",
                    "color": "green",
                    "dependencies": [],
                    "projectId": "p1"
                },
                {
                    "id": "t2",
                    "name": "Build",
                    "description": "",
                    "startDate": "2025-01-09T00:00:00.000Z",
                    "endDate": "2025-01-09T00:00:00.000Z",
                    "status": "not_started",
                    "color": "blue",
                    "dependencies": [{"taskId": "t1", "type": "finish_to_start"}],
                    "projectId": "p1"
                }
            ]
        }]"#;
        let projects: Vec<Project> = serde_json::from_str(json).unwrap();
        let project = &projects[0];

        assert_eq!(project.start_date, date(2025, 1, 6));
        let design = project.task("t1").unwrap();
        assert_eq!(design.duration_days, 3);
        assert_eq!(design.start_after, Some(date(2025, 1, 6)));
        assert_eq!(design.status, TaskStatus::InProgress);
        let build = project.task("t2").unwrap();
        assert_eq!(build.duration_days, 0);
        assert_eq!(build.dependencies, vec![Dependency::new("t1", DependencyKind::FinishToStart)]);
    }

    #[test]
    fn test_task_json_needs_a_duration() {
        let err = serde_json::from_str::<Task>(r#"{"id":"a","name":"A"}"#).unwrap_err();
        assert!(err.to_string().contains("duration or start/end dates of task 'a'"));

        let err = serde_json::from_str::<Task>(
            r#"{"id":"a","name":"A","startDate":"2025-01-09","endDate":"2025-01-06"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("ends on 2025-01-06"));
    }

    #[test]
    fn test_project_without_dates_starts_when_created() {
        let project: Project = serde_json::from_str(
            r#"{"id":"p","name":"Empty","createdAt":"2025-02-01T08:00:00Z","updatedAt":"2025-02-01T08:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(project.start_date, date(2025, 2, 1));
    }

    #[test]
    fn test_project_json_roundtrip() {
        let project = Project::new("p1", "Website", date(2025, 1, 6)).with_task(
            Task::new("a", "Design", 3).with_start_after(date(2025, 1, 8)),
        );
        let json = serde_json::to_string(&project).unwrap();
        assert_eq!(serde_json::from_str::<Project>(&json).unwrap(), project);
    }

    #[test]
    fn test_project_update_apply() {
        let mut project = Project::new("p1", "Website", date(2025, 1, 6));
        let update = ProjectUpdate {
            name: Some("Relaunch".to_string()),
            start_date: Some(date(2025, 2, 3)),
            ..Default::default()
        };
        assert!(!update.is_empty());
        update.apply_to(&mut project);

        assert_eq!(project.name, "Relaunch");
        assert_eq!(project.description, "");
        assert_eq!(project.start_date, date(2025, 2, 3));
        assert!(ProjectUpdate::default().is_empty());
    }

    #[test]
    fn test_project_json_shape() {
        let project = Project::new("p1", "Website", date(2025, 1, 6)).with_task(
            Task::new("b", "Build", 2).with_dependency("a", DependencyKind::FinishToStart),
        );
        let value = serde_json::to_value(&project).unwrap();

        assert_eq!(value["startDate"], "2025-01-06");
        assert_eq!(value["tasks"][0]["durationDays"], 2);
        assert_eq!(value["tasks"][0]["status"], "not_started");
        assert_eq!(value["tasks"][0]["dependencies"][0]["taskId"], "a");
        assert_eq!(value["tasks"][0]["dependencies"][0]["type"], "finish_to_start");
    }
}
