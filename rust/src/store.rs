//! Project persistence.
//!
//! The engine never writes on its own; callers load projects into the
//! coordinator from a [`ProjectStore`] and persist them back after
//! successful mutations.

use dashmap::DashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use crate::error::ScheduleError;
use crate::models::{Project, ProjectId};

/// Errors raised by project stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed project data: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Project not found: {0}")]
    NotFound(ProjectId),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("Store lock poisoned")]
    Poisoned,
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Load/persist contract for projects.
pub trait ProjectStore: Send + Sync {
    /// Every stored project, in storage order.
    fn load_all(&self) -> Result<Vec<Project>, StoreError>;

    fn load(&self, project_id: &str) -> Result<Project, StoreError> {
        self.load_all()?
            .into_iter()
            .find(|p| p.id == project_id)
            .ok_or_else(|| StoreError::NotFound(project_id.to_string()))
    }

    /// Insert or replace a project.
    fn save(&self, project: &Project) -> Result<(), StoreError>;

    /// Returns false if there was nothing to delete.
    fn delete(&self, project_id: &str) -> Result<bool, StoreError>;

    fn list_ids(&self) -> Result<Vec<ProjectId>, StoreError> {
        Ok(self.load_all()?.into_iter().map(|p| p.id).collect())
    }
}

/// Volatile store, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    projects: DashMap<ProjectId, Project>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

impl ProjectStore for MemoryStore {
    /// Sorted by id; the map keeps no insertion order.
    fn load_all(&self) -> Result<Vec<Project>, StoreError> {
        let mut projects: Vec<Project> = self.projects.iter().map(|e| e.value().clone()).collect();
        projects.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(projects)
    }

    fn load(&self, project_id: &str) -> Result<Project, StoreError> {
        self.projects
            .get(project_id)
            .map(|e| e.value().clone())
            .ok_or_else(|| StoreError::NotFound(project_id.to_string()))
    }

    fn save(&self, project: &Project) -> Result<(), StoreError> {
        self.projects.insert(project.id.clone(), project.clone());
        Ok(())
    }

    fn delete(&self, project_id: &str) -> Result<bool, StoreError> {
        Ok(self.projects.remove(project_id).is_some())
    }
}

/// All projects in one JSON array file.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash never leaves a half-written file. A missing file reads as empty.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<Project>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::io(&self.path, err)),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn write(&self, projects: &[Project]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(projects)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::io(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), count = projects.len(), "wrote project file");
        Ok(())
    }

    /// Read-modify-write under the store's lock.
    fn update<T>(
        &self,
        edit: impl FnOnce(&mut Vec<Project>) -> T,
    ) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut projects = self.read()?;
        let result = edit(&mut projects);
        self.write(&projects)?;
        Ok(result)
    }
}

impl ProjectStore for JsonFileStore {
    fn load_all(&self) -> Result<Vec<Project>, StoreError> {
        self.read()
    }

    fn save(&self, project: &Project) -> Result<(), StoreError> {
        self.update(|projects| {
            match projects.iter_mut().find(|p| p.id == project.id) {
                Some(existing) => *existing = project.clone(),
                None => projects.push(project.clone()),
            }
        })
    }

    fn delete(&self, project_id: &str) -> Result<bool, StoreError> {
        self.update(|projects| {
            let before = projects.len();
            projects.retain(|p| p.id != project_id);
            projects.len() != before
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{Coordinator, Mutation};
    use crate::error::ErrorKind;
    use crate::models::{DependencyKind, Task};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    fn project(id: &str) -> Project {
        Project::new(id, "Launch", start())
            .with_task(Task::new("A", "Design", 3))
            .with_task(Task::new("B", "Build", 2).with_dependency("A", DependencyKind::FinishToStart))
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        store.save(&project("b")).unwrap();
        store.save(&project("a")).unwrap();

        assert_eq!(store.list_ids().unwrap(), vec!["a", "b"]);
        assert_eq!(store.load("a").unwrap().tasks.len(), 2);
        assert!(matches!(store.load("z"), Err(StoreError::NotFound(_))));
        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_json_file_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("projects.json"));
        assert!(store.load_all().unwrap().is_empty());

        let second = project("p2");
        store.save(&project("p1")).unwrap();
        store.save(&second).unwrap();
        let mut renamed = project("p1");
        renamed.name = "Relaunch".to_string();
        store.save(&renamed).unwrap();

        let reopened = JsonFileStore::new(store.path());
        let loaded = reopened.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], renamed);
        assert_eq!(reopened.load("p2").unwrap(), second);
        assert!(!dir.path().join("projects.json.tmp").exists());
    }

    #[test]
    fn test_json_file_uses_camel_case_fields() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("projects.json"));
        store.save(&project("p1")).unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\"startDate\""));
        assert!(text.contains("\"taskId\": \"A\""));
        assert!(text.contains("\"type\": \"finish_to_start\""));
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("projects.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(path);
        assert!(matches!(store.load_all(), Err(StoreError::Serde(_))));
    }

    #[test]
    fn test_coordinator_load_and_persist() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("projects.json"));
        store.save(&project("p1")).unwrap();

        let coordinator = Coordinator::default();
        assert_eq!(coordinator.load_from_store(&store).unwrap(), vec!["p1"]);

        coordinator
            .apply_mutation("p1", Mutation::add_task(Task::new("C", "Ship", 1)))
            .unwrap();
        coordinator.persist_to(&store, "p1").unwrap();

        let stored = store.load("p1").unwrap();
        assert_eq!(stored.tasks.len(), 3);
        assert_eq!(stored.task("C").unwrap().project_id, "p1");
    }

    #[test]
    fn test_coordinator_loads_date_span_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("projects.json");
        fs::write(
            &path,
            r#"[{
                "id": "site",
                "name": "Website",
                "description": "",
                "createdAt": "2025-01-02T09:30:00.000Z",
                "updatedAt": "2025-01-02T09:30:00.000Z",
                "tasks": [
                    {"id": "t1", "name": "Design", "description": "",
                     "startDate": "2025-01-06T00:00:00.000Z", "endDate": "2025-01-09T00:00:00.000Z",
                     "status": "completed", "color": "blue", "dependencies": [], "projectId": "site"},
                    {"id": "t2", "name": "Build", "description": "",
                     "startDate": "2025-01-09T00:00:00.000Z", "endDate": "2025-01-11T00:00:00.000Z",
                     "status": "not_started", "color": "green",
                     "dependencies": [{"taskId": "t1", "type": "finish_to_start"}], "projectId": "site"}
                ]
            }]"#,
        )
        .unwrap();

        let store = JsonFileStore::new(path);
        let coordinator = Coordinator::default();
        assert_eq!(coordinator.load_from_store(&store).unwrap(), vec!["site"]);

        let snapshot = coordinator.snapshot("site").unwrap();
        assert_eq!(snapshot.project_start, start());
        assert_eq!(snapshot.timing("t2").unwrap().earliest_start, 3);
        assert_eq!(snapshot.finish_date(), NaiveDate::from_ymd_opt(2025, 1, 11).unwrap());

        // Written back in the engine's own shape.
        coordinator.persist_to(&store, "site").unwrap();
        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\"durationDays\": 2"));
        assert_eq!(store.load("site").unwrap().start_date, start());
    }

    #[test]
    fn test_cyclic_stored_project_is_reported() {
        let store = MemoryStore::new();
        let mut broken = project("p1");
        broken.tasks[0]
            .dependencies
            .push(crate::models::Dependency::new("B", DependencyKind::FinishToStart));
        store.save(&broken).unwrap();

        let coordinator = Coordinator::default();
        match coordinator.load_from_store(&store) {
            Err(StoreError::Schedule(err)) => assert_eq!(err.kind(), ErrorKind::CycleDetected),
            other => panic!("expected a cycle, got {:?}", other),
        }
        assert!(coordinator.project_ids().is_empty());
    }
}
