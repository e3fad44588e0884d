//! Project registry and mutation entry point.

use chrono::NaiveDate;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{EngineResult, ScheduleError};
use crate::models::{Project, ProjectId, ProjectUpdate, ScheduledTask};
use crate::snapshot::ScheduleSnapshot;
use crate::store::{ProjectStore, StoreError};

use super::events::{EventBus, EventCause, ScheduleEvent, Subscription};
use super::mutation::Mutation;
use super::state::ProjectState;

/// Serializes mutations per project and publishes the resulting snapshots.
///
/// Each project sits behind its own mutex, so mutations on one project run
/// one at a time while different projects proceed in parallel. The registry
/// map is only held long enough to clone the project's handle.
pub struct Coordinator {
    projects: DashMap<ProjectId, Arc<Mutex<ProjectState>>>,
    events: EventBus,
    config: EngineConfig,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Coordinator {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            projects: DashMap::new(),
            events: EventBus::new(config.channel_capacity()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create an empty project with a fresh id and return that id.
    pub fn create_project(
        &self,
        name: impl Into<String>,
        start_date: NaiveDate,
    ) -> EngineResult<ProjectId> {
        let id = Uuid::new_v4().to_string();
        self.load_project(Project::new(id.clone(), name, start_date))?;
        Ok(id)
    }

    /// Register a stored project.
    ///
    /// The project is validated, never repaired: a cyclic or dangling edge
    /// set is reported as `CycleDetected` or `NotFound`.
    pub fn load_project(&self, project: Project) -> EngineResult<Arc<ScheduleSnapshot>> {
        if self.projects.contains_key(&project.id) {
            return Err(ScheduleError::duplicate_id(project.id));
        }

        let id = project.id.clone();
        let state = ProjectState::load(project, self.config.verbosity)?;
        let snapshot = state.snapshot();

        match self.projects.entry(id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(ScheduleError::duplicate_id(id));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(state)));
            }
        }

        self.events.publish(ScheduleEvent {
            project_id: id,
            revision: snapshot.revision,
            cause: EventCause::Loaded,
            snapshot: Arc::clone(&snapshot),
        });
        Ok(snapshot)
    }

    /// Drop a project from the registry, returning its final contents.
    pub fn unload_project(&self, project_id: &str) -> EngineResult<Project> {
        let (_, handle) = self
            .projects
            .remove(project_id)
            .ok_or_else(|| ScheduleError::project_not_found(project_id))?;
        let state = lock(&handle)?;
        Ok(state.to_project())
    }

    /// Apply one mutation to a project.
    ///
    /// On success the new snapshot replaces the old one, is published to
    /// subscribers and returned. On failure nothing changes and nothing is
    /// published.
    pub fn apply_mutation(
        &self,
        project_id: &str,
        mutation: Mutation,
    ) -> EngineResult<Arc<ScheduleSnapshot>> {
        let handle = self.handle(project_id)?;
        let mut state = lock(&handle)?;
        let snapshot = state.apply(&mutation, self.config.verbosity)?;

        // Published under the project lock so events arrive in revision order.
        self.events.publish(ScheduleEvent {
            project_id: project_id.to_string(),
            revision: snapshot.revision,
            cause: EventCause::Mutation(mutation.kind()),
            snapshot: Arc::clone(&snapshot),
        });
        Ok(snapshot)
    }

    /// Edit a project's name, description or start date.
    ///
    /// Goes through [`apply_mutation`](Self::apply_mutation): a new start date
    /// re-derives every date and publishes like any other edit.
    pub fn update_project(
        &self,
        project_id: &str,
        update: ProjectUpdate,
    ) -> EngineResult<Arc<ScheduleSnapshot>> {
        self.apply_mutation(project_id, Mutation::update_project(update))
    }

    /// Apply several mutations in order, stopping at the first failure.
    ///
    /// Each mutation is atomic on its own; earlier ones stay applied.
    pub fn apply_all(
        &self,
        project_id: &str,
        mutations: impl IntoIterator<Item = Mutation>,
    ) -> EngineResult<Arc<ScheduleSnapshot>> {
        let mut last = self.snapshot(project_id)?;
        for mutation in mutations {
            last = self.apply_mutation(project_id, mutation)?;
        }
        Ok(last)
    }

    /// Current snapshot of a project.
    pub fn snapshot(&self, project_id: &str) -> EngineResult<Arc<ScheduleSnapshot>> {
        let handle = self.handle(project_id)?;
        let state = lock(&handle)?;
        Ok(state.snapshot())
    }

    /// Full project, tasks included, for persistence.
    pub fn project(&self, project_id: &str) -> EngineResult<Project> {
        let handle = self.handle(project_id)?;
        let state = lock(&handle)?;
        Ok(state.to_project())
    }

    /// Gantt rows of the current snapshot.
    pub fn rows(&self, project_id: &str) -> EngineResult<Vec<ScheduledTask>> {
        let handle = self.handle(project_id)?;
        let state = lock(&handle)?;
        Ok(state.rows())
    }

    /// Ids of loaded projects, sorted.
    pub fn project_ids(&self) -> Vec<ProjectId> {
        let mut ids: Vec<ProjectId> = self.projects.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe(None)
    }

    pub fn subscribe_project(&self, project_id: impl Into<ProjectId>) -> Subscription {
        self.events.subscribe(Some(project_id.into()))
    }

    /// Load every project a store holds. Returns the ids loaded.
    pub fn load_from_store<S: ProjectStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<Vec<ProjectId>, StoreError> {
        let mut loaded = Vec::new();
        for project in store.load_all()? {
            let id = project.id.clone();
            self.load_project(project)?;
            loaded.push(id);
        }
        Ok(loaded)
    }

    /// Save one project's current contents to a store.
    pub fn persist_to<S: ProjectStore + ?Sized>(
        &self,
        store: &S,
        project_id: &str,
    ) -> Result<(), StoreError> {
        let project = self.project(project_id)?;
        store.save(&project)
    }

    fn handle(&self, project_id: &str) -> EngineResult<Arc<Mutex<ProjectState>>> {
        self.projects
            .get(project_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ScheduleError::project_not_found(project_id))
    }
}

fn lock(handle: &Mutex<ProjectState>) -> EngineResult<MutexGuard<'_, ProjectState>> {
    handle.lock().map_err(|_| {
        tracing::error!("project state lock poisoned");
        ScheduleError::invariant("project state lock poisoned")
    })
}
