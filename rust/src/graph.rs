//! Task dependency graph.
//!
//! Tasks own their incoming edges (`Task::dependencies`); the graph keeps a
//! reverse index of outgoing edges so both directions are O(1) to reach.
//! Every mutating method either succeeds completely or leaves the graph
//! untouched.
//!
//! # Removed edges
//!
//! The graph remembers which edges it has removed. Removing one of those again
//! is a benign no-op (`Ok(false)`); removing an edge that never existed fails
//! with `NotFound`.

use rustc_hash::{FxHashMap, FxHashSet};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use crate::error::{EngineResult, ScheduleError};
use crate::models::{Dependency, DependencyKind, Task, TaskId, TaskUpdate};

/// A directed edge `from -> to`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: TaskId,
    pub to: TaskId,
    pub kind: DependencyKind,
}

/// Directed acyclic graph of the tasks in one project.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskGraph {
    tasks: FxHashMap<TaskId, Task>,
    /// Insertion order, used to break ties deterministically.
    order: Vec<TaskId>,
    /// Outgoing edges: predecessor -> dependents, in edge insertion order.
    dependents: FxHashMap<TaskId, Vec<TaskId>>,
    retired: FxHashSet<(TaskId, TaskId)>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from stored tasks without assuming any ordering.
    ///
    /// Dependencies may reference tasks declared later. Fails with
    /// `DuplicateId`, `SelfDependency`, `NotFound` for dangling edges, or
    /// `CycleDetected` listing every edge that lies on a cycle.
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> EngineResult<Self> {
        let graph = Self::from_tasks_unchecked(tasks)?;
        graph.topological_order()?;
        Ok(graph)
    }

    /// Like [`from_tasks`](Self::from_tasks) but accepts cycles, so damaged
    /// stored data can still be inspected. Nothing else is relaxed.
    pub fn from_tasks_unchecked(tasks: impl IntoIterator<Item = Task>) -> EngineResult<Self> {
        let mut graph = Self::new();
        let mut pending: Vec<(TaskId, Vec<Dependency>)> = Vec::new();

        for mut task in tasks {
            if graph.tasks.contains_key(&task.id) {
                return Err(ScheduleError::duplicate_id(task.id));
            }
            let deps = std::mem::take(&mut task.dependencies);
            pending.push((task.id.clone(), deps));
            graph.order.push(task.id.clone());
            graph.tasks.insert(task.id.clone(), task);
        }

        for (to, deps) in pending {
            for dep in deps {
                graph.validate_endpoints(&dep.task_id, &to)?;
                let existing = graph.tasks.get_mut(&to).and_then(|t| {
                    t.dependencies
                        .iter_mut()
                        .find(|d| d.task_id == dep.task_id)
                });
                match existing {
                    Some(existing) => existing.kind = dep.kind,
                    None => graph.insert_edge(dep.task_id, &to, dep.kind),
                }
            }
        }
        Ok(graph)
    }

    /// Returns the number of tasks in the graph
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if the graph has no tasks
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.tasks.contains_key(task_id)
    }

    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.tasks.get(task_id)
    }

    /// Tasks in insertion order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    /// Task ids in insertion order.
    pub fn task_ids(&self) -> impl Iterator<Item = &TaskId> {
        self.order.iter()
    }

    /// Clone the tasks out, in insertion order, for persistence.
    pub fn to_tasks(&self) -> Vec<Task> {
        self.tasks().cloned().collect()
    }

    /// Incoming edges of a task.
    pub fn predecessors(&self, task_id: &str) -> &[Dependency] {
        self.tasks
            .get(task_id)
            .map(|t| t.dependencies.as_slice())
            .unwrap_or(&[])
    }

    /// Tasks that depend on `task_id`.
    pub fn successors(&self, task_id: &str) -> &[TaskId] {
        self.dependents
            .get(task_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Tasks with no incoming edges, in insertion order.
    pub fn roots(&self) -> Vec<TaskId> {
        self.tasks()
            .filter(|t| t.dependencies.is_empty())
            .map(|t| t.id.clone())
            .collect()
    }

    /// Tasks with no outgoing edges, in insertion order.
    pub fn sinks(&self) -> Vec<TaskId> {
        self.order
            .iter()
            .filter(|id| self.successors(id).is_empty())
            .cloned()
            .collect()
    }

    /// All edges, grouped by dependent in insertion order.
    pub fn edges(&self) -> Vec<Edge> {
        self.tasks()
            .flat_map(|task| {
                task.dependencies.iter().map(move |dep| Edge {
                    from: dep.task_id.clone(),
                    to: task.id.clone(),
                    kind: dep.kind,
                })
            })
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.tasks.values().map(|t| t.dependencies.len()).sum()
    }

    /// Adds a task.
    ///
    /// Dependencies declared on the task are wired in as incoming edges. A new
    /// task has no dependents yet, so its incoming edges cannot close a cycle.
    /// A predecessor listed twice keeps its last kind. Reusing the id of a
    /// removed task forgets that task's removed edges.
    pub fn add_task(&mut self, mut task: Task) -> EngineResult<()> {
        if self.tasks.contains_key(&task.id) {
            return Err(ScheduleError::duplicate_id(task.id));
        }

        let mut deps: Vec<Dependency> = Vec::with_capacity(task.dependencies.len());
        for dep in std::mem::take(&mut task.dependencies) {
            if dep.task_id == task.id {
                return Err(ScheduleError::self_dependency(task.id));
            }
            if !self.tasks.contains_key(&dep.task_id) {
                return Err(ScheduleError::task_not_found(&dep.task_id));
            }
            match deps.iter_mut().find(|d| d.task_id == dep.task_id) {
                Some(existing) => existing.kind = dep.kind,
                None => deps.push(dep),
            }
        }

        let id = task.id.clone();
        self.retired.retain(|(from, to)| *from != id && *to != id);
        self.order.push(id.clone());
        self.tasks.insert(id.clone(), task);
        for dep in deps {
            self.insert_edge(dep.task_id, &id, dep.kind);
        }
        Ok(())
    }

    /// Removes a task and every edge touching it, returning the task.
    pub fn remove_task(&mut self, task_id: &str) -> EngineResult<Task> {
        let task = self
            .tasks
            .remove(task_id)
            .ok_or_else(|| ScheduleError::task_not_found(task_id))?;

        for dep in &task.dependencies {
            if let Some(out) = self.dependents.get_mut(&dep.task_id) {
                out.retain(|id| id != task_id);
            }
            self.retired
                .insert((dep.task_id.clone(), task_id.to_string()));
        }

        for succ in self.dependents.remove(task_id).unwrap_or_default() {
            if let Some(dependent) = self.tasks.get_mut(&succ) {
                dependent.dependencies.retain(|d| d.task_id != task_id);
            }
            self.retired.insert((task_id.to_string(), succ));
        }

        self.order.retain(|id| id != task_id);
        Ok(task)
    }

    /// Updates a task's own fields. Edges are untouched.
    pub fn update_task(&mut self, task_id: &str, update: &TaskUpdate) -> EngineResult<()> {
        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| ScheduleError::task_not_found(task_id))?;
        update.apply_to(task);
        Ok(())
    }

    /// Adds a dependency: `to` is constrained by `from` per `kind`.
    ///
    /// Returns an error if:
    /// - Either task doesn't exist
    /// - `from == to`
    /// - `to` already reaches `from`, so the edge would close a cycle
    ///
    /// Re-adding an existing edge replaces its kind.
    pub fn add_dependency(&mut self, from: &str, to: &str, kind: DependencyKind) -> EngineResult<()> {
        self.validate_endpoints(from, to)?;

        if let Some(task) = self.tasks.get_mut(to) {
            if let Some(existing) = task.dependencies.iter_mut().find(|d| d.task_id == from) {
                existing.kind = kind;
                return Ok(());
            }
        }

        if let Some(path) = self.find_path(to, from) {
            let mut edges: Vec<(TaskId, TaskId)> = path
                .windows(2)
                .map(|pair| (pair[0].clone(), pair[1].clone()))
                .collect();
            edges.push((from.to_string(), to.to_string()));
            return Err(ScheduleError::cycle(edges));
        }

        self.insert_edge(from.to_string(), to, kind);
        Ok(())
    }

    /// Removes the edge `from -> to`.
    ///
    /// Returns `Ok(true)` if an edge was removed and `Ok(false)` if it had
    /// already been removed earlier.
    pub fn remove_dependency(&mut self, from: &str, to: &str) -> EngineResult<bool> {
        let removed = match self.tasks.get_mut(to) {
            Some(task) => {
                let before = task.dependencies.len();
                task.dependencies.retain(|d| d.task_id != from);
                task.dependencies.len() != before
            }
            None => false,
        };

        if removed {
            if let Some(out) = self.dependents.get_mut(from) {
                out.retain(|id| id != to);
            }
            self.retired.insert((from.to_string(), to.to_string()));
            return Ok(true);
        }

        if self.retired.contains(&(from.to_string(), to.to_string())) {
            Ok(false)
        } else {
            Err(ScheduleError::edge_not_found(from, to))
        }
    }

    /// Returns a topological ordering of the tasks.
    ///
    /// Kahn's algorithm; among ready tasks the earliest inserted goes first.
    /// Fails with `CycleDetected` if the graph is cyclic.
    pub fn topological_order(&self) -> EngineResult<Vec<TaskId>> {
        let rank: FxHashMap<&str, usize> = self
            .order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut in_degree: Vec<usize> = self
            .order
            .iter()
            .map(|id| self.predecessors(id).len())
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut result = Vec::with_capacity(self.order.len());
        while let Some(Reverse(i)) = ready.pop() {
            let id = &self.order[i];
            result.push(id.clone());
            for succ in self.successors(id) {
                if let Some(&j) = rank.get(succ.as_str()) {
                    in_degree[j] -= 1;
                    if in_degree[j] == 0 {
                        ready.push(Reverse(j));
                    }
                }
            }
        }

        if result.len() != self.order.len() {
            return Err(ScheduleError::cycle(self.cycle_edges()));
        }
        Ok(result)
    }

    /// Edges that lie on at least one cycle, sorted.
    ///
    /// An edge `u -> v` is on a cycle iff `v` reaches `u`. Only used for
    /// diagnostics, so the quadratic worst case is acceptable.
    pub fn cycle_edges(&self) -> Vec<(TaskId, TaskId)> {
        let mut edges: Vec<(TaskId, TaskId)> = self
            .edges()
            .into_iter()
            .filter(|e| self.find_path(&e.to, &e.from).is_some())
            .map(|e| (e.from, e.to))
            .collect();
        edges.sort();
        edges
    }

    /// Returns true if `to` is reachable from `from` along dependency edges.
    pub fn reaches(&self, from: &str, to: &str) -> bool {
        self.find_path(from, to).is_some()
    }

    /// Breadth-first search for a path `start -> ... -> target`.
    fn find_path(&self, start: &str, target: &str) -> Option<Vec<TaskId>> {
        if start == target {
            return Some(vec![start.to_string()]);
        }

        let mut parent: FxHashMap<&str, &str> = FxHashMap::default();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(start);
        parent.insert(start, start);

        while let Some(node) = queue.pop_front() {
            for succ in self.successors(node) {
                let succ = succ.as_str();
                if parent.contains_key(succ) {
                    continue;
                }
                parent.insert(succ, node);
                if succ == target {
                    let mut path = vec![target.to_string()];
                    let mut cursor = target;
                    while cursor != start {
                        cursor = parent[cursor];
                        path.push(cursor.to_string());
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(succ);
            }
        }
        None
    }

    fn validate_endpoints(&self, from: &str, to: &str) -> EngineResult<()> {
        if !self.tasks.contains_key(from) {
            return Err(ScheduleError::task_not_found(from));
        }
        if !self.tasks.contains_key(to) {
            return Err(ScheduleError::task_not_found(to));
        }
        if from == to {
            return Err(ScheduleError::self_dependency(from));
        }
        Ok(())
    }

    /// Inserts an edge whose endpoints are known to exist.
    fn insert_edge(&mut self, from: TaskId, to: &str, kind: DependencyKind) {
        self.retired.remove(&(from.clone(), to.to_string()));
        self.dependents
            .entry(from.clone())
            .or_default()
            .push(to.to_string());
        if let Some(task) = self.tasks.get_mut(to) {
            task.dependencies.push(Dependency::new(from, kind));
        }
    }
}
