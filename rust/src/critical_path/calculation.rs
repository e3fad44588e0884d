//! Critical path calculation using forward and backward passes.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use crate::backward_pass::{backward_pass, BackwardPassResult};
use crate::error::{EngineResult, ScheduleError};
use crate::forward_pass::{forward_pass, start_lower_bound, ForwardPassResult};
use crate::graph::TaskGraph;
use crate::interner::{TaskIdInt, TaskIdInterner};
use crate::models::{DependencyKind, TaskId};
use crate::log_checks;

use super::chain::critical_chain;
use super::types::{CriticalPathResult, TaskTiming};

/// Pre-computed task data for the schedule passes.
/// All lookups use direct array indexing for O(1) access.
pub struct TaskData {
    /// Task ID string <-> integer mapping, in graph insertion order.
    pub index: TaskIdInterner,
    /// Task durations indexed by task ID.
    pub durations: Vec<i64>,
    /// Earliest allowed start (pinned date or project start) indexed by task ID.
    pub anchors: Vec<i64>,
    /// Incoming edges as (predecessor, kind), indexed by task ID.
    pub deps: Vec<Vec<(TaskIdInt, DependencyKind)>>,
    /// Outgoing edges as (dependent, kind), indexed by task ID.
    pub dependents: Vec<Vec<(TaskIdInt, DependencyKind)>>,
    /// Topological order of all task IDs.
    pub topo_order: Vec<TaskIdInt>,
}

impl TaskData {
    /// Build task data from a graph.
    ///
    /// Pinned start dates become day offsets from `project_start`; unpinned
    /// tasks are anchored at offset 0. Fails with `CycleDetected` if the graph
    /// is cyclic.
    pub fn new(graph: &TaskGraph, project_start: NaiveDate) -> EngineResult<Self> {
        let topo = graph.topological_order()?;
        let index = TaskIdInterner::from_ids(graph.task_ids());
        let n = index.len();

        let mut durations = vec![0; n];
        let mut anchors = vec![0; n];
        let mut deps: Vec<Vec<(TaskIdInt, DependencyKind)>> = vec![Vec::new(); n];
        let mut dependents: Vec<Vec<(TaskIdInt, DependencyKind)>> = vec![Vec::new(); n];

        for task in graph.tasks() {
            let id = lookup(&index, &task.id)?;
            let idx = id as usize;
            durations[idx] = i64::from(task.duration_days);
            anchors[idx] = task
                .start_after
                .map(|date| (date - project_start).num_days())
                .unwrap_or(0);

            for dep in &task.dependencies {
                let dep_id = lookup(&index, &dep.task_id)?;
                deps[idx].push((dep_id, dep.kind));
                dependents[dep_id as usize].push((id, dep.kind));
            }
        }

        let topo_order = topo
            .iter()
            .map(|id| lookup(&index, id))
            .collect::<EngineResult<Vec<_>>>()?;

        Ok(Self {
            index,
            durations,
            anchors,
            deps,
            dependents,
            topo_order,
        })
    }

    /// Get number of tasks.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Task ID string for an interned ID.
    pub fn name(&self, id: TaskIdInt) -> &str {
        self.index.resolve(id).unwrap_or_default()
    }
}

fn lookup(index: &TaskIdInterner, id: &str) -> EngineResult<TaskIdInt> {
    index
        .get(id)
        .ok_or_else(|| ScheduleError::invariant(format!("task '{}' missing from index", id)))
}

/// Calculate timings, slack and the critical path for every task in a graph.
///
/// Tasks with zero slack are on the critical path.
pub fn calculate_critical_path(
    graph: &TaskGraph,
    project_start: NaiveDate,
    verbosity: u8,
) -> EngineResult<CriticalPathResult> {
    let data = TaskData::new(graph, project_start)?;
    calculate_critical_path_with_data(&data, verbosity)
}

/// Calculate the critical path from pre-built task data.
pub fn calculate_critical_path_with_data(
    data: &TaskData,
    verbosity: u8,
) -> EngineResult<CriticalPathResult> {
    let forward = forward_pass(data, verbosity);
    let backward = backward_pass(data, &forward, verbosity);
    verify_timings(data, &forward, &backward)?;

    let mut task_timings: BTreeMap<TaskId, TaskTiming> = BTreeMap::new();
    let mut critical_path_tasks: BTreeSet<TaskId> = BTreeSet::new();
    for id in 0..data.len() {
        let timing = TaskTiming {
            earliest_start: forward.earliest_start[id],
            earliest_finish: forward.earliest_finish[id],
            latest_start: backward.latest_start[id],
            latest_finish: backward.latest_finish[id],
            slack: backward.slack[id],
        };
        let name = data.name(id as TaskIdInt).to_string();
        if timing.is_critical() {
            critical_path_tasks.insert(name.clone());
        }
        task_timings.insert(name, timing);
    }

    let chain: Vec<TaskId> = critical_chain(data, &forward, &backward)
        .into_iter()
        .map(|id| data.name(id).to_string())
        .collect();
    log_checks!(
        verbosity,
        "Critical path: {} of {} tasks, chain [{}], finish at day {}",
        critical_path_tasks.len(),
        data.len(),
        chain.join(" -> "),
        backward.project_finish
    );

    Ok(CriticalPathResult {
        order: data
            .topo_order
            .iter()
            .map(|&id| data.name(id).to_string())
            .collect(),
        task_timings,
        critical_path_tasks,
        critical_chain: chain,
        project_finish: backward.project_finish,
        total_work: data.durations.iter().sum(),
    })
}

/// Check the pass outputs against the graph before they become visible.
fn verify_timings(
    data: &TaskData,
    forward: &ForwardPassResult,
    backward: &BackwardPassResult,
) -> EngineResult<()> {
    let fail = |reason: String| -> EngineResult<()> {
        tracing::error!(%reason, "schedule invariant violated");
        Err(ScheduleError::invariant(reason))
    };

    let n = data.len();
    if forward.earliest_start.len() != n || backward.slack.len() != n {
        return fail(format!(
            "pass results cover {} / {} tasks, graph has {}",
            forward.earliest_start.len(),
            backward.slack.len(),
            n
        ));
    }

    for idx in 0..n {
        let name = data.name(idx as TaskIdInt);
        if forward.earliest_finish[idx] != forward.earliest_start[idx] + data.durations[idx] {
            return fail(format!("task '{}' finish does not match its duration", name));
        }
        if backward.slack[idx] < 0 {
            return fail(format!("task '{}' has negative slack", name));
        }
        for &(dep, kind) in &data.deps[idx] {
            let d = dep as usize;
            let bound = start_lower_bound(
                kind,
                forward.earliest_start[d],
                forward.earliest_finish[d],
                data.durations[idx],
            );
            if forward.earliest_start[idx] < bound {
                return fail(format!(
                    "task '{}' starts before its {} bound from '{}'",
                    name,
                    kind,
                    data.name(dep)
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    fn make_graph(tasks: Vec<(&str, u32, Vec<(&str, DependencyKind)>)>) -> TaskGraph {
        let mut graph = TaskGraph::new();
        for (id, duration, deps) in tasks {
            let mut task = Task::new(id, id, duration);
            for (dep_id, kind) in deps {
                task = task.with_dependency(dep_id, kind);
            }
            graph.add_task(task).unwrap();
        }
        graph
    }

    #[test]
    fn test_single_task_critical_path() {
        let graph = make_graph(vec![("a", 5, vec![])]);
        let result = calculate_critical_path(&graph, start(), 0).unwrap();

        assert_eq!(result.project_finish, 5);
        assert_eq!(result.total_work, 5);
        assert!(result.critical_path_tasks.contains("a"));
        assert_eq!(result.critical_path_tasks.len(), 1);
        assert_eq!(result.critical_chain, vec!["a"]);
    }

    #[test]
    fn test_two_task_scenario() {
        // A(3) -FS-> B(2)
        let graph = make_graph(vec![
            ("A", 3, vec![]),
            ("B", 2, vec![("A", DependencyKind::FinishToStart)]),
        ]);
        let result = calculate_critical_path(&graph, start(), 0).unwrap();

        let a = result.task_timings["A"];
        let b = result.task_timings["B"];
        assert_eq!((a.earliest_start, a.earliest_finish), (0, 3));
        assert_eq!((b.earliest_start, b.earliest_finish), (3, 5));
        assert_eq!(
            result.critical_path_tasks,
            BTreeSet::from(["A".to_string(), "B".to_string()])
        );
        assert_eq!(result.critical_chain, vec!["A", "B"]);
    }

    #[test]
    fn test_parallel_paths_with_slack() {
        // a (2d) -> target (1d)
        // b (5d) -> target (1d)
        let graph = make_graph(vec![
            ("a", 2, vec![]),
            ("b", 5, vec![]),
            (
                "target",
                1,
                vec![
                    ("a", DependencyKind::FinishToStart),
                    ("b", DependencyKind::FinishToStart),
                ],
            ),
        ]);
        let result = calculate_critical_path(&graph, start(), 0).unwrap();

        assert_eq!(result.project_finish, 6);
        assert_eq!(result.total_work, 8);
        assert!(result.critical_path_tasks.contains("b"));
        assert!(result.critical_path_tasks.contains("target"));
        assert!(!result.critical_path_tasks.contains("a"));
        assert_eq!(result.task_timings["a"].slack, 3);
        assert_eq!(result.critical_chain, vec!["b", "target"]);
    }

    #[test]
    fn test_diamond_dependency() {
        // a -> b -> d
        // a -> c -> d
        // Path via c is longer (2 + 5 + 1 = 8)
        let graph = make_graph(vec![
            ("a", 2, vec![]),
            ("b", 3, vec![("a", DependencyKind::FinishToStart)]),
            ("c", 5, vec![("a", DependencyKind::FinishToStart)]),
            (
                "d",
                1,
                vec![
                    ("b", DependencyKind::FinishToStart),
                    ("c", DependencyKind::FinishToStart),
                ],
            ),
        ]);
        let result = calculate_critical_path(&graph, start(), 0).unwrap();

        assert_eq!(result.project_finish, 8);
        assert_eq!(result.task_timings["b"].slack, 2);
        assert_eq!(result.critical_chain, vec!["a", "c", "d"]);
        assert_eq!(result.order, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_start_to_start_and_finish_to_finish() {
        // b starts with a; c must finish no earlier than a.
        let graph = make_graph(vec![
            ("a", 4, vec![]),
            ("b", 2, vec![("a", DependencyKind::StartToStart)]),
            ("c", 1, vec![("a", DependencyKind::FinishToFinish)]),
        ]);
        let result = calculate_critical_path(&graph, start(), 0).unwrap();

        let b = result.task_timings["b"];
        let c = result.task_timings["c"];
        assert_eq!((b.earliest_start, b.earliest_finish), (0, 2));
        assert_eq!((c.earliest_start, c.earliest_finish), (3, 4));

        // b can slip until the project finish; c is pinned to a's finish.
        assert_eq!(b.slack, 2);
        assert_eq!(c.slack, 0);
        assert!(result.critical_path_tasks.contains("a"));
        assert_eq!(result.critical_chain, vec!["a", "c"]);
    }

    #[test]
    fn test_project_finish_comes_from_sinks() {
        // b is the only sink; it starts with a and finishes on day 1.
        let graph = make_graph(vec![
            ("a", 10, vec![]),
            ("b", 1, vec![("a", DependencyKind::StartToStart)]),
        ]);
        let result = calculate_critical_path(&graph, start(), 0).unwrap();

        assert_eq!(result.project_finish, 1);
        assert_eq!(result.task_timings["b"].latest_finish, 1);
        assert_eq!(result.task_timings["b"].slack, 0);
        assert_eq!(result.task_timings["a"].latest_finish, 10);
        assert_eq!(result.task_timings["a"].slack, 0);
        assert_eq!(
            result.critical_path_tasks,
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_pinned_start_raises_anchor() {
        let pinned = start() + chrono::Days::new(4);
        let mut graph = make_graph(vec![("a", 2, vec![])]);
        graph
            .add_task(
                Task::new("b", "b", 1)
                    .with_start_after(pinned)
                    .with_dependency("a", DependencyKind::FinishToStart),
            )
            .unwrap();
        let result = calculate_critical_path(&graph, start(), 0).unwrap();

        assert_eq!(result.task_timings["b"].earliest_start, 4);
        assert_eq!(result.project_finish, 5);
        // a finishes at 2 but b cannot start before 4.
        assert_eq!(result.task_timings["a"].slack, 2);
        assert_eq!(result.critical_chain, vec!["b"]);
    }

    #[test]
    fn test_empty_graph() {
        let result = calculate_critical_path(&TaskGraph::new(), start(), 0).unwrap();
        assert_eq!(result, CriticalPathResult::default());
    }
}
