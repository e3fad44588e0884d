//! Selection of the single highlighted critical chain.
//!
//! Several zero-slack chains can exist. The one reported is chosen greedily,
//! from the end backwards; chains are not compared as whole sequences:
//!
//! 1. The chain ends at the sink finishing at the project finish with the
//!    smallest id. Such a sink always has zero slack.
//! 2. Walking backwards, the next task is the critical predecessor with the
//!    smallest id whose edge is tight, i.e. actually determines the current
//!    task's earliest start.
//! 3. The walk stops at a task with no such predecessor.
//!
//! So with zero-slack chains `a -> z` and `b -> c`, the chain is `b -> c`
//! because `c < z`, even though `a -> z` sorts first as a sequence.

use crate::backward_pass::BackwardPassResult;
use crate::forward_pass::{start_lower_bound, ForwardPassResult};
use crate::interner::TaskIdInt;

use super::calculation::TaskData;

/// Returns the highlighted critical chain, source first.
pub fn critical_chain(
    data: &TaskData,
    forward: &ForwardPassResult,
    backward: &BackwardPassResult,
) -> Vec<TaskIdInt> {
    let is_critical = |idx: usize| backward.slack[idx] == 0;

    let terminal = (0..data.len())
        .filter(|&idx| {
            data.dependents[idx].is_empty()
                && is_critical(idx)
                && forward.earliest_finish[idx] == backward.project_finish
        })
        .map(|idx| idx as TaskIdInt)
        .min_by(|&a, &b| data.name(a).cmp(data.name(b)));

    let Some(mut current) = terminal else {
        return Vec::new();
    };

    let mut chain = vec![current];
    loop {
        let idx = current as usize;
        let previous = data.deps[idx]
            .iter()
            .filter(|&&(dep, kind)| {
                let d = dep as usize;
                is_critical(d)
                    && start_lower_bound(
                        kind,
                        forward.earliest_start[d],
                        forward.earliest_finish[d],
                        data.durations[idx],
                    ) == forward.earliest_start[idx]
            })
            .map(|&(dep, _)| dep)
            .min_by(|&a, &b| data.name(a).cmp(data.name(b)));

        match previous {
            Some(dep) => {
                chain.push(dep);
                current = dep;
            }
            None => break,
        }
    }

    chain.reverse();
    chain
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::critical_path::calculate_critical_path;
    use crate::graph::TaskGraph;
    use crate::models::{DependencyKind, Task};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    #[test]
    fn test_tie_breaking_by_task_id() {
        // Two equal branches: x and y both take 3 days before z.
        let mut graph = TaskGraph::new();
        graph.add_task(Task::new("root", "root", 1)).unwrap();
        for id in ["y", "x"] {
            graph
                .add_task(Task::new(id, id, 3).with_dependency("root", DependencyKind::FinishToStart))
                .unwrap();
        }
        graph
            .add_task(
                Task::new("z", "z", 1)
                    .with_dependency("y", DependencyKind::FinishToStart)
                    .with_dependency("x", DependencyKind::FinishToStart),
            )
            .unwrap();

        let result = calculate_critical_path(&graph, start(), 0).unwrap();

        assert_eq!(result.critical_path_tasks.len(), 4);
        assert_eq!(result.critical_chain, vec!["root", "x", "z"]);
    }

    #[test]
    fn test_prefers_sink_terminal() {
        // "a" and "b" both finish at day 4, only "b" has no dependents.
        let mut graph = TaskGraph::new();
        graph.add_task(Task::new("a", "a", 4)).unwrap();
        graph
            .add_task(Task::new("b", "b", 0).with_dependency("a", DependencyKind::FinishToStart))
            .unwrap();

        let result = calculate_critical_path(&graph, start(), 0).unwrap();
        assert_eq!(result.critical_chain, vec!["a", "b"]);
    }

    #[test]
    fn test_greedy_from_the_end() {
        // Two independent zero-slack chains of equal length: a -> z, b -> c.
        let mut graph = TaskGraph::new();
        for (id, dep) in [("a", None), ("z", Some("a")), ("b", None), ("c", Some("b"))] {
            let mut task = Task::new(id, id, 2);
            if let Some(dep) = dep {
                task = task.with_dependency(dep, DependencyKind::FinishToStart);
            }
            graph.add_task(task).unwrap();
        }

        let result = calculate_critical_path(&graph, start(), 0).unwrap();
        assert_eq!(result.critical_path_tasks.len(), 4);
        assert_eq!(result.critical_chain, vec!["b", "c"]);
    }

    #[test]
    fn test_start_to_start_sink_ends_chain() {
        let mut graph = TaskGraph::new();
        graph.add_task(Task::new("a", "a", 10)).unwrap();
        graph
            .add_task(Task::new("b", "b", 1).with_dependency("a", DependencyKind::StartToStart))
            .unwrap();

        let result = calculate_critical_path(&graph, start(), 0).unwrap();
        assert_eq!(result.critical_chain, vec!["a", "b"]);
    }

    #[test]
    fn test_milestone_in_chain() {
        let mut graph = TaskGraph::new();
        graph.add_task(Task::new("a", "a", 2)).unwrap();
        graph
            .add_task(Task::new("gate", "gate", 0).with_dependency("a", DependencyKind::FinishToStart))
            .unwrap();
        graph
            .add_task(Task::new("c", "c", 3).with_dependency("gate", DependencyKind::FinishToStart))
            .unwrap();

        let result = calculate_critical_path(&graph, start(), 0).unwrap();
        assert_eq!(result.task_timings["gate"].earliest_start, 2);
        assert_eq!(result.task_timings["gate"].earliest_finish, 2);
        assert_eq!(result.critical_chain, vec!["a", "gate", "c"]);
    }
}
