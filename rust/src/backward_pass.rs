//! Backward pass: latest finish and slack for every task.
//!
//! The project finish is the latest earliest-finish among sinks (tasks nothing
//! depends on), and every sink is pinned to it. Other tasks are visited in
//! reverse topological order and get the tightest bound their outgoing edges
//! allow, the dual of the forward relations:
//!
//! - `finish_to_start`: `finish(from) <= latest_start(to)`
//! - `start_to_start`: `finish(from) <= latest_start(to) + duration(from)`
//! - `finish_to_finish`: `finish(from) <= latest_finish(to)`

use crate::critical_path::TaskData;
use crate::forward_pass::ForwardPassResult;
use crate::log_debug;
use crate::models::DependencyKind;

/// Result from the backward pass, indexed by interned task ID.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackwardPassResult {
    pub latest_start: Vec<i64>,
    pub latest_finish: Vec<i64>,
    /// latest_finish - earliest_finish; never negative.
    pub slack: Vec<i64>,
    /// Overall project finish (max earliest finish over sinks).
    pub project_finish: i64,
}

/// Upper bound an edge places on its predecessor's finish.
#[inline]
pub fn finish_upper_bound(
    kind: DependencyKind,
    from_duration: i64,
    to_latest_start: i64,
    to_latest_finish: i64,
) -> i64 {
    match kind {
        DependencyKind::FinishToStart => to_latest_start,
        DependencyKind::StartToStart => to_latest_start + from_duration,
        DependencyKind::FinishToFinish => to_latest_finish,
    }
}

/// Run the backward pass given the forward pass result. O(V+E).
pub fn backward_pass(
    data: &TaskData,
    forward: &ForwardPassResult,
    verbosity: u8,
) -> BackwardPassResult {
    let n = data.len();
    let project_finish = (0..n)
        .filter(|&idx| data.dependents[idx].is_empty())
        .map(|idx| forward.earliest_finish[idx])
        .max()
        .unwrap_or(0);

    let mut latest_start = vec![0; n];
    let mut latest_finish = vec![0; n];
    let mut slack = vec![0; n];

    for &task_int in data.topo_order.iter().rev() {
        let idx = task_int as usize;
        let duration = data.durations[idx];

        let finish = data.dependents[idx]
            .iter()
            .map(|&(dependent_int, kind)| {
                let dep_idx = dependent_int as usize;
                finish_upper_bound(kind, duration, latest_start[dep_idx], latest_finish[dep_idx])
            })
            .min()
            .unwrap_or(project_finish);

        latest_finish[idx] = finish;
        latest_start[idx] = finish - duration;
        slack[idx] = finish - forward.earliest_finish[idx];
        log_debug!(
            verbosity,
            "Backward: {} latest finish day {} slack {}",
            data.name(task_int),
            finish,
            slack[idx]
        );
    }

    BackwardPassResult {
        latest_start,
        latest_finish,
        slack,
        project_finish,
    }
}
