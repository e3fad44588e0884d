//! Forward pass: earliest feasible start and finish for every task.
//!
//! Tasks are visited once in topological order, so every predecessor is
//! final before its dependents are looked at. A task starts at the latest of
//! its anchor and the bounds its incoming edges impose:
//!
//! - `finish_to_start`: `start(to) >= finish(from)`
//! - `start_to_start`: `start(to) >= start(from)`
//! - `finish_to_finish`: `start(to) >= finish(from) - duration(to)`

use crate::critical_path::TaskData;
use crate::log_debug;
use crate::models::DependencyKind;

/// Earliest start/finish offsets, indexed by interned task ID.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ForwardPassResult {
    pub earliest_start: Vec<i64>,
    pub earliest_finish: Vec<i64>,
}

/// Lower bound an edge places on its dependent's start.
#[inline]
pub fn start_lower_bound(
    kind: DependencyKind,
    from_start: i64,
    from_finish: i64,
    to_duration: i64,
) -> i64 {
    match kind {
        DependencyKind::FinishToStart => from_finish,
        DependencyKind::StartToStart => from_start,
        DependencyKind::FinishToFinish => from_finish - to_duration,
    }
}

/// Run the forward pass over pre-built task data. O(V+E).
pub fn forward_pass(data: &TaskData, verbosity: u8) -> ForwardPassResult {
    let n = data.len();
    let mut earliest_start = vec![0; n];
    let mut earliest_finish = vec![0; n];

    for &task_int in &data.topo_order {
        let idx = task_int as usize;
        let duration = data.durations[idx];

        let mut start = data.anchors[idx];
        for &(dep_int, kind) in &data.deps[idx] {
            let dep_idx = dep_int as usize;
            let bound = start_lower_bound(
                kind,
                earliest_start[dep_idx],
                earliest_finish[dep_idx],
                duration,
            );
            if bound > start {
                start = bound;
            }
        }

        earliest_start[idx] = start;
        earliest_finish[idx] = start + duration;
        log_debug!(
            verbosity,
            "Forward: {} starts day {} finishes day {}",
            data.name(task_int),
            start,
            start + duration
        );
    }

    ForwardPassResult {
        earliest_start,
        earliest_finish,
    }
}
