//! Critical path analysis.
//!
//! Combines the forward and backward passes into per-task timings, the set of
//! zero-slack tasks and a single deterministic critical chain for display.

mod calculation;
mod chain;
mod types;

pub use calculation::{
    calculate_critical_path, calculate_critical_path_with_data, TaskData,
};
pub use chain::critical_chain;
pub use types::{CriticalPathResult, TaskTiming};
