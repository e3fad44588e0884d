//! Configuration types for the schedule engine.

use pyo3::prelude::*;

use crate::logging::{VERBOSITY_DEBUG, VERBOSITY_SILENT};

/// Engine-wide settings shared by the coordinator and the Python entry point.
#[pyclass]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Logging verbosity (0=silent, 1=changes, 2=checks, 3=debug)
    #[pyo3(get, set)]
    pub verbosity: u8,
    /// Buffered snapshot events per subscriber before the oldest are dropped
    #[pyo3(get, set)]
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verbosity: VERBOSITY_SILENT,
            event_capacity: 64,
        }
    }
}

impl EngineConfig {
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity.min(VERBOSITY_DEBUG);
        self
    }

    pub fn with_event_capacity(mut self, event_capacity: usize) -> Self {
        self.event_capacity = event_capacity;
        self
    }

    /// Channel capacity; a broadcast channel needs at least one slot.
    pub fn channel_capacity(&self) -> usize {
        self.event_capacity.max(1)
    }
}

#[pymethods]
impl EngineConfig {
    #[new]
    #[pyo3(signature = (verbosity=None, event_capacity=None))]
    fn new(verbosity: Option<u8>, event_capacity: Option<usize>) -> Self {
        let defaults = Self::default();
        Self {
            verbosity: verbosity.unwrap_or(defaults.verbosity).min(VERBOSITY_DEBUG),
            event_capacity: event_capacity.unwrap_or(defaults.event_capacity),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "EngineConfig(verbosity={}, event_capacity={})",
            self.verbosity, self.event_capacity
        )
    }
}
