//! Logging macros for the schedule engine with verbosity level control.
//!
//! The macros are free when disabled (verbosity=0): the level check happens
//! before any formatting. Enabled messages go to `tracing` under the
//! `ganttline` target, so the host decides where they end up.
//!
//! - 0: SILENT (only errors)
//! - 1: CHANGES (accepted mutations, published snapshots)
//! - 2: CHECKS (derivation summaries, rejected mutations)
//! - 3: DEBUG (per-task pass internals)

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_CHANGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

#[doc(hidden)]
pub mod __private {
    pub use tracing::{debug, info, trace};
}

/// Log at CHANGES level (verbosity >= 1).
///
/// Used for: applied mutations, project loads, snapshot publication.
#[macro_export]
macro_rules! log_changes {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHANGES {
            $crate::logging::__private::info!(target: "ganttline", $($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: derivation summaries, rejected mutations.
#[macro_export]
macro_rules! log_checks {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            $crate::logging::__private::debug!(target: "ganttline", $($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
///
/// Used for: per-task forward and backward pass values.
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            $crate::logging::__private::trace!(target: "ganttline", $($arg)*);
        }
    };
}
