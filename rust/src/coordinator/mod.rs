//! Mutation coordinator.
//!
//! Owns every loaded project and is the only way to edit one. A mutation is
//! applied to a copy of the project's graph and the whole schedule is
//! re-derived; only if both succeed is the copy swapped in and the new
//! snapshot published. Failed mutations leave no trace.

mod core;
mod events;
mod mutation;
mod state;

pub use core::Coordinator;
pub use events::{EventBus, EventCause, Received, ScheduleEvent, Subscription};
pub use mutation::{Mutation, MutationKind};
pub use state::{Phase, ProjectState};
