//! Snapshot publication.
//!
//! Every applied mutation publishes one [`ScheduleEvent`]. Sending never
//! blocks: a subscriber that falls behind by more than the channel capacity
//! loses the oldest events and is told how many it missed.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::models::ProjectId;
use crate::snapshot::ScheduleSnapshot;

use super::mutation::MutationKind;

/// Cause of a published snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventCause {
    Loaded,
    Mutation(MutationKind),
}

/// A freshly derived snapshot for one project.
#[derive(Clone, Debug)]
pub struct ScheduleEvent {
    pub project_id: ProjectId,
    pub revision: u64,
    pub cause: EventCause,
    pub snapshot: Arc<ScheduleSnapshot>,
}

/// Result of polling a [`Subscription`].
#[derive(Debug)]
pub enum Received {
    Event(ScheduleEvent),
    /// The subscriber fell behind and this many events were dropped.
    Lagged(u64),
    Closed,
}

/// Fan-out of schedule events to any number of subscribers.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<ScheduleEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Fire and forget. Returns the number of subscribers reached.
    pub fn publish(&self, event: ScheduleEvent) -> usize {
        // Err only means nobody is listening.
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self, project_id: Option<ProjectId>) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            project_id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Receiving end, optionally filtered to one project.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<ScheduleEvent>,
    project_id: Option<ProjectId>,
}

impl Subscription {
    fn wants(&self, event: &ScheduleEvent) -> bool {
        self.project_id
            .as_ref()
            .map_or(true, |id| *id == event.project_id)
    }

    /// Wait for the next matching event.
    pub async fn recv(&mut self) -> Received {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.wants(&event) => return Received::Event(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    return Received::Lagged(missed)
                }
                Err(broadcast::error::RecvError::Closed) => return Received::Closed,
            }
        }
    }

    /// Next matching event if one is already buffered.
    pub fn try_recv(&mut self) -> Option<Received> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.wants(&event) => return Some(Received::Event(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    return Some(Received::Lagged(missed))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Received::Closed),
            }
        }
    }

    /// Drain every buffered matching event, skipping lag notices.
    pub fn drain(&mut self) -> Vec<ScheduleEvent> {
        let mut events = Vec::new();
        while let Some(received) = self.try_recv() {
            match received {
                Received::Event(event) => events.push(event),
                Received::Lagged(_) => continue,
                Received::Closed => break,
            }
        }
        events
    }
}
