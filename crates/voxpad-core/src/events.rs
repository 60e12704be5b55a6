use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

use crate::types::{DictationMode, NoteId, TimestampMs};

/// All domain events that can occur in the Voxpad system.
///
/// Events are emitted after state changes and consumed by:
/// - The presentation layer (transient confirmations such as "Note added")
/// - Cross-component listeners (for reactive behavior)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DomainEvent {
    /// A note was inserted and committed.
    NoteAdded { id: NoteId, timestamp: TimestampMs },

    /// An existing note was updated and committed.
    NoteUpdated { id: NoteId, timestamp: TimestampMs },

    /// A note was deleted and the removal committed.
    NoteDeleted { id: NoteId, timestamp: TimestampMs },

    /// A dictation listening cycle began.
    DictationStarted {
        cycle_id: Uuid,
        mode: DictationMode,
        timestamp: TimestampMs,
    },

    /// A dictation listening cycle ended.
    DictationStopped {
        cycle_id: Uuid,
        timestamp: TimestampMs,
    },
}

impl DomainEvent {
    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> TimestampMs {
        match self {
            DomainEvent::NoteAdded { timestamp, .. }
            | DomainEvent::NoteUpdated { timestamp, .. }
            | DomainEvent::NoteDeleted { timestamp, .. }
            | DomainEvent::DictationStarted { timestamp, .. }
            | DomainEvent::DictationStopped { timestamp, .. } => *timestamp,
        }
    }

    /// Returns a stable event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            DomainEvent::NoteAdded { .. } => "note_added",
            DomainEvent::NoteUpdated { .. } => "note_updated",
            DomainEvent::NoteDeleted { .. } => "note_deleted",
            DomainEvent::DictationStarted { .. } => "dictation_started",
            DomainEvent::DictationStopped { .. } => "dictation_stopped",
        }
    }

    /// Returns the transient confirmation text shown to the user.
    pub fn notice(&self) -> &'static str {
        match self {
            DomainEvent::NoteAdded { .. } => "Note added",
            DomainEvent::NoteUpdated { .. } => "Note updated",
            DomainEvent::NoteDeleted { .. } => "Note deleted",
            DomainEvent::DictationStarted { .. } => "Dictation started",
            DomainEvent::DictationStopped { .. } => "Dictation stopped",
        }
    }
}

/// Broadcast fan-out for domain events.
///
/// Cloning shares the underlying channel. Emission never blocks and never
/// fails; an event published while no subscriber is listening is dropped.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all current subscribers.
    pub fn emit(&self, event: DomainEvent) {
        trace!(event = event.event_name(), "Domain event emitted");
        let _ = self.tx.send(event);
    }

    /// Open a new subscription receiving events emitted from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
