//! Event types for the coco import event system
//!
//! Provides the shared `ImportEvent` definitions and an `EventBus` that
//! fans them out to any number of listeners (CLI progress output, UI bridges).

mod import_types;

pub use import_types::{ImportPhase, RequestKind};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Import session events
///
/// Events are broadcast via EventBus and can be serialized for transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ImportEvent {
    /// Session moved between phases
    PhaseChanged {
        session_id: Uuid,
        /// Session generation at the time of the transition
        generation: u64,
        old_phase: ImportPhase,
        new_phase: ImportPhase,
        timestamp: DateTime<Utc>,
    },

    /// Preview payload accepted and reconciled
    PreviewLoaded {
        session_id: Uuid,
        record_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// Asset files staged and matched against the preview records
    AssetsReconciled {
        session_id: Uuid,
        asset_count: usize,
        /// Records that received an asset URL
        matched_records: usize,
        timestamp: DateTime<Utc>,
    },

    /// Commit accepted by the server
    ImportCommitted {
        session_id: Uuid,
        record_count: usize,
        message: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// Preview or commit request failed
    ImportFailed {
        session_id: Uuid,
        request: RequestKind,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A response arrived for a session generation that no longer exists
    StaleResponseDiscarded {
        session_id: Uuid,
        request: RequestKind,
        ticket_generation: u64,
        current_generation: u64,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast bus for import events
///
/// Cloning the bus shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ImportEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    ///
    /// # Examples
    ///
    /// ```
    /// use coco_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ImportEvent,
    ) -> Result<usize, broadcast::error::SendError<ImportEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ImportEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
