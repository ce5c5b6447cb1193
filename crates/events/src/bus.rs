//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`FlowEvent`]s: task status
//! transitions, design state changes, worker lifecycle and the console
//! message sink. It is shared via `Arc<EventBus>` between the orchestrator,
//! its workers and any observers (console, progress UI).

use chrono::{DateTime, Utc};
use fabflow_core::{DesignState, Stage, StatusChange};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// FlowEvent
// ---------------------------------------------------------------------------

/// Severity of a console message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Error,
}

/// How a worker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerExit {
    Completed,
    Failed,
    Cancelled,
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowEventKind {
    TaskStatusChanged(StatusChange),
    DesignStateChanged {
        from: DesignState,
        to: DesignState,
    },
    WorkerStarted {
        worker_id: Uuid,
        name: String,
        stage: Stage,
    },
    WorkerFinished {
        worker_id: Uuid,
        name: String,
        stage: Stage,
        exit: WorkerExit,
    },
    WorkersSwept {
        count: usize,
    },
    BatchFinished {
        success: bool,
    },
    Message {
        severity: Severity,
        text: String,
    },
}

/// A pipeline event with the time it was published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEvent {
    #[serde(flatten)]
    pub kind: FlowEventKind,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl FlowEvent {
    pub fn new(kind: FlowEventKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(FlowEventKind::Message {
            severity: Severity::Info,
            text: text.into(),
        })
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(FlowEventKind::Message {
            severity: Severity::Error,
            text: text.into(),
        })
    }

    /// Message text, if this is a console message.
    pub fn message(&self) -> Option<(Severity, &str)> {
        match &self.kind {
            FlowEventKind::Message { severity, text } => Some((*severity, text.as_str())),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
pub const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`FlowEvent`].
///
/// # Usage
///
/// ```rust
/// use fabflow_events::bus::{EventBus, FlowEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(FlowEvent::info("Created design source: foo"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<FlowEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: FlowEvent) {
        // A SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Publish an informational console message.
    pub fn info(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::debug!(message = %text, "console");
        self.publish(FlowEvent::info(text));
    }

    /// Publish an error console message.
    pub fn error(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::warn!(message = %text, "console error");
        self.publish(FlowEvent::error(text));
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
