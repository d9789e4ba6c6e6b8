//! Message types for the consumer.

use tokio::sync::oneshot;

use document_indexer_shared::StorageEvent;

/// Result of handling one event, sent back to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgment {
    /// Whether the event was handled successfully.
    pub success: bool,
    /// Error message when it was not.
    pub error: Option<String>,
}

impl Acknowledgment {
    pub fn success() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Messages that flow from the consumer to the run loop.
#[derive(Debug)]
pub enum StreamMessage {
    /// One storage event; the consumer waits on `ack` before moving on.
    Event {
        event: StorageEvent,
        ack: oneshot::Sender<Acknowledgment>,
    },
    /// Stream has ended.
    End,
    /// An error occurred.
    Error(String),
}
