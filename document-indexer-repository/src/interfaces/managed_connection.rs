//! Lifecycle of the process-wide store connection.

use async_trait::async_trait;

/// A shared connection that can be released and re-established.
///
/// The pipeline releases the connection whenever an event fails, so that the
/// next event starts from a freshly opened connection instead of reusing one
/// that may be poisoned.
#[async_trait]
pub trait ManagedConnection: Send + Sync {
    /// Drop the current connection, if any.
    ///
    /// The next store operation re-establishes it.
    async fn release(&self);

    /// Whether a connection is currently held.
    async fn is_open(&self) -> bool;
}
