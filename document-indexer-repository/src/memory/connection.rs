use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::interfaces::ManagedConnection;

/// Connection stand-in that counts releases.
#[derive(Debug)]
pub struct MemoryConnection {
    open: AtomicBool,
    releases: AtomicUsize,
}

impl Default for MemoryConnection {
    fn default() -> Self {
        Self {
            open: AtomicBool::new(true),
            releases: AtomicUsize::new(0),
        }
    }
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times [`ManagedConnection::release`] was called.
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ManagedConnection for MemoryConnection {
    async fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.open.store(false, Ordering::SeqCst);
    }

    async fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}
