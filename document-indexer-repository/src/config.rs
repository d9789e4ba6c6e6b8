//! Configuration types for the store clients.

use std::time::Duration;

/// Default Redis URL.
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";

/// Default vector index name.
pub const DEFAULT_INDEX_NAME: &str = "document_index";

/// Default key prefix for vector datapoints.
pub const DEFAULT_KEY_PREFIX: &str = "docs";

/// Configuration shared by the metadata store and vector index clients.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Redis connection URL.
    pub redis_url: String,
    /// Name of the vector search index.
    pub index_name: String,
    /// Prefix of the hash keys holding datapoints.
    pub key_prefix: String,
    /// Connection attempts before the store is reported unavailable.
    pub retry_attempts: usize,
    /// Fixed delay between connection attempts.
    pub retry_delay: Duration,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl RepositoryConfig {
    /// Create a config pointing at the given Redis URL.
    pub fn new(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            ..Self::default()
        }
    }

    pub fn with_index_name(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = index_name.into();
        self
    }

    pub fn with_key_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    /// Set the retry bound. At least one attempt is always made.
    pub fn with_retry(mut self, attempts: usize, delay: Duration) -> Self {
        self.retry_attempts = attempts.max(1);
        self.retry_delay = delay;
        self
    }
}
