//! Owned Redis connection shared by the metadata store and the vector index.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ConstantBuilder, Retryable};
use redis::aio::MultiplexedConnection;
use redis::Client;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::RepositoryConfig;
use crate::errors::StoreError;
use crate::interfaces::ManagedConnection;

/// Lazily (re-)established Redis connection with bounded connect retries.
///
/// [`StoreConnection::open`] connects eagerly so that an unreachable store is
/// reported at start-up. After [`ManagedConnection::release`] the next call to
/// [`StoreConnection::connection`] connects again, retrying up to
/// `retry_attempts` times with a fixed delay before failing with
/// [`StoreError::Unavailable`].
pub struct StoreConnection {
    client: Client,
    config: RepositoryConfig,
    current: Mutex<Option<MultiplexedConnection>>,
}

impl StoreConnection {
    /// Open a connection to the configured Redis server.
    ///
    /// # Returns
    ///
    /// * `Ok(StoreConnection)` - A connected instance
    /// * `Err(StoreError::ConnectionError)` - If the URL is invalid
    /// * `Err(StoreError::Unavailable)` - If every connection attempt failed
    pub async fn open(config: RepositoryConfig) -> Result<Self, StoreError> {
        let client = Client::open(config.redis_url.as_str())
            .map_err(|e| StoreError::connection(format!("Invalid Redis URL: {}", e)))?;

        let connection = connect_with_retry(&client, &config).await?;

        info!(url = %config.redis_url, "Redis connection established");

        Ok(Self {
            client,
            config,
            current: Mutex::new(Some(connection)),
        })
    }

    /// Get a handle to the live connection, reconnecting if it was released.
    pub async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        let mut current = self.current.lock().await;

        if let Some(connection) = current.as_ref() {
            return Ok(connection.clone());
        }

        debug!("Re-establishing released Redis connection");
        let connection = connect_with_retry(&self.client, &self.config).await?;
        *current = Some(connection.clone());
        Ok(connection)
    }

    /// The configuration this connection was opened with.
    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }
}

#[async_trait]
impl ManagedConnection for StoreConnection {
    async fn release(&self) {
        let mut current = self.current.lock().await;
        if current.take().is_some() {
            info!("Redis connection released");
        }
    }

    async fn is_open(&self) -> bool {
        self.current.lock().await.is_some()
    }
}

/// Connect and ping, retrying with a fixed delay.
async fn connect_with_retry(
    client: &Client,
    config: &RepositoryConfig,
) -> Result<MultiplexedConnection, StoreError> {
    let attempts = config.retry_attempts.max(1);
    let backoff = ConstantBuilder::default()
        .with_delay(config.retry_delay)
        .with_max_times(attempts - 1);

    let connect = || async move {
        let mut connection = client.get_multiplexed_async_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut connection).await?;
        Ok::<_, redis::RedisError>(connection)
    };

    connect
        .retry(backoff)
        .notify(|err: &redis::RedisError, delay: Duration| {
            warn!(
                error = %err,
                retry_in_ms = delay.as_millis() as u64,
                "Redis connection attempt failed"
            );
        })
        .await
        .map_err(|e| {
            error!(attempts = attempts, error = %e, "Could not connect to Redis");
            StoreError::unavailable(attempts, e.to_string())
        })
}
