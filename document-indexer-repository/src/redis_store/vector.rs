//! Redis implementation of the vector index.
//!
//! Datapoints are hashes under `{prefix}:{uuid}` indexed by a RediSearch
//! FLAT cosine index.

use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::interfaces::VectorIndex;
use crate::redis_store::connection::StoreConnection;
use crate::redis_store::index_config::{
    create_index_args, FIELD_CONTENT, FIELD_EMBEDDING, FIELD_FILENAME, FIELD_PAGE,
};
use crate::redis_store::queries::{is_unknown_index, knn_search, scan_keys, vector_to_bytes};
use crate::types::IndexHandle;
use document_indexer_shared::{PageMatch, VectorDatapoint};

/// Vector index backed by RediSearch.
pub struct RedisVectorIndex {
    connection: Arc<StoreConnection>,
    prefix: String,
}

impl RedisVectorIndex {
    /// Create a client storing datapoints under the configured key prefix.
    pub fn new(connection: Arc<StoreConnection>) -> Self {
        let prefix = connection.config().key_prefix.clone();
        Self { connection, prefix }
    }

    fn check_dimension(index: &IndexHandle, vector: &[f32]) -> Result<(), StoreError> {
        if vector.len() != index.dimension {
            return Err(StoreError::InvalidDimension {
                expected: index.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for RedisVectorIndex {
    #[instrument(skip(self))]
    async fn ensure_index(&self, name: &str, dimension: usize) -> Result<IndexHandle, StoreError> {
        let handle = IndexHandle::new(name, self.prefix.clone(), dimension);
        let mut connection = self.connection.connection().await?;

        let info: Result<redis::Value, redis::RedisError> = redis::cmd("FT.INFO")
            .arg(name)
            .query_async(&mut connection)
            .await;

        match info {
            Ok(_) => {
                debug!("Vector index already exists");
                Ok(handle)
            }
            Err(e) if is_unknown_index(&e) => {
                let _: () = redis::cmd("FT.CREATE")
                    .arg(create_index_args(&handle))
                    .query_async(&mut connection)
                    .await
                    .map_err(|e| StoreError::index_creation(e.to_string()))?;

                info!(prefix = %handle.prefix, dimension = dimension, "Vector index created");
                Ok(handle)
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(
        skip(self, index, datapoints),
        fields(index = %index.name, count = datapoints.len())
    )]
    async fn load(
        &self,
        index: &IndexHandle,
        datapoints: &[VectorDatapoint],
    ) -> Result<Vec<String>, StoreError> {
        for datapoint in datapoints {
            Self::check_dimension(index, &datapoint.embedding)?;
        }
        if datapoints.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        let mut keys = Vec::with_capacity(datapoints.len());

        for datapoint in datapoints {
            let key = index.datapoint_key(&Uuid::new_v4().simple().to_string());
            pipe.cmd("HSET")
                .arg(&key)
                .arg(FIELD_FILENAME)
                .arg(&datapoint.filename)
                .arg(FIELD_PAGE)
                .arg(datapoint.page)
                .arg(FIELD_CONTENT)
                .arg(&datapoint.content)
                .arg(FIELD_EMBEDDING)
                .arg(vector_to_bytes(&datapoint.embedding))
                .ignore();
            keys.push(key);
        }

        let mut connection = self.connection.connection().await?;
        let _: () = pipe.query_async(&mut connection).await?;

        debug!("Datapoints loaded");
        Ok(keys)
    }

    #[instrument(skip(self, index), fields(index = %index.name))]
    async fn delete_by_filename(
        &self,
        index: &IndexHandle,
        filename: &str,
        count: usize,
    ) -> Result<usize, StoreError> {
        if count == 0 {
            return Ok(0);
        }

        let mut connection = self.connection.connection().await?;
        let candidates = scan_keys(&mut connection, &index.key_pattern()).await?;

        let mut matching = Vec::new();
        for key in candidates {
            let owner: Result<Option<String>, redis::RedisError> =
                connection.hget(&key, FIELD_FILENAME).await;
            match owner {
                Ok(Some(owner)) if owner == filename => {
                    matching.push(key);
                    if matching.len() >= count {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(key = %key, error = %e, "Skipping unreadable datapoint"),
            }
        }

        if matching.is_empty() {
            debug!("No datapoints to remove");
            return Ok(0);
        }

        let removed: usize = connection.del(&matching[..]).await?;
        info!(removed = removed, "Datapoints removed");
        Ok(removed)
    }

    #[instrument(skip(self, index, vector), fields(index = %index.name))]
    async fn query(
        &self,
        index: &IndexHandle,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<PageMatch>, StoreError> {
        Self::check_dimension(index, vector)?;
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut connection = self.connection.connection().await?;
        let matches = knn_search(&mut connection, &index.name, vector, top_k).await?;

        debug!(matches = matches.len(), "Vector query complete");
        Ok(matches)
    }
}
