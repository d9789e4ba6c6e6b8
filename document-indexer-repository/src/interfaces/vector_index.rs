//! Vector index trait definition.

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::types::IndexHandle;
use document_indexer_shared::{PageMatch, RetrievalSettings, VectorDatapoint};

/// Abstract interface for the page vector index.
///
/// Each document page is stored as one datapoint carrying the filename, the
/// page index, the page text and its embedding.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Ensure the index exists, creating it when absent.
    ///
    /// # Arguments
    ///
    /// * `name` - The index name
    /// * `dimension` - Embedding dimension used when the index is created
    ///
    /// # Returns
    ///
    /// * `Ok(IndexHandle)` - Handle to the existing or newly created index
    /// * `Err(StoreError)` - If the index cannot be inspected or created
    async fn ensure_index(&self, name: &str, dimension: usize) -> Result<IndexHandle, StoreError>;

    /// Load datapoints into the index.
    ///
    /// # Returns
    ///
    /// * `Ok(keys)` - The keys assigned to the datapoints, in input order
    /// * `Err(StoreError::InvalidDimension)` - If an embedding has the wrong length
    /// * `Err(StoreError)` - If the write fails
    async fn load(
        &self,
        index: &IndexHandle,
        datapoints: &[VectorDatapoint],
    ) -> Result<Vec<String>, StoreError>;

    /// Remove up to `count` datapoints whose filename equals `filename`.
    ///
    /// Implementations scan the keys under the index prefix and filter on the
    /// stored filename, so the cost grows with the index size.
    ///
    /// # Returns
    ///
    /// * `Ok(removed)` - Number of datapoints removed
    /// * `Err(StoreError)` - If the scan or the delete fails
    async fn delete_by_filename(
        &self,
        index: &IndexHandle,
        filename: &str,
        count: usize,
    ) -> Result<usize, StoreError>;

    /// Nearest datapoints to `vector`, ordered by ascending cosine distance.
    async fn query(
        &self,
        index: &IndexHandle,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<PageMatch>, StoreError>;

    /// Run [`VectorIndex::query`] and drop matches beyond the score threshold.
    async fn query_with_settings(
        &self,
        index: &IndexHandle,
        vector: &[f32],
        settings: &RetrievalSettings,
    ) -> Result<Vec<PageMatch>, StoreError> {
        let matches = self.query(index, vector, settings.top_k).await?;
        Ok(matches
            .into_iter()
            .filter(|candidate| settings.accepts(candidate))
            .collect())
    }
}
