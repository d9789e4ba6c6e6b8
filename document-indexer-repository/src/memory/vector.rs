use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::interfaces::VectorIndex;
use crate::types::IndexHandle;
use document_indexer_shared::{PageMatch, VectorDatapoint};

/// Cosine distance between two vectors.
///
/// A zero vector has no direction; its distance to anything is `1.0`.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

/// Vector index keeping datapoints in insertion order.
pub struct InMemoryVectorIndex {
    prefix: String,
    datapoints: Mutex<Vec<(String, VectorDatapoint)>>,
    loads: AtomicUsize,
    deletes: AtomicUsize,
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new("docs")
    }
}

impl InMemoryVectorIndex {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            datapoints: Mutex::new(Vec::new()),
            loads: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    /// Datapoints currently stored for `filename`.
    pub async fn datapoints_for(&self, filename: &str) -> Vec<VectorDatapoint> {
        self.datapoints
            .lock()
            .await
            .iter()
            .filter(|(_, dp)| dp.filename == filename)
            .map(|(_, dp)| dp.clone())
            .collect()
    }

    /// Total number of stored datapoints.
    pub async fn len(&self) -> usize {
        self.datapoints.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.datapoints.lock().await.is_empty()
    }

    /// Number of `load` calls that wrote at least one datapoint.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of `delete_by_filename` calls that removed at least one datapoint.
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
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

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn ensure_index(&self, name: &str, dimension: usize) -> Result<IndexHandle, StoreError> {
        Ok(IndexHandle::new(name, self.prefix.clone(), dimension))
    }

    async fn load(
        &self,
        index: &IndexHandle,
        datapoints: &[VectorDatapoint],
    ) -> Result<Vec<String>, StoreError> {
        for datapoint in datapoints {
            check_dimension(index, &datapoint.embedding)?;
        }
        if datapoints.is_empty() {
            return Ok(Vec::new());
        }

        let mut stored = self.datapoints.lock().await;
        let keys: Vec<String> = datapoints
            .iter()
            .map(|datapoint| {
                let key = index.datapoint_key(&Uuid::new_v4().simple().to_string());
                stored.push((key.clone(), datapoint.clone()));
                key
            })
            .collect();

        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(keys)
    }

    async fn delete_by_filename(
        &self,
        _index: &IndexHandle,
        filename: &str,
        count: usize,
    ) -> Result<usize, StoreError> {
        let mut stored = self.datapoints.lock().await;
        let mut removed = 0;

        stored.retain(|(_, dp)| {
            if removed < count && dp.filename == filename {
                removed += 1;
                false
            } else {
                true
            }
        });

        if removed > 0 {
            self.deletes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(removed)
    }

    async fn query(
        &self,
        index: &IndexHandle,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<PageMatch>, StoreError> {
        check_dimension(index, vector)?;

        let stored = self.datapoints.lock().await;
        let mut matches: Vec<PageMatch> = stored
            .iter()
            .map(|(key, dp)| PageMatch {
                key: key.clone(),
                filename: dp.filename.clone(),
                page: dp.page,
                content: dp.content.clone(),
                distance: cosine_distance(vector, &dp.embedding),
            })
            .collect();

        matches.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        matches.truncate(top_k);
        Ok(matches)
    }
}
