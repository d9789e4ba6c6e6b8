use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::errors::StoreError;
use crate::interfaces::MetadataStore;
use crate::redis_store::union_in_order;
use document_indexer_shared::{
    document_key, questions_key, topics_key, DocumentRecord, QuestionsRecord, RecordRefs,
    TopicsRecord,
};

/// Metadata store keeping JSON records in a map.
///
/// Every write bumps a counter so tests can assert that an operation had no
/// side effects. [`InMemoryMetadataStore::set_unavailable`] makes every call
/// fail with [`StoreError::Unavailable`].
#[derive(Default)]
pub struct InMemoryMetadataStore {
    entries: RwLock<HashMap<String, String>>,
    writes: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of set and delete operations performed so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Copy of every stored key and raw value.
    pub async fn snapshot(&self) -> HashMap<String, String> {
        self.entries.read().await.clone()
    }

    /// Store a raw value, bypassing encoding.
    pub async fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().await.insert(key.into(), value.into());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable(1, "in-memory store marked unavailable"));
        }
        Ok(())
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        self.check_available()?;
        match self.entries.read().await.get(key) {
            Some(json) => Ok(Some(serde_json::from_str(json).map_err(|e| {
                StoreError::serialization(format!("Corrupt record at {}: {}", key, e))
            })?)),
            None => Ok(None),
        }
    }

    async fn write<T: Serialize>(&self, key: String, value: &T) -> Result<(), StoreError> {
        self.check_available()?;
        let json = serde_json::to_string(value)?;
        self.entries.write().await.insert(key, json);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read_prefix<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<T>, StoreError> {
        self.check_available()?;
        let entries = self.entries.read().await;
        let mut keys: Vec<&String> = entries.keys().filter(|k| k.starts_with(prefix)).collect();
        keys.sort();

        Ok(keys
            .into_iter()
            .filter_map(|key| serde_json::from_str(&entries[key]).ok())
            .collect())
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn get_document(&self, filename: &str) -> Result<Option<DocumentRecord>, StoreError> {
        self.read(&document_key(filename)).await
    }

    async fn save_document(&self, record: &DocumentRecord) -> Result<(), StoreError> {
        self.write(document_key(&record.filename), record).await
    }

    async fn save_topics_and_questions(
        &self,
        filename: &str,
        topics: &[String],
        questions: &[String],
    ) -> Result<RecordRefs, StoreError> {
        let refs = RecordRefs::for_filename(filename);
        self.write(
            refs.topics_ref.clone(),
            &TopicsRecord {
                filename: filename.to_string(),
                topics: topics.to_vec(),
            },
        )
        .await?;
        self.write(
            refs.questions_ref.clone(),
            &QuestionsRecord {
                filename: filename.to_string(),
                questions: questions.to_vec(),
            },
        )
        .await?;
        Ok(refs)
    }

    async fn delete_document(&self, filename: &str) -> Result<(), StoreError> {
        self.check_available()?;
        let mut entries = self.entries.write().await;
        for key in [
            document_key(filename),
            topics_key(filename),
            questions_key(filename),
        ] {
            entries.remove(&key);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_topics(&self, filename: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .read::<TopicsRecord>(&topics_key(filename))
            .await?
            .map(|record| record.topics)
            .unwrap_or_default())
    }

    async fn get_questions(&self, filename: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .read::<QuestionsRecord>(&questions_key(filename))
            .await?
            .map(|record| record.questions)
            .unwrap_or_default())
    }

    async fn all_topics(&self) -> Result<Vec<String>, StoreError> {
        let records: Vec<TopicsRecord> = self.read_prefix("topics:").await?;
        Ok(union_in_order(records.into_iter().map(|r| r.topics)))
    }

    async fn all_questions(&self) -> Result<Vec<String>, StoreError> {
        let records: Vec<QuestionsRecord> = self.read_prefix("questions:").await?;
        Ok(union_in_order(records.into_iter().map(|r| r.questions)))
    }
}
