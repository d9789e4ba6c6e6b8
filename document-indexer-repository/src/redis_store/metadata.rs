//! Redis implementation of the metadata store.
//!
//! Records are stored as JSON strings under `document:`, `topics:` and
//! `questions:` keys.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::errors::StoreError;
use crate::interfaces::MetadataStore;
use crate::redis_store::connection::StoreConnection;
use crate::redis_store::queries::scan_keys;
use document_indexer_shared::{
    document_key, questions_key, topics_key, DocumentRecord, QuestionsRecord, RecordRefs,
    TopicsRecord,
};

/// Metadata store backed by Redis string keys.
pub struct RedisMetadataStore {
    connection: Arc<StoreConnection>,
}

impl RedisMetadataStore {
    pub fn new(connection: Arc<StoreConnection>) -> Self {
        Self { connection }
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let mut connection = self.connection.connection().await?;
        let raw: Option<String> = connection.get(key).await?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json).map_err(|e| {
                StoreError::serialization(format!("Corrupt record at {}: {}", key, e))
            })?)),
            None => Ok(None),
        }
    }

    /// Read every record matching `pattern`, skipping ones that fail to decode.
    async fn read_all<T: DeserializeOwned>(&self, pattern: &str) -> Result<Vec<T>, StoreError> {
        let mut connection = self.connection.connection().await?;
        let keys = scan_keys(&mut connection, pattern).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut connection)
            .await?;

        let mut records = Vec::with_capacity(values.len());
        for (key, value) in keys.iter().zip(values) {
            let Some(json) = value else { continue };
            match serde_json::from_str(&json) {
                Ok(record) => records.push(record),
                Err(e) => warn!(key = %key, error = %e, "Skipping undecodable record"),
            }
        }

        Ok(records)
    }
}

/// Flatten `lists` into one list, keeping the first occurrence of each entry.
pub(crate) fn union_in_order(lists: impl IntoIterator<Item = Vec<String>>) -> Vec<String> {
    let mut seen = HashSet::new();
    lists
        .into_iter()
        .flatten()
        .filter(|entry| seen.insert(entry.clone()))
        .collect()
}

#[async_trait]
impl MetadataStore for RedisMetadataStore {
    #[instrument(skip(self))]
    async fn get_document(&self, filename: &str) -> Result<Option<DocumentRecord>, StoreError> {
        self.read(&document_key(filename)).await
    }

    #[instrument(
        skip(self, record),
        fields(filename = %record.filename, event_id = %record.event_id)
    )]
    async fn save_document(&self, record: &DocumentRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        let mut connection = self.connection.connection().await?;
        let _: () = connection.set(document_key(&record.filename), json).await?;

        debug!(pages = record.pages.len(), "Document record saved");
        Ok(())
    }

    #[instrument(
        skip(self, topics, questions),
        fields(topics = topics.len(), questions = questions.len())
    )]
    async fn save_topics_and_questions(
        &self,
        filename: &str,
        topics: &[String],
        questions: &[String],
    ) -> Result<RecordRefs, StoreError> {
        let refs = RecordRefs::for_filename(filename);

        let topics_json = serde_json::to_string(&TopicsRecord {
            filename: filename.to_string(),
            topics: topics.to_vec(),
        })?;
        let questions_json = serde_json::to_string(&QuestionsRecord {
            filename: filename.to_string(),
            questions: questions.to_vec(),
        })?;

        let mut connection = self.connection.connection().await?;
        let _: () = connection.set(&refs.topics_ref, topics_json).await?;
        let _: () = connection.set(&refs.questions_ref, questions_json).await?;

        Ok(refs)
    }

    #[instrument(skip(self))]
    async fn delete_document(&self, filename: &str) -> Result<(), StoreError> {
        let keys = [
            document_key(filename),
            topics_key(filename),
            questions_key(filename),
        ];

        let mut connection = self.connection.connection().await?;
        let removed: usize = connection.del(&keys[..]).await?;

        debug!(removed = removed, "Document records deleted");
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
        let records: Vec<TopicsRecord> = self.read_all("topics:*").await?;
        Ok(union_in_order(records.into_iter().map(|r| r.topics)))
    }

    async fn all_questions(&self) -> Result<Vec<String>, StoreError> {
        let records: Vec<QuestionsRecord> = self.read_all("questions:*").await?;
        Ok(union_in_order(records.into_iter().map(|r| r.questions)))
    }
}
