//! Metadata store trait definition.

use async_trait::async_trait;

use crate::errors::StoreError;
use document_indexer_shared::{DocumentRecord, RecordRefs};

/// Key-value store holding document, topics and questions records.
///
/// Writes are last-write-wins; there are no transactions and no concurrency
/// tokens.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Fetch the document record for `filename`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` - If a record exists
    /// * `Ok(None)` - If no record exists
    /// * `Err(StoreError)` - If the store cannot be read or the record cannot be decoded
    async fn get_document(&self, filename: &str) -> Result<Option<DocumentRecord>, StoreError>;

    /// Write the document record, replacing any previous value.
    async fn save_document(&self, record: &DocumentRecord) -> Result<(), StoreError>;

    /// Write the topics and questions records for `filename`.
    ///
    /// # Returns
    ///
    /// * `Ok(RecordRefs)` - The keys of the two records, to be stored on the document
    /// * `Err(StoreError)` - If either write fails
    async fn save_topics_and_questions(
        &self,
        filename: &str,
        topics: &[String],
        questions: &[String],
    ) -> Result<RecordRefs, StoreError>;

    /// Delete the document record together with its topics and questions.
    ///
    /// Missing records are not an error.
    async fn delete_document(&self, filename: &str) -> Result<(), StoreError>;

    /// Topics stored for `filename`; empty when absent.
    async fn get_topics(&self, filename: &str) -> Result<Vec<String>, StoreError>;

    /// Questions stored for `filename`; empty when absent.
    async fn get_questions(&self, filename: &str) -> Result<Vec<String>, StoreError>;

    /// Union of the topics of every document, without duplicates.
    async fn all_topics(&self) -> Result<Vec<String>, StoreError>;

    /// Union of the questions of every document, without duplicates.
    async fn all_questions(&self) -> Result<Vec<String>, StoreError>;

    /// Text of one stored page.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(text))` - If the document exists and `page` is in range
    /// * `Ok(None)` - If the document is missing or `page` is out of range
    async fn page_text(&self, filename: &str, page: usize) -> Result<Option<String>, StoreError> {
        Ok(self
            .get_document(filename)
            .await?
            .and_then(|record| record.pages.get(page).cloned()))
    }
}
