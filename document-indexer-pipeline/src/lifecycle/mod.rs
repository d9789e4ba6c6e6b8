//! Document lifecycle orchestration.
//!
//! [`DocumentLifecycle`] decides whether a storage event creates, updates or
//! deletes a document, suppresses duplicate deliveries, reconciles the vector
//! index by page count and runs content processing.

mod content;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

use crate::collaborators::{Enricher, ObjectMetadataSource, TextExtractor};
use crate::errors::PipelineError;
use document_indexer_repository::config::DEFAULT_INDEX_NAME;
use document_indexer_repository::{IndexHandle, ManagedConnection, MetadataStore, VectorIndex};
use document_indexer_shared::{
    DocumentRecord, DocumentRef, EventKind, StorageEvent, EMBEDDING_DIMENSION,
};

/// Settings for the lifecycle.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Vector index receiving page datapoints.
    pub index_name: String,
    /// Dimension the index is created with.
    pub dimension: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            index_name: DEFAULT_INDEX_NAME.to_string(),
            dimension: EMBEDDING_DIMENSION,
        }
    }
}

impl LifecycleConfig {
    pub fn with_index_name(mut self, index_name: impl Into<String>) -> Self {
        self.index_name = index_name.into();
        self
    }
}

/// What handling an event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// A new document was indexed.
    Created { page_count: usize },
    /// An existing document was re-indexed.
    Updated { page_count: usize },
    /// A document and its datapoints were removed.
    Deleted { removed_datapoints: usize },
    /// The stored record was already fully processed for this event id.
    Duplicate,
    /// The store key is held by a record for a different object name.
    KeyConflict { stored_filename: String },
    /// A delete arrived for a document that does not exist.
    NothingToDelete,
    /// The event kind is not handled.
    Ignored,
}

/// Orchestrates creation, update and deletion of indexed documents.
///
/// Holds the store clients, the shared connection and the collaborators.
/// Every step of an event runs sequentially; any error is logged with the
/// event id and filename, the shared connection is released, and the error
/// is returned to the caller.
pub struct DocumentLifecycle {
    metadata: Arc<dyn MetadataStore>,
    vectors: Arc<dyn VectorIndex>,
    connection: Arc<dyn ManagedConnection>,
    extractor: Arc<dyn TextExtractor>,
    enricher: Arc<dyn Enricher>,
    metadata_source: Arc<dyn ObjectMetadataSource>,
    config: LifecycleConfig,
}

impl DocumentLifecycle {
    /// Create a lifecycle with the default configuration.
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        vectors: Arc<dyn VectorIndex>,
        connection: Arc<dyn ManagedConnection>,
        extractor: Arc<dyn TextExtractor>,
        enricher: Arc<dyn Enricher>,
        metadata_source: Arc<dyn ObjectMetadataSource>,
    ) -> Self {
        Self {
            metadata,
            vectors,
            connection,
            extractor,
            enricher,
            metadata_source,
            config: LifecycleConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    /// The shared store connection.
    pub fn connection(&self) -> &Arc<dyn ManagedConnection> {
        &self.connection
    }

    /// Handle a parsed storage event.
    pub async fn handle(&self, event: &StorageEvent) -> Result<LifecycleOutcome, PipelineError> {
        self.handle_event(&event.kind, &event.event_id, &event.document())
            .await
    }

    /// Handle one event for `document`.
    ///
    /// # Returns
    ///
    /// * `Ok(LifecycleOutcome)` - What was done
    /// * `Err(PipelineError)` - The first failing step; partial writes remain
    #[instrument(skip(self, document), fields(kind = %kind, filename = %document.filename))]
    pub async fn handle_event(
        &self,
        kind: &EventKind,
        event_id: &str,
        document: &DocumentRef,
    ) -> Result<LifecycleOutcome, PipelineError> {
        let result = self.dispatch(kind, event_id, document).await;

        match &result {
            Ok(outcome) => {
                info!(event_id = %event_id, outcome = ?outcome, "Event handled");
            }
            Err(e) => {
                error!(
                    event_id = %event_id,
                    filename = %document.filename,
                    error = %e,
                    fatal = e.is_fatal(),
                    "Event failed"
                );
                self.connection.release().await;
            }
        }

        result
    }

    async fn dispatch(
        &self,
        kind: &EventKind,
        event_id: &str,
        document: &DocumentRef,
    ) -> Result<LifecycleOutcome, PipelineError> {
        match kind {
            EventKind::Deleted => self.delete(event_id, document).await,
            kind if kind.is_upsert() => self.upsert(event_id, document).await,
            _ => {
                info!(event_type = %kind, "Ignoring unsupported event");
                Ok(LifecycleOutcome::Ignored)
            }
        }
    }

    async fn upsert(
        &self,
        event_id: &str,
        document: &DocumentRef,
    ) -> Result<LifecycleOutcome, PipelineError> {
        match self.metadata.get_document(&document.filename).await? {
            None => self.create(event_id, document).await,
            Some(existing) if !existing.belongs_to(&document.filename) => {
                Ok(key_conflict(&existing))
            }
            Some(existing) if existing.is_processed_by(event_id) => {
                info!(event_id = %event_id, "Event already processed, skipping");
                Ok(LifecycleOutcome::Duplicate)
            }
            Some(existing) if existing.event_id == event_id => {
                self.resume(event_id, document, existing).await
            }
            Some(existing) => self.update(event_id, document, existing).await,
        }
    }

    async fn create(
        &self,
        event_id: &str,
        document: &DocumentRef,
    ) -> Result<LifecycleOutcome, PipelineError> {
        info!(event_id = %event_id, "Processing new document");

        let mut record = DocumentRecord::new(document, event_id);
        record.custom_metadata = self.fetch_custom_metadata(document).await;
        record.creation_time = Some(Utc::now());
        record.is_new = true;

        self.metadata.save_document(&record).await?;

        let page_count = self.process_content(event_id, document, record).await?;
        Ok(LifecycleOutcome::Created { page_count })
    }

    async fn update(
        &self,
        event_id: &str,
        document: &DocumentRef,
        existing: DocumentRecord,
    ) -> Result<LifecycleOutcome, PipelineError> {
        info!(event_id = %event_id, "Updating existing document");

        let page_count = self
            .reprocess(event_id, document, &existing, Some(Utc::now()), false)
            .await?;
        Ok(LifecycleOutcome::Updated { page_count })
    }

    /// Re-run an event whose earlier delivery stopped before completion.
    ///
    /// Whatever the failed attempt indexed is removed by count, then the
    /// event is processed again with its original timestamps.
    async fn resume(
        &self,
        event_id: &str,
        document: &DocumentRef,
        existing: DocumentRecord,
    ) -> Result<LifecycleOutcome, PipelineError> {
        info!(event_id = %event_id, "Resuming incomplete processing");

        let page_count = self
            .reprocess(event_id, document, &existing, existing.update_time, existing.is_new)
            .await?;
        if existing.is_new {
            Ok(LifecycleOutcome::Created { page_count })
        } else {
            Ok(LifecycleOutcome::Updated { page_count })
        }
    }

    /// Drop the previous state of a document and process it from scratch,
    /// keeping `creation_time`.
    async fn reprocess(
        &self,
        event_id: &str,
        document: &DocumentRef,
        existing: &DocumentRecord,
        update_time: Option<DateTime<Utc>>,
        is_new: bool,
    ) -> Result<usize, PipelineError> {
        self.remove_datapoints(&document.filename, existing.indexed_page_count())
            .await?;
        self.metadata.delete_document(&document.filename).await?;

        let mut record = DocumentRecord::new(document, event_id);
        record.custom_metadata = self.fetch_custom_metadata(document).await;
        record.creation_time = existing.creation_time;
        record.update_time = update_time;
        record.is_new = is_new;

        self.metadata.save_document(&record).await?;

        self.process_content(event_id, document, record).await
    }

    async fn delete(
        &self,
        event_id: &str,
        document: &DocumentRef,
    ) -> Result<LifecycleOutcome, PipelineError> {
        let Some(existing) = self.metadata.get_document(&document.filename).await? else {
            info!(event_id = %event_id, "No document to delete");
            return Ok(LifecycleOutcome::NothingToDelete);
        };
        if !existing.belongs_to(&document.filename) {
            return Ok(key_conflict(&existing));
        }

        info!(event_id = %event_id, "Deleting document");

        let removed_datapoints = self
            .remove_datapoints(&document.filename, existing.indexed_page_count())
            .await?;
        self.metadata.delete_document(&document.filename).await?;

        Ok(LifecycleOutcome::Deleted { removed_datapoints })
    }

    /// Remove the `count` datapoints previously indexed for `filename`.
    async fn remove_datapoints(
        &self,
        filename: &str,
        count: usize,
    ) -> Result<usize, PipelineError> {
        if count == 0 {
            return Ok(0);
        }

        let index = self.index().await?;
        let removed = self
            .vectors
            .delete_by_filename(&index, filename, count)
            .await
            .map_err(PipelineError::index_write)?;

        if removed != count {
            warn!(
                expected = count,
                removed = removed,
                "Removed datapoint count differs from stored page count"
            );
        } else {
            info!(removed = removed, "Previous datapoints removed");
        }
        Ok(removed)
    }

    async fn index(&self) -> Result<IndexHandle, PipelineError> {
        self.vectors
            .ensure_index(&self.config.index_name, self.config.dimension)
            .await
            .map_err(PipelineError::index_write)
    }

    async fn fetch_custom_metadata(&self, document: &DocumentRef) -> HashMap<String, String> {
        match self
            .metadata_source
            .custom_metadata(&document.bucket, &document.filename)
            .await
        {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(error = %e, "Could not read custom metadata, continuing without it");
                HashMap::new()
            }
        }
    }
}

fn key_conflict(existing: &DocumentRecord) -> LifecycleOutcome {
    warn!(
        stored_filename = %existing.filename,
        "Store key belongs to another object, leaving it untouched"
    );
    LifecycleOutcome::KeyConflict {
        stored_filename: existing.filename.clone(),
    }
}
