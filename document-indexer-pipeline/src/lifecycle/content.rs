//! Content processing shared by creation and update.

use futures::TryStreamExt;
use tracing::{debug, info};

use super::DocumentLifecycle;
use crate::errors::PipelineError;
use document_indexer_shared::{DocumentRecord, DocumentRef, VectorDatapoint};

impl DocumentLifecycle {
    /// Extract, enrich, embed and index `document`, writing to `record`.
    ///
    /// Pages are checkpointed on the record before enrichment starts and the
    /// record is marked processed once the datapoints are loaded. Returns the
    /// number of indexed pages.
    pub(super) async fn process_content(
        &self,
        event_id: &str,
        document: &DocumentRef,
        mut record: DocumentRecord,
    ) -> Result<usize, PipelineError> {
        info!(event_id = %event_id, "Extracting document text");
        let pages: Vec<String> = self.extractor.extract(document).await?.try_collect().await?;

        record.set_pages(pages.clone());
        self.metadata.save_document(&record).await?;
        debug!(page_count = pages.len(), "Pages checkpointed");

        let full_text = pages.join("\n\n");

        let topics = self.enricher.topics(&full_text).await?;
        info!(event_id = %event_id, topics = ?topics, "Topics extracted");

        let questions = self.enricher.questions(&full_text, &topics).await?;
        info!(event_id = %event_id, questions = ?questions, "Questions generated");

        let refs = self
            .metadata
            .save_topics_and_questions(&document.filename, &topics, &questions)
            .await?;
        record.set_refs(refs);
        self.metadata.save_document(&record).await?;

        let embeddings = self.enricher.embed(&pages).await;
        if embeddings.len() != pages.len() {
            return Err(PipelineError::IndexWriteFailed(format!(
                "expected {} embeddings, got {}",
                pages.len(),
                embeddings.len()
            )));
        }

        let datapoints: Vec<VectorDatapoint> = pages
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(page, (text, embedding))| {
                VectorDatapoint::new(document.filename.clone(), page, text, embedding)
            })
            .collect();

        let index = self.index().await?;
        let keys = self
            .vectors
            .load(&index, &datapoints)
            .await
            .map_err(PipelineError::index_write)?;

        record.processed = true;
        self.metadata.save_document(&record).await?;

        info!(event_id = %event_id, datapoints = keys.len(), "Document processed");
        Ok(keys.len())
    }
}
