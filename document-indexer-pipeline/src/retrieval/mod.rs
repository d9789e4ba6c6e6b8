//! Similarity lookup over indexed pages.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::collaborators::Enricher;
use crate::errors::PipelineError;
use crate::lifecycle::LifecycleConfig;
use document_indexer_repository::{MetadataStore, VectorIndex};
use document_indexer_shared::RetrievalSettings;

/// A page matching a query.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedPage {
    pub filename: String,
    pub page: usize,
    /// Page text from the document record, or the indexed content when the
    /// record no longer has the page.
    pub text: String,
    pub distance: f32,
}

/// Read side of the index: pages similar to a query, topics and questions.
pub struct PageRetriever {
    metadata: Arc<dyn MetadataStore>,
    vectors: Arc<dyn VectorIndex>,
    enricher: Arc<dyn Enricher>,
    config: LifecycleConfig,
    settings: RetrievalSettings,
}

impl PageRetriever {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        vectors: Arc<dyn VectorIndex>,
        enricher: Arc<dyn Enricher>,
    ) -> Self {
        Self {
            metadata,
            vectors,
            enricher,
            config: LifecycleConfig::default(),
            settings: RetrievalSettings::default(),
        }
    }

    pub fn with_config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_settings(mut self, settings: RetrievalSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Pages closest to `query`, nearest first, within the score threshold.
    #[instrument(skip(self, query), fields(top_k = self.settings.top_k))]
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedPage>, PipelineError> {
        let vector = self.enricher.embed_page(query).await?;

        let index = self
            .vectors
            .ensure_index(&self.config.index_name, self.config.dimension)
            .await
            .map_err(PipelineError::index_write)?;
        let matches = self
            .vectors
            .query_with_settings(&index, &vector, &self.settings)
            .await
            .map_err(PipelineError::index_write)?;

        let mut pages = Vec::with_capacity(matches.len());
        for candidate in matches {
            let text = self
                .metadata
                .page_text(&candidate.filename, candidate.page)
                .await?
                .unwrap_or(candidate.content);

            pages.push(RetrievedPage {
                filename: candidate.filename,
                page: candidate.page,
                text,
                distance: candidate.distance,
            });
        }

        debug!(pages = pages.len(), "Retrieval complete");
        Ok(pages)
    }

    /// Every stored topic, without duplicates.
    pub async fn topics(&self) -> Result<Vec<String>, PipelineError> {
        Ok(self.metadata.all_topics().await?)
    }

    /// Every stored question, without duplicates.
    pub async fn questions(&self) -> Result<Vec<String>, PipelineError> {
        Ok(self.metadata.all_questions().await?)
    }
}
