//! Enrichment collaborator trait.

use async_trait::async_trait;
use tracing::warn;

use crate::errors::PipelineError;
use document_indexer_shared::EMBEDDING_DIMENSION;

/// Topic extraction, question generation and page embeddings.
///
/// `topics` and `questions` return an empty list when the model reply cannot
/// be parsed; an `Err` means the service itself failed.
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Main topics of the full document text.
    async fn topics(&self, full_text: &str) -> Result<Vec<String>, PipelineError>;

    /// Questions a reader could ask about the text, conditioned on its topics.
    async fn questions(
        &self,
        full_text: &str,
        topics: &[String],
    ) -> Result<Vec<String>, PipelineError>;

    /// Embedding of a single text.
    async fn embed_page(&self, text: &str) -> Result<Vec<f32>, PipelineError>;

    /// One embedding per page, in page order.
    ///
    /// Blank pages, failed calls and vectors of the wrong length all yield a
    /// zero vector of [`EMBEDDING_DIMENSION`] so that every page is indexed.
    async fn embed(&self, pages: &[String]) -> Vec<Vec<f32>> {
        let mut embeddings = Vec::with_capacity(pages.len());

        for (page, text) in pages.iter().enumerate() {
            if text.trim().is_empty() {
                embeddings.push(vec![0.0; EMBEDDING_DIMENSION]);
                continue;
            }

            let embedding = match self.embed_page(text).await {
                Ok(vector) if vector.len() == EMBEDDING_DIMENSION => vector,
                Ok(vector) => {
                    warn!(
                        page = page,
                        expected = EMBEDDING_DIMENSION,
                        actual = vector.len(),
                        "Embedding has wrong dimension, using zero vector"
                    );
                    vec![0.0; EMBEDDING_DIMENSION]
                }
                Err(e) => {
                    warn!(page = page, error = %e, "Embedding failed, using zero vector");
                    vec![0.0; EMBEDDING_DIMENSION]
                }
            };
            embeddings.push(embedding);
        }

        embeddings
    }
}
