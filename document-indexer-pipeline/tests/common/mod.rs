//! Scripted collaborators and an in-memory harness for pipeline tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;

use document_indexer_pipeline::collaborators::{
    Enricher, ObjectMetadataSource, PageStream, TextExtractor,
};
use document_indexer_pipeline::{DocumentLifecycle, PipelineError};
use document_indexer_repository::memory::{
    InMemoryMetadataStore, InMemoryVectorIndex, MemoryConnection,
};
use document_indexer_shared::{DocumentRef, EMBEDDING_DIMENSION};

pub fn strings(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| t.to_string()).collect()
}

/// Extractor returning a configurable list of pages.
#[derive(Default)]
pub struct ScriptedExtractor {
    pages: Mutex<Vec<String>>,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedExtractor {
    pub async fn set_pages(&self, pages: Vec<String>) {
        *self.pages.lock().await = pages;
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextExtractor for ScriptedExtractor {
    async fn extract(&self, _document: &DocumentRef) -> Result<PageStream, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(PipelineError::extraction("OCR service returned 503"));
        }

        let pages = self.pages.lock().await.clone();
        Ok(stream::iter(pages.into_iter().map(Ok)).boxed())
    }
}

/// Enricher with fixed topics and keyword-based embeddings.
///
/// Texts mentioning "invoice" embed along axis 0, "contract" along axis 1,
/// anything else along axis 2.
#[derive(Default)]
pub struct ScriptedEnricher {
    fail_topics: AtomicBool,
    failing_text: Mutex<Option<String>>,
    embed_calls: AtomicUsize,
}

impl ScriptedEnricher {
    pub fn set_topics_failing(&self, fail: bool) {
        self.fail_topics.store(fail, Ordering::SeqCst);
    }

    /// Make embedding fail for pages with exactly this text.
    pub async fn fail_embedding_for(&self, text: &str) {
        *self.failing_text.lock().await = Some(text.to_string());
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }
}

pub fn axis_vector(axis: usize) -> Vec<f32> {
    let mut vector = vec![0.0; EMBEDDING_DIMENSION];
    vector[axis] = 1.0;
    vector
}

#[async_trait]
impl Enricher for ScriptedEnricher {
    async fn topics(&self, full_text: &str) -> Result<Vec<String>, PipelineError> {
        if self.fail_topics.load(Ordering::SeqCst) {
            return Err(PipelineError::enrichment("model unavailable"));
        }
        if full_text.contains("invoice") {
            Ok(strings(&["Billing", "Payments"]))
        } else {
            Ok(strings(&["Legal", "Billing"]))
        }
    }

    async fn questions(
        &self,
        _full_text: &str,
        topics: &[String],
    ) -> Result<Vec<String>, PipelineError> {
        Ok(topics
            .iter()
            .map(|topic| format!("What does the document say about {}?", topic))
            .collect())
    }

    async fn embed_page(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_text.lock().await.as_deref() == Some(text) {
            return Err(PipelineError::enrichment("embedding quota exceeded"));
        }

        let axis = if text.contains("invoice") {
            0
        } else if text.contains("contract") {
            1
        } else {
            2
        };
        Ok(axis_vector(axis))
    }
}

/// Metadata source returning a fixed map, or failing.
#[derive(Default)]
pub struct StaticMetadataSource {
    metadata: HashMap<String, String>,
    fail: bool,
}

impl StaticMetadataSource {
    pub fn with_entry(key: &str, value: &str) -> Self {
        Self {
            metadata: HashMap::from([(key.to_string(), value.to_string())]),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            metadata: HashMap::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl ObjectMetadataSource for StaticMetadataSource {
    async fn custom_metadata(
        &self,
        _bucket: &str,
        _filename: &str,
    ) -> Result<HashMap<String, String>, PipelineError> {
        if self.fail {
            return Err(PipelineError::object_metadata("403 Forbidden"));
        }
        Ok(self.metadata.clone())
    }
}

/// A lifecycle wired to in-memory stores and scripted collaborators.
pub struct Harness {
    pub metadata: Arc<InMemoryMetadataStore>,
    pub vectors: Arc<InMemoryVectorIndex>,
    pub connection: Arc<MemoryConnection>,
    pub extractor: Arc<ScriptedExtractor>,
    pub enricher: Arc<ScriptedEnricher>,
    pub lifecycle: DocumentLifecycle,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_metadata_source(StaticMetadataSource::with_entry("owner", "legal"))
    }

    pub fn with_metadata_source(source: StaticMetadataSource) -> Self {
        let metadata = Arc::new(InMemoryMetadataStore::new());
        let vectors = Arc::new(InMemoryVectorIndex::default());
        let connection = Arc::new(MemoryConnection::new());
        let extractor = Arc::new(ScriptedExtractor::default());
        let enricher = Arc::new(ScriptedEnricher::default());

        let lifecycle = DocumentLifecycle::new(
            metadata.clone(),
            vectors.clone(),
            connection.clone(),
            extractor.clone(),
            enricher.clone(),
            Arc::new(source),
        );

        Self {
            metadata,
            vectors,
            connection,
            extractor,
            enricher,
            lifecycle,
        }
    }
}

pub fn document(filename: &str) -> DocumentRef {
    DocumentRef::new("inbox", filename).with_mime_type("application/pdf")
}
