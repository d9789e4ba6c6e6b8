//! Vector index datapoints and similarity matches.

/// Dimension of every page embedding.
pub const EMBEDDING_DIMENSION: usize = 1536;

/// One indexed page of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorDatapoint {
    pub filename: String,
    /// Zero-based page index.
    pub page: usize,
    pub content: String,
    pub embedding: Vec<f32>,
}

impl VectorDatapoint {
    pub fn new(
        filename: impl Into<String>,
        page: usize,
        content: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            filename: filename.into(),
            page,
            content: content.into(),
            embedding,
        }
    }

    /// True when the embedding is the all-zero fallback vector.
    pub fn is_zero_vector(&self) -> bool {
        self.embedding.iter().all(|v| *v == 0.0)
    }
}

/// A ranked result of a similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct PageMatch {
    /// Key of the datapoint in the index.
    pub key: String,
    pub filename: String,
    pub page: usize,
    pub content: String,
    /// Cosine distance to the query vector; lower is closer.
    pub distance: f32,
}

/// Settings for a similarity lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalSettings {
    /// Maximum number of neighbours requested from the index.
    pub top_k: usize,
    /// Matches with a distance above this value are dropped.
    pub score_threshold: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 25,
            score_threshold: 0.7,
        }
    }
}

impl RetrievalSettings {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_score_threshold(mut self, score_threshold: f32) -> Self {
        self.score_threshold = score_threshold;
        self
    }

    /// Whether a match passes the distance threshold.
    pub fn accepts(&self, candidate: &PageMatch) -> bool {
        candidate.distance <= self.score_threshold
    }
}
