//! Error types for the document indexer pipeline.

use document_indexer_repository::StoreError;
use thiserror::Error;

/// Errors that can occur while handling a storage event.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The store connection could not be established or was lost.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Text extraction failed.
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// Topic or question generation failed.
    #[error("Enrichment failed: {0}")]
    EnrichmentFailed(String),

    /// Custom object metadata could not be read.
    #[error("Object metadata error: {0}")]
    ObjectMetadataError(String),

    /// Writing to or removing from the vector index failed.
    #[error("Index write failed: {0}")]
    IndexWriteFailed(String),

    /// The event envelope is missing required fields.
    #[error("Malformed event envelope: {0}")]
    MalformedEventEnvelope(String),

    /// A metadata store command failed.
    #[error("Store error: {0}")]
    StoreError(StoreError),

    /// Kafka-related error.
    #[error("Kafka error: {0}")]
    KafkaError(String),

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl PipelineError {
    /// Create an extraction error.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::ExtractionFailed(msg.into())
    }

    /// Create an enrichment error.
    pub fn enrichment(msg: impl Into<String>) -> Self {
        Self::EnrichmentFailed(msg.into())
    }

    /// Create an object metadata error.
    pub fn object_metadata(msg: impl Into<String>) -> Self {
        Self::ObjectMetadataError(msg.into())
    }

    /// Create a malformed envelope error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedEventEnvelope(msg.into())
    }

    /// Create a Kafka error.
    pub fn kafka(msg: impl Into<String>) -> Self {
        Self::KafkaError(msg.into())
    }

    /// Map a vector index failure.
    ///
    /// Connection failures stay `StoreUnavailable`; everything else is an
    /// index write failure.
    pub fn index_write(err: StoreError) -> Self {
        if err.is_connection_failure() {
            Self::StoreUnavailable(err.to_string())
        } else {
            Self::IndexWriteFailed(err.to_string())
        }
    }

    /// Whether the invocation cannot continue with the current connection.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        if err.is_connection_failure() {
            Self::StoreUnavailable(err.to_string())
        } else {
            Self::StoreError(err)
        }
    }
}

impl From<rdkafka::error::KafkaError> for PipelineError {
    fn from(err: rdkafka::error::KafkaError) -> Self {
        Self::KafkaError(err.to_string())
    }
}
