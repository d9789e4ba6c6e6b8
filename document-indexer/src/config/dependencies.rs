//! Dependency initialization and wiring for the document indexer.

use std::sync::Arc;

use tracing::info;

use crate::config::Settings;
use crate::IndexingError;
use document_indexer_pipeline::{
    collaborators::{HttpObjectMetadataSource, HttpTextExtractor, OpenAiEnricher},
    consumer::KafkaConsumer,
    orchestrator::Orchestrator,
    DocumentLifecycle, LifecycleConfig,
};
use document_indexer_repository::{
    RedisMetadataStore, RedisVectorIndex, StoreConnection, VectorIndex,
};
use document_indexer_shared::EMBEDDING_DIMENSION;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies.
    ///
    /// Connects to Redis (with bounded retries) and makes sure the vector
    /// index exists before the consumer is created.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails
    pub async fn new(settings: Settings) -> Result<Self, IndexingError> {
        info!(
            redis_url = %settings.repository.redis_url,
            index = %settings.repository.index_name,
            kafka_broker = %settings.kafka.broker,
            kafka_group_id = %settings.kafka.group_id,
            kafka_topic = %settings.kafka.topic,
            "Initializing dependencies"
        );

        let index_name = settings.repository.index_name.clone();
        let connection = Arc::new(StoreConnection::open(settings.repository).await?);

        let metadata = Arc::new(RedisMetadataStore::new(connection.clone()));
        let vectors = Arc::new(RedisVectorIndex::new(connection.clone()));

        let index = vectors.ensure_index(&index_name, EMBEDDING_DIMENSION).await?;
        info!(index = %index.name, prefix = %index.prefix, "Vector index ready");

        let lifecycle = DocumentLifecycle::new(
            metadata,
            vectors,
            connection,
            Arc::new(HttpTextExtractor::new(settings.ocr_endpoint)),
            Arc::new(OpenAiEnricher::new(settings.openai)),
            Arc::new(HttpObjectMetadataSource::new(settings.storage_api_url)),
        )
        .with_config(LifecycleConfig::default().with_index_name(index_name));

        let consumer = KafkaConsumer::new(
            &settings.kafka.broker,
            &settings.kafka.group_id,
            &settings.kafka.topic,
        )
        .map_err(|e| IndexingError::config(format!("Failed to create Kafka consumer: {}", e)))?;

        info!("Kafka consumer created");

        let orchestrator = Orchestrator::new(consumer, Arc::new(lifecycle));

        Ok(Self { orchestrator })
    }
}
