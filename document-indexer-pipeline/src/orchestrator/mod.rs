//! Orchestrator module for the document indexer pipeline.
//!
//! Runs the consumer in the background and feeds its events to the
//! document lifecycle, acknowledging each one.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, instrument};

use crate::consumer::{Acknowledgment, KafkaConsumer, StreamMessage};
use crate::errors::PipelineError;
use crate::lifecycle::DocumentLifecycle;
use document_indexer_shared::StorageEvent;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Size of the message channel buffer.
    pub channel_buffer_size: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: 16,
        }
    }
}

/// Orchestrator that coordinates the pipeline components.
///
/// The orchestrator:
/// - Starts the consumer and routes its events to the lifecycle
/// - Acknowledges each event so the consumer can commit or rewind
/// - Releases the store connection on shutdown
pub struct Orchestrator {
    consumer: Arc<KafkaConsumer>,
    lifecycle: Arc<DocumentLifecycle>,
    config: OrchestratorConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(consumer: KafkaConsumer, lifecycle: Arc<DocumentLifecycle>) -> Self {
        Self::with_config(consumer, lifecycle, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        consumer: KafkaConsumer,
        lifecycle: Arc<DocumentLifecycle>,
        config: OrchestratorConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            consumer: Arc::new(consumer),
            lifecycle,
            config,
            shutdown_tx,
        }
    }

    /// Run the orchestrator.
    ///
    /// Blocks until the consumer stream ends or a shutdown signal arrives.
    #[instrument(skip(self))]
    pub async fn run(&mut self) -> Result<(), PipelineError> {
        info!("Starting document indexer orchestrator");

        self.consumer.subscribe()?;

        let (tx, mut rx) = mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);

        let consumer = self.consumer.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();

        let consumer_handle = tokio::spawn(async move {
            if let Err(e) = consumer.run(tx, shutdown_rx).await {
                error!(error = %e, "Consumer error");
            }
        });

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    match msg {
                        Some(StreamMessage::Event { event, ack }) => {
                            let acknowledgment = self.process_event(&event).await;
                            let _ = ack.send(acknowledgment);
                        }
                        Some(StreamMessage::Error(e)) => {
                            error!(error = %e, "Received error from consumer");
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Consumer stream ended");
                            break;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    let _ = self.shutdown_tx.send(());
                    break;
                }
            }
        }

        // Unblock a consumer waiting for an acknowledgment.
        drop(rx);
        let _ = consumer_handle.await;

        self.lifecycle.connection().release().await;

        info!("Orchestrator shutdown complete");
        Ok(())
    }

    /// Handle one event and build its acknowledgment.
    async fn process_event(&self, event: &StorageEvent) -> Acknowledgment {
        match self.lifecycle.handle(event).await {
            Ok(_) => Acknowledgment::success(),
            Err(e) => Acknowledgment::failure(e.to_string()),
        }
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
