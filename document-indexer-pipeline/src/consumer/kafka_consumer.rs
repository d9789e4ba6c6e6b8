//! Kafka consumer implementation for the document indexer.
//!
//! Consumes storage event envelopes and forwards them to the run loop one
//! at a time, committing each offset only after the event was handled.

use std::time::Duration;

use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer, StreamConsumer},
    message::{BorrowedMessage, Message as KafkaMessage},
    Offset, TopicPartitionList,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::envelope::parse_envelope;
use crate::consumer::messages::{Acknowledgment, StreamMessage};
use crate::errors::PipelineError;

/// Default topic carrying storage notifications.
pub const DEFAULT_STORAGE_EVENTS_TOPIC: &str = "storage.object.events";

/// Delay before a failed event is delivered again.
const DEFAULT_REDELIVERY_DELAY: Duration = Duration::from_secs(5);

/// Timeout for seeking back to a failed offset.
const SEEK_TIMEOUT: Duration = Duration::from_secs(10);

/// Kafka consumer for storage events.
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    topics: Vec<String>,
    redelivery_delay: Duration,
}

impl KafkaConsumer {
    /// Create a new Kafka consumer.
    ///
    /// # Arguments
    ///
    /// * `brokers` - Kafka broker addresses (comma-separated)
    /// * `group_id` - Consumer group ID
    /// * `topic` - Topic carrying storage event envelopes
    ///
    /// # Returns
    ///
    /// * `Ok(KafkaConsumer)` - A new consumer instance
    /// * `Err(PipelineError)` - If consumer creation fails
    pub fn new(brokers: &str, group_id: &str, topic: &str) -> Result<Self, PipelineError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("session.timeout.ms", "6000")
            .create()
            .map_err(|e| PipelineError::kafka(e.to_string()))?;

        info!(brokers = %brokers, group_id = %group_id, topic = %topic, "Created Kafka consumer");

        Ok(Self {
            consumer,
            topics: vec![topic.to_string()],
            redelivery_delay: DEFAULT_REDELIVERY_DELAY,
        })
    }

    /// Set the delay before a failed event is delivered again.
    pub fn with_redelivery_delay(mut self, delay: Duration) -> Self {
        self.redelivery_delay = delay;
        self
    }

    /// Subscribe to configured topics.
    pub fn subscribe(&self) -> Result<(), PipelineError> {
        let topics: Vec<&str> = self.topics.iter().map(|s| s.as_str()).collect();
        self.consumer.subscribe(&topics)?;

        info!(topics = ?self.topics, "Subscribed to Kafka topics");
        Ok(())
    }

    /// Start consuming messages and send them through the channel.
    ///
    /// # Arguments
    ///
    /// * `sender` - Channel to send events to
    /// * `shutdown` - Shutdown signal receiver
    #[instrument(skip(self, sender, shutdown))]
    pub async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), PipelineError> {
        use futures::StreamExt;

        let mut message_stream = self.consumer.stream();

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Consumer received shutdown signal");
                    let _ = sender.send(StreamMessage::End).await;
                    break;
                }
                message = message_stream.next() => {
                    match message {
                        Some(Ok(msg)) => {
                            if let Err(e) = self.process_message(&msg, &sender).await {
                                error!(error = %e, "Failed to process message");
                                if matches!(e, PipelineError::ChannelError(_)) {
                                    break;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Kafka error");
                            let _ = sender.send(StreamMessage::Error(e.to_string())).await;
                        }
                        None => {
                            info!("Kafka stream ended");
                            let _ = sender.send(StreamMessage::End).await;
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Deliver one message and commit or rewind depending on the outcome.
    async fn process_message(
        &self,
        msg: &BorrowedMessage<'_>,
        sender: &mpsc::Sender<StreamMessage>,
    ) -> Result<(), PipelineError> {
        let topic = msg.topic();
        let partition = msg.partition();
        let offset = msg.offset();

        debug!(
            topic = %topic,
            partition = partition,
            offset = offset,
            "Processing message"
        );

        let payload = match msg.payload() {
            Some(p) => p,
            None => {
                debug!("Received message with empty payload");
                return self.commit(topic, partition, offset);
            }
        };

        let event = match parse_envelope(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(offset = offset, error = %e, "Skipping malformed envelope");
                return self.commit(topic, partition, offset);
            }
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        sender
            .send(StreamMessage::Event { event, ack: ack_tx })
            .await
            .map_err(|e| PipelineError::ChannelError(e.to_string()))?;

        let ack = ack_rx
            .await
            .unwrap_or_else(|_| Acknowledgment::failure("run loop dropped the event"));

        if ack.success {
            return self.commit(topic, partition, offset);
        }

        warn!(
            offset = offset,
            error = ?ack.error,
            retry_in_ms = self.redelivery_delay.as_millis() as u64,
            "Event failed, rewinding for redelivery"
        );
        tokio::time::sleep(self.redelivery_delay).await;
        self.consumer
            .seek(topic, partition, Offset::Offset(offset), SEEK_TIMEOUT)?;

        Ok(())
    }

    fn commit(&self, topic: &str, partition: i32, offset: i64) -> Result<(), PipelineError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(topic, partition, Offset::Offset(offset + 1))?;
        self.consumer.commit(&tpl, CommitMode::Async)?;
        Ok(())
    }
}
