//! Consumer module for the document indexer pipeline.
//!
//! Receives storage event envelopes from Kafka and hands them to the run
//! loop one at a time.

mod envelope;
mod kafka_consumer;
mod messages;

pub use envelope::parse_envelope;
pub use kafka_consumer::{KafkaConsumer, DEFAULT_STORAGE_EVENTS_TOPIC};
pub use messages::{Acknowledgment, StreamMessage};
