//! # Document Indexer Pipeline
//!
//! This crate turns storage-object change events into indexed documents.
//!
//! ## Architecture
//!
//! 1. **Consumer**: Receives storage event envelopes from Kafka
//! 2. **Lifecycle**: Decides create, update or delete and runs content processing
//! 3. **Collaborators**: Text extraction, enrichment and object metadata services
//! 4. **Orchestrator**: Routes events to the lifecycle and acknowledges them
//!
//! [`retrieval::PageRetriever`] serves the read side: similarity lookups over
//! the indexed pages and the topic and question catalogues.

pub mod collaborators;
pub mod consumer;
pub mod errors;
pub mod lifecycle;
pub mod orchestrator;
pub mod retrieval;

pub use errors::PipelineError;
pub use lifecycle::{DocumentLifecycle, LifecycleConfig, LifecycleOutcome};
