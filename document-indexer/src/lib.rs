//! # Document Indexer
//!
//! Entry point and configuration for the event-driven document indexer.
//!
//! This crate reads the environment, wires the store clients, collaborators
//! and Kafka consumer together, and sets up logging.

pub mod config;
pub mod telemetry;

pub use config::{Dependencies, LogFormat, Settings};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] document_indexer_pipeline::PipelineError),

    /// Store error.
    #[error("Store error: {0}")]
    StoreError(#[from] document_indexer_repository::StoreError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
