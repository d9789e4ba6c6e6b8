//! # Document Indexer Repository
//!
//! Traits and implementations for the two stores the document indexer writes
//! to: the metadata key-value store (document, topics and questions records)
//! and the vector index (one datapoint per document page).
//!
//! Redis backs both in production; the in-memory implementations in
//! [`memory`] serve tests and local runs.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod redis_store;
pub mod types;

pub use config::RepositoryConfig;
pub use errors::StoreError;
pub use interfaces::{ManagedConnection, MetadataStore, VectorIndex};
pub use redis_store::{RedisMetadataStore, RedisVectorIndex, StoreConnection};
pub use types::IndexHandle;
