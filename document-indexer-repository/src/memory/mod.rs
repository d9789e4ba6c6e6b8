//! In-memory store implementations.
//!
//! Used by tests and local runs without Redis. They follow the same key
//! scheme and JSON encoding as the Redis clients.

mod connection;
mod metadata;
mod vector;

pub use connection::MemoryConnection;
pub use metadata::InMemoryMetadataStore;
pub use vector::{cosine_distance, InMemoryVectorIndex};
