//! Interface definitions for the store clients.
//!
//! The `MetadataStore` and `VectorIndex` traits allow dependency injection
//! and swappable backends; `ManagedConnection` exposes the lifecycle of the
//! shared connection both clients run on.

mod managed_connection;
mod metadata_store;
mod vector_index;

pub use managed_connection::ManagedConnection;
pub use metadata_store::MetadataStore;
pub use vector_index::VectorIndex;
