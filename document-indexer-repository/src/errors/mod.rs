//! Error types for the document indexer repository.

mod store_error;

pub use store_error::StoreError;
