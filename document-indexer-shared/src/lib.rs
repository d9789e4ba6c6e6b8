//! # Document Indexer Shared
//!
//! Data types shared by the repository, pipeline and binary crates of the
//! document indexer: document metadata records, vector datapoints and the
//! storage events that drive the pipeline.

mod document;
mod event;
mod vector;

pub use document::{
    document_key, questions_key, storage_key, topics_key, DocumentRecord, DocumentRef,
    QuestionsRecord, RecordRefs, TopicsRecord,
};
pub use event::{EventKind, StorageEvent};
pub use vector::{PageMatch, RetrievalSettings, VectorDatapoint, EMBEDDING_DIMENSION};
