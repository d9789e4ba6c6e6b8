//! External services the lifecycle depends on.
//!
//! Each collaborator is a trait so the lifecycle can run against scripted
//! fakes; the HTTP and OpenAI adapters are the production implementations.

mod enricher;
mod extractor;
mod metadata_source;
mod openai;
mod parse;

pub use enricher::Enricher;
pub use extractor::{HttpTextExtractor, PageStream, TextExtractor};
pub use metadata_source::{HttpObjectMetadataSource, ObjectMetadataSource, DEFAULT_STORAGE_API_URL};
pub use openai::{
    OpenAiConfig, OpenAiEnricher, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_OPENAI_BASE_URL,
};
pub use parse::{parse_string_list, EnrichmentParseError};
