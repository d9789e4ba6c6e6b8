//! Vector index schema.
//!
//! Datapoints are Redis hashes under `{prefix}:` with the fields
//! `filename` (TAG), `page` (NUMERIC), `content` (TEXT) and `embedding`
//! (FLAT FLOAT32 vector, cosine distance).

use crate::types::IndexHandle;

/// Hash field holding the filename.
pub const FIELD_FILENAME: &str = "filename";
/// Hash field holding the page index.
pub const FIELD_PAGE: &str = "page";
/// Hash field holding the page text.
pub const FIELD_CONTENT: &str = "content";
/// Hash field holding the embedding bytes.
pub const FIELD_EMBEDDING: &str = "embedding";
/// Alias of the computed distance in KNN queries.
pub const FIELD_DISTANCE: &str = "vector_distance";

/// Arguments of `FT.CREATE` (after the command name) for the given index.
pub fn create_index_args(index: &IndexHandle) -> Vec<String> {
    vec![
        index.name.clone(),
        "ON".to_string(),
        "HASH".to_string(),
        "PREFIX".to_string(),
        "1".to_string(),
        format!("{}:", index.prefix),
        "SCHEMA".to_string(),
        FIELD_FILENAME.to_string(),
        "TAG".to_string(),
        FIELD_PAGE.to_string(),
        "NUMERIC".to_string(),
        FIELD_CONTENT.to_string(),
        "TEXT".to_string(),
        FIELD_EMBEDDING.to_string(),
        "VECTOR".to_string(),
        "FLAT".to_string(),
        "6".to_string(),
        "TYPE".to_string(),
        "FLOAT32".to_string(),
        "DIM".to_string(),
        index.dimension.to_string(),
        "DISTANCE_METRIC".to_string(),
        "COSINE".to_string(),
    ]
}
