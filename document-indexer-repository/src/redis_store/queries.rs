//! RediSearch query helpers.
//!
//! Builds the KNN query sent with `FT.SEARCH`, parses its reply, and scans
//! keyspaces by pattern.

use std::collections::HashMap;

use redis::aio::MultiplexedConnection;
use redis::{from_redis_value, Value};

use crate::errors::StoreError;
use crate::redis_store::index_config::{
    FIELD_CONTENT, FIELD_DISTANCE, FIELD_EMBEDDING, FIELD_FILENAME, FIELD_PAGE,
};
use document_indexer_shared::PageMatch;

/// Keys requested per `SCAN` round trip.
pub(crate) const SCAN_BATCH: usize = 100;

/// Query string for the `top_k` nearest neighbours of the `$vec` parameter.
pub(crate) fn knn_query(top_k: usize) -> String {
    format!(
        "*=>[KNN {} @{} $vec AS {}]",
        top_k, FIELD_EMBEDDING, FIELD_DISTANCE
    )
}

/// Encode an embedding as little-endian FLOAT32 bytes.
pub(crate) fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Whether a RediSearch error reports a missing index.
pub(crate) fn is_unknown_index(err: &redis::RedisError) -> bool {
    let message = err.to_string().to_lowercase();
    message.contains("unknown index") || message.contains("no such index")
}

/// Run a KNN search and return the matches in the order Redis sorted them.
pub(crate) async fn knn_search(
    connection: &mut MultiplexedConnection,
    index_name: &str,
    vector: &[f32],
    top_k: usize,
) -> Result<Vec<PageMatch>, StoreError> {
    let raw: Vec<Value> = redis::cmd("FT.SEARCH")
        .arg(index_name)
        .arg(knn_query(top_k))
        .arg("PARAMS")
        .arg(2)
        .arg("vec")
        .arg(vector_to_bytes(vector))
        .arg("SORTBY")
        .arg(FIELD_DISTANCE)
        .arg("ASC")
        .arg("RETURN")
        .arg(4)
        .arg(FIELD_FILENAME)
        .arg(FIELD_PAGE)
        .arg(FIELD_CONTENT)
        .arg(FIELD_DISTANCE)
        .arg("LIMIT")
        .arg(0)
        .arg(top_k)
        .arg("DIALECT")
        .arg(2)
        .query_async(connection)
        .await
        .map_err(|e| {
            if is_unknown_index(&e) {
                StoreError::IndexNotFound(index_name.to_string())
            } else {
                StoreError::from(e)
            }
        })?;

    parse_search_reply(&raw)
}

/// Parse an `FT.SEARCH` reply: `[total, key, [field, value, ...], key, ...]`.
pub(crate) fn parse_search_reply(raw: &[Value]) -> Result<Vec<PageMatch>, StoreError> {
    let mut matches = Vec::new();
    let mut entries = raw.iter().skip(1);

    while let Some(key_value) = entries.next() {
        let key: String = from_redis_value(key_value)
            .map_err(|e| StoreError::serialization(format!("Invalid result key: {}", e)))?;
        let fields: Vec<String> = match entries.next() {
            Some(value) => from_redis_value(value).map_err(|e| {
                StoreError::serialization(format!("Invalid fields for {}: {}", key, e))
            })?,
            None => Vec::new(),
        };

        let fields: HashMap<&str, &str> = fields
            .chunks(2)
            .filter_map(|pair| match pair {
                [name, value] => Some((name.as_str(), value.as_str())),
                _ => None,
            })
            .collect();

        let filename = fields
            .get(FIELD_FILENAME)
            .map(|v| v.to_string())
            .unwrap_or_default();
        let page = fields
            .get(FIELD_PAGE)
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);
        let content = fields
            .get(FIELD_CONTENT)
            .map(|v| v.to_string())
            .unwrap_or_default();
        let distance = fields
            .get(FIELD_DISTANCE)
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(f32::MAX);

        matches.push(PageMatch {
            key,
            filename,
            page,
            content,
            distance,
        });
    }

    Ok(matches)
}

/// Collect every key matching `pattern`.
pub(crate) async fn scan_keys(
    connection: &mut MultiplexedConnection,
    pattern: &str,
) -> Result<Vec<String>, StoreError> {
    let mut cursor: u64 = 0;
    let mut found = Vec::new();

    loop {
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(SCAN_BATCH)
            .query_async(connection)
            .await?;

        found.extend(keys);

        if next == 0 {
            break;
        }
        cursor = next;
    }

    Ok(found)
}
