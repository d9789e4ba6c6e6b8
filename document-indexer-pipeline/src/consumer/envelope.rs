//! Storage event envelope parsing.
//!
//! Two shapes are accepted:
//!
//! * CloudEvents: `{"type": "google.cloud.storage.object.v1.finalized",
//!   "data": {"id", "bucket", "name", "contentType", "timeCreated"}}`
//! * Flat: `{"kind": "finalized", "eventId", "bucket", "filename",
//!   "contentType", "timeCreated"}`

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::errors::PipelineError;
use document_indexer_shared::{EventKind, StorageEvent};

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
    #[serde(rename = "type")]
    event_type: Option<String>,
    kind: Option<String>,
    id: Option<String>,
    event_id: Option<String>,
    data: Option<ObjectData>,
    bucket: Option<String>,
    filename: Option<String>,
    content_type: Option<String>,
    time_created: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ObjectData {
    id: Option<String>,
    bucket: Option<String>,
    name: Option<String>,
    content_type: Option<String>,
    time_created: Option<String>,
}

fn required(value: Option<String>, field: &str) -> Result<String, PipelineError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PipelineError::malformed(format!("missing field `{}`", field)))
}

fn parse_time(raw: Option<String>) -> Result<Option<DateTime<Utc>>, PipelineError> {
    raw.map(|value| {
        DateTime::parse_from_rfc3339(&value)
            .map(|time| time.with_timezone(&Utc))
            .map_err(|e| {
                PipelineError::malformed(format!("invalid timeCreated `{}`: {}", value, e))
            })
    })
    .transpose()
}

/// Parse a JSON envelope into a [`StorageEvent`].
///
/// # Returns
///
/// * `Ok(StorageEvent)` - The parsed event
/// * `Err(PipelineError::MalformedEventEnvelope)` - If the payload is not JSON
///   or a required field (kind, event id, bucket, filename) is missing
pub fn parse_envelope(payload: &[u8]) -> Result<StorageEvent, PipelineError> {
    let raw: RawEnvelope = serde_json::from_slice(payload)
        .map_err(|e| PipelineError::malformed(format!("invalid JSON: {}", e)))?;

    let kind = required(raw.event_type.or(raw.kind), "type")?;
    let data = raw.data.unwrap_or_default();

    let event_id = required(data.id.or(raw.event_id).or(raw.id), "eventId")?;
    let bucket = required(data.bucket.or(raw.bucket), "bucket")?;
    let filename = required(data.name.or(raw.filename), "filename")?;

    Ok(StorageEvent {
        kind: EventKind::parse(&kind),
        event_id,
        bucket,
        filename,
        content_type: data.content_type.or(raw.content_type),
        time_created: parse_time(data.time_created.or(raw.time_created))?,
    })
}
