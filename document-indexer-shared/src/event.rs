//! Storage events that drive the document lifecycle.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::document::DocumentRef;

/// Kind of change reported for a storage object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A new object generation was written.
    Finalized,
    /// Object metadata changed.
    MetadataUpdated,
    /// The object was removed.
    Deleted,
    /// Any other event type; ignored by the pipeline.
    Other(String),
}

impl EventKind {
    /// Parse either a short kind (`finalized`) or a CloudEvents type
    /// (`google.cloud.storage.object.v1.finalized`).
    pub fn parse(raw: &str) -> Self {
        let short = raw.rsplit('.').next().unwrap_or(raw);
        match short {
            "finalized" => Self::Finalized,
            "metadataUpdated" => Self::MetadataUpdated,
            "deleted" => Self::Deleted,
            _ => Self::Other(raw.to_string()),
        }
    }

    /// Whether this kind carries new document content.
    pub fn is_upsert(&self) -> bool {
        matches!(self, Self::Finalized | Self::MetadataUpdated)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finalized => write!(f, "finalized"),
            Self::MetadataUpdated => write!(f, "metadataUpdated"),
            Self::Deleted => write!(f, "deleted"),
            Self::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// A parsed storage-object change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub kind: EventKind,
    pub event_id: String,
    pub bucket: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub time_created: Option<DateTime<Utc>>,
}

impl StorageEvent {
    /// The document this event refers to.
    pub fn document(&self) -> DocumentRef {
        DocumentRef {
            bucket: self.bucket.clone(),
            filename: self.filename.clone(),
            mime_type: self.content_type.clone(),
            time_uploaded: self.time_created,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        assert_eq!(EventKind::parse("finalized"), EventKind::Finalized);
        assert_eq!(
            EventKind::parse("google.cloud.storage.object.v1.metadataUpdated"),
            EventKind::MetadataUpdated
        );
        assert_eq!(
            EventKind::parse("google.cloud.storage.object.v1.deleted"),
            EventKind::Deleted
        );
        assert_eq!(
            EventKind::parse("google.cloud.storage.object.v1.archived"),
            EventKind::Other("google.cloud.storage.object.v1.archived".to_string())
        );
    }

    #[test]
    fn test_is_upsert() {
        assert!(EventKind::Finalized.is_upsert());
        assert!(EventKind::MetadataUpdated.is_upsert());
        assert!(!EventKind::Deleted.is_upsert());
    }
}
