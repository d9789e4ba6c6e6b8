//! Document metadata records persisted in the key-value store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalise a filename into the form used inside store keys.
///
/// Object names may contain `/`, which is replaced by `-`. The mapping is
/// not injective (`a/b.pdf` and `a-b.pdf` share a key), so readers compare
/// the stored `filename` before trusting a record.
pub fn storage_key(filename: &str) -> String {
    filename.replace('/', "-")
}

/// Key of the document record for `filename`.
pub fn document_key(filename: &str) -> String {
    format!("document:{}", storage_key(filename))
}

/// Key of the topics record for `filename`.
pub fn topics_key(filename: &str) -> String {
    format!("topics:{}", storage_key(filename))
}

/// Key of the questions record for `filename`.
pub fn questions_key(filename: &str) -> String {
    format!("questions:{}", storage_key(filename))
}

/// Reference to a source object in the storage bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    /// Bucket holding the object.
    pub bucket: String,
    /// Object name, unique per document.
    pub filename: String,
    /// MIME type reported by the storage event.
    pub mime_type: Option<String>,
    /// Upload time reported by the storage event.
    pub time_uploaded: Option<DateTime<Utc>>,
}

impl DocumentRef {
    /// Create a reference without MIME type or upload time.
    pub fn new(bucket: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            filename: filename.into(),
            mime_type: None,
            time_uploaded: None,
        }
    }

    /// Set the MIME type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Set the upload time.
    pub fn with_time_uploaded(mut self, time_uploaded: DateTime<Utc>) -> Self {
        self.time_uploaded = Some(time_uploaded);
        self
    }

    /// `gs://` URI of the object.
    pub fn uri(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.filename)
    }
}

/// Metadata for one source file.
///
/// `pages` and `page_count` are filled in by content processing;
/// `topics_ref`/`questions_ref` point at the enrichment records once they
/// have been written. `processed` is set once the page datapoints for
/// `event_id` are in the vector index. `creation_time` is set on the first
/// successful creation and carried over by every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub filename: String,
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Last event that produced this state.
    pub event_id: String,
    #[serde(default)]
    pub time_uploaded: Option<DateTime<Utc>>,
    #[serde(default)]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub update_time: Option<DateTime<Utc>>,
    /// Opaque user metadata copied from the storage object.
    #[serde(default, rename = "metadata")]
    pub custom_metadata: HashMap<String, String>,
    #[serde(default)]
    pub pages: Vec<String>,
    #[serde(default)]
    pub page_count: usize,
    #[serde(default)]
    pub topics_ref: Option<String>,
    #[serde(default)]
    pub questions_ref: Option<String>,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub processed: bool,
}

impl DocumentRecord {
    /// Create an empty record for the given document and event.
    pub fn new(document: &DocumentRef, event_id: impl Into<String>) -> Self {
        Self {
            filename: document.filename.clone(),
            bucket: document.bucket.clone(),
            mime_type: document.mime_type.clone(),
            event_id: event_id.into(),
            time_uploaded: document.time_uploaded,
            creation_time: None,
            update_time: None,
            custom_metadata: HashMap::new(),
            pages: Vec::new(),
            page_count: 0,
            topics_ref: None,
            questions_ref: None,
            is_new: false,
            processed: false,
        }
    }

    /// Replace the extracted pages, keeping `page_count` in step.
    pub fn set_pages(&mut self, pages: Vec<String>) {
        self.page_count = pages.len();
        self.pages = pages;
    }

    /// Attach the enrichment record references.
    pub fn set_refs(&mut self, refs: RecordRefs) {
        self.topics_ref = Some(refs.topics_ref);
        self.questions_ref = Some(refs.questions_ref);
    }

    /// Whether the record was written by `event_id` and fully processed.
    pub fn is_processed_by(&self, event_id: &str) -> bool {
        self.processed && self.event_id == event_id
    }

    /// Whether this record belongs to `filename` rather than to another
    /// object name mapping to the same key.
    pub fn belongs_to(&self, filename: &str) -> bool {
        self.filename == filename
    }

    /// Number of datapoints this record is expected to own in the vector index.
    pub fn indexed_page_count(&self) -> usize {
        self.page_count.max(self.pages.len())
    }
}

/// Topics extracted for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicsRecord {
    pub filename: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Questions generated for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionsRecord {
    pub filename: String,
    #[serde(default)]
    pub questions: Vec<String>,
}

/// Keys of the topics and questions records written for a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRefs {
    pub topics_ref: String,
    pub questions_ref: String,
}

impl RecordRefs {
    /// References for `filename` under the standard key scheme.
    pub fn for_filename(filename: &str) -> Self {
        Self {
            topics_ref: topics_key(filename),
            questions_ref: questions_key(filename),
        }
    }
}
