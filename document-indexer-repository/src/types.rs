//! Request and response types for store operations.

/// Handle to an existing vector index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHandle {
    /// Index name.
    pub name: String,
    /// Prefix under which datapoint keys are stored.
    pub prefix: String,
    /// Embedding dimension the index was created with.
    pub dimension: usize,
}

impl IndexHandle {
    pub fn new(name: impl Into<String>, prefix: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            dimension,
        }
    }

    /// Pattern matching every datapoint key of this index.
    pub fn key_pattern(&self) -> String {
        format!("{}:*", self.prefix)
    }

    /// Build a datapoint key from a unique id.
    pub fn datapoint_key(&self, id: &str) -> String {
        format!("{}:{}", self.prefix, id)
    }
}
