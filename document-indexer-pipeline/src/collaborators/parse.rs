//! Parsing of model replies into lists of strings.

use thiserror::Error;

/// A model reply that does not contain a JSON array of strings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentParseError {
    /// No `[...]` section was found in the reply.
    #[error("Reply contains no JSON array")]
    MissingArray,

    /// The array section is not a valid list of strings.
    #[error("Invalid JSON array: {0}")]
    InvalidArray(String),
}

/// Parse a reply of the form `["a", "b"]`, tolerating prose around the array.
///
/// When the reply does not start with `[`, the text from the first `[` to the
/// last `]` is parsed instead.
pub fn parse_string_list(reply: &str) -> Result<Vec<String>, EnrichmentParseError> {
    let trimmed = reply.trim();

    let candidate = if trimmed.starts_with('[') {
        trimmed
    } else {
        match (trimmed.find('['), trimmed.rfind(']')) {
            (Some(start), Some(end)) if start < end => &trimmed[start..=end],
            _ => return Err(EnrichmentParseError::MissingArray),
        }
    };

    serde_json::from_str(candidate).map_err(|e| EnrichmentParseError::InvalidArray(e.to_string()))
}
