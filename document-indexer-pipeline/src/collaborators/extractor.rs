//! Text extraction collaborator.

use std::fmt::Display;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::errors::PipelineError;
use document_indexer_shared::DocumentRef;

/// Lazy, finite sequence of page texts in page order.
///
/// The stream is consumed once; it cannot be restarted.
pub type PageStream = BoxStream<'static, Result<String, PipelineError>>;

/// Produces the text of a document page by page.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Start extracting `document`.
    ///
    /// # Returns
    ///
    /// * `Ok(PageStream)` - Pages as they become available
    /// * `Err(PipelineError::ExtractionFailed)` - If the extraction could not be started
    async fn extract(&self, document: &DocumentRef) -> Result<PageStream, PipelineError>;
}

#[derive(Serialize)]
struct ExtractionRequest<'a> {
    uri: String,
    mime_type: Option<&'a str>,
}

#[derive(Deserialize)]
struct PageLine {
    text: String,
}

/// OCR service client.
///
/// Posts `{"uri", "mime_type"}` to the endpoint and reads the reply as
/// newline-delimited JSON, one `{"text": ...}` object per page.
pub struct HttpTextExtractor {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTextExtractor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl TextExtractor for HttpTextExtractor {
    #[instrument(skip(self, document), fields(uri = %document.uri()))]
    async fn extract(&self, document: &DocumentRef) -> Result<PageStream, PipelineError> {
        let request = ExtractionRequest {
            uri: document.uri(),
            mime_type: document.mime_type.as_deref(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| PipelineError::extraction(format!("OCR request failed: {}", e)))?;

        debug!("OCR response streaming");
        Ok(ndjson_pages(response.bytes_stream()))
    }
}

/// Split a byte stream into NDJSON page lines.
pub(crate) fn ndjson_pages<S, B, E>(chunks: S) -> PageStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = (chunks.boxed(), Vec::<u8>::new(), false);

    stream::unfold(state, |(mut chunks, mut buffer, mut done)| async move {
        loop {
            if let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                if let Some(page) = parse_page_line(&line) {
                    return Some((page, (chunks, buffer, done)));
                }
                continue;
            }

            if done {
                let line = std::mem::take(&mut buffer);
                return parse_page_line(&line).map(|page| (page, (chunks, buffer, done)));
            }

            match chunks.next().await {
                Some(Ok(bytes)) => buffer.extend_from_slice(bytes.as_ref()),
                Some(Err(e)) => {
                    buffer.clear();
                    let error = PipelineError::extraction(format!("OCR stream failed: {}", e));
                    return Some((Err(error), (chunks, buffer, true)));
                }
                None => done = true,
            }
        }
    })
    .boxed()
}

/// Decode one line; blank lines yield `None`.
fn parse_page_line(line: &[u8]) -> Option<Result<String, PipelineError>> {
    if line.iter().all(|b| b.is_ascii_whitespace()) {
        return None;
    }

    Some(
        serde_json::from_slice::<PageLine>(line)
            .map(|page| page.text)
            .map_err(|e| PipelineError::extraction(format!("Invalid page line: {}", e))),
    )
}
