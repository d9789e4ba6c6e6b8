//! OpenAI-backed enrichment.
//!
//! Uses the chat completions endpoint for topics and questions and the
//! embeddings endpoint for page vectors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::collaborators::enricher::Enricher;
use crate::collaborators::parse::parse_string_list;
use crate::errors::PipelineError;

/// Default API base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model for topics and questions.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4.1";

/// Default embedding model; produces 1536-dimensional vectors.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Number of questions requested per document.
const QUESTION_COUNT: usize = 5;

/// Connection settings for the OpenAI API.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_embedding_model(mut self, embedding_model: impl Into<String>) -> Self {
        self.embedding_model = embedding_model.into();
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

fn topics_prompt(text: &str) -> String {
    format!(
        "Analyse the following text and extract its main topics or categories.\n\
         Return only the topics as a JSON list of strings.\n\
         For example: [\"Cancellation request\", \"Account update\"]\n\n\
         Text to analyse:\n{}",
        text
    )
}

fn questions_prompt(text: &str, topics: &[String]) -> String {
    format!(
        "Based on the following text and its topics, write a list of {} frequently asked \
         questions a user could ask about this content. Every question must be answerable \
         from the text.\n\
         Return only the questions as a JSON list of strings.\n\
         For example: [\"Can I cancel a transaction after it was approved?\"]\n\n\
         Topics: {}\n\n\
         Text:\n{}",
        QUESTION_COUNT,
        topics.join(", "),
        text
    )
}

/// [`Enricher`] calling the OpenAI REST API.
pub struct OpenAiEnricher {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiEnricher {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn complete(&self, prompt: &str) -> Result<String, PipelineError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response: ChatResponse = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| PipelineError::enrichment(format!("Chat request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| PipelineError::enrichment(format!("Invalid chat response: {}", e)))?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }

    /// Ask for a JSON list and parse it, degrading to an empty list.
    async fn complete_list(&self, prompt: &str, kind: &str) -> Result<Vec<String>, PipelineError> {
        let reply = self.complete(prompt).await?;

        Ok(parse_string_list(&reply).unwrap_or_else(|e| {
            warn!(kind = kind, error = %e, reply = %reply, "Unparseable model reply");
            Vec::new()
        }))
    }
}

#[async_trait]
impl Enricher for OpenAiEnricher {
    #[instrument(skip(self, full_text), fields(chars = full_text.len()))]
    async fn topics(&self, full_text: &str) -> Result<Vec<String>, PipelineError> {
        self.complete_list(&topics_prompt(full_text), "topics").await
    }

    #[instrument(skip(self, full_text, topics), fields(chars = full_text.len()))]
    async fn questions(
        &self,
        full_text: &str,
        topics: &[String],
    ) -> Result<Vec<String>, PipelineError> {
        self.complete_list(&questions_prompt(full_text, topics), "questions")
            .await
    }

    async fn embed_page(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: text,
        };

        let response: EmbeddingResponse = self
            .client
            .post(self.endpoint("embeddings"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| PipelineError::enrichment(format!("Embedding request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| PipelineError::enrichment(format!("Invalid embedding response: {}", e)))?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| PipelineError::enrichment("Embedding response has no data"))?;

        debug!(dimension = embedding.len(), "Page embedded");
        Ok(embedding)
    }
}
