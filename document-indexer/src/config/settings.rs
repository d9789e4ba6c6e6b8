//! Typed settings read from the environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::IndexingError;
use document_indexer_pipeline::collaborators::{OpenAiConfig, DEFAULT_STORAGE_API_URL};
use document_indexer_pipeline::consumer::DEFAULT_STORAGE_EVENTS_TOPIC;
use document_indexer_repository::RepositoryConfig;

/// Default Kafka broker address.
const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";

/// Default Kafka consumer group ID.
const DEFAULT_KAFKA_GROUP_ID: &str = "document-indexer";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }

    /// Read `LOG_FORMAT`; anything but `json` selects text output.
    pub fn from_env() -> Self {
        env::var("LOG_FORMAT")
            .map(|raw| Self::parse(&raw))
            .unwrap_or_default()
    }
}

/// Kafka consumer settings.
#[derive(Debug, Clone)]
pub struct KafkaSettings {
    pub broker: String,
    pub group_id: String,
    pub topic: String,
}

/// Everything the indexer needs to start.
#[derive(Debug, Clone)]
pub struct Settings {
    pub repository: RepositoryConfig,
    pub kafka: KafkaSettings,
    pub ocr_endpoint: String,
    pub storage_api_url: String,
    pub openai: OpenAiConfig,
}

impl Settings {
    /// Read settings from process environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `REDIS_URL`: Redis server URL (default: redis://localhost:6379)
    /// - `REDIS_VECTOR_INDEX` or `INDEX_ID`: vector index name (default: document_index)
    /// - `REDIS_VECTOR_PREFIX`: datapoint key prefix (default: docs)
    /// - `STORE_RETRY_ATTEMPTS`: connection attempts (default: 3)
    /// - `STORE_RETRY_DELAY_MS`: delay between attempts (default: 1000)
    /// - `KAFKA_BROKER`: Kafka broker address (default: localhost:9092)
    /// - `KAFKA_GROUP_ID`: consumer group ID (default: document-indexer)
    /// - `KAFKA_TOPIC`: storage events topic (default: storage.object.events)
    /// - `OCR_ENDPOINT`: text extraction service URL (required)
    /// - `STORAGE_API_URL`: storage JSON API base URL
    /// - `OPENAI_API_KEY`: API key (required)
    /// - `OPENAI_BASE_URL`, `OPENAI_MODEL`, `OPENAI_EMBEDDING_MODEL`: API overrides
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`, which returns the value of a variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, IndexingError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| IndexingError::config(format!("{} must be set", key)))
        };

        let mut repository = RepositoryConfig::default();
        if let Some(url) = get("REDIS_URL") {
            repository.redis_url = url;
        }
        if let Some(index) = get("REDIS_VECTOR_INDEX").or_else(|| get("INDEX_ID")) {
            repository.index_name = index;
        }
        if let Some(prefix) = get("REDIS_VECTOR_PREFIX") {
            repository.key_prefix = prefix;
        }
        let attempts = parse_or(get("STORE_RETRY_ATTEMPTS"), "STORE_RETRY_ATTEMPTS", 3usize)?;
        let delay_ms = parse_or(get("STORE_RETRY_DELAY_MS"), "STORE_RETRY_DELAY_MS", 1000u64)?;
        repository = repository.with_retry(attempts, Duration::from_millis(delay_ms));

        let kafka = KafkaSettings {
            broker: get("KAFKA_BROKER").unwrap_or_else(|| DEFAULT_KAFKA_BROKER.to_string()),
            group_id: get("KAFKA_GROUP_ID").unwrap_or_else(|| DEFAULT_KAFKA_GROUP_ID.to_string()),
            topic: get("KAFKA_TOPIC").unwrap_or_else(|| DEFAULT_STORAGE_EVENTS_TOPIC.to_string()),
        };

        let mut openai = OpenAiConfig::new(required("OPENAI_API_KEY")?);
        if let Some(base_url) = get("OPENAI_BASE_URL") {
            openai = openai.with_base_url(base_url);
        }
        if let Some(model) = get("OPENAI_MODEL") {
            openai = openai.with_model(model);
        }
        if let Some(model) = get("OPENAI_EMBEDDING_MODEL") {
            openai = openai.with_embedding_model(model);
        }

        Ok(Self {
            repository,
            kafka,
            ocr_endpoint: required("OCR_ENDPOINT")?,
            storage_api_url: get("STORAGE_API_URL")
                .unwrap_or_else(|| DEFAULT_STORAGE_API_URL.to_string()),
            openai,
        })
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &str, default: T) -> Result<T, IndexingError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| IndexingError::config(format!("{} is not a valid number: {}", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("OPENAI_API_KEY", "sk-test"),
        ("OCR_ENDPOINT", "http://ocr.local/extract"),
    ];

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(settings.repository.redis_url, "redis://localhost:6379");
        assert_eq!(settings.repository.index_name, "document_index");
        assert_eq!(settings.repository.key_prefix, "docs");
        assert_eq!(settings.repository.retry_attempts, 3);
        assert_eq!(settings.repository.retry_delay, Duration::from_secs(1));
        assert_eq!(settings.kafka.broker, "localhost:9092");
        assert_eq!(settings.kafka.group_id, "document-indexer");
        assert_eq!(settings.kafka.topic, "storage.object.events");
        assert_eq!(settings.storage_api_url, DEFAULT_STORAGE_API_URL);
        assert_eq!(settings.openai.model, "gpt-4.1");
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("REDIS_URL", "redis://cache:6380"),
            ("INDEX_ID", "legacy_index"),
            ("STORE_RETRY_ATTEMPTS", "5"),
            ("STORE_RETRY_DELAY_MS", "250"),
            ("KAFKA_TOPIC", "gcs.events"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
        ]);

        let settings = Settings::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(settings.repository.redis_url, "redis://cache:6380");
        assert_eq!(settings.repository.index_name, "legacy_index");
        assert_eq!(settings.repository.retry_attempts, 5);
        assert_eq!(settings.repository.retry_delay, Duration::from_millis(250));
        assert_eq!(settings.kafka.topic, "gcs.events");
        assert_eq!(settings.openai.model, "gpt-4o-mini");
    }

    #[test]
    fn test_vector_index_name_takes_precedence() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([("REDIS_VECTOR_INDEX", "pages"), ("INDEX_ID", "legacy_index")]);

        let settings = Settings::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(settings.repository.index_name, "pages");
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("text"), LogFormat::Text);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Text);
    }

    #[test]
    fn test_missing_required_variable() {
        let result = Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")]));

        match result {
            Err(IndexingError::ConfigError(msg)) => assert!(msg.contains("OCR_ENDPOINT")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_invalid_number() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("STORE_RETRY_ATTEMPTS", "three"));

        assert!(matches!(
            Settings::from_lookup(lookup(&vars)),
            Err(IndexingError::ConfigError(_))
        ));
    }
}
