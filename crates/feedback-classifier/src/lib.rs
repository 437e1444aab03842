//! Sentiment classification backed by Amazon Comprehend.

use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_comprehend::config::Region;
use aws_sdk_comprehend::error::DisplayErrorContext;
use aws_sdk_comprehend::types::LanguageCode;
use aws_sdk_comprehend::Client;
use thiserror::Error;

pub const DEFAULT_REGION: &str = "eu-west-1";

/// Label returned by the classification service. Labels outside the four
/// documented values are kept verbatim rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Mixed,
    Other(String),
}

impl Sentiment {
    pub fn from_label(label: &str) -> Self {
        match label {
            "POSITIVE" => Sentiment::Positive,
            "NEGATIVE" => Sentiment::Negative,
            "NEUTRAL" => Sentiment::Neutral,
            "MIXED" => Sentiment::Mixed,
            other => Sentiment::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Sentiment::Positive => "POSITIVE",
            Sentiment::Negative => "NEGATIVE",
            Sentiment::Neutral => "NEUTRAL",
            Sentiment::Mixed => "MIXED",
            Sentiment::Other(label) => label,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("sdk error: {0}")]
    Sdk(String),
    #[error("classification response did not include a sentiment label")]
    MissingSentiment,
}

impl ClassifierError {
    /// Keeps the whole source chain; the SDK's own Display stops at
    /// "unhandled error" or "dispatch failure".
    fn from_sdk(err: impl StdError) -> Self {
        Self::Sdk(DisplayErrorContext(&err).to_string())
    }
}

#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn detect_sentiment(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<Sentiment, ClassifierError>;
}

#[derive(Debug, Clone)]
pub struct ComprehendConfig {
    pub region: String,
    pub endpoint: Option<String>,
}

impl Default for ComprehendConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
        }
    }
}

impl ComprehendConfig {
    /// Reads `COMPREHEND_REGION` and `COMPREHEND_ENDPOINT_URL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        Self {
            region: non_empty("COMPREHEND_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint: non_empty("COMPREHEND_ENDPOINT_URL"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ComprehendClassifier {
    client: Client,
}

impl ComprehendClassifier {
    pub async fn new(config: ComprehendConfig) -> Result<Self, ClassifierError> {
        if config.region.is_empty() {
            return Err(ClassifierError::Configuration(
                "comprehend region cannot be empty".into(),
            ));
        }

        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .load()
            .await;
        let mut builder = aws_sdk_comprehend::config::Builder::from(&shared_config);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
        })
    }
}

#[async_trait]
impl SentimentClassifier for ComprehendClassifier {
    #[tracing::instrument(skip(self, text), fields(text_len = text.len()))]
    async fn detect_sentiment(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<Sentiment, ClassifierError> {
        let output = self
            .client
            .detect_sentiment()
            .text(text)
            .language_code(LanguageCode::from(language_code))
            .send()
            .await
            .map_err(ClassifierError::from_sdk)?;

        output
            .sentiment()
            .map(|sentiment| Sentiment::from_label(sentiment.as_str()))
            .ok_or(ClassifierError::MissingSentiment)
    }
}
