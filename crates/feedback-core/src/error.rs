// crates/feedback-core/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Malformed trigger event: {0}")]
    Event(String),

    #[error("Storage error: {0}")]
    Bucket(#[from] feedback_bucket::BucketError),

    #[error("Object is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Sentiment classification failed: {0}")]
    Classifier(#[from] feedback_classifier::ClassifierError),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
