use std::sync::Arc;

use feedback_bucket::BucketStore;
use feedback_classifier::SentimentClassifier;
use tracing::{error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::HandlerConfig;
use crate::enrich::enrich_records;
use crate::error::Result;
use crate::outcome::{HandlerResponse, InvocationOutcome};
use crate::records::RecordReader;
use crate::trigger::{self, SourceObject, TriggerDecision};
use crate::writer::{output_key, write_document};

/// Filter → fetch → parse → enrich → write, run once per trigger event.
/// Clients are shared between invocations; no per-invocation state outlives
/// a call to [`FeedbackPipeline::handle`].
#[derive(Clone)]
pub struct FeedbackPipeline {
    bucket: Arc<dyn BucketStore>,
    classifier: Arc<dyn SentimentClassifier>,
    clock: Arc<dyn Clock>,
    config: HandlerConfig,
}

impl FeedbackPipeline {
    pub fn new(
        bucket: Arc<dyn BucketStore>,
        classifier: Arc<dyn SentimentClassifier>,
        config: HandlerConfig,
    ) -> Self {
        Self {
            bucket,
            classifier,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Runs the pipeline and converts the outcome into the runtime response.
    /// Never fails: errors become a 500 response.
    pub async fn handle(&self, payload: &serde_json::Value) -> HandlerResponse {
        self.outcome(payload).await.into_response()
    }

    #[tracing::instrument(skip_all)]
    pub async fn outcome(&self, payload: &serde_json::Value) -> InvocationOutcome {
        match self.run(payload).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(error = %err, "feedback processing failed");
                InvocationOutcome::Failed {
                    message: err.to_string(),
                }
            }
        }
    }

    pub async fn run(&self, payload: &serde_json::Value) -> Result<InvocationOutcome> {
        match trigger::filter(payload, &self.config.input_prefix)? {
            TriggerDecision::Skip { key } => {
                info!(
                    %key,
                    prefix = %self.config.input_prefix,
                    "skipping object outside input prefix"
                );
                Ok(InvocationOutcome::Skipped {
                    key,
                    input_prefix: self.config.input_prefix.clone(),
                })
            }
            TriggerDecision::Process(source) => self.process(source).await,
        }
    }

    #[tracing::instrument(skip_all, fields(bucket = %source.bucket, key = %source.key))]
    async fn process(&self, source: SourceObject) -> Result<InvocationOutcome> {
        let raw = self.bucket.get_object(&source.bucket, &source.key).await?;
        let text = String::from_utf8(raw.to_vec())?;

        let reader = RecordReader::new(&text)?;
        if !reader.headers().any(|header| header == self.config.feedback_column) {
            warn!(
                column = %self.config.feedback_column,
                "input has no feedback column; every row will be dropped"
            );
        }

        let enriched = enrich_records(
            reader,
            self.classifier.as_ref(),
            self.clock.as_ref(),
            &self.config,
        )
        .await?;

        let key = output_key(&self.config.output_prefix, self.clock.now());
        write_document(self.bucket.as_ref(), &source.bucket, &key, &enriched.records).await?;

        info!(
            processed = enriched.records.len(),
            dropped = enriched.dropped,
            output_key = %key,
            "wrote enriched feedback"
        );

        Ok(InvocationOutcome::Processed {
            input_key: source.key,
            output_key: key,
            count: enriched.records.len(),
        })
    }
}
