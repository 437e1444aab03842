use feedback_classifier::SentimentClassifier;
use tracing::debug;

use crate::clock::{format_timestamp, Clock};
use crate::config::{HandlerConfig, SENTIMENT_FIELD, TIMESTAMP_FIELD};
use crate::error::Result;
use crate::records::Record;

#[derive(Debug, Default)]
pub struct Enriched {
    pub records: Vec<Record>,
    /// Rows skipped because the feedback column was missing or empty.
    pub dropped: usize,
}

/// Classifies each record's feedback text in order, one call at a time.
/// The first parse or classification error aborts the run and discards
/// everything enriched so far.
pub async fn enrich_records<I>(
    records: I,
    classifier: &dyn SentimentClassifier,
    clock: &dyn Clock,
    config: &HandlerConfig,
) -> Result<Enriched>
where
    I: IntoIterator<Item = std::result::Result<Record, csv::Error>>,
{
    let mut enriched = Enriched::default();

    for (row, record) in records.into_iter().enumerate() {
        let mut record = record?;

        let text = match record.get(&config.feedback_column) {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => {
                debug!(row, "dropping record without feedback");
                enriched.dropped += 1;
                continue;
            }
        };

        let sentiment = classifier
            .detect_sentiment(&text, &config.language_code)
            .await?;
        debug!(row, %sentiment, "classified record");

        record.insert(SENTIMENT_FIELD, sentiment.as_str());
        record.insert(TIMESTAMP_FIELD, format_timestamp(clock.now()));
        enriched.records.push(record);
    }

    Ok(enriched)
}
