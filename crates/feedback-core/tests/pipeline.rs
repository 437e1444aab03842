use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use feedback_bucket::MemoryBucketStore;
use feedback_classifier::{ClassifierError, Sentiment, SentimentClassifier};
use feedback_core::clock::Clock;
use feedback_core::trigger::NotificationEvent;
use feedback_core::{FeedbackPipeline, HandlerConfig, InvocationOutcome};
use serde_json::{json, Value};

const BUCKET: &str = "customer-reviews";

/// Labels text by keyword and remembers every call it served.
#[derive(Default)]
struct KeywordClassifier {
    calls: Mutex<Vec<(String, String)>>,
    fail_on: Option<&'static str>,
}

impl KeywordClassifier {
    fn failing_on(text: &'static str) -> Self {
        Self {
            fail_on: Some(text),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SentimentClassifier for KeywordClassifier {
    async fn detect_sentiment(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<Sentiment, ClassifierError> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), language_code.to_string()));

        if self.fail_on == Some(text) {
            return Err(ClassifierError::Sdk("ThrottlingException: rate exceeded".into()));
        }

        let lower = text.to_lowercase();
        let positive = ["great", "loved", "excellent"].iter().any(|w| lower.contains(w));
        let negative = ["terrible", "cold", "awful"].iter().any(|w| lower.contains(w));
        Ok(match (positive, negative) {
            (true, true) => Sentiment::Mixed,
            (true, false) => Sentiment::Positive,
            (false, true) => Sentiment::Negative,
            (false, false) => Sentiment::Neutral,
        })
    }
}

/// Advances one second on every read.
struct SteppingClock {
    next_secs: AtomicI64,
}

impl SteppingClock {
    fn starting_at(at: DateTime<Utc>) -> Self {
        Self {
            next_secs: AtomicI64::new(at.timestamp()),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let secs = self.next_secs.fetch_add(1, Ordering::SeqCst);
        Utc.timestamp_opt(secs, 0).unwrap()
    }
}

struct FrozenClock(DateTime<Utc>);

impl Clock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

struct Harness {
    store: Arc<MemoryBucketStore>,
    classifier: Arc<KeywordClassifier>,
    pipeline: FeedbackPipeline,
}

impl Harness {
    fn new(classifier: KeywordClassifier) -> Self {
        let store = Arc::new(MemoryBucketStore::new());
        let classifier = Arc::new(classifier);
        let pipeline = FeedbackPipeline::new(
            store.clone(),
            classifier.clone(),
            HandlerConfig::default(),
        );
        Self {
            store,
            classifier,
            pipeline,
        }
    }

    fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.pipeline = self.pipeline.with_clock(Arc::new(clock));
        self
    }

    fn upload(&self, key: &str, contents: &[u8]) {
        self.store
            .insert(BUCKET, key, contents.to_vec(), "text/csv");
    }

    fn output(&self, key: &str) -> Vec<Value> {
        let object = self.store.object(BUCKET, key).expect("output object missing");
        assert_eq!(object.content_type, "application/json");
        serde_json::from_slice(&object.bytes).expect("output is not JSON")
    }
}

fn event(key: &str) -> Value {
    serde_json::to_value(NotificationEvent::for_object(BUCKET, key)).unwrap()
}

fn fixture(name: &str) -> Vec<u8> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name);
    std::fs::read(path).expect("read fixture")
}

fn processed_key(outcome: &InvocationOutcome) -> String {
    match outcome {
        InvocationOutcome::Processed { output_key, .. } => output_key.clone(),
        other => panic!("expected a processed outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn key_outside_prefix_is_skipped_without_side_effects() {
    let harness = Harness::new(KeywordClassifier::default());
    harness.upload("uploads/reviews.csv", b"Feedback\nGreat\n");

    let response = harness.pipeline.handle(&event("uploads/reviews.csv")).await;

    assert_eq!(response.status_code, 400);
    assert!(response.body.contains("uploads/reviews.csv"));
    assert_eq!(harness.store.put_count(), 0);
    assert!(harness.classifier.calls().is_empty());
}

#[tokio::test]
async fn drops_rows_without_feedback_and_keeps_other_columns() {
    let harness = Harness::new(KeywordClassifier::default());
    harness.upload(
        "feedback/sample.csv",
        b"Feedback,Name\n\"Great service\",Alice\n,Bob\n\"Terrible\",Carol",
    );

    let outcome = harness.pipeline.outcome(&event("feedback/sample.csv")).await;
    let key = processed_key(&outcome);
    let rows = harness.output(&key);

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["Name"], "Alice");
    assert_eq!(rows[0]["Feedback"], "Great service");
    assert_eq!(rows[0]["DetectedSentiment"], "POSITIVE");
    assert_eq!(rows[1]["Name"], "Carol");
    assert_eq!(rows[1]["DetectedSentiment"], "NEGATIVE");

    for row in &rows {
        let label = row["DetectedSentiment"].as_str().unwrap();
        assert!(["POSITIVE", "NEGATIVE", "NEUTRAL", "MIXED"].contains(&label));
        let stamp = row["ProcessedTimestamp"].as_str().unwrap();
        DateTime::parse_from_rfc3339(stamp).expect("timestamp is not ISO-8601");
        assert!(stamp.ends_with('Z'));
    }

    let columns: Vec<&String> = rows[0].as_object().unwrap().keys().collect();
    assert_eq!(
        columns,
        ["Feedback", "Name", "DetectedSentiment", "ProcessedTimestamp"]
    );

    assert_eq!(
        harness.classifier.calls(),
        vec![
            ("Great service".to_string(), "en".to_string()),
            ("Terrible".to_string(), "en".to_string()),
        ]
    );
}

#[tokio::test]
async fn every_row_with_feedback_is_emitted() {
    let harness = Harness::new(KeywordClassifier::default());
    harness.upload(
        "feedback/all.csv",
        b"Id,Feedback,Store\n1,Great,North\n2,Meh,South\n3,Awful,East\n",
    );

    let response = harness.pipeline.handle(&event("feedback/all.csv")).await;
    assert_eq!(response.status_code, 200);
    assert!(response.body.starts_with("✅ Processed 3 entries from 'feedback/all.csv'"));

    let key = harness
        .store
        .keys(BUCKET)
        .into_iter()
        .find(|key| key.starts_with("processed/"))
        .expect("no output written");
    let rows = harness.output(&key);
    assert_eq!(rows.len(), 3);
    for (row, id) in rows.iter().zip(["1", "2", "3"]) {
        assert_eq!(row["Id"], id);
        assert!(row.get("Store").is_some());
        assert!(row.get("DetectedSentiment").is_some());
        assert!(row.get("ProcessedTimestamp").is_some());
    }
}

#[tokio::test]
async fn fixture_file_drops_blank_feedback_rows() {
    let harness = Harness::new(KeywordClassifier::default());
    harness.upload("feedback/customer_feedback.csv", &fixture("customer_feedback.csv"));

    let outcome = harness
        .pipeline
        .outcome(&event("feedback/customer_feedback.csv"))
        .await;
    let rows = harness.output(&processed_key(&outcome));

    let names: Vec<&str> = rows.iter().map(|row| row["Name"].as_str().unwrap()).collect();
    assert_eq!(names, ["Alice", "Carol", "Dan", "Erin"]);
    assert_eq!(rows[3]["DetectedSentiment"], "MIXED");
    assert_eq!(rows[2]["DetectedSentiment"], "NEUTRAL");
}

#[tokio::test]
async fn timestamps_follow_row_order_and_output_key_is_taken_last() {
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let harness =
        Harness::new(KeywordClassifier::default()).with_clock(SteppingClock::starting_at(start));
    harness.upload("feedback/order.csv", b"Feedback\nGreat\nfine\nAwful\n");

    let outcome = harness.pipeline.outcome(&event("feedback/order.csv")).await;
    let key = processed_key(&outcome);
    assert_eq!(
        key,
        "processed/feedback_result_2024-06-01T12:00:03.000000Z.json"
    );

    let stamps: Vec<String> = harness
        .output(&key)
        .iter()
        .map(|row| row["ProcessedTimestamp"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        stamps,
        [
            "2024-06-01T12:00:00.000000Z",
            "2024-06-01T12:00:01.000000Z",
            "2024-06-01T12:00:02.000000Z",
        ]
    );
}

#[tokio::test]
async fn system_clock_timestamps_are_non_decreasing() {
    let harness = Harness::new(KeywordClassifier::default());
    let mut csv = String::from("Feedback\n");
    for i in 0..25 {
        csv.push_str(&format!("comment {i}\n"));
    }
    harness.upload("feedback/many.csv", csv.as_bytes());

    let outcome = harness.pipeline.outcome(&event("feedback/many.csv")).await;
    let stamps: Vec<DateTime<Utc>> = harness
        .output(&processed_key(&outcome))
        .iter()
        .map(|row| {
            DateTime::parse_from_rfc3339(row["ProcessedTimestamp"].as_str().unwrap())
                .unwrap()
                .with_timezone(&Utc)
        })
        .collect();

    assert_eq!(stamps.len(), 25);
    assert!(stamps.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn classifier_failure_writes_nothing() {
    let harness = Harness::new(KeywordClassifier::failing_on("Meh"));
    harness.upload("feedback/fail.csv", b"Feedback\nGreat\nMeh\nAwful\n");

    let response = harness.pipeline.handle(&event("feedback/fail.csv")).await;

    assert_eq!(response.status_code, 500);
    let body: Value = serde_json::from_str(&response.body).unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("ThrottlingException"));
    assert_eq!(harness.store.put_count(), 0);
    // the row after the failure is never sent
    assert_eq!(harness.classifier.calls().len(), 2);
}

#[tokio::test]
async fn missing_object_is_a_server_error() {
    let harness = Harness::new(KeywordClassifier::default());

    let response = harness.pipeline.handle(&event("feedback/gone.csv")).await;

    assert_eq!(response.status_code, 500);
    let body: Value = serde_json::from_str(&response.body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("feedback/gone.csv"));
}

#[tokio::test]
async fn invalid_utf8_is_a_server_error() {
    let harness = Harness::new(KeywordClassifier::default());
    harness.upload("feedback/latin1.csv", b"Feedback\ncaf\xe9\n");

    let response = harness.pipeline.handle(&event("feedback/latin1.csv")).await;

    assert_eq!(response.status_code, 500);
    assert_eq!(harness.store.put_count(), 0);
    assert!(harness.classifier.calls().is_empty());
}

#[tokio::test]
async fn ragged_row_aborts_the_invocation() {
    let harness = Harness::new(KeywordClassifier::default());
    harness.upload("feedback/ragged.csv", b"Feedback,Name\nGreat,Ann\nAwful,Ben,extra\n");

    let response = harness.pipeline.handle(&event("feedback/ragged.csv")).await;

    assert_eq!(response.status_code, 500);
    assert_eq!(harness.store.put_count(), 0);
    assert_eq!(harness.classifier.calls().len(), 1);
}

#[tokio::test]
async fn file_without_feedback_column_writes_empty_array() {
    let harness = Harness::new(KeywordClassifier::default());
    harness.upload("feedback/wrong.csv", b"feedback,Name\nGreat,Ann\n");

    let outcome = harness.pipeline.outcome(&event("feedback/wrong.csv")).await;
    let key = processed_key(&outcome);

    assert!(harness.output(&key).is_empty());
    assert!(harness.classifier.calls().is_empty());
}

#[tokio::test]
async fn malformed_event_is_a_server_error() {
    let harness = Harness::new(KeywordClassifier::default());

    let response = harness.pipeline.handle(&json!({ "Records": [] })).await;
    assert_eq!(response.status_code, 500);

    let response = harness.pipeline.handle(&json!({ "detail": {} })).await;
    assert_eq!(response.status_code, 500);
    assert_eq!(harness.store.put_count(), 0);
}

#[tokio::test]
async fn same_tick_invocations_overwrite_one_output() {
    let frozen = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let harness =
        Harness::new(KeywordClassifier::default()).with_clock(FrozenClock(frozen));
    harness.upload("feedback/first.csv", b"Feedback,Name\nGreat,Ann\n");
    harness.upload("feedback/second.csv", b"Feedback,Name\nAwful,Ben\nfine,Cy\n");

    let first = harness.pipeline.outcome(&event("feedback/first.csv")).await;
    let second = harness.pipeline.outcome(&event("feedback/second.csv")).await;

    assert_eq!(processed_key(&first), processed_key(&second));
    assert_eq!(harness.store.put_count(), 2);

    let rows = harness.output(&processed_key(&second));
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["Name"], "Ben");
}

#[tokio::test]
async fn custom_config_changes_prefixes_and_column() {
    let store = Arc::new(MemoryBucketStore::new());
    let classifier = Arc::new(KeywordClassifier::default());
    let config = HandlerConfig {
        input_prefix: "inbox/".into(),
        output_prefix: "results/".into(),
        feedback_column: "Comment".into(),
        language_code: "de".into(),
    };
    let pipeline = FeedbackPipeline::new(store.clone(), classifier.clone(), config);
    store.insert(BUCKET, "inbox/a.csv", &b"Comment\nGreat\n"[..], "text/csv");

    let skipped = pipeline.handle(&event("feedback/a.csv")).await;
    assert_eq!(skipped.status_code, 400);
    assert!(skipped.body.contains("'inbox/'"));

    let outcome = pipeline.outcome(&event("inbox/a.csv")).await;
    assert!(processed_key(&outcome).starts_with("results/feedback_result_"));
    assert_eq!(classifier.calls(), vec![("Great".to_string(), "de".to_string())]);
}
