use bytes::Bytes;
use chrono::{DateTime, Utc};
use feedback_bucket::BucketStore;

use crate::clock::format_timestamp;
use crate::config::OUTPUT_CONTENT_TYPE;
use crate::error::Result;
use crate::records::Record;

/// Renders records as a JSON array indented with two spaces.
pub fn render_document(records: &[Record]) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec_pretty(records)?))
}

pub fn output_key(output_prefix: &str, at: DateTime<Utc>) -> String {
    format!(
        "{output_prefix}feedback_result_{}.json",
        format_timestamp(at)
    )
}

/// Stores the rendered document at `key`, replacing any existing object.
pub async fn write_document(
    store: &dyn BucketStore,
    bucket: &str,
    key: &str,
    records: &[Record],
) -> Result<()> {
    let body = render_document(records)?;
    store
        .put_object(bucket, key, body, OUTPUT_CONTENT_TYPE)
        .await?;
    Ok(())
}
