//! Trigger filtering: pull the source object out of an S3 notification and
//! decide whether it belongs to this handler.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// The subset of an S3 notification payload this handler reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<NotificationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Object {
    pub key: String,
}

impl NotificationEvent {
    pub fn for_object(bucket: &str, key: &str) -> Self {
        Self {
            records: vec![NotificationRecord {
                s3: S3Entity {
                    bucket: S3Bucket {
                        name: bucket.to_string(),
                    },
                    object: S3Object {
                        key: key.to_string(),
                    },
                },
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceObject {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerDecision {
    Process(SourceObject),
    Skip { key: String },
}

/// Extracts the source object from the first notification record. Later
/// records, if any, are ignored.
pub fn source_object(payload: &serde_json::Value) -> Result<SourceObject> {
    let first = payload
        .get("Records")
        .and_then(|records| records.get(0))
        .ok_or_else(|| PipelineError::Event("event contains no Records".into()))?;
    let record = NotificationRecord::deserialize(first)
        .map_err(|err| PipelineError::Event(err.to_string()))?;

    Ok(SourceObject {
        bucket: record.s3.bucket.name,
        key: record.s3.object.key,
    })
}

pub fn filter(payload: &serde_json::Value, input_prefix: &str) -> Result<TriggerDecision> {
    let source = source_object(payload)?;
    if source.key.starts_with(input_prefix) {
        Ok(TriggerDecision::Process(source))
    } else {
        Ok(TriggerDecision::Skip { key: source.key })
    }
}
