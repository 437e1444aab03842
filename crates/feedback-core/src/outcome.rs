use serde::{Deserialize, Serialize};
use serde_json::json;

/// Result of one invocation after the top-level error boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    Processed {
        input_key: String,
        output_key: String,
        count: usize,
    },
    Skipped {
        key: String,
        input_prefix: String,
    },
    Failed {
        message: String,
    },
}

impl InvocationOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            InvocationOutcome::Processed { .. } => 200,
            InvocationOutcome::Skipped { .. } => 400,
            InvocationOutcome::Failed { .. } => 500,
        }
    }

    pub fn into_response(self) -> HandlerResponse {
        let status_code = self.status_code();
        let body = match self {
            InvocationOutcome::Processed {
                input_key,
                output_key,
                count,
            } => format!(
                "✅ Processed {count} entries from '{input_key}' and saved to '{output_key}'"
            ),
            InvocationOutcome::Skipped { key, input_prefix } => {
                format!("Skipped file {key} because it's not in the '{input_prefix}' folder.")
            }
            InvocationOutcome::Failed { message } => json!({ "error": message }).to_string(),
        };
        HandlerResponse { status_code, body }
    }
}

/// The payload returned to the Lambda runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}
