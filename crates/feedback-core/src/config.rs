pub const DEFAULT_INPUT_PREFIX: &str = "feedback/";
pub const DEFAULT_OUTPUT_PREFIX: &str = "processed/";
pub const DEFAULT_FEEDBACK_COLUMN: &str = "Feedback";
pub const DEFAULT_LANGUAGE_CODE: &str = "en";

/// Column added to every emitted record with the classifier's label.
pub const SENTIMENT_FIELD: &str = "DetectedSentiment";
/// Column added to every emitted record with the per-record UTC timestamp.
pub const TIMESTAMP_FIELD: &str = "ProcessedTimestamp";

pub const OUTPUT_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Keys outside this prefix are skipped with a 400 response.
    pub input_prefix: String,
    /// Prefix for the `feedback_result_<timestamp>.json` output object.
    pub output_prefix: String,
    /// Column holding the text to classify; matched case-sensitively.
    pub feedback_column: String,
    pub language_code: String,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            input_prefix: DEFAULT_INPUT_PREFIX.to_string(),
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            feedback_column: DEFAULT_FEEDBACK_COLUMN.to_string(),
            language_code: DEFAULT_LANGUAGE_CODE.to_string(),
        }
    }
}

impl HandlerConfig {
    /// Reads `FEEDBACK_INPUT_PREFIX`, `FEEDBACK_OUTPUT_PREFIX`,
    /// `FEEDBACK_COLUMN` and `FEEDBACK_LANGUAGE_CODE`, falling back to the
    /// defaults for anything unset or blank.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let value = |name: &str, fallback: String| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(fallback)
        };

        Self {
            input_prefix: value("FEEDBACK_INPUT_PREFIX", defaults.input_prefix),
            output_prefix: value("FEEDBACK_OUTPUT_PREFIX", defaults.output_prefix),
            feedback_column: value("FEEDBACK_COLUMN", defaults.feedback_column),
            language_code: value("FEEDBACK_LANGUAGE_CODE", defaults.language_code),
        }
    }
}
