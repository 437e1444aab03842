pub mod clock;
pub mod config;
pub mod enrich;
pub mod error;
pub mod outcome;
pub mod pipeline;
pub mod records;
pub mod trigger;
pub mod writer;

pub use config::HandlerConfig;
pub use error::{PipelineError, Result};
pub use outcome::{HandlerResponse, InvocationOutcome};
pub use pipeline::FeedbackPipeline;
