use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use feedback_bucket::{S3BucketStore, S3Config};
use feedback_classifier::{ComprehendClassifier, ComprehendConfig};
use feedback_core::outcome::HandlerResponse;
use feedback_core::trigger::NotificationEvent;
use feedback_core::{FeedbackPipeline, HandlerConfig};
use lambda_runtime::{service_fn, LambdaEvent};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Feedback sentiment enrichment handler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the Lambda runtime loop (default)
    Serve,
    /// Process one S3 notification from a file and print the response
    Invoke(InvokeArgs),
    /// Print a minimal S3 notification for a bucket and key
    RenderEvent(RenderEventArgs),
}

#[derive(Args, Debug)]
struct InvokeArgs {
    /// Path to the JSON notification payload
    #[arg(long)]
    event: PathBuf,
}

#[derive(Args, Debug)]
struct RenderEventArgs {
    #[arg(long)]
    bucket: String,
    #[arg(long)]
    key: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Invoke(args) => invoke(args).await,
        Command::RenderEvent(args) => {
            let event = NotificationEvent::for_object(&args.bucket, &args.key);
            println!("{}", serde_json::to_string_pretty(&event)?);
            Ok(())
        }
    }
}

async fn serve() -> Result<()> {
    let pipeline = Arc::new(build_pipeline().await?);
    info!(
        input_prefix = %pipeline.config().input_prefix,
        output_prefix = %pipeline.config().output_prefix,
        "starting feedback sentiment handler"
    );

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let pipeline = pipeline.clone();
        async move { handle_event(&pipeline, event).await }
    }))
    .await
    .map_err(|err| anyhow!(err))
}

#[tracing::instrument(skip_all, fields(request_id = %event.context.request_id))]
async fn handle_event(
    pipeline: &FeedbackPipeline,
    event: LambdaEvent<Value>,
) -> Result<HandlerResponse, lambda_runtime::Error> {
    let response = pipeline.handle(&event.payload).await;
    info!(status_code = response.status_code, "invocation finished");
    Ok(response)
}

async fn invoke(args: InvokeArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.event)
        .with_context(|| format!("failed to read event file {}", args.event.display()))?;
    let payload: Value = serde_json::from_str(&raw).context("event file is not valid JSON")?;

    let pipeline = build_pipeline().await?;
    let response = pipeline.handle(&payload).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn build_pipeline() -> Result<FeedbackPipeline> {
    let config = HandlerConfig::from_env();
    let bucket = S3BucketStore::new(S3Config::from_env())
        .await
        .context("failed to configure S3 bucket store")?;
    let classifier = ComprehendClassifier::new(ComprehendConfig::from_env())
        .await
        .context("failed to configure Comprehend client")?;

    Ok(FeedbackPipeline::new(
        Arc::new(bucket),
        Arc::new(classifier),
        config,
    ))
}
