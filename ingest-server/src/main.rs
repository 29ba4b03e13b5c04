//! Plexflo ingestion server
//!
//! Collects readings from any number of concurrent meter clients and writes
//! one CSV record per connection. With `PLEXFLO_MODEL_PATH` set, each
//! finished session is also labeled by the 15 minute EV model.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use plexflo_core::constants::APP_VERSION;
use plexflo_core::{DatasetSink, OnnxModel};
use plexflo_ingest::{Config, HandlerContext, Server, ShutdownController};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plexflo_ingest=info,plexflo_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Plexflo ingest v{} starting...", APP_VERSION);
    tracing::info!("Output directory: {}", config.output_dir.display());

    let mut ctx = HandlerContext::new(DatasetSink::new(&config.output_dir), config.collector.clone());

    // Model must load before we serve anything
    if let Some(model_path) = &config.model_path {
        let model = OnnxModel::load(
            model_path,
            config.classifier.window_len,
            config.model_sha256.as_deref(),
        )
        .context("15 min model not available")?;
        tracing::info!("15 min model loaded from {}", model_path.display());
        ctx = ctx.with_classifier(Arc::new(model), config.classifier);
    } else {
        tracing::info!("No model configured, sessions are stored unlabeled");
    }

    let server = Server::bind(config.listen_addr(), ctx, config.drain).await?;

    let shutdown = ShutdownController::new();
    let _interrupt = shutdown.listen_for_interrupt();

    let summary = server.run(shutdown.token()).await;
    tracing::info!(
        "Served {} connection(s), {} saved",
        summary.accepted,
        summary.saved
    );

    if shutdown.was_interrupted() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
