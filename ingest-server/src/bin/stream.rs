//! plexflo-stream - replay the `kW` column of a meter CSV to a server
//!
//! Usage: `plexflo-stream <file.csv> [interval-ms]`
//!
//! Target is `PLEXFLO_HOST:PLEXFLO_PORT` (default `127.0.0.1:5999`).

use std::time::Duration;

use anyhow::bail;
use plexflo_core::constants::KW_COLUMN;
use plexflo_core::read_table;
use plexflo_ingest::client::{format_reading, stream};
use plexflo_ingest::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_INTERVAL_MS: u64 = 1000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plexflo_ingest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let mut args = std::env::args().skip(1);
    let Some(file) = args.next() else {
        bail!("usage: plexflo-stream <file.csv> [interval-ms]");
    };
    let interval = match args.next() {
        Some(ms) => Duration::from_millis(ms.parse()?),
        None => Duration::from_millis(DEFAULT_INTERVAL_MS),
    };

    let table = read_table(&file)?;
    let readings: Vec<String> = table
        .numeric_column(KW_COLUMN)?
        .into_iter()
        .map(format_reading)
        .collect();

    let sent = stream(
        config.listen_addr(),
        &readings,
        interval,
        config.collector.framing,
    )
    .await?;
    tracing::info!("Streamed {} readings from {}", sent, file);

    Ok(())
}
