//! Stream client - replays readings to an ingestion server
//!
//! Sends one reading per write with a fixed pause in between, then shuts
//! down its write half so the server sees end-of-stream.

use std::time::Duration;

use plexflo_core::{Error, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::collector::Framing;

/// Format a value the way the meter exporters do (`1.0`, not `1`)
pub fn format_reading(value: f32) -> String {
    format!("{:?}", value)
}

/// Stream `readings` to `addr`, returning how many were sent.
///
/// Under `Framing::Lines` every reading is newline-terminated. The call
/// returns after the server has closed the connection, i.e. once the
/// session has been persisted.
pub async fn stream<A>(
    addr: A,
    readings: &[String],
    interval: Duration,
    framing: Framing,
) -> Result<usize>
where
    A: ToSocketAddrs + std::fmt::Display,
{
    if readings.is_empty() {
        return Err(Error::Validation("Nothing to stream: series is empty".to_string()));
    }

    let mut socket = TcpStream::connect(&addr).await.map_err(|e| {
        Error::Configuration(format!(
            "Failed to connect to {}: {}. Re-check if your server is running",
            addr, e
        ))
    })?;
    socket
        .set_nodelay(true)
        .map_err(|e| Error::Protocol(format!("Socket setup failed: {}", e)))?;

    for (i, reading) in readings.iter().enumerate() {
        let payload = match framing {
            Framing::Chunk => reading.clone(),
            Framing::Lines => format!("{}\n", reading),
        };
        socket
            .write_all(payload.as_bytes())
            .await
            .map_err(|e| Error::Protocol(format!("Send failed: {}", e)))?;
        tracing::debug!("Sent: {:?}", payload);

        if i + 1 < readings.len() && !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }

    socket
        .shutdown()
        .await
        .map_err(|e| Error::Protocol(format!("Shutdown failed: {}", e)))?;

    // Server closes its side once the session is flushed.
    let mut sink = Vec::new();
    socket
        .read_to_end(&mut sink)
        .await
        .map_err(|e| Error::Protocol(format!("Waiting for close failed: {}", e)))?;

    tracing::info!("Finished sending data ({} readings)", readings.len());
    Ok(readings.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_reading_keeps_decimal_point() {
        assert_eq!(format_reading(1.0), "1.0");
        assert_eq!(format_reading(0.25), "0.25");
    }

    #[tokio::test]
    async fn test_empty_series_rejected() {
        let err = stream("127.0.0.1:1", &[], Duration::ZERO, Framing::Chunk)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
