//! Stream Collector - one per connection
//!
//! Reads raw chunks until the peer closes its side, buffering decoded
//! readings into a [`Session`].
//!
//! ```text
//! CONNECTED -> RECEIVING -+-> FLUSHING -> CLOSED      (zero-length read)
//!                         +-> ERRORED  -> CLOSED      (read/decode error, discard)
//!                                      -> FLUSHING    (read/decode error, flush)
//! ```

pub mod framing;
pub mod handler;

use std::str::FromStr;
use std::time::Duration;

use plexflo_core::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_LINE_LEN};
use plexflo_core::{Error, FinishedSession, Result, Session};
use tokio::io::{AsyncRead, AsyncReadExt};

pub use framing::{FrameDecoder, Framing};
pub use handler::{handle_connection, HandlerContext, HandlerOutcome, HandlerReport};

// ============================================================================
// CONFIGURATION
// ============================================================================

/// What to do with buffered readings when a connection fails mid-stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Drop everything buffered for the connection
    #[default]
    Discard,
    /// Persist the readings received before the failure
    Flush,
}

impl FromStr for ErrorPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discard" => Ok(ErrorPolicy::Discard),
            "flush" => Ok(ErrorPolicy::Flush),
            other => Err(Error::Configuration(format!("Unknown error policy: {}", other))),
        }
    }
}

/// Per-connection read settings
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Maximum bytes per read call
    pub chunk_size: usize,
    pub framing: Framing,
    /// Longest accepted line under `Framing::Lines`
    pub max_line_len: usize,
    pub error_policy: ErrorPolicy,
    /// Idle timeout per read; `None` waits forever
    pub read_timeout: Option<Duration>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            framing: Framing::default(),
            max_line_len: DEFAULT_MAX_LINE_LEN,
            error_policy: ErrorPolicy::default(),
            read_timeout: None,
        }
    }
}

// ============================================================================
// STATE
// ============================================================================

/// Lifecycle of a connection handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    Connected,
    Receiving,
    Flushing,
    Errored,
    Closed,
}

impl std::fmt::Display for HandlerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HandlerState::Connected => "CONNECTED",
            HandlerState::Receiving => "RECEIVING",
            HandlerState::Flushing => "FLUSHING",
            HandlerState::Errored => "ERRORED",
            HandlerState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// How a stream ended
#[derive(Debug)]
pub enum Collected {
    /// Peer closed its side; the session is complete
    Ended(FinishedSession),
    /// Read or decode failure; `partial` holds what arrived before it
    Failed {
        error: Error,
        partial: FinishedSession,
    },
}

// ============================================================================
// COLLECTION
// ============================================================================

/// Read `reader` to end-of-stream, appending decoded readings to `session`
pub async fn collect<R>(reader: &mut R, mut session: Session, config: &CollectorConfig) -> Collected
where
    R: AsyncRead + Unpin,
{
    let mut decoder = FrameDecoder::with_max_line_len(config.framing, config.max_line_len);
    let mut buf = vec![0u8; config.chunk_size.max(1)];

    loop {
        let n = match read_chunk(reader, &mut buf, config.read_timeout).await {
            Ok(n) => n,
            Err(error) => {
                return Collected::Failed {
                    error,
                    partial: session.finish(),
                }
            }
        };

        if n == 0 {
            match decoder.finish() {
                Ok(Some(reading)) => session.push(reading),
                Ok(None) => {}
                Err(error) => {
                    return Collected::Failed {
                        error,
                        partial: session.finish(),
                    }
                }
            }
            return Collected::Ended(session.finish());
        }

        match decoder.decode(&buf[..n]) {
            Ok(readings) => {
                for reading in readings {
                    tracing::trace!(reading = %reading, "received");
                    session.push(reading);
                }
            }
            Err(error) => {
                return Collected::Failed {
                    error,
                    partial: session.finish(),
                }
            }
        }
    }
}

async fn read_chunk<R>(reader: &mut R, buf: &mut [u8], timeout: Option<Duration>) -> Result<usize>
where
    R: AsyncRead + Unpin,
{
    let read = match timeout {
        Some(limit) => tokio::time::timeout(limit, reader.read(buf))
            .await
            .map_err(|_| Error::Protocol(format!("No data for {:?}", limit)))?,
        None => reader.read(buf).await,
    };
    read.map_err(|e| Error::Protocol(format!("Read failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexflo_core::SessionId;
    use tokio_test::io::Builder;

    fn session() -> Session {
        Session::new(SessionId::new("127.0.0.1:40000".parse().unwrap()))
    }

    #[tokio::test]
    async fn test_chunks_become_readings() {
        let mut mock = Builder::new().read(b"1.0").read(b"2.0").read(b"3.0").build();

        match collect(&mut mock, session(), &CollectorConfig::default()).await {
            Collected::Ended(finished) => {
                assert_eq!(finished.readings(), &["1.0", "2.0", "3.0"])
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_read_error_keeps_partial() {
        let mut mock = Builder::new()
            .read(b"1.0")
            .read_error(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"))
            .build();

        match collect(&mut mock, session(), &CollectorConfig::default()).await {
            Collected::Failed { error, partial } => {
                assert!(matches!(error, Error::Protocol(_)));
                assert_eq!(partial.readings(), &["1.0"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_decode_error_fails() {
        let mut mock = Builder::new().read(b"1.0").read(&[0xc3]).build();

        let collected = collect(&mut mock, session(), &CollectorConfig::default()).await;
        assert!(matches!(collected, Collected::Failed { .. }));
    }

    #[tokio::test]
    async fn test_chunk_size_limits_reads() {
        let mut mock = Builder::new().read(b"12345").build();
        let config = CollectorConfig {
            chunk_size: 2,
            ..Default::default()
        };

        match collect(&mut mock, session(), &config).await {
            Collected::Ended(finished) => assert_eq!(finished.readings(), &["12", "34", "5"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lines_framing_flushes_trailing_value() {
        let mut mock = Builder::new().read(b"1.0\n2").read(b".0\n3.0").build();
        let config = CollectorConfig {
            framing: Framing::Lines,
            ..Default::default()
        };

        match collect(&mut mock, session(), &config).await {
            Collected::Ended(finished) => {
                assert_eq!(finished.readings(), &["1.0", "2.0", "3.0"])
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_overlong_line_fails_with_partial() {
        let mut mock = Builder::new().read(b"1.0\n").read(b"123456789").build();
        let config = CollectorConfig {
            framing: Framing::Lines,
            max_line_len: 4,
            ..Default::default()
        };

        match collect(&mut mock, session(), &config).await {
            Collected::Failed { error, partial } => {
                assert!(matches!(error, Error::Protocol(_)));
                assert_eq!(partial.readings(), &["1.0"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_idle_timeout_is_protocol_error() {
        let (_client, mut server) = tokio::io::duplex(64);
        let config = CollectorConfig {
            read_timeout: Some(Duration::from_millis(20)),
            ..Default::default()
        };

        match collect(&mut server, session(), &config).await {
            Collected::Failed { error, partial } => {
                assert!(matches!(error, Error::Protocol(_)));
                assert!(partial.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_policy_parse() {
        assert_eq!("flush".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Flush);
        assert_eq!("Discard".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Discard);
        assert!("retry".parse::<ErrorPolicy>().is_err());
    }
}
