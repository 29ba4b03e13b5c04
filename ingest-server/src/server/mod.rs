//! Connection Acceptor
//!
//! Owns the listening socket. Accepts connections one at a time and spawns
//! a handler task for each into a supervised `JoinSet`; there is no cap on
//! concurrent handlers. Cancelling the shutdown token closes the listener
//! and applies the [`DrainPolicy`] to handlers still running.

pub mod shutdown;

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use plexflo_core::{Error, Result};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::collector::{handle_connection, HandlerContext, HandlerOutcome, HandlerReport};

pub use shutdown::ShutdownController;

/// What shutdown does with handlers that are still running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainPolicy {
    /// Leave them running detached; they die with the process
    Abandon,
    /// Wait up to `timeout` for them, then abort the rest
    Join { timeout: Duration },
}

/// Default time a `join` drain waits for in-flight handlers
pub const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 5;

/// Pause after a failed accept (e.g. out of file descriptors)
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(500);

impl FromStr for DrainPolicy {
    type Err = Error;

    /// `join` waits [`DEFAULT_DRAIN_TIMEOUT_SECS`]
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abandon" => Ok(DrainPolicy::Abandon),
            "join" => Ok(DrainPolicy::Join {
                timeout: Duration::from_secs(DEFAULT_DRAIN_TIMEOUT_SECS),
            }),
            other => Err(Error::Configuration(format!(
                "Drain policy must be 'abandon' or 'join', got '{}'",
                other
            ))),
        }
    }
}

/// Counters reported when the accept loop ends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServeSummary {
    pub accepted: u64,
    pub completed: u64,
    pub saved: u64,
    pub abandoned: usize,
}

/// Bound ingestion server
pub struct Server {
    listener: TcpListener,
    ctx: Arc<HandlerContext>,
    drain: DrainPolicy,
}

impl Server {
    /// Bind the listening socket. Failure is a configuration error.
    pub async fn bind<A: ToSocketAddrs + std::fmt::Display>(
        addr: A,
        ctx: HandlerContext,
        drain: DrainPolicy,
    ) -> Result<Self> {
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Configuration(format!("Failed to bind {}: {}", addr, e)))?;

        Ok(Self {
            listener,
            ctx: Arc::new(ctx),
            drain,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| Error::Configuration(format!("Listener has no local address: {}", e)))
    }

    /// Accept connections until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) -> ServeSummary {
        let Server {
            listener,
            ctx,
            drain,
        } = self;

        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Listening on {}", addr);
        }

        let mut handlers: JoinSet<HandlerReport> = JoinSet::new();
        let mut summary = ServeSummary::default();

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        summary.accepted += 1;
                        handlers.spawn(handle_connection(stream, peer, Arc::clone(&ctx)));
                    }
                    Err(e) => {
                        tracing::warn!("Accept failed: {}", e);
                        if backoff(&shutdown, ACCEPT_ERROR_BACKOFF).await {
                            break;
                        }
                    }
                },

                Some(joined) = handlers.join_next(), if !handlers.is_empty() => {
                    record(&mut summary, joined);
                }
            }
        }

        drop(listener);
        tracing::info!("Listener closed, {} handler(s) in flight", handlers.len());

        match drain {
            DrainPolicy::Abandon => {
                summary.abandoned = handlers.len();
                handlers.detach_all();
            }
            DrainPolicy::Join { timeout } => {
                let deadline = tokio::time::Instant::now() + timeout;
                while !handlers.is_empty() {
                    match tokio::time::timeout_at(deadline, handlers.join_next()).await {
                        Ok(Some(joined)) => record(&mut summary, joined),
                        Ok(None) => break,
                        Err(_) => {
                            summary.abandoned = handlers.len();
                            tracing::warn!("Drain timed out, aborting {} handler(s)", handlers.len());
                            handlers.abort_all();
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!(
            accepted = summary.accepted,
            completed = summary.completed,
            saved = summary.saved,
            abandoned = summary.abandoned,
            "Server stopped"
        );
        summary
    }
}

/// Sleep for `delay` unless shutdown comes first; true when cancelled
async fn backoff(shutdown: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => true,
        _ = tokio::time::sleep(delay) => false,
    }
}

fn record(summary: &mut ServeSummary, joined: std::result::Result<HandlerReport, tokio::task::JoinError>) {
    match joined {
        Ok(report) => {
            summary.completed += 1;
            match &report.outcome {
                HandlerOutcome::Saved { path, rows, .. } => {
                    summary.saved += 1;
                    tracing::debug!("{} -> {} ({} rows)", report.id, path.display(), rows);
                }
                HandlerOutcome::Discarded { rows, error } => {
                    tracing::debug!("{} discarded {} rows: {}", report.id, rows, error);
                }
                HandlerOutcome::Failed(error) => {
                    tracing::debug!("{} failed: {}", report.id, error);
                }
            }
        }
        Err(e) => tracing::error!("Handler task panicked: {}", e),
    }
}
