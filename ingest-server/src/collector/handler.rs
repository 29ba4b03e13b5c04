// Connection handler
//
// Drives one accepted connection through collect -> (classify) -> persist.
// The socket is owned here and dropped exactly once when the handler ends.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use plexflo_core::{
    classify_session, ClassifierConfig, DatasetSink, Error, FinishedSession, Result, Session,
    SessionId, WindowScorer,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::Instrument;

use super::{collect, Collected, CollectorConfig, ErrorPolicy, HandlerState};

/// Read-only scorer plus the settings it runs with
#[derive(Clone)]
pub struct ClassifierHandle {
    pub scorer: Arc<dyn WindowScorer>,
    pub config: ClassifierConfig,
}

/// Everything a handler needs, shared by all connections
pub struct HandlerContext {
    pub sink: DatasetSink,
    pub collector: CollectorConfig,
    pub classifier: Option<ClassifierHandle>,
}

impl HandlerContext {
    pub fn new(sink: DatasetSink, collector: CollectorConfig) -> Self {
        Self {
            sink,
            collector,
            classifier: None,
        }
    }

    pub fn with_classifier(mut self, scorer: Arc<dyn WindowScorer>, config: ClassifierConfig) -> Self {
        self.classifier = Some(ClassifierHandle { scorer, config });
        self
    }

    /// Classify (when a model is loaded) and write the session.
    ///
    /// A session the classifier rejects is still written, without labels.
    fn flush(&self, session: FinishedSession) -> Result<(PathBuf, bool)> {
        let labels = self.classifier.as_ref().and_then(|handle| {
            match classify_session(&session, handle.scorer.as_ref(), &handle.config) {
                Ok(classification) => {
                    tracing::info!(
                        windows = classification.windows.len(),
                        charging = classification.charging_windows(),
                        "Session classified"
                    );
                    Some(classification.labels)
                }
                Err(e) => {
                    tracing::warn!(kind = e.kind(), "Session not classified: {}", e);
                    None
                }
            }
        });

        let classified = labels.is_some();
        let path = self.sink.write_session(session, labels.as_deref())?;
        Ok((path, classified))
    }
}

/// How a handler finished
#[derive(Debug)]
pub enum HandlerOutcome {
    /// Session written to the sink
    Saved {
        path: PathBuf,
        rows: usize,
        classified: bool,
    },
    /// Stream failed and the buffered readings were dropped
    Discarded { rows: usize, error: Error },
    /// Flush failed
    Failed(Error),
}

/// Returned by every handler task
#[derive(Debug)]
pub struct HandlerReport {
    pub id: SessionId,
    pub outcome: HandlerOutcome,
}

/// Serve one client connection until it closes or fails
pub async fn handle_connection<S>(
    stream: S,
    peer: SocketAddr,
    ctx: Arc<HandlerContext>,
) -> HandlerReport
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let id = SessionId::new(peer);
    let span = tracing::info_span!("session", peer = %peer, started = %id.started_at.format("%H:%M:%S"));

    run(stream, id, ctx).instrument(span).await
}

async fn run<S>(mut stream: S, id: SessionId, ctx: Arc<HandlerContext>) -> HandlerReport
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut state = HandlerState::Connected;
    tracing::info!("Connected by {}", id.peer);

    transition(&mut state, HandlerState::Receiving);
    let collected = collect(&mut stream, Session::new(id.clone()), &ctx.collector).await;

    let outcome = match collected {
        Collected::Ended(session) => {
            transition(&mut state, HandlerState::Flushing);
            persist(session, &ctx).await
        }
        Collected::Failed { error, partial } => {
            transition(&mut state, HandlerState::Errored);
            tracing::warn!(kind = error.kind(), buffered = partial.len(), "{}", error);

            match ctx.collector.error_policy {
                ErrorPolicy::Discard => HandlerOutcome::Discarded {
                    rows: partial.len(),
                    error,
                },
                ErrorPolicy::Flush => {
                    transition(&mut state, HandlerState::Flushing);
                    persist(partial, &ctx).await
                }
            }
        }
    };

    drop(stream);
    transition(&mut state, HandlerState::Closed);
    tracing::info!("The client disconnected from the server");

    HandlerReport { id, outcome }
}

async fn persist(session: FinishedSession, ctx: &Arc<HandlerContext>) -> HandlerOutcome {
    let rows = session.len();
    let ctx = Arc::clone(ctx);
    let span = tracing::Span::current();

    let flushed = tokio::task::spawn_blocking(move || span.in_scope(|| ctx.flush(session))).await;

    match flushed {
        Ok(Ok((path, classified))) => HandlerOutcome::Saved {
            path,
            rows,
            classified,
        },
        Ok(Err(e)) => {
            tracing::error!(kind = e.kind(), "Failed to save session: {}", e);
            HandlerOutcome::Failed(e)
        }
        Err(e) => {
            let e = Error::Persistence(format!("Flush task failed: {}", e));
            tracing::error!(kind = e.kind(), "{}", e);
            HandlerOutcome::Failed(e)
        }
    }
}

fn transition(state: &mut HandlerState, next: HandlerState) {
    tracing::debug!("{} -> {}", state, next);
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexflo_core::{read_session, FnScorer};
    use tempfile::tempdir;
    use tokio_test::io::Builder;

    fn peer() -> SocketAddr {
        "127.0.0.1:45000".parse().unwrap()
    }

    #[tokio::test]
    async fn test_graceful_close_saves_session() {
        let dir = tempdir().unwrap();
        let ctx = Arc::new(HandlerContext::new(
            DatasetSink::new(dir.path()),
            CollectorConfig::default(),
        ));
        let mock = Builder::new().read(b"1.0").read(b"2.0").read(b"3.0").build();

        let report = handle_connection(mock, peer(), ctx).await;
        match report.outcome {
            HandlerOutcome::Saved { path, rows, classified } => {
                assert_eq!(rows, 3);
                assert!(!classified);
                assert_eq!(read_session(path).unwrap(), vec!["1.0", "2.0", "3.0"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_discards_by_default() {
        let dir = tempdir().unwrap();
        let ctx = Arc::new(HandlerContext::new(
            DatasetSink::new(dir.path()),
            CollectorConfig::default(),
        ));
        let mock = Builder::new()
            .read(b"1.0")
            .read_error(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"))
            .build();

        let report = handle_connection(mock, peer(), ctx).await;
        assert!(matches!(report.outcome, HandlerOutcome::Discarded { rows: 1, .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_error_flush_policy_keeps_partial() {
        let dir = tempdir().unwrap();
        let collector = CollectorConfig {
            error_policy: ErrorPolicy::Flush,
            ..Default::default()
        };
        let ctx = Arc::new(HandlerContext::new(DatasetSink::new(dir.path()), collector));
        let mock = Builder::new()
            .read(b"4.0")
            .read(b"5.0")
            .read_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
            .build();

        let report = handle_connection(mock, peer(), ctx).await;
        match report.outcome {
            HandlerOutcome::Saved { path, rows, .. } => {
                assert_eq!(rows, 2);
                assert_eq!(read_session(path).unwrap(), vec!["4.0", "5.0"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_session_classified_when_model_loaded() {
        let dir = tempdir().unwrap();
        let scorer = Arc::new(FnScorer::new(2, |w: &[f32]| w[0] / 10.0));
        let ctx = Arc::new(
            HandlerContext::new(DatasetSink::new(dir.path()), CollectorConfig::default())
                .with_classifier(scorer, ClassifierConfig::with_window_len(2)),
        );
        let mock = Builder::new().read(b"5").read(b"0").read(b"0").build();

        let report = handle_connection(mock, peer(), ctx).await;
        match report.outcome {
            HandlerOutcome::Saved { path, classified, .. } => {
                assert!(classified);
                let content = std::fs::read_to_string(path).unwrap();
                // Inclusive back-fill also labels the reading after the window.
                assert_eq!(content, "values,EV\n5,1\n0,1\n0,1\n");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_short_session_saved_unlabeled() {
        let dir = tempdir().unwrap();
        let scorer = Arc::new(FnScorer::new(900, |_: &[f32]| 1.0));
        let ctx = Arc::new(
            HandlerContext::new(DatasetSink::new(dir.path()), CollectorConfig::default())
                .with_classifier(scorer, ClassifierConfig::default()),
        );
        let mock = Builder::new().read(b"1.0").build();

        let report = handle_connection(mock, peer(), ctx).await;
        assert!(matches!(
            report.outcome,
            HandlerOutcome::Saved { rows: 1, classified: false, .. }
        ));
    }
}
