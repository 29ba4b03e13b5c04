// Shutdown controller
//
// Owns the cancellation token the accept loop listens on. An OS interrupt
// (Ctrl-C) trips it; so can any code holding the controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct ShutdownController {
    token: CancellationToken,
    interrupted: Arc<AtomicBool>,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for the accept loop
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Request shutdown programmatically
    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether shutdown came from an OS interrupt
    pub fn was_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Trip the token on Ctrl-C
    pub fn listen_for_interrupt(&self) -> JoinHandle<()> {
        let token = self.token.clone();
        let interrupted = Arc::clone(&self.interrupted);

        tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    match result {
                        Ok(()) => {
                            tracing::info!("Ctrl + C pressed. Shutting down the server");
                            interrupted.store(true, Ordering::SeqCst);
                            token.cancel();
                        }
                        Err(e) => tracing::error!("Failed to listen for interrupt: {}", e),
                    }
                }
                _ = token.cancelled() => {}
            }
        })
    }
}
