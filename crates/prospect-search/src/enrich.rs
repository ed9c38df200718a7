//! Background polling of enrichment sessions after a stream completes.
//!
//! The backend keeps extracting contact details after the stream ends. The
//! poller nudges its queue, reads per-lead status, and merges results into
//! the same arena the stream filled, so enrichment follows the identical
//! dedup and monotonic-state rules as in-stream updates.

use crate::merge::LeadArena;
use crate::progress::{ProgressSender, ProgressUpdate};
use crate::transport::SearchTransport;
use prospect_core::EnrichmentConfig;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to a running poll loop.
///
/// Dropping the handle does not stop the loop; call [`stop`] to cancel it.
///
/// [`stop`]: EnrichmentPollHandle::stop
#[derive(Debug)]
pub struct EnrichmentPollHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl EnrichmentPollHandle {
    /// Ask the loop to stop after its current iteration.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether the loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to exit.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// Polls one enrichment session until it completes, its wall-clock ceiling runs
/// out, or it is cancelled.
pub struct EnrichmentPoller {
    transport: Arc<dyn SearchTransport>,
    config: EnrichmentConfig,
    arena: LeadArena,
    progress: ProgressSender,
}

impl EnrichmentPoller {
    /// Create a poller merging into the given arena.
    #[must_use]
    pub fn new(
        transport: Arc<dyn SearchTransport>,
        config: EnrichmentConfig,
        arena: LeadArena,
        progress: ProgressSender,
    ) -> Self {
        Self {
            transport,
            config,
            arena,
            progress,
        }
    }

    /// Start the poll loop as a background task.
    #[must_use]
    pub fn spawn(self, session_id: String) -> EnrichmentPollHandle {
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            self.run(&session_id, loop_cancel).await;
        });
        EnrichmentPollHandle { cancel, task }
    }

    async fn run(self, session_id: &str, cancel: CancellationToken) {
        tracing::debug!(session_id, "enrichment polling started");
        let started = tokio::time::Instant::now();

        loop {
            if started.elapsed() >= self.config.max_poll() {
                tracing::warn!(session_id, "enrichment polling hit its wall-clock ceiling");
                break;
            }

            // A failed nudge is not fatal; the status read below still works
            // against whatever the backend processed on its own.
            if let Err(e) = self.transport.trigger_enrichment(session_id).await {
                tracing::debug!(session_id, error = %e, "enrichment trigger failed");
            }

            match self.transport.enrichment_status(session_id).await {
                Ok(status) => {
                    let mut touched = false;
                    for (lead_id, payload) in &status.results {
                        touched |= self.arena.apply_enrichment(lead_id, payload).await;
                    }
                    if touched {
                        self.progress
                            .emit(ProgressUpdate {
                                leads: self.arena.snapshot().await,
                                progress: status.progress.unwrap_or(100.0),
                                message: Some("enrichment update".to_string()),
                                ..ProgressUpdate::default()
                            })
                            .await;
                    }
                    if status.is_complete {
                        tracing::debug!(session_id, "enrichment session complete");
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(session_id, error = %e, "enrichment status read failed");
                }
            }

            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::debug!(session_id, "enrichment polling cancelled");
                    break;
                }
                () = tokio::time::sleep(self.config.poll_interval()) => {}
            }
        }
    }
}
