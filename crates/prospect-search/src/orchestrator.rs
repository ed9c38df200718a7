//! Stream orchestration for one search attempt.
//!
//! The orchestrator owns a single attempt end-to-end: it opens the stream,
//! feeds bytes to the frame reader, routes events to the arena and the
//! progress channel, enforces the two independent timeouts, and produces a
//! terminal result exactly once.
//!
//! State machine: `Connecting → Streaming → {Completed, PartiallyCompleted,
//! Failed}`. The connect timer covers opening the stream (response headers
//! arriving ends it); the total-duration timer scales with the requested
//! result ceiling and runs until a terminal event.

use crate::error::{Result, SearchError};
use crate::merge::{self, LeadArena};
use crate::progress::{ProgressSender, ProgressUpdate};
use crate::transport::{SearchTransport, TransportError};
use futures::StreamExt;
use prospect_core::{SearchConfig, SearchRequest};
use prospect_protocol::{FrameReader, StreamEvent};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How one attempt ended, when it ended with data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// The backend finished the stream normally
    Completed,
    /// The stream was cut short but records had already accumulated
    PartiallyCompleted,
}

/// Terminal result of one stream attempt. The records themselves live in
/// the shared [`LeadArena`].
#[derive(Debug, Clone)]
pub struct StreamOutcome {
    /// How the attempt ended
    pub status: StreamStatus,
    /// Last progress percentage seen
    pub progress: f32,
    /// Enrichment session to hand to the poller, when the backend offered one
    pub enrichment_session: Option<String>,
    /// Present on partial outcomes; describes what cut the stream short
    pub warning: Option<String>,
}

#[derive(Default)]
struct StreamState {
    progress: f32,
    enrichment_session: Option<String>,
    enrichment_enabled: bool,
    estimated_queries: Option<u32>,
}

/// Owns one search attempt end-to-end.
pub struct StreamOrchestrator {
    transport: Arc<dyn SearchTransport>,
    config: SearchConfig,
    arena: LeadArena,
    progress: ProgressSender,
    cancel: CancellationToken,
}

impl StreamOrchestrator {
    /// Create an orchestrator writing into the given arena.
    #[must_use]
    pub fn new(
        transport: Arc<dyn SearchTransport>,
        config: SearchConfig,
        arena: LeadArena,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            config,
            arena,
            progress,
            cancel,
        }
    }

    /// Run one attempt to completion.
    ///
    /// Transient mid-stream transport failures propagate as errors so the
    /// retry controller can classify them; records accumulated before the
    /// failure stay in the arena either way.
    pub async fn run(&self, request: &SearchRequest) -> Result<StreamOutcome> {
        let opened = tokio::time::timeout(
            self.config.connect_timeout(),
            self.transport.open_stream(request),
        )
        .await;

        let mut stream = match opened {
            Err(_) => {
                tracing::warn!("no data received before the connect timeout");
                return Err(SearchError::ConnectTimeout);
            }
            Ok(Err(e)) => return Err(e.into()),
            Ok(Ok(stream)) => stream,
        };

        tracing::debug!(
            service = %request.service,
            location = %request.location,
            limit = request.limit,
            "search stream open"
        );

        let deadline = tokio::time::Instant::now() + self.config.stream_timeout(request.limit);
        let mut reader = FrameReader::new();
        let mut state = StreamState::default();

        loop {
            let chunk = tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("search cancelled by caller");
                    return self.interrupted(&state, SearchError::Cancelled).await;
                }
                chunk = tokio::time::timeout_at(deadline, stream.next()) => chunk,
            };

            match chunk {
                Err(_) => {
                    tracing::warn!("stream exceeded its total-duration bound");
                    return self.interrupted(&state, SearchError::StreamTimeout).await;
                }
                Ok(None) => {
                    return Err(SearchError::Transport(TransportError::Aborted(
                        "stream ended before completion".to_string(),
                    )));
                }
                Ok(Some(Err(e))) => return Err(e.into()),
                Ok(Some(Ok(bytes))) => {
                    for event in reader.feed(&bytes) {
                        if let Some(outcome) = self.handle_event(&mut state, event).await? {
                            return Ok(outcome);
                        }
                    }
                }
            }
        }
    }

    async fn handle_event(
        &self,
        state: &mut StreamState,
        event: StreamEvent,
    ) -> Result<Option<StreamOutcome>> {
        match event {
            StreamEvent::Start(start) => {
                state.enrichment_enabled = start
                    .enrichment_enabled
                    .unwrap_or(start.enrichment_session_id.is_some());
                state.enrichment_session = start.enrichment_session_id;
                state.estimated_queries = start.estimated_queries;
                tracing::debug!(sources = ?start.sources, "stream started");
                Ok(None)
            }

            StreamEvent::Status(status) => {
                if let Some(progress) = status.progress {
                    state.progress = progress;
                }
                self.progress
                    .emit(ProgressUpdate {
                        leads: self.arena.snapshot().await,
                        progress: state.progress,
                        source: status.source,
                        message: status.message,
                        phase: status.phase,
                        estimated_queries: state.estimated_queries,
                    })
                    .await;
                Ok(None)
            }

            StreamEvent::Results(results) => {
                if let Some(bad) = results.leads.iter().find(|lead| merge::is_placeholder(lead)) {
                    tracing::error!(lead_id = %bad.id, "backend emitted placeholder data");
                    return self
                        .terminal_failure(state, SearchError::PlaceholderData)
                        .await;
                }

                for lead in results.leads {
                    self.arena.upsert(lead).await;
                }
                if let Some(progress) = results.progress {
                    state.progress = progress;
                }
                self.progress
                    .emit(ProgressUpdate {
                        leads: self.arena.snapshot().await,
                        progress: state.progress,
                        estimated_queries: state.estimated_queries,
                        ..ProgressUpdate::default()
                    })
                    .await;
                Ok(None)
            }

            StreamEvent::Enrichment(enrichment) => {
                let mut touched = false;
                for result in &enrichment.results {
                    touched |= self.arena.apply_enrichment(&result.lead_id, &result.data).await;
                }
                if touched {
                    self.progress
                        .emit(ProgressUpdate {
                            leads: self.arena.snapshot().await,
                            progress: state.progress,
                            message: Some("enrichment update".to_string()),
                            ..ProgressUpdate::default()
                        })
                        .await;
                }
                Ok(None)
            }

            StreamEvent::SourceError(source_error) => {
                // One contributing source failed, not the whole operation.
                tracing::warn!(
                    source = source_error.source.as_deref().unwrap_or("unknown"),
                    error = source_error.error.as_deref().unwrap_or("unspecified"),
                    "contributing source failed; continuing"
                );
                Ok(None)
            }

            StreamEvent::Error(error) => {
                let message = error
                    .error
                    .unwrap_or_else(|| "unspecified backend error".to_string());
                tracing::error!(%message, "backend reported a fatal error");
                self.terminal_failure(state, SearchError::Backend(message)).await
            }

            StreamEvent::Complete(complete) => {
                if complete.enrichment_session_id.is_some() {
                    state.enrichment_session = complete.enrichment_session_id;
                    state.enrichment_enabled = complete.enrichment_enabled.unwrap_or(true);
                }
                tracing::debug!(leads = self.arena.len().await, "stream completed");

                let enrichment_session = if state.enrichment_enabled {
                    state.enrichment_session.clone()
                } else {
                    None
                };
                Ok(Some(StreamOutcome {
                    status: StreamStatus::Completed,
                    progress: 100.0,
                    enrichment_session,
                    warning: None,
                }))
            }
        }
    }

    /// A fatal application failure is not retried; it downgrades to a
    /// partial outcome when real records were already accumulated, because
    /// partial work is never discarded to report a hard failure.
    async fn terminal_failure(
        &self,
        state: &StreamState,
        err: SearchError,
    ) -> Result<Option<StreamOutcome>> {
        if self.arena.is_empty().await {
            return Err(err);
        }
        Ok(Some(StreamOutcome {
            status: StreamStatus::PartiallyCompleted,
            progress: state.progress,
            enrichment_session: None,
            warning: Some(format!("stream failed after partial delivery: {err}")),
        }))
    }

    /// Timeout and cancellation keep accumulated records as a partial
    /// outcome; with nothing accumulated the failure propagates.
    async fn interrupted(&self, state: &StreamState, err: SearchError) -> Result<StreamOutcome> {
        if self.arena.is_empty().await {
            return Err(err);
        }
        Ok(StreamOutcome {
            status: StreamStatus::PartiallyCompleted,
            progress: state.progress,
            enrichment_session: None,
            warning: Some(format!("stream interrupted: {err}")),
        })
    }
}
