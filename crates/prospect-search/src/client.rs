//! High-level search client with retry and fallback handling.

use crate::enrich::{EnrichmentPollHandle, EnrichmentPoller};
use crate::error::{Result, SearchError};
use crate::merge::{self, LeadArena};
use crate::orchestrator::{StreamOrchestrator, StreamStatus};
use crate::progress::{self, ProgressSender, ProgressUpdate};
use crate::transport::{HttpTransport, SearchTransport};
use chrono::{DateTime, Utc};
use prospect_core::{AppConfig, SearchRequest};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Final result of a search operation.
///
/// Returned whenever any records were obtained, even if the stream was
/// interrupted; `warning` carries the reason when the result is partial.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Deduplicated working set, shared with any running enrichment poller
    pub leads: LeadArena,
    /// Present when the operation completed with caveats
    pub warning: Option<String>,
    /// Running background poller, when the backend offered an enrichment session
    pub enrichment: Option<EnrichmentPollHandle>,
    /// When the operation finished
    pub completed_at: DateTime<Utc>,
    /// How many stream attempts were made
    pub attempts: u32,
}

impl SearchOutcome {
    /// Number of deduplicated records obtained.
    pub async fn lead_count(&self) -> usize {
        self.leads.len().await
    }
}

/// Entry point for running searches.
///
/// Wraps the per-attempt orchestrator with a retry policy: transient
/// failures are retried with linearly growing delays, application failures
/// are not retried at all, and an exhausted or terminal failure still
/// yields the records accumulated so far when there are any.
pub struct SearchClient {
    transport: Arc<dyn SearchTransport>,
    config: AppConfig,
}

impl SearchClient {
    /// Build a client backed by the HTTP transport from `config.api`.
    pub fn new(config: AppConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config.api, config.search.connect_timeout())?;
        Ok(Self {
            transport: Arc::new(transport),
            config,
        })
    }

    /// Build a client over a caller-supplied transport.
    #[must_use]
    pub fn with_transport(config: AppConfig, transport: Arc<dyn SearchTransport>) -> Self {
        Self { transport, config }
    }

    /// Run a search without progress reporting.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        self.search_inner(request, ProgressSender::disabled(), CancellationToken::new())
            .await
    }

    /// Open a progress channel sized and paced by this client's
    /// configuration, for use with [`Self::search_with_progress`].
    ///
    /// Must be called within a Tokio runtime, see [`progress::channel`].
    #[must_use]
    pub fn progress_channel(&self) -> (ProgressSender, mpsc::Receiver<ProgressUpdate>) {
        progress::channel_from_config(&self.config.progress)
    }

    /// Run a search, emitting progress updates through `progress` and
    /// stopping early when `cancel` fires.
    pub async fn search_with_progress(
        &self,
        request: &SearchRequest,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> Result<SearchOutcome> {
        self.search_inner(request, progress, cancel).await
    }

    async fn search_inner(
        &self,
        request: &SearchRequest,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> Result<SearchOutcome> {
        request
            .validate()
            .map_err(|e| SearchError::InvalidRequest(e.to_string()))?;

        let arena = LeadArena::new();
        let orchestrator = StreamOrchestrator::new(
            Arc::clone(&self.transport),
            self.config.search.clone(),
            arena.clone(),
            progress.clone(),
            cancel.clone(),
        );

        let max_attempts = self.config.search.max_attempts.max(1);
        let mut attempts = 0;
        let mut last_err: Option<SearchError> = None;

        while attempts < max_attempts {
            attempts += 1;
            match orchestrator.run(request).await {
                Ok(outcome) => {
                    let enrichment = self
                        .spawn_enrichment(&arena, &progress, outcome.enrichment_session)
                        .await;
                    let warning = match outcome.status {
                        StreamStatus::Completed => None,
                        StreamStatus::PartiallyCompleted => outcome.warning,
                    };
                    return Ok(self.finish(arena, warning, enrichment, attempts).await);
                }
                Err(err) if err.is_transient() && attempts < max_attempts => {
                    let delay = self.config.search.retry_delay(attempts);
                    tracing::warn!(
                        attempt = attempts,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient search failure; retrying"
                    );
                    last_err = Some(err);
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    last_err = Some(err);
                    break;
                }
            }
        }

        let err = last_err.unwrap_or(SearchError::Cancelled);

        // Records gathered across attempts beat a hard failure.
        if !arena.is_empty().await {
            tracing::warn!(
                leads = arena.len().await,
                error = %err,
                "search failed after partial delivery; returning accumulated records"
            );
            let warning = Some(format!("returning partial results: {err}"));
            return Ok(self.finish(arena, warning, None, attempts).await);
        }

        if err.is_unreachable() && request.limit <= self.config.search.fallback_limit {
            tracing::warn!(error = %err, "stream endpoint unreachable; trying one-shot fallback");
            return self.fallback_fetch(request, arena, attempts).await;
        }

        Err(err)
    }

    /// One-shot fetch against the non-streaming endpoint. Used only when
    /// the stream endpoint is unreachable and the request is small.
    async fn fallback_fetch(
        &self,
        request: &SearchRequest,
        arena: LeadArena,
        attempts: u32,
    ) -> Result<SearchOutcome> {
        let leads = self.transport.fetch_all(request).await?;
        if let Some(bad) = leads.iter().find(|lead| merge::is_placeholder(lead)) {
            tracing::error!(lead_id = %bad.id, "fallback endpoint returned placeholder data");
            return Err(SearchError::PlaceholderData);
        }
        for lead in leads {
            arena.upsert(lead).await;
        }
        tracing::info!(leads = arena.len().await, "fallback fetch succeeded");
        let warning =
            Some("streaming endpoint unreachable; results fetched without streaming".to_string());
        Ok(self.finish(arena, warning, None, attempts).await)
    }

    async fn spawn_enrichment(
        &self,
        arena: &LeadArena,
        progress: &ProgressSender,
        session: Option<String>,
    ) -> Option<EnrichmentPollHandle> {
        let session = session?;
        if arena.is_empty().await {
            return None;
        }
        let poller = EnrichmentPoller::new(
            Arc::clone(&self.transport),
            self.config.enrichment.clone(),
            arena.clone(),
            progress.clone(),
        );
        Some(poller.spawn(session))
    }

    async fn finish(
        &self,
        arena: LeadArena,
        warning: Option<String>,
        enrichment: Option<EnrichmentPollHandle>,
        attempts: u32,
    ) -> SearchOutcome {
        tracing::info!(
            leads = arena.len().await,
            attempts,
            partial = warning.is_some(),
            "search finished"
        );
        SearchOutcome {
            leads: arena,
            warning,
            enrichment,
            completed_at: Utc::now(),
            attempts,
        }
    }
}
