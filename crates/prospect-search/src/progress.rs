//! Progress reporting over a bounded channel.
//!
//! A single stream can deliver hundreds of record updates in under a
//! second; forwarding each to a UI-bound observer causes visible jank. The
//! coalesced mode collapses updates arriving within a short window to the
//! most recent one, with a trailing flush so the observer always eventually
//! sees the final state even if the window never quiets. This is a
//! backpressure concern, not cosmetic.

use prospect_core::{LeadRecord, ProgressConfig};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// One progress notification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressUpdate {
    /// Snapshot of the deduplicated working set
    pub leads: Vec<LeadRecord>,
    /// Progress percentage, 0-100
    pub progress: f32,
    /// Source label the update refers to, if any
    pub source: Option<String>,
    /// Human-readable status message, if any
    pub message: Option<String>,
    /// Backend phase label, if any
    pub phase: Option<String>,
    /// Estimated total underlying queries, once known
    pub estimated_queries: Option<u32>,
}

/// Delivery mode for progress updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Forward every update
    Immediate,
    /// Collapse updates within the window to the most recent one
    Coalesced(Duration),
}

#[derive(Clone)]
enum SenderInner {
    Disabled,
    Immediate(mpsc::Sender<ProgressUpdate>),
    Coalesced(mpsc::UnboundedSender<ProgressUpdate>),
}

/// Sending half of a progress channel.
#[derive(Clone)]
pub struct ProgressSender {
    inner: SenderInner,
}

impl ProgressSender {
    /// A sender that drops everything, for callers that don't observe
    /// progress.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            inner: SenderInner::Disabled,
        }
    }

    /// Deliver one update. A closed or full receiver is not an error; the
    /// search must not fail because nobody is watching.
    pub async fn emit(&self, update: ProgressUpdate) {
        match &self.inner {
            SenderInner::Disabled => {}
            SenderInner::Immediate(tx) => {
                let _ = tx.send(update).await;
            }
            SenderInner::Coalesced(tx) => {
                let _ = tx.send(update);
            }
        }
    }
}

/// Create a progress channel in the given mode.
///
/// Must be called within a Tokio runtime: the coalesced mode spawns a
/// forwarder task that owns the window timing.
#[must_use]
pub fn channel(mode: ProgressMode, capacity: usize) -> (ProgressSender, mpsc::Receiver<ProgressUpdate>) {
    match mode {
        ProgressMode::Immediate => {
            let (tx, rx) = mpsc::channel(capacity);
            (
                ProgressSender {
                    inner: SenderInner::Immediate(tx),
                },
                rx,
            )
        }
        ProgressMode::Coalesced(window) => {
            let (in_tx, in_rx) = mpsc::unbounded_channel();
            let (out_tx, out_rx) = mpsc::channel(capacity);
            tokio::spawn(coalesce(in_rx, out_tx, window));
            (
                ProgressSender {
                    inner: SenderInner::Coalesced(in_tx),
                },
                out_rx,
            )
        }
    }
}

/// Create a progress channel from configuration.
///
/// A zero coalescing window selects immediate delivery; any other value
/// collapses updates within that many milliseconds. Same runtime
/// requirement as [`channel`].
#[must_use]
pub fn channel_from_config(config: &ProgressConfig) -> (ProgressSender, mpsc::Receiver<ProgressUpdate>) {
    let mode = if config.coalesce_window_ms == 0 {
        ProgressMode::Immediate
    } else {
        ProgressMode::Coalesced(Duration::from_millis(config.coalesce_window_ms))
    };
    channel(mode, config.channel_capacity)
}

/// Forwarder between the raw update feed and the observer channel.
///
/// Each burst is held for one window, keeping only the latest update, then
/// forwarded. When the sender side closes mid-window the held update is
/// flushed before exiting, so the final state is never lost.
async fn coalesce(
    mut input: mpsc::UnboundedReceiver<ProgressUpdate>,
    output: mpsc::Sender<ProgressUpdate>,
    window: Duration,
) {
    while let Some(mut latest) = input.recv().await {
        let deadline = Instant::now() + window;
        loop {
            match tokio::time::timeout_at(deadline, input.recv()).await {
                Ok(Some(update)) => latest = update,
                Ok(None) => {
                    // Trailing flush
                    let _ = output.send(latest).await;
                    return;
                }
                Err(_) => break,
            }
        }
        if output.send(latest).await.is_err() {
            return;
        }
    }
}
