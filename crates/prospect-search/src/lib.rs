//! Streaming search client: opens a result stream, deduplicates leads as
//! they arrive, reports coalesced progress, retries transient failures,
//! and polls enrichment sessions after the stream completes.
//!
//! The typical entry point is [`SearchClient`]:
//!
//! ```no_run
//! use prospect_core::{AppConfig, SearchRequest};
//! use prospect_search::SearchClient;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SearchClient::new(AppConfig::default())?;
//! let request = SearchRequest::new("plumber", "Austin, TX")?.with_limit(200);
//! let outcome = client.search(&request).await?;
//! println!("{} leads", outcome.lead_count().await);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod client;
pub mod enrich;
pub mod error;
pub mod merge;
pub mod orchestrator;
pub mod progress;
pub mod transport;

pub use client::{SearchClient, SearchOutcome};
pub use enrich::{EnrichmentPollHandle, EnrichmentPoller};
pub use error::{Result, SearchError};
pub use merge::LeadArena;
pub use orchestrator::{StreamOrchestrator, StreamOutcome, StreamStatus};
pub use progress::{channel, channel_from_config, ProgressMode, ProgressSender, ProgressUpdate};
pub use transport::{ByteStream, HttpTransport, SearchTransport, TransportError};
