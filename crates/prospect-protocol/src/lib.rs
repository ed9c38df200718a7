//! Prospect Protocol - Wire protocol for the search result stream.
//!
//! This crate decodes the backend's frame-based text protocol into a closed
//! set of typed events. It owns the single point where loosely-shaped wire
//! payloads become structured data; everything downstream works with
//! [`StreamEvent`] values.
//!
//! # Modules
//!
//! - [`frame`] - Incremental frame decoding tolerant of partial reads
//! - [`event`] - The `StreamEvent` union and per-event payload types
//!
//! # Example
//!
//! ```rust
//! use prospect_protocol::{FrameReader, StreamEvent};
//!
//! let mut reader = FrameReader::new();
//! let events = reader.feed(b"event: status\ndata: {\"progress\": 50.0}\n\n");
//! assert!(matches!(events[0], StreamEvent::Status(_)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod event;
pub mod frame;

// Re-export commonly used types
pub use error::{ProtocolError, Result};
pub use event::{
    CompletePayload, EnrichmentCounts, EnrichmentEventPayload, EnrichmentPayload,
    EnrichmentResult, EnrichmentStatusPayload, ErrorPayload, LeadPayload, ResultsPayload,
    SourceErrorPayload, StartPayload, StatusPayload, StreamEvent,
};
pub use frame::FrameReader;
