//! Wire protocol errors.
//!
//! This module defines the error type for turning raw frame payloads into
//! typed stream events. Frame reading itself never fails; only event
//! decoding does, and the reader skips undecodable frames.

use thiserror::Error;

/// Convenience alias for results of event decoding.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Failures turning a frame payload into a typed stream event.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame's `event:` line named a type this client does not know
    #[error("unknown event type: {0}")]
    UnknownEvent(String),

    /// No `event:` line was present and the payload shape matched no event
    #[error("payload shape matches no known event")]
    UnknownShape,

    /// The payload was not valid JSON for the selected event's shape
    #[error("payload decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}
