//! Search operation errors.
//!
//! This module defines the error type for one end-to-end search, along with
//! the structural classification the retry controller uses to decide which
//! failures are worth another attempt.

use crate::transport::TransportError;
use thiserror::Error;

/// Convenience alias for results of search operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Failures of one search operation.
///
/// The retry controller classifies these structurally: transient failures
/// are retried with backoff, terminal failures are not.
#[derive(Debug, Error)]
pub enum SearchError {
    /// HTTP or stream-level transport failure
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The stream did not open before the connect timeout elapsed
    #[error("no data received before the connect timeout")]
    ConnectTimeout,

    /// The stream ran past its total-duration bound before completing
    #[error("stream exceeded its total-duration bound")]
    StreamTimeout,

    /// The backend sent a fatal `error` event
    #[error("backend reported an error: {0}")]
    Backend(String),

    /// The backend delivered demo or placeholder records
    #[error("backend returned disallowed placeholder data")]
    PlaceholderData,

    /// The caller's cancellation token fired before completion
    #[error("search cancelled by caller")]
    Cancelled,

    /// The request failed validation before anything was sent
    #[error("invalid search request: {0}")]
    InvalidRequest(String),
}

impl SearchError {
    /// Whether this failure is network-transient and worth retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_transient(),
            Self::ConnectTimeout | Self::StreamTimeout => true,
            Self::Backend(_)
            | Self::PlaceholderData
            | Self::Cancelled
            | Self::InvalidRequest(_) => false,
        }
    }

    /// Whether the streaming endpoint was unreachable outright, making the
    /// non-streaming fallback endpoint worth a try.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_unreachable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SearchError::ConnectTimeout.is_transient());
        assert!(SearchError::StreamTimeout.is_transient());
        assert!(SearchError::Transport(TransportError::Timeout).is_transient());
        assert!(SearchError::Transport(TransportError::ConnectionRefused).is_transient());
        assert!(SearchError::Transport(TransportError::Dns).is_transient());

        assert!(!SearchError::Backend("quota exceeded".to_string()).is_transient());
        assert!(!SearchError::PlaceholderData.is_transient());
        assert!(!SearchError::Cancelled.is_transient());
    }

    #[test]
    fn test_unreachable_classification() {
        assert!(SearchError::Transport(TransportError::ConnectionRefused).is_unreachable());
        assert!(SearchError::Transport(TransportError::Dns).is_unreachable());
        assert!(!SearchError::ConnectTimeout.is_unreachable());
        assert!(!SearchError::Transport(TransportError::Timeout).is_unreachable());
    }
}
