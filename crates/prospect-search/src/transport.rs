//! HTTP transport to the search/enrichment backend.
//!
//! All network failures are mapped into [`TransportError`] kinds at this
//! layer, so retry classification upstream is a structural match rather than
//! error-message sniffing.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use prospect_core::{ApiConfig, SearchRequest};
use prospect_protocol::{EnrichmentStatusPayload, LeadPayload};
use std::error::Error as _;
use std::time::Duration;
use thiserror::Error;

/// Tagged network failure kinds.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Request or read timed out
    #[error("request timed out")]
    Timeout,

    /// TCP connection could not be established
    #[error("connection refused")]
    ConnectionRefused,

    /// Hostname did not resolve
    #[error("DNS resolution failed")]
    Dns,

    /// Transfer started and then broke off
    #[error("transfer aborted: {0}")]
    Aborted(String),

    /// Backend answered with a non-success HTTP status
    #[error("HTTP status {0}")]
    Status(u16),

    /// Anything else
    #[error("transport failure: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether the failure is network-transient (retryable).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::ConnectionRefused | Self::Dns | Self::Aborted(_)
        )
    }

    /// Whether the endpoint was unreachable outright.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::ConnectionRefused | Self::Dns)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Timeout;
        }
        if e.is_connect() {
            // reqwest folds DNS failures into connect errors; walk the source
            // chain to split them back apart.
            let mut source = e.source();
            while let Some(inner) = source {
                if inner.to_string().contains("dns error") {
                    return Self::Dns;
                }
                source = inner.source();
            }
            return Self::ConnectionRefused;
        }
        if let Some(status) = e.status() {
            return Self::Status(status.as_u16());
        }
        if e.is_body() || e.is_decode() || e.is_request() {
            return Self::Aborted(e.to_string());
        }
        Self::Other(e.to_string())
    }
}

/// Raw byte stream of an open search response.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Backend operations the search client needs.
///
/// Implementations must be thread-safe (Send + Sync) for use in async
/// contexts. Tests substitute scripted transports; production uses
/// [`HttpTransport`].
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Open the long-lived streaming search response.
    ///
    /// Resolves once response headers have arrived; the body is consumed
    /// incrementally through the returned stream.
    async fn open_stream(&self, request: &SearchRequest) -> Result<ByteStream, TransportError>;

    /// Fetch the complete result array from the non-streaming fallback
    /// endpoint.
    async fn fetch_all(&self, request: &SearchRequest) -> Result<Vec<LeadPayload>, TransportError>;

    /// Signal the backend to advance its enrichment queue.
    async fn trigger_enrichment(&self, session_id: &str) -> Result<(), TransportError>;

    /// Fetch the current enrichment status for a session.
    async fn enrichment_status(
        &self,
        session_id: &str,
    ) -> Result<EnrichmentStatusPayload, TransportError>;
}

/// [`SearchTransport`] over `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpTransport {
    /// Create a transport from API settings.
    ///
    /// Only a connect timeout is set on the client; the streaming read has
    /// its own total-duration bound in the orchestrator, and a whole-request
    /// timeout here would kill long legitimate streams.
    pub fn new(api: &ApiConfig, connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| TransportError::Other(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            api_key: api.api_key.clone(),
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl SearchTransport for HttpTransport {
    async fn open_stream(&self, request: &SearchRequest) -> Result<ByteStream, TransportError> {
        let response = self
            .request(
                self.client
                    .post(format!("{}/api/search/stream", self.base_url)),
            )
            .json(request)
            .send()
            .await?
            .error_for_status()?;

        Ok(Box::pin(response.bytes_stream().map_err(TransportError::from)))
    }

    async fn fetch_all(&self, request: &SearchRequest) -> Result<Vec<LeadPayload>, TransportError> {
        let response = self
            .request(self.client.post(format!("{}/api/search", self.base_url)))
            .json(request)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    async fn trigger_enrichment(&self, session_id: &str) -> Result<(), TransportError> {
        self.request(self.client.post(format!(
            "{}/api/enrichment/{session_id}/process",
            self.base_url
        )))
        .send()
        .await?
        .error_for_status()?;

        Ok(())
    }

    async fn enrichment_status(
        &self,
        session_id: &str,
    ) -> Result<EnrichmentStatusPayload, TransportError> {
        let response = self
            .request(self.client.get(format!(
                "{}/api/enrichment/{session_id}/status",
                self.base_url
            )))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_kinds() {
        assert!(TransportError::Timeout.is_transient());
        assert!(TransportError::ConnectionRefused.is_transient());
        assert!(TransportError::Dns.is_transient());
        assert!(TransportError::Aborted("reset by peer".to_string()).is_transient());

        assert!(!TransportError::Status(500).is_transient());
        assert!(!TransportError::Other("tls misconfigured".to_string()).is_transient());
    }

    #[test]
    fn test_unreachable_kinds() {
        assert!(TransportError::ConnectionRefused.is_unreachable());
        assert!(TransportError::Dns.is_unreachable());
        assert!(!TransportError::Timeout.is_unreachable());
        assert!(!TransportError::Aborted("mid-stream".to_string()).is_unreachable());
    }

    #[test]
    fn test_http_transport_creation() {
        let api = ApiConfig {
            base_url: "http://localhost:8080/".to_string(),
            api_key: Some("secret".to_string()),
        };
        let transport =
            HttpTransport::new(&api, Duration::from_secs(10)).expect("create transport");
        assert_eq!(transport.base_url, "http://localhost:8080");
    }
}
