//! The closed event union for the search result stream.
//!
//! The backend delivers frames carrying one JSON payload each, optionally
//! tagged with an event-type line. Every payload shape is decoded here, at
//! the frame boundary; unknown event names and unrecognized shapes are
//! rejected at this single point so downstream code only ever sees typed
//! events.

use crate::error::{ProtocolError, Result};
use prospect_core::EnrichmentState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One decoded event from the search result stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Stream opened; query-coverage metadata
    Start(StartPayload),
    /// Human-readable progress, no new records
    Status(StatusPayload),
    /// One batch of new/updated lead records
    Results(ResultsPayload),
    /// Asynchronous contact-enrichment updates
    Enrichment(EnrichmentEventPayload),
    /// One contributing source failed; non-fatal
    SourceError(SourceErrorPayload),
    /// Fatal; the stream should be treated as failed
    Error(ErrorPayload),
    /// Stream finished normally
    Complete(CompletePayload),
}

impl StreamEvent {
    /// Decode a payload into an event, using the frame's `event:` line when
    /// present and falling back to shape inference when it is not.
    ///
    /// # Errors
    /// Returns error for unknown event names, payloads that fail to decode,
    /// or shapes matching no known event.
    pub fn decode(event_type: Option<&str>, payload: Value) -> Result<Self> {
        match event_type {
            Some(name) => Self::decode_named(name, payload),
            None => Self::infer(payload),
        }
    }

    fn decode_named(name: &str, payload: Value) -> Result<Self> {
        match name {
            "start" => Ok(Self::Start(serde_json::from_value(payload)?)),
            "status" => Ok(Self::Status(serde_json::from_value(payload)?)),
            "results" => Ok(Self::Results(serde_json::from_value(payload)?)),
            "enrichment" => Ok(Self::Enrichment(serde_json::from_value(payload)?)),
            "source_error" => Ok(Self::SourceError(serde_json::from_value(payload)?)),
            "error" => Ok(Self::Error(serde_json::from_value(payload)?)),
            "complete" => Ok(Self::Complete(serde_json::from_value(payload)?)),
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }

    /// Infer the event type from the payload shape. Checked in order of
    /// decreasing distinctiveness; `status` is the catch-all for bare
    /// progress/message payloads.
    fn infer(payload: Value) -> Result<Self> {
        let Some(object) = payload.as_object() else {
            return Err(ProtocolError::UnknownShape);
        };

        if object.contains_key("leads") {
            return Ok(Self::Results(serde_json::from_value(payload)?));
        }
        if object.contains_key("results") {
            return Ok(Self::Enrichment(serde_json::from_value(payload)?));
        }
        if object.contains_key("error") {
            return Ok(Self::Error(serde_json::from_value(payload)?));
        }
        if ["sources", "estimatedQueries", "locationCount", "variantCount"]
            .iter()
            .any(|key| object.contains_key(*key))
        {
            return Ok(Self::Start(serde_json::from_value(payload)?));
        }
        if object.contains_key("enrichmentSessionId") || object.contains_key("enrichmentEnabled") {
            return Ok(Self::Complete(serde_json::from_value(payload)?));
        }
        if object.contains_key("progress") || object.contains_key("message") {
            return Ok(Self::Status(serde_json::from_value(payload)?));
        }

        Err(ProtocolError::UnknownShape)
    }
}

/// Payload of a `start` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartPayload {
    /// Whether an asynchronous enrichment queue exists for this search
    pub enrichment_enabled: Option<bool>,
    /// Session id for the enrichment status endpoint
    pub enrichment_session_id: Option<String>,
    /// Number of location variants the backend will query
    pub location_count: Option<u32>,
    /// Number of service-term variants the backend will query
    pub variant_count: Option<u32>,
    /// Estimated total underlying queries
    pub estimated_queries: Option<u32>,
    /// Labels of the contributing data sources
    pub sources: Option<Vec<String>>,
}

/// Payload of a `status` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusPayload {
    /// Progress percentage, 0-100
    pub progress: Option<f32>,
    /// Human-readable status message
    pub message: Option<String>,
    /// Backend phase label
    pub phase: Option<String>,
    /// Source the status refers to
    pub source: Option<String>,
}

/// Payload of a `results` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResultsPayload {
    /// New/updated lead records in this batch
    pub leads: Vec<LeadPayload>,
    /// Progress percentage, 0-100
    pub progress: Option<f32>,
}

/// One business record as delivered on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeadPayload {
    /// Stable backend-assigned id
    pub id: String,
    /// Display name
    pub name: Option<String>,
    /// Website URL
    pub url: Option<String>,
    /// Snippet text from the directory listing
    pub snippet: Option<String>,
    /// Shortened display form of the URL
    pub display_link: Option<String>,
    /// Email from the listing, if any
    pub email: Option<String>,
    /// Phone from the listing, if any
    pub phone: Option<String>,
    /// Address from the listing, if any
    pub address: Option<String>,
    /// Star rating
    pub rating: Option<f32>,
    /// Review count
    pub reviews: Option<u32>,
    /// Labels of the sources this record came from
    pub sources: Option<Vec<String>>,
    /// Raw website-analysis blob; passed through untyped
    pub website_analysis: Option<Value>,
}

/// Payload of an `enrichment` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnrichmentEventPayload {
    /// Per-lead enrichment updates
    pub results: Vec<EnrichmentResult>,
    /// Progress percentage, 0-100
    pub progress: Option<f32>,
}

/// One lead's enrichment update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnrichmentResult {
    /// Id of the lead the data belongs to
    pub lead_id: String,
    /// The enrichment data itself
    pub data: EnrichmentPayload,
}

/// Contact data discovered by enrichment for one lead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnrichmentPayload {
    /// Email addresses found
    pub emails: Vec<String>,
    /// Phone numbers found
    pub phones: Vec<String>,
    /// Social profiles keyed by platform name
    pub social: HashMap<String, String>,
    /// Per-lead enrichment lifecycle state, when the backend reports one
    pub status: Option<EnrichmentState>,
}

/// Payload of a `source_error` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceErrorPayload {
    /// Error description from the failing source
    pub error: Option<String>,
    /// Label of the source that failed
    pub source: Option<String>,
}

/// Payload of a fatal `error` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorPayload {
    /// Error description from the backend
    pub error: Option<String>,
}

/// Payload of a `complete` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletePayload {
    /// Session id for the enrichment status endpoint
    pub enrichment_session_id: Option<String>,
    /// Whether an asynchronous enrichment queue exists
    pub enrichment_enabled: Option<bool>,
    /// Human-readable completion message
    pub message: Option<String>,
}

/// Aggregate counters from the enrichment status endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnrichmentCounts {
    /// Leads not yet picked up
    pub pending: u32,
    /// Leads currently being enriched
    pub processing: u32,
    /// Leads finished successfully
    pub completed: u32,
    /// Leads the queue gave up on
    pub failed: u32,
    /// Total leads in the session
    pub total: u32,
}

/// Response of the polled enrichment status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnrichmentStatusPayload {
    /// Aggregate counters for the session
    pub status: EnrichmentCounts,
    /// Progress percentage, 0-100
    pub progress: Option<f32>,
    /// Whether the queue has drained
    pub is_complete: bool,
    /// Newly available enrichment data, keyed by lead id
    pub results: HashMap<String, EnrichmentPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_named_results() {
        let payload = json!({
            "leads": [{"id": "lead-1", "name": "Acme Plumbing", "url": "https://acmeplumbing.com"}],
            "progress": 40.0
        });
        let event = StreamEvent::decode(Some("results"), payload).expect("decode results");
        let StreamEvent::Results(results) = event else {
            panic!("expected results event");
        };
        assert_eq!(results.leads.len(), 1);
        assert_eq!(results.leads[0].id, "lead-1");
        assert_eq!(results.progress, Some(40.0));
    }

    #[test]
    fn test_decode_named_unknown_event() {
        let err = StreamEvent::decode(Some("heartbeat"), json!({})).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownEvent(_)));
    }

    #[test]
    fn test_infer_results_from_shape() {
        let payload = json!({"leads": [], "progress": 10.0});
        let event = StreamEvent::decode(None, payload).expect("infer results");
        assert!(matches!(event, StreamEvent::Results(_)));
    }

    #[test]
    fn test_infer_enrichment_from_shape() {
        let payload = json!({
            "results": [{"leadId": "lead-1", "data": {"emails": ["owner@acmeplumbing.com"]}}],
            "progress": 50.0
        });
        let event = StreamEvent::decode(None, payload).expect("infer enrichment");
        let StreamEvent::Enrichment(enrichment) = event else {
            panic!("expected enrichment event");
        };
        assert_eq!(enrichment.results[0].lead_id, "lead-1");
        assert_eq!(
            enrichment.results[0].data.emails,
            vec!["owner@acmeplumbing.com".to_string()]
        );
    }

    #[test]
    fn test_infer_error_from_shape() {
        let payload = json!({"error": "backend exploded"});
        let event = StreamEvent::decode(None, payload).expect("infer error");
        assert!(matches!(event, StreamEvent::Error(_)));
    }

    #[test]
    fn test_infer_start_from_shape() {
        let payload = json!({"sources": ["google", "yelp"], "estimatedQueries": 12});
        let event = StreamEvent::decode(None, payload).expect("infer start");
        let StreamEvent::Start(start) = event else {
            panic!("expected start event");
        };
        assert_eq!(start.estimated_queries, Some(12));
    }

    #[test]
    fn test_infer_status_catch_all() {
        let payload = json!({"progress": 25.0, "message": "searching google"});
        let event = StreamEvent::decode(None, payload).expect("infer status");
        assert!(matches!(event, StreamEvent::Status(_)));
    }

    #[test]
    fn test_infer_rejects_unknown_shape() {
        assert!(StreamEvent::decode(None, json!({"foo": 1})).is_err());
        assert!(StreamEvent::decode(None, json!(42)).is_err());
    }

    #[test]
    fn test_enrichment_status_payload() {
        let payload = json!({
            "status": {"pending": 2, "processing": 1, "completed": 5, "failed": 0, "total": 8},
            "progress": 62.5,
            "isComplete": false,
            "results": {
                "lead-3": {"emails": ["info@example.org"], "status": "completed"}
            }
        });
        let status: EnrichmentStatusPayload =
            serde_json::from_value(payload).expect("decode status payload");
        assert_eq!(status.status.completed, 5);
        assert!(!status.is_complete);
        assert_eq!(
            status.results["lead-3"].status,
            Some(EnrichmentState::Completed)
        );
    }
}
