//! Shared types used across the Prospect client library.
//!
//! This module defines the search request and the lead record that the
//! streaming client builds up over a search's lifetime.

use crate::error::ProspectError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Maximum result-count ceiling a single search may request.
pub const MAX_SEARCH_LIMIT: u32 = 10_000;

/// Immutable input for one user-initiated search.
///
/// Created once per search and never mutated; retries re-send the same
/// request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Free-text service term, e.g. "plumbers"
    pub service: String,
    /// Location string, e.g. "Austin, TX"
    pub location: String,
    /// Result-count ceiling
    pub limit: u32,
    /// Boolean/enumerated lead filters
    #[serde(default)]
    pub filters: SearchFilters,
    /// Optional platform allow-list (directory sources to include)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<Vec<String>>,
}

impl SearchRequest {
    /// Create a new search request with the default result ceiling.
    ///
    /// # Errors
    /// Returns error if the service term or location is empty.
    pub fn new(
        service: impl Into<String>,
        location: impl Into<String>,
    ) -> Result<Self, ProspectError> {
        let request = Self {
            service: service.into(),
            location: location.into(),
            limit: 100,
            filters: SearchFilters::default(),
            platforms: None,
        };
        request.validate()?;
        Ok(request)
    }

    /// Set the result-count ceiling.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Set the lead filters.
    #[must_use]
    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Restrict the search to the given platform sources.
    #[must_use]
    pub fn allow_platforms(mut self, platforms: Vec<String>) -> Self {
        self.platforms = Some(platforms);
        self
    }

    /// Validate the request before sending it to the backend.
    ///
    /// # Errors
    /// Returns error if the service term or location is empty, or the
    /// result ceiling is zero or above [`MAX_SEARCH_LIMIT`].
    pub fn validate(&self) -> Result<(), ProspectError> {
        if self.service.trim().is_empty() {
            return Err(ProspectError::Validation(
                "search service term must not be empty".to_string(),
            ));
        }
        if self.location.trim().is_empty() {
            return Err(ProspectError::Validation(
                "search location must not be empty".to_string(),
            ));
        }
        if self.limit == 0 || self.limit > MAX_SEARCH_LIMIT {
            return Err(ProspectError::Validation(format!(
                "result limit must be between 1 and {MAX_SEARCH_LIMIT}, got {}",
                self.limit
            )));
        }
        Ok(())
    }
}

/// Boolean/enumerated filters narrowing a search to outreach-worthy leads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    /// Only businesses without a website
    pub no_website: bool,
    /// Only businesses whose website is not mobile-friendly
    pub mobile_unfriendly: bool,
    /// Minimum star rating
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f32>,
    /// Maximum review count (low-review businesses are better outreach targets)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_reviews: Option<u32>,
}

/// Lifecycle state of a lead's asynchronous contact enrichment.
///
/// Transitions are forward-only: `Pending → Processing → Completed`, or
/// `Pending → Failed`. A later event must never revert a record to an
/// earlier state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentState {
    /// Not yet picked up by the enrichment queue
    #[default]
    Pending,
    /// Currently being enriched
    Processing,
    /// Enrichment gave up on this lead
    Failed,
    /// Contact data has been merged in
    Completed,
}

impl EnrichmentState {
    /// Position in the forward-only ordering. Higher never reverts to lower.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Failed => 2,
            Self::Completed => 3,
        }
    }

    /// The more advanced of two states under the forward-only ordering.
    #[must_use]
    pub fn advanced(self, other: Self) -> Self {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for EnrichmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Failed => "failed",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// Contact details added to a lead by asynchronous enrichment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactInfo {
    /// Email addresses found for the business
    pub emails: Vec<String>,
    /// Phone numbers found for the business
    pub phones: Vec<String>,
    /// Social profiles keyed by platform name ("facebook", "instagram", ...)
    pub social: HashMap<String, String>,
}

impl ContactInfo {
    /// Whether the payload carries no contact data at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.phones.is_empty() && self.social.is_empty()
    }
}

/// One business record, built up over a search's lifetime.
///
/// Created when a `results` event first introduces an unseen id, updated by
/// later `results` events, identity merges, and `enrichment` events. Lives
/// for the duration of one search operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeadRecord {
    /// Stable backend-assigned id
    pub id: String,
    /// Display name
    pub name: String,
    /// Website URL as returned by the backend
    pub url: String,
    /// Normalized website host (scheme- and `www.`-stripped, lowercased)
    pub host: String,
    /// Snippet text from the directory listing
    pub snippet: String,
    /// Primary email, if the directory listing carried one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Primary phone, if the directory listing carried one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Street address, if the directory listing carried one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Star rating
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    /// Review count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviews: Option<u32>,
    /// Labels of the data sources that contributed to this record
    pub sources: Vec<String>,
    /// Contact-enrichment payload, once enrichment lands
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<ContactInfo>,
    /// Enrichment lifecycle state
    pub enrichment: EnrichmentState,
}

impl LeadRecord {
    /// Advance the enrichment state, never moving backwards.
    pub fn advance_enrichment(&mut self, next: EnrichmentState) {
        self.enrichment = self.enrichment.advanced(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_valid() {
        let request = SearchRequest::new("plumbers", "Austin, TX").expect("valid request");
        assert_eq!(request.limit, 100);
        assert!(request.platforms.is_none());
    }

    #[test]
    fn test_request_empty_fields_rejected() {
        assert!(SearchRequest::new("", "Austin, TX").is_err());
        assert!(SearchRequest::new("plumbers", "   ").is_err());
    }

    #[test]
    fn test_request_limit_bounds() {
        let request = SearchRequest::new("plumbers", "Austin, TX")
            .expect("valid request")
            .with_limit(0);
        assert!(request.validate().is_err());

        let request = request.with_limit(MAX_SEARCH_LIMIT + 1);
        assert!(request.validate().is_err());

        let request = request.with_limit(5000);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = SearchRequest::new("plumbers", "Austin, TX")
            .expect("valid request")
            .with_filters(SearchFilters {
                no_website: true,
                ..SearchFilters::default()
            });
        let json = serde_json::to_value(&request).expect("serialize request");
        assert_eq!(json["service"], "plumbers");
        assert_eq!(json["filters"]["noWebsite"], true);
    }

    #[test]
    fn test_enrichment_state_forward_only() {
        assert_eq!(
            EnrichmentState::Pending.advanced(EnrichmentState::Processing),
            EnrichmentState::Processing
        );
        assert_eq!(
            EnrichmentState::Completed.advanced(EnrichmentState::Pending),
            EnrichmentState::Completed
        );
        // Failed never downgrades a completed record
        assert_eq!(
            EnrichmentState::Completed.advanced(EnrichmentState::Failed),
            EnrichmentState::Completed
        );
    }

    #[test]
    fn test_advance_enrichment_never_regresses() {
        let mut record = LeadRecord {
            id: "lead-1".to_string(),
            enrichment: EnrichmentState::Completed,
            ..LeadRecord::default()
        };
        record.advance_enrichment(EnrichmentState::Pending);
        assert_eq!(record.enrichment, EnrichmentState::Completed);
    }

    #[test]
    fn test_contact_info_is_empty() {
        assert!(ContactInfo::default().is_empty());

        let contact = ContactInfo {
            emails: vec!["owner@acmeplumbing.com".to_string()],
            ..ContactInfo::default()
        };
        assert!(!contact.is_empty());
    }

    #[test]
    fn test_enrichment_state_serialization() {
        let json = serde_json::to_string(&EnrichmentState::Processing).expect("serialize state");
        assert_eq!(json, "\"processing\"");

        let state: EnrichmentState = serde_json::from_str("\"completed\"").expect("parse state");
        assert_eq!(state, EnrichmentState::Completed);
    }
}
