//! Prospect Core - Foundation crate for the Prospect search client.
//!
//! This crate provides the shared types, error handling, and configuration
//! management that the protocol and search crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared domain types (`SearchRequest`, `LeadRecord`, `EnrichmentState`)
//!
//! # Example
//!
//! ```rust
//! use prospect_core::{AppConfig, SearchRequest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let request = SearchRequest::new("plumbers", "Austin, TX")?.with_limit(250);
//!
//! assert!(config.search.stream_timeout(request.limit) >= config.search.connect_timeout());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{ApiConfig, AppConfig, EnrichmentConfig, ProgressConfig, SearchConfig};
pub use error::{ConfigError, ConfigResult, ProspectError, Result};
pub use types::{
    ContactInfo, EnrichmentState, LeadRecord, SearchFilters, SearchRequest, MAX_SEARCH_LIMIT,
};
