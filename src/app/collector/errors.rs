//! Error taxonomy for collection passes.
//!
//! Every variant is fatal to the current invocation. The variants exist so callers can
//! tell *where* a pass failed; they all propagate the same way.

use super::sdk_errors::{categorize_error, ErrorCategory};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    /// Rejected locally before any API call was made
    #[error("invalid configuration for region {region}: {message}")]
    Configuration { region: String, message: String },

    /// The listing call failed for a region
    #[error("failed to list {service} resources in region {region}")]
    List {
        service: &'static str,
        region: String,
        #[source]
        source: anyhow::Error,
    },

    /// A per-item detail call failed
    #[error("failed to describe {service} resource {identifier} in region {region}")]
    Describe {
        service: &'static str,
        region: String,
        identifier: String,
        #[source]
        source: anyhow::Error,
    },

    /// The pass was cancelled while this region was in flight
    #[error("collection cancelled while processing region {region}")]
    Cancelled { region: String },
}

impl CollectError {
    /// Region the failure belongs to
    pub fn region(&self) -> &str {
        match self {
            CollectError::Configuration { region, .. }
            | CollectError::List { region, .. }
            | CollectError::Describe { region, .. }
            | CollectError::Cancelled { region } => region,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CollectError::Cancelled { .. })
    }

    /// Categorize the underlying failure for logging and caller-side retry decisions
    pub fn category(&self) -> ErrorCategory {
        match self {
            CollectError::Configuration { message, .. } => ErrorCategory::NonRetryable {
                code: "InvalidConfiguration".to_string(),
                message: message.clone(),
                is_permission_error: false,
            },
            CollectError::List {
                service, source, ..
            } => categorize_error(source, service, "List"),
            CollectError::Describe {
                service, source, ..
            } => categorize_error(source, service, "Describe"),
            CollectError::Cancelled { .. } => ErrorCategory::Cancelled,
        }
    }
}
