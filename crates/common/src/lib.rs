//! Common types and utilities for the OpenAPI provider
//!
//! This crate contains the neutral property model, the schema definition
//! model and the error taxonomy shared across the document analysis, runtime
//! and configuration components.

pub mod naming;
pub mod property;
pub mod schema;

pub use naming::compliant_name;
pub use property::{PropertyDescriptor, PropertyType};
pub use schema::SchemaDefinition;

use thiserror::Error;

/// Errors surfaced by the provider, grouped by the boundary they cross.
///
/// Init-time failures (`Configuration`, `Document`) abort provider start.
/// Everything else is per-call and is reported to the host verbatim; nothing
/// is retried internally. `NotFound` is recoverable only by a Read, which
/// clears the local state id.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{0}")]
    Configuration(String),

    #[error("document error: {0}")]
    Document(String),

    #[error("{0}")]
    AuthConfig(String),

    #[error("{0}")]
    Validation(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    UnexpectedStatus(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    /// Whether this error denotes a missing remote entity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = ProviderError::NotFound("gone".to_string());
        assert!(err.is_not_found());
        assert!(!ProviderError::Unauthorized("401".to_string()).is_not_found());
    }

    #[test]
    fn test_user_facing_variants_display_their_message_verbatim() {
        // These variants carry fully-worded messages; no prefix may leak.
        let cases = [
            ProviderError::Configuration("use version '1'".to_string()),
            ProviderError::AuthConfig("missing the value".to_string()),
            ProviderError::Validation("immutable".to_string()),
        ];
        for err in cases {
            let rendered = err.to_string();
            assert!(!rendered.contains("error:"), "unexpected prefix: {rendered}");
        }
    }
}
