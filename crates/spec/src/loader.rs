//! Spec loader
//!
//! Fetches the OpenAPI document from an http(s) URL or a local path, parses
//! it (JSON first, YAML as fallback) and gates on the supported versions.
//! The document is loaded exactly once per provider start; there are no
//! retries.

use crate::document::Document;
use openapi_provider_common::{ProviderError, Result};
use std::fs;
use std::time::Duration;
use tracing::debug;

/// Supported document flavours.
///
/// Swagger 2.x documents are fully supported. OpenAPI 3.0.* documents are
/// accepted for security and backend analysis only; resource discovery on
/// them yields an empty set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecVersion {
    V2,
    V3,
}

/// A parsed document together with the location it was loaded from. The
/// origin is kept to derive a default host when the document declares none.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub document: Document,
    pub origin: String,
    pub version: SpecVersion,
}

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Load and parse the document at `location` (http/https URL or file path).
pub fn load(location: &str) -> Result<LoadedDocument> {
    let raw = if location.starts_with("http://") || location.starts_with("https://") {
        fetch(location)?
    } else {
        fs::read_to_string(location).map_err(|e| {
            ProviderError::Document(format!("failed to read document '{}': {}", location, e))
        })?
    };
    from_raw(&raw, location)
}

/// Parse already-fetched document text. Exposed for tests and for callers
/// that manage their own transport.
pub fn from_raw(raw: &str, origin: &str) -> Result<LoadedDocument> {
    let document = parse(raw)?;
    let version = validate_version(&document)?;
    debug!(origin, ?version, "loaded OpenAPI document");
    Ok(LoadedDocument {
        document,
        origin: origin.to_string(),
        version,
    })
}

fn fetch(url: &str) -> Result<String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| ProviderError::Transport(e.to_string()))?;
    let response = client.get(url).send().map_err(|e| {
        ProviderError::Document(format!("failed to fetch document '{}': {}", url, e))
    })?;
    if !response.status().is_success() {
        return Err(ProviderError::Document(format!(
            "failed to fetch document '{}': HTTP {}",
            url,
            response.status().as_u16()
        )));
    }
    response
        .text()
        .map_err(|e| ProviderError::Document(format!("failed to read document '{}': {}", url, e)))
}

fn parse(raw: &str) -> Result<Document> {
    match serde_json::from_str::<Document>(raw) {
        Ok(doc) => Ok(doc),
        Err(json_err) => serde_yaml::from_str::<Document>(raw).map_err(|yaml_err| {
            ProviderError::Document(format!(
                "document is neither valid JSON ({}) nor valid YAML ({})",
                json_err, yaml_err
            ))
        }),
    }
}

fn validate_version(document: &Document) -> Result<SpecVersion> {
    if let Some(v) = &document.swagger {
        if v.starts_with("2.") || v == "2" {
            return Ok(SpecVersion::V2);
        }
        return Err(unsupported(v));
    }
    if let Some(v) = &document.openapi {
        if v.starts_with("3.0.") {
            return Ok(SpecVersion::V3);
        }
        return Err(unsupported(v));
    }
    Err(ProviderError::Document(
        "document does not declare a 'swagger' or 'openapi' version".to_string(),
    ))
}

fn unsupported(version: &str) -> ProviderError {
    ProviderError::Document(format!(
        "unsupported document version '{}': Swagger 2.x is fully supported, OpenAPI 3.0.* is accepted for security and backend analysis only",
        version
    ))
}
