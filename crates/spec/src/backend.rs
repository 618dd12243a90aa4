//! Backend configuration
//!
//! Resolves the effective host, base path and transfer scheme for API calls.
//! When the document declares no host, the host of the URL the document was
//! loaded from is used. Hosts carrying a `${region}` placeholder together
//! with the `x-terraform-provider-regions` extension become multi-region
//! backends.

use crate::document::Document;
use crate::extensions;
use crate::loader::{LoadedDocument, SpecVersion};
use openapi_provider_common::{ProviderError, Result};

const REGION_PLACEHOLDER: &str = "${region}";

/// Resolved backend the executors build URLs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    /// Host, possibly containing `${region}`
    pub host: String,
    /// Normalized base path; empty or starting with `/`
    pub base_path: String,
    /// Transfer scheme, `https` preferred
    pub scheme: String,
    /// Allowed regions; empty for single-region backends
    pub regions: Vec<String>,
}

impl Backend {
    pub fn is_multi_region(&self) -> bool {
        !self.regions.is_empty()
    }

    /// Host with the region substituted. Single-region backends ignore the
    /// argument; multi-region backends default to their first listed region.
    pub fn host_for_region(&self, region: Option<&str>) -> Result<String> {
        if !self.is_multi_region() {
            return Ok(self.host.clone());
        }
        let region = match region {
            Some(r) => r,
            None => &self.regions[0],
        };
        if !self.regions.iter().any(|r| r == region) {
            return Err(ProviderError::Configuration(format!(
                "region '{}' is not supported, use one of [{}]",
                region,
                self.regions.join(", ")
            )));
        }
        Ok(self.host.replace(REGION_PLACEHOLDER, region))
    }

    /// `scheme://host(basePath)` for the given region.
    pub fn base_url(&self, region: Option<&str>) -> Result<String> {
        Ok(format!(
            "{}://{}{}",
            self.scheme,
            self.host_for_region(region)?,
            self.base_path
        ))
    }

    /// Base URL with the host replaced by a per-resource endpoint override.
    pub fn base_url_with_host(&self, host: &str) -> String {
        format!("{}://{}{}", self.scheme, host, self.base_path)
    }
}

/// Resolve the backend of a loaded document.
pub fn resolve_backend(loaded: &LoadedDocument) -> Result<Backend> {
    if loaded.version == SpecVersion::V3 {
        return resolve_v3_backend(&loaded.document);
    }
    let document = &loaded.document;

    let host = match document.host.clone().filter(|h| !h.is_empty()) {
        Some(host) => host,
        None => origin_host(&loaded.origin)?,
    };
    let scheme = preferred_scheme(&document.schemes);
    let base_path = normalize_base_path(document.base_path.as_deref());
    let regions = declared_regions(document, &host)?;

    Ok(Backend {
        host,
        base_path,
        scheme,
        regions,
    })
}

fn resolve_v3_backend(document: &Document) -> Result<Backend> {
    let server = document.servers.first().ok_or_else(|| {
        ProviderError::Document("OpenAPI 3.0 document declares no servers".to_string())
    })?;
    let url = reqwest::Url::parse(&server.url).map_err(|e| {
        ProviderError::Document(format!("invalid server URL '{}': {}", server.url, e))
    })?;
    let host = url
        .host_str()
        .ok_or_else(|| {
            ProviderError::Document(format!("server URL '{}' has no host", server.url))
        })?
        .to_string();
    let host = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    };
    Ok(Backend {
        host,
        base_path: normalize_base_path(Some(url.path())),
        scheme: url.scheme().to_string(),
        regions: Vec::new(),
    })
}

fn origin_host(origin: &str) -> Result<String> {
    let url = reqwest::Url::parse(origin).map_err(|_| {
        ProviderError::Document(format!(
            "document declares no host and its origin '{}' is not a URL to derive one from",
            origin
        ))
    })?;
    let host = url.host_str().ok_or_else(|| {
        ProviderError::Document(format!(
            "document declares no host and its origin '{}' has none either",
            origin
        ))
    })?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

fn preferred_scheme(schemes: &[String]) -> String {
    if schemes.is_empty() || schemes.iter().any(|s| s == "https") {
        "https".to_string()
    } else {
        schemes[0].clone()
    }
}

fn normalize_base_path(base_path: Option<&str>) -> String {
    match base_path {
        None | Some("") | Some("/") => String::new(),
        Some(p) => {
            let trimmed = p.trim_end_matches('/');
            if trimmed.starts_with('/') {
                trimmed.to_string()
            } else {
                format!("/{}", trimmed)
            }
        }
    }
}

fn declared_regions(document: &Document, host: &str) -> Result<Vec<String>> {
    let listed = extensions::ext_string(&document.extensions, extensions::PROVIDER_REGIONS);
    match (host.contains(REGION_PLACEHOLDER), listed) {
        (false, _) => Ok(Vec::new()),
        (true, Some(raw)) => {
            let regions: Vec<String> = raw
                .split(',')
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect();
            if regions.is_empty() {
                return Err(ProviderError::Document(
                    "the provider regions extension lists no usable regions".to_string(),
                ));
            }
            Ok(regions)
        }
        (true, None) => Err(ProviderError::Document(format!(
            "host '{}' is region-parameterized but the document does not declare '{}'",
            host,
            extensions::PROVIDER_REGIONS
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::from_raw;

    #[test]
    fn test_explicit_host_and_base_path() {
        let loaded = from_raw(
            r#"{"swagger": "2.0", "host": "api.host.com", "basePath": "/v1/", "schemes": ["http", "https"]}"#,
            "https://other.host.com/swagger.json",
        )
        .unwrap();
        let backend = resolve_backend(&loaded).unwrap();
        assert_eq!(backend.host, "api.host.com");
        assert_eq!(backend.base_path, "/v1");
        assert_eq!(backend.scheme, "https");
        assert_eq!(backend.base_url(None).unwrap(), "https://api.host.com/v1");
    }

    #[test]
    fn test_host_defaults_to_origin() {
        let loaded = from_raw(
            r#"{"swagger": "2.0"}"#,
            "https://www.host.com:8443/swagger.json",
        )
        .unwrap();
        let backend = resolve_backend(&loaded).unwrap();
        assert_eq!(backend.host, "www.host.com:8443");
        assert_eq!(backend.base_path, "");
    }

    #[test]
    fn test_missing_host_with_file_origin_is_an_error() {
        let loaded = from_raw(r#"{"swagger": "2.0"}"#, "/tmp/swagger.json").unwrap();
        assert!(resolve_backend(&loaded).is_err());
    }

    #[test]
    fn test_multi_region_host() {
        let loaded = from_raw(
            r#"{"swagger": "2.0", "host": "api.${region}.host.com",
                "x-terraform-provider-regions": "uswest, useast"}"#,
            "mem",
        )
        .unwrap();
        let backend = resolve_backend(&loaded).unwrap();
        assert!(backend.is_multi_region());
        assert_eq!(
            backend.host_for_region(Some("useast")).unwrap(),
            "api.useast.host.com"
        );
        // Defaults to the first listed region.
        assert_eq!(
            backend.host_for_region(None).unwrap(),
            "api.uswest.host.com"
        );
        assert!(backend.host_for_region(Some("eu")).is_err());
    }

    #[test]
    fn test_region_placeholder_requires_regions_extension() {
        let loaded = from_raw(
            r#"{"swagger": "2.0", "host": "api.${region}.host.com"}"#,
            "mem",
        )
        .unwrap();
        assert!(resolve_backend(&loaded).is_err());
    }

    #[test]
    fn test_v3_server_backend() {
        let loaded = from_raw(
            r#"{"openapi": "3.0.0", "servers": [{"url": "https://api.host.com/v2"}]}"#,
            "mem",
        )
        .unwrap();
        let backend = resolve_backend(&loaded).unwrap();
        assert_eq!(backend.host, "api.host.com");
        assert_eq!(backend.base_path, "/v2");
        assert_eq!(backend.scheme, "https");
    }
}
