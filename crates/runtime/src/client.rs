//! HTTP dispatch abstraction
//!
//! Executors talk to the backend through the [`HttpDispatcher`] trait so
//! tests can substitute the transport. The production implementation wraps a
//! shared blocking reqwest client; the TLS-verify-skip flag is a constructor
//! argument, never global state.

use openapi_provider_common::{ProviderError, Result};
use std::collections::HashMap;
use std::time::Duration;

/// HTTP methods the provider issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// One outgoing request, fully assembled by the executor.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    /// Headers in application order; duplicates are last-writer-wins
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// Per-operation deadline; unbounded when absent
    pub timeout: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }
}

/// One response, reduced to what the executors consume.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl ApiResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Transport seam used by every executor and by the refresh-token
/// authenticator. Implementations must be safe for concurrent use.
#[cfg_attr(test, mockall::automock)]
pub trait HttpDispatcher: Send + Sync {
    fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// Blocking reqwest-backed dispatcher shared across all calls.
pub struct ReqwestDispatcher {
    client: reqwest::blocking::Client,
}

impl ReqwestDispatcher {
    pub fn new(insecure_skip_verify: bool) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .danger_accept_invalid_certs(insecure_skip_verify)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpDispatcher for ReqwestDispatcher {
    fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(format!("request to '{}' timed out", request.url))
            } else {
                ProviderError::Transport(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .text()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_header_lookup() {
        let response = ApiResponse {
            status: 200,
            headers: HashMap::from([("authorization".to_string(), "Bearer tok".to_string())]),
            body: String::new(),
        };
        assert_eq!(response.header("Authorization"), Some("Bearer tok"));
        assert_eq!(response.header("X-Missing"), None);
    }
}
