//! Authentication engine
//!
//! Resolves which security schemes apply to one operation and decorates the
//! per-call auth context with each applicable authenticator, in the order the
//! schemes are declared. Header injection is last-writer-wins.

mod authenticator;

pub use authenticator::Authenticator;

use crate::client::HttpDispatcher;
use crate::configuration::ProviderConfiguration;
use openapi_provider_common::{compliant_name, ProviderError, Result};
use openapi_provider_spec::resources::HeaderParameter;
use std::collections::BTreeMap;

/// Per-call mutable record decorated by each applicable authenticator. Lives
/// only for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

impl AuthContext {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }
}

/// Resolve and apply authentication for one operation.
///
/// Operation-level schemes override the global ones entirely; an empty
/// operation list falls back to the globals, and no schemes at all means the
/// operation requires no authentication. After the authenticators run, the
/// operation's `x-terraform-header` parameters are copied from the provider
/// configuration into the header map.
pub fn authenticate(
    operation_url: &str,
    operation_schemes: &[String],
    global_schemes: &[String],
    operation_headers: &[HeaderParameter],
    config: &ProviderConfiguration,
    dispatcher: &dyn HttpDispatcher,
) -> Result<AuthContext> {
    let effective = if !operation_schemes.is_empty() {
        operation_schemes
    } else {
        global_schemes
    };

    let mut context = AuthContext::new(operation_url);

    for scheme in effective {
        let authenticator = config
            .security
            .get(&compliant_name(scheme))
            .ok_or_else(|| {
                ProviderError::AuthConfig(format!(
                    "operation's security policy '{{{name}}}' is not defined, please make sure the swagger file contains a security definition named '{{{name}}}' under the securityDefinitions section",
                    name = scheme
                ))
            })?;
        authenticator.apply(&mut context, dispatcher)?;
    }

    for header in operation_headers {
        if let Some(value) = config.headers.get(&header.config_name) {
            context
                .headers
                .insert(header.name.clone(), value.clone());
        }
    }

    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockHttpDispatcher;
    use openapi_provider_spec::SecurityDefinition;

    fn config_with(authenticators: Vec<Authenticator>) -> ProviderConfiguration {
        let mut config = ProviderConfiguration::default();
        for a in authenticators {
            config.add_authenticator(a);
        }
        config
    }

    fn header_auth(name: &str, key_name: &str, value: &str) -> Authenticator {
        Authenticator::new(
            SecurityDefinition::ApiKeyHeader {
                name: name.to_string(),
                key_name: key_name.to_string(),
            },
            value,
        )
    }

    fn query_auth(name: &str, key_name: &str, value: &str) -> Authenticator {
        Authenticator::new(
            SecurityDefinition::ApiKeyQuery {
                name: name.to_string(),
                key_name: key_name.to_string(),
            },
            value,
        )
    }

    #[test]
    fn test_header_api_key() {
        let config = config_with(vec![header_auth(
            "apikey_header_auth",
            "Authorization",
            "superSecretKey",
        )]);
        let context = authenticate(
            "https://www.host.com/v1/resource",
            &["apikey_header_auth".to_string()],
            &[],
            &[],
            &config,
            &MockHttpDispatcher::new(),
        )
        .unwrap();

        assert_eq!(context.url, "https://www.host.com/v1/resource");
        assert_eq!(
            context.headers.get("Authorization"),
            Some(&"superSecretKey".to_string())
        );
    }

    #[test]
    fn test_query_api_key() {
        let config = config_with(vec![query_auth(
            "apikey_query_auth",
            "Authorization",
            "superSecretKey",
        )]);
        let context = authenticate(
            "https://www.host.com/v1/resource",
            &["apikey_query_auth".to_string()],
            &[],
            &[],
            &config,
            &MockHttpDispatcher::new(),
        )
        .unwrap();

        assert!(context.headers.is_empty());
        assert_eq!(
            context.url,
            "https://www.host.com/v1/resource?Authorization=superSecretKey"
        );
    }

    #[test]
    fn test_mixed_header_and_query_schemes() {
        let config = config_with(vec![
            header_auth("apikey_header_auth", "Authorization", "superSecretKeyInHeader"),
            query_auth("apikey_query_auth", "someQueryParam", "superSecretKeyInQuery"),
        ]);
        let context = authenticate(
            "https://www.host.com/v1/resource",
            &[
                "apikey_header_auth".to_string(),
                "apikey_query_auth".to_string(),
            ],
            &[],
            &[],
            &config,
            &MockHttpDispatcher::new(),
        )
        .unwrap();

        assert_eq!(
            context.headers.get("Authorization"),
            Some(&"superSecretKeyInHeader".to_string())
        );
        assert_eq!(
            context.url,
            "https://www.host.com/v1/resource?someQueryParam=superSecretKeyInQuery"
        );
    }

    #[test]
    fn test_operation_schemes_override_global() {
        let config = config_with(vec![
            header_auth("api_key", "X-API-KEY", "someKey"),
            header_auth(
                "apiKeyOverride",
                "X-API-KEY_OVERRIDE",
                "superSecretKeyForSpecialOperationApiKey",
            ),
        ]);
        let context = authenticate(
            "https://www.host.com/v1/resource",
            &["apiKeyOverride".to_string()],
            &["api_key".to_string()],
            &[],
            &config,
            &MockHttpDispatcher::new(),
        )
        .unwrap();

        assert_eq!(context.headers.len(), 1);
        assert_eq!(
            context.headers.get("X-API-KEY_OVERRIDE"),
            Some(&"superSecretKeyForSpecialOperationApiKey".to_string())
        );
    }

    #[test]
    fn test_undefined_scheme_error_message() {
        let err = authenticate(
            "https://www.host.com/v1/resource",
            &[],
            &["not_defined_scheme".to_string()],
            &[],
            &ProviderConfiguration::default(),
            &MockHttpDispatcher::new(),
        )
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "operation's security policy '{not_defined_scheme}' is not defined, please make sure the swagger file contains a security definition named '{not_defined_scheme}' under the securityDefinitions section"
        );
    }

    #[test]
    fn test_no_schemes_means_no_auth() {
        let context = authenticate(
            "https://www.host.com/v1/resource",
            &[],
            &[],
            &[],
            &ProviderConfiguration::default(),
            &MockHttpDispatcher::new(),
        )
        .unwrap();
        assert!(context.headers.is_empty());
        assert_eq!(context.url, "https://www.host.com/v1/resource");
    }

    #[test]
    fn test_operation_header_parameters_are_copied() {
        let mut config = ProviderConfiguration::default();
        config
            .headers
            .insert("x_request_id".to_string(), "abc-123".to_string());
        let context = authenticate(
            "https://www.host.com/v1/resource",
            &[],
            &[],
            &[HeaderParameter {
                name: "X-Request-ID".to_string(),
                config_name: "x_request_id".to_string(),
            }],
            &config,
            &MockHttpDispatcher::new(),
        )
        .unwrap();
        assert_eq!(
            context.headers.get("X-Request-ID"),
            Some(&"abc-123".to_string())
        );
    }

    #[test]
    fn test_left_fold_ordering_is_last_writer_wins() {
        let config = config_with(vec![
            header_auth("first", "Authorization", "firstValue"),
            header_auth("second", "Authorization", "secondValue"),
        ]);
        let context = authenticate(
            "https://www.host.com/v1/resource",
            &["first".to_string(), "second".to_string()],
            &[],
            &[],
            &config,
            &MockHttpDispatcher::new(),
        )
        .unwrap();
        assert_eq!(
            context.headers.get("Authorization"),
            Some(&"secondValue".to_string())
        );
    }
}
