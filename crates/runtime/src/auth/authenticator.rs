//! Authenticator variants
//!
//! An authenticator pairs a security definition with its configured
//! credential value and knows how to decorate an auth context: header
//! injection, query-string rewriting, bearer wrapping or a refresh-token
//! exchange. Authenticators hold no mutable state; refresh exchanges are not
//! cached between requests.

use super::AuthContext;
use crate::client::{ApiRequest, HttpDispatcher, Method};
use openapi_provider_common::{ProviderError, Result};
use openapi_provider_spec::SecurityDefinition;
use tracing::debug;

const AUTHORIZATION: &str = "Authorization";
const BEARER_PREFIX: &str = "Bearer ";
const REFRESH_EXPECTED_STATUSES: [u16; 2] = [200, 204];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticator {
    definition: SecurityDefinition,
    value: String,
}

impl Authenticator {
    pub fn new(definition: SecurityDefinition, value: impl Into<String>) -> Self {
        Self {
            definition,
            value: value.into(),
        }
    }

    pub fn definition(&self) -> &SecurityDefinition {
        &self.definition
    }

    /// Apply this authenticator's transform to the context.
    pub fn apply(&self, context: &mut AuthContext, dispatcher: &dyn HttpDispatcher) -> Result<()> {
        match &self.definition {
            SecurityDefinition::ApiKeyHeader { key_name, .. } => {
                self.require_value()?;
                context
                    .headers
                    .insert(key_name.clone(), self.value.clone());
            }
            SecurityDefinition::ApiKeyQuery { key_name, .. } => {
                self.require_value()?;
                append_query(&mut context.url, key_name, &self.value);
            }
            SecurityDefinition::ApiKeyHeaderBearer { .. } => {
                context
                    .headers
                    .insert(AUTHORIZATION.to_string(), bearer_wrap(&self.value));
            }
            SecurityDefinition::ApiKeyQueryBearer { .. } => {
                append_query(&mut context.url, "access_token", &self.value);
            }
            SecurityDefinition::ApiKeyRefreshToken {
                refresh_token_url, ..
            } => {
                let access_token = self.exchange_refresh_token(refresh_token_url, dispatcher)?;
                context
                    .headers
                    .insert(AUTHORIZATION.to_string(), access_token);
            }
        }
        Ok(())
    }

    fn require_value(&self) -> Result<()> {
        if self.value.is_empty() {
            return Err(ProviderError::AuthConfig(format!(
                "required security definition '{}' is missing the value",
                self.definition.name()
            )));
        }
        Ok(())
    }

    /// POST the stored refresh token and return the access token announced in
    /// the response's `Authorization` header.
    fn exchange_refresh_token(
        &self,
        refresh_token_url: &str,
        dispatcher: &dyn HttpDispatcher,
    ) -> Result<String> {
        debug!(url = refresh_token_url, "exchanging refresh token");
        let mut request = ApiRequest::new(Method::Post, refresh_token_url);
        request
            .headers
            .push((AUTHORIZATION.to_string(), bearer_wrap(&self.value)));
        let response = dispatcher.dispatch(request)?;

        if !REFRESH_EXPECTED_STATUSES.contains(&response.status) {
            return Err(ProviderError::AuthConfig(format!(
                "refresh token POST response '{}' status code '{}' not matching expected response status code [200, 204]",
                refresh_token_url, response.status
            )));
        }
        match response.header(AUTHORIZATION) {
            Some(token) if !token.is_empty() => Ok(token.to_string()),
            _ => Err(ProviderError::AuthConfig(format!(
                "refresh token POST response '{}' is missing the access token",
                refresh_token_url
            ))),
        }
    }
}

fn bearer_wrap(value: &str) -> String {
    if value.starts_with(BEARER_PREFIX) {
        value.to_string()
    } else {
        format!("{}{}", BEARER_PREFIX, value)
    }
}

fn append_query(url: &mut String, key: &str, value: &str) {
    let separator = if url.contains('?') { '&' } else { '?' };
    url.push(separator);
    url.push_str(key);
    url.push('=');
    url.push_str(value);
}
