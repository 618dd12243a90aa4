//! Security analysis
//!
//! Extracts apiKey security definitions from the document and resolves the
//! global security schemes. Vendor extensions upgrade plain apiKey entries to
//! bearer or refresh-token variants.

use crate::document::{Document, RawSecurityDefinition, SecurityRequirement};
use crate::extensions;
use openapi_provider_common::{compliant_name, ProviderError, Result};

/// A named credential description extracted from the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityDefinition {
    /// apiKey transmitted as a request header
    ApiKeyHeader { name: String, key_name: String },

    /// apiKey appended to the URL query string
    ApiKeyQuery { name: String, key_name: String },

    /// apiKey transmitted as `Authorization: Bearer <value>`
    ApiKeyHeaderBearer { name: String },

    /// apiKey appended to the query string as `access_token`
    ApiKeyQueryBearer { name: String },

    /// Refresh token exchanged for an access token before each call
    ApiKeyRefreshToken {
        name: String,
        refresh_token_url: String,
    },
}

impl SecurityDefinition {
    /// Scheme name as declared in the document.
    pub fn name(&self) -> &str {
        match self {
            SecurityDefinition::ApiKeyHeader { name, .. }
            | SecurityDefinition::ApiKeyQuery { name, .. }
            | SecurityDefinition::ApiKeyHeaderBearer { name }
            | SecurityDefinition::ApiKeyQueryBearer { name }
            | SecurityDefinition::ApiKeyRefreshToken { name, .. } => name,
        }
    }

    /// snake_case key under which the credential is configured.
    pub fn compliant_name(&self) -> String {
        compliant_name(self.name())
    }
}

/// Extract one security definition per apiKey entry in the document.
/// Entries of other types (oauth2, basic) are skipped.
pub fn analyze_security(document: &Document) -> Result<Vec<SecurityDefinition>> {
    let mut definitions = Vec::new();
    for (name, raw) in document.raw_security_definitions() {
        if raw.def_type.as_deref() != Some("apiKey") {
            continue;
        }
        definitions.push(build_definition(name, raw)?);
    }
    Ok(definitions)
}

fn build_definition(name: &str, raw: &RawSecurityDefinition) -> Result<SecurityDefinition> {
    if name.is_empty() {
        return Err(ProviderError::Document(
            "security definition is missing its name".to_string(),
        ));
    }

    if let Some(refresh_url) = extensions::ext_string(&raw.extensions, extensions::REFRESH_TOKEN_URL)
    {
        if raw.location.as_deref() != Some("header") {
            return Err(ProviderError::Document(format!(
                "security definition '{}' with a refresh token URL must be located in the header",
                name
            )));
        }
        if reqwest::Url::parse(&refresh_url).is_err() {
            return Err(ProviderError::Document(format!(
                "security definition '{}' refresh token URL '{}' is not a valid URL",
                name, refresh_url
            )));
        }
        return Ok(SecurityDefinition::ApiKeyRefreshToken {
            name: name.to_string(),
            refresh_token_url: refresh_url,
        });
    }

    let bearer = extensions::ext_bool(&raw.extensions, extensions::BEARER_SCHEME);
    match raw.location.as_deref() {
        Some("header") if bearer => Ok(SecurityDefinition::ApiKeyHeaderBearer {
            name: name.to_string(),
        }),
        Some("query") if bearer => Ok(SecurityDefinition::ApiKeyQueryBearer {
            name: name.to_string(),
        }),
        Some(location @ ("header" | "query")) => {
            let key_name = raw.name.clone().filter(|n| !n.is_empty()).ok_or_else(|| {
                ProviderError::Document(format!(
                    "security definition '{}' is missing the mandatory apiKey name",
                    name
                ))
            })?;
            if location == "header" {
                Ok(SecurityDefinition::ApiKeyHeader {
                    name: name.to_string(),
                    key_name,
                })
            } else {
                Ok(SecurityDefinition::ApiKeyQuery {
                    name: name.to_string(),
                    key_name,
                })
            }
        }
        other => Err(ProviderError::Document(format!(
            "security definition '{}' has unsupported apiKey location '{}'",
            name,
            other.unwrap_or("")
        ))),
    }
}

/// Scheme names of the first non-empty AND-group in a security requirement
/// list. Multiple groups express OR; only the first is honored, a deliberate
/// simplification carried from the source system.
pub fn first_security_group(requirements: &[SecurityRequirement]) -> Vec<String> {
    requirements
        .iter()
        .find(|group| !group.is_empty())
        .map(|group| group.scheme_names().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Global security schemes declared at the document level.
pub fn global_schemes(document: &Document) -> Vec<String> {
    first_security_group(&document.security)
}
