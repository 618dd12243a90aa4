//! Plugin discovery
//!
//! Resolves where the OpenAPI document for a provider binary lives: an
//! `OTF_VAR_<name>_SWAGGER_URL` environment variable first, otherwise the
//! per-service entry of the plugin configuration YAML under
//! `~/.terraform.d/plugins/`.

use crate::schema_config::SchemaPropertyConfiguration;
use openapi_provider_common::{ProviderError, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const BINARY_PREFIX: &str = "terraform-provider-";
const SUPPORTED_CONFIG_VERSION: &str = "1";
const PLUGIN_CONFIG_FILE: &str = ".terraform.d/plugins/terraform-provider-openapi.yaml";
const INSECURE_SKIP_VERIFY_ENV: &str = "OTF_INSECURE_SKIP_VERIFY";

/// Everything discovery resolves for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub swagger_url: String,
    pub insecure_skip_verify: bool,
    pub schema_configuration: Vec<SchemaPropertyConfiguration>,
}

/// Top-level plugin configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginConfiguration {
    pub version: String,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfiguration>,
}

/// One service entry of the plugin configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfiguration {
    #[serde(rename = "swagger-url")]
    pub swagger_url: String,
    #[serde(default)]
    pub insecure_skip_verify: bool,
    #[serde(default)]
    pub schema_configuration: Vec<SchemaPropertyConfiguration>,
}

/// Extract the provider name from the binary file name. The name must follow
/// the `terraform-provider-<name>` convention.
pub fn provider_name_from_binary(binary_path: &str) -> Result<String> {
    let file_name = Path::new(binary_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(binary_path);
    let remainder = file_name.strip_prefix(BINARY_PREFIX).ok_or_else(|| {
        ProviderError::Configuration(format!(
            "provider binary name '{}' does not follow the 'terraform-provider-<name>' convention",
            file_name
        ))
    })?;
    let pattern = Regex::new(r"(\w+)[^-]*$").map_err(|e| {
        ProviderError::Configuration(format!("invalid provider name pattern: {}", e))
    })?;
    pattern
        .captures(remainder)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str().to_string())
        .ok_or_else(|| {
            ProviderError::Configuration(format!(
                "could not extract a provider name from binary '{}'",
                file_name
            ))
        })
}

/// Resolve the service settings for one provider name.
///
/// The `OTF_VAR_<NAME>_SWAGGER_URL` environment variable (upper-case name
/// first, lower-case fallback) wins over the plugin configuration file.
pub fn discover_service(provider_name: &str) -> Result<ServiceSettings> {
    discover_service_with(provider_name, default_plugin_configuration_path().as_deref())
}

/// Same as [`discover_service`] with an explicit plugin configuration path.
pub fn discover_service_with(
    provider_name: &str,
    plugin_config_path: Option<&Path>,
) -> Result<ServiceSettings> {
    if let Some(url) = swagger_url_from_env(provider_name) {
        debug!(provider = provider_name, %url, "document location from environment");
        return Ok(ServiceSettings {
            swagger_url: url,
            insecure_skip_verify: insecure_skip_verify_from_env(),
            schema_configuration: Vec::new(),
        });
    }

    let path = plugin_config_path.ok_or_else(|| missing_configuration(provider_name))?;
    let configuration = load_plugin_configuration(path)?;
    let service = configuration
        .services
        .get(provider_name)
        .ok_or_else(|| missing_configuration(provider_name))?;
    debug!(provider = provider_name, url = %service.swagger_url, "document location from plugin configuration");
    Ok(ServiceSettings {
        swagger_url: service.swagger_url.clone(),
        insecure_skip_verify: service.insecure_skip_verify || insecure_skip_verify_from_env(),
        schema_configuration: service.schema_configuration.clone(),
    })
}

/// Parse and version-gate the plugin configuration file.
pub fn load_plugin_configuration(path: &Path) -> Result<PluginConfiguration> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ProviderError::Configuration(format!(
            "could not read plugin configuration file '{}': {}",
            path.display(),
            e
        ))
    })?;
    let configuration: PluginConfiguration = serde_yaml::from_str(&raw).map_err(|e| {
        ProviderError::Configuration(format!(
            "plugin configuration file '{}' is malformed: {}",
            path.display(),
            e
        ))
    })?;
    if configuration.version != SUPPORTED_CONFIG_VERSION {
        return Err(ProviderError::Configuration(
            "provider configuration version not matching current implementation, please use version '1' in the plugin configuration file"
                .to_string(),
        ));
    }
    Ok(configuration)
}

fn swagger_url_from_env(provider_name: &str) -> Option<String> {
    let upper = format!("OTF_VAR_{}_SWAGGER_URL", provider_name.to_uppercase());
    let lower = format!("OTF_VAR_{}_SWAGGER_URL", provider_name.to_lowercase());
    std::env::var(upper)
        .or_else(|_| std::env::var(lower))
        .ok()
        .filter(|v| !v.is_empty())
}

fn insecure_skip_verify_from_env() -> bool {
    std::env::var(INSECURE_SKIP_VERIFY_ENV)
        .map(|v| v == "true")
        .unwrap_or(false)
}

fn default_plugin_configuration_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(PLUGIN_CONFIG_FILE))
}

fn missing_configuration(provider_name: &str) -> ProviderError {
    ProviderError::Configuration(format!(
        "no OpenAPI document location configured for provider '{name}': set the OTF_VAR_{upper}_SWAGGER_URL environment variable or add a '{name}' service entry to the plugin configuration file",
        name = provider_name,
        upper = provider_name.to_uppercase()
    ))
}
