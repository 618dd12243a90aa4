//! Provider factory
//!
//! Assembles everything the host runtime needs from one analyzed document:
//! the discovered resources and data sources published under the provider's
//! namespace, the provider-level configuration schema, and a configured
//! runtime (credentials wrapped into authenticators plus one shared HTTP
//! dispatcher).

use openapi_provider_common::{ProviderError, Result};
use openapi_provider_runtime::{
    Authenticator, DataSourceExecutor, HttpDispatcher, ProviderConfiguration, ReqwestDispatcher,
    ResourceExecutor,
};
use openapi_provider_spec::resources::HeaderParameter;
use openapi_provider_spec::{
    analyze_security, discover, global_schemes, resolve_backend, Backend, DataSource, Discovery,
    LoadedDocument, Resource, SecurityDefinition,
};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

/// What kind of provider-level configuration entry a property is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderPropertyKind {
    SecurityCredential,
    Header,
    Region,
    Endpoints,
}

/// One entry of the provider-level configuration schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSchemaProperty {
    pub name: String,
    pub kind: ProviderPropertyKind,
    pub required: bool,
    pub sensitive: bool,
    /// Allowed values for the `region` enum; empty otherwise
    pub allowed_values: Vec<String>,
}

/// The values the user supplies when configuring the provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    /// Credential per security definition, keyed by compliant name
    pub credentials: HashMap<String, String>,
    /// Header values, keyed by configuration name
    pub headers: HashMap<String, String>,
    pub region: Option<String>,
    /// Per-resource host overrides, keyed by resource name
    pub endpoints: HashMap<String, String>,
}

/// A configured runtime: the session configuration plus the shared HTTP
/// dispatcher.
pub struct ConfiguredProvider {
    pub configuration: ProviderConfiguration,
    pub dispatcher: ReqwestDispatcher,
}

// The dispatcher wraps a reqwest client and has no useful debug rendering.
impl std::fmt::Debug for ConfiguredProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguredProvider")
            .field("configuration", &self.configuration)
            .finish_non_exhaustive()
    }
}

pub struct ProviderFactory {
    provider_name: String,
    security_definitions: Vec<SecurityDefinition>,
    global_schemes: Vec<String>,
    discovery: Discovery,
    backend: Backend,
    insecure_skip_verify: bool,
}

impl ProviderFactory {
    /// Analyze a loaded document into a provider.
    pub fn assemble(
        provider_name: impl Into<String>,
        loaded: &LoadedDocument,
        insecure_skip_verify: bool,
    ) -> Result<Self> {
        let provider_name = provider_name.into();
        let security_definitions = analyze_security(&loaded.document)?;
        let global_schemes = global_schemes(&loaded.document);
        let discovery = discover(loaded)?;
        let backend = resolve_backend(loaded)?;
        info!(
            provider = %provider_name,
            resources = discovery.resources.len(),
            data_sources = discovery.data_sources.len(),
            "provider assembled"
        );
        Ok(Self {
            provider_name,
            security_definitions,
            global_schemes,
            discovery,
            backend,
            insecure_skip_verify,
        })
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn global_schemes(&self) -> &[String] {
        &self.global_schemes
    }

    pub fn resources(&self) -> &[Resource] {
        &self.discovery.resources
    }

    pub fn data_sources(&self) -> &[DataSource] {
        &self.discovery.data_sources
    }

    /// Published resource names, namespaced as `<provider>_<resource>`.
    pub fn resource_names(&self) -> Vec<String> {
        self.discovery
            .resources
            .iter()
            .map(|r| self.published_name(&r.name))
            .collect()
    }

    pub fn data_source_names(&self) -> Vec<String> {
        self.discovery
            .data_sources
            .iter()
            .map(|d| self.published_name(&d.name))
            .collect()
    }

    pub fn resource(&self, published_name: &str) -> Option<&Resource> {
        self.discovery
            .resources
            .iter()
            .find(|r| self.published_name(&r.name) == published_name)
    }

    pub fn data_source(&self, published_name: &str) -> Option<&DataSource> {
        self.discovery
            .data_sources
            .iter()
            .find(|d| self.published_name(&d.name) == published_name)
    }

    fn published_name(&self, resource_name: &str) -> String {
        format!("{}_{}", self.provider_name, resource_name)
    }

    /// The provider-level configuration schema: one required sensitive string
    /// per security definition, one optional string per declared header
    /// parameter, a `region` enum for multi-region backends and an
    /// `endpoints` map.
    pub fn provider_schema(&self) -> Vec<ProviderSchemaProperty> {
        let mut properties = Vec::new();
        for definition in &self.security_definitions {
            properties.push(ProviderSchemaProperty {
                name: definition.compliant_name(),
                kind: ProviderPropertyKind::SecurityCredential,
                required: true,
                sensitive: true,
                allowed_values: Vec::new(),
            });
        }
        for header in self.header_parameters() {
            properties.push(ProviderSchemaProperty {
                name: header.config_name.clone(),
                kind: ProviderPropertyKind::Header,
                required: false,
                sensitive: false,
                allowed_values: Vec::new(),
            });
        }
        if self.backend.is_multi_region() {
            properties.push(ProviderSchemaProperty {
                name: "region".to_string(),
                kind: ProviderPropertyKind::Region,
                required: false,
                sensitive: false,
                allowed_values: self.backend.regions.clone(),
            });
        }
        properties.push(ProviderSchemaProperty {
            name: "endpoints".to_string(),
            kind: ProviderPropertyKind::Endpoints,
            required: false,
            sensitive: false,
            allowed_values: Vec::new(),
        });
        properties
    }

    /// Every header parameter declared across the discovered operations,
    /// deduplicated by configuration name.
    fn header_parameters(&self) -> Vec<HeaderParameter> {
        let mut seen = BTreeMap::new();
        let operations = self
            .discovery
            .resources
            .iter()
            .flat_map(|r| [&r.create, &r.read, &r.update, &r.delete])
            .flatten()
            .chain(self.discovery.data_sources.iter().map(|d| &d.get));
        for operation in operations {
            for header in &operation.header_parameters {
                seen.entry(header.config_name.clone())
                    .or_insert_with(|| header.clone());
            }
        }
        seen.into_values().collect()
    }

    /// Validate the user's settings and build the configured runtime.
    pub fn configure(&self, settings: ProviderSettings) -> Result<ConfiguredProvider> {
        let mut configuration = ProviderConfiguration::default();

        for definition in &self.security_definitions {
            let name = definition.compliant_name();
            let value = settings.credentials.get(&name).ok_or_else(|| {
                ProviderError::Configuration(format!(
                    "required provider property '{}' is not configured",
                    name
                ))
            })?;
            configuration.add_authenticator(Authenticator::new(definition.clone(), value.clone()));
        }

        if let Some(region) = &settings.region {
            // Fails early on regions the document does not declare.
            self.backend.host_for_region(Some(region))?;
        }

        configuration.headers = settings.headers;
        configuration.region = settings.region;
        configuration.endpoints = settings.endpoints;

        let dispatcher = ReqwestDispatcher::new(self.insecure_skip_verify)?;
        Ok(ConfiguredProvider {
            configuration,
            dispatcher,
        })
    }

    /// Build a CRUD executor for one discovered resource.
    pub fn resource_executor<'a>(
        &'a self,
        resource: &'a Resource,
        provider: &'a ConfiguredProvider,
    ) -> ResourceExecutor<'a> {
        ResourceExecutor::new(
            resource,
            &self.backend,
            &self.global_schemes,
            &provider.configuration,
            &provider.dispatcher as &dyn HttpDispatcher,
        )
    }

    /// Build a list-and-filter executor for one discovered data source.
    pub fn data_source_executor<'a>(
        &'a self,
        data_source: &'a DataSource,
        provider: &'a ConfiguredProvider,
    ) -> DataSourceExecutor<'a> {
        DataSourceExecutor::new(
            data_source,
            &self.backend,
            &self.global_schemes,
            &provider.configuration,
            &provider.dispatcher as &dyn HttpDispatcher,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openapi_provider_spec::loader;

    const SWAGGER: &str = r##"{
        "swagger": "2.0",
        "host": "www.api.com",
        "basePath": "/",
        "schemes": ["https"],
        "security": [{"apikey_auth": []}],
        "securityDefinitions": {
            "apikey_auth": {"type": "apiKey", "in": "header", "name": "Authorization"}
        },
        "paths": {
            "/v1/cdns": {
                "post": {
                    "parameters": [
                        {"in": "body", "name": "body", "schema": {"$ref": "#/definitions/ContentDeliveryNetwork"}},
                        {"in": "header", "name": "X-Request-ID", "type": "string", "x-terraform-header": "x_request_id"}
                    ],
                    "responses": {"201": {"schema": {"$ref": "#/definitions/ContentDeliveryNetwork"}}}
                }
            },
            "/v1/cdns/{id}": {
                "get": {"responses": {"200": {"schema": {"$ref": "#/definitions/ContentDeliveryNetwork"}}}},
                "delete": {"responses": {"204": {}}}
            }
        },
        "definitions": {
            "ContentDeliveryNetwork": {
                "type": "object",
                "required": ["label"],
                "properties": {
                    "id": {"type": "string", "readOnly": true},
                    "label": {"type": "string"}
                }
            }
        }
    }"##;

    fn factory() -> ProviderFactory {
        let loaded = loader::from_raw(SWAGGER, "https://www.api.com/swagger.json").unwrap();
        ProviderFactory::assemble("openapi", &loaded, false).unwrap()
    }

    #[test]
    fn test_resources_are_published_under_the_provider_namespace() {
        let factory = factory();
        assert_eq!(factory.resource_names(), vec!["openapi_cdns_v1"]);
        assert!(factory.resource("openapi_cdns_v1").is_some());
        assert!(factory.resource("other_cdns_v1").is_none());
    }

    #[test]
    fn test_provider_schema_surface() {
        let factory = factory();
        let schema = factory.provider_schema();

        let credential = schema
            .iter()
            .find(|p| p.kind == ProviderPropertyKind::SecurityCredential)
            .unwrap();
        assert_eq!(credential.name, "apikey_auth");
        assert!(credential.required);
        assert!(credential.sensitive);

        let header = schema
            .iter()
            .find(|p| p.kind == ProviderPropertyKind::Header)
            .unwrap();
        assert_eq!(header.name, "x_request_id");
        assert!(!header.required);

        assert!(schema.iter().any(|p| p.kind == ProviderPropertyKind::Endpoints));
        assert!(!schema.iter().any(|p| p.kind == ProviderPropertyKind::Region));
    }

    #[test]
    fn test_configure_requires_every_credential() {
        let factory = factory();
        let err = factory.configure(ProviderSettings::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "required provider property 'apikey_auth' is not configured"
        );
    }

    #[test]
    fn test_configure_builds_authenticators() {
        let factory = factory();
        let mut settings = ProviderSettings::default();
        settings
            .credentials
            .insert("apikey_auth".to_string(), "superSecretKey".to_string());
        let provider = factory.configure(settings).unwrap();
        assert!(provider.configuration.security.contains_key("apikey_auth"));
    }

    #[test]
    fn test_unknown_region_is_rejected() {
        let raw = r#"{
            "swagger": "2.0",
            "host": "www.${region}.api.com",
            "x-terraform-provider-regions": "uswest, useast",
            "paths": {},
            "definitions": {}
        }"#;
        let loaded = loader::from_raw(raw, "https://www.api.com/swagger.json").unwrap();
        let factory = ProviderFactory::assemble("openapi", &loaded, false).unwrap();

        let schema = factory.provider_schema();
        let region = schema
            .iter()
            .find(|p| p.kind == ProviderPropertyKind::Region)
            .unwrap();
        assert_eq!(region.allowed_values, vec!["uswest", "useast"]);

        let mut settings = ProviderSettings::default();
        settings.region = Some("eunorth".to_string());
        assert!(factory.configure(settings).is_err());
    }
}
