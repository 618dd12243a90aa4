//! Provider assembly and plugin discovery
//!
//! Bridges an analyzed OpenAPI document to the host runtime: the provider
//! factory with its configuration surface, the plugin discovery rules that
//! locate the document for a given provider binary, and external
//! default-value resolution for provider schema properties.

pub mod discovery;
pub mod factory;
pub mod schema_config;

pub use discovery::{
    discover_service, discover_service_with, load_plugin_configuration, provider_name_from_binary,
    PluginConfiguration, ServiceConfiguration, ServiceSettings,
};
pub use factory::{
    ConfiguredProvider, ProviderFactory, ProviderPropertyKind, ProviderSchemaProperty,
    ProviderSettings,
};
pub use schema_config::{ContentType, ExternalConfiguration, SchemaPropertyConfiguration};
