//! OpenAPI document model
//!
//! Serde representation of Swagger 2.0 documents, plus the few OpenAPI 3.0
//! fields this provider analyzes (servers and security schemes). Unknown
//! fields are ignored; vendor extensions are collected into flattened maps.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// OpenAPI document root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Swagger 2.x version marker
    #[serde(default)]
    pub swagger: Option<String>,

    /// OpenAPI 3.x version marker
    #[serde(default)]
    pub openapi: Option<String>,

    /// API metadata
    #[serde(default)]
    pub info: Option<Info>,

    /// API host, e.g. "api.service.com"
    #[serde(default)]
    pub host: Option<String>,

    /// Base path prepended to every operation path
    #[serde(rename = "basePath")]
    #[serde(default)]
    pub base_path: Option<String>,

    /// Transfer schemes, e.g. ["https"]
    #[serde(default)]
    pub schemes: Vec<String>,

    /// API paths, ordered for deterministic discovery
    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,

    /// Reusable schema definitions (Swagger 2.0)
    #[serde(default)]
    pub definitions: BTreeMap<String, Schema>,

    /// Security definitions (Swagger 2.0)
    #[serde(rename = "securityDefinitions")]
    #[serde(default)]
    pub security_definitions: BTreeMap<String, RawSecurityDefinition>,

    /// Global security requirements. Each entry is an AND-group; multiple
    /// entries express OR.
    #[serde(default)]
    pub security: Vec<SecurityRequirement>,

    /// Servers (OpenAPI 3.0)
    #[serde(default)]
    pub servers: Vec<Server>,

    /// Reusable components (OpenAPI 3.0)
    #[serde(default)]
    pub components: Option<Components>,

    /// Vendor extensions (x-terraform-*)
    #[serde(flatten)]
    pub extensions: HashMap<String, serde_json::Value>,
}

/// One security requirement group: scheme names with their scopes, kept in
/// declaration order. Ordering is observable through last-writer-wins header
/// injection, so a sorted map would change which credential wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityRequirement(Vec<(String, Vec<String>)>);

impl SecurityRequirement {
    pub fn new(entries: Vec<(String, Vec<String>)>) -> Self {
        Self(entries)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Scheme names in declaration order.
    pub fn scheme_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }
}

impl Serialize for SecurityRequirement {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, scopes) in &self.0 {
            map.serialize_entry(name, scopes)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SecurityRequirement {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        struct GroupVisitor;

        impl<'de> serde::de::Visitor<'de> for GroupVisitor {
            type Value = SecurityRequirement;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("a map of security scheme names to scope lists")
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some(entry) = access.next_entry::<String, Vec<String>>()? {
                    entries.push(entry);
                }
                Ok(SecurityRequirement(entries))
            }
        }

        deserializer.deserialize_map(GroupVisitor)
    }
}

/// API information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub version: Option<String>,
}

/// Server information (OpenAPI 3.0)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
}

/// Path item (operations for one path)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(default)]
    pub get: Option<Operation>,

    #[serde(default)]
    pub post: Option<Operation>,

    #[serde(default)]
    pub put: Option<Operation>,

    #[serde(default)]
    pub delete: Option<Operation>,

    /// Parameters shared by every operation on the path
    #[serde(default)]
    pub parameters: Vec<Parameter>,

    #[serde(flatten)]
    pub extensions: HashMap<String, serde_json::Value>,
}

/// HTTP operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "operationId")]
    #[serde(default)]
    pub operation_id: Option<String>,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub parameters: Vec<Parameter>,

    #[serde(default)]
    pub responses: BTreeMap<String, Response>,

    /// Operation-level security requirements; when present they override the
    /// document-level ones entirely.
    #[serde(default)]
    pub security: Option<Vec<SecurityRequirement>>,

    #[serde(flatten)]
    pub extensions: HashMap<String, serde_json::Value>,
}

/// Operation or path parameter (Swagger 2.0 style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,

    /// Location: query, header, path, body
    #[serde(rename = "in")]
    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub required: bool,

    /// Scalar type for non-body parameters
    #[serde(rename = "type")]
    #[serde(default)]
    pub param_type: Option<String>,

    /// Body schema for body parameters
    #[serde(default)]
    pub schema: Option<SchemaOrRef>,

    #[serde(flatten)]
    pub extensions: HashMap<String, serde_json::Value>,
}

/// Response definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub description: Option<String>,

    /// Response body schema (Swagger 2.0 style)
    #[serde(default)]
    pub schema: Option<SchemaOrRef>,
}

/// Schema or reference
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaOrRef {
    Reference {
        #[serde(rename = "$ref")]
        ref_path: String,
    },
    Schema(Box<Schema>),
}

/// JSON Schema subset used by request/response bodies
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Type: string, integer, number, boolean, array, object
    #[serde(rename = "type")]
    #[serde(default)]
    pub schema_type: Option<String>,

    /// Properties (for object type)
    #[serde(default)]
    pub properties: BTreeMap<String, SchemaOrRef>,

    /// Names of the required properties
    #[serde(default)]
    pub required: Vec<String>,

    /// Items schema (for array type)
    #[serde(default)]
    pub items: Option<Box<SchemaOrRef>>,

    #[serde(rename = "readOnly")]
    #[serde(default)]
    pub read_only: bool,

    #[serde(default)]
    pub default: Option<serde_json::Value>,

    /// Reference
    #[serde(rename = "$ref")]
    #[serde(default)]
    pub ref_path: Option<String>,

    /// Vendor extensions (x-terraform-*)
    #[serde(flatten)]
    pub extensions: HashMap<String, serde_json::Value>,
}

/// Raw security definition entry, shared by Swagger `securityDefinitions`
/// and OpenAPI 3.0 `components.securitySchemes` (the apiKey shape is the
/// same in both).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSecurityDefinition {
    /// Kind, e.g. "apiKey"
    #[serde(rename = "type")]
    #[serde(default)]
    pub def_type: Option<String>,

    /// Header or query parameter name
    #[serde(default)]
    pub name: Option<String>,

    /// Location: header or query
    #[serde(rename = "in")]
    #[serde(default)]
    pub location: Option<String>,

    #[serde(flatten)]
    pub extensions: HashMap<String, serde_json::Value>,
}

/// Reusable components (OpenAPI 3.0)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Components {
    #[serde(rename = "securitySchemes")]
    #[serde(default)]
    pub security_schemes: BTreeMap<String, RawSecurityDefinition>,

    #[serde(default)]
    pub schemas: BTreeMap<String, Schema>,
}

impl Document {
    /// Resolve a `$ref` against the document's reusable schemas. Handles both
    /// `#/definitions/<name>` and `#/components/schemas/<name>`.
    pub fn resolve_ref(&self, ref_path: &str) -> Option<&Schema> {
        if let Some(name) = ref_path.strip_prefix("#/definitions/") {
            return self.definitions.get(name);
        }
        if let Some(name) = ref_path.strip_prefix("#/components/schemas/") {
            return self.components.as_ref().and_then(|c| c.schemas.get(name));
        }
        None
    }

    /// Name of the definition a `$ref` points at, when it points at one.
    pub fn ref_name(ref_path: &str) -> Option<&str> {
        ref_path
            .strip_prefix("#/definitions/")
            .or_else(|| ref_path.strip_prefix("#/components/schemas/"))
    }

    /// Unified view over the document's security definitions: Swagger
    /// `securityDefinitions` when present, else OpenAPI `securitySchemes`.
    pub fn raw_security_definitions(&self) -> &BTreeMap<String, RawSecurityDefinition> {
        if !self.security_definitions.is_empty() {
            return &self.security_definitions;
        }
        static EMPTY: std::sync::OnceLock<BTreeMap<String, RawSecurityDefinition>> =
            std::sync::OnceLock::new();
        match &self.components {
            Some(c) => &c.security_schemes,
            None => EMPTY.get_or_init(BTreeMap::new),
        }
    }
}
