//! Resource identification
//!
//! Classifies document paths into managed resources (root + instance paths),
//! sub-resources (parented paths) and data sources (list endpoints), derives
//! their names and parent chains, and records the per-operation metadata the
//! runtime needs (security schemes, header parameters, timeouts).

use crate::document::{Document, Operation, PathItem, Response, SchemaOrRef};
use crate::extensions;
use crate::loader::{LoadedDocument, SpecVersion};
use crate::security::first_security_group;
use crate::translation::{translate_named_definition, translate_object_schema};
use openapi_provider_common::{
    compliant_name, ProviderError, PropertyDescriptor, PropertyType, Result, SchemaDefinition,
};
use tracing::debug;

/// Header parameter surfaced through the provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderParameter {
    /// Wire header name sent to the API
    pub name: String,
    /// snake_case provider-configuration key holding the value
    pub config_name: String,
}

/// Metadata of one HTTP operation backing a CRUD verb.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationSpec {
    /// Operation-level security schemes; empty means the document-level
    /// schemes apply
    pub security_schemes: Vec<String>,
    /// Non-auth headers declared with `x-terraform-header`
    pub header_parameters: Vec<HeaderParameter>,
    /// Per-operation timeout in seconds; unbounded when absent
    pub timeout_seconds: Option<u64>,
}

/// Ancestors of a sub-resource, ordered from outermost to innermost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentInfo {
    /// Version-suffixed parent resource names
    pub names: Vec<String>,
    /// Instance URI template of each parent, e.g. `/v1/cdns/{id}`
    pub uri_templates: Vec<String>,
}

/// A managed resource bound to its paths, schema and operations.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Fully-qualified name carrying the parent chain and version suffixes,
    /// e.g. `cdns_v1_firewalls_v2`
    pub name: String,
    /// Root path template as spelled in the document
    pub path: String,
    /// Instance path template (`<root>/{id}`), when the document exposes one
    pub instance_path: Option<String>,
    /// Name of the payload definition the schema was translated from
    pub definition_name: String,
    pub schema: SchemaDefinition,
    pub parent: Option<ParentInfo>,
    pub create: Option<OperationSpec>,
    pub read: Option<OperationSpec>,
    pub update: Option<OperationSpec>,
    pub delete: Option<OperationSpec>,
}

/// A read-only list endpoint exposed as a data source.
#[derive(Debug, Clone)]
pub struct DataSource {
    pub name: String,
    pub path: String,
    pub schema: SchemaDefinition,
    pub get: OperationSpec,
}

impl Resource {
    /// Assemble the collection URL: base joined with the root path, parent
    /// ids substituted into the template slots in declaration order.
    pub fn collection_url(&self, base_url: &str, parent_ids: &[&str]) -> Result<String> {
        let expected = self.path.matches('{').count();
        if parent_ids.len() != expected {
            return Err(ProviderError::Validation(format!(
                "resource '{}' expects {} parent id(s) but {} were provided",
                self.name,
                expected,
                parent_ids.len()
            )));
        }
        let mut path = String::new();
        let mut ids = parent_ids.iter();
        for segment in self.path.split('/').filter(|s| !s.is_empty()) {
            path.push('/');
            if segment.starts_with('{') {
                // Count-checked above; a missing id keeps the template slot.
                path.push_str(ids.next().copied().unwrap_or(segment));
            } else {
                path.push_str(segment);
            }
        }
        Ok(format!("{}{}", base_url.trim_end_matches('/'), path))
    }

    /// Assemble the instance URL: the collection URL with the entity id
    /// appended.
    pub fn instance_url(&self, base_url: &str, parent_ids: &[&str], id: &str) -> Result<String> {
        Ok(format!(
            "{}/{}",
            self.collection_url(base_url, parent_ids)?,
            id
        ))
    }
}

/// Everything discovered from one document.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub resources: Vec<Resource>,
    pub data_sources: Vec<DataSource>,
}

/// Classify every path of the loaded document.
///
/// OpenAPI 3.0 documents are accepted but yield an empty discovery; only
/// their security definitions and backend are analyzed elsewhere.
pub fn discover(loaded: &LoadedDocument) -> Result<Discovery> {
    if loaded.version == SpecVersion::V3 {
        return Ok(Discovery::default());
    }
    let document = &loaded.document;
    let mut discovery = Discovery::default();

    for (path, item) in &document.paths {
        let normalized = path.trim_end_matches('/');
        if ends_with_parameter(normalized) {
            continue;
        }
        if let Some(resource) = classify_resource(document, normalized, item)? {
            debug!(resource = %resource.name, path = %resource.path, "discovered resource");
            discovery.resources.push(resource);
        } else if let Some(data_source) = classify_data_source(document, normalized, item)? {
            debug!(data_source = %data_source.name, "discovered data source");
            discovery.data_sources.push(data_source);
        }
    }
    Ok(discovery)
}

fn classify_resource(
    document: &Document,
    path: &str,
    item: &PathItem,
) -> Result<Option<Resource>> {
    let post = match &item.post {
        Some(post) => post,
        None => return Ok(None),
    };
    let definition_name = match body_definition_name(post) {
        Some(name) => name,
        None => return Ok(None),
    };

    let instance = find_instance_path(document, path);
    let name_override = extensions::ext_string(&item.extensions, extensions::RESOURCE_NAME)
        .or_else(|| extensions::ext_string(&post.extensions, extensions::RESOURCE_NAME));
    // A resource without a readable instance path only qualifies through the
    // explicit resource-name extension.
    if instance.is_none() && name_override.is_none() {
        return Ok(None);
    }

    let parents = parent_chain(path);
    let own_name = resource_name(path, name_override.as_deref());
    let name = match &parents {
        Some(info) => format!("{}_{}", info.names.join("_"), own_name),
        None => own_name,
    };

    let mut schema = translate_named_definition(document, &definition_name)?;
    if let Some(info) = &parents {
        for parent_name in info.names.iter().rev() {
            let mut parent_id = PropertyDescriptor::new(
                &format!("{}_id", parent_name),
                PropertyType::String,
            );
            parent_id.required = true;
            parent_id.is_parent_property = true;
            parent_id.force_new = true;
            schema.prepend(parent_id);
        }
    }

    let (instance_path, instance_item) = match instance {
        Some((p, i)) => (Some(p), Some(i)),
        None => (None, None),
    };

    Ok(Some(Resource {
        name,
        path: path.to_string(),
        instance_path,
        definition_name,
        schema,
        parent: parents,
        create: Some(operation_spec(post)),
        read: instance_item
            .and_then(|i| i.get.as_ref())
            .map(operation_spec),
        update: instance_item
            .and_then(|i| i.put.as_ref())
            .map(operation_spec),
        delete: instance_item
            .and_then(|i| i.delete.as_ref())
            .map(operation_spec),
    }))
}

fn classify_data_source(
    document: &Document,
    path: &str,
    item: &PathItem,
) -> Result<Option<DataSource>> {
    if item.post.is_some() || item.put.is_some() || item.delete.is_some() {
        return Ok(None);
    }
    let get = match &item.get {
        Some(get) => get,
        None => return Ok(None),
    };
    // A mutating instance sibling means this is a resource list endpoint,
    // not a data source.
    if let Some((_, sibling)) = find_instance_path(document, path) {
        if sibling.put.is_some() || sibling.delete.is_some() {
            return Ok(None);
        }
    }
    let schema = match list_items_schema(document, get)? {
        Some(schema) => schema,
        None => return Ok(None),
    };

    Ok(Some(DataSource {
        name: resource_name(path, None),
        path: path.to_string(),
        schema,
        get: operation_spec(get),
    }))
}

/// Name of the definition the POST body resolves to, when it is a named one.
fn body_definition_name(post: &Operation) -> Option<String> {
    let body = post.parameters.iter().find(|p| p.location == "body")?;
    let ref_path = match body.schema.as_ref()? {
        SchemaOrRef::Reference { ref_path } => ref_path.clone(),
        SchemaOrRef::Schema(schema) => schema.ref_path.clone()?,
    };
    Document::ref_name(&ref_path).map(str::to_string)
}

/// Schema definition of a list endpoint returning an array of objects.
fn list_items_schema(document: &Document, get: &Operation) -> Result<Option<SchemaDefinition>> {
    let response = match get.responses.get("200") {
        Some(r) => r,
        None => return Ok(None),
    };
    let schema_or_ref = match response {
        Response {
            schema: Some(s), ..
        } => s,
        _ => return Ok(None),
    };
    let schema = match schema_or_ref {
        SchemaOrRef::Schema(s) => s.as_ref().clone(),
        SchemaOrRef::Reference { ref_path } => match document.resolve_ref(ref_path) {
            Some(s) => s.clone(),
            None => return Ok(None),
        },
    };
    if schema.schema_type.as_deref() != Some("array") {
        return Ok(None);
    }
    let items = match &schema.items {
        Some(items) => items,
        None => return Ok(None),
    };
    let translated = match items.as_ref() {
        SchemaOrRef::Reference { ref_path } => {
            match Document::ref_name(ref_path) {
                Some(name) => translate_named_definition(document, name)?,
                None => return Ok(None),
            }
        }
        SchemaOrRef::Schema(item_schema) => {
            if item_schema.schema_type.as_deref() != Some("object") {
                return Ok(None);
            }
            let mut stack = Vec::new();
            let translated = translate_object_schema(document, item_schema, &mut stack)?;
            translated.validate()?;
            translated
        }
    };
    Ok(Some(translated))
}

fn operation_spec(operation: &Operation) -> OperationSpec {
    let security_schemes = operation
        .security
        .as_ref()
        .map(|groups| first_security_group(groups))
        .unwrap_or_default();
    let header_parameters = operation
        .parameters
        .iter()
        .filter(|p| p.location == "header")
        .filter_map(|p| {
            extensions::ext_string(&p.extensions, extensions::HEADER).map(|config_name| {
                HeaderParameter {
                    name: p.name.clone(),
                    config_name: compliant_name(&config_name),
                }
            })
        })
        .collect();
    OperationSpec {
        security_schemes,
        header_parameters,
        timeout_seconds: extensions::ext_seconds(&operation.extensions, extensions::OPERATION_TIMEOUT),
    }
}

/// The sibling path `<root>/{id}` carrying a GET, when the document has one.
fn find_instance_path<'a>(document: &'a Document, root: &str) -> Option<(String, &'a PathItem)> {
    for (path, item) in &document.paths {
        let normalized = path.trim_end_matches('/');
        if let Some(rest) = normalized.strip_prefix(root) {
            let rest = rest.trim_start_matches('/');
            if is_parameter(rest) && item.get.is_some() {
                return Some((normalized.to_string(), item));
            }
        }
    }
    None
}

/// Derive a resource name from its root path: the last non-parameter segment
/// in compliant form (overridable via `x-terraform-resource-name`), suffixed
/// with `_v<n>` when a version segment precedes it.
fn resource_name(path: &str, name_override: Option<&str>) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let base_index = segments
        .iter()
        .rposition(|s| !is_parameter(s))
        .unwrap_or(0);
    let base = match name_override {
        Some(name) => compliant_name(name),
        None => compliant_name(segments[base_index]),
    };
    match nearest_version(&segments, base_index) {
        Some(version) => format!("{}_v{}", base, version),
        None => base,
    }
}

/// Parent resources materialized from every parameterized prefix of `path`.
fn parent_chain(path: &str) -> Option<ParentInfo> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let mut names = Vec::new();
    let mut uri_templates = Vec::new();

    for i in 0..segments.len().saturating_sub(1) {
        if !is_parameter(segments[i]) && is_parameter(segments[i + 1]) {
            let base = compliant_name(segments[i]);
            let name = match nearest_version(&segments, i) {
                Some(version) => format!("{}_v{}", base, version),
                None => base,
            };
            names.push(name);
            uri_templates.push(format!("/{}", segments[..=i + 1].join("/")));
        }
    }

    if names.is_empty() {
        None
    } else {
        Some(ParentInfo {
            names,
            uri_templates,
        })
    }
}

fn is_parameter(segment: &str) -> bool {
    segment.starts_with('{') && segment.ends_with('}')
}

/// Whether the path's final segment is a template parameter. Such paths are
/// instance paths and never classify on their own.
fn ends_with_parameter(path: &str) -> bool {
    path.rsplit('/').next().map(is_parameter).unwrap_or(false)
}

/// Most recent `/v<n>/` segment before `index`, when one exists.
fn nearest_version(segments: &[&str], index: usize) -> Option<u64> {
    segments[..index]
        .iter()
        .rev()
        .find_map(|s| s.strip_prefix('v').and_then(|n| n.parse::<u64>().ok()))
}
