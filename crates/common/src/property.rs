//! Property descriptor model
//!
//! A property descriptor is the neutral representation of one JSON Schema
//! property after translation: a type tag, behavioural flags, an optional
//! default and, for objects and lists of objects, a nested schema. Descriptors
//! are built once at provider-init time and immutable afterwards.

use crate::naming::compliant_name;
use crate::schema::SchemaDefinition;
use crate::{ProviderError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Type tag of a translated property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    String,
    Integer,
    Number,
    Boolean,
    List,
    Object,
}

/// One translated schema property.
///
/// The `name` is the wire name as spelled in the API document; externally the
/// property is always addressed by [`PropertyDescriptor::compliant_name`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    /// Wire name as it appears in the API document
    pub name: String,

    /// External alias from `x-terraform-field-name`
    #[serde(default)]
    pub preferred_name: Option<String>,

    /// Type tag
    pub property_type: PropertyType,

    /// Element type when `property_type` is `List`
    #[serde(default)]
    pub array_items_type: Option<PropertyType>,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub read_only: bool,

    /// Optional-computed (`x-terraform-computed`)
    #[serde(default)]
    pub computed: bool,

    #[serde(default)]
    pub force_new: bool,

    #[serde(default)]
    pub sensitive: bool,

    #[serde(default)]
    pub immutable: bool,

    /// Marked by `x-terraform-id`
    #[serde(default)]
    pub is_identifier: bool,

    /// Marked by `x-terraform-field-status`
    #[serde(default)]
    pub is_status_identifier: bool,

    /// Synthetic parent-id property injected for sub-resources
    #[serde(default)]
    pub is_parent_property: bool,

    /// `x-terraform-complex-object-legacy-config`
    #[serde(default)]
    pub enable_legacy_complex_object_block: bool,

    #[serde(default)]
    pub default: Option<Value>,

    /// Nested schema, mandatory for objects and lists of objects
    #[serde(default)]
    pub nested_schema: Option<SchemaDefinition>,
}

impl PropertyDescriptor {
    /// Create a plain optional property of the given type.
    pub fn new(name: &str, property_type: PropertyType) -> Self {
        Self {
            name: name.to_string(),
            preferred_name: None,
            property_type,
            array_items_type: None,
            required: false,
            read_only: false,
            computed: false,
            force_new: false,
            sensitive: false,
            immutable: false,
            is_identifier: false,
            is_status_identifier: false,
            is_parent_property: false,
            enable_legacy_complex_object_block: false,
            default: None,
            nested_schema: None,
        }
    }

    /// External key for this property: the preferred name when declared,
    /// otherwise the snake_case form of the wire name.
    pub fn compliant_name(&self) -> String {
        match &self.preferred_name {
            Some(alias) => alias.clone(),
            None => compliant_name(&self.name),
        }
    }

    /// Whether the host should treat the value as computed by the backend.
    ///
    /// Holds for read-only properties and for optional-computed properties
    /// that carry no default.
    pub fn is_computed(&self) -> bool {
        !self.required && (self.read_only || (self.computed && self.default.is_none()))
    }

    /// Whether the property is surfaced as a length-1 list of one object.
    ///
    /// Objects with nested objects cannot be represented as flat maps by the
    /// host, and the legacy extension forces the same rendering.
    pub fn uses_legacy_block(&self) -> bool {
        self.property_type == PropertyType::Object
            && (self.has_nested_object() || self.enable_legacy_complex_object_block)
    }

    /// Whether this is a list whose elements are objects.
    pub fn is_list_of_objects(&self) -> bool {
        self.property_type == PropertyType::List
            && self.array_items_type == Some(PropertyType::Object)
    }

    fn has_nested_object(&self) -> bool {
        self.nested_schema
            .as_ref()
            .map(|s| {
                s.properties()
                    .iter()
                    .any(|p| p.property_type == PropertyType::Object)
            })
            .unwrap_or(false)
    }

    /// Check the descriptor invariants.
    pub fn validate(&self) -> Result<()> {
        if self.required && self.computed {
            return Err(ProviderError::Validation(format!(
                "property '{}' is configured as required and can not be configured as computed too",
                self.name
            )));
        }
        if self.read_only && self.default.is_some() {
            return Err(ProviderError::Validation(format!(
                "property '{}' is configured as readOnly and can not have a default value",
                self.name
            )));
        }
        if self.force_new && self.immutable {
            return Err(ProviderError::Validation(format!(
                "property '{}' can not be configured as both forceNew and immutable",
                self.name
            )));
        }
        let needs_nested = self.property_type == PropertyType::Object || self.is_list_of_objects();
        if needs_nested && self.nested_schema.is_none() {
            return Err(ProviderError::Validation(format!(
                "property '{}' is missing the nested schema definition for its object type",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compliant_name_prefers_alias() {
        let mut p = PropertyDescriptor::new("ownerName", PropertyType::String);
        assert_eq!(p.compliant_name(), "owner_name");
        p.preferred_name = Some("owner".to_string());
        assert_eq!(p.compliant_name(), "owner");
    }

    #[test]
    fn test_is_computed_predicate() {
        let mut p = PropertyDescriptor::new("status", PropertyType::String);
        p.read_only = true;
        assert!(p.is_computed());

        let mut p = PropertyDescriptor::new("port", PropertyType::Integer);
        p.computed = true;
        assert!(p.is_computed());
        p.default = Some(serde_json::json!(8080));
        assert!(!p.is_computed());

        let mut p = PropertyDescriptor::new("label", PropertyType::String);
        p.required = true;
        p.read_only = true;
        assert!(!p.is_computed());
    }

    #[test]
    fn test_required_computed_is_invalid() {
        let mut p = PropertyDescriptor::new("label", PropertyType::String);
        p.required = true;
        p.computed = true;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_read_only_with_default_is_invalid() {
        let mut p = PropertyDescriptor::new("status", PropertyType::String);
        p.read_only = true;
        p.default = Some(serde_json::json!("up"));
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_force_new_immutable_is_invalid() {
        let mut p = PropertyDescriptor::new("plan", PropertyType::String);
        p.force_new = true;
        p.immutable = true;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_object_requires_nested_schema() {
        let p = PropertyDescriptor::new("settings", PropertyType::Object);
        assert!(p.validate().is_err());

        let mut p = PropertyDescriptor::new("settings", PropertyType::Object);
        p.nested_schema = Some(SchemaDefinition::new(vec![PropertyDescriptor::new(
            "level",
            PropertyType::String,
        )]));
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_legacy_block_rendering() {
        let mut nested_object = PropertyDescriptor::new("inner", PropertyType::Object);
        nested_object.nested_schema = Some(SchemaDefinition::new(vec![PropertyDescriptor::new(
            "leaf",
            PropertyType::String,
        )]));

        let mut p = PropertyDescriptor::new("settings", PropertyType::Object);
        p.nested_schema = Some(SchemaDefinition::new(vec![nested_object]));
        assert!(p.uses_legacy_block());

        let mut flat = PropertyDescriptor::new("settings", PropertyType::Object);
        flat.nested_schema = Some(SchemaDefinition::new(vec![PropertyDescriptor::new(
            "leaf",
            PropertyType::String,
        )]));
        assert!(!flat.uses_legacy_block());
        flat.enable_legacy_complex_object_block = true;
        assert!(flat.uses_legacy_block());
    }
}
