//! Schema definition model
//!
//! A schema definition is an ordered collection of property descriptors for
//! one resource payload. It knows which property acts as the resource
//! identifier, which one carries the remote status, and which properties are
//! immutable across updates.

use crate::property::PropertyDescriptor;
use crate::{ProviderError, Result};
use serde::{Deserialize, Serialize};

/// Ordered set of property descriptors, indexed by wire name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    properties: Vec<PropertyDescriptor>,
}

impl SchemaDefinition {
    pub fn new(properties: Vec<PropertyDescriptor>) -> Self {
        Self { properties }
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Prepend a property, keeping it ahead of the document-declared ones.
    /// Used for the synthetic parent-id properties of sub-resources.
    pub fn prepend(&mut self, property: PropertyDescriptor) {
        self.properties.insert(0, property);
    }

    /// Look up a property by its wire name.
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Look up a property by its external (compliant) name.
    pub fn property_by_compliant_name(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.compliant_name() == name)
    }

    /// The resource identifier property.
    ///
    /// A property flagged with `x-terraform-id` wins over one whose compliant
    /// name is `id`; a schema with neither is rejected.
    pub fn identifier(&self) -> Result<&PropertyDescriptor> {
        if let Some(p) = self.properties.iter().find(|p| p.is_identifier) {
            return Ok(p);
        }
        self.properties
            .iter()
            .find(|p| p.compliant_name() == "id")
            .ok_or_else(|| {
                ProviderError::Validation(
                    "resource schema is missing a property that uniquely identifies the resource, \
                     either a property named 'id' or a property with the 'x-terraform-id' extension"
                        .to_string(),
                )
            })
    }

    /// The status property used to observe remote state, when present.
    ///
    /// The `x-terraform-field-status` flag wins over the compliant name
    /// `status`. Status properties must be read-only.
    pub fn status(&self) -> Result<Option<&PropertyDescriptor>> {
        let found = self
            .properties
            .iter()
            .find(|p| p.is_status_identifier)
            .or_else(|| self.properties.iter().find(|p| p.compliant_name() == "status"));
        match found {
            Some(p) if !p.read_only => Err(ProviderError::Validation(format!(
                "status property '{}' must be readOnly",
                p.name
            ))),
            other => Ok(other),
        }
    }

    /// Names of the properties that may not change across updates. The
    /// identifier is excluded: it never travels in update payloads.
    pub fn immutable_properties(&self) -> Vec<String> {
        self.properties
            .iter()
            .filter(|p| p.immutable && !p.is_identifier && p.compliant_name() != "id")
            .map(|p| p.name.clone())
            .collect()
    }

    /// Validate every property descriptor in the schema, recursing into
    /// nested schemas.
    pub fn validate(&self) -> Result<()> {
        for p in &self.properties {
            p.validate()?;
            if let Some(nested) = &p.nested_schema {
                nested.validate()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyType;

    fn string_property(name: &str) -> PropertyDescriptor {
        PropertyDescriptor::new(name, PropertyType::String)
    }

    #[test]
    fn test_identifier_extension_wins_over_id_name() {
        let mut tagged = string_property("uuid");
        tagged.is_identifier = true;
        tagged.read_only = true;
        let schema = SchemaDefinition::new(vec![string_property("id"), tagged]);
        assert_eq!(schema.identifier().unwrap().name, "uuid");
    }

    #[test]
    fn test_identifier_falls_back_to_id_name() {
        let schema = SchemaDefinition::new(vec![string_property("id"), string_property("label")]);
        assert_eq!(schema.identifier().unwrap().name, "id");
    }

    #[test]
    fn test_identifier_missing_is_an_error() {
        let schema = SchemaDefinition::new(vec![string_property("label")]);
        assert!(schema.identifier().is_err());
    }

    #[test]
    fn test_status_must_be_read_only() {
        let schema = SchemaDefinition::new(vec![string_property("status")]);
        assert!(schema.status().is_err());

        let mut status = string_property("status");
        status.read_only = true;
        let schema = SchemaDefinition::new(vec![status]);
        assert_eq!(schema.status().unwrap().unwrap().name, "status");
    }

    #[test]
    fn test_status_flag_wins_over_name() {
        let mut flagged = string_property("state");
        flagged.is_status_identifier = true;
        flagged.read_only = true;
        let mut named = string_property("status");
        named.read_only = true;
        let schema = SchemaDefinition::new(vec![named, flagged]);
        assert_eq!(schema.status().unwrap().unwrap().name, "state");
    }

    #[test]
    fn test_immutable_properties_exclude_identifier() {
        let mut id = string_property("id");
        id.immutable = true;
        let mut plan = string_property("plan");
        plan.immutable = true;
        let schema = SchemaDefinition::new(vec![id, plan, string_property("label")]);
        assert_eq!(schema.immutable_properties(), vec!["plan".to_string()]);
    }

    #[test]
    fn test_lookup_by_compliant_name() {
        let schema = SchemaDefinition::new(vec![string_property("ownerName")]);
        assert!(schema.property_by_compliant_name("owner_name").is_some());
        assert!(schema.property("ownerName").is_some());
        assert!(schema.property_by_compliant_name("ownerName").is_none());
    }
}
