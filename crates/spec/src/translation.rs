//! JSON Schema to property-model translation
//!
//! Walks a document schema and produces the neutral property descriptors the
//! runtime operates on. References are resolved against the document's
//! reusable definitions; self-referencing schemas are rejected as malformed.

use crate::document::{Document, Schema, SchemaOrRef};
use crate::extensions;
use openapi_provider_common::{
    ProviderError, PropertyDescriptor, PropertyType, Result, SchemaDefinition,
};

/// Translate the named reusable definition into a schema definition.
pub fn translate_named_definition(
    document: &Document,
    definition_name: &str,
) -> Result<SchemaDefinition> {
    let schema = document.resolve_ref(&format!("#/definitions/{}", definition_name))
        .or_else(|| document.resolve_ref(&format!("#/components/schemas/{}", definition_name)))
        .ok_or_else(|| {
            ProviderError::Document(format!(
                "missing schema definition '{}' referenced by the resource payload",
                definition_name
            ))
        })?;
    let mut stack = vec![definition_name.to_string()];
    let translated = translate_object_schema(document, schema, &mut stack)?;
    translated.validate()?;
    Ok(translated)
}

/// Translate an object schema into an ordered set of property descriptors.
/// `stack` tracks the reference names currently being expanded so cycles are
/// reported instead of recursed into.
pub fn translate_object_schema(
    document: &Document,
    schema: &Schema,
    stack: &mut Vec<String>,
) -> Result<SchemaDefinition> {
    let mut properties = Vec::new();
    for (name, schema_or_ref) in &schema.properties {
        let required = schema.required.iter().any(|r| r == name);
        let resolved = resolve(document, schema_or_ref, stack)?;
        let descriptor = translate_property(document, name, required, resolved.schema, stack)?;
        if let Some(pushed) = resolved.pushed {
            debug_assert_eq!(stack.last(), Some(&pushed));
            stack.pop();
        }
        properties.push(descriptor);
    }
    Ok(SchemaDefinition::new(properties))
}

struct Resolved<'a> {
    schema: &'a Schema,
    /// Reference name pushed onto the cycle stack, to pop after use
    pushed: Option<String>,
}

fn resolve<'a>(
    document: &'a Document,
    schema_or_ref: &'a SchemaOrRef,
    stack: &mut Vec<String>,
) -> Result<Resolved<'a>> {
    let (schema, ref_path) = match schema_or_ref {
        SchemaOrRef::Schema(s) => match &s.ref_path {
            Some(ref_path) => (None, Some(ref_path.clone())),
            None => (Some(s.as_ref()), None),
        },
        SchemaOrRef::Reference { ref_path } => (None, Some(ref_path.clone())),
    };

    match (schema, ref_path) {
        (Some(schema), None) => Ok(Resolved {
            schema,
            pushed: None,
        }),
        (_, Some(ref_path)) => {
            let name = Document::ref_name(&ref_path).unwrap_or(&ref_path).to_string();
            if stack.contains(&name) {
                return Err(ProviderError::Document(format!(
                    "schema definition '{}' references itself; cyclic schemas are not supported",
                    name
                )));
            }
            let schema = document.resolve_ref(&ref_path).ok_or_else(|| {
                ProviderError::Document(format!("unresolvable schema reference '{}'", ref_path))
            })?;
            stack.push(name.clone());
            Ok(Resolved {
                schema,
                pushed: Some(name),
            })
        }
        (None, None) => unreachable!("schema or ref must carry one of the two"),
    }
}

fn translate_property(
    document: &Document,
    name: &str,
    required: bool,
    schema: &Schema,
    stack: &mut Vec<String>,
) -> Result<PropertyDescriptor> {
    let property_type = property_type_of(schema, name)?;
    let mut descriptor = PropertyDescriptor::new(name, property_type);
    descriptor.required = required;
    descriptor.read_only = schema.read_only;
    descriptor.default = schema.default.clone();

    descriptor.immutable = extensions::ext_bool(&schema.extensions, extensions::IMMUTABLE);
    descriptor.force_new = extensions::ext_bool(&schema.extensions, extensions::FORCE_NEW);
    descriptor.sensitive = extensions::ext_bool(&schema.extensions, extensions::SENSITIVE);
    descriptor.computed = extensions::ext_bool(&schema.extensions, extensions::COMPUTED);
    descriptor.is_identifier = extensions::ext_bool(&schema.extensions, extensions::ID);
    descriptor.is_status_identifier =
        extensions::ext_bool(&schema.extensions, extensions::FIELD_STATUS);
    descriptor.enable_legacy_complex_object_block =
        extensions::ext_bool(&schema.extensions, extensions::COMPLEX_OBJECT_LEGACY);
    descriptor.preferred_name = extensions::ext_string(&schema.extensions, extensions::FIELD_NAME);

    // A default on an optional-computed property is never surfaced.
    if descriptor.computed {
        descriptor.default = None;
    }

    match property_type {
        PropertyType::Object => {
            descriptor.nested_schema = Some(translate_object_schema(document, schema, stack)?);
        }
        PropertyType::List => {
            let (items_type, nested) = translate_items(document, name, schema, stack)?;
            descriptor.array_items_type = Some(items_type);
            descriptor.nested_schema = nested;
        }
        _ => {}
    }

    Ok(descriptor)
}

fn translate_items(
    document: &Document,
    name: &str,
    schema: &Schema,
    stack: &mut Vec<String>,
) -> Result<(PropertyType, Option<SchemaDefinition>)> {
    let items = match &schema.items {
        Some(items) => items,
        // Arrays without an items schema degrade to lists of strings.
        None => return Ok((PropertyType::String, None)),
    };
    let resolved = resolve(document, items, stack)?;
    let items_type = property_type_of(resolved.schema, name)?;
    let nested = if items_type == PropertyType::Object {
        Some(translate_object_schema(document, resolved.schema, stack)?)
    } else {
        None
    };
    if let Some(pushed) = resolved.pushed {
        debug_assert_eq!(stack.last(), Some(&pushed));
        stack.pop();
    }
    Ok((items_type, nested))
}

fn property_type_of(schema: &Schema, name: &str) -> Result<PropertyType> {
    match schema.schema_type.as_deref() {
        Some("string") => Ok(PropertyType::String),
        Some("integer") => Ok(PropertyType::Integer),
        Some("number") => Ok(PropertyType::Number),
        Some("boolean") => Ok(PropertyType::Boolean),
        Some("array") => Ok(PropertyType::List),
        Some("object") => Ok(PropertyType::Object),
        // Untyped schemas with properties are objects in practice.
        None if !schema.properties.is_empty() => Ok(PropertyType::Object),
        other => Err(ProviderError::Document(format!(
            "property '{}' has unsupported schema type '{}'",
            name,
            other.unwrap_or("")
        ))),
    }
}
