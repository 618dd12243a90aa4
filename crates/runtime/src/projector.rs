//! Request/response projection
//!
//! Outgoing: builds the request body from local state, omitting the
//! identifier, parent-id and read-only properties, and translating compliant
//! names back to wire names. Incoming: writes a response payload into local
//! state with type coercion, legacy-block wrapping and identifier
//! stringification.

use crate::state::ResourceState;
use openapi_provider_common::{
    ProviderError, PropertyDescriptor, PropertyType, Result, SchemaDefinition,
};
use serde_json::{Map, Value};

/// Project local state into the wire payload for create/update calls.
pub fn project_request(schema: &SchemaDefinition, state: &ResourceState) -> Result<Value> {
    let identifier = schema.identifier().ok().map(|p| p.name.clone());
    let mut payload = Map::new();

    for property in schema.properties() {
        if property.read_only
            || property.is_parent_property
            || identifier.as_deref() == Some(property.name.as_str())
        {
            continue;
        }
        let compliant = property.compliant_name();
        // Unset properties never travel; zero values do when the host set them.
        let value = match state.value(&compliant) {
            Some(value) => value,
            None => continue,
        };
        payload.insert(property.name.clone(), local_to_wire(property, value)?);
    }

    Ok(Value::Object(payload))
}

/// Write a response payload back into local state. Every response property
/// must be known to the schema; the identifier becomes the state id.
pub fn absorb_response(
    schema: &SchemaDefinition,
    payload: &Value,
    state: &mut ResourceState,
) -> Result<()> {
    let object = payload.as_object().ok_or_else(|| {
        ProviderError::Validation(
            "failed to update state with remote data: response payload is not an object"
                .to_string(),
        )
    })?;
    let identifier = schema.identifier().ok().map(|p| p.name.clone());

    for (name, value) in object {
        let property = schema.property(name).ok_or_else(|| {
            ProviderError::Validation(format!(
                "failed to update state with remote data: property '{}' is not part of the resource schema",
                name
            ))
        })?;
        if identifier.as_deref() == Some(property.name.as_str()) {
            state.set_id(stringify_identifier(value)?);
            continue;
        }
        state.set_value(property.compliant_name(), wire_to_local(property, value)?);
    }

    Ok(())
}

/// The state id is always a string, even when the wire type is numeric.
fn stringify_identifier(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(i.to_string()),
            None => Ok(format!("{}", n.as_f64().unwrap_or_default())),
        },
        other => Err(ProviderError::Validation(format!(
            "failed to update state with remote data: identifier value '{}' is neither a string nor a number",
            other
        ))),
    }
}

fn local_to_wire(property: &PropertyDescriptor, value: &Value) -> Result<Value> {
    match property.property_type {
        PropertyType::Object => {
            // Legacy-block objects are stored locally as a length-1 list.
            let object_value = if property.uses_legacy_block() {
                match value.as_array().and_then(|items| items.first()) {
                    Some(first) => first,
                    None => {
                        return Err(ProviderError::Validation(format!(
                            "property '{}' is a complex object represented as a single-element list but the state holds none",
                            property.name
                        )))
                    }
                }
            } else {
                value
            };
            object_to_wire(property, object_value)
        }
        PropertyType::List if property.is_list_of_objects() => {
            let items = value.as_array().ok_or_else(|| type_mismatch(property))?;
            let projected = items
                .iter()
                .map(|item| object_to_wire(property, item))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Array(projected))
        }
        _ => Ok(value.clone()),
    }
}

fn object_to_wire(property: &PropertyDescriptor, value: &Value) -> Result<Value> {
    let nested_schema = property
        .nested_schema
        .as_ref()
        .ok_or_else(|| type_mismatch(property))?;
    let local = value.as_object().ok_or_else(|| type_mismatch(property))?;
    let mut wire = Map::new();
    for nested in nested_schema.properties() {
        if nested.read_only {
            continue;
        }
        if let Some(nested_value) = local.get(&nested.compliant_name()) {
            wire.insert(nested.name.clone(), local_to_wire(nested, nested_value)?);
        }
    }
    Ok(Value::Object(wire))
}

fn wire_to_local(property: &PropertyDescriptor, value: &Value) -> Result<Value> {
    match property.property_type {
        PropertyType::Integer => Ok(coerce_integer(value)),
        PropertyType::Object => {
            let local = object_to_local(property, value)?;
            if property.uses_legacy_block() {
                Ok(Value::Array(vec![local]))
            } else {
                Ok(local)
            }
        }
        PropertyType::List if property.is_list_of_objects() => {
            let items = value.as_array().ok_or_else(|| type_mismatch(property))?;
            let local = items
                .iter()
                .map(|item| object_to_local(property, item))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Array(local))
        }
        PropertyType::List if property.array_items_type == Some(PropertyType::Integer) => {
            let items = value.as_array().ok_or_else(|| type_mismatch(property))?;
            Ok(Value::Array(items.iter().map(coerce_integer).collect()))
        }
        _ => Ok(value.clone()),
    }
}

fn object_to_local(property: &PropertyDescriptor, value: &Value) -> Result<Value> {
    let nested_schema = property
        .nested_schema
        .as_ref()
        .ok_or_else(|| type_mismatch(property))?;
    let wire = value.as_object().ok_or_else(|| type_mismatch(property))?;
    let mut local = Map::new();
    for (name, nested_value) in wire {
        let nested = nested_schema.property(name).ok_or_else(|| {
            ProviderError::Validation(format!(
                "failed to update state with remote data: property '{}' is not part of the resource schema",
                name
            ))
        })?;
        local.insert(
            nested.compliant_name(),
            wire_to_local(nested, nested_value)?,
        );
    }
    Ok(Value::Object(local))
}

/// Coerce whole JSON floats to integers; the wire may spell 5 as 5.0.
fn coerce_integer(value: &Value) -> Value {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Value::from(i),
            None => match n.as_f64() {
                Some(f) if f.fract() == 0.0 => Value::from(f as i64),
                _ => value.clone(),
            },
        },
        _ => value.clone(),
    }
}

fn type_mismatch(property: &PropertyDescriptor) -> ProviderError {
    ProviderError::Validation(format!(
        "property '{}' value does not match its schema type",
        property.name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cdn_schema() -> SchemaDefinition {
        let mut id = PropertyDescriptor::new("id", PropertyType::String);
        id.read_only = true;
        let mut label = PropertyDescriptor::new("label", PropertyType::String);
        label.required = true;
        let mut ips = PropertyDescriptor::new("ips", PropertyType::List);
        ips.array_items_type = Some(PropertyType::String);
        let mut status = PropertyDescriptor::new("status", PropertyType::String);
        status.read_only = true;
        let replicas = PropertyDescriptor::new("replicaCount", PropertyType::Integer);
        SchemaDefinition::new(vec![id, label, ips, status, replicas])
    }

    #[test]
    fn test_outgoing_projection_skips_id_and_read_only() {
        let mut state = ResourceState::new();
        state.set_id("42");
        state.set_value("label", json!("myCdn"));
        state.set_value("ips", json!(["127.0.0.1"]));
        state.set_value("status", json!("up"));
        state.set_value("replica_count", json!(0));

        let payload = project_request(&cdn_schema(), &state).unwrap();
        assert_eq!(
            payload,
            json!({"label": "myCdn", "ips": ["127.0.0.1"], "replicaCount": 0})
        );
    }

    #[test]
    fn test_unset_properties_are_not_projected() {
        let mut state = ResourceState::new();
        state.set_value("label", json!("myCdn"));
        let payload = project_request(&cdn_schema(), &state).unwrap();
        assert_eq!(payload, json!({"label": "myCdn"}));
    }

    #[test]
    fn test_parent_properties_are_not_projected() {
        let mut schema = cdn_schema();
        let mut parent = PropertyDescriptor::new("cdns_v1_id", PropertyType::String);
        parent.required = true;
        parent.is_parent_property = true;
        schema.prepend(parent);

        let mut state = ResourceState::new();
        state.set_value("cdns_v1_id", json!("parent-id"));
        state.set_value("label", json!("myCdn"));
        let payload = project_request(&schema, &state).unwrap();
        assert_eq!(payload, json!({"label": "myCdn"}));
    }

    #[test]
    fn test_incoming_projection_with_integer_coercion() {
        let mut state = ResourceState::new();
        absorb_response(
            &cdn_schema(),
            &json!({
                "id": 1234,
                "label": "myCdn",
                "status": "deployed",
                "replicaCount": 3.0
            }),
            &mut state,
        )
        .unwrap();

        assert_eq!(state.id(), Some("1234"));
        assert_eq!(state.value("label"), Some(&json!("myCdn")));
        assert_eq!(state.value("status"), Some(&json!("deployed")));
        assert_eq!(state.value("replica_count"), Some(&json!(3)));
    }

    #[test]
    fn test_unknown_response_property_is_an_error() {
        let mut state = ResourceState::new();
        let err = absorb_response(&cdn_schema(), &json!({"bogus": 1}), &mut state).unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to update state with remote data: property 'bogus' is not part of the resource schema"
        );
    }

    fn legacy_object_schema() -> SchemaDefinition {
        let mut inner = PropertyDescriptor::new("inner", PropertyType::Object);
        inner.nested_schema = Some(SchemaDefinition::new(vec![PropertyDescriptor::new(
            "leaf",
            PropertyType::String,
        )]));
        let mut settings = PropertyDescriptor::new("settingsBlock", PropertyType::Object);
        settings.nested_schema = Some(SchemaDefinition::new(vec![
            inner,
            PropertyDescriptor::new("level", PropertyType::String),
        ]));
        let mut id = PropertyDescriptor::new("id", PropertyType::String);
        id.read_only = true;
        SchemaDefinition::new(vec![id, settings])
    }

    #[test]
    fn test_legacy_block_round_trip() {
        // Locally a legacy complex object is a single-element list.
        let local = json!([{
            "inner": {"leaf": "x"},
            "level": "high"
        }]);
        let mut state = ResourceState::new();
        state.set_value("settings_block", local.clone());

        let schema = legacy_object_schema();
        let payload = project_request(&schema, &state).unwrap();
        assert_eq!(
            payload,
            json!({"settingsBlock": {"inner": {"leaf": "x"}, "level": "high"}})
        );

        let mut absorbed = ResourceState::new();
        absorb_response(
            &schema,
            &json!({"id": "1", "settingsBlock": {"inner": {"leaf": "x"}, "level": "high"}}),
            &mut absorbed,
        )
        .unwrap();
        assert_eq!(absorbed.value("settings_block"), Some(&local));
    }

    #[test]
    fn test_list_of_objects_round_trip() {
        let mut rule = PropertyDescriptor::new("rules", PropertyType::List);
        rule.array_items_type = Some(PropertyType::Object);
        rule.nested_schema = Some(SchemaDefinition::new(vec![
            PropertyDescriptor::new("listenPort", PropertyType::Integer),
            PropertyDescriptor::new("protocol", PropertyType::String),
        ]));
        let mut id = PropertyDescriptor::new("id", PropertyType::String);
        id.read_only = true;
        let schema = SchemaDefinition::new(vec![id, rule]);

        let mut state = ResourceState::new();
        state.set_value(
            "rules",
            json!([{"listen_port": 80, "protocol": "tcp"}]),
        );
        let payload = project_request(&schema, &state).unwrap();
        assert_eq!(
            payload,
            json!({"rules": [{"listenPort": 80, "protocol": "tcp"}]})
        );

        let mut absorbed = ResourceState::new();
        absorb_response(
            &schema,
            &json!({"id": "1", "rules": [{"listenPort": 80, "protocol": "tcp"}]}),
            &mut absorbed,
        )
        .unwrap();
        assert_eq!(
            absorbed.value("rules"),
            Some(&json!([{"listen_port": 80, "protocol": "tcp"}]))
        );
    }

    #[test]
    fn test_round_trip_preserves_writable_state() {
        let mut state = ResourceState::new();
        state.set_value("label", json!("myCdn"));
        state.set_value("ips", json!(["127.0.0.1", "127.0.0.2"]));
        state.set_value("replica_count", json!(2));

        let schema = cdn_schema();
        let wire = project_request(&schema, &state).unwrap();
        let mut round_tripped = ResourceState::new();
        absorb_response(&schema, &wire, &mut round_tripped).unwrap();

        assert_eq!(round_tripped.values(), state.values());
    }

    #[test]
    fn test_float_identifier_stringification() {
        assert_eq!(stringify_identifier(&json!(1234)).unwrap(), "1234");
        assert_eq!(stringify_identifier(&json!(1234.0)).unwrap(), "1234");
        assert_eq!(stringify_identifier(&json!("abc")).unwrap(), "abc");
        assert!(stringify_identifier(&json!({"no": "id"})).is_err());
    }
}
