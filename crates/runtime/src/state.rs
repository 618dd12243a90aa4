//! Local resource state handle
//!
//! The host owns the persisted state; executors work against this in-memory
//! view of it. Values are keyed by compliant property name. A property absent
//! from the map is "unset", which is distinct from holding a zero value.

use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceState {
    id: Option<String>,
    values: BTreeMap<String, Value>,
}

impl ResourceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Declare the remote entity gone.
    pub fn clear_id(&mut self) {
        self.id = None;
    }

    pub fn value(&self, compliant_name: &str) -> Option<&Value> {
        self.values.get(compliant_name)
    }

    /// Whether the host marked this property as set. Only set properties are
    /// projected into request payloads.
    pub fn is_set(&self, compliant_name: &str) -> bool {
        self.values.contains_key(compliant_name)
    }

    pub fn set_value(&mut self, compliant_name: impl Into<String>, value: Value) {
        self.values.insert(compliant_name.into(), value);
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Replace every stored value with the other state's values, keeping the
    /// id. Used to restore local state from remote after an aborted update.
    pub fn restore_values_from(&mut self, other: &ResourceState) {
        self.values = other.values.clone();
    }
}
