//! Vendor extension keys and typed accessors
//!
//! The provider recognizes a fixed set of `x-terraform-*` extensions; every
//! lookup goes through the helpers here so spelling lives in one place.

use serde_json::Value;
use std::collections::HashMap;

pub const RESOURCE_NAME: &str = "x-terraform-resource-name";
pub const ID: &str = "x-terraform-id";
pub const FIELD_STATUS: &str = "x-terraform-field-status";
pub const FIELD_NAME: &str = "x-terraform-field-name";
pub const IMMUTABLE: &str = "x-terraform-immutable";
pub const FORCE_NEW: &str = "x-terraform-force-new";
pub const SENSITIVE: &str = "x-terraform-sensitive";
pub const COMPUTED: &str = "x-terraform-computed";
pub const COMPLEX_OBJECT_LEGACY: &str = "x-terraform-complex-object-legacy-config";
pub const HEADER: &str = "x-terraform-header";
pub const BEARER_SCHEME: &str = "x-terraform-authentication-scheme-bearer";
pub const REFRESH_TOKEN_URL: &str = "x-terraform-refresh-token-url";
pub const OPERATION_TIMEOUT: &str = "x-terraform-operation-timeouts";
pub const PROVIDER_REGIONS: &str = "x-terraform-provider-regions";

/// Truthy extension lookup. Only a literal `true` enables a flag.
pub fn ext_bool(extensions: &HashMap<String, Value>, key: &str) -> bool {
    matches!(extensions.get(key), Some(Value::Bool(true)))
}

/// String-valued extension lookup.
pub fn ext_string(extensions: &HashMap<String, Value>, key: &str) -> Option<String> {
    match extensions.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Numeric extension lookup, used for operation timeouts in seconds.
pub fn ext_seconds(extensions: &HashMap<String, Value>, key: &str) -> Option<u64> {
    extensions.get(key).and_then(Value::as_u64)
}
