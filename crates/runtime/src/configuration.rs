//! Runtime provider configuration
//!
//! The values the host supplies at `Configure` time, keyed by snake_case
//! names: header values, security credentials wrapped into authenticators,
//! the selected region and per-resource endpoint overrides. Built once per
//! session and read-only afterwards.

use crate::auth::Authenticator;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct ProviderConfiguration {
    /// `x-terraform-header` values, keyed by their configuration name
    pub headers: HashMap<String, String>,
    /// Configured credentials, keyed by the security definition's compliant
    /// name
    pub security: HashMap<String, Authenticator>,
    /// Selected region for multi-region backends
    pub region: Option<String>,
    /// Per-resource host overrides, keyed by resource name
    pub endpoints: HashMap<String, String>,
}

impl ProviderConfiguration {
    /// Register a credential under its security definition's compliant name.
    pub fn add_authenticator(&mut self, authenticator: Authenticator) {
        self.security
            .insert(authenticator.definition().compliant_name(), authenticator);
    }
}
