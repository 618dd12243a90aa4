//! Resource executor
//!
//! Orchestrates one CRUD call: URL assembly, authentication, payload
//! projection, HTTP dispatch, status-code classification and state update.
//! Updates fetch the remote entity first and enforce the schema's immutable
//! property set before any write happens.

use crate::auth::authenticate;
use crate::client::{ApiRequest, ApiResponse, HttpDispatcher, Method};
use crate::configuration::ProviderConfiguration;
use crate::projector::{absorb_response, project_request};
use crate::state::ResourceState;
use openapi_provider_common::{ProviderError, Result};
use openapi_provider_spec::resources::OperationSpec;
use openapi_provider_spec::{Backend, Resource};
use std::time::Duration;
use tracing::debug;

pub struct ResourceExecutor<'a> {
    resource: &'a Resource,
    backend: &'a Backend,
    global_schemes: &'a [String],
    config: &'a ProviderConfiguration,
    dispatcher: &'a dyn HttpDispatcher,
}

impl<'a> ResourceExecutor<'a> {
    pub fn new(
        resource: &'a Resource,
        backend: &'a Backend,
        global_schemes: &'a [String],
        config: &'a ProviderConfiguration,
        dispatcher: &'a dyn HttpDispatcher,
    ) -> Self {
        Self {
            resource,
            backend,
            global_schemes,
            config,
            dispatcher,
        }
    }

    /// POST to the collection URL, absorb the created entity and set the id.
    pub fn create(&self, state: &mut ResourceState) -> Result<()> {
        let operation = self.operation(&self.resource.create, "POST")?;
        let parent_ids = self.parent_ids(state)?;
        let parent_refs: Vec<&str> = parent_ids.iter().map(String::as_str).collect();
        let url = self.resource.collection_url(&self.base_url()?, &parent_refs)?;
        debug!(resource = %self.resource.name, %url, "creating resource");

        let payload = project_request(&self.resource.schema, state)?;
        let response = self.dispatch(Method::Post, &url, operation, Some(payload))?;
        self.check_status(&response, &[201, 202])?;
        self.absorb(&response, state)
    }

    /// GET the instance URL. A 404 declares the entity gone and clears the
    /// state id instead of failing.
    pub fn read(&self, state: &mut ResourceState) -> Result<()> {
        let operation = self.operation(&self.resource.read, "GET")?;
        let url = self.instance_url(state)?;
        debug!(resource = %self.resource.name, %url, "reading resource");

        let response = self.dispatch(Method::Get, &url, operation, None)?;
        if response.status == 404 {
            state.clear_id();
            return Ok(());
        }
        self.check_status(&response, &[200])?;
        self.absorb(&response, state)
    }

    /// PUT to the instance URL after verifying no immutable property changed.
    pub fn update(&self, state: &mut ResourceState) -> Result<()> {
        let operation = self.operation(&self.resource.update, "PUT")?;
        let remote = self.fetch_remote(state)?;
        self.check_immutable_properties(state, &remote)?;

        let url = self.instance_url(state)?;
        debug!(resource = %self.resource.name, %url, "updating resource");
        let payload = project_request(&self.resource.schema, state)?;
        let response = self.dispatch(Method::Put, &url, operation, Some(payload))?;
        self.check_status(&response, &[200])?;
        self.absorb(&response, state)
    }

    /// DELETE the instance URL. A 404 means the entity is already gone.
    pub fn delete(&self, state: &mut ResourceState) -> Result<()> {
        let operation = self.operation(&self.resource.delete, "DELETE")?;
        let url = self.instance_url(state)?;
        debug!(resource = %self.resource.name, %url, "deleting resource");

        let response = self.dispatch(Method::Delete, &url, operation, None)?;
        if response.status != 404 {
            self.check_status(&response, &[204, 200])?;
        }
        state.clear_id();
        Ok(())
    }

    fn operation<'b>(
        &self,
        operation: &'b Option<OperationSpec>,
        verb: &str,
    ) -> Result<&'b OperationSpec> {
        operation.as_ref().ok_or_else(|| {
            ProviderError::Validation(format!(
                "{} resource does not support {} operation, check the swagger file exposed at '{}'",
                self.resource.name,
                verb,
                self.resource
                    .instance_path
                    .as_deref()
                    .unwrap_or(&self.resource.path)
            ))
        })
    }

    fn base_url(&self) -> Result<String> {
        match self.config.endpoints.get(&self.resource.name) {
            Some(host) => Ok(self.backend.base_url_with_host(host)),
            None => self.backend.base_url(self.config.region.as_deref()),
        }
    }

    fn parent_ids(&self, state: &ResourceState) -> Result<Vec<String>> {
        let parent = match &self.resource.parent {
            Some(parent) => parent,
            None => return Ok(Vec::new()),
        };
        parent
            .names
            .iter()
            .map(|name| {
                let key = format!("{}_id", name);
                state
                    .value(&key)
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        ProviderError::Validation(format!(
                            "sub-resource '{}' is missing the required parent property '{}'",
                            self.resource.name, key
                        ))
                    })
            })
            .collect()
    }

    fn instance_url(&self, state: &ResourceState) -> Result<String> {
        let id = state.id().ok_or_else(|| {
            ProviderError::Validation(format!(
                "resource '{}' has no id in the local state",
                self.resource.name
            ))
        })?;
        let parent_ids = self.parent_ids(state)?;
        let parent_refs: Vec<&str> = parent_ids.iter().map(String::as_str).collect();
        self.resource
            .instance_url(&self.base_url()?, &parent_refs, id)
    }

    fn dispatch(
        &self,
        method: Method,
        url: &str,
        operation: &OperationSpec,
        body: Option<serde_json::Value>,
    ) -> Result<ApiResponse> {
        let context = authenticate(
            url,
            &operation.security_schemes,
            self.global_schemes,
            &operation.header_parameters,
            self.config,
            self.dispatcher,
        )?;
        let mut request = ApiRequest::new(method, context.url);
        request.headers = context.headers.into_iter().collect();
        request.body = body;
        request.timeout = operation.timeout_seconds.map(Duration::from_secs);
        self.dispatcher.dispatch(request)
    }

    fn check_status(&self, response: &ApiResponse, expected: &[u16]) -> Result<()> {
        if expected.contains(&response.status) {
            return Ok(());
        }
        let name = &self.resource.name;
        match response.status {
            401 => Err(ProviderError::Unauthorized(format!(
                "[resource='{}'] HTTP Response Status Code 401 - the provider credentials are not authorized for this operation",
                name
            ))),
            404 => Err(ProviderError::NotFound(format!(
                "[resource='{}'] HTTP Response Status Code 404 - the resource does not exist",
                name
            ))),
            status => Err(ProviderError::UnexpectedStatus(format!(
                "[resource='{}'] HTTP Response Status Code {} not matching expected one {:?} ({})",
                name, status, expected, response.body
            ))),
        }
    }

    fn absorb(&self, response: &ApiResponse, state: &mut ResourceState) -> Result<()> {
        let payload: serde_json::Value = serde_json::from_str(&response.body).map_err(|e| {
            ProviderError::Validation(format!(
                "failed to update state with remote data: response body is not valid JSON: {}",
                e
            ))
        })?;
        absorb_response(&self.resource.schema, &payload, state)
    }

    /// GET the remote entity into a fresh state sharing the local id and
    /// parent ids.
    fn fetch_remote(&self, state: &ResourceState) -> Result<ResourceState> {
        let operation = self.operation(&self.resource.read, "GET")?;
        let url = self.instance_url(state)?;
        let response = self.dispatch(Method::Get, &url, operation, None)?;
        self.check_status(&response, &[200])?;

        let mut remote = ResourceState::new();
        if let Some(id) = state.id() {
            remote.set_id(id);
        }
        if let Some(parent) = &self.resource.parent {
            for name in &parent.names {
                let key = format!("{}_id", name);
                if let Some(value) = state.value(&key) {
                    remote.set_value(key, value.clone());
                }
            }
        }
        self.absorb(&response, &mut remote)?;
        Ok(remote)
    }

    /// Compare every immutable property against the proposed update. On the
    /// first mismatch the local state is restored from remote and the update
    /// aborts.
    fn check_immutable_properties(
        &self,
        state: &mut ResourceState,
        remote: &ResourceState,
    ) -> Result<()> {
        for wire_name in self.resource.schema.immutable_properties() {
            let compliant = self
                .resource
                .schema
                .property(&wire_name)
                .map(|p| p.compliant_name())
                .unwrap_or_else(|| wire_name.clone());
            if state.value(&compliant) != remote.value(&compliant) {
                state.restore_values_from(remote);
                return Err(ProviderError::Validation(format!(
                    "property {} is immutable and therefore can not be updated. Update operation was aborted; no updates were performed",
                    wire_name
                )));
            }
        }
        Ok(())
    }
}
