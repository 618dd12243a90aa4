//! Data-source executor
//!
//! Fetches a list endpoint, narrows the returned collection down with the
//! user's filters and projects the single surviving entity into local state.

use crate::auth::authenticate;
use crate::client::{ApiRequest, HttpDispatcher, Method};
use crate::configuration::ProviderConfiguration;
use crate::projector::absorb_response;
use crate::state::ResourceState;
use openapi_provider_common::{PropertyType, ProviderError, Result};
use openapi_provider_spec::{Backend, DataSource};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// One user-supplied filter: a compliant property name and the values the
/// property must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub name: String,
    pub values: Vec<String>,
}

pub struct DataSourceExecutor<'a> {
    data_source: &'a DataSource,
    backend: &'a Backend,
    global_schemes: &'a [String],
    config: &'a ProviderConfiguration,
    dispatcher: &'a dyn HttpDispatcher,
}

impl<'a> DataSourceExecutor<'a> {
    pub fn new(
        data_source: &'a DataSource,
        backend: &'a Backend,
        global_schemes: &'a [String],
        config: &'a ProviderConfiguration,
        dispatcher: &'a dyn HttpDispatcher,
    ) -> Self {
        Self {
            data_source,
            backend,
            global_schemes,
            config,
            dispatcher,
        }
    }

    /// GET the list endpoint, apply the filters conjunctively and require
    /// exactly one match.
    pub fn read(&self, filters: &[Filter], state: &mut ResourceState) -> Result<()> {
        self.validate_filters(filters)?;

        let url = self.list_url()?;
        debug!(data_source = %self.data_source.name, %url, "reading data source");
        let context = authenticate(
            &url,
            &self.data_source.get.security_schemes,
            self.global_schemes,
            &self.data_source.get.header_parameters,
            self.config,
            self.dispatcher,
        )?;
        let mut request = ApiRequest::new(Method::Get, context.url);
        request.headers = context.headers.into_iter().collect();
        request.timeout = self.data_source.get.timeout_seconds.map(Duration::from_secs);
        let response = self.dispatcher.dispatch(request)?;

        if response.status != 200 {
            return Err(ProviderError::UnexpectedStatus(format!(
                "[data source='{}'] HTTP Response Status Code {} not matching expected one [200] ({})",
                self.data_source.name, response.status, response.body
            )));
        }

        let payload: Value = serde_json::from_str(&response.body).map_err(|e| {
            ProviderError::Validation(format!(
                "data source '{}' response body is not valid JSON: {}",
                self.data_source.name, e
            ))
        })?;
        let items = payload.as_array().ok_or_else(|| {
            ProviderError::Validation(format!(
                "data source '{}' response is not a list",
                self.data_source.name
            ))
        })?;

        let mut matches = items.iter().filter(|item| self.item_matches(item, filters));
        let survivor = matches.next().ok_or_else(|| {
            ProviderError::Validation(
                "your query returned no results, please change your search criteria and try again"
                    .to_string(),
            )
        })?;
        if matches.next().is_some() {
            return Err(ProviderError::Validation(
                "your query returned more than one result, please change your search criteria to make it more specific"
                    .to_string(),
            ));
        }

        absorb_response(&self.data_source.schema, survivor, state)
    }

    fn list_url(&self) -> Result<String> {
        let base = match self.config.endpoints.get(&self.data_source.name) {
            Some(host) => self.backend.base_url_with_host(host),
            None => self.backend.base_url(self.config.region.as_deref())?,
        };
        Ok(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            self.data_source.path.trim_start_matches('/')
        ))
    }

    fn validate_filters(&self, filters: &[Filter]) -> Result<()> {
        for filter in filters {
            let property = self
                .data_source
                .schema
                .property_by_compliant_name(&filter.name)
                .ok_or_else(|| {
                    ProviderError::Validation(format!(
                        "filter name '{}' does not match any of the schema properties of data source '{}'",
                        filter.name, self.data_source.name
                    ))
                })?;
            if property.property_type != PropertyType::List && filter.values.len() != 1 {
                return Err(ProviderError::Validation(format!(
                    "filter '{}' refers to a primitive property and must have exactly one value",
                    filter.name
                )));
            }
        }
        Ok(())
    }

    fn item_matches(&self, item: &Value, filters: &[Filter]) -> bool {
        filters.iter().all(|filter| {
            let property = match self
                .data_source
                .schema
                .property_by_compliant_name(&filter.name)
            {
                Some(property) => property,
                None => return false,
            };
            let value = match item.get(&property.name) {
                Some(value) => value,
                None => return false,
            };
            if property.property_type == PropertyType::List {
                let Some(elements) = value.as_array() else {
                    return false;
                };
                filter
                    .values
                    .iter()
                    .all(|wanted| elements.iter().any(|e| value_matches(e, wanted)))
            } else {
                value_matches(value, &filter.values[0])
            }
        })
    }
}

fn value_matches(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(s) => s == expected,
        Value::Number(n) => format!("{}", n) == expected,
        Value::Bool(b) => b.to_string() == expected,
        _ => false,
    }
}
