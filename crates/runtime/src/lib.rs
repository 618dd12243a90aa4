//! Runtime execution engine for the provider
//!
//! Everything that happens after a document has been analyzed: the HTTP
//! dispatcher, the per-session provider configuration, authentication, payload
//! projection between local state and wire payloads, and the CRUD and
//! data-source executors the host runtime invokes.

pub mod auth;
pub mod client;
pub mod configuration;
pub mod data_source;
pub mod executor;
pub mod projector;
pub mod state;

pub use auth::{authenticate, AuthContext, Authenticator};
pub use client::{ApiRequest, ApiResponse, HttpDispatcher, Method, ReqwestDispatcher};
pub use configuration::ProviderConfiguration;
pub use data_source::{DataSourceExecutor, Filter};
pub use executor::ResourceExecutor;
pub use projector::{absorb_response, project_request};
pub use state::ResourceState;
