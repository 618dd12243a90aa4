//! OpenAPI document analysis for the provider
//!
//! Turns a Swagger 2.0 (or, for security and backend only, OpenAPI 3.0)
//! document into the models the runtime executes against: translated
//! resource schemas, security definitions, backend configuration and
//! per-operation metadata.

pub mod backend;
pub mod document;
pub mod extensions;
pub mod loader;
pub mod resources;
pub mod security;
pub mod translation;

pub use backend::{resolve_backend, Backend};
pub use document::Document;
pub use loader::{load, LoadedDocument, SpecVersion};
pub use resources::{discover, DataSource, Discovery, OperationSpec, Resource};
pub use security::{analyze_security, global_schemes, SecurityDefinition};
