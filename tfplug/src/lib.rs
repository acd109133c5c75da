//! tfplug - Terraform Plugin Framework for Rust
//!
//! Typed building blocks for Terraform providers: dynamic values, schemas,
//! diagnostics, the provider/resource/data source traits and an in-process
//! server that drives the resource lifecycle.

pub mod context;
pub mod error;
pub mod schema;
pub mod types;

pub mod data_source;
pub mod provider;
pub mod request;
pub mod resource;

pub mod import;
pub mod server;

pub use context::Context;
pub use data_source::{DataSource, DataSourceWithConfigure};
pub use error::{Result, TfplugError};
pub use import::import_state_passthrough_id;
pub use provider::{Provider, ProviderMetadataRequest, ProviderMetadataResponse};
pub use request::ProviderData;
pub use resource::{Resource, ResourceWithConfigure, ResourceWithImportState};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use server::ProviderServer;
pub use types::{
    AttributePath, Diagnostic, DiagnosticSeverity, DiagnosticsExt, Dynamic, DynamicValue,
};
