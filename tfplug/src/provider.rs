//! Provider trait and related types
//!
//! Resources and data sources are created on demand through factories, then
//! configured with the provider data produced by [`Provider::configure`].

use crate::context::Context;
use crate::data_source::DataSourceWithConfigure;
use crate::request::{ProviderData, SchemaRequest, SchemaResponse};
use crate::resource::ResourceWithConfigure;
use crate::types::{Diagnostic, DynamicValue};
use async_trait::async_trait;
use std::collections::HashMap;

pub type ResourceFactory = fn() -> Box<dyn ResourceWithConfigure>;
pub type DataSourceFactory = fn() -> Box<dyn DataSourceWithConfigure>;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Prefix for every resource and data source type name (e.g. "nsxt")
    fn type_name(&self) -> &str;

    async fn metadata(
        &self,
        ctx: Context,
        request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse;

    async fn schema(&self, ctx: Context, request: SchemaRequest) -> SchemaResponse;

    /// Resolve configuration and build whatever resources need (API clients,
    /// credentials) into provider_data
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    fn resources(&self) -> HashMap<String, ResourceFactory>;

    fn data_sources(&self) -> HashMap<String, DataSourceFactory>;
}

pub struct ProviderMetadataRequest;

pub struct ProviderMetadataResponse {
    pub type_name: String,
    pub version: String,
}

pub struct ConfigureProviderRequest {
    pub terraform_version: String,
    pub config: DynamicValue,
}

pub struct ConfigureProviderResponse {
    pub diagnostics: Vec<Diagnostic>,
    /// `None` leaves the provider unconfigured
    pub provider_data: Option<ProviderData>,
}
