//! Read-only data sources

use crate::context::Context;
use crate::request::{
    ConfigureRequest, ConfigureResponse, SchemaRequest, SchemaResponse, ValidateConfigRequest,
    ValidateConfigResponse,
};
use crate::types::{Diagnostic, DynamicValue};
use async_trait::async_trait;

#[async_trait]
pub trait DataSource: Send + Sync {
    /// Key under which the provider registers this data source
    fn type_name(&self) -> &str;

    async fn schema(&self, ctx: Context, request: SchemaRequest) -> SchemaResponse;

    async fn validate(&self, ctx: Context, request: ValidateConfigRequest)
        -> ValidateConfigResponse;

    /// The returned state holds every attribute, computed ones included
    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse;
}

#[async_trait]
pub trait DataSourceWithConfigure: DataSource {
    async fn configure(&mut self, ctx: Context, request: ConfigureRequest) -> ConfigureResponse;
}

pub struct ReadDataSourceRequest {
    pub type_name: String,
    pub config: DynamicValue,
}

pub struct ReadDataSourceResponse {
    pub state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}
