//! Managed resources
//!
//! A resource implements the four lifecycle calls. Configure and import are
//! layered on top as separate traits.

use crate::context::Context;
use crate::request::{
    ConfigureRequest, ConfigureResponse, SchemaRequest, SchemaResponse, ValidateConfigRequest,
    ValidateConfigResponse,
};
use crate::types::{Diagnostic, DynamicValue};
use async_trait::async_trait;

#[async_trait]
pub trait Resource: Send + Sync {
    /// Key under which the provider registers this resource
    fn type_name(&self) -> &str;

    async fn schema(&self, ctx: Context, request: SchemaRequest) -> SchemaResponse;

    async fn validate(&self, ctx: Context, request: ValidateConfigRequest)
        -> ValidateConfigResponse;

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse;

    /// A `None` state tells the caller the remote object is gone
    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse;

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse;

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse;
}

#[async_trait]
pub trait ResourceWithConfigure: Resource {
    async fn configure(&mut self, ctx: Context, request: ConfigureRequest) -> ConfigureResponse;

    /// Importable resources return themselves
    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        None
    }
}

#[async_trait]
pub trait ResourceWithImportState: Resource {
    /// Turn an import id into one or more partial states
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse;
}

pub struct CreateResourceRequest {
    pub type_name: String,
    pub planned_state: DynamicValue,
    pub config: DynamicValue,
}

pub struct CreateResourceResponse {
    pub new_state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ReadResourceRequest {
    pub type_name: String,
    pub current_state: DynamicValue,
}

pub struct ReadResourceResponse {
    pub new_state: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct UpdateResourceRequest {
    pub type_name: String,
    pub prior_state: DynamicValue,
    pub planned_state: DynamicValue,
    pub config: DynamicValue,
}

pub struct UpdateResourceResponse {
    pub new_state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

/// Delete only sees prior state; the resource's identity must live there
pub struct DeleteResourceRequest {
    pub type_name: String,
    pub prior_state: DynamicValue,
}

pub struct DeleteResourceResponse {
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ImportResourceStateRequest {
    pub type_name: String,
    pub id: String,
}

#[derive(Default)]
pub struct ImportResourceStateResponse {
    pub imported_resources: Vec<ImportedResource>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ImportedResource {
    pub type_name: String,
    pub state: DynamicValue,
}
