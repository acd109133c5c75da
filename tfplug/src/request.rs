//! Request and response types shared by providers, resources and data sources

use crate::schema::Schema;
use crate::types::{Diagnostic, DynamicValue};
use std::any::Any;
use std::sync::Arc;

/// Opaque value built by the provider's configure step and handed to every
/// resource and data source. Downcast it to the provider's concrete type.
pub type ProviderData = Arc<dyn Any + Send + Sync>;

pub struct SchemaRequest;

pub struct SchemaResponse {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

/// Plan-time check of a resource or data source block
pub struct ValidateConfigRequest {
    pub type_name: String,
    pub config: DynamicValue,
}

pub struct ValidateConfigResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// Sent to each resource and data source right after its factory runs.
/// `provider_data` is `None` until the provider has been configured.
pub struct ConfigureRequest {
    pub provider_data: Option<ProviderData>,
}

pub struct ConfigureResponse {
    pub diagnostics: Vec<Diagnostic>,
}
