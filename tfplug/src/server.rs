//! In-process dispatch of Terraform lifecycle calls
//!
//! [`ProviderServer`] owns a provider, keeps the provider data produced by
//! configure, and routes each lifecycle call to a freshly created and
//! configured resource or data source, the same way the plugin protocol
//! handlers do for a running provider.

use crate::context::Context;
use crate::data_source::{DataSourceWithConfigure, ReadDataSourceRequest};
use crate::provider::{ConfigureProviderRequest, Provider, ProviderMetadataRequest};
use crate::request::{ConfigureRequest, ProviderData, SchemaRequest, ValidateConfigRequest};
use crate::resource::{
    CreateResourceRequest, DeleteResourceRequest, ImportResourceStateRequest,
    ImportResourceStateResponse, ReadResourceRequest, ResourceWithConfigure,
    UpdateResourceRequest,
};
use crate::schema::Schema;
use crate::types::{Diagnostic, DiagnosticsExt, DynamicValue};
use std::collections::HashMap;
use tokio::sync::RwLock;

pub struct ProviderServer<P: Provider> {
    provider: RwLock<P>,
    provider_data: RwLock<Option<ProviderData>>,
    configured: RwLock<bool>,
}

/// Schemas for the provider block and every resource and data source
pub struct ProviderSchemas {
    pub provider: Schema,
    pub resources: HashMap<String, Schema>,
    pub data_sources: HashMap<String, Schema>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ReadResourceResult {
    /// `None` means the resource is gone and must be dropped from state
    pub new_state: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ApplyResourceChangeResult {
    /// `None` after a successful destroy, or a failed create
    pub new_state: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ReadDataSourceResult {
    pub state: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeKind {
    Create,
    Update,
    Delete,
    Noop,
}

fn change_kind(prior_state: &DynamicValue, planned_state: &DynamicValue) -> ChangeKind {
    match (prior_state.is_null(), planned_state.is_null()) {
        (true, false) => ChangeKind::Create,
        (false, false) => ChangeKind::Update,
        (false, true) => ChangeKind::Delete,
        (true, true) => ChangeKind::Noop,
    }
}

impl<P: Provider> ProviderServer<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: RwLock::new(provider),
            provider_data: RwLock::new(None),
            configured: RwLock::new(false),
        }
    }

    pub async fn schemas(&self, ctx: Context) -> ProviderSchemas {
        let provider = self.provider.read().await;
        let provider_schema = provider
            .schema(ctx.clone(), SchemaRequest)
            .await;
        let mut diagnostics = provider_schema.diagnostics;

        let mut resources = HashMap::new();
        for (name, factory) in provider.resources() {
            let response = factory().schema(ctx.clone(), SchemaRequest).await;
            diagnostics.extend(response.diagnostics);
            resources.insert(name, response.schema);
        }

        let mut data_sources = HashMap::new();
        for (name, factory) in provider.data_sources() {
            let response = factory()
                .schema(ctx.clone(), SchemaRequest)
                .await;
            diagnostics.extend(response.diagnostics);
            data_sources.insert(name, response.schema);
        }

        ProviderSchemas {
            provider: provider_schema.schema,
            resources,
            data_sources,
            diagnostics,
        }
    }

    pub async fn configure_provider(&self, ctx: Context, config: DynamicValue) -> Vec<Diagnostic> {
        let mut provider = self.provider.write().await;

        let metadata = provider.metadata(ctx.clone(), ProviderMetadataRequest).await;
        tracing::info!(
            provider = %metadata.type_name,
            version = %metadata.version,
            "configuring provider"
        );

        let schema = provider.schema(ctx.clone(), SchemaRequest).await;
        let mut diagnostics = schema.schema.validate(&config);
        if diagnostics.has_errors() {
            return diagnostics;
        }

        let response = provider
            .configure(
                ctx,
                ConfigureProviderRequest {
                    terraform_version: String::new(),
                    config,
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        if !diagnostics.has_errors() {
            *self.provider_data.write().await = response.provider_data;
            *self.configured.write().await = true;
        }

        diagnostics
    }

    async fn configured_resource(
        &self,
        ctx: &Context,
        type_name: &str,
    ) -> Result<Box<dyn ResourceWithConfigure>, Vec<Diagnostic>> {
        let factory = {
            let provider = self.provider.read().await;
            provider.resources().get(type_name).copied()
        };
        let Some(factory) = factory else {
            return Err(vec![Diagnostic::error(
                format!("Unknown resource type: {}", type_name),
                "The provider does not implement this resource type",
            )]);
        };

        if !*self.configured.read().await {
            return Err(vec![Diagnostic::error(
                "Provider not configured",
                "configure_provider must succeed before resources can be used",
            )]);
        }

        let mut resource = factory();
        let provider_data = self.provider_data.read().await.clone();
        let response = resource
            .configure(ctx.clone(), ConfigureRequest { provider_data })
            .await;
        if response.diagnostics.has_errors() {
            return Err(response.diagnostics);
        }

        Ok(resource)
    }

    async fn configured_data_source(
        &self,
        ctx: &Context,
        type_name: &str,
    ) -> Result<Box<dyn DataSourceWithConfigure>, Vec<Diagnostic>> {
        let factory = {
            let provider = self.provider.read().await;
            provider.data_sources().get(type_name).copied()
        };
        let Some(factory) = factory else {
            return Err(vec![Diagnostic::error(
                format!("Unknown data source type: {}", type_name),
                "The provider does not implement this data source type",
            )]);
        };

        if !*self.configured.read().await {
            return Err(vec![Diagnostic::error(
                "Provider not configured",
                "configure_provider must succeed before data sources can be used",
            )]);
        }

        let mut data_source = factory();
        let provider_data = self.provider_data.read().await.clone();
        let response = data_source
            .configure(ctx.clone(), ConfigureRequest { provider_data })
            .await;
        if response.diagnostics.has_errors() {
            return Err(response.diagnostics);
        }

        Ok(data_source)
    }

    /// Schema checks followed by the resource's own validation. Does not need
    /// a configured provider.
    pub async fn validate_resource_config(
        &self,
        ctx: Context,
        type_name: &str,
        config: DynamicValue,
    ) -> Vec<Diagnostic> {
        let factory = {
            let provider = self.provider.read().await;
            provider.resources().get(type_name).copied()
        };
        let Some(factory) = factory else {
            return vec![Diagnostic::error(
                format!("Unknown resource type: {}", type_name),
                String::new(),
            )];
        };

        let resource = factory();
        let schema = resource.schema(ctx.clone(), SchemaRequest).await;
        let mut diagnostics = schema.schema.validate(&config);
        if diagnostics.has_errors() {
            return diagnostics;
        }

        let response = resource
            .validate(
                ctx,
                ValidateConfigRequest {
                    type_name: type_name.to_string(),
                    config,
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);
        diagnostics
    }

    pub async fn validate_data_source_config(
        &self,
        ctx: Context,
        type_name: &str,
        config: DynamicValue,
    ) -> Vec<Diagnostic> {
        let factory = {
            let provider = self.provider.read().await;
            provider.data_sources().get(type_name).copied()
        };
        let Some(factory) = factory else {
            return vec![Diagnostic::error(
                format!("Unknown data source type: {}", type_name),
                String::new(),
            )];
        };

        let data_source = factory();
        let schema = data_source
            .schema(ctx.clone(), SchemaRequest)
            .await;
        let mut diagnostics = schema.schema.validate(&config);
        if diagnostics.has_errors() {
            return diagnostics;
        }

        let response = data_source
            .validate(
                ctx,
                ValidateConfigRequest {
                    type_name: type_name.to_string(),
                    config,
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);
        diagnostics
    }

    pub async fn read_resource(
        &self,
        ctx: Context,
        type_name: &str,
        current_state: DynamicValue,
    ) -> ReadResourceResult {
        let resource = match self.configured_resource(&ctx, type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return ReadResourceResult {
                    new_state: Some(current_state),
                    diagnostics,
                }
            }
        };

        let response = resource
            .read(
                ctx,
                ReadResourceRequest {
                    type_name: type_name.to_string(),
                    current_state,
                },
            )
            .await;

        ReadResourceResult {
            new_state: response.new_state,
            diagnostics: response.diagnostics,
        }
    }

    /// Create, update or delete depending on which of prior and planned
    /// state are null. On error the prior state is kept.
    pub async fn apply_resource_change(
        &self,
        ctx: Context,
        type_name: &str,
        prior_state: DynamicValue,
        planned_state: DynamicValue,
        config: DynamicValue,
    ) -> ApplyResourceChangeResult {
        let kind = change_kind(&prior_state, &planned_state);
        tracing::debug!(type_name, ?kind, "applying resource change");

        if kind == ChangeKind::Noop {
            return ApplyResourceChangeResult {
                new_state: None,
                diagnostics: vec![],
            };
        }

        let resource = match self.configured_resource(&ctx, type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return ApplyResourceChangeResult {
                    new_state: Some(prior_state).filter(|s| !s.is_null()),
                    diagnostics,
                }
            }
        };

        let (new_state, diagnostics) = match kind {
            ChangeKind::Create => {
                let response = resource
                    .create(
                        ctx,
                        CreateResourceRequest {
                            type_name: type_name.to_string(),
                            planned_state,
                            config,
                        },
                    )
                    .await;
                (Some(response.new_state), response.diagnostics)
            }
            ChangeKind::Update => {
                let response = resource
                    .update(
                        ctx,
                        UpdateResourceRequest {
                            type_name: type_name.to_string(),
                            prior_state: prior_state.clone(),
                            planned_state,
                            config,
                        },
                    )
                    .await;
                (Some(response.new_state), response.diagnostics)
            }
            ChangeKind::Delete => {
                let response = resource
                    .delete(
                        ctx,
                        DeleteResourceRequest {
                            type_name: type_name.to_string(),
                            prior_state: prior_state.clone(),
                        },
                    )
                    .await;
                (None, response.diagnostics)
            }
            ChangeKind::Noop => (None, vec![]),
        };

        if diagnostics.has_errors() {
            tracing::warn!(type_name, ?kind, "resource change failed");
            return ApplyResourceChangeResult {
                new_state: Some(prior_state).filter(|s| !s.is_null()),
                diagnostics,
            };
        }

        ApplyResourceChangeResult {
            new_state,
            diagnostics,
        }
    }

    pub async fn import_resource_state(
        &self,
        ctx: Context,
        type_name: &str,
        id: &str,
    ) -> ImportResourceStateResponse {
        let resource = match self.configured_resource(&ctx, type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return ImportResourceStateResponse {
                    imported_resources: vec![],
                    diagnostics,
                }
            }
        };

        let Some(importer) = resource.as_import_state() else {
            return ImportResourceStateResponse {
                imported_resources: vec![],
                diagnostics: vec![Diagnostic::error(
                    "Resource Import Not Implemented",
                    format!("Resource type {} does not support import", type_name),
                )],
            };
        };

        importer
            .import_state(
                ctx,
                ImportResourceStateRequest {
                    type_name: type_name.to_string(),
                    id: id.to_string(),
                },
            )
            .await
    }

    pub async fn read_data_source(
        &self,
        ctx: Context,
        type_name: &str,
        config: DynamicValue,
    ) -> ReadDataSourceResult {
        let data_source = match self.configured_data_source(&ctx, type_name).await {
            Ok(data_source) => data_source,
            Err(diagnostics) => {
                return ReadDataSourceResult {
                    state: None,
                    diagnostics,
                }
            }
        };

        let response = data_source
            .read(
                ctx,
                ReadDataSourceRequest {
                    type_name: type_name.to_string(),
                    config,
                },
            )
            .await;

        let state = if response.diagnostics.has_errors() {
            None
        } else {
            Some(response.state)
        };

        ReadDataSourceResult {
            state,
            diagnostics: response.diagnostics,
        }
    }
}
