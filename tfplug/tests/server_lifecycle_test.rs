//! Lifecycle dispatch through ProviderServer using an in-memory provider

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tfplug::context::Context;
use tfplug::data_source::{ReadDataSourceRequest, ReadDataSourceResponse};
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, ResourceFactory,
};
use tfplug::request::{
    ConfigureRequest, ConfigureResponse, SchemaRequest, SchemaResponse, ValidateConfigRequest,
    ValidateConfigResponse,
};
use tfplug::resource::{
    CreateResourceRequest, CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::{
    import_state_passthrough_id, AttributeBuilder, AttributePath, AttributeType, DataSource,
    DataSourceWithConfigure, Diagnostic, DiagnosticsExt, DynamicValue, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderServer, Resource,
    ResourceWithConfigure, ResourceWithImportState, SchemaBuilder,
};

type Store = Arc<Mutex<HashMap<String, String>>>;

struct MemoryProvider;

#[async_trait]
impl Provider for MemoryProvider {
    fn type_name(&self) -> &str {
        "memory"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: "memory".to_string(),
            version: "test".to_string(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: SchemaRequest) -> SchemaResponse {
        SchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("fail", AttributeType::Bool)
                        .optional()
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        if request
            .config
            .get_bool(&AttributePath::new("fail"))
            .unwrap_or(false)
        {
            return ConfigureProviderResponse {
                diagnostics: vec![Diagnostic::error("configure failed", "")],
                provider_data: None,
            };
        }

        let store: Store = Arc::new(Mutex::new(HashMap::new()));
        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new(store)),
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut resources: HashMap<String, ResourceFactory> = HashMap::new();
        resources.insert("memory_item".to_string(), item_resource);
        resources
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut data_sources: HashMap<String, DataSourceFactory> = HashMap::new();
        data_sources.insert("memory_items".to_string(), items_data_source);
        data_sources
    }
}

fn item_resource() -> Box<dyn ResourceWithConfigure> {
    Box::new(ItemResource::default())
}

fn items_data_source() -> Box<dyn DataSourceWithConfigure> {
    Box::new(ItemsDataSource::default())
}

#[derive(Default)]
struct ItemResource {
    store: Option<Store>,
}

impl ItemResource {
    fn store(&self) -> &Store {
        self.store.as_ref().unwrap()
    }
}

#[async_trait]
impl Resource for ItemResource {
    fn type_name(&self) -> &str {
        "memory_item"
    }

    async fn schema(&self, _ctx: Context, _request: SchemaRequest) -> SchemaResponse {
        SchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("key", AttributeType::String)
                        .required()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("value", AttributeType::String)
                        .optional()
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateConfigRequest,
    ) -> ValidateConfigResponse {
        let mut diagnostics = vec![];
        if let Ok(value) = request.config.get_string(&AttributePath::new("value")) {
            if value.is_empty() {
                diagnostics.push(Diagnostic::error("value must not be empty", ""));
            }
        }
        ValidateConfigResponse { diagnostics }
    }

    async fn create(
        &self,
        _ctx: Context,
        request: CreateResourceRequest,
    ) -> CreateResourceResponse {
        let key = request
            .planned_state
            .get_string(&AttributePath::new("key"))
            .unwrap();
        let value = request
            .planned_state
            .get_string(&AttributePath::new("value"))
            .unwrap_or_default();
        if value == "reject" {
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![Diagnostic::error("rejected", "")],
            };
        }
        self.store().lock().unwrap().insert(key, value);
        CreateResourceResponse {
            new_state: request.planned_state,
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let key = request
            .current_state
            .get_string(&AttributePath::new("key"))
            .unwrap();
        let value = self.store().lock().unwrap().get(&key).cloned();
        let new_state = value.map(|value| {
            let mut state = DynamicValue::object();
            state.set_string(&AttributePath::new("key"), key).unwrap();
            state
                .set_string(&AttributePath::new("value"), value)
                .unwrap();
            state
        });
        ReadResourceResponse {
            new_state,
            diagnostics: vec![],
        }
    }

    async fn update(
        &self,
        _ctx: Context,
        request: UpdateResourceRequest,
    ) -> UpdateResourceResponse {
        let key = request
            .planned_state
            .get_string(&AttributePath::new("key"))
            .unwrap();
        let value = request
            .planned_state
            .get_string(&AttributePath::new("value"))
            .unwrap_or_default();
        self.store().lock().unwrap().insert(key, value);
        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: vec![],
        }
    }

    async fn delete(
        &self,
        _ctx: Context,
        request: DeleteResourceRequest,
    ) -> DeleteResourceResponse {
        let key = request
            .prior_state
            .get_string(&AttributePath::new("key"))
            .unwrap();
        self.store().lock().unwrap().remove(&key);
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for ItemResource {
    async fn configure(&mut self, _ctx: Context, request: ConfigureRequest) -> ConfigureResponse {
        self.store = request
            .provider_data
            .and_then(|data| data.downcast_ref::<Store>().cloned());
        ConfigureResponse {
            diagnostics: vec![],
        }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for ItemResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(AttributePath::new("key"), &request, &mut response);
        response
    }
}

#[derive(Default)]
struct ItemsDataSource {
    store: Option<Store>,
}

#[async_trait]
impl DataSource for ItemsDataSource {
    fn type_name(&self) -> &str {
        "memory_items"
    }

    async fn schema(&self, _ctx: Context, _request: SchemaRequest) -> SchemaResponse {
        SchemaResponse {
            schema: SchemaBuilder::new()
                .attribute(
                    AttributeBuilder::new("count", AttributeType::Number)
                        .computed()
                        .build(),
                )
                .build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateConfigRequest,
    ) -> ValidateConfigResponse {
        ValidateConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, _request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let count = self.store.as_ref().unwrap().lock().unwrap().len();
        let mut state = DynamicValue::object();
        state
            .set_value(
                &AttributePath::new("count"),
                tfplug::Dynamic::Number(count as f64),
            )
            .unwrap();
        ReadDataSourceResponse {
            state,
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for ItemsDataSource {
    async fn configure(&mut self, _ctx: Context, request: ConfigureRequest) -> ConfigureResponse {
        self.store = request
            .provider_data
            .and_then(|data| data.downcast_ref::<Store>().cloned());
        ConfigureResponse {
            diagnostics: vec![],
        }
    }
}

fn item(key: &str, value: &str) -> DynamicValue {
    let mut state = DynamicValue::object();
    state
        .set_string(&AttributePath::new("key"), key.to_string())
        .unwrap();
    state
        .set_string(&AttributePath::new("value"), value.to_string())
        .unwrap();
    state
}

async fn configured_server() -> ProviderServer<MemoryProvider> {
    let server = ProviderServer::new(MemoryProvider);
    let diags = server
        .configure_provider(Context::new(), DynamicValue::object())
        .await;
    assert!(!diags.has_errors());
    server
}

#[tokio::test]
async fn resources_require_configured_provider() {
    let server = ProviderServer::new(MemoryProvider);

    let result = server
        .apply_resource_change(
            Context::new(),
            "memory_item",
            DynamicValue::null(),
            item("a", "1"),
            item("a", "1"),
        )
        .await;

    assert!(result.diagnostics.has_errors());
    assert!(result.diagnostics[0].summary.contains("not configured"));
    assert!(result.new_state.is_none());
}

#[tokio::test]
async fn failed_provider_configure_keeps_server_unconfigured() {
    let server = ProviderServer::new(MemoryProvider);
    let mut config = DynamicValue::object();
    config.set_bool(&AttributePath::new("fail"), true).unwrap();

    let diags = server.configure_provider(Context::new(), config).await;
    assert!(diags.has_errors());

    let result = server
        .read_data_source(Context::new(), "memory_items", DynamicValue::object())
        .await;
    assert!(result.state.is_none());
    assert!(result.diagnostics.has_errors());
}

#[tokio::test]
async fn apply_dispatches_create_update_delete() {
    let server = configured_server().await;
    let ctx = Context::new();

    let created = server
        .apply_resource_change(
            ctx.clone(),
            "memory_item",
            DynamicValue::null(),
            item("a", "1"),
            item("a", "1"),
        )
        .await;
    assert!(created.diagnostics.is_empty());
    let state = created.new_state.unwrap();

    let updated = server
        .apply_resource_change(
            ctx.clone(),
            "memory_item",
            state.clone(),
            item("a", "2"),
            item("a", "2"),
        )
        .await;
    assert!(updated.diagnostics.is_empty());
    let state = updated.new_state.unwrap();

    let read = server
        .read_resource(ctx.clone(), "memory_item", state.clone())
        .await;
    assert_eq!(
        read.new_state
            .unwrap()
            .get_string(&AttributePath::new("value"))
            .unwrap(),
        "2"
    );

    let deleted = server
        .apply_resource_change(
            ctx.clone(),
            "memory_item",
            state.clone(),
            DynamicValue::null(),
            DynamicValue::null(),
        )
        .await;
    assert!(deleted.diagnostics.is_empty());
    assert!(deleted.new_state.is_none());

    let gone = server.read_resource(ctx, "memory_item", state).await;
    assert!(gone.new_state.is_none());
    assert!(gone.diagnostics.is_empty());
}

#[tokio::test]
async fn failed_create_returns_no_state() {
    let server = configured_server().await;

    let result = server
        .apply_resource_change(
            Context::new(),
            "memory_item",
            DynamicValue::null(),
            item("a", "reject"),
            item("a", "reject"),
        )
        .await;

    assert!(result.diagnostics.has_errors());
    assert!(result.new_state.is_none());
}

#[tokio::test]
async fn unknown_resource_type_is_reported() {
    let server = configured_server().await;

    let result = server
        .read_resource(Context::new(), "memory_missing", item("a", "1"))
        .await;

    assert!(result.diagnostics[0]
        .summary
        .contains("Unknown resource type"));
}

#[tokio::test]
async fn validation_runs_schema_checks_before_resource_checks() {
    let server = ProviderServer::new(MemoryProvider);

    let missing_key = server
        .validate_resource_config(Context::new(), "memory_item", DynamicValue::object())
        .await;
    assert_eq!(missing_key.len(), 1);
    assert!(missing_key[0].summary.contains("key"));

    let empty_value = server
        .validate_resource_config(Context::new(), "memory_item", item("a", ""))
        .await;
    assert_eq!(empty_value.len(), 1);
    assert_eq!(empty_value[0].summary, "value must not be empty");
}

#[tokio::test]
async fn import_uses_resource_importer() {
    let server = configured_server().await;

    let response = server
        .import_resource_state(Context::new(), "memory_item", "imported-key")
        .await;

    assert!(response.diagnostics.is_empty());
    assert_eq!(
        response.imported_resources[0]
            .state
            .get_string(&AttributePath::new("key"))
            .unwrap(),
        "imported-key"
    );
}

#[tokio::test]
async fn data_source_reads_through_provider_data() {
    let server = configured_server().await;
    server
        .apply_resource_change(
            Context::new(),
            "memory_item",
            DynamicValue::null(),
            item("a", "1"),
            item("a", "1"),
        )
        .await;

    let result = server
        .read_data_source(Context::new(), "memory_items", DynamicValue::object())
        .await;

    assert!(result.diagnostics.is_empty());
    let state = result.state.unwrap();
    assert_eq!(
        state.get(&AttributePath::new("count")).unwrap(),
        &tfplug::Dynamic::Number(1.0)
    );
}

#[tokio::test]
async fn schemas_cover_resources_and_data_sources() {
    let server = ProviderServer::new(MemoryProvider);

    let schemas = server.schemas(Context::new()).await;

    assert!(schemas.resources.contains_key("memory_item"));
    assert!(schemas.data_sources.contains_key("memory_items"));
    assert!(schemas.provider.attribute("fail").is_some());
}
