//! Segment port resource implementation
//!
//! Create and update both PATCH the full planned port; there is no partial
//! update. Read replaces `segment_port` with what the manager returns and
//! keeps the identity pair from state.

use crate::api::response::decode_json;
use crate::api::segment_ports::SEGMENT_PORT_RESOURCE_TYPE;
use crate::api::SegmentPort;
use crate::NsxtProviderData;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tfplug::context::Context;
use tfplug::import_state_passthrough_id;
use tfplug::request::{
    ConfigureRequest, ConfigureResponse, SchemaRequest, SchemaResponse, ValidateConfigRequest,
    ValidateConfigResponse,
};
use tfplug::resource::{
    CreateResourceRequest, CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceWithConfigure, ResourceWithImportState,
    UpdateResourceRequest, UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

pub const SEGMENT_PORT_TYPE_NAME: &str = "nsxt_segment_port";

/// Terraform type of one segment port object, shared with the list data source
pub fn segment_port_type() -> AttributeType {
    AttributeType::object([
        ("id", AttributeType::String),
        ("display_name", AttributeType::String),
        ("description", AttributeType::String),
        ("resource_type", AttributeType::String),
        ("admin_state", AttributeType::String),
        (
            "address_bindings",
            AttributeType::list(AttributeType::object([
                ("ip_address", AttributeType::String),
                ("mac_address", AttributeType::String),
                ("vlan_id", AttributeType::String),
            ])),
        ),
        (
            "attachment",
            AttributeType::object([
                ("id", AttributeType::String),
                ("type", AttributeType::String),
                ("context_id", AttributeType::String),
                ("traffic_tag", AttributeType::String),
                ("app_id", AttributeType::String),
                ("allocate_addresses", AttributeType::String),
            ]),
        ),
    ])
}

/// Typed view of the resource state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentPortResourceModel {
    pub segment_id: String,
    pub port_id: String,
    pub segment_port: SegmentPort,
}

impl SegmentPortResourceModel {
    pub fn from_dynamic(value: &DynamicValue) -> tfplug::Result<Self> {
        value.to_model()
    }

    pub fn to_dynamic(&self) -> tfplug::Result<DynamicValue> {
        DynamicValue::from_model(self)
    }
}

#[derive(Default)]
pub struct SegmentPortResource {
    provider_data: Option<NsxtProviderData>,
}

impl SegmentPortResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn provider_data(&self) -> Result<&NsxtProviderData, Diagnostic> {
        self.provider_data.as_ref().ok_or_else(|| {
            Diagnostic::error(
                "Provider not configured",
                "Provider data was not properly configured",
            )
        })
    }

    /// PATCH the whole port; anything but 200 is a failure
    async fn put_port(
        &self,
        ctx: &Context,
        model: &SegmentPortResourceModel,
        action: &str,
    ) -> Result<(), Diagnostic> {
        let provider_data = self.provider_data()?;

        let response = provider_data
            .client
            .segment_ports()
            .patch(ctx, &model.segment_id, &model.port_id, &model.segment_port)
            .await
            .map_err(|e| {
                Diagnostic::error(
                    format!("Unable to {} segment port", action),
                    format!("API error: {}", e),
                )
            })?;

        if response.status() != StatusCode::OK {
            return Err(Diagnostic::error(
                format!("Invalid response received. Code: {}", response.status().as_u16()),
                response.status().to_string(),
            ));
        }

        tracing::debug!(
            segment_id = %model.segment_id,
            port_id = %model.port_id,
            "segment port {}d",
            action
        );
        Ok(())
    }

    /// DELETE by the identity recorded in state. 404 counts as already gone.
    async fn delete_port(&self, ctx: &Context, prior_state: &DynamicValue) -> Result<(), Diagnostic> {
        let provider_data = self.provider_data()?;
        let (segment_id, port_id) = identity(prior_state)?;

        let response = provider_data
            .client
            .segment_ports()
            .delete(ctx, &segment_id, &port_id)
            .await
            .map_err(|e| {
                Diagnostic::error("Unable to delete segment port", format!("API error: {}", e))
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::warn!(%segment_id, %port_id, "segment port already deleted");
        } else if !status.is_success() {
            return Err(Diagnostic::error(
                "Unexpected HTTP error code deleting segment port",
                status.to_string(),
            ));
        } else {
            tracing::debug!(%segment_id, %port_id, "deleted segment port");
        }
        Ok(())
    }
}

fn identity(state: &DynamicValue) -> Result<(String, String), Diagnostic> {
    let segment_id = state
        .get_string(&AttributePath::new("segment_id"))
        .map_err(|e| {
            Diagnostic::error("Missing segment_id in state", e.to_string())
                .with_attribute(AttributePath::new("segment_id"))
        })?;
    let port_id = state
        .get_string(&AttributePath::new("port_id"))
        .map_err(|e| {
            Diagnostic::error("Missing port_id in state", e.to_string())
                .with_attribute(AttributePath::new("port_id"))
        })?;
    Ok((segment_id, port_id))
}

fn decode_plan(planned_state: &DynamicValue) -> Result<SegmentPortResourceModel, Diagnostic> {
    SegmentPortResourceModel::from_dynamic(planned_state)
        .map_err(|e| Diagnostic::error("Invalid segment port configuration", e.to_string()))
}

static NULL: Dynamic = Dynamic::Null;

/// Value at `path`, with missing attributes read as null. `None` when the
/// value is not known until apply.
fn known<'a>(config: &'a DynamicValue, path: &AttributePath) -> Option<&'a Dynamic> {
    match config.get(path) {
        Ok(Dynamic::Unknown) => None,
        Ok(value) => Some(value),
        Err(_) => Some(&NULL),
    }
}

fn check_one_of(
    config: &DynamicValue,
    path: AttributePath,
    allowed: &[&str],
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Some(Dynamic::String(value)) = known(config, &path) {
        if !allowed.contains(&value.as_str()) {
            diagnostics.push(
                Diagnostic::error(
                    format!("Invalid value for {}", path),
                    format!("Must be one of {:?}, got {:?}", allowed, value),
                )
                .with_attribute(path),
            );
        }
    }
}

fn check_present(config: &DynamicValue, path: AttributePath, diagnostics: &mut Vec<Diagnostic>) {
    if let Some(Dynamic::Null) = known(config, &path) {
        diagnostics.push(
            Diagnostic::error(
                format!("Missing required attribute: {}", path),
                format!("The attribute '{}' is required", path),
            )
            .with_attribute(path),
        );
    }
}

/// Structural checks the schema cannot express
pub fn validate_segment_port(config: &DynamicValue) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];
    let port = AttributePath::new("segment_port");

    if !matches!(known(config, &port), Some(Dynamic::Map(_))) {
        return diagnostics;
    }

    for name in ["id", "display_name", "resource_type", "admin_state"] {
        check_present(config, port.clone().attribute(name), &mut diagnostics);
    }
    check_one_of(
        config,
        port.clone().attribute("resource_type"),
        &[SEGMENT_PORT_RESOURCE_TYPE],
        &mut diagnostics,
    );
    check_one_of(
        config,
        port.clone().attribute("admin_state"),
        &["UP", "DOWN"],
        &mut diagnostics,
    );

    let attachment = port.clone().attribute("attachment");
    if !matches!(known(config, &attachment), Some(Dynamic::Map(_))) {
        return diagnostics;
    }

    let attachment_type = attachment.clone().attribute("type");
    check_present(config, attachment_type.clone(), &mut diagnostics);
    check_one_of(
        config,
        attachment_type.clone(),
        &["PARENT", "CHILD"],
        &mut diagnostics,
    );

    if known(config, &attachment_type).and_then(Dynamic::as_str) == Some("CHILD") {
        check_present(
            config,
            attachment.clone().attribute("context_id"),
            &mut diagnostics,
        );
        check_present(
            config,
            attachment.clone().attribute("traffic_tag"),
            &mut diagnostics,
        );

        let bindings = port.attribute("address_bindings");
        match known(config, &bindings) {
            Some(Dynamic::List(items)) if !items.is_empty() => {}
            None => {}
            Some(_) => diagnostics.push(
                Diagnostic::error(
                    "CHILD ports require address bindings",
                    "Set at least one entry in address_bindings when attachment.type is CHILD",
                )
                .with_attribute(bindings),
            ),
        }
    }

    diagnostics
}

#[async_trait]
impl Resource for SegmentPortResource {
    fn type_name(&self) -> &str {
        SEGMENT_PORT_TYPE_NAME
    }

    async fn schema(&self, _ctx: Context, _request: SchemaRequest) -> SchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manage a segment port.")
            .attribute(
                AttributeBuilder::new("segment_id", AttributeType::String)
                    .description(
                        "Identifier for this segment. Import only sets port_id, so segment_id \
                         must be set in configuration before the imported port can be read.",
                    )
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("port_id", AttributeType::String)
                    .description("Identifier for this port.")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("segment_port", segment_port_type())
                    .description("The segment port definition")
                    .required()
                    .build(),
            )
            .build();

        SchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateConfigRequest,
    ) -> ValidateConfigResponse {
        ValidateConfigResponse {
            diagnostics: validate_segment_port(&request.config),
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        tracing::debug!("Preparing to create segment port resource");

        let result = match decode_plan(&request.planned_state) {
            Ok(model) => self.put_port(&ctx, &model, "create").await,
            Err(diag) => Err(diag),
        };

        CreateResourceResponse {
            new_state: request.planned_state,
            diagnostics: result.err().into_iter().collect(),
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let current_state = request.current_state;

        let fail = |state: DynamicValue, diag: Diagnostic| ReadResourceResponse {
            new_state: Some(state),
            diagnostics: vec![diag],
        };

        let provider_data = match self.provider_data() {
            Ok(data) => data,
            Err(diag) => return fail(current_state, diag),
        };
        let (segment_id, port_id) = match identity(&current_state) {
            Ok(ids) => ids,
            Err(diag) => return fail(current_state, diag),
        };

        let response = match provider_data
            .client
            .segment_ports()
            .get(&ctx, &segment_id, &port_id)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return fail(
                    current_state,
                    Diagnostic::error(
                        "Unable to read segment port configuration",
                        format!("API error: {}", e),
                    ),
                )
            }
        };

        if response.status() == StatusCode::NOT_FOUND {
            tracing::info!(%segment_id, %port_id, "segment port no longer exists, removing from state");
            return ReadResourceResponse {
                new_state: None,
                diagnostics: vec![],
            };
        }

        if response.status() != StatusCode::OK {
            let status = response.status().to_string();
            return fail(
                current_state,
                Diagnostic::error("Unexpected HTTP error code received for segment port", status),
            );
        }

        let segment_port: SegmentPort = match decode_json(response).await {
            Ok(port) => port,
            Err(e) => {
                return fail(
                    current_state,
                    Diagnostic::error("Invalid format received for segment port", e.to_string()),
                )
            }
        };

        let model = SegmentPortResourceModel {
            segment_id,
            port_id,
            segment_port,
        };

        match model.to_dynamic() {
            Ok(state) => ReadResourceResponse {
                new_state: Some(state),
                diagnostics: vec![],
            },
            Err(e) => fail(
                current_state,
                Diagnostic::error("Failed to store segment port state", e.to_string()),
            ),
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        tracing::debug!("Preparing to update segment port resource");

        let result = match decode_plan(&request.planned_state) {
            Ok(model) => self.put_port(&ctx, &model, "update").await,
            Err(diag) => Err(diag),
        };

        match result {
            Ok(()) => UpdateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![],
            },
            Err(diag) => UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![diag],
            },
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        tracing::debug!("Preparing to delete segment port resource");

        let result = self.delete_port(&ctx, &request.prior_state).await;

        DeleteResourceResponse {
            diagnostics: result.err().into_iter().collect(),
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for SegmentPortResource {
    async fn configure(&mut self, _ctx: Context, request: ConfigureRequest) -> ConfigureResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            match data.downcast_ref::<NsxtProviderData>() {
                Some(provider_data) => self.provider_data = Some(provider_data.clone()),
                None => {
                    tracing::error!("Unable to prepare client");
                    diagnostics.push(Diagnostic::error(
                        "Invalid provider data",
                        "Failed to downcast provider data to NsxtProviderData",
                    ));
                }
            }
        }

        ConfigureResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithImportState for SegmentPortResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(AttributePath::new("port_id"), &request, &mut response);
        response
    }
}
