//! Segment ports data source implementation

use crate::api::response::decode_json;
use crate::api::{ListSegmentPortsResponse, SegmentPort};
use crate::resources::segment_port::segment_port_type;
use crate::NsxtProviderData;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tfplug::context::Context;
use tfplug::data_source::{
    DataSource, DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
};
use tfplug::request::{
    ConfigureRequest, ConfigureResponse, SchemaRequest, SchemaResponse, ValidateConfigRequest,
    ValidateConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

pub const SEGMENT_PORTS_TYPE_NAME: &str = "nsxt_segment_ports";

/// Typed view of the data source state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentPortsDataSourceModel {
    pub segment_id: String,
    pub segment_ports: Vec<SegmentPort>,
}

impl SegmentPortsDataSourceModel {
    pub fn to_dynamic(&self) -> tfplug::Result<DynamicValue> {
        DynamicValue::from_model(self)
    }
}

#[derive(Default)]
pub struct SegmentPortsDataSource {
    provider_data: Option<NsxtProviderData>,
}

impl SegmentPortsDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn list(&self, ctx: &Context, segment_id: &str) -> Result<Vec<SegmentPort>, Diagnostic> {
        let provider_data = self.provider_data.as_ref().ok_or_else(|| {
            Diagnostic::error(
                "Provider not configured",
                "Provider data was not properly configured",
            )
        })?;

        let response = provider_data
            .client
            .segment_ports()
            .list(ctx, segment_id)
            .await
            .map_err(|e| {
                Diagnostic::error("Unable to list segment ports", format!("API error: {}", e))
            })?;

        if response.status() != StatusCode::OK {
            return Err(Diagnostic::error(
                "Unexpected HTTP error code received listing segment ports",
                response.status().to_string(),
            ));
        }

        let list: ListSegmentPortsResponse = decode_json(response).await.map_err(|e| {
            Diagnostic::error("Invalid format received for segment ports", e.to_string())
        })?;

        tracing::debug!(
            segment_id,
            result_count = list.result_count,
            returned = list.results.len(),
            "listed segment ports"
        );
        Ok(list.results)
    }
}

#[async_trait]
impl DataSource for SegmentPortsDataSource {
    fn type_name(&self) -> &str {
        SEGMENT_PORTS_TYPE_NAME
    }

    async fn schema(&self, _ctx: Context, _request: SchemaRequest) -> SchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Lists the ports of a segment.")
            .attribute(
                AttributeBuilder::new("segment_id", AttributeType::String)
                    .description("Identifier of the segment to list ports for")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("segment_ports", AttributeType::list(segment_port_type()))
                    .description("Ports attached to the segment")
                    .computed()
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
        let mut diagnostics = vec![];

        if let Ok(segment_id) = request.config.get_string(&AttributePath::new("segment_id")) {
            if segment_id.trim().is_empty() {
                diagnostics.push(
                    Diagnostic::error("segment_id must not be empty", "")
                        .with_attribute(AttributePath::new("segment_id")),
                );
            }
        }

        ValidateConfigResponse { diagnostics }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let segment_id = match request.config.get_string(&AttributePath::new("segment_id")) {
            Ok(id) => id,
            Err(e) => {
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics: vec![Diagnostic::error(
                        "Missing segment_id",
                        e.to_string(),
                    )
                    .with_attribute(AttributePath::new("segment_id"))],
                }
            }
        };

        let segment_ports = match self.list(&ctx, &segment_id).await {
            Ok(ports) => ports,
            Err(diag) => {
                return ReadDataSourceResponse {
                    state: request.config,
                    diagnostics: vec![diag],
                }
            }
        };

        let model = SegmentPortsDataSourceModel {
            segment_id,
            segment_ports,
        };

        match model.to_dynamic() {
            Ok(state) => ReadDataSourceResponse {
                state,
                diagnostics: vec![],
            },
            Err(e) => ReadDataSourceResponse {
                state: request.config,
                diagnostics: vec![Diagnostic::error(
                    "Failed to store segment ports state",
                    e.to_string(),
                )],
            },
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for SegmentPortsDataSource {
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
}
