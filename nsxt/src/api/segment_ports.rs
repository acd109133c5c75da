//! Segment port API implementation
//!
//! All four operations address
//! `/policy/api/v1/infra/segments/{segment_id}/ports[/{port_id}]` and return
//! the raw response. Callers decide what a status code means.

use super::client::Client;
use super::error::ApiError;
use reqwest::{Method, Response};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tfplug::context::Context;

pub const SEGMENT_PORT_RESOURCE_TYPE: &str = "SegmentPort";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminState {
    #[serde(rename = "UP")]
    Up,
    #[serde(rename = "DOWN")]
    Down,
}

impl fmt::Display for AdminState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminState::Up => write!(f, "UP"),
            AdminState::Down => write!(f, "DOWN"),
        }
    }
}

/// PARENT ports attach a workload directly; CHILD ports carry tagged VLAN
/// traffic for a PARENT identified by `context_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentType {
    #[serde(rename = "PARENT")]
    Parent,
    #[serde(rename = "CHILD")]
    Child,
}

impl fmt::Display for AttachmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentType::Parent => write!(f, "PARENT"),
            AttachmentType::Child => write!(f, "CHILD"),
        }
    }
}

/// Static IP/MAC/VLAN binding enforced on a port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortAddressBindingEntry {
    pub ip_address: String,
    pub mac_address: String,
    #[serde(default)]
    pub vlan_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortAttachment {
    /// VIF attachment id
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub attachment_type: AttachmentType,
    #[serde(default)]
    pub context_id: Option<String>,
    #[serde(default)]
    pub traffic_tag: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub allocate_addresses: Option<String>,
}

/// PATCH replaces the whole port, so cleared fields are always written out
/// (`null` or `[]`) rather than omitted. An omitted field keeps its old
/// value on the manager. The same holds for the nested attachment and
/// binding fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentPort {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub resource_type: String,
    pub admin_state: AdminState,
    #[serde(deserialize_with = "deserialize_null_as_empty", default)]
    pub address_bindings: Vec<PortAddressBindingEntry>,
    #[serde(default)]
    pub attachment: Option<PortAttachment>,
}

/// Response from GET .../segments/{segment_id}/ports
#[derive(Debug, Clone, Deserialize)]
pub struct ListSegmentPortsResponse {
    #[serde(default)]
    pub result_count: u64,
    #[serde(deserialize_with = "deserialize_null_as_empty", default)]
    pub results: Vec<SegmentPort>,
}

/// Null and missing lists both decode as empty
fn deserialize_null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

pub fn segment_ports_path(segment_id: &str) -> String {
    format!(
        "/policy/api/v1/infra/segments/{}/ports",
        urlencoding::encode(segment_id)
    )
}

pub fn segment_port_path(segment_id: &str, port_id: &str) -> String {
    format!(
        "{}/{}",
        segment_ports_path(segment_id),
        urlencoding::encode(port_id)
    )
}

/// Segment port operations
pub struct SegmentPortsApi<'a> {
    client: &'a Client,
}

impl<'a> SegmentPortsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /policy/api/v1/infra/segments/{segment_id}/ports
    pub async fn list(&self, ctx: &Context, segment_id: &str) -> Result<Response, ApiError> {
        let request = self
            .client
            .request(Method::GET, &segment_ports_path(segment_id))?;
        self.client.execute(ctx, request).await
    }

    /// GET /policy/api/v1/infra/segments/{segment_id}/ports/{port_id}
    pub async fn get(
        &self,
        ctx: &Context,
        segment_id: &str,
        port_id: &str,
    ) -> Result<Response, ApiError> {
        let request = self
            .client
            .request(Method::GET, &segment_port_path(segment_id, port_id))?;
        self.client.execute(ctx, request).await
    }

    /// PATCH /policy/api/v1/infra/segments/{segment_id}/ports/{port_id}
    ///
    /// Used for both create and update. The whole port is always sent.
    pub async fn patch(
        &self,
        ctx: &Context,
        segment_id: &str,
        port_id: &str,
        segment_port: &SegmentPort,
    ) -> Result<Response, ApiError> {
        let request = self.client.json_request(
            Method::PATCH,
            &segment_port_path(segment_id, port_id),
            segment_port,
        )?;
        self.client.execute(ctx, request).await
    }

    /// DELETE /policy/api/v1/infra/segments/{segment_id}/ports/{port_id}
    pub async fn delete(
        &self,
        ctx: &Context,
        segment_id: &str,
        port_id: &str,
    ) -> Result<Response, ApiError> {
        let request = self
            .client
            .request(Method::DELETE, &segment_port_path(segment_id, port_id))?;
        self.client.execute(ctx, request).await
    }
}
