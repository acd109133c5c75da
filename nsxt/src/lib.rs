//! Terraform provider for NSX-T segment ports
//!
//! Configure resolves the manager address and credentials, logs in once and
//! hands an authenticated [`api::Client`] to every resource and data source.

pub mod api;
pub mod config;
pub mod data_sources;
pub mod provider_data;
pub mod resources;

pub use provider_data::NsxtProviderData;

use async_trait::async_trait;
use config::ProviderConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ResourceFactory,
};
use tfplug::request::{SchemaRequest, SchemaResponse};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::Diagnostic;

pub const PROVIDER_TYPE_NAME: &str = "nsxt";

#[derive(Default)]
pub struct NsxtProvider {
    provider_data: Option<NsxtProviderData>,
}

impl NsxtProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider_data(&self) -> Option<&NsxtProviderData> {
        self.provider_data.as_ref()
    }

    async fn connect(
        &self,
        ctx: &Context,
        config: &ProviderConfig,
    ) -> Result<(api::Client, Vec<Diagnostic>), Diagnostic> {
        let client_error = |e: api::ApiError| {
            Diagnostic::error(
                "Unable to Create NSX-T API Client",
                format!(
                    "An unexpected error occurred when creating the NSX-T API client: {}",
                    e
                ),
            )
        };

        let server = api::client::server_url(&config.host).map_err(client_error)?;
        let http = api::client::http_client(config.insecure, api::client::REQUEST_TIMEOUT)
            .map_err(client_error)?;

        let session = api::session::login(ctx, &http, &server, &config.username, &config.password)
            .await
            .map_err(|e| match e {
                api::ApiError::LoginFailed { status, message } => Diagnostic::error(
                    "NSX-T API Client returned a non-200 status code",
                    format!("Login to {} failed with HTTP {}: {}", server, status, message),
                ),
                other => Diagnostic::error(
                    "Unable to log in to NSX-T",
                    format!("Login to {} failed: {}", server, other),
                ),
            })?;

        let mut diagnostics = vec![];
        let builder = api::Client::builder(
            server.as_str(),
            &config.username,
            config.password.clone(),
        )
        .http_client(http);

        let builder = if session.has_session() {
            builder.session(session)
        } else {
            tracing::warn!("login response carried no session cookie, using basic auth");
            diagnostics.push(Diagnostic::warning(
                "NSX-T session cookie missing",
                "The login response did not set a session cookie. Requests will use basic authentication.",
            ));
            builder
        };

        let client = builder.build().map_err(client_error)?;
        Ok((client, diagnostics))
    }
}

#[async_trait]
impl Provider for NsxtProvider {
    fn type_name(&self) -> &str {
        PROVIDER_TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: PROVIDER_TYPE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: SchemaRequest) -> SchemaResponse {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Manage NSX-T segment ports through the Policy API.")
            .attribute(
                AttributeBuilder::new("insecure", AttributeType::Bool)
                    .description("Skip TLS certificate verification. May also be set with NSXT_INSECURE.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("host", AttributeType::String)
                    .description("NSX-T Manager address. May also be set with NSXT_HOSTNAME.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("username", AttributeType::String)
                    .description("NSX-T Manager username. May also be set with NSXT_USERNAME.")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("password", AttributeType::String)
                    .description("NSX-T Manager password. May also be set with NSXT_PASSWORD.")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .build();

        SchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        tracing::info!(
            terraform_version = %request.terraform_version,
            "Configuring NSX-T client"
        );

        let resolved = match ProviderConfig::from_env(&request.config) {
            Ok(resolved) => resolved,
            Err(diagnostics) => {
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        };
        let mut diagnostics = resolved.diagnostics;
        let config = resolved.config;

        tracing::debug!(
            host = %config.host,
            username = %config.username,
            insecure = config.insecure,
            "resolved NSX-T provider configuration"
        );

        match self.connect(&ctx, &config).await {
            Ok((client, warnings)) => {
                diagnostics.extend(warnings);
                let provider_data = NsxtProviderData::new(client);
                self.provider_data = Some(provider_data.clone());
                tracing::info!(host = %config.host, "Configured NSX-T client");

                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: Some(Arc::new(provider_data)),
                }
            }
            Err(diag) => {
                tracing::error!(host = %config.host, "{}", diag.summary);
                diagnostics.push(diag);
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            resources::segment_port::SEGMENT_PORT_TYPE_NAME.to_string(),
            || Box::new(resources::SegmentPortResource::new()) as Box<dyn ResourceWithConfigure>,
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            data_sources::segment_ports::SEGMENT_PORTS_TYPE_NAME.to_string(),
            || {
                Box::new(data_sources::SegmentPortsDataSource::new())
                    as Box<dyn DataSourceWithConfigure>
            },
        );
        factories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serial_test::serial;
    use tfplug::resource::Resource;
    use tfplug::types::{AttributePath, DiagnosticsExt, DynamicValue};

    const ENV_VARS: [&str; 4] = [
        config::ENV_HOSTNAME,
        config::ENV_USERNAME,
        config::ENV_PASSWORD,
        config::ENV_INSECURE,
    ];

    fn clear_env() {
        for name in ENV_VARS {
            std::env::remove_var(name);
        }
    }

    fn request(config: DynamicValue) -> ConfigureProviderRequest {
        ConfigureProviderRequest {
            terraform_version: "1.9.0".to_string(),
            config,
        }
    }

    #[tokio::test]
    #[serial]
    async fn configures_from_env_vars() {
        clear_env();
        let mut server = Server::new_async().await;
        let login = server
            .mock("POST", "/api/session/create")
            .with_status(200)
            .with_header("set-cookie", "JSESSIONID=abc; Path=/; Secure; HttpOnly")
            .with_header("x-xsrf-token", "xsrf-1")
            .create_async()
            .await;

        std::env::set_var(config::ENV_HOSTNAME, server.url());
        std::env::set_var(config::ENV_USERNAME, "admin");
        std::env::set_var(config::ENV_PASSWORD, "secret");
        std::env::set_var(config::ENV_INSECURE, "true");

        let mut provider = NsxtProvider::new();
        let response = provider
            .configure(Context::new(), request(DynamicValue::object()))
            .await;

        login.assert_async().await;
        assert!(response.diagnostics.is_empty());
        assert!(response.provider_data.is_some());
        assert!(provider.provider_data().is_some());
        clear_env();
    }

    #[tokio::test]
    #[serial]
    async fn login_failure_is_fatal() {
        clear_env();
        let mut server = Server::new_async().await;
        let _login = server
            .mock("POST", "/api/session/create")
            .with_status(403)
            .with_body("bad credentials")
            .create_async()
            .await;

        let mut config = DynamicValue::object();
        config
            .set_string(&AttributePath::new("host"), server.url())
            .unwrap();
        config
            .set_string(&AttributePath::new("username"), "admin".to_string())
            .unwrap();
        config
            .set_string(&AttributePath::new("password"), "wrong".to_string())
            .unwrap();
        config.set_bool(&AttributePath::new("insecure"), true).unwrap();

        let mut provider = NsxtProvider::new();
        let response = provider.configure(Context::new(), request(config)).await;

        assert!(response.diagnostics.has_errors());
        assert_eq!(
            response.diagnostics[0].summary,
            "NSX-T API Client returned a non-200 status code"
        );
        assert!(response.diagnostics[0].detail.contains("403"));
        assert!(response.provider_data.is_none());
        assert!(provider.provider_data().is_none());
    }

    #[tokio::test]
    #[serial]
    async fn missing_session_cookie_falls_back_to_basic_auth() {
        clear_env();
        let mut server = Server::new_async().await;
        let _login = server
            .mock("POST", "/api/session/create")
            .with_status(200)
            .create_async()
            .await;

        let mut config = DynamicValue::object();
        config
            .set_string(&AttributePath::new("host"), server.url())
            .unwrap();
        config
            .set_string(&AttributePath::new("username"), "admin".to_string())
            .unwrap();
        config
            .set_string(&AttributePath::new("password"), "secret".to_string())
            .unwrap();
        config.set_bool(&AttributePath::new("insecure"), false).unwrap();

        let mut provider = NsxtProvider::new();
        let response = provider.configure(Context::new(), request(config)).await;

        assert!(!response.diagnostics.has_errors());
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "NSX-T session cookie missing");
        assert!(response.provider_data.is_some());
    }

    #[tokio::test]
    #[serial]
    async fn unknown_config_value_skips_login() {
        clear_env();
        let mut config = DynamicValue::object();
        config
            .set_value(&AttributePath::new("password"), tfplug::Dynamic::Unknown)
            .unwrap();

        let mut provider = NsxtProvider::new();
        let response = provider.configure(Context::new(), request(config)).await;

        assert!(response.diagnostics.has_errors());
        assert_eq!(response.diagnostics[0].summary, "Unknown NSX-T password");
        assert!(response.provider_data.is_none());
    }

    #[tokio::test]
    async fn registers_segment_port_types() {
        let provider = NsxtProvider::new();

        let resources = provider.resources();
        assert!(resources.contains_key("nsxt_segment_port"));
        let resource = resources["nsxt_segment_port"]();
        assert_eq!(resource.type_name(), "nsxt_segment_port");

        let data_sources = provider.data_sources();
        assert!(data_sources.contains_key("nsxt_segment_ports"));
    }

    #[tokio::test]
    async fn schema_marks_password_sensitive() {
        let provider = NsxtProvider::new();
        let response = provider
            .schema(Context::new(), SchemaRequest)
            .await;

        let password = response.schema.attribute("password").unwrap();
        assert!(password.sensitive);
        assert!(password.optional);
        assert!(response.schema.attribute("host").is_some());
    }
}
