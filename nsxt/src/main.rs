use clap::{Parser, Subcommand};
use nsxt::api::SegmentPort;
use nsxt::data_sources::segment_ports::SEGMENT_PORTS_TYPE_NAME;
use nsxt::resources::segment_port::SEGMENT_PORT_TYPE_NAME;
use nsxt::resources::SegmentPortResourceModel;
use nsxt::NsxtProvider;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tfplug::types::{AttributePath, Diagnostic, DiagnosticsExt, DynamicValue};
use tfplug::{Context, ProviderServer};
use tracing_subscriber::EnvFilter;

/// Manage NSX-T segment ports with the provider's resource lifecycle
#[derive(Parser)]
#[command(name = "nsxt-ports", version)]
struct Cli {
    /// NSX-T Manager address (falls back to NSXT_HOSTNAME)
    #[arg(long)]
    host: Option<String>,

    /// Manager username (falls back to NSXT_USERNAME)
    #[arg(long)]
    username: Option<String>,

    /// Manager password (falls back to NSXT_PASSWORD)
    #[arg(long)]
    password: Option<String>,

    /// Skip TLS certificate verification (falls back to NSXT_INSECURE)
    #[arg(long)]
    insecure: Option<bool>,

    /// Give up on the whole command after this many seconds
    #[arg(long, default_value_t = 300)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every port of a segment
    List {
        #[arg(long)]
        segment_id: String,
    },
    /// Read one port
    Get {
        #[arg(long)]
        segment_id: String,
        #[arg(long)]
        port_id: String,
    },
    /// Create or update a port from a JSON definition
    Apply {
        #[arg(long)]
        segment_id: String,
        #[arg(long)]
        port_id: String,
        /// Segment port JSON file
        #[arg(long)]
        file: PathBuf,
    },
    /// Delete a port
    Delete {
        #[arg(long)]
        segment_id: String,
        #[arg(long)]
        port_id: String,
    },
}

impl Cli {
    fn provider_config(&self) -> Result<DynamicValue, Box<dyn std::error::Error>> {
        let mut config = DynamicValue::object();
        if let Some(host) = &self.host {
            config.set_string(&AttributePath::new("host"), host.clone())?;
        }
        if let Some(username) = &self.username {
            config.set_string(&AttributePath::new("username"), username.clone())?;
        }
        if let Some(password) = &self.password {
            config.set_string(&AttributePath::new("password"), password.clone())?;
        }
        if let Some(insecure) = self.insecure {
            config.set_bool(&AttributePath::new("insecure"), insecure)?;
        }
        Ok(config)
    }
}

fn identity(segment_id: &str, port_id: &str) -> Result<DynamicValue, Box<dyn std::error::Error>> {
    let mut state = DynamicValue::object();
    state.set_string(&AttributePath::new("segment_id"), segment_id.to_string())?;
    state.set_string(&AttributePath::new("port_id"), port_id.to_string())?;
    Ok(state)
}

fn report(diagnostics: &[Diagnostic]) -> bool {
    for diag in diagnostics {
        if diag.is_error() {
            tracing::error!(attribute = ?diag.attribute, detail = %diag.detail, "{}", diag.summary);
        } else {
            tracing::warn!(attribute = ?diag.attribute, detail = %diag.detail, "{}", diag.summary);
        }
    }
    !diagnostics.has_errors()
}

fn print_state(state: &DynamicValue) -> Result<(), Box<dyn std::error::Error>> {
    let json = state.encode_json()?;
    println!("{}", String::from_utf8_lossy(&json));
    Ok(())
}

async fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let server = ProviderServer::new(NsxtProvider::new());
    let ctx = Context::new().with_timeout(Duration::from_secs(cli.timeout));

    if !report(&server.configure_provider(ctx.clone(), cli.provider_config()?).await) {
        return Ok(false);
    }

    match &cli.command {
        Command::List { segment_id } => {
            let mut config = DynamicValue::object();
            config.set_string(&AttributePath::new("segment_id"), segment_id.clone())?;

            if !report(
                &server
                    .validate_data_source_config(ctx.clone(), SEGMENT_PORTS_TYPE_NAME, config.clone())
                    .await,
            ) {
                return Ok(false);
            }

            let result = server
                .read_data_source(ctx, SEGMENT_PORTS_TYPE_NAME, config)
                .await;
            if !report(&result.diagnostics) {
                return Ok(false);
            }
            if let Some(state) = result.state {
                print_state(&state)?;
            }
        }
        Command::Get {
            segment_id,
            port_id,
        } => {
            let result = server
                .read_resource(ctx, SEGMENT_PORT_TYPE_NAME, identity(segment_id, port_id)?)
                .await;
            if !report(&result.diagnostics) {
                return Ok(false);
            }
            match result.new_state {
                Some(state) => print_state(&state)?,
                None => {
                    tracing::error!(%segment_id, %port_id, "segment port not found");
                    return Ok(false);
                }
            }
        }
        Command::Apply {
            segment_id,
            port_id,
            file,
        } => {
            let contents = std::fs::read_to_string(file)?;
            let segment_port: SegmentPort = serde_json::from_str(&contents)?;
            let planned = SegmentPortResourceModel {
                segment_id: segment_id.clone(),
                port_id: port_id.clone(),
                segment_port,
            }
            .to_dynamic()?;

            if !report(
                &server
                    .validate_resource_config(ctx.clone(), SEGMENT_PORT_TYPE_NAME, planned.clone())
                    .await,
            ) {
                return Ok(false);
            }

            let prior = server
                .read_resource(ctx.clone(), SEGMENT_PORT_TYPE_NAME, identity(segment_id, port_id)?)
                .await;
            if !report(&prior.diagnostics) {
                return Ok(false);
            }

            let result = server
                .apply_resource_change(
                    ctx,
                    SEGMENT_PORT_TYPE_NAME,
                    prior.new_state.unwrap_or_else(DynamicValue::null),
                    planned.clone(),
                    planned,
                )
                .await;
            if !report(&result.diagnostics) {
                return Ok(false);
            }
            if let Some(state) = result.new_state {
                print_state(&state)?;
            }
        }
        Command::Delete {
            segment_id,
            port_id,
        } => {
            let result = server
                .apply_resource_change(
                    ctx.clone(),
                    SEGMENT_PORT_TYPE_NAME,
                    identity(segment_id, port_id)?,
                    DynamicValue::null(),
                    DynamicValue::null(),
                )
                .await;
            if !report(&result.diagnostics) {
                return Ok(false);
            }
            tracing::info!(%segment_id, %port_id, "segment port deleted");
        }
    }

    Ok(true)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
