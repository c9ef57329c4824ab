use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vmdhcp::{Config, Error, MacRequest, Result};

#[derive(Parser)]
#[command(name = "vmdhcp")]
#[command(author, version, about = "Single-client DHCP responder for a bridged VM NIC", long_about = None)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Guest MAC address to serve
    #[arg(long, conflicts_with = "identifier")]
    mac: Option<String>,

    /// Stable identifier to derive the guest MAC address from
    #[arg(long)]
    identifier: Option<String>,

    #[arg(long)]
    server_interface: Option<String>,

    #[arg(long)]
    dummy_interface: Option<String>,

    #[arg(long)]
    hostname: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Run,
    ShowConfig,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config = Config::load_or_default(self.config.as_ref())?;

        if let Some(interface) = &self.server_interface {
            config.server_interface = interface.clone();
        }
        if let Some(interface) = &self.dummy_interface {
            config.dummy_interface = interface.clone();
        }
        if let Some(hostname) = &self.hostname {
            config.hostname = Some(hostname.clone());
        }

        config.validate()?;
        Ok(config)
    }

    fn mac_request(&self) -> Result<MacRequest> {
        match (&self.mac, &self.identifier) {
            (Some(mac), _) => Ok(MacRequest::Explicit(mac.clone())),
            (None, Some(identifier)) => Ok(MacRequest::Derived(identifier.clone())),
            (None, None) => Err(Error::InvalidConfig(
                "either --mac or --identifier is required".to_string(),
            )),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let config = cli.config()?;

    match cli.command.as_ref().unwrap_or(&Commands::Run) {
        Commands::Run => {
            let request = cli.mac_request()?;
            info!(
                "Starting DHCP responder on {} for {}",
                config.server_interface, config.dummy_interface
            );

            let (sender, mut requests) = mpsc::channel(1);
            sender
                .send(request)
                .await
                .map_err(|_| Error::RequestChannelClosed)?;

            let handle = vmdhcp::server::start(&config, &mut requests).await?;
            let result = handle.await.map_err(std::io::Error::other)?;

            if let Err(error) = &result {
                error!("DHCP server stopped: {}", error);
            }
            result
        }
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
