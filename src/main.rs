use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use gee_adapter::api::{self, AppState};
use gee_adapter::catalog::CatalogClient;
use gee_adapter::config::Settings;
use gee_adapter::gee::EarthEngineClient;

/// SQL and filter queries over Google Earth Engine tables
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the config file
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Port to listen on, overriding config and environment
    #[arg(long = "port")]
    port: Option<u16>,

    /// Print the effective configuration and exit
    #[arg(long = "print-config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(Settings::default_path);
    let mut settings = Settings::load(&config_path)?;
    settings.apply_env();
    if let Some(port) = cli.port {
        settings.service.port = port;
    }

    if cli.print_config {
        print!("{}", settings.to_toml()?);
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_max_level(settings.logging.tracing_level())
        .init();

    let executor = EarthEngineClient::new(&settings.gee)
        .context("Failed to initialize Earth Engine client")?;
    let catalog =
        CatalogClient::new(&settings.catalog).context("Failed to initialize catalog client")?;

    let state = Arc::new(AppState {
        executor: Arc::new(executor),
        catalog: Arc::new(catalog),
        report_register_failures: settings.register.report_failures,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.service.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("{} listening on {}", settings.service.name, addr);
    axum::serve(listener, api::router(state))
        .await
        .context("Server error")?;

    Ok(())
}
