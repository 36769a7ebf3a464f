use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

use print_wear_guard::config::constants;
use print_wear_guard::{Config, MaterialCatalog, PredictionServer, PredictionService};

/// Print Wear Guard - maintenance risk scoring service for 3D print jobs.
///
/// Accepts print parameters over HTTP, scores nozzle wear and thermal stress
/// against a per-material reference catalog, and answers with prioritized
/// maintenance alerts. Critical alerts can optionally be mirrored to Discord.
///
/// # Environment Variables
///
/// All optional (with defaults):
/// * `HTTP_ADDR` - Listen address (default: "127.0.0.1:5001")
/// * `DISCORD_WEBHOOK` - Discord webhook URL for critical alerts (default: unset)
/// * `ENABLE_MAINTENANCE_MODEL` - Attach a maintenance outlook (default: "true")
/// * `CORS_ALLOWED_ORIGIN` - Allowed browser origin (default: "*")
/// * `MAX_BODY_BYTES` - Request body limit (default: "65536")
/// * `RUST_LOG` - Log level (default: "info")
///
/// # Usage
///
/// ```bash
/// export HTTP_ADDR="0.0.0.0:5001"
/// export DISCORD_WEBHOOK="https://discord.com/api/webhooks/..."
/// ./print-wear-guard
/// ```
fn main() -> Result<()> {
    // Initialize logger to output to stdout, using RUST_LOG env var or info level by default
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Stdout)
        .filter_level(
            std::env::var("RUST_LOG")
                .ok()
                .and_then(|level| level.parse().ok())
                .unwrap_or(log::LevelFilter::Info),
        )
        .init();

    let config = Config::load().context("Failed to load configuration")?;

    info!("{} starting...", constants::SERVICE_NAME);

    // A malformed catalog is a startup fault, never a request-time one
    let catalog = Arc::new(MaterialCatalog::standard().context("Material catalog is invalid")?);
    info!("Loaded material profiles: {}", catalog.keys().join(", "));

    if config.discord_webhook.is_some() {
        info!("Critical alerts will be forwarded to Discord");
    }
    info!(
        "Maintenance model {}",
        if config.maintenance_model_enabled {
            "enabled"
        } else {
            "disabled"
        }
    );

    let service = PredictionService::from_config(&config, catalog);
    let server = PredictionServer::bind(&config.http_addr, service)
        .with_context(|| format!("Failed to bind {}", config.http_addr))?;

    server.serve()?;
    Ok(())
}
