//! Listing service (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!   Client Request
//!   ──────────────▶ request id ─▶ trace ─▶ admission ─▶ validation ─▶ handler
//!                                  (client key,     (sanitize,       │
//!                                   fixed window)    field rules)    ▼
//!                                                            ┌───────────────┐
//!                                                            │ record store  │
//!                                                            │ object store  │
//!                                                            │ notifier      │
//!                                                            └───────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use listing_guard::config::{load_config, loader::apply_env_overrides, loader::STORAGE_KEY_ENV};
use listing_guard::http::HttpServer;
use listing_guard::lifecycle::{signals::shutdown_on_signal, Shutdown};
use listing_guard::observability::{logging::init_logging, metrics::init_metrics};
use listing_guard::ServiceConfig;

#[derive(Parser)]
#[command(name = "listing-guard")]
#[command(about = "Property listing backend with admission control", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };
    apply_env_overrides(&mut config, std::env::var(STORAGE_KEY_ENV).ok());
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability);
    tracing::info!("listing-guard v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        forms_limit = config.limits.forms.max_requests,
        forms_window_ms = config.limits.forms.window_ms,
        api_limit = config.limits.api.max_requests,
        api_window_ms = config.limits.api.window_ms,
        uploads_enabled = config.storage.service_key.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_shutdown = shutdown.subscribe();
    let mut server_task = tokio::spawn(server.run(listener, server_shutdown));

    let finished_early = tokio::select! {
        _ = shutdown_on_signal(&shutdown) => None,
        result = &mut server_task => Some(result),
    };
    match finished_early {
        Some(result) => result??,
        None => server_task.await??,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
