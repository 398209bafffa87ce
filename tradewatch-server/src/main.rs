//! Tradewatch Server
//!
//! Receives blockchain event webhooks, drives trades through their
//! confirmation lifecycle and exposes an operator API.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::ConfigLoader;
use server::{build_router, run_server};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use tradewatch_core::processors::{EventProcessor, WebhookReceiver};
use tradewatch_core::rpc::RpcClient;
use tradewatch_core::storage::Stores;

/// Tradewatch - blockchain event confirmation pipeline
#[derive(Parser, Debug)]
#[command(name = "tradewatch-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./tradewatch.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting tradewatch-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = ConfigLoader::new(&args.config, args.listen);
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    let listen_addr = loaded_config.listen;

    // Open the persisted stores
    tracing::info!("Opening data directory {:?}", loaded_config.data_dir);
    let stores = Stores::open(&loaded_config.data_dir).await.map_err(|e| {
        tracing::error!("Failed to open stores: {}", e);
        e
    })?;

    // Start the event processor
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (processor, processor_handle) = EventProcessor::new(
        loaded_config.processor,
        stores.trades.clone(),
        stores.dead_letters,
        stores.ledger.clone(),
        shutdown_rx,
    );
    let processor_task = tokio::spawn(processor.run());

    // Events accepted before the last shutdown but never applied
    let requeued = processor_handle.requeue_unprocessed().await?;
    if requeued > 0 {
        tracing::info!(requeued, "Re-enqueued unprocessed events from the ledger");
    }

    let receiver = WebhookReceiver::new(
        loaded_config.webhook,
        stores.ledger.clone(),
        processor_handle.clone(),
    );
    let rpc = RpcClient::new(loaded_config.rpc);
    for network in rpc.config().networks() {
        tracing::info!(%network, "RPC endpoint configured");
    }

    // Create application state
    let state = AppState::new(receiver, processor_handle, rpc, loaded_config.admin_token);

    // Build the router
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Stop the processor once the HTTP side has drained
    let _ = shutdown_tx.send(true);
    if let Err(e) = processor_task.await {
        tracing::error!("Event processor task failed: {}", e);
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
