//! ==============================================================================
//! main.rs - heathack hub entry point
//! ==============================================================================
//!
//! purpose:
//!     the hub application. it listens to the radio bridge, keeps the last few
//!     readings of every sensor in memory, serves them to the dashboard and
//!     forwards them to the configured ingestion service.
//!
//! responsibilities:
//!     - load host.toml (or defaults) and set up logging
//!     - build the store, validation gate and publisher
//!     - start the snapshot web server in the background
//!     - run the serial read loop until the port fails or closes
//!
//! architecture:
//!
//!     ┌────────────────────────────────────────────────────────────┐
//!     │                    rust hub (this file)                     │
//!     │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//!     │  │ serial loop │  │ web server  │  │ publisher worker    │  │
//!     │  │ (ingest)    │  │ (/data)     │  │ (emoncms / hub)     │  │
//!     │  └──────┬──────┘  └──────┬──────┘  └──────────▲──────────┘  │
//!     │         │ write          │ read               │ batches     │
//!     │         ▼                ▼                    │             │
//!     │    ┌─────────────────────────┐                │             │
//!     │    │  HistoryStore (Arc)     │                │             │
//!     │    └─────────────────────────┘                │             │
//!     │         └─────────────────────────────────────┘             │
//!     └────────────────────────────────────────────────────────────┘
//!
//! ==============================================================================

use anyhow::Result;
use clap::Parser;
use heathack_hub::{
    config::HostConfig,
    ingest::Ingest,
    publish,
    registry::SensorTypeRegistry,
    server,
    store::HistoryStore,
    telemetry,
    transport,
    validation::ValidationGate,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "heathack-hub", about = "HeatHack sensor network hub")]
struct Cli {
    /// path to host.toml (default: config/host.toml or ../config/host.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // step 1: load configuration, then logging (its level comes from the config)
    let (config, source) = HostConfig::locate(cli.config.as_deref())?;
    telemetry::init(&config.logging.level)?;

    tracing::info!("HeatHack hub starting");
    match &source {
        Some(path) => tracing::info!(path = %path.display(), "configuration loaded"),
        None => tracing::warn!("no config file found - using defaults"),
    }
    config.log_summary();

    // step 2: store, gate and publisher
    let registry = SensorTypeRegistry::new(config.validation.temperature_range);
    let store = Arc::new(HistoryStore::new(config.history.depth)?);
    let publisher = publish::from_config(&config.publisher, &registry)?;
    tracing::info!(backend = publisher.name(), "publisher ready");
    let (queue, publisher_task) = publish::spawn_worker(publisher, config.publisher.queue_depth);

    let ingest = Ingest::new(store.clone(), ValidationGate::new(registry), queue)
        .show_frames(config.logging.show_frames);

    // step 3: start the web server in background
    let web_store = store.clone();
    let http = config.http.clone();
    tokio::spawn(async move {
        if let Err(e) = server::run(web_store, &http).await {
            tracing::error!(error = %format!("{:#}", e), "web server error");
        }
    });

    // step 4: serial read loop
    let reader = transport::open_serial(&config.serial)?;
    let result = transport::run_lines(reader, &ingest).await;

    // let queued batches drain before exiting
    drop(ingest);
    publisher_task.await.ok();

    match result {
        Ok(lines) => {
            tracing::info!(lines, "serial port closed");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "serial port error");
            Err(e.into())
        }
    }
}
