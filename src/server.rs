//! ==============================================================================
//! server.rs - snapshot web server
//! ==============================================================================
//!
//! routes:
//! ```text
//! GET /data    -> SnapshotView as json (the front-end polls this every few seconds)
//! GET /health  -> {"status":"ok"}
//! GET /*       -> files from http.static_dir, when configured
//! ```
//!
//! the server only ever reads the store; ingest.rs is the only writer.
//!
//! ==============================================================================

use crate::config::HttpConfig;
use crate::snapshot::{self, SnapshotView};
use crate::store::HistoryStore;
use anyhow::{Context, Result};
use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

pub fn router(store: Arc<HistoryStore>, cfg: &HttpConfig) -> Router {
    let mut app = Router::new()
        .route("/data", get(data_handler))
        .route("/health", get(health_handler));

    if let Some(dir) = &cfg.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(CorsLayer::permissive()).with_state(store)
}

pub async fn run(store: Arc<HistoryStore>, cfg: &HttpConfig) -> Result<()> {
    let app = router(store, cfg);
    let listener = tokio::net::TcpListener::bind(&cfg.bind)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind))?;
    tracing::info!(addr = %cfg.bind, "snapshot server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// json snapshot of every node and sensor
pub async fn data_handler(State(store): State<Arc<HistoryStore>>) -> Json<SnapshotView> {
    Json(snapshot::snapshot(&store, Utc::now()))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
