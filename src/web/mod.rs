//! HTTP surface: the generate endpoint, health, and the static pages.

use std::num::NonZeroU16;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{error, info, warn};

use crate::cli::StorageMode;
use crate::config::AppConfig;
use crate::storage::{DiskStorage, UploadStorage};
use crate::upstream::UpstreamClient;

mod generate;
mod prelude;
mod upload;
mod views;

use generate::generate_handler;
use views::health_handler;

#[derive(Clone, Debug)]
pub(crate) struct AppState {
    upstream: UpstreamClient,
    storage: Arc<dyn UploadStorage>,
    storage_mode: StorageMode,
}

impl AppState {
    fn new(
        upstream: UpstreamClient,
        storage: Arc<dyn UploadStorage>,
        storage_mode: StorageMode,
    ) -> Self {
        Self {
            upstream,
            storage,
            storage_mode,
        }
    }
}

fn create_router(static_dir: &Path, max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/api/generate",
            post(generate_handler).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/health", get(health_handler))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route_service(
            "/meme_generator",
            ServeFile::new(static_dir.join("meme_generator.html")),
        )
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
    }
    info!("Shutting down");
}

/// Builds the app from `config` and serves it until interrupted.
pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    config: &AppConfig,
) -> Result<(), anyhow::Error> {
    let storage: Arc<dyn UploadStorage> = Arc::new(DiskStorage::new(config.upload_dir.clone()));
    if let Err(err) = storage.prepare().await {
        warn!("{}, will retry per request", err);
    }
    if !config.upstream.has_api_key() {
        warn!("FAL_API_KEY is not set, generation requests will fail until it is");
    }

    let state = AppState::new(
        UpstreamClient::new(config.upstream.clone()),
        storage,
        config.storage,
    );
    let app = create_router(&config.static_dir, config.max_upload_bytes).with_state(state);

    let addr = format!("{}:{}", listen_addr, port);
    info!(
        "Starting server on http://{} (storage={}, uploads in {})",
        addr,
        config.storage,
        config.upload_dir.display()
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", err);
    }
    Ok(())
}
