//! HTTP API for toyledger.
//!
//! Routes:
//!
//! - `GET  /health`
//! - `GET  /api/users`
//! - `GET  /api/records/:user_id` records newest first
//! - `POST /api/records/:user_id` multipart upload
//! - `GET  /api/records/:user_id/months` records grouped by month
//! - `GET  /uploads/*` stored photo files

mod error;
mod handlers;

use std::path::Path;
use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;

use crate::config::{Config, ServerConfig};
use crate::error::Result;
use crate::ingest::Ingestor;
use crate::storage::{self, RecordStore, UPLOADS_PREFIX};

pub use error::ApiError;
pub use handlers::UploadResponse;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    store: Arc<dyn RecordStore>,
    ingestor: Arc<Ingestor>,
    max_upload_bytes: usize,
}

impl AppState {
    /// Bundle a store and an ingestor.
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, ingestor: Ingestor) -> Self {
        Self {
            store,
            ingestor: Arc::new(ingestor),
            max_upload_bytes: ServerConfig::default().max_upload_bytes,
        }
    }
}

/// Build the application router.
pub fn router(mut state: AppState, server: &ServerConfig, upload_dir: &Path) -> Router {
    state.max_upload_bytes = server.max_upload_bytes;
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/users", get(handlers::list_users))
        .route(
            "/api/records/:user_id",
            get(handlers::list_records).post(handlers::upload_records),
        )
        .route("/api/records/:user_id/months", get(handlers::list_months))
        .nest_service(UPLOADS_PREFIX, ServeDir::new(upload_dir))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Open the configured store and serve the API until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or the listener cannot
/// be bound.
pub async fn serve(config: &Config) -> Result<()> {
    let store = storage::open_store(config)?;
    let state = AppState::new(store, Ingestor::new(config));
    let app = router(state, &config.server, &config.upload_dir());

    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(
        backend = %config.storage.backend,
        "API listening on http://{}",
        listener.local_addr()?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
