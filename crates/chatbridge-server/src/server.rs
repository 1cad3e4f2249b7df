use axum::Router;
use chatbridge_client::{Backend, HttpBackend, HttpBackendOptions};
use chatbridge_config::Settings;
use chatbridge_core::Bridge;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::routes;

pub struct ServerState {
    pub bridge: Arc<Bridge>,
}

impl ServerState {
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self { bridge }
    }

    pub fn with_backend(backend: Arc<dyn Backend>, settings: &Settings) -> Self {
        Self::new(Arc::new(Bridge::new(backend, settings)))
    }

    /// Builds the HTTP backend described by `settings`.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let mut options = HttpBackendOptions::new(settings.backend.url.clone());
        options.api_key = settings.backend.api_key.clone();
        options.timeout = Duration::from_secs(settings.backend.timeout_secs);
        options.agent = Some(settings.backend.agent.clone());
        let backend = HttpBackend::new(options)?;
        Ok(Self::with_backend(Arc::new(backend), settings))
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn app(state: Arc<ServerState>) -> Router {
    routes::router()
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let app = app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
