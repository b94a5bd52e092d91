//! Axum HTTP server for the REST API

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::WEBHOOK_PATH;
use crate::manager::HookManager;
use crate::{Error, Result};

use super::handlers;
use super::webhook;

/// Metrics endpoint handler
#[cfg(feature = "metrics")]
async fn metrics_handler() -> std::result::Result<String, axum::http::StatusCode> {
    crate::metrics::render().map_err(|_| axum::http::StatusCode::INTERNAL_SERVER_ERROR)
}

pub fn build_router(manager: Arc<HookManager>) -> Router {
    let webhook_path = format!("/{WEBHOOK_PATH}");

    let router: Router<Arc<HookManager>> = Router::new()
        .route("/health", get(handlers::health))
        .route(
            &format!("{webhook_path}/"),
            post(webhook::receive).get(webhook::usage),
        )
        .route(&webhook_path, post(webhook::receive).get(webhook::usage))
        .route(
            "/api/v1/hooks/config",
            get(handlers::get_config).put(handlers::put_config),
        )
        .route("/api/v1/hooks/validate", post(handlers::validate_hook_url))
        .route("/api/v1/hooks/reregister", post(handlers::reregister));

    #[cfg(feature = "metrics")]
    let router = router.route("/metrics", get(metrics_handler));

    router
        .layer(TraceLayer::new_for_http())
        .with_state(manager)
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    manager: Arc<HookManager>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    axum::serve(listener, build_router(manager))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Run the REST API server
pub async fn run_server(
    manager: Arc<HookManager>,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {}: {}", addr, e);
        Error::IoError(e)
    })?;
    info!("REST API server listening on {}", addr);
    serve(listener, manager, shutdown).await
}
