//! HTTP server setup and routing
//!
//! Sets up the Axum router with control endpoints and SSE.

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use xrtour_common::ContentCatalog;

use crate::error::{Error, Result};
use crate::playback::PlayerHandle;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub handle: PlayerHandle,
    pub catalog: Arc<ContentCatalog>,
    pub port: u16,
}

/// Build the router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health check (no prefix)
        .route("/health", get(super::handlers::health))
        .nest(
            "/api/v1",
            Router::new()
                // Playback
                .route("/playback/state", get(super::handlers::get_state))
                .route("/playback/play", post(super::handlers::play))
                .route("/playback/pause", post(super::handlers::pause))
                .route("/playback/toggle", post(super::handlers::toggle))
                .route("/playback/mute", post(super::handlers::toggle_mute))
                .route("/playback/seek", post(super::handlers::seek))
                .route("/playback/source", post(super::handlers::select_source))
                // Scene / mode
                .route("/slides/:index", post(super::handlers::slide_changed))
                .route("/xr/enter", post(super::handlers::enter_xr))
                .route("/xr/exit", post(super::handlers::exit_xr))
                .route("/xr/recenter", post(super::handlers::recenter))
                .route("/catalog", get(super::handlers::get_catalog))
                // Orientation permission
                .route(
                    "/permission/orientation",
                    get(super::handlers::get_orientation_permission)
                        .post(super::handlers::record_orientation_permission)
                        .delete(super::handlers::clear_orientation_permission),
                )
                // SSE event stream
                .route("/events", get(super::sse::event_stream)),
        )
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        // Enable CORS for browser surfaces on other origins
        .layer(CorsLayer::permissive())
}

/// Serve the API on `bind:port` until `shutdown` resolves
pub async fn run(
    bind: &str,
    ctx: AppContext,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = format!("{}:{}", bind, ctx.port);
    let app = create_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    Ok(())
}
