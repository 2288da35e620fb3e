//! HTTP request handlers
//!
//! Intents are forwarded to the coordinator and answered with 202 Accepted;
//! their effects show up in the snapshot and on the event stream.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;
use xrtour_common::{OrientationPermission, XrContent};

use crate::api::server::AppContext;
use crate::error::Error;
use crate::playback::Command;
use crate::state::PlayerSnapshot;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    port: u16,
    session_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    /// Seconds
    time: f64,
}

#[derive(Debug, Deserialize)]
pub struct SourceRequest {
    url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PermissionBody {
    pub status: OrientationPermission,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    entries: Vec<XrContent>,
}

type ApiResult<T> = Result<T, (StatusCode, Json<StatusResponse>)>;

fn error_response(err: Error) -> (StatusCode, Json<StatusResponse>) {
    let code = match &err {
        Error::BadRequest(_) => StatusCode::BAD_REQUEST,
        Error::CoordinatorStopped => StatusCode::SERVICE_UNAVAILABLE,
        Error::InvalidState(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if code.is_server_error() {
        warn!("Request failed: {}", err);
    }
    (
        code,
        Json(StatusResponse {
            status: format!("error: {}", err),
        }),
    )
}

/// Forward an intent to the coordinator
async fn dispatch(ctx: &AppContext, command: Command) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    debug!("Dispatching {:?}", command);
    ctx.handle.send(command).await.map_err(error_response)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(StatusResponse {
            status: "accepted".to_string(),
        }),
    ))
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    let snapshot = ctx.handle.snapshot().await;
    Json(HealthResponse {
        status: if ctx.handle.is_running() { "healthy" } else { "stopped" }.to_string(),
        module: "xrtour-player".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        port: ctx.port,
        session_id: snapshot.session_id,
    })
}

// ============================================================================
// Playback Endpoints
// ============================================================================

/// GET /playback/state
pub async fn get_state(State(ctx): State<AppContext>) -> Json<PlayerSnapshot> {
    Json(ctx.handle.snapshot().await)
}

/// POST /playback/play
pub async fn play(State(ctx): State<AppContext>) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    dispatch(&ctx, Command::Play).await
}

/// POST /playback/pause
pub async fn pause(State(ctx): State<AppContext>) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    dispatch(&ctx, Command::Pause).await
}

/// POST /playback/toggle - play/pause, or retry after terminal failure
pub async fn toggle(State(ctx): State<AppContext>) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    dispatch(&ctx, Command::TogglePlayPause).await
}

/// POST /playback/mute
pub async fn toggle_mute(
    State(ctx): State<AppContext>,
) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    dispatch(&ctx, Command::ToggleMute).await
}

/// POST /playback/seek
pub async fn seek(
    State(ctx): State<AppContext>,
    Json(req): Json<SeekRequest>,
) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    if !req.time.is_finite() {
        return Err(error_response(Error::BadRequest(
            "seek time must be a finite number".to_string(),
        )));
    }
    dispatch(&ctx, Command::Seek(req.time)).await
}

/// POST /playback/source
pub async fn select_source(
    State(ctx): State<AppContext>,
    Json(req): Json<SourceRequest>,
) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    let url = req.url.trim();
    if url.is_empty() {
        return Err(error_response(Error::BadRequest(
            "source url must not be empty".to_string(),
        )));
    }
    dispatch(&ctx, Command::SelectSource(url.to_string())).await
}

// ============================================================================
// Scene Endpoints
// ============================================================================

/// POST /slides/:index
pub async fn slide_changed(
    State(ctx): State<AppContext>,
    Path(index): Path<usize>,
) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    dispatch(&ctx, Command::SlideChanged(index)).await
}

/// POST /xr/enter
pub async fn enter_xr(State(ctx): State<AppContext>) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    dispatch(&ctx, Command::EnterXr).await
}

/// POST /xr/exit
pub async fn exit_xr(State(ctx): State<AppContext>) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    dispatch(&ctx, Command::ExitXr).await
}

/// POST /xr/recenter
pub async fn recenter(State(ctx): State<AppContext>) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    dispatch(&ctx, Command::Recenter).await
}

/// GET /catalog
pub async fn get_catalog(State(ctx): State<AppContext>) -> Json<CatalogResponse> {
    Json(CatalogResponse {
        entries: ctx.catalog.entries().to_vec(),
    })
}

// ============================================================================
// Orientation Permission Endpoints
// ============================================================================

/// GET /permission/orientation
pub async fn get_orientation_permission(State(ctx): State<AppContext>) -> Json<PermissionBody> {
    Json(PermissionBody {
        status: ctx.handle.snapshot().await.orientation_permission,
    })
}

/// POST /permission/orientation - record a prompt outcome
pub async fn record_orientation_permission(
    State(ctx): State<AppContext>,
    Json(req): Json<PermissionBody>,
) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    let granted = match req.status {
        OrientationPermission::Granted => true,
        OrientationPermission::Denied => false,
        other => {
            return Err(error_response(Error::BadRequest(format!(
                "cannot record status '{}'; expected granted or denied",
                other
            ))))
        }
    };
    dispatch(&ctx, Command::RecordPermission(granted)).await
}

/// DELETE /permission/orientation
pub async fn clear_orientation_permission(
    State(ctx): State<AppContext>,
) -> ApiResult<(StatusCode, Json<StatusResponse>)> {
    dispatch(&ctx, Command::ClearPermission).await
}
