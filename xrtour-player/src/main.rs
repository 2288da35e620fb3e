//! XR Tour Player (xrtour-player) - Main entry point
//!
//! Runs the playback coordinator with the headless media backend and serves
//! the HTTP/SSE control surface.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xrtour_common::config::PlayerConfig;
use xrtour_common::permission::FilePermissionStore;

use xrtour_player::api::{self, AppContext};
use xrtour_player::events::EventBus;
use xrtour_player::media::{HeadlessAudio, HeadlessPanorama};
use xrtour_player::orientation::{
    OrientationPermissionService, OrientationPrompt, PlatformCapabilities, StaticPrompt,
};
use xrtour_player::playback::{CoordinatorParts, PlayerCoordinator};

/// Command-line arguments for xrtour-player
#[derive(Parser, Debug)]
#[command(name = "xrtour-player")]
#[command(about = "Audio / 360° video tour playback coordinator")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "XRTOUR_PORT")]
    port: Option<u16>,

    /// Path to the TOML config file
    #[arg(short, long, env = "XRTOUR_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xrtour_player=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = PlayerConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    info!(
        "Starting XR Tour Player v{} on port {}",
        env!("CARGO_PKG_VERSION"),
        config.server.port
    );
    info!(
        "{} fallback audio sources, {} catalog entries",
        config.playback.fallback_sources.len(),
        config.catalog.len()
    );

    let events = Arc::new(EventBus::new(config.server.event_capacity));

    // Headless media backend
    let (media_tx, media_rx) = mpsc::unbounded_channel();
    let audio = HeadlessAudio::new(media_tx);

    let store_path = config.orientation.resolved_store_path();
    info!("Orientation permission store: {}", store_path.display());
    let permissions = OrientationPermissionService::new(
        Arc::new(FilePermissionStore::new(store_path)),
        PlatformCapabilities::from(&config.orientation),
    );
    let prompt: Arc<dyn OrientationPrompt> = Arc::new(StaticPrompt {
        grant: config.orientation.headless_grant,
    });

    let catalog = Arc::new(config.catalog.clone());
    let bind = config.server.bind.clone();
    let port = config.server.port;

    let (coordinator, handle) = PlayerCoordinator::new(CoordinatorParts {
        audio,
        media_events: media_rx,
        surface: HeadlessPanorama::new(),
        preload: HeadlessPanorama::new(),
        permissions,
        prompt,
        config,
        events,
    })
    .context("Failed to initialize playback coordinator")?;
    info!("Session {}", coordinator.session_id());

    let coordinator_task = tokio::spawn(coordinator.run());

    let ctx = AppContext {
        handle: handle.clone(),
        catalog,
        port,
    };
    let served = api::run(&bind, ctx, shutdown_signal()).await;

    // Stop the coordinator whether or not the server exited cleanly
    if handle.shutdown().await.is_err() {
        error!("Playback coordinator had already stopped");
    }
    coordinator_task
        .await
        .context("Playback coordinator task failed")?;

    served.context("HTTP server error")?;
    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
