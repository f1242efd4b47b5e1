//! Reelfeed Player - Main entry point
//!
//! Playback coordination service for the vertical short-video feed:
//! keeps per-row streaming sessions in lockstep with viewport
//! visibility, primes the next row, and serves state over HTTP/SSE.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reelfeed_player::api;
use reelfeed_player::catalog::HttpCatalog;
use reelfeed_player::config::PlayerConfig;
use reelfeed_player::playback::controller::FeedSurfaceProvider;
use reelfeed_player::playback::{FeedController, HlsEngineFactory};
use reelfeed_player::SharedState;

/// Command-line arguments for reelfeed-player
#[derive(Parser, Debug)]
#[command(name = "reelfeed-player")]
#[command(about = "Short-video feed playback service")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5760", env = "REELFEED_PORT")]
    port: u16,

    /// Base URL of the video catalog service
    #[arg(short, long, env = "REELFEED_CATALOG_URL")]
    catalog_url: Option<String>,

    /// Intersection ratio at which a row counts as in view
    #[arg(long, default_value = "0.7", env = "REELFEED_VISIBILITY_THRESHOLD")]
    visibility_threshold: f32,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reelfeed_player=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command-line arguments
    let args = Args::parse();

    let catalog_url = reelfeed_common::config::resolve_value(
        args.catalog_url.as_deref(),
        "REELFEED_CATALOG_URL",
        "catalog_url",
        "http://localhost:8000",
    );

    info!("Starting reelfeed player on port {}", args.port);
    info!("Catalog service: {}", catalog_url);

    let config = PlayerConfig {
        visibility_threshold: args.visibility_threshold,
        catalog_url: catalog_url.clone(),
        ..PlayerConfig::default()
    };

    let state = Arc::new(SharedState::new());
    let catalog = Arc::new(
        HttpCatalog::new(catalog_url.as_str()).context("Failed to build catalog client")?,
    );
    let factory = Arc::new(HlsEngineFactory::new());
    let surfaces = Arc::new(FeedSurfaceProvider);

    let controller = Arc::new(FeedController::new(
        catalog,
        factory,
        surfaces,
        config,
        Arc::clone(&state),
    ));

    // Initial feed load; a fetch failure surfaces as the error phase and
    // the service keeps running so the host can re-trigger
    controller.load().await;

    let ctx = api::AppContext {
        state,
        controller: Arc::clone(&controller),
        port: args.port,
    };

    let app = api::create_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Release every session and the preload engine before exit
    controller.shutdown().await;

    info!("Server shutdown complete");
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
