//! REST/SSE surface for the playback service
//!
//! The hosting view layer reports viewport intersection ratios here and
//! reads playback state back, either by polling or over the SSE stream.

pub mod handlers;
pub mod sse;

use crate::playback::FeedController;
use crate::state::SharedState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
    pub controller: Arc<FeedController>,
    /// Server port
    pub port: u16,
}

/// Create the API router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Feed container
        .route("/feed", get(handlers::get_feed))
        .route("/feed/refresh", post(handlers::refresh_feed))
        .route(
            "/feed/rows/:index/visibility",
            post(handlers::report_visibility),
        )
        .route("/feed/rows/:index/mute/toggle", post(handlers::toggle_mute))
        // Playback state
        .route("/playback/state", get(handlers::get_playback_state))
        // SSE event stream
        .route("/events", get(sse::event_stream))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
