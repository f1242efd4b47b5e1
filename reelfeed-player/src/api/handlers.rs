//! Request handlers for the playback API

use crate::api::AppContext;
use crate::error::Error;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use reelfeed_common::model::{FeedItem, FeedPhase};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// GET /health
pub async fn health(State(ctx): State<AppContext>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "reelfeed-player",
        "version": env!("CARGO_PKG_VERSION"),
        "port": ctx.port,
    }))
}

/// Feed container snapshot
#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub phase: FeedPhase,
    pub items: Vec<FeedItem>,
    pub current_index: Option<usize>,
}

/// GET /feed
pub async fn get_feed(State(ctx): State<AppContext>) -> Json<FeedResponse> {
    let phase = ctx.state.get_feed_phase().await;
    let items = ctx.state.get_items().await;
    let current_index = ctx.state.get_current_row().await.map(|row| row.index);

    Json(FeedResponse {
        phase,
        items,
        current_index,
    })
}

/// POST /feed/refresh
pub async fn refresh_feed(State(ctx): State<AppContext>) -> Json<serde_json::Value> {
    debug!("feed refresh requested");
    ctx.controller.refresh().await;
    let phase = ctx.state.get_feed_phase().await;
    Json(json!({ "phase": phase }))
}

/// POST /feed/rows/:index/visibility
#[derive(Debug, Deserialize)]
pub struct VisibilityReport {
    /// Intersection ratio of the row against the viewport, 0.0..=1.0
    pub ratio: f32,
}

pub async fn report_visibility(
    State(ctx): State<AppContext>,
    Path(index): Path<usize>,
    Json(report): Json<VisibilityReport>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    match ctx.controller.report_visibility(index, report.ratio).await {
        Ok(()) => Ok(Json(json!({ "ok": true }))),
        Err(e) => Err(error_response(e)),
    }
}

/// POST /feed/rows/:index/mute/toggle
pub async fn toggle_mute(
    State(ctx): State<AppContext>,
    Path(index): Path<usize>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    match ctx.controller.toggle_mute(index).await {
        Ok(()) => Ok(Json(json!({ "ok": true }))),
        Err(e) => Err(error_response(e)),
    }
}

/// GET /playback/state
pub async fn get_playback_state(State(ctx): State<AppContext>) -> Json<serde_json::Value> {
    let rows = ctx.controller.row_statuses().await;
    Json(json!({ "rows": rows }))
}

fn error_response(error: Error) -> (StatusCode, Json<serde_json::Value>) {
    let status = match &error {
        Error::RowOutOfBounds(_) => StatusCode::NOT_FOUND,
        Error::InvalidState(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": error.to_string() })))
}
