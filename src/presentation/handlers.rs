// HTTP request handlers
use crate::application::rasterizer::{RasterError, RasterOptions, RasterResult};
use crate::application::record_view::{CaptureReport, RenderOutcome};
use crate::domain::chart::ChartSlot;
use crate::domain::graphic::VectorGraphic;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Chart pair of a device-log record
pub async fn get_charts(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Json<RenderOutcome> {
    let view = state.record_view();
    Json(view.refresh(&name).await)
}

/// Rendered SVG of one chart slot
pub async fn get_chart_svg(
    Path((name, slot)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let slot: ChartSlot = match slot.parse() {
        Ok(slot) => slot,
        Err(e) => return (StatusCode::BAD_REQUEST, e).into_response(),
    };

    let view = state.record_view();
    view.refresh(&name).await;

    match view.container(slot).graphic() {
        Some(graphic) => (
            [(header::CONTENT_TYPE, "image/svg+xml")],
            graphic.serialize(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Render the record's charts and store both snapshots on it
pub async fn create_snapshots(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Json<CaptureReport> {
    let view = state.record_view();
    let outcome = view.refresh(&name).await;
    if outcome.charts.is_empty() {
        tracing::info!("No chart to capture for {}", name);
    }
    Json(view.capture_all(&name).await)
}

/// Rasterize an SVG request body
pub async fn rasterize_svg(
    Query(options): Query<RasterOptions>,
    State(state): State<Arc<AppState>>,
    body: String,
) -> Response {
    let graphic = VectorGraphic::new(body);

    match state.rasterizer.rasterize(&graphic, &options).await {
        Ok(RasterResult::Base64(uri)) => ([(header::CONTENT_TYPE, "text/plain")], uri).into_response(),
        Ok(RasterResult::Blob(blob)) => {
            ([(header::CONTENT_TYPE, blob.mime_type)], blob.bytes).into_response()
        }
        Err(e) => {
            tracing::warn!("Rasterization failed: {}", e);
            let status = match e {
                RasterError::DecodeFailed(_)
                | RasterError::InvalidDataUri(_)
                | RasterError::InvalidDimensions { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, e.to_string()).into_response()
        }
    }
}
