// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dataset_builder::ChartDatasetBuilder;
use crate::application::field_store::LogNotifier;
use crate::application::rasterizer::VectorRasterizer;
use crate::application::snapshot_service::SnapshotCapture;
use crate::infrastructure::config::load_service_config;
use crate::infrastructure::frappe_client::FrappeClient;
use crate::infrastructure::svg_renderer::SvgChartRenderer;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    create_snapshots, get_chart_svg, get_charts, health_check, rasterize_svg,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_service_config()?;

    // Backend adapter serves both as sensor source and field store
    let client = Arc::new(FrappeClient::new(&config.backend));

    // Create services (application layer)
    let rasterizer = Arc::new(VectorRasterizer::new());
    let capture = Arc::new(SnapshotCapture::new(
        rasterizer.clone(),
        client.clone(),
        Arc::new(LogNotifier),
        config.snapshot.settings(),
    ));

    // Create application state
    let state = Arc::new(AppState {
        source: client,
        builder: ChartDatasetBuilder::new(config.charts.max_sensors, config.charts.scaling()),
        renderer: Arc::new(SvgChartRenderer::new(config.charts.width, config.charts.height)),
        capture,
        rasterizer,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/device-logs/:name/charts", get(get_charts))
        .route("/device-logs/:name/charts/:slot", get(get_chart_svg))
        .route("/device-logs/:name/snapshots", post(create_snapshots))
        .route("/rasterize", post(rasterize_svg))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!("Starting devicelog-charts service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
