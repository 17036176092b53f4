//! REST API for the container demand forecast

pub mod handlers;
pub mod service;

pub use service::ForecastService;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the REST router over a shared service.
pub fn router(service: Arc<ForecastService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(handlers::health))
        // Overview
        .route("/api/v1/filters", get(handlers::get_filters))
        .route("/api/v1/summary", get(handlers::get_summary))
        // Forecast
        .route("/api/v1/report", get(handlers::get_report))
        .route("/api/v1/forecast", get(handlers::get_forecast))
        .route("/api/v1/accuracy", get(handlers::get_accuracy))
        .route("/api/v1/breakdown", get(handlers::get_breakdown))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
