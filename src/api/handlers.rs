//! REST API handlers for the demand forecast
//!
//! Every forecast endpoint takes the same `?container=&hub=` selection;
//! a missing or "All" value selects everything.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::service::ForecastService;
use crate::attribution::DemandBreakdown;
use crate::prepare::DailyPoint;
use crate::report::{AccuracyView, DashboardReport, ForecastPoint, Headline};
use crate::segment::{FilterOptions, Selection};
use crate::summary::DeliverySummary;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub records: usize,
}

#[derive(Serialize)]
pub struct ForecastResponse {
    pub title: String,
    pub cutoff: Option<NaiveDate>,
    pub train: Vec<DailyPoint>,
    pub validation: Vec<DailyPoint>,
    pub forecast: Vec<ForecastPoint>,
}

#[derive(Serialize)]
pub struct AccuracyResponse {
    pub title: String,
    #[serde(flatten)]
    pub accuracy: AccuracyView,
}

#[derive(Serialize)]
pub struct BreakdownResponse {
    pub title: String,
    pub headline: Headline,
    pub breakdown: Option<DemandBreakdown>,
    pub narrative: String,
}

// ============================================================================
// Query Parameters
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SelectionQuery {
    pub container: Option<String>,
    pub hub: Option<String>,
}

impl SelectionQuery {
    fn selections(&self) -> (Selection, Selection) {
        (
            Selection::parse(self.container.as_deref()),
            Selection::parse(self.hub.as_deref()),
        )
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub type AppState = Arc<ForecastService>;
type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

async fn run_report(service: &ForecastService, params: &SelectionQuery) -> Result<DashboardReport, ApiError> {
    let (container, hub) = params.selections();
    if !service.is_known(&container, &hub) {
        return Err(error(
            StatusCode::NOT_FOUND,
            format!(
                "Unknown selection container='{}' hub='{}'. See /api/v1/filters for valid values.",
                container.label(),
                hub.label()
            ),
        ));
    }
    service
        .report(container, hub)
        .await
        .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// GET /api/v1/health
pub async fn health(State(service): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        records: service.record_count(),
    })
}

/// GET /api/v1/filters
pub async fn get_filters(State(service): State<AppState>) -> Json<FilterOptions> {
    Json(service.filter_options().clone())
}

/// GET /api/v1/summary
pub async fn get_summary(State(service): State<AppState>) -> Json<DeliverySummary> {
    Json(service.summary().await)
}

/// GET /api/v1/report?container=X&hub=Y
pub async fn get_report(
    State(service): State<AppState>,
    Query(params): Query<SelectionQuery>,
) -> Result<Json<DashboardReport>, ApiError> {
    run_report(&service, &params).await.map(Json)
}

/// GET /api/v1/forecast?container=X&hub=Y
pub async fn get_forecast(
    State(service): State<AppState>,
    Query(params): Query<SelectionQuery>,
) -> Result<Json<ForecastResponse>, ApiError> {
    let report = run_report(&service, &params).await?;
    Ok(Json(ForecastResponse {
        title: report.title,
        cutoff: report.cutoff,
        train: report.train,
        validation: report.validation,
        forecast: report.forecast,
    }))
}

/// GET /api/v1/accuracy?container=X&hub=Y
pub async fn get_accuracy(
    State(service): State<AppState>,
    Query(params): Query<SelectionQuery>,
) -> Result<Json<AccuracyResponse>, ApiError> {
    let report = run_report(&service, &params).await?;
    Ok(Json(AccuracyResponse {
        title: report.title,
        accuracy: report.accuracy,
    }))
}

/// GET /api/v1/breakdown?container=X&hub=Y
pub async fn get_breakdown(
    State(service): State<AppState>,
    Query(params): Query<SelectionQuery>,
) -> Result<Json<BreakdownResponse>, ApiError> {
    let report = run_report(&service, &params).await?;
    Ok(Json(BreakdownResponse {
        title: report.title,
        headline: report.headline,
        breakdown: report.breakdown,
        narrative: report.narrative,
    }))
}
