use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};

use crate::errors::ForecastError;
use crate::models::forecast::{ForecastRequest, ForecastResponse, HealthStatus};
use crate::models::generator::GeneratorConfig;
use crate::services::export;
use crate::shared_state::AppState;

/// GET /api/health
/// Liveness check
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is up", body = HealthStatus)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        horizon_mode: state.config.horizon.mode,
    })
}

/// GET /api/generators/default
/// Stock generator configuration
///
/// A starting point for the `generators` list of a forecast request.
#[utoipa::path(
    get,
    path = "/api/generators/default",
    responses(
        (status = 200, description = "Default generator", body = GeneratorConfig)
    )
)]
pub async fn default_generator() -> Json<GeneratorConfig> {
    Json(GeneratorConfig::default())
}

/// POST /api/forecast
/// Run a forecast
///
/// Resolves the site, stitches archive and forecast weather over the date
/// range, and returns hourly and daily output per generator plus the
/// portfolio total.
#[utoipa::path(
    post,
    path = "/api/forecast",
    request_body = ForecastRequest,
    responses(
        (status = 200, description = "Forecast result", body = ForecastResponse),
        (status = 400, description = "Invalid date range or configuration"),
        (status = 422, description = "Required data unavailable"),
        (status = 502, description = "Upstream data source failed"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn run_forecast(
    State(state): State<AppState>,
    Json(request): Json<ForecastRequest>,
) -> Result<Json<ForecastResponse>, ForecastError> {
    let response = state.forecast.run(request).await?;
    Ok(Json(response))
}

/// POST /api/forecast/export
/// Run a forecast and download it as CSV
#[utoipa::path(
    post,
    path = "/api/forecast/export",
    request_body = ForecastRequest,
    responses(
        (status = 200, description = "One CSV section per sheet", content_type = "text/csv", body = String),
        (status = 400, description = "Invalid date range or configuration"),
        (status = 502, description = "Upstream data source failed")
    )
)]
pub async fn export_forecast(
    State(state): State<AppState>,
    Json(request): Json<ForecastRequest>,
) -> Result<impl IntoResponse, ForecastError> {
    let response = state.forecast.run(request).await?;
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export::file_name(&response)),
        ),
    ];
    Ok((headers, export::to_csv(&response)))
}
