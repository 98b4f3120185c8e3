use axum::{routing::{get, post}, Router};

use crate::controllers::forecast_controller::{
    default_generator, export_forecast, health, run_forecast,
};
use crate::shared_state::AppState;

/// Build the `/api/*` sub-router.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health",             get(health))
        .route("/generators/default", get(default_generator))
        .route("/forecast",           post(run_forecast))
        .route("/forecast/export",    post(export_forecast))
        .with_state(state)
}
