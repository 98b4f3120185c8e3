use std::sync::Arc;

use crate::config::Config;
use crate::errors::ForecastError;
use crate::services::forecast_service::ForecastService;

/// Read-only state shared by all handlers. Every forecast run takes its
/// generator configuration from the request, so nothing here is mutated
/// after start-up.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub forecast: Arc<ForecastService>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ForecastError> {
        let forecast = ForecastService::from_config(&config)?;
        Ok(Self { config: Arc::new(config), forecast: Arc::new(forecast) })
    }
}
