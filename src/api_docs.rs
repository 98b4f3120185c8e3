use utoipa::OpenApi;
use crate::config;
use crate::controllers::forecast_controller;
use crate::models::{forecast, generator, weather};

#[derive(OpenApi)]
#[openapi(
    paths(
        forecast_controller::health,
        forecast_controller::default_generator,
        forecast_controller::run_forecast,
        forecast_controller::export_forecast
    ),
    components(
        schemas(
            forecast::ForecastRequest,
            forecast::ForecastResponse,
            forecast::GeneratorResult,
            forecast::HourlyRecord,
            forecast::PowerRecord,
            forecast::DailyRecord,
            forecast::PortfolioTotal,
            forecast::HealthStatus,
            generator::GeneratorConfig,
            generator::Obstacle,
            generator::LossSetting,
            generator::FaceType,
            weather::DailyWeather,
            config::HorizonMode
        )
    ),
    tags(
        (name = "pv-forecast", description = "PV generator energy forecast API")
    )
)]
pub struct ApiDoc;
