pub mod export;
pub mod forecast_service;
pub mod generator_pipeline;
pub mod horizon;
pub mod irradiance;
pub mod location_service;
pub mod losses;
pub mod portfolio;
pub mod pv_models;
pub mod snow;
pub mod solar_position;
pub mod weather_service;
