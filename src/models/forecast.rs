use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::HorizonMode;
use crate::models::generator::GeneratorConfig;
use crate::models::weather::DailyWeather;

/// A resolved location: coordinates plus the zone and ground elevation
/// reported by the location service.
#[derive(Debug, Clone, Copy)]
pub struct Site {
    pub latitude: f64,
    pub longitude: f64,
    pub tz: Tz,
    pub elevation_m: f64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ForecastRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub generators: Vec<GeneratorConfig>,
}

/// One timestep of a generator's conversion pipeline.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HourlyRecord {
    #[schema(value_type = String, format = DateTime)]
    pub time: DateTime<Tz>,
    pub solar_azimuth_deg: f64,
    pub solar_elevation_deg: f64,
    pub horizon_elevation_deg: f64,
    pub is_night: bool,
    pub is_shaded: bool,
    pub dni_adj: f64,
    pub ghi_adj: f64,
    pub dhi_adj: f64,
    pub poa_total_w_m2: f64,
    pub cell_temp_c: f64,
    pub dc_power_w: f64,
    pub snow_factor: f64,
    pub ac_power_w: f64,
    pub energy_kwh: f64,
}

/// Power and energy only; the shape of aggregated rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct PowerRecord {
    #[schema(value_type = String, format = DateTime)]
    pub time: DateTime<Tz>,
    pub ac_power_w: f64,
    pub energy_kwh: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub energy_kwh: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GeneratorResult {
    pub name: String,
    pub total_loss_pct: f64,
    pub hourly: Vec<HourlyRecord>,
    pub daily: Vec<DailyRecord>,
    pub total_kwh: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PortfolioTotal {
    pub hourly: Vec<PowerRecord>,
    pub daily: Vec<DailyRecord>,
    pub total_kwh: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ForecastResponse {
    pub run_id: Uuid,
    pub timezone: String,
    pub elevation_m: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Set when the requested end date went past the forecast window.
    pub capped_end_date: Option<NaiveDate>,
    pub weather_daily: Vec<DailyWeather>,
    pub generators: Vec<GeneratorResult>,
    pub total: PortfolioTotal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub horizon_mode: HorizonMode,
}
