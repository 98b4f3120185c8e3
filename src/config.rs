use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

fn default_pvgis_url() -> String { "https://re.jrc.ec.europa.eu/api/printhorizon".to_string() }
fn default_horizon_csv_path() -> String { "horizonprofile.csv".to_string() }
fn default_forecast_url() -> String { "https://api.open-meteo.com/v1/forecast".to_string() }
fn default_archive_url() -> String { "https://archive-api.open-meteo.com/v1/archive".to_string() }
fn default_timeout_s() -> u64 { 30 }
fn default_max_forecast_days() -> i64 { 15 }
fn default_true() -> bool { true }
fn default_snow_threshold() -> f64 { 0.5 }
fn default_snow_loss() -> f64 { 0.4 }
fn default_snow_recovery_days() -> f64 { 2.0 }

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub horizon: HorizonConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HorizonMode {
    #[default]
    Pvgis,
    Csv,
    Flat,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HorizonConfig {
    #[serde(default)]
    pub mode: HorizonMode,
    #[serde(default = "default_horizon_csv_path")]
    pub csv_path: String,
    #[serde(default = "default_pvgis_url")]
    pub pvgis_url: String,
}

impl Default for HorizonConfig {
    fn default() -> Self {
        Self {
            mode: HorizonMode::default(),
            csv_path: default_horizon_csv_path(),
            pvgis_url: default_pvgis_url(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,
    #[serde(default = "default_archive_url")]
    pub archive_url: String,
    #[serde(default = "default_timeout_s")]
    pub timeout_s: u64,
    /// Open-Meteo only serves 16 forecast days (today included).
    #[serde(default = "default_max_forecast_days")]
    pub max_forecast_days: i64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            forecast_url: default_forecast_url(),
            archive_url: default_archive_url(),
            timeout_s: default_timeout_s(),
            max_forecast_days: default_max_forecast_days(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, ToSchema)]
pub struct SnowConfig {
    #[serde(default = "default_snow_threshold")]
    pub threshold_mm_per_h: f64,
    #[serde(default = "default_snow_loss")]
    pub loss_on_event: f64,
    #[serde(default = "default_snow_recovery_days")]
    pub recovery_days: f64,
}

impl Default for SnowConfig {
    fn default() -> Self {
        Self {
            threshold_mm_per_h: default_snow_threshold(),
            loss_on_event: default_snow_loss(),
            recovery_days: default_snow_recovery_days(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, ToSchema)]
pub struct PipelineConfig {
    /// Clamp GHI to DHI whenever the adjusted beam is zero.
    #[serde(default = "default_true")]
    pub adjust_ghi_when_dni_blocked: bool,
    #[serde(default)]
    pub snow: SnowConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            adjust_ghi_when_dni_blocked: true,
            snow: SnowConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        let snow = &self.pipeline.snow;
        if !(0.0..=1.0).contains(&snow.loss_on_event) {
            return Err(format!("pipeline.snow.loss_on_event must be in [0, 1], got {}", snow.loss_on_event));
        }
        if snow.recovery_days < 0.0 {
            return Err(format!("pipeline.snow.recovery_days must be >= 0, got {}", snow.recovery_days));
        }
        if self.weather.max_forecast_days < 0 {
            return Err("weather.max_forecast_days must be >= 0".to_string());
        }
        Ok(())
    }
}
