use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono_tz::Tz;
use reqwest::Client;

use crate::config::WeatherConfig;
use crate::errors::ForecastError;
use crate::models::forecast::Site;
use crate::models::weather::OpenMeteoResponse;

/// Resolves the local time zone and ground elevation of a coordinate.
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn resolve(&self, latitude: f64, longitude: f64) -> Result<Site, ForecastError>;
}

/// Uses Open-Meteo's `timezone=auto` lookup on a one-day forecast query.
pub struct OpenMeteoLocationResolver {
    client: Client,
    url: String,
}

impl OpenMeteoLocationResolver {
    pub fn new(cfg: &WeatherConfig) -> Result<Self, ForecastError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_s))
            .build()
            .map_err(|e| ForecastError::data_source("location", e))?;
        Ok(Self { client, url: cfg.forecast_url.clone() })
    }
}

#[async_trait]
impl LocationResolver for OpenMeteoLocationResolver {
    async fn resolve(&self, latitude: f64, longitude: f64) -> Result<Site, ForecastError> {
        let source_err = |e: reqwest::Error| ForecastError::data_source("location", e);
        let resp: OpenMeteoResponse = self
            .client
            .get(&self.url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("timezone", "auto".to_string()),
                ("hourly", "temperature_2m".to_string()),
                ("forecast_days", "1".to_string()),
            ])
            .send()
            .await
            .map_err(source_err)?
            .error_for_status()
            .map_err(source_err)?
            .json()
            .await
            .map_err(source_err)?;
        site_from_response(latitude, longitude, &resp)
    }
}

fn site_from_response(latitude: f64, longitude: f64, resp: &OpenMeteoResponse) -> Result<Site, ForecastError> {
    let name = resp
        .timezone
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ForecastError::TimezoneResolution("no timezone in response".to_string()))?;
    let tz = Tz::from_str(name)
        .map_err(|_| ForecastError::TimezoneResolution(format!("unknown timezone '{}'", name)))?;
    let elevation_m = resp
        .elevation
        .filter(|e| e.is_finite())
        .ok_or_else(|| ForecastError::ElevationResolution("no elevation in response".to_string()))?;
    tracing::info!(%tz, elevation_m, "resolved location");
    Ok(Site { latitude, longitude, tz, elevation_m })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: serde_json::Value) -> OpenMeteoResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn resolves_zone_and_elevation() {
        let resp = parse(serde_json::json!({"timezone": "Asia/Seoul", "elevation": 21.0}));
        let site = site_from_response(37.43, 126.65, &resp).unwrap();
        assert_eq!((site.latitude, site.longitude), (37.43, 126.65));
        assert_eq!(site.tz, chrono_tz::Asia::Seoul);
        assert_eq!(site.elevation_m, 21.0);
    }

    #[test]
    fn missing_timezone_fails() {
        let resp = parse(serde_json::json!({"elevation": 21.0}));
        assert!(matches!(
            site_from_response(0.0, 0.0, &resp),
            Err(ForecastError::TimezoneResolution(_))
        ));
        let resp = parse(serde_json::json!({"timezone": "Mars/Olympus", "elevation": 21.0}));
        assert!(matches!(
            site_from_response(0.0, 0.0, &resp),
            Err(ForecastError::TimezoneResolution(_))
        ));
    }

    #[test]
    fn missing_elevation_fails() {
        let resp = parse(serde_json::json!({"timezone": "UTC"}));
        assert!(matches!(
            site_from_response(0.0, 0.0, &resp),
            Err(ForecastError::ElevationResolution(_))
        ));
    }
}
