use std::sync::Arc;

use chrono::{NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;
use rayon::prelude::*;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{Config, PipelineConfig};
use crate::errors::ForecastError;
use crate::models::forecast::{ForecastRequest, ForecastResponse};
use crate::services::generator_pipeline::{run_generator, PipelineContext};
use crate::services::horizon::HorizonSource;
use crate::services::location_service::{LocationResolver, OpenMeteoLocationResolver};
use crate::services::portfolio::aggregate;
use crate::services::solar_position::SolarPositionModel;
use crate::services::weather_service::{OpenMeteoSource, WeatherSource, WeatherStitcher};

/// Top-level forecast operation: resolve the site, stitch weather, build
/// horizons, convert every generator and aggregate.
#[derive(Clone)]
pub struct ForecastService {
    location: Arc<dyn LocationResolver>,
    stitcher: WeatherStitcher,
    horizon: HorizonSource,
    pipeline: PipelineConfig,
    max_forecast_days: i64,
}

impl ForecastService {
    pub fn new(
        location: Arc<dyn LocationResolver>,
        stitcher: WeatherStitcher,
        horizon: HorizonSource,
        pipeline: PipelineConfig,
        max_forecast_days: i64,
    ) -> Self {
        Self { location, stitcher, horizon, pipeline, max_forecast_days }
    }

    pub fn from_config(cfg: &Config) -> Result<Self, ForecastError> {
        let timeout = std::time::Duration::from_secs(cfg.weather.timeout_s);
        let archive: Arc<dyn WeatherSource> = Arc::new(OpenMeteoSource::archive(&cfg.weather)?);
        let forecast: Arc<dyn WeatherSource> = Arc::new(OpenMeteoSource::forecast(&cfg.weather)?);
        Ok(Self::new(
            Arc::new(OpenMeteoLocationResolver::new(&cfg.weather)?),
            WeatherStitcher::new(archive, forecast),
            HorizonSource::from_config(&cfg.horizon, timeout)?,
            cfg.pipeline,
            cfg.weather.max_forecast_days,
        ))
    }

    pub async fn run(&self, request: ForecastRequest) -> Result<ForecastResponse, ForecastError> {
        self.run_with_clock(request, |tz| Utc::now().with_timezone(&tz).date_naive()).await
    }

    /// `today` maps the resolved zone to the local calendar date.
    pub async fn run_with_clock<F>(&self, request: ForecastRequest, today: F) -> Result<ForecastResponse, ForecastError>
    where
        F: Fn(Tz) -> NaiveDate,
    {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("forecast", %run_id);
        self.execute(run_id, request, today).instrument(span).await
    }

    async fn execute<F>(&self, run_id: Uuid, request: ForecastRequest, today: F) -> Result<ForecastResponse, ForecastError>
    where
        F: Fn(Tz) -> NaiveDate,
    {
        validate_request(&request)?;
        let ForecastRequest { latitude, longitude, start_date, end_date, generators } = request;
        tracing::info!(latitude, longitude, %start_date, %end_date, generators = generators.len(), "forecast requested");

        let site = self.location.resolve(latitude, longitude).await?;
        let (latitude, longitude) = (site.latitude, site.longitude);
        let today = today(site.tz);

        let cap = today + TimeDelta::days(self.max_forecast_days);
        let (end, capped_end_date) = if end_date > cap {
            tracing::warn!(requested = %end_date, %cap, "end date beyond forecast window, capping");
            (cap, Some(cap))
        } else {
            (end_date, None)
        };
        if end < start_date {
            return Err(ForecastError::InvalidRange { start: start_date, end });
        }

        let (weather, base_horizon) = futures_util::future::try_join(
            self.stitcher.fetch_with_today(latitude, longitude, start_date, end, site.tz, today),
            self.horizon.load(latitude, longitude),
        )
        .await?;
        if weather.hourly.is_empty() {
            return Err(ForecastError::DataUnavailable(format!(
                "no weather rows between {} and {}",
                start_date, end
            )));
        }

        tracing::debug!(tz = %weather.hourly.timezone(), rows = weather.hourly.len(), "weather ready");

        let pipeline = self.pipeline;
        let hourly = weather.hourly;
        let (results, total) = tokio::task::spawn_blocking(move || {
            let sun = SolarPositionModel::new(latitude, longitude).positions(hourly.index());
            let ctx = PipelineContext { weather: &hourly, sun: &sun, base_horizon: &base_horizon, config: pipeline };
            let results = generators
                .par_iter()
                .map(|g| run_generator(g, &ctx).map_err(|e| e.for_generator(&g.name)))
                .collect::<Result<Vec<_>, ForecastError>>()?;
            let total = aggregate(&results);
            Ok::<_, ForecastError>((results, total))
        })
        .await
        .map_err(|e| ForecastError::Internal(format!("generator worker failed: {}", e)))??;

        tracing::info!(total_kwh = total.total_kwh, "forecast complete");
        Ok(ForecastResponse {
            run_id,
            timezone: site.tz.name().to_string(),
            elevation_m: site.elevation_m,
            start_date,
            end_date: end,
            capped_end_date,
            weather_daily: weather.daily,
            generators: results,
            total,
        })
    }
}

fn validate_request(request: &ForecastRequest) -> Result<(), ForecastError> {
    if request.generators.is_empty() {
        return Err(ForecastError::Configuration("at least one generator is required".to_string()));
    }
    if !(-90.0..=90.0).contains(&request.latitude) || !(-180.0..=180.0).contains(&request.longitude) {
        return Err(ForecastError::Configuration(format!(
            "coordinates out of range: {}, {}",
            request.latitude, request.longitude
        )));
    }
    if request.end_date < request.start_date {
        return Err(ForecastError::InvalidRange { start: request.start_date, end: request.end_date });
    }
    Ok(())
}
