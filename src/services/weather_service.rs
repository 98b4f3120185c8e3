use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeDelta};
use chrono_tz::Tz;
use reqwest::Client;

use crate::config::WeatherConfig;
use crate::errors::ForecastError;
use crate::models::weather::{concat_daily, DailyWeather, OpenMeteoResponse, WeatherField, WeatherSeries};

const DAILY_VARIABLES: &str = "weather_code,temperature_2m_min,temperature_2m_max";

/// Hourly table plus the calendar-daily summary returned by one source.
#[derive(Debug, Clone)]
pub struct WeatherBatch {
    pub hourly: WeatherSeries,
    pub daily: Vec<DailyWeather>,
}

/// A provider of hourly weather over an inclusive local date range.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
        tz: Tz,
    ) -> Result<WeatherBatch, ForecastError>;
}

/// Open-Meteo archive or forecast endpoint.
pub struct OpenMeteoSource {
    name: &'static str,
    client: Client,
    url: String,
}

impl OpenMeteoSource {
    fn new(name: &'static str, url: &str, timeout: Duration) -> Result<Self, ForecastError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ForecastError::data_source(name, e))?;
        Ok(Self { name, client, url: url.to_string() })
    }

    pub fn archive(cfg: &WeatherConfig) -> Result<Self, ForecastError> {
        Self::new("archive", &cfg.archive_url, Duration::from_secs(cfg.timeout_s))
    }

    pub fn forecast(cfg: &WeatherConfig) -> Result<Self, ForecastError> {
        Self::new("forecast", &cfg.forecast_url, Duration::from_secs(cfg.timeout_s))
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoSource {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
        tz: Tz,
    ) -> Result<WeatherBatch, ForecastError> {
        tracing::info!(source = self.name, %start, %end, "fetching weather");
        let source_err = |e: reqwest::Error| ForecastError::data_source(self.name, e);
        let resp: OpenMeteoResponse = self
            .client
            .get(&self.url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("start_date", start.format("%Y-%m-%d").to_string()),
                ("end_date", end.format("%Y-%m-%d").to_string()),
                ("hourly", WeatherField::hourly_query()),
                ("daily", DAILY_VARIABLES.to_string()),
                ("timezone", tz.name().to_string()),
            ])
            .send()
            .await
            .map_err(source_err)?
            .error_for_status()
            .map_err(source_err)?
            .json()
            .await
            .map_err(source_err)?;

        Ok(WeatherBatch { hourly: resp.hourly_series(tz), daily: resp.daily_summary() })
    }
}

/// Date sub-ranges served by each source for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StitchPlan {
    pub archive: Option<(NaiveDate, NaiveDate)>,
    pub forecast: Option<(NaiveDate, NaiveDate)>,
}

impl StitchPlan {
    /// Days up to yesterday (local) come from the archive, today onward from
    /// the forecast.
    pub fn new(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Result<Self, ForecastError> {
        if end < start {
            return Err(ForecastError::InvalidRange { start, end });
        }
        let boundary = today - TimeDelta::days(1);
        let archive_end = end.min(boundary);
        let forecast_start = start.max(today);
        Ok(Self {
            archive: (start <= archive_end).then_some((start, archive_end)),
            forecast: (forecast_start <= end).then_some((forecast_start, end)),
        })
    }
}

/// Joins archive and forecast data into one continuous series.
#[derive(Clone)]
pub struct WeatherStitcher {
    archive: Arc<dyn WeatherSource>,
    forecast: Arc<dyn WeatherSource>,
}

impl WeatherStitcher {
    pub fn new(archive: Arc<dyn WeatherSource>, forecast: Arc<dyn WeatherSource>) -> Self {
        Self { archive, forecast }
    }

    /// Both fetches run concurrently. The merge is archive first, forecast
    /// second, so the forecast wins any timestamp both report, whatever the
    /// completion order.
    pub async fn fetch_with_today(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
        tz: Tz,
        today: NaiveDate,
    ) -> Result<WeatherBatch, ForecastError> {
        let plan = StitchPlan::new(start, end, today)?;
        tracing::debug!(?plan, %today, "weather stitch plan");

        let run = |source: &Arc<dyn WeatherSource>, range: Option<(NaiveDate, NaiveDate)>| {
            let source = Arc::clone(source);
            async move {
                match range {
                    Some((s, e)) => source.fetch(latitude, longitude, s, e, tz).await.map(Some),
                    None => {
                        tracing::debug!(source = source.name(), "not needed for this range");
                        Ok(None)
                    }
                }
            }
        };
        let (archive, forecast) = futures_util::future::try_join(
            run(&self.archive, plan.archive),
            run(&self.forecast, plan.forecast),
        )
        .await?;

        let mut hourly_parts = Vec::new();
        let mut daily_parts = Vec::new();
        for batch in [archive, forecast].into_iter().flatten() {
            if !batch.hourly.is_empty() {
                hourly_parts.push(batch.hourly);
            }
            if !batch.daily.is_empty() {
                daily_parts.push(batch.daily);
            }
        }

        let hourly = WeatherSeries::concat(tz, hourly_parts);
        tracing::info!(rows = hourly.len(), "stitched weather series");
        Ok(WeatherBatch { hourly, daily: concat_daily(daily_parts) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};
    use chrono_tz::Asia::Seoul;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    struct FakeSource {
        name: &'static str,
        ghi: f64,
        extra_day: Option<NaiveDate>,
        calls: Mutex<Vec<(NaiveDate, NaiveDate)>>,
        fail: bool,
        /// Scheduler yields before answering, to delay completion.
        yields: usize,
        finished: Arc<Mutex<Vec<&'static str>>>,
    }

    impl FakeSource {
        fn new(name: &'static str, ghi: f64) -> Self {
            Self {
                name,
                ghi,
                extra_day: None,
                calls: Mutex::new(Vec::new()),
                fail: false,
                yields: 0,
                finished: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn calls(&self) -> Vec<(NaiveDate, NaiveDate)> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn noon(tz: Tz, d: NaiveDate) -> DateTime<Tz> {
        tz.from_local_datetime(&d.and_hms_opt(12, 0, 0).unwrap()).unwrap()
    }

    #[async_trait]
    impl WeatherSource for FakeSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self, _lat: f64, _lon: f64, start: NaiveDate, end: NaiveDate, tz: Tz) -> Result<WeatherBatch, ForecastError> {
            self.calls.lock().unwrap().push((start, end));
            for _ in 0..self.yields {
                tokio::task::yield_now().await;
            }
            self.finished.lock().unwrap().push(self.name);
            if self.fail {
                return Err(ForecastError::data_source(self.name, "boom"));
            }
            let days: Vec<NaiveDate> = start.iter_days().take_while(|d| *d <= end).chain(self.extra_day).collect();
            let rows = days.iter().map(|d| {
                (noon(tz, *d), BTreeMap::from([(WeatherField::ShortwaveRadiation, Some(self.ghi))]))
            });
            let daily = days
                .iter()
                .map(|d| DailyWeather { date: *d, weather_code: Some(self.ghi), temperature_2m_min: None, temperature_2m_max: None })
                .collect();
            Ok(WeatherBatch { hourly: WeatherSeries::from_rows(tz, rows), daily })
        }
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn stitcher(a: &Arc<FakeSource>, f: &Arc<FakeSource>) -> WeatherStitcher {
        WeatherStitcher::new(a.clone() as Arc<dyn WeatherSource>, f.clone() as Arc<dyn WeatherSource>)
    }

    #[test]
    fn plan_splits_at_yesterday() {
        let plan = StitchPlan::new(date(6, 1), date(6, 20), date(6, 10)).unwrap();
        assert_eq!(plan.archive, Some((date(6, 1), date(6, 9))));
        assert_eq!(plan.forecast, Some((date(6, 10), date(6, 20))));
    }

    #[test]
    fn plan_rejects_reversed_range() {
        let err = StitchPlan::new(date(6, 5), date(6, 1), date(6, 10)).unwrap_err();
        assert!(matches!(err, ForecastError::InvalidRange { .. }));
    }

    #[tokio::test]
    async fn past_range_uses_archive_only() {
        let archive = Arc::new(FakeSource::new("archive", 1.0));
        let forecast = Arc::new(FakeSource::new("forecast", 2.0));
        let batch = stitcher(&archive, &forecast)
            .fetch_with_today(0.0, 0.0, date(6, 1), date(6, 3), Seoul, date(6, 10))
            .await
            .unwrap();
        assert_eq!(archive.calls(), vec![(date(6, 1), date(6, 3))]);
        assert!(forecast.calls().is_empty());
        assert_eq!(batch.hourly.len(), 3);
    }

    #[tokio::test]
    async fn future_range_uses_forecast_only() {
        let archive = Arc::new(FakeSource::new("archive", 1.0));
        let forecast = Arc::new(FakeSource::new("forecast", 2.0));
        stitcher(&archive, &forecast)
            .fetch_with_today(0.0, 0.0, date(6, 10), date(6, 12), Seoul, date(6, 10))
            .await
            .unwrap();
        assert!(archive.calls().is_empty());
        assert_eq!(forecast.calls(), vec![(date(6, 10), date(6, 12))]);
    }

    #[tokio::test]
    async fn overlapping_timestamp_keeps_forecast_value() {
        // The archive leaks a row for "today"; the forecast must win it.
        let mut archive = FakeSource::new("archive", 1.0);
        archive.extra_day = Some(date(6, 10));
        let archive = Arc::new(archive);
        let forecast = Arc::new(FakeSource::new("forecast", 2.0));
        let batch = stitcher(&archive, &forecast)
            .fetch_with_today(0.0, 0.0, date(6, 8), date(6, 11), Seoul, date(6, 10))
            .await
            .unwrap();

        assert_eq!(batch.hourly.len(), 4);
        let ghi = batch.hourly.require(WeatherField::ShortwaveRadiation).unwrap();
        assert_eq!(ghi, vec![1.0, 1.0, 2.0, 2.0]);
        let idx = batch.hourly.index();
        assert!(idx.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(batch.daily.len(), 4);
        assert_eq!(batch.daily[2].weather_code, Some(2.0));
    }

    #[tokio::test]
    async fn forecast_wins_when_archive_finishes_last() {
        let finished = Arc::new(Mutex::new(Vec::new()));
        let mut archive = FakeSource::new("archive", 1.0);
        archive.extra_day = Some(date(6, 10));
        archive.yields = 50;
        archive.finished = finished.clone();
        let mut forecast = FakeSource::new("forecast", 2.0);
        forecast.finished = finished.clone();
        let (archive, forecast) = (Arc::new(archive), Arc::new(forecast));

        let batch = stitcher(&archive, &forecast)
            .fetch_with_today(0.0, 0.0, date(6, 8), date(6, 11), Seoul, date(6, 10))
            .await
            .unwrap();

        assert_eq!(*finished.lock().unwrap(), vec!["forecast", "archive"]);
        let ghi = batch.hourly.require(WeatherField::ShortwaveRadiation).unwrap();
        assert_eq!(ghi, vec![1.0, 1.0, 2.0, 2.0]);
        assert_eq!(batch.daily[2].weather_code, Some(2.0));
    }

    #[tokio::test]
    async fn source_failure_names_the_source() {
        let archive = Arc::new(FakeSource::new("archive", 1.0));
        let mut forecast = FakeSource::new("forecast", 2.0);
        forecast.fail = true;
        let forecast = Arc::new(forecast);
        let err = stitcher(&archive, &forecast)
            .fetch_with_today(0.0, 0.0, date(6, 8), date(6, 11), Seoul, date(6, 10))
            .await
            .unwrap_err();
        match err {
            ForecastError::DataSource { source_name, .. } => assert_eq!(source_name, "forecast"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
