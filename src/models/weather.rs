use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ForecastError;

// ─── Hourly columns ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WeatherField {
    Temperature2m,
    WindSpeed10m,
    ShortwaveRadiation,
    DirectNormalIrradiance,
    DiffuseRadiation,
    Snowfall,
    WeatherCode,
}

impl WeatherField {
    pub const ALL: [WeatherField; 7] = [
        WeatherField::Temperature2m,
        WeatherField::WindSpeed10m,
        WeatherField::ShortwaveRadiation,
        WeatherField::DirectNormalIrradiance,
        WeatherField::DiffuseRadiation,
        WeatherField::Snowfall,
        WeatherField::WeatherCode,
    ];

    /// Variable name used by Open-Meteo.
    pub fn api_name(self) -> &'static str {
        match self {
            WeatherField::Temperature2m => "temperature_2m",
            WeatherField::WindSpeed10m => "wind_speed_10m",
            WeatherField::ShortwaveRadiation => "shortwave_radiation",
            WeatherField::DirectNormalIrradiance => "direct_normal_irradiance",
            WeatherField::DiffuseRadiation => "diffuse_radiation",
            WeatherField::Snowfall => "snowfall",
            WeatherField::WeatherCode => "weather_code",
        }
    }

    /// Alternative spellings accepted when reading a response.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            WeatherField::Temperature2m => &["temperature2m"],
            WeatherField::WindSpeed10m => &["windspeed_10m", "windspeed10m"],
            WeatherField::ShortwaveRadiation => &["shortwaveradiation"],
            WeatherField::DirectNormalIrradiance => &["directnormalirradiance"],
            WeatherField::DiffuseRadiation => &["diffuseradiation"],
            WeatherField::Snowfall => &[],
            WeatherField::WeatherCode => &["weathercode"],
        }
    }

    pub fn hourly_query() -> String {
        Self::ALL.iter().map(|f| f.api_name()).collect::<Vec<_>>().join(",")
    }
}

/// Hourly weather table indexed by local, timezone-aware timestamps.
///
/// The index is strictly increasing; every column has one entry per
/// timestamp, `None` where the source reported null.
#[derive(Debug, Clone)]
pub struct WeatherSeries {
    tz: Tz,
    index: Vec<DateTime<Tz>>,
    columns: BTreeMap<WeatherField, Vec<Option<f64>>>,
}

impl WeatherSeries {
    pub fn empty(tz: Tz) -> Self {
        Self { tz, index: Vec::new(), columns: BTreeMap::new() }
    }

    /// Builds a series from unordered rows. Later rows with the same
    /// timestamp replace earlier ones.
    pub fn from_rows<I>(tz: Tz, rows: I) -> Self
    where
        I: IntoIterator<Item = (DateTime<Tz>, BTreeMap<WeatherField, Option<f64>>)>,
    {
        let mut by_time: BTreeMap<DateTime<Tz>, BTreeMap<WeatherField, Option<f64>>> = BTreeMap::new();
        let mut fields: BTreeSet<WeatherField> = BTreeSet::new();
        for (t, values) in rows {
            fields.extend(values.keys().copied());
            by_time.insert(t, values);
        }

        let mut columns: BTreeMap<WeatherField, Vec<Option<f64>>> = fields
            .iter()
            .map(|f| (*f, Vec::with_capacity(by_time.len())))
            .collect();
        let mut index = Vec::with_capacity(by_time.len());
        for (t, values) in by_time {
            index.push(t);
            for (field, column) in columns.iter_mut() {
                column.push(values.get(field).copied().flatten());
            }
        }
        Self { tz, index, columns }
    }

    /// Concatenates partitions in order, sorts by time and keeps the last
    /// row seen for every duplicated timestamp.
    pub fn concat(tz: Tz, parts: Vec<WeatherSeries>) -> Self {
        Self::from_rows(tz, parts.into_iter().flat_map(|p| p.into_rows()))
    }

    fn into_rows(self) -> Vec<(DateTime<Tz>, BTreeMap<WeatherField, Option<f64>>)> {
        let WeatherSeries { index, columns, .. } = self;
        index
            .into_iter()
            .enumerate()
            .map(|(i, t)| {
                let values = columns.iter().map(|(f, col)| (*f, col[i])).collect();
                (t, values)
            })
            .collect()
    }

    pub fn timezone(&self) -> Tz { self.tz }

    pub fn index(&self) -> &[DateTime<Tz>] { &self.index }

    pub fn len(&self) -> usize { self.index.len() }

    pub fn is_empty(&self) -> bool { self.index.is_empty() }

    pub fn column(&self, field: WeatherField) -> Option<&[Option<f64>]> {
        self.columns.get(&field).map(|c| c.as_slice())
    }

    /// A required column as floats; null entries become NaN.
    pub fn require(&self, field: WeatherField) -> Result<Vec<f64>, ForecastError> {
        self.column(field)
            .map(|col| col.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
            .ok_or_else(|| {
                ForecastError::DataUnavailable(format!(
                    "weather column '{}' is missing",
                    field.api_name()
                ))
            })
    }
}

// ─── Daily summary ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyWeather {
    pub date: NaiveDate,
    pub weather_code: Option<f64>,
    pub temperature_2m_min: Option<f64>,
    pub temperature_2m_max: Option<f64>,
}

/// Same precedence as the hourly merge: the last partition wins per date.
pub fn concat_daily(parts: Vec<Vec<DailyWeather>>) -> Vec<DailyWeather> {
    let mut by_date: BTreeMap<NaiveDate, DailyWeather> = BTreeMap::new();
    for day in parts.into_iter().flatten() {
        by_date.insert(day.date, day);
    }
    by_date.into_values().collect()
}

// ─── Open-Meteo wire types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OpenMeteoResponse {
    pub timezone: Option<String>,
    pub elevation: Option<f64>,
    #[serde(default)]
    pub hourly: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    pub daily: Option<BTreeMap<String, serde_json::Value>>,
}

fn numeric_array(value: &serde_json::Value) -> Vec<Option<f64>> {
    value
        .as_array()
        .map(|a| a.iter().map(|v| v.as_f64()).collect())
        .unwrap_or_default()
}

fn string_array(value: Option<&serde_json::Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

/// Localises an Open-Meteo wall-clock timestamp. Ambiguous times (DST
/// fall-back) resolve to the earlier instant; non-existent ones yield `None`.
pub fn localize(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive).earliest()
}

impl OpenMeteoResponse {
    pub fn hourly_series(&self, tz: Tz) -> WeatherSeries {
        let Some(hourly) = &self.hourly else {
            return WeatherSeries::empty(tz);
        };
        let times = string_array(hourly.get("time"));

        let mut columns: Vec<(WeatherField, Vec<Option<f64>>)> = Vec::new();
        for field in WeatherField::ALL {
            let raw = std::iter::once(field.api_name())
                .chain(field.aliases().iter().copied())
                .find_map(|name| hourly.get(name));
            if let Some(raw) = raw {
                columns.push((field, numeric_array(raw)));
            }
        }

        let mut rows = Vec::with_capacity(times.len());
        for (i, raw_time) in times.iter().enumerate() {
            let Ok(naive) = NaiveDateTime::parse_from_str(raw_time, "%Y-%m-%dT%H:%M") else {
                tracing::warn!(time = %raw_time, "skipping unparseable weather timestamp");
                continue;
            };
            let Some(t) = localize(tz, naive) else {
                tracing::warn!(time = %raw_time, tz = %tz, "skipping non-existent local time");
                continue;
            };
            let values = columns
                .iter()
                .map(|(f, col)| (*f, col.get(i).copied().flatten()))
                .collect();
            rows.push((t, values));
        }
        WeatherSeries::from_rows(tz, rows)
    }

    pub fn daily_summary(&self) -> Vec<DailyWeather> {
        let Some(daily) = &self.daily else {
            return Vec::new();
        };
        let dates = string_array(daily.get("time"));
        let column = |name: &str| daily.get(name).map(numeric_array).unwrap_or_default();
        let codes = column("weather_code");
        let t_min = column("temperature_2m_min");
        let t_max = column("temperature_2m_max");

        dates
            .iter()
            .enumerate()
            .filter_map(|(i, d)| {
                let date = NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()?;
                Some(DailyWeather {
                    date,
                    weather_code: codes.get(i).copied().flatten(),
                    temperature_2m_min: t_min.get(i).copied().flatten(),
                    temperature_2m_max: t_max.get(i).copied().flatten(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::Asia::Seoul;
    use chrono_tz::Europe::Berlin;

    fn row(tz: Tz, h: u32, ghi: f64) -> (DateTime<Tz>, BTreeMap<WeatherField, Option<f64>>) {
        let t = tz.with_ymd_and_hms(2025, 3, 1, h, 0, 0).unwrap();
        (t, BTreeMap::from([(WeatherField::ShortwaveRadiation, Some(ghi))]))
    }

    #[test]
    fn concat_sorts_and_keeps_last_duplicate() {
        let archive = WeatherSeries::from_rows(Seoul, vec![row(Seoul, 2, 1.0), row(Seoul, 1, 1.0)]);
        let forecast = WeatherSeries::from_rows(Seoul, vec![row(Seoul, 2, 9.0), row(Seoul, 3, 9.0)]);
        let merged = WeatherSeries::concat(Seoul, vec![archive, forecast]);

        let hours: Vec<u32> = merged.index().iter().map(|t| t.hour()).collect();
        assert_eq!(hours, vec![1, 2, 3]);
        let ghi = merged.require(WeatherField::ShortwaveRadiation).unwrap();
        assert_eq!(ghi, vec![1.0, 9.0, 9.0]);
    }

    #[test]
    fn concat_fills_columns_missing_in_one_part() {
        let mut snowy = row(Seoul, 5, 0.0);
        snowy.1.insert(WeatherField::Snowfall, Some(1.2));
        let a = WeatherSeries::from_rows(Seoul, vec![row(Seoul, 4, 0.0)]);
        let b = WeatherSeries::from_rows(Seoul, vec![snowy]);
        let merged = WeatherSeries::concat(Seoul, vec![a, b]);
        assert_eq!(merged.column(WeatherField::Snowfall).unwrap(), &[None, Some(1.2)]);
    }

    #[test]
    fn require_names_missing_column() {
        let s = WeatherSeries::from_rows(Seoul, vec![row(Seoul, 1, 1.0)]);
        let err = s.require(WeatherField::DiffuseRadiation).unwrap_err();
        assert!(matches!(err, ForecastError::DataUnavailable(_)));
        assert!(err.to_string().contains("diffuse_radiation"));
    }

    #[test]
    fn parses_open_meteo_payload() {
        let body = serde_json::json!({
            "timezone": "Asia/Seoul",
            "elevation": 12.0,
            "hourly": {
                "time": ["2025-03-01T00:00", "2025-03-01T01:00"],
                "shortwave_radiation": [0.0, null],
                "windspeed_10m": [3.6, 7.2]
            },
            "daily": {
                "time": ["2025-03-01"],
                "weather_code": [3],
                "temperature_2m_min": [-1.5],
                "temperature_2m_max": [7.0]
            }
        });
        let resp: OpenMeteoResponse = serde_json::from_value(body).unwrap();
        let series = resp.hourly_series(Seoul);
        assert_eq!(series.len(), 2);
        assert_eq!(series.column(WeatherField::ShortwaveRadiation).unwrap(), &[Some(0.0), None]);
        assert_eq!(series.column(WeatherField::WindSpeed10m).unwrap(), &[Some(3.6), Some(7.2)]);
        assert!(series.column(WeatherField::Snowfall).is_none());

        let daily = resp.daily_summary();
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].temperature_2m_min, Some(-1.5));
    }

    #[test]
    fn spring_forward_gap_is_dropped() {
        let body = serde_json::json!({
            "hourly": {
                "time": ["2025-03-30T01:00", "2025-03-30T02:00", "2025-03-30T03:00"],
                "shortwave_radiation": [0.0, 0.0, 0.0]
            }
        });
        let resp: OpenMeteoResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.hourly_series(Berlin).len(), 2);
    }

    #[test]
    fn daily_concat_prefers_later_part() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let day = |code| DailyWeather { date: d, weather_code: Some(code), temperature_2m_min: None, temperature_2m_max: None };
        let merged = concat_daily(vec![vec![day(1.0)], vec![day(61.0)]]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].weather_code, Some(61.0));
    }
}
