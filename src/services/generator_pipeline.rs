/// ============================================================
///  Generator conversion pipeline
///
///  Per timestep, for one generator:
///   horizon lookup → shading → irradiance adjustment
///   → POA + bifacial rear gain → cell temperature
///   → PVWatts DC → PVWatts AC → loss stack → snow → availability
///
///  Power is then integrated to energy over the actual gaps
///  between timestamps and summed per local calendar day.
/// ============================================================

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;

use crate::config::PipelineConfig;
use crate::errors::ForecastError;
use crate::models::forecast::{DailyRecord, GeneratorResult, HourlyRecord};
use crate::models::generator::GeneratorConfig;
use crate::models::weather::{WeatherField, WeatherSeries};
use crate::services::horizon::{BaseHorizon, HorizonProfile};
use crate::services::irradiance::{self, Components};
use crate::services::losses::LossParameterSet;
use crate::services::pv_models;
use crate::services::snow::snow_factors;
use crate::services::solar_position::SolarPosition;

/// Inputs shared by every generator of a run. Built once, read concurrently.
pub struct PipelineContext<'a> {
    pub weather: &'a WeatherSeries,
    pub sun: &'a [SolarPosition],
    pub base_horizon: &'a BaseHorizon,
    pub config: PipelineConfig,
}

/// Weather columns the power model cannot run without.
struct Inputs {
    dni: Vec<f64>,
    ghi: Vec<f64>,
    dhi: Vec<f64>,
    temp_air: Vec<f64>,
    wind_kmh: Vec<f64>,
}

impl Inputs {
    fn from_series(weather: &WeatherSeries) -> Result<Self, ForecastError> {
        Ok(Self {
            dni: weather.require(WeatherField::DirectNormalIrradiance)?,
            ghi: weather.require(WeatherField::ShortwaveRadiation)?,
            dhi: weather.require(WeatherField::DiffuseRadiation)?,
            temp_air: weather.require(WeatherField::Temperature2m)?,
            wind_kmh: weather.require(WeatherField::WindSpeed10m)?,
        })
    }
}

fn check_availability(availability: f64) -> Result<f64, ForecastError> {
    if availability.is_finite() && (0.0..=1.0).contains(&availability) {
        Ok(availability)
    } else {
        Err(ForecastError::Configuration(format!(
            "planned_availability must be within 0..=1, got {}",
            availability
        )))
    }
}

pub fn run_generator(generator: &GeneratorConfig, ctx: &PipelineContext<'_>) -> Result<GeneratorResult, ForecastError> {
    let availability = check_availability(generator.planned_availability)?;
    let temp_params = pv_models::temperature_params_for(generator)?;
    let losses = LossParameterSet::for_generator(generator)?;
    let horizon = HorizonProfile::from_base(ctx.base_horizon, &generator.obstacles)?;
    let inputs = Inputs::from_series(ctx.weather)?;

    let times = ctx.weather.index();
    if ctx.sun.len() != times.len() {
        return Err(ForecastError::Internal(format!(
            "{} solar positions for {} weather rows",
            ctx.sun.len(),
            times.len()
        )));
    }

    let snow = snow_factors(ctx.weather.column(WeatherField::Snowfall), times.len(), &ctx.config.snow);
    let retained = losses.retained_fraction();
    let pdc0 = generator.pdc0_total_w();
    let inverter_pdc0 = generator.inverter_pdc0_total_w();
    let eta_nom = generator.eta_inv();
    let gamma = generator.gamma_pdc_per_c();
    let bifaciality = generator.bifaciality();

    tracing::debug!(
        generator = %generator.name,
        total_loss_pct = losses.total_loss_pct(),
        categories = ?losses.categories().collect::<Vec<_>>(),
        "loss stack"
    );

    let mut hourly = Vec::with_capacity(times.len());
    for (i, (time, sun)) in times.iter().zip(ctx.sun).enumerate() {
        let (horizon_deg, state) = irradiance::classify_against(sun, &horizon);
        let raw = Components { dni: inputs.dni[i], ghi: inputs.ghi[i], dhi: inputs.dhi[i] };
        let adj = irradiance::adjust(raw, state, ctx.config.adjust_ghi_when_dni_blocked);

        let poa = irradiance::plane_of_array(
            generator.surface_tilt_deg,
            generator.surface_azimuth_deg,
            sun,
            adj,
            generator.albedo,
        );
        let poa_total = poa.global + poa.ground_diffuse * bifaciality;
        let cell_temp = pv_models::sapm_cell_temperature(
            poa_total,
            inputs.temp_air[i],
            pv_models::kmh_to_ms(inputs.wind_kmh[i]),
            temp_params,
        );
        let dc = pv_models::pvwatts_dc(poa_total, cell_temp, pdc0, gamma);
        let ac = pv_models::pvwatts_inverter(dc, inverter_pdc0, eta_nom);
        let ac_after_losses = (ac * retained).max(0.0);
        let ac_final = ac_after_losses * snow[i] * availability;
        // a null reading in any input column means no output for the step
        let complete = [raw.dni, raw.ghi, raw.dhi, inputs.temp_air[i], inputs.wind_kmh[i]]
            .iter()
            .all(|v| v.is_finite());
        let ac_final = if complete && ac_final.is_finite() { ac_final } else { 0.0 };

        #[cfg(feature = "verbose_log")]
        tracing::trace!(
            generator = %generator.name,
            %time,
            elevation = sun.apparent_elevation_deg,
            horizon = horizon_deg,
            shaded = state.is_shaded,
            poa_total,
            dc,
            ac = ac_final,
            "timestep"
        );

        hourly.push(HourlyRecord {
            time: *time,
            solar_azimuth_deg: sun.azimuth_deg,
            solar_elevation_deg: sun.apparent_elevation_deg,
            horizon_elevation_deg: horizon_deg,
            is_night: state.is_night,
            is_shaded: state.is_shaded,
            dni_adj: adj.dni,
            ghi_adj: adj.ghi,
            dhi_adj: adj.dhi,
            poa_total_w_m2: poa_total,
            cell_temp_c: cell_temp,
            dc_power_w: dc,
            snow_factor: snow[i],
            ac_power_w: ac_final,
            energy_kwh: 0.0,
        });
    }

    let power: Vec<f64> = hourly.iter().map(|r| r.ac_power_w).collect();
    let energy = integrate_energy(times, &power);
    for (record, kwh) in hourly.iter_mut().zip(&energy) {
        record.energy_kwh = *kwh;
    }
    let daily = daily_energy(times, &energy);
    let total_kwh = energy.iter().sum();

    tracing::info!(generator = %generator.name, rows = hourly.len(), total_kwh, "generator done");
    Ok(GeneratorResult {
        name: generator.name.clone(),
        total_loss_pct: losses.total_loss_pct(),
        hourly,
        daily,
        total_kwh,
    })
}

// ─── Energy ──────────────────────────────────────────────────

/// Hours represented by each sample: the gap to the previous timestamp,
/// or one hour for the first sample and any non-positive gap.
pub fn step_hours(times: &[DateTime<Tz>]) -> Vec<f64> {
    let mut hours = Vec::with_capacity(times.len());
    for (i, t) in times.iter().enumerate() {
        let dt = match i.checked_sub(1).map(|p| *t - times[p]) {
            Some(gap) if gap.num_seconds() > 0 => gap.num_seconds() as f64 / 3600.0,
            _ => 1.0,
        };
        hours.push(dt);
    }
    hours
}

/// kWh per sample. Non-finite power counts as zero.
pub fn integrate_energy(times: &[DateTime<Tz>], power_w: &[f64]) -> Vec<f64> {
    step_hours(times)
        .iter()
        .zip(power_w)
        .map(|(h, p)| if p.is_finite() { p / 1000.0 * h } else { 0.0 })
        .collect()
}

/// Local calendar-day sums. Every day between the first and last sample is
/// present, days without samples at 0 kWh.
pub fn daily_energy(times: &[DateTime<Tz>], energy_kwh: &[f64]) -> Vec<DailyRecord> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (t, e) in times.iter().zip(energy_kwh) {
        *by_date.entry(t.date_naive()).or_insert(0.0) += e;
    }
    let (Some(first), Some(last)) = (by_date.keys().next().copied(), by_date.keys().next_back().copied()) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|date| DailyRecord { date, energy_kwh: by_date.get(&date).copied().unwrap_or(0.0) })
        .collect()
}
