/// ============================================================
///  Power conversion models
///
///   • SAPM cell temperature (named parameter sets)
///   • PVWatts DC with a linear temperature coefficient
///   • PVWatts inverter efficiency curve
/// ============================================================

use crate::errors::ForecastError;
use crate::models::generator::GeneratorConfig;

// ─── Cell temperature ────────────────────────────────────────

/// Sandia array performance model coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SapmParams {
    pub a: f64,
    pub b: f64,
    pub delta_t: f64,
}

pub const SAPM_PARAMETER_SETS: [(&str, SapmParams); 4] = [
    ("open_rack_glass_glass", SapmParams { a: -3.47, b: -0.0594, delta_t: 3.0 }),
    ("close_mount_glass_glass", SapmParams { a: -2.98, b: -0.0471, delta_t: 1.0 }),
    ("open_rack_glass_polymer", SapmParams { a: -3.56, b: -0.075, delta_t: 3.0 }),
    ("insulated_back_glass_polymer", SapmParams { a: -2.81, b: -0.0455, delta_t: 0.0 }),
];

pub fn sapm_parameters(name: &str) -> Result<SapmParams, ForecastError> {
    SAPM_PARAMETER_SETS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, p)| *p)
        .ok_or_else(|| ForecastError::Configuration(format!("unknown temperature model '{}'", name)))
}

/// Parameter set name implied by a mounting class.
pub fn mounting_model(mounting: &str) -> Result<&'static str, ForecastError> {
    match mounting.trim().to_ascii_lowercase().as_str() {
        "open rack" => Ok("open_rack_glass_glass"),
        "close mount" => Ok("close_mount_glass_glass"),
        _ => Err(ForecastError::Configuration(format!("unknown mounting '{}'", mounting))),
    }
}

/// Explicit `temperature_model` wins over the mounting class.
pub fn temperature_params_for(generator: &GeneratorConfig) -> Result<SapmParams, ForecastError> {
    match generator.temperature_model.as_deref() {
        Some(name) => sapm_parameters(name),
        None => sapm_parameters(mounting_model(&generator.mounting)?),
    }
}

pub fn kmh_to_ms(kmh: f64) -> f64 {
    kmh / 3.6
}

/// Cell temperature (°C) from POA irradiance (W/m²), ambient (°C) and
/// wind speed (m/s).
pub fn sapm_cell_temperature(poa: f64, temp_air: f64, wind_ms: f64, p: SapmParams) -> f64 {
    let module = poa * (p.a + p.b * wind_ms).exp() + temp_air;
    module + poa / 1000.0 * p.delta_t
}

// ─── DC ──────────────────────────────────────────────────────

pub fn pvwatts_dc(effective_irradiance: f64, cell_temp: f64, pdc0: f64, gamma_pdc: f64) -> f64 {
    effective_irradiance / 1000.0 * pdc0 * (1.0 + gamma_pdc * (cell_temp - 25.0))
}

// ─── AC ──────────────────────────────────────────────────────

const ETA_INV_REF: f64 = 0.9637;

/// PVWatts inverter. `pdc0` is the DC input rating of the inverter bank.
pub fn pvwatts_inverter(pdc: f64, pdc0: f64, eta_inv_nom: f64) -> f64 {
    if pdc <= 0.0 || pdc0 <= 0.0 {
        return 0.0;
    }
    let pac0 = eta_inv_nom * pdc0;
    let zeta = pdc / pdc0;
    let eta = eta_inv_nom / ETA_INV_REF * (-0.0162 * zeta - 0.0059 / zeta + 0.9858);
    (eta * pdc).min(pac0).max(0.0)
}
