/// Shading classification, irradiance adjustment and plane-of-array
/// transposition.

use crate::services::horizon::HorizonProfile;
use crate::services::solar_position::SolarPosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadingState {
    pub is_night: bool,
    pub is_shaded: bool,
}

/// Night and shading are independent; a timestep can be both.
pub fn classify(sun: &SolarPosition, horizon_elevation_deg: f64) -> ShadingState {
    ShadingState {
        is_night: sun.apparent_elevation_deg <= 0.0,
        is_shaded: sun.apparent_elevation_deg < horizon_elevation_deg,
    }
}

pub fn classify_against(sun: &SolarPosition, horizon: &HorizonProfile) -> (f64, ShadingState) {
    let h = horizon.elevation_at(sun.azimuth_deg);
    (h, classify(sun, h))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Components {
    pub dni: f64,
    pub ghi: f64,
    pub dhi: f64,
}

/// Removes the beam when the sun is blocked or down, and the whole sky at
/// night. With `clamp_ghi`, a zero beam caps GHI at the diffuse value.
pub fn adjust(raw: Components, state: ShadingState, clamp_ghi: bool) -> Components {
    let dni = if state.is_shaded || state.is_night { 0.0 } else { raw.dni };
    let (mut ghi, dhi) = if state.is_night { (0.0, 0.0) } else { (raw.ghi, raw.dhi) };
    if clamp_ghi && dni == 0.0 {
        ghi = ghi.min(dhi);
    }
    Components { dni, ghi, dhi }
}

// ─── Plane of array (isotropic sky) ──────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoaIrradiance {
    pub global: f64,
    pub direct: f64,
    pub sky_diffuse: f64,
    pub ground_diffuse: f64,
}

pub fn angle_of_incidence_cos(surface_tilt_deg: f64, surface_azimuth_deg: f64, sun: &SolarPosition) -> f64 {
    let tilt = surface_tilt_deg.to_radians();
    let zen = sun.apparent_zenith_deg.to_radians();
    let daz = (sun.azimuth_deg - surface_azimuth_deg).to_radians();
    (zen.cos() * tilt.cos() + zen.sin() * tilt.sin() * daz.cos()).clamp(-1.0, 1.0)
}

pub fn plane_of_array(
    surface_tilt_deg: f64,
    surface_azimuth_deg: f64,
    sun: &SolarPosition,
    irr: Components,
    albedo: f64,
) -> PoaIrradiance {
    let cos_aoi = angle_of_incidence_cos(surface_tilt_deg, surface_azimuth_deg, sun);
    let tilt = surface_tilt_deg.to_radians();

    let direct = (irr.dni * cos_aoi).max(0.0);
    let sky_diffuse = irr.dhi * (1.0 + tilt.cos()) / 2.0;
    let ground_diffuse = irr.ghi * albedo * (1.0 - tilt.cos()) / 2.0;

    PoaIrradiance {
        global: direct + sky_diffuse + ground_diffuse,
        direct,
        sky_diffuse,
        ground_diffuse,
    }
}
