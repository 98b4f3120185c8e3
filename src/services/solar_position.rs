/// ============================================================
///  Solar position
///
///  NOAA general solar position equations:
///   1. Julian century from the UTC instant
///   2. Sun's apparent longitude, obliquity, declination
///   3. Equation of time → true solar time → hour angle
///   4. Geometric zenith, then NOAA atmospheric refraction
///   5. Azimuth measured from north, clockwise
/// ============================================================

use chrono::{DateTime, TimeZone, Utc};

// ─── Public output ───────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarPosition {
    pub azimuth_deg: f64,
    pub apparent_elevation_deg: f64,
    pub apparent_zenith_deg: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SolarPositionModel {
    latitude: f64,
    longitude: f64,
}

impl SolarPositionModel {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn positions<Tz: TimeZone>(&self, times: &[DateTime<Tz>]) -> Vec<SolarPosition> {
        times.iter().map(|t| self.position(t.with_timezone(&Utc))).collect()
    }

    pub fn position(&self, utc: DateTime<Utc>) -> SolarPosition {
        // ── 1. Time ────────────────────────────────────────────
        let jd = utc.timestamp() as f64 / 86_400.0
            + utc.timestamp_subsec_nanos() as f64 / 86_400e9
            + 2_440_587.5;
        let jc = (jd - 2_451_545.0) / 36_525.0;

        // ── 2. Sun coordinates ─────────────────────────────────
        let mean_long = (280.46646 + jc * (36_000.76983 + jc * 0.0003032)).rem_euclid(360.0);
        let mean_anom = 357.52911 + jc * (35_999.05029 - 0.0001537 * jc);
        let ecc = 0.016708634 - jc * (0.000042037 + 0.0000001267 * jc);
        let m = mean_anom.to_radians();
        let center = m.sin() * (1.914602 - jc * (0.004817 + 0.000014 * jc))
            + (2.0 * m).sin() * (0.019993 - 0.000101 * jc)
            + (3.0 * m).sin() * 0.000289;
        let true_long = mean_long + center;
        let omega = (125.04 - 1934.136 * jc).to_radians();
        let app_long = true_long - 0.00569 - 0.00478 * omega.sin();

        let mean_obliq = 23.0
            + (26.0 + (21.448 - jc * (46.815 + jc * (0.00059 - jc * 0.001813))) / 60.0) / 60.0;
        let obliq = (mean_obliq + 0.00256 * omega.cos()).to_radians();
        let decl = (obliq.sin() * app_long.to_radians().sin()).asin();

        // ── 3. Equation of time (minutes) and hour angle ───────
        let y = (obliq / 2.0).tan().powi(2);
        let l0 = mean_long.to_radians();
        let eot_min = 4.0
            * (y * (2.0 * l0).sin() - 2.0 * ecc * m.sin()
                + 4.0 * ecc * y * m.sin() * (2.0 * l0).cos()
                - 0.5 * y * y * (4.0 * l0).sin()
                - 1.25 * ecc * ecc * (2.0 * m).sin())
            .to_degrees();

        let utc_min = (jd + 0.5).fract() * 1440.0;
        let true_solar_min = (utc_min + eot_min + 4.0 * self.longitude).rem_euclid(1440.0);
        // true solar time is already reduced to [0, 1440)
        let hour_angle = true_solar_min / 4.0 - 180.0;

        // ── 4. Zenith & refraction ─────────────────────────────
        let lat = self.latitude.to_radians();
        let ha = hour_angle.to_radians();
        let cos_zen = (lat.sin() * decl.sin() + lat.cos() * decl.cos() * ha.cos()).clamp(-1.0, 1.0);
        let zenith = cos_zen.acos().to_degrees();
        let elevation = 90.0 - zenith;
        let apparent_elevation = elevation + refraction_deg(elevation);

        // ── 5. Azimuth (N = 0°, clockwise) ─────────────────────
        let zen_rad = zenith.to_radians();
        let denom = lat.cos() * zen_rad.sin();
        let azimuth = if denom.abs() < 1e-12 {
            if hour_angle > 0.0 { 180.0 } else { 0.0 }
        } else {
            let cos_az = ((lat.sin() * zen_rad.cos() - decl.sin()) / denom).clamp(-1.0, 1.0);
            let a = cos_az.acos().to_degrees();
            if hour_angle > 0.0 { (a + 180.0).rem_euclid(360.0) } else { (540.0 - a).rem_euclid(360.0) }
        };

        SolarPosition {
            azimuth_deg: azimuth,
            apparent_elevation_deg: apparent_elevation,
            apparent_zenith_deg: 90.0 - apparent_elevation,
        }
    }
}

// ─── Atmospheric refraction (NOAA approximation, degrees) ────
fn refraction_deg(elevation_deg: f64) -> f64 {
    let e = elevation_deg;
    let arcsec = if e > 85.0 {
        0.0
    } else if e > 5.0 {
        let t = e.to_radians().tan();
        58.1 / t - 0.07 / t.powi(3) + 0.000086 / t.powi(5)
    } else if e > -0.575 {
        1735.0 + e * (-518.2 + e * (103.4 + e * (-12.79 + e * 0.711)))
    } else {
        -20.772 / e.to_radians().tan()
    };
    arcsec / 3600.0
}
