/// Horizon profile construction.
///
/// A sparse base curve (PVGIS, a local CSV file, or flat) is interpolated
/// onto a one-degree azimuth grid and then raised by each enabled obstacle.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::config::{HorizonConfig, HorizonMode};
use crate::errors::ForecastError;
use crate::models::generator::Obstacle;

pub const GRID_SIZE: usize = 360;

/// Linear interpolation on a periodic domain, wrapping at `period`.
///
/// `xp` need not be sorted or reduced to `[0, period)`. Returns `None`
/// when there are no sample points.
pub fn interp_periodic(x: f64, xp: &[f64], fp: &[f64], period: f64) -> Option<f64> {
    if xp.is_empty() || xp.len() != fp.len() {
        return None;
    }
    let mut pts: Vec<(f64, f64)> = xp
        .iter()
        .zip(fp)
        .map(|(x, y)| (x.rem_euclid(period), *y))
        .collect();
    pts.sort_by(|a, b| a.0.total_cmp(&b.0));

    let (first, last) = (pts[0], pts[pts.len() - 1]);
    pts.insert(0, (last.0 - period, last.1));
    pts.push((first.0 + period, first.1));

    let x = x.rem_euclid(period);
    let upper = pts.partition_point(|p| p.0 <= x);
    let (x0, y0) = pts[upper - 1];
    let Some(&(x1, y1)) = pts.get(upper) else {
        return Some(y0);
    };
    if x1 == x0 {
        return Some(y1);
    }
    Some(y0 + (y1 - y0) * (x - x0) / (x1 - x0))
}

// ─── Base curve ──────────────────────────────────────────────────────────────

/// Sparse azimuth → elevation samples, north = 0°, clockwise.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseHorizon {
    pub azimuth_deg: Vec<f64>,
    pub elevation_deg: Vec<f64>,
}

impl BaseHorizon {
    pub fn flat() -> Self {
        Self { azimuth_deg: vec![0.0], elevation_deg: vec![0.0] }
    }

    /// Sorts by azimuth, clamps elevations below the geometric horizon to 0
    /// and drops non-finite samples.
    pub fn from_points(mut points: Vec<(f64, f64)>) -> Self {
        points.retain(|(a, e)| a.is_finite() && e.is_finite());
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self {
            azimuth_deg: points.iter().map(|p| p.0).collect(),
            elevation_deg: points.iter().map(|p| p.1.max(0.0)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.azimuth_deg.is_empty()
    }
}

// ─── Profile ─────────────────────────────────────────────────────────────────

/// Elevation ceiling per integer azimuth degree.
#[derive(Debug, Clone, PartialEq)]
pub struct HorizonProfile {
    elevation_deg: [f64; GRID_SIZE],
}

impl HorizonProfile {
    /// Interpolates the base curve onto the grid and applies every enabled
    /// obstacle. Disabled obstacles are ignored here and nowhere else.
    pub fn from_base(base: &BaseHorizon, obstacles: &[Obstacle]) -> Result<Self, ForecastError> {
        if base.is_empty() {
            return Err(ForecastError::DataUnavailable("horizon base curve is empty".to_string()));
        }
        let mut elevation_deg = [0.0; GRID_SIZE];
        for (az, slot) in elevation_deg.iter_mut().enumerate() {
            *slot = interp_periodic(az as f64, &base.azimuth_deg, &base.elevation_deg, 360.0)
                .unwrap_or(0.0);
        }
        let mut profile = Self { elevation_deg };
        for obstacle in obstacles.iter().filter(|o| o.enabled) {
            profile.raise(obstacle);
        }
        Ok(profile)
    }

    /// Lifts every grid point inside the obstacle's sector to at least its
    /// elevation angle. Never lowers a point.
    pub fn raise(&mut self, obstacle: &Obstacle) {
        let (start, end) = obstacle.azimuth_range();
        let elevation = obstacle.elevation_deg();
        for (az, slot) in self.elevation_deg.iter_mut().enumerate() {
            let az = az as f64;
            let inside = if start <= end {
                az >= start && az <= end
            } else {
                az >= start || az <= end
            };
            if inside {
                *slot = slot.max(elevation);
            }
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.elevation_deg
    }

    /// Horizon elevation at an arbitrary azimuth, interpolated between grid points.
    pub fn elevation_at(&self, azimuth_deg: f64) -> f64 {
        let az = azimuth_deg.rem_euclid(360.0);
        let lower = (az.floor() as usize) % GRID_SIZE;
        let upper = (lower + 1) % GRID_SIZE;
        let frac = az - az.floor();
        self.elevation_deg[lower] + (self.elevation_deg[upper] - self.elevation_deg[lower]) * frac
    }
}

// ─── Sources ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PvgisResponse {
    outputs: PvgisOutputs,
}

#[derive(Debug, Deserialize)]
struct PvgisOutputs {
    horizon_profile: Vec<PvgisPoint>,
}

#[derive(Debug, Deserialize)]
struct PvgisPoint {
    #[serde(rename = "A")]
    azimuth: f64,
    #[serde(rename = "H_hor")]
    elevation: f64,
}

/// Where the base curve comes from; chosen by configuration.
#[derive(Debug, Clone)]
pub enum HorizonSource {
    Pvgis { client: Client, url: String },
    Csv { path: PathBuf },
    Flat,
}

impl HorizonSource {
    pub fn from_config(cfg: &HorizonConfig, timeout: Duration) -> Result<Self, ForecastError> {
        Ok(match cfg.mode {
            HorizonMode::Pvgis => {
                let client = Client::builder()
                    .timeout(timeout)
                    .build()
                    .map_err(|e| ForecastError::Internal(e.to_string()))?;
                HorizonSource::Pvgis { client, url: cfg.pvgis_url.clone() }
            }
            HorizonMode::Csv => HorizonSource::Csv { path: PathBuf::from(&cfg.csv_path) },
            HorizonMode::Flat => HorizonSource::Flat,
        })
    }

    pub async fn load(&self, latitude: f64, longitude: f64) -> Result<BaseHorizon, ForecastError> {
        let base = match self {
            HorizonSource::Flat => BaseHorizon::flat(),
            HorizonSource::Csv { path } => {
                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    ForecastError::DataUnavailable(format!("horizon csv {}: {}", path.display(), e))
                })?;
                parse_horizon_csv(&content)?
            }
            HorizonSource::Pvgis { client, url } => fetch_pvgis(client, url, latitude, longitude)
                .await
                .map_err(|e| ForecastError::DataUnavailable(format!("pvgis horizon: {}", e)))?,
        };
        if base.is_empty() {
            return Err(ForecastError::DataUnavailable("horizon source returned no points".to_string()));
        }
        tracing::debug!(points = base.azimuth_deg.len(), "loaded base horizon");
        Ok(base)
    }
}

async fn fetch_pvgis(client: &Client, url: &str, latitude: f64, longitude: f64) -> Result<BaseHorizon, reqwest::Error> {
    let resp: PvgisResponse = client
        .get(url)
        .query(&[
            ("lat", latitude.to_string()),
            ("lon", longitude.to_string()),
            ("outputformat", "json".to_string()),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;
    Ok(pvgis_to_base(resp.outputs.horizon_profile))
}

/// PVGIS reports azimuth with south = 0; shift to north = 0 and drop the
/// duplicated closing point.
fn pvgis_to_base(points: Vec<PvgisPoint>) -> BaseHorizon {
    let mut seen = std::collections::BTreeSet::new();
    let points = points
        .into_iter()
        .map(|p| ((p.azimuth + 180.0).rem_euclid(360.0), p.elevation))
        .filter(|(a, _)| seen.insert(a.to_bits()))
        .collect();
    BaseHorizon::from_points(points)
}

/// Parses an `azimuth,elevation` table. Header names are matched
/// case-insensitively and may be quoted; rows that are not numeric are skipped.
pub fn parse_horizon_csv(content: &str) -> Result<BaseHorizon, ForecastError> {
    let content = content.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let header: Vec<String> = reader
        .headers()
        .map_err(|e| ForecastError::DataUnavailable(format!("horizon csv header: {}", e)))?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();
    if header.iter().all(|h| h.is_empty()) {
        return Err(ForecastError::DataUnavailable("horizon csv is empty".to_string()));
    }

    let find = |names: &[&str]| header.iter().position(|h| names.contains(&h.as_str()));
    let az_idx = find(&["azimuth", "azimuthdeg"])
        .ok_or_else(|| ForecastError::DataUnavailable("horizon csv has no azimuth column".to_string()))?;
    let el_idx = find(&["elevation", "elevationdeg"])
        .ok_or_else(|| ForecastError::DataUnavailable("horizon csv has no elevation column".to_string()))?;

    let mut points = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ForecastError::DataUnavailable(format!("horizon csv: {}", e)))?;
        let cell = |idx: usize| record.get(idx).and_then(|v| v.parse::<f64>().ok());
        if let (Some(az), Some(el)) = (cell(az_idx), cell(el_idx)) {
            points.push((az, el));
        }
    }
    Ok(BaseHorizon::from_points(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ramp_base() -> BaseHorizon {
        BaseHorizon::from_points(vec![(0.0, 2.0), (90.0, 4.0), (180.0, 6.0), (270.0, 4.0)])
    }

    #[test]
    fn interp_wraps_around_north() {
        let xp = [10.0, 350.0];
        let fp = [2.0, 4.0];
        // 350 → 370 spans 20°, 0° sits halfway.
        let v = interp_periodic(0.0, &xp, &fp, 360.0).unwrap();
        assert!((v - 3.0).abs() < 1e-12, "got {v}");
        let v = interp_periodic(180.0, &xp, &fp, 360.0).unwrap();
        assert!((v - 3.0).abs() < 1e-12, "got {v}");
        assert_eq!(interp_periodic(10.0, &xp, &fp, 360.0), Some(2.0));
    }

    #[test]
    fn interp_single_point_is_constant() {
        for x in [0.0, 45.0, 359.9] {
            assert_eq!(interp_periodic(x, &[0.0], &[1.5], 360.0), Some(1.5));
        }
        assert_eq!(interp_periodic(3.0, &[], &[], 360.0), None);
    }

    #[test]
    fn flat_base_without_obstacles_is_zero() {
        let p = HorizonProfile::from_base(&BaseHorizon::flat(), &[]).unwrap();
        assert!(p.as_slice().iter().all(|e| *e == 0.0));
        assert_eq!(p.as_slice().len(), GRID_SIZE);
    }

    #[test]
    fn empty_base_is_data_unavailable() {
        let base = BaseHorizon::from_points(vec![]);
        let err = HorizonProfile::from_base(&base, &[Obstacle::default()]).unwrap_err();
        assert!(matches!(err, ForecastError::DataUnavailable(_)));
    }

    #[test]
    fn single_obstacle_raises_only_its_sector() {
        let base = ramp_base();
        let plain = HorizonProfile::from_base(&base, &[]).unwrap();
        let obstacle = Obstacle::new(200.0, 123.0, 60.0, 122.0);
        let raised = HorizonProfile::from_base(&base, &[obstacle]).unwrap();

        let (start, end) = obstacle.azimuth_range();
        assert!((raised.as_slice()[200] - obstacle.elevation_deg()).abs() < 1e-12);
        for az in 0..GRID_SIZE {
            let a = az as f64;
            if a < start || a > end {
                assert_eq!(raised.as_slice()[az], plain.as_slice()[az], "az {az}");
            } else {
                assert!(raised.as_slice()[az] >= plain.as_slice()[az]);
            }
        }
    }

    #[test]
    fn wrapping_obstacle_covers_both_sides_of_north() {
        let o = Obstacle::new(0.0, 10.0, 10.0, 4.0);
        let p = HorizonProfile::from_base(&BaseHorizon::flat(), &[o]).unwrap();
        let s = p.as_slice();
        assert!((s[0] - 45.0).abs() < 1e-9);
        assert!((s[359] - 45.0).abs() < 1e-9);
        assert!((s[11] - 45.0).abs() < 1e-9);
        assert_eq!(s[12], 0.0);
        assert_eq!(s[180], 0.0);
    }

    #[test]
    fn disabled_obstacles_are_ignored() {
        let mut o = Obstacle::new(90.0, 10.0, 10.0, 10.0);
        o.enabled = false;
        let p = HorizonProfile::from_base(&BaseHorizon::flat(), &[o]).unwrap();
        assert!(p.as_slice().iter().all(|e| *e == 0.0));
    }

    #[test]
    fn lower_obstacle_never_lowers_base() {
        let base = BaseHorizon::from_points(vec![(0.0, 30.0)]);
        let p = HorizonProfile::from_base(&base, &[Obstacle::new(90.0, 100.0, 1.0, 50.0)]).unwrap();
        assert!(p.as_slice().iter().all(|e| *e == 30.0));
    }

    #[test]
    fn elevation_at_interpolates_between_degrees() {
        let base = BaseHorizon::from_points(vec![(0.0, 0.0), (180.0, 18.0)]);
        let p = HorizonProfile::from_base(&base, &[]).unwrap();
        assert!((p.elevation_at(10.5) - 1.05).abs() < 1e-9);
        assert!((p.elevation_at(-90.0) - p.elevation_at(270.0)).abs() < 1e-12);
        assert!((p.elevation_at(359.5) - 0.05).abs() < 1e-9);
    }

    #[test]
    fn negative_base_points_clamp_to_zero() {
        let base = BaseHorizon::from_points(vec![(0.0, -2.0), (180.0, 3.0)]);
        assert_eq!(base.elevation_deg, vec![0.0, 3.0]);
    }

    #[test]
    fn parses_csv_with_bom_and_junk_rows() {
        let csv = "\u{feff} Azimuth , Elevation\n180,5\n0,1\nn/a,3\n90,2.5\n";
        let base = parse_horizon_csv(csv).unwrap();
        assert_eq!(base.azimuth_deg, vec![0.0, 90.0, 180.0]);
        assert_eq!(base.elevation_deg, vec![1.0, 2.5, 5.0]);
    }

    #[test]
    fn parses_quoted_header_and_cells() {
        let csv = "\"azimuth\",\"elevation\"\n0,5\n\"180\", 10\n";
        let base = parse_horizon_csv(csv).unwrap();
        assert_eq!(base.azimuth_deg, vec![0.0, 180.0]);
        assert_eq!(base.elevation_deg, vec![5.0, 10.0]);
    }

    #[test]
    fn short_rows_are_skipped() {
        let base = parse_horizon_csv("Elevation,Azimuth,source\n3,45,pvgis\n7\n1,270\n").unwrap();
        assert_eq!(base.azimuth_deg, vec![45.0, 270.0]);
        assert_eq!(base.elevation_deg, vec![3.0, 1.0]);
    }

    #[test]
    fn empty_csv_is_data_unavailable() {
        assert!(matches!(parse_horizon_csv(""), Err(ForecastError::DataUnavailable(_))));
    }

    #[test]
    fn csv_without_elevation_column_fails() {
        let err = parse_horizon_csv("azimuth,height\n0,1\n").unwrap_err();
        assert!(matches!(err, ForecastError::DataUnavailable(_)));
    }

    #[test]
    fn pvgis_azimuth_is_shifted_to_north_reference() {
        let resp: PvgisResponse = serde_json::from_value(serde_json::json!({
            "outputs": {"horizon_profile": [
                {"A": -180.0, "H_hor": 1.0},
                {"A": 0.0, "H_hor": 4.0},
                {"A": 180.0, "H_hor": 1.0}
            ]}
        }))
        .unwrap();
        let base = pvgis_to_base(resp.outputs.horizon_profile);
        assert_eq!(base.azimuth_deg, vec![0.0, 180.0]);
        assert_eq!(base.elevation_deg, vec![1.0, 4.0]);
    }

    #[tokio::test]
    async fn flat_source_builds_obstacle_only_profile() {
        let base = HorizonSource::Flat.load(37.4, 126.6).await.unwrap();
        let p = HorizonProfile::from_base(&base, &[Obstacle::default()]).unwrap();
        assert!(p.as_slice()[200] > 25.0);
        assert_eq!(p.as_slice()[0], 0.0);
    }

    #[tokio::test]
    async fn missing_csv_is_data_unavailable() {
        let source = HorizonSource::Csv { path: PathBuf::from("/nonexistent/horizon.csv") };
        let err = source.load(0.0, 0.0).await.unwrap_err();
        assert!(matches!(err, ForecastError::DataUnavailable(_)));
    }

    fn obstacle_strategy() -> impl Strategy<Value = Obstacle> {
        (0.0..360.0f64, 1.0..500.0f64, 0.0..100.0f64, 0.0..300.0f64)
            .prop_map(|(c, d, h, w)| Obstacle::new(c, d, h, w))
    }

    proptest! {
        #[test]
        fn prop_obstacle_order_does_not_matter(obstacles in proptest::collection::vec(obstacle_strategy(), 0..6)) {
            let base = ramp_base();
            let forward = HorizonProfile::from_base(&base, &obstacles).unwrap();
            let mut reversed = obstacles.clone();
            reversed.reverse();
            let backward = HorizonProfile::from_base(&base, &reversed).unwrap();
            prop_assert_eq!(forward.as_slice(), backward.as_slice());

            let mut rotated = obstacles.clone();
            if !rotated.is_empty() {
                rotated.rotate_left(1);
            }
            let rotated = HorizonProfile::from_base(&base, &rotated).unwrap();
            prop_assert_eq!(forward.as_slice(), rotated.as_slice());
        }

        #[test]
        fn prop_raising_is_monotone(obstacles in proptest::collection::vec(obstacle_strategy(), 1..6)) {
            let base = ramp_base();
            let plain = HorizonProfile::from_base(&base, &[]).unwrap();
            let raised = HorizonProfile::from_base(&base, &obstacles).unwrap();
            for (r, p) in raised.as_slice().iter().zip(plain.as_slice()) {
                prop_assert!(r >= p);
                prop_assert!(*r >= 0.0);
            }
        }
    }
}
