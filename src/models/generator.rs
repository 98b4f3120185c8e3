use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ─── Defaults ────────────────────────────────────────────────────────────────

pub const MODULE_PDC_STC_W: f64 = 640.0;
pub const MODULE_COUNT: u32 = 20;
pub const INVERTER_AC_RATED_W: f64 = 3500.0;
pub const INVERTER_COUNT: u32 = 5;
pub const ETA_INV_NOM: f64 = 0.96;
pub const SURFACE_TILT_DEG: f64 = 7.2;
pub const SURFACE_AZIMUTH_DEG: f64 = 159.0;
pub const ALBEDO: f64 = 0.12;
pub const GAMMA_PDC_PCT_PER_C: f64 = -0.35;
pub const BIFACIALITY_PCT: f64 = 70.0;
pub const PLANNED_AVAILABILITY: f64 = 1.0;

/// Configurable loss categories and their default percentages.
pub const DEFAULT_LOSSES: [(&str, f64); 8] = [
    ("soiling", 1.0),
    ("mismatch", 1.0),
    ("wiring", 1.0),
    ("connections", 0.5),
    ("lid", 1.0),
    ("nameplate_rating", 1.0),
    ("age", 0.0),
    ("availability", 0.0),
];

fn default_true() -> bool { true }

// ─── Obstacles ───────────────────────────────────────────────────────────────

/// A building, tree line or ridge seen from the array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Obstacle {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub center_azimuth_deg: f64,
    #[serde(default)]
    pub distance_m: f64,
    #[serde(default)]
    pub height_m: f64,
    #[serde(default)]
    pub width_m: f64,
}

impl Obstacle {
    pub fn new(center_azimuth_deg: f64, distance_m: f64, height_m: f64, width_m: f64) -> Self {
        Self { enabled: true, center_azimuth_deg, distance_m, height_m, width_m }
    }

    /// Empty slot kept in a generator's list so it can be filled in later.
    pub fn placeholder() -> Self {
        Self { enabled: false, center_azimuth_deg: 0.0, distance_m: 0.0, height_m: 0.0, width_m: 0.0 }
    }

    pub fn half_width_deg(&self) -> f64 {
        (self.width_m / 2.0).atan2(self.distance_m).to_degrees()
    }

    pub fn elevation_deg(&self) -> f64 {
        self.height_m.atan2(self.distance_m).to_degrees()
    }

    /// Inclusive azimuth interval `(start, end)`, both in [0, 360).
    /// `start > end` means the sector wraps through north.
    pub fn azimuth_range(&self) -> (f64, f64) {
        let half = self.half_width_deg();
        (
            (self.center_azimuth_deg - half).rem_euclid(360.0),
            (self.center_azimuth_deg + half).rem_euclid(360.0),
        )
    }
}

impl Default for Obstacle {
    fn default() -> Self {
        Self::new(200.0, 123.0, 60.0, 122.0)
    }
}

/// The stock obstacle list: one enabled obstacle and four empty slots.
pub fn default_obstacles() -> Vec<Obstacle> {
    let mut obstacles = vec![Obstacle::default()];
    obstacles.extend(std::iter::repeat_n(Obstacle::placeholder(), 4));
    obstacles
}

// ─── Losses ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LossSetting {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub value: f64,
}

pub fn default_loss_settings() -> BTreeMap<String, LossSetting> {
    DEFAULT_LOSSES
        .iter()
        .map(|(name, value)| (name.to_string(), LossSetting { enabled: true, value: *value }))
        .collect()
}

// ─── Generator ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub enum FaceType {
    Monofacial,
    #[default]
    Bifacial,
}

/// One PV generator: modules, inverters, orientation and derates.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct GeneratorConfig {
    pub name: String,
    pub module_pdc_stc_w: f64,
    pub module_count: u32,
    pub inverter_ac_rated_w: f64,
    pub inverter_count: u32,
    pub eta_inv_nom: f64,
    pub surface_tilt_deg: f64,
    pub surface_azimuth_deg: f64,
    pub albedo: f64,
    /// "Open rack" or "Close mount".
    pub mounting: String,
    /// Explicit SAPM parameter set; overrides the one implied by `mounting`.
    pub temperature_model: Option<String>,
    pub face_type: FaceType,
    pub bifaciality_pct: f64,
    pub gamma_pdc_pct_per_c: f64,
    pub planned_availability: f64,
    pub obstacles: Vec<Obstacle>,
    pub losses: BTreeMap<String, LossSetting>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            name: "Generator 1".to_string(),
            module_pdc_stc_w: MODULE_PDC_STC_W,
            module_count: MODULE_COUNT,
            inverter_ac_rated_w: INVERTER_AC_RATED_W,
            inverter_count: INVERTER_COUNT,
            eta_inv_nom: ETA_INV_NOM,
            surface_tilt_deg: SURFACE_TILT_DEG,
            surface_azimuth_deg: SURFACE_AZIMUTH_DEG,
            albedo: ALBEDO,
            mounting: "Open rack".to_string(),
            temperature_model: None,
            face_type: FaceType::Bifacial,
            bifaciality_pct: BIFACIALITY_PCT,
            gamma_pdc_pct_per_c: GAMMA_PDC_PCT_PER_C,
            planned_availability: PLANNED_AVAILABILITY,
            obstacles: default_obstacles(),
            losses: default_loss_settings(),
        }
    }
}

impl GeneratorConfig {
    pub fn pdc0_total_w(&self) -> f64 {
        self.module_pdc_stc_w * self.module_count as f64
    }

    /// Nominal inverter efficiency, falling back to the stock value when unset.
    pub fn eta_inv(&self) -> f64 {
        if self.eta_inv_nom > 0.0 { self.eta_inv_nom } else { ETA_INV_NOM }
    }

    /// DC input rating of the whole inverter bank.
    pub fn inverter_pdc0_total_w(&self) -> f64 {
        self.inverter_ac_rated_w / self.eta_inv() * self.inverter_count as f64
    }

    pub fn gamma_pdc_per_c(&self) -> f64 {
        self.gamma_pdc_pct_per_c / 100.0
    }

    /// Rear-side gain fraction, 0 for monofacial modules.
    pub fn bifaciality(&self) -> f64 {
        match self.face_type {
            FaceType::Monofacial => 0.0,
            FaceType::Bifacial => self.bifaciality_pct.clamp(0.0, 100.0) / 100.0,
        }
    }
}
