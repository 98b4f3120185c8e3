use std::collections::BTreeMap;

use crate::errors::ForecastError;
use crate::models::generator::{GeneratorConfig, DEFAULT_LOSSES};

/// Categories computed elsewhere in the pipeline; always present at 0 %.
pub const COMPUTED_CATEGORIES: [&str; 2] = ["shading", "snow"];

fn check_pct(name: &str, pct: f64) -> Result<(), ForecastError> {
    if pct.is_finite() && (0.0..=100.0).contains(&pct) {
        Ok(())
    } else {
        Err(ForecastError::Configuration(format!(
            "loss '{}' must be within 0..=100 %, got {}",
            name, pct
        )))
    }
}

/// Effective loss percentage per category. Disabled categories stay in the
/// set at 0 % so the category list is always complete.
#[derive(Debug, Clone, PartialEq)]
pub struct LossParameterSet {
    losses: BTreeMap<String, f64>,
}

impl LossParameterSet {
    pub fn new(losses: BTreeMap<String, f64>) -> Result<Self, ForecastError> {
        for (name, pct) in &losses {
            check_pct(name, *pct)?;
        }
        Ok(Self { losses })
    }

    /// Generator losses merged over the default map, plus the computed
    /// categories pinned at 0 %. Only the configurable categories may be set.
    pub fn for_generator(generator: &GeneratorConfig) -> Result<Self, ForecastError> {
        let mut losses: BTreeMap<String, f64> = DEFAULT_LOSSES
            .iter()
            .map(|(name, pct)| (name.to_string(), *pct))
            .collect();
        for (name, setting) in &generator.losses {
            if COMPUTED_CATEGORIES.contains(&name.as_str()) {
                return Err(ForecastError::Configuration(format!(
                    "loss '{}' is computed by the pipeline and cannot be configured",
                    name
                )));
            }
            let Some(slot) = losses.get_mut(name) else {
                return Err(ForecastError::Configuration(format!("unknown loss category '{}'", name)));
            };
            // disabled entries are still validated
            check_pct(name, setting.value)?;
            *slot = if setting.enabled { setting.value } else { 0.0 };
        }
        for name in COMPUTED_CATEGORIES {
            losses.insert(name.to_string(), 0.0);
        }
        Self::new(losses)
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, f64)> {
        self.losses.iter().map(|(n, p)| (n.as_str(), *p))
    }

    /// Combined retained fraction: ∏ (1 − pᵢ/100).
    pub fn retained_fraction(&self) -> f64 {
        self.losses.values().map(|p| 1.0 - p / 100.0).product()
    }

    pub fn total_loss_pct(&self) -> f64 {
        100.0 * (1.0 - self.retained_fraction())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::generator::LossSetting;

    fn set(values: &[(&str, f64)]) -> LossParameterSet {
        LossParameterSet::new(values.iter().map(|(n, v)| (n.to_string(), *v)).collect()).unwrap()
    }

    fn as_map(s: &LossParameterSet) -> BTreeMap<&str, f64> {
        s.categories().collect()
    }

    #[test]
    fn losses_compound_multiplicatively() {
        let s = set(&[("soiling", 10.0), ("wiring", 0.0), ("age", 20.0)]);
        assert!((s.retained_fraction() - 0.72).abs() < 1e-12);
        assert!((s.total_loss_pct() - 28.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_is_rejected() {
        let err = LossParameterSet::new(BTreeMap::from([("soiling".to_string(), 120.0)])).unwrap_err();
        assert!(matches!(err, ForecastError::Configuration(_)));

        let mut g = GeneratorConfig::default();
        g.losses.insert("wiring".into(), LossSetting { enabled: false, value: -3.0 });
        assert!(matches!(LossParameterSet::for_generator(&g), Err(ForecastError::Configuration(_))));
    }

    #[test]
    fn generator_set_is_complete() {
        let mut g = GeneratorConfig::default();
        g.losses.clear();
        g.losses.insert("soiling".into(), LossSetting { enabled: false, value: 5.0 });
        g.losses.insert("age".into(), LossSetting { enabled: true, value: 2.0 });

        let s = LossParameterSet::for_generator(&g).unwrap();
        let m = as_map(&s);
        assert_eq!(m.len(), DEFAULT_LOSSES.len() + COMPUTED_CATEGORIES.len());
        assert_eq!(m["soiling"], 0.0);
        assert_eq!(m["age"], 2.0);
        assert_eq!(m["mismatch"], 1.0);
        assert_eq!(m["shading"], 0.0);
        assert_eq!(m["snow"], 0.0);
    }

    #[test]
    fn computed_categories_cannot_be_configured() {
        for name in COMPUTED_CATEGORIES {
            let mut g = GeneratorConfig::default();
            g.losses.insert(name.into(), LossSetting { enabled: true, value: 40.0 });
            let err = LossParameterSet::for_generator(&g).unwrap_err();
            assert!(matches!(err, ForecastError::Configuration(ref m) if m.contains(name)), "{err:?}");
        }
    }

    #[test]
    fn unknown_category_is_rejected() {
        let mut g = GeneratorConfig::default();
        g.losses.insert("soilng".into(), LossSetting { enabled: true, value: 10.0 });
        let err = LossParameterSet::for_generator(&g).unwrap_err();
        assert!(matches!(err, ForecastError::Configuration(ref m) if m.contains("soilng")), "{err:?}");
    }

    #[test]
    fn default_generator_total() {
        // 0.99⁵ × 0.995
        let s = LossParameterSet::for_generator(&GeneratorConfig::default()).unwrap();
        let expected = 100.0 * (1.0 - 0.99f64.powi(5) * 0.995);
        assert!((s.total_loss_pct() - expected).abs() < 1e-9);
    }
}
