use std::collections::BTreeMap;

use chrono::DateTime;
use chrono_tz::Tz;

use crate::models::forecast::{GeneratorResult, PortfolioTotal, PowerRecord};
use crate::services::generator_pipeline::daily_energy;

/// Sums generator series over the union of their timestamps. A generator
/// without a row at some timestamp contributes zero there. The daily total
/// is resampled from the summed hourly energy.
pub fn aggregate(results: &[GeneratorResult]) -> PortfolioTotal {
    let mut sums: BTreeMap<DateTime<Tz>, (f64, f64)> = BTreeMap::new();
    for result in results {
        for row in &result.hourly {
            let slot = sums.entry(row.time).or_insert((0.0, 0.0));
            slot.0 += finite_or_zero(row.ac_power_w);
            slot.1 += finite_or_zero(row.energy_kwh);
        }
    }

    let hourly: Vec<PowerRecord> = sums
        .into_iter()
        .map(|(time, (ac_power_w, energy_kwh))| PowerRecord { time, ac_power_w, energy_kwh })
        .collect();
    let times: Vec<DateTime<Tz>> = hourly.iter().map(|r| r.time).collect();
    let energy: Vec<f64> = hourly.iter().map(|r| r.energy_kwh).collect();

    PortfolioTotal {
        daily: daily_energy(&times, &energy),
        total_kwh: energy.iter().sum(),
        hourly,
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}
