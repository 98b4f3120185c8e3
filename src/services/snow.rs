use crate::config::SnowConfig;

/// Per-step recovery toward an unobstructed array.
fn recovery_step(cfg: &SnowConfig) -> f64 {
    cfg.loss_on_event / (cfg.recovery_days * 24.0).max(1.0)
}

/// One factor per timestep, in order. Each step sees the state after its own
/// event or recovery, so a snow event depresses the step it occurs in.
///
/// `None` snowfall (column absent) yields 1.0 everywhere; a null reading
/// counts as no snow.
pub fn snow_factors(snowfall: Option<&[Option<f64>]>, len: usize, cfg: &SnowConfig) -> Vec<f64> {
    let Some(snowfall) = snowfall else {
        return vec![1.0; len];
    };
    let floor = 1.0 - cfg.loss_on_event;
    let step = recovery_step(cfg);

    snowfall
        .iter()
        .scan(1.0_f64, |factor, s| {
            let s = s.filter(|v| v.is_finite()).unwrap_or(0.0);
            *factor = if s >= cfg.threshold_mm_per_h {
                floor
            } else if *factor < 1.0 {
                let next = *factor + step;
                // absorb accumulated rounding on the last recovery step
                if next >= 1.0 - step * 1e-6 { 1.0 } else { next }
            } else {
                1.0
            };
            Some(*factor)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SnowConfig {
        SnowConfig { threshold_mm_per_h: 0.5, loss_on_event: 0.4, recovery_days: 2.0 }
    }

    #[test]
    fn no_column_is_a_no_op() {
        assert_eq!(snow_factors(None, 3, &cfg()), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn event_depresses_its_own_step() {
        let snow = [Some(0.0), Some(0.7), Some(0.0)];
        let f = snow_factors(Some(&snow), 3, &cfg());
        assert_eq!(f[0], 1.0);
        assert_eq!(f[1], 1.0 - 0.4);
        assert!((f[2] - (0.6 + 0.4 / 48.0)).abs() < 1e-12);
    }

    #[test]
    fn repeated_event_resets_regardless_of_state() {
        let snow = [Some(1.0), Some(0.0), Some(0.0), Some(0.5)];
        let f = snow_factors(Some(&snow), 4, &cfg());
        assert_eq!(f[3], 0.6);
    }

    #[test]
    fn recovers_fully_after_recovery_window() {
        let mut snow = vec![Some(2.0)];
        snow.extend(std::iter::repeat_n(Some(0.0), 60));
        let f = snow_factors(Some(&snow), snow.len(), &cfg());

        for w in f[..49].windows(2) {
            assert!(w[1] > w[0], "must strictly increase while recovering");
        }
        assert!(f[47] < 1.0);
        assert_eq!(f[48], 1.0);
        assert!(f.iter().all(|v| (0.6..=1.0).contains(v)));
        assert!(f[48..].iter().all(|v| *v == 1.0));
    }

    #[test]
    fn null_reading_counts_as_dry() {
        let snow = [Some(3.0), None, Some(f64::NAN)];
        let f = snow_factors(Some(&snow), 3, &cfg());
        assert!(f[1] > f[0] && f[2] > f[1]);
    }
}
