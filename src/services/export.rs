use std::fmt::Write;

use crate::models::forecast::{DailyRecord, ForecastResponse, HourlyRecord, PowerRecord};

/// Spreadsheet tools cap sheet names at 31 characters.
const MAX_SHEET_NAME: usize = 31;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn sheet_name(base: &str, suffix: &str) -> String {
    format!("{}_{}", base, suffix).chars().take(MAX_SHEET_NAME).collect()
}

pub fn file_name(resp: &ForecastResponse) -> String {
    format!("PV_Forecast_{}.csv", resp.start_date.format("%Y%m%d"))
}

/// Renders every generator's hourly and daily tables, then the portfolio
/// total, as `# <sheet>` sections of plain CSV. Times are local wall clock.
pub fn to_csv(resp: &ForecastResponse) -> String {
    let mut out = String::new();
    for generator in &resp.generators {
        section(&mut out, &sheet_name(&generator.name, "Hourly"));
        hourly_table(&mut out, &generator.hourly);
        section(&mut out, &sheet_name(&generator.name, "Daily"));
        daily_table(&mut out, &generator.daily);
    }
    section(&mut out, &sheet_name("Total", "Hourly"));
    power_table(&mut out, &resp.total.hourly);
    section(&mut out, &sheet_name("Total", "Daily"));
    daily_table(&mut out, &resp.total.daily);
    out
}

fn section(out: &mut String, name: &str) {
    if !out.is_empty() {
        out.push('\n');
    }
    let _ = writeln!(out, "# {}", name);
}

fn hourly_table(out: &mut String, rows: &[HourlyRecord]) {
    out.push_str(
        "time,solar_azimuth_deg,solar_elevation_deg,horizon_elevation_deg,is_night,is_shaded,\
         dni_adj,ghi_adj,dhi_adj,poa_total_w_m2,cell_temp_c,dc_power_w,snow_factor,ac_power_w,energy_kwh\n",
    );
    for r in rows {
        let _ = writeln!(
            out,
            "{},{:.3},{:.3},{:.3},{},{},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.4},{:.2},{:.4}",
            r.time.format(TIME_FORMAT),
            r.solar_azimuth_deg,
            r.solar_elevation_deg,
            r.horizon_elevation_deg,
            r.is_night,
            r.is_shaded,
            r.dni_adj,
            r.ghi_adj,
            r.dhi_adj,
            r.poa_total_w_m2,
            r.cell_temp_c,
            r.dc_power_w,
            r.snow_factor,
            r.ac_power_w,
            r.energy_kwh,
        );
    }
}

fn power_table(out: &mut String, rows: &[PowerRecord]) {
    out.push_str("time,ac_power_w,energy_kwh\n");
    for r in rows {
        let _ = writeln!(out, "{},{:.2},{:.4}", r.time.format(TIME_FORMAT), r.ac_power_w, r.energy_kwh);
    }
}

fn daily_table(out: &mut String, rows: &[DailyRecord]) {
    out.push_str("date,energy_kwh\n");
    for r in rows {
        let _ = writeln!(out, "{},{:.4}", r.date, r.energy_kwh);
    }
}
