//! Output formatting for CLI display.

use crate::model::{MissionEstimate, MissionReport};

/// Format a duration as `Xm Ys`.
pub(super) fn format_duration(seconds: f64) -> String {
    let total = seconds.round().max(0.0) as u64;
    format!("{}m {}s", total / 60, total % 60)
}

/// Format a distance in meters with thousands separators, one decimal.
pub(super) fn format_meters(meters: f64) -> String {
    let whole = meters.trunc().abs() as u64;
    let tenths = ((meters.abs() - meters.trunc().abs()) * 10.0).round() as u64;
    // Carry when the fraction rounds up to a whole meter.
    let (whole, tenths) = if tenths == 10 { (whole + 1, 0) } else { (whole, tenths) };

    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if meters < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{tenths}")
}

/// Human-readable mission summary, one field per line.
pub(super) fn format_report(report: &MissionReport) -> String {
    let mut out = format!(
        "Waypoints: {}\nInserted action blocks: {}",
        report.waypoint_count, report.insertion_count
    );
    match &report.estimate {
        Some(estimate) => {
            out.push('\n');
            out.push_str(&format_estimate(estimate));
        }
        None => out.push_str("\nMission estimate unavailable: fewer than two waypoints"),
    }
    out
}

pub(super) fn format_estimate(estimate: &MissionEstimate) -> String {
    format!(
        "Total distance: {} meters\n\
         Flight time: {}\n\
         Action time: {}\n\
         Total mission time: {}\n\
         Estimated battery usage: ~{:.0}%",
        format_meters(estimate.total_distance_meters),
        format_duration(estimate.flight_time_seconds),
        format_duration(estimate.action_time_seconds),
        format_duration(estimate.total_time_seconds),
        estimate.battery_percent,
    )
}
