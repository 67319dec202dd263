//! Rolling uptime accounting.

use chrono::TimeDelta;

use minewatch_state::{Observation, Timestamp};

/// Percentage of samples in the last `window_days` that met
/// `expected_workers`.
///
/// Samples are judged against the threshold passed in, not the status
/// recorded at sample time, so changing a site's expected count
/// reinterprets its history. `None` means no samples fall inside the
/// window, which is not the same as 0%.
pub fn uptime_percentage(
    history: &[Observation],
    expected_workers: u32,
    now: Timestamp,
    window_days: u32,
) -> Option<f64> {
    let cutoff = now.checked_sub_signed(TimeDelta::days(i64::from(window_days)));
    let (up, total) = history
        .iter()
        .filter(|entry| cutoff.is_none_or(|cutoff| entry.timestamp > cutoff))
        .fold((0u32, 0u32), |(up, total), entry| {
            let up = up + u32::from(entry.worker_count >= expected_workers);
            (up, total + 1)
        });

    if total == 0 {
        return None;
    }
    Some(100.0 * f64::from(up) / f64::from(total))
}
