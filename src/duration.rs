use std::time::Duration;

use chrono::{DateTime, Utc};

/// Elapsed time between `started_at` and `completed_at`.
///
/// Returns `None` when either timestamp is missing or when `completed_at` is
/// not strictly after `started_at`. That covers jobs that are still running
/// and jobs cancelled before they ever started.
pub fn measure(
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
) -> Option<Duration> {
    let (started_at, completed_at) = (started_at?, completed_at?);
    if completed_at <= started_at {
        return None;
    }
    (completed_at - started_at).to_std().ok()
}

/// Formats a duration as `1h2m3s`, omitting leading zero units.
pub fn format(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, total / 60 % 60, total % 60);
    match (hours, minutes) {
        (0, 0) => format!("{seconds}s"),
        (0, _) => format!("{minutes}m{seconds}s"),
        _ => format!("{hours}h{minutes}m{seconds}s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2024, 1, 1, h, m, s).unwrap())
    }

    #[test]
    fn measures_completed_after_started() {
        assert_eq!(
            measure(at(10, 0, 0), at(10, 5, 30)),
            Some(Duration::from_secs(330))
        );
    }

    #[test]
    fn equal_timestamps_are_not_measurable() {
        assert_eq!(measure(at(10, 0, 0), at(10, 0, 0)), None);
    }

    #[test]
    fn completed_before_started_is_not_measurable() {
        assert_eq!(measure(at(10, 5, 0), at(10, 0, 0)), None);
    }

    #[test]
    fn missing_timestamps_are_not_measurable() {
        assert_eq!(measure(None, at(10, 0, 0)), None);
        assert_eq!(measure(at(10, 0, 0), None), None);
        assert_eq!(measure(None, None), None);
    }

    #[test]
    fn sub_second_difference() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = start + chrono::Duration::milliseconds(250);
        assert_eq!(
            measure(Some(start), Some(end)),
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format(Duration::ZERO), "0s");
        assert_eq!(format(Duration::from_secs(45)), "45s");
        assert_eq!(format(Duration::from_secs(330)), "5m30s");
        assert_eq!(format(Duration::from_secs(3600)), "1h0m0s");
        assert_eq!(format(Duration::from_secs(3723)), "1h2m3s");
    }
}
