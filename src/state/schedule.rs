//! Daily reset schedule.
//!
//! Rounds end at a fixed UTC hour every day. If the current time is at or past
//! that hour, the next reset is tomorrow; otherwise it is later today.

use chrono::{DateTime, Days, Duration, NaiveTime, Utc};
use thiserror::Error;

use crate::config::DEFAULT_RESET_HOUR_UTC;

const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("{0} is not an hour of the day")]
    InvalidHour(u32),
}

/// When the daily reset happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetSchedule {
    hour: u32,
}

impl Default for ResetSchedule {
    fn default() -> Self {
        Self {
            hour: DEFAULT_RESET_HOUR_UTC,
        }
    }
}

impl ResetSchedule {
    pub fn new(hour: u32) -> Result<Self, ScheduleError> {
        if hour >= 24 {
            return Err(ScheduleError::InvalidHour(hour));
        }
        Ok(Self { hour })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    fn today_at_reset(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let time = NaiveTime::from_hms_opt(self.hour, 0, 0).unwrap_or_default();
        now.date_naive().and_time(time).and_utc()
    }

    /// First reset strictly after `now`.
    pub fn next_boundary(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = self.today_at_reset(now);
        if now >= today {
            today + Days::new(1)
        } else {
            today
        }
    }

    /// Last reset at or before `now`.
    pub fn previous_boundary(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.next_boundary(now) - Days::new(1)
    }

    pub fn time_until_reset(&self, now: DateTime<Utc>) -> Duration {
        self.next_boundary(now) - now
    }

    /// How far through the current day-long round `now` is, 0..=100.
    pub fn progress_percent(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = (now - self.previous_boundary(now)).num_milliseconds();
        (elapsed as f64 / DAY_MILLIS as f64 * 100.0).clamp(0.0, 100.0)
    }

    /// Time left formatted as `"{h}h {m}m {s}s"`.
    pub fn format_time_left(&self, now: DateTime<Utc>) -> String {
        format_hms(self.time_until_reset(now))
    }
}

/// Format a duration as `"{h}h {m}m {s}s"`, truncating to whole seconds.
pub fn format_hms(duration: Duration) -> String {
    let seconds = duration.num_seconds().max(0);
    format!(
        "{}h {}m {}s",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_hour() {
        assert_eq!(ResetSchedule::new(24), Err(ScheduleError::InvalidHour(24)));
        assert!(ResetSchedule::new(0).is_ok());
        assert!(ResetSchedule::new(23).is_ok());
    }

    #[test]
    fn test_next_boundary_before_reset_is_today() {
        let schedule = ResetSchedule::default();
        assert_eq!(schedule.next_boundary(at(13, 59, 59)), at(14, 0, 0));
    }

    #[test]
    fn test_next_boundary_at_or_after_reset_is_tomorrow() {
        let schedule = ResetSchedule::default();
        let tomorrow = Utc.with_ymd_and_hms(2025, 6, 2, 14, 0, 0).unwrap();

        assert_eq!(schedule.next_boundary(at(14, 0, 0)), tomorrow);
        assert_eq!(schedule.next_boundary(at(23, 30, 0)), tomorrow);
    }

    #[test]
    fn test_next_boundary_across_month_end() {
        let schedule = ResetSchedule::default();
        let now = Utc.with_ymd_and_hms(2025, 6, 30, 15, 0, 0).unwrap();
        assert_eq!(
            schedule.next_boundary(now),
            Utc.with_ymd_and_hms(2025, 7, 1, 14, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_progress_wraps_at_reset() {
        let schedule = ResetSchedule::new(14).unwrap();

        let before = schedule.progress_percent(at(13, 59, 59));
        assert!(before > 99.99 && before < 100.0, "got {}", before);

        let after = schedule.progress_percent(at(14, 0, 1));
        assert!(after > 0.0 && after < 0.01, "got {}", after);
    }

    #[test]
    fn test_progress_midway() {
        let schedule = ResetSchedule::new(14).unwrap();
        let half = schedule.progress_percent(at(2, 0, 0));
        assert!((half - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_progress_at_boundary_is_zero() {
        let schedule = ResetSchedule::new(0).unwrap();
        assert_eq!(schedule.progress_percent(at(0, 0, 0)), 0.0);
    }

    #[test]
    fn test_format_time_left() {
        let schedule = ResetSchedule::default();
        assert_eq!(schedule.format_time_left(at(11, 58, 30)), "2h 1m 30s");
        assert_eq!(schedule.format_time_left(at(14, 0, 0)), "24h 0m 0s");
    }

    #[test]
    fn test_format_hms_negative() {
        assert_eq!(format_hms(Duration::seconds(-5)), "0h 0m 0s");
    }
}
