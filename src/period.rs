use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone};

use crate::error::AppError;

/// Half-open calendar-date window: queries compare
/// `created_at >= start AND created_at < end_exclusive()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn end_exclusive(&self) -> NaiveDate {
        self.end + Duration::days(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    Last7Days,
    #[default]
    Last30Days,
    Last90Days,
    Last6Months,
    Last12Months,
    AllTime,
}

impl Period {
    pub const ALL: [Period; 6] = [
        Period::Last7Days,
        Period::Last30Days,
        Period::Last90Days,
        Period::Last6Months,
        Period::Last12Months,
        Period::AllTime,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Period::Last7Days => "Last 7 days",
            Period::Last30Days => "Last 30 days",
            Period::Last90Days => "Last 90 days",
            Period::Last6Months => "Last 6 months",
            Period::Last12Months => "Last 12 months",
            Period::AllTime => "All-time",
        }
    }

    fn days(&self) -> Option<i64> {
        match self {
            Period::Last7Days => Some(7),
            Period::Last30Days => Some(30),
            Period::Last90Days => Some(90),
            Period::Last6Months => Some(180),
            Period::Last12Months => Some(365),
            Period::AllTime => None,
        }
    }

    /// Windows are anchored on the local calendar date: an evening render
    /// west of UTC must not spill into tomorrow's date.
    pub fn window(&self) -> DateWindow {
        self.window_at(Local::now())
    }

    pub fn window_at<Tz: TimeZone>(&self, now: DateTime<Tz>) -> DateWindow {
        let end = now.date_naive();
        let start = match self.days() {
            Some(days) => end - Duration::days(days),
            None => all_time_anchor(),
        };
        DateWindow { start, end }
    }

    pub fn next(&self) -> Period {
        let index = Period::ALL.iter().position(|p| p == self).unwrap_or(0);
        Period::ALL[(index + 1) % Period::ALL.len()]
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Period {
    type Err = AppError;

    // Unknown labels are a caller error, not a silent all-time fallback
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .iter()
            .find(|p| p.label().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| AppError::Config(format!("Unknown time period: {s:?}")))
    }
}

fn all_time_anchor() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid date")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn every_period_yields_ordered_window_ending_today() {
        let now = at(2024, 6, 15);
        for period in Period::ALL {
            let window = period.window_at(now);
            assert!(window.start <= window.end, "{period}");
            assert_eq!(window.end, now.date_naive(), "{period}");
        }
    }

    #[test]
    fn seven_day_window() {
        let window = Period::Last7Days.window_at(at(2024, 6, 15));
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2024, 6, 8).unwrap());
        assert_eq!(window.end, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
    }

    #[test]
    fn default_window_ends_on_local_calendar_date() {
        // Bracketing tolerates a midnight rollover between the two reads
        let before = Local::now().date_naive();
        let window = Period::Last7Days.window();
        let after = Local::now().date_naive();
        assert!(window.end == before || window.end == after);
        assert_eq!(window.start, window.end - Duration::days(7));
    }

    #[test]
    fn window_uses_the_clock_timezone_not_utc() {
        // 20:00 in a UTC-8 zone is already the next day in UTC; the window
        // must still end on the local date.
        let offset = chrono::FixedOffset::west_opt(8 * 3600).unwrap();
        let now = offset.with_ymd_and_hms(2026, 8, 23, 20, 0, 0).unwrap();
        assert_eq!(now.with_timezone(&Utc).date_naive().to_string(), "2026-08-24");

        let window = Period::Last7Days.window_at(now);
        assert_eq!(window.end, NaiveDate::from_ymd_opt(2026, 8, 23).unwrap());
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2026, 8, 16).unwrap());
    }

    #[test]
    fn all_time_starts_at_fixed_anchor() {
        let window = Period::AllTime.window_at(at(2024, 6, 15));
        assert_eq!(window.start, NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
    }

    #[test]
    fn upper_bound_is_exclusive_of_following_day() {
        let window = Period::Last7Days.window_at(at(2024, 6, 15));
        assert_eq!(
            window.end_exclusive(),
            NaiveDate::from_ymd_opt(2024, 6, 16).unwrap()
        );
    }

    #[test]
    fn labels_parse_back_to_period() {
        for period in Period::ALL {
            assert_eq!(period.label().parse::<Period>().unwrap(), period);
        }
    }

    #[test]
    fn unknown_label_is_an_error() {
        assert!("Last fortnight".parse::<Period>().is_err());
    }

    #[test]
    fn period_cycle_visits_all_and_wraps() {
        let mut period = Period::Last7Days;
        for expected in Period::ALL.iter().skip(1) {
            period = period.next();
            assert_eq!(period, *expected);
        }
        assert_eq!(period.next(), Period::Last7Days);
    }
}
