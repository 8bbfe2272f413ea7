//! Leaderboard time windows.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Ranking window for the leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardPeriod {
    Daily,
    Weekly,
    Monthly,
    AllTime,
}

impl LeaderboardPeriod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::AllTime => "all_time",
        }
    }

    /// Start of the current bucket for this period, in UTC.
    ///
    /// * daily: today at midnight
    /// * weekly: the most recent Sunday at midnight (today if it is Sunday)
    /// * monthly: the first day of the month at midnight
    /// * all_time: unbounded (`None`)
    pub fn window_start(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = now.date_naive();

        let first_day = match self {
            Self::Daily => today,
            Self::Weekly => today - Duration::days(i64::from(today.weekday().num_days_from_sunday())),
            Self::Monthly => today - Duration::days(i64::from(today.day0())),
            Self::AllTime => return None,
        };

        Some(midnight(first_day))
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

impl fmt::Display for LeaderboardPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a period name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePeriodError(pub String);

impl fmt::Display for ParsePeriodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid leaderboard period '{}': expected daily, weekly, monthly or all_time",
            self.0
        )
    }
}

impl std::error::Error for ParsePeriodError {}

impl FromStr for LeaderboardPeriod {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "all_time" | "alltime" | "all-time" => Ok(Self::AllTime),
            _ => Err(ParsePeriodError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, hour, 30, 0).unwrap()
    }

    #[test]
    fn test_parse_period() {
        assert_eq!("daily".parse::<LeaderboardPeriod>(), Ok(LeaderboardPeriod::Daily));
        assert_eq!("WEEKLY".parse::<LeaderboardPeriod>(), Ok(LeaderboardPeriod::Weekly));
        assert_eq!("monthly".parse::<LeaderboardPeriod>(), Ok(LeaderboardPeriod::Monthly));
        assert_eq!("all_time".parse::<LeaderboardPeriod>(), Ok(LeaderboardPeriod::AllTime));
        assert_eq!("all-time".parse::<LeaderboardPeriod>(), Ok(LeaderboardPeriod::AllTime));
        assert!("yearly".parse::<LeaderboardPeriod>().is_err());
    }

    #[test]
    fn test_daily_window_starts_at_midnight() {
        let now = at(2026, 10, 14, 17);
        assert_eq!(
            LeaderboardPeriod::Daily.window_start(now),
            Some(Utc.with_ymd_and_hms(2026, 10, 14, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_weekly_window_starts_on_sunday() {
        // 2026-10-14 is a Wednesday
        let wednesday = at(2026, 10, 14, 9);
        assert_eq!(
            LeaderboardPeriod::Weekly.window_start(wednesday),
            Some(Utc.with_ymd_and_hms(2026, 10, 11, 0, 0, 0).unwrap())
        );

        // On a Sunday the window starts the same day
        let sunday = at(2026, 10, 18, 23);
        assert_eq!(
            LeaderboardPeriod::Weekly.window_start(sunday),
            Some(Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_monthly_window_starts_on_first_day() {
        let now = at(2026, 2, 28, 12);
        assert_eq!(
            LeaderboardPeriod::Monthly.window_start(now),
            Some(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_all_time_is_unbounded() {
        assert_eq!(LeaderboardPeriod::AllTime.window_start(at(2026, 1, 1, 0)), None);
    }
}
