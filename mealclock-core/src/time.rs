//! Time utilities: wall-clock meal times, date keys and local-day projection.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// A time of day with minute precision and no timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawClockTime")]
pub struct ClockTime {
    hour: u32,
    minute: u32,
}

#[derive(Deserialize)]
struct RawClockTime {
    hour: u32,
    minute: u32,
}

impl TryFrom<RawClockTime> for ClockTime {
    type Error = PlanError;

    fn try_from(raw: RawClockTime) -> Result<Self, Self::Error> {
        ClockTime::new(raw.hour, raw.minute)
    }
}

impl ClockTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self, PlanError> {
        if hour > 23 || minute > 59 {
            return Err(PlanError::InvalidClockTime { hour, minute });
        }
        Ok(Self { hour, minute })
    }

    /// Only for compile-time constants already known to be in range.
    pub(crate) const fn from_hm(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn to_naive_time(self) -> NaiveTime {
        // In range by construction.
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }

    /// The absolute instant of this time on `date` in `tz`.
    pub fn on(self, date: NaiveDate, tz: Tz) -> DateTime<Utc> {
        local_instant(date, self, tz)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for ClockTime {
    type Err = PlanError;

    /// Parse `HH:MM` (a single-digit hour is accepted).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unparsable = || PlanError::UnparsableClockTime(s.to_string());
        let (h, m) = s.trim().split_once(':').ok_or_else(unparsable)?;
        if m.len() != 2 {
            return Err(unparsable());
        }
        let hour: u32 = h.parse().map_err(|_| unparsable())?;
        let minute: u32 = m.parse().map_err(|_| unparsable())?;
        ClockTime::new(hour, minute)
    }
}

/// Parse an IANA timezone like "America/Chicago".
pub fn parse_timezone(tz: &str) -> Result<Tz> {
    tz.parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))
}

/// Canonical day-log key: zero-padded `YYYY-MM-DD`.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d").ok()
}

/// Weekday number with 1 = Sunday ... 7 = Saturday.
pub fn weekday_number(date: NaiveDate) -> u8 {
    date.weekday().number_from_sunday() as u8
}

pub fn weekday_from_number(n: u8) -> Result<Weekday, PlanError> {
    match n {
        1 => Ok(Weekday::Sun),
        2 => Ok(Weekday::Mon),
        3 => Ok(Weekday::Tue),
        4 => Ok(Weekday::Wed),
        5 => Ok(Weekday::Thu),
        6 => Ok(Weekday::Fri),
        7 => Ok(Weekday::Sat),
        other => Err(PlanError::InvalidWeekday(other)),
    }
}

/// The calendar day `instant` falls on in `tz`.
pub fn local_day(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Project a wall-clock time onto a local calendar day.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant; times inside
/// a DST gap move forward by an hour.
pub fn local_instant(date: NaiveDate, time: ClockTime, tz: Tz) -> DateTime<Utc> {
    let ndt = date.and_time(time.to_naive_time());
    tz.from_local_datetime(&ndt)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(ndt + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&ndt))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chicago() -> Tz {
        parse_timezone("America/Chicago").unwrap()
    }

    #[test]
    fn clock_time_orders_by_hour_then_minute() {
        let a = ClockTime::new(8, 45).unwrap();
        let b = ClockTime::new(9, 0).unwrap();
        let c = ClockTime::new(9, 30).unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn clock_time_rejects_out_of_range() {
        assert_eq!(
            ClockTime::new(24, 0),
            Err(PlanError::InvalidClockTime { hour: 24, minute: 0 })
        );
        assert!(ClockTime::new(7, 60).is_err());
    }

    #[test]
    fn clock_time_parses_and_displays() {
        let t: ClockTime = "7:05".parse().unwrap();
        assert_eq!(t.to_string(), "07:05");
        assert!("12".parse::<ClockTime>().is_err());
        assert!("12:5".parse::<ClockTime>().is_err());
        assert!("25:00".parse::<ClockTime>().is_err());
    }

    #[test]
    fn clock_time_deserialize_validates() {
        let ok: ClockTime = serde_json::from_str(r#"{"hour":18,"minute":30}"#).unwrap();
        assert_eq!(ok, ClockTime::new(18, 30).unwrap());
        assert!(serde_json::from_str::<ClockTime>(r#"{"hour":30,"minute":0}"#).is_err());
    }

    #[test]
    fn weekday_numbering_starts_on_sunday() {
        // 2024-07-04 was a Thursday.
        let d = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
        assert_eq!(weekday_number(d), 5);
        assert_eq!(weekday_from_number(5).unwrap(), Weekday::Thu);
        assert_eq!(weekday_number(NaiveDate::from_ymd_opt(2024, 7, 7).unwrap()), 1);
        assert!(weekday_from_number(0).is_err());
        assert!(weekday_from_number(8).is_err());
    }

    #[test]
    fn day_key_is_zero_padded() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(day_key(d), "2024-03-05");
        assert_eq!(parse_day_key("2024-03-05"), Some(d));
        assert_eq!(parse_day_key("2024-3-5x"), None);
    }

    #[test]
    fn local_instant_uses_zone_offset() {
        // Feb is CST (UTC-6)
        let d = NaiveDate::from_ymd_opt(2026, 2, 20).unwrap();
        let at = local_instant(d, ClockTime::new(23, 59).unwrap(), chicago());
        assert_eq!(at.to_rfc3339(), "2026-02-21T05:59:00+00:00");
    }

    #[test]
    fn local_instant_skips_dst_gap() {
        // 2026-03-08 02:30 does not exist in Chicago.
        let d = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let at = local_instant(d, ClockTime::new(2, 30).unwrap(), chicago());
        assert_eq!(at.to_rfc3339(), "2026-03-08T08:30:00+00:00");
    }

    #[test]
    fn local_day_crosses_utc_midnight() {
        let instant = Utc.with_ymd_and_hms(2026, 2, 21, 3, 0, 0).unwrap();
        assert_eq!(
            local_day(instant, chicago()),
            NaiveDate::from_ymd_opt(2026, 2, 20).unwrap()
        );
    }
}
