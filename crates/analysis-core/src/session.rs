//! New York session clock.
//!
//! Futures sessions, kill zones and key opens are defined in America/New_York
//! civil time. Instead of a tz database the offset follows a month heuristic:
//! March through October is EDT (UTC-4), everything else EST (UTC-5).

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

/// London kill zone, 02:00-05:00 ET
const LONDON_KZ: (u32, u32) = (2 * 60, 5 * 60);
/// New York AM kill zone, 07:00-10:00 ET
const NY_AM_KZ: (u32, u32) = (7 * 60, 10 * 60);
/// New York PM session, 13:30-16:00 ET
const NY_PM: (u32, u32) = (13 * 60 + 30, 16 * 60);
/// Asia session, 20:00-24:00 ET
const ASIA: (u32, u32) = (20 * 60, 24 * 60);
/// Daily CME maintenance break, 17:00-18:00 ET
const MAINTENANCE: (u32, u32) = (17 * 60, 18 * 60);

/// Hour (ET) at which a futures trading day begins
pub const TRADING_DAY_START_HOUR: u32 = 18;

pub const MIDNIGHT_OPEN: (u32, u32) = (0, 0);
pub const LONDON_OPEN: (u32, u32) = (3, 0);
pub const NY_OPEN: (u32, u32) = (9, 30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradingSession {
    Asia,
    LondonKillzone,
    NewYorkAm,
    NewYorkPm,
    Regular,
    OffHours,
}

impl TradingSession {
    pub fn is_killzone(&self) -> bool {
        matches!(self, TradingSession::LondonKillzone | TradingSession::NewYorkAm)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub session: TradingSession,
    pub is_killzone: bool,
    pub is_off_hours: bool,
    /// "HH:MM" in New York time
    pub et_time: String,
    pub et_offset_hours: i32,
}

/// UTC months treated as daylight time. November counts as standard time
/// even though the switch back falls in its first week.
pub const DST_MONTHS: std::ops::RangeInclusive<u32> = 3..=10;

/// UTC offset (hours) of New York time at `ts`
pub fn et_offset_hours(ts: i64) -> i32 {
    let month = DateTime::from_timestamp(ts, 0).map(|d| d.month()).unwrap_or(1);
    if DST_MONTHS.contains(&month) {
        -4
    } else {
        -5
    }
}

/// Naive New York wall-clock time for a unix timestamp
pub fn to_et(ts: i64) -> Option<NaiveDateTime> {
    let local = ts + et_offset_hours(ts) as i64 * 3600;
    DateTime::from_timestamp(local, 0).map(|d| d.naive_utc())
}

/// Minutes since ET midnight
pub fn et_minute_of_day(ts: i64) -> Option<u32> {
    to_et(ts).map(|dt| dt.hour() * 60 + dt.minute())
}

fn et_to_unix(date: NaiveDate, hour: u32, minute: u32, offset_hours: i32) -> Option<i64> {
    let naive = date.and_hms_opt(hour, minute, 0)?;
    Some(naive.and_utc().timestamp() - offset_hours as i64 * 3600)
}

/// Unix timestamp of `hour:minute` ET on the ET calendar date of `ts`
pub fn et_anchor(ts: i64, hour: u32, minute: u32) -> Option<i64> {
    let date = to_et(ts)?.date();
    et_to_unix(date, hour, minute, et_offset_hours(ts))
}

/// Start (18:00 ET) of the futures trading day that contains `ts`
pub fn trading_day_start(ts: i64) -> Option<i64> {
    let et = to_et(ts)?;
    let date = if et.hour() >= TRADING_DAY_START_HOUR {
        et.date()
    } else {
        et.date() - Duration::days(1)
    };
    et_to_unix(date, TRADING_DAY_START_HOUR, 0, et_offset_hours(ts))
}

fn within(minute: u32, window: (u32, u32)) -> bool {
    minute >= window.0 && minute < window.1
}

/// Classify the session for a timestamp
pub fn session_at(ts: i64) -> SessionInfo {
    let offset = et_offset_hours(ts);
    let Some(et) = to_et(ts) else {
        return SessionInfo {
            session: TradingSession::OffHours,
            is_killzone: false,
            is_off_hours: true,
            et_time: "--:--".to_string(),
            et_offset_hours: offset,
        };
    };

    let minute = et.hour() * 60 + et.minute();
    let weekday = et.weekday();
    let weekend_closed = match weekday {
        Weekday::Sat => true,
        Weekday::Sun => minute < TRADING_DAY_START_HOUR * 60,
        Weekday::Fri => minute >= MAINTENANCE.0,
        _ => false,
    };

    let session = if weekend_closed || within(minute, MAINTENANCE) {
        TradingSession::OffHours
    } else if within(minute, LONDON_KZ) {
        TradingSession::LondonKillzone
    } else if within(minute, NY_AM_KZ) {
        TradingSession::NewYorkAm
    } else if within(minute, NY_PM) {
        TradingSession::NewYorkPm
    } else if within(minute, ASIA) {
        TradingSession::Asia
    } else {
        TradingSession::Regular
    };

    SessionInfo {
        session,
        is_killzone: session.is_killzone(),
        is_off_hours: session == TradingSession::OffHours,
        et_time: format!("{:02}:{:02}", et.hour(), et.minute()),
        et_offset_hours: offset,
    }
}
