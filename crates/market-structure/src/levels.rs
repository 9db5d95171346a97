//! Previous-day range and the current day's key opens.

use analysis_core::session::{et_anchor, trading_day_start, LONDON_OPEN, MIDNIGHT_OPEN, NY_OPEN};
use analysis_core::Candle;
use serde::{Deserialize, Serialize};

const DAY_SECS: i64 = 24 * 3600;
/// 18:00 ET trading-day start to the following ET midnight
const START_TO_MIDNIGHT_SECS: i64 = 6 * 3600;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLevels {
    pub pdh: Option<f64>,
    pub pdl: Option<f64>,
    pub day_open: Option<f64>,
    pub midnight_open: Option<f64>,
    pub midnight_open_time: Option<i64>,
    pub london_open: Option<f64>,
    pub ny_open: Option<f64>,
}

impl DailyLevels {
    /// Opens that are set, in midnight/London/NY order
    pub fn key_opens(&self) -> [Option<f64>; 3] {
        [self.midnight_open, self.london_open, self.ny_open]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyOpenTimes {
    pub midnight: i64,
    pub london: i64,
    pub ny: i64,
}

/// Unix times of the midnight, London and NY opens of the trading day containing `ts`
pub fn key_open_times(ts: i64) -> Option<KeyOpenTimes> {
    let midnight_probe = trading_day_start(ts)? + START_TO_MIDNIGHT_SECS;
    Some(KeyOpenTimes {
        midnight: et_anchor(midnight_probe, MIDNIGHT_OPEN.0, MIDNIGHT_OPEN.1)?,
        london: et_anchor(midnight_probe, LONDON_OPEN.0, LONDON_OPEN.1)?,
        ny: et_anchor(midnight_probe, NY_OPEN.0, NY_OPEN.1)?,
    })
}

/// Candles belonging to the trading day of the last candle
pub fn current_day(candles: &[Candle]) -> &[Candle] {
    let Some(start) = candles.last().and_then(|c| trading_day_start(c.time)) else {
        return &candles[..0];
    };
    let from = candles.partition_point(|c| c.time < start);
    &candles[from..]
}

fn first_open_between(candles: &[Candle], from: i64, until: i64) -> Option<&Candle> {
    candles.iter().find(|c| c.time >= from && c.time < until)
}

/// Levels for the trading day of the last candle
pub fn compute_daily_levels(candles: &[Candle]) -> DailyLevels {
    let Some(last) = candles.last() else {
        return DailyLevels::default();
    };
    let Some(day_start) = trading_day_start(last.time) else {
        return DailyLevels::default();
    };
    let day_end = day_start + DAY_SECS;

    let mut levels = DailyLevels {
        day_open: first_open_between(candles, day_start, day_end).map(|c| c.open),
        ..Default::default()
    };

    let prev_start = candles
        .iter()
        .rev()
        .find(|c| c.time < day_start)
        .and_then(|c| trading_day_start(c.time));
    if let Some(prev_start) = prev_start {
        let previous = candles.iter().filter(|c| c.time >= prev_start && c.time < day_start);
        let (high, low) = previous.fold((f64::NEG_INFINITY, f64::INFINITY), |(h, l), c| (h.max(c.high), l.min(c.low)));
        if high.is_finite() && low.is_finite() {
            levels.pdh = Some(high);
            levels.pdl = Some(low);
        }
    }

    if let Some(times) = key_open_times(last.time) {
        if let Some(c) = first_open_between(candles, times.midnight, day_end) {
            levels.midnight_open = Some(c.open);
            levels.midnight_open_time = Some(c.time);
        }
        levels.london_open = first_open_between(candles, times.london, day_end).map(|c| c.open);
        levels.ny_open = first_open_between(candles, times.ny, day_end).map(|c| c.open);
    }

    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-07-01 12:00 UTC, Monday 08:00 ET
    const START: i64 = 1_719_835_200;

    fn hourly(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let p = 100.0 + i as f64;
                Candle::new(START + i as i64 * 3600, p, p + 1.0, p - 1.0, p + 0.5, 10.0)
            })
            .collect()
    }

    #[test]
    fn test_daily_levels() {
        // through 2024-07-02 15:00 UTC (11:00 ET)
        let candles = hourly(28);
        let levels = compute_daily_levels(&candles);

        assert_eq!(levels.pdh, Some(110.0));
        assert_eq!(levels.pdl, Some(99.0));
        assert_eq!(levels.day_open, Some(110.0));
        assert_eq!(levels.midnight_open, Some(116.0));
        assert_eq!(levels.midnight_open_time, Some(START + 16 * 3600));
        assert_eq!(levels.london_open, Some(119.0));
        assert_eq!(levels.ny_open, Some(126.0));
    }

    #[test]
    fn test_before_midnight_has_no_key_opens() {
        // through 2024-07-02 02:00 UTC (Mon 22:00 ET)
        let levels = compute_daily_levels(&hourly(15));
        assert_eq!(levels.day_open, Some(110.0));
        assert!(levels.midnight_open.is_none());
        assert!(levels.ny_open.is_none());
    }

    #[test]
    fn test_current_day_slice() {
        let candles = hourly(28);
        let today = current_day(&candles);
        assert_eq!(today.len(), 18);
        assert_eq!(today[0].time, START + 10 * 3600);
        assert!(current_day(&[]).is_empty());
    }

    #[test]
    fn test_empty() {
        assert_eq!(compute_daily_levels(&[]), DailyLevels::default());
    }
}
