use serde::{Deserialize, Serialize};

/// OHLCV candle. `time` is the bar open in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self { time, open, high, low, close, volume }
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Absolute body size
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Body size measured in the given direction; zero for opposite-colored candles.
    pub fn directional_body(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Long => (self.close - self.open).max(0.0),
            Direction::Short => (self.open - self.close).max(0.0),
            Direction::Neutral => 0.0,
        }
    }
}

/// Trade direction shared by every signal in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
    #[default]
    Neutral,
}

impl Direction {
    /// +1 for long, -1 for short, 0 for neutral
    pub fn sign(&self) -> i32 {
        match self {
            Direction::Long => 1,
            Direction::Short => -1,
            Direction::Neutral => 0,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
            Direction::Neutral => Direction::Neutral,
        }
    }

    pub fn is_neutral(&self) -> bool {
        matches!(self, Direction::Neutral)
    }

    /// Direction from a signed score using symmetric thresholds
    pub fn from_score(score: f64, threshold: f64) -> Self {
        if score >= threshold {
            Direction::Long
        } else if score <= -threshold {
            Direction::Short
        } else {
            Direction::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
            Direction::Neutral => "NEUTRAL",
        }
    }
}

/// Candle interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Day1,
}

impl Timeframe {
    pub fn to_minutes(&self) -> i64 {
        match self {
            Timeframe::Minute1 => 1,
            Timeframe::Minute5 => 5,
            Timeframe::Minute15 => 15,
            Timeframe::Minute30 => 30,
            Timeframe::Hour1 => 60,
            Timeframe::Hour4 => 240,
            Timeframe::Day1 => 1440,
        }
    }

    pub fn to_seconds(&self) -> i64 {
        self.to_minutes() * 60
    }

    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Minute30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Day1 => "1d",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1m" | "1min" => Some(Timeframe::Minute1),
            "5m" | "5min" => Some(Timeframe::Minute5),
            "15m" | "15min" => Some(Timeframe::Minute15),
            "30m" | "30min" => Some(Timeframe::Minute30),
            "1h" | "60m" | "1hour" => Some(Timeframe::Hour1),
            "4h" | "4hour" => Some(Timeframe::Hour4),
            "1d" | "d" | "daily" => Some(Timeframe::Day1),
            _ => None,
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Closing prices of a candle slice
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directional_body() {
        let c = Candle::new(0, 10.0, 14.0, 9.0, 13.0, 100.0);
        assert_eq!(c.directional_body(Direction::Long), 3.0);
        assert_eq!(c.directional_body(Direction::Short), 0.0);
        assert!(c.is_bullish());
    }

    #[test]
    fn test_direction_from_score() {
        assert_eq!(Direction::from_score(10.0, 10.0), Direction::Long);
        assert_eq!(Direction::from_score(-10.0, 10.0), Direction::Short);
        assert_eq!(Direction::from_score(9.9, 10.0), Direction::Neutral);
    }

    #[test]
    fn test_timeframe_parse_roundtrip() {
        for tf in [Timeframe::Minute5, Timeframe::Minute15, Timeframe::Hour1] {
            assert_eq!(Timeframe::parse(tf.label()), Some(tf));
        }
        assert_eq!(Timeframe::parse("weekly"), None);
        assert_eq!(Timeframe::Minute15.to_seconds(), 900);
    }
}
