use async_trait::async_trait;
use chrono::Utc;
use crate::{AnalysisError, Candle, Timeframe};

/// Turns a raw provider payload into a canonical, ascending candle sequence
pub trait CandleNormalizer {
    type Payload;

    fn normalize(&self, payload: &Self::Payload) -> Result<Vec<Candle>, AnalysisError>;
}

/// Source of candle series for a symbol/timeframe pair
#[async_trait]
pub trait CandleFeed: Send + Sync {
    async fn fetch(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<Candle>, AnalysisError>;
}

/// Wall clock in unix seconds. Detectors take `now` as an argument; callers read it here.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;

    fn now_ms(&self) -> i64 {
        self.now() * 1000
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Clock pinned to a fixed instant (replays, tests)
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}
