//! Trend classification and break-of-structure events.

use analysis_core::{Candle, Direction};
use serde::{Deserialize, Serialize};

use crate::swings::{detect_swings, swings_of, SwingPoint, SwingType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendType {
    UpTrend,
    DownTrend,
    Consolidation,
}

impl TrendType {
    pub fn direction(&self) -> Direction {
        match self {
            TrendType::UpTrend => Direction::Long,
            TrendType::DownTrend => Direction::Short,
            TrendType::Consolidation => Direction::Neutral,
        }
    }
}

/// Bullish/bearish tag shared by breaks, gaps and divergences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Polarity {
    Bullish,
    Bearish,
}

impl Polarity {
    pub fn direction(&self) -> Direction {
        match self {
            Polarity::Bullish => Direction::Long,
            Polarity::Bearish => Direction::Short,
        }
    }
}

/// A close through a confirmed swing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakEvent {
    pub direction: Polarity,
    /// Price of the broken swing
    pub price: f64,
    /// Time of the breaking candle
    pub time: i64,
    /// Index of the breaking candle
    pub index: usize,
    pub swing_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStructure {
    #[serde(rename = "type")]
    pub trend: TrendType,
    pub swings: Vec<SwingPoint>,
    pub bos: Vec<BreakEvent>,
    pub choch: Vec<BreakEvent>,
}

impl MarketStructure {
    /// Structure from a swing list alone, without break events
    pub fn from_swings(swings: Vec<SwingPoint>) -> Self {
        Self {
            trend: classify_trend(&swings),
            swings,
            bos: vec![],
            choch: vec![],
        }
    }

    pub fn highs(&self) -> Vec<&SwingPoint> {
        swings_of(&self.swings, SwingType::High)
    }

    pub fn lows(&self) -> Vec<&SwingPoint> {
        swings_of(&self.swings, SwingType::Low)
    }

    pub fn is_trending(&self) -> bool {
        self.trend != TrendType::Consolidation
    }

    /// Most recent break of either kind
    pub fn last_break(&self) -> Option<&BreakEvent> {
        self.bos.iter().chain(self.choch.iter()).max_by_key(|b| b.index)
    }
}

/// UP_TREND when the last two highs and the last two lows both ascend,
/// DOWN_TREND when both descend, otherwise CONSOLIDATION.
pub fn classify_trend(swings: &[SwingPoint]) -> TrendType {
    let highs = swings_of(swings, SwingType::High);
    let lows = swings_of(swings, SwingType::Low);
    if highs.len() < 2 || lows.len() < 2 {
        return TrendType::Consolidation;
    }

    let (h1, h2) = (highs[highs.len() - 2].price, highs[highs.len() - 1].price);
    let (l1, l2) = (lows[lows.len() - 2].price, lows[lows.len() - 1].price);

    if h2 > h1 && l2 > l1 {
        TrendType::UpTrend
    } else if h2 < h1 && l2 < l1 {
        TrendType::DownTrend
    } else {
        TrendType::Consolidation
    }
}

/// Find the first close beyond each swing after it is confirmed, then label
/// each break BOS or CHoCH against the running trend.
///
/// Returns `(bos, choch)`.
pub fn detect_breaks(
    candles: &[Candle],
    swings: &[SwingPoint],
    right_bars: usize,
) -> (Vec<BreakEvent>, Vec<BreakEvent>) {
    let mut breaks: Vec<BreakEvent> = swings
        .iter()
        .filter_map(|swing| {
            let start = swing.index + right_bars + 1;
            candles.iter().enumerate().skip(start).find_map(|(j, c)| {
                let direction = match swing.kind {
                    SwingType::High if c.close > swing.price => Polarity::Bullish,
                    SwingType::Low if c.close < swing.price => Polarity::Bearish,
                    _ => return None,
                };
                Some(BreakEvent {
                    direction,
                    price: swing.price,
                    time: c.time,
                    index: j,
                    swing_time: swing.time,
                })
            })
        })
        .collect();

    breaks.sort_by_key(|b| (b.index, b.swing_time));

    let mut bos = Vec::new();
    let mut choch = Vec::new();
    let mut running: Option<Polarity> = None;
    for event in breaks {
        match running {
            Some(trend) if trend != event.direction => choch.push(event),
            _ => bos.push(event),
        }
        running = Some(event.direction);
    }

    (bos, choch)
}

/// Swings, trend and break events for a candle series
pub fn analyze_structure(candles: &[Candle], left_bars: usize, right_bars: usize) -> MarketStructure {
    let swings = detect_swings(candles, left_bars, right_bars);
    let (bos, choch) = detect_breaks(candles, &swings, right_bars);
    MarketStructure {
        trend: classify_trend(&swings),
        swings,
        bos,
        choch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swing(kind: SwingType, price: f64, index: usize) -> SwingPoint {
        SwingPoint { price, time: index as i64 * 60, kind, index }
    }

    #[test]
    fn test_up_trend() {
        let swings = vec![
            swing(SwingType::Low, 90.0, 1),
            swing(SwingType::High, 100.0, 3),
            swing(SwingType::Low, 95.0, 5),
            swing(SwingType::High, 105.0, 7),
        ];
        assert_eq!(classify_trend(&swings), TrendType::UpTrend);
    }

    #[test]
    fn test_down_trend() {
        let swings = vec![
            swing(SwingType::High, 100.0, 1),
            swing(SwingType::Low, 90.0, 3),
            swing(SwingType::High, 95.0, 5),
            swing(SwingType::Low, 85.0, 7),
        ];
        assert_eq!(classify_trend(&swings), TrendType::DownTrend);
    }

    #[test]
    fn test_mixed_is_consolidation() {
        let swings = vec![
            swing(SwingType::High, 100.0, 1),
            swing(SwingType::Low, 90.0, 3),
            swing(SwingType::High, 105.0, 5),
            swing(SwingType::Low, 85.0, 7),
        ];
        assert_eq!(classify_trend(&swings), TrendType::Consolidation);
        assert_eq!(classify_trend(&swings[..3]), TrendType::Consolidation);
    }

    #[test]
    fn test_bos_then_choch() {
        // swing high at 1 (12.0), swing low at 4 (7.0)
        let hlc = [
            (10.0, 9.0, 9.5),
            (12.0, 10.0, 11.0),
            (11.0, 9.5, 10.0),
            (10.5, 8.5, 9.0),
            (9.0, 7.0, 8.0),
            (9.5, 8.0, 9.0),
            (12.5, 9.0, 12.3),
            (12.4, 6.0, 6.5),
        ];
        let candles: Vec<Candle> = hlc
            .iter()
            .enumerate()
            .map(|(i, &(h, l, c))| Candle::new(i as i64 * 60, c, h, l, c, 1.0))
            .collect();
        let swings = vec![swing(SwingType::High, 12.0, 1), swing(SwingType::Low, 7.0, 4)];

        let (bos, choch) = detect_breaks(&candles, &swings, 1);

        assert_eq!(bos.len(), 1);
        assert_eq!(bos[0].direction, Polarity::Bullish);
        assert_eq!(bos[0].index, 6);
        assert_eq!(choch.len(), 1);
        assert_eq!(choch[0].direction, Polarity::Bearish);
        assert_eq!(choch[0].index, 7);
        assert_eq!(choch[0].swing_time, 240);
    }

    #[test]
    fn test_unbroken_swing_has_no_event() {
        let candles: Vec<Candle> = (0..6).map(|i| Candle::new(i * 60, 10.0, 11.0, 9.0, 10.0, 1.0)).collect();
        let swings = vec![swing(SwingType::High, 20.0, 1)];
        let (bos, choch) = detect_breaks(&candles, &swings, 1);
        assert!(bos.is_empty() && choch.is_empty());
    }
}
