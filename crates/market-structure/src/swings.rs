//! Fractal swing detection.

use analysis_core::Candle;
use serde::{Deserialize, Serialize};

/// Bars each side for structure swings
pub const DEFAULT_SWING_BARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwingType {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwingPoint {
    pub price: f64,
    pub time: i64,
    #[serde(rename = "type")]
    pub kind: SwingType,
    pub index: usize,
}

impl SwingPoint {
    pub fn is_high(&self) -> bool {
        self.kind == SwingType::High
    }

    pub fn is_low(&self) -> bool {
        self.kind == SwingType::Low
    }
}

/// Detect swing highs and lows.
///
/// A candle is a swing high when its high is strictly greater than the highs of
/// the `left_bars` candles before it and the `right_bars` candles after it
/// (mirror for lows). Output is ordered by index, HIGH before LOW on the same bar.
pub fn detect_swings(candles: &[Candle], left_bars: usize, right_bars: usize) -> Vec<SwingPoint> {
    let n = candles.len();
    if n < left_bars + right_bars + 1 {
        return vec![];
    }

    let mut swings = Vec::new();
    for i in left_bars..n - right_bars {
        let c = &candles[i];
        let neighbours = (i - left_bars..i).chain(i + 1..=i + right_bars);

        let mut is_high = true;
        let mut is_low = true;
        for j in neighbours {
            is_high &= c.high > candles[j].high;
            is_low &= c.low < candles[j].low;
        }

        if is_high {
            swings.push(SwingPoint { price: c.high, time: c.time, kind: SwingType::High, index: i });
        }
        if is_low {
            swings.push(SwingPoint { price: c.low, time: c.time, kind: SwingType::Low, index: i });
        }
    }

    swings
}

/// Swings of one type, preserving order
pub fn swings_of(swings: &[SwingPoint], kind: SwingType) -> Vec<&SwingPoint> {
    swings.iter().filter(|s| s.kind == kind).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles_from_hl(hl: &[(f64, f64)]) -> Vec<Candle> {
        hl.iter()
            .enumerate()
            .map(|(i, &(h, l))| Candle::new(i as i64 * 60, (h + l) / 2.0, h, l, (h + l) / 2.0, 100.0))
            .collect()
    }

    #[test]
    fn test_detects_single_peak_and_trough() {
        let candles = candles_from_hl(&[
            (10.0, 9.0),
            (11.0, 9.5),
            (14.0, 12.0),
            (11.5, 10.0),
            (10.5, 8.0),
            (11.0, 9.0),
            (12.0, 10.0),
        ]);
        let swings = detect_swings(&candles, 2, 2);

        assert_eq!(swings.len(), 2);
        assert_eq!(swings[0].kind, SwingType::High);
        assert_eq!(swings[0].index, 2);
        assert_eq!(swings[0].price, 14.0);
        assert_eq!(swings[1].kind, SwingType::Low);
        assert_eq!(swings[1].index, 4);
        assert_eq!(swings[1].price, 8.0);
    }

    #[test]
    fn test_ties_disqualify() {
        let candles = candles_from_hl(&[(10.0, 5.0), (12.0, 6.0), (12.0, 6.0), (10.0, 5.0), (9.0, 4.0)]);
        let swings = detect_swings(&candles, 1, 1);
        assert!(swings.iter().all(|s| s.kind != SwingType::High));
    }

    #[test]
    fn test_no_swings_near_edges() {
        let candles = candles_from_hl(&[(15.0, 1.0), (10.0, 5.0), (11.0, 6.0)]);
        assert!(detect_swings(&candles, 1, 1).is_empty());
        assert!(detect_swings(&candles[..2], 3, 3).is_empty());
    }

    #[test]
    fn test_outside_bar_is_both_high_and_low() {
        let candles = candles_from_hl(&[(10.0, 8.0), (12.0, 6.0), (10.0, 8.0)]);
        let swings = detect_swings(&candles, 1, 1);

        assert_eq!(swings.len(), 2);
        assert_eq!(swings[0].kind, SwingType::High);
        assert_eq!(swings[1].kind, SwingType::Low);
    }

    #[test]
    fn test_deterministic() {
        let candles: Vec<Candle> = (0..80)
            .map(|i| {
                let mid = 100.0 + (i as f64 * 0.4).sin() * 4.0;
                Candle::new(i * 60, mid, mid + 1.0, mid - 1.0, mid, 10.0)
            })
            .collect();

        assert_eq!(detect_swings(&candles, 3, 3), detect_swings(&candles, 3, 3));
    }
}
