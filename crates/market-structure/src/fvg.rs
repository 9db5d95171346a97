//! Three-candle fair value gaps.

use analysis_core::Candle;
use serde::{Deserialize, Serialize};

use crate::structure::Polarity;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fvg {
    pub top: f64,
    pub bottom: f64,
    /// Time of the middle (displacement) candle
    pub time: i64,
    #[serde(rename = "type")]
    pub kind: Polarity,
    /// Index of the middle candle
    pub index: usize,
}

impl Fvg {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.bottom && price <= self.top
    }

    pub fn mid(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }

    pub fn size(&self) -> f64 {
        self.top - self.bottom
    }

    /// True once a candle after the gap trades through its far edge.
    pub fn is_mitigated(&self, candles: &[Candle]) -> bool {
        candles.iter().skip(self.index + 2).any(|c| match self.kind {
            Polarity::Bullish => c.low <= self.bottom,
            Polarity::Bearish => c.high >= self.top,
        })
    }
}

/// Scan every three-candle window for an imbalance
pub fn detect_fvgs(candles: &[Candle]) -> Vec<Fvg> {
    candles
        .windows(3)
        .enumerate()
        .filter_map(|(i, w)| {
            let (first, middle, third) = (&w[0], &w[1], &w[2]);
            if first.high < third.low {
                Some(Fvg {
                    top: third.low,
                    bottom: first.high,
                    time: middle.time,
                    kind: Polarity::Bullish,
                    index: i + 1,
                })
            } else if first.low > third.high {
                Some(Fvg {
                    top: first.low,
                    bottom: third.high,
                    time: middle.time,
                    kind: Polarity::Bearish,
                    index: i + 1,
                })
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hl(i: i64, high: f64, low: f64) -> Candle {
        Candle::new(i * 60, low, high, low, high, 1.0)
    }

    #[test]
    fn test_bullish_gap() {
        let candles = vec![hl(0, 10.0, 8.0), hl(1, 12.0, 9.0), hl(2, 15.0, 13.0)];
        let fvgs = detect_fvgs(&candles);

        assert_eq!(fvgs.len(), 1);
        assert_eq!(fvgs[0].kind, Polarity::Bullish);
        assert_eq!(fvgs[0].bottom, 10.0);
        assert_eq!(fvgs[0].top, 13.0);
        assert_eq!(fvgs[0].index, 1);
        assert_eq!(fvgs[0].time, 60);
        assert!(fvgs[0].contains(11.5));
    }

    #[test]
    fn test_bearish_gap() {
        let candles = vec![hl(0, 20.0, 18.0), hl(1, 18.5, 14.0), hl(2, 16.0, 13.0)];
        let fvgs = detect_fvgs(&candles);

        assert_eq!(fvgs.len(), 1);
        assert_eq!(fvgs[0].kind, Polarity::Bearish);
        assert_eq!(fvgs[0].top, 18.0);
        assert_eq!(fvgs[0].bottom, 16.0);
    }

    #[test]
    fn test_overlapping_candles_have_no_gap() {
        let candles = vec![hl(0, 10.0, 8.0), hl(1, 11.0, 9.0), hl(2, 12.0, 9.5)];
        assert!(detect_fvgs(&candles).is_empty());
        assert!(detect_fvgs(&candles[..2]).is_empty());
    }

    #[test]
    fn test_mitigation() {
        let mut candles = vec![hl(0, 10.0, 8.0), hl(1, 12.0, 9.0), hl(2, 15.0, 13.0), hl(3, 16.0, 12.0)];
        let fvg = detect_fvgs(&candles)[0];
        assert!(!fvg.is_mitigated(&candles));

        candles.push(hl(4, 14.0, 9.8));
        assert!(fvg.is_mitigated(&candles));
    }
}
