//! Provider payload normalisation.
//!
//! Accepts a vendor-neutral columnar payload (parallel arrays with nullable
//! entries) and produces the canonical candle sequence every detector expects:
//! null rows dropped, sorted ascending, one candle per timestamp.

use serde::{Deserialize, Serialize};

use crate::{AnalysisError, Candle, CandleNormalizer};

/// Columnar quote payload: `{ "t": [...], "o": [...], "h": [...], "l": [...], "c": [...], "v": [...] }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnarQuote {
    #[serde(rename = "t")]
    pub time: Vec<Option<i64>>,
    #[serde(rename = "o")]
    pub open: Vec<Option<f64>>,
    #[serde(rename = "h")]
    pub high: Vec<Option<f64>>,
    #[serde(rename = "l")]
    pub low: Vec<Option<f64>>,
    #[serde(rename = "c")]
    pub close: Vec<Option<f64>>,
    #[serde(rename = "v", default)]
    pub volume: Vec<Option<f64>>,
}

pub struct ColumnarNormalizer;

impl CandleNormalizer for ColumnarNormalizer {
    type Payload = ColumnarQuote;

    fn normalize(&self, payload: &ColumnarQuote) -> Result<Vec<Candle>, AnalysisError> {
        let n = payload.time.len();
        let lengths = [
            payload.open.len(),
            payload.high.len(),
            payload.low.len(),
            payload.close.len(),
        ];
        if lengths.iter().any(|&len| len != n) {
            return Err(AnalysisError::InvalidData(format!(
                "column length mismatch: t={} o={} h={} l={} c={}",
                n, lengths[0], lengths[1], lengths[2], lengths[3]
            )));
        }

        let candles = (0..n)
            .filter_map(|i| {
                Some(Candle {
                    time: payload.time[i]?,
                    open: payload.open[i]?,
                    high: payload.high[i]?,
                    low: payload.low[i]?,
                    close: payload.close[i]?,
                    volume: payload.volume.get(i).copied().flatten().unwrap_or(0.0),
                })
            })
            .filter(|c| c.open.is_finite() && c.high.is_finite() && c.low.is_finite() && c.close.is_finite())
            .collect();

        Ok(sanitize(candles))
    }
}

/// Sort ascending by time and keep the last candle seen for each timestamp
pub fn sanitize(mut candles: Vec<Candle>) -> Vec<Candle> {
    candles.sort_by_key(|c| c.time);
    let mut out: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        match out.last_mut() {
            Some(last) if last.time == candle.time => *last = candle,
            _ => out.push(candle),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_drops_null_rows_and_sorts() {
        let payload = ColumnarQuote {
            time: vec![Some(120), Some(60), Some(180)],
            open: vec![Some(2.0), Some(1.0), None],
            high: vec![Some(2.5), Some(1.5), Some(3.5)],
            low: vec![Some(1.5), Some(0.5), Some(2.5)],
            close: vec![Some(2.2), Some(1.2), Some(3.0)],
            volume: vec![Some(10.0), None, Some(30.0)],
        };

        let candles = ColumnarNormalizer.normalize(&payload).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].time, 60);
        assert_eq!(candles[0].volume, 0.0);
        assert_eq!(candles[1].time, 120);
    }

    #[test]
    fn test_normalize_rejects_ragged_columns() {
        let payload = ColumnarQuote {
            time: vec![Some(1), Some(2)],
            open: vec![Some(1.0)],
            high: vec![Some(1.0), Some(1.0)],
            low: vec![Some(1.0), Some(1.0)],
            close: vec![Some(1.0), Some(1.0)],
            volume: vec![],
        };
        assert!(matches!(
            ColumnarNormalizer.normalize(&payload),
            Err(AnalysisError::InvalidData(_))
        ));
    }

    #[test]
    fn test_sanitize_dedups_times() {
        let a = Candle::new(10, 1.0, 2.0, 0.5, 1.5, 1.0);
        let b = Candle::new(10, 1.1, 2.1, 0.6, 1.6, 2.0);
        let out = sanitize(vec![b, a]);
        assert_eq!(out.len(), 1);
    }
}
