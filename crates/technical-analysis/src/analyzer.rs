use analysis_core::{closes, Candle};
use serde::{Deserialize, Serialize};

use crate::indicators::*;

/// MFI above this is overbought
const MFI_OVERBOUGHT: f64 = 80.0;
/// MFI below this is oversold
const MFI_OVERSOLD: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OscillatorState {
    Overbought,
    Oversold,
    Bullish,
    Bearish,
    Neutral,
}

/// Where price sits relative to the VWAP ±1σ bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BandPosition {
    AboveUpper,
    Inside,
    BelowLower,
}

/// Latest-bar indicator readings consumed by bias, regime and scenario scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalSnapshot {
    pub price: f64,
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub ema200: Option<f64>,
    pub atr: Option<f64>,
    pub adx: Option<f64>,
    pub vwap: Option<f64>,
    pub vwap_upper: Option<f64>,
    pub vwap_lower: Option<f64>,
    pub vwap_band: Option<BandPosition>,
    pub macd_histogram: Option<f64>,
    pub macd_state: OscillatorState,
    pub mfi: Option<f64>,
    pub mfi_state: OscillatorState,
    pub bollinger_upper: Option<f64>,
    pub bollinger_lower: Option<f64>,
}

pub struct TechnicalAnalysisEngine {
    pub atr_period: usize,
    pub adx_period: usize,
    pub mfi_period: usize,
}

impl Default for TechnicalAnalysisEngine {
    fn default() -> Self {
        Self {
            atr_period: 14,
            adx_period: 14,
            mfi_period: 14,
        }
    }
}

impl TechnicalAnalysisEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the snapshot.
    ///
    /// `session` is the slice VWAP is anchored to (usually the current trading
    /// day); every other reading uses the full `candles` history.
    pub fn snapshot(&self, candles: &[Candle], session: &[Candle]) -> TechnicalSnapshot {
        let price = candles.last().map(|c| c.close).unwrap_or(0.0);
        let closes = closes(candles);

        let bands = vwap_bands(session);
        let vwap_band = bands.map(|b| {
            if price > b.upper_1 {
                BandPosition::AboveUpper
            } else if price < b.lower_1 {
                BandPosition::BelowLower
            } else {
                BandPosition::Inside
            }
        });

        let macd_result = macd(&closes, 12, 26, 9);
        let macd_histogram = macd_result.histogram.last().copied();
        let macd_state = match macd_histogram {
            Some(h) if h > 0.0 => OscillatorState::Bullish,
            Some(h) if h < 0.0 => OscillatorState::Bearish,
            _ => OscillatorState::Neutral,
        };

        let mfi_value = mfi(candles, self.mfi_period).last().copied();
        let mfi_state = match mfi_value {
            Some(v) if v >= MFI_OVERBOUGHT => OscillatorState::Overbought,
            Some(v) if v <= MFI_OVERSOLD => OscillatorState::Oversold,
            Some(v) if v > 50.0 => OscillatorState::Bullish,
            Some(v) if v < 50.0 => OscillatorState::Bearish,
            _ => OscillatorState::Neutral,
        };

        let bb = bollinger_bands(&closes, 20, 2.0);

        TechnicalSnapshot {
            price,
            ema20: last_ema(&closes, 20),
            ema50: last_ema(&closes, 50),
            ema200: last_ema(&closes, 200),
            atr: last_atr(candles, self.atr_period),
            adx: adx(candles, self.adx_period).adx.last().copied(),
            vwap: bands.map(|b| b.vwap),
            vwap_upper: bands.map(|b| b.upper_1),
            vwap_lower: bands.map(|b| b.lower_1),
            vwap_band,
            macd_histogram,
            macd_state,
            mfi: mfi_value,
            mfi_state,
            bollinger_upper: bb.upper.last().copied(),
            bollinger_lower: bb.lower.last().copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Accelerating uptrend so MACD momentum keeps expanding
    fn trending_candles(count: usize, step: f64) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let base = 100.0 + step * (i * i) as f64 / 100.0;
                Candle::new(i as i64 * 900, base - 0.2, base + 1.0, base - 1.0, base, 1000.0)
            })
            .collect()
    }

    #[test]
    fn test_snapshot_uptrend() {
        let candles = trending_candles(120, 0.5);
        let snap = TechnicalAnalysisEngine::new().snapshot(&candles, &candles[100..]);

        assert!(snap.ema20.unwrap() > snap.ema50.unwrap());
        assert!(snap.ema200.is_none());
        assert_eq!(snap.macd_state, OscillatorState::Bullish);
        assert!(snap.atr.unwrap() > 0.0);
        assert!(snap.vwap.is_some());
    }

    #[test]
    fn test_snapshot_empty() {
        let snap = TechnicalAnalysisEngine::new().snapshot(&[], &[]);
        assert_eq!(snap.price, 0.0);
        assert!(snap.vwap.is_none());
        assert_eq!(snap.mfi_state, OscillatorState::Neutral);
    }
}
