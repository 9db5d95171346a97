use analysis_core::Candle;
use market_structure::SwingPoint;
use serde::{Deserialize, Serialize};
use technical_analysis::{adx, atr};
use tracing::debug;

/// Market regime classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketRegime {
    /// Directional move with a strong ADX
    Trending,

    /// Compressed or weakly trending range
    Ranging,

    /// Dense, overlapping swings
    Choppy,

    /// Volatility well above its recent average
    Expansion,

    /// Unable to classify (insufficient data)
    Unknown,
}

impl MarketRegime {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            MarketRegime::Trending => "Trending",
            MarketRegime::Ranging => "Ranging",
            MarketRegime::Choppy => "Choppy",
            MarketRegime::Expansion => "Expansion",
            MarketRegime::Unknown => "Unknown",
        }
    }
}

/// Regime detection result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegimeDetectionResult {
    pub regime: MarketRegime,
    pub metrics: RegimeMetrics,
}

/// Inputs the classification was made from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegimeMetrics {
    pub adx: f64,
    /// Current ATR
    pub atr: f64,
    /// Mean of the recent ATR values
    pub atr_average: f64,
    /// Current ATR / average ATR
    pub volatility_ratio: f64,
    /// Swings inside the density window
    pub swing_density: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegimeConfig {
    pub min_bars: usize,
    pub adx_period: usize,
    pub atr_period: usize,
    /// ATR values averaged for the volatility ratio
    pub atr_average_period: usize,
    /// Most recent candles in which swings are counted
    pub density_window: usize,
    pub choppy_density: usize,
    pub trending_adx: f64,
    pub compression_ratio: f64,
    pub expansion_ratio: f64,
    pub override_adx: f64,
    pub override_density: usize,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            min_bars: 50,
            adx_period: 14,
            atr_period: 14,
            atr_average_period: 20,
            density_window: 50,
            choppy_density: 12,
            trending_adx: 25.0,
            compression_ratio: 0.75,
            expansion_ratio: 1.5,
            override_adx: 30.0,
            override_density: 10,
        }
    }
}

impl RegimeConfig {
    /// Classify from raw metrics. Pure; the volatile-trend override is
    /// evaluated last and wins.
    pub fn classify(&self, adx: f64, volatility_ratio: f64, swing_density: usize) -> (MarketRegime, String) {
        let (mut regime, mut reason) = if swing_density > self.choppy_density {
            (MarketRegime::Choppy, format!("swing density {} > {}", swing_density, self.choppy_density))
        } else if adx > self.trending_adx {
            (MarketRegime::Trending, format!("ADX {:.1} > {}", adx, self.trending_adx))
        } else if volatility_ratio < self.compression_ratio {
            (MarketRegime::Ranging, format!("compression, volatility ratio {:.2}", volatility_ratio))
        } else if volatility_ratio > self.expansion_ratio {
            (MarketRegime::Expansion, format!("volatility ratio {:.2} > {}", volatility_ratio, self.expansion_ratio))
        } else {
            (MarketRegime::Ranging, format!("weak trend, ADX {:.1}", adx))
        };

        if adx > self.override_adx && swing_density > self.override_density {
            regime = MarketRegime::Choppy;
            reason = format!("volatile trend: ADX {:.1} with swing density {}", adx, swing_density);
        }

        (regime, reason)
    }
}

/// Market regime detector
pub struct MarketRegimeDetector {
    config: RegimeConfig,
}

impl MarketRegimeDetector {
    pub fn new() -> Self {
        Self::with_config(RegimeConfig::default())
    }

    pub fn with_config(config: RegimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegimeConfig {
        &self.config
    }

    /// Detect the regime of a candle series; `swings` are the structure swings
    /// of the same series.
    pub fn detect_regime(&self, candles: &[Candle], swings: &[SwingPoint]) -> RegimeDetectionResult {
        let cfg = &self.config;
        if candles.len() < cfg.min_bars {
            return RegimeDetectionResult {
                regime: MarketRegime::Unknown,
                metrics: RegimeMetrics {
                    reason: format!("Insufficient data: {} bars (need {})", candles.len(), cfg.min_bars),
                    ..Default::default()
                },
            };
        }

        let metrics = self.calculate_metrics(candles, swings);
        let (regime, reason) = cfg.classify(metrics.adx, metrics.volatility_ratio, metrics.swing_density);
        debug!("Regime {} ({})", regime.name(), reason);

        RegimeDetectionResult {
            regime,
            metrics: RegimeMetrics { reason, ..metrics },
        }
    }

    fn calculate_metrics(&self, candles: &[Candle], swings: &[SwingPoint]) -> RegimeMetrics {
        let cfg = &self.config;

        let adx_value = adx(candles, cfg.adx_period).adx.last().copied().unwrap_or(0.0);

        let atr_values = atr(candles, cfg.atr_period);
        let current_atr = atr_values.last().copied().unwrap_or(0.0);
        let recent = &atr_values[atr_values.len().saturating_sub(cfg.atr_average_period)..];
        let atr_average = if recent.is_empty() {
            0.0
        } else {
            recent.iter().sum::<f64>() / recent.len() as f64
        };
        let volatility_ratio = if atr_average > 0.0 { current_atr / atr_average } else { 1.0 };

        let window_start = candles[candles.len().saturating_sub(cfg.density_window)].time;
        let swing_density = swings.iter().filter(|s| s.time >= window_start).count();

        RegimeMetrics {
            adx: adx_value,
            atr: current_atr,
            atr_average,
            volatility_ratio,
            swing_density,
            reason: String::new(),
        }
    }
}

impl Default for MarketRegimeDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_structure::detect_swings;

    fn create_test_candles(count: usize, trend: f64) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let base_price = 100.0 + (i as f64 * trend);
                Candle::new(i as i64 * 900, base_price, base_price + 1.0, base_price - 1.0, base_price, 1000.0)
            })
            .collect()
    }

    #[test]
    fn test_uptrend_detection() {
        let detector = MarketRegimeDetector::new();
        let candles = create_test_candles(100, 0.5);
        let swings = detect_swings(&candles, 3, 3);

        let result = detector.detect_regime(&candles, &swings);

        assert_eq!(result.regime, MarketRegime::Trending);
        assert!(result.metrics.adx > 25.0);
        assert_eq!(result.metrics.swing_density, 0);
    }

    #[test]
    fn test_choppy_tape() {
        let detector = MarketRegimeDetector::new();
        // alternating highs and lows every other bar
        let candles: Vec<Candle> = (0..80)
            .map(|i| {
                let base = if i % 2 == 0 { 100.0 } else { 101.0 };
                Candle::new(i as i64 * 900, base, base + 1.0, base - 1.0, base, 1000.0)
            })
            .collect();
        let swings = detect_swings(&candles, 1, 1);

        let result = detector.detect_regime(&candles, &swings);
        assert!(result.metrics.swing_density > 12);
        assert_eq!(result.regime, MarketRegime::Choppy);
    }

    #[test]
    fn test_insufficient_data() {
        let detector = MarketRegimeDetector::new();
        let candles = create_test_candles(10, 0.0);

        let result = detector.detect_regime(&candles, &[]);

        assert_eq!(result.regime, MarketRegime::Unknown);
        assert!(result.metrics.reason.contains("Insufficient"));
    }

    #[test]
    fn test_classify_priority() {
        let config = RegimeConfig::default();

        assert_eq!(config.classify(20.0, 1.0, 13).0, MarketRegime::Choppy);
        assert_eq!(config.classify(26.0, 1.0, 5).0, MarketRegime::Trending);
        assert_eq!(config.classify(15.0, 0.6, 3).0, MarketRegime::Ranging);
        assert_eq!(config.classify(15.0, 1.8, 3).0, MarketRegime::Expansion);
        assert_eq!(config.classify(15.0, 1.0, 3).0, MarketRegime::Ranging);
    }

    #[test]
    fn test_volatile_trend_override() {
        let config = RegimeConfig::default();

        let (regime, reason) = config.classify(32.0, 1.0, 11);
        assert_eq!(regime, MarketRegime::Choppy);
        assert!(reason.contains("volatile trend"));

        // ADX alone would say trending
        assert_eq!(config.classify(32.0, 1.0, 10).0, MarketRegime::Trending);
    }
}
