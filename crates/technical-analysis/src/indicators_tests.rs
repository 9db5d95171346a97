#[cfg(test)]
mod tests {
    use super::super::indicators::*;
    use analysis_core::Candle;
    use approx::assert_relative_eq;

    fn sample_prices() -> Vec<f64> {
        vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ]
    }

    // 15-minute candles stepping up one point per bar
    fn sample_candles() -> Vec<Candle> {
        (0..15)
            .map(|i| {
                let open = 100.0 + i as f64;
                Candle::new(1_700_000_000 + i * 900, open, open + 2.0, open - 1.0, open + 1.0, 1_000_000.0)
            })
            .collect()
    }

    #[test]
    fn test_sma_basic() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&data, 3);

        assert_eq!(result.len(), 3);
        assert_relative_eq!(result[0], 2.0);
        assert_relative_eq!(result[1], 3.0);
        assert_relative_eq!(result[2], 4.0);
    }

    #[test]
    fn test_sma_insufficient_data() {
        assert!(sma(&[1.0, 2.0], 5).is_empty());
        assert!(sma(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn test_ema_seeded_with_sma() {
        let data = vec![22.0, 24.0, 23.0, 25.0, 26.0];
        let result = ema(&data, 3);

        assert_eq!(result.len(), data.len() - 3 + 1);
        assert_relative_eq!(result[0], 23.0);
        // k = 0.5
        assert_relative_eq!(result[1], 24.0);
        assert_relative_eq!(result[2], 25.0);
    }

    #[test]
    fn test_ema_empty_data() {
        assert!(ema(&[], 5).is_empty());
        assert_eq!(last_ema(&[1.0, 2.0], 5), None);
    }

    #[test]
    fn test_ema_increases_with_uptrend() {
        let data: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let result = ema(&data, 3);

        for i in 1..result.len() {
            assert!(result[i] > result[i - 1]);
        }
    }

    #[test]
    fn test_macd_histogram() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let result = macd(&prices, 12, 26, 9);

        assert_eq!(result.macd_line.len(), prices.len() - 26 + 1);
        assert_eq!(result.histogram.len(), result.signal_line.len());

        let offset = result.macd_line.len() - result.signal_line.len();
        for (i, &hist) in result.histogram.iter().enumerate() {
            let expected = result.macd_line[i + offset] - result.signal_line[i];
            assert_relative_eq!(hist, expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_macd_insufficient_data() {
        let result = macd(&sample_prices(), 12, 26, 9);
        assert!(result.macd_line.is_empty());
        assert!(result.histogram.is_empty());
    }

    #[test]
    fn test_bollinger_bands_ordering() {
        let result = bollinger_bands(&sample_prices(), 10, 2.0);

        assert_eq!(result.upper.len(), result.middle.len());
        for i in 0..result.upper.len() {
            assert!(result.upper[i] > result.middle[i]);
            assert!(result.middle[i] > result.lower[i]);
        }
    }

    #[test]
    fn test_bollinger_bands_flat() {
        let result = bollinger_bands(&[100.0; 20], 10, 2.0);
        for i in 0..result.upper.len() {
            assert_relative_eq!(result.upper[i], result.lower[i]);
        }
    }

    #[test]
    fn test_atr_basic() {
        let candles = sample_candles();
        let result = atr(&candles, 5);

        assert_eq!(result.len(), candles.len() - 5);
        // every true range is 3.0 (high - low dominates)
        for &value in &result {
            assert_relative_eq!(value, 3.0);
        }
    }

    #[test]
    fn test_atr_insufficient_data() {
        let candles = sample_candles()[..5].to_vec();
        assert!(atr(&candles, 14).is_empty());
        assert_eq!(last_atr(&candles, 14), None);
    }

    #[test]
    fn test_atr_increases_with_volatility() {
        let candles = sample_candles();
        let mut volatile = sample_candles();
        for candle in &mut volatile {
            candle.high += 10.0;
            candle.low -= 10.0;
        }

        assert!(last_atr(&volatile, 5).unwrap() > last_atr(&candles, 5).unwrap());
    }

    #[test]
    fn test_adx_strong_trend() {
        let candles: Vec<Candle> = (0..60)
            .map(|i| {
                let open = 100.0 + i as f64 * 2.0;
                Candle::new(i * 60, open, open + 2.5, open - 0.5, open + 2.0, 100.0)
            })
            .collect();
        let result = adx(&candles, 14);

        assert!(!result.adx.is_empty());
        assert!(*result.adx.last().unwrap() > 25.0);
        assert!(result.plus_di.last().unwrap() > result.minus_di.last().unwrap());
    }

    #[test]
    fn test_adx_insufficient_data() {
        let result = adx(&sample_candles(), 14);
        assert!(result.adx.is_empty());
    }

    #[test]
    fn test_vwap_within_range() {
        let candles = sample_candles();
        let result = vwap(&candles);

        assert_eq!(result.len(), candles.len());
        assert_relative_eq!(result[0], candles[0].typical_price());
        for &value in &result {
            assert!(value >= candles[0].low && value <= candles[candles.len() - 1].high);
        }
    }

    #[test]
    fn test_vwap_zero_volume_falls_back_to_typical_price() {
        let mut candles = sample_candles();
        for candle in &mut candles {
            candle.volume = 0.0;
        }
        let result = vwap(&candles);
        assert_relative_eq!(result[3], candles[3].typical_price());
    }

    #[test]
    fn test_vwap_bands_symmetric() {
        let bands = vwap_bands(&sample_candles()).unwrap();

        assert!(bands.std_dev > 0.0);
        assert_relative_eq!(bands.upper_1 - bands.vwap, bands.vwap - bands.lower_1, epsilon = 1e-9);
        assert_relative_eq!(bands.upper_2 - bands.vwap, 2.0 * bands.std_dev, epsilon = 1e-9);
        assert!(vwap_bands(&[]).is_none());
    }

    #[test]
    fn test_mfi_bounds() {
        let candles: Vec<Candle> = (0..40)
            .map(|i| {
                let mid = 100.0 + (i as f64 * 0.7).sin() * 3.0;
                Candle::new(i * 60, mid, mid + 1.0, mid - 1.0, mid + 0.2, 500.0 + i as f64)
            })
            .collect();
        let result = mfi(&candles, 14);

        assert_eq!(result.len(), candles.len() - 14);
        for &value in &result {
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn test_mfi_one_sided_flow() {
        let result = mfi(&sample_candles(), 5);
        assert_relative_eq!(*result.last().unwrap(), 100.0);
    }
}
