use analysis_core::Candle;

/// Simple Moving Average
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let mut result = Vec::with_capacity(data.len() - period + 1);
    for i in period - 1..data.len() {
        let sum: f64 = data[i + 1 - period..=i].iter().sum();
        result.push(sum / period as f64);
    }
    result
}

/// Exponential Moving Average.
///
/// Seeded with the SMA of the first `period` values; the output is aligned to
/// the input from index `period - 1` onward (length `data.len() - period + 1`).
pub fn ema(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut result = Vec::with_capacity(data.len() - period + 1);

    let seed: f64 = data[..period].iter().sum::<f64>() / period as f64;
    result.push(seed);

    for value in &data[period..] {
        let prev = result[result.len() - 1];
        result.push((value - prev) * multiplier + prev);
    }

    result
}

/// Last EMA value, if there is enough data
pub fn last_ema(data: &[f64], period: usize) -> Option<f64> {
    ema(data, period).last().copied()
}

/// MACD (Moving Average Convergence Divergence)
pub struct MacdResult {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(data: &[f64], fast_period: usize, slow_period: usize, signal_period: usize) -> MacdResult {
    if fast_period == 0 || signal_period == 0 || slow_period < fast_period || data.len() < slow_period {
        return MacdResult { macd_line: vec![], signal_line: vec![], histogram: vec![] };
    }

    let ema_fast = ema(data, fast_period);
    let ema_slow = ema(data, slow_period);

    // ema_fast starts at data[fast-1], ema_slow at data[slow-1]
    let offset = slow_period - fast_period;
    let macd_line: Vec<f64> = ema_slow
        .iter()
        .enumerate()
        .map(|(i, slow)| ema_fast[i + offset] - slow)
        .collect();

    let signal_line = ema(&macd_line, signal_period);

    let hist_offset = macd_line.len().saturating_sub(signal_line.len());
    let histogram = signal_line
        .iter()
        .enumerate()
        .map(|(i, signal)| macd_line[i + hist_offset] - signal)
        .collect();

    MacdResult {
        macd_line,
        signal_line,
        histogram,
    }
}

/// Bollinger Bands
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn bollinger_bands(data: &[f64], period: usize, std_dev: f64) -> BollingerBands {
    if period == 0 || data.len() < period {
        return BollingerBands { upper: vec![], middle: vec![], lower: vec![] };
    }

    let middle = sma(data, period);
    let mut upper = Vec::with_capacity(middle.len());
    let mut lower = Vec::with_capacity(middle.len());

    for i in period - 1..data.len() {
        let slice = &data[i + 1 - period..=i];
        let mean = middle[i + 1 - period];
        let variance: f64 = slice.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / period as f64;
        let std = variance.sqrt();

        upper.push(mean + std_dev * std);
        lower.push(mean - std_dev * std);
    }

    BollingerBands {
        upper,
        middle,
        lower,
    }
}

fn true_range(candles: &[Candle], i: usize) -> f64 {
    let high_low = candles[i].high - candles[i].low;
    let high_close = (candles[i].high - candles[i - 1].close).abs();
    let low_close = (candles[i].low - candles[i - 1].close).abs();
    high_low.max(high_close).max(low_close)
}

/// Average True Range (Wilder smoothing).
///
/// The last value corresponds to the last candle; `atr(..).len() == candles.len() - period`.
pub fn atr(candles: &[Candle], period: usize) -> Vec<f64> {
    if period == 0 || candles.len() < period + 1 {
        return vec![];
    }

    let true_ranges: Vec<f64> = (1..candles.len()).map(|i| true_range(candles, i)).collect();

    let mut atr_values = Vec::with_capacity(true_ranges.len() - period + 1);
    let mut atr = true_ranges[..period].iter().sum::<f64>() / period as f64;
    atr_values.push(atr);

    for tr in &true_ranges[period..] {
        atr = (atr * (period - 1) as f64 + tr) / period as f64;
        atr_values.push(atr);
    }

    atr_values
}

/// Latest ATR value, if there is enough data
pub fn last_atr(candles: &[Candle], period: usize) -> Option<f64> {
    atr(candles, period).last().copied()
}

/// Average Directional Index (ADX), trend strength on a 0-100 scale
pub struct AdxResult {
    pub adx: Vec<f64>,
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
}

pub fn adx(candles: &[Candle], period: usize) -> AdxResult {
    if period == 0 || candles.len() < period * 2 + 1 {
        return AdxResult { adx: vec![], plus_di: vec![], minus_di: vec![] };
    }

    // Calculate +DM, -DM and TR
    let mut plus_dm = Vec::with_capacity(candles.len() - 1);
    let mut minus_dm = Vec::with_capacity(candles.len() - 1);
    let mut tr = Vec::with_capacity(candles.len() - 1);

    for i in 1..candles.len() {
        let up_move = candles[i].high - candles[i - 1].high;
        let down_move = candles[i - 1].low - candles[i].low;

        plus_dm.push(if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 });
        minus_dm.push(if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 });
        tr.push(true_range(candles, i));
    }

    // Smoothed sums using Wilder's method
    let mut smoothed_plus_dm = plus_dm[..period].iter().sum::<f64>();
    let mut smoothed_minus_dm = minus_dm[..period].iter().sum::<f64>();
    let mut smoothed_tr = tr[..period].iter().sum::<f64>();

    let mut plus_di_values = Vec::new();
    let mut minus_di_values = Vec::new();
    let mut dx_values = Vec::new();

    for i in period..plus_dm.len() {
        smoothed_plus_dm = smoothed_plus_dm - smoothed_plus_dm / period as f64 + plus_dm[i];
        smoothed_minus_dm = smoothed_minus_dm - smoothed_minus_dm / period as f64 + minus_dm[i];
        smoothed_tr = smoothed_tr - smoothed_tr / period as f64 + tr[i];

        let pdi = if smoothed_tr > 0.0 { 100.0 * smoothed_plus_dm / smoothed_tr } else { 0.0 };
        let mdi = if smoothed_tr > 0.0 { 100.0 * smoothed_minus_dm / smoothed_tr } else { 0.0 };

        plus_di_values.push(pdi);
        minus_di_values.push(mdi);

        let di_sum = pdi + mdi;
        let dx = if di_sum > 0.0 { 100.0 * (pdi - mdi).abs() / di_sum } else { 0.0 };
        dx_values.push(dx);
    }

    // Smooth DX into ADX
    if dx_values.len() < period {
        return AdxResult { adx: vec![], plus_di: plus_di_values, minus_di: minus_di_values };
    }

    let mut adx_values = Vec::new();
    let mut adx_val = dx_values[..period].iter().sum::<f64>() / period as f64;
    adx_values.push(adx_val);

    for dx in &dx_values[period..] {
        adx_val = (adx_val * (period - 1) as f64 + dx) / period as f64;
        adx_values.push(adx_val);
    }

    AdxResult {
        adx: adx_values,
        plus_di: plus_di_values,
        minus_di: minus_di_values,
    }
}

/// Volume-Weighted Average Price (cumulative over the slice)
pub fn vwap(candles: &[Candle]) -> Vec<f64> {
    if candles.is_empty() {
        return vec![];
    }

    let mut vwap_values = Vec::with_capacity(candles.len());
    let mut cumulative_tpv = 0.0;
    let mut cumulative_volume = 0.0;

    for candle in candles {
        let typical_price = candle.typical_price();
        cumulative_tpv += typical_price * candle.volume;
        cumulative_volume += candle.volume;

        let vwap = if cumulative_volume > 0.0 {
            cumulative_tpv / cumulative_volume
        } else {
            typical_price
        };

        vwap_values.push(vwap);
    }

    vwap_values
}

/// VWAP with volume-weighted standard deviation bands (last value only)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VwapBands {
    pub vwap: f64,
    pub std_dev: f64,
    pub upper_1: f64,
    pub lower_1: f64,
    pub upper_2: f64,
    pub lower_2: f64,
}

pub fn vwap_bands(candles: &[Candle]) -> Option<VwapBands> {
    let vwap = *vwap(candles).last()?;

    let total_volume: f64 = candles.iter().map(|c| c.volume).sum();
    let variance = if total_volume > 0.0 {
        candles
            .iter()
            .map(|c| c.volume * (c.typical_price() - vwap).powi(2))
            .sum::<f64>()
            / total_volume
    } else {
        candles.iter().map(|c| (c.typical_price() - vwap).powi(2)).sum::<f64>() / candles.len() as f64
    };
    let std_dev = variance.sqrt();

    Some(VwapBands {
        vwap,
        std_dev,
        upper_1: vwap + std_dev,
        lower_1: vwap - std_dev,
        upper_2: vwap + 2.0 * std_dev,
        lower_2: vwap - 2.0 * std_dev,
    })
}

/// Money Flow Index (0-100). Output aligned to candles from index `period` onward.
pub fn mfi(candles: &[Candle], period: usize) -> Vec<f64> {
    if period == 0 || candles.len() < period + 1 {
        return vec![];
    }

    // Signed raw money flow per bar, starting at bar 1
    let flows: Vec<(f64, f64)> = (1..candles.len())
        .map(|i| {
            let tp = candles[i].typical_price();
            let prev_tp = candles[i - 1].typical_price();
            let raw = tp * candles[i].volume;
            if tp > prev_tp {
                (raw, 0.0)
            } else if tp < prev_tp {
                (0.0, raw)
            } else {
                (0.0, 0.0)
            }
        })
        .collect();

    flows
        .windows(period)
        .map(|window| {
            let positive: f64 = window.iter().map(|f| f.0).sum();
            let negative: f64 = window.iter().map(|f| f.1).sum();
            if negative == 0.0 {
                if positive == 0.0 { 50.0 } else { 100.0 }
            } else {
                100.0 - 100.0 / (1.0 + positive / negative)
            }
        })
        .collect()
}
