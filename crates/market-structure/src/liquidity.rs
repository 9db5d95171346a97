//! Equal highs / equal lows liquidity pools.

use analysis_core::{Candle, Direction};
use serde::{Deserialize, Serialize};

use crate::swings::{swings_of, SwingPoint, SwingType};

/// Relative price tolerance for two swings to count as "equal"
pub const DEFAULT_LIQUIDITY_TOLERANCE: f64 = 0.003;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolType {
    Eqh,
    Eql,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityPool {
    /// Mean price of the grouped swings
    pub price: f64,
    #[serde(rename = "type")]
    pub kind: PoolType,
    /// Time of the most recent member
    pub time: i64,
    /// Number of grouped swings
    pub strength: usize,
}

/// A run through a pool's resting orders
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquiditySweep {
    pub pool_price: f64,
    pub pool_type: PoolType,
    /// Index of the latest sweeping candle
    pub index: usize,
    pub time: i64,
    /// Lowest low (EQL) or highest high (EQH) printed while sweeping
    pub extreme: f64,
}

impl LiquiditySweep {
    /// Taking sell-side liquidity (EQL) sets up longs, buy-side (EQH) shorts
    pub fn direction(&self) -> Direction {
        match self.pool_type {
            PoolType::Eql => Direction::Long,
            PoolType::Eqh => Direction::Short,
        }
    }
}

impl LiquidityPool {
    /// Most recent sweep of this pool within the last `lookback` candles.
    ///
    /// Only candles after the pool formed count: EQL is swept by a low below
    /// the pool, EQH by a high above it.
    pub fn find_sweep(&self, candles: &[Candle], lookback: usize) -> Option<LiquiditySweep> {
        let start = candles.len().saturating_sub(lookback);
        let mut sweep: Option<LiquiditySweep> = None;

        for (i, c) in candles.iter().enumerate().skip(start) {
            if c.time <= self.time {
                continue;
            }
            let (swept, wick) = match self.kind {
                PoolType::Eql => (c.low < self.price, c.low),
                PoolType::Eqh => (c.high > self.price, c.high),
            };
            if !swept {
                continue;
            }

            let extreme = match (sweep, self.kind) {
                (Some(prev), PoolType::Eql) => prev.extreme.min(wick),
                (Some(prev), PoolType::Eqh) => prev.extreme.max(wick),
                (None, _) => wick,
            };
            sweep = Some(LiquiditySweep {
                pool_price: self.price,
                pool_type: self.kind,
                index: i,
                time: c.time,
                extreme,
            });
        }

        sweep
    }
}

fn group(swings: &[&SwingPoint], kind: PoolType, tolerance: f64) -> Vec<LiquidityPool> {
    let mut used = vec![false; swings.len()];
    let mut pools = Vec::new();

    for i in 0..swings.len() {
        if used[i] {
            continue;
        }
        used[i] = true;
        let seed = swings[i].price;
        let mut members = vec![swings[i]];

        for j in i + 1..swings.len() {
            if !used[j] && seed != 0.0 && ((swings[j].price - seed) / seed).abs() <= tolerance {
                used[j] = true;
                members.push(swings[j]);
            }
        }

        if members.len() >= 2 {
            let price = members.iter().map(|s| s.price).sum::<f64>() / members.len() as f64;
            let time = members.iter().map(|s| s.time).max().unwrap_or(swings[i].time);
            pools.push(LiquidityPool {
                price,
                kind,
                time,
                strength: members.len(),
            });
        }
    }

    pools
}

/// Group swings of equal price into EQH/EQL pools.
///
/// Greedy in time order: each ungrouped swing seeds a group and collects every
/// later ungrouped swing within `tolerance` (relative) of the seed price.
pub fn detect_liquidity(swings: &[SwingPoint], tolerance: f64) -> Vec<LiquidityPool> {
    let mut pools = group(&swings_of(swings, SwingType::High), PoolType::Eqh, tolerance);
    pools.extend(group(&swings_of(swings, SwingType::Low), PoolType::Eql, tolerance));
    pools
}

/// Most recent sweep across all pools
pub fn latest_sweep(pools: &[LiquidityPool], candles: &[Candle], lookback: usize) -> Option<LiquiditySweep> {
    pools
        .iter()
        .filter_map(|p| p.find_sweep(candles, lookback))
        .max_by_key(|s| s.index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn swing(kind: SwingType, price: f64, index: usize) -> SwingPoint {
        SwingPoint { price, time: index as i64 * 60, kind, index }
    }

    #[test]
    fn test_isolated_swing_makes_no_pool() {
        let swings = vec![swing(SwingType::High, 100.0, 3), swing(SwingType::High, 110.0, 9)];
        assert!(detect_liquidity(&swings, DEFAULT_LIQUIDITY_TOLERANCE).is_empty());
    }

    #[test]
    fn test_equal_highs_form_pool() {
        let swings = vec![
            swing(SwingType::High, 100.0, 3),
            swing(SwingType::Low, 95.0, 6),
            swing(SwingType::High, 100.2, 9),
        ];
        let pools = detect_liquidity(&swings, DEFAULT_LIQUIDITY_TOLERANCE);

        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].kind, PoolType::Eqh);
        assert_eq!(pools[0].strength, 2);
        assert_eq!(pools[0].time, 540);
        assert_relative_eq!(pools[0].price, 100.1, epsilon = 1e-9);
    }

    #[test]
    fn test_grouping_is_seed_anchored() {
        // 100.25 and 100.5 are within tolerance of each other but only the
        // first is within tolerance of the seed
        let swings = vec![
            swing(SwingType::Low, 100.0, 1),
            swing(SwingType::Low, 100.25, 2),
            swing(SwingType::Low, 100.5, 3),
        ];
        let pools = detect_liquidity(&swings, DEFAULT_LIQUIDITY_TOLERANCE);

        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].strength, 2);
        assert_relative_eq!(pools[0].price, 100.125);
    }

    #[test]
    fn test_find_sweep_after_pool() {
        let pool = LiquidityPool { price: 100.0, kind: PoolType::Eql, time: 60, strength: 2 };
        let candles = vec![
            Candle::new(0, 101.0, 102.0, 99.0, 101.0, 1.0),
            Candle::new(60, 101.0, 102.0, 100.0, 101.0, 1.0),
            Candle::new(120, 101.0, 102.0, 99.5, 100.5, 1.0),
            Candle::new(180, 100.5, 101.0, 99.0, 100.8, 1.0),
            Candle::new(240, 100.8, 102.0, 100.5, 101.5, 1.0),
        ];

        let sweep = pool.find_sweep(&candles, 10).unwrap();
        assert_eq!(sweep.index, 3);
        assert_eq!(sweep.extreme, 99.0);
        assert_eq!(sweep.direction(), Direction::Long);

        assert!(pool.find_sweep(&candles, 1).is_none());
    }
}
