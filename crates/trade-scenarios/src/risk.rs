//! Structural invalidation and target selection.

use analysis_core::Direction;
use market_structure::{DailyLevels, Fvg, LiquidityPool, PoolType, Polarity, SwingPoint, SwingType};
use serde::{Deserialize, Serialize};

/// Targets closer together than this collapse into one
const TARGET_DEDUP_DISTANCE: f64 = 0.1;
const MAX_TARGETS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetSource {
    SwingHigh,
    SwingLow,
    Eqh,
    Eql,
    Fvg,
    Pdh,
    Pdl,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskTarget {
    pub price: f64,
    pub source: TargetSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAnalysis {
    pub direction: Direction,
    pub invalidation: Option<f64>,
    pub targets: Vec<RiskTarget>,
    pub rr: Option<f64>,
}

impl RiskAnalysis {
    pub fn empty(direction: Direction) -> Self {
        Self {
            direction,
            invalidation: None,
            targets: vec![],
            rr: None,
        }
    }
}

/// Structural levels the risk calculator draws from
#[derive(Clone, Copy)]
pub struct RiskInputs<'a> {
    pub swings: &'a [SwingPoint],
    pub pools: &'a [LiquidityPool],
    pub fvgs: &'a [Fvg],
    pub levels: &'a DailyLevels,
}

/// Nearest swing against the trade: highest swing low below price for longs,
/// lowest swing high above price for shorts.
pub fn find_invalidation(direction: Direction, price: f64, swings: &[SwingPoint]) -> Option<f64> {
    match direction {
        Direction::Long => swings
            .iter()
            .filter(|s| s.kind == SwingType::Low && s.price < price)
            .map(|s| s.price)
            .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.max(p)))),
        Direction::Short => swings
            .iter()
            .filter(|s| s.kind == SwingType::High && s.price > price)
            .map(|s| s.price)
            .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.min(p)))),
        Direction::Neutral => None,
    }
}

/// Up to three targets beyond `from` in the trade direction, nearest first.
pub fn collect_targets(direction: Direction, from: f64, inputs: &RiskInputs) -> Vec<RiskTarget> {
    let mut candidates: Vec<RiskTarget> = Vec::new();

    match direction {
        Direction::Long => {
            let above = |p: f64| p > from;
            candidates.extend(
                inputs
                    .swings
                    .iter()
                    .filter(|s| s.kind == SwingType::High && above(s.price))
                    .map(|s| RiskTarget { price: s.price, source: TargetSource::SwingHigh }),
            );
            candidates.extend(
                inputs
                    .pools
                    .iter()
                    .filter(|p| p.kind == PoolType::Eqh && above(p.price))
                    .map(|p| RiskTarget { price: p.price, source: TargetSource::Eqh }),
            );
            candidates.extend(
                inputs
                    .fvgs
                    .iter()
                    .filter(|f| f.kind == Polarity::Bearish && above(f.bottom))
                    .map(|f| RiskTarget { price: f.bottom, source: TargetSource::Fvg }),
            );
            if let Some(pdh) = inputs.levels.pdh.filter(|&p| above(p)) {
                candidates.push(RiskTarget { price: pdh, source: TargetSource::Pdh });
            }
        }
        Direction::Short => {
            let below = |p: f64| p < from;
            candidates.extend(
                inputs
                    .swings
                    .iter()
                    .filter(|s| s.kind == SwingType::Low && below(s.price))
                    .map(|s| RiskTarget { price: s.price, source: TargetSource::SwingLow }),
            );
            candidates.extend(
                inputs
                    .pools
                    .iter()
                    .filter(|p| p.kind == PoolType::Eql && below(p.price))
                    .map(|p| RiskTarget { price: p.price, source: TargetSource::Eql }),
            );
            candidates.extend(
                inputs
                    .fvgs
                    .iter()
                    .filter(|f| f.kind == Polarity::Bullish && below(f.top))
                    .map(|f| RiskTarget { price: f.top, source: TargetSource::Fvg }),
            );
            if let Some(pdl) = inputs.levels.pdl.filter(|&p| below(p)) {
                candidates.push(RiskTarget { price: pdl, source: TargetSource::Pdl });
            }
        }
        Direction::Neutral => return vec![],
    }

    candidates.sort_by(|a, b| (a.price - from).abs().total_cmp(&(b.price - from).abs()));

    let mut targets: Vec<RiskTarget> = Vec::with_capacity(MAX_TARGETS);
    for candidate in candidates {
        if targets.iter().any(|t| (t.price - candidate.price).abs() < TARGET_DEDUP_DISTANCE) {
            continue;
        }
        targets.push(candidate);
        if targets.len() == MAX_TARGETS {
            break;
        }
    }
    targets
}

/// Reward to the first target over risk to the stop. `None` unless the stop
/// and the target sit on opposite sides of the entry.
pub fn reward_risk(entry: f64, stop: f64, target: f64) -> Option<f64> {
    let risk = entry - stop;
    let reward = target - entry;
    (risk * reward > 0.0).then(|| reward / risk)
}

pub fn analyze_risk(direction: Direction, price: f64, inputs: &RiskInputs) -> RiskAnalysis {
    if direction.is_neutral() {
        return RiskAnalysis::empty(direction);
    }

    let invalidation = find_invalidation(direction, price, inputs.swings);
    let targets = collect_targets(direction, price, inputs);
    let rr = match (invalidation, targets.first()) {
        (Some(stop), Some(t1)) => reward_risk(price, stop, t1.price),
        _ => None,
    };

    RiskAnalysis {
        direction,
        invalidation,
        targets,
        rr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn swing(kind: SwingType, price: f64, index: usize) -> SwingPoint {
        SwingPoint { price, time: index as i64 * 60, kind, index }
    }

    #[test]
    fn test_long_risk() {
        let swings = vec![
            swing(SwingType::Low, 95.0, 1),
            swing(SwingType::High, 104.0, 3),
            swing(SwingType::Low, 98.0, 5),
            swing(SwingType::High, 110.0, 7),
            swing(SwingType::Low, 101.0, 9),
        ];
        let pools = vec![LiquidityPool { price: 104.05, kind: PoolType::Eqh, time: 420, strength: 2 }];
        let fvgs = vec![Fvg { top: 108.0, bottom: 106.0, time: 480, kind: Polarity::Bearish, index: 8 }];
        let levels = DailyLevels { pdh: Some(112.0), ..Default::default() };
        let inputs = RiskInputs { swings: &swings, pools: &pools, fvgs: &fvgs, levels: &levels };

        let risk = analyze_risk(Direction::Long, 100.0, &inputs);

        assert_eq!(risk.invalidation, Some(98.0));
        let prices: Vec<f64> = risk.targets.iter().map(|t| t.price).collect();
        // 104.05 collapses into 104.0
        assert_eq!(prices, vec![104.0, 106.0, 110.0]);
        assert_eq!(risk.targets[1].source, TargetSource::Fvg);
        assert_relative_eq!(risk.rr.unwrap(), 2.0);
    }

    #[test]
    fn test_short_risk_mirror() {
        let swings = vec![swing(SwingType::High, 105.0, 1), swing(SwingType::Low, 92.0, 3)];
        let levels = DailyLevels { pdl: Some(94.0), ..Default::default() };
        let inputs = RiskInputs { swings: &swings, pools: &[], fvgs: &[], levels: &levels };

        let risk = analyze_risk(Direction::Short, 100.0, &inputs);
        assert_eq!(risk.invalidation, Some(105.0));
        assert_eq!(risk.targets[0].source, TargetSource::Pdl);
        assert_relative_eq!(risk.rr.unwrap(), 1.2);
    }

    #[test]
    fn test_neutral_is_empty() {
        let levels = DailyLevels::default();
        let inputs = RiskInputs { swings: &[], pools: &[], fvgs: &[], levels: &levels };
        let risk = analyze_risk(Direction::Neutral, 100.0, &inputs);
        assert!(risk.targets.is_empty());
        assert!(risk.rr.is_none());
    }

    #[test]
    fn test_reward_risk_requires_stop_behind_entry() {
        assert_relative_eq!(reward_risk(104.0, 106.5, 98.0).unwrap(), 2.4);
        assert_relative_eq!(reward_risk(100.0, 99.0, 103.0).unwrap(), 3.0);
        // Short with its stop below entry
        assert!(reward_risk(104.0, 103.8, 98.0).is_none());
        // Target on the stop side
        assert!(reward_risk(100.0, 99.0, 98.0).is_none());
        assert!(reward_risk(100.0, 100.0, 103.0).is_none());
    }
}
