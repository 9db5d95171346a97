//! Smart-money divergence between correlated instruments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::structure::{MarketStructure, Polarity};
use crate::swings::SwingPoint;

/// Default time tolerance, in candle intervals
pub const DEFAULT_SMT_TOLERANCE_BARS: i64 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmtDivergence {
    #[serde(rename = "type")]
    pub kind: Polarity,
    pub reference_symbol: String,
    pub primary: [SwingPoint; 2],
    pub reference: [SwingPoint; 2],
    /// Time of the latest primary swing
    pub time: i64,
}

/// Reference swing nearest in time to `target`, first one on ties
fn nearest<'a>(target: &SwingPoint, candidates: &[&'a SwingPoint], tolerance: i64) -> Option<&'a SwingPoint> {
    let mut best: Option<(&SwingPoint, i64)> = None;
    for &c in candidates {
        let diff = (c.time - target.time).abs();
        if diff > tolerance {
            continue;
        }
        if best.map_or(true, |(_, d)| diff < d) {
            best = Some((c, diff));
        }
    }
    best.map(|(s, _)| s)
}

fn compare(
    primary: &[&SwingPoint],
    reference: &[&SwingPoint],
    tolerance: i64,
) -> Option<([SwingPoint; 2], [SwingPoint; 2])> {
    if primary.len() < 2 || reference.len() < 2 {
        return None;
    }

    let p1 = *primary[primary.len() - 2];
    let p2 = *primary[primary.len() - 1];
    let r1 = *nearest(&p1, reference, tolerance)?;
    let r2 = *nearest(&p2, reference, tolerance)?;
    // Both primary swings matched to one reference swing leaves nothing to compare
    if r1.index >= r2.index {
        return None;
    }

    let primary_up = p2.price > p1.price;
    let reference_up = r2.price > r1.price;
    (primary_up != reference_up).then_some(([p1, p2], [r1, r2]))
}

/// Compare the last two highs (then lows) of both instruments.
///
/// Disagreeing highs give a BEARISH divergence; otherwise disagreeing lows
/// give a BULLISH one. At most one divergence is reported per call.
pub fn detect_smt(
    primary: &MarketStructure,
    reference: &MarketStructure,
    reference_symbol: &str,
    tolerance_secs: i64,
) -> Option<SmtDivergence> {
    let checks = [
        (Polarity::Bearish, primary.highs(), reference.highs()),
        (Polarity::Bullish, primary.lows(), reference.lows()),
    ];

    checks.into_iter().find_map(|(kind, p, r)| {
        compare(&p, &r, tolerance_secs).map(|(primary, reference)| SmtDivergence {
            kind,
            reference_symbol: reference_symbol.to_string(),
            time: primary[1].time,
            primary,
            reference,
        })
    })
}

/// Run `detect_smt` against every reference symbol; empty structures are skipped.
pub fn detect_smt_all(
    primary: &MarketStructure,
    references: &BTreeMap<String, MarketStructure>,
    tolerance_secs: i64,
) -> Vec<SmtDivergence> {
    references
        .iter()
        .filter(|(_, structure)| !structure.swings.is_empty())
        .filter_map(|(symbol, structure)| detect_smt(primary, structure, symbol, tolerance_secs))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swings::SwingType;

    fn swing(kind: SwingType, price: f64, time: i64) -> SwingPoint {
        SwingPoint { price, time, kind, index: (time / 60) as usize }
    }

    fn structure(swings: Vec<SwingPoint>) -> MarketStructure {
        MarketStructure::from_swings(swings)
    }

    #[test]
    fn test_bearish_divergence_on_highs() {
        let primary = structure(vec![swing(SwingType::High, 100.0, 600), swing(SwingType::High, 102.0, 1200)]);
        let reference = structure(vec![swing(SwingType::High, 50.0, 660), swing(SwingType::High, 49.0, 1140)]);

        let smt = detect_smt(&primary, &reference, "ES", 120).unwrap();
        assert_eq!(smt.kind, Polarity::Bearish);
        assert_eq!(smt.reference_symbol, "ES");
        assert_eq!(smt.time, 1200);
        assert_eq!(smt.reference[1].price, 49.0);
    }

    #[test]
    fn test_bullish_divergence_on_lows() {
        let primary = structure(vec![
            swing(SwingType::High, 100.0, 300),
            swing(SwingType::High, 102.0, 900),
            swing(SwingType::Low, 95.0, 600),
            swing(SwingType::Low, 94.0, 1200),
        ]);
        let reference = structure(vec![
            swing(SwingType::High, 50.0, 300),
            swing(SwingType::High, 51.0, 900),
            swing(SwingType::Low, 47.0, 600),
            swing(SwingType::Low, 47.5, 1200),
        ]);

        let smt = detect_smt(&primary, &reference, "YM", 120).unwrap();
        assert_eq!(smt.kind, Polarity::Bullish);
    }

    #[test]
    fn test_outside_tolerance_no_match() {
        let primary = structure(vec![swing(SwingType::High, 100.0, 600), swing(SwingType::High, 102.0, 1200)]);
        let reference = structure(vec![swing(SwingType::High, 50.0, 600), swing(SwingType::High, 49.0, 2400)]);
        assert!(detect_smt(&primary, &reference, "ES", 120).is_none());
    }

    #[test]
    fn test_shared_reference_swing_is_not_divergence() {
        let primary = structure(vec![swing(SwingType::High, 100.0, 0), swing(SwingType::High, 102.0, 2700)]);
        let reference = structure(vec![swing(SwingType::High, 50.0, 900), swing(SwingType::High, 49.0, 9000)]);
        assert!(detect_smt(&primary, &reference, "NQ", 1800).is_none());
    }

    #[test]
    fn test_nearest_tie_takes_first() {
        let target = swing(SwingType::High, 100.0, 600);
        let a = swing(SwingType::High, 1.0, 540);
        let b = swing(SwingType::High, 2.0, 660);
        let found = nearest(&target, &[&a, &b], 120).unwrap();
        assert_eq!(found.price, 1.0);
    }

    #[test]
    fn test_all_skips_empty_references() {
        let primary = structure(vec![swing(SwingType::High, 100.0, 600), swing(SwingType::High, 102.0, 1200)]);
        let mut references = BTreeMap::new();
        references.insert("ES".to_string(), structure(vec![]));
        references.insert(
            "YM".to_string(),
            structure(vec![swing(SwingType::High, 50.0, 600), swing(SwingType::High, 49.0, 1200)]),
        );

        let all = detect_smt_all(&primary, &references, 120);
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].reference_symbol, "YM");
    }
}
