//! Weighted OR-of-signals confluence scoring.
//!
//! Each indicator signal is computed independently and either contributes its
//! full weight or nothing. Direction comes only from the PSP or bias signal;
//! the lighter signals can raise conviction but never pick a side.

use analysis_core::{Direction, SessionInfo};
use market_structure::{LiquiditySweep, MarketStructure, PspResult, PspState, SmtDivergence, VolumeProfile};
use serde::{Deserialize, Serialize};
use trade_scenarios::ActiveBias;

pub const MAX_CONFLUENCE: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    Psp,
    Bias,
    Structure,
    ValueZone,
    Liquidity,
    Smt,
    Session,
}

impl SignalKind {
    pub fn weight(&self) -> u32 {
        match self {
            SignalKind::Psp => 3,
            SignalKind::Bias | SignalKind::Structure | SignalKind::ValueZone => 2,
            SignalKind::Liquidity | SignalKind::Smt | SignalKind::Session => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalStatus {
    Ok,
    Warn,
    Off,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSignal {
    pub kind: SignalKind,
    pub status: SignalStatus,
    pub direction: Direction,
    /// 0-100
    pub score: u32,
    pub reason: String,
}

impl IndicatorSignal {
    pub fn off(kind: SignalKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            status: SignalStatus::Off,
            direction: Direction::Neutral,
            score: 0,
            reason: reason.into(),
        }
    }

    fn on(kind: SignalKind, direction: Direction, score: u32, reason: String) -> Self {
        Self {
            kind,
            status: SignalStatus::Ok,
            direction,
            score: score.min(100),
            reason,
        }
    }

    pub fn contributes(&self) -> bool {
        self.status != SignalStatus::Off && self.score > 0 && !self.direction.is_neutral()
    }

    pub fn from_psp(psp: &PspResult) -> Self {
        match psp.state {
            PspState::None => Self::off(SignalKind::Psp, "No PSP setup"),
            state => {
                let mut signal = Self::on(
                    SignalKind::Psp,
                    psp.direction,
                    psp.score,
                    format!("PSP {:?} {} ({})", state, psp.direction.label(), psp.score),
                );
                if state == PspState::Forming {
                    signal.status = SignalStatus::Warn;
                }
                signal
            }
        }
    }

    pub fn from_bias(bias: &ActiveBias) -> Self {
        Self::on(
            SignalKind::Bias,
            bias.direction,
            bias.score.unsigned_abs(),
            format!("Bias {:?} ({:+})", bias.label, bias.score),
        )
    }

    pub fn from_structure(structure: &MarketStructure) -> Self {
        if !structure.is_trending() {
            return Self::off(SignalKind::Structure, "Structure consolidating");
        }
        Self::on(
            SignalKind::Structure,
            structure.trend.direction(),
            100,
            format!("Structure {:?}", structure.trend),
        )
    }

    pub fn from_value_zone(profile: Option<&VolumeProfile>, price: f64) -> Self {
        let Some(profile) = profile else {
            return Self::off(SignalKind::ValueZone, "No volume profile");
        };
        match profile.value_side(price) {
            Direction::Long => Self::on(
                SignalKind::ValueZone,
                Direction::Long,
                100,
                format!("Price below VAL {:.2}", profile.val),
            ),
            Direction::Short => Self::on(
                SignalKind::ValueZone,
                Direction::Short,
                100,
                format!("Price above VAH {:.2}", profile.vah),
            ),
            Direction::Neutral => Self::off(SignalKind::ValueZone, "Price inside value area"),
        }
    }

    pub fn from_liquidity(sweep: Option<&LiquiditySweep>) -> Self {
        match sweep {
            Some(s) => Self::on(
                SignalKind::Liquidity,
                s.direction(),
                100,
                format!("{:?} swept at {:.2}", s.pool_type, s.pool_price),
            ),
            None => Self::off(SignalKind::Liquidity, "No recent sweep"),
        }
    }

    pub fn from_smt(smt: Option<&SmtDivergence>) -> Self {
        match smt {
            Some(d) => Self::on(
                SignalKind::Smt,
                d.kind.direction(),
                100,
                format!("SMT {:?} vs {}", d.kind, d.reference_symbol),
            ),
            None => Self::off(SignalKind::Smt, "No SMT divergence"),
        }
    }

    /// Kill zones only; the side comes from price against the midnight open
    pub fn from_session(session: &SessionInfo, price: f64, midnight_open: Option<f64>) -> Self {
        if !session.is_killzone {
            return Self::off(SignalKind::Session, format!("{:?} is not a kill zone", session.session));
        }
        let Some(open) = midnight_open else {
            return Self::off(SignalKind::Session, "No midnight open");
        };
        let direction = if price > open {
            Direction::Long
        } else if price < open {
            Direction::Short
        } else {
            Direction::Neutral
        };
        Self::on(
            SignalKind::Session,
            direction,
            100,
            format!("{:?} kill zone, price vs midnight open {:.2}", session.session, open),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Suggestion {
    Long,
    Short,
    NoTrade,
}

impl Suggestion {
    fn direction(&self) -> Option<Direction> {
        match self {
            Suggestion::Long => Some(Direction::Long),
            Suggestion::Short => Some(Direction::Short),
            Suggestion::NoTrade => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfluenceLevel {
    NoTrade,
    Weak,
    Good,
    Strong,
}

impl ConfluenceLevel {
    pub fn from_pct(pct: u32) -> Self {
        match pct {
            p if p >= 75 => ConfluenceLevel::Strong,
            p if p >= 55 => ConfluenceLevel::Good,
            p if p >= 35 => ConfluenceLevel::Weak,
            _ => ConfluenceLevel::NoTrade,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfluenceStatus {
    Ok,
    Warn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    pub kind: SignalKind,
    pub weight: u32,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfluenceResult {
    pub suggestion: Suggestion,
    pub raw: u32,
    pub max: u32,
    pub score_pct: u32,
    pub level: ConfluenceLevel,
    pub status: ConfluenceStatus,
    pub contributions: Vec<Contribution>,
    pub reasons: Vec<String>,
}

/// Combine independently computed signals into one suggestion.
pub fn aggregate(signals: &[IndicatorSignal], off_hours: bool, delayed: bool) -> ConfluenceResult {
    let contributing: Vec<&IndicatorSignal> = signals.iter().filter(|s| s.contributes()).collect();
    let lead = |kind: SignalKind| contributing.iter().find(|s| s.kind == kind).map(|s| s.direction);

    let suggestion = match lead(SignalKind::Psp).or_else(|| lead(SignalKind::Bias)) {
        Some(Direction::Long) => Suggestion::Long,
        Some(Direction::Short) => Suggestion::Short,
        _ => Suggestion::NoTrade,
    };

    let counted: Vec<&IndicatorSignal> = match suggestion.direction() {
        Some(direction) => contributing.iter().copied().filter(|s| s.direction == direction).collect(),
        None => contributing,
    };

    let raw: u32 = counted.iter().map(|s| s.kind.weight()).sum::<u32>().min(MAX_CONFLUENCE);
    let score_pct = (raw as f64 / MAX_CONFLUENCE as f64 * 100.0).round() as u32;
    let level = ConfluenceLevel::from_pct(score_pct);

    let mut reasons: Vec<String> = counted.iter().map(|s| s.reason.clone()).collect();
    if off_hours {
        reasons.push("Session off-hours".to_string());
    }
    if delayed {
        reasons.push("Feed delayed".to_string());
    }

    let status = if level == ConfluenceLevel::NoTrade || off_hours || delayed {
        ConfluenceStatus::Warn
    } else {
        ConfluenceStatus::Ok
    };

    ConfluenceResult {
        suggestion,
        raw,
        max: MAX_CONFLUENCE,
        score_pct,
        level,
        status,
        contributions: counted
            .iter()
            .map(|s| Contribution {
                kind: s.kind,
                weight: s.kind.weight(),
                direction: s.direction,
            })
            .collect(),
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(kind: SignalKind, direction: Direction) -> IndicatorSignal {
        IndicatorSignal {
            kind,
            status: SignalStatus::Ok,
            direction,
            score: 80,
            reason: format!("{:?}", kind),
        }
    }

    const ALL: [SignalKind; 7] = [
        SignalKind::Psp,
        SignalKind::Bias,
        SignalKind::Structure,
        SignalKind::ValueZone,
        SignalKind::Liquidity,
        SignalKind::Smt,
        SignalKind::Session,
    ];

    #[test]
    fn test_weights_sum_to_max() {
        let total: u32 = ALL.iter().map(|k| k.weight()).sum();
        assert_eq!(total, MAX_CONFLUENCE);
    }

    #[test]
    fn test_full_alignment_is_strong() {
        let signals: Vec<_> = ALL.iter().map(|&k| signal(k, Direction::Long)).collect();
        let result = aggregate(&signals, false, false);

        assert_eq!(result.suggestion, Suggestion::Long);
        assert_eq!(result.raw, 12);
        assert_eq!(result.score_pct, 100);
        assert_eq!(result.level, ConfluenceLevel::Strong);
        assert_eq!(result.status, ConfluenceStatus::Ok);
        assert_eq!(result.contributions.len(), 7);
    }

    #[test]
    fn test_psp_leads_over_bias() {
        let signals = vec![
            signal(SignalKind::Psp, Direction::Short),
            signal(SignalKind::Bias, Direction::Long),
            signal(SignalKind::Structure, Direction::Short),
        ];
        let result = aggregate(&signals, false, false);

        assert_eq!(result.suggestion, Suggestion::Short);
        assert_eq!(result.raw, 5);
        assert_eq!(result.score_pct, 42);
        assert_eq!(result.level, ConfluenceLevel::Weak);
    }

    #[test]
    fn test_lighter_signals_never_pick_direction() {
        let signals = vec![
            signal(SignalKind::Structure, Direction::Long),
            signal(SignalKind::ValueZone, Direction::Long),
            signal(SignalKind::Smt, Direction::Long),
            IndicatorSignal::off(SignalKind::Psp, "none"),
        ];
        let result = aggregate(&signals, false, false);

        assert_eq!(result.suggestion, Suggestion::NoTrade);
        assert_eq!(result.raw, 5);
    }

    #[test]
    fn test_non_contributing_signals_ignored() {
        let mut zero = signal(SignalKind::Bias, Direction::Long);
        zero.score = 0;
        let neutral = signal(SignalKind::Structure, Direction::Neutral);
        let mut off = signal(SignalKind::ValueZone, Direction::Long);
        off.status = SignalStatus::Off;

        let result = aggregate(&[zero, neutral, off], false, false);
        assert_eq!(result.raw, 0);
        assert_eq!(result.level, ConfluenceLevel::NoTrade);
        assert_eq!(result.status, ConfluenceStatus::Warn);
    }

    #[test]
    fn test_score_bounded_and_monotonic() {
        let mut signals = vec![signal(SignalKind::Psp, Direction::Long)];
        let mut previous = aggregate(&signals, false, false).score_pct;

        for &kind in &ALL[1..] {
            signals.push(signal(kind, Direction::Long));
            let pct = aggregate(&signals, false, false).score_pct;
            assert!(pct >= previous);
            assert!(pct <= 100);
            previous = pct;
        }
    }

    #[test]
    fn test_warn_when_off_hours_or_delayed() {
        let signals: Vec<_> = ALL.iter().map(|&k| signal(k, Direction::Short)).collect();
        assert_eq!(aggregate(&signals, true, false).status, ConfluenceStatus::Warn);

        let delayed = aggregate(&signals, false, true);
        assert_eq!(delayed.status, ConfluenceStatus::Warn);
        assert!(delayed.reasons.iter().any(|r| r == "Feed delayed"));
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(ConfluenceLevel::from_pct(34), ConfluenceLevel::NoTrade);
        assert_eq!(ConfluenceLevel::from_pct(35), ConfluenceLevel::Weak);
        assert_eq!(ConfluenceLevel::from_pct(55), ConfluenceLevel::Good);
        assert_eq!(ConfluenceLevel::from_pct(75), ConfluenceLevel::Strong);
    }
}
