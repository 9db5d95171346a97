//! Composite directional bias and the midnight-open hysteresis bias.

use std::str::FromStr;

use analysis_core::{AnalysisError, Candle, Direction};
use market_structure::{DailyLevels, Fvg, Polarity, SmtDivergence};
use serde::{Deserialize, Serialize};
use technical_analysis::TechnicalSnapshot;

/// Score at which the bias leans one way
pub const BIAS_THRESHOLD: i32 = 10;
/// Score at which the lean is labelled strong
pub const STRONG_BIAS_THRESHOLD: i32 = 40;
/// Points band around the midnight open that does not flip the buffered bias
pub const DEFAULT_MIDNIGHT_BUFFER: f64 = 1.0;

const VWAP_POINTS: i32 = 15;
const DAY_OPEN_POINTS: i32 = 15;
const PREV_DAY_BREACH_POINTS: i32 = 10;
const EMA200_POINTS: i32 = 10;
const EMA_CROSS_POINTS: i32 = 5;
const SMT_POINTS: i32 = 20;
const FVG_POINTS: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BiasLabel {
    StrongBullish,
    Bullish,
    Neutral,
    Bearish,
    StrongBearish,
}

impl BiasLabel {
    pub fn from_score(score: i32) -> Self {
        if score >= STRONG_BIAS_THRESHOLD {
            BiasLabel::StrongBullish
        } else if score >= BIAS_THRESHOLD {
            BiasLabel::Bullish
        } else if score <= -STRONG_BIAS_THRESHOLD {
            BiasLabel::StrongBearish
        } else if score <= -BIAS_THRESHOLD {
            BiasLabel::Bearish
        } else {
            BiasLabel::Neutral
        }
    }

    pub fn is_strong(&self) -> bool {
        matches!(self, BiasLabel::StrongBullish | BiasLabel::StrongBearish)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasFactor {
    pub name: String,
    pub points: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeBias {
    pub score: i32,
    pub label: BiasLabel,
    pub direction: Direction,
    pub factors: Vec<BiasFactor>,
}

/// Everything the composite bias reads
pub struct BiasInputs<'a> {
    pub price: f64,
    pub technicals: &'a TechnicalSnapshot,
    pub levels: &'a DailyLevels,
    pub smt: &'a [SmtDivergence],
    pub fvgs: &'a [Fvg],
}

fn side(price: f64, reference: Option<f64>, points: i32) -> i32 {
    match reference {
        Some(r) if price > r => points,
        Some(r) if price < r => -points,
        _ => 0,
    }
}

/// Weighted sum of independent directional factors
pub fn composite_bias(inputs: &BiasInputs) -> CompositeBias {
    let price = inputs.price;
    let tech = inputs.technicals;
    let mut factors = Vec::new();
    let mut add = |name: &str, points: i32| {
        if points != 0 {
            factors.push(BiasFactor { name: name.to_string(), points });
        }
    };

    add("VWAP", side(price, tech.vwap, VWAP_POINTS));
    add("Day Open", side(price, inputs.levels.day_open, DAY_OPEN_POINTS));

    match (inputs.levels.pdh, inputs.levels.pdl) {
        (Some(pdh), _) if price > pdh => add("PDH Breach", PREV_DAY_BREACH_POINTS),
        (_, Some(pdl)) if price < pdl => add("PDL Breach", -PREV_DAY_BREACH_POINTS),
        _ => {}
    }

    add("EMA200", side(price, tech.ema200, EMA200_POINTS));
    if let (Some(fast), Some(slow)) = (tech.ema20, tech.ema50) {
        add("EMA20/50", side(fast, Some(slow), EMA_CROSS_POINTS));
    }

    for smt in inputs.smt {
        let points = match smt.kind {
            Polarity::Bullish => SMT_POINTS,
            Polarity::Bearish => -SMT_POINTS,
        };
        add(&format!("SMT {}", smt.reference_symbol), points);
    }

    if let Some(fvg) = inputs.fvgs.iter().rev().find(|f| f.contains(price)) {
        let points = match fvg.kind {
            Polarity::Bullish => FVG_POINTS,
            Polarity::Bearish => -FVG_POINTS,
        };
        add("FVG", points);
    }

    let score = factors.iter().map(|f| f.points).sum();
    CompositeBias {
        score,
        label: BiasLabel::from_score(score),
        direction: Direction::from_score(score as f64, BIAS_THRESHOLD as f64),
        factors,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferedBias {
    pub direction: Direction,
    pub midnight_open: f64,
    pub buffer: f64,
    pub flips: usize,
    pub last_flip_time: Option<i64>,
}

/// Hysteresis bias around the midnight open.
///
/// Seeded by the first candle at or after `midnight_time` (close at or above the
/// open is LONG), then every later candle flips it only when it closes outside
/// `open ± buffer`. Returns `None` when no candle has printed since midnight.
pub fn buffered_bias(candles: &[Candle], midnight_time: i64, midnight_open: f64, buffer: f64) -> Option<BufferedBias> {
    let start = candles.iter().position(|c| c.time >= midnight_time)?;
    let seed = &candles[start];
    let mut bias = BufferedBias {
        direction: if seed.close >= midnight_open { Direction::Long } else { Direction::Short },
        midnight_open,
        buffer,
        flips: 0,
        last_flip_time: None,
    };

    for c in &candles[start + 1..] {
        let next = if c.close > midnight_open + buffer {
            Direction::Long
        } else if c.close < midnight_open - buffer {
            Direction::Short
        } else {
            bias.direction
        };
        if next != bias.direction {
            bias.direction = next;
            bias.flips += 1;
            bias.last_flip_time = Some(c.time);
        }
    }

    Some(bias)
}

/// Which bias drives risk and scenario direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BiasMode {
    #[default]
    Composite,
    MidnightOpen,
}

impl FromStr for BiasMode {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "COMPOSITE" => Ok(BiasMode::Composite),
            "MIDNIGHT_OPEN" | "MIDNIGHT" => Ok(BiasMode::MidnightOpen),
            other => Err(AnalysisError::Config(format!("unknown bias mode: {}", other))),
        }
    }
}

/// The bias the rest of the pipeline trades with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActiveBias {
    pub mode: BiasMode,
    pub direction: Direction,
    pub score: i32,
    pub label: BiasLabel,
}

impl ActiveBias {
    /// In midnight-open mode the buffered direction wins; its magnitude is the
    /// composite score when the two agree, otherwise the bias threshold. Falls
    /// back to the composite bias when there is no buffered bias yet.
    pub fn select(mode: BiasMode, composite: &CompositeBias, buffered: Option<&BufferedBias>) -> Self {
        match (mode, buffered) {
            (BiasMode::MidnightOpen, Some(b)) if !b.direction.is_neutral() => {
                let magnitude = if composite.direction == b.direction {
                    composite.score.abs().max(BIAS_THRESHOLD)
                } else {
                    BIAS_THRESHOLD
                };
                let score = b.direction.sign() * magnitude;
                Self {
                    mode,
                    direction: b.direction,
                    score,
                    label: BiasLabel::from_score(score),
                }
            }
            _ => Self {
                mode,
                direction: composite.direction,
                score: composite.score,
                label: composite.label,
            },
        }
    }
}
