//! Confidence scorecard for trade scenarios.

use analysis_core::Direction;
use market_regime_detector::MarketRegime;
use market_structure::{PspState, TrendType};
use serde::{Deserialize, Serialize};
use technical_analysis::{BandPosition, OscillatorState};

use crate::context::MarketContext;

/// Penalty when trend and macro layers pull opposite ways
pub const CONFLICT_PENALTY: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreCategory {
    Trend,
    Structure,
    Confluence,
    RiskReward,
    Session,
    Vwap,
    Macro,
    Regime,
    Technical,
    KeyOpens,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rating {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
}

impl Rating {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 75 => Rating::APlus,
            s if s >= 50 => Rating::A,
            s if s >= 25 => Rating::B,
            _ => Rating::C,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub category: ScoreCategory,
    pub label: String,
    pub points: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreConflict {
    pub detected: bool,
    pub reason: String,
    pub dominant_layer: ScoreCategory,
    pub penalty: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScorecard {
    pub total: i32,
    pub rating: Rating,
    pub components: Vec<ScoreComponent>,
    pub conflict: Option<ScoreConflict>,
}

impl ConfidenceScorecard {
    /// Total the components, applying the trend/macro conflict penalty
    pub fn from_components(components: Vec<ScoreComponent>) -> Self {
        let category_points =
            |cat: ScoreCategory| components.iter().filter(|c| c.category == cat).map(|c| c.points).sum::<i32>();
        let trend = category_points(ScoreCategory::Trend);
        let macro_points = category_points(ScoreCategory::Macro);

        let conflict = (trend != 0 && macro_points != 0 && trend.signum() != macro_points.signum()).then(|| {
            let dominant_layer = if macro_points.abs() > trend.abs() {
                ScoreCategory::Macro
            } else {
                ScoreCategory::Trend
            };
            ScoreConflict {
                detected: true,
                reason: format!("trend ({:+}) and macro ({:+}) disagree", trend, macro_points),
                dominant_layer,
                penalty: CONFLICT_PENALTY,
            }
        });

        let sum: i32 = components.iter().map(|c| c.points).sum();
        let total = sum - conflict.as_ref().map_or(0, |c| c.penalty);

        Self {
            total,
            rating: Rating::from_score(total),
            components,
            conflict,
        }
    }

    pub fn points(&self, category: ScoreCategory) -> i32 {
        self.components.iter().filter(|c| c.category == category).map(|c| c.points).sum()
    }
}

/// USD context for index futures
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroContext {
    pub usd_bias: Direction,
    /// 0..1 weight of the macro read
    pub relevance: f64,
}

struct Components(Vec<ScoreComponent>);

impl Components {
    fn add(&mut self, category: ScoreCategory, label: impl Into<String>, points: i32) {
        if points != 0 {
            self.0.push(ScoreComponent { category, label: label.into(), points });
        }
    }
}

/// Score a candidate scenario against the market context.
///
/// `fvg_zone` marks entry zones built from a fair value gap. MACD only adds
/// when aligned; the fighting-momentum penalties apply to MFI extremes and
/// VWAP band extremes, never to MACD.
pub fn score_scenario(direction: Direction, rr: f64, fvg_zone: bool, ctx: &MarketContext) -> ConfidenceScorecard {
    let mut c = Components(Vec::new());
    let long = direction == Direction::Long;
    let price = ctx.price;
    let tech = ctx.technicals;

    // Trend
    let bias = ctx.bias;
    if bias.direction == direction {
        if bias.label.is_strong() {
            c.add(ScoreCategory::Trend, "Strong bias aligned", 25);
        } else {
            c.add(ScoreCategory::Trend, "Bias aligned", 15);
        }
    } else if bias.direction == direction.opposite() {
        c.add(ScoreCategory::Trend, "Against bias", -15);
    }

    // Structure
    let structure_aligned = ctx.structure.trend.direction() == direction;
    if structure_aligned {
        c.add(ScoreCategory::Structure, "Structure aligned", 20);
    } else if ctx.structure.trend == TrendType::Consolidation {
        c.add(ScoreCategory::Structure, "Consolidation", 5);
    } else {
        c.add(ScoreCategory::Structure, "Against structure", -5);
    }

    // Confluence
    let psp = ctx.psp;
    match psp.state {
        PspState::Confirmed if psp.direction == direction => c.add(ScoreCategory::Confluence, "PSP confirmed", 25),
        PspState::Forming if psp.direction == direction => c.add(ScoreCategory::Confluence, "PSP forming", 15),
        _ if fvg_zone => c.add(ScoreCategory::Confluence, "FVG zone", 10),
        _ => {}
    }

    // Reward to risk
    if rr >= 3.0 {
        c.add(ScoreCategory::RiskReward, format!("R:R {:.1}", rr), 10);
    } else if rr >= 2.0 {
        c.add(ScoreCategory::RiskReward, format!("R:R {:.1}", rr), 5);
    } else if rr < 1.5 {
        c.add(ScoreCategory::RiskReward, format!("Thin R:R {:.1}", rr), -10);
    }

    if ctx.session.is_killzone {
        c.add(ScoreCategory::Session, "Kill zone", 5);
    }

    if let Some(vwap) = tech.vwap {
        if (long && price > vwap) || (!long && price < vwap) {
            c.add(ScoreCategory::Vwap, "VWAP side", 5);
        }
    }

    // Index futures trade inverse to the dollar
    if let Some(m) = ctx.macro_context {
        let points = (10.0 * m.relevance.clamp(0.0, 1.0)).round() as i32;
        if m.usd_bias == direction.opposite() {
            c.add(ScoreCategory::Macro, "USD supports", points);
        } else if m.usd_bias == direction {
            c.add(ScoreCategory::Macro, "USD headwind", -points);
        }
    }

    match ctx.regime {
        MarketRegime::Choppy => c.add(ScoreCategory::Regime, "Choppy regime", -15),
        MarketRegime::Ranging => c.add(ScoreCategory::Regime, "Ranging regime", -5),
        MarketRegime::Trending if structure_aligned => c.add(ScoreCategory::Regime, "Trending with structure", 5),
        _ => {}
    }

    // Technicals
    let macd_aligned = matches!(
        (direction, tech.macd_state),
        (Direction::Long, OscillatorState::Bullish) | (Direction::Short, OscillatorState::Bearish)
    );
    if macd_aligned {
        c.add(ScoreCategory::Technical, "MACD momentum", 10);
    }
    match (direction, tech.mfi_state) {
        (Direction::Long, OscillatorState::Bullish) | (Direction::Short, OscillatorState::Bearish) => {
            c.add(ScoreCategory::Technical, "MFI flow", 10)
        }
        (Direction::Long, OscillatorState::Overbought) => c.add(ScoreCategory::Technical, "MFI overbought", -15),
        (Direction::Short, OscillatorState::Oversold) => c.add(ScoreCategory::Technical, "MFI oversold", -15),
        _ => {}
    }
    match (direction, tech.vwap_band) {
        (Direction::Long, Some(BandPosition::BelowLower)) | (Direction::Short, Some(BandPosition::AboveUpper)) => {
            c.add(ScoreCategory::Technical, "VWAP band extreme", 10)
        }
        (Direction::Long, Some(BandPosition::AboveUpper)) => c.add(ScoreCategory::Technical, "Above upper band", -15),
        (Direction::Short, Some(BandPosition::BelowLower)) => c.add(ScoreCategory::Technical, "Below lower band", -15),
        _ => {}
    }

    // Key opens
    let opens = [
        ("Midnight open", ctx.levels.midnight_open),
        ("London open", ctx.levels.london_open),
        ("NY open", ctx.levels.ny_open),
    ];
    let mut agreeing = 0;
    for (name, open) in opens {
        let Some(open) = open else { continue };
        let agrees = if long { price > open } else { price < open };
        if agrees {
            agreeing += 1;
            c.add(ScoreCategory::KeyOpens, name, 5);
        } else {
            c.add(ScoreCategory::KeyOpens, name, -5);
        }
    }
    if agreeing == opens.len() {
        c.add(ScoreCategory::KeyOpens, "All opens agree", 5);
    }

    ConfidenceScorecard::from_components(c.0)
}
