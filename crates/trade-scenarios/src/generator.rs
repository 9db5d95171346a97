//! Trade scenario generation, ranking and primary election.

use analysis_core::{Direction, Timeframe};
use market_regime_detector::MarketRegime;
use market_structure::{Fvg, LiquidityPool, PoolType, Polarity};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::context::MarketContext;
use crate::risk::{collect_targets, reward_risk};
use crate::scorecard::{score_scenario, ConfidenceScorecard, Rating};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioType {
    FvgRejection,
    LiquiditySweep,
}

impl ScenarioType {
    fn code(&self) -> &'static str {
        match self {
            ScenarioType::FvgRejection => "fvg",
            ScenarioType::LiquiditySweep => "sweep",
        }
    }
}

/// Holding horizon, which sets the scenario TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioTimeframe {
    Scalp,
    M15,
    H1,
}

impl ScenarioTimeframe {
    pub fn from_timeframe(tf: Timeframe) -> Self {
        match tf.to_minutes() {
            m if m <= 5 => ScenarioTimeframe::Scalp,
            m if m < 60 => ScenarioTimeframe::M15,
            _ => ScenarioTimeframe::H1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BiasAlignment {
    Aligned,
    Counter,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScenarioState {
    Actionable,
    Pending,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionType {
    Market,
    Limit,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryZone {
    pub min: f64,
    pub max: f64,
}

impl EntryZone {
    pub fn mid(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfidence {
    pub score: i32,
    pub rating: Rating,
    /// Labels of the positive scorecard components
    pub factors: Vec<String>,
    pub scorecard: ConfidenceScorecard,
}

impl From<ConfidenceScorecard> for ScenarioConfidence {
    fn from(scorecard: ConfidenceScorecard) -> Self {
        Self {
            score: scorecard.total,
            rating: scorecard.rating,
            factors: scorecard
                .components
                .iter()
                .filter(|c| c.points > 0)
                .map(|c| c.label.clone())
                .collect(),
            scorecard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeScenario {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ScenarioType,
    pub direction: Direction,
    pub entry_zone: EntryZone,
    pub stop_loss: f64,
    pub targets: Vec<f64>,
    pub rr: f64,
    pub timeframe: ScenarioTimeframe,
    pub bias_alignment: BiasAlignment,
    pub confidence: ScenarioConfidence,
    pub state: ScenarioState,
    pub execution_type: ExecutionType,
    pub execution_note: String,
    pub psp_anchored: bool,
    pub is_primary: bool,
    pub ttl_seconds: i64,
    /// Unix seconds
    pub expires_at: i64,
    pub narrative: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioConfig {
    /// Candles spanning the premium/discount range
    pub equilibrium_lookback: usize,
    pub fvgs_per_side: usize,
    /// Stop distance beyond the zone or sweep, as a fraction of ATR
    pub stop_atr_mult: f64,
    pub sweep_lookback: usize,
    /// Height of the reclaim zone above/below a swept pool, as a fraction of ATR
    pub sweep_zone_atr_mult: f64,
    pub fvg_min_rr: f64,
    pub sweep_min_rr: f64,
    pub dedup_tolerance: f64,
    pub scalp_ttl_secs: i64,
    pub choppy_scalp_ttl_secs: i64,
    pub m15_ttl_secs: i64,
    pub h1_ttl_secs: i64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            equilibrium_lookback: 50,
            fvgs_per_side: 3,
            stop_atr_mult: 0.1,
            sweep_lookback: 10,
            sweep_zone_atr_mult: 0.5,
            fvg_min_rr: 1.0,
            sweep_min_rr: 1.5,
            dedup_tolerance: 0.1,
            scalp_ttl_secs: 240,
            choppy_scalp_ttl_secs: 60,
            m15_ttl_secs: 2700,
            h1_ttl_secs: 10800,
        }
    }
}

impl ScenarioConfig {
    pub fn ttl_secs(&self, timeframe: ScenarioTimeframe, regime: MarketRegime) -> i64 {
        match timeframe {
            ScenarioTimeframe::Scalp if regime == MarketRegime::Choppy => self.choppy_scalp_ttl_secs,
            ScenarioTimeframe::Scalp => self.scalp_ttl_secs,
            ScenarioTimeframe::M15 => self.m15_ttl_secs,
            ScenarioTimeframe::H1 => self.h1_ttl_secs,
        }
    }
}

/// State and execution for a price relative to the entry zone and stop
pub fn derive_state(direction: Direction, price: f64, zone: EntryZone, stop: f64) -> (ScenarioState, ExecutionType, &'static str) {
    let long = direction == Direction::Long;
    let stop_breached = if long { price <= stop } else { price >= stop };
    let not_retraced = if long { price > zone.max } else { price < zone.min };

    if stop_breached {
        (ScenarioState::Invalid, ExecutionType::Market, "Stop Breached")
    } else if zone.contains(price) {
        (ScenarioState::Actionable, ExecutionType::Market, "In Zone")
    } else if not_retraced {
        (ScenarioState::Pending, ExecutionType::Limit, "Await Retrace")
    } else {
        (ScenarioState::Actionable, ExecutionType::Market, "Deep Retrace")
    }
}

struct Draft {
    kind: ScenarioType,
    direction: Direction,
    zone: EntryZone,
    stop: f64,
    psp_anchored: bool,
    awaiting_reclaim: bool,
    narrative: String,
}

pub struct ScenarioGenerator {
    config: ScenarioConfig,
}

impl Default for ScenarioGenerator {
    fn default() -> Self {
        Self::new(ScenarioConfig::default())
    }
}

impl ScenarioGenerator {
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Generate, score and rank scenarios. The returned list is sorted best
    /// first; at most the first entry is actionable.
    pub fn generate(&self, ctx: &MarketContext, now: i64) -> Vec<TradeScenario> {
        let Some(atr) = ctx.technicals.atr.filter(|a| *a > 0.0) else {
            debug!("No ATR, skipping scenario generation");
            return vec![];
        };

        let mut drafts = self.fvg_rejections(ctx, atr);
        drafts.extend(self.liquidity_sweeps(ctx, atr));

        let timeframe = ScenarioTimeframe::from_timeframe(ctx.timeframe);
        let ttl_seconds = self.config.ttl_secs(timeframe, ctx.regime);

        let candidates: Vec<TradeScenario> = drafts
            .into_iter()
            .filter_map(|draft| self.build(draft, ctx, timeframe, ttl_seconds, now))
            .collect();

        let mut scenarios = self.dedupe(candidates);
        rank(&mut scenarios);

        info!(
            "Generated {} scenarios (primary: {})",
            scenarios.len(),
            scenarios.first().map(|s| s.id.as_str()).unwrap_or("none")
        );
        scenarios
    }

    fn fvg_rejections(&self, ctx: &MarketContext, atr: f64) -> Vec<Draft> {
        let recent = &ctx.candles[ctx.candles.len().saturating_sub(self.config.equilibrium_lookback)..];
        if recent.is_empty() {
            return vec![];
        }
        let high = recent.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
        let low = recent.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
        let equilibrium = (high + low) / 2.0;

        let open: Vec<&Fvg> = ctx.fvgs.iter().rev().filter(|f| !f.is_mitigated(ctx.candles)).collect();
        let premium = open
            .iter()
            .filter(|f| f.kind == Polarity::Bearish && f.bottom >= equilibrium)
            .take(self.config.fvgs_per_side);
        let discount = open
            .iter()
            .filter(|f| f.kind == Polarity::Bullish && f.top <= equilibrium)
            .take(self.config.fvgs_per_side);

        premium
            .map(|f| (Direction::Short, *f))
            .chain(discount.map(|f| (Direction::Long, *f)))
            .map(|(direction, fvg)| {
                let zone = EntryZone { min: fvg.bottom, max: fvg.top };
                let psp = ctx.psp;
                let anchor = psp
                    .levels
                    .filter(|lv| psp.is_active() && psp.direction == direction && lv.overlaps(zone.min, zone.max));
                // An anchored stop never sits inside the zone
                let offset = self.config.stop_atr_mult * atr;
                let stop = match (anchor, direction) {
                    (Some(lv), Direction::Long) => lv.invalidation.min(zone.min - offset),
                    (Some(lv), _) => lv.invalidation.max(zone.max + offset),
                    (None, Direction::Long) => zone.min - offset,
                    (None, _) => zone.max + offset,
                };
                let location = if direction == Direction::Long { "discount" } else { "premium" };

                Draft {
                    kind: ScenarioType::FvgRejection,
                    direction,
                    zone,
                    stop,
                    psp_anchored: anchor.is_some(),
                    awaiting_reclaim: false,
                    narrative: format!(
                        "{} rejection from {} FVG {:.2}-{:.2} (equilibrium {:.2})",
                        direction.label(),
                        location,
                        zone.min,
                        zone.max,
                        equilibrium
                    ),
                }
            })
            .collect()
    }

    fn liquidity_sweeps(&self, ctx: &MarketContext, atr: f64) -> Vec<Draft> {
        ctx.pools
            .iter()
            .filter_map(|pool| self.sweep_draft(pool, ctx, atr))
            .collect()
    }

    fn sweep_draft(&self, pool: &LiquidityPool, ctx: &MarketContext, atr: f64) -> Option<Draft> {
        let sweep = pool.find_sweep(ctx.candles, self.config.sweep_lookback)?;
        let offset = self.config.stop_atr_mult * atr;
        let height = self.config.sweep_zone_atr_mult * atr;

        let (direction, zone, stop, reclaimed, side) = match pool.kind {
            PoolType::Eql => (
                Direction::Long,
                EntryZone { min: pool.price, max: pool.price + height },
                sweep.extreme - offset,
                ctx.price > pool.price,
                "EQL",
            ),
            PoolType::Eqh => (
                Direction::Short,
                EntryZone { min: pool.price - height, max: pool.price },
                sweep.extreme + offset,
                ctx.price < pool.price,
                "EQH",
            ),
        };

        Some(Draft {
            kind: ScenarioType::LiquiditySweep,
            direction,
            zone,
            stop,
            psp_anchored: false,
            awaiting_reclaim: !reclaimed,
            narrative: format!(
                "{} swept at {:.2} (x{}), {}",
                side,
                pool.price,
                pool.strength,
                if reclaimed { "reclaimed" } else { "awaiting reclaim" }
            ),
        })
    }

    fn build(
        &self,
        draft: Draft,
        ctx: &MarketContext,
        timeframe: ScenarioTimeframe,
        ttl_seconds: i64,
        now: i64,
    ) -> Option<TradeScenario> {
        let entry = draft.zone.mid();
        let targets: Vec<f64> = collect_targets(draft.direction, entry, &ctx.risk_inputs())
            .iter()
            .map(|t| t.price)
            .collect();
        let rr = reward_risk(entry, draft.stop, *targets.first()?)?;

        let min_rr = match draft.kind {
            ScenarioType::FvgRejection => self.config.fvg_min_rr,
            ScenarioType::LiquiditySweep => self.config.sweep_min_rr,
        };
        if rr <= min_rr {
            debug!("Dropping {:?} {:?} at {:.2}: R:R {:.2}", draft.kind, draft.direction, draft.zone.min, rr);
            return None;
        }

        let (mut state, mut execution_type, mut note) = derive_state(draft.direction, ctx.price, draft.zone, draft.stop);
        if draft.awaiting_reclaim && state != ScenarioState::Invalid {
            state = ScenarioState::Pending;
            execution_type = ExecutionType::Stop;
            note = "Await Reclaim";
        }

        let bias_alignment = if ctx.bias.direction == draft.direction {
            BiasAlignment::Aligned
        } else if ctx.bias.direction.is_neutral() {
            BiasAlignment::Neutral
        } else {
            BiasAlignment::Counter
        };

        let scorecard = score_scenario(draft.direction, rr, draft.kind == ScenarioType::FvgRejection, ctx);

        Some(TradeScenario {
            id: format!("{}-{}-{:.2}", draft.kind.code(), draft.direction.label().to_ascii_lowercase(), draft.zone.min),
            kind: draft.kind,
            direction: draft.direction,
            entry_zone: draft.zone,
            stop_loss: draft.stop,
            targets,
            rr,
            timeframe,
            bias_alignment,
            confidence: scorecard.into(),
            state,
            execution_type,
            execution_note: note.to_string(),
            psp_anchored: draft.psp_anchored,
            is_primary: false,
            ttl_seconds,
            expires_at: now + ttl_seconds,
            narrative: draft.narrative,
        })
    }

    /// Collapse scenarios of the same type whose zones start within the
    /// tolerance, keeping the higher score
    fn dedupe(&self, scenarios: Vec<TradeScenario>) -> Vec<TradeScenario> {
        let mut kept: Vec<TradeScenario> = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            let duplicate = kept.iter().position(|k| {
                k.kind == scenario.kind
                    && (k.entry_zone.min - scenario.entry_zone.min).abs() < self.config.dedup_tolerance
            });
            match duplicate {
                Some(i) if scenario.confidence.score > kept[i].confidence.score => kept[i] = scenario,
                Some(_) => {}
                None => kept.push(scenario),
            }
        }
        kept
    }
}

/// Sort best first, flag the primary and demote every other actionable
/// scenario to pending.
pub fn rank(scenarios: &mut [TradeScenario]) {
    scenarios.sort_by(|a, b| {
        b.confidence
            .score
            .cmp(&a.confidence.score)
            .then_with(|| (b.state == ScenarioState::Actionable).cmp(&(a.state == ScenarioState::Actionable)))
            .then_with(|| b.rr.total_cmp(&a.rr))
    });

    for (i, scenario) in scenarios.iter_mut().enumerate() {
        scenario.is_primary = i == 0;
        if i > 0 && scenario.state == ScenarioState::Actionable {
            scenario.state = ScenarioState::Pending;
            scenario.execution_note = format!("{} (Focus Guard)", scenario.execution_note);
        }
    }
}
