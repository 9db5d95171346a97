//! End-to-end analysis pipeline.
//!
//! Takes the candle series of one instrument (plus optional higher-timeframe
//! and correlated reference series), runs every detector in dependency order
//! and assembles the [`SignalBundle`].

use std::collections::BTreeMap;

use analysis_core::session::session_at;
use analysis_core::{AnalysisError, Candle, SessionInfo, Timeframe};
use market_regime_detector::{MarketRegimeDetector, RegimeDetectionResult};
use market_structure::{
    analyze_structure, build_volume_profile, compute_daily_levels, current_day, detect_fvgs, detect_liquidity,
    detect_smt_all, latest_sweep, DailyLevels, Fvg, LiquidityPool, MarketStructure, PspDetector, PspResult,
    SmtDivergence, VolumeProfile,
};
use serde::{Deserialize, Serialize};
use technical_analysis::{TechnicalAnalysisEngine, TechnicalSnapshot};
use trade_scenarios::{
    analyze_risk, buffered_bias, composite_bias, ActiveBias, BiasInputs, BufferedBias, CompositeBias, MarketContext,
    RiskAnalysis, ScenarioGenerator, TradeScenario,
};

pub mod config;
pub mod confluence;

pub use config::AnalysisConfig;
pub use confluence::{
    aggregate, ConfluenceLevel, ConfluenceResult, ConfluenceStatus, Contribution, IndicatorSignal, SignalKind,
    SignalStatus, Suggestion, MAX_CONFLUENCE,
};
pub use trade_scenarios::MacroContext;

/// Everything one analysis pass reads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Execution series, ascending
    pub candles: Vec<Candle>,
    /// Other timeframes of the same instrument
    #[serde(default)]
    pub series: BTreeMap<Timeframe, Vec<Candle>>,
    /// Correlated instruments for SMT, by symbol
    #[serde(default)]
    pub references: BTreeMap<String, Vec<Candle>>,
    #[serde(default)]
    pub macro_context: Option<MacroContext>,
    /// Feed is delayed rather than real-time
    #[serde(default)]
    pub delayed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalBundle {
    pub symbol: String,
    pub timeframe: Timeframe,
    /// Unix seconds
    pub generated_at: i64,
    pub price: f64,
    pub structure: MarketStructure,
    pub htf_structure: Option<MarketStructure>,
    pub liquidity: Vec<LiquidityPool>,
    pub fvgs: Vec<Fvg>,
    pub psp: PspResult,
    pub smt: Vec<SmtDivergence>,
    pub regime: RegimeDetectionResult,
    pub technicals: TechnicalSnapshot,
    pub volume_profile: Option<VolumeProfile>,
    pub levels: DailyLevels,
    pub session: SessionInfo,
    pub bias: CompositeBias,
    pub buffered_bias: Option<BufferedBias>,
    pub active_bias: ActiveBias,
    pub risk: RiskAnalysis,
    pub scenarios: Vec<TradeScenario>,
    pub confluence: ConfluenceResult,
}

impl MarketSnapshot {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, candles: Vec<Candle>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            candles,
            series: BTreeMap::new(),
            references: BTreeMap::new(),
            macro_context: None,
            delayed: false,
        }
    }
}

impl SignalBundle {
    pub fn primary_scenario(&self) -> Option<&TradeScenario> {
        self.scenarios.iter().find(|s| s.is_primary)
    }
}

pub struct AnalysisOrchestrator {
    config: AnalysisConfig,
    technical_analyzer: TechnicalAnalysisEngine,
    regime_detector: MarketRegimeDetector,
    psp_detector: PspDetector,
    scenario_generator: ScenarioGenerator,
}

impl Default for AnalysisOrchestrator {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl AnalysisOrchestrator {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            technical_analyzer: TechnicalAnalysisEngine::new(),
            regime_detector: MarketRegimeDetector::with_config(config.regime.clone()),
            psp_detector: PspDetector::new(config.psp.clone()),
            scenario_generator: ScenarioGenerator::new(config.scenarios.clone()),
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Series and timeframe the PSP machine runs on
    fn psp_series<'a>(&self, snapshot: &'a MarketSnapshot) -> (Timeframe, &'a [Candle]) {
        self.config
            .psp_timeframe
            .and_then(|tf| snapshot.series.get(&tf).filter(|c| !c.is_empty()).map(|c| (tf, c.as_slice())))
            .unwrap_or((snapshot.timeframe, snapshot.candles.as_slice()))
    }

    /// Structure of the nearest higher timeframe supplied
    fn htf_structure(&self, snapshot: &MarketSnapshot) -> Option<MarketStructure> {
        let exec_minutes = snapshot.timeframe.to_minutes();
        let (_, candles) = snapshot
            .series
            .iter()
            .filter(|(tf, candles)| tf.to_minutes() > exec_minutes && !candles.is_empty())
            .min_by_key(|(tf, _)| tf.to_minutes())?;
        Some(analyze_structure(candles, self.config.swing_bars, self.config.swing_bars))
    }

    /// Run the full pipeline at `now` (unix seconds).
    pub fn analyze(&self, snapshot: &MarketSnapshot, now: i64) -> Result<SignalBundle, AnalysisError> {
        let candles = snapshot.candles.as_slice();
        let Some(last) = candles.last() else {
            return Err(AnalysisError::InvalidData(format!(
                "no {} candles for {}",
                snapshot.timeframe, snapshot.symbol
            )));
        };
        let price = last.close;
        let cfg = &self.config;

        tracing::debug!("Analyzing {} {} with {} candles", snapshot.symbol, snapshot.timeframe, candles.len());

        let structure = analyze_structure(candles, cfg.swing_bars, cfg.swing_bars);
        let htf_structure = self.htf_structure(snapshot);
        let liquidity = detect_liquidity(&structure.swings, cfg.liquidity_tolerance);
        let fvgs = detect_fvgs(candles);

        let (psp_tf, psp_candles) = self.psp_series(snapshot);
        let psp = self.psp_detector.detect(psp_candles, psp_tf, now);

        // SMT compares the tighter PSP fractals on both instruments
        let smt_bars = cfg.psp.swing_bars;
        let smt_primary = analyze_structure(candles, smt_bars, smt_bars);
        let references: BTreeMap<String, MarketStructure> = snapshot
            .references
            .iter()
            .filter(|(_, series)| !series.is_empty())
            .map(|(symbol, series)| (symbol.clone(), analyze_structure(series, smt_bars, smt_bars)))
            .collect();
        let smt = detect_smt_all(&smt_primary, &references, cfg.smt_tolerance_secs(snapshot.timeframe));

        let regime = self.regime_detector.detect_regime(candles, &structure.swings);

        let today = current_day(candles);
        let technicals = self.technical_analyzer.snapshot(candles, today);
        let volume_profile = build_volume_profile(today, cfg.tick_size);
        let levels = compute_daily_levels(candles);
        let session = session_at(now);

        let bias = composite_bias(&BiasInputs {
            price,
            technicals: &technicals,
            levels: &levels,
            smt: &smt,
            fvgs: &fvgs,
        });
        let buffered = levels
            .midnight_open
            .zip(levels.midnight_open_time)
            .and_then(|(open, time)| buffered_bias(candles, time, open, cfg.midnight_buffer));
        let active_bias = ActiveBias::select(cfg.bias_mode, &bias, buffered.as_ref());

        let ctx = MarketContext {
            candles,
            timeframe: snapshot.timeframe,
            price,
            structure: &structure,
            pools: &liquidity,
            fvgs: &fvgs,
            psp: &psp,
            regime: regime.regime,
            technicals: &technicals,
            levels: &levels,
            session: &session,
            bias: &active_bias,
            macro_context: snapshot.macro_context.as_ref(),
        };
        let risk = analyze_risk(active_bias.direction, price, &ctx.risk_inputs());
        let scenarios = self.scenario_generator.generate(&ctx, now);

        let sweep = latest_sweep(&liquidity, candles, cfg.sweep_lookback);
        let signals = [
            IndicatorSignal::from_psp(&psp),
            IndicatorSignal::from_bias(&active_bias),
            IndicatorSignal::from_structure(&structure),
            IndicatorSignal::from_value_zone(volume_profile.as_ref(), price),
            IndicatorSignal::from_liquidity(sweep.as_ref()),
            IndicatorSignal::from_smt(smt.iter().max_by_key(|d| d.time)),
            IndicatorSignal::from_session(&session, price, levels.midnight_open),
        ];
        let confluence = aggregate(&signals, session.is_off_hours, snapshot.delayed);

        tracing::info!(
            "{} {} @ {:.2}: structure={:?} regime={} bias={:+} psp={:?} scenarios={} confluence={:?} {}%",
            snapshot.symbol,
            snapshot.timeframe,
            price,
            structure.trend,
            regime.regime.name(),
            active_bias.score,
            psp.state,
            scenarios.len(),
            confluence.suggestion,
            confluence.score_pct
        );

        Ok(SignalBundle {
            symbol: snapshot.symbol.clone(),
            timeframe: snapshot.timeframe,
            generated_at: now,
            price,
            structure,
            htf_structure,
            liquidity,
            fvgs,
            psp,
            smt,
            regime,
            technicals,
            volume_profile,
            levels,
            session,
            bias,
            buffered_bias: buffered,
            active_bias,
            risk,
            scenarios,
            confluence,
        })
    }
}
