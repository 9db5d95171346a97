use analysis_core::{Candle, SessionInfo, Timeframe};
use market_regime_detector::MarketRegime;
use market_structure::{DailyLevels, Fvg, LiquidityPool, MarketStructure, PspResult};
use technical_analysis::TechnicalSnapshot;

use crate::bias::ActiveBias;
use crate::risk::RiskInputs;
use crate::scorecard::MacroContext;

/// Detector outputs for one execution series, borrowed for scenario
/// generation and scoring
#[derive(Clone, Copy)]
pub struct MarketContext<'a> {
    pub candles: &'a [Candle],
    pub timeframe: Timeframe,
    pub price: f64,
    pub structure: &'a MarketStructure,
    pub pools: &'a [LiquidityPool],
    pub fvgs: &'a [Fvg],
    pub psp: &'a PspResult,
    pub regime: MarketRegime,
    pub technicals: &'a TechnicalSnapshot,
    pub levels: &'a DailyLevels,
    pub session: &'a SessionInfo,
    pub bias: &'a ActiveBias,
    pub macro_context: Option<&'a MacroContext>,
}

impl<'a> MarketContext<'a> {
    pub fn risk_inputs(&self) -> RiskInputs<'a> {
        RiskInputs {
            swings: &self.structure.swings,
            pools: self.pools,
            fvgs: self.fvgs,
            levels: self.levels,
        }
    }
}
