//! Bias, risk and trade scenario layer.
//!
//! Consumes the detector outputs of one execution series (structure, PSP,
//! FVGs, liquidity, regime, technicals, levels) and turns them into a
//! directional bias, structural risk levels and ranked trade scenarios.

pub mod bias;
pub mod context;
pub mod generator;
pub mod risk;
pub mod scorecard;

pub use bias::{
    buffered_bias, composite_bias, ActiveBias, BiasFactor, BiasInputs, BiasLabel, BiasMode, BufferedBias,
    CompositeBias, BIAS_THRESHOLD, DEFAULT_MIDNIGHT_BUFFER, STRONG_BIAS_THRESHOLD,
};
pub use context::MarketContext;
pub use generator::{
    derive_state, rank, BiasAlignment, EntryZone, ExecutionType, ScenarioConfidence, ScenarioConfig,
    ScenarioGenerator, ScenarioState, ScenarioTimeframe, ScenarioType, TradeScenario,
};
pub use risk::{analyze_risk, collect_targets, find_invalidation, reward_risk, RiskAnalysis, RiskInputs, RiskTarget, TargetSource};
pub use scorecard::{
    score_scenario, ConfidenceScorecard, MacroContext, Rating, ScoreCategory, ScoreComponent, ScoreConflict,
    CONFLICT_PENALTY,
};
